//! Operational commands run against the studio database.
//!
//! ```text
//! maintenance reconcile
//! maintenance clamp
//! maintenance extend-packages --days N
//! maintenance materialize [--weeks N]
//! ```

use chrono::Utc;
use clap::{Parser, Subcommand};
use color_eyre::eyre::{Result, WrapErr};
use dotenv::dotenv;
use studio_api::config::parse_log_level;
use studio_core::{scheduling, settings::StudioSettings};
use studio_db::repositories::{maintenance, package};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser, Debug)]
#[command(name = "maintenance", version)]
#[command(about = "Operational commands for the studio database")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug, PartialEq)]
enum Command {
    /// Recompute participant counters from confirmed bookings
    Reconcile,
    /// Reset negative participant counters to zero
    Clamp,
    /// Push the expiry of every user package forward
    ExtendPackages {
        #[arg(long)]
        days: i64,
    },
    /// Generate classes for every active template from today
    Materialize {
        #[arg(long)]
        weeks: Option<u32>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    dotenv().ok();

    let subscriber = FmtSubscriber::builder()
        .with_max_level(parse_log_level(
            &std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
        ))
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let cli = Cli::parse();

    let database_url = std::env::var("DATABASE_URL").wrap_err("DATABASE_URL environment variable must be set")?;
    let settings = StudioSettings::from_env()?;
    let pool = studio_db::create_pool(&database_url).await?;

    match cli.command {
        Command::Reconcile => {
            let drifted = maintenance::reconcile_participant_counts(&pool).await?;
            if drifted.is_empty() {
                println!("All participant counts match their confirmed bookings.");
            }
            for drift in &drifted {
                println!(
                    "class {}: recorded {} actual {} (max {}), promoted {}",
                    drift.class_id, drift.recorded, drift.actual, drift.max_participants, drift.promoted
                );
            }
        }
        Command::Clamp => {
            let clamped = maintenance::clamp_negative_counts(&pool).await?;
            println!("Clamped {} negative counters.", clamped);
        }
        Command::ExtendPackages { days } => {
            let extended = package::extend_all_user_packages(&pool, days).await?;
            println!("Extended {} user packages by {} days.", extended, days);
        }
        Command::Materialize { weeks } => {
            let today = Utc::now().with_timezone(&settings.tz()).date_naive();
            let (from, to) = scheduling::horizon(today, weeks.unwrap_or(settings.materialize_horizon_weeks));

            let results = maintenance::materialize_all(&pool, from, to).await?;
            for result in &results {
                println!(
                    "template {}: created {} skipped {}",
                    result.template_id, result.created, result.skipped
                );
            }
            tracing::info!("Materialized {} templates from {} to {}", results.len(), from, to);
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Result<Command, clap::Error> {
        Cli::try_parse_from(std::iter::once("maintenance").chain(args.iter().copied())).map(|cli| cli.command)
    }

    #[test]
    fn test_parse_commands() {
        assert_eq!(parse(&["reconcile"]).unwrap(), Command::Reconcile);
        assert_eq!(parse(&["clamp"]).unwrap(), Command::Clamp);
        assert_eq!(
            parse(&["extend-packages", "--days", "14"]).unwrap(),
            Command::ExtendPackages { days: 14 }
        );
        assert_eq!(parse(&["materialize"]).unwrap(), Command::Materialize { weeks: None });
        assert_eq!(
            parse(&["materialize", "--weeks", "6"]).unwrap(),
            Command::Materialize { weeks: Some(6) }
        );
    }

    #[test]
    fn test_parse_rejects_bad_input() {
        assert!(parse(&[]).is_err());
        assert!(parse(&["vacuum"]).is_err());
        assert!(parse(&["extend-packages"]).is_err());
        assert!(parse(&["extend-packages", "--days"]).is_err());
        assert!(parse(&["materialize", "--weeks", "many"]).is_err());
    }
}
