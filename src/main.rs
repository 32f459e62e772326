use color_eyre::eyre::Result;
use dotenv::dotenv;
use studio_api::config::ApiConfig;
use studio_core::settings::StudioSettings;
use studio_db::{create_pool, schema::initialize_database};

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    dotenv().ok();

    let config = ApiConfig::from_env()?;
    let settings = StudioSettings::from_env()?;

    let db_pool = create_pool(&config.database_url).await?;
    initialize_database(&db_pool).await?;

    studio_api::start_server(config, db_pool, settings).await?;

    Ok(())
}
