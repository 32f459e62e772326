//! # Studio Settings
//!
//! Business-rule defaults shared by the API server and the maintenance runner.
//! Values come from `STUDIO_*` environment variables layered over the defaults
//! below, e.g. `STUDIO_TIMEZONE=America/Chicago` or
//! `STUDIO_DEFAULT_MAX_PARTICIPANTS=8`.

use chrono_tz::Tz;
use config::{builder::DefaultState, Config, ConfigBuilder, ConfigError, Environment};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StudioSettings {
    /// IANA timezone the studio's class dates and times are expressed in
    pub timezone: String,
    pub default_max_participants: i32,
    pub default_waitlist_capacity: i32,
    pub default_cancellation_deadline_hours: i32,
    /// How far ahead `materialize` generates classes from templates
    pub materialize_horizon_weeks: u32,
    /// Whether a signed waiver is required before booking
    pub require_waiver: bool,
}

impl Default for StudioSettings {
    fn default() -> Self {
        Self {
            timezone: "UTC".to_string(),
            default_max_participants: 10,
            default_waitlist_capacity: 5,
            default_cancellation_deadline_hours: 24,
            materialize_horizon_weeks: 8,
            require_waiver: true,
        }
    }
}

impl StudioSettings {
    /// Builder pre-loaded with the default values
    pub fn defaults() -> Result<ConfigBuilder<DefaultState>, ConfigError> {
        let defaults = Self::default();
        Config::builder()
            .set_default("timezone", defaults.timezone)?
            .set_default("default_max_participants", i64::from(defaults.default_max_participants))?
            .set_default("default_waitlist_capacity", i64::from(defaults.default_waitlist_capacity))?
            .set_default(
                "default_cancellation_deadline_hours",
                i64::from(defaults.default_cancellation_deadline_hours),
            )?
            .set_default("materialize_horizon_weeks", i64::from(defaults.materialize_horizon_weeks))?
            .set_default("require_waiver", defaults.require_waiver)
    }

    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_builder(
            Self::defaults()?.add_source(Environment::with_prefix("STUDIO").try_parsing(true)),
        )
    }

    pub fn from_builder(builder: ConfigBuilder<DefaultState>) -> Result<Self, ConfigError> {
        let settings: Self = builder.build()?.try_deserialize()?;
        settings
            .timezone
            .parse::<Tz>()
            .map_err(|e| ConfigError::Message(format!("Invalid STUDIO_TIMEZONE: {}", e)))?;
        Ok(settings)
    }

    /// The studio timezone; `from_builder` has already rejected unknown names.
    pub fn tz(&self) -> Tz {
        self.timezone.parse().unwrap_or(Tz::UTC)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_defaults_round_trip_through_config() {
        let settings = StudioSettings::from_builder(StudioSettings::defaults().unwrap()).unwrap();

        assert_eq!(settings.timezone, "UTC");
        assert_eq!(settings.default_max_participants, 10);
        assert_eq!(settings.default_waitlist_capacity, 5);
        assert_eq!(settings.default_cancellation_deadline_hours, 24);
        assert_eq!(settings.materialize_horizon_weeks, 8);
        assert!(settings.require_waiver);
        assert_eq!(settings.tz(), Tz::UTC);
    }

    #[test]
    fn test_overrides_apply() {
        let builder = StudioSettings::defaults()
            .unwrap()
            .set_override("timezone", "America/New_York")
            .unwrap()
            .set_override("default_max_participants", 4_i64)
            .unwrap();

        let settings = StudioSettings::from_builder(builder).unwrap();

        assert_eq!(settings.default_max_participants, 4);
        assert_eq!(settings.tz(), chrono_tz::America::New_York);
    }

    #[test]
    fn test_unknown_timezone_is_rejected() {
        let builder = StudioSettings::defaults()
            .unwrap()
            .set_override("timezone", "Mars/Olympus_Mons")
            .unwrap();

        assert!(StudioSettings::from_builder(builder).is_err());
    }
}
