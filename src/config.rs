use std::time::Duration;

use config::{builder::DefaultState, Config, ConfigBuilder, ConfigError, Environment};
use serde::Deserialize;

use crate::models::BASE_URL;

pub const ENV_PREFIX: &str = "PEAKBAGGER";

/// Runtime settings. Every field can be set through a `PEAKBAGGER_*`
/// environment variable, e.g. `PEAKBAGGER_RATE_LIMIT=5`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub base_url: String,
    /// Minimum seconds between two requests.
    pub rate_limit: f64,
    pub user_agent: String,
    pub timeout_secs: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            base_url: BASE_URL.to_string(),
            rate_limit: 2.0,
            user_agent: format!("peakbagger-rs/{} (personal use)", env!("CARGO_PKG_VERSION")),
            timeout_secs: 30,
        }
    }
}

impl Settings {
    pub fn load() -> Result<Self, ConfigError> {
        Self::from_builder(
            Config::builder().add_source(Environment::with_prefix(ENV_PREFIX).try_parsing(true)),
        )
    }

    fn from_builder(builder: ConfigBuilder<DefaultState>) -> Result<Self, ConfigError> {
        let settings: Settings = builder.build()?.try_deserialize()?;
        if !settings.rate_limit.is_finite() || settings.rate_limit < 0.0 {
            return Err(ConfigError::Message(format!(
                "rate_limit must be a non-negative number of seconds, got {}",
                settings.rate_limit
            )));
        }
        Ok(settings)
    }

    pub fn request_interval(&self) -> Duration {
        Duration::from_secs_f64(self.rate_limit)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_without_sources() {
        let settings = Settings::from_builder(Config::builder()).unwrap();
        assert_eq!(settings, Settings::default());
        assert_eq!(settings.base_url, "https://www.peakbagger.com");
        assert_eq!(settings.request_interval(), Duration::from_secs(2));
    }

    #[test]
    fn overrides_merge_with_defaults() {
        let builder = Config::builder()
            .set_override("rate_limit", 0.5)
            .unwrap()
            .set_override("base_url", "http://localhost:8080")
            .unwrap();
        let settings = Settings::from_builder(builder).unwrap();
        assert_eq!(settings.rate_limit, 0.5);
        assert_eq!(settings.base_url, "http://localhost:8080");
        assert_eq!(settings.timeout_secs, 30);
    }

    #[test]
    fn negative_rate_limit_is_rejected() {
        let builder = Config::builder().set_override("rate_limit", -1.0).unwrap();
        assert!(Settings::from_builder(builder).is_err());
    }
}
