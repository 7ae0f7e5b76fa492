use std::env;
use std::str::FromStr;
use std::time::Duration;

use crate::services::SavePolicy;
use crate::stations::{default_stations, find_station, StationConfig, DEFAULT_REFERENCE_STATION};

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Reference station '{0}' is not a configured station")]
    UnknownReferenceStation(String),
}

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub server_host: String,
    pub server_port: u16,
    pub scrape_interval_minutes: u64,
    pub request_delay_secs: u64,
    pub fetch_timeout_secs: u64,
    pub reference_station_code: String,
    pub incremental_save: bool,
    pub stations: Vec<StationConfig>,
}

/// Read and parse an env var, falling back to `default` when unset or invalid
fn env_or<T: FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|value| value.trim().parse().ok())
        .unwrap_or(default)
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        let config = Config {
            database_url: env::var("DATABASE_URL")
                .unwrap_or_else(|_| "sqlite://weather_data.db".to_string()),
            server_host: env::var("SERVER_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            server_port: env_or("SERVER_PORT", 8000),
            scrape_interval_minutes: env_or("SCRAPE_INTERVAL_MINUTES", 15),
            request_delay_secs: env_or("REQUEST_DELAY_SECS", 2),
            fetch_timeout_secs: env_or("FETCH_TIMEOUT_SECS", 15),
            reference_station_code: env::var("REFERENCE_STATION_CODE")
                .unwrap_or_else(|_| DEFAULT_REFERENCE_STATION.to_string()),
            incremental_save: env_or("INCREMENTAL_SAVE", false),
            stations: default_stations(),
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if find_station(&self.stations, &self.reference_station_code).is_none() {
            return Err(ConfigError::UnknownReferenceStation(
                self.reference_station_code.clone(),
            ));
        }
        Ok(())
    }

    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.server_host, self.server_port)
    }

    pub fn save_policy(&self) -> SavePolicy {
        if self.incremental_save {
            SavePolicy::Incremental
        } else {
            SavePolicy::All
        }
    }

    pub fn request_delay(&self) -> Duration {
        Duration::from_secs(self.request_delay_secs)
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }
}
