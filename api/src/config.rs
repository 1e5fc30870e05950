use std::str::FromStr;

use crate::errors::ConfigError;

const DEFAULT_OPENWEATHER_BASE_URL: &str = "https://api.openweathermap.org/data/2.5";
const DEFAULT_MONITORED_CITIES: &str = "Delhi,Mumbai,Chennai,Bangalore,Kolkata,Hyderabad";
const DEFAULT_POLL_INTERVAL_SECS: u64 = 300;
const DEFAULT_PROVIDER_TIMEOUT_SECS: u64 = 10;
const DEFAULT_PORT: u16 = 5001;

/// Application configuration, parsed from environment variables.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub openweather_api_key: String,
    pub openweather_base_url: String,
    /// Cities polled by the scheduler every cycle.
    pub monitored_cities: Vec<String>,
    /// Sleep between the end of one cycle and the start of the next.
    pub poll_interval_secs: u64,
    pub provider_timeout_secs: u64,
    pub port: u16,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the config from an arbitrary key lookup (the process environment in
    /// production, a map in tests).
    fn from_lookup<F>(get: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let database_url = required(&get, "DATABASE_URL")?;
        let openweather_api_key = required(&get, "OPENWEATHERMAP_API_KEY")?;
        let openweather_base_url = get("OPENWEATHERMAP_BASE_URL")
            .unwrap_or_else(|| DEFAULT_OPENWEATHER_BASE_URL.to_string())
            .trim_end_matches('/')
            .to_string();

        let monitored_cities = parse_city_list(
            &get("MONITORED_CITIES").unwrap_or_else(|| DEFAULT_MONITORED_CITIES.to_string()),
        );
        if monitored_cities.is_empty() {
            return Err(ConfigError::NoCities);
        }

        let poll_interval_secs: u64 =
            parse_or_default(&get, "POLL_INTERVAL_SECS", DEFAULT_POLL_INTERVAL_SECS)?;
        if poll_interval_secs == 0 {
            return Err(ConfigError::Invalid {
                key: "POLL_INTERVAL_SECS".to_string(),
                value: "0".to_string(),
                expected: "positive number of seconds",
            });
        }

        Ok(Self {
            database_url,
            openweather_api_key,
            openweather_base_url,
            monitored_cities,
            poll_interval_secs,
            provider_timeout_secs: parse_or_default(
                &get,
                "PROVIDER_TIMEOUT_SECS",
                DEFAULT_PROVIDER_TIMEOUT_SECS,
            )?,
            port: parse_or_default(&get, "PORT", DEFAULT_PORT)?,
        })
    }
}

fn required<F>(get: &F, key: &str) -> Result<String, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    get(key)
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| ConfigError::Missing(key.to_string()))
}

fn parse_or_default<F, T>(get: &F, key: &str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match get(key) {
        None => Ok(default),
        Some(raw) => raw.trim().parse().map_err(|_| ConfigError::Invalid {
            key: key.to_string(),
            value: raw,
            expected: std::any::type_name::<T>(),
        }),
    }
}

/// Split a comma-separated city list, dropping blank entries.
pub fn parse_city_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .map(str::to_string)
        .collect()
}
