//! Configuration management for `Skycast`
//!
//! Handles loading configuration from files, environment variables,
//! and provides validation for all configuration settings.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};

use crate::SkycastError;
use crate::models::UnitSystem;

/// Root configuration structure for `Skycast`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SkycastConfig {
    /// Forecast and geocoding API configuration
    pub forecast: ForecastApiConfig,
    /// Photo API configuration
    pub photos: PhotoApiConfig,
    /// Cache configuration
    pub cache: CacheConfig,
    /// Device location request configuration
    pub geolocation: GeolocationConfig,
    /// Logging configuration
    pub logging: LoggingConfig,
    /// Default application settings
    pub defaults: DefaultsConfig,
}

/// Forecast provider settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ForecastApiConfig {
    /// Key sent as the `appid` query parameter
    pub api_key: String,
    pub base_url: String,
    /// Language of condition descriptions
    pub language: String,
    pub timeout_seconds: u32,
    pub max_requests_per_minute: u32,
}

/// Photo provider settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PhotoApiConfig {
    /// Key sent in the `Authorization` header
    pub api_key: String,
    pub base_url: String,
    pub timeout_seconds: u32,
    pub max_requests_per_hour: u32,
}

/// Cache configuration settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// How long a stored forecast stays fresh, in minutes
    pub ttl_minutes: u32,
    /// Store directory location
    pub location: String,
}

/// Device location request settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeolocationConfig {
    /// Deadline for a one-shot location request
    pub timeout_ms: u64,
    /// Requested interval between provider updates
    pub interval_ms: u64,
}

/// Logging configuration settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (error, warn, info, debug, trace)
    pub level: String,
    /// Log format (pretty or json)
    pub format: String,
}

/// Default application settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DefaultsConfig {
    /// Unit system; unrecognized values fall back to the country default
    pub units: String,
    /// ISO 3166-1 alpha-2 country code used to pick the default unit system
    pub country: String,
}

// Default value functions
fn default_forecast_base_url() -> String {
    "https://api.openweathermap.org".to_string()
}

fn default_photo_base_url() -> String {
    "https://api.pexels.com/v1".to_string()
}

fn default_language() -> String {
    "en".to_string()
}

fn default_timeout() -> u32 {
    30
}

fn default_max_requests_per_minute() -> u32 {
    60
}

fn default_max_requests_per_hour() -> u32 {
    200
}

fn default_cache_ttl() -> u32 {
    60
}

fn default_cache_location() -> String {
    dirs::cache_dir()
        .map(|dir| dir.join("skycast").to_string_lossy().into_owned())
        .unwrap_or_else(|| ".skycast".to_string())
}

fn default_geolocation_timeout() -> u64 {
    15_000
}

fn default_geolocation_interval() -> u64 {
    1_000
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl Default for ForecastApiConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: default_forecast_base_url(),
            language: default_language(),
            timeout_seconds: default_timeout(),
            max_requests_per_minute: default_max_requests_per_minute(),
        }
    }
}

impl Default for PhotoApiConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: default_photo_base_url(),
            timeout_seconds: default_timeout(),
            max_requests_per_hour: default_max_requests_per_hour(),
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl_minutes: default_cache_ttl(),
            location: default_cache_location(),
        }
    }
}

impl Default for GeolocationConfig {
    fn default() -> Self {
        Self {
            timeout_ms: default_geolocation_timeout(),
            interval_ms: default_geolocation_interval(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

impl CacheConfig {
    #[must_use]
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(u64::from(self.ttl_minutes) * 60)
    }
}

impl GeolocationConfig {
    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    #[must_use]
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }
}

impl DefaultsConfig {
    /// Configured unit system, normalized against the country default
    #[must_use]
    pub fn unit_system(&self) -> UnitSystem {
        UnitSystem::parse_or(&self.units, UnitSystem::default_for_country(&self.country))
    }
}

impl SkycastConfig {
    /// Load configuration from file and environment variables
    pub fn load() -> Result<Self> {
        Self::load_from_path(None)
    }

    /// Load configuration from specified path
    pub fn load_from_path(config_path: Option<PathBuf>) -> Result<Self> {
        let mut builder = Config::builder();

        let config_file = config_path.unwrap_or_else(|| {
            Self::get_config_path().unwrap_or_else(|| PathBuf::from("config.toml"))
        });

        if config_file.exists() {
            builder = builder.add_source(
                File::from(config_file.clone())
                    .required(false)
                    .format(config::FileFormat::Toml),
            );
        }

        // SKYCAST_FORECAST__API_KEY overrides forecast.api_key
        builder = builder.add_source(
            Environment::with_prefix("SKYCAST")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let settings = builder
            .build()
            .with_context(|| "Failed to build configuration")?;

        let mut config: SkycastConfig = settings
            .try_deserialize()
            .with_context(|| "Failed to deserialize configuration")?;

        config.apply_defaults();
        config.validate()?;

        Ok(config)
    }

    /// Get the default configuration file path
    #[must_use]
    pub fn get_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("skycast").join("config.toml"))
    }

    /// Apply default values to missing configuration fields
    pub fn apply_defaults(&mut self) {
        if self.forecast.base_url.is_empty() {
            self.forecast.base_url = default_forecast_base_url();
        }
        if self.forecast.language.is_empty() {
            self.forecast.language = default_language();
        }
        if self.forecast.timeout_seconds == 0 {
            self.forecast.timeout_seconds = default_timeout();
        }
        if self.forecast.max_requests_per_minute == 0 {
            self.forecast.max_requests_per_minute = default_max_requests_per_minute();
        }
        if self.photos.base_url.is_empty() {
            self.photos.base_url = default_photo_base_url();
        }
        if self.photos.timeout_seconds == 0 {
            self.photos.timeout_seconds = default_timeout();
        }
        if self.photos.max_requests_per_hour == 0 {
            self.photos.max_requests_per_hour = default_max_requests_per_hour();
        }
        if self.cache.ttl_minutes == 0 {
            self.cache.ttl_minutes = default_cache_ttl();
        }
        if self.cache.location.is_empty() {
            self.cache.location = default_cache_location();
        }
        if self.geolocation.timeout_ms == 0 {
            self.geolocation.timeout_ms = default_geolocation_timeout();
        }
        if self.geolocation.interval_ms == 0 {
            self.geolocation.interval_ms = default_geolocation_interval();
        }
        if self.logging.level.is_empty() {
            self.logging.level = default_log_level();
        }
        if self.logging.format.is_empty() {
            self.logging.format = default_log_format();
        }
    }

    /// Validate all configuration settings
    pub fn validate(&self) -> Result<()> {
        self.validate_api_keys()?;
        self.validate_numeric_ranges()?;
        self.validate_string_values()?;
        Ok(())
    }

    /// Keys are optional at load time; clients refuse to start without them
    pub fn validate_api_keys(&self) -> Result<()> {
        for (name, key) in [
            ("Forecast", &self.forecast.api_key),
            ("Photo", &self.photos.api_key),
        ] {
            if key.is_empty() {
                continue;
            }
            if key.trim() != key {
                return Err(SkycastError::config(format!(
                    "{name} API key contains surrounding whitespace. Please check your API key."
                ))
                .into());
            }
            if key.len() > 100 {
                return Err(SkycastError::config(format!(
                    "{name} API key appears to be invalid (too long). Please check your API key."
                ))
                .into());
            }
        }

        Ok(())
    }

    /// Validate numeric configuration ranges
    fn validate_numeric_ranges(&self) -> Result<()> {
        if self.forecast.timeout_seconds > 300 || self.photos.timeout_seconds > 300 {
            return Err(SkycastError::config("API timeout cannot exceed 300 seconds").into());
        }

        if self.cache.ttl_minutes > 24 * 60 {
            return Err(SkycastError::config("Cache TTL cannot exceed 1440 minutes (1 day)").into());
        }

        if self.geolocation.timeout_ms > 120_000 {
            return Err(
                SkycastError::config("Location request timeout cannot exceed 120000 ms").into(),
            );
        }

        if self.geolocation.interval_ms > self.geolocation.timeout_ms {
            return Err(SkycastError::config(
                "Location update interval cannot exceed the request timeout",
            )
            .into());
        }

        Ok(())
    }

    /// Validate string configuration values
    fn validate_string_values(&self) -> Result<()> {
        let valid_log_levels = ["error", "warn", "info", "debug", "trace"];
        if !valid_log_levels.contains(&self.logging.level.as_str()) {
            return Err(SkycastError::config(format!(
                "Invalid log level '{}'. Must be one of: {}",
                self.logging.level,
                valid_log_levels.join(", ")
            ))
            .into());
        }

        let valid_log_formats = ["pretty", "json"];
        if !valid_log_formats.contains(&self.logging.format.as_str()) {
            return Err(SkycastError::config(format!(
                "Invalid log format '{}'. Must be one of: {}",
                self.logging.format,
                valid_log_formats.join(", ")
            ))
            .into());
        }

        for base_url in [&self.forecast.base_url, &self.photos.base_url] {
            if !base_url.starts_with("http://") && !base_url.starts_with("https://") {
                return Err(SkycastError::config(format!(
                    "API base URL '{base_url}' must be a valid HTTP or HTTPS URL"
                ))
                .into());
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = SkycastConfig::default();
        assert_eq!(config.forecast.base_url, "https://api.openweathermap.org");
        assert_eq!(config.photos.base_url, "https://api.pexels.com/v1");
        assert_eq!(config.forecast.language, "en");
        assert_eq!(config.cache.ttl(), Duration::from_secs(3600));
        assert_eq!(config.geolocation.timeout(), Duration::from_secs(15));
        assert_eq!(config.logging.level, "info");
        assert!(config.forecast.api_key.is_empty());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_unit_system_falls_back_to_country_default() {
        let mut config = SkycastConfig::default();
        config.defaults.country = "US".to_string();
        config.defaults.units = "bogus".to_string();
        assert_eq!(config.defaults.unit_system(), UnitSystem::Imperial);

        config.defaults.units = "standard".to_string();
        assert_eq!(config.defaults.unit_system(), UnitSystem::Standard);
    }

    #[test]
    fn test_config_validation_invalid_log_level() {
        let mut config = SkycastConfig::default();
        config.logging.level = "invalid".to_string();
        let result = config.validate();
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("Invalid log level"));
    }

    #[test]
    fn test_config_validation_numeric_ranges() {
        let mut config = SkycastConfig::default();
        config.forecast.timeout_seconds = 500;
        let result = config.validate();
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("timeout cannot exceed"));
    }

    #[test]
    fn test_config_validation_base_url() {
        let mut config = SkycastConfig::default();
        config.photos.base_url = "ftp://example.com".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_apply_defaults_fills_zeroes() {
        let mut config = SkycastConfig::default();
        config.cache.ttl_minutes = 0;
        config.forecast.base_url.clear();
        config.apply_defaults();
        assert_eq!(config.cache.ttl_minutes, 60);
        assert_eq!(config.forecast.base_url, "https://api.openweathermap.org");
    }

    #[test]
    fn test_load_from_toml_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            "[forecast]\napi_key = \"owm_key_123\"\nlanguage = \"fi\"\n\n[cache]\nttl_minutes = 30\n",
        )
        .unwrap();

        let config = SkycastConfig::load_from_path(Some(path)).unwrap();
        assert_eq!(config.forecast.api_key, "owm_key_123");
        assert_eq!(config.forecast.language, "fi");
        assert_eq!(config.cache.ttl(), Duration::from_secs(1800));
        assert_eq!(config.photos.max_requests_per_hour, 200);
    }

    #[test]
    fn test_config_path_generation() {
        if let Some(path) = SkycastConfig::get_config_path() {
            assert!(path.to_string_lossy().contains("skycast"));
            assert!(path.to_string_lossy().contains("config.toml"));
        }
    }
}
