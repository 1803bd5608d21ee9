//! Unit systems understood by the forecast provider

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::SkycastError;

/// Countries that report temperatures in Fahrenheit
const FAHRENHEIT_COUNTRIES: [&str; 7] = ["us", "bs", "ky", "lr", "pw", "fm", "mh"];

/// Unit system a forecast is requested (and cached) in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum UnitSystem {
    /// Celsius, meters per second
    #[default]
    Metric,
    /// Fahrenheit, miles per hour
    Imperial,
    /// Kelvin, meters per second
    Standard,
}

impl UnitSystem {
    /// Wire name used in the forecast request
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            UnitSystem::Metric => "metric",
            UnitSystem::Imperial => "imperial",
            UnitSystem::Standard => "standard",
        }
    }

    /// Parse user or config input, falling back to `default` for anything unrecognized
    #[must_use]
    pub fn parse_or(input: &str, default: UnitSystem) -> UnitSystem {
        input.parse().unwrap_or_else(|_| {
            tracing::debug!("Unrecognized unit system '{}', using {}", input, default);
            default
        })
    }

    /// Default unit system for an ISO 3166-1 alpha-2 country code
    #[must_use]
    pub fn default_for_country(country: &str) -> UnitSystem {
        let country = country.trim().to_ascii_lowercase();
        if FAHRENHEIT_COUNTRIES.contains(&country.as_str()) {
            UnitSystem::Imperial
        } else {
            UnitSystem::Metric
        }
    }
}

impl FromStr for UnitSystem {
    type Err = SkycastError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "metric" => Ok(UnitSystem::Metric),
            "imperial" => Ok(UnitSystem::Imperial),
            "standard" => Ok(UnitSystem::Standard),
            other => Err(SkycastError::validation(format!(
                "Unknown unit system '{other}'. Must be one of: metric, imperial, standard"
            ))),
        }
    }
}

impl fmt::Display for UnitSystem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
