//! Location models: coordinates, saved places and geocoding candidates

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::SkycastError;

/// A point on the globe in decimal degrees.
///
/// Equality is exact floating-point comparison. Two GPS reads that differ in
/// the last decimal place are different coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    /// Latitude in decimal degrees
    pub latitude: f64,
    /// Longitude in decimal degrees
    pub longitude: f64,
}

impl Coordinates {
    #[must_use]
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// Bit patterns used for keying; `-0.0` and `0.0` compare equal and share a key
    #[must_use]
    pub fn key_bits(&self) -> (u64, u64) {
        ((self.latitude + 0.0).to_bits(), (self.longitude + 0.0).to_bits())
    }

    /// Parse coordinates from a string like "61.4991,23.7871" or "61.4991 23.7871"
    pub fn parse(input: &str) -> crate::Result<Self> {
        let parts: Vec<&str> = input
            .split(|c: char| c == ',' || c.is_whitespace())
            .filter(|s| !s.is_empty())
            .collect();

        if parts.len() != 2 {
            return Err(SkycastError::validation(
                "Coordinates must be in format 'lat,lon'",
            ));
        }

        let latitude = parts[0]
            .parse::<f64>()
            .map_err(|_| SkycastError::validation(format!("Invalid latitude: {}", parts[0])))?;
        let longitude = parts[1]
            .parse::<f64>()
            .map_err(|_| SkycastError::validation(format!("Invalid longitude: {}", parts[1])))?;

        if !(-90.0..=90.0).contains(&latitude) {
            return Err(SkycastError::validation(format!(
                "Latitude must be between -90 and 90, got: {latitude}"
            )));
        }

        if !(-180.0..=180.0).contains(&longitude) {
            return Err(SkycastError::validation(format!(
                "Longitude must be between -180 and 180, got: {longitude}"
            )));
        }

        Ok(Self::new(latitude, longitude))
    }
}

impl FromStr for Coordinates {
    type Err = SkycastError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s.trim())
    }
}

impl fmt::Display for Coordinates {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.4}, {:.4}", self.latitude, self.longitude)
    }
}

/// A device position reported by a location provider
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Position {
    pub coordinates: Coordinates,
    /// Horizontal accuracy radius, when the provider reports one
    pub accuracy_meters: Option<f64>,
    pub recorded_at: DateTime<Utc>,
}

impl Position {
    #[must_use]
    pub fn new(coordinates: Coordinates) -> Self {
        Self {
            coordinates,
            accuracy_meters: None,
            recorded_at: Utc::now(),
        }
    }
}

/// A location the user saved explicitly. Never expires.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SavedLocation {
    /// Location name (city, region, etc.)
    pub name: String,
    pub coordinates: Coordinates,
    /// Country code (ISO 3166-1 alpha-2)
    pub country: String,
}

impl SavedLocation {
    #[must_use]
    pub fn new(name: impl Into<String>, coordinates: Coordinates, country: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            coordinates,
            country: country.into(),
        }
    }

    /// Identity of a saved location: same name at the same exact coordinates
    #[must_use]
    pub fn same_place(&self, other: &SavedLocation) -> bool {
        self.name == other.name && self.coordinates == other.coordinates
    }
}

/// A single match from direct geocoding
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocationCandidate {
    pub name: String,
    #[serde(rename = "lat")]
    pub latitude: f64,
    #[serde(rename = "lon")]
    pub longitude: f64,
    /// Country code (ISO 3166-1 alpha-2)
    #[serde(default)]
    pub country: String,
}

impl LocationCandidate {
    #[must_use]
    pub fn coordinates(&self) -> Coordinates {
        Coordinates::new(self.latitude, self.longitude)
    }
}

impl From<LocationCandidate> for SavedLocation {
    fn from(candidate: LocationCandidate) -> Self {
        let coordinates = candidate.coordinates();
        SavedLocation::new(candidate.name, coordinates, candidate.country)
    }
}
