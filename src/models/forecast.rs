//! Forecast model: current conditions plus hourly and daily series

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Condition and time fields shared by every forecast entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Conditions {
    /// Provider condition code, e.g. 500 for light rain
    pub code: i32,
    /// Short condition group, e.g. "Rain"
    pub title: String,
    /// Human-readable description in the requested language
    pub description: String,
    /// Provider icon identifier, e.g. "10d"
    pub icon: String,
    /// Time the entry refers to
    pub time: DateTime<Utc>,
}

/// Current or hourly weather
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HourlyWeather {
    pub conditions: Conditions,
    pub temperature: f64,
    pub feels_like: f64,
    /// Atmospheric pressure in hPa
    pub pressure: u32,
    /// Relative humidity in percent
    pub humidity: u8,
    pub wind_speed: f64,
    /// Wind direction in degrees, 0 is North
    pub wind_direction: f64,
}

/// Temperatures over the course of one day
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DayTemperatures {
    pub morning: f64,
    pub day: f64,
    pub evening: f64,
    pub night: f64,
    pub min: f64,
    pub max: f64,
}

/// Daily weather
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyWeather {
    pub conditions: Conditions,
    pub temperatures: DayTemperatures,
    pub pressure: u32,
    pub humidity: u8,
    pub wind_speed: f64,
    pub wind_direction: f64,
}

/// A complete forecast for one place, in one unit system
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastData {
    pub latitude: f64,
    pub longitude: f64,
    /// IANA timezone name of the forecast location
    pub timezone: String,
    pub current: HourlyWeather,
    pub hourly: Vec<HourlyWeather>,
    pub daily: Vec<DailyWeather>,
}

impl ForecastData {
    /// Condition code of the current weather
    #[must_use]
    pub fn current_code(&self) -> i32 {
        self.current.conditions.code
    }
}
