//! Data models for `Skycast`
//!
//! This module contains the core domain models organized by concern:
//! - Location: coordinates, device positions, saved places
//! - Units: the unit systems forecasts are requested in
//! - Forecast: current, hourly and daily weather
//! - Photo: mood photos and their condition buckets
//! - Packet: the combined result handed to the presentation layer

pub mod forecast;
pub mod location;
pub mod packet;
pub mod photo;
pub mod units;

// Re-export all public types for convenient access
pub use forecast::{Conditions, DailyWeather, DayTemperatures, ForecastData, HourlyWeather};
pub use location::{Coordinates, LocationCandidate, Position, SavedLocation};
pub use packet::{PacketSource, WeatherPacket};
pub use photo::{PhotoBucket, PhotoData};
pub use units::UnitSystem;
