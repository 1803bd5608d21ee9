//! `Skycast` - weather forecasts with mood photos
//!
//! This library acquires forecasts, reverse-geocoded place names and
//! condition-matched photos, caches the combination per request, and
//! resolves the device location with a bounded one-shot request.

pub mod api;
pub mod cache;
pub mod config;
pub mod error;
pub mod geolocation;
pub mod locations;
pub mod logging;
pub mod models;
pub mod orchestrator;
pub mod store;

// Re-export core types for public API
pub use api::{ForecastClient, ForecastSource, HttpImageLoader, ImageLoader, PhotoClient, PhotoSource};
pub use cache::{CacheKey, CachedEntry, FjallForecastCache, ForecastCache, MemoryForecastCache};
pub use config::SkycastConfig;
pub use error::{FetchStage, SkycastError};
pub use geolocation::{GeolocationRequester, GeolocationState, LocationEvent, LocationProvider};
pub use locations::{CurrentLocationSink, LocationStore};
pub use models::{Coordinates, ForecastData, PhotoData, Position, UnitSystem, WeatherPacket};
pub use orchestrator::{FetchState, ForecastOrchestrator};
pub use store::Store;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Core result type used throughout the library
pub type Result<T> = std::result::Result<T, SkycastError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_is_set() {
        assert!(!VERSION.is_empty());
    }
}
