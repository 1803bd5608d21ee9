//! Forecast cache keyed by request parameters
//!
//! The cache only stores and returns entries. Whether an entry is still fresh
//! is decided by the caller through [`CachedEntry::is_fresh`].

use std::collections::HashMap;
use std::time::Duration;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::models::{Coordinates, ForecastData, PhotoData, UnitSystem};
use crate::store::{Blobs, Store};
use crate::{Result, SkycastError};

/// Identifies one forecast request
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CacheKey {
    pub coordinates: Coordinates,
    pub units: UnitSystem,
}

impl CacheKey {
    #[must_use]
    pub fn new(coordinates: Coordinates, units: UnitSystem) -> Self {
        Self { coordinates, units }
    }

    /// Exact bit patterns of both coordinates plus the unit system
    #[must_use]
    pub fn storage_key(&self) -> String {
        let (lat, lon) = self.coordinates.key_bits();
        format!("forecast:{lat:016x}:{lon:016x}:{}", self.units)
    }
}

/// A stored fetch result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CachedEntry {
    pub key: CacheKey,
    pub location_name: String,
    /// Unix time in milliseconds at which the entry was written
    pub stored_at_millis: i64,
    pub forecast: ForecastData,
    pub photo: PhotoData,
}

impl CachedEntry {
    /// Fresh iff strictly younger than `ttl`
    #[must_use]
    pub fn is_fresh(&self, now_millis: i64, ttl: Duration) -> bool {
        let ttl_millis = i64::try_from(ttl.as_millis()).unwrap_or(i64::MAX);
        now_millis.saturating_sub(self.stored_at_millis) < ttl_millis
    }
}

/// Storage for fetch results. `put` replaces any entry with the same key.
pub trait ForecastCache: Send + Sync {
    fn get(&self, key: &CacheKey) -> Result<Option<CachedEntry>>;
    fn put(&self, entry: CachedEntry) -> Result<()>;
}

/// Persistent cache in the store's forecast keyspace
pub struct FjallForecastCache {
    blobs: Blobs,
}

impl FjallForecastCache {
    #[must_use]
    pub fn new(store: &Store) -> Self {
        Self {
            blobs: store.forecasts(),
        }
    }
}

impl ForecastCache for FjallForecastCache {
    #[instrument(name = "query_cache", level = "debug", skip(self))]
    fn get(&self, key: &CacheKey) -> Result<Option<CachedEntry>> {
        let entry: Option<CachedEntry> = self
            .blobs
            .get(&key.storage_key())
            .map_err(|e| SkycastError::cache(format!("{e:#}")))?;

        match &entry {
            Some(_) => debug!("Key found"),
            None => debug!("Key not found"),
        }
        Ok(entry)
    }

    #[instrument(name = "put_cache", level = "debug", skip(self, entry), fields(key = ?entry.key))]
    fn put(&self, entry: CachedEntry) -> Result<()> {
        self.blobs
            .put(&entry.key.storage_key(), &entry)
            .map_err(|e| SkycastError::cache(format!("{e:#}")))
    }
}

/// In-process cache, used when no store directory is available
#[derive(Default)]
pub struct MemoryForecastCache {
    entries: Mutex<HashMap<String, CachedEntry>>,
}

impl MemoryForecastCache {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}

impl ForecastCache for MemoryForecastCache {
    fn get(&self, key: &CacheKey) -> Result<Option<CachedEntry>> {
        Ok(self.entries.lock().get(&key.storage_key()).cloned())
    }

    fn put(&self, entry: CachedEntry) -> Result<()> {
        self.entries.lock().insert(entry.key.storage_key(), entry);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Conditions, HourlyWeather};
    use chrono::DateTime;
    use rstest::rstest;

    fn forecast(code: i32) -> ForecastData {
        let current = HourlyWeather {
            conditions: Conditions {
                code,
                title: "Rain".to_string(),
                description: "moderate rain".to_string(),
                icon: "10d".to_string(),
                time: DateTime::from_timestamp(1_700_000_000, 0).unwrap(),
            },
            temperature: 4.0,
            feels_like: 1.0,
            pressure: 1008,
            humidity: 93,
            wind_speed: 6.2,
            wind_direction: 225.0,
        };
        ForecastData {
            latitude: 61.4991,
            longitude: 23.7871,
            timezone: "Europe/Helsinki".to_string(),
            current: current.clone(),
            hourly: vec![current],
            daily: Vec::new(),
        }
    }

    fn entry(key: CacheKey, stored_at_millis: i64) -> CachedEntry {
        CachedEntry {
            key,
            location_name: "Tampere".to_string(),
            stored_at_millis,
            forecast: forecast(500),
            photo: PhotoData {
                photographer: "Jane Doe".to_string(),
                page_url: "https://www.pexels.com/photo/1/".to_string(),
                original: "https://images.pexels.com/1.jpeg".to_string(),
                portrait: "https://images.pexels.com/1-portrait.jpeg".to_string(),
                landscape: "https://images.pexels.com/1-landscape.jpeg".to_string(),
            },
        }
    }

    fn tampere(units: UnitSystem) -> CacheKey {
        CacheKey::new(Coordinates::new(61.4991, 23.7871), units)
    }

    #[rstest]
    #[case(0, true)]
    #[case(3_599_999, true)]
    #[case(3_600_000, false)]
    #[case(7_200_000, false)]
    fn test_freshness_boundary(#[case] age_millis: i64, #[case] fresh: bool) {
        let stored = 1_700_000_000_000;
        let entry = entry(tampere(UnitSystem::Metric), stored);
        assert_eq!(
            entry.is_fresh(stored + age_millis, Duration::from_secs(3600)),
            fresh
        );
    }

    #[test]
    fn test_storage_key_distinguishes_units() {
        assert_ne!(
            tampere(UnitSystem::Metric).storage_key(),
            tampere(UnitSystem::Imperial).storage_key()
        );
    }

    #[test]
    fn test_storage_key_folds_negative_zero() {
        let positive = CacheKey::new(Coordinates::new(0.0, 10.0), UnitSystem::Metric);
        let negative = CacheKey::new(Coordinates::new(-0.0, 10.0), UnitSystem::Metric);
        assert_eq!(positive.storage_key(), negative.storage_key());
    }

    #[test]
    fn test_memory_cache_upserts() {
        let cache = MemoryForecastCache::new();
        let key = tampere(UnitSystem::Metric);

        assert!(cache.get(&key).unwrap().is_none());
        cache.put(entry(key, 1)).unwrap();
        cache.put(entry(key, 2)).unwrap();

        assert_eq!(cache.len(), 1);
        assert_eq!(cache.get(&key).unwrap().unwrap().stored_at_millis, 2);
    }

    #[test]
    fn test_fjall_cache_round_trip() {
        let dir = tempfile::TempDir::new().unwrap();
        let store = Store::open(dir.path()).unwrap();
        let cache = FjallForecastCache::new(&store);
        let key = tampere(UnitSystem::Imperial);

        cache.put(entry(key, 42)).unwrap();

        assert_eq!(cache.get(&key).unwrap().unwrap(), entry(key, 42));
        assert!(cache.get(&tampere(UnitSystem::Metric)).unwrap().is_none());
    }
}
