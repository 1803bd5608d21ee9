//! Orchestrator behaviour against in-memory sources

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use skycast::api::{ForecastSource, ImageLoader, PhotoSource};
use skycast::cache::{CacheKey, CachedEntry, ForecastCache, MemoryForecastCache};
use skycast::error::FetchStage;
use skycast::locations::CurrentLocationSink;
use skycast::models::{
    Conditions, Coordinates, ForecastData, HourlyWeather, LocationCandidate, PacketSource,
    PhotoBucket, PhotoData, UnitSystem,
};
use skycast::orchestrator::{FetchState, ForecastOrchestrator};
use skycast::{Result, SkycastError};

const TTL: Duration = Duration::from_secs(3600);

fn tampere() -> Coordinates {
    Coordinates::new(61.4991, 23.7871)
}

fn forecast(code: i32) -> ForecastData {
    let current = HourlyWeather {
        conditions: Conditions {
            code,
            title: "Rain".to_string(),
            description: "moderate rain".to_string(),
            icon: "10d".to_string(),
            time: DateTime::from_timestamp(1_700_000_000, 0).unwrap(),
        },
        temperature: 2.0,
        feels_like: -1.0,
        pressure: 1004,
        humidity: 96,
        wind_speed: 5.0,
        wind_direction: 190.0,
    };
    ForecastData {
        latitude: 61.4991,
        longitude: 23.7871,
        timezone: "Europe/Helsinki".to_string(),
        current: current.clone(),
        hourly: vec![current; 48],
        daily: Vec::new(),
    }
}

fn photo(id: u32) -> PhotoData {
    PhotoData {
        photographer: format!("Photographer {id}"),
        page_url: format!("https://www.pexels.com/photo/{id}/"),
        original: format!("https://images.pexels.com/{id}.jpeg"),
        portrait: format!("https://images.pexels.com/{id}-portrait.jpeg"),
        landscape: format!("https://images.pexels.com/{id}-landscape.jpeg"),
    }
}

struct FakeForecasts {
    code: i32,
    requested_units: Mutex<Vec<UnitSystem>>,
    name_calls: AtomicUsize,
    fail_forecast: AtomicBool,
    fail_name: AtomicBool,
}

impl FakeForecasts {
    fn new(code: i32) -> Self {
        Self {
            code,
            requested_units: Mutex::new(Vec::new()),
            name_calls: AtomicUsize::new(0),
            fail_forecast: AtomicBool::new(false),
            fail_name: AtomicBool::new(false),
        }
    }

    fn forecast_calls(&self) -> usize {
        self.requested_units.lock().len()
    }
}

impl ForecastSource for FakeForecasts {
    fn fetch_forecast(&self, _coordinates: Coordinates, units: UnitSystem) -> Result<ForecastData> {
        self.requested_units.lock().push(units);
        if self.fail_forecast.load(Ordering::SeqCst) {
            return Err(SkycastError::network("connection refused"));
        }
        Ok(forecast(self.code))
    }

    fn fetch_location_name(&self, _coordinates: Coordinates) -> Result<String> {
        self.name_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_name.load(Ordering::SeqCst) {
            return Err(SkycastError::empty_set("no place here"));
        }
        Ok("Tampere".to_string())
    }

    fn search_locations(&self, _query: &str) -> Result<Vec<LocationCandidate>> {
        Ok(Vec::new())
    }
}

struct FakePhotos {
    photos: Vec<PhotoData>,
    requested: Mutex<Vec<String>>,
}

impl FakePhotos {
    fn new(photos: Vec<PhotoData>) -> Self {
        Self {
            photos,
            requested: Mutex::new(Vec::new()),
        }
    }
}

impl PhotoSource for FakePhotos {
    fn fetch_collection(&self, collection_id: &str) -> Result<Vec<PhotoData>> {
        self.requested.lock().push(collection_id.to_string());
        Ok(self.photos.clone())
    }
}

#[derive(Default)]
struct FakeImages {
    calls: AtomicUsize,
    fail: AtomicBool,
}

impl ImageLoader for FakeImages {
    fn load(&self, _url: &str) -> Result<image::RgbaImage> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail.load(Ordering::SeqCst) {
            return Err(SkycastError::network("image host unreachable"));
        }
        Ok(image::RgbaImage::new(4, 6))
    }
}

/// Memory cache whose reads and writes can be made to fail
#[derive(Default)]
struct FlakyCache {
    inner: MemoryForecastCache,
    fail_get: AtomicBool,
    fail_put: AtomicBool,
}

impl ForecastCache for FlakyCache {
    fn get(&self, key: &CacheKey) -> Result<Option<CachedEntry>> {
        if self.fail_get.load(Ordering::SeqCst) {
            return Err(SkycastError::cache("read failed"));
        }
        self.inner.get(key)
    }

    fn put(&self, entry: CachedEntry) -> Result<()> {
        if self.fail_put.load(Ordering::SeqCst) {
            return Err(SkycastError::cache("disk full"));
        }
        self.inner.put(entry)
    }
}

#[derive(Default)]
struct RecordingSink {
    updates: Mutex<Vec<(String, Coordinates)>>,
}

impl CurrentLocationSink for RecordingSink {
    fn set_current_location(&self, name: &str, coordinates: Coordinates) {
        self.updates.lock().push((name.to_string(), coordinates));
    }
}

struct Harness {
    forecasts: Arc<FakeForecasts>,
    photos: Arc<FakePhotos>,
    images: Arc<FakeImages>,
    cache: Arc<FlakyCache>,
    orchestrator: ForecastOrchestrator,
}

impl Harness {
    fn new(code: i32, photos: Vec<PhotoData>) -> Self {
        let forecasts = Arc::new(FakeForecasts::new(code));
        let photos = Arc::new(FakePhotos::new(photos));
        let images = Arc::new(FakeImages::default());
        let cache = Arc::new(FlakyCache::default());
        let orchestrator = ForecastOrchestrator::new(
            forecasts.clone(),
            photos.clone(),
            images.clone(),
            cache.clone(),
            TTL,
            UnitSystem::Metric,
        );
        Self {
            forecasts,
            photos,
            images,
            cache,
            orchestrator,
        }
    }

    fn rainy() -> Self {
        Self::new(500, vec![photo(1), photo(2), photo(3)])
    }
}

#[tokio::test]
async fn test_second_fetch_within_ttl_uses_cache() {
    let h = Harness::rainy();

    let first = h
        .orchestrator
        .fetch_weather(tampere(), UnitSystem::Metric)
        .await
        .unwrap();
    let second = h
        .orchestrator
        .fetch_weather(tampere(), UnitSystem::Metric)
        .await
        .unwrap();

    assert_eq!(first.source, PacketSource::Network);
    assert_eq!(second.source, PacketSource::Cache);
    assert_eq!(second.location_name, "Tampere");
    assert_eq!(second.photo, first.photo);
    assert_eq!(second.forecast, first.forecast);
    assert_eq!(h.forecasts.forecast_calls(), 1);
    assert_eq!(h.forecasts.name_calls.load(Ordering::SeqCst), 1);
    assert_eq!(h.photos.requested.lock().len(), 1);
    // The cached photo is materialized again on a hit
    assert_eq!(h.images.calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_condition_code_selects_collection() {
    let h = Harness::rainy();

    let packet = h
        .orchestrator
        .fetch_weather(tampere(), UnitSystem::Metric)
        .await
        .unwrap();

    assert_eq!(
        *h.photos.requested.lock(),
        vec![PhotoBucket::Rain.collection_id().to_string()]
    );
    assert!(h.photos.photos.contains(&packet.photo));
    assert_eq!(packet.forecast.hourly.len(), 48);
    assert_eq!((packet.image.width(), packet.image.height()), (4, 6));
}

#[tokio::test]
async fn test_unit_systems_are_cached_separately() {
    let h = Harness::rainy();

    for units in [UnitSystem::Metric, UnitSystem::Imperial, UnitSystem::Metric, UnitSystem::Imperial] {
        h.orchestrator.fetch_weather(tampere(), units).await.unwrap();
    }

    assert_eq!(
        *h.forecasts.requested_units.lock(),
        vec![UnitSystem::Metric, UnitSystem::Imperial]
    );
    assert_eq!(h.cache.inner.len(), 2);
}

#[tokio::test]
async fn test_stale_entry_is_refetched() {
    let h = Harness::rainy();
    let key = CacheKey::new(tampere(), UnitSystem::Metric);
    let two_hours_ago = Utc::now().timestamp_millis() - 2 * 3_600_000;
    h.cache
        .put(CachedEntry {
            key,
            location_name: "Old Tampere".to_string(),
            stored_at_millis: two_hours_ago,
            forecast: forecast(800),
            photo: photo(9),
        })
        .unwrap();

    let packet = h
        .orchestrator
        .fetch_weather(tampere(), UnitSystem::Metric)
        .await
        .unwrap();

    assert_eq!(packet.source, PacketSource::Network);
    assert_eq!(packet.location_name, "Tampere");
    assert_eq!(h.forecasts.forecast_calls(), 1);
    let stored = h.cache.get(&key).unwrap().unwrap();
    assert!(stored.stored_at_millis > two_hours_ago);
}

#[tokio::test]
async fn test_empty_photo_collection_fails_fetch() {
    let h = Harness::new(803, Vec::new());

    let err = h
        .orchestrator
        .fetch_weather(tampere(), UnitSystem::Metric)
        .await
        .unwrap_err();

    assert_eq!(err.stage(), Some(FetchStage::PhotoCollection));
    assert_eq!(err.to_string(), "Request failed");
    assert_eq!(err.user_message(), "Request failed");
    let cause = std::error::Error::source(&err).unwrap().to_string();
    assert!(cause.starts_with("Empty result"), "unexpected cause: {cause}");
    assert!(h.cache.inner.is_empty());
    assert_eq!(h.forecasts.name_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_each_stage_failure_is_reported() {
    let h = Harness::rainy();
    h.forecasts.fail_forecast.store(true, Ordering::SeqCst);
    let err = h
        .orchestrator
        .fetch_weather(tampere(), UnitSystem::Metric)
        .await
        .unwrap_err();
    assert_eq!(err.stage(), Some(FetchStage::Forecast));

    h.forecasts.fail_forecast.store(false, Ordering::SeqCst);
    h.images.fail.store(true, Ordering::SeqCst);
    let err = h
        .orchestrator
        .fetch_weather(tampere(), UnitSystem::Metric)
        .await
        .unwrap_err();
    assert_eq!(err.stage(), Some(FetchStage::Image));

    h.images.fail.store(false, Ordering::SeqCst);
    h.forecasts.fail_name.store(true, Ordering::SeqCst);
    let err = h
        .orchestrator
        .fetch_weather(tampere(), UnitSystem::Metric)
        .await
        .unwrap_err();
    assert_eq!(err.stage(), Some(FetchStage::LocationName));

    assert!(h.cache.inner.is_empty());
}

#[tokio::test]
async fn test_cached_image_failure_does_not_fall_through() {
    let h = Harness::rainy();
    h.orchestrator
        .fetch_weather(tampere(), UnitSystem::Metric)
        .await
        .unwrap();

    h.images.fail.store(true, Ordering::SeqCst);
    let err = h
        .orchestrator
        .fetch_weather(tampere(), UnitSystem::Metric)
        .await
        .unwrap_err();

    assert_eq!(err.stage(), Some(FetchStage::CachedImage));
    assert_eq!(h.forecasts.forecast_calls(), 1);
}

#[tokio::test]
async fn test_cache_failures_do_not_fail_fetch() {
    let h = Harness::rainy();
    h.cache.fail_put.store(true, Ordering::SeqCst);

    let packet = h
        .orchestrator
        .fetch_weather(tampere(), UnitSystem::Metric)
        .await
        .unwrap();
    assert_eq!(packet.source, PacketSource::Network);
    assert!(h.cache.inner.is_empty());

    h.cache.fail_put.store(false, Ordering::SeqCst);
    h.orchestrator
        .fetch_weather(tampere(), UnitSystem::Metric)
        .await
        .unwrap();
    assert_eq!(h.cache.inner.len(), 1);

    h.cache.fail_get.store(true, Ordering::SeqCst);
    let packet = h
        .orchestrator
        .fetch_weather(tampere(), UnitSystem::Metric)
        .await
        .unwrap();
    assert_eq!(packet.source, PacketSource::Network);
    assert_eq!(h.forecasts.forecast_calls(), 3);
}

#[tokio::test]
async fn test_refresh_reuses_previous_coordinates_and_current_units() {
    let h = Harness::rainy();

    let err = h.orchestrator.refresh().await.unwrap_err();
    assert!(matches!(err, SkycastError::Validation { .. }));

    h.forecasts.fail_forecast.store(true, Ordering::SeqCst);
    let _ = h.orchestrator.fetch_weather(tampere(), UnitSystem::Metric).await;
    assert_eq!(h.orchestrator.previous_coordinates(), Some(tampere()));

    h.forecasts.fail_forecast.store(false, Ordering::SeqCst);
    h.orchestrator.set_units(UnitSystem::Standard);
    let packet = h.orchestrator.refresh().await.unwrap();

    assert_eq!(packet.source, PacketSource::Network);
    assert_eq!(
        *h.forecasts.requested_units.lock(),
        vec![UnitSystem::Metric, UnitSystem::Standard]
    );
}

#[tokio::test]
async fn test_current_location_fetch_notifies_sink() {
    let h = Harness::rainy();
    let sink = Arc::new(RecordingSink::default());
    let orchestrator = h.orchestrator.clone().with_location_sink(sink.clone());

    orchestrator
        .fetch_weather_for_current_location(tampere(), UnitSystem::Metric)
        .await
        .unwrap();
    orchestrator
        .fetch_weather(Coordinates::new(65.0121, 25.4651), UnitSystem::Metric)
        .await
        .unwrap();

    h.forecasts.fail_name.store(true, Ordering::SeqCst);
    let far_away = Coordinates::new(-33.8688, 151.2093);
    assert!(
        orchestrator
            .fetch_weather_for_current_location(far_away, UnitSystem::Metric)
            .await
            .is_err()
    );

    assert_eq!(
        *sink.updates.lock(),
        vec![("Tampere".to_string(), tampere())]
    );
}

#[tokio::test]
async fn test_state_channel_reports_terminal_states() {
    let h = Harness::rainy();
    let mut states = h.orchestrator.subscribe();
    assert!(matches!(*states.borrow_and_update(), FetchState::Idle));

    h.orchestrator
        .fetch_weather(tampere(), UnitSystem::Metric)
        .await
        .unwrap();
    assert!(states.has_changed().unwrap());
    match &*states.borrow_and_update() {
        FetchState::Success(packet) => assert_eq!(packet.location_name, "Tampere"),
        other => panic!("expected success, got {other:?}"),
    }

    h.images.fail.store(true, Ordering::SeqCst);
    let _ = h.orchestrator.fetch_weather(tampere(), UnitSystem::Metric).await;
    assert!(matches!(*states.borrow_and_update(), FetchState::Failed));
}

#[tokio::test]
async fn test_unit_change_triggers_refresh() {
    let h = Harness::rainy();
    h.orchestrator
        .fetch_weather(tampere(), UnitSystem::Metric)
        .await
        .unwrap();

    let mut states = h.orchestrator.subscribe();
    states.borrow_and_update();
    let mut unit_changes = h.orchestrator.units_changed();
    let refresher = h.orchestrator.spawn_refresh_on_unit_change();

    h.orchestrator.set_units(UnitSystem::Imperial);
    assert!(unit_changes.has_changed().unwrap());
    assert_eq!(*unit_changes.borrow_and_update(), UnitSystem::Imperial);

    tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            states.changed().await.unwrap();
            if matches!(*states.borrow_and_update(), FetchState::Success(_)) {
                break;
            }
        }
    })
    .await
    .unwrap();
    refresher.abort();

    assert_eq!(h.orchestrator.units(), UnitSystem::Imperial);
    assert_eq!(
        *h.forecasts.requested_units.lock(),
        vec![UnitSystem::Metric, UnitSystem::Imperial]
    );
}
