//! Forecast acquisition: cache check, then forecast, photo, image and place name
//!
//! Every fetch runs on a blocking worker. Results are returned from the
//! future and also published on a [`watch`] channel as [`FetchState`].

use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use parking_lot::Mutex;
use rand::RngExt;
use tokio::sync::watch;
use tokio::task::{self, JoinHandle};
use tracing::{debug, info, instrument, warn};

use crate::api::{
    ForecastClient, ForecastSource, HttpImageLoader, ImageLoader, PhotoClient, PhotoSource,
};
use crate::cache::{CacheKey, CachedEntry, FjallForecastCache, ForecastCache};
use crate::config::SkycastConfig;
use crate::error::FetchStage;
use crate::locations::CurrentLocationSink;
use crate::models::{
    Coordinates, PacketSource, PhotoBucket, PhotoData, UnitSystem, WeatherPacket,
};
use crate::store::Store;
use crate::{Result, SkycastError};

/// Observable state of the most recent fetch
#[derive(Debug, Clone, Default)]
pub enum FetchState {
    #[default]
    Idle,
    Loading,
    Success(Arc<WeatherPacket>),
    Failed,
}

/// The blocking part of a fetch. Cloned into each worker.
#[derive(Clone)]
struct Pipeline {
    forecasts: Arc<dyn ForecastSource>,
    photos: Arc<dyn PhotoSource>,
    images: Arc<dyn ImageLoader>,
    cache: Arc<dyn ForecastCache>,
    ttl: Duration,
}

impl Pipeline {
    fn run(&self, coordinates: Coordinates, units: UnitSystem) -> Result<WeatherPacket> {
        let key = CacheKey::new(coordinates, units);

        let cached = self.cache.get(&key).unwrap_or_else(|e| {
            warn!("Cache read failed, treating as miss: {}", e);
            None
        });

        match cached {
            Some(entry) if entry.is_fresh(Utc::now().timestamp_millis(), self.ttl) => {
                debug!("Cache hit for {} ({})", coordinates, units);
                return self.load_cached(entry);
            }
            Some(_) => debug!("Cached forecast for {} ({}) is stale", coordinates, units),
            None => debug!("No cached forecast for {} ({})", coordinates, units),
        }

        self.fetch_fresh(key)
    }

    /// A fresh hit whose image cannot be loaded fails; it does not fall through to the network
    fn load_cached(&self, entry: CachedEntry) -> Result<WeatherPacket> {
        let image = self
            .images
            .load(&entry.photo.portrait)
            .map_err(|e| SkycastError::fetch_failed(FetchStage::CachedImage, e))?;

        Ok(WeatherPacket {
            location_name: entry.location_name,
            forecast: entry.forecast,
            photo: entry.photo,
            image: Arc::new(image),
            source: PacketSource::Cache,
        })
    }

    fn fetch_fresh(&self, key: CacheKey) -> Result<WeatherPacket> {
        let coordinates = key.coordinates;

        let forecast = self
            .forecasts
            .fetch_forecast(coordinates, key.units)
            .map_err(|e| SkycastError::fetch_failed(FetchStage::Forecast, e))?;

        let bucket = PhotoBucket::from_condition_code(forecast.current_code());
        debug!(
            "Condition {} selects the {:?} photo collection",
            forecast.current_code(),
            bucket
        );
        let photos = self
            .photos
            .fetch_collection(bucket.collection_id())
            .map_err(|e| SkycastError::fetch_failed(FetchStage::PhotoCollection, e))?;
        let photo = choose_photo(photos).ok_or_else(|| {
            SkycastError::fetch_failed(
                FetchStage::PhotoCollection,
                SkycastError::empty_set(format!(
                    "Photo collection '{}' has no photos",
                    bucket.collection_id()
                )),
            )
        })?;

        let image = self
            .images
            .load(&photo.portrait)
            .map_err(|e| SkycastError::fetch_failed(FetchStage::Image, e))?;

        let location_name = self
            .forecasts
            .fetch_location_name(coordinates)
            .map_err(|e| SkycastError::fetch_failed(FetchStage::LocationName, e))?;

        let entry = CachedEntry {
            key,
            location_name: location_name.clone(),
            stored_at_millis: Utc::now().timestamp_millis(),
            forecast: forecast.clone(),
            photo: photo.clone(),
        };
        if let Err(e) = self.cache.put(entry) {
            warn!("Failed to cache forecast for {}: {}", coordinates, e);
        }

        Ok(WeatherPacket {
            location_name,
            forecast,
            photo,
            image: Arc::new(image),
            source: PacketSource::Network,
        })
    }
}

/// Uniformly random pick
fn choose_photo(mut photos: Vec<PhotoData>) -> Option<PhotoData> {
    if photos.is_empty() {
        return None;
    }
    let index = rand::rng().random_range(0..photos.len());
    Some(photos.swap_remove(index))
}

/// Produces [`WeatherPacket`]s for coordinates, with caching
#[derive(Clone)]
pub struct ForecastOrchestrator {
    pipeline: Pipeline,
    location_sink: Option<Arc<dyn CurrentLocationSink>>,
    units: Arc<watch::Sender<UnitSystem>>,
    previous: Arc<Mutex<Option<Coordinates>>>,
    state: Arc<watch::Sender<FetchState>>,
}

impl ForecastOrchestrator {
    pub fn new(
        forecasts: Arc<dyn ForecastSource>,
        photos: Arc<dyn PhotoSource>,
        images: Arc<dyn ImageLoader>,
        cache: Arc<dyn ForecastCache>,
        ttl: Duration,
        units: UnitSystem,
    ) -> Self {
        Self {
            pipeline: Pipeline {
                forecasts,
                photos,
                images,
                cache,
                ttl,
            },
            location_sink: None,
            units: Arc::new(watch::Sender::new(units)),
            previous: Arc::new(Mutex::new(None)),
            state: Arc::new(watch::Sender::new(FetchState::Idle)),
        }
    }

    /// Notify `sink` after each successful current-location fetch
    #[must_use]
    pub fn with_location_sink(mut self, sink: Arc<dyn CurrentLocationSink>) -> Self {
        self.location_sink = Some(sink);
        self
    }

    /// Wire up the HTTP clients and the persistent cache.
    ///
    /// The blocking HTTP clients are built on a blocking worker, so this is
    /// safe to call from inside a runtime.
    pub async fn from_config(config: &SkycastConfig, store: &Store) -> Result<Self> {
        let forecast_config = config.forecast.clone();
        let photo_config = config.photos.clone();
        let (forecasts, photos, images) = task::spawn_blocking(move || {
            let forecasts = ForecastClient::new(&forecast_config)?;
            let photos = PhotoClient::new(&photo_config)?;
            let images =
                HttpImageLoader::new(Duration::from_secs(photo_config.timeout_seconds.into()))?;
            Ok::<_, SkycastError>((forecasts, photos, images))
        })
        .await
        .map_err(|e| SkycastError::from(std::io::Error::other(e)))??;

        Ok(Self::new(
            Arc::new(forecasts),
            Arc::new(photos),
            Arc::new(images),
            Arc::new(FjallForecastCache::new(store)),
            config.cache.ttl(),
            config.defaults.unit_system(),
        ))
    }

    /// Fetch the packet for `coordinates` in `units`, from cache when fresh.
    ///
    /// Any failure is reported as [`SkycastError::FetchFailed`].
    #[instrument(skip(self, coordinates, units), fields(lat = coordinates.latitude, lon = coordinates.longitude, units = %units))]
    pub async fn fetch_weather(
        &self,
        coordinates: Coordinates,
        units: UnitSystem,
    ) -> Result<WeatherPacket> {
        *self.previous.lock() = Some(coordinates);
        self.state.send_replace(FetchState::Loading);

        let start_time = Instant::now();
        let pipeline = self.pipeline.clone();
        let outcome = task::spawn_blocking(move || pipeline.run(coordinates, units))
            .await
            .unwrap_or_else(|e| {
                Err(SkycastError::fetch_failed(
                    FetchStage::Worker,
                    std::io::Error::other(e).into(),
                ))
            });

        match &outcome {
            Ok(packet) => {
                info!(
                    "Weather for '{}' ready from {:?} in {:.3}s",
                    packet.location_name,
                    packet.source,
                    start_time.elapsed().as_secs_f64()
                );
                self.state
                    .send_replace(FetchState::Success(Arc::new(packet.clone())));
            }
            Err(e) => {
                let stage = e.stage().map(|s| s.to_string()).unwrap_or_default();
                warn!(stage = %stage, "Weather fetch failed: {}", ErrorChain(e));
                self.state.send_replace(FetchState::Failed);
            }
        }
        outcome
    }

    /// Fetch for the device location and report the resolved place to the sink
    pub async fn fetch_weather_for_current_location(
        &self,
        coordinates: Coordinates,
        units: UnitSystem,
    ) -> Result<WeatherPacket> {
        let packet = self.fetch_weather(coordinates, units).await?;
        if let Some(sink) = &self.location_sink {
            sink.set_current_location(&packet.location_name, coordinates);
        }
        Ok(packet)
    }

    /// Re-run the last fetch with the currently configured unit system
    pub async fn refresh(&self) -> Result<WeatherPacket> {
        let coordinates = (*self.previous.lock())
            .ok_or_else(|| SkycastError::validation("Nothing to refresh yet"))?;
        self.fetch_weather(coordinates, self.units()).await
    }

    #[must_use]
    pub fn previous_coordinates(&self) -> Option<Coordinates> {
        *self.previous.lock()
    }

    #[must_use]
    pub fn units(&self) -> UnitSystem {
        *self.units.borrow()
    }

    pub fn set_units(&self, units: UnitSystem) {
        let changed = self.units.send_if_modified(|current| {
            if *current == units {
                false
            } else {
                *current = units;
                true
            }
        });
        if changed {
            info!("Unit system changed to {}", units);
        }
    }

    pub fn units_changed(&self) -> watch::Receiver<UnitSystem> {
        self.units.subscribe()
    }

    pub fn subscribe(&self) -> watch::Receiver<FetchState> {
        self.state.subscribe()
    }

    /// Refresh on every unit-system change until the handle is aborted
    pub fn spawn_refresh_on_unit_change(&self) -> JoinHandle<()> {
        let orchestrator = self.clone();
        let mut changes = self.units.subscribe();

        tokio::spawn(async move {
            while changes.changed().await.is_ok() {
                let units = *changes.borrow_and_update();
                debug!("Refreshing after switch to {}", units);
                if let Err(e) = orchestrator.refresh().await {
                    debug!("Refresh after unit change failed: {}", e);
                }
            }
        })
    }
}

/// Displays an error followed by its sources
struct ErrorChain<'a>(&'a SkycastError);

impl std::fmt::Display for ErrorChain<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)?;
        let mut source = std::error::Error::source(self.0);
        while let Some(err) = source {
            write!(f, ": {err}")?;
            source = err.source();
        }
        Ok(())
    }
}
