//! Saved locations and the current device location

use parking_lot::Mutex;
use tokio::sync::watch;
use tracing::{debug, info};

use crate::models::{Coordinates, SavedLocation};
use crate::store::{Blobs, Store};
use crate::{Result, SkycastError};

const SAVED_LOCATIONS_KEY: &str = "saved_locations";

/// Receives the place resolved for the device location after a successful fetch
pub trait CurrentLocationSink: Send + Sync {
    fn set_current_location(&self, name: &str, coordinates: Coordinates);
}

/// User-curated location list plus the in-memory current location
pub struct LocationStore {
    blobs: Blobs,
    /// Serializes read-modify-write of the saved list
    write_lock: Mutex<()>,
    current: watch::Sender<Option<SavedLocation>>,
}

impl LocationStore {
    #[must_use]
    pub fn new(store: &Store) -> Self {
        Self {
            blobs: store.locations(),
            write_lock: Mutex::new(()),
            current: watch::Sender::new(None),
        }
    }

    /// All saved locations in insertion order
    pub fn list(&self) -> Result<Vec<SavedLocation>> {
        Ok(self
            .blobs
            .get(SAVED_LOCATIONS_KEY)
            .map_err(|e| SkycastError::cache(format!("{e:#}")))?
            .unwrap_or_default())
    }

    /// Save a location, replacing an existing entry for the same place
    pub fn add(&self, location: SavedLocation) -> Result<()> {
        let _guard = self.write_lock.lock();
        let mut saved = self.list()?;

        if let Some(existing) = saved.iter_mut().find(|l| l.same_place(&location)) {
            debug!("Updating saved location '{}'", location.name);
            *existing = location;
        } else {
            info!("Saving location '{}' at {}", location.name, location.coordinates);
            saved.push(location);
        }
        self.write(&saved)
    }

    /// Remove a saved location. Returns whether anything was removed.
    pub fn remove(&self, location: &SavedLocation) -> Result<bool> {
        let _guard = self.write_lock.lock();
        let mut saved = self.list()?;

        let before = saved.len();
        saved.retain(|l| !l.same_place(location));
        if saved.len() == before {
            return Ok(false);
        }

        info!("Removed saved location '{}'", location.name);
        self.write(&saved)?;
        Ok(true)
    }

    fn write(&self, saved: &[SavedLocation]) -> Result<()> {
        self.blobs
            .put(SAVED_LOCATIONS_KEY, saved)
            .map_err(|e| SkycastError::cache(format!("{e:#}")))
    }

    #[must_use]
    pub fn current_location(&self) -> Option<SavedLocation> {
        self.current.borrow().clone()
    }

    pub fn subscribe_current(&self) -> watch::Receiver<Option<SavedLocation>> {
        self.current.subscribe()
    }
}

impl CurrentLocationSink for LocationStore {
    fn set_current_location(&self, name: &str, coordinates: Coordinates) {
        // Reverse geocoding only yields a name
        let location = SavedLocation::new(name, coordinates, "");

        debug!("Current location is now '{}' at {}", name, coordinates);
        self.current.send_if_modified(|current| {
            if current.as_ref() == Some(&location) {
                false
            } else {
                *current = Some(location);
                true
            }
        });
    }
}
