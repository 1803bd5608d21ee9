//! fjall-backed key-value store shared by the forecast cache and saved locations

use std::path::Path;

use anyhow::{Context, Result};
use fjall::{Database, Keyspace};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::info;

const FORECASTS_KEYSPACE: &str = "forecasts";
const LOCATIONS_KEYSPACE: &str = "locations";

/// An open database with one keyspace per concern
#[derive(Clone)]
pub struct Store {
    forecasts: Keyspace,
    locations: Keyspace,
}

impl Store {
    /// Open (or create) the store in `path`
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let db = Database::builder(path)
            .open()
            .with_context(|| format!("Failed to open store at {}", path.display()))?;
        let forecasts = db.keyspace(FORECASTS_KEYSPACE, fjall::KeyspaceCreateOptions::default)?;
        let locations = db.keyspace(LOCATIONS_KEYSPACE, fjall::KeyspaceCreateOptions::default)?;

        info!("Opened store at {}", path.display());
        Ok(Self {
            forecasts,
            locations,
        })
    }

    pub(crate) fn forecasts(&self) -> Blobs {
        Blobs(self.forecasts.clone())
    }

    pub(crate) fn locations(&self) -> Blobs {
        Blobs(self.locations.clone())
    }
}

/// postcard-encoded values in a single keyspace
#[derive(Clone)]
pub(crate) struct Blobs(Keyspace);

impl Blobs {
    pub(crate) fn get<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        let Some(bytes) = self.0.get(key.as_bytes())?.map(|v| v.to_vec()) else {
            return Ok(None);
        };
        let value = postcard::from_bytes(&bytes)
            .with_context(|| format!("Corrupt value stored under '{key}'"))?;
        Ok(Some(value))
    }

    pub(crate) fn put<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<()> {
        let bytes = postcard::to_stdvec(value)?;
        self.0.insert(key.as_bytes().to_vec(), bytes)?;
        Ok(())
    }
}
