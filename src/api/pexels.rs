//! Pexels collection client
//!
//! Unlike the forecast provider, the key is sent in the `Authorization` header.

use std::time::Duration;

use parking_lot::Mutex;
use reqwest::blocking::Client;
use reqwest::header::AUTHORIZATION;
use serde::Deserialize;
use tracing::{info, instrument, warn};

use super::{PhotoSource, RateLimiter, decode_json, ensure_success, send};
use crate::config::PhotoApiConfig;
use crate::models::PhotoData;
use crate::{Result, SkycastError};

#[derive(Debug, Deserialize)]
struct CollectionResponse {
    #[serde(default)]
    media: Vec<RawPhoto>,
}

#[derive(Debug, Deserialize)]
struct RawPhoto {
    photographer: String,
    url: String,
    src: RawSources,
}

#[derive(Debug, Deserialize)]
struct RawSources {
    original: String,
    portrait: String,
    landscape: String,
}

impl From<RawPhoto> for PhotoData {
    fn from(raw: RawPhoto) -> Self {
        PhotoData {
            photographer: raw.photographer,
            page_url: raw.url,
            original: raw.src.original,
            portrait: raw.src.portrait,
            landscape: raw.src.landscape,
        }
    }
}

/// Blocking client for photo collections
pub struct PhotoClient {
    client: Client,
    api_key: String,
    base_url: String,
    rate_limiter: Mutex<RateLimiter>,
}

impl PhotoClient {
    pub fn new(config: &PhotoApiConfig) -> Result<Self> {
        if config.api_key.is_empty() {
            return Err(SkycastError::config(
                "Photo API key is missing. Set photos.api_key or SKYCAST_PHOTOS__API_KEY.",
            ));
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds.into()))
            .user_agent(concat!("Skycast/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| SkycastError::config(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            api_key: config.api_key.clone(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            rate_limiter: Mutex::new(RateLimiter::per_hour(config.max_requests_per_hour)),
        })
    }
}

impl PhotoSource for PhotoClient {
    #[instrument(skip(self))]
    fn fetch_collection(&self, collection_id: &str) -> Result<Vec<PhotoData>> {
        let url = format!(
            "{}/collections/{}?type=photo",
            self.base_url,
            urlencoding::encode(collection_id)
        );
        let request = self.client.get(&url).header(AUTHORIZATION, &self.api_key);

        let response = ensure_success(send(request, &self.rate_limiter, &url)?)?;
        let collection: CollectionResponse = decode_json(response, "photo collection")?;

        let photos: Vec<PhotoData> = collection.media.into_iter().map(PhotoData::from).collect();
        if photos.is_empty() {
            warn!("Photo collection '{}' is empty", collection_id);
        } else {
            info!("Collection '{}' returned {} photos", collection_id, photos.len());
        }
        Ok(photos)
    }
}
