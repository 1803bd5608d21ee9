//! Downloads photos and decodes them into pixel buffers

use std::time::{Duration, Instant};

use image::RgbaImage;
use reqwest::blocking::Client;
use tracing::{debug, instrument};

use super::{ImageLoader, ensure_success, redact};
use crate::{Result, SkycastError};

/// [`ImageLoader`] over plain HTTP GET
pub struct HttpImageLoader {
    client: Client,
}

impl HttpImageLoader {
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("Skycast/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| SkycastError::config(format!("Failed to create HTTP client: {e}")))?;
        Ok(Self { client })
    }
}

impl ImageLoader for HttpImageLoader {
    #[instrument(skip(self))]
    fn load(&self, url: &str) -> Result<RgbaImage> {
        let start_time = Instant::now();

        let response = self
            .client
            .get(url)
            .send()
            .map_err(|e| SkycastError::network(format!("Image request to {} failed: {e}", redact(url))))?;
        let bytes = ensure_success(response)?
            .bytes()
            .map_err(|e| SkycastError::network(format!("Failed to read image body: {e}")))?;

        let decoded = image::load_from_memory(&bytes)?.to_rgba8();
        debug!(
            "Decoded {}x{} image ({} bytes) in {:.3}s",
            decoded.width(),
            decoded.height(),
            bytes.len(),
            start_time.elapsed().as_secs_f64()
        );
        Ok(decoded)
    }
}
