//! HTTP clients for the forecast, geocoding and photo providers
//!
//! All clients are synchronous (`reqwest::blocking`) and must be driven from a
//! blocking worker, never from an async executor thread. The traits in this
//! module are the seams the orchestrator is built on, so tests can swap the
//! network out.

use std::time::{Duration, Instant};

use parking_lot::Mutex;
use reqwest::StatusCode;
use reqwest::blocking::{RequestBuilder, Response};
use serde::de::DeserializeOwned;
use tracing::{debug, info, warn};

use crate::models::{Coordinates, ForecastData, LocationCandidate, PhotoData, UnitSystem};
use crate::{Result, SkycastError};

pub mod images;
pub mod openweathermap;
pub mod pexels;

pub use images::HttpImageLoader;
pub use openweathermap::ForecastClient;
pub use pexels::PhotoClient;

/// Forecast, reverse geocoding and location search
pub trait ForecastSource: Send + Sync {
    fn fetch_forecast(&self, coordinates: Coordinates, units: UnitSystem) -> Result<ForecastData>;
    fn fetch_location_name(&self, coordinates: Coordinates) -> Result<String>;
    /// Returns an empty list, not an error, when nothing matches
    fn search_locations(&self, query: &str) -> Result<Vec<LocationCandidate>>;
}

/// Photo collections
pub trait PhotoSource: Send + Sync {
    fn fetch_collection(&self, collection_id: &str) -> Result<Vec<PhotoData>>;
}

/// Turns an image URL into a decoded pixel buffer
pub trait ImageLoader: Send + Sync {
    fn load(&self, url: &str) -> Result<image::RgbaImage>;
}

/// Sliding-window rate limiter for API requests
#[derive(Debug)]
pub struct RateLimiter {
    /// Maximum requests per window
    max_requests: u32,
    window: Duration,
    /// Request timestamps within the current window
    request_times: Vec<Instant>,
}

impl RateLimiter {
    /// Create a new rate limiter
    pub fn new(max_requests: u32, window: Duration) -> Self {
        Self {
            max_requests,
            window,
            request_times: Vec::new(),
        }
    }

    pub fn per_minute(max_requests: u32) -> Self {
        Self::new(max_requests, Duration::from_secs(60))
    }

    pub fn per_hour(max_requests: u32) -> Self {
        Self::new(max_requests, Duration::from_secs(60 * 60))
    }

    /// Check if a request is allowed and record it
    pub fn allow_request(&mut self) -> bool {
        self.cleanup_old_requests();

        if self.request_times.len() >= self.max_requests as usize {
            false
        } else {
            self.request_times.push(Instant::now());
            true
        }
    }

    /// Get time until next request is allowed
    pub fn time_until_next_request(&mut self) -> Duration {
        self.cleanup_old_requests();

        if self.request_times.len() < self.max_requests as usize {
            return Duration::ZERO;
        }
        self.request_times
            .first()
            .map_or(Duration::ZERO, |oldest| self.window.saturating_sub(oldest.elapsed()))
    }

    fn cleanup_old_requests(&mut self) {
        let window = self.window;
        self.request_times.retain(|time| time.elapsed() < window);
    }
}

/// Strip the `appid` credential from a URL before it is logged
pub(crate) fn redact(url: &str) -> &str {
    url.split("appid=").next().unwrap_or(url)
}

/// Send a GET request through the rate limiter. Any HTTP status is returned as-is.
pub(crate) fn send(
    request: RequestBuilder,
    limiter: &Mutex<RateLimiter>,
    url: &str,
) -> Result<Response> {
    {
        let mut limiter = limiter.lock();
        if !limiter.allow_request() {
            let wait_time = limiter.time_until_next_request();
            warn!(
                "Rate limit exceeded, next request allowed in {:.1}s",
                wait_time.as_secs_f64()
            );
            return Err(SkycastError::network(format!(
                "Rate limit exceeded. Please wait {} seconds.",
                wait_time.as_secs()
            )));
        }
    }

    let start_time = Instant::now();
    debug!("HTTP GET {}", redact(url));

    let response = request.send().map_err(|e| {
        warn!("Network error for {}: {}", redact(url), e);
        SkycastError::network(format!("Request to {} failed: {}", redact(url), e))
    })?;

    let duration = start_time.elapsed();
    debug!(
        "HTTP response received: {} in {:.3}s",
        response.status(),
        duration.as_secs_f64()
    );
    if duration.as_secs() > 5 {
        warn!("Slow API response detected: {:.3}s", duration.as_secs_f64());
    }

    Ok(response)
}

/// Fail on any non-2xx status
pub(crate) fn ensure_success(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let message = match status {
        StatusCode::UNAUTHORIZED => "Invalid API key (HTTP 401)".to_string(),
        StatusCode::TOO_MANY_REQUESTS => "Server rate limit exceeded (HTTP 429)".to_string(),
        _ => format!(
            "API request failed with status: {} - {}",
            status,
            status.canonical_reason().unwrap_or("Unknown error")
        ),
    };
    warn!("{}", message);
    Err(SkycastError::network(message))
}

/// Read the body and decode it as JSON
pub(crate) fn decode_json<T: DeserializeOwned>(response: Response, what: &str) -> Result<T> {
    let body = response
        .text()
        .map_err(|e| SkycastError::network(format!("Failed to read {what} response: {e}")))?;

    let parse_start = Instant::now();
    let value = serde_json::from_str(&body).map_err(|e| {
        warn!("Failed to parse {} response: {}", what, e);
        SkycastError::decode(format!("Invalid {what} data: {e}"))
    })?;
    info!(
        "Parsed {} response ({} bytes) in {:.3}s",
        what,
        body.len(),
        parse_start.elapsed().as_secs_f64()
    );
    Ok(value)
}
