//! Error types and handling for `Skycast`

use std::fmt;

use thiserror::Error;

/// Stage of the forecast pipeline at which a fetch failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchStage {
    /// Materializing the image of a fresh cached entry
    CachedImage,
    /// Requesting the forecast
    Forecast,
    /// Requesting the photo collection or picking a photo from it
    PhotoCollection,
    /// Materializing the image of a freshly chosen photo
    Image,
    /// Reverse geocoding the place name
    LocationName,
    /// The background worker died before reporting
    Worker,
}

impl fmt::Display for FetchStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FetchStage::CachedImage => "cached image",
            FetchStage::Forecast => "forecast",
            FetchStage::PhotoCollection => "photo collection",
            FetchStage::Image => "image",
            FetchStage::LocationName => "location name",
            FetchStage::Worker => "worker",
        };
        f.write_str(name)
    }
}

/// Main error type for `Skycast`
#[derive(Error, Debug)]
pub enum SkycastError {
    /// Configuration-related errors
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// Transport failures and unexpected HTTP statuses
    #[error("Network error: {message}")]
    Network { message: String },

    /// Response bodies that do not match the expected schema
    #[error("Decode error: {message}")]
    Decode { message: String },

    /// A request returned no results where at least one was required
    #[error("Empty result: {message}")]
    EmptySet { message: String },

    /// Image bytes could not be turned into a pixel buffer
    #[error("Image decode error: {message}")]
    ImageDecode { message: String },

    /// A deadline elapsed before a result arrived
    #[error("Timed out: {message}")]
    Timeout { message: String },

    /// The device location could not be obtained
    #[error("Location unavailable: {message}")]
    Unavailable { message: String },

    /// Input validation errors
    #[error("Invalid input: {message}")]
    Validation { message: String },

    /// Cache and store operation errors
    #[error("Cache error: {message}")]
    Cache { message: String },

    /// I/O operation errors
    #[error("I/O error: {source}")]
    Io {
        #[from]
        source: std::io::Error,
    },

    /// The single outcome a failed weather fetch reports to its caller
    #[error("Request failed")]
    FetchFailed {
        stage: FetchStage,
        #[source]
        source: Box<SkycastError>,
    },
}

impl SkycastError {
    /// Create a new configuration error
    pub fn config<S: Into<String>>(message: S) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create a new network error
    pub fn network<S: Into<String>>(message: S) -> Self {
        Self::Network {
            message: message.into(),
        }
    }

    /// Create a new decode error
    pub fn decode<S: Into<String>>(message: S) -> Self {
        Self::Decode {
            message: message.into(),
        }
    }

    /// Create a new empty-set error
    pub fn empty_set<S: Into<String>>(message: S) -> Self {
        Self::EmptySet {
            message: message.into(),
        }
    }

    /// Create a new image decode error
    pub fn image_decode<S: Into<String>>(message: S) -> Self {
        Self::ImageDecode {
            message: message.into(),
        }
    }

    /// Create a new timeout error
    pub fn timeout<S: Into<String>>(message: S) -> Self {
        Self::Timeout {
            message: message.into(),
        }
    }

    /// Create a new location-unavailable error
    pub fn unavailable<S: Into<String>>(message: S) -> Self {
        Self::Unavailable {
            message: message.into(),
        }
    }

    /// Create a new validation error
    pub fn validation<S: Into<String>>(message: S) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    /// Create a new cache error
    pub fn cache<S: Into<String>>(message: S) -> Self {
        Self::Cache {
            message: message.into(),
        }
    }

    /// Wrap an error as the failure of one pipeline stage
    #[must_use]
    pub fn fetch_failed(stage: FetchStage, source: SkycastError) -> Self {
        Self::FetchFailed {
            stage,
            source: Box::new(source),
        }
    }

    /// Stage that failed, for fetch failures
    #[must_use]
    pub fn stage(&self) -> Option<FetchStage> {
        match self {
            SkycastError::FetchFailed { stage, .. } => Some(*stage),
            _ => None,
        }
    }

    /// Get a user-friendly error message
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            SkycastError::Config { .. } => {
                "Configuration error. Please check your config file and API keys.".to_string()
            }
            SkycastError::Network { .. } | SkycastError::Decode { .. } => {
                "Unable to connect to external services. Please check your internet connection."
                    .to_string()
            }
            SkycastError::EmptySet { message } => format!("Nothing found: {message}"),
            SkycastError::ImageDecode { .. } => "Background image could not be loaded.".to_string(),
            SkycastError::Timeout { .. } => "Location request timed out.".to_string(),
            SkycastError::Unavailable { .. } => "Location is not available.".to_string(),
            SkycastError::Validation { message } => {
                format!("Invalid input: {message}")
            }
            SkycastError::Cache { .. } => {
                "Cache operation failed. You may need to clear your cache.".to_string()
            }
            SkycastError::Io { .. } => {
                "File operation failed. Please check file permissions.".to_string()
            }
            SkycastError::FetchFailed { .. } => "Request failed".to_string(),
        }
    }
}

impl From<reqwest::Error> for SkycastError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            SkycastError::decode(err.to_string())
        } else {
            SkycastError::network(err.to_string())
        }
    }
}

impl From<serde_json::Error> for SkycastError {
    fn from(err: serde_json::Error) -> Self {
        SkycastError::decode(err.to_string())
    }
}

impl From<image::ImageError> for SkycastError {
    fn from(err: image::ImageError) -> Self {
        SkycastError::image_decode(err.to_string())
    }
}
