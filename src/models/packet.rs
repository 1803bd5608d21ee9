//! The assembled, display-ready result of one fetch

use std::sync::Arc;

use image::RgbaImage;

use super::{ForecastData, PhotoData};

/// Where a packet's forecast came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PacketSource {
    Cache,
    Network,
}

/// Location name, forecast, photo and decoded background image
#[derive(Debug, Clone)]
pub struct WeatherPacket {
    pub location_name: String,
    pub forecast: ForecastData,
    pub photo: PhotoData,
    pub image: Arc<RgbaImage>,
    pub source: PacketSource,
}
