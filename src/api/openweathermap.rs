//! OpenWeatherMap client: One Call forecast plus direct and reverse geocoding
//!
//! The API key travels as the `appid` query parameter.

use std::time::Duration;

use parking_lot::Mutex;
use reqwest::StatusCode;
use reqwest::blocking::Client;
use tracing::{debug, info, instrument, warn};

use super::{ForecastSource, RateLimiter, decode_json, ensure_success, send};
use crate::config::ForecastApiConfig;
use crate::models::{Coordinates, ForecastData, LocationCandidate, UnitSystem};
use crate::{Result, SkycastError};

/// Maximum number of direct geocoding matches requested
const SEARCH_LIMIT: u32 = 15;

/// Blocking client for the forecast provider
pub struct ForecastClient {
    client: Client,
    api_key: String,
    base_url: String,
    language: String,
    rate_limiter: Mutex<RateLimiter>,
}

impl ForecastClient {
    /// Create a new forecast client
    pub fn new(config: &ForecastApiConfig) -> Result<Self> {
        if config.api_key.is_empty() {
            return Err(SkycastError::config(
                "Forecast API key is missing. Set forecast.api_key or SKYCAST_FORECAST__API_KEY.",
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
            language: config.language.clone(),
            rate_limiter: Mutex::new(RateLimiter::per_minute(config.max_requests_per_minute)),
        })
    }

    fn get(&self, url: &str) -> Result<reqwest::blocking::Response> {
        send(self.client.get(url), &self.rate_limiter, url)
    }
}

impl ForecastSource for ForecastClient {
    #[instrument(skip(self), fields(lat = coordinates.latitude, lon = coordinates.longitude))]
    fn fetch_forecast(&self, coordinates: Coordinates, units: UnitSystem) -> Result<ForecastData> {
        let url = format!(
            "{}/data/2.5/onecall?lat={}&lon={}&exclude=minutely&lang={}&units={}&appid={}",
            self.base_url,
            coordinates.latitude,
            coordinates.longitude,
            urlencoding::encode(&self.language),
            units.as_str(),
            urlencoding::encode(&self.api_key)
        );

        let response = ensure_success(self.get(&url)?)?;
        let raw: raw::OneCallResponse = decode_json(response, "forecast")?;
        let forecast = ForecastData::try_from(raw)?;

        info!(
            "Retrieved forecast for {} with {} hourly and {} daily entries",
            coordinates,
            forecast.hourly.len(),
            forecast.daily.len()
        );
        Ok(forecast)
    }

    #[instrument(skip(self), fields(lat = coordinates.latitude, lon = coordinates.longitude))]
    fn fetch_location_name(&self, coordinates: Coordinates) -> Result<String> {
        let url = format!(
            "{}/geo/1.0/reverse?lat={}&lon={}&appid={}",
            self.base_url,
            coordinates.latitude,
            coordinates.longitude,
            urlencoding::encode(&self.api_key)
        );

        let response = ensure_success(self.get(&url)?)?;
        let places: Vec<LocationCandidate> = decode_json(response, "reverse geocoding")?;

        let name = places
            .into_iter()
            .next()
            .map(|place| place.name)
            .ok_or_else(|| {
                SkycastError::empty_set(format!("No place name found for {coordinates}"))
            })?;

        debug!("Reverse geocoded {} to '{}'", coordinates, name);
        Ok(name)
    }

    #[instrument(skip(self))]
    fn search_locations(&self, query: &str) -> Result<Vec<LocationCandidate>> {
        let url = format!(
            "{}/geo/1.0/direct?q={}&limit={}&appid={}",
            self.base_url,
            urlencoding::encode(query),
            SEARCH_LIMIT,
            urlencoding::encode(&self.api_key)
        );

        let response = self.get(&url)?;
        // The provider answers unknown names with a 404
        if response.status() == StatusCode::NOT_FOUND {
            warn!("No results found for location '{}'", query);
            return Ok(Vec::new());
        }

        let candidates: Vec<LocationCandidate> =
            decode_json(ensure_success(response)?, "geocoding")?;

        if candidates.is_empty() {
            warn!("No results found for location '{}'", query);
        } else {
            info!("Found {} geocoding results for '{}'", candidates.len(), query);
        }
        Ok(candidates)
    }
}

/// Wire format of the One Call API and its conversion into [`ForecastData`]
mod raw {
    use chrono::{DateTime, Utc};
    use serde::Deserialize;

    use crate::SkycastError;
    use crate::models::{Conditions, DailyWeather, DayTemperatures, ForecastData, HourlyWeather};

    #[derive(Debug, Deserialize)]
    pub struct OneCallResponse {
        pub lat: f64,
        pub lon: f64,
        pub timezone: String,
        pub current: RawHourly,
        #[serde(default)]
        pub hourly: Vec<RawHourly>,
        #[serde(default)]
        pub daily: Vec<RawDaily>,
    }

    #[derive(Debug, Deserialize)]
    pub struct RawCondition {
        pub id: i32,
        pub main: String,
        pub description: String,
        pub icon: String,
    }

    #[derive(Debug, Deserialize)]
    pub struct RawHourly {
        pub dt: i64,
        pub temp: f64,
        pub feels_like: f64,
        pub pressure: u32,
        pub humidity: u8,
        pub wind_speed: f64,
        pub wind_deg: f64,
        pub weather: Vec<RawCondition>,
    }

    #[derive(Debug, Deserialize)]
    pub struct RawDayTemps {
        pub morn: f64,
        pub day: f64,
        pub eve: f64,
        pub night: f64,
        pub min: f64,
        pub max: f64,
    }

    #[derive(Debug, Deserialize)]
    pub struct RawDaily {
        pub dt: i64,
        pub temp: RawDayTemps,
        pub pressure: u32,
        pub humidity: u8,
        pub wind_speed: f64,
        pub wind_deg: f64,
        pub weather: Vec<RawCondition>,
    }

    fn timestamp(dt: i64) -> Result<DateTime<Utc>, SkycastError> {
        DateTime::from_timestamp(dt, 0)
            .ok_or_else(|| SkycastError::decode(format!("Timestamp out of range: {dt}")))
    }

    fn conditions(dt: i64, weather: Vec<RawCondition>) -> Result<Conditions, SkycastError> {
        let first = weather
            .into_iter()
            .next()
            .ok_or_else(|| SkycastError::decode("Forecast entry without weather conditions"))?;

        Ok(Conditions {
            code: first.id,
            title: first.main,
            description: first.description,
            icon: first.icon,
            time: timestamp(dt)?,
        })
    }

    impl TryFrom<RawHourly> for HourlyWeather {
        type Error = SkycastError;

        fn try_from(raw: RawHourly) -> Result<Self, Self::Error> {
            Ok(HourlyWeather {
                conditions: conditions(raw.dt, raw.weather)?,
                temperature: raw.temp,
                feels_like: raw.feels_like,
                pressure: raw.pressure,
                humidity: raw.humidity,
                wind_speed: raw.wind_speed,
                wind_direction: raw.wind_deg,
            })
        }
    }

    impl TryFrom<RawDaily> for DailyWeather {
        type Error = SkycastError;

        fn try_from(raw: RawDaily) -> Result<Self, Self::Error> {
            Ok(DailyWeather {
                conditions: conditions(raw.dt, raw.weather)?,
                temperatures: DayTemperatures {
                    morning: raw.temp.morn,
                    day: raw.temp.day,
                    evening: raw.temp.eve,
                    night: raw.temp.night,
                    min: raw.temp.min,
                    max: raw.temp.max,
                },
                pressure: raw.pressure,
                humidity: raw.humidity,
                wind_speed: raw.wind_speed,
                wind_direction: raw.wind_deg,
            })
        }
    }

    impl TryFrom<OneCallResponse> for ForecastData {
        type Error = SkycastError;

        fn try_from(raw: OneCallResponse) -> Result<Self, Self::Error> {
            Ok(ForecastData {
                latitude: raw.lat,
                longitude: raw.lon,
                timezone: raw.timezone,
                current: raw.current.try_into()?,
                hourly: raw
                    .hourly
                    .into_iter()
                    .map(HourlyWeather::try_from)
                    .collect::<Result<_, _>>()?,
                daily: raw
                    .daily
                    .into_iter()
                    .map(DailyWeather::try_from)
                    .collect::<Result<_, _>>()?,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn hourly(dt: i64, id: i32) -> serde_json::Value {
        json!({
            "dt": dt, "temp": 3.5, "feels_like": 0.2, "pressure": 1012, "humidity": 87,
            "dew_point": 1.5, "wind_speed": 4.1, "wind_deg": 200,
            "weather": [{"id": id, "main": "Rain", "description": "light rain", "icon": "10d"}]
        })
    }

    #[test]
    fn test_decode_one_call_converts_timestamps() {
        let body = json!({
            "lat": 61.4991, "lon": 23.7871, "timezone": "Europe/Helsinki", "timezone_offset": 10800,
            "current": hourly(1_700_000_000, 500),
            "hourly": [hourly(1_700_000_000, 500), hourly(1_700_003_600, 501)],
            "daily": [{
                "dt": 1_700_000_000,
                "temp": {"morn": 1.0, "day": 4.0, "eve": 3.0, "night": 0.5, "min": 0.1, "max": 4.5},
                "feels_like": {"morn": -1.0, "day": 2.0, "eve": 1.0, "night": -2.0},
                "pressure": 1010, "humidity": 90, "wind_speed": 5.0, "wind_deg": 180,
                "weather": [{"id": 600, "main": "Snow", "description": "light snow", "icon": "13d"}]
            }]
        });

        let raw: raw::OneCallResponse = serde_json::from_value(body).unwrap();
        let forecast = ForecastData::try_from(raw).unwrap();

        assert_eq!(forecast.current_code(), 500);
        assert_eq!(forecast.current.conditions.time.timestamp(), 1_700_000_000);
        assert_eq!(forecast.hourly.len(), 2);
        assert_eq!(forecast.hourly[1].conditions.code, 501);
        assert_eq!(forecast.daily[0].temperatures.max, 4.5);
        assert_eq!(forecast.daily[0].conditions.title, "Snow");
    }

    #[test]
    fn test_entry_without_conditions_is_decode_error() {
        let mut entry = hourly(1_700_000_000, 800);
        entry["weather"] = json!([]);
        let body = json!({"lat": 0.0, "lon": 0.0, "timezone": "UTC", "current": entry});

        let raw: raw::OneCallResponse = serde_json::from_value(body).unwrap();
        assert!(matches!(
            ForecastData::try_from(raw),
            Err(SkycastError::Decode { .. })
        ));
    }

    #[test]
    fn test_client_requires_api_key() {
        let config = ForecastApiConfig::default();
        assert!(matches!(
            ForecastClient::new(&config),
            Err(SkycastError::Config { .. })
        ));
    }
}
