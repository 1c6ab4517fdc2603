use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, error, info};

use crate::{
    error::FetchError,
    model::{CityRecord, WeatherReading},
};

use super::{WeatherClient, sanitize_query, sanitize_text};

pub const DEFAULT_BASE_URL: &str = "https://api.openweathermap.org";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone)]
pub struct OpenWeatherClient {
    api_key: String,
    lang: String,
    base_url: String,
    http: Client,
}

impl OpenWeatherClient {
    pub fn new(api_key: String, lang: String) -> Self {
        Self::with_base_url(api_key, lang, DEFAULT_BASE_URL)
    }

    /// Point the client at another host, e.g. a mock server.
    pub fn with_base_url(api_key: String, lang: String, base_url: &str) -> Self {
        Self {
            api_key,
            lang,
            base_url: base_url.trim_end_matches('/').to_string(),
            http: Client::new(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct OwMain {
    temp: f64,
    feels_like: f64,
    temp_min: f64,
    temp_max: f64,
    humidity: u8,
    pressure: u32,
}

#[derive(Debug, Deserialize)]
struct OwWeather {
    description: String,
}

#[derive(Debug, Deserialize)]
struct OwWind {
    speed: f64,
    deg: u16,
}

#[derive(Debug, Deserialize)]
struct OwCurrentResponse {
    dt: Option<i64>,
    main: OwMain,
    weather: Vec<OwWeather>,
    wind: OwWind,
}

#[async_trait]
impl WeatherClient for OpenWeatherClient {
    async fn fetch_current(&self, city: &CityRecord) -> Result<WeatherReading, FetchError> {
        let url = format!("{}/data/2.5/weather", self.base_url);
        let query = sanitize_query(&city.lookup_key);
        debug!("Requesting current weather for '{}'", query);

        let res = self
            .http
            .get(&url)
            .query(&[
                ("q", query.as_str()),
                ("appid", self.api_key.as_str()),
                ("units", "metric"),
                ("lang", self.lang.as_str()),
            ])
            .timeout(REQUEST_TIMEOUT)
            .send()
            .await
            .map_err(|e| {
                error!("Weather request for '{}' failed: {}", query, e);
                FetchError::UpstreamUnavailable(format!("request to OpenWeather failed: {e}"))
            })?;

        let status = res.status();
        let body = res.text().await.map_err(|e| {
            FetchError::UpstreamUnavailable(format!("failed to read OpenWeather response body: {e}"))
        })?;

        if !status.is_success() {
            error!("Weather API returned HTTP {}. Body: {}", status, truncate_body(&body));
            return Err(FetchError::UpstreamUnavailable(format!(
                "OpenWeather request failed with status {}: {}",
                status,
                truncate_body(&body),
            )));
        }

        let reading = parse_current(&city.name, &body)?;
        info!("Fetched current weather for {}", city.name);
        Ok(reading)
    }
}

/// Map an OpenWeather `/weather` payload (metric units) onto a reading.
fn parse_current(city_name: &str, body: &str) -> Result<WeatherReading, FetchError> {
    let parsed: OwCurrentResponse = serde_json::from_str(body).map_err(|e| {
        error!("Unexpected weather API payload: {}", truncate_body(body));
        FetchError::MalformedResponse(format!("failed to parse OpenWeather JSON: {e}"))
    })?;

    let condition = parsed
        .weather
        .first()
        .map(|w| sanitize_text(&w.description))
        .ok_or_else(|| FetchError::MalformedResponse("response contained no weather entries".into()))?;

    let observed_at = parsed.dt.and_then(unix_to_utc).unwrap_or_else(Utc::now);

    Ok(WeatherReading {
        city_name: city_name.to_string(),
        observed_at,
        condition,
        temperature: round1(parsed.main.temp),
        feels_like: round1(parsed.main.feels_like),
        temp_min: round1(parsed.main.temp_min),
        temp_max: round1(parsed.main.temp_max),
        humidity: parsed.main.humidity,
        pressure: parsed.main.pressure,
        wind_speed: round1(parsed.wind.speed),
        wind_direction: parsed.wind.deg,
    })
}

/// One decimal, with `-0.0` normalised to `0.0`.
fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0 + 0.0
}

fn unix_to_utc(ts: i64) -> Option<DateTime<Utc>> {
    DateTime::<Utc>::from_timestamp(ts, 0)
}

fn truncate_body(body: &str) -> String {
    const MAX: usize = 200;
    match body.char_indices().nth(MAX) {
        Some((idx, _)) => format!("{}...", &body[..idx]),
        None => body.to_string(),
    }
}
