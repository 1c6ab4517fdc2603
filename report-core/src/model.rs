use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One entry of the province list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CityRecord {
    pub id: u32,
    pub name: String,
    /// Provider-specific query string, e.g. `"Istanbul,TR"`.
    #[serde(rename = "query")]
    pub lookup_key: String,
}

/// Point-in-time snapshot of conditions for one city.
///
/// Temperatures are in °C, wind speed in m/s, pressure in hPa.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherReading {
    pub city_name: String,
    pub observed_at: DateTime<Utc>,
    pub condition: String,
    pub temperature: f64,
    pub feels_like: f64,
    pub temp_min: f64,
    pub temp_max: f64,
    pub humidity: u8,
    pub pressure: u32,
    pub wind_speed: f64,
    pub wind_direction: u16,
}

/// A reading after the store accepted it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredReport {
    pub id: String,
    pub stored_at: DateTime<Utc>,
    pub reading: WeatherReading,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailMessage {
    pub recipient: String,
    pub subject: String,
    pub body: String,
}
