use async_trait::async_trait;
use std::fmt::Debug;

use crate::{
    error::FetchError,
    model::{CityRecord, WeatherReading},
};

pub mod openweather;

pub use openweather::OpenWeatherClient;

/// Fetches the current reading for one city. A single attempt per call;
/// retrying is the caller's decision.
#[async_trait]
pub trait WeatherClient: Send + Sync + Debug {
    async fn fetch_current(&self, city: &CityRecord) -> Result<WeatherReading, FetchError>;
}

/// Keep only characters a city query can legitimately contain.
pub fn sanitize_query(query: &str) -> String {
    query
        .trim()
        .chars()
        .filter(|c| c.is_alphanumeric() || matches!(c, ' ' | '-' | '_' | ','))
        .collect()
}

/// Replace line breaks with spaces so provider text cannot break the report layout.
pub fn sanitize_text(text: &str) -> String {
    text.replace(['\n', '\r'], " ").trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitize_query_keeps_comma_and_letters() {
        assert_eq!(sanitize_query("Istanbul,TR"), "Istanbul,TR");
        assert_eq!(sanitize_query(" Kahramanmaraş,TR\r\n"), "Kahramanmaraş,TR");
        assert_eq!(sanitize_query("Ank&ara;drop"), "Ankaradrop");
    }

    #[test]
    fn sanitize_text_flattens_lines() {
        assert_eq!(sanitize_text("broken\nclouds\r"), "broken clouds");
    }
}
