//! Plain-text rendering of a reading.

use chrono::{FixedOffset, Offset, Utc};

use crate::{model::WeatherReading, provider::sanitize_text};

/// Turkey has been on UTC+3 year-round since 2016.
pub const DEFAULT_UTC_OFFSET_HOURS: i32 = 3;

const RULE: &str = "----------------------------------------";

/// Renders the fixed daily layout. Rendering depends only on the reading and
/// the configured offset, never on the wall clock.
#[derive(Debug, Clone, Copy)]
pub struct ReportFormatter {
    offset: FixedOffset,
}

impl Default for ReportFormatter {
    fn default() -> Self {
        Self::with_offset_hours(DEFAULT_UTC_OFFSET_HOURS).unwrap_or(Self {
            offset: Utc.fix(),
        })
    }
}

impl ReportFormatter {
    pub fn new(offset: FixedOffset) -> Self {
        Self { offset }
    }

    /// `None` if the offset is outside ±24h.
    pub fn with_offset_hours(hours: i32) -> Option<Self> {
        FixedOffset::east_opt(hours * 3600).map(Self::new)
    }

    pub fn render(&self, reading: &WeatherReading) -> String {
        let observed = reading
            .observed_at
            .with_timezone(&self.offset)
            .format("%d.%m.%Y %H:%M");
        let city = sanitize_text(&reading.city_name);

        let lines = [
            format!("WEATHER REPORT (Daily) - {observed}"),
            RULE.to_string(),
            format!("Province: {city}"),
            format!("Condition: {}", sanitize_text(&reading.condition)),
            format!(
                "Temperature: {}°C (Feels like: {}°C)",
                reading.temperature, reading.feels_like
            ),
            format!("Minimum / Maximum: {}°C / {}°C", reading.temp_min, reading.temp_max),
            format!("Humidity: {}%", reading.humidity),
            format!("Pressure: {} hPa", reading.pressure),
            format!(
                "Wind Speed: {} m/s, Direction: {}°",
                reading.wind_speed, reading.wind_direction
            ),
            RULE.to_string(),
            "We wish you a good day.".to_string(),
        ];

        lines.join("\n")
    }

    pub fn subject(&self, reading: &WeatherReading) -> String {
        format!("{} Daily Weather Report", sanitize_text(&reading.city_name))
    }
}
