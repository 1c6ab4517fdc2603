use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use mongodb::{
    Client,
    bson::{self, Bson, Document, doc},
    error::ErrorKind,
    options::ClientOptions,
};
use tracing::{error, info};

use crate::{
    error::PersistenceError,
    model::{StoredReport, WeatherReading},
};

use super::ReportStore;

pub const DATABASE: &str = "weather_project";
pub const COLLECTION: &str = "weather_reports";

const SERVER_SELECTION_TIMEOUT: Duration = Duration::from_secs(5);

/// Inserts one document per reading. Each call opens its own client and
/// shuts it down before returning.
#[derive(Clone)]
pub struct MongoReportStore {
    uri: String,
}

// The URI carries credentials.
impl std::fmt::Debug for MongoReportStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MongoReportStore").field("uri", &"<redacted>").finish()
    }
}

impl MongoReportStore {
    pub fn new(uri: String) -> Self {
        Self { uri }
    }

    async fn connect(&self) -> Result<Client, PersistenceError> {
        let mut options = ClientOptions::parse(&self.uri).await.map_err(|e| {
            error!("Invalid MongoDB connection string: {}", e);
            PersistenceError::Connection(e.to_string())
        })?;

        options.server_selection_timeout.get_or_insert(SERVER_SELECTION_TIMEOUT);
        options.app_name.get_or_insert_with(|| "weather-report".to_string());

        Client::with_options(options).map_err(|e| PersistenceError::Connection(e.to_string()))
    }
}

#[async_trait]
impl ReportStore for MongoReportStore {
    async fn save(&self, reading: &WeatherReading) -> Result<StoredReport, PersistenceError> {
        let client = self.connect().await?;
        let stored_at = Utc::now();

        let result = client
            .database(DATABASE)
            .collection::<Document>(COLLECTION)
            .insert_one(report_document(reading, stored_at))
            .await;

        client.shutdown().await;

        let inserted = result.map_err(|e| {
            error!("Failed to insert weather report: {}", e);
            classify(&e)
        })?;

        let id = match inserted.inserted_id {
            Bson::ObjectId(oid) => oid.to_hex(),
            other => other.to_string(),
        };

        info!("Weather report saved for city {} as {}", reading.city_name, id);

        Ok(StoredReport {
            id,
            stored_at,
            reading: reading.clone(),
        })
    }
}

fn classify(err: &mongodb::error::Error) -> PersistenceError {
    match *err.kind {
        ErrorKind::ServerSelection { .. } | ErrorKind::Io(_) | ErrorKind::DnsResolve { .. } => {
            PersistenceError::Connection(err.to_string())
        }
        _ => PersistenceError::WriteRejected(err.to_string()),
    }
}

/// The stored shape: the reading's fields plus city and save time.
pub fn report_document(reading: &WeatherReading, stored_at: DateTime<Utc>) -> Document {
    doc! {
        "city": reading.city_name.as_str(),
        "timestamp": bson::DateTime::from_millis(stored_at.timestamp_millis()),
        "observed_at": bson::DateTime::from_millis(reading.observed_at.timestamp_millis()),
        "condition": reading.condition.as_str(),
        "temperature": reading.temperature,
        "feels_like": reading.feels_like,
        "temp_min": reading.temp_min,
        "temp_max": reading.temp_max,
        "humidity": i32::from(reading.humidity),
        "pressure": i64::from(reading.pressure),
        "wind_speed": reading.wind_speed,
        "wind_direction": i32::from(reading.wind_direction),
    }
}
