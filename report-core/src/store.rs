use async_trait::async_trait;
use std::fmt::Debug;

use crate::{
    error::PersistenceError,
    model::{StoredReport, WeatherReading},
};

pub mod mongo;

pub use mongo::MongoReportStore;

/// Write-only persistence for readings. Nothing in this crate reads them back.
#[async_trait]
pub trait ReportStore: Send + Sync + Debug {
    async fn save(&self, reading: &WeatherReading) -> Result<StoredReport, PersistenceError>;
}
