//! Core library for the daily weather report.
//!
//! This crate defines:
//! - Configuration (environment, `.env`, optional TOML file)
//! - The city directory and user-input resolution
//! - Capability traits for the weather provider, report store and mail relay,
//!   with their production adapters
//! - Report formatting and the pipeline that sequences the stages
//!
//! It is used by `report-cli`, but can also be driven by other binaries or tests.

pub mod city;
pub mod config;
pub mod error;
pub mod model;
pub mod notify;
pub mod pipeline;
pub mod provider;
pub mod report;
pub mod store;

#[cfg(test)]
mod test_logs;

pub use city::CityDirectory;
pub use config::{FileConfig, Settings};
pub use error::{ConfigError, FetchError, NotFoundError, NotifyError, PersistenceError};
pub use model::{CityRecord, EmailMessage, StoredReport, WeatherReading};
pub use notify::{MailNotifier, Notifier, SmtpNotifier};
pub use pipeline::{PipelineState, ReportPipeline, RunOutcome, Stage, StageError, StageFailure};
pub use provider::{OpenWeatherClient, WeatherClient};
pub use report::ReportFormatter;
pub use store::{MongoReportStore, ReportStore};
