//! The five-stage report run: resolve city, fetch, persist, format, notify.
//!
//! Every stage failure aborts the run except persistence, which is logged and
//! skipped so the email still goes out.

use std::{fmt, sync::Arc};

use thiserror::Error;
use tracing::{error, info};

use crate::{
    city::CityDirectory,
    error::{FetchError, NotFoundError, NotifyError},
    model::{CityRecord, EmailMessage, StoredReport, WeatherReading},
    notify::Notifier,
    provider::WeatherClient,
    report::ReportFormatter,
    store::ReportStore,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    SelectingCity,
    FetchingWeather,
    Persisting,
    Formatting,
    Notifying,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::SelectingCity => "city selection",
            Stage::FetchingWeather => "weather fetch",
            Stage::Persisting => "persistence",
            Stage::Formatting => "formatting",
            Stage::Notifying => "email delivery",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    SelectingCity,
    FetchingWeather,
    Persisting,
    Formatting,
    Notifying,
    Done,
    Failed(Stage),
}

impl fmt::Display for PipelineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PipelineState::SelectingCity => f.write_str("SelectingCity"),
            PipelineState::FetchingWeather => f.write_str("FetchingWeather"),
            PipelineState::Persisting => f.write_str("Persisting"),
            PipelineState::Formatting => f.write_str("Formatting"),
            PipelineState::Notifying => f.write_str("Notifying"),
            PipelineState::Done => f.write_str("Done"),
            PipelineState::Failed(stage) => write!(f, "Failed({stage})"),
        }
    }
}

#[derive(Error, Debug)]
pub enum StageError {
    #[error(transparent)]
    NotFound(#[from] NotFoundError),

    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Notify(#[from] NotifyError),
}

/// Terminal failure of a run.
#[derive(Error, Debug)]
#[error("{stage} failed: {cause}")]
pub struct StageFailure {
    pub stage: Stage,
    pub cause: StageError,
}

/// What a successful (possibly degraded) run produced.
#[derive(Debug, Clone)]
pub struct RunOutcome {
    pub city: CityRecord,
    pub reading: WeatherReading,
    /// `None` when persistence failed.
    pub stored: Option<StoredReport>,
    pub persistence_degraded: bool,
    pub message: EmailMessage,
}

pub struct ReportPipeline {
    directory: CityDirectory,
    weather: Arc<dyn WeatherClient>,
    store: Arc<dyn ReportStore>,
    formatter: ReportFormatter,
    notifier: Arc<dyn Notifier>,
}

impl ReportPipeline {
    pub fn new(
        directory: CityDirectory,
        weather: Arc<dyn WeatherClient>,
        store: Arc<dyn ReportStore>,
        formatter: ReportFormatter,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            directory,
            weather,
            store,
            formatter,
            notifier,
        }
    }

    pub fn directory(&self) -> &CityDirectory {
        &self.directory
    }

    /// Run one report for `city_input`, emailed to `recipient`.
    pub async fn run(&self, city_input: &str, recipient: &str) -> Result<RunOutcome, StageFailure> {
        let mut state = PipelineState::SelectingCity;
        info!(state = %state, "Starting weather report run for '{}'", city_input.trim());

        let city = self
            .directory
            .resolve(city_input)
            .cloned()
            .map_err(|e| fail(&mut state, Stage::SelectingCity, e.into()))?;
        info!("User selected city: {} ({})", city.name, city.lookup_key);

        advance(&mut state, PipelineState::FetchingWeather);
        let reading = self
            .weather
            .fetch_current(&city)
            .await
            .map_err(|e| fail(&mut state, Stage::FetchingWeather, e.into()))?;

        advance(&mut state, PipelineState::Persisting);
        let stored = match self.store.save(&reading).await {
            Ok(stored) => Some(stored),
            Err(e) => {
                error!(stage = %Stage::Persisting, "Could not save weather report, continuing: {}", e);
                None
            }
        };
        let persistence_degraded = stored.is_none();

        advance(&mut state, PipelineState::Formatting);
        if persistence_degraded {
            info!(persistence_degraded, "Formatting report without a stored copy");
        }
        let message = EmailMessage {
            recipient: recipient.trim().to_string(),
            subject: self.formatter.subject(&reading),
            body: self.formatter.render(&reading),
        };
        info!("Daily weather report built for city '{}'", city.name);

        advance(&mut state, PipelineState::Notifying);
        self.notifier
            .send(&message)
            .await
            .map_err(|e| fail(&mut state, Stage::Notifying, e.into()))?;

        advance(&mut state, PipelineState::Done);
        info!(persistence_degraded, "Weather report process completed for {}", city.name);

        Ok(RunOutcome {
            city,
            reading,
            stored,
            persistence_degraded,
            message,
        })
    }
}

fn advance(state: &mut PipelineState, next: PipelineState) {
    info!(from = %state, to = %next, "Stage transition");
    *state = next;
}

fn fail(state: &mut PipelineState, stage: Stage, cause: StageError) -> StageFailure {
    let next = PipelineState::Failed(stage);
    error!(from = %state, to = %next, "{} failed: {}", stage, cause);
    *state = next;
    StageFailure { stage, cause }
}
