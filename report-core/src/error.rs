//! Error taxonomy shared by every stage of the report pipeline.

use std::path::PathBuf;

use thiserror::Error;

/// Startup-fatal configuration problems.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Environment variable '{0}' is required but missing")]
    MissingVar(&'static str),

    #[error("Environment variable '{name}' is invalid: {reason}")]
    InvalidVar { name: &'static str, reason: String },

    #[error("Failed to read config file {path}: {reason}")]
    ConfigFile { path: PathBuf, reason: String },

    #[error("Failed to read city list {path}")]
    CityListUnreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse city list {path}")]
    CityListMalformed {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("City list is empty")]
    EmptyCityList,

    #[error("Duplicate city name '{0}' in city list")]
    DuplicateCity(String),

    #[error("Duplicate city id {0} in city list")]
    DuplicateCityId(u32),
}

/// User input did not match any known city. Recoverable by asking again.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("No city matches '{0}'")]
pub struct NotFoundError(pub String);

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    #[error("Weather provider unavailable: {0}")]
    UpstreamUnavailable(String),

    #[error("Malformed weather response: {0}")]
    MalformedResponse(String),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PersistenceError {
    #[error("Could not connect to report store: {0}")]
    Connection(String),

    #[error("Report store rejected write: {0}")]
    WriteRejected(String),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NotifyError {
    #[error("Invalid recipient address '{address}': {reason}")]
    InvalidRecipient { address: String, reason: String },

    #[error("Mail relay rejected credentials: {0}")]
    Authentication(String),

    #[error("Could not reach mail relay: {0}")]
    Connection(String),

    #[error("Mail relay rejected message: {0}")]
    Rejected(String),

    #[error("Could not build email: {0}")]
    Message(String),
}

impl NotifyError {
    /// Everything except a malformed recipient is a delivery failure.
    pub fn is_delivery(&self) -> bool {
        !matches!(self, Self::InvalidRecipient { .. })
    }
}

impl From<lettre::transport::smtp::Error> for NotifyError {
    fn from(err: lettre::transport::smtp::Error) -> Self {
        let auth_rejected = err
            .status()
            .map(|code| matches!(code.to_string().as_str(), "530" | "534" | "535"))
            .unwrap_or(false);

        if auth_rejected {
            Self::Authentication(err.to_string())
        } else if err.is_permanent() || err.is_transient() {
            Self::Rejected(err.to_string())
        } else {
            Self::Connection(err.to_string())
        }
    }
}

impl From<lettre::transport::stub::Error> for NotifyError {
    fn from(err: lettre::transport::stub::Error) -> Self {
        Self::Rejected(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_recipient_is_not_a_delivery_failure() {
        let err = NotifyError::InvalidRecipient {
            address: "nope".into(),
            reason: "missing '@'".into(),
        };
        assert!(!err.is_delivery());
        assert!(NotifyError::Authentication("535".into()).is_delivery());
        assert!(NotifyError::Connection("refused".into()).is_delivery());
    }

    #[test]
    fn messages_name_the_cause() {
        let err = FetchError::UpstreamUnavailable("HTTP 503".into());
        assert!(err.to_string().contains("HTTP 503"));

        let err = NotFoundError("Atlantis".into());
        assert_eq!(err.to_string(), "No city matches 'Atlantis'");
    }
}
