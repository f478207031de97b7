//! CLI error types.

use std::fmt;

use matomo_tracker::TrackerError;

/// Errors reported by `matomo-track` before exiting with a failure code.
#[derive(Debug)]
pub enum CliError {
    /// Settings missing or invalid.
    Config(String),

    /// Tracker rejected its configuration or the submitted events.
    Tracker(TrackerError),

    /// Events file could not be read or parsed.
    EventsFile(String),

    /// Request was sent but not accepted by the endpoint.
    Delivery(String),
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CliError::Config(msg) => write!(f, "Configuration error: {}", msg),
            CliError::Tracker(e) => write!(f, "{}", e),
            CliError::EventsFile(msg) => write!(f, "Failed to load events: {}", msg),
            CliError::Delivery(msg) => write!(f, "Delivery failed: {}", msg),
        }
    }
}

impl std::error::Error for CliError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CliError::Tracker(e) => Some(e),
            _ => None,
        }
    }
}

impl From<TrackerError> for CliError {
    fn from(e: TrackerError) -> Self {
        CliError::Tracker(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_error_display() {
        let err = CliError::Config("site id missing".to_string());
        assert!(err.to_string().contains("Configuration error"));
        assert!(err.to_string().contains("site id missing"));
    }

    #[test]
    fn test_cli_error_from_tracker_error() {
        let err: CliError = TrackerError::MissingUrl.into();
        assert!(matches!(err, CliError::Tracker(_)));
        assert!(std::error::Error::source(&err).is_some());
    }
}
