//! Error types for tracker construction and submission.
//!
//! Only synchronous failures live here. Network outcomes never surface as a
//! `TrackerError`; they are reported to error observers instead (see
//! [`crate::observer`]).

use thiserror::Error;

/// Result type for tracker operations.
pub type TrackerResult<T> = Result<T, TrackerError>;

/// Errors raised synchronously by the tracker, before any request is sent.
#[derive(Debug, Error)]
pub enum TrackerError {
    /// Site identifier is zero, empty or blank.
    #[error("Matomo siteId required, got {0:?}")]
    InvalidSiteId(String),

    /// Tracker URL was empty.
    #[error("Matomo tracker URL required, e.g. http://example.com/matomo.php")]
    MissingTrackerUrl,

    /// Tracker URL could not be parsed as an absolute http(s) URL.
    #[error("Invalid tracker URL {url}: {reason}")]
    InvalidTrackerUrl { url: String, reason: String },

    /// Tracker URL does not point at a known tracking endpoint.
    #[error("A tracker URL must end with \"matomo.php\" or \"piwik.php\", got {0}")]
    UnrecognizedEndpoint(String),

    /// No Tokio runtime was supplied or running at construction.
    #[error("No Tokio runtime available to run tracking requests")]
    NoRuntime,

    /// Site identifier missing at bulk submission time.
    #[error("siteId must be specified")]
    MissingSiteId,

    /// HTTP client could not be created.
    #[error("Failed to create HTTP transport: {0}")]
    Transport(String),

    /// Configuration file could not be read or parsed.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Event has no `url` parameter.
    #[error("URL to be tracked must be specified")]
    MissingUrl,

    /// Bulk submission with no events.
    #[error("Events require at least one")]
    EmptyBatch,
}

impl TrackerError {
    /// Returns true for errors that stem from tracker setup.
    pub fn is_configuration(&self) -> bool {
        !self.is_validation()
    }

    /// Returns true for errors caused by the arguments of a single call.
    pub fn is_validation(&self) -> bool {
        matches!(self, TrackerError::MissingUrl | TrackerError::EmptyBatch)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_mentions_site_id() {
        let err = TrackerError::InvalidSiteId("0".to_string());
        assert!(err.to_string().contains("siteId"));
    }

    #[test]
    fn test_error_display_mentions_tracker() {
        assert!(TrackerError::MissingTrackerUrl
            .to_string()
            .contains("tracker URL"));
        let err = TrackerError::UnrecognizedEndpoint("http://example.com/index.php".to_string());
        assert!(err.to_string().contains("matomo.php"));
        assert!(err.to_string().contains("http://example.com/index.php"));
    }

    #[test]
    fn test_error_display_mentions_url() {
        assert!(TrackerError::MissingUrl.to_string().contains("URL"));
    }

    #[test]
    fn test_error_categories() {
        assert!(TrackerError::MissingUrl.is_validation());
        assert!(TrackerError::EmptyBatch.is_validation());
        assert!(!TrackerError::EmptyBatch.is_configuration());

        assert!(TrackerError::MissingTrackerUrl.is_configuration());
        assert!(TrackerError::MissingSiteId.is_configuration());
        assert!(TrackerError::NoRuntime.is_configuration());
        assert!(TrackerError::InvalidTrackerUrl {
            url: "nope".to_string(),
            reason: "relative URL without a base".to_string(),
        }
        .is_configuration());
    }
}
