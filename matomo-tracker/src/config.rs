//! Tracker configuration.
//!
//! Settings can be built in code or loaded from an INI file:
//!
//! ```ini
//! [tracker]
//! site_id = 1
//! tracker_url = https://analytics.example.com/matomo.php
//! skip_url_validation = false
//! user_agent = my-service/1.0
//! timeout_secs = 10
//! ```
//!
//! `user_agent` and `timeout_secs` configure the default reqwest transports
//! only. The tracker itself has no timeout of its own.

use std::path::{Path, PathBuf};
use std::time::Duration;

use ini::Ini;

use crate::error::{TrackerError, TrackerResult};
use crate::site::SiteId;
use crate::transport::TransportOptions;

/// INI section holding tracker settings.
pub const TRACKER_SECTION: &str = "tracker";

/// Path of the per-user configuration file, if a config directory exists.
///
/// `~/.config/matomo-tracker/config.ini` on Linux.
pub fn config_file_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("matomo-tracker").join("config.ini"))
}

/// Configuration for a [`Tracker`](crate::Tracker).
#[derive(Debug, Clone, Default)]
pub struct TrackerConfig {
    pub site_id: Option<SiteId>,
    pub tracker_url: Option<String>,
    /// Accept endpoints not named `matomo.php` or `piwik.php`.
    pub skip_url_validation: bool,
    pub user_agent: Option<String>,
    pub timeout: Option<Duration>,
}

impl TrackerConfig {
    pub fn new(site_id: impl Into<SiteId>, tracker_url: impl Into<String>) -> Self {
        Self {
            site_id: Some(site_id.into()),
            tracker_url: Some(tracker_url.into()),
            ..Default::default()
        }
    }

    /// Set the site id.
    pub fn with_site_id(mut self, site_id: impl Into<SiteId>) -> Self {
        self.site_id = Some(site_id.into());
        self
    }

    /// Set the tracker URL.
    pub fn with_tracker_url(mut self, url: impl Into<String>) -> Self {
        self.tracker_url = Some(url.into());
        self
    }

    /// Enable or disable endpoint name validation.
    pub fn with_skip_url_validation(mut self, skip: bool) -> Self {
        self.skip_url_validation = skip;
        self
    }

    /// Set the User-Agent sent by the default transports.
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }

    /// Set the request timeout of the default transports.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Load settings from an INI file.
    pub fn load(path: &Path) -> TrackerResult<Self> {
        let ini = Ini::load_from_file(path)
            .map_err(|e| TrackerError::Config(format!("{}: {}", path.display(), e)))?;
        Self::from_ini(&ini)
    }

    /// Parse settings from INI text.
    pub fn from_ini_str(text: &str) -> TrackerResult<Self> {
        let ini = Ini::load_from_str(text).map_err(|e| TrackerError::Config(e.to_string()))?;
        Self::from_ini(&ini)
    }

    fn from_ini(ini: &Ini) -> TrackerResult<Self> {
        let mut config = Self::default();
        let Some(section) = ini.section(Some(TRACKER_SECTION)) else {
            return Ok(config);
        };

        if let Some(value) = section.get("site_id").filter(|v| !v.trim().is_empty()) {
            config.site_id = Some(value.parse()?);
        }
        if let Some(value) = section.get("tracker_url").filter(|v| !v.trim().is_empty()) {
            config.tracker_url = Some(value.trim().to_string());
        }
        if let Some(value) = section.get("skip_url_validation") {
            config.skip_url_validation = parse_bool("skip_url_validation", value)?;
        }
        if let Some(value) = section.get("user_agent").filter(|v| !v.trim().is_empty()) {
            config.user_agent = Some(value.trim().to_string());
        }
        if let Some(value) = section.get("timeout_secs") {
            let secs: u64 = value.trim().parse().map_err(|_| {
                TrackerError::Config(format!("timeout_secs must be a whole number, got '{}'", value))
            })?;
            config.timeout = Some(Duration::from_secs(secs));
        }

        Ok(config)
    }

    /// Fill unset fields from another configuration.
    ///
    /// Values already present in `self` take precedence.
    pub fn or(mut self, fallback: TrackerConfig) -> Self {
        self.site_id = self.site_id.or(fallback.site_id);
        self.tracker_url = self.tracker_url.or(fallback.tracker_url);
        self.skip_url_validation |= fallback.skip_url_validation;
        self.user_agent = self.user_agent.or(fallback.user_agent);
        self.timeout = self.timeout.or(fallback.timeout);
        self
    }

    pub(crate) fn transport_options(&self) -> TransportOptions {
        TransportOptions {
            user_agent: self.user_agent.clone(),
            timeout: self.timeout,
        }
    }
}

fn parse_bool(key: &str, value: &str) -> TrackerResult<bool> {
    match value.trim().to_lowercase().as_str() {
        "true" | "yes" | "1" | "on" => Ok(true),
        "false" | "no" | "0" | "off" | "" => Ok(false),
        other => Err(TrackerError::Config(format!(
            "{} must be true or false, got '{}'",
            key, other
        ))),
    }
}
