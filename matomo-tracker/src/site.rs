//! Site identifiers.

use std::fmt;

use crate::error::{TrackerError, TrackerResult};

/// Identifier of the tracked property on the Matomo server.
///
/// Matomo site ids are usually numeric, but some setups address sites by a
/// string key, so both forms are accepted.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SiteId {
    /// Numeric site id, as shown in the Matomo admin UI.
    Numeric(u64),
    /// String site key.
    Text(String),
}

impl SiteId {
    /// Returns true if the identifier can address a site.
    ///
    /// Zero and blank strings are rejected.
    pub fn is_valid(&self) -> bool {
        match self {
            SiteId::Numeric(id) => *id != 0,
            SiteId::Text(key) => !key.trim().is_empty(),
        }
    }

    /// Checks the identifier, returning it unchanged on success.
    pub fn validate(self) -> TrackerResult<Self> {
        if self.is_valid() {
            Ok(self)
        } else {
            Err(TrackerError::InvalidSiteId(self.to_string()))
        }
    }
}

impl fmt::Display for SiteId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SiteId::Numeric(id) => write!(f, "{}", id),
            SiteId::Text(key) => f.write_str(key),
        }
    }
}

impl From<u64> for SiteId {
    fn from(id: u64) -> Self {
        SiteId::Numeric(id)
    }
}

impl From<u32> for SiteId {
    fn from(id: u32) -> Self {
        SiteId::Numeric(u64::from(id))
    }
}

impl From<&str> for SiteId {
    fn from(key: &str) -> Self {
        SiteId::Text(key.to_string())
    }
}

impl From<String> for SiteId {
    fn from(key: String) -> Self {
        SiteId::Text(key)
    }
}

impl std::str::FromStr for SiteId {
    type Err = TrackerError;

    /// Parses digits as a numeric id and anything else as a string key.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let id = match s.parse::<u64>() {
            Ok(id) => SiteId::Numeric(id),
            Err(_) => SiteId::Text(s.to_string()),
        };
        id.validate()
    }
}
