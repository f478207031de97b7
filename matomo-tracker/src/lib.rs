//! matomo-tracker - Client for the Matomo tracking HTTP API
//!
//! This library sends analytics hits to a Matomo (formerly Piwik) tracking
//! endpoint, one at a time with GET or in batches with a JSON POST.
//!
//! Tracking is fire-and-forget: calls validate their input, spawn the request
//! on the Tokio runtime and return. Failed deliveries are reported to error
//! observers registered on the [`Tracker`] instead of being returned, so a
//! tracking outage never interrupts the host application.
//!
//! # Example
//!
//! ```no_run
//! use matomo_tracker::{Tracker, TrackingEvent};
//!
//! # async fn run() -> Result<(), matomo_tracker::TrackerError> {
//! let tracker = Tracker::new(1u64, "https://analytics.example.com/matomo.php")?;
//! let mut errors = tracker.subscribe_errors();
//!
//! tracker.track("https://example.com/")?;
//!
//! let events = vec![
//!     TrackingEvent::url("https://example.com/a").with_action_name("A"),
//!     TrackingEvent::url("https://example.com/b").with_action_name("B"),
//! ];
//! let outcome = tracker
//!     .track_bulk(events, Some(Box::new(|body: String| println!("{}", body))))?
//!     .await;
//!
//! if !outcome.is_success() {
//!     println!("bulk failed: {:?}", errors.recv().await);
//! }
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod delivery;
pub mod error;
pub mod event;
pub mod observer;
pub mod site;
pub mod status;
pub mod tracker;
pub mod transport;

pub use config::{config_file_path, TrackerConfig};
pub use delivery::{Delivery, DeliveryOutcome};
pub use error::{TrackerError, TrackerResult};
pub use event::{MediaType, ParamValue, TrackingEvent};
pub use observer::{ErrorNotification, ErrorObservers, ObserverId};
pub use site::SiteId;
pub use tracker::{BulkCallback, Tracker, TrackerBuilder};
pub use transport::{
    HttpTransport, PostRequest, ReqwestTransport, TransportError, TransportOptions,
    TransportResponse, TransportScheme,
};
