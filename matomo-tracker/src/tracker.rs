//! The tracker: validates hits and submits them to a Matomo endpoint.
//!
//! # Request flow
//!
//! ```text
//! track / track_bulk ──► validate + stamp ──► spawn task ──► HttpTransport
//!        │ (sync errors)                                        │
//!        ▼                                                      ▼
//!   TrackerError                               classify status ──► ErrorObservers
//!                                                               │
//!                                                               ▼
//!                                                       DeliveryOutcome
//! ```
//!
//! Validation happens before anything is spawned, so a rejected call never
//! reaches the transport. Network outcomes are reported to error observers and
//! through the returned [`Delivery`], never as errors.

use std::sync::Arc;

use reqwest::Url;
use serde::Serialize;
use tokio::runtime::Handle;
use tracing::debug;

use crate::config::TrackerConfig;
use crate::delivery::{Delivery, DeliveryOutcome};
use crate::error::{TrackerError, TrackerResult};
use crate::event::TrackingEvent;
use crate::observer::{ErrorNotification, ErrorObservers, ObserverId};
use crate::site::SiteId;
use crate::status;
use crate::transport::{
    HttpTransport, PostRequest, ReqwestTransport, TransportError, TransportOptions,
    TransportResponse, TransportScheme,
};

/// Endpoint file names accepted without `skip_url_validation`.
pub const TRACKING_ENDPOINTS: [&str; 2] = ["matomo.php", "piwik.php"];

/// Callback receiving the full response body of a bulk submission.
pub type BulkCallback = Box<dyn FnOnce(String) + Send + 'static>;

/// JSON body of a bulk request.
#[derive(Serialize)]
struct BulkPayload {
    requests: Vec<String>,
}

/// Client for one Matomo site on one tracking endpoint.
///
/// The site id, the tracker URL and the transport are fixed at construction.
/// Tracking a different site or switching between HTTP and HTTPS means
/// building another tracker.
///
/// # Example
///
/// ```no_run
/// use matomo_tracker::{Tracker, TrackingEvent};
///
/// # async fn run() -> Result<(), matomo_tracker::TrackerError> {
/// let tracker = Tracker::new(1u64, "https://analytics.example.com/matomo.php")?;
/// tracker.on_error(|err| eprintln!("tracking failed: {}", err));
///
/// tracker.track("https://example.com/pricing")?;
/// tracker.track(TrackingEvent::url("https://example.com/").with_action_name("Home"))?;
/// # Ok(())
/// # }
/// ```
pub struct Tracker {
    site_id: SiteId,
    tracker_url: String,
    endpoint: Url,
    scheme: TransportScheme,
    transport: Arc<dyn HttpTransport>,
    observers: Arc<ErrorObservers>,
    runtime: Handle,
}

impl Tracker {
    /// Creates a tracker with the default reqwest transports on the current
    /// Tokio runtime.
    pub fn new(site_id: impl Into<SiteId>, tracker_url: impl Into<String>) -> TrackerResult<Self> {
        Self::builder(site_id, tracker_url).build()
    }

    pub fn builder(site_id: impl Into<SiteId>, tracker_url: impl Into<String>) -> TrackerBuilder {
        TrackerBuilder::new(site_id.into(), tracker_url.into())
    }

    /// Creates a tracker from loaded configuration.
    pub fn from_config(config: &TrackerConfig) -> TrackerResult<Self> {
        let site_id = config
            .site_id
            .clone()
            .ok_or_else(|| TrackerError::InvalidSiteId(String::new()))?;
        let tracker_url = config
            .tracker_url
            .clone()
            .ok_or(TrackerError::MissingTrackerUrl)?;

        Self::builder(site_id, tracker_url)
            .skip_url_validation(config.skip_url_validation)
            .transport_options(config.transport_options())
            .build()
    }

    pub fn site_id(&self) -> &SiteId {
        &self.site_id
    }

    /// The tracker URL exactly as given at construction.
    pub fn tracker_url(&self) -> &str {
        &self.tracker_url
    }

    pub fn scheme(&self) -> TransportScheme {
        self.scheme
    }

    /// Registers an error observer.
    pub fn on_error<F>(&self, handler: F) -> ObserverId
    where
        F: Fn(&ErrorNotification) + Send + Sync + 'static,
    {
        self.observers.register(handler)
    }

    /// Registers an error observer that forwards into a channel.
    pub fn subscribe_errors(&self) -> tokio::sync::mpsc::UnboundedReceiver<ErrorNotification> {
        self.observers.subscribe().1
    }

    pub fn remove_error_observer(&self, id: ObserverId) -> bool {
        self.observers.remove(id)
    }

    pub fn error_observer_count(&self) -> usize {
        self.observers.len()
    }

    /// Tracks a single hit with a GET request.
    ///
    /// Accepts a page URL or a [`TrackingEvent`] carrying a non-empty `url`.
    /// Returns as soon as the request is spawned.
    ///
    /// # Errors
    ///
    /// Returns `TrackerError::MissingUrl` if the event has no `url`; nothing
    /// is sent in that case.
    pub fn track(&self, event: impl Into<TrackingEvent>) -> TrackerResult<Delivery> {
        let mut event = event.into();
        if event.tracked_url().is_none() {
            return Err(TrackerError::MissingUrl);
        }
        event.stamp(&self.site_id);

        let url = self.request_url(&event);
        let notify = !self.observers.is_empty();
        let transport = Arc::clone(&self.transport);
        let observers = Arc::clone(&self.observers);

        debug!(
            endpoint = %self.endpoint,
            params = event.len(),
            scheme = ?self.scheme,
            "Sending tracking request"
        );

        let task = self.runtime.spawn(async move {
            let result = transport.get(url).await;
            let outcome = classify(&result);
            report(&outcome, notify, &observers);
            outcome
        });

        Ok(Delivery::new(task))
    }

    /// Tracks several hits with one POST request.
    ///
    /// Each event is stamped and encoded as a query fragment; the fragments
    /// are sent as `{"requests": [...]}`. The callback, if any, receives the
    /// full response body once it has been read, whatever the status.
    ///
    /// # Errors
    ///
    /// Returns `TrackerError::EmptyBatch` for an empty batch and
    /// `TrackerError::MissingSiteId` if the site id is unusable.
    pub fn track_bulk(
        &self,
        events: impl IntoIterator<Item = TrackingEvent>,
        callback: Option<BulkCallback>,
    ) -> TrackerResult<Delivery> {
        let events: Vec<TrackingEvent> = events.into_iter().collect();
        if events.is_empty() {
            return Err(TrackerError::EmptyBatch);
        }
        if !self.site_id.is_valid() {
            return Err(TrackerError::MissingSiteId);
        }

        let body = self.bulk_body(events);
        let request = PostRequest::json(body);
        let url = self.endpoint.clone();
        let notify = !self.observers.is_empty();
        let transport = Arc::clone(&self.transport);
        let observers = Arc::clone(&self.observers);

        debug!(
            url = %url,
            scheme = ?self.scheme,
            bytes = request.body.len(),
            "Sending bulk tracking request"
        );

        let task = self.runtime.spawn(async move {
            let result = transport.post(url, request).await;
            let outcome = classify(&result);
            report(&outcome, notify, &observers);

            if let (Ok(TransportResponse { body, .. }), Some(callback)) = (result, callback) {
                callback(String::from_utf8_lossy(&body).into_owned());
            }
            outcome
        });

        Ok(Delivery::new(task))
    }

    /// Endpoint URL with the event's parameters appended to the query.
    fn request_url(&self, event: &TrackingEvent) -> Url {
        let mut url = self.endpoint.clone();
        let query = match url.query().filter(|q| !q.is_empty()) {
            Some(existing) => format!("{}&{}", existing, event.to_query_string()),
            None => event.to_query_string(),
        };
        url.set_query(Some(&query));
        url
    }

    fn bulk_body(&self, events: Vec<TrackingEvent>) -> String {
        let requests = events
            .into_iter()
            .map(|mut event| {
                event.stamp(&self.site_id);
                format!("?{}", event.to_query_string())
            })
            .collect();

        // Serializing a list of strings cannot fail.
        serde_json::to_string(&BulkPayload { requests }).unwrap_or_default()
    }
}

impl std::fmt::Debug for Tracker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Tracker")
            .field("site_id", &self.site_id)
            .field("tracker_url", &self.tracker_url)
            .field("scheme", &self.scheme)
            .field("observers", &self.observers)
            .finish()
    }
}

fn classify(result: &Result<TransportResponse, TransportError>) -> DeliveryOutcome {
    match result {
        Ok(response) if status::is_success(response.status) => DeliveryOutcome::Accepted {
            status: response.status,
        },
        Ok(response) => DeliveryOutcome::Rejected {
            status: response.status,
        },
        Err(e) => DeliveryOutcome::TransportFailed {
            message: e.message.clone(),
        },
    }
}

/// Hands an anomaly to the observers if any were registered at call time.
fn report(outcome: &DeliveryOutcome, notify: bool, observers: &ErrorObservers) {
    match outcome.anomaly() {
        Some(notification) if notify => {
            debug!(anomaly = %notification, "Tracking request failed");
            observers.notify(&notification);
        }
        _ => {}
    }
}

/// Builder for [`Tracker`].
pub struct TrackerBuilder {
    site_id: SiteId,
    tracker_url: String,
    skip_url_validation: bool,
    transports: Option<(Arc<dyn HttpTransport>, Arc<dyn HttpTransport>)>,
    transport_options: TransportOptions,
    runtime: Option<Handle>,
}

impl TrackerBuilder {
    fn new(site_id: SiteId, tracker_url: String) -> Self {
        Self {
            site_id,
            tracker_url,
            skip_url_validation: false,
            transports: None,
            transport_options: TransportOptions::default(),
            runtime: None,
        }
    }

    /// Accept endpoints not named `matomo.php` or `piwik.php`.
    pub fn skip_url_validation(mut self, skip: bool) -> Self {
        self.skip_url_validation = skip;
        self
    }

    /// Use custom transports for plain and secure endpoints.
    pub fn transports(
        mut self,
        plain: Arc<dyn HttpTransport>,
        secure: Arc<dyn HttpTransport>,
    ) -> Self {
        self.transports = Some((plain, secure));
        self
    }

    /// Options for the default reqwest transports. Ignored with custom
    /// transports.
    pub fn transport_options(mut self, options: TransportOptions) -> Self {
        self.transport_options = options;
        self
    }

    /// Runtime on which requests are spawned. Defaults to the current one.
    pub fn runtime(mut self, handle: Handle) -> Self {
        self.runtime = Some(handle);
        self
    }

    pub fn build(self) -> TrackerResult<Tracker> {
        let site_id = self.site_id.validate()?;
        let endpoint = validate_tracker_url(&self.tracker_url, self.skip_url_validation)?;
        let scheme = TransportScheme::for_url(&endpoint);

        let transport: Arc<dyn HttpTransport> = match self.transports {
            Some((plain, secure)) => match scheme {
                TransportScheme::Plain => plain,
                TransportScheme::Secure => secure,
            },
            None => Arc::new(ReqwestTransport::with_options(
                scheme,
                &self.transport_options,
            )?),
        };

        let runtime = match self.runtime {
            Some(handle) => handle,
            None => Handle::try_current().map_err(|_| TrackerError::NoRuntime)?,
        };

        debug!(site_id = %site_id, url = %self.tracker_url, ?scheme, "Tracker created");

        Ok(Tracker {
            site_id,
            tracker_url: self.tracker_url,
            endpoint,
            scheme,
            transport,
            observers: Arc::new(ErrorObservers::new()),
            runtime,
        })
    }
}

fn validate_tracker_url(tracker_url: &str, skip_url_validation: bool) -> TrackerResult<Url> {
    if tracker_url.trim().is_empty() {
        return Err(TrackerError::MissingTrackerUrl);
    }
    if !skip_url_validation
        && !TRACKING_ENDPOINTS
            .iter()
            .any(|name| tracker_url.ends_with(name))
    {
        return Err(TrackerError::UnrecognizedEndpoint(tracker_url.to_string()));
    }

    let url = Url::parse(tracker_url).map_err(|e| TrackerError::InvalidTrackerUrl {
        url: tracker_url.to_string(),
        reason: e.to_string(),
    })?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(TrackerError::InvalidTrackerUrl {
            url: tracker_url.to_string(),
            reason: format!("unsupported scheme '{}'", url.scheme()),
        });
    }
    Ok(url)
}
