//! Tracking events.
//!
//! A [`TrackingEvent`] is one analytics hit: an insertion-ordered map of
//! Matomo tracking API parameters. The map is open-ended so that parameters
//! without a typed setter can still be sent through [`TrackingEvent::with_param`].
//!
//! # Example
//!
//! ```
//! use matomo_tracker::TrackingEvent;
//!
//! let event = TrackingEvent::url("https://shop.example.com/cart")
//!     .with_action_name("Cart")
//!     .with_event("Checkout", "open", None, None)
//!     .with_param("dimension1", "beta");
//!
//! assert_eq!(event.get("e_c").map(|v| v.to_string()), Some("Checkout".into()));
//! ```
//!
//! The parameter reference lives at
//! <https://developer.matomo.org/api-reference/tracking-api>.

use std::fmt;

use serde::de::{self, Deserialize, Deserializer, MapAccess, Visitor};
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};

use crate::site::SiteId;

/// Parameter carrying the tracked page or resource.
pub const PARAM_URL: &str = "url";

/// Parameter carrying the site identifier. Always set by the tracker.
pub const PARAM_SITE_ID: &str = "idsite";

/// Parameter requesting that the hit be recorded. Always set by the tracker.
pub const PARAM_RECORD: &str = "rec";

/// RFC 3986 unreserved characters stay literal; everything else is escaped.
const QUERY_COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

/// Scalar value of a tracking parameter.
#[derive(Debug, Clone, PartialEq)]
pub enum ParamValue {
    Text(String),
    Integer(i64),
    Float(f64),
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamValue::Text(s) => f.write_str(s),
            ParamValue::Integer(n) => write!(f, "{}", n),
            ParamValue::Float(n) => write!(f, "{}", n),
        }
    }
}

impl From<&str> for ParamValue {
    fn from(s: &str) -> Self {
        ParamValue::Text(s.to_string())
    }
}

impl From<String> for ParamValue {
    fn from(s: String) -> Self {
        ParamValue::Text(s)
    }
}

impl From<&String> for ParamValue {
    fn from(s: &String) -> Self {
        ParamValue::Text(s.clone())
    }
}

impl From<i64> for ParamValue {
    fn from(n: i64) -> Self {
        ParamValue::Integer(n)
    }
}

impl From<i32> for ParamValue {
    fn from(n: i32) -> Self {
        ParamValue::Integer(i64::from(n))
    }
}

impl From<u32> for ParamValue {
    fn from(n: u32) -> Self {
        ParamValue::Integer(i64::from(n))
    }
}

impl From<u64> for ParamValue {
    fn from(n: u64) -> Self {
        match i64::try_from(n) {
            Ok(n) => ParamValue::Integer(n),
            Err(_) => ParamValue::Text(n.to_string()),
        }
    }
}

impl From<f64> for ParamValue {
    fn from(n: f64) -> Self {
        ParamValue::Float(n)
    }
}

impl From<bool> for ParamValue {
    fn from(flag: bool) -> Self {
        ParamValue::Integer(i64::from(flag))
    }
}

impl From<&SiteId> for ParamValue {
    fn from(id: &SiteId) -> Self {
        match id {
            SiteId::Numeric(n) => ParamValue::from(*n),
            SiteId::Text(key) => ParamValue::Text(key.clone()),
        }
    }
}

/// Media type for media analytics hits (`ma_mt`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaType {
    Video,
    Audio,
}

impl MediaType {
    fn as_str(self) -> &'static str {
        match self {
            MediaType::Video => "video",
            MediaType::Audio => "audio",
        }
    }
}

/// One analytics hit.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TrackingEvent {
    params: Vec<(String, ParamValue)>,
}

impl TrackingEvent {
    /// Creates an empty event.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an event tracking the given page URL.
    pub fn url(url: impl Into<String>) -> Self {
        Self::new().with_param(PARAM_URL, url.into())
    }

    /// Sets a parameter, replacing any existing value in place.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<ParamValue>) {
        let key = key.into();
        let value = value.into();
        match self.params.iter_mut().find(|(k, _)| *k == key) {
            Some((_, existing)) => *existing = value,
            None => self.params.push((key, value)),
        }
    }

    /// Builder form of [`set`](Self::set).
    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<ParamValue>) -> Self {
        self.set(key, value);
        self
    }

    /// Removes a parameter, returning its value.
    pub fn remove(&mut self, key: &str) -> Option<ParamValue> {
        let index = self.params.iter().position(|(k, _)| k == key)?;
        Some(self.params.remove(index).1)
    }

    pub fn get(&self, key: &str) -> Option<&ParamValue> {
        self.params.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    pub fn len(&self) -> usize {
        self.params.len()
    }

    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    /// Iterates parameters in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &ParamValue)> {
        self.params.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Returns the tracked URL if present and not blank.
    ///
    /// Empty text, zero and NaN count as no URL.
    pub fn tracked_url(&self) -> Option<&ParamValue> {
        self.get(PARAM_URL).filter(|v| match v {
            ParamValue::Text(s) => !s.is_empty(),
            ParamValue::Integer(n) => *n != 0,
            ParamValue::Float(f) => *f != 0.0 && !f.is_nan(),
        })
    }

    /// Stamps the site id and the record flag, overwriting caller values.
    pub fn stamp(&mut self, site_id: &SiteId) {
        self.set(PARAM_SITE_ID, site_id);
        self.set(PARAM_RECORD, 1);
    }

    /// Encodes the parameters as a `key=value&...` query string.
    ///
    /// Names and values are percent-encoded per RFC 3986, so a space becomes
    /// `%20` rather than `+`.
    pub fn to_query_string(&self) -> String {
        self.params
            .iter()
            .map(|(k, v)| {
                format!(
                    "{}={}",
                    utf8_percent_encode(k, QUERY_COMPONENT),
                    utf8_percent_encode(&v.to_string(), QUERY_COMPONENT)
                )
            })
            .collect::<Vec<_>>()
            .join("&")
    }

    // Recommended parameters

    /// Title of the action (`action_name`).
    pub fn with_action_name(self, name: impl Into<String>) -> Self {
        self.with_param("action_name", name.into())
    }

    /// 16 hex character visitor id (`_id`).
    pub fn with_visitor_id(self, id: impl Into<String>) -> Self {
        self.with_param("_id", id.into())
    }

    /// Random value to defeat caching (`rand`).
    pub fn with_cache_buster(self, value: impl Into<String>) -> Self {
        self.with_param("rand", value.into())
    }

    /// Tracking API version (`apiv`).
    pub fn with_api_version(self) -> Self {
        self.with_param("apiv", 1)
    }

    // User info

    /// Referrer URL (`urlref`).
    pub fn with_referrer(self, url: impl Into<String>) -> Self {
        self.with_param("urlref", url.into())
    }

    /// Screen resolution as `WxH` (`res`).
    pub fn with_resolution(self, width: u32, height: u32) -> Self {
        self.with_param("res", format!("{}x{}", width, height))
    }

    /// Local time of the visitor (`h`, `m`, `s`).
    pub fn with_local_time(self, hour: u32, minute: u32, second: u32) -> Self {
        self.with_param("h", hour)
            .with_param("m", minute)
            .with_param("s", second)
    }

    /// User agent override (`ua`).
    pub fn with_user_agent(self, ua: impl Into<String>) -> Self {
        self.with_param("ua", ua.into())
    }

    /// Accept-Language override (`lang`).
    pub fn with_language(self, lang: impl Into<String>) -> Self {
        self.with_param("lang", lang.into())
    }

    /// Application user id (`uid`).
    pub fn with_user_id(self, uid: impl Into<String>) -> Self {
        self.with_param("uid", uid.into())
    }

    /// Forced visitor id (`cid`).
    pub fn with_forced_visitor_id(self, cid: impl Into<String>) -> Self {
        self.with_param("cid", cid.into())
    }

    /// Forces a new visit (`new_visit`).
    pub fn with_new_visit(self) -> Self {
        self.with_param("new_visit", 1)
    }

    /// Visit scope custom variables as JSON (`_cvar`).
    pub fn with_visit_custom_variables(self, json: impl Into<String>) -> Self {
        self.with_param("_cvar", json.into())
    }

    // Action info

    /// Outlink URL (`link`).
    pub fn with_outlink(self, url: impl Into<String>) -> Self {
        self.with_param("link", url.into())
    }

    /// Download URL (`download`).
    pub fn with_download(self, url: impl Into<String>) -> Self {
        self.with_param("download", url.into())
    }

    /// Site search keyword, with optional category and result count.
    pub fn with_search(
        self,
        keyword: impl Into<String>,
        category: Option<&str>,
        count: Option<u32>,
    ) -> Self {
        let mut event = self.with_param("search", keyword.into());
        if let Some(category) = category {
            event.set("search_cat", category);
        }
        if let Some(count) = count {
            event.set("search_count", count);
        }
        event
    }

    /// Page view id (`pv_id`).
    pub fn with_page_view_id(self, id: impl Into<String>) -> Self {
        self.with_param("pv_id", id.into())
    }

    /// Goal conversion (`idgoal`, `revenue`).
    pub fn with_goal(self, goal_id: u32, revenue: Option<f64>) -> Self {
        let mut event = self.with_param("idgoal", goal_id);
        if let Some(revenue) = revenue {
            event.set("revenue", revenue);
        }
        event
    }

    /// Generation time in milliseconds (`gt_ms`).
    pub fn with_generation_time_ms(self, ms: u32) -> Self {
        self.with_param("gt_ms", ms)
    }

    /// Page charset (`cs`).
    pub fn with_charset(self, charset: impl Into<String>) -> Self {
        self.with_param("cs", charset.into())
    }

    // Event tracking

    /// Event category and action with optional name and value
    /// (`e_c`, `e_a`, `e_n`, `e_v`).
    pub fn with_event(
        self,
        category: impl Into<String>,
        action: impl Into<String>,
        name: Option<&str>,
        value: Option<f64>,
    ) -> Self {
        let mut event = self
            .with_param("e_c", category.into())
            .with_param("e_a", action.into());
        if let Some(name) = name {
            event.set("e_n", name);
        }
        if let Some(value) = value {
            event.set("e_v", value);
        }
        event
    }

    // Content tracking

    /// Content impression or interaction (`c_n`, `c_p`, `c_t`, `c_i`).
    pub fn with_content(
        self,
        name: impl Into<String>,
        piece: Option<&str>,
        target: Option<&str>,
        interaction: Option<&str>,
    ) -> Self {
        let mut event = self.with_param("c_n", name.into());
        if let Some(piece) = piece {
            event.set("c_p", piece);
        }
        if let Some(target) = target {
            event.set("c_t", target);
        }
        if let Some(interaction) = interaction {
            event.set("c_i", interaction);
        }
        event
    }

    // Ecommerce

    /// Ecommerce order (`ec_id`, `ec_items`, `revenue`, `idgoal=0`).
    ///
    /// `items_json` is the JSON-encoded item list as documented by Matomo.
    pub fn with_ecommerce_order(
        self,
        order_id: impl Into<String>,
        items_json: impl Into<String>,
        grand_total: f64,
    ) -> Self {
        self.with_param("idgoal", 0)
            .with_param("ec_id", order_id.into())
            .with_param("ec_items", items_json.into())
            .with_param("revenue", grand_total)
    }

    /// Optional order amounts (`ec_st`, `ec_tx`, `ec_sh`, `ec_dt`).
    pub fn with_ecommerce_amounts(
        self,
        subtotal: Option<f64>,
        tax: Option<f64>,
        shipping: Option<f64>,
        discount: Option<f64>,
    ) -> Self {
        let mut event = self;
        for (key, value) in [
            ("ec_st", subtotal),
            ("ec_tx", tax),
            ("ec_sh", shipping),
            ("ec_dt", discount),
        ] {
            if let Some(value) = value {
                event.set(key, value);
            }
        }
        event
    }

    /// Timestamp of the previous ecommerce order (`_ects`).
    pub fn with_last_order_timestamp(self, unix_secs: i64) -> Self {
        self.with_param("_ects", unix_secs)
    }

    // Parameters requiring token_auth

    pub fn with_auth_token(self, token: impl Into<String>) -> Self {
        self.with_param("token_auth", token.into())
    }

    /// Visitor IP override (`cip`).
    pub fn with_visitor_ip(self, ip: impl Into<String>) -> Self {
        self.with_param("cip", ip.into())
    }

    /// Request time override (`cdt`), e.g. `2018-03-22T02:32:22.867Z`.
    pub fn with_custom_timestamp(self, timestamp: impl Into<String>) -> Self {
        self.with_param("cdt", timestamp.into())
    }

    /// Visitor location override (`country`, `region`, `city`).
    pub fn with_location(
        self,
        country: impl Into<String>,
        region: Option<&str>,
        city: Option<&str>,
    ) -> Self {
        let mut event = self.with_param("country", country.into());
        if let Some(region) = region {
            event.set("region", region);
        }
        if let Some(city) = city {
            event.set("city", city);
        }
        event
    }

    /// Visitor coordinates (`lat`, `long`).
    pub fn with_coordinates(self, lat: f64, long: f64) -> Self {
        self.with_param("lat", lat).with_param("long", long)
    }

    // Media analytics

    /// Identifies a media view (`ma_id`, `ma_ti`, `ma_re`, `ma_mt`).
    pub fn with_media(
        self,
        id: impl Into<String>,
        title: impl Into<String>,
        resource: impl Into<String>,
        media_type: MediaType,
    ) -> Self {
        self.with_param("ma_id", id.into())
            .with_param("ma_ti", title.into())
            .with_param("ma_re", resource.into())
            .with_param("ma_mt", media_type.as_str())
    }

    /// Player name (`ma_pn`).
    pub fn with_media_player(self, name: impl Into<String>) -> Self {
        self.with_param("ma_pn", name.into())
    }

    /// Playback progress: seconds spent, media length and position
    /// (`ma_sn`, `ma_le`, `ma_ps`).
    pub fn with_media_progress(self, spent_secs: u32, length_secs: u32, position_secs: u32) -> Self {
        self.with_param("ma_sn", spent_secs)
            .with_param("ma_le", length_secs)
            .with_param("ma_ps", position_secs)
    }

    /// Seconds until playback started (`ma_ttp`).
    pub fn with_media_time_to_play(self, secs: u32) -> Self {
        self.with_param("ma_ttp", secs)
    }

    /// Player dimensions and fullscreen flag (`ma_w`, `ma_h`, `ma_fs`).
    pub fn with_media_dimensions(self, width: u32, height: u32, fullscreen: bool) -> Self {
        self.with_param("ma_w", width)
            .with_param("ma_h", height)
            .with_param("ma_fs", fullscreen)
    }

    /// Seek positions (`ma_se`).
    pub fn with_media_seeks(self, positions: impl Into<String>) -> Self {
        self.with_param("ma_se", positions.into())
    }

    // Other

    /// Bypasses the queued tracking plugin (`queuedtracking=0`).
    pub fn without_queued_tracking(self) -> Self {
        self.with_param("queuedtracking", 0)
    }

    /// Asks for a 204 instead of the tracking GIF (`send_image=0`).
    pub fn without_image(self) -> Self {
        self.with_param("send_image", 0)
    }

    /// Marks the request as a heart beat (`ping=1`).
    pub fn as_ping(self) -> Self {
        self.with_param("ping", 1)
    }

    /// Tracks the request even if it looks like a bot (`bots=1`).
    pub fn with_bots(self) -> Self {
        self.with_param("bots", 1)
    }
}

impl From<&str> for TrackingEvent {
    fn from(url: &str) -> Self {
        TrackingEvent::url(url)
    }
}

impl From<String> for TrackingEvent {
    fn from(url: String) -> Self {
        TrackingEvent::url(url)
    }
}

impl<K, V> FromIterator<(K, V)> for TrackingEvent
where
    K: Into<String>,
    V: Into<ParamValue>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut event = TrackingEvent::new();
        for (key, value) in iter {
            event.set(key, value);
        }
        event
    }
}

/// Deserializes a flat JSON object of scalars, keeping document order.
///
/// `null` entries are skipped, booleans become `1`/`0`, nested values are
/// rejected.
impl<'de> Deserialize<'de> for TrackingEvent {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_map(EventVisitor)
    }
}

struct EventVisitor;

impl<'de> Visitor<'de> for EventVisitor {
    type Value = TrackingEvent;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a map of tracking parameters to scalar values")
    }

    fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Self::Value, A::Error> {
        let mut event = TrackingEvent::new();
        while let Some((key, value)) = map.next_entry::<String, serde_json::Value>()? {
            let value = match value {
                serde_json::Value::Null => continue,
                serde_json::Value::Bool(flag) => ParamValue::from(flag),
                serde_json::Value::String(s) => ParamValue::Text(s),
                serde_json::Value::Number(n) => {
                    if let Some(i) = n.as_i64() {
                        ParamValue::Integer(i)
                    } else if let Some(u) = n.as_u64() {
                        ParamValue::from(u)
                    } else {
                        ParamValue::Float(n.as_f64().unwrap_or_default())
                    }
                }
                serde_json::Value::Array(_) | serde_json::Value::Object(_) => {
                    return Err(de::Error::custom(format!(
                        "tracking parameter '{}' must be a string or a number",
                        key
                    )));
                }
            };
            event.set(key, value);
        }
        Ok(event)
    }
}
