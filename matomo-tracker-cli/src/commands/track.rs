//! Track command - send a single hit.

use clap::Args;
use matomo_tracker::TrackingEvent;

use super::common::{build_tracker, finish, TargetArgs};
use crate::error::CliError;

/// Arguments for the track command.
#[derive(Debug, Args)]
pub struct TrackArgs {
    /// Page URL to track
    pub url: String,

    /// Action name (page title)
    #[arg(long)]
    pub action_name: Option<String>,

    /// Extra tracking parameter as key=value (repeatable)
    #[arg(short = 'p', long = "param", value_parser = parse_param)]
    pub params: Vec<(String, String)>,
}

/// Parse a `key=value` tracking parameter.
pub fn parse_param(raw: &str) -> Result<(String, String), String> {
    match raw.split_once('=') {
        Some((key, value)) if !key.trim().is_empty() => {
            Ok((key.trim().to_string(), value.to_string()))
        }
        _ => Err(format!("expected key=value, got '{}'", raw)),
    }
}

/// Build the event described by the arguments.
pub fn build_event(args: TrackArgs) -> TrackingEvent {
    let mut event = TrackingEvent::url(args.url);
    if let Some(name) = args.action_name {
        event.set("action_name", name);
    }
    for (key, value) in args.params {
        event.set(key, value);
    }
    event
}

/// Run the track command.
pub async fn run(target: &TargetArgs, args: TrackArgs) -> Result<(), CliError> {
    let tracker = build_tracker(target)?;
    let outcome = tracker.track(build_event(args))?.await;
    finish(outcome)
}
