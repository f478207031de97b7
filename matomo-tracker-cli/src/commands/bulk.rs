//! Bulk command - send a batch of hits from a JSON file.

use std::path::{Path, PathBuf};

use clap::Args;
use matomo_tracker::TrackingEvent;
use tracing::info;

use super::common::{build_tracker, finish, TargetArgs};
use crate::error::CliError;

/// Arguments for the bulk command.
#[derive(Debug, Args)]
pub struct BulkArgs {
    /// JSON file holding an array of parameter objects
    pub file: PathBuf,
}

/// Load events from a JSON array of flat objects.
pub fn load_events(path: &Path) -> Result<Vec<TrackingEvent>, CliError> {
    let text = std::fs::read_to_string(path)
        .map_err(|e| CliError::EventsFile(format!("{}: {}", path.display(), e)))?;
    serde_json::from_str(&text)
        .map_err(|e| CliError::EventsFile(format!("{}: {}", path.display(), e)))
}

/// Run the bulk command.
pub async fn run(target: &TargetArgs, args: BulkArgs) -> Result<(), CliError> {
    let events = load_events(&args.file)?;
    info!(count = events.len(), file = %args.file.display(), "Sending bulk request");

    let tracker = build_tracker(target)?;
    let outcome = tracker
        .track_bulk(events, Some(Box::new(|body: String| println!("{}", body))))?
        .await;
    finish(outcome)
}
