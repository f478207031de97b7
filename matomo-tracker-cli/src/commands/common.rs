//! Common types and utilities shared across CLI commands.

use std::io::{self, Write};
use std::path::PathBuf;

use clap::Args;
use matomo_tracker::{config_file_path, DeliveryOutcome, SiteId, Tracker, TrackerConfig};
use tracing::{debug, warn};

use crate::error::CliError;

/// Tracking target options, shared by every subcommand.
#[derive(Debug, Clone, Args)]
pub struct TargetArgs {
    /// Matomo site id (number or string key)
    #[arg(long, global = true)]
    pub site_id: Option<String>,

    /// Tracking endpoint, e.g. https://analytics.example.com/matomo.php
    #[arg(long, global = true)]
    pub tracker_url: Option<String>,

    /// Accept endpoints not named matomo.php or piwik.php
    #[arg(long, global = true)]
    pub no_url_validation: bool,

    /// Configuration file (defaults to the per-user config.ini if present)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,
}

/// Resolve tracker settings from CLI args and the config file.
///
/// CLI values take precedence over the file.
pub fn resolve_config(args: &TargetArgs) -> Result<TrackerConfig, CliError> {
    let mut cli = TrackerConfig::default().with_skip_url_validation(args.no_url_validation);
    if let Some(site_id) = &args.site_id {
        cli = cli.with_site_id(site_id.parse::<SiteId>()?);
    }
    if let Some(url) = &args.tracker_url {
        cli = cli.with_tracker_url(url.clone());
    }

    let file = match &args.config {
        Some(path) => TrackerConfig::load(path)?,
        None => match config_file_path().filter(|path| path.exists()) {
            Some(path) => {
                debug!(path = %path.display(), "Loading default config file");
                TrackerConfig::load(&path)?
            }
            None => TrackerConfig::default(),
        },
    };

    let config = cli.or(file);
    if config.site_id.is_none() {
        return Err(CliError::Config(
            "no site id. Use --site-id or set site_id in config.ini".to_string(),
        ));
    }
    if config.tracker_url.is_none() {
        return Err(CliError::Config(
            "no tracker URL. Use --tracker-url or set tracker_url in config.ini".to_string(),
        ));
    }
    Ok(config)
}

/// Build a tracker that logs delivery anomalies.
pub fn build_tracker(args: &TargetArgs) -> Result<Tracker, CliError> {
    let config = resolve_config(args)?;
    let tracker = Tracker::from_config(&config)?;
    tracker.on_error(|err| warn!(error = %err, "Tracking request failed"));
    Ok(tracker)
}

/// Map a delivery outcome to the command result.
///
/// The status line goes to stderr so stdout carries only response data.
pub fn finish(outcome: DeliveryOutcome) -> Result<(), CliError> {
    finish_with(outcome, &mut io::stderr())
}

fn finish_with(outcome: DeliveryOutcome, status_out: &mut impl Write) -> Result<(), CliError> {
    match outcome {
        DeliveryOutcome::Accepted { status } => {
            let _ = writeln!(status_out, "Delivered (HTTP {})", status);
            Ok(())
        }
        DeliveryOutcome::Rejected { status } => {
            Err(CliError::Delivery(format!("endpoint answered HTTP {}", status)))
        }
        DeliveryOutcome::TransportFailed { message } => Err(CliError::Delivery(message)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args() -> TargetArgs {
        TargetArgs {
            site_id: None,
            tracker_url: None,
            no_url_validation: false,
            config: None,
        }
    }

    #[test]
    fn test_resolve_from_cli() {
        let mut args = args();
        args.site_id = Some("5".to_string());
        args.tracker_url = Some("http://example.com/matomo.php".to_string());
        // point at an empty file so a real user config cannot leak in
        let file = tempfile::NamedTempFile::new().unwrap();
        args.config = Some(file.path().to_path_buf());

        let config = resolve_config(&args).unwrap();
        assert_eq!(config.site_id, Some(SiteId::Numeric(5)));
        assert_eq!(
            config.tracker_url.as_deref(),
            Some("http://example.com/matomo.php")
        );
    }

    #[test]
    fn test_cli_overrides_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[tracker]").unwrap();
        writeln!(file, "site_id = 1").unwrap();
        writeln!(file, "tracker_url = http://example.com/piwik.php").unwrap();

        let mut args = args();
        args.site_id = Some("shop".to_string());
        args.config = Some(file.path().to_path_buf());

        let config = resolve_config(&args).unwrap();
        assert_eq!(config.site_id, Some(SiteId::Text("shop".to_string())));
        assert_eq!(
            config.tracker_url.as_deref(),
            Some("http://example.com/piwik.php")
        );
    }

    #[test]
    fn test_missing_tracker_url() {
        let mut args = args();
        args.site_id = Some("1".to_string());
        let file = tempfile::NamedTempFile::new().unwrap();
        args.config = Some(file.path().to_path_buf());

        let err = resolve_config(&args).unwrap_err();
        assert!(err.to_string().contains("tracker URL"));
    }

    #[test]
    fn test_invalid_site_id() {
        let mut args = args();
        args.site_id = Some("0".to_string());
        assert!(matches!(resolve_config(&args), Err(CliError::Tracker(_))));
    }

    #[test]
    fn test_finish() {
        assert!(finish(DeliveryOutcome::Accepted { status: 204 }).is_ok());
        assert!(finish(DeliveryOutcome::Rejected { status: 404 })
            .unwrap_err()
            .to_string()
            .contains("404"));
    }

    #[test]
    fn test_finish_writes_status_line_to_status_stream() {
        let mut status_out = Vec::new();
        finish_with(DeliveryOutcome::Accepted { status: 200 }, &mut status_out).unwrap();
        assert_eq!(String::from_utf8(status_out).unwrap(), "Delivered (HTTP 200)\n");

        let mut status_out = Vec::new();
        assert!(finish_with(DeliveryOutcome::Rejected { status: 500 }, &mut status_out).is_err());
        assert!(status_out.is_empty());
    }
}
