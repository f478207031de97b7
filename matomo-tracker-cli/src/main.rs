//! matomo-track - Command-line interface
//!
//! Sends Matomo tracking hits using the matomo-tracker library.

mod commands;
mod error;

use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use commands::bulk::BulkArgs;
use commands::common::TargetArgs;
use commands::track::TrackArgs;

#[derive(Debug, Parser)]
#[command(name = "matomo-track", version, about = "Send Matomo tracking hits")]
struct Cli {
    #[command(flatten)]
    target: TargetArgs,

    /// Enable debug logging (overridden by RUST_LOG)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Track a single page view or event
    Track(TrackArgs),
    /// Track a batch of hits read from a JSON file
    Bulk(BulkArgs),
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let result = match cli.command {
        Commands::Track(args) => commands::track::run(&cli.target, args).await,
        Commands::Bulk(args) => commands::bulk::run(&cli.target, args).await,
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_track() {
        let cli = Cli::try_parse_from([
            "matomo-track",
            "--site-id",
            "1",
            "--tracker-url",
            "http://example.com/matomo.php",
            "track",
            "http://mywebsite.com/",
            "-p",
            "e_c=Buy",
            "--param",
            "e_a=click",
        ])
        .unwrap();

        assert_eq!(cli.target.site_id.as_deref(), Some("1"));
        match cli.command {
            Commands::Track(args) => {
                assert_eq!(args.url, "http://mywebsite.com/");
                assert_eq!(args.params.len(), 2);
            }
            other => panic!("expected track, got {:?}", other),
        }
    }

    #[test]
    fn test_global_options_after_subcommand() {
        let cli = Cli::try_parse_from([
            "matomo-track",
            "bulk",
            "events.json",
            "--no-url-validation",
            "-v",
        ])
        .unwrap();
        assert!(cli.target.no_url_validation);
        assert!(cli.verbose);
    }

    #[test]
    fn test_bad_param_rejected() {
        let result = Cli::try_parse_from(["matomo-track", "track", "http://x/", "-p", "oops"]);
        assert!(result.is_err());
    }
}
