//! ufw-sweep - opinionated UFW rule cleanup
//!
//! Removes ufw rules whose source is "Anywhere" or "Anywhere (v6)", except
//! rules protecting the administrative port (default 22).
//!
//! # Usage
//!
//! ```bash
//! # See what would be deleted, without actually deleting it
//! ufw-sweep --dry-run
//!
//! # Delete the rules (you will be prompted to confirm)
//! ufw-sweep
//!
//! # Delete without a confirmation prompt
//! ufw-sweep --yes
//!
//! # Keep re-checking every 10 seconds until no violations remain
//! ufw-sweep --yes --watch 10
//! ```
//!
//! The process elevates itself once at startup (run0/sudo) when not already
//! running as root, preserving all arguments.

mod audit;
mod config;
mod core;
mod elevation;
mod utils;

use clap::Parser;
use shadow_rs::shadow;
use std::process::ExitCode;
use std::time::Duration;

use crate::core::error::{Error, UfwErrorPattern};
use crate::core::policy::Policy;
use crate::core::sweep::{self, PassOptions, PassOutcome, StdinConfirm, WatchOptions};
use crate::core::ufw::Ufw;

shadow!(build);

#[derive(Parser)]
#[command(name = "ufw-sweep")]
#[command(
    about = "Remove UFW 'Anywhere' allow rules except the administrative port",
    long_about = None,
    version = build::PKG_VERSION,
    long_version = build::CLAP_LONG_VERSION
)]
struct Cli {
    /// Show what would be removed but do NOT remove it
    #[arg(short = 'n', long)]
    dry_run: bool,

    /// Do not prompt for confirmation
    #[arg(short, long)]
    yes: bool,

    /// Re-check every SECONDS until no rule violates policy; 0 = no delay
    /// between passes. If the flag is given without a value, the configured
    /// default interval is used.
    #[arg(short, long, value_name = "SECONDS")]
    watch: Option<Option<u64>>,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    // Must happen before any firewall interaction; on success without root
    // this call does not return (the process image is replaced).
    if let Err(e) = elevation::ensure_root() {
        eprintln!("Error: {e}");
        return ExitCode::FAILURE;
    }

    let runtime = tokio::runtime::Runtime::new().expect("Failed to create Tokio runtime");
    match runtime.block_on(run(cli)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            report_fatal(&e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> crate::core::error::Result<()> {
    if let Err(e) = utils::ensure_dirs() {
        tracing::warn!("failed to create state directories: {e}");
    }

    let config = config::load_or_init().await;
    let policy = Policy::new(config.admin_port, &config.flagged_ports);
    tracing::debug!(admin_port = policy.admin_port(), "policy loaded");

    let ufw = Ufw::locate()?;
    tracing::debug!(binary = %ufw.binary().display(), "resolved ufw executable");

    let pass = PassOptions {
        dry_run: cli.dry_run,
        assume_yes: cli.yes,
    };
    let mut confirm = StdinConfirm;

    if let Some(interval) = cli.watch {
        let secs = interval.unwrap_or(config.watch_interval_secs);
        let opts = WatchOptions {
            interval: Duration::from_secs(secs),
            pass,
            max_passes: None,
        };

        // Ctrl-C lands at the current sleep or query boundary; there is no
        // partial state to clean up between passes.
        tokio::select! {
            result = sweep::run_watch(&ufw, &policy, opts, &mut confirm) => result,
            _ = tokio::signal::ctrl_c() => {
                println!("\nWatch mode interrupted by user. Exiting.");
                Ok(())
            }
        }
    } else {
        match sweep::run_pass(&ufw, &policy, pass, &mut confirm).await? {
            PassOutcome::Clean => println!("No matching rules found. Nothing to do."),
            PassOutcome::Declined(_) => println!("Aborted by user. No changes made."),
            PassOutcome::DryRun(_) | PassOutcome::Applied(_) => {}
        }
        Ok(())
    }
}

/// Prints a fatal error with the friendliest translation we have for it.
///
/// For ufw failures the raw stderr is matched against the pattern table;
/// it carries the actual diagnostic, the wrapper message does not.
fn report_fatal(error: &Error) {
    let detail = match error {
        Error::Ufw {
            stderr: Some(stderr),
            ..
        } if !stderr.trim().is_empty() => stderr.clone(),
        other => other.to_string(),
    };

    let translation = UfwErrorPattern::match_error(&detail);
    eprintln!("Error: {}", translation.user_message);
    if let Error::Ufw {
        exit_code: Some(code),
        ..
    } = error
    {
        eprintln!("  ufw exited with status {code}");
    }
    for suggestion in &translation.suggestions {
        eprintln!("  hint: {suggestion}");
    }
    if let Some(url) = &translation.help_url {
        eprintln!("  see: {url}");
    }
}
