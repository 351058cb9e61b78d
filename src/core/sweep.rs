//! Deletion planning, execution, and the run-mode state machine
//!
//! One sweep pass is the whole pipeline: snapshot the rule table, classify
//! it against the policy, and apply the resulting deletion plan. The single
//! correctness-critical decision lives here: deletions are issued in
//! strictly descending index order. Deleting rule N shifts every rule above
//! N down by one but leaves everything below N untouched, so working from
//! the top down keeps every remaining planned index pointing at the right
//! rule with no renumbering bookkeeping.
//!
//! Watch mode wraps the pass in an explicit finite-state loop:
//!
//! ```text
//! Snapshot --no violations--> Done
//! Snapshot --violations-----> Sleep --> Snapshot
//! ```
//!
//! The loop self-terminates the first time a snapshot is clean. Tests bound
//! it with [`WatchOptions::max_passes`] instead of relying on signals.

use crate::audit;
use crate::core::error::Result;
use crate::core::policy::{Policy, Violation};
use crate::core::rule;
use crate::core::ufw::Ufw;
use std::time::Duration;
use tracing::{info, warn};

/// Yes/no gate in front of destructive actions
///
/// The trait seam exists so tests can script answers instead of owning a
/// terminal.
pub trait Confirm {
    /// Asks the operator a yes/no question; `Ok(true)` means proceed.
    ///
    /// # Errors
    ///
    /// Returns `Err` if the answer cannot be read.
    fn confirm(&mut self, prompt: &str) -> std::io::Result<bool>;
}

/// Reads the answer from stdin. Anything but `y`/`Y` declines, including
/// empty input and EOF, so a non-interactive run without `--yes` makes no
/// changes.
pub struct StdinConfirm;

impl Confirm for StdinConfirm {
    fn confirm(&mut self, prompt: &str) -> std::io::Result<bool> {
        use std::io::Write;

        print!("{prompt}");
        std::io::stdout().flush()?;

        let mut answer = String::new();
        std::io::stdin().read_line(&mut answer)?;
        Ok(answer.trim().eq_ignore_ascii_case("y"))
    }
}

/// Per-pass behavior toggles
#[derive(Debug, Clone, Copy, Default)]
pub struct PassOptions {
    /// Report the plan and stop before the executor, in every mode
    pub dry_run: bool,
    /// Skip the confirmation prompt
    pub assume_yes: bool,
}

/// What one sweep pass did
#[derive(Debug)]
pub enum PassOutcome {
    /// The snapshot contained no violations
    Clean,
    /// Plan reported, nothing deleted
    DryRun(DeletionPlan),
    /// Operator declined the confirmation prompt; nothing deleted
    Declined(DeletionPlan),
    /// Plan executed (possibly with per-index failures)
    Applied(ExecutionReport),
}

/// Violating rule indices from one snapshot, held in strictly descending
/// order so execution never has to renumber
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeletionPlan {
    indices: Vec<u32>,
}

impl DeletionPlan {
    /// Orders the indices descending and drops duplicates.
    pub fn new(mut indices: Vec<u32>) -> Self {
        indices.sort_unstable_by(|a, b| b.cmp(a));
        indices.dedup();
        Self { indices }
    }

    pub fn from_violations(violations: &[Violation]) -> Self {
        Self::new(violations.iter().map(|v| v.index).collect())
    }

    /// Indices in execution order (descending)
    // Exercised through the library target (tests), not the binary
    #[allow(dead_code)]
    pub fn indices(&self) -> &[u32] {
        &self.indices
    }

    pub fn len(&self) -> usize {
        self.indices.len()
    }

    #[allow(dead_code)]
    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    /// Deletes every planned rule, highest index first. A failed deletion is
    /// reported and recorded but never aborts the batch: the remaining
    /// indices are still valid because everything above them is already gone.
    pub async fn execute(&self, ufw: &Ufw) -> ExecutionReport {
        let mut report = ExecutionReport::default();

        for &index in &self.indices {
            println!("Deleting rule #{index}");
            match ufw.delete_rule(index).await {
                Ok(()) => {
                    audit::log_delete(index, true, None).await;
                    report.deleted.push(index);
                }
                Err(e) => {
                    let failure = DeletionFailure {
                        index,
                        detail: e.to_string(),
                    };
                    eprintln!("Failed to delete rule {}: {}", failure.index, failure.detail);
                    warn!(index, error = %failure.detail, "deletion failed, continuing with batch");
                    audit::log_delete(index, false, Some(failure.detail.clone())).await;
                    report.failed.push(failure);
                }
            }
        }

        report
    }
}

/// Result of executing one deletion plan
#[derive(Debug, Default)]
pub struct ExecutionReport {
    /// Indices removed, in execution order
    pub deleted: Vec<u32>,
    /// Indices that could not be removed, with the tool's failure detail
    pub failed: Vec<DeletionFailure>,
}

#[derive(Debug)]
pub struct DeletionFailure {
    pub index: u32,
    pub detail: String,
}

/// Runs one full sweep pass: snapshot, classify, report, optionally delete.
///
/// Callers print the "nothing to do" line for [`PassOutcome::Clean`]
/// themselves; the wording differs between one-shot and watch mode.
///
/// # Errors
///
/// Only the listing query is fatal here. Per-index deletion failures are
/// absorbed into the [`ExecutionReport`].
pub async fn run_pass(
    ufw: &Ufw,
    policy: &Policy,
    opts: PassOptions,
    confirm: &mut dyn Confirm,
) -> Result<PassOutcome> {
    let listing = ufw.status_numbered().await?;
    let rules = rule::parse_listing(&listing);
    let violations = policy.violations(&rules);
    info!(
        rules = rules.len(),
        violations = violations.len(),
        "snapshot classified"
    );

    if violations.is_empty() {
        return Ok(PassOutcome::Clean);
    }

    for violation in violations.iter().filter(|v| v.flagged) {
        if let Some(port) = policy.flagged_port(&violation.destination) {
            eprintln!(
                "Warning: rule #{} opens flagged port {port} ({}) to {}",
                violation.index, violation.destination, violation.source
            );
        }
    }

    let ascending: Vec<String> = violations.iter().map(|v| v.index.to_string()).collect();
    println!(
        "The following rule numbers will be deleted: {}",
        ascending.join(", ")
    );

    let plan = DeletionPlan::from_violations(&violations);
    audit::log_plan(plan.len(), opts.dry_run).await;

    if opts.dry_run {
        println!("Dry-run mode active. No changes have been made.");
        return Ok(PassOutcome::DryRun(plan));
    }

    if !opts.assume_yes && !confirm.confirm("Proceed with deletion? [y/N]: ")? {
        // Callers word the decline message; one-shot aborts, watch only
        // skips the current cycle.
        audit::log_declined(plan.len()).await;
        return Ok(PassOutcome::Declined(plan));
    }

    let report = plan.execute(ufw).await;
    if report.failed.is_empty() {
        println!("Cleanup completed: {} rule(s) removed.", report.deleted.len());
    } else {
        let kept: Vec<String> = report.failed.iter().map(|f| f.index.to_string()).collect();
        println!(
            "Cleanup finished: {} rule(s) removed, left in place: {}.",
            report.deleted.len(),
            kept.join(", ")
        );
    }
    Ok(PassOutcome::Applied(report))
}

/// States of the run-mode loop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchState {
    /// Query the rule table and run one pass
    Snapshot,
    /// Wait out the configured interval
    Sleep,
    /// Converged (or one-shot finished)
    Done,
}

/// Transition function for the run-mode state machine.
///
/// `found_violations` reflects the pass that just ran; `one_shot` collapses
/// the loop after a single snapshot regardless of what it found.
pub fn transition(state: WatchState, found_violations: bool, one_shot: bool) -> WatchState {
    match state {
        WatchState::Snapshot if !found_violations => WatchState::Done,
        WatchState::Snapshot if one_shot => WatchState::Done,
        WatchState::Snapshot => WatchState::Sleep,
        WatchState::Sleep => WatchState::Snapshot,
        WatchState::Done => WatchState::Done,
    }
}

/// Watch-mode configuration
#[derive(Debug, Clone, Copy)]
pub struct WatchOptions {
    /// Delay between passes; zero means busy-poll with no sleep
    pub interval: Duration,
    pub pass: PassOptions,
    /// Upper bound on snapshot passes. `None` runs until convergence or
    /// interrupt; tests use a bound instead of signals.
    pub max_passes: Option<usize>,
}

/// Repeats sweep passes until a snapshot finds zero violations.
///
/// Cancellation is handled by the caller racing this future against a
/// Ctrl-C listener; every await point here (query, delete, sleep) is a safe
/// boundary because no partial state exists between passes.
///
/// # Errors
///
/// A failed listing query aborts the loop, like in one-shot mode.
pub async fn run_watch(
    ufw: &Ufw,
    policy: &Policy,
    opts: WatchOptions,
    confirm: &mut dyn Confirm,
) -> Result<()> {
    let cadence = if opts.interval.is_zero() {
        "continuously (no delay)".to_string()
    } else {
        format!("every {}s", opts.interval.as_secs())
    };
    println!("Entering watch mode - checking {cadence}. Press Ctrl+C to exit.");

    let mut state = WatchState::Snapshot;
    let mut passes = 0usize;

    while state != WatchState::Done {
        match state {
            WatchState::Snapshot => {
                passes += 1;
                let outcome = run_pass(ufw, policy, opts.pass, confirm).await?;

                let handled = match &outcome {
                    PassOutcome::Clean => 0,
                    PassOutcome::DryRun(plan) | PassOutcome::Declined(plan) => plan.len(),
                    PassOutcome::Applied(report) => report.deleted.len() + report.failed.len(),
                };
                if handled > 0 {
                    println!(
                        "{}: pass #{passes} handled {handled} rule(s)",
                        chrono::Local::now().format("%Y-%m-%d %H:%M:%S")
                    );
                }

                // Dry-run stops right after reporting the plan, in every mode.
                if matches!(outcome, PassOutcome::DryRun(_)) {
                    println!("Dry-run mode active. Leaving watch mode.");
                    return Ok(());
                }
                if matches!(outcome, PassOutcome::Declined(_)) {
                    println!("Skipping deletion this cycle.");
                }

                state = transition(state, handled > 0, false);
                if state == WatchState::Done {
                    println!("No matching 'Anywhere' rules remain. Exiting watch mode.");
                } else if opts.max_passes.is_some_and(|max| passes >= max) {
                    info!(passes, "watch pass budget exhausted");
                    state = WatchState::Done;
                }
            }
            WatchState::Sleep => {
                if !opts.interval.is_zero() {
                    tokio::time::sleep(opts.interval).await;
                }
                state = transition(state, true, false);
            }
            WatchState::Done => {}
        }
    }

    Ok(())
}
