//! CLI output formatting.
//!
//! All functions here are pure: they turn run events and summaries into
//! display lines and leave printing to the binary. Per-file lines lead with
//! the file name so the output reads as an inventory of the input
//! directory.
//!
//! # Output Format
//!
//! ## Run
//!
//! ```text
//! Processing 5 photos with 2 workers
//!     ok    DSC_0001.jpg
//!     FAIL  DSC_0002.jpg: open failed: cannot decode ...
//! [ 40%] 1 done, 1 failed, 2 in flight, 1 queued (3.1 files/s)
//! ...
//! Completed with 1 failure (4 of 5 succeeded in 1.6s)
//! Failures
//!     DSC_0002.jpg: open failed: cannot decode ...
//! ```
//!
//! ## Chain
//!
//! ```text
//! 1. shadow
//! 2. watermark
//! 3. margin
//! ```

use crate::pipeline::ProcessorChain;
use crate::scheduler::{RunEvent, RunOutcome, RunStats, RunSummary};

/// Format one run event as display lines.
///
/// `Stats` and `Progress` produce nothing here; the printer pairs them with
/// [`format_progress`] so each progress step prints one status line.
pub fn format_run_event(event: &RunEvent) -> Vec<String> {
    match event {
        RunEvent::Started { total, concurrency } => vec![format!(
            "Processing {} with {} {}",
            plural(*total, "photo"),
            concurrency,
            if *concurrency == 1 { "worker" } else { "workers" }
        )],
        RunEvent::Stats(_) | RunEvent::Progress(_) => Vec::new(),
        RunEvent::FileCompleted { file } => vec![format!("    ok    {}", file)],
        RunEvent::FileFailed { file, message } => vec![format!("    FAIL  {}: {}", file, message)],
        RunEvent::Finished(summary) | RunEvent::Stopped(summary) => format_summary(summary),
        RunEvent::Fatal(message) => vec![format!("Run aborted: {}", message)],
    }
}

/// One status line for a progress step.
pub fn format_progress(progress: u8, stats: &RunStats) -> String {
    format!(
        "[{:>3}%] {} done, {} failed, {} in flight, {} queued ({:.1} files/s)",
        progress, stats.completed, stats.failed, stats.in_flight, stats.queued, stats.rate
    )
}

/// Headline distinguishing success, partial failure, and cancellation.
pub fn verdict(summary: &RunSummary) -> String {
    let s = &summary.stats;
    match summary.outcome {
        RunOutcome::AllSucceeded => format!(
            "All {} succeeded in {:.1}s",
            plural(s.total, "photo"),
            s.elapsed_secs
        ),
        RunOutcome::CompletedWithFailures { failed } => format!(
            "Completed with {} ({} of {} succeeded in {:.1}s)",
            plural(failed, "failure"),
            s.completed,
            s.total,
            s.elapsed_secs
        ),
        RunOutcome::Stopped => format!(
            "Stopped by cancellation: {} done, {} failed, {} not started",
            s.completed, s.failed, s.queued
        ),
    }
}

/// Verdict followed by the failure list.
pub fn format_summary(summary: &RunSummary) -> Vec<String> {
    let mut lines = vec![verdict(summary)];
    if !summary.failures.is_empty() {
        lines.push("Failures".to_string());
        for failure in &summary.failures {
            lines.push(format!("    {}: {}", failure.file, failure.message));
        }
    }
    lines
}

/// Numbered component list, in execution order.
pub fn format_chain(chain: &ProcessorChain) -> Vec<String> {
    if chain.is_empty() {
        return vec!["(empty chain)".to_string()];
    }
    chain
        .names()
        .iter()
        .enumerate()
        .map(|(i, name)| format!("{}. {}", i + 1, name))
        .collect()
}

fn plural(n: usize, noun: &str) -> String {
    if n == 1 {
        format!("1 {}", noun)
    } else {
        format!("{} {}s", n, noun)
    }
}
