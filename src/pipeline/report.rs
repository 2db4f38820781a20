//! Per-run report and its human-readable rendering.
//!
//! Rendering functions return strings so the CLI can print them and tests
//! can inspect them.

use std::path::{Path, PathBuf};

use super::{compress::CompressedArtifact, stage::StageSummary};
use crate::{
    config::Placement,
    utils::{
        plural_count,
        size::{format_saved, group_thousands, saved_ratio},
    },
};

/// Pipeline stages in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageKind {
    Frontend,
    Stage,
    Compress,
}

impl StageKind {
    /// Name used as the log prefix.
    pub const fn name(self) -> &'static str {
        match self {
            Self::Frontend => "frontend",
            Self::Stage => "stage",
            Self::Compress => "gzip",
        }
    }
}

/// Why a stage did not run. Skips never fail a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// Disabled in config or by `--skip-frontend`.
    Disabled,
    /// Frontend working directory does not exist.
    NoFrontend(PathBuf),
    /// Tree the stage reads from does not exist.
    NoSource(PathBuf),
    /// An earlier stage this one depends on failed.
    DependencyFailed(StageKind),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StageStatus {
    Ran,
    Skipped(SkipReason),
    Failed { summary: String, detail: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageOutcome {
    pub kind: StageKind,
    pub status: StageStatus,
}

/// Everything a run did, in order.
#[derive(Debug, Clone)]
pub struct RunReport {
    pub outcomes: Vec<StageOutcome>,
    pub staged: Option<StageSummary>,
    pub artifacts: Vec<CompressedArtifact>,
    pub staging_root: PathBuf,
    pub output_root: PathBuf,
    pub placement: Placement,
}

impl RunReport {
    pub fn new(staging_root: &Path, output_root: &Path, placement: Placement) -> Self {
        Self {
            outcomes: Vec::new(),
            staged: None,
            artifacts: Vec::new(),
            staging_root: staging_root.to_path_buf(),
            output_root: output_root.to_path_buf(),
            placement,
        }
    }

    pub fn push(&mut self, kind: StageKind, status: StageStatus) {
        self.outcomes.push(StageOutcome { kind, status });
    }

    /// Status of `kind`, if the run reached it.
    pub fn status(&self, kind: StageKind) -> Option<&StageStatus> {
        self.outcomes
            .iter()
            .find(|o| o.kind == kind)
            .map(|o| &o.status)
    }

    /// True unless some stage failed.
    pub fn is_success(&self) -> bool {
        !self
            .outcomes
            .iter()
            .any(|o| matches!(o.status, StageStatus::Failed { .. }))
    }

    pub fn total_original(&self) -> u64 {
        self.artifacts.iter().map(|a| a.original_size).sum()
    }

    pub fn total_compressed(&self) -> u64 {
        self.artifacts.iter().map(|a| a.compressed_size).sum()
    }

    /// Bytes by which the compressed total exceeds `budget`, if it does.
    pub fn over_budget(&self, budget: u64) -> Option<u64> {
        self.total_compressed().checked_sub(budget).filter(|&n| n > 0)
    }
}

// ============================================================================
// rendering
// ============================================================================

/// `app.js → app.js.gz: 1234 → 456 bytes (63.0% saved)`
pub fn artifact_line(artifact: &CompressedArtifact) -> String {
    format!(
        "{} → {}: {} → {} bytes ({})",
        artifact.source.display(),
        artifact.artifact.display(),
        artifact.original_size,
        artifact.compressed_size,
        format_saved(artifact.ratio)
    )
}

/// One line per stage status, prefixed with the stage name by the caller.
pub fn outcome_line(outcome: &StageOutcome) -> String {
    match &outcome.status {
        StageStatus::Ran => "done".to_string(),
        StageStatus::Skipped(reason) => format!("skipped: {}", skip_reason(reason)),
        StageStatus::Failed { summary, .. } => format!("failed: {summary}"),
    }
}

fn skip_reason(reason: &SkipReason) -> String {
    match reason {
        SkipReason::Disabled => "disabled".to_string(),
        SkipReason::NoFrontend(dir) => format!("{} not found", dir.display()),
        SkipReason::NoSource(dir) => format!("{} not found", dir.display()),
        SkipReason::DependencyFailed(kind) => format!("{} failed", kind.name()),
    }
}

/// Top-level listing of the staging tree.
pub fn staged_lines(summary: &StageSummary) -> Vec<String> {
    let mut lines = vec![format!(
        "staged {} ({} bytes)",
        plural_count(summary.files, "file"),
        group_thousands(summary.bytes)
    )];
    lines.extend(summary.entries.iter().map(|entry| {
        let slash = if entry.is_dir { "/" } else { "" };
        format!("  {}{}: {} bytes", entry.name, slash, group_thousands(entry.size))
    }));
    lines
}

/// End-of-run summary: count, output root, per-artifact sizes and totals.
pub fn summary_lines(report: &RunReport) -> Vec<String> {
    let mut lines = vec![
        format!("Compressed files: {}", report.artifacts.len()),
        format!(
            "Output directory: {} ({})",
            report.output_root.display(),
            report.placement.as_str()
        ),
    ];

    if !report.artifacts.is_empty() {
        lines.push("Files ready for upload:".to_string());
        lines.extend(report.artifacts.iter().map(|a| {
            format!(
                "  - {} ({} bytes)",
                a.artifact.display(),
                group_thousands(a.compressed_size)
            )
        }));
    }

    let (original, compressed) = (report.total_original(), report.total_compressed());
    lines.push(format!(
        "Total: {} → {} bytes ({})",
        group_thousands(original),
        group_thousands(compressed),
        format_saved(saved_ratio(original, compressed))
    ));
    lines
}

/// Warning text when compressed output does not fit the filesystem budget.
pub fn budget_warning(report: &RunReport, budget: u64) -> Option<String> {
    report.over_budget(budget).map(|excess| {
        format!(
            "compressed assets take {} bytes, {} over the {} byte budget",
            group_thousands(report.total_compressed()),
            group_thousands(excess),
            group_thousands(budget)
        )
    })
}
