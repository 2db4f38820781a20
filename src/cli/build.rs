//! `build` and `compress` commands.
//!
//! Runs the pipeline, then renders its `RunReport`:
//! - **frontend** - external build result
//! - **stage** - top-level listing of the staging tree
//! - **gzip** - one line per artifact, then totals, budget and upload hint

use crate::{
    config::ProjectConfig,
    hooks::CommandFrontend,
    log,
    logger::{status_error, status_success, status_warning},
    pipeline::{
        self, PipelineContext, RunReport, StageKind, StageStatus,
        report::{artifact_line, budget_warning, outcome_line, staged_lines, summary_lines},
    },
    utils::plural_count,
};

/// Full pipeline: frontend build, staging, compression.
///
/// Returns whether every stage that ran succeeded.
pub fn build(config: &ProjectConfig) -> bool {
    let ctx = PipelineContext::from_config(config);
    let frontend = CommandFrontend::new(config);
    let report = pipeline::run(&ctx, &frontend);
    print_report(config, &report)
}

/// Compressor only, over the existing staging tree.
pub fn compress(config: &ProjectConfig) -> bool {
    let ctx = PipelineContext::from_config(config);
    let report = pipeline::compress_only(&ctx);
    print_report(config, &report)
}

fn print_report(config: &ProjectConfig, report: &RunReport) -> bool {
    for outcome in &report.outcomes {
        let module = outcome.kind.name();
        match &outcome.status {
            StageStatus::Ran => print_stage(config, outcome.kind, report),
            StageStatus::Skipped(_) => log!(module; "{}", outcome_line(outcome)),
            StageStatus::Failed { summary, detail } => {
                status_error(&format!("{module}: {summary}"), detail);
            }
        }
    }

    if !report.is_success() {
        return false;
    }

    let compressed = matches!(report.status(StageKind::Compress), Some(StageStatus::Ran));
    if compressed {
        for line in summary_lines(report) {
            println!("{line}");
        }
        if let Some(warning) = config
            .build
            .budget
            .and_then(|budget| budget_warning(report, budget))
        {
            status_warning(&warning);
        }
        status_success(&format!(
            "{} ready in {}",
            plural_count(report.artifacts.len(), "artifact"),
            config.root_relative(&report.output_root).display()
        ));
        if let Some(hint) = &config.build.upload_hint {
            log!("upload"; "{}", hint);
        }
    }

    true
}

fn print_stage(config: &ProjectConfig, kind: StageKind, report: &RunReport) {
    let module = kind.name();
    match kind {
        StageKind::Frontend => log!(module; "{}", "done"),
        StageKind::Stage => {
            if let Some(summary) = &report.staged {
                log!(module; "{}", config.root_relative(&report.staging_root).display());
                for line in staged_lines(summary) {
                    println!("{line}");
                }
            }
        }
        StageKind::Compress => {
            for artifact in &report.artifacts {
                log!(module; "{}", artifact_line(artifact));
            }
        }
    }
}
