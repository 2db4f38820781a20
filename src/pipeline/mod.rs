//! Asset staging and compression pipeline.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────┐   ┌───────────┐   ┌────────────┐
//! │ frontend │ → │   stage   │ → │    gzip    │
//! │ (hook)   │   │ dist→www  │   │ www→data   │
//! └──────────┘   └───────────┘   └────────────┘
//! ```
//!
//! Each stage is skipped when its input tree is absent. A failed stage ends
//! the run; everything the run did is collected in a `RunReport`.

pub mod compress;
pub mod error;
pub mod frontend;
pub mod report;
pub mod stage;
mod tree;

pub use compress::{CompressedArtifact, compress};
pub use error::PipelineError;
pub use frontend::{BuildFrontend, FrontendError};
pub use report::{RunReport, SkipReason, StageKind, StageOutcome, StageStatus};
pub use stage::{StageSummary, stage};

use std::path::PathBuf;

use crate::{config::Placement, config::ProjectConfig, debug};

/// Resolved inputs of one pipeline run.
#[derive(Debug, Clone)]
pub struct PipelineContext {
    /// Directory holding `webstage.toml`; never pruned.
    pub project_root: PathBuf,
    /// Frontend working directory.
    pub frontend_dir: PathBuf,
    pub frontend_enabled: bool,
    /// Frontend build output, copied into `staging_root`.
    pub source_root: PathBuf,
    pub staging_root: PathBuf,
    pub output_root: PathBuf,
    pub extensions: Vec<String>,
    pub placement: Placement,
}

impl PipelineContext {
    pub fn from_config(config: &ProjectConfig) -> Self {
        let build = &config.build;
        Self {
            project_root: config.root.clone(),
            frontend_dir: build.frontend.dir.clone(),
            frontend_enabled: build.frontend.enable,
            source_root: build.source.clone(),
            staging_root: build.staging.clone(),
            output_root: build.output.clone(),
            extensions: build.extensions.clone(),
            placement: build.placement,
        }
    }
}

/// Run frontend, collector and compressor in order.
pub fn run(ctx: &PipelineContext, frontend: &dyn BuildFrontend) -> RunReport {
    let mut report = RunReport::new(&ctx.staging_root, &ctx.output_root, ctx.placement);

    if !run_frontend(ctx, frontend, &mut report) {
        return report;
    }

    if !ctx.source_root.is_dir() {
        let reason = SkipReason::NoSource(ctx.source_root.clone());
        report.push(StageKind::Stage, StageStatus::Skipped(reason.clone()));
        report.push(StageKind::Compress, StageStatus::Skipped(reason));
        return report;
    }

    match stage(&ctx.source_root, &ctx.staging_root) {
        Ok(summary) => {
            report.staged = Some(summary);
            report.push(StageKind::Stage, StageStatus::Ran);
        }
        Err(e) => {
            report.push(StageKind::Stage, failed(&e.to_string(), e.detail()));
            report.push(
                StageKind::Compress,
                StageStatus::Skipped(SkipReason::DependencyFailed(StageKind::Stage)),
            );
            return report;
        }
    }

    run_compress(ctx, &mut report);
    report
}

/// Run the compressor alone over an existing staging tree.
pub fn compress_only(ctx: &PipelineContext) -> RunReport {
    let mut report = RunReport::new(&ctx.staging_root, &ctx.output_root, ctx.placement);
    if ctx.staging_root.is_dir() {
        run_compress(ctx, &mut report);
    } else {
        let reason = SkipReason::NoSource(ctx.staging_root.clone());
        report.push(StageKind::Compress, StageStatus::Skipped(reason));
    }
    report
}

/// Returns whether later stages may run.
fn run_frontend(ctx: &PipelineContext, frontend: &dyn BuildFrontend, report: &mut RunReport) -> bool {
    let status = if !ctx.frontend_enabled {
        StageStatus::Skipped(SkipReason::Disabled)
    } else if !ctx.frontend_dir.is_dir() {
        StageStatus::Skipped(SkipReason::NoFrontend(ctx.frontend_dir.clone()))
    } else {
        debug!("frontend"; "building in {}", ctx.frontend_dir.display());
        match frontend.build(&ctx.frontend_dir) {
            Ok(()) => StageStatus::Ran,
            Err(e) => failed(&e.to_string(), e.detail()),
        }
    };

    let proceed = !matches!(status, StageStatus::Failed { .. });
    report.push(StageKind::Frontend, status);
    proceed
}

fn run_compress(ctx: &PipelineContext, report: &mut RunReport) {
    let protected = [
        ctx.source_root.as_path(),
        ctx.frontend_dir.as_path(),
        ctx.project_root.as_path(),
    ];
    match compress(
        &ctx.staging_root,
        &ctx.output_root,
        &ctx.extensions,
        ctx.placement,
        &protected,
    ) {
        Ok(artifacts) => {
            report.artifacts = artifacts;
            report.push(StageKind::Compress, StageStatus::Ran);
        }
        Err(e) => report.push(StageKind::Compress, failed(&e.to_string(), e.detail())),
    }
}

fn failed(summary: &str, detail: String) -> StageStatus {
    StageStatus::Failed {
        summary: summary.to_string(),
        detail,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::stage::list_files;
    use flate2::read::GzDecoder;
    use std::cell::Cell;
    use std::fs;
    use std::io::Read;
    use std::path::Path;
    use tempfile::TempDir;

    /// Frontend stub that writes a fixed file set into `dist/`.
    struct StubFrontend {
        files: Vec<(&'static str, Vec<u8>)>,
        calls: Cell<usize>,
    }

    impl StubFrontend {
        fn new(files: Vec<(&'static str, Vec<u8>)>) -> Self {
            Self {
                files,
                calls: Cell::new(0),
            }
        }
    }

    impl BuildFrontend for StubFrontend {
        fn build(&self, working_dir: &Path) -> Result<(), FrontendError> {
            self.calls.set(self.calls.get() + 1);
            let dist = working_dir.join("dist");
            for (rel, content) in &self.files {
                let path = dist.join(rel);
                fs::create_dir_all(path.parent().unwrap()).unwrap();
                fs::write(path, content).unwrap();
            }
            Ok(())
        }
    }

    struct FailingFrontend;

    impl BuildFrontend for FailingFrontend {
        fn build(&self, _: &Path) -> Result<(), FrontendError> {
            Err(FrontendError::Failed {
                program: "npm".into(),
                status: "exit status: 1".into(),
                diagnostic: "error TS2304: Cannot find name 'foo'.\n".into(),
            })
        }
    }

    /// `<root>/web-ui` frontend, `web-ui/dist` source, `data/www` staging,
    /// `data` output.
    fn context(root: &Path) -> PipelineContext {
        PipelineContext {
            project_root: root.to_path_buf(),
            frontend_dir: root.join("web-ui"),
            frontend_enabled: true,
            source_root: root.join("web-ui/dist"),
            staging_root: root.join("data/www"),
            output_root: root.join("data"),
            extensions: [".html", ".css", ".js", ".json"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            placement: Placement::Flatten,
        }
    }

    fn gunzip(path: &Path) -> Vec<u8> {
        let mut out = Vec::new();
        GzDecoder::new(fs::File::open(path).unwrap())
            .read_to_end(&mut out)
            .unwrap();
        out
    }

    /// 500 bytes of repetitive markup, 2000 bytes of script, a 1000 byte image.
    fn web_ui_files() -> Vec<(&'static str, Vec<u8>)> {
        let markup = "<li class=\"item\">xy</li>\n".repeat(20);
        let script: String = (0..2000).map(|i| (b'a' + (i * 7 % 26) as u8) as char).collect();
        let image: Vec<u8> = (0..1000u32).map(|i| (i * 31 % 251) as u8).collect();
        assert_eq!(markup.len(), 500);
        vec![
            ("index.html", markup.into_bytes()),
            ("app.js", script.into_bytes()),
            ("logo.png", image),
        ]
    }

    #[test]
    fn test_end_to_end_flatten() {
        let dir = TempDir::new().unwrap();
        let ctx = context(dir.path());
        fs::create_dir_all(&ctx.frontend_dir).unwrap();
        fs::create_dir_all(&ctx.staging_root).unwrap();
        fs::write(ctx.staging_root.join("stale.txt"), "old build").unwrap();
        let frontend = StubFrontend::new(web_ui_files());

        let report = run(&ctx, &frontend);

        assert!(report.is_success());
        assert_eq!(frontend.calls.get(), 1);
        assert_eq!(report.status(StageKind::Frontend), Some(&StageStatus::Ran));
        assert_eq!(report.status(StageKind::Stage), Some(&StageStatus::Ran));
        assert_eq!(report.status(StageKind::Compress), Some(&StageStatus::Ran));

        // Staging mirrors dist exactly
        assert_eq!(
            list_files(&ctx.staging_root),
            vec![
                PathBuf::from("app.js"),
                PathBuf::from("index.html"),
                PathBuf::from("logo.png"),
            ]
        );
        assert!(!ctx.staging_root.join("stale.txt").exists());

        // Two artifacts, flattened into the output root
        assert_eq!(report.artifacts.len(), 2);
        let files = web_ui_files();
        assert_eq!(gunzip(&ctx.output_root.join("index.html.gz")), files[0].1);
        assert_eq!(gunzip(&ctx.output_root.join("app.js.gz")), files[1].1);
        assert_eq!(fs::read(ctx.staging_root.join("logo.png")).unwrap(), files[2].1);
        assert!(!ctx.output_root.join("logo.png.gz").exists());
        assert_eq!(report.staged.as_ref().unwrap().files, 3);
    }

    #[test]
    fn test_rerun_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let ctx = context(dir.path());
        fs::create_dir_all(&ctx.frontend_dir).unwrap();
        let frontend = StubFrontend::new(web_ui_files());

        let artifact_bytes = |report: &RunReport| -> Vec<Vec<u8>> {
            report
                .artifacts
                .iter()
                .map(|a| fs::read(&a.destination).unwrap())
                .collect()
        };

        let first = run(&ctx, &frontend);
        let staged = list_files(&ctx.staging_root);
        let listing = list_files(&ctx.output_root);
        let bytes = artifact_bytes(&first);
        let second = run(&ctx, &frontend);

        assert!(first.is_success() && second.is_success());
        assert_eq!(first.artifacts.len(), 2);
        assert_eq!(first.artifacts, second.artifacts);
        assert_eq!(list_files(&ctx.staging_root), staged);
        assert_eq!(list_files(&ctx.output_root), listing);
        assert_eq!(artifact_bytes(&second), bytes);
    }

    #[test]
    fn test_missing_trees_skip_successfully() {
        let dir = TempDir::new().unwrap();
        let ctx = context(dir.path());
        let frontend = StubFrontend::new(vec![]);

        let report = run(&ctx, &frontend);

        assert!(report.is_success());
        assert_eq!(frontend.calls.get(), 0);
        assert_eq!(
            report.status(StageKind::Frontend),
            Some(&StageStatus::Skipped(SkipReason::NoFrontend(ctx.frontend_dir.clone())))
        );
        assert_eq!(
            report.status(StageKind::Stage),
            Some(&StageStatus::Skipped(SkipReason::NoSource(ctx.source_root.clone())))
        );
        assert!(matches!(
            report.status(StageKind::Compress),
            Some(StageStatus::Skipped(SkipReason::NoSource(_)))
        ));
        assert!(!ctx.staging_root.exists());
        assert!(!ctx.output_root.exists());
    }

    #[test]
    fn test_frontend_without_output_skips() {
        let dir = TempDir::new().unwrap();
        let ctx = context(dir.path());
        fs::create_dir_all(&ctx.frontend_dir).unwrap();
        let frontend = StubFrontend::new(vec![]);

        let report = run(&ctx, &frontend);

        assert!(report.is_success());
        assert_eq!(frontend.calls.get(), 1);
        assert_eq!(report.status(StageKind::Frontend), Some(&StageStatus::Ran));
        assert_eq!(
            report.status(StageKind::Stage),
            Some(&StageStatus::Skipped(SkipReason::NoSource(ctx.source_root.clone())))
        );
        assert!(report.artifacts.is_empty());
    }

    #[test]
    fn test_disabled_frontend_uses_existing_dist() {
        let dir = TempDir::new().unwrap();
        let mut ctx = context(dir.path());
        ctx.frontend_enabled = false;
        fs::create_dir_all(&ctx.source_root).unwrap();
        fs::write(ctx.source_root.join("index.html"), "<p>prebuilt</p>").unwrap();

        let report = run(&ctx, &FailingFrontend);

        assert!(report.is_success());
        assert_eq!(
            report.status(StageKind::Frontend),
            Some(&StageStatus::Skipped(SkipReason::Disabled))
        );
        assert_eq!(report.artifacts.len(), 1);
    }

    #[test]
    fn test_failing_frontend_aborts_run() {
        let dir = TempDir::new().unwrap();
        let ctx = context(dir.path());
        fs::create_dir_all(&ctx.source_root).unwrap();
        fs::write(ctx.source_root.join("index.html"), "<p>old</p>").unwrap();

        let report = run(&ctx, &FailingFrontend);

        assert!(!report.is_success());
        assert_eq!(report.outcomes.len(), 1);
        match report.status(StageKind::Frontend) {
            Some(StageStatus::Failed { summary, detail }) => {
                assert!(summary.contains("npm"));
                assert_eq!(detail, "error TS2304: Cannot find name 'foo'.");
            }
            other => panic!("expected failure, got {other:?}"),
        }
        assert!(!ctx.staging_root.exists());
    }

    #[test]
    fn test_stage_failure_skips_compress() {
        let dir = TempDir::new().unwrap();
        let mut ctx = context(dir.path());
        ctx.frontend_enabled = false;
        ctx.staging_root = ctx.source_root.join("www");
        fs::create_dir_all(&ctx.source_root).unwrap();

        let report = run(&ctx, &FailingFrontend);

        assert!(!report.is_success());
        assert!(matches!(
            report.status(StageKind::Stage),
            Some(StageStatus::Failed { .. })
        ));
        assert_eq!(
            report.status(StageKind::Compress),
            Some(&StageStatus::Skipped(SkipReason::DependencyFailed(StageKind::Stage)))
        );
    }

    #[test]
    fn test_compress_only() {
        let dir = TempDir::new().unwrap();
        let ctx = context(dir.path());

        let report = compress_only(&ctx);
        assert!(report.is_success());
        assert!(matches!(
            report.status(StageKind::Compress),
            Some(StageStatus::Skipped(SkipReason::NoSource(_)))
        ));

        fs::create_dir_all(&ctx.staging_root).unwrap();
        fs::write(ctx.staging_root.join("style.css"), "a{}").unwrap();
        let report = compress_only(&ctx);
        assert_eq!(report.outcomes.len(), 1);
        assert_eq!(report.artifacts.len(), 1);
        assert!(ctx.output_root.join("style.css.gz").exists());
    }

    #[test]
    fn test_output_above_frontend_is_refused() {
        let dir = TempDir::new().unwrap();
        let fw = dir.path().join("fw");
        let mut ctx = context(&fw);
        ctx.staging_root = dir.path().join("stage/www");
        ctx.output_root = fw.clone();
        fs::create_dir_all(ctx.frontend_dir.join("src")).unwrap();
        fs::write(ctx.frontend_dir.join("src/App.jsx"), "export default App;").unwrap();
        let frontend = StubFrontend::new(web_ui_files());

        let report = run(&ctx, &frontend);

        assert!(!report.is_success());
        assert_eq!(report.status(StageKind::Stage), Some(&StageStatus::Ran));
        match report.status(StageKind::Compress) {
            Some(StageStatus::Failed { summary, .. }) => assert!(summary.contains("web-ui")),
            other => panic!("expected failure, got {other:?}"),
        }
        assert!(ctx.frontend_dir.join("src/App.jsx").is_file());
        assert!(ctx.source_root.join("app.js").is_file());

        let report = compress_only(&ctx);
        assert!(!report.is_success());
        assert!(ctx.frontend_dir.join("src/App.jsx").is_file());
    }

    #[test]
    fn test_source_inside_output_keeps_shipped_gzip() {
        let dir = TempDir::new().unwrap();
        let mut ctx = context(dir.path());
        ctx.frontend_enabled = false;
        ctx.source_root = dir.path().join("data/ui-dist");
        fs::create_dir_all(&ctx.source_root).unwrap();
        fs::write(ctx.source_root.join("index.html"), "<p>ui</p>").unwrap();
        fs::write(ctx.source_root.join("vendor.js.gz"), "shipped").unwrap();

        let report = run(&ctx, &FailingFrontend);

        assert!(matches!(
            report.status(StageKind::Compress),
            Some(StageStatus::Failed { .. })
        ));
        assert_eq!(
            fs::read(ctx.source_root.join("vendor.js.gz")).unwrap(),
            b"shipped"
        );
    }

    #[test]
    fn test_compress_only_drops_artifacts_of_removed_files() {
        let dir = TempDir::new().unwrap();
        let mut ctx = context(dir.path());
        ctx.output_root = ctx.staging_root.clone();
        ctx.placement = Placement::Mirror;
        fs::create_dir_all(&ctx.staging_root).unwrap();
        fs::write(ctx.staging_root.join("app.js"), "let a = 1;").unwrap();
        fs::write(ctx.staging_root.join("old.js"), "let old = 1;").unwrap();

        assert!(compress_only(&ctx).is_success());
        assert!(ctx.staging_root.join("old.js.gz").is_file());

        fs::remove_file(ctx.staging_root.join("old.js")).unwrap();
        let report = compress_only(&ctx);

        assert!(report.is_success());
        assert_eq!(report.artifacts.len(), 1);
        assert!(!ctx.staging_root.join("old.js.gz").exists());
        assert!(ctx.staging_root.join("app.js.gz").is_file());
    }

    #[test]
    fn test_from_config() {
        let mut config = ProjectConfig::default();
        config.build.placement = Placement::Mirror;
        config.build.frontend.enable = false;
        let ctx = PipelineContext::from_config(&config);
        assert_eq!(ctx.placement, Placement::Mirror);
        assert!(!ctx.frontend_enabled);
        assert_eq!(ctx.staging_root, PathBuf::from("data/www"));
        assert_eq!(ctx.extensions.len(), 4);
        assert_eq!(ctx.project_root, config.root);
    }
}
