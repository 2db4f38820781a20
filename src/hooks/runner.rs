//! Frontend build execution.
//!
//! Runs the configured `[build.frontend]` command with `$WEBSTAGE_*`
//! environment variables and maps its outcome to `FrontendError`.

use crate::config::{FrontendConfig, ProjectConfig};
use crate::log;
use crate::pipeline::{BuildFrontend, FrontendError};
use crate::utils::exec::{Cmd, NPM_FILTER, SILENT_FILTER};
use rustc_hash::FxHashMap;
use std::path::Path;

// ============================================================================
// Environment Variables
// ============================================================================

/// Build `$WEBSTAGE_*` environment variables for the frontend command
pub fn build_webstage_vars(config: &ProjectConfig) -> FxHashMap<String, String> {
    let mut vars = FxHashMap::default();

    vars.insert("WEBSTAGE_ROOT".into(), config.get_root().display().to_string());
    vars.insert(
        "WEBSTAGE_SOURCE_DIR".into(),
        config.build.source.display().to_string(),
    );
    vars.insert(
        "WEBSTAGE_STAGING_DIR".into(),
        config.build.staging.display().to_string(),
    );
    vars.insert(
        "WEBSTAGE_OUTPUT_DIR".into(),
        config.build.output.display().to_string(),
    );

    vars
}

// ============================================================================
// Command Argument Resolution
// ============================================================================

/// Resolve `$WEBSTAGE_*` variables in command arguments
///
/// Replaces occurrences of `$WEBSTAGE_XXX` with actual values from the vars map
pub fn resolve_args(args: &[String], vars: &FxHashMap<String, String>) -> Vec<String> {
    args.iter()
        .map(|arg| {
            let mut result = arg.clone();
            for (key, value) in vars {
                let pattern = format!("${}", key);
                result = result.replace(&pattern, value);
            }
            result
        })
        .collect()
}

// ============================================================================
// Frontend Execution
// ============================================================================

/// Frontend build backed by an external command (`npm run build` by default).
pub struct CommandFrontend<'a> {
    frontend: &'a FrontendConfig,
    vars: FxHashMap<String, String>,
}

impl<'a> CommandFrontend<'a> {
    pub fn new(config: &'a ProjectConfig) -> Self {
        Self {
            frontend: &config.build.frontend,
            vars: build_webstage_vars(config),
        }
    }
}

impl BuildFrontend for CommandFrontend<'_> {
    fn build(&self, working_dir: &Path) -> Result<(), FrontendError> {
        let resolved = resolve_args(&self.frontend.command, &self.vars);
        let name = self.frontend.display_name();

        log!("frontend"; "`{}` running in {}", name, working_dir.display());

        let filter = if self.frontend.quiet {
            &SILENT_FILTER
        } else {
            &NPM_FILTER
        };

        let output = Cmd::from_slice(&resolved)
            .cwd(working_dir)
            .envs(&self.vars)
            .pty(self.frontend.pty)
            .timeout(self.frontend.timeout_duration())
            .filter(filter)
            .output()?;

        if output.status.success() {
            return Ok(());
        }

        // Compilers report on stderr; some build scripts only print to stdout
        let stderr = String::from_utf8_lossy(&output.stderr);
        let diagnostic = if stderr.trim().is_empty() {
            String::from_utf8_lossy(&output.stdout).into_owned()
        } else {
            stderr.into_owned()
        };

        Err(FrontendError::Failed {
            program: name.to_string(),
            status: output.status.to_string(),
            diagnostic,
        })
    }
}

// ============================================================================
// Tests
// ============================================================================
