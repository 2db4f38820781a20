//! `[build.frontend]` configuration: the external frontend build.
//!
//! # Example
//!
//! ```toml
//! [build.frontend]
//! dir = "web-ui"                      # Working directory of the command
//! command = ["npm", "run", "build"]   # Supports `$WEBSTAGE_*` substitution
//! timeout = 300                       # Seconds before the build is killed
//! quiet = true                        # Hide the tool's output
//! pty = true                          # Run inside a pseudo-terminal
//! ```

use crate::config::{ConfigDiagnostics, FieldPath};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

const FIELD_COMMAND: FieldPath = FieldPath::new("build.frontend.command");
const FIELD_TIMEOUT: FieldPath = FieldPath::new("build.frontend.timeout");

/// Package runners that fetch the real tool on demand.
const PACKAGE_RUNNERS: &[&str] = &["npx", "bunx", "pnpx", "yarn", "dlx"];

/// Configuration for the frontend build command.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FrontendConfig {
    /// Whether to run the frontend build (default: true).
    pub enable: bool,

    /// Display name for logging (defaults to command[0]).
    pub name: Option<String>,

    /// Working directory of the command (frontend project root).
    pub dir: PathBuf,

    /// Command and arguments to execute.
    pub command: Vec<String>,

    /// Kill the build after this many seconds.
    pub timeout: Option<u64>,

    /// Suppress output of successful builds (default: false).
    pub quiet: bool,

    /// Run inside a pseudo-terminal (stderr is merged into stdout).
    pub pty: bool,
}

impl Default for FrontendConfig {
    fn default() -> Self {
        Self {
            enable: true,
            name: None,
            dir: "web-ui".into(),
            command: vec!["npm".into(), "run".into(), "build".into()],
            timeout: None,
            quiet: false,
            pty: false,
        }
    }
}

impl FrontendConfig {
    /// Get the display name for this build.
    ///
    /// Returns `name` if set, otherwise falls back to `command[0]`.
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or_else(|| {
            self.command
                .first()
                .map(String::as_str)
                .unwrap_or("frontend")
        })
    }

    /// Timeout as a `Duration`.
    pub fn timeout_duration(&self) -> Option<Duration> {
        self.timeout.map(Duration::from_secs)
    }

    /// Validate frontend configuration.
    ///
    /// The command is only looked up on `PATH` when the frontend directory
    /// exists; a project without a web UI never runs it.
    pub fn validate(&self, diag: &mut ConfigDiagnostics) {
        if !self.enable {
            return;
        }

        if self.command.is_empty() {
            diag.error_with_hint(
                FIELD_COMMAND,
                "command is empty",
                "set it, or disable the step with `enable = false`",
            );
            return;
        }

        if self.timeout == Some(0) {
            diag.error(FIELD_TIMEOUT, "timeout must be at least one second");
        }

        if !self.dir.exists() {
            return;
        }

        let cmd = &self.command[0];
        if which::which(cmd).is_err() {
            if PACKAGE_RUNNERS.contains(&cmd.as_str()) {
                if self.command.len() > 1 {
                    diag.hint(
                        FIELD_COMMAND,
                        format!(
                            "`{}` runs via `{}`, make sure the package is installed",
                            self.command[1], cmd
                        ),
                    );
                }
            } else {
                diag.error_with_hint(
                    FIELD_COMMAND,
                    format!("`{cmd}` not found"),
                    "install the command or update `build.frontend.command`",
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::test_parse_config;
    use tempfile::TempDir;

    #[test]
    fn test_default_frontend() {
        let config = test_parse_config("");
        let frontend = &config.build.frontend;
        assert!(frontend.enable);
        assert_eq!(frontend.command, vec!["npm", "run", "build"]);
        assert_eq!(frontend.display_name(), "npm");
        assert_eq!(frontend.timeout_duration(), None);
        assert!(!frontend.quiet);
    }

    #[test]
    fn test_custom_frontend() {
        let config = test_parse_config(
            r#"
[build.frontend]
name = "vite"
dir = "ui"
command = ["pnpm", "build"]
timeout = 120
quiet = true
"#,
        );
        let frontend = &config.build.frontend;
        assert_eq!(frontend.display_name(), "vite");
        assert_eq!(frontend.dir, PathBuf::from("ui"));
        assert_eq!(frontend.timeout_duration(), Some(Duration::from_secs(120)));
        assert!(frontend.quiet);
    }

    #[test]
    fn test_validate_empty_command() {
        let frontend = FrontendConfig {
            command: vec![],
            ..Default::default()
        };
        let mut diag = ConfigDiagnostics::new();
        frontend.validate(&mut diag);
        assert_eq!(diag.errors().len(), 1);
    }

    #[test]
    fn test_validate_disabled_skips_checks() {
        let frontend = FrontendConfig {
            enable: false,
            command: vec![],
            ..Default::default()
        };
        let mut diag = ConfigDiagnostics::new();
        frontend.validate(&mut diag);
        assert!(!diag.has_errors());
    }

    #[test]
    fn test_validate_missing_tool() {
        let dir = TempDir::new().unwrap();
        let frontend = FrontendConfig {
            dir: dir.path().to_path_buf(),
            command: vec!["webstage-missing-tool".into()],
            ..Default::default()
        };
        let mut diag = ConfigDiagnostics::new();
        frontend.validate(&mut diag);
        assert_eq!(diag.errors().len(), 1);
        assert!(diag.errors()[0].message.contains("not found"));
    }

    #[test]
    fn test_validate_missing_tool_without_frontend_dir() {
        let frontend = FrontendConfig {
            dir: "/nonexistent-webstage/web-ui".into(),
            command: vec!["webstage-missing-tool".into()],
            ..Default::default()
        };
        let mut diag = ConfigDiagnostics::new();
        frontend.validate(&mut diag);
        assert!(!diag.has_errors());
    }

    #[test]
    fn test_validate_package_runner_never_errors() {
        let dir = TempDir::new().unwrap();
        let frontend = FrontendConfig {
            dir: dir.path().to_path_buf(),
            command: vec!["npx".into(), "vite".into(), "build".into()],
            ..Default::default()
        };
        let mut diag = ConfigDiagnostics::new();
        frontend.validate(&mut diag);
        assert!(!diag.has_errors());
    }
}
