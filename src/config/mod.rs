//! Project configuration management for `webstage.toml`.
//!
//! # Module Structure
//!
//! ```text
//! config/
//! ├── section/       # Configuration section definitions
//! │   ├── build/     # [build] and [build.frontend]
//! │   └── firmware   # [firmware]
//! ├── types/         # Utility types
//! │   ├── error      # ConfigError, ConfigDiagnostics
//! │   └── field      # FieldPath
//! └── mod.rs         # ProjectConfig (this file)
//! ```
//!
//! # Sections
//!
//! | Section             | Purpose                                          |
//! |---------------------|--------------------------------------------------|
//! | `[build]`           | Source/staging/output trees, placement, budget   |
//! | `[build.frontend]`  | Frontend build command                           |
//! | `[firmware]`        | Flash size, OTA limit, upload hints              |
//!
//! A missing config file is not an error: defaults apply with the current
//! directory as project root.

pub mod section;
pub mod types;
mod util;

use util::find_config_file;

// Re-export from section/
pub use section::{BuildSectionConfig, FirmwareConfig, FrontendConfig, Placement};

// Re-export from types/
pub use types::{ConfigDiagnostics, ConfigError, FieldPath};

use crate::{
    cli::{Cli, Commands, TreeArgs},
    debug, log,
    utils::path::{expand_path, normalize_path},
};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
};

// ============================================================================
// root configuration
// ============================================================================

/// Root configuration structure representing webstage.toml
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProjectConfig {
    /// Absolute path to the config file (internal use only)
    #[serde(skip)]
    pub config_path: PathBuf,

    /// Project root directory - parent of config file (internal use only)
    #[serde(skip)]
    pub root: PathBuf,

    /// Whether values came from a config file rather than defaults
    #[serde(skip)]
    pub from_file: bool,

    /// Staging and compression settings
    #[serde(default)]
    pub build: BuildSectionConfig,

    /// Firmware check settings
    #[serde(default)]
    pub firmware: FirmwareConfig,
}

impl ProjectConfig {
    /// Load configuration from CLI arguments.
    ///
    /// Searches upward from cwd to find the config file. The project root
    /// is the config file's parent directory, or cwd when there is none.
    pub fn load(cli: &Cli) -> Result<Self> {
        let cwd = std::env::current_dir().context("Failed to get current working directory")?;
        let found = if cli.is_init() {
            None
        } else {
            find_config_file(&cli.config, &cwd)
        };

        let mut config = match &found {
            Some(path) => Self::from_path(path)?,
            None => Self::default(),
        };

        config.from_file = found.is_some();
        config.config_path = normalize_path(&found.unwrap_or_else(|| cwd.join(&cli.config)));

        if !config.from_file && !cli.is_init() {
            debug!("config"; "no {} found, using defaults", cli.config.display());
        }

        let root = if config.from_file {
            config
                .config_path
                .parent()
                .map(Path::to_path_buf)
                .unwrap_or_else(|| cwd.clone())
        } else {
            cwd
        };

        config.finalize(cli, &root);

        if !cli.is_init() {
            config.validate(&cli.command)?;
        }

        Ok(config)
    }

    /// Finalize configuration after loading.
    fn finalize(&mut self, cli: &Cli, root: &Path) {
        self.root = normalize_path(root);
        self.apply_command_options(&cli.command);
        self.normalize_paths();
    }

    /// Parse configuration from TOML string
    pub fn from_str(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content).map_err(ConfigError::Toml)?;
        Ok(config)
    }

    /// Load configuration from file path with unknown field detection.
    fn from_path(path: &Path) -> Result<Self> {
        let content =
            fs::read_to_string(path).map_err(|err| ConfigError::Io(path.to_path_buf(), err))?;

        let (config, ignored) = Self::parse_with_ignored(&content)?;

        if !ignored.is_empty() {
            Self::print_unknown_fields_warning(&ignored, path);
        }

        Ok(config)
    }

    /// Parse TOML content, collecting any unknown fields.
    fn parse_with_ignored(content: &str) -> Result<(Self, Vec<String>)> {
        let mut ignored = Vec::new();
        let deserializer = toml::Deserializer::new(content);
        let config = serde_ignored::deserialize(deserializer, |path: serde_ignored::Path| {
            ignored.push(path.to_string());
        })
        .map_err(ConfigError::Toml)?;
        Ok((config, ignored))
    }

    /// Print warning about unknown fields.
    fn print_unknown_fields_warning(fields: &[String], path: &Path) {
        let display_path = path
            .file_name()
            .map(|n| n.to_string_lossy())
            .unwrap_or_else(|| path.to_string_lossy());
        log!("warning"; "unknown fields in {}, ignoring:", display_path);
        for field in fields {
            eprintln!("- {}", field);
        }
    }

    /// Get the root directory path
    pub fn get_root(&self) -> &Path {
        &self.root
    }

    /// Get path relative to the project root (for display)
    pub fn root_relative(&self, path: impl AsRef<Path>) -> PathBuf {
        path.as_ref()
            .strip_prefix(&self.root)
            .map(Path::to_path_buf)
            .unwrap_or_else(|_| path.as_ref().to_path_buf())
    }

    // ========================================================================
    // cli configuration updates
    // ========================================================================

    /// Apply command-specific configuration options.
    fn apply_command_options(&mut self, command: &Commands) {
        match command {
            Commands::Build { build_args } => {
                Self::update_option(&mut self.build.source, build_args.source.as_ref());
                if build_args.skip_frontend {
                    self.build.frontend.enable = false;
                }
                self.apply_tree_args(&build_args.trees);
            }
            Commands::Compress { trees } => self.apply_tree_args(trees),
            Commands::Check { firmware } => {
                if firmware.is_some() {
                    self.firmware.path = firmware.clone();
                }
            }
            Commands::Init => {}
        }
    }

    /// Apply staging/output/placement overrides from CLI.
    fn apply_tree_args(&mut self, args: &TreeArgs) {
        Self::update_option(&mut self.build.staging, args.staging.as_ref());
        Self::update_option(&mut self.build.output, args.output.as_ref());
        Self::update_option(&mut self.build.placement, args.placement.as_ref());
    }

    /// Overwrite `target` when the CLI provided a value.
    fn update_option<T: Clone>(target: &mut T, value: Option<&T>) {
        if let Some(v) = value {
            *target = v.clone();
        }
    }

    /// Resolve every configured path against the project root.
    fn normalize_paths(&mut self) {
        let root = self.root.clone();
        self.build.source = expand_path(&self.build.source, &root);
        self.build.staging = expand_path(&self.build.staging, &root);
        self.build.output = expand_path(&self.build.output, &root);
        self.build.frontend.dir = expand_path(&self.build.frontend.dir, &root);
        if let Some(path) = self.firmware.path.take() {
            self.firmware.path = Some(expand_path(&path, &root));
        }
    }

    // ========================================================================
    // validation
    // ========================================================================

    /// Validate configuration for the current command.
    ///
    /// Collects all validation errors and returns them at once.
    pub fn validate(&self, command: &Commands) -> Result<()> {
        let mut diag = ConfigDiagnostics::new();

        self.build.validate(&self.root, &mut diag);
        self.firmware.validate(&mut diag);

        // The frontend command only matters when it is about to run
        if matches!(command, Commands::Build { .. }) {
            self.build.frontend.validate(&mut diag);
        }

        diag.into_result()
            .map_err(|e| ConfigError::Diagnostics(e).into())
    }
}

// ============================================================================
// Test Helpers (available to all modules via `use crate::config::test_*`)
// ============================================================================

/// Parse config text, panicking on unknown fields (catches typos in tests).
#[cfg(test)]
pub fn test_parse_config(content: &str) -> ProjectConfig {
    let (parsed, ignored) = ProjectConfig::parse_with_ignored(content).unwrap();
    assert!(
        ignored.is_empty(),
        "test config has unknown fields: {:?}",
        ignored
    );
    parsed
}

// ============================================================================
// tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::BuildArgs;
    use tempfile::TempDir;

    fn build_command(args: BuildArgs) -> Commands {
        Commands::Build { build_args: args }
    }

    #[test]
    fn test_unknown_fields_collected() {
        let (_, ignored) = ProjectConfig::parse_with_ignored(
            r#"
[build]
staging = "data/www"
stagign = "typo"

[firmware]
flash = 1
"#,
        )
        .unwrap();
        assert_eq!(ignored, vec!["build.stagign", "firmware.flash"]);
    }

    #[test]
    fn test_invalid_toml() {
        assert!(ProjectConfig::from_str("[build\nsource = 1").is_err());
        assert!(ProjectConfig::from_str("[build]\nplacement = \"sideways\"").is_err());
    }

    #[test]
    fn test_finalize_resolves_paths() {
        let dir = TempDir::new().unwrap();
        let root = normalize_path(dir.path());
        let mut config = test_parse_config("[build]\nstaging = \"fs/www\"\noutput = \"fs\"");
        config.root = root.clone();
        config.normalize_paths();

        assert_eq!(config.build.staging, root.join("fs/www"));
        assert_eq!(config.build.output, root.join("fs"));
        assert_eq!(config.build.source, root.join("web-ui/dist"));
        assert_eq!(config.build.frontend.dir, root.join("web-ui"));
    }

    #[test]
    fn test_cli_overrides() {
        let mut config = ProjectConfig::default();
        let args = BuildArgs {
            source: Some("ui/build".into()),
            skip_frontend: true,
            trees: TreeArgs {
                staging: None,
                output: Some("image".into()),
                placement: Some(Placement::Mirror),
            },
        };
        config.apply_command_options(&build_command(args));

        assert_eq!(config.build.source, PathBuf::from("ui/build"));
        assert_eq!(config.build.staging, PathBuf::from("data/www"));
        assert_eq!(config.build.output, PathBuf::from("image"));
        assert_eq!(config.build.placement, Placement::Mirror);
        assert!(!config.build.frontend.enable);
    }

    #[test]
    fn test_check_override() {
        let mut config = ProjectConfig::default();
        config.apply_command_options(&Commands::Check {
            firmware: Some("fw.bin".into()),
        });
        assert_eq!(config.firmware.path, Some(PathBuf::from("fw.bin")));
    }

    #[test]
    fn test_validate_skips_frontend_outside_build() {
        let dir = TempDir::new().unwrap();
        let mut config = ProjectConfig::default();
        config.root = normalize_path(dir.path());
        config.build.frontend.command = vec![];
        config.normalize_paths();

        assert!(config.validate(&Commands::Compress { trees: TreeArgs::default() }).is_ok());
        assert!(config.validate(&build_command(BuildArgs::default())).is_err());
    }

    #[test]
    fn test_validate_rejects_output_at_project_root() {
        let dir = TempDir::new().unwrap();
        let mut config = test_parse_config("[build]\noutput = \".\"\nstaging = \"../stage/www\"");
        config.root = normalize_path(dir.path());
        config.normalize_paths();

        let err = config
            .validate(&Commands::Compress { trees: TreeArgs::default() })
            .unwrap_err();
        assert!(err.to_string().contains("build.output"));
    }

    #[test]
    fn test_root_relative() {
        let mut config = ProjectConfig::default();
        config.root = PathBuf::from("/fw");
        assert_eq!(config.root_relative("/fw/data/www"), PathBuf::from("data/www"));
        assert_eq!(config.root_relative("/elsewhere"), PathBuf::from("/elsewhere"));
    }
}
