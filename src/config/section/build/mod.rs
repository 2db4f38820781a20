//! `[build]` section configuration.
//!
//! Contains the three trees of the staging pipeline and compression settings.
//!
//! # Example
//!
//! ```toml
//! [build]
//! source = "web-ui/dist"      # Frontend build output (relative to project root)
//! staging = "data/www"        # Mirror of `source`, replaced every run
//! output = "data"             # Where `.gz` artifacts are written
//! placement = "flatten"       # flatten | mirror
//! extensions = [".html", ".css", ".js", ".json"]
//! budget = 1048576            # Warn when compressed total exceeds this (bytes)
//! upload_hint = "pio run --target uploadfs"
//!
//! [build.frontend]
//! dir = "web-ui"
//! command = ["npm", "run", "build"]
//! timeout = 300
//! ```
//!
//! See [`frontend`] for the frontend build options.

mod frontend;

pub use frontend::FrontendConfig;

use crate::config::{ConfigDiagnostics, FieldPath};
use crate::utils::path::{enclosed_tree, trees_overlap};
use std::path::Path;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Extensions compressed by default: the text assets a web UI is made of.
pub const DEFAULT_EXTENSIONS: &[&str] = &[".html", ".css", ".js", ".json"];

const FIELD_EXTENSIONS: FieldPath = FieldPath::new("build.extensions");
const FIELD_STAGING: FieldPath = FieldPath::new("build.staging");
const FIELD_OUTPUT: FieldPath = FieldPath::new("build.output");
const FIELD_BUDGET: FieldPath = FieldPath::new("build.budget");

/// Where compressed artifacts are placed relative to the output root.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum Placement {
    /// `output/<filename>.gz`, subdirectories discarded (flat flash namespace).
    #[default]
    Flatten,
    /// `output/<relative path>.gz`, subdirectories preserved.
    Mirror,
}

impl Placement {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Flatten => "flatten",
            Self::Mirror => "mirror",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BuildSectionConfig {
    /// Frontend build output directory.
    pub source: PathBuf,

    /// Staging tree mirrored from `source`.
    pub staging: PathBuf,

    /// Root directory receiving compressed artifacts.
    pub output: PathBuf,

    /// Artifact placement policy.
    pub placement: Placement,

    /// File name suffixes selected for compression (case-sensitive).
    pub extensions: Vec<String>,

    /// Filesystem budget for the compressed artifacts, in bytes.
    pub budget: Option<u64>,

    /// Command suggested after a successful run.
    pub upload_hint: Option<String>,

    /// Frontend build step.
    pub frontend: FrontendConfig,
}

impl Default for BuildSectionConfig {
    fn default() -> Self {
        Self {
            source: "web-ui/dist".into(),
            staging: "data/www".into(),
            output: "data".into(),
            placement: Placement::Flatten,
            extensions: DEFAULT_EXTENSIONS.iter().map(|s| (*s).to_string()).collect(),
            budget: None,
            upload_hint: Some("pio run --target uploadfs".into()),
            frontend: FrontendConfig::default(),
        }
    }
}

impl BuildSectionConfig {
    /// Validate build configuration.
    ///
    /// Expects paths to be resolved against the project root already.
    pub fn validate(&self, root: &Path, diag: &mut ConfigDiagnostics) {
        if self.extensions.is_empty() {
            diag.error_with_hint(
                FIELD_EXTENSIONS,
                "no extensions configured, nothing would be compressed",
                format!("remove the key to use {}", DEFAULT_EXTENSIONS.join(", ")),
            );
        }

        for ext in &self.extensions {
            if !ext.starts_with('.') || ext.len() < 2 {
                diag.error_with_hint(
                    FIELD_EXTENSIONS,
                    format!("`{ext}` is not a file extension"),
                    format!("write it as `.{}`", ext.trim_start_matches('.')),
                );
            }
        }

        if trees_overlap(&self.source, &self.staging) {
            diag.error_with_hint(
                FIELD_STAGING,
                format!(
                    "staging tree `{}` overlaps source tree `{}`",
                    self.staging.display(),
                    self.source.display()
                ),
                "staging deletes its directory before copying; keep the trees apart",
            );
        }

        // The output root is pruned on every run
        let inputs = [self.source.as_path(), self.frontend.dir.as_path(), root];
        if let Some(tree) = enclosed_tree(&self.output, &inputs) {
            diag.error_with_hint(
                FIELD_OUTPUT,
                format!(
                    "output root `{}` contains `{}`",
                    self.output.display(),
                    tree.display()
                ),
                "stale artifacts are pruned from the output root; point it at a dedicated directory such as `data`",
            );
        } else if trees_overlap(&self.output, &self.source) {
            diag.error(
                FIELD_OUTPUT,
                format!(
                    "output root `{}` lies inside source tree `{}`",
                    self.output.display(),
                    self.source.display()
                ),
            );
        }

        if self.budget == Some(0) {
            diag.error(FIELD_BUDGET, "budget must be greater than zero");
        }
    }
}
