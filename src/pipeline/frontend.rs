//! The external "build frontend" step, as seen by the pipeline.

use std::path::Path;
use thiserror::Error;

use crate::utils::exec::ExecError;

/// Capability to build the web UI sources into their distribution tree.
///
/// The production implementation shells out (see `hooks::CommandFrontend`);
/// tests substitute stubs.
pub trait BuildFrontend {
    fn build(&self, working_dir: &Path) -> Result<(), FrontendError>;
}

#[derive(Debug, Error)]
pub enum FrontendError {
    /// The build command ran and exited unsuccessfully.
    #[error("`{program}` failed ({status})")]
    Failed {
        program: String,
        status: String,
        /// Captured stderr, or stdout when stderr was empty.
        diagnostic: String,
    },

    #[error(transparent)]
    Exec(#[from] ExecError),
}

impl FrontendError {
    /// Text shown under the failure line.
    pub fn detail(&self) -> String {
        match self {
            Self::Failed { diagnostic, .. } => diagnostic.trim_end().to_string(),
            Self::Exec(_) => String::new(),
        }
    }
}
