//! Pipeline error types.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Failure of the collector or compressor stage.
///
/// All variants are fatal to the stage that raised them. Effects of
/// earlier stages are left in place.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("I/O error at `{}`", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("`{}` and `{}` overlap; staging would delete its own input", .source_root.display(), .dest_root.display())]
    OverlappingTrees {
        source_root: PathBuf,
        dest_root: PathBuf,
    },

    #[error("`{}` and `{}` both flatten to `{}`", .first.display(), .second.display(), .artifact.display())]
    Collision {
        artifact: PathBuf,
        first: PathBuf,
        second: PathBuf,
    },

    #[error("`{}` does not decompress to its source", .artifact.display())]
    Verify { artifact: PathBuf },

    #[error("output root `{}` contains `{}`; pruning it would delete project files", .output_root.display(), .tree.display())]
    UnsafeOutput { output_root: PathBuf, tree: PathBuf },
}

impl PipelineError {
    /// Wrap an `io::Error` with the path it concerns.
    pub fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Detail text for reports (the underlying cause, if any).
    pub fn detail(&self) -> String {
        match self {
            Self::Io { source, .. } => source.to_string(),
            Self::Collision { .. } => {
                "use `placement = \"mirror\"` or rename one of the files".to_string()
            }
            Self::UnsafeOutput { .. } => {
                "point `build.output` at a directory that holds only artifacts".to_string()
            }
            _ => String::new(),
        }
    }
}

/// Extension trait to attach a path to `io::Result`.
pub trait IoContext<T> {
    fn at(self, path: impl Into<PathBuf>) -> Result<T, PipelineError>;
}

impl<T> IoContext<T> for io::Result<T> {
    fn at(self, path: impl Into<PathBuf>) -> Result<T, PipelineError> {
        self.map_err(|source| PipelineError::io(path, source))
    }
}
