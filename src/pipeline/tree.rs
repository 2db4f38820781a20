//! Sorted recursive directory listing shared by the collector and compressor.

use jwalk::WalkDir;
use std::io;
use std::path::{Path, PathBuf};

use super::error::PipelineError;

/// One entry below a tree root.
#[derive(Debug, Clone)]
pub struct TreeEntry {
    /// Absolute path of the entry.
    pub path: PathBuf,
    /// Path relative to the tree root.
    pub relative: PathBuf,
    pub is_dir: bool,
}

/// List every file and directory under `root` (root excluded).
///
/// Entries come back in sorted, depth-first order so logs and reports are
/// reproducible. Hidden files are included and symlinks followed: a staged
/// tree must contain everything the frontend emitted.
pub fn walk_tree(root: &Path) -> Result<Vec<TreeEntry>, PipelineError> {
    if !root.is_dir() {
        return Err(PipelineError::io(
            root,
            io::Error::new(io::ErrorKind::NotFound, "directory does not exist"),
        ));
    }

    let mut entries = Vec::new();
    for item in WalkDir::new(root)
        .sort(true)
        .skip_hidden(false)
        .follow_links(true)
    {
        let entry = item.map_err(|e| walk_error(root, e))?;
        if entry.depth == 0 {
            continue;
        }

        let path = entry.path();
        let relative = path.strip_prefix(root).unwrap_or(&path).to_path_buf();
        entries.push(TreeEntry {
            is_dir: entry.file_type().is_dir(),
            relative,
            path,
        });
    }
    Ok(entries)
}

/// Convert a walker error into an I/O failure at the offending path.
fn walk_error(root: &Path, err: jwalk::Error) -> PipelineError {
    let path = err.path().map_or_else(|| root.to_path_buf(), Path::to_path_buf);
    let message = err.to_string();
    let source = err
        .into_io_error()
        .unwrap_or_else(|| io::Error::other(message));
    PipelineError::io(path, source)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_walk_sorted_with_hidden() {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("b/c")).unwrap();
        fs::write(dir.path().join("b/c/z.js"), "z").unwrap();
        fs::write(dir.path().join("a.html"), "a").unwrap();
        fs::write(dir.path().join(".well-known"), "h").unwrap();

        let entries = walk_tree(dir.path()).unwrap();
        let relative: Vec<_> = entries.iter().map(|e| e.relative.clone()).collect();
        assert_eq!(
            relative,
            vec![
                PathBuf::from(".well-known"),
                PathBuf::from("a.html"),
                PathBuf::from("b"),
                PathBuf::from("b/c"),
                PathBuf::from("b/c/z.js"),
            ]
        );
        assert!(entries[2].is_dir);
        assert!(!entries[4].is_dir);
    }

    #[test]
    fn test_walk_missing_root() {
        let dir = TempDir::new().unwrap();
        let err = walk_tree(&dir.path().join("missing")).unwrap_err();
        assert!(matches!(err, PipelineError::Io { .. }));
    }
}
