//! Path normalization utilities.
//!
//! Provides consistent path handling across the codebase:
//! - `normalize_path` - file system paths (canonicalize + fallback)
//! - `expand_path` - tilde expansion + resolution against a project root
//! - `is_within` / `trees_overlap` / `enclosed_tree` - containment checks between directory trees

use std::path::{Component, Path, PathBuf};

/// Normalize a file system path to absolute form.
///
/// Tries `canonicalize()` first (resolves symlinks, `.`, `..`).
/// Falls back to lexical cleanup of an absolute path (the path may not
/// exist yet, e.g. an output directory before the first run).
#[inline]
pub fn normalize_path(path: &Path) -> PathBuf {
    path.canonicalize().unwrap_or_else(|_| {
        let absolute = if path.is_absolute() {
            path.to_path_buf()
        } else {
            std::env::current_dir().map_or_else(|_| path.to_path_buf(), |cwd| cwd.join(path))
        };
        lexical_clean(&absolute)
    })
}

/// Expand `~` and resolve a configured path against `root`.
///
/// # Example
/// ```ignore
/// expand_path(Path::new("data/www"), root)  // -> <root>/data/www
/// expand_path(Path::new("~/fw/data"), root) // -> $HOME/fw/data
/// ```
pub fn expand_path(path: &Path, root: &Path) -> PathBuf {
    let expanded = shellexpand::tilde(&path.to_string_lossy()).into_owned();
    let path = PathBuf::from(expanded);
    let full_path = if path.is_relative() {
        root.join(&path)
    } else {
        path
    };
    normalize_path(&full_path)
}

/// Check whether `path` equals `dir` or lies underneath it.
///
/// Both sides are normalized first so `data/./www` and `data/www` agree.
pub fn is_within(path: &Path, dir: &Path) -> bool {
    normalize_path(path).starts_with(normalize_path(dir))
}

/// Check whether two directory trees share any part (equal or nested).
pub fn trees_overlap(a: &Path, b: &Path) -> bool {
    is_within(a, b) || is_within(b, a)
}

/// First of `trees` that `root` contains or equals.
pub fn enclosed_tree<'a>(root: &Path, trees: &[&'a Path]) -> Option<&'a Path> {
    trees.iter().copied().find(|tree| is_within(tree, root))
}

/// Remove `.` and resolve `..` without touching the filesystem.
fn lexical_clean(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            other => out.push(other),
        }
    }
    out
}
