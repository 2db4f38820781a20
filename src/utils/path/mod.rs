//! Path utilities.
//!
//! Pure functions for path manipulation. No side effects.
//!
//! - [`fs`]: Filesystem path normalization and tree containment checks

pub mod fs;

pub use fs::{enclosed_tree, expand_path, is_within, normalize_path, trees_overlap};
