//! Asset collector: mirror the frontend's output into the staging tree.
//!
//! The staging tree is replaced wholesale on every run so that files the
//! frontend no longer emits do not survive into the flash image.

use std::fs;
use std::io;
use std::path::{Component, Path};

use super::error::{IoContext, PipelineError};
use super::tree::walk_tree;
use crate::{debug, logger::ProgressLine, utils::path::trees_overlap};

/// Result of a completed staging pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StageSummary {
    /// Regular files copied.
    pub files: usize,
    /// Directories created below the staging root.
    pub dirs: usize,
    /// Bytes copied in total.
    pub bytes: u64,
    /// Top-level entries of the staging tree with their sizes (directories
    /// report the bytes of all files below them).
    pub entries: Vec<StagedEntry>,
}

/// A top-level entry of the staging tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagedEntry {
    pub name: String,
    pub size: u64,
    pub is_dir: bool,
}

/// Copy `source_root` into `dest_root`, replacing whatever was there.
///
/// Afterwards `dest_root` mirrors `source_root` exactly: same relative
/// paths, same bytes. Nothing under `source_root` is modified.
pub fn stage(source_root: &Path, dest_root: &Path) -> Result<StageSummary, PipelineError> {
    if trees_overlap(source_root, dest_root) {
        return Err(PipelineError::OverlappingTrees {
            source_root: source_root.to_path_buf(),
            dest_root: dest_root.to_path_buf(),
        });
    }

    // List the source first: a missing source fails before anything is deleted
    let entries = walk_tree(source_root)?;

    clear_dest(dest_root)?;
    fs::create_dir_all(dest_root).at(dest_root)?;

    let file_count = entries.iter().filter(|e| !e.is_dir).count();
    let progress = ProgressLine::new("stage", &[("copy", file_count)]);

    let mut summary = StageSummary::default();
    for entry in &entries {
        let target = dest_root.join(&entry.relative);
        if entry.is_dir {
            fs::create_dir_all(&target).at(&target)?;
            summary.dirs += 1;
            continue;
        }

        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent).at(parent)?;
        }
        let copied = fs::copy(&entry.path, &target).at(&entry.path)?;
        summary.files += 1;
        summary.bytes += copied;
        summary.add_to_entry(&entry.relative, copied, entry.relative.components().count() > 1);
        progress.inc("copy");
    }
    progress.finish();

    // Top-level directories that hold no files still appear in the listing
    for entry in entries.iter().filter(|e| e.is_dir) {
        if entry.relative.components().count() == 1 {
            summary.add_to_entry(&entry.relative, 0, true);
        }
    }
    summary.entries.sort_by(|a, b| a.name.cmp(&b.name));

    debug!(
        "stage";
        "{} -> {}: {} files, {} dirs",
        source_root.display(),
        dest_root.display(),
        summary.files,
        summary.dirs
    );
    Ok(summary)
}

impl StageSummary {
    /// Account `bytes` to the top-level entry containing `relative`.
    fn add_to_entry(&mut self, relative: &Path, bytes: u64, is_dir: bool) {
        let Some(Component::Normal(first)) = relative.components().next() else {
            return;
        };
        let name = first.to_string_lossy().into_owned();

        match self.entries.iter_mut().find(|e| e.name == name) {
            Some(entry) => {
                entry.size += bytes;
                entry.is_dir |= is_dir;
            }
            None => self.entries.push(StagedEntry { name, size: bytes, is_dir }),
        }
    }
}

/// Remove the previous staging tree, whatever shape it had.
fn clear_dest(dest_root: &Path) -> Result<(), PipelineError> {
    let result = match fs::symlink_metadata(dest_root) {
        Ok(meta) if meta.is_dir() => fs::remove_dir_all(dest_root),
        Ok(_) => fs::remove_file(dest_root),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e),
    };
    result.at(dest_root)
}

/// Paths of every regular file under `root`, relative to it (sorted).
#[cfg(test)]
pub(crate) fn list_files(root: &Path) -> Vec<std::path::PathBuf> {
    walk_tree(root)
        .unwrap()
        .into_iter()
        .filter(|e| !e.is_dir)
        .map(|e| e.relative)
        .collect()
}
