//! Compressor: gzip eligible staged files into the output root.
//!
//! Output is deterministic: maximum compression level, zero mtime and no
//! embedded file name, so identical input trees yield byte-identical
//! artifacts across runs.

use flate2::{Compression, GzBuilder, read::GzDecoder};
use rustc_hash::{FxHashMap, FxHashSet};
use std::ffi::OsString;
use std::fs;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use super::error::{IoContext, PipelineError};
use super::tree::walk_tree;
use crate::{
    config::Placement,
    debug,
    utils::{
        path::{enclosed_tree, is_within},
        size::saved_ratio,
    },
};

/// Suffix appended to every artifact.
pub const GZ_SUFFIX: &str = ".gz";

/// One compressed staged file.
#[derive(Debug, Clone, PartialEq)]
pub struct CompressedArtifact {
    /// Source path relative to the staging root.
    pub source: PathBuf,
    /// Absolute artifact path.
    pub destination: PathBuf,
    /// Artifact path relative to the output root.
    pub artifact: PathBuf,
    pub original_size: u64,
    pub compressed_size: u64,
    /// `1 - compressed/original`; `None` for an empty source.
    pub ratio: Option<f64>,
    /// Hex blake3 digest of the compressed bytes.
    pub digest: String,
}

/// Where an eligible file's artifact goes under `output_root`.
pub fn artifact_path(placement: Placement, output_root: &Path, relative: &Path) -> PathBuf {
    let mut name: OsString = match placement {
        Placement::Flatten => relative.file_name().unwrap_or_default().to_os_string(),
        Placement::Mirror => relative.as_os_str().to_os_string(),
    };
    name.push(GZ_SUFFIX);
    output_root.join(name)
}

/// Whether a file name ends with one of `extensions` (case-sensitive).
pub fn is_eligible(name: &str, extensions: &[String]) -> bool {
    extensions.iter().any(|ext| name.ends_with(ext.as_str()))
}

/// Compress every eligible file under `staged_root` into `output_root`.
///
/// Artifacts are returned in sorted traversal order. Staged files are never
/// modified; stale artifacts from earlier runs are pruned first. An output
/// root that contains or equals one of the `protected` trees is refused.
pub fn compress(
    staged_root: &Path,
    output_root: &Path,
    extensions: &[String],
    placement: Placement,
    protected: &[&Path],
) -> Result<Vec<CompressedArtifact>, PipelineError> {
    if let Some(tree) = enclosed_tree(output_root, protected) {
        return Err(PipelineError::UnsafeOutput {
            output_root: output_root.to_path_buf(),
            tree: tree.to_path_buf(),
        });
    }

    let plan = plan_artifacts(staged_root, output_root, extensions, placement)?;

    prune_output(staged_root, output_root, extensions, &plan)?;

    let mut artifacts = Vec::with_capacity(plan.len());
    for (relative, destination) in plan {
        let artifact = compress_file(staged_root, output_root, relative, destination)?;
        debug!(
            "gzip";
            "{} ({})",
            artifact.artifact.display(),
            artifact.digest
        );
        artifacts.push(artifact);
    }
    Ok(artifacts)
}

/// Select eligible files and their destinations, rejecting flatten collisions.
fn plan_artifacts(
    staged_root: &Path,
    output_root: &Path,
    extensions: &[String],
    placement: Placement,
) -> Result<Vec<(PathBuf, PathBuf)>, PipelineError> {
    let mut plan = Vec::new();
    let mut claimed: FxHashMap<PathBuf, PathBuf> = FxHashMap::default();

    for entry in walk_tree(staged_root)? {
        let eligible = !entry.is_dir
            && entry
                .path
                .file_name()
                .is_some_and(|name| is_eligible(&name.to_string_lossy(), extensions));
        if !eligible {
            continue;
        }

        let destination = artifact_path(placement, output_root, &entry.relative);
        if let Some(first) = claimed.get(&destination) {
            return Err(PipelineError::Collision {
                artifact: destination,
                first: first.clone(),
                second: entry.relative,
            });
        }
        claimed.insert(destination.clone(), entry.relative.clone());
        plan.push((entry.relative, destination));
    }
    Ok(plan)
}

/// Gzip one file, write it, and verify it decompresses to the original.
fn compress_file(
    staged_root: &Path,
    output_root: &Path,
    relative: PathBuf,
    destination: PathBuf,
) -> Result<CompressedArtifact, PipelineError> {
    let source_path = staged_root.join(&relative);
    let original = fs::read(&source_path).at(&source_path)?;

    let compressed = gzip(&original).at(&source_path)?;
    verify(&compressed, &original, &destination)?;

    if let Some(parent) = destination.parent() {
        fs::create_dir_all(parent).at(parent)?;
    }
    fs::write(&destination, &compressed).at(&destination)?;

    let original_size = original.len() as u64;
    let compressed_size = compressed.len() as u64;
    let artifact = destination
        .strip_prefix(output_root)
        .map_or_else(|_| destination.clone(), Path::to_path_buf);

    Ok(CompressedArtifact {
        source: relative,
        artifact,
        destination,
        original_size,
        compressed_size,
        ratio: saved_ratio(original_size, compressed_size),
        digest: hex::encode(blake3::hash(&compressed).as_bytes()),
    })
}

/// Deterministic gzip at maximum level.
fn gzip(data: &[u8]) -> std::io::Result<Vec<u8>> {
    let mut encoder = GzBuilder::new()
        .mtime(0)
        .write(Vec::with_capacity(data.len() / 2 + 64), Compression::best());
    encoder.write_all(data)?;
    encoder.finish()
}

fn verify(compressed: &[u8], original: &[u8], destination: &Path) -> Result<(), PipelineError> {
    let mut decoded = Vec::with_capacity(original.len());
    let roundtrip = GzDecoder::new(compressed).read_to_end(&mut decoded);
    if roundtrip.is_err() || decoded != original {
        return Err(PipelineError::Verify {
            artifact: destination.to_path_buf(),
        });
    }
    Ok(())
}

/// Remove artifacts a previous run left behind.
///
/// - output disjoint from staging: the output root is recreated empty
/// - staging inside output: `*.gz` outside the staging tree are removed
/// - output is (or lies inside) staging: artifacts that this run does not
///   produce and whose original is gone are removed
fn prune_output(
    staged_root: &Path,
    output_root: &Path,
    extensions: &[String],
    plan: &[(PathBuf, PathBuf)],
) -> Result<(), PipelineError> {
    if is_within(output_root, staged_root) {
        fs::create_dir_all(output_root).at(output_root)?;
        let planned: FxHashSet<&Path> = plan.iter().map(|(_, dest)| dest.as_path()).collect();
        let stale: Vec<_> = walk_tree(output_root)?
            .into_iter()
            .filter(|e| !e.is_dir && !planned.contains(e.path.as_path()))
            .filter(|e| is_orphaned_artifact(&e.path, extensions))
            .collect();
        return remove_files(stale.iter().map(|e| e.path.as_path()));
    }

    if is_within(staged_root, output_root) {
        let stale: Vec<_> = walk_tree(output_root)?
            .into_iter()
            .filter(|e| !e.is_dir && e.path.to_string_lossy().ends_with(GZ_SUFFIX))
            .filter(|e| !is_within(&e.path, staged_root))
            .collect();
        return remove_files(stale.iter().map(|e| e.path.as_path()));
    }

    if output_root.exists() {
        fs::remove_dir_all(output_root).at(output_root)?;
    }
    fs::create_dir_all(output_root).at(output_root)
}

/// `<name>.gz` where `<name>` is eligible but no longer exists beside it.
fn is_orphaned_artifact(path: &Path, extensions: &[String]) -> bool {
    let Some(name) = path.file_name().map(|n| n.to_string_lossy()) else {
        return false;
    };
    match name.strip_suffix(GZ_SUFFIX) {
        Some(original) if is_eligible(original, extensions) => {
            !path.with_file_name(original).exists()
        }
        _ => false,
    }
}

fn remove_files<'a>(paths: impl Iterator<Item = &'a Path>) -> Result<(), PipelineError> {
    for path in paths {
        fs::remove_file(path).at(path)?;
    }
    Ok(())
}
