//! Index Builder: one deterministic snapshot from N descriptor files.
//!
//! The builder reads a registry root (a `registry.json` metadata file plus an
//! `index/` directory of per-package JSON descriptors), resolves each entry's
//! latest version under the strict semver grammar, sorts entries by lowercase
//! id, and emits one consolidated snapshot document. A malformed descriptor
//! is skipped with a warning and never fails the build; a missing registry
//! root or metadata file is fatal.

use crate::descriptor::PackageDescriptor;
use crate::error::{Result, SourceError};
use crate::snapshot::{Snapshot, SnapshotMeta};
use crate::version::compute_latest_version;
use anyhow::Context;
use serde::Deserialize;
use std::collections::HashSet;
use std::path::{Path, PathBuf};

/// Canonical remote registry source, shallow-cloned when no local copy exists.
pub const DEFAULT_REMOTE: &str = "https://github.com/regidx/registry";

const DEFAULT_REGISTRY_ID: &str = "package-registry";
const DEFAULT_SPEC_VERSION: &str = "1.0.0";
const DEFAULT_INDEX_FORMAT: &str = "json-per-package";

const METADATA_FILE: &str = "registry.json";
const INDEX_DIR: &str = "index";

/// Registry-level metadata (`registry.json` at the registry root).
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct RegistryMetaFile {
    id: String,
    spec_version: String,
    homepage: String,
    index: IndexSection,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct IndexSection {
    format: String,
}

/// Where to find the registry source.
#[derive(Debug, Clone, Default)]
pub struct BuildOptions {
    /// Explicit registry root; bypasses candidate search and cloning.
    pub root: Option<PathBuf>,
    /// Remote to shallow-clone when no local copy resolves.
    pub remote: Option<String>,
}

/// Result of one build: the snapshot plus accept/skip counters for reporting.
#[derive(Debug)]
pub struct BuildOutcome {
    pub snapshot: Snapshot,
    pub accepted: usize,
    pub skipped: usize,
}

fn has_registry_layout(path: &Path) -> bool {
    path.join(METADATA_FILE).is_file() && path.join(INDEX_DIR).is_dir()
}

/// Resolves the registry root in priority order.
///
/// 1. An explicit `--root` override (must already have the registry layout).
/// 2. A previously-cloned sibling mirror (layout plus a `.git` marker).
/// 3. A user-level cache clone from an earlier run.
/// 4. A fresh shallow clone of the canonical remote into the user cache.
///
/// Fails with a descriptive [`SourceError`] when nothing resolves.
pub async fn locate_registry_root(options: &BuildOptions) -> Result<PathBuf> {
    if let Some(root) = &options.root {
        if has_registry_layout(root) {
            return Ok(root.clone());
        }
        return Err(SourceError::RootNotFound {
            candidates: vec![root.clone()],
        }
        .into());
    }

    let cwd = std::env::current_dir().context("failed to resolve working directory")?;
    let mut candidates = Vec::new();

    for relative in ["../../registry", "../registry", "registry"] {
        let candidate = cwd.join(relative);
        if has_registry_layout(&candidate) && candidate.join(".git").exists() {
            tracing::debug!(root = %candidate.display(), "using local registry mirror");
            return Ok(candidate);
        }
        candidates.push(candidate);
    }

    if let Some(clone_dir) = user_clone_dir() {
        if has_registry_layout(&clone_dir) {
            tracing::debug!(root = %clone_dir.display(), "using cached registry clone");
            return Ok(clone_dir);
        }

        let remote = options.remote.as_deref().unwrap_or(DEFAULT_REMOTE);
        tracing::info!(remote = %remote, dest = %clone_dir.display(), "cloning registry");
        shallow_clone(remote, &clone_dir).await?;

        if has_registry_layout(&clone_dir) {
            return Ok(clone_dir);
        }
        candidates.push(clone_dir);
    }

    Err(SourceError::RootNotFound { candidates }.into())
}

fn user_clone_dir() -> Option<PathBuf> {
    dirs::cache_dir().map(|dir| dir.join("regidx").join("registry"))
}

async fn shallow_clone(remote: &str, dest: &Path) -> Result<()> {
    if let Some(parent) = dest.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }

    let status = tokio::process::Command::new("git")
        .args(["clone", "--depth", "1"])
        .arg(remote)
        .arg(dest)
        .status()
        .await
        .context("failed to execute git")?;

    if !status.success() {
        anyhow::bail!("git clone of {} failed with {}", remote, status);
    }

    Ok(())
}

/// Builds a snapshot from an already-located registry root.
///
/// `generated_at` is injected so rebuilds under a frozen clock are
/// byte-identical; the CLI passes the current UTC time.
pub async fn build_from_root(root: &Path, generated_at: String) -> Result<BuildOutcome> {
    let meta_path = root.join(METADATA_FILE);
    let meta_raw =
        tokio::fs::read_to_string(&meta_path)
            .await
            .map_err(|err| SourceError::MetadataUnreadable {
                path: meta_path.clone(),
                error: err.to_string(),
            })?;
    let registry_meta: RegistryMetaFile =
        serde_json::from_str(&meta_raw).map_err(|err| SourceError::MetadataUnreadable {
            path: meta_path,
            error: err.to_string(),
        })?;

    let (mut entries, skipped) = read_descriptors(&root.join(INDEX_DIR)).await?;

    // Deterministic ordering for diff-stable, byte-identical rebuilds.
    entries.sort_by_key(|entry| entry.id().to_lowercase());

    let accepted = entries.len();
    let meta = SnapshotMeta {
        registry_id: non_empty_or(registry_meta.id, DEFAULT_REGISTRY_ID),
        spec_version: non_empty_or(registry_meta.spec_version, DEFAULT_SPEC_VERSION),
        generated_at,
        source_repo: registry_meta.homepage,
        index_format: non_empty_or(registry_meta.index.format, DEFAULT_INDEX_FORMAT),
        entry_count: accepted,
    };

    tracing::info!(accepted, skipped, "registry index built");

    Ok(BuildOutcome {
        snapshot: Snapshot::new(meta, entries),
        accepted,
        skipped,
    })
}

/// Convenience wrapper: locate the root, then build.
pub async fn build(options: &BuildOptions, generated_at: String) -> Result<BuildOutcome> {
    let root = locate_registry_root(options).await?;
    build_from_root(&root, generated_at).await
}

/// Serializes the snapshot to its output file (compact JSON, parents created).
pub async fn write_snapshot(snapshot: &Snapshot, out: &Path) -> Result<()> {
    if let Some(parent) = out.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }

    let content =
        serde_json::to_string(snapshot).context("failed to serialize snapshot")?;
    tokio::fs::write(out, content)
        .await
        .with_context(|| format!("failed to write snapshot to {}", out.display()))?;

    Ok(())
}

async fn read_descriptors(index_dir: &Path) -> Result<(Vec<PackageDescriptor>, usize)> {
    let mut dir = tokio::fs::read_dir(index_dir)
        .await
        .with_context(|| format!("failed to read index directory {}", index_dir.display()))?;

    let mut files = Vec::new();
    while let Some(entry) = dir.next_entry().await.context("failed to scan index directory")? {
        let path = entry.path();
        if path.extension().and_then(|ext| ext.to_str()) == Some("json") {
            files.push(path);
        }
    }
    // Directory iteration order is platform-dependent.
    files.sort();

    let mut entries: Vec<PackageDescriptor> = Vec::with_capacity(files.len());
    let mut seen: HashSet<String> = HashSet::new();
    let mut skipped = 0usize;

    for path in files {
        match read_descriptor(&path).await {
            Some(mut descriptor) => {
                if !seen.insert(descriptor.id()) {
                    tracing::warn!(file = %path.display(), id = %descriptor.id(), "duplicate package id, skipping");
                    skipped += 1;
                    continue;
                }

                descriptor.latest = compute_latest_version(
                    descriptor
                        .versions
                        .iter()
                        .map(|(version, record)| (version.as_str(), record.yanked)),
                )
                .unwrap_or_default();

                entries.push(descriptor);
            }
            None => {
                tracing::warn!(file = %path.display(), "malformed descriptor, skipping");
                skipped += 1;
            }
        }
    }

    Ok((entries, skipped))
}

/// One descriptor file; any read or shape problem yields `None`.
async fn read_descriptor(path: &Path) -> Option<PackageDescriptor> {
    let content = tokio::fs::read_to_string(path).await.ok()?;
    let value: serde_json::Value = serde_json::from_str(&content).ok()?;
    PackageDescriptor::from_value(&value)
}

fn non_empty_or(value: String, fallback: &str) -> String {
    if value.is_empty() {
        fallback.to_string()
    } else {
        value
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert2::check;
    use tempfile::TempDir;

    #[test]
    fn layout_check_requires_metadata_and_index() {
        let dir = TempDir::new().unwrap();
        check!(!has_registry_layout(dir.path()));

        std::fs::write(dir.path().join(METADATA_FILE), "{}").unwrap();
        check!(!has_registry_layout(dir.path()));

        std::fs::create_dir(dir.path().join(INDEX_DIR)).unwrap();
        check!(has_registry_layout(dir.path()));
    }

    #[tokio::test]
    async fn explicit_root_without_layout_is_fatal() {
        let dir = TempDir::new().unwrap();
        let options = BuildOptions {
            root: Some(dir.path().to_path_buf()),
            remote: None,
        };

        let result = locate_registry_root(&options).await;
        check!(result.is_err());
        let message = format!("{:#}", result.unwrap_err());
        check!(message.contains("registry root not found"));
    }

    #[tokio::test]
    async fn missing_metadata_file_is_fatal() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir(dir.path().join(INDEX_DIR)).unwrap();

        let result = build_from_root(dir.path(), "2026-01-01T00:00:00Z".to_string()).await;
        check!(result.is_err());
    }
}
