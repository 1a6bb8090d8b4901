//! Repository scanning
//!
//! Walks the tree rooted at `repo_root/subdir`, skipping well-known
//! noise directories, and collects every `.go` file with its size and
//! mtime. Output is sorted by relative path so downstream stages are
//! deterministic; an optional cap keeps the first `k` entries post-sort.

use std::path::{Component, Path};
use std::time::UNIX_EPOCH;

use anyhow::{bail, Context, Result};
use ignore::WalkBuilder;
use tracing::debug;

use crate::cancel::Cancellation;
use crate::types::FileMeta;

/// Directories never descended into, regardless of location.
const SKIP_DIRS: &[&str] = &[".git", "vendor", "node_modules", "bin", ".tmp", "tmp", ".cache"];

/// Collect `.go` files under `repo_root/subdir`, relative to `repo_root`.
pub fn collect_go_files(
    repo_root: &Path,
    subdir: &str,
    max_files: usize,
    cancel: &Cancellation,
) -> Result<Vec<FileMeta>> {
    let scan_root = if subdir.is_empty() {
        repo_root.to_path_buf()
    } else {
        repo_root.join(subdir)
    };

    let mut walker = WalkBuilder::new(&scan_root);
    walker.standard_filters(false).filter_entry(|entry| {
        if entry.file_type().map_or(false, |t| t.is_dir()) {
            let name = entry.file_name().to_string_lossy();
            return !SKIP_DIRS.contains(&name.as_ref());
        }
        true
    });

    let mut files = Vec::new();
    for result in walker.build() {
        cancel.check()?;
        let entry = result.context("walk repo")?;
        let file_type = entry.file_type();
        if !file_type.map_or(false, |t| t.is_file()) {
            continue;
        }
        if !entry.file_name().to_string_lossy().ends_with(".go") {
            continue;
        }

        let path = entry.path();
        let meta = entry
            .metadata()
            .with_context(|| format!("stat {}", path.display()))?;
        let mod_unix_nano = meta
            .modified()
            .ok()
            .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
            .map(|d| d.as_nanos().min(i64::MAX as u128) as i64)
            .unwrap_or(0);

        files.push(FileMeta {
            rel_path: rel_path_slash(repo_root, path),
            size: meta.len(),
            mod_unix_nano,
        });
    }

    files.sort_by(|a, b| a.rel_path.cmp(&b.rel_path));
    if max_files > 0 && files.len() > max_files {
        files.truncate(max_files);
    }
    debug!("scan found {} .go files", files.len());
    Ok(files)
}

/// Reject a subdirectory that lexically resolves outside the repo
/// root. A leading separator does not count; the subdir is always
/// joined under the root, so only `..` components can escape.
pub fn validate_subdir(subdir: &str) -> Result<()> {
    let mut depth: i64 = 0;
    for comp in Path::new(subdir).components() {
        match comp {
            Component::CurDir | Component::RootDir | Component::Prefix(_) => {}
            Component::Normal(_) => depth += 1,
            Component::ParentDir => {
                depth -= 1;
                if depth < 0 {
                    bail!("subdir {:?} escapes repo root", subdir);
                }
            }
        }
    }
    Ok(())
}

fn rel_path_slash(repo_root: &Path, path: &Path) -> String {
    let rel = path.strip_prefix(repo_root).unwrap_or(path);
    rel.components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}
