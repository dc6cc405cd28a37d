//! Directory enumeration shared by the batch validators.
//!
//! Every component walks a tree the same way: recursively, skipping
//! dot-prefixed entries (and whole dot-prefixed directories), keeping regular
//! files whose extension is in an allow-list, sorted by path so reports are
//! deterministic. Unreadable entries are logged and skipped; only a missing
//! root is the caller's problem.
//!
//! Source-tree scans ([`collect_sources`]) additionally prune dependency and
//! build-output directories. Image trees ([`collect_files`]) do not: an
//! `images/build/` folder holds real assets.

use std::path::{Path, PathBuf};
use walkdir::{DirEntry, WalkDir};

/// Image extensions the pipeline touches.
pub const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "webp", "gif", "tiff", "avif"];

/// Directories never worth descending into when scanning source trees.
const IGNORED_DIRS: &[&str] = &["node_modules", "target", "dist", "build"];

fn is_hidden(entry: &DirEntry) -> bool {
    entry.depth() > 0
        && entry
            .file_name()
            .to_str()
            .is_some_and(|name| name.starts_with('.'))
}

fn is_ignored_dir(entry: &DirEntry) -> bool {
    entry.file_type().is_dir()
        && entry
            .file_name()
            .to_str()
            .is_some_and(|name| IGNORED_DIRS.contains(&name))
}

/// Lowercased extension of a path, if it has a UTF-8 one.
pub fn extension_lower(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
}

fn has_extension(path: &Path, extensions: &[&str]) -> bool {
    extension_lower(path).is_some_and(|ext| extensions.contains(&ext.as_str()))
}

/// Recursively collect files under `root` whose extension is in `extensions`.
pub fn collect_files(root: &Path, extensions: &[&str]) -> Vec<PathBuf> {
    walk(root, extensions, false)
}

/// Like [`collect_files`], but also prunes `node_modules`, `target`, `dist`
/// and `build` directories.
pub fn collect_sources(root: &Path, extensions: &[&str]) -> Vec<PathBuf> {
    walk(root, extensions, true)
}

fn walk(root: &Path, extensions: &[&str], prune_ignored: bool) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = WalkDir::new(root)
        .into_iter()
        .filter_entry(|e| !is_hidden(e) && !(prune_ignored && is_ignored_dir(e)))
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry),
            Err(err) => {
                tracing::warn!("skipping unreadable entry: {err}");
                None
            }
        })
        .filter(|e| e.file_type().is_file())
        .map(|e| e.into_path())
        .filter(|p| has_extension(p, extensions))
        .collect();
    files.sort();
    files
}

/// Render `path` relative to `base` with forward slashes, for reports.
///
/// Falls back to the full path when `path` is not under `base`.
pub fn display_path(path: &Path, base: &Path) -> String {
    match path.strip_prefix(base) {
        Ok(rel) => rel
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/"),
        Err(_) => path.to_string_lossy().into_owned(),
    }
}
