//! Read-only audit of the image tree.
//!
//! Checks, per file:
//!
//! | Applies to | Check | Severity |
//! |---|---|---|
//! | `.jpg` `.jpeg` `.png` | `<stem>.webp` sibling exists | error |
//! | `.jpg` `.jpeg` `.png` | `<stem>.avif` sibling exists | error |
//! | `.jpg` `.jpeg` `.png` | size within `source_warn_bytes` | warning |
//! | every image | probe succeeds | error |
//! | every image | format recognized from contents | error |
//! | every image | width and height at least 1 | error |
//! | every image | width and height within `max_dimension` | warning |
//!
//! Nothing on disk is modified.

use crate::config::ImagesConfig;
use crate::imaging::{ImageCodec, ImageKind};
use crate::output::format_bytes;
use crate::types::{Issue, Stats, ValidationResult};
use crate::walk::{IMAGE_EXTENSIONS, collect_files, display_path};
use serde::Serialize;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ImagesError {
    #[error("Image directory not found: {0}")]
    RootNotFound(std::path::PathBuf),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ImageStats {
    pub total_images: usize,
    pub source_images: usize,
    pub total_bytes: u64,
}

impl Stats for ImageStats {
    fn summary(&self) -> Vec<String> {
        vec![
            format!(
                "Images: {} ({} source originals)",
                self.total_images, self.source_images
            ),
            format!("Total size: {}", format_bytes(self.total_bytes)),
        ]
    }
}

pub const REMEDIATION: &[&str] = &[
    "Generate missing variants and re-compress originals:",
    "    site-assets optimize-images",
    "Resize anything wider than 4K before committing it.",
];

/// Validate every image under `root`.
pub fn validate_images(
    root: &Path,
    codec: &impl ImageCodec,
    config: &ImagesConfig,
) -> Result<ValidationResult<ImageStats>, ImagesError> {
    if !root.is_dir() {
        return Err(ImagesError::RootNotFound(root.to_path_buf()));
    }

    let mut result = ValidationResult::<ImageStats>::default();
    for path in collect_files(root, IMAGE_EXTENSIONS) {
        let rel = display_path(&path, root);
        let size = std::fs::metadata(&path).map(|m| m.len()).unwrap_or(0);
        result.stats.total_images += 1;
        result.stats.total_bytes += size;

        if ImageKind::from_path(&path).is_some_and(ImageKind::is_source) {
            result.stats.source_images += 1;
            check_source(&path, &rel, size, config, &mut result);
        }
        check_metadata(&path, &rel, codec, config, &mut result);
    }
    tracing::debug!(
        "validated {} images under {}",
        result.stats.total_images,
        root.display()
    );
    Ok(result)
}

fn check_source(
    path: &Path,
    rel: &str,
    size: u64,
    config: &ImagesConfig,
    result: &mut ValidationResult<ImageStats>,
) {
    for kind in [ImageKind::WebP, ImageKind::Avif] {
        let sibling = path.with_extension(kind.extension());
        if !sibling.exists() {
            let name = sibling
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            result.push(Issue::error(
                rel,
                format!("Missing {} variant: {name}", kind.label()),
            ));
        }
    }
    if size > config.source_warn_bytes {
        result.push(Issue::warning(
            rel,
            format!(
                "Large source image: {} (recommended under {})",
                format_bytes(size),
                format_bytes(config.source_warn_bytes)
            ),
        ));
    }
}

fn check_metadata(
    path: &Path,
    rel: &str,
    codec: &impl ImageCodec,
    config: &ImagesConfig,
    result: &mut ValidationResult<ImageStats>,
) {
    let info = match codec.probe(path) {
        Ok(info) => info,
        Err(e) => {
            result.push(Issue::error(
                rel,
                format!("Failed to read image metadata: {e}"),
            ));
            return;
        }
    };
    if info.format.is_none() {
        result.push(Issue::error(
            rel,
            "Unable to determine image format (file may be corrupted)",
        ));
        return;
    }
    if info.width < 1 || info.height < 1 {
        result.push(Issue::error(
            rel,
            format!("Invalid dimensions: {}x{}", info.width, info.height),
        ));
    }
    let max = config.max_dimension;
    if info.width > max || info.height > max {
        result.push(Issue::warning(
            rel,
            format!(
                "Image exceeds {max}px: {}x{} (consider resizing)",
                info.width, info.height
            ),
        ));
    }
}
