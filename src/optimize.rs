//! Image optimization: shrink originals in place and fill in modern variants.
//!
//! For every image under the root, in path order:
//!
//! 1. **Re-compress** the file with its format's quality preset, into a hidden
//!    temp sibling (`.<name>.optimizing`). The result replaces the original only
//!    when it is *strictly* smaller; otherwise the temp file is deleted. For
//!    lossy formats it must also save at least [`MIN_LOSSY_SAVING_PERCENT`].
//!    Never re-compressed:
//!    - files under the tiny threshold
//!    - GIFs (re-encoding would flatten animation)
//!    - `.webp`/`.avif` files next to a `.jpg`/`.jpeg`/`.png` of the same
//!      stem: they are this pipeline's own variants
//!    - JPEGs whose quantization tables show a quality at or below the preset
//! 2. **Variants**: write `<stem>.webp` and `<stem>.avif` next to the file if
//!    they do not exist yet.
//!
//! Files are handled one at a time so at most one decoded image is in memory.
//! An encode failure is logged and recorded for that file; the run moves on.
//!
//! The skip rules keep lossy files from losing a little more detail on every
//! run: a second run over an optimized tree changes nothing.
//!
//! Progress is reported through an optional channel of [`OptimizeEvent`]s so
//! the caller decides how (and whether) to print it.

use crate::config::ImagesConfig;
use crate::imaging::{BackendError, EncodeParams, ImageCodec, ImageKind, Quality};
use crate::walk::{IMAGE_EXTENSIONS, collect_files, display_path, extension_lower};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::mpsc::Sender;
use thiserror::Error;

/// Smallest saving, in percent of the original, that justifies replacing a
/// lossy file with a re-encode of itself.
pub const MIN_LOSSY_SAVING_PERCENT: u64 = 2;

#[derive(Error, Debug)]
pub enum OptimizeError {
    #[error("Image directory not found: {0}")]
    RootNotFound(PathBuf),
}

/// What happened to the original file.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SourceOutcome {
    /// Under the tiny-file threshold; left untouched.
    TooSmall { size: u64 },
    /// GIF; left untouched.
    Animated,
    /// A `.webp`/`.avif` generated from a sibling original; left untouched.
    Variant,
    /// Lossy original already encoded at or below the preset quality.
    AlreadyOptimized { quality: u32 },
    /// Re-encoded and replaced.
    Reduced { before: u64, after: u64 },
    /// Re-encode did not save enough; original kept.
    NotSmaller { before: u64, after: u64 },
    Failed { reason: String },
}

/// What happened to one `.webp` / `.avif` sibling.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum VariantOutcome {
    Existing,
    Created { size: u64 },
    Failed { reason: String },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VariantReport {
    pub format: ImageKind,
    pub outcome: VariantOutcome,
}

/// Progress events emitted while optimizing.
#[derive(Debug, Clone)]
pub enum OptimizeEvent {
    Started { total: usize },
    FileDone(FileReport),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FileReport {
    /// 1-based position in the run.
    pub index: usize,
    /// Path relative to the root.
    pub path: String,
    pub source: SourceOutcome,
    pub variants: Vec<VariantReport>,
}

/// Totals for the closing summary line.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct OptimizeSummary {
    pub files: usize,
    pub reduced: usize,
    pub bytes_saved: u64,
    pub variants_created: usize,
    pub failures: usize,
}

impl OptimizeSummary {
    fn record(&mut self, report: &FileReport) {
        self.files += 1;
        match &report.source {
            SourceOutcome::Reduced { before, after } => {
                self.reduced += 1;
                self.bytes_saved += before - after;
            }
            SourceOutcome::Failed { .. } => self.failures += 1,
            _ => {}
        }
        for variant in &report.variants {
            match variant.outcome {
                VariantOutcome::Created { .. } => self.variants_created += 1,
                VariantOutcome::Failed { .. } => self.failures += 1,
                VariantOutcome::Existing => {}
            }
        }
    }
}

/// Optimize every image under `root`.
///
/// Fails only when `root` does not exist; per-file problems end up in the
/// returned summary's `failures` count and in `warn!` logs.
pub fn optimize(
    root: &Path,
    codec: &impl ImageCodec,
    config: &ImagesConfig,
    events: Option<Sender<OptimizeEvent>>,
) -> Result<OptimizeSummary, OptimizeError> {
    if !root.is_dir() {
        return Err(OptimizeError::RootNotFound(root.to_path_buf()));
    }

    let files = collect_files(root, IMAGE_EXTENSIONS);
    tracing::debug!("optimizing {} files under {}", files.len(), root.display());
    if let Some(tx) = &events {
        tx.send(OptimizeEvent::Started { total: files.len() }).ok();
    }

    let mut summary = OptimizeSummary::default();
    for (i, path) in files.iter().enumerate() {
        let report = optimize_file(i + 1, path, root, codec, config);
        summary.record(&report);
        if let Some(tx) = &events {
            tx.send(OptimizeEvent::FileDone(report)).ok();
        }
    }
    Ok(summary)
}

fn optimize_file(
    index: usize,
    path: &Path,
    root: &Path,
    codec: &impl ImageCodec,
    config: &ImagesConfig,
) -> FileReport {
    let rel = display_path(path, root);
    let source = match ImageKind::from_path(path) {
        Some(kind) => recompress(path, kind, codec, config),
        None => SourceOutcome::Failed {
            reason: "unrecognized extension".into(),
        },
    };
    if let SourceOutcome::Failed { reason } = &source {
        tracing::warn!("{rel}: re-compression failed: {reason}");
    }

    let mut variants = Vec::with_capacity(2);
    for (format, quality) in [
        (ImageKind::WebP, config.quality.webp),
        (ImageKind::Avif, config.quality.avif),
    ] {
        let outcome = ensure_variant(path, format, quality, codec);
        if let VariantOutcome::Failed { reason } = &outcome {
            tracing::warn!("{rel}: {} variant failed: {reason}", format.label());
        }
        variants.push(VariantReport { format, outcome });
    }

    FileReport {
        index,
        path: rel,
        source,
        variants,
    }
}

/// A `.webp`/`.avif` whose stem is shared with a source original.
fn is_generated_variant(path: &Path, kind: ImageKind) -> bool {
    if !matches!(kind, ImageKind::WebP | ImageKind::Avif) {
        return false;
    }
    let (Some(dir), Some(stem)) = (path.parent(), path.file_stem()) else {
        return false;
    };
    let Ok(entries) = std::fs::read_dir(dir) else {
        return false;
    };
    entries.filter_map(Result::ok).any(|entry| {
        let sibling = entry.path();
        sibling.file_stem() == Some(stem)
            && extension_lower(&sibling)
                .and_then(|ext| ImageKind::from_extension(&ext))
                .is_some_and(ImageKind::is_source)
    })
}

/// True when `after` is small enough to replace a `before`-byte original.
fn saves_enough(kind: ImageKind, before: u64, after: u64) -> bool {
    if kind.is_lossy() {
        after * 100 <= before * (100 - MIN_LOSSY_SAVING_PERCENT)
    } else {
        after < before
    }
}

/// Hidden sibling used as the encode target, e.g. `.hero.png.optimizing`.
fn temp_path(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    path.with_file_name(format!(".{name}.optimizing"))
}

fn recompress(
    path: &Path,
    kind: ImageKind,
    codec: &impl ImageCodec,
    config: &ImagesConfig,
) -> SourceOutcome {
    let before = match std::fs::metadata(path) {
        Ok(meta) => meta.len(),
        Err(e) => {
            return SourceOutcome::Failed {
                reason: e.to_string(),
            };
        }
    };
    if before < config.tiny_file_bytes {
        return SourceOutcome::TooSmall { size: before };
    }
    let Some(quality) = config.quality.for_kind(kind) else {
        return SourceOutcome::Animated;
    };
    if is_generated_variant(path, kind) {
        return SourceOutcome::Variant;
    }
    let current = codec.estimate_quality(path);
    if let Some(current) = current.filter(|q| q.value() <= quality.value()) {
        return SourceOutcome::AlreadyOptimized {
            quality: current.value(),
        };
    }

    let temp = temp_path(path);
    match replace_if_smaller(path, &temp, kind, quality, before, codec) {
        Ok(outcome) => outcome,
        Err(e) => {
            let _ = std::fs::remove_file(&temp);
            SourceOutcome::Failed {
                reason: e.to_string(),
            }
        }
    }
}

fn replace_if_smaller(
    path: &Path,
    temp: &Path,
    kind: ImageKind,
    quality: Quality,
    before: u64,
    codec: &impl ImageCodec,
) -> Result<SourceOutcome, BackendError> {
    codec.encode(&EncodeParams {
        source: path.to_path_buf(),
        output: temp.to_path_buf(),
        format: kind,
        quality,
    })?;
    let after = std::fs::metadata(temp)?.len();
    if after < before && saves_enough(kind, before, after) {
        std::fs::rename(temp, path)?;
        Ok(SourceOutcome::Reduced { before, after })
    } else {
        std::fs::remove_file(temp)?;
        Ok(SourceOutcome::NotSmaller { before, after })
    }
}

fn ensure_variant(
    path: &Path,
    format: ImageKind,
    quality: Quality,
    codec: &impl ImageCodec,
) -> VariantOutcome {
    let output = path.with_extension(format.extension());
    if output.exists() {
        return VariantOutcome::Existing;
    }
    let result = codec
        .encode(&EncodeParams {
            source: path.to_path_buf(),
            output: output.clone(),
            format,
            quality,
        })
        .and_then(|()| Ok(std::fs::metadata(&output)?.len()));
    match result {
        Ok(size) => VariantOutcome::Created { size },
        Err(e) => VariantOutcome::Failed {
            reason: e.to_string(),
        },
    }
}
