//! Parameter types for codec operations.
//!
//! These structs describe *what* to encode, not *how*. The optimizer decides
//! which files to produce; the [`codec`](super::backend) does the pixel work.
//!
//! - [`Quality`]: lossy quality (1–100). Clamped on construction.
//! - [`ImageKind`]: the formats the pipeline understands, keyed by extension.
//! - [`QualityPresets`]: quality for the lossy formats (JPEG, WebP, AVIF).
//! - [`EncodeParams`]: full specification for one encode.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Quality setting for lossy image encoding (1-100).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Quality(u32);

impl Quality {
    /// Passed to lossless encoders (PNG, TIFF), which ignore it.
    pub const MAX: Quality = Quality(100);

    pub fn new(value: u32) -> Self {
        Self(value.clamp(1, 100))
    }

    pub fn value(self) -> u32 {
        self.0
    }
}

impl Default for Quality {
    fn default() -> Self {
        Self(78)
    }
}

/// Image formats handled by the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageKind {
    Jpeg,
    Png,
    WebP,
    Avif,
    Gif,
    Tiff,
}

impl ImageKind {
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "jpg" | "jpeg" => Some(Self::Jpeg),
            "png" => Some(Self::Png),
            "webp" => Some(Self::WebP),
            "avif" => Some(Self::Avif),
            "gif" => Some(Self::Gif),
            "tif" | "tiff" => Some(Self::Tiff),
            _ => None,
        }
    }

    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|e| e.to_str())
            .and_then(Self::from_extension)
    }

    /// Canonical extension used when naming sibling files.
    pub fn extension(self) -> &'static str {
        match self {
            Self::Jpeg => "jpg",
            Self::Png => "png",
            Self::WebP => "webp",
            Self::Avif => "avif",
            Self::Gif => "gif",
            Self::Tiff => "tiff",
        }
    }

    /// Raster originals that must ship with `.webp` and `.avif` siblings.
    pub fn is_source(self) -> bool {
        matches!(self, Self::Jpeg | Self::Png)
    }

    /// Formats encoded with a quality trade-off; re-encoding them loses detail.
    pub fn is_lossy(self) -> bool {
        matches!(self, Self::Jpeg | Self::WebP | Self::Avif)
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Jpeg => "JPEG",
            Self::Png => "PNG",
            Self::WebP => "WebP",
            Self::Avif => "AVIF",
            Self::Gif => "GIF",
            Self::Tiff => "TIFF",
        }
    }
}

/// Encode quality for the lossy formats.
///
/// PNG and TIFF are re-encoded losslessly (best compression), so they have
/// no entry. GIF has none either: it is never re-encoded, to keep animations
/// intact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct QualityPresets {
    pub jpeg: Quality,
    pub webp: Quality,
    pub avif: Quality,
}

impl Default for QualityPresets {
    fn default() -> Self {
        Self {
            jpeg: Quality::new(78),
            webp: Quality::new(78),
            avif: Quality::new(50),
        }
    }
}

impl QualityPresets {
    /// Quality to encode `kind` with; `None` for GIF.
    pub fn for_kind(&self, kind: ImageKind) -> Option<Quality> {
        match kind {
            ImageKind::Jpeg => Some(self.jpeg),
            ImageKind::WebP => Some(self.webp),
            ImageKind::Avif => Some(self.avif),
            ImageKind::Png | ImageKind::Tiff => Some(Quality::MAX),
            ImageKind::Gif => None,
        }
    }
}

/// Decode `source`, encode it as `format` at `quality`, write to `output`.
#[derive(Debug, Clone, PartialEq)]
pub struct EncodeParams {
    pub source: PathBuf,
    pub output: PathBuf,
    pub format: ImageKind,
    pub quality: Quality,
}
