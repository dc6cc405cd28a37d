//! Image codec trait and shared types.
//!
//! The [`ImageCodec`] trait defines the two operations the pipeline needs:
//! probe (format + dimensions) and encode. Callers receive the codec as an
//! argument rather than reaching for a global, so tests can swap in the
//! recording [`MockCodec`](tests::MockCodec).
//!
//! The production implementation is
//! [`RustCodec`](super::rust_backend::RustCodec), statically
//! linked.

use super::params::{EncodeParams, ImageKind, Quality};
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BackendError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Processing failed: {0}")]
    ProcessingFailed(String),
    #[error("Unsupported operation: {0}")]
    Unsupported(String),
}

/// Result of a probe operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageInfo {
    pub width: u32,
    pub height: u32,
    /// Format sniffed from the file contents. `None` when the signature is
    /// not one we recognize, which usually means a corrupt or mislabeled file.
    pub format: Option<ImageKind>,
}

/// Trait for image codecs.
pub trait ImageCodec {
    /// Read format and dimensions without a full decode where possible.
    fn probe(&self, path: &Path) -> Result<ImageInfo, BackendError>;

    /// Quality a lossy file was last encoded at, when the format records it.
    fn estimate_quality(&self, _path: &Path) -> Option<Quality> {
        None
    }

    /// Decode `params.source` and write it re-encoded to `params.output`.
    ///
    /// On failure no partial output is left behind.
    fn encode(&self, params: &EncodeParams) -> Result<(), BackendError>;
}
