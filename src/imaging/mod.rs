//! Image codec capability: statically linked, no system dependencies.
//!
//! | Operation | Crate / function |
//! |---|---|
//! | **Probe** | `image::guess_format` + `ImageReader::into_dimensions`, `avif-parse` |
//! | **Encode** | `image` crate encoders (JPEG, PNG, TIFF, AVIF via rav1e), `webp` for lossy WebP |
//! | **JPEG quality** | luminance quantization table vs the IJG scale |
//! | **AVIF decode** | `avif-parse` + `rav1d` |
//!
//! The module is split into:
//! - **Parameters**: what to encode ([`EncodeParams`], [`ImageKind`], [`Quality`])
//! - **Backend**: the [`ImageCodec`] trait that the optimizer and validator take
//! - **RustCodec**: the production implementation

mod avif;
pub mod backend;
mod jpeg;
mod params;
pub mod rust_backend;

pub use backend::{BackendError, ImageCodec, ImageInfo};
pub use params::{EncodeParams, ImageKind, Quality, QualityPresets};
pub use rust_backend::RustCodec;
