//! Statically linked codec: the `image` crate ecosystem plus vendored libwebp.
//!
//! ## Crate mapping
//!
//! | Operation | Crate / function |
//! |---|---|
//! | Sniff format | `image::guess_format` + AVIF `ftyp` brand check |
//! | Dimensions (JPEG, PNG, TIFF, WebP, GIF) | `image::ImageReader::into_dimensions` |
//! | Dimensions (AVIF) | `avif-parse` container metadata |
//! | Decode (AVIF) | `avif-parse` + `rav1d`, see [`avif`](super::avif) |
//! | Encode → JPEG | `JpegEncoder::new_with_quality` |
//! | Encode → PNG | `PngEncoder` with best compression + adaptive filtering |
//! | Encode → WebP | `webp::Encoder` (lossy, libwebp) |
//! | Encode → AVIF | `AvifEncoder` (rav1e, speed 6) |
//! | Encode → TIFF | `TiffEncoder` |
//! | Estimate JPEG quality | luminance table match, see [`jpeg`](super::jpeg) |
//!
//! PNG and TIFF are written losslessly and ignore the quality value. GIF is
//! never encoded.

use super::avif;
use super::backend::{BackendError, ImageCodec, ImageInfo};
use super::jpeg;
use super::params::{EncodeParams, ImageKind, Quality};
use image::codecs::avif::AvifEncoder;
use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::{CompressionType, FilterType, PngEncoder};
use image::codecs::tiff::TiffEncoder;
use image::{DynamicImage, ImageFormat, ImageReader};
use std::fs::File;
use std::io::{BufWriter, Cursor, Write};
use std::path::Path;

/// Codec built on the `image` crate ecosystem, with libwebp for WebP output.
///
/// See the [module docs](self) for the crate-to-operation mapping.
#[derive(Debug, Default, Clone, Copy)]
pub struct RustCodec;

impl RustCodec {
    pub fn new() -> Self {
        Self
    }
}

fn kind_of(format: ImageFormat) -> Option<ImageKind> {
    match format {
        ImageFormat::Jpeg => Some(ImageKind::Jpeg),
        ImageFormat::Png => Some(ImageKind::Png),
        ImageFormat::WebP => Some(ImageKind::WebP),
        ImageFormat::Avif => Some(ImageKind::Avif),
        ImageFormat::Gif => Some(ImageKind::Gif),
        ImageFormat::Tiff => Some(ImageKind::Tiff),
        _ => None,
    }
}

fn image_format(kind: ImageKind) -> ImageFormat {
    match kind {
        ImageKind::Jpeg => ImageFormat::Jpeg,
        ImageKind::Png => ImageFormat::Png,
        ImageKind::WebP => ImageFormat::WebP,
        ImageKind::Avif => ImageFormat::Avif,
        ImageKind::Gif => ImageFormat::Gif,
        ImageKind::Tiff => ImageFormat::Tiff,
    }
}

/// Identify the format from magic bytes, never from the extension.
fn sniff(bytes: &[u8]) -> Option<ImageKind> {
    if avif::has_avif_signature(bytes) {
        return Some(ImageKind::Avif);
    }
    image::guess_format(bytes).ok().and_then(kind_of)
}

fn decode(path: &Path) -> Result<DynamicImage, BackendError> {
    let bytes = std::fs::read(path)?;
    match sniff(&bytes) {
        Some(ImageKind::Avif) => avif::decode(&bytes),
        Some(kind) => ImageReader::with_format(Cursor::new(&bytes), image_format(kind))
            .decode()
            .map_err(|e| {
                BackendError::ProcessingFailed(format!("Failed to decode {}: {e}", path.display()))
            }),
        None => Err(BackendError::ProcessingFailed(format!(
            "Unrecognized image format: {}",
            path.display()
        ))),
    }
}

/// Drop 16-bit and float channels; lossy encoders here take 8-bit input.
fn to_eight_bit(img: &DynamicImage) -> DynamicImage {
    if img.color().has_alpha() {
        DynamicImage::ImageRgba8(img.to_rgba8())
    } else {
        DynamicImage::ImageRgb8(img.to_rgb8())
    }
}

/// Lossy WebP through libwebp.
fn write_webp(
    img: &DynamicImage,
    mut writer: impl Write,
    quality: Quality,
) -> Result<(), BackendError> {
    let img = to_eight_bit(img);
    let encoder = webp::Encoder::from_image(&img)
        .map_err(|e| BackendError::ProcessingFailed(format!("WebP encode failed: {e}")))?;
    let encoded = encoder.encode(quality.value() as f32);
    writer.write_all(&encoded)?;
    writer.flush()?;
    Ok(())
}

fn write(img: &DynamicImage, params: &EncodeParams) -> Result<(), BackendError> {
    let writer = BufWriter::new(File::create(&params.output)?);
    let quality = params.quality.value() as u8;
    let encoded = match params.format {
        ImageKind::Jpeg => DynamicImage::ImageRgb8(img.to_rgb8())
            .write_with_encoder(JpegEncoder::new_with_quality(writer, quality)),
        ImageKind::Png => img.write_with_encoder(PngEncoder::new_with_quality(
            writer,
            CompressionType::Best,
            FilterType::Adaptive,
        )),
        ImageKind::WebP => return write_webp(img, writer, params.quality),
        ImageKind::Avif => to_eight_bit(img)
            .write_with_encoder(AvifEncoder::new_with_speed_quality(writer, 6, quality)),
        ImageKind::Tiff => to_eight_bit(img).write_with_encoder(TiffEncoder::new(writer)),
        ImageKind::Gif => {
            return Err(BackendError::Unsupported(
                "GIF re-encoding would drop animation frames".into(),
            ));
        }
    };
    encoded.map_err(|e| {
        BackendError::ProcessingFailed(format!("{} encode failed: {e}", params.format.label()))
    })
}

impl ImageCodec for RustCodec {
    fn probe(&self, path: &Path) -> Result<ImageInfo, BackendError> {
        let bytes = std::fs::read(path)?;
        let Some(kind) = sniff(&bytes) else {
            return Ok(ImageInfo {
                width: 0,
                height: 0,
                format: None,
            });
        };
        let (width, height) = match kind {
            ImageKind::Avif => avif::dimensions(&bytes)?,
            _ => ImageReader::with_format(Cursor::new(&bytes), image_format(kind))
                .into_dimensions()
                .map_err(|e| {
                    BackendError::ProcessingFailed(format!("Failed to read dimensions: {e}"))
                })?,
        };
        Ok(ImageInfo {
            width,
            height,
            format: Some(kind),
        })
    }

    fn estimate_quality(&self, path: &Path) -> Option<Quality> {
        let bytes = std::fs::read(path).ok()?;
        if sniff(&bytes) != Some(ImageKind::Jpeg) {
            return None;
        }
        jpeg::estimate_quality(&bytes).map(Quality::new)
    }

    fn encode(&self, params: &EncodeParams) -> Result<(), BackendError> {
        if params.format == ImageKind::Gif {
            return Err(BackendError::Unsupported(
                "GIF re-encoding would drop animation frames".into(),
            ));
        }
        let img = decode(&params.source)?;
        let result = write(&img, params);
        if result.is_err() {
            let _ = std::fs::remove_file(&params.output);
        }
        result
    }
}
