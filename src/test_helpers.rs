//! Shared test utilities for the site-assets test suite.
//!
//! Fixture writers build small on-disk project trees inside a `TempDir`;
//! the lookup helpers find issues by message fragment and panic with the full
//! list on a miss, so a failing assertion shows what *was* reported.
//!
//! # Usage
//!
//! ```rust
//! use crate::test_helpers::*;
//!
//! let tmp = TempDir::new().unwrap();
//! write_png(&tmp.path().join("hero.png"), 64, 48);
//! let result = validate_images(tmp.path(), &codec, &config).unwrap();
//! let issue = find_issue(&result, "Missing WebP variant");
//! assert!(issue.is_error());
//! ```

use std::path::{Path, PathBuf};

use image::{DynamicImage, Rgb, RgbImage};

use crate::types::{Issue, ValidationResult};

// =========================================================================
// Fixture setup
// =========================================================================

/// Write `bytes` to `dir/rel`, creating parent directories. Returns the path.
pub fn write_file(dir: &Path, rel: &str, bytes: &[u8]) -> PathBuf {
    let path = dir.join(rel);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    std::fs::write(&path, bytes).unwrap();
    path
}

fn gradient(width: u32, height: u32) -> DynamicImage {
    DynamicImage::ImageRgb8(RgbImage::from_fn(width, height, |x, y| {
        Rgb([(x % 256) as u8, (y % 256) as u8, ((x + y) % 256) as u8])
    }))
}

/// Write a real PNG of the given size.
pub fn write_png(path: &Path, width: u32, height: u32) {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    gradient(width, height)
        .save_with_format(path, image::ImageFormat::Png)
        .unwrap();
}

/// Write a real JPEG of the given size.
pub fn write_jpeg(path: &Path, width: u32, height: u32) {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    gradient(width, height)
        .save_with_format(path, image::ImageFormat::Jpeg)
        .unwrap();
}

/// Photo-like pixels: smooth light falloff plus deterministic grain, so
/// lossy encoders behave the way they do on real photos.
fn photo(width: u32, height: u32) -> DynamicImage {
    let mut seed: u32 = 0x2545_f491;
    DynamicImage::ImageRgb8(RgbImage::from_fn(width, height, |x, y| {
        seed = seed.wrapping_mul(1_664_525).wrapping_add(1_013_904_223);
        let grain = (seed >> 24) as i32 % 25 - 12;
        let base = |v: u32, span: u32| (60 + v * 140 / span.max(1)) as i32;
        let px = |v: i32| (v + grain).clamp(0, 255) as u8;
        Rgb([
            px(base(x, width)),
            px(base(y, height)),
            px(base(x + y, width + height) / 2 + 40),
        ])
    }))
}

/// Write a photo-like JPEG at `quality`.
pub fn write_photo_jpeg(path: &Path, width: u32, height: u32, quality: u8) {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    let file = std::fs::File::create(path).unwrap();
    photo(width, height)
        .write_with_encoder(image::codecs::jpeg::JpegEncoder::new_with_quality(
            std::io::BufWriter::new(file),
            quality,
        ))
        .unwrap();
}

// =========================================================================
// Issue lookups: panics with a clear message on miss
// =========================================================================

fn all_messages<S>(result: &ValidationResult<S>) -> Vec<String> {
    result
        .issues()
        .map(|i| format!("[{:?}] {}: {}", i.severity, i.file, i.message))
        .collect()
}

/// Find the first issue whose message contains `fragment`. Panics if none.
pub fn find_issue<'a, S>(result: &'a ValidationResult<S>, fragment: &str) -> &'a Issue {
    result
        .issues()
        .find(|i| i.message.contains(fragment))
        .unwrap_or_else(|| {
            panic!(
                "no issue containing '{fragment}'. Reported: {:#?}",
                all_messages(result)
            )
        })
}

/// True if any issue's message contains `fragment`.
pub fn has_issue<S>(result: &ValidationResult<S>, fragment: &str) -> bool {
    result.issues().any(|i| i.message.contains(fragment))
}

/// Count issues whose message contains `fragment`.
pub fn count_issues<S>(result: &ValidationResult<S>, fragment: &str) -> usize {
    result
        .issues()
        .filter(|i| i.message.contains(fragment))
        .count()
}

/// Assert the run reported nothing at all.
pub fn assert_clean<S>(result: &ValidationResult<S>) {
    let messages = all_messages(result);
    assert!(messages.is_empty(), "expected no issues, got: {messages:#?}");
}
