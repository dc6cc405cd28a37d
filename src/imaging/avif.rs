//! AVIF support the `image` crate does not provide on its own.
//!
//! The `image` crate's `"avif"` feature only enables the encoder (rav1e).
//! Reading needs two pieces:
//!
//! - **Dimensions**: `avif-parse` reads them from the container, no decode.
//! - **Pixels**: `avif-parse` extracts the AV1 payload and `rav1d` (a pure Rust
//!   port of dav1d) decodes it; YUV planes are converted to RGB8 here.

use super::backend::BackendError;
use image::DynamicImage;

/// True when the buffer carries an ISO-BMFF `ftyp` box with an AVIF brand.
pub fn has_avif_signature(bytes: &[u8]) -> bool {
    bytes.len() >= 12 && &bytes[4..8] == b"ftyp" && matches!(&bytes[8..12], b"avif" | b"avis")
}

fn parse(bytes: &[u8]) -> Result<avif_parse::AvifData, BackendError> {
    avif_parse::read_avif(&mut std::io::Cursor::new(bytes))
        .map_err(|e| BackendError::ProcessingFailed(format!("Failed to parse AVIF: {e:?}")))
}

/// Width and height from the container's primary item metadata.
pub fn dimensions(bytes: &[u8]) -> Result<(u32, u32), BackendError> {
    let meta = parse(bytes)?
        .primary_item_metadata()
        .map_err(|e| BackendError::ProcessingFailed(format!("Failed to read AVIF metadata: {e:?}")))?;
    Ok((meta.max_frame_width.get(), meta.max_frame_height.get()))
}

/// Decode the primary image to RGB8.
pub fn decode(bytes: &[u8]) -> Result<DynamicImage, BackendError> {
    use rav1d::include::dav1d::data::Dav1dData;
    use rav1d::include::dav1d::dav1d::Dav1dSettings;
    use rav1d::include::dav1d::headers::{
        DAV1D_PIXEL_LAYOUT_I400, DAV1D_PIXEL_LAYOUT_I420, DAV1D_PIXEL_LAYOUT_I422,
        DAV1D_PIXEL_LAYOUT_I444,
    };
    use rav1d::include::dav1d::picture::Dav1dPicture;
    use rav1d::src::lib as dav1d;
    use std::ptr::NonNull;

    let avif = parse(bytes)?;
    let payload: &[u8] = &avif.primary_item;

    let mut settings = std::mem::MaybeUninit::<Dav1dSettings>::uninit();
    // SAFETY: dav1d_default_settings fully initializes the struct it is given.
    unsafe { dav1d::dav1d_default_settings(NonNull::from(&mut settings).cast()) };
    let mut settings = unsafe { settings.assume_init() };
    settings.n_threads = 1;
    settings.max_frame_delay = 1;

    let mut ctx = None;
    let rc = unsafe { dav1d::dav1d_open(NonNull::new(&mut ctx), NonNull::new(&mut settings)) };
    if rc.0 != 0 {
        return Err(BackendError::ProcessingFailed(format!(
            "AV1 decoder init failed ({})",
            rc.0
        )));
    }

    let mut data = Dav1dData::default();
    let buf = unsafe { dav1d::dav1d_data_create(NonNull::new(&mut data), payload.len()) };
    if buf.is_null() {
        unsafe { dav1d::dav1d_close(NonNull::new(&mut ctx)) };
        return Err(BackendError::ProcessingFailed(
            "AV1 decoder could not allocate input".into(),
        ));
    }
    // SAFETY: `buf` points at a fresh allocation of exactly `payload.len()` bytes.
    unsafe { std::ptr::copy_nonoverlapping(payload.as_ptr(), buf, payload.len()) };

    let rc = unsafe { dav1d::dav1d_send_data(ctx, NonNull::new(&mut data)) };
    if rc.0 != 0 {
        unsafe {
            dav1d::dav1d_data_unref(NonNull::new(&mut data));
            dav1d::dav1d_close(NonNull::new(&mut ctx));
        }
        return Err(BackendError::ProcessingFailed(format!(
            "AV1 decoder rejected input ({})",
            rc.0
        )));
    }

    let mut pic: Dav1dPicture = unsafe { std::mem::zeroed() };
    let rc = unsafe { dav1d::dav1d_get_picture(ctx, NonNull::new(&mut pic)) };
    if rc.0 != 0 {
        unsafe { dav1d::dav1d_close(NonNull::new(&mut ctx)) };
        return Err(BackendError::ProcessingFailed(format!(
            "AV1 decoder produced no picture ({})",
            rc.0
        )));
    }

    let width = pic.p.w as u32;
    let height = pic.p.h as u32;
    let bits = pic.p.bpc as u32;
    let layout = pic.p.layout;

    let subsampling = match layout {
        DAV1D_PIXEL_LAYOUT_I400 => Some(None),
        DAV1D_PIXEL_LAYOUT_I420 => Some(Some((true, true))),
        DAV1D_PIXEL_LAYOUT_I422 => Some(Some((true, false))),
        DAV1D_PIXEL_LAYOUT_I444 => Some(Some((false, false))),
        _ => None,
    };

    let plane = |i: usize, stride: isize| {
        pic.data[i].map(|p| Plane {
            ptr: p.as_ptr() as *const u8,
            stride,
            bits,
        })
    };

    let rgb = match subsampling {
        Some(None) => plane(0, pic.stride[0]).map(|luma| to_rgb_mono(&luma, width, height)),
        Some(Some((ss_x, ss_y))) => match (
            plane(0, pic.stride[0]),
            plane(1, pic.stride[1]),
            plane(2, pic.stride[1]),
        ) {
            (Some(y), Some(u), Some(v)) => {
                Some(to_rgb_color(&y, &u, &v, width, height, ss_x, ss_y))
            }
            _ => None,
        },
        None => None,
    };

    unsafe {
        dav1d::dav1d_picture_unref(NonNull::new(&mut pic));
        dav1d::dav1d_close(NonNull::new(&mut ctx));
    }

    let rgb = rgb.ok_or_else(|| {
        BackendError::ProcessingFailed(format!("Unsupported AVIF pixel layout: {layout}"))
    })?;
    image::RgbImage::from_raw(width, height, rgb)
        .map(DynamicImage::ImageRgb8)
        .ok_or_else(|| BackendError::ProcessingFailed("Decoded AVIF buffer size mismatch".into()))
}

/// One decoded YUV plane. 8-bit samples are bytes, higher depths are u16.
struct Plane {
    ptr: *const u8,
    stride: isize,
    bits: u32,
}

impl Plane {
    #[inline]
    fn sample(&self, x: u32, y: u32) -> f32 {
        // SAFETY: callers stay within the plane's width/height as reported by
        // the decoder, and `stride` is the decoder's row pitch in bytes.
        unsafe {
            if self.bits <= 8 {
                *self.ptr.offset(y as isize * self.stride + x as isize) as f32
            } else {
                let offset = y as isize * self.stride + x as isize * 2;
                (self.ptr.offset(offset) as *const u16).read_unaligned() as f32
            }
        }
    }

    fn scale(&self) -> f32 {
        255.0 / ((1u32 << self.bits) - 1) as f32
    }
}

fn to_rgb_mono(luma: &Plane, width: u32, height: u32) -> Vec<u8> {
    let scale = luma.scale();
    let mut out = Vec::with_capacity((width * height * 3) as usize);
    for y in 0..height {
        for x in 0..width {
            let v = (luma.sample(x, y) * scale).clamp(0.0, 255.0) as u8;
            out.extend_from_slice(&[v, v, v]);
        }
    }
    out
}

/// BT.601 YCbCr to RGB8.
fn to_rgb_color(
    luma: &Plane,
    cb: &Plane,
    cr: &Plane,
    width: u32,
    height: u32,
    ss_x: bool,
    ss_y: bool,
) -> Vec<u8> {
    let scale = luma.scale();
    let center = (1u32 << (luma.bits - 1)) as f32;
    let mut out = Vec::with_capacity((width * height * 3) as usize);
    for y in 0..height {
        let cy = if ss_y { y / 2 } else { y };
        for x in 0..width {
            let cx = if ss_x { x / 2 } else { x };
            let l = luma.sample(x, y);
            let b = cb.sample(cx, cy) - center;
            let r = cr.sample(cx, cy) - center;
            let px = [
                (l + 1.402 * r) * scale,
                (l - 0.344136 * b - 0.714136 * r) * scale,
                (l + 1.772 * b) * scale,
            ];
            out.extend(px.iter().map(|c| c.clamp(0.0, 255.0) as u8));
        }
    }
    out
}
