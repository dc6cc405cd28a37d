//! JPEG quality estimation from the luminance quantization table.
//!
//! Encoders derived from the IJG reference (libjpeg, mozjpeg, the `image`
//! crate) scale the standard Annex K table by a quality-dependent factor. We
//! find the quality whose scaled table sums closest to the one in the file.
//! Summing makes the match independent of zigzag vs natural table order.

/// ITU-T T.81 Annex K luminance table.
const STD_LUMA_QTABLE: [u16; 64] = [
    16, 11, 10, 16, 24, 40, 51, 61, //
    12, 12, 14, 19, 26, 58, 60, 55, //
    14, 13, 16, 24, 40, 57, 69, 56, //
    14, 17, 22, 29, 51, 87, 80, 62, //
    18, 22, 37, 56, 68, 109, 103, 77, //
    24, 35, 55, 64, 81, 104, 113, 92, //
    49, 64, 78, 87, 103, 121, 120, 101, //
    72, 92, 95, 98, 112, 100, 103, 99,
];

const DQT: u8 = 0xDB;
const SOS: u8 = 0xDA;

/// Sum of the standard table scaled the way IJG does it for `quality`.
fn scaled_sum(quality: u32) -> u32 {
    let scale = if quality < 50 {
        5000 / quality
    } else {
        200 - quality * 2
    };
    STD_LUMA_QTABLE
        .iter()
        .map(|&v| ((u32::from(v) * scale + 50) / 100).clamp(1, 255))
        .sum()
}

/// Sum of quantization table 0, read from the DQT segments before the first scan.
fn luma_table_sum(bytes: &[u8]) -> Option<u32> {
    if bytes.get(..2)? != [0xFF, 0xD8] {
        return None;
    }
    let mut i = 2;
    while i + 4 <= bytes.len() {
        if bytes[i] != 0xFF {
            return None;
        }
        let marker = bytes[i + 1];
        if marker == 0xFF {
            i += 1;
            continue;
        }
        if marker == SOS {
            return None;
        }
        let len = usize::from(u16::from_be_bytes([bytes[i + 2], bytes[i + 3]]));
        let segment = bytes.get(i + 4..i + 2 + len)?;
        if marker == DQT {
            let mut j = 0;
            while j < segment.len() {
                let precision = segment[j] >> 4;
                let id = segment[j] & 0x0F;
                let width = if precision == 0 { 1 } else { 2 };
                let table = segment.get(j + 1..j + 1 + 64 * width)?;
                if id == 0 {
                    let sum = if width == 1 {
                        table.iter().map(|&v| u32::from(v)).sum()
                    } else {
                        table
                            .chunks_exact(2)
                            .map(|c| u32::from(u16::from_be_bytes([c[0], c[1]])))
                            .sum()
                    };
                    return Some(sum);
                }
                j += 1 + 64 * width;
            }
        }
        i += 2 + len;
    }
    None
}

/// Estimated IJG quality (1-100) of a baseline or progressive JPEG.
///
/// `None` when the bytes are not a JPEG or carry no luminance table.
pub fn estimate_quality(bytes: &[u8]) -> Option<u32> {
    let observed = luma_table_sum(bytes)?;
    (1..=100u32).rev().min_by_key(|&q| scaled_sum(q).abs_diff(observed))
}
