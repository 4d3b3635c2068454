use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use image::{GrayImage, Luma};

use crate::detector::{MaskData, RleCounts, RleMask};
use crate::error::{Result, TakeoffError};

/// Rasterize a segmentation mask into a grayscale image (foreground = 255).
pub fn decode_mask(mask: &MaskData) -> Result<GrayImage> {
    match mask {
        MaskData::Rle(rle) => decode_rle(rle),
        MaskData::Bitmap(encoded) => decode_bitmap(encoded),
    }
}

/// Largest mask `decode_rle` will allocate, in pixels.
pub const MAX_MASK_PIXELS: u64 = 1 << 26;

/// Decode a COCO run-length mask. Runs alternate background/foreground,
/// starting with background, over pixels in column-major order.
///
/// The runs must cover the mask exactly, and the mask may hold at most
/// [`MAX_MASK_PIXELS`] pixels.
pub fn decode_rle(rle: &RleMask) -> Result<GrayImage> {
    let [height, width] = rle.size;
    let total = width as u64 * height as u64;
    if total > MAX_MASK_PIXELS {
        return Err(TakeoffError::MaskDecode(format!(
            "{width}x{height} mask exceeds the {MAX_MASK_PIXELS} pixel limit"
        )));
    }

    let counts = match &rle.counts {
        RleCounts::Uncompressed(counts) => counts.clone(),
        RleCounts::Compressed(encoded) => decode_compressed_counts(encoded)?,
    };

    let covered: u64 = counts.iter().map(|&c| c as u64).sum();
    if covered != total {
        return Err(TakeoffError::MaskDecode(format!(
            "run lengths cover {covered} pixels but mask is {width}x{height}"
        )));
    }

    let mut image = GrayImage::new(width, height);
    let mut index: u64 = 0;
    for (run, &count) in counts.iter().enumerate() {
        let foreground = run % 2 == 1;
        if foreground {
            for i in index..index + count as u64 {
                let x = (i / height as u64) as u32;
                let y = (i % height as u64) as u32;
                image.put_pixel(x, y, Luma([255u8]));
            }
        }
        index += count as u64;
    }

    Ok(image)
}

/// Decode the LEB128-like string form of COCO counts.
fn decode_compressed_counts(encoded: &str) -> Result<Vec<u32>> {
    let bytes = encoded.as_bytes();
    let mut counts: Vec<i64> = Vec::new();
    let mut pos = 0;

    while pos < bytes.len() {
        let mut value: i64 = 0;
        let mut shift = 0;
        loop {
            if shift >= 12 {
                return Err(TakeoffError::MaskDecode("run length overflow".to_string()));
            }
            let byte = *bytes.get(pos).ok_or_else(|| {
                TakeoffError::MaskDecode("truncated compressed counts".to_string())
            })?;
            let chunk = byte as i64 - 48;
            value |= (chunk & 0x1f) << (5 * shift);
            pos += 1;
            shift += 1;
            if chunk & 0x20 == 0 {
                if chunk & 0x10 != 0 {
                    value |= -1i64 << (5 * shift);
                }
                break;
            }
        }
        if counts.len() > 2 {
            value += counts[counts.len() - 2];
        }
        counts.push(value);
    }

    counts
        .into_iter()
        .map(|c| {
            u32::try_from(c)
                .map_err(|_| TakeoffError::MaskDecode(format!("invalid run length {c}")))
        })
        .collect()
}

/// Decode a base64 image (raw or `data:` URL) into its luma channel.
pub fn decode_bitmap(encoded: &str) -> Result<GrayImage> {
    let payload = match encoded.split_once(";base64,") {
        Some((_, data)) => data,
        None => encoded,
    };
    let bytes = STANDARD
        .decode(payload.trim())
        .map_err(|e| TakeoffError::MaskDecode(e.to_string()))?;
    Ok(image::load_from_memory(&bytes)?.to_luma8())
}
