use image::GrayImage;
use thiserror::Error;

use super::ImageTrackingRequest;

const RED_WEIGHT: f32 = 0.213;
const GREEN_WEIGHT: f32 = 0.715;
const BLUE_WEIGHT: f32 = 0.072;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LuminanceError {
    #[error("image has zero width or height")]
    Empty,

    #[error("unsupported pixel stride of {0} bytes")]
    UnsupportedPixelStride(u32),

    #[error("pixel buffer holds {actual} bytes, expected at least {expected}")]
    BufferTooShort { expected: usize, actual: usize },
}

/// Converts a reference image into the single-channel buffer the image
/// database accepts.
///
/// A buffer whose row stride equals its width is already grayscale. Otherwise
/// the per-pixel stride (`stride / width`) selects the source layout:
/// 2 bytes for 16-bit gray, 3 or 4 for 8-bit RGB(A), 6 or 8 for 16-bit RGB(A).
pub fn to_luminance(request: &ImageTrackingRequest<'_>) -> Result<GrayImage, LuminanceError> {
    let (width, height) = (request.width, request.height);
    if width == 0 || height == 0 {
        return Err(LuminanceError::Empty);
    }

    let stride = request.stride as usize;
    let expected = stride * height as usize;
    if request.data.len() < expected {
        return Err(LuminanceError::BufferTooShort {
            expected,
            actual: request.data.len(),
        });
    }

    if request.stride == width {
        let raw = request.data[..expected].to_vec();
        return GrayImage::from_raw(width, height, raw).ok_or(LuminanceError::BufferTooShort {
            expected,
            actual: request.data.len(),
        });
    }

    let pixel_stride = request.stride / width;
    let convert: fn(&[u8]) -> u8 = match pixel_stride {
        2 => gray16,
        3 | 4 => rgb8,
        6 | 8 => rgb16,
        other => return Err(LuminanceError::UnsupportedPixelStride(other)),
    };

    let pixel_stride = pixel_stride as usize;
    let mut out = GrayImage::new(width, height);
    for (y, row) in request.data.chunks_exact(stride).take(height as usize).enumerate() {
        for x in 0..width as usize {
            let start = x * pixel_stride;
            out.put_pixel(x as u32, y as u32, image::Luma([convert(&row[start..start + pixel_stride])]));
        }
    }
    Ok(out)
}

fn narrow(lo: u8, hi: u8) -> u8 {
    (u16::from_le_bytes([lo, hi]) / 257) as u8
}

fn weighted(r: u8, g: u8, b: u8) -> u8 {
    (RED_WEIGHT * f32::from(r) + GREEN_WEIGHT * f32::from(g) + BLUE_WEIGHT * f32::from(b)) as u8
}

fn gray16(px: &[u8]) -> u8 {
    narrow(px[0], px[1])
}

fn rgb8(px: &[u8]) -> u8 {
    weighted(px[0], px[1], px[2])
}

fn rgb16(px: &[u8]) -> u8 {
    weighted(narrow(px[0], px[1]), narrow(px[2], px[3]), narrow(px[4], px[5]))
}
