//! Raster bit images (GS v 0)
//!
//! Used by the bitmap path when content is rendered to an image instead
//! of being converted to text.

use crate::error::{PrintError, PrinterResult};
use crate::escpos::{GS, Justify, LF, align};
use image::{DynamicImage, GenericImageView};
use tracing::{debug, instrument};

/// Largest height `GS v 0` can address in one block
const MAX_RASTER_HEIGHT: u32 = 0xFFFF;

/// Decode an encoded image (PNG, JPEG, WebP)
pub fn decode_image(bytes: &[u8]) -> PrinterResult<DynamicImage> {
    image::load_from_memory(bytes)
        .map_err(|e| PrintError::Conversion(format!("Cannot decode image: {}", e)))
}

/// Encode an image as a centered `GS v 0` block
///
/// Images wider than `max_width_dots` are scaled down keeping the aspect
/// ratio. Pixels with alpha below 128 are white; opaque pixels print
/// black when their luminance is below 128.
#[instrument(skip(img), fields(dimensions = ?img.dimensions()))]
pub fn raster_image(img: &DynamicImage, max_width_dots: u32) -> Vec<u8> {
    let (w, h) = img.dimensions();
    let max_width = max_width_dots.max(8);

    let (new_w, new_h) = if w > max_width {
        let ratio = f64::from(max_width) / f64::from(w);
        (max_width, ((f64::from(h) * ratio) as u32).max(1))
    } else {
        (w.max(1), h.max(1))
    };
    let new_h = new_h.min(MAX_RASTER_HEIGHT);

    let resized = if (new_w, new_h) == (w, h) {
        img.clone()
    } else {
        img.resize_exact(new_w, new_h, image::imageops::FilterType::Nearest)
    };
    let rgba = resized.to_rgba8();
    let (new_w, new_h) = rgba.dimensions();

    let x_bytes = new_w.div_ceil(8);
    debug!(width = new_w, height = new_h, x_bytes, "Raster image");

    let mut data = Vec::with_capacity((x_bytes * new_h) as usize + 12);
    data.extend(align(Justify::Center));

    // GS v 0 m xL xH yL yH
    data.extend_from_slice(&[GS, b'v', b'0', 0x00]);
    data.push((x_bytes & 0xFF) as u8);
    data.push((x_bytes >> 8) as u8);
    data.push((new_h & 0xFF) as u8);
    data.push((new_h >> 8) as u8);

    for y in 0..new_h {
        for x_byte in 0..x_bytes {
            let mut byte = 0u8;
            for bit in 0..8 {
                let x = x_byte * 8 + bit;
                if x >= new_w {
                    continue;
                }
                let pixel = rgba.get_pixel(x, y);
                if pixel[3] < 128 {
                    continue;
                }
                let luma = 0.299 * f32::from(pixel[0])
                    + 0.587 * f32::from(pixel[1])
                    + 0.114 * f32::from(pixel[2]);
                if luma < 128.0 {
                    byte |= 1 << (7 - bit);
                }
            }
            data.push(byte);
        }
    }

    data.extend(align(Justify::Left));
    data.push(LF);
    data
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgba, RgbaImage};

    #[test]
    fn test_small_image_header_and_bits() {
        // 10x2: first row black, second row transparent
        let mut img = RgbaImage::from_pixel(10, 2, Rgba([0, 0, 0, 0]));
        for x in 0..10 {
            img.put_pixel(x, 0, Rgba([0, 0, 0, 255]));
        }
        let data = raster_image(&DynamicImage::ImageRgba8(img), 576);

        // ESC a 1, then GS v 0 0 xL xH yL yH
        assert_eq!(&data[3..11], &[GS, b'v', b'0', 0, 2, 0, 2, 0]);
        assert_eq!(&data[11..15], &[0xFF, 0xC0, 0x00, 0x00]);
    }

    #[test]
    fn test_wide_image_is_scaled_down() {
        let img = RgbaImage::from_pixel(1000, 100, Rgba([255, 255, 255, 255]));
        let data = raster_image(&DynamicImage::ImageRgba8(img), 384);
        assert_eq!(&data[7..9], &[48, 0]);
        assert_eq!(&data[9..11], &[38, 0]);
    }

    #[test]
    fn test_decode_garbage_is_conversion_error() {
        let err = decode_image(b"not an image").unwrap_err();
        assert!(matches!(err, PrintError::Conversion(_)));
    }
}
