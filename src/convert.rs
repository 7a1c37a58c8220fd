//! Conversion of device pixel formats to packed BGR8.

use image::{ImageFormat, RgbImage};

use crate::error::{CaptureError, Result};
use crate::traits::{FourCC, Image};

/// Convert a raw device buffer in `fourcc` layout to a BGR8 image.
pub fn to_bgr(fourcc: FourCC, data: &[u8], width: u32, height: u32) -> Result<Image> {
    match fourcc {
        FourCC::YUYV => yuyv_to_bgr(data, width, height),
        FourCC::RGB3 => packed_to_bgr(data, width, height, true),
        FourCC::BGR3 => packed_to_bgr(data, width, height, false),
        FourCC::MJPG => {
            let decoded = image::load_from_memory_with_format(data, ImageFormat::Jpeg)?;
            Ok(rgb_to_image(&decoded.to_rgb8()))
        }
        other => Err(CaptureError::UnsupportedFormat(other)),
    }
}

/// Repack a decoded RGB image as BGR8.
#[must_use]
pub fn rgb_to_image(rgb: &RgbImage) -> Image {
    let mut data = Vec::with_capacity(rgb.as_raw().len());
    for pixel in rgb.pixels() {
        let [r, g, b] = pixel.0;
        data.extend_from_slice(&[b, g, r]);
    }
    Image::new(rgb.width(), rgb.height(), data)
}

fn expected_len(width: u32, height: u32, bytes_per_pixel: usize) -> usize {
    width as usize * height as usize * bytes_per_pixel
}

fn short_buffer(fourcc: FourCC, got: usize, want: usize) -> CaptureError {
    CaptureError::Stream(format!("{fourcc} buffer holds {got} bytes, expected {want}"))
}

fn packed_to_bgr(data: &[u8], width: u32, height: u32, swap: bool) -> Result<Image> {
    let want = expected_len(width, height, 3);
    let pixels = data.get(..want).ok_or_else(|| {
        short_buffer(
            if swap { FourCC::RGB3 } else { FourCC::BGR3 },
            data.len(),
            want,
        )
    })?;

    let out = if swap {
        pixels
            .chunks_exact(3)
            .flat_map(|px| match *px {
                [r, g, b] => [b, g, r],
                _ => [0, 0, 0],
            })
            .collect()
    } else {
        pixels.to_vec()
    };
    Ok(Image::new(width, height, out))
}

/// Convert a YUYV (4:2:2) buffer to BGR8.
///
/// Every 4-byte group `[Y0 U Y1 V]` yields two pixels sharing U and V.
pub fn yuyv_to_bgr(data: &[u8], width: u32, height: u32) -> Result<Image> {
    let want = expected_len(width, height, 2);
    let packed = data
        .get(..want)
        .ok_or_else(|| short_buffer(FourCC::YUYV, data.len(), want))?;

    let mut out = Vec::with_capacity(expected_len(width, height, 3));
    for group in packed.chunks_exact(4) {
        if let [y0, u, y1, v] = *group {
            let (r, g, b) = yuv_to_rgb(y0, u, v);
            out.extend_from_slice(&[b, g, r]);
            let (r, g, b) = yuv_to_rgb(y1, u, v);
            out.extend_from_slice(&[b, g, r]);
        }
    }
    Ok(Image::new(width, height, out))
}

/// Convert YUV values to RGB with the ITU-R BT.601 formula.
#[must_use]
#[allow(clippy::many_single_char_names)]
pub fn yuv_to_rgb(y: u8, u: u8, v: u8) -> (u8, u8, u8) {
    let y_f = f32::from(y);
    let u_f = f32::from(u) - 128.0;
    let v_f = f32::from(v) - 128.0;

    let r = 1.402f32.mul_add(v_f, y_f);
    let g = 0.714_14f32.mul_add(-v_f, 0.344_14f32.mul_add(-u_f, y_f));
    let b = 1.772f32.mul_add(u_f, y_f);

    let clamp = |val: f32| -> u8 {
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        {
            val.clamp(0.0, 255.0) as u8
        }
    };

    (clamp(r), clamp(g), clamp(b))
}
