//! Image I/O adapter: decode/encode via the `image` crate, and the
//! normalize/denormalize bridge between display pixels and the
//! mean/std-normalized tensors the feature stack expects.

use std::path::Path;

use burn::prelude::*;
use image::{imageops::FilterType, DynamicImage, RgbImage};

use crate::error::{Error, Result};

/// Per-channel normalization statistics (RGB order). These match the
/// statistics the pretrained feature stack was trained with.
pub const CHANNEL_MEAN: [f32; 3] = [0.485, 0.456, 0.406];
pub const CHANNEL_STD: [f32; 3] = [0.229, 0.224, 0.225];

/// Decode an image file.
pub fn load(path: &Path) -> Result<DynamicImage> {
    image::open(path).map_err(|e| Error::image(path, e.to_string()))
}

/// Encode an RGB image to a file; format is inferred from the extension.
pub fn save(image: &RgbImage, path: &Path) -> Result<()> {
    image
        .save(path)
        .map_err(|e| Error::image(path, e.to_string()))
}

/// Resize so the shorter side equals `size`, center-crop to a `size`
/// square, then scale to the per-channel normalized range as a
/// `[1, 3, size, size]` tensor.
pub fn normalize<B: Backend>(
    image: &DynamicImage,
    size: u32,
    device: &B::Device,
) -> Result<Tensor<B, 4>> {
    if image.width() == 0 || image.height() == 0 {
        return Err(Error::config("input image has a zero dimension"));
    }
    let rgb = crop_square(image, size).to_rgb8();

    let side = size as usize;
    let mut data = vec![0.0f32; 3 * side * side];
    for (x, y, pixel) in rgb.enumerate_pixels() {
        let (x, y) = (x as usize, y as usize);
        for c in 0..3 {
            let value = pixel.0[c] as f32 / 255.0;
            data[c * side * side + y * side + x] = (value - CHANNEL_MEAN[c]) / CHANNEL_STD[c];
        }
    }

    Ok(Tensor::from_data(
        TensorData::new(data, [1, 3, side, side]),
        device,
    ))
}

/// Exact inverse of [`normalize`]'s scaling: map a `[1, 3, H, W]` tensor
/// back to display pixels, clamping to the displayable range.
pub fn denormalize<B: Backend>(tensor: Tensor<B, 4>) -> RgbImage {
    let [_, _, height, width] = tensor.dims();
    let data = tensor.into_data().to_vec::<f32>().unwrap();

    let mut out = RgbImage::new(width as u32, height as u32);
    for (x, y, pixel) in out.enumerate_pixels_mut() {
        let (x, y) = (x as usize, y as usize);
        for c in 0..3 {
            let value = data[c * height * width + y * width + x];
            let display = (value * CHANNEL_STD[c] + CHANNEL_MEAN[c]) * 255.0;
            pixel.0[c] = display.round().clamp(0.0, 255.0) as u8;
        }
    }
    out
}

/// Shorter side to `size`, then center crop to a `size` square.
fn crop_square(image: &DynamicImage, size: u32) -> DynamicImage {
    let (w, h) = (image.width(), image.height());
    let (new_w, new_h) = if w <= h {
        (size, (h as u64 * size as u64 / w as u64).max(size as u64) as u32)
    } else {
        ((w as u64 * size as u64 / h as u64).max(size as u64) as u32, size)
    };
    let resized = image.resize_exact(new_w, new_h, FilterType::Triangle);
    let x = (new_w - size) / 2;
    let y = (new_h - size) / 2;
    resized.crop_imm(x, y, size, size)
}
