//! Grayscale enhancement steps applied to rectified field crops.
//!
//! Each function takes an image and returns a new one; none of them fail.
//! Callers chain them in [`Rectifier`](crate::pipeline::Rectifier).

use image::imageops::{self, FilterType};
use image::{GrayImage, Luma, RgbImage};
use imageproc::filter;
use imageproc::morphology::{self, Mask};

/// Resizes `image` by `factor` with bicubic interpolation.
///
/// Each output dimension is at least one pixel.
pub fn upsample(image: &RgbImage, factor: f32) -> RgbImage {
    let (width, height) = image.dimensions();
    let new_width = ((width as f32 * factor).round() as u32).max(1);
    let new_height = ((height as f32 * factor).round() as u32).max(1);

    if (new_width, new_height) == (width, height) {
        return image.clone();
    }

    imageops::resize(image, new_width, new_height, FilterType::CatmullRom)
}

/// Converts to single-channel luminance.
pub fn to_gray(image: &RgbImage) -> GrayImage {
    imageops::grayscale(image)
}

/// Suppresses the paper background and keeps the ink.
///
/// The background is estimated with a grayscale dilation (a local maximum,
/// which erases dark strokes) followed by a median filter. The output is
/// `255 - |gray - background|`, so flat background becomes white and text
/// stays dark.
pub fn remove_background(gray: &GrayImage, dilate_radius: u8, median_radius: u32) -> GrayImage {
    let dilated = morphology::grayscale_dilate(gray, &Mask::square(dilate_radius));
    let background = filter::median_filter(&dilated, median_radius, median_radius);

    let mut out = GrayImage::new(gray.width(), gray.height());
    for ((dst, src), bg) in out
        .pixels_mut()
        .zip(gray.pixels())
        .zip(background.pixels())
    {
        let diff = src.0[0].abs_diff(bg.0[0]);
        *dst = Luma([255 - diff]);
    }
    out
}

/// Grayscale morphological closing with a square structuring element.
///
/// Dark specks narrower than the element are removed; wider strokes keep
/// their intensity.
pub fn close(gray: &GrayImage, radius: u8) -> GrayImage {
    if radius == 0 {
        return gray.clone();
    }
    morphology::grayscale_close(gray, &Mask::square(radius))
}

/// Edge-preserving bilateral smoothing over a `(2 * radius + 1)` window.
pub fn bilateral_smooth(
    gray: &GrayImage,
    radius: u32,
    sigma_color: f32,
    sigma_spatial: f32,
) -> GrayImage {
    if radius == 0 || gray.width() == 0 || gray.height() == 0 {
        return gray.clone();
    }
    filter::bilateral_filter(gray, 2 * radius + 1, sigma_color, sigma_spatial)
}

/// Gaussian blur; a non-positive `sigma` leaves the image unchanged.
pub fn gaussian_blur(gray: &GrayImage, sigma: f32) -> GrayImage {
    if sigma <= 0.0 || gray.width() == 0 || gray.height() == 0 {
        return gray.clone();
    }
    filter::gaussian_blur_f32(gray, sigma)
}

/// Automatic brightness and contrast adjustment.
///
/// Drops `clip_percent` percent of the pixels from each tail of the
/// histogram and linearly stretches the remaining range to `0..=255`.
/// Images whose clipped range is a single value are returned unchanged.
pub fn auto_brightness_contrast(gray: &GrayImage, clip_percent: f32) -> GrayImage {
    let total = gray.width() as f64 * gray.height() as f64;
    if total == 0.0 {
        return gray.clone();
    }

    let mut histogram = [0u64; 256];
    for pixel in gray.pixels() {
        histogram[pixel.0[0] as usize] += 1;
    }

    let clip = total * (clip_percent.max(0.0) as f64) / 100.0;

    let mut cumulative = [0f64; 256];
    let mut running = 0f64;
    for (slot, &count) in cumulative.iter_mut().zip(histogram.iter()) {
        running += count as f64;
        *slot = running;
    }

    let low = cumulative.iter().position(|&c| c > clip).unwrap_or(0);
    let high = cumulative
        .iter()
        .position(|&c| c >= total - clip)
        .unwrap_or(255)
        .max(low);

    if high <= low {
        return gray.clone();
    }

    let alpha = 255.0 / (high - low) as f32;
    let beta = -(low as f32) * alpha;

    let mut lut = [0u8; 256];
    for (value, slot) in lut.iter_mut().enumerate() {
        *slot = (value as f32 * alpha + beta).round().clamp(0.0, 255.0) as u8;
    }

    let mut out = gray.clone();
    for pixel in out.pixels_mut() {
        pixel.0[0] = lut[pixel.0[0] as usize];
    }
    out
}
