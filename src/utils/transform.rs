//! Perspective transformation utilities.
//!
//! Fields are rectified by mapping a source quadrilateral onto an upright
//! target rectangle. Current detector output is axis-aligned, but the
//! transform accepts any convex quadrilateral.

use crate::core::DocFieldError;
use image::{Rgb, RgbImage};
use nalgebra::{Matrix3, Vector3};
use rayon::prelude::*;

/// A 2D point with floating-point coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point2f {
    /// X coordinate of the point.
    pub x: f32,
    /// Y coordinate of the point.
    pub y: f32,
}

impl Point2f {
    /// Creates a new Point2f with the given coordinates.
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// Warps the quadrilateral `quad` of `src_image` onto a `width` x `height`
/// upright rectangle.
///
/// `quad` is given in top-left, top-right, bottom-right, bottom-left order
/// and maps onto the corners `(0, 0)`, `(width, 0)`, `(width, height)` and
/// `(0, height)`.
///
/// # Errors
///
/// Returns `DocFieldError::InvalidGeometry` if:
/// * the target size is zero in either dimension
/// * the source image is empty
/// * the quadrilateral is degenerate and no transform can be solved
pub fn warp_quad(
    src_image: &RgbImage,
    quad: &[Point2f; 4],
    width: u32,
    height: u32,
) -> Result<RgbImage, DocFieldError> {
    if width == 0 || height == 0 {
        return Err(DocFieldError::invalid_geometry(format!(
            "target size {width}x{height} has zero area"
        )));
    }
    if src_image.width() == 0 || src_image.height() == 0 {
        return Err(DocFieldError::invalid_geometry("source image is empty"));
    }

    let target = [
        Point2f::new(0.0, 0.0),
        Point2f::new(width as f32, 0.0),
        Point2f::new(width as f32, height as f32),
        Point2f::new(0.0, height as f32),
    ];

    let transform_matrix = get_perspective_transform(quad, &target)?;
    warp_perspective(src_image, &transform_matrix, width, height)
}

/// Calculates the perspective transformation matrix that maps source points to destination points.
///
/// Solves the 8x8 linear system given by the four point correspondences.
///
/// # Errors
///
/// Returns `DocFieldError::InvalidGeometry` if the system is singular, which
/// happens when three or more source points are collinear.
pub fn get_perspective_transform(
    src_points: &[Point2f; 4],
    dst_points: &[Point2f; 4],
) -> Result<Matrix3<f32>, DocFieldError> {
    let mut a = nalgebra::DMatrix::<f32>::zeros(8, 8);
    let mut b = nalgebra::DVector::<f32>::zeros(8);

    for (i, (src, dst)) in src_points.iter().zip(dst_points.iter()).enumerate() {
        // x' = (a*x + b*y + c) / (g*x + h*y + 1)
        a.set_row(
            i * 2,
            &nalgebra::RowDVector::from_row_slice(&[
                src.x,
                src.y,
                1.0,
                0.0,
                0.0,
                0.0,
                -src.x * dst.x,
                -src.y * dst.x,
            ]),
        );
        b[i * 2] = dst.x;

        // y' = (d*x + e*y + f) / (g*x + h*y + 1)
        a.set_row(
            i * 2 + 1,
            &nalgebra::RowDVector::from_row_slice(&[
                0.0,
                0.0,
                0.0,
                src.x,
                src.y,
                1.0,
                -src.x * dst.y,
                -src.y * dst.y,
            ]),
        );
        b[i * 2 + 1] = dst.y;
    }

    let solution = a
        .lu()
        .solve(&b)
        .filter(|s| s.iter().all(|v| v.is_finite()))
        .ok_or_else(|| DocFieldError::invalid_geometry("cannot solve perspective transformation"))?;

    Ok(Matrix3::new(
        solution[0],
        solution[1],
        solution[2],
        solution[3],
        solution[4],
        solution[5],
        solution[6],
        solution[7],
        1.0,
    ))
}

/// Applies a perspective transformation to an image.
///
/// Uses inverse mapping with bilinear interpolation; destination pixels that
/// map outside the source are black. An empty source therefore yields an
/// all-black image.
///
/// # Errors
///
/// Returns `DocFieldError::InvalidGeometry` if the matrix cannot be inverted.
pub fn warp_perspective(
    src_image: &RgbImage,
    transform_matrix: &Matrix3<f32>,
    dst_width: u32,
    dst_height: u32,
) -> Result<RgbImage, DocFieldError> {
    let inv_matrix = transform_matrix
        .try_inverse()
        .ok_or_else(|| DocFieldError::invalid_geometry("cannot invert transformation matrix"))?;

    let mut dst_image = RgbImage::new(dst_width, dst_height);
    let (src_width, src_height) = src_image.dimensions();
    if src_width == 0 || src_height == 0 || dst_width == 0 || dst_height == 0 {
        return Ok(dst_image);
    }

    let max_x = src_width.saturating_sub(1) as f32;
    let max_y = src_height.saturating_sub(1) as f32;
    let buffer: &mut [u8] = dst_image.as_mut();

    buffer
        .par_chunks_mut((dst_width * 3) as usize)
        .enumerate()
        .for_each(|(dst_y, row_buffer)| {
            for dst_x in 0..dst_width {
                let dst_point = Vector3::new(dst_x as f32, dst_y as f32, 1.0);
                let src_point = inv_matrix * dst_point;

                let mut final_pixel = Rgb([0, 0, 0]);

                if src_point.z.abs() > f32::EPSILON {
                    let src_x = src_point.x / src_point.z;
                    let src_y = src_point.y / src_point.z;

                    if src_x >= 0.0 && src_y >= 0.0 && src_x <= max_x && src_y <= max_y {
                        final_pixel = bilinear_interpolate(src_image, src_x, src_y);
                    }
                }

                let index = (dst_x * 3) as usize;
                row_buffer[index..index + 3].copy_from_slice(&final_pixel.0);
            }
        });

    Ok(dst_image)
}

/// Performs bilinear interpolation to get a pixel value at non-integer coordinates.
fn bilinear_interpolate(image: &RgbImage, x: f32, y: f32) -> Rgb<u8> {
    let x1 = x.floor() as u32;
    let y1 = y.floor() as u32;

    // Clamp neighbours to the image so the last row and column stay valid.
    let x2 = (x1 + 1).min(image.width() - 1);
    let y2 = (y1 + 1).min(image.height() - 1);

    let dx = x - x1 as f32;
    let dy = y - y1 as f32;

    let p11 = image.get_pixel(x1, y1);
    let p12 = image.get_pixel(x1, y2);
    let p21 = image.get_pixel(x2, y1);
    let p22 = image.get_pixel(x2, y2);

    let mut result = [0u8; 3];
    for (i, result_channel) in result.iter_mut().enumerate() {
        let val = (1.0 - dx) * (1.0 - dy) * p11.0[i] as f32
            + dx * (1.0 - dy) * p21.0[i] as f32
            + (1.0 - dx) * dy * p12.0[i] as f32
            + dx * dy * p22.0[i] as f32;
        *result_channel = val.round().clamp(0.0, 255.0) as u8;
    }

    Rgb(result)
}
