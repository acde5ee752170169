//! Image utilities used by the rectifier.

pub mod enhance;
pub mod transform;

pub use transform::{Point2f, get_perspective_transform, warp_perspective, warp_quad};
