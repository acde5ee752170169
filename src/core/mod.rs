//! Core error handling, configuration validation and shared macros.

pub mod config;
pub mod errors;
pub(crate) mod macros;

pub use errors::{DocFieldError, DocFieldResult, IMAGE_QUALITY_NOT_GOOD, ImageQualityError};
