//! Error types for the field post-processing pipeline.
//!
//! Every failure path in the crate is one of a small set of kinds:
//!
//! * geometry failures on a single box ([`DocFieldError::InvalidGeometry`]), which the
//!   rectifier absorbs by skipping that field;
//! * missing categories ([`ImageQualityError`]), which the sequencer returns to the caller;
//! * invalid input or configuration, reported before any processing starts.
//!
//! Unsupported category ids are not errors at all; they are dropped at ingestion.

use thiserror::Error;

use crate::domain::{DocumentFamily, FieldCategory};

/// Machine-readable code carried by every [`ImageQualityError`].
pub const IMAGE_QUALITY_NOT_GOOD: &str = "IMAGE_QUALITY_NOT_GOOD";

/// Raised when a category has no detections, so no reading order exists for it.
///
/// The transport layer maps this to HTTP 400 with body
/// `{"status": 400, "code": "IMAGE_QUALITY_NOT_GOOD", "error": <Display text>}`.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("image quality not good: {}", describe(.context, .category))]
pub struct ImageQualityError {
    /// Which document side or card type failed.
    pub context: DocumentFamily,
    /// The category that had no detections, when known.
    pub category: Option<FieldCategory>,
}

fn describe(context: &DocumentFamily, category: &Option<FieldCategory>) -> String {
    match category {
        Some(category) => format!("no '{}' field detected on {} side", category.name(), context),
        None => format!("no fields detected on {} side", context),
    }
}

impl ImageQualityError {
    /// Creates an error for an empty bucket of `category`.
    pub fn empty_bucket(category: FieldCategory) -> Self {
        Self {
            context: category.family(),
            category: Some(category),
        }
    }

    /// The wire-level error code, always `IMAGE_QUALITY_NOT_GOOD`.
    pub fn code(&self) -> &'static str {
        IMAGE_QUALITY_NOT_GOOD
    }

    /// HTTP status the transport layer should use.
    pub fn http_status(&self) -> u16 {
        400
    }
}

/// Enum representing the errors that can occur in the pipeline.
#[derive(Error, Debug)]
pub enum DocFieldError {
    /// A category bucket was empty.
    #[error(transparent)]
    ImageQuality(#[from] ImageQualityError),

    /// A box cannot be rectified (zero area, or an unsolvable transform).
    #[error("invalid geometry: {message}")]
    InvalidGeometry {
        /// A message describing the geometry problem.
        message: String,
    },

    /// Error indicating invalid input.
    #[error("invalid input: {message}")]
    InvalidInput {
        /// A message describing the invalid input.
        message: String,
    },

    /// Error indicating a configuration problem.
    #[error("configuration: {message}")]
    ConfigError {
        /// A message describing the configuration error.
        message: String,
    },

    /// IO error.
    #[error("io")]
    Io(#[from] std::io::Error),
}

impl DocFieldError {
    /// Creates a DocFieldError for a box that cannot be rectified.
    pub fn invalid_geometry(message: impl Into<String>) -> Self {
        Self::InvalidGeometry {
            message: message.into(),
        }
    }

    /// Creates a DocFieldError for invalid input.
    ///
    /// # Arguments
    ///
    /// * `message` - A message describing the invalid input.
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput {
            message: message.into(),
        }
    }

    /// Creates a DocFieldError for configuration errors.
    ///
    /// # Arguments
    ///
    /// * `message` - A message describing the configuration error.
    pub fn config_error(message: impl Into<String>) -> Self {
        Self::ConfigError {
            message: message.into(),
        }
    }

    /// Returns the image-quality error when this is one.
    pub fn as_image_quality(&self) -> Option<&ImageQualityError> {
        match self {
            Self::ImageQuality(err) => Some(err),
            _ => None,
        }
    }
}

/// Implementation of From<crate::core::config::ConfigError> for DocFieldError.
impl From<crate::core::config::ConfigError> for DocFieldError {
    fn from(error: crate::core::config::ConfigError) -> Self {
        Self::ConfigError {
            message: error.to_string(),
        }
    }
}

/// Convenient result alias for pipeline operations.
pub type DocFieldResult<T> = Result<T, DocFieldError>;
