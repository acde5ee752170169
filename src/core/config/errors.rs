//! Configuration error types and validation traits.

use thiserror::Error;

use crate::core::errors::DocFieldError;

/// Errors that can occur during configuration validation.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    /// Error indicating that a configuration is invalid.
    #[error("invalid configuration: {message}")]
    InvalidConfig { message: String },
}

/// A trait for validating configuration parameters.
///
/// Field range checks are usually generated with
/// `#[derive(ConfigValidator)]`; the provided methods cover checks the
/// derive cannot express, such as open intervals.
pub trait ConfigValidator {
    /// Validates the configuration.
    ///
    /// # Returns
    ///
    /// A Result indicating success or a ConfigError if validation fails.
    fn validate(&self) -> Result<(), ConfigError>;

    /// Returns the default configuration.
    fn get_defaults() -> Self
    where
        Self: Sized;

    /// Validates a float value lies strictly between `min` and `max`.
    fn validate_f32_open_range(
        &self,
        value: f32,
        min: f32,
        max: f32,
        field_name: &str,
    ) -> Result<(), ConfigError> {
        if value <= min || value >= max || value.is_nan() {
            Err(ConfigError::InvalidConfig {
                message: format!(
                    "{} must be strictly between {} and {}, got {}",
                    field_name, min, max, value
                ),
            })
        } else {
            Ok(())
        }
    }
}

/// Extension trait for ConfigValidator that provides error wrapping utilities.
pub trait ConfigValidatorExt: ConfigValidator {
    /// Validates configuration and wraps any errors into `DocFieldError::ConfigError`.
    fn validate_and_wrap(self) -> Result<Self, DocFieldError>
    where
        Self: Sized,
    {
        self.validate()?;
        Ok(self)
    }
}

// Blanket implementation for all ConfigValidator types
impl<T: ConfigValidator> ConfigValidatorExt for T {}
