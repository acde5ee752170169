//! Configuration validation for the pipeline.
//!
//! Validation rules for individual fields are generated with
//! `#[derive(ConfigValidator)]` from the `oar-docfields-derive` crate.

pub mod errors;

pub use errors::{ConfigError, ConfigValidator, ConfigValidatorExt};
