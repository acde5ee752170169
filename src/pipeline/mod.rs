//! Document-level orchestration: configuration, rectification and the
//! [`FieldPipeline`] that chains every stage.

pub mod config;
pub mod document;
pub mod rectify;
pub mod stats;

pub use config::{ConfigFormat, ConfigLoader, MissingCategoryPolicy, PipelineConfig};
pub use document::{DocumentFields, FieldCrops, FieldPipeline};
pub use rectify::{CroppedField, RectifyBatch, RectifyConfig, RectifyVariant, Rectifier};
pub use stats::PipelineMetrics;
