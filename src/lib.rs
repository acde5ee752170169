//! # OAR DocFields
//!
//! Post-processing for document-field detection on identity-style cards.
//! Turns raw detector output (boxes, category labels, confidences and
//! instance ids) into a deterministic, reading-order sequence of rectified,
//! denoised field crops ready for OCR.
//!
//! ## Stages
//!
//! - **Suppression**: removes duplicate detections by overlap ratio
//! - **Region merging**: unions fragments of multi-part fields
//! - **Sequencing**: groups detections by category and orders them in lines
//! - **Rectification**: perspective-crops and denoises each ordered box
//! - **Date normalization**: repairs OCR'd dates into `DD/MM/YYYY`
//!
//! ## Modules
//!
//! * [`core`] - Error types, configuration validation
//! * [`domain`] - Detection boxes, document families and field categories
//! * [`processors`] - Suppression, merging, sequencing and date repair
//! * [`pipeline`] - Rectifier, configuration loading and the document pipeline
//! * [`utils`] - Perspective transform and image enhancement
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use oar_docfields::prelude::*;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let pipeline = FieldPipeline::new(PipelineConfig::default())?
//!     .with_span(tracing::info_span!("document", side = "front"));
//!
//! let image = image::RgbImage::new(640, 400);
//! let detections = DetectionSet::new(
//!     vec![DetectionBox::new(40.0, 60.0, 300.0, 90.0)],
//!     vec![1],
//!     vec![0.97],
//!     vec![0],
//! )?;
//!
//! match pipeline.process(&image, &detections, DocumentFamily::Front) {
//!     Ok(fields) => println!("{}", fields.metrics),
//!     Err(DocFieldError::ImageQuality(err)) => {
//!         eprintln!("{} {}: {}", err.http_status(), err.code(), err);
//!     }
//!     Err(err) => return Err(err.into()),
//! }
//! # Ok(())
//! # }
//! ```
//!
//! The library emits `tracing` events but never installs a subscriber.

pub mod core;
pub mod domain;
pub mod pipeline;
pub mod processors;
pub mod utils;

/// Prelude module for convenient imports.
///
/// ```rust
/// use oar_docfields::prelude::*;
/// ```
pub mod prelude {
    pub use crate::core::{DocFieldError, DocFieldResult, ImageQualityError};
    pub use crate::domain::{
        BackField, DetectionBox, DetectionSet, DocumentFamily, FieldCategory, FrontField,
        MrcField,
    };
    pub use crate::pipeline::{
        ConfigLoader, CroppedField, DocumentFields, FieldPipeline, MissingCategoryPolicy,
        PipelineConfig,
    };
    pub use crate::processors::normalize_date;
}
