//! Domain types for document-field detections.
//!
//! * [`detection`] - detection boxes and the parallel detection set
//! * [`category`] - document families, closed field-category enums, buckets and reading order

pub mod category;
pub mod detection;

pub use category::{
    BackField, CategoryBucket, DocumentFamily, FieldCategory, FrontField, LayoutKind, MrcField,
    OrderedBucket, ReadingOrderResult,
};
pub use detection::{Detection, DetectionBox, DetectionSet};
