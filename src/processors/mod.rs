//! Post-processing stages over detector output.
//!
//! - [`suppression`]: duplicate removal by overlap ratio
//! - [`region_merge`]: fixed-point union of fragmented fields
//! - [`sequencing`]: reading order within category buckets
//! - [`date`]: repair of OCR'd date strings

pub mod date;
pub mod region_merge;
pub mod sequencing;
pub mod suppression;

pub use date::{is_canonical_date, normalize_date};
pub use region_merge::{MergeCategories, MergeConfig, MergeMode, RegionMerger};
pub use sequencing::{Sequencer, SequencerConfig};
pub use suppression::{SuppressionConfig, Suppressor, suppress};
