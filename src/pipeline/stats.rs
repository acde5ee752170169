//! Per-document metrics for pipeline runs.

use std::fmt;
use std::time::Duration;

/// Counts collected while processing one document.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PipelineMetrics {
    /// Detections handed to the pipeline.
    pub input_detections: usize,
    /// Detections whose label is outside the document family.
    pub dropped_labels: usize,
    /// Detections removed by suppression.
    pub suppressed: usize,
    /// Boxes absorbed into another box by region merging.
    pub merged: usize,
    /// Boxes placed in reading order.
    pub ordered_boxes: usize,
    /// Crops produced by the rectifier.
    pub rectified: usize,
    /// Boxes the rectifier skipped.
    pub skipped_crops: usize,
    /// Categories with no detections.
    pub missing_categories: usize,
    /// Wall time of the whole run.
    pub processing_time: Option<Duration>,
}

impl PipelineMetrics {
    pub fn new(input_detections: usize) -> Self {
        Self {
            input_detections,
            ..Default::default()
        }
    }

    /// Set the processing time
    pub fn with_processing_time(mut self, duration: Duration) -> Self {
        self.processing_time = Some(duration);
        self
    }

    /// Share of ordered boxes that were rectified, as a percentage.
    pub fn rectify_rate(&self) -> f64 {
        let total = self.rectified + self.skipped_crops;
        if total == 0 {
            0.0
        } else {
            (self.rectified as f64 / total as f64) * 100.0
        }
    }
}

impl fmt::Display for PipelineMetrics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Field Pipeline Metrics:")?;
        writeln!(f, "  Input detections: {}", self.input_detections)?;
        writeln!(f, "  Dropped labels: {}", self.dropped_labels)?;
        writeln!(f, "  Suppressed: {}", self.suppressed)?;
        writeln!(f, "  Merged: {}", self.merged)?;
        writeln!(f, "  Ordered boxes: {}", self.ordered_boxes)?;
        writeln!(
            f,
            "  Rectified: {} ({:.1}%)",
            self.rectified,
            self.rectify_rate()
        )?;
        writeln!(f, "  Skipped crops: {}", self.skipped_crops)?;
        writeln!(f, "  Missing categories: {}", self.missing_categories)?;
        match self.processing_time {
            Some(duration) => write!(
                f,
                "  Processing time: {:.2}ms",
                duration.as_secs_f64() * 1000.0
            ),
            None => write!(f, "  Processing time: n/a"),
        }
    }
}
