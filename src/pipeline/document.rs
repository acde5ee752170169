//! End-to-end processing of one document image.

use image::RgbImage;
use std::time::Instant;
use tracing::{Span, debug, warn};

use super::config::{MissingCategoryPolicy, PipelineConfig};
use super::rectify::{CroppedField, Rectifier};
use super::stats::PipelineMetrics;
use crate::core::config::ConfigValidatorExt;
use crate::core::{DocFieldResult, ImageQualityError};
use crate::domain::{DetectionBox, DetectionSet, DocumentFamily, FieldCategory};
use crate::processors::{RegionMerger, Sequencer, Suppressor};

/// Rectified crops of one category, in reading order.
#[derive(Debug, Clone)]
pub struct FieldCrops {
    pub category: FieldCategory,
    pub crops: Vec<CroppedField>,
    /// Ordered boxes the rectifier could not crop.
    pub skipped: usize,
}

/// Output of [`FieldPipeline::process`].
#[derive(Debug, Clone)]
pub struct DocumentFields {
    pub family: DocumentFamily,
    /// One entry per category that had detections, in ascending id order.
    pub fields: Vec<FieldCrops>,
    /// Missing categories, only populated under [`MissingCategoryPolicy::Continue`].
    pub issues: Vec<ImageQualityError>,
    pub metrics: PipelineMetrics,
}

impl DocumentFields {
    /// Crops for `category`, if it was detected.
    pub fn get(&self, category: impl Into<FieldCategory>) -> Option<&FieldCrops> {
        let category = category.into();
        self.fields.iter().find(|f| f.category == category)
    }

    /// True when every category of the family was found.
    pub fn is_complete(&self) -> bool {
        self.issues.is_empty()
    }
}

/// Turns raw detections for one document into ordered, rectified crops.
///
/// Stages run in order: label filtering, suppression, region merging for the
/// configured categories, sequencing, rectification. The pipeline holds no
/// mutable state and can be shared across threads.
#[derive(Debug, Clone)]
pub struct FieldPipeline {
    config: PipelineConfig,
    suppressor: Suppressor,
    merger: RegionMerger,
    sequencer: Sequencer,
    rectifier: Rectifier,
    span: Span,
}

impl FieldPipeline {
    /// Builds a pipeline from a validated configuration.
    ///
    /// # Errors
    ///
    /// Returns `DocFieldError::ConfigError` if the configuration is invalid.
    pub fn new(config: PipelineConfig) -> DocFieldResult<Self> {
        let config = config.validate_and_wrap()?;

        Ok(Self {
            suppressor: Suppressor::new(config.suppression.clone()),
            merger: RegionMerger::new(config.merge.clone()),
            sequencer: Sequencer::new(config.sequencer.clone()),
            rectifier: Rectifier::new(config.rectify.clone()),
            config,
            span: Span::none(),
        })
    }

    /// Attributes every event of this pipeline to `span`.
    pub fn with_span(mut self, span: Span) -> Self {
        self.span = span;
        self
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Processes the detections of one document image.
    ///
    /// # Errors
    ///
    /// Returns `DocFieldError::ImageQuality` for the first category without
    /// detections when the policy is [`MissingCategoryPolicy::Abort`].
    /// Boxes that cannot be rectified never cause an error; they are counted
    /// in [`FieldCrops::skipped`].
    pub fn process(
        &self,
        image: &RgbImage,
        detections: &DetectionSet,
        family: DocumentFamily,
    ) -> DocFieldResult<DocumentFields> {
        let _entered = self.span.enter();
        let start_time = Instant::now();
        let mut metrics = PipelineMetrics::new(detections.len());

        debug!(family = %family, detections = detections.len(), "processing document");

        let supported = detections.filter(|d| family.classify(d.label).is_some());
        metrics.dropped_labels = detections.len() - supported.len();

        let survivors = self.suppressor.suppress(&supported);
        metrics.suppressed = supported.len() - survivors.len();

        let mut buckets = self.sequencer.bucketize(&survivors, family);
        for bucket in buckets.iter_mut() {
            if bucket.is_empty() || !self.config.merge.categories.contains(bucket.category) {
                continue;
            }
            let before = bucket.len();
            bucket.boxes = self.merger.apply(&bucket.boxes);
            metrics.merged += before - bucket.len();
        }

        let mut ordered: Vec<(FieldCategory, Vec<DetectionBox>)> =
            Vec::with_capacity(buckets.len());
        let mut issues = Vec::new();
        for bucket in &buckets {
            match self.sequencer.sequence(bucket) {
                Ok(boxes) => {
                    metrics.ordered_boxes += boxes.len();
                    ordered.push((bucket.category, boxes));
                }
                Err(err) => match self.config.missing_category {
                    MissingCategoryPolicy::Abort => {
                        warn!(category = %bucket.category, "missing category, aborting document");
                        return Err(err.into());
                    }
                    MissingCategoryPolicy::Continue => {
                        warn!(category = %bucket.category, "missing category, continuing");
                        metrics.missing_categories += 1;
                        issues.push(err);
                    }
                },
            }
        }

        let variant = family.rectify_variant();
        let fields: Vec<FieldCrops> = ordered
            .into_iter()
            .map(|(category, boxes)| {
                let batch = self.rectifier.rectify_batch(image, &boxes, variant);
                let skipped = batch.skipped();
                let crops = batch.into_crops();
                metrics.skipped_crops += skipped;
                metrics.rectified += crops.len();
                FieldCrops {
                    category,
                    crops,
                    skipped,
                }
            })
            .collect();

        let metrics = metrics.with_processing_time(start_time.elapsed());
        debug!(
            family = %family,
            fields = fields.len(),
            rectified = metrics.rectified,
            skipped = metrics.skipped_crops,
            "document processed"
        );

        Ok(DocumentFields {
            family,
            fields,
            issues,
            metrics,
        })
    }
}
