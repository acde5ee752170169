//! Field rectification: perspective crop followed by denoising.
//!
//! Every ordered box is warped to an upright crop of its own size and then
//! run through the enhancement chain in [`crate::utils::enhance`]. A box that
//! cannot be rectified is skipped; it never fails the batch.

use image::{GrayImage, RgbImage};
use oar_docfields_derive::ConfigValidator;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::core::{DocFieldError, DocFieldResult};
use crate::domain::{DetectionBox, DocumentFamily};
use crate::utils::{enhance, warp_quad};

/// Enhancement variant. `Front` adds a mild Gaussian blur before the
/// contrast stretch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RectifyVariant {
    Front,
    Back,
}

impl DocumentFamily {
    /// Enhancement variant used for crops of this family.
    ///
    /// MRC cards share the front-side treatment.
    pub fn rectify_variant(self) -> RectifyVariant {
        match self {
            DocumentFamily::Front | DocumentFamily::Mrc => RectifyVariant::Front,
            DocumentFamily::Back => RectifyVariant::Back,
        }
    }
}

/// Configuration for [`Rectifier`].
#[derive(Debug, Clone, Serialize, Deserialize, ConfigValidator)]
#[serde(default)]
pub struct RectifyConfig {
    /// Scale applied to the warped crop before enhancement.
    #[validate(range(min = 0.1, max = 8.0))]
    pub upscale_factor: f32,
    /// Radius of the dilation used to estimate the background.
    #[validate(max = 50)]
    pub background_dilate_radius: u8,
    /// Radius of the median filter applied to the dilated background.
    #[validate(max = 100)]
    pub background_median_radius: u32,
    #[validate(max = 20)]
    pub close_radius: u8,
    #[validate(max = 20)]
    pub bilateral_radius: u32,
    #[validate(range(min = 0.1, max = 1000.0))]
    pub bilateral_sigma_color: f32,
    #[validate(range(min = 0.1, max = 1000.0))]
    pub bilateral_sigma_spatial: f32,
    /// Gaussian sigma for the `Front` variant; 0 disables the blur.
    #[validate(range(min = 0.0, max = 20.0))]
    pub front_blur_sigma: f32,
    /// Percentage of pixels clipped from each histogram tail.
    #[validate(range(min = 0.0, max = 49.0))]
    pub clip_hist_percent: f32,
    /// Batches larger than this are rectified in parallel.
    pub parallel_threshold: usize,
}

impl Default for RectifyConfig {
    fn default() -> Self {
        Self {
            upscale_factor: 1.5,
            background_dilate_radius: 3,
            background_median_radius: 10,
            close_radius: 1,
            bilateral_radius: 2,
            bilateral_sigma_color: 75.0,
            bilateral_sigma_spatial: 75.0,
            front_blur_sigma: 0.8,
            clip_hist_percent: 1.0,
            parallel_threshold: 8,
        }
    }
}

/// A rectified, denoised crop tied to its source box.
#[derive(Debug, Clone)]
pub struct CroppedField {
    pub source: DetectionBox,
    pub image: GrayImage,
}

/// Result of rectifying a list of boxes.
#[derive(Debug, Clone)]
pub enum RectifyBatch {
    /// No boxes were given.
    Empty,
    /// One entry per input box, in input order; `None` marks a skipped box.
    Fields(Vec<Option<CroppedField>>),
}

impl RectifyBatch {
    pub fn is_empty(&self) -> bool {
        matches!(self, RectifyBatch::Empty)
    }

    /// Per-box results; empty for [`RectifyBatch::Empty`].
    pub fn fields(&self) -> &[Option<CroppedField>] {
        match self {
            RectifyBatch::Empty => &[],
            RectifyBatch::Fields(fields) => fields,
        }
    }

    /// Number of boxes that were skipped.
    pub fn skipped(&self) -> usize {
        self.fields().iter().filter(|f| f.is_none()).count()
    }

    /// The successful crops, in input order.
    pub fn into_crops(self) -> Vec<CroppedField> {
        match self {
            RectifyBatch::Empty => Vec::new(),
            RectifyBatch::Fields(fields) => fields.into_iter().flatten().collect(),
        }
    }
}

/// Crops and cleans field images for OCR.
#[derive(Debug, Clone, Default)]
pub struct Rectifier {
    config: RectifyConfig,
}

impl Rectifier {
    pub fn new(config: RectifyConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &RectifyConfig {
        &self.config
    }

    /// Rectifies one box, returning `None` when it cannot be rectified.
    pub fn rectify(
        &self,
        image: &RgbImage,
        bbox: &DetectionBox,
        variant: RectifyVariant,
    ) -> Option<CroppedField> {
        match self.try_rectify(image, bbox, variant) {
            Ok(field) => Some(field),
            Err(e) => {
                debug!(?bbox, error = %e, "skipping field");
                None
            }
        }
    }

    /// Rectifies one box.
    ///
    /// # Errors
    ///
    /// Returns `DocFieldError::InvalidGeometry` for a box with zero width or
    /// height, or when no perspective transform maps it onto its target.
    pub fn try_rectify(
        &self,
        image: &RgbImage,
        bbox: &DetectionBox,
        variant: RectifyVariant,
    ) -> DocFieldResult<CroppedField> {
        if bbox.is_degenerate() {
            return Err(DocFieldError::invalid_geometry(format!(
                "box {:?} has zero width or height",
                bbox
            )));
        }

        let width = bbox.width().round() as u32;
        let height = bbox.height().round() as u32;
        let warped = warp_quad(image, &bbox.corners(), width, height)?;

        Ok(CroppedField {
            source: *bbox,
            image: self.enhance(&warped, variant),
        })
    }

    /// Rectifies every box.
    ///
    /// Boxes that cannot be rectified are logged and kept as `None` so the
    /// output stays aligned with the input.
    pub fn rectify_batch(
        &self,
        image: &RgbImage,
        boxes: &[DetectionBox],
        variant: RectifyVariant,
    ) -> RectifyBatch {
        if boxes.is_empty() {
            return RectifyBatch::Empty;
        }

        let use_parallel = boxes.len() > self.config.parallel_threshold;
        debug!(boxes = boxes.len(), parallel = use_parallel, "rectifying fields");

        let results: Vec<DocFieldResult<CroppedField>> = if use_parallel {
            boxes
                .par_iter()
                .map(|bbox| self.try_rectify(image, bbox, variant))
                .collect()
        } else {
            boxes
                .iter()
                .map(|bbox| self.try_rectify(image, bbox, variant))
                .collect()
        };

        let fields = results
            .into_iter()
            .enumerate()
            .map(|(idx, result)| match result {
                Ok(field) => Some(field),
                Err(e) => {
                    warn!("Failed to rectify field {} at {:?}: {}", idx, boxes[idx], e);
                    None
                }
            })
            .collect();

        RectifyBatch::Fields(fields)
    }

    fn enhance(&self, warped: &RgbImage, variant: RectifyVariant) -> GrayImage {
        let config = &self.config;

        let upscaled = enhance::upsample(warped, config.upscale_factor);
        let gray = enhance::to_gray(&upscaled);
        let residual = enhance::remove_background(
            &gray,
            config.background_dilate_radius,
            config.background_median_radius,
        );
        let closed = enhance::close(&residual, config.close_radius);
        let mut smoothed = enhance::bilateral_smooth(
            &closed,
            config.bilateral_radius,
            config.bilateral_sigma_color,
            config.bilateral_sigma_spatial,
        );

        if variant == RectifyVariant::Front {
            smoothed = enhance::gaussian_blur(&smoothed, config.front_blur_sigma);
        }

        enhance::auto_brightness_contrast(&smoothed, config.clip_hist_percent)
    }
}
