//! Reading-order assignment for category buckets.
//!
//! Every box in a bucket is assigned to a horizontal line by comparing its
//! top edge against bands around the bucket's minimum, midpoint and maximum
//! top edge. Lines are then emitted top to bottom, left to right within a
//! line.
//!
//! ## Layouts
//!
//! - `TwoLine`: boxes within `line_tolerance` of the topmost box form line 1,
//!   everything else is line 2.
//! - `ThreeLine`: line 1 (top band) wins over line 3 (bottom band), which wins
//!   over line 2 (middle band). Bands may overlap on short buckets; the
//!   precedence keeps assignment unique.

use itertools::{Itertools, MinMaxResult};
use oar_docfields_derive::ConfigValidator;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use tracing::debug;

use crate::core::ImageQualityError;
use crate::domain::{
    CategoryBucket, DetectionBox, DetectionSet, DocumentFamily, LayoutKind, OrderedBucket,
    ReadingOrderResult,
};

/// Configuration for [`Sequencer`].
#[derive(Debug, Clone, Serialize, Deserialize, ConfigValidator)]
#[serde(default)]
pub struct SequencerConfig {
    /// Band half-width in pixels.
    #[validate(range(min = 0.0, max = 1000.0))]
    pub line_tolerance: f32,
}

impl Default for SequencerConfig {
    fn default() -> Self {
        Self {
            line_tolerance: 10.0,
        }
    }
}

/// Line a box has been assigned to. Ordering is top to bottom.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum Line {
    Top,
    Middle,
    Bottom,
}

/// Vertical extent of a bucket, measured on box top edges.
#[derive(Debug, Clone, Copy)]
struct Bands {
    min_y: f32,
    max_y: f32,
    tolerance: f32,
}

impl Bands {
    fn mid_y(&self) -> f32 {
        (self.min_y + self.max_y) / 2.0
    }

    fn two_line(&self, y: f32) -> Line {
        if y <= self.min_y + self.tolerance {
            Line::Top
        } else {
            Line::Middle
        }
    }

    fn three_line(&self, y: f32) -> Line {
        if y <= self.min_y + self.tolerance {
            return Line::Top;
        }
        if y >= self.max_y - self.tolerance {
            return Line::Bottom;
        }
        if (y - self.mid_y()).abs() <= self.tolerance {
            return Line::Middle;
        }

        // Outside every band: take the nearest anchor, precedence on ties.
        let candidates = [
            (Line::Top, y - self.min_y),
            (Line::Bottom, self.max_y - y),
            (Line::Middle, (y - self.mid_y()).abs()),
        ];
        let mut best = candidates[0];
        for candidate in &candidates[1..] {
            if candidate.1 < best.1 {
                best = *candidate;
            }
        }
        best.0
    }
}

/// Orders the boxes of each category bucket.
#[derive(Debug, Clone, Default)]
pub struct Sequencer {
    config: SequencerConfig,
}

impl Sequencer {
    pub fn new(config: SequencerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &SequencerConfig {
        &self.config
    }

    /// Returns the bucket's boxes in reading order.
    ///
    /// The output is a permutation of the input and does not depend on the
    /// order in which boxes were inserted into the bucket.
    ///
    /// # Errors
    ///
    /// Returns [`ImageQualityError`] when the bucket is empty; no ordering
    /// exists without at least one box.
    pub fn sequence(
        &self,
        bucket: &CategoryBucket,
    ) -> Result<Vec<DetectionBox>, ImageQualityError> {
        let extent = bucket.boxes.iter().map(|b| b.y_min).minmax_by(f32::total_cmp);
        let (min_y, max_y) = match extent {
            MinMaxResult::NoElements => {
                debug!(category = %bucket.category, "empty category bucket");
                return Err(ImageQualityError::empty_bucket(bucket.category));
            }
            MinMaxResult::OneElement(y) => (y, y),
            MinMaxResult::MinMax(min, max) => (min, max),
        };

        let bands = Bands {
            min_y,
            max_y,
            tolerance: self.config.line_tolerance,
        };

        let mut assigned: Vec<(Line, usize, DetectionBox)> = bucket
            .boxes
            .iter()
            .enumerate()
            .map(|(index, bbox)| {
                let line = match bucket.layout {
                    LayoutKind::TwoLine => bands.two_line(bbox.y_min),
                    LayoutKind::ThreeLine => bands.three_line(bbox.y_min),
                };
                (line, index, *bbox)
            })
            .collect();

        assigned.sort_by(|a, b| {
            a.0.cmp(&b.0)
                .then_with(|| compare_in_line(&a.2, &b.2))
                .then_with(|| a.1.cmp(&b.1))
        });

        Ok(assigned.into_iter().map(|(_, _, bbox)| bbox).collect())
    }

    /// Groups the supported detections of `set` into one bucket per category
    /// of `family`, in ascending id order.
    ///
    /// Labels outside the family are dropped.
    pub fn bucketize(&self, set: &DetectionSet, family: DocumentFamily) -> Vec<CategoryBucket> {
        let mut buckets: Vec<CategoryBucket> = family
            .categories()
            .into_iter()
            .map(|category| CategoryBucket::new(category, Vec::new()))
            .collect();

        let mut dropped = 0usize;
        for detection in set.iter() {
            let Some(category) = family.classify(detection.label) else {
                dropped += 1;
                continue;
            };
            if let Some(bucket) = buckets.iter_mut().find(|b| b.category == category) {
                bucket.boxes.push(detection.bbox);
            }
        }

        if dropped > 0 {
            debug!(family = %family, dropped, "dropped unsupported category labels");
        }

        buckets
    }

    /// Sequences every category of `family`.
    ///
    /// # Errors
    ///
    /// Fails with the first empty category, in id order.
    pub fn sequence_document(
        &self,
        set: &DetectionSet,
        family: DocumentFamily,
    ) -> Result<ReadingOrderResult, ImageQualityError> {
        let mut result = ReadingOrderResult::new(family);
        for bucket in self.bucketize(set, family) {
            let boxes = self.sequence(&bucket)?;
            result.buckets.push(OrderedBucket {
                category: bucket.category,
                boxes,
            });
        }
        Ok(result)
    }

    /// Sequences every non-empty category of `family` and collects an error
    /// for each empty one instead of failing.
    pub fn sequence_document_lenient(
        &self,
        set: &DetectionSet,
        family: DocumentFamily,
    ) -> (ReadingOrderResult, Vec<ImageQualityError>) {
        let mut result = ReadingOrderResult::new(family);
        let mut errors = Vec::new();

        for bucket in self.bucketize(set, family) {
            match self.sequence(&bucket) {
                Ok(boxes) => result.buckets.push(OrderedBucket {
                    category: bucket.category,
                    boxes,
                }),
                Err(err) => errors.push(err),
            }
        }

        (result, errors)
    }
}

/// Left to right, then the remaining coordinates, so identical inputs in any
/// order sort identically.
fn compare_in_line(a: &DetectionBox, b: &DetectionBox) -> Ordering {
    a.x_min
        .total_cmp(&b.x_min)
        .then_with(|| a.y_min.total_cmp(&b.y_min))
        .then_with(|| a.x_max.total_cmp(&b.x_max))
        .then_with(|| a.y_max.total_cmp(&b.y_max))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{BackField, FieldCategory, FrontField, MrcField};

    fn b(x_min: f32, y_min: f32, x_max: f32, y_max: f32) -> DetectionBox {
        DetectionBox::new(x_min, y_min, x_max, y_max)
    }

    #[test]
    fn test_same_line_keeps_left_to_right_order() -> Result<(), ImageQualityError> {
        let bucket = CategoryBucket::new(
            FrontField::IdNumber,
            vec![b(10.0, 10.0, 50.0, 30.0), b(60.0, 12.0, 100.0, 28.0)],
        );
        let ordered = Sequencer::default().sequence(&bucket)?;
        assert_eq!(
            ordered,
            vec![b(10.0, 10.0, 50.0, 30.0), b(60.0, 12.0, 100.0, 28.0)]
        );
        Ok(())
    }

    #[test]
    fn test_second_line_follows_first_regardless_of_insertion() -> Result<(), ImageQualityError> {
        let bucket = CategoryBucket::new(
            FrontField::IdNumber,
            vec![b(10.0, 100.0, 50.0, 130.0), b(10.0, 10.0, 50.0, 30.0)],
        );
        let ordered = Sequencer::default().sequence(&bucket)?;
        assert_eq!(ordered[0].y_min, 10.0);
        assert_eq!(ordered[1].y_min, 100.0);
        Ok(())
    }

    #[test]
    fn test_any_permutation_gives_identical_order() -> Result<(), ImageQualityError> {
        let boxes = vec![
            b(80.0, 40.0, 120.0, 60.0),
            b(10.0, 10.0, 50.0, 30.0),
            b(10.0, 42.0, 60.0, 62.0),
            b(60.0, 15.0, 100.0, 33.0),
            b(10.0, 10.0, 50.0, 30.0),
        ];
        let sequencer = Sequencer::default();
        let expected =
            sequencer.sequence(&CategoryBucket::new(FrontField::FullName, boxes.clone()))?;

        for permutation in boxes.iter().copied().permutations(boxes.len()) {
            let bucket = CategoryBucket::new(FrontField::FullName, permutation);
            assert_eq!(sequencer.sequence(&bucket)?, expected);
        }
        Ok(())
    }

    #[test]
    fn test_two_line_band_boundary() -> Result<(), ImageQualityError> {
        let boxes = vec![
            b(90.0, 20.5, 120.0, 40.0),
            b(0.0, 20.0, 30.0, 40.0),
            b(50.0, 10.0, 80.0, 30.0),
            b(5.0, 25.0, 40.0, 45.0),
            b(70.0, 19.0, 90.0, 35.0),
        ];
        let bucket = CategoryBucket::new(FrontField::PlaceOfResidence, boxes);
        let ordered = Sequencer::default().sequence(&bucket)?;

        let threshold = 10.0 + 10.0;
        let first_below = ordered
            .iter()
            .position(|bbox| bbox.y_min > threshold)
            .unwrap_or(ordered.len());
        assert!(ordered[..first_below].iter().all(|bbox| bbox.y_min <= threshold));
        assert!(ordered[first_below..].iter().all(|bbox| bbox.y_min > threshold));
        assert_eq!(
            ordered.iter().map(|bbox| bbox.x_min).collect::<Vec<_>>(),
            vec![0.0, 50.0, 70.0, 5.0, 90.0]
        );
        Ok(())
    }

    #[test]
    fn test_three_line_precedence_on_short_bucket() -> Result<(), ImageQualityError> {
        // Span of 15 px: every box is inside several overlapping bands.
        let bucket = CategoryBucket::new(
            BackField::MachineReadableZone,
            vec![
                b(50.0, 15.0, 90.0, 30.0),
                b(0.0, 12.0, 40.0, 27.0),
                b(60.0, 8.0, 100.0, 23.0),
                b(0.0, 0.0, 40.0, 15.0),
            ],
        );
        let ordered = Sequencer::default().sequence(&bucket)?;
        // y = 8 matches all three bands and goes to the top line; y = 12
        // matches middle and bottom and goes to the bottom line.
        assert_eq!(
            ordered,
            vec![
                b(0.0, 0.0, 40.0, 15.0),
                b(60.0, 8.0, 100.0, 23.0),
                b(0.0, 12.0, 40.0, 27.0),
                b(50.0, 15.0, 90.0, 30.0),
            ]
        );
        Ok(())
    }

    #[test]
    fn test_three_line_emits_lines_top_to_bottom() -> Result<(), ImageQualityError> {
        let bucket = CategoryBucket::new(
            BackField::MachineReadableZone,
            vec![
                b(0.0, 100.0, 200.0, 120.0),
                b(0.0, 50.0, 200.0, 70.0),
                b(0.0, 0.0, 200.0, 20.0),
                // outside every band, nearest to the middle anchor
                b(210.0, 30.0, 300.0, 45.0),
            ],
        );
        let ordered = Sequencer::default().sequence(&bucket)?;
        assert_eq!(
            ordered.iter().map(|bbox| bbox.y_min).collect::<Vec<_>>(),
            vec![0.0, 50.0, 30.0, 100.0]
        );
        Ok(())
    }

    #[test]
    fn test_three_line_keeps_every_box() -> Result<(), ImageQualityError> {
        let boxes: Vec<DetectionBox> = (0..12)
            .map(|i| {
                let (x, y) = (i as f32 * 7.0, i as f32 * 11.0);
                b(x, y, x + 5.0, y + 8.0)
            })
            .collect();
        let bucket = CategoryBucket::new(BackField::MachineReadableZone, boxes.clone());
        let ordered = Sequencer::default().sequence(&bucket)?;
        assert_eq!(ordered.len(), boxes.len());
        Ok(())
    }

    #[test]
    fn test_empty_bucket_error_carries_family() {
        let sequencer = Sequencer::default();
        let cases: [(FieldCategory, DocumentFamily); 3] = [
            (FrontField::DateOfBirth.into(), DocumentFamily::Front),
            (BackField::MachineReadableZone.into(), DocumentFamily::Back),
            (MrcField::CardNumber.into(), DocumentFamily::Mrc),
        ];

        for (category, family) in cases {
            let err = sequencer.sequence(&CategoryBucket::new(category, Vec::new()));
            let Err(err) = err else {
                panic!("empty {category} bucket must fail");
            };
            assert_eq!(err.context, family);
            assert_eq!(err.category, Some(category));
            assert_eq!(err.code(), "IMAGE_QUALITY_NOT_GOOD");
        }
    }

    #[test]
    fn test_bucketize_drops_unsupported_labels() -> crate::core::DocFieldResult<()> {
        let set = DetectionSet::new(
            vec![
                b(0.0, 0.0, 10.0, 10.0),
                b(20.0, 0.0, 30.0, 10.0),
                b(40.0, 0.0, 50.0, 10.0),
                b(60.0, 0.0, 70.0, 10.0),
            ],
            vec![14, 12, 9, 3],
            vec![0.9; 4],
            vec![1, 2, 3, 4],
        )?;

        let buckets = Sequencer::default().bucketize(&set, DocumentFamily::Back);
        let sizes: Vec<(u8, usize)> = buckets.iter().map(|b| (b.category.id(), b.len())).collect();
        assert_eq!(sizes, vec![(9, 1), (10, 0), (11, 0), (14, 1)]);
        assert_eq!(buckets[3].layout, LayoutKind::ThreeLine);
        Ok(())
    }

    #[test]
    fn test_sequence_document_strict_and_lenient() -> crate::core::DocFieldResult<()> {
        let set = DetectionSet::new(
            vec![b(0.0, 0.0, 10.0, 10.0), b(0.0, 50.0, 10.0, 60.0)],
            vec![9, 10],
            vec![0.9, 0.8],
            vec![1, 2],
        )?;
        let sequencer = Sequencer::default();

        let strict = sequencer.sequence_document(&set, DocumentFamily::Back);
        let Err(err) = strict else {
            panic!("missing back categories must fail");
        };
        assert_eq!(err.category, Some(BackField::IssuingAuthority.into()));

        let (partial, errors) = sequencer.sequence_document_lenient(&set, DocumentFamily::Back);
        assert_eq!(partial.buckets.len(), 2);
        assert_eq!(partial.total_boxes(), 2);
        assert_eq!(partial.get(BackField::DateOfIssue), Some(&[b(0.0, 50.0, 10.0, 60.0)][..]));
        assert_eq!(errors.len(), 2);
        Ok(())
    }

    #[test]
    fn test_sequence_document_complete_front() -> crate::core::DocFieldResult<()> {
        let boxes: Vec<DetectionBox> = (1..=8)
            .map(|i| b(0.0, i as f32 * 40.0, 100.0, i as f32 * 40.0 + 20.0))
            .collect();
        let set = DetectionSet::new(boxes, (1..=8).collect(), vec![0.9; 8], (1..=8).collect())?;

        let result = Sequencer::default().sequence_document(&set, DocumentFamily::Front)?;
        assert_eq!(result.buckets.len(), 8);
        let ids: Vec<u8> = result.buckets.iter().map(|b| b.category.id()).collect();
        assert_eq!(ids, (1..=8).collect::<Vec<u8>>());
        Ok(())
    }
}
