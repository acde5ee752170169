//! Non-maximum suppression over field detections.
//!
//! Unlike IoU-based NMS, overlap is measured relative to the lower-priority
//! box: a candidate is dropped when more than `overlap_threshold` of its own
//! area is covered by a kept, higher-confidence box. Small fragments sitting
//! inside a larger detection are therefore removed even when their IoU is low.

use oar_docfields_derive::ConfigValidator;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::domain::{DetectionBox, DetectionSet};

/// Configuration for [`Suppressor`].
#[derive(Debug, Clone, Serialize, Deserialize, ConfigValidator)]
#[serde(default)]
pub struct SuppressionConfig {
    /// Overlap ratio above which a lower-priority box is suppressed.
    /// Must lie strictly between 0 and 1.
    #[validate(range(min = 0.0, max = 1.0))]
    pub overlap_threshold: f32,
    /// Only suppress boxes that share a label with the kept box.
    pub class_aware: bool,
}

impl Default for SuppressionConfig {
    fn default() -> Self {
        Self {
            overlap_threshold: 0.3,
            class_aware: false,
        }
    }
}

/// Removes duplicate detections, keeping the most confident one.
#[derive(Debug, Clone, Default)]
pub struct Suppressor {
    config: SuppressionConfig,
}

impl Suppressor {
    pub fn new(config: SuppressionConfig) -> Self {
        Self { config }
    }

    /// Creates a class-agnostic suppressor with the given threshold.
    pub fn with_threshold(overlap_threshold: f32) -> Self {
        Self::new(SuppressionConfig {
            overlap_threshold,
            ..Default::default()
        })
    }

    pub fn config(&self) -> &SuppressionConfig {
        &self.config
    }

    /// Returns the surviving detections in priority order (confidence
    /// descending, ties in input order).
    ///
    /// The suppression mask persists for the whole pass, so a box suppressed
    /// by an earlier keeper is never reconsidered. Empty input yields
    /// [`DetectionSet::empty`].
    pub fn suppress(&self, set: &DetectionSet) -> DetectionSet {
        if set.is_empty() {
            return DetectionSet::empty();
        }

        let keep = self.compute_keep_indices(set.boxes(), set.labels(), set.confidences());

        debug!(
            input = set.len(),
            kept = keep.len(),
            threshold = self.config.overlap_threshold,
            "suppression finished"
        );

        set.select(&keep)
    }

    fn compute_keep_indices(
        &self,
        boxes: &[DetectionBox],
        labels: &[i64],
        confidences: &[f32],
    ) -> Vec<usize> {
        // Stable sort, so equal confidences keep their input order.
        let mut order: Vec<usize> = (0..boxes.len()).collect();
        order.sort_by(|&a, &b| confidences[b].total_cmp(&confidences[a]));

        let mut keep = Vec::new();
        let mut suppressed = vec![false; boxes.len()];

        for (rank, &i) in order.iter().enumerate() {
            if suppressed[i] {
                continue;
            }
            keep.push(i);

            for &j in &order[rank + 1..] {
                if suppressed[j] {
                    continue;
                }
                if self.config.class_aware && labels[i] != labels[j] {
                    continue;
                }
                if boxes[i].overlap_ratio(&boxes[j]) > self.config.overlap_threshold {
                    suppressed[j] = true;
                }
            }
        }

        keep
    }
}

/// Class-agnostic suppression with threshold `overlap_threshold`.
pub fn suppress(set: &DetectionSet, overlap_threshold: f32) -> DetectionSet {
    Suppressor::with_threshold(overlap_threshold).suppress(set)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::DocFieldResult;
    use crate::core::config::ConfigValidator;

    fn set_of(rows: &[([f32; 4], i64, f32)]) -> DocFieldResult<DetectionSet> {
        DetectionSet::new(
            rows.iter().map(|(b, _, _)| DetectionBox::from(*b)).collect(),
            rows.iter().map(|(_, l, _)| *l).collect(),
            rows.iter().map(|(_, _, c)| *c).collect(),
            (0..rows.len() as i64).collect(),
        )
    }

    #[test]
    fn test_empty_input_yields_empty_set() {
        let out = suppress(&DetectionSet::empty(), 0.3);
        assert!(out.is_empty());
        assert_eq!(out, DetectionSet::empty());
    }

    #[test]
    fn test_contained_fragment_is_suppressed() -> DocFieldResult<()> {
        let set = set_of(&[
            ([12.0, 12.0, 20.0, 20.0], 2, 0.5),
            ([0.0, 0.0, 100.0, 40.0], 2, 0.9),
        ])?;

        let out = suppress(&set, 0.3);
        assert_eq!(out.len(), 1);
        assert_eq!(out.boxes()[0], DetectionBox::new(0.0, 0.0, 100.0, 40.0));
        assert_eq!(out.instance_ids(), &[1]);
        Ok(())
    }

    #[test]
    fn test_output_is_in_priority_order() -> DocFieldResult<()> {
        let set = set_of(&[
            ([0.0, 0.0, 10.0, 10.0], 1, 0.2),
            ([50.0, 0.0, 60.0, 10.0], 1, 0.8),
            ([100.0, 0.0, 110.0, 10.0], 1, 0.5),
            ([150.0, 0.0, 160.0, 10.0], 1, 0.8),
        ])?;

        let out = suppress(&set, 0.3);
        // equal confidences keep input order
        assert_eq!(out.instance_ids(), &[1, 3, 2, 0]);
        Ok(())
    }

    #[test]
    fn test_persistent_mask_does_not_resurrect() -> DocFieldResult<()> {
        // A suppresses B; B would have suppressed C, but B is gone, so C survives.
        let set = set_of(&[
            ([0.0, 0.0, 10.0, 10.0], 1, 0.9),
            ([5.0, 0.0, 15.0, 10.0], 1, 0.8),
            ([10.0, 0.0, 20.0, 10.0], 1, 0.7),
        ])?;

        let out = suppress(&set, 0.3);
        assert_eq!(out.instance_ids(), &[0, 2]);
        Ok(())
    }

    const THRESHOLDS: [f32; 7] = [0.05, 0.1, 0.3, 0.5, 0.7, 0.9, 0.99];

    /// Overlapping field fragments, nested boxes, exact duplicates and tied
    /// confidences.
    fn fixtures() -> DocFieldResult<Vec<DetectionSet>> {
        let mut sets = vec![
            set_of(&[
                ([0.0, 0.0, 50.0, 20.0], 1, 0.9),
                ([10.0, 5.0, 60.0, 25.0], 1, 0.85),
                ([40.0, 0.0, 90.0, 20.0], 2, 0.7),
                ([80.0, 2.0, 120.0, 22.0], 3, 0.6),
                ([0.0, 30.0, 40.0, 50.0], 4, 0.95),
                ([5.0, 35.0, 20.0, 45.0], 4, 0.4),
            ])?,
            set_of(&[
                ([0.0, 0.0, 100.0, 100.0], 1, 0.3),
                ([10.0, 10.0, 90.0, 90.0], 1, 0.5),
                ([20.0, 20.0, 80.0, 80.0], 1, 0.7),
                ([30.0, 30.0, 70.0, 70.0], 1, 0.9),
            ])?,
            set_of(&[
                ([0.0, 0.0, 10.0, 10.0], 1, 0.8),
                ([0.0, 0.0, 10.0, 10.0], 2, 0.8),
                ([2.0, 0.0, 12.0, 10.0], 1, 0.8),
                ([4.0, 0.0, 14.0, 10.0], 3, 0.6),
                ([6.0, 0.0, 16.0, 10.0], 1, 0.6),
            ])?,
        ];

        // a dense row of staggered boxes with varying widths and scores
        let rows: Vec<([f32; 4], i64, f32)> = (0..24)
            .map(|i| {
                let x = (i * 7 % 50) as f32 * 3.0;
                let y = (i * 5 % 11) as f32 * 2.0;
                let w = 10.0 + (i * 13 % 17) as f32;
                let h = 8.0 + (i % 4) as f32 * 3.0;
                let score = 0.2 + (i * 37 % 71) as f32 / 100.0;
                ([x, y, x + w, y + h], (i % 5) as i64, score)
            })
            .collect();
        sets.push(set_of(&rows)?);

        Ok(sets)
    }

    #[test]
    fn test_no_kept_pair_exceeds_threshold() -> DocFieldResult<()> {
        for set in fixtures()? {
            for threshold in THRESHOLDS {
                let out = suppress(&set, threshold);
                assert!(!out.is_empty());

                let boxes = out.boxes();
                for (i, higher) in boxes.iter().enumerate() {
                    for lower in &boxes[i + 1..] {
                        assert!(
                            higher.overlap_ratio(lower) <= threshold,
                            "τ = {threshold}: {higher:?} vs {lower:?}"
                        );
                    }
                }
            }
        }
        Ok(())
    }

    #[test]
    fn test_suppression_is_idempotent() -> DocFieldResult<()> {
        for set in fixtures()? {
            for threshold in THRESHOLDS {
                let once = suppress(&set, threshold);
                let twice = suppress(&once, threshold);
                assert_eq!(once, twice, "τ = {threshold}");
            }
        }
        Ok(())
    }

    #[test]
    fn test_nested_boxes_at_threshold_extremes() -> DocFieldResult<()> {
        let set = fixtures()?.remove(1);
        let kept: Vec<usize> = THRESHOLDS.iter().map(|&t| suppress(&set, t).len()).collect();
        assert_eq!(kept.first(), Some(&1));
        assert_eq!(kept.last(), Some(&4));
        Ok(())
    }

    #[test]
    fn test_class_aware_only_suppresses_same_label() -> DocFieldResult<()> {
        let set = set_of(&[
            ([0.0, 0.0, 10.0, 10.0], 1, 0.9),
            ([0.0, 0.0, 10.0, 10.0], 2, 0.8),
            ([0.0, 0.0, 10.0, 10.0], 1, 0.7),
        ])?;

        let suppressor = Suppressor::new(SuppressionConfig {
            class_aware: true,
            ..Default::default()
        });
        let out = suppressor.suppress(&set);
        assert_eq!(out.labels(), &[1, 2]);

        let agnostic = suppress(&set, 0.3);
        assert_eq!(agnostic.len(), 1);
        Ok(())
    }

    #[test]
    fn test_config_range_validation() {
        let config = SuppressionConfig {
            overlap_threshold: 1.5,
            ..Default::default()
        };
        assert!(config.validate().is_err());
        assert!(SuppressionConfig::default().validate().is_ok());
    }
}
