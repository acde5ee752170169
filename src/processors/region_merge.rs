//! Fixed-point union of fragmented field detections.
//!
//! Long fields (addresses, names) are often detected as several adjacent
//! fragments. Boxes whose margin-expanded rectangles touch are unioned
//! repeatedly until a pass performs no merge.

use oar_docfields_derive::ConfigValidator;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::domain::{BackField, DetectionBox, FieldCategory, FrontField, MrcField};

/// Which clusters [`RegionMerger`] reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MergeMode {
    /// Every merged cluster is returned.
    #[default]
    Partition,
    /// Only the cluster containing the first box is returned.
    Single,
}

/// Configuration for [`RegionMerger`].
#[derive(Debug, Clone, Serialize, Deserialize, ConfigValidator)]
#[serde(default)]
pub struct MergeConfig {
    /// Horizontal expansion, as a fraction of box width per side.
    #[validate(range(min = 0.0, max = 10.0))]
    pub margin_x: f32,
    /// Vertical expansion, as a fraction of box height per side.
    #[validate(range(min = 0.0, max = 10.0))]
    pub margin_y: f32,
    pub mode: MergeMode,
    /// Categories whose detections are merged by the pipeline.
    pub categories: MergeCategories,
}

impl Default for MergeConfig {
    fn default() -> Self {
        Self {
            margin_x: 0.1,
            margin_y: 0.3,
            mode: MergeMode::Partition,
            categories: MergeCategories::default(),
        }
    }
}

/// Merge-enabled categories, listed per document family.
///
/// Raw ids overlap between families (id 7 is the place of residence on a
/// front side and the date of issue on an MRC card), so each family names
/// its own categories.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MergeCategories {
    pub front: Vec<FrontField>,
    pub back: Vec<BackField>,
    pub mrc: Vec<MrcField>,
}

impl MergeCategories {
    /// Whether detections of `category` are merged.
    pub fn contains(&self, category: FieldCategory) -> bool {
        match category {
            FieldCategory::Front(field) => self.front.contains(&field),
            FieldCategory::Back(field) => self.back.contains(&field),
            FieldCategory::Mrc(field) => self.mrc.contains(&field),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.front.is_empty() && self.back.is_empty() && self.mrc.is_empty()
    }
}

/// Unions touching boxes into merged regions.
#[derive(Debug, Clone, Default)]
pub struct RegionMerger {
    config: MergeConfig,
}

impl RegionMerger {
    pub fn new(config: MergeConfig) -> Self {
        Self { config }
    }

    /// Creates a merger with the given margins and default mode.
    pub fn with_margins(margin_x: f32, margin_y: f32) -> Self {
        Self::new(MergeConfig {
            margin_x,
            margin_y,
            ..Default::default()
        })
    }

    pub fn config(&self) -> &MergeConfig {
        &self.config
    }

    /// Merges `boxes` and returns every resulting cluster.
    ///
    /// Clusters are ordered by the position of their earliest member in the
    /// input. No two returned boxes touch, so merging the output again
    /// returns it unchanged.
    pub fn merge_clusters(&self, boxes: &[DetectionBox]) -> Vec<DetectionBox> {
        let mut clusters = boxes.to_vec();
        let mut passes = 0usize;

        loop {
            passes += 1;
            let (next, merges) = self.merge_pass(&clusters);
            clusters = next;
            if merges == 0 {
                break;
            }
        }

        debug!(
            input = boxes.len(),
            clusters = clusters.len(),
            passes,
            "region merge reached fixed point"
        );

        clusters
    }

    /// Merges `boxes` and returns only the cluster containing the first box.
    ///
    /// Returns `None` for empty input. Other clusters are discarded.
    pub fn merge(&self, boxes: &[DetectionBox]) -> Option<DetectionBox> {
        self.merge_clusters(boxes).into_iter().next()
    }

    /// Applies the configured [`MergeMode`].
    pub fn apply(&self, boxes: &[DetectionBox]) -> Vec<DetectionBox> {
        match self.config.mode {
            MergeMode::Partition => self.merge_clusters(boxes),
            MergeMode::Single => self.merge(boxes).into_iter().collect(),
        }
    }

    /// One pass: each surviving box absorbs every later box it touches.
    fn merge_pass(&self, boxes: &[DetectionBox]) -> (Vec<DetectionBox>, usize) {
        let mut consumed = vec![false; boxes.len()];
        let mut out = Vec::with_capacity(boxes.len());
        let mut merges = 0;

        for i in 0..boxes.len() {
            if consumed[i] {
                continue;
            }
            let mut current = boxes[i];

            for j in (i + 1)..boxes.len() {
                if !consumed[j] && self.touches(&current, &boxes[j]) {
                    current = current.union(&boxes[j]);
                    consumed[j] = true;
                    merges += 1;
                }
            }
            out.push(current);
        }

        (out, merges)
    }

    /// True when a corner of either box lies in the other's expanded rectangle.
    fn touches(&self, a: &DetectionBox, b: &DetectionBox) -> bool {
        let (mx, my) = (self.config.margin_x, self.config.margin_y);
        let a_expanded = a.expand(mx, my);
        let b_expanded = b.expand(mx, my);

        b.corners()
            .iter()
            .any(|p| a_expanded.contains_point(p.x, p.y))
            || a.corners()
                .iter()
                .any(|p| b_expanded.contains_point(p.x, p.y))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn b(x_min: f32, y_min: f32, x_max: f32, y_max: f32) -> DetectionBox {
        DetectionBox::new(x_min, y_min, x_max, y_max)
    }

    #[test]
    fn test_empty_input() {
        let merger = RegionMerger::default();
        assert!(merger.merge_clusters(&[]).is_empty());
        assert_eq!(merger.merge(&[]), None);
    }

    #[test]
    fn test_adjacent_fragments_merge_into_one() {
        let merger = RegionMerger::with_margins(0.1, 0.3);
        // 5 px gap, width 50 gives 5 px of horizontal margin
        let merged = merger.merge(&[b(0.0, 0.0, 50.0, 20.0), b(55.0, 2.0, 100.0, 22.0)]);
        assert_eq!(merged, Some(b(0.0, 0.0, 100.0, 22.0)));
    }

    #[test]
    fn test_chain_converges_to_single_box() {
        let merger = RegionMerger::with_margins(0.1, 0.3);
        // A and C are far apart; both touch B.
        let a = b(0.0, 0.0, 40.0, 20.0);
        let c = b(90.0, 0.0, 130.0, 20.0);
        let b_mid = b(42.0, 0.0, 88.0, 20.0);

        let clusters = merger.merge_clusters(&[a, c, b_mid]);
        assert_eq!(clusters, vec![b(0.0, 0.0, 130.0, 20.0)]);
    }

    #[test]
    fn test_partition_keeps_disjoint_clusters() {
        let merger = RegionMerger::with_margins(0.1, 0.3);
        let boxes = [
            b(0.0, 0.0, 50.0, 20.0),
            b(200.0, 200.0, 250.0, 220.0),
            b(52.0, 0.0, 90.0, 20.0),
        ];

        let clusters = merger.merge_clusters(&boxes);
        assert_eq!(
            clusters,
            vec![b(0.0, 0.0, 90.0, 20.0), b(200.0, 200.0, 250.0, 220.0)]
        );

        // legacy mode keeps only the first cluster
        assert_eq!(merger.merge(&boxes), Some(b(0.0, 0.0, 90.0, 20.0)));
    }

    #[test]
    fn test_contained_box_merges_in_either_order() {
        let merger = RegionMerger::with_margins(0.0, 0.0);
        let outer = b(0.0, 0.0, 100.0, 100.0);
        let inner = b(10.0, 10.0, 20.0, 20.0);

        assert_eq!(merger.merge(&[outer, inner]), Some(outer));
        assert_eq!(merger.merge(&[inner, outer]), Some(outer));
    }

    #[test]
    fn test_merge_is_idempotent() {
        let merger = RegionMerger::with_margins(0.1, 0.3);
        let boxes = [
            b(0.0, 0.0, 40.0, 20.0),
            b(42.0, 3.0, 80.0, 21.0),
            b(81.0, 1.0, 120.0, 19.0),
        ];

        let once = merger.merge_clusters(&boxes);
        let twice = merger.merge_clusters(&once);
        assert_eq!(once, twice);

        let single = merger.merge(&boxes);
        let single_again = single.and_then(|m| merger.merge(&[m]));
        assert_eq!(single, single_again);
    }

    #[test]
    fn test_apply_respects_mode() {
        let boxes = [b(0.0, 0.0, 10.0, 10.0), b(100.0, 100.0, 110.0, 110.0)];

        let partition = RegionMerger::default();
        assert_eq!(partition.apply(&boxes).len(), 2);

        let single = RegionMerger::new(MergeConfig {
            mode: MergeMode::Single,
            ..Default::default()
        });
        assert_eq!(single.apply(&boxes), vec![b(0.0, 0.0, 10.0, 10.0)]);
    }
}
