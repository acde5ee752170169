//! Raw detector output: axis-aligned boxes and the parallel detection set.

use serde::{Deserialize, Serialize};

use crate::core::{DocFieldError, DocFieldResult};
use crate::utils::transform::Point2f;

/// An axis-aligned detection box in image pixel coordinates.
///
/// Boxes with `x_max < x_min` or `y_max < y_min` can come out of the
/// detector before suppression; they are tolerated and simply have zero
/// width, height and area.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DetectionBox {
    pub x_min: f32,
    pub y_min: f32,
    pub x_max: f32,
    pub y_max: f32,
}

impl DetectionBox {
    /// Creates a box from its corner coordinates.
    pub fn new(x_min: f32, y_min: f32, x_max: f32, y_max: f32) -> Self {
        Self {
            x_min,
            y_min,
            x_max,
            y_max,
        }
    }

    /// Width of the box, never negative.
    #[inline]
    pub fn width(&self) -> f32 {
        (self.x_max - self.x_min).max(0.0)
    }

    /// Height of the box, never negative.
    #[inline]
    pub fn height(&self) -> f32 {
        (self.y_max - self.y_min).max(0.0)
    }

    #[inline]
    pub fn area(&self) -> f32 {
        self.width() * self.height()
    }

    /// Returns true when the box has zero width or zero height.
    pub fn is_degenerate(&self) -> bool {
        self.width() <= 0.0 || self.height() <= 0.0
    }

    /// Area of the intersection of the two boxes.
    pub fn intersection_area(&self, other: &DetectionBox) -> f32 {
        let x1 = self.x_min.max(other.x_min);
        let y1 = self.y_min.max(other.y_min);
        let x2 = self.x_max.min(other.x_max);
        let y2 = self.y_max.min(other.y_max);

        (x2 - x1).max(0.0) * (y2 - y1).max(0.0)
    }

    /// Fraction of `compared` covered by `self`.
    ///
    /// Returns `intersection_area / compared.area()`. This is asymmetric and
    /// differs from IoU: a small box fully inside a large one has ratio 1.0
    /// when it is the compared box. Returns 0.0 when `compared` has no area.
    pub fn overlap_ratio(&self, compared: &DetectionBox) -> f32 {
        let area = compared.area();
        if area > 0.0 {
            self.intersection_area(compared) / area
        } else {
            0.0
        }
    }

    /// Smallest box containing both boxes.
    pub fn union(&self, other: &DetectionBox) -> DetectionBox {
        DetectionBox {
            x_min: self.x_min.min(other.x_min),
            y_min: self.y_min.min(other.y_min),
            x_max: self.x_max.max(other.x_max),
            y_max: self.y_max.max(other.y_max),
        }
    }

    /// Grows the box by `margin_x * width` on the left and right and by
    /// `margin_y * height` on the top and bottom.
    pub fn expand(&self, margin_x: f32, margin_y: f32) -> DetectionBox {
        let dx = margin_x * self.width();
        let dy = margin_y * self.height();
        DetectionBox {
            x_min: self.x_min - dx,
            y_min: self.y_min - dy,
            x_max: self.x_max + dx,
            y_max: self.y_max + dy,
        }
    }

    /// Returns true when the point lies inside the box, edges included.
    pub fn contains_point(&self, x: f32, y: f32) -> bool {
        x >= self.x_min && x <= self.x_max && y >= self.y_min && y <= self.y_max
    }

    /// Corner points in top-left, top-right, bottom-right, bottom-left order.
    pub fn corners(&self) -> [Point2f; 4] {
        [
            Point2f::new(self.x_min, self.y_min),
            Point2f::new(self.x_max, self.y_min),
            Point2f::new(self.x_max, self.y_max),
            Point2f::new(self.x_min, self.y_max),
        ]
    }
}

impl From<[f32; 4]> for DetectionBox {
    fn from([x_min, y_min, x_max, y_max]: [f32; 4]) -> Self {
        Self::new(x_min, y_min, x_max, y_max)
    }
}

/// One detection, as a row of a [`DetectionSet`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    pub bbox: DetectionBox,
    /// Raw category id from the detector.
    pub label: i64,
    pub confidence: f32,
    pub instance_id: i64,
}

/// Detector output for one document image, stored as parallel sequences.
///
/// All four sequences always have the same length. Stages never mutate a set
/// in place; each returns a new one.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DetectionSet {
    boxes: Vec<DetectionBox>,
    labels: Vec<i64>,
    confidences: Vec<f32>,
    instance_ids: Vec<i64>,
}

impl DetectionSet {
    /// Builds a set from parallel sequences.
    ///
    /// # Errors
    ///
    /// Returns `DocFieldError::InvalidInput` when the sequences differ in length.
    pub fn new(
        boxes: Vec<DetectionBox>,
        labels: Vec<i64>,
        confidences: Vec<f32>,
        instance_ids: Vec<i64>,
    ) -> DocFieldResult<Self> {
        let n = boxes.len();
        if labels.len() != n || confidences.len() != n || instance_ids.len() != n {
            return Err(DocFieldError::invalid_input(format!(
                "detection sequences differ in length: boxes={}, labels={}, confidences={}, instance_ids={}",
                n,
                labels.len(),
                confidences.len(),
                instance_ids.len()
            )));
        }

        Ok(Self {
            boxes,
            labels,
            confidences,
            instance_ids,
        })
    }

    /// The explicit empty set.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.boxes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.boxes.is_empty()
    }

    pub fn boxes(&self) -> &[DetectionBox] {
        &self.boxes
    }

    pub fn labels(&self) -> &[i64] {
        &self.labels
    }

    pub fn confidences(&self) -> &[f32] {
        &self.confidences
    }

    pub fn instance_ids(&self) -> &[i64] {
        &self.instance_ids
    }

    /// Returns the detection at `index`, if any.
    pub fn get(&self, index: usize) -> Option<Detection> {
        Some(Detection {
            bbox: *self.boxes.get(index)?,
            label: *self.labels.get(index)?,
            confidence: *self.confidences.get(index)?,
            instance_id: *self.instance_ids.get(index)?,
        })
    }

    /// Iterates over the detections in stored order.
    pub fn iter(&self) -> impl Iterator<Item = Detection> + '_ {
        (0..self.len()).filter_map(move |i| self.get(i))
    }

    /// Builds a new set from the detections at `indices`, in that order.
    pub fn select(&self, indices: &[usize]) -> DetectionSet {
        indices
            .iter()
            .filter_map(|&i| self.get(i))
            .collect()
    }

    /// Builds a new set with only the detections satisfying `predicate`.
    pub fn filter(&self, mut predicate: impl FnMut(&Detection) -> bool) -> DetectionSet {
        self.iter().filter(|d| predicate(d)).collect()
    }
}

impl FromIterator<Detection> for DetectionSet {
    fn from_iter<T: IntoIterator<Item = Detection>>(iter: T) -> Self {
        let mut set = DetectionSet::default();
        for detection in iter {
            set.boxes.push(detection.bbox);
            set.labels.push(detection.label);
            set.confidences.push(detection.confidence);
            set.instance_ids.push(detection.instance_id);
        }
        set
    }
}
