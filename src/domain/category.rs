//! Document families and their closed sets of field categories.
//!
//! The detector emits raw integer labels. They are mapped onto one of the
//! family enums below at ingestion time; labels outside the active family
//! never make it past [`DocumentFamily::classify`].

use serde::{Deserialize, Serialize};
use std::fmt;

use super::detection::DetectionBox;
use crate::core::macros::impl_field_enum;

/// How detections of one category are laid out in lines on the card.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LayoutKind {
    /// One or two lines of text (top line, everything else).
    TwoLine,
    /// Up to three lines of text (top, middle, bottom).
    ThreeLine,
}

impl_field_enum! {
    /// Field categories on the front side of an identity card (ids 1..=8).
    pub enum FrontField {
        IdNumber = 1 => TwoLine, "id_number",
        FullName = 2 => TwoLine, "full_name",
        DateOfBirth = 3 => TwoLine, "date_of_birth",
        Sex = 4 => TwoLine, "sex",
        Nationality = 5 => TwoLine, "nationality",
        PlaceOfOrigin = 6 => TwoLine, "place_of_origin",
        PlaceOfResidence = 7 => TwoLine, "place_of_residence",
        DateOfExpiry = 8 => TwoLine, "date_of_expiry",
    }
}

impl_field_enum! {
    /// Field categories on the back side of an identity card (ids 9, 10, 11, 14).
    pub enum BackField {
        IdentifyingFeatures = 9 => TwoLine, "identifying_features",
        DateOfIssue = 10 => TwoLine, "date_of_issue",
        IssuingAuthority = 11 => TwoLine, "issuing_authority",
        /// Three-line machine readable zone.
        MachineReadableZone = 14 => ThreeLine, "machine_readable_zone",
    }
}

impl_field_enum! {
    /// Field categories on an MRC-style card (ids 0..=8).
    pub enum MrcField {
        CardNumber = 0 => TwoLine, "card_number",
        FullName = 1 => TwoLine, "full_name",
        DateOfBirth = 2 => TwoLine, "date_of_birth",
        Sex = 3 => TwoLine, "sex",
        Nationality = 4 => TwoLine, "nationality",
        PlaceOfOrigin = 5 => TwoLine, "place_of_origin",
        PlaceOfResidence = 6 => TwoLine, "place_of_residence",
        DateOfIssue = 7 => TwoLine, "date_of_issue",
        DateOfExpiry = 8 => TwoLine, "date_of_expiry",
    }
}

/// The document side or card type being processed.
///
/// Each family owns a fixed set of category ids and is also the context
/// reported by [`ImageQualityError`](crate::core::ImageQualityError).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentFamily {
    /// Front side of an identity card.
    Front,
    /// Back side of an identity card.
    Back,
    /// MRC-style card.
    Mrc,
}

impl DocumentFamily {
    /// Maps a raw detector label onto this family's categories.
    ///
    /// Returns `None` for labels outside the family's fixed id set; such
    /// detections are treated as detector noise.
    pub fn classify(self, label: i64) -> Option<FieldCategory> {
        match self {
            DocumentFamily::Front => FrontField::from_id(label).map(FieldCategory::Front),
            DocumentFamily::Back => BackField::from_id(label).map(FieldCategory::Back),
            DocumentFamily::Mrc => MrcField::from_id(label).map(FieldCategory::Mrc),
        }
    }

    /// All categories of the family in ascending id order.
    pub fn categories(self) -> Vec<FieldCategory> {
        match self {
            DocumentFamily::Front => FrontField::ALL.iter().map(|&f| f.into()).collect(),
            DocumentFamily::Back => BackField::ALL.iter().map(|&f| f.into()).collect(),
            DocumentFamily::Mrc => MrcField::ALL.iter().map(|&f| f.into()).collect(),
        }
    }

    /// Short name used in error contexts and logs.
    pub fn as_str(self) -> &'static str {
        match self {
            DocumentFamily::Front => "front",
            DocumentFamily::Back => "back",
            DocumentFamily::Mrc => "mrc",
        }
    }
}

impl fmt::Display for DocumentFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A field category of any family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FieldCategory {
    Front(FrontField),
    Back(BackField),
    Mrc(MrcField),
}

impl FieldCategory {
    /// Family this category belongs to.
    pub fn family(self) -> DocumentFamily {
        match self {
            FieldCategory::Front(_) => DocumentFamily::Front,
            FieldCategory::Back(_) => DocumentFamily::Back,
            FieldCategory::Mrc(_) => DocumentFamily::Mrc,
        }
    }

    pub fn id(self) -> u8 {
        match self {
            FieldCategory::Front(f) => f.id(),
            FieldCategory::Back(f) => f.id(),
            FieldCategory::Mrc(f) => f.id(),
        }
    }

    pub fn layout(self) -> LayoutKind {
        match self {
            FieldCategory::Front(f) => f.layout(),
            FieldCategory::Back(f) => f.layout(),
            FieldCategory::Mrc(f) => f.layout(),
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            FieldCategory::Front(f) => f.name(),
            FieldCategory::Back(f) => f.name(),
            FieldCategory::Mrc(f) => f.name(),
        }
    }
}

impl fmt::Display for FieldCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{} (id {})", self.family(), self.name(), self.id())
    }
}

impl From<FrontField> for FieldCategory {
    fn from(field: FrontField) -> Self {
        FieldCategory::Front(field)
    }
}

impl From<BackField> for FieldCategory {
    fn from(field: BackField) -> Self {
        FieldCategory::Back(field)
    }
}

impl From<MrcField> for FieldCategory {
    fn from(field: MrcField) -> Self {
        FieldCategory::Mrc(field)
    }
}

/// Detections sharing one field category, awaiting reading-order assignment.
#[derive(Debug, Clone, PartialEq)]
pub struct CategoryBucket {
    pub category: FieldCategory,
    pub layout: LayoutKind,
    pub boxes: Vec<DetectionBox>,
}

impl CategoryBucket {
    /// Creates a bucket using the category's own layout.
    pub fn new(category: impl Into<FieldCategory>, boxes: Vec<DetectionBox>) -> Self {
        let category = category.into();
        Self {
            category,
            layout: category.layout(),
            boxes,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.boxes.is_empty()
    }

    pub fn len(&self) -> usize {
        self.boxes.len()
    }
}

/// Boxes of one category in reading order.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderedBucket {
    pub category: FieldCategory,
    pub boxes: Vec<DetectionBox>,
}

/// Reading order for a whole document: one entry per category of the family,
/// in ascending id order.
#[derive(Debug, Clone, PartialEq)]
pub struct ReadingOrderResult {
    pub family: DocumentFamily,
    pub buckets: Vec<OrderedBucket>,
}

impl ReadingOrderResult {
    pub fn new(family: DocumentFamily) -> Self {
        Self {
            family,
            buckets: Vec::new(),
        }
    }

    /// Ordered boxes for `category`, if it was sequenced.
    pub fn get(&self, category: impl Into<FieldCategory>) -> Option<&[DetectionBox]> {
        let category = category.into();
        self.buckets
            .iter()
            .find(|bucket| bucket.category == category)
            .map(|bucket| bucket.boxes.as_slice())
    }

    /// Total number of ordered boxes across all categories.
    pub fn total_boxes(&self) -> usize {
        self.buckets.iter().map(|bucket| bucket.boxes.len()).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_front_family_accepts_ids_one_to_eight() {
        for id in 1..=8 {
            let category = DocumentFamily::Front.classify(id);
            assert!(category.is_some(), "id {id} should be a front field");
            assert_eq!(category.map(|c| c.id() as i64), Some(id));
        }
        assert_eq!(DocumentFamily::Front.classify(0), None);
        assert_eq!(DocumentFamily::Front.classify(9), None);
        assert_eq!(DocumentFamily::Front.classify(-1), None);
    }

    #[test]
    fn test_back_family_ids() {
        let ids: Vec<u8> = DocumentFamily::Back
            .categories()
            .iter()
            .map(|c| c.id())
            .collect();
        assert_eq!(ids, vec![9, 10, 11, 14]);
        assert_eq!(DocumentFamily::Back.classify(12), None);
        assert_eq!(DocumentFamily::Back.classify(13), None);
    }

    #[test]
    fn test_mrc_family_ids() {
        let ids: Vec<u8> = DocumentFamily::Mrc
            .categories()
            .iter()
            .map(|c| c.id())
            .collect();
        assert_eq!(ids, (0..=8).collect::<Vec<u8>>());
    }

    #[test]
    fn test_only_machine_readable_zone_is_three_line() {
        for family in [DocumentFamily::Front, DocumentFamily::Back, DocumentFamily::Mrc] {
            for category in family.categories() {
                let expected = if category == FieldCategory::Back(BackField::MachineReadableZone) {
                    LayoutKind::ThreeLine
                } else {
                    LayoutKind::TwoLine
                };
                assert_eq!(category.layout(), expected, "{category}");
            }
        }
    }

    #[test]
    fn test_bucket_takes_layout_from_category() {
        let bucket = CategoryBucket::new(BackField::MachineReadableZone, Vec::new());
        assert_eq!(bucket.layout, LayoutKind::ThreeLine);
        assert!(bucket.is_empty());
    }

    #[test]
    fn test_category_display() {
        let category = FieldCategory::from(FrontField::FullName);
        assert_eq!(category.to_string(), "front/full_name (id 2)");
    }
}
