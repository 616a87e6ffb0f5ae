use crate::shared::bounding_box::BoundingBox;
use crate::shared::constants::PERSON_CATEGORY;

/// One ranked classification of a detected object.
#[derive(Clone, Debug, PartialEq)]
pub struct Category {
    pub category_name: String,
    /// Confidence in `[0, 1]`.
    pub score: f32,
    pub index: Option<u32>,
}

impl Category {
    pub fn new(category_name: impl Into<String>, score: f32) -> Self {
        Self {
            category_name: category_name.into(),
            score,
            index: None,
        }
    }
}

/// One object instance detected in a single frame.
///
/// `categories` is ranked best-first. Detections are ephemeral: produced by
/// the detector per frame and dropped once rendered or superseded.
#[derive(Clone, Debug, PartialEq)]
pub struct Detection {
    pub bounding_box: BoundingBox,
    pub categories: Vec<Category>,
}

impl Detection {
    pub fn new(bounding_box: BoundingBox, categories: Vec<Category>) -> Self {
        Self {
            bounding_box,
            categories,
        }
    }

    pub fn top_category(&self) -> Option<&Category> {
        self.categories.first()
    }

    /// Score of the top-ranked category, 0 when there is none.
    pub fn score(&self) -> f32 {
        self.top_category().map_or(0.0, |c| c.score)
    }

    pub fn is_person(&self) -> bool {
        self.top_category()
            .is_some_and(|c| c.category_name.eq_ignore_ascii_case(PERSON_CATEGORY))
    }
}
