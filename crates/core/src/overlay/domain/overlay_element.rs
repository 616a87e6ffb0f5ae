use std::fmt;

use crate::shared::bounding_box::BoundingBox;
use crate::shared::detection::Detection;
use crate::shared::screen_rect::ScreenRect;

/// Category text used when a detection carries no categories.
const UNKNOWN_CATEGORY: &str = "unknown";

/// Renderer-facing handle of one attached overlay.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct OverlayId(pub u64);

impl fmt::Display for OverlayId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OverlayStyle {
    Default,
    /// Highlight for detections whose top category is a person.
    Person,
}

/// A rectangle plus label drawn over the video for one detection.
///
/// Keeps the detection's source-frame box so the overlay can be re-placed
/// when the viewport changes without re-running detection.
#[derive(Clone, Debug, PartialEq)]
pub struct OverlayElement {
    pub id: OverlayId,
    pub source_box: BoundingBox,
    pub placement: ScreenRect,
    pub label: String,
    pub style: OverlayStyle,
}

impl OverlayElement {
    pub fn from_detection(id: OverlayId, detection: &Detection, placement: ScreenRect) -> Self {
        let style = if detection.is_person() {
            OverlayStyle::Person
        } else {
            OverlayStyle::Default
        };
        Self {
            id,
            source_box: detection.bounding_box,
            placement,
            label: format_label(detection),
            style,
        }
    }

    /// Confidence of the labelled category as a whole percentage.
    pub fn confidence_percent(score: f32) -> u32 {
        (score.clamp(0.0, 1.0) * 100.0).round() as u32
    }
}

/// `"{CATEGORY} - {NN}%"` from the top-ranked category.
pub fn format_label(detection: &Detection) -> String {
    let (name, score) = detection
        .top_category()
        .map_or((UNKNOWN_CATEGORY, 0.0), |c| (c.category_name.as_str(), c.score));
    format!(
        "{} - {}%",
        name.to_uppercase(),
        OverlayElement::confidence_percent(score)
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::detection::Category;
    use rstest::rstest;

    fn detection(categories: Vec<Category>) -> Detection {
        Detection::new(BoundingBox::new(10.0, 20.0, 30.0, 40.0), categories)
    }

    #[rstest]
    #[case("cup", 0.734, "CUP - 73%")]
    #[case("person", 0.997, "PERSON - 100%")]
    #[case("cell phone", 0.212, "CELL PHONE - 21%")]
    #[case("dog", 0.0, "DOG - 0%")]
    fn test_label_text(#[case] name: &str, #[case] score: f32, #[case] expected: &str) {
        let d = detection(vec![Category::new(name, score)]);
        assert_eq!(format_label(&d), expected);
    }

    #[test]
    fn test_label_uses_top_category() {
        let d = detection(vec![Category::new("cat", 0.6), Category::new("dog", 0.3)]);
        assert_eq!(format_label(&d), "CAT - 60%");
    }

    #[test]
    fn test_label_without_categories() {
        let d = detection(vec![]);
        assert_eq!(format_label(&d), "UNKNOWN - 0%");
    }

    #[test]
    fn test_person_style() {
        let rect = ScreenRect::new(0.0, 0.0, 1.0, 1.0);
        let person = OverlayElement::from_detection(
            OverlayId(1),
            &detection(vec![Category::new("Person", 0.9)]),
            rect,
        );
        let chair = OverlayElement::from_detection(
            OverlayId(2),
            &detection(vec![Category::new("chair", 0.9)]),
            rect,
        );
        assert_eq!(person.style, OverlayStyle::Person);
        assert_eq!(chair.style, OverlayStyle::Default);
    }

    #[test]
    fn test_element_keeps_source_box() {
        let d = detection(vec![Category::new("cup", 0.5)]);
        let e = OverlayElement::from_detection(OverlayId(7), &d, ScreenRect::new(1.0, 2.0, 3.0, 4.0));
        assert_eq!(e.source_box, d.bounding_box);
        assert_eq!(e.id.to_string(), "#7");
    }
}
