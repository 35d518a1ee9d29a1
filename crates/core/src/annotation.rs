//! Detected label regions and provider bounding-box normalization.
//!
//! Providers report boxes as `[x1, y1, x2, y2]` corner pairs; everything
//! downstream of the ingestion boundary works with `{x, y, width, height}`
//! exclusively. The conversion happens exactly once, here.

use serde::{Deserialize, Serialize};

/// A detected label region in internal form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabelRegion {
    pub label: String,
    /// Detector confidence in `[0, 1]`.
    pub confidence: f32,
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

/// Convert a provider `[x1, y1, x2, y2]` box into a [`LabelRegion`].
///
/// Malformed boxes with `x2 < x1` or `y2 < y1` are rejected (`None`) —
/// a detector that reports inverted corners has produced nothing usable
/// for that region. When `bounds` (image width, height) are known the
/// region is clamped to the bitmap.
pub fn region_from_bbox(
    label: impl Into<String>,
    confidence: f32,
    bbox: [f32; 4],
    bounds: Option<(u32, u32)>,
) -> Option<LabelRegion> {
    let [x1, y1, x2, y2] = bbox;
    if x2 < x1 || y2 < y1 || bbox.iter().any(|v| !v.is_finite()) {
        return None;
    }

    let (mut x1, mut y1, mut x2, mut y2) = (x1, y1, x2, y2);
    if let Some((w, h)) = bounds {
        let (w, h) = (w as f32, h as f32);
        x1 = x1.clamp(0.0, w);
        x2 = x2.clamp(0.0, w);
        y1 = y1.clamp(0.0, h);
        y2 = y2.clamp(0.0, h);
    } else {
        x1 = x1.max(0.0);
        y1 = y1.max(0.0);
        x2 = x2.max(0.0);
        y2 = y2.max(0.0);
    }

    Some(LabelRegion {
        label: label.into(),
        confidence: confidence.clamp(0.0, 1.0),
        x: x1,
        y: y1,
        width: x2 - x1,
        height: y2 - y1,
    })
}

/// Count regions whose label marks a character/person detection.
///
/// Used to derive `character_count` when the local path produced only
/// labels and no scene-level fields.
pub fn character_count(regions: &[LabelRegion]) -> i32 {
    regions
        .iter()
        .filter(|r| matches!(r.label.as_str(), "person" | "character" | "face"))
        .count() as i32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn converts_corner_pair_to_origin_and_extent() {
        let region = region_from_bbox("person", 0.9, [10.0, 20.0, 110.0, 70.0], None).unwrap();
        assert_eq!(region.x, 10.0);
        assert_eq!(region.y, 20.0);
        assert_eq!(region.width, 100.0);
        assert_eq!(region.height, 50.0);
    }

    #[test]
    fn zero_area_box_is_kept() {
        let region = region_from_bbox("mark", 0.5, [5.0, 5.0, 5.0, 5.0], None).unwrap();
        assert_eq!(region.width, 0.0);
        assert_eq!(region.height, 0.0);
    }

    #[test]
    fn inverted_x_corners_rejected() {
        assert!(region_from_bbox("person", 0.9, [110.0, 20.0, 10.0, 70.0], None).is_none());
    }

    #[test]
    fn inverted_y_corners_rejected() {
        assert!(region_from_bbox("person", 0.9, [10.0, 70.0, 110.0, 20.0], None).is_none());
    }

    #[test]
    fn non_finite_coordinates_rejected() {
        assert!(region_from_bbox("person", 0.9, [f32::NAN, 0.0, 1.0, 1.0], None).is_none());
        assert!(region_from_bbox("person", 0.9, [0.0, 0.0, f32::INFINITY, 1.0], None).is_none());
    }

    #[test]
    fn clamped_to_image_bounds() {
        let region =
            region_from_bbox("person", 0.9, [-5.0, -5.0, 700.0, 500.0], Some((640, 480))).unwrap();
        assert_eq!(region.x, 0.0);
        assert_eq!(region.y, 0.0);
        assert_eq!(region.width, 640.0);
        assert_eq!(region.height, 480.0);
    }

    #[test]
    fn negative_origin_clamped_without_bounds() {
        let region = region_from_bbox("person", 0.9, [-5.0, -2.0, 10.0, 10.0], None).unwrap();
        assert_eq!(region.x, 0.0);
        assert_eq!(region.y, 0.0);
        assert_eq!(region.width, 10.0);
        assert_eq!(region.height, 10.0);
    }

    #[test]
    fn confidence_clamped_to_unit_interval() {
        let region = region_from_bbox("person", 1.7, [0.0, 0.0, 1.0, 1.0], None).unwrap();
        assert_eq!(region.confidence, 1.0);
    }

    #[test]
    fn character_count_only_counts_people_labels() {
        let regions = vec![
            region_from_bbox("person", 0.9, [0.0, 0.0, 1.0, 1.0], None).unwrap(),
            region_from_bbox("face", 0.8, [1.0, 1.0, 2.0, 2.0], None).unwrap(),
            region_from_bbox("speech_bubble", 0.7, [2.0, 2.0, 3.0, 3.0], None).unwrap(),
        ];
        assert_eq!(character_count(&regions), 2);
    }

    #[test]
    fn character_count_empty_is_zero() {
        assert_eq!(character_count(&[]), 0);
    }
}
