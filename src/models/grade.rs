//! Bouldering grade scales
//!
//! Both scales are index-aligned, so converting a grade is a lookup of its
//! position in one table and a read of the same position in the other.
//! Projects always store V-scale grades; the Font scale is a display choice.

use serde::{Deserialize, Serialize};

pub const V_SCALE: [&str; 18] = [
    "V0", "V1", "V2", "V3", "V4", "V5", "V6", "V7", "V8", "V9", "V10", "V11", "V12", "V13", "V14",
    "V15", "V16", "V17",
];

pub const FONT_SCALE: [&str; 18] = [
    "4", "5", "5+", "6A/6A+", "6B/6B+", "6C/6C+", "7A", "7A+", "7B/7B+", "7B+/7C", "7C+", "8A",
    "8A+", "8B", "8B+", "8C", "8C+", "9A",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum GradeScale {
    #[default]
    #[serde(rename = "V-Scale")]
    VScale,
    #[serde(rename = "Font Scale")]
    FontScale,
}

impl GradeScale {
    pub fn as_str(&self) -> &'static str {
        match self {
            GradeScale::VScale => "V-Scale",
            GradeScale::FontScale => "Font Scale",
        }
    }

    /// Unknown labels fall back to the V-scale
    pub fn from_label(label: &str) -> Self {
        match label {
            "Font Scale" => GradeScale::FontScale,
            _ => GradeScale::VScale,
        }
    }

    pub fn grades(&self) -> &'static [&'static str; 18] {
        match self {
            GradeScale::VScale => &V_SCALE,
            GradeScale::FontScale => &FONT_SCALE,
        }
    }
}

/// Position of a V-scale grade, used to order grade-keyed summaries
pub fn v_scale_index(grade: &str) -> Option<usize> {
    V_SCALE.iter().position(|g| *g == grade)
}

/// V-scale grade to its Font equivalent; grades outside the scale pass through
pub fn v_to_font(grade: &str) -> String {
    convert(grade, &V_SCALE, &FONT_SCALE)
}

/// Font grade to its V-scale equivalent; grades outside the scale pass through
pub fn font_to_v(grade: &str) -> String {
    convert(grade, &FONT_SCALE, &V_SCALE)
}

/// Render a stored (V-scale) grade in the user's preferred scale
pub fn display_grade(grade: &str, scale: GradeScale) -> String {
    match scale {
        GradeScale::VScale => grade.to_string(),
        GradeScale::FontScale => v_to_font(grade),
    }
}

/// Turn a grade picked in the user's preferred scale back into a stored grade
pub fn canonical_grade(grade: &str, scale: GradeScale) -> String {
    match scale {
        GradeScale::VScale => grade.to_string(),
        GradeScale::FontScale => font_to_v(grade),
    }
}

fn convert(grade: &str, from: &[&str; 18], to: &[&str; 18]) -> String {
    from.iter()
        .position(|g| *g == grade)
        .map(|index| to[index].to_string())
        .unwrap_or_else(|| grade.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_conversion_is_invertible() {
        for grade in V_SCALE {
            assert_eq!(font_to_v(&v_to_font(grade)), grade);
        }
        for grade in FONT_SCALE {
            assert_eq!(v_to_font(&font_to_v(grade)), grade);
        }
    }

    #[test]
    fn test_unknown_grade_passes_through() {
        assert_eq!(v_to_font("Unknown"), "Unknown");
        assert_eq!(font_to_v("V3"), "V3");
    }

    #[test]
    fn test_display_respects_scale() {
        assert_eq!(display_grade("V4", GradeScale::VScale), "V4");
        assert_eq!(display_grade("V4", GradeScale::FontScale), "6B/6B+");
        assert_eq!(canonical_grade("6B/6B+", GradeScale::FontScale), "V4");
    }

    #[test]
    fn test_scale_labels() {
        assert_eq!(GradeScale::from_label("Font Scale"), GradeScale::FontScale);
        assert_eq!(GradeScale::from_label("anything"), GradeScale::VScale);
        assert_eq!(
            serde_json::to_string(&GradeScale::FontScale).unwrap(),
            "\"Font Scale\""
        );
    }
}
