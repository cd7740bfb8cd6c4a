//! Static presentation metadata for each health domain.

use serde::Serialize;

use crate::domain::{capitalize, DomainKey, HealthDomain};

/// One SVG primitive of a 24x24 domain icon.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "shape", rename_all = "lowercase")]
pub enum IconShape {
    Path { d: &'static str },
    Circle { cx: u8, cy: u8, r: u8 },
    Line { x1: u8, y1: u8, x2: u8, y2: u8 },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DomainPresentation {
    pub id: String,
    pub label: String,
    pub icon: &'static [IconShape],
    pub comment: String,
}

const HEART_ICON: &[IconShape] = &[IconShape::Path {
    d: "M20.84 4.61a5.5 5.5 0 0 0-7.78 0L12 5.67l-1.06-1.06a5.5 5.5 0 0 0-7.78 7.78l1.06 1.06L12 21.23l7.78-7.78 1.06-1.06a5.5 5.5 0 0 0 0-7.78z",
}];

const GUT_ICON: &[IconShape] = &[
    IconShape::Path {
        d: "M18 8h1a4 4 0 0 1 0 8h-1",
    },
    IconShape::Path {
        d: "M2 8h16v9a4 4 0 0 1-4 4H6a4 4 0 0 1-4-4V8z",
    },
    IconShape::Line { x1: 6, y1: 1, x2: 6, y2: 4 },
    IconShape::Line { x1: 10, y1: 1, x2: 10, y2: 4 },
    IconShape::Line { x1: 14, y1: 1, x2: 14, y2: 4 },
];

const COGNITIVE_ICON: &[IconShape] = &[
    IconShape::Circle { cx: 12, cy: 12, r: 10 },
    IconShape::Path {
        d: "M12 16a4 4 0 1 0 0-8 4 4 0 0 0 0 8z",
    },
];

const LIVER_ICON: &[IconShape] = &[IconShape::Path {
    d: "M20.5 7.27683C20.5 11.4164 12 19 12 19C12 19 3.5 11.4164 3.5 7.27683C3.5 3.13727 7.35786 0 12 0C16.6421 0 20.5 3.13727 20.5 7.27683Z",
}];

const SKIN_ICON: &[IconShape] = &[
    IconShape::Circle { cx: 12, cy: 12, r: 10 },
    IconShape::Path { d: "M8 15h8" },
    IconShape::Path { d: "M8 9h8" },
];

const AGING_ICON: &[IconShape] = &[
    IconShape::Circle { cx: 12, cy: 12, r: 10 },
    IconShape::Path { d: "M12 16v-4" },
    IconShape::Path { d: "M12 8h.01" },
];

pub const OVERALL_COMMENT: &str =
    "Your overall health indicators show positive trends with room for improvement in specific areas.";

pub fn label(domain: HealthDomain) -> &'static str {
    match domain {
        HealthDomain::Gut => "Gut Health",
        HealthDomain::Liver => "Liver Health",
        HealthDomain::Heart => "Heart Health",
        HealthDomain::Skin => "Skin Health",
        HealthDomain::Cognitive => "Cognitive Health",
        HealthDomain::Aging => "Aging",
    }
}

pub fn icon(domain: HealthDomain) -> &'static [IconShape] {
    match domain {
        HealthDomain::Gut => GUT_ICON,
        HealthDomain::Liver => LIVER_ICON,
        HealthDomain::Heart => HEART_ICON,
        HealthDomain::Skin => SKIN_ICON,
        HealthDomain::Cognitive => COGNITIVE_ICON,
        HealthDomain::Aging => AGING_ICON,
    }
}

pub fn comment(domain: HealthDomain) -> &'static str {
    match domain {
        HealthDomain::Liver => {
            "Liver health markers show room for improvement. Focus on beneficial dietary changes."
        }
        HealthDomain::Aging => {
            "Aging markers indicate need for lifestyle modifications and targeted interventions."
        }
        HealthDomain::Skin => {
            "Moderate skin health markers. Consider dietary adjustments to improve skin microbiome."
        }
        HealthDomain::Cognitive => {
            "Strong cognitive health markers present. Continue maintaining current dietary habits."
        }
        HealthDomain::Gut => {
            "Good gut health indicators with opportunity for enhancing microbial diversity."
        }
        HealthDomain::Heart => {
            "Good cardiovascular health indicators with opportunities for optimization."
        }
    }
}

/// Presentation for any key. Total: unrecognized keys get a capitalized
/// label, a generic comment and the heart icon.
pub fn describe(key: &str) -> DomainPresentation {
    match DomainKey::parse(key) {
        DomainKey::Known(d) => DomainPresentation {
            id: d.as_str().to_string(),
            label: label(d).to_string(),
            icon: icon(d),
            comment: comment(d).to_string(),
        },
        DomainKey::Overall => DomainPresentation {
            id: "overall".to_string(),
            label: "Overall Health".to_string(),
            icon: HEART_ICON,
            comment: OVERALL_COMMENT.to_string(),
        },
        DomainKey::Unknown(raw) => DomainPresentation {
            label: format!("{} Health", capitalize(&raw)),
            comment: format!("Health markers for {} domain.", raw),
            id: raw,
            icon: HEART_ICON,
        },
    }
}

/// "gut" -> "Gut Health Details"
pub fn modal_title(key: &str) -> String {
    format!("{} Health Details", capitalize(key))
}

pub fn modal_error_title(key: &str) -> String {
    format!("{} Health Details (Error)", capitalize(key))
}

/// Headline shown on an analysis card for a status word.
pub fn status_label(status: &str) -> &'static str {
    match status {
        "good" => "Good Health Status",
        "warning" => "Needs Attention",
        "poor" => "Requires Improvement",
        "critical" => "Needs Immediate Action",
        _ => "Health Status",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_domains_have_fixed_labels() {
        assert_eq!(describe("gut").label, "Gut Health");
        assert_eq!(describe("AGING").label, "Aging");
        assert_eq!(describe("overall").label, "Overall Health");
        assert_eq!(describe("overall").comment, OVERALL_COMMENT);
    }

    #[test]
    fn unknown_key_gets_capitalized_default() {
        let p = describe("kidney");
        assert_eq!(p.id, "kidney");
        assert_eq!(p.label, "Kidney Health");
        assert_eq!(p.comment, "Health markers for kidney domain.");
        assert_eq!(p.icon, HEART_ICON);
    }

    #[test]
    fn every_domain_has_an_icon() {
        for d in HealthDomain::ALL {
            assert!(!icon(d).is_empty());
        }
        assert_eq!(icon(HealthDomain::Gut).len(), 5);
    }

    #[test]
    fn titles_and_status_labels() {
        assert_eq!(modal_title("gut"), "Gut Health Details");
        assert_eq!(modal_error_title("liver"), "Liver Health Details (Error)");
        assert_eq!(status_label("warning"), "Needs Attention");
        assert_eq!(status_label("excellent"), "Health Status");
    }
}
