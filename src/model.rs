//! Patient data model and the display-ready views derived from it.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::domain::HealthDomain;
use crate::transform::format_abundance;

// =============================================================================
// Enumerations
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Excellent,
    Good,
    Normal,
    Warning,
    Poor,
    Critical,
}

impl HealthStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            HealthStatus::Excellent => "excellent",
            HealthStatus::Good => "good",
            HealthStatus::Normal => "normal",
            HealthStatus::Warning => "warning",
            HealthStatus::Poor => "poor",
            HealthStatus::Critical => "critical",
        }
    }
}

/// Measured level relative to the optimal range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum MeasurementStatus {
    Low,
    Normal,
    High,
}

impl MeasurementStatus {
    pub fn as_lowercase(&self) -> &'static str {
        match self {
            MeasurementStatus::Low => "low",
            MeasurementStatus::Normal => "normal",
            MeasurementStatus::High => "high",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BacteriaCategory {
    Beneficial,
    Probiotic,
    Pathogen,
    Concerning,
    Neutral,
}

impl BacteriaCategory {
    pub fn is_beneficial(&self) -> bool {
        matches!(self, BacteriaCategory::Beneficial | BacteriaCategory::Probiotic)
    }

    pub fn is_harmful(&self) -> bool {
        matches!(self, BacteriaCategory::Pathogen | BacteriaCategory::Concerning)
    }
}

/// Strength of the evidence behind a bacterium's association claim.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EvidenceGrade {
    A,
    B,
    C,
}

// =============================================================================
// Stored records
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BacteriumMeasurement {
    pub msp_id: String,
    pub bacteria_name: String,
    pub full_name: String,
    /// Raw relative abundance.
    pub abundance: f64,
    /// Patient-friendly display value, e.g. "1.9 units".
    pub current_level: String,
    /// Fraction of optimal; may exceed 1.0.
    pub percentage: f64,
    #[serde(alias = "evidence_strength")]
    pub confidence_level: EvidenceGrade,
    pub status: MeasurementStatus,
    pub optimal_range: [f64; 2],
    pub category: BacteriaCategory,
    pub description: String,
    /// Set when measurements from several domains are pooled.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub domain: Option<HealthDomain>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoreSet {
    pub diversity: f64,
    pub overall: f64,
    pub status: HealthStatus,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DomainRecord {
    pub bacteria: Vec<BacteriumMeasurement>,
    pub scores: ScoreSet,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomerInfo {
    pub customer_id: u64,
    pub participant_id: String,
    pub name: String,
    pub initials: String,
    pub email: String,
    pub age: u32,
    pub report_id: String,
    pub lab_name: String,
    pub upload_date: String,
    pub last_updated: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OverallHealth {
    pub diversity_score: f64,
    pub overall_score: f64,
    pub status: HealthStatus,
    pub total_bacteria_analyzed: u32,
    pub concerning_bacteria: u32,
    pub beneficial_bacteria: u32,
    pub neutral_bacteria: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClinicalNotes {
    pub primary_concerns: Vec<String>,
    pub recommendations: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatientRecord {
    pub customer_info: CustomerInfo,
    pub domain_bacteria: BTreeMap<HealthDomain, DomainRecord>,
    pub overall_health: OverallHealth,
    #[serde(default)]
    pub clinical_notes: Option<ClinicalNotes>,
    #[serde(default)]
    pub recommendations: Option<RecommendationSet>,
}

// =============================================================================
// Recommendations
// =============================================================================

/// Priority is a rank in the curated sets and a label ("high") in the
/// generated ones.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Priority {
    Rank(u32),
    Label(String),
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RecommendationItem {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Curated items carry `title`; generated categories name the item by
    /// `item`, `activity`, `strain` or `source`.
    #[serde(alias = "name", alias = "item", alias = "activity", alias = "strain", alias = "source")]
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, alias = "amount", skip_serializing_if = "Option::is_none")]
    pub dosage: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frequency: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub implementation: Option<String>,
    #[serde(default, alias = "reason", skip_serializing_if = "Option::is_none")]
    pub rationale: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub evidence_level: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<Priority>,
    #[serde(default, alias = "recommended", skip_serializing_if = "Option::is_none")]
    pub is_recommended: Option<bool>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub benefits: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub key_strains: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub specific_foods: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub avoid_foods: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub techniques: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub routine: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub activities: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub protocol: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub food_sources: Vec<String>,
}

impl RecommendationItem {
    pub fn is_recommended(&self) -> bool {
        self.is_recommended.unwrap_or(false)
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct DomainSpecificRecommendations {
    #[serde(default)]
    pub supplements: Vec<String>,
    #[serde(default)]
    pub lifestyle: Vec<String>,
    #[serde(default)]
    pub diet: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RecommendationSet {
    #[serde(default)]
    pub probiotics: Vec<RecommendationItem>,
    #[serde(default)]
    pub supplements: Vec<RecommendationItem>,
    #[serde(default)]
    pub diet: Vec<RecommendationItem>,
    #[serde(default)]
    pub lifestyle: Vec<RecommendationItem>,
    #[serde(default)]
    pub dietary_recommendations: Vec<RecommendationItem>,
    #[serde(default)]
    pub lifestyle_recommendations: Vec<RecommendationItem>,
    #[serde(default)]
    pub probiotic_recommendations: Vec<RecommendationItem>,
    #[serde(default)]
    pub prebiotic_recommendations: Vec<RecommendationItem>,
    #[serde(default)]
    pub domain_specific: BTreeMap<String, DomainSpecificRecommendations>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
}

impl RecommendationSet {
    pub fn is_empty(&self) -> bool {
        self.probiotics.is_empty()
            && self.supplements.is_empty()
            && self.diet.is_empty()
            && self.lifestyle.is_empty()
            && self.dietary_recommendations.is_empty()
            && self.lifestyle_recommendations.is_empty()
            && self.probiotic_recommendations.is_empty()
            && self.prebiotic_recommendations.is_empty()
            && self.domain_specific.is_empty()
            && self.summary.is_none()
    }

    /// Domain-specific extras for `domain`, if the set has any.
    pub fn for_domain(&self, domain: &str) -> Option<&DomainSpecificRecommendations> {
        self.domain_specific.get(domain)
    }
}

// =============================================================================
// Profiles and dashboard
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    pub user_id: u64,
    pub customer_id: u64,
    #[serde(default)]
    pub username: Option<String>,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub full_name: String,
    pub initials: String,
    pub report_id: String,
    #[serde(default)]
    pub created_at: Option<String>,
    pub last_updated: String,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub age: Option<u32>,
}

/// Header identity shown on every page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub name: String,
    pub initials: String,
    pub report_id: String,
    pub last_updated: String,
}

impl User {
    pub fn placeholder() -> Self {
        Self {
            name: "Loading...".to_string(),
            initials: "L".to_string(),
            report_id: "Loading...".to_string(),
            last_updated: "Loading...".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DomainScore {
    pub score: f64,
    pub diversity: f64,
    pub status: HealthStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
}

impl From<ScoreSet> for DomainScore {
    fn from(s: ScoreSet) -> Self {
        Self {
            score: s.overall,
            diversity: s.diversity,
            status: s.status,
            comment: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthData {
    pub diversity_score: f64,
    pub overall_score: f64,
    pub domains: BTreeMap<String, DomainScore>,
}

impl HealthData {
    /// Fixed figures shown before anything has loaded and when every source
    /// has failed.
    pub fn placeholder() -> Self {
        let entry = |score, diversity, status| DomainScore {
            score,
            diversity,
            status,
            comment: None,
        };
        let domains = [
            ("liver", entry(2.8, 2.5, HealthStatus::Poor)),
            ("aging", entry(2.6, 2.4, HealthStatus::Poor)),
            ("skin", entry(2.9, 2.7, HealthStatus::Warning)),
            ("cognitive", entry(3.8, 3.2, HealthStatus::Good)),
            ("gut", entry(3.2, 3.0, HealthStatus::Good)),
            ("heart", entry(3.5, 3.0, HealthStatus::Good)),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect();
        Self {
            diversity_score: 2.8,
            overall_score: 3.5,
            domains,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DashboardData {
    pub user: User,
    pub health_data: HealthData,
}

// =============================================================================
// Domain modal view
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DomainInfo {
    pub domain_id: String,
    pub domain_name: String,
    pub description: String,
    pub score: f64,
    pub diversity: f64,
    pub status: HealthStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthMetric {
    pub label: String,
    pub value: f64,
    pub unit: String,
    #[serde(default)]
    pub description: String,
}

/// A level is either a display string or a raw number to be formatted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum LevelValue {
    Label(String),
    Amount(f64),
}

impl LevelValue {
    pub fn display(&self) -> String {
        match self {
            LevelValue::Label(s) => s.clone(),
            LevelValue::Amount(v) => format_abundance(*v),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpeciesEntry {
    pub name: String,
    #[serde(default)]
    pub scientific_name: String,
    pub current_level: LevelValue,
    #[serde(default)]
    pub optimal_level: f64,
    #[serde(default)]
    pub range_min: String,
    #[serde(default)]
    pub range_max: String,
    #[serde(default)]
    pub measurement_unit: String,
    pub status: String,
    #[serde(default)]
    pub is_beneficial: bool,
    pub percentage: f64,
    #[serde(default)]
    pub range_fill_width: f64,
    #[serde(default)]
    pub marker_position: f64,
    pub msp_id: String,
    #[serde(default)]
    pub evidence_strength: Option<EvidenceGrade>,
    #[serde(default)]
    pub description: Option<String>,
}

/// Carousel slide keys. Declaration order is display precedence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CarouselBucket {
    Pathogens,
    Probiotics,
    Virus,
    Fungi,
    Protozoa,
    Bacteria,
}

impl CarouselBucket {
    pub const PRECEDENCE: [CarouselBucket; 6] = [
        CarouselBucket::Pathogens,
        CarouselBucket::Probiotics,
        CarouselBucket::Virus,
        CarouselBucket::Fungi,
        CarouselBucket::Protozoa,
        CarouselBucket::Bacteria,
    ];

    pub fn default_title(&self) -> &'static str {
        match self {
            CarouselBucket::Bacteria => "Beneficial Species",
            CarouselBucket::Probiotics => "Probiotic Organisms",
            CarouselBucket::Virus => "Viral Species",
            CarouselBucket::Fungi => "Fungal Species",
            CarouselBucket::Pathogens => "Pathogenic Species",
            CarouselBucket::Protozoa => "Protozoa Species",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CarouselCategory {
    pub title: String,
    pub status: String,
    pub species: Vec<SpeciesEntry>,
}

pub type SpeciesCarousel = BTreeMap<CarouselBucket, CarouselCategory>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PathwayCard {
    pub title: String,
    pub status: String,
    #[serde(default)]
    pub metrics: Vec<HealthMetric>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ModalMetadata {
    #[serde(default)]
    pub customer_id: Option<u64>,
    #[serde(default)]
    pub customer_name: Option<String>,
    #[serde(default)]
    pub domain: Option<String>,
    #[serde(default)]
    pub participant_id: Option<String>,
    #[serde(default)]
    pub lab_name: Option<String>,
    #[serde(default)]
    pub upload_date: Option<String>,
    #[serde(default)]
    pub total_bacteria_count: Option<u32>,
    #[serde(default)]
    pub data_source: Option<String>,
}

fn yes() -> bool {
    true
}

/// Everything the domain detail view renders.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DomainModal {
    #[serde(default = "yes")]
    pub success: bool,
    pub domain_info: DomainInfo,
    #[serde(default)]
    pub health_metrics: Vec<HealthMetric>,
    pub species_carousel: SpeciesCarousel,
    #[serde(default)]
    pub pathway_carousel: BTreeMap<String, PathwayCard>,
    #[serde(default)]
    pub recommendations: Option<RecommendationSet>,
    #[serde(default)]
    pub clinical_notes: Option<ClinicalNotes>,
    #[serde(default)]
    pub metadata: Option<ModalMetadata>,
}

// =============================================================================
// Clinical trials
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClinicalTrial {
    pub trial_id: String,
    pub name: String,
    #[serde(default)]
    pub trial_code: Option<String>,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub vendor: String,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub clinical_status: Option<String>,
    #[serde(default)]
    pub participants: Option<u32>,
    #[serde(default)]
    pub max_participants: Option<u32>,
    #[serde(default)]
    pub duration: Option<String>,
    #[serde(default)]
    pub completion_percentage: Option<f64>,
    #[serde(default)]
    pub is_eligible: bool,
    #[serde(default)]
    pub eligibility_reason: Option<String>,
    #[serde(default)]
    pub key_findings: Option<String>,
    #[serde(default)]
    pub publication: Option<String>,
    #[serde(default)]
    pub publication_date: Option<String>,
}

/// Listing filters; `None` means "all".
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TrialFilters {
    #[serde(default)]
    pub search: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub phase: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn measurement_accepts_either_grade_field() {
        let raw = r#"{
            "msp_id": "msp_1908", "bacteria_name": "Lactobacillus casei",
            "full_name": "Lactobacillus casei", "abundance": 7.17e-8,
            "current_level": "0.5 units", "percentage": 0.478,
            "evidence_strength": "C", "status": "LOW",
            "optimal_range": [0.000001, 0.000002], "category": "probiotic",
            "description": "Liver detoxification support"
        }"#;
        let m: BacteriumMeasurement = serde_json::from_str(raw).unwrap();
        assert_eq!(m.confidence_level, EvidenceGrade::C);
        assert_eq!(m.status, MeasurementStatus::Low);
        assert!(m.domain.is_none());
    }

    #[test]
    fn measurement_rejects_unknown_status() {
        let raw = r#"{
            "msp_id": "x", "bacteria_name": "x", "full_name": "x", "abundance": 0.1,
            "current_level": "1", "percentage": 0.1, "confidence_level": "A",
            "status": "MEDIUM", "optimal_range": [0.0, 1.0], "category": "neutral",
            "description": ""
        }"#;
        assert!(serde_json::from_str::<BacteriumMeasurement>(raw).is_err());
    }

    #[test]
    fn recommendation_item_reads_legacy_and_generated_shapes() {
        let legacy: RecommendationItem = serde_json::from_str(
            r#"{"name": "CoQ10", "dosage": "100mg daily", "reason": "Energy production",
                "priority": 1, "recommended": true}"#,
        )
        .unwrap();
        assert_eq!(legacy.title, "CoQ10");
        assert_eq!(legacy.rationale.as_deref(), Some("Energy production"));
        assert_eq!(legacy.priority, Some(Priority::Rank(1)));
        assert!(legacy.is_recommended());

        let generated: RecommendationItem = serde_json::from_str(
            r#"{"item": "Fermented vegetables", "amount": "1 cup", "rationale": "Live cultures",
                "priority": "high"}"#,
        )
        .unwrap();
        assert_eq!(generated.dosage.as_deref(), Some("1 cup"));
        assert_eq!(generated.priority, Some(Priority::Label("high".into())));
        assert!(!generated.is_recommended());
    }

    #[test]
    fn carousel_keys_serialize_lowercase() {
        let mut carousel = SpeciesCarousel::new();
        carousel.insert(
            CarouselBucket::Bacteria,
            CarouselCategory {
                title: "t".into(),
                status: "No Data".into(),
                species: vec![],
            },
        );
        let v = serde_json::to_value(&carousel).unwrap();
        assert!(v.get("bacteria").is_some());
    }

    #[test]
    fn level_value_formats_numbers() {
        assert_eq!(LevelValue::Label("1.9 units".into()).display(), "1.9 units");
        assert_eq!(LevelValue::Amount(0.5).display(), "0.5000");
    }

    #[test]
    fn placeholder_health_data_covers_six_domains() {
        let hd = HealthData::placeholder();
        assert_eq!(hd.domains.len(), 6);
        assert_eq!(hd.domains["cognitive"].status, HealthStatus::Good);
    }
}
