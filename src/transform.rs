//! Pure derivations from stored records to display-ready views.
//!
//! Nothing here performs I/O; every function is deterministic over its input.

use serde::Serialize;

use crate::catalog;
use crate::model::{
    BacteriaCategory, BacteriumMeasurement, CarouselBucket, CarouselCategory, ClinicalTrial,
    DomainModal, DomainSpecificRecommendations, HealthData, HealthStatus, LevelValue,
    MeasurementStatus, RecommendationItem, RecommendationSet, SpeciesCarousel, SpeciesEntry,
    TrialFilters,
};

// =============================================================================
// Number formatting
// =============================================================================

/// Exponential notation with a signed exponent: 5e-7 -> "5.00e-7", 250 -> "2.50e+2".
pub fn exponential(value: f64, digits: usize) -> String {
    let raw = format!("{:.*e}", digits, value);
    match raw.split_once('e') {
        Some((mantissa, exp)) if !exp.starts_with('-') => format!("{}e+{}", mantissa, exp),
        _ => raw,
    }
}

/// Keeps small biological quantities legible.
pub fn format_abundance(value: f64) -> String {
    if value < 1e-6 {
        exponential(value, 2)
    } else if value < 1e-3 {
        format!("{:.6}", value)
    } else {
        format!("{:.4}", value)
    }
}

pub fn format_percentage(value: f64) -> String {
    if value < 0.001 {
        format!("{:.6}", value)
    } else if value < 0.01 {
        format!("{:.4}", value)
    } else {
        format!("{:.3}", value)
    }
}

pub fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

// =============================================================================
// Status derivation
// =============================================================================

/// Status band for a 0-5 score. Excellent and normal are only ever assigned
/// by the lab data itself.
pub fn status_from_score(score: f64) -> HealthStatus {
    if score >= 4.0 {
        HealthStatus::Good
    } else if score >= 3.0 {
        HealthStatus::Warning
    } else if score >= 2.0 {
        HealthStatus::Poor
    } else {
        HealthStatus::Critical
    }
}

/// Category word from the share of NORMAL members.
pub fn category_status(members: &[&BacteriumMeasurement]) -> &'static str {
    let total = members.len();
    if total == 0 {
        return "No Data";
    }
    let normal = members
        .iter()
        .filter(|b| b.status == MeasurementStatus::Normal)
        .count();
    // integer comparison keeps the 80/60/40 boundaries exact
    if normal * 10 >= total * 8 {
        "Excellent"
    } else if normal * 10 >= total * 6 {
        "Good"
    } else if normal * 10 >= total * 4 {
        "Fair"
    } else {
        "Poor"
    }
}

// =============================================================================
// Species carousel
// =============================================================================

pub fn bucket_for(category: BacteriaCategory) -> CarouselBucket {
    if category.is_harmful() {
        CarouselBucket::Pathogens
    } else if category == BacteriaCategory::Probiotic {
        CarouselBucket::Probiotics
    } else {
        CarouselBucket::Bacteria
    }
}

pub fn species_entry(b: &BacteriumMeasurement) -> SpeciesEntry {
    let [lo, hi] = b.optimal_range;
    SpeciesEntry {
        name: b.bacteria_name.clone(),
        scientific_name: b.full_name.clone(),
        current_level: LevelValue::Label(b.current_level.clone()),
        optimal_level: (lo + hi) / 2.0 * 1000.0,
        range_min: exponential(lo, 2),
        range_max: exponential(hi, 2),
        measurement_unit: "relative abundance".to_string(),
        status: b.status.as_lowercase().to_string(),
        is_beneficial: b.category.is_beneficial(),
        percentage: b.percentage,
        range_fill_width: (b.percentage * 0.8).clamp(0.0, 100.0),
        marker_position: (b.percentage * 0.85).clamp(0.0, 100.0),
        msp_id: b.msp_id.clone(),
        evidence_strength: Some(b.confidence_level),
        description: Some(b.description.clone()),
    }
}

/// Partition measurements into the bacteria / probiotics / pathogens
/// buckets. All three keys are always present; every input lands in
/// exactly one bucket, in input order.
pub fn build_carousel(bacteria: &[BacteriumMeasurement], title: &str) -> SpeciesCarousel {
    let mut carousel = SpeciesCarousel::new();
    let buckets = [
        (CarouselBucket::Bacteria, "Primary Bacteria"),
        (CarouselBucket::Probiotics, "Probiotic Species"),
        (CarouselBucket::Pathogens, "Concerning Species"),
    ];
    for (bucket, suffix) in buckets {
        let members: Vec<&BacteriumMeasurement> = bacteria
            .iter()
            .filter(|b| bucket_for(b.category) == bucket)
            .collect();
        carousel.insert(
            bucket,
            CarouselCategory {
                title: format!("{} - {}", title, suffix),
                status: category_status(&members).to_string(),
                species: members.into_iter().map(species_entry).collect(),
            },
        );
    }
    carousel
}

/// Non-empty categories in display precedence order.
pub fn carousel_slides(carousel: &SpeciesCarousel) -> Vec<(CarouselBucket, &CarouselCategory)> {
    CarouselBucket::PRECEDENCE
        .iter()
        .filter_map(|bucket| {
            carousel
                .get(bucket)
                .filter(|c| !c.species.is_empty())
                .map(|c| (*bucket, c))
        })
        .collect()
}

/// Six empty categories, used when the overall view has no carousel.
pub fn empty_carousel() -> SpeciesCarousel {
    let titled = |bucket: CarouselBucket, title: &str| {
        (
            bucket,
            CarouselCategory {
                title: title.to_string(),
                status: "Normal".to_string(),
                species: Vec::new(),
            },
        )
    };
    [
        titled(CarouselBucket::Bacteria, "Top Bacterial Species"),
        titled(CarouselBucket::Probiotics, "Probiotic Organisms"),
        titled(CarouselBucket::Pathogens, "Pathogenic Bacteria"),
        titled(CarouselBucket::Virus, "Viral Species"),
        titled(CarouselBucket::Fungi, "Fungal Species"),
        titled(CarouselBucket::Protozoa, "Protozoa Species"),
    ]
    .into_iter()
    .collect()
}

// =============================================================================
// Recommendations and trials
// =============================================================================

pub fn recommended_items(items: &[RecommendationItem]) -> Vec<&RecommendationItem> {
    items.iter().filter(|i| i.is_recommended()).collect()
}

fn contains_ci(haystack: &str, needle_lower: &str) -> bool {
    haystack.to_lowercase().contains(needle_lower)
}

pub fn filter_trials<'a>(trials: &'a [ClinicalTrial], filters: &TrialFilters) -> Vec<&'a ClinicalTrial> {
    let needle = filters
        .search
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_lowercase);
    let accepts = |want: &Option<String>, have: &Option<String>| match want.as_deref() {
        None | Some("all") => true,
        Some(w) => have.as_deref() == Some(w),
    };

    trials
        .iter()
        .filter(|t| match &needle {
            Some(n) => contains_ci(&t.name, n) || contains_ci(&t.description, n) || contains_ci(&t.vendor, n),
            None => true,
        })
        .filter(|t| accepts(&filters.category, &t.category))
        .filter(|t| accepts(&filters.status, &t.status))
        .filter(|t| accepts(&filters.phase, &t.clinical_status))
        .collect()
}

pub fn eligible_trials(trials: Vec<ClinicalTrial>) -> Vec<ClinicalTrial> {
    trials.into_iter().filter(|t| t.is_eligible).collect()
}

// =============================================================================
// Dashboard views
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedDomain {
    pub id: String,
    pub label: String,
    pub score: f64,
    pub status: HealthStatus,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DomainPerformance {
    pub good: Vec<RankedDomain>,
    pub needs_attention: Vec<RankedDomain>,
}

/// Best three "good" domains and worst three "poor"/"warning" domains.
pub fn domain_performance(data: &HealthData) -> DomainPerformance {
    let ranked: Vec<RankedDomain> = data
        .domains
        .iter()
        .filter(|(id, _)| id.as_str() != "overall")
        .map(|(id, d)| RankedDomain {
            id: id.clone(),
            label: catalog::describe(id).label,
            score: d.score,
            status: d.status,
        })
        .collect();

    let mut good: Vec<RankedDomain> = ranked
        .iter()
        .filter(|d| d.status == HealthStatus::Good)
        .cloned()
        .collect();
    good.sort_by(|a, b| b.score.total_cmp(&a.score));
    good.truncate(3);

    let mut needs_attention: Vec<RankedDomain> = ranked
        .into_iter()
        .filter(|d| matches!(d.status, HealthStatus::Poor | HealthStatus::Warning))
        .collect();
    needs_attention.sort_by(|a, b| a.score.total_cmp(&b.score));
    needs_attention.truncate(3);

    DomainPerformance { good, needs_attention }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalysisCard {
    pub id: String,
    pub title: String,
    pub score: String,
    pub diversity: String,
    pub status: HealthStatus,
    pub status_label: &'static str,
    pub comment: String,
}

pub fn analysis_cards(data: &HealthData) -> Vec<AnalysisCard> {
    data.domains
        .iter()
        .map(|(id, d)| {
            let presentation = catalog::describe(id);
            AnalysisCard {
                id: id.clone(),
                title: presentation.label,
                score: format!("{:.1}", d.score),
                diversity: format!("{:.1}", d.diversity),
                status: d.status,
                status_label: catalog::status_label(d.status.as_str()),
                comment: presentation.comment,
            }
        })
        .collect()
}

// =============================================================================
// Modal view
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SpeciesRow {
    pub name: String,
    pub msp_id: String,
    pub status: String,
    pub level: String,
    pub percentage: String,
    pub fill_width: f64,
    pub marker_position: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Slide {
    pub bucket: CarouselBucket,
    pub title: String,
    pub status: String,
    pub species: Vec<SpeciesRow>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecommendationGroup {
    pub category: &'static str,
    pub items: Vec<RecommendationItem>,
}

/// What the domain modal renders: formatted figures, carousel slides in
/// display order and the recommendations worth showing.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModalView {
    pub title: String,
    pub domain_id: String,
    pub domain_name: String,
    pub score: String,
    pub status: HealthStatus,
    pub slides: Vec<Slide>,
    pub recommendations: Vec<RecommendationGroup>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub domain_extras: Option<DomainSpecificRecommendations>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
}

/// A missing fill width renders half full.
pub fn species_row(entry: &SpeciesEntry) -> SpeciesRow {
    let fill = if entry.range_fill_width > 0.0 {
        entry.range_fill_width
    } else {
        50.0
    };
    SpeciesRow {
        name: entry.name.clone(),
        msp_id: entry.msp_id.clone(),
        status: entry.status.clone(),
        level: entry.current_level.display(),
        percentage: format_percentage(entry.percentage),
        fill_width: fill.min(100.0),
        marker_position: entry.marker_position.clamp(0.0, 100.0),
    }
}

pub fn slides(carousel: &SpeciesCarousel) -> Vec<Slide> {
    carousel_slides(carousel)
        .into_iter()
        .map(|(bucket, category)| Slide {
            bucket,
            title: if category.title.trim().is_empty() {
                bucket.default_title().to_string()
            } else {
                category.title.clone()
            },
            status: category.status.clone(),
            species: category.species.iter().map(species_row).collect(),
        })
        .collect()
}

/// Curated categories keep only flagged items; generated ones carry no flag
/// and are shown whole. Empty groups are dropped.
pub fn recommendation_groups(set: &RecommendationSet) -> Vec<RecommendationGroup> {
    let curated = [
        ("probiotics", &set.probiotics),
        ("supplements", &set.supplements),
        ("diet", &set.diet),
        ("lifestyle", &set.lifestyle),
    ];
    let generated = [
        ("dietary", &set.dietary_recommendations),
        ("lifestyle_plan", &set.lifestyle_recommendations),
        ("probiotic_strains", &set.probiotic_recommendations),
        ("prebiotics", &set.prebiotic_recommendations),
    ];
    let curated = curated
        .into_iter()
        .map(|(category, items)| (category, recommended_items(items).into_iter().cloned().collect::<Vec<_>>()));
    let generated = generated.into_iter().map(|(category, items)| (category, items.clone()));
    curated
        .chain(generated)
        .filter(|(_, items)| !items.is_empty())
        .map(|(category, items)| RecommendationGroup { category, items })
        .collect()
}

pub fn modal_view(title: &str, modal: &DomainModal) -> ModalView {
    let info = &modal.domain_info;
    let recs = modal.recommendations.as_ref();
    ModalView {
        title: title.to_string(),
        domain_id: info.domain_id.clone(),
        domain_name: info.domain_name.clone(),
        score: format!("{:.1}", info.score),
        status: info.status,
        slides: slides(&modal.species_carousel),
        recommendations: recs.map(recommendation_groups).unwrap_or_default(),
        domain_extras: recs.and_then(|r| r.for_domain(&info.domain_id)).cloned(),
        summary: recs.and_then(|r| r.summary.clone()),
    }
}
