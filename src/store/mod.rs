//! Mock patient store.
//!
//! A fixed table of synthetic patient records embedded in the binary. The
//! store is the fallback for every data operation the live backend can
//! serve, so each `get_*` operation mirrors a backend payload.
//!
//! `lookup` reports unknown customers explicitly. The `get_*` operations
//! substitute the default record instead and log the substitution.

use serde::Serialize;
use std::collections::BTreeMap;

use crate::config::DEFAULT_CUSTOMER_ID;
use crate::domain::{capitalize, HealthDomain};
use crate::error::PortalError;
use crate::logging::{self, log_substitution, obj, v_str, Area, Level, TimingScope};
use crate::model::{
    ClinicalNotes, CustomerInfo, DashboardData, DomainInfo, DomainModal, DomainScore, HealthData,
    HealthMetric, ModalMetadata, PatientRecord, RecommendationSet, ScoreSet, User, UserProfile,
};
use crate::transform::{build_carousel, round1};

const PATIENT_FILES: [(&str, &str); 3] = [
    ("john_doe.json", include_str!("../../data/patients/john_doe.json")),
    ("jane_smith.json", include_str!("../../data/patients/jane_smith.json")),
    ("mike_johnson.json", include_str!("../../data/patients/mike_johnson.json")),
];

const DEFAULT_RECOMMENDATIONS: &str = include_str!("../../data/default_recommendations.json");

pub const DOMAIN_DATA_SOURCE: &str = "PATIENT_DOMAIN_DATA_WITH_RECOMMENDATIONS";
pub const MICROBIOME_DATA_SOURCE: &str = "MOCK_DATA_SERVICE_WITH_RECOMMENDATIONS";

/// One row of the test-customer picker.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AvailableCustomer {
    pub id: u64,
    pub name: &'static str,
    pub status: &'static str,
    pub description: &'static str,
}

/// How a customer's profile differs from the others at a glance.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CustomerDifference {
    pub customer_id: u64,
    pub name: String,
    pub overall_score: f64,
    pub overall_status: String,
    pub aging_score: Option<f64>,
    pub aging_status: Option<String>,
    pub aging_bacteria_count: usize,
    pub aging_top_bacteria: String,
    pub concerning_bacteria_count: u32,
    pub total_bacteria: u32,
}

pub struct MockPatientStore {
    patients: BTreeMap<u64, PatientRecord>,
    default_record: PatientRecord,
    default_customer: u64,
    defaults: BTreeMap<HealthDomain, RecommendationSet>,
}

impl MockPatientStore {
    /// Decode the embedded dataset with the standard default customer.
    pub fn load() -> Result<Self, PortalError> {
        Self::load_with_default(DEFAULT_CUSTOMER_ID)
    }

    pub fn load_with_default(default_customer: u64) -> Result<Self, PortalError> {
        let mut patients = BTreeMap::new();
        for (file, raw) in PATIENT_FILES {
            let record: PatientRecord = serde_json::from_str(raw)
                .map_err(|e| PortalError::Dataset(format!("{}: {}", file, e)))?;
            patients.insert(record.customer_info.customer_id, record);
        }
        let defaults: BTreeMap<HealthDomain, RecommendationSet> =
            serde_json::from_str(DEFAULT_RECOMMENDATIONS)
                .map_err(|e| PortalError::Dataset(format!("default_recommendations.json: {}", e)))?;
        Self::new(patients, defaults, default_customer)
    }

    pub fn new(
        patients: BTreeMap<u64, PatientRecord>,
        defaults: BTreeMap<HealthDomain, RecommendationSet>,
        default_customer: u64,
    ) -> Result<Self, PortalError> {
        let default_record = patients
            .get(&default_customer)
            .cloned()
            .ok_or_else(|| PortalError::Dataset(format!("default customer {} missing", default_customer)))?;
        if !defaults.contains_key(&HealthDomain::Gut) {
            return Err(PortalError::Dataset("default recommendations lack gut".to_string()));
        }
        logging::log(
            Level::Debug,
            Area::Store,
            "loaded",
            obj(&[
                ("patients", serde_json::json!(patients.len())),
                ("default_customer", serde_json::json!(default_customer)),
            ]),
        );
        Ok(Self {
            patients,
            default_record,
            default_customer,
            defaults,
        })
    }

    pub fn default_customer(&self) -> u64 {
        self.default_customer
    }

    pub fn customer_ids(&self) -> Vec<u64> {
        self.patients.keys().copied().collect()
    }

    /// Exact lookup, no substitution.
    pub fn lookup(&self, customer_id: u64) -> Result<&PatientRecord, PortalError> {
        self.patients
            .get(&customer_id)
            .ok_or(PortalError::CustomerNotFound(customer_id))
    }

    /// The record for `customer_id`, or the default record.
    fn record(&self, customer_id: u64) -> &PatientRecord {
        match self.lookup(customer_id) {
            Ok(record) => record,
            Err(_) => {
                log_substitution(customer_id, self.default_customer);
                &self.default_record
            }
        }
    }

    pub fn get_customer_info(&self, customer_id: u64) -> &CustomerInfo {
        &self.record(customer_id).customer_info
    }

    pub fn get_user_profile(&self, customer_id: u64) -> UserProfile {
        let info = self.get_customer_info(customer_id);
        let mut parts = info.name.split(' ');
        let first_name = parts.next().unwrap_or_default().to_string();
        let last_name = parts.next().unwrap_or_default().to_string();
        UserProfile {
            user_id: customer_id,
            customer_id,
            username: Some(info.name.to_lowercase().replacen(' ', ".", 1)),
            email: info.email.clone(),
            first_name,
            last_name,
            full_name: info.name.clone(),
            initials: info.initials.clone(),
            report_id: info.report_id.clone(),
            created_at: Some("January 15, 2024".to_string()),
            last_updated: info.last_updated.clone(),
            status: Some("active".to_string()),
            age: Some(info.age),
        }
    }

    pub fn get_customer_clinical_notes(&self, customer_id: u64) -> Option<&ClinicalNotes> {
        self.record(customer_id).clinical_notes.as_ref()
    }

    /// The customer's own recommendations, else the curated default set for
    /// `domain` (gut when absent or unrecognized).
    pub fn get_customer_recommendations(&self, customer_id: u64, domain: Option<&str>) -> RecommendationSet {
        if let Some(own) = &self.record(customer_id).recommendations {
            return own.clone();
        }
        let domain = domain.and_then(HealthDomain::parse).unwrap_or(HealthDomain::Gut);
        self.default_recommendations(domain)
    }

    pub fn default_recommendations(&self, domain: HealthDomain) -> RecommendationSet {
        self.defaults
            .get(&domain)
            .or_else(|| self.defaults.get(&HealthDomain::Gut))
            .cloned()
            .unwrap_or_default()
    }

    /// Whole-customer view: every domain's bacteria pooled into one carousel.
    pub fn get_customer_microbiome_data(&self, customer_id: u64) -> DomainModal {
        let _t = TimingScope::new(Area::Transform, "microbiome_view");
        let record = self.record(customer_id);
        let info = &record.customer_info;
        let overall = &record.overall_health;

        let pooled: Vec<_> = record
            .domain_bacteria
            .iter()
            .flat_map(|(domain, data)| {
                data.bacteria.iter().cloned().map(move |mut b| {
                    b.domain = Some(*domain);
                    b
                })
            })
            .collect();

        DomainModal {
            success: true,
            domain_info: DomainInfo {
                domain_id: "microbiome".to_string(),
                domain_name: format!("Microbiome Analysis - {}", info.name),
                description: format!(
                    "Comprehensive bacterial analysis for {} (Customer {})",
                    info.name, customer_id
                ),
                score: overall.overall_score,
                diversity: overall.diversity_score,
                status: overall.status,
                comment: None,
            },
            health_metrics: vec![
                metric("Overall Health Score", overall.overall_score, "score", &format!("Overall microbiome health for {}", info.name)),
                metric("Diversity Score", overall.diversity_score, "index", "Bacterial diversity and richness indicator"),
                metric("Bacteria Analyzed", overall.total_bacteria_analyzed as f64, "count", "Total number of bacteria species identified"),
                metric("Concerning Bacteria", overall.concerning_bacteria as f64, "count", "Number of bacteria with concerning levels"),
            ],
            species_carousel: build_carousel(&pooled, "Overall Microbiome"),
            pathway_carousel: BTreeMap::new(),
            recommendations: record.recommendations.clone(),
            clinical_notes: record.clinical_notes.clone(),
            metadata: Some(ModalMetadata {
                customer_id: Some(customer_id),
                customer_name: Some(info.name.clone()),
                domain: None,
                participant_id: Some(info.participant_id.clone()),
                lab_name: Some(info.lab_name.clone()),
                upload_date: Some(info.upload_date.clone()),
                total_bacteria_count: Some(overall.total_bacteria_analyzed),
                data_source: Some(MICROBIOME_DATA_SOURCE.to_string()),
            }),
        }
    }

    /// Per-domain view. Unrecognized domain keys are served the gut data;
    /// the requested key is kept in `metadata.domain`.
    pub fn get_customer_domain_bacteria(&self, customer_id: u64, domain: &str) -> DomainModal {
        let _t = TimingScope::new(Area::Transform, "domain_view");
        let record = self.record(customer_id);
        let info = &record.customer_info;
        let served = match HealthDomain::parse(domain) {
            Some(d) if record.domain_bacteria.contains_key(&d) => d,
            _ => {
                logging::log(
                    Level::Warn,
                    Area::Store,
                    "domain_substituted",
                    obj(&[
                        ("customer_id", serde_json::json!(customer_id)),
                        ("domain", v_str(domain)),
                        ("msg", v_str("unrecognized domain, serving gut")),
                    ]),
                );
                HealthDomain::Gut
            }
        };
        let name = served.as_str();
        let title = format!("{} Health", capitalize(name));
        let (bacteria, scores) = match record.domain_bacteria.get(&served) {
            Some(data) => (data.bacteria.as_slice(), data.scores),
            None => (
                &[][..],
                ScoreSet {
                    diversity: record.overall_health.diversity_score,
                    overall: record.overall_health.overall_score,
                    status: record.overall_health.status,
                },
            ),
        };

        DomainModal {
            success: true,
            domain_info: DomainInfo {
                domain_id: name.to_string(),
                domain_name: format!("{} - {}", title, info.name),
                description: format!(
                    "Bacterial analysis for {} health in {} (Customer {})",
                    name, info.name, customer_id
                ),
                score: scores.overall,
                diversity: scores.diversity,
                status: scores.status,
                comment: None,
            },
            health_metrics: vec![
                metric(&format!("{} Score", capitalize(name)), scores.overall, "score", &format!("{} health score for {}", name, info.name)),
                metric("Diversity", scores.diversity, "index", &format!("Bacterial diversity in {} system", name)),
                metric("Bacteria Count", bacteria.len() as f64, "count", &format!("Number of {}-related bacteria analyzed", name)),
            ],
            species_carousel: build_carousel(bacteria, &title),
            pathway_carousel: BTreeMap::new(),
            recommendations: record.recommendations.clone(),
            clinical_notes: record.clinical_notes.clone(),
            metadata: Some(ModalMetadata {
                customer_id: Some(customer_id),
                customer_name: Some(info.name.clone()),
                domain: Some(domain.to_string()),
                data_source: Some(DOMAIN_DATA_SOURCE.to_string()),
                ..ModalMetadata::default()
            }),
        }
    }

    /// Dashboard payload built from the record: the six domain score sets
    /// with overall and diversity as one-decimal means.
    pub fn dashboard(&self, customer_id: u64) -> DashboardData {
        let record = self.record(customer_id);
        let info = &record.customer_info;
        let domains: BTreeMap<String, DomainScore> = record
            .domain_bacteria
            .iter()
            .map(|(d, data)| (d.as_str().to_string(), DomainScore::from(data.scores)))
            .collect();

        let n = domains.len().max(1) as f64;
        let mean_score = domains.values().map(|d| d.score).sum::<f64>() / n;
        let mean_diversity = domains.values().map(|d| d.diversity).sum::<f64>() / n;

        DashboardData {
            user: user_from_info(info),
            health_data: HealthData {
                diversity_score: round1(mean_diversity),
                overall_score: round1(mean_score),
                domains,
            },
        }
    }

    pub fn available_customers(&self) -> Vec<AvailableCustomer> {
        vec![
            AvailableCustomer {
                id: 3091,
                name: "John Doe",
                status: "poor",
                description: "Test customer with poor health indicators",
            },
            AvailableCustomer {
                id: 8420,
                name: "Jane Smith",
                status: "excellent",
                description: "Test customer with excellent health",
            },
            AvailableCustomer {
                id: 5500,
                name: "Mike Johnson",
                status: "mixed",
                description: "Test customer with mixed results",
            },
        ]
    }

    pub fn customer_differences(&self) -> Vec<CustomerDifference> {
        self.patients
            .iter()
            .map(|(id, record)| {
                let aging = record.domain_bacteria.get(&HealthDomain::Aging);
                CustomerDifference {
                    customer_id: *id,
                    name: record.customer_info.name.clone(),
                    overall_score: record.overall_health.overall_score,
                    overall_status: record.overall_health.status.as_str().to_string(),
                    aging_score: aging.map(|a| a.scores.overall),
                    aging_status: aging.map(|a| a.scores.status.as_str().to_string()),
                    aging_bacteria_count: aging.map(|a| a.bacteria.len()).unwrap_or(0),
                    aging_top_bacteria: aging
                        .and_then(|a| a.bacteria.first())
                        .map(|b| b.bacteria_name.clone())
                        .unwrap_or_else(|| "No data".to_string()),
                    concerning_bacteria_count: record.overall_health.concerning_bacteria,
                    total_bacteria: record.overall_health.total_bacteria_analyzed,
                }
            })
            .collect()
    }
}

pub fn user_from_info(info: &CustomerInfo) -> User {
    User {
        name: info.name.clone(),
        initials: info.initials.clone(),
        report_id: info.report_id.clone(),
        last_updated: info.last_updated.clone(),
    }
}

fn metric(label: &str, value: f64, unit: &str, description: &str) -> HealthMetric {
    HealthMetric {
        label: label.to_string(),
        value,
        unit: unit.to_string(),
        description: description.to_string(),
    }
}
