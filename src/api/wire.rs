//! Backend response schemas.
//!
//! Payloads are decoded strictly into these types and then converted into
//! the portal model. A payload missing a required field fails decoding with
//! `PortalError::Decode` rather than rendering placeholder values.

use serde::Deserialize;
use std::collections::BTreeMap;

use crate::catalog::OVERALL_COMMENT;
use crate::domain::HealthDomain;
use crate::error::PortalError;
use crate::model::{
    ClinicalTrial, DashboardData, DomainInfo, DomainModal, DomainScore, HealthData, HealthMetric,
    HealthStatus, ModalMetadata, PathwayCard, RecommendationSet, SpeciesCarousel, User, UserProfile,
};
use crate::transform::{empty_carousel, status_from_score};

// =============================================================================
// Dashboard
// =============================================================================

#[derive(Debug, Deserialize)]
pub struct DashboardEnvelope {
    pub dashboard_data: WireDashboard,
}

#[derive(Debug, Deserialize)]
pub struct WireDashboard {
    pub user: WireUser,
    pub health_data: WireHealthData,
}

#[derive(Debug, Deserialize)]
pub struct WireUser {
    pub full_name: String,
    pub initials: String,
    pub report_id: String,
    pub last_updated: String,
}

#[derive(Debug, Deserialize)]
pub struct WireHealthData {
    pub diversity_score: f64,
    pub overall_score: f64,
    pub domains: BTreeMap<String, DomainScore>,
}

impl From<DashboardEnvelope> for DashboardData {
    fn from(env: DashboardEnvelope) -> Self {
        let WireDashboard { user, health_data } = env.dashboard_data;
        let mut domains = health_data.domains;
        // a backend-provided "overall" wins over the synthesized one
        domains.entry("overall".to_string()).or_insert_with(|| DomainScore {
            score: health_data.overall_score,
            diversity: health_data.diversity_score,
            status: status_from_score(health_data.overall_score),
            comment: Some(OVERALL_COMMENT.to_string()),
        });
        DashboardData {
            user: User {
                name: user.full_name,
                initials: user.initials,
                report_id: user.report_id,
                last_updated: user.last_updated,
            },
            health_data: HealthData {
                diversity_score: health_data.diversity_score,
                overall_score: health_data.overall_score,
                domains,
            },
        }
    }
}

// =============================================================================
// Customer profile
// =============================================================================

#[derive(Debug, Deserialize)]
pub struct CustomerInfoEnvelope {
    pub customer_info: WireCustomerInfo,
}

/// Account fields from the customer database. Name and contact columns are
/// nullable there, so only the two ids are required.
#[derive(Debug, Deserialize)]
pub struct WireCustomerInfo {
    pub customer_id: u64,
    pub user_id: u64,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub full_name: Option<String>,
    #[serde(default)]
    pub initials: Option<String>,
    #[serde(default)]
    pub report_id: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default, alias = "updated_at")]
    pub last_updated: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub age: Option<u32>,
}

/// First letter of each name, upper-cased.
fn initials_of(first: &str, last: &str) -> String {
    [first, last]
        .iter()
        .filter_map(|n| n.trim().chars().next())
        .flat_map(char::to_uppercase)
        .collect()
}

impl From<CustomerInfoEnvelope> for UserProfile {
    fn from(env: CustomerInfoEnvelope) -> Self {
        let c = env.customer_info;
        let first_name = c.first_name.unwrap_or_default();
        let last_name = c.last_name.unwrap_or_default();
        let full_name = c
            .full_name
            .filter(|n| !n.trim().is_empty())
            .unwrap_or_else(|| format!("{} {}", first_name, last_name).trim().to_string());
        let initials = c
            .initials
            .filter(|i| !i.is_empty())
            .unwrap_or_else(|| initials_of(&first_name, &last_name));
        let last_updated = c
            .last_updated
            .or_else(|| c.created_at.clone())
            .unwrap_or_default();
        UserProfile {
            user_id: c.user_id,
            customer_id: c.customer_id,
            username: c.username,
            email: c.email.unwrap_or_default(),
            first_name,
            last_name,
            full_name,
            initials,
            report_id: c.report_id.unwrap_or_else(|| format!("MG{}", c.customer_id)),
            created_at: c.created_at,
            last_updated,
            status: c.status,
            age: c.age,
        }
    }
}

// =============================================================================
// Microbiome (overall) and domain modal
// =============================================================================

#[derive(Debug, Deserialize)]
pub struct MicrobiomeEnvelope {
    #[serde(default)]
    pub scores: Option<WireScores>,
    #[serde(default)]
    pub species_carousel: Option<SpeciesCarousel>,
}

#[derive(Debug, Deserialize)]
pub struct WireScores {
    pub overall_score: f64,
    pub diversity_score: f64,
}

impl MicrobiomeEnvelope {
    /// Overall pseudo-domain: scores default to 3.5 / 3.0, no pathways and
    /// no recommendations.
    pub fn into_overall_modal(self, customer_id: u64) -> DomainModal {
        let (score, diversity) = self
            .scores
            .map(|s| (s.overall_score, s.diversity_score))
            .unwrap_or((3.5, 3.0));
        DomainModal {
            success: true,
            domain_info: DomainInfo {
                domain_id: "overall".to_string(),
                domain_name: "Overall Health".to_string(),
                description: "Overall health summary across all domains".to_string(),
                score,
                diversity,
                status: status_from_score(score),
                comment: Some("Your overall microbiome health summary".to_string()),
            },
            health_metrics: Vec::new(),
            species_carousel: self.species_carousel.unwrap_or_else(empty_carousel),
            pathway_carousel: BTreeMap::new(),
            recommendations: None,
            clinical_notes: None,
            metadata: Some(ModalMetadata {
                customer_id: Some(customer_id),
                domain: Some("overall".to_string()),
                ..ModalMetadata::default()
            }),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct WireDomainInfo {
    pub domain_name: String,
    #[serde(default)]
    pub description: String,
    pub score: f64,
    pub diversity: f64,
    pub status: HealthStatus,
    #[serde(default)]
    pub comment: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum WirePathways {
    Keyed(BTreeMap<String, PathwayCard>),
    Listed(Vec<PathwayCard>),
}

#[derive(Debug, Deserialize)]
pub struct ModalEnvelope {
    #[serde(alias = "domain")]
    pub domain_info: WireDomainInfo,
    #[serde(default)]
    pub health_metrics: Vec<HealthMetric>,
    pub species_carousel: SpeciesCarousel,
    #[serde(default)]
    pub pathway_carousel: Option<WirePathways>,
}

impl ModalEnvelope {
    pub fn into_modal(self, customer_id: u64, domain: HealthDomain) -> DomainModal {
        let info = self.domain_info;
        let pathway_carousel = match self.pathway_carousel {
            Some(WirePathways::Keyed(map)) => map,
            Some(WirePathways::Listed(list)) => list
                .into_iter()
                .enumerate()
                .map(|(i, card)| (format!("pathway_{}", i), card))
                .collect(),
            None => BTreeMap::new(),
        };
        DomainModal {
            success: true,
            domain_info: DomainInfo {
                domain_id: domain.as_str().to_string(),
                domain_name: info.domain_name,
                description: info.description,
                score: info.score,
                diversity: info.diversity,
                status: info.status,
                comment: info.comment,
            },
            health_metrics: self.health_metrics,
            species_carousel: self.species_carousel,
            pathway_carousel,
            recommendations: None,
            clinical_notes: None,
            metadata: Some(ModalMetadata {
                customer_id: Some(customer_id),
                domain: Some(domain.as_str().to_string()),
                ..ModalMetadata::default()
            }),
        }
    }
}

// =============================================================================
// Recommendations and trials
// =============================================================================

#[derive(Debug, Deserialize)]
pub struct RecommendationsEnvelope {
    #[serde(default)]
    pub recommendations: Option<RecommendationSet>,
}

impl RecommendationsEnvelope {
    pub fn into_set(self, endpoint: &str) -> Result<RecommendationSet, PortalError> {
        self.recommendations
            .ok_or_else(|| PortalError::decode(endpoint, "recommendations missing"))
    }
}

#[derive(Debug, Deserialize)]
pub struct TrialsEnvelope {
    pub success: bool,
    #[serde(default)]
    pub trials: Vec<ClinicalTrial>,
    #[serde(default)]
    pub error: Option<String>,
}

impl TrialsEnvelope {
    pub fn into_trials(self, endpoint: &str) -> Result<Vec<ClinicalTrial>, PortalError> {
        if !self.success {
            let reason = self.error.unwrap_or_else(|| "backend reported failure".to_string());
            return Err(PortalError::decode(endpoint, reason));
        }
        Ok(self.trials)
    }
}
