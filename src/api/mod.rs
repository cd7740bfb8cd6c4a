//! API resolution layer.
//!
//! Every data operation makes one attempt against the live backend and, where
//! the mock store has an equivalent, degrades to it on any failure. The
//! result always carries the source that served it; nothing here panics or
//! propagates an error past the `Resolved` boundary.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::PortalError;
use crate::model::{ClinicalTrial, DashboardData, DomainModal, RecommendationSet, TrialFilters, UserProfile};

pub mod client;
pub mod download;
pub mod resolver;
pub mod wire;

pub use client::HttpClient;
pub use download::{ReportKind, ReportService, SavedReport};
pub use resolver::ApiResolver;

/// Which path produced a result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Source {
    RealApi,
    MockFallback,
    ApiError,
}

impl Source {
    pub fn as_str(&self) -> &'static str {
        match self {
            Source::RealApi => "REAL_API",
            Source::MockFallback => "MOCK_FALLBACK",
            Source::ApiError => "API_ERROR",
        }
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of one data operation plus its provenance.
#[derive(Debug)]
pub struct Resolved<T> {
    pub outcome: Result<T, PortalError>,
    pub source: Source,
    /// Why the live call was abandoned, when it was.
    pub fallback_reason: Option<PortalError>,
}

impl<T> Resolved<T> {
    pub fn real(value: T) -> Self {
        Self {
            outcome: Ok(value),
            source: Source::RealApi,
            fallback_reason: None,
        }
    }

    pub fn fallback(value: T, reason: PortalError) -> Self {
        Self {
            outcome: Ok(value),
            source: Source::MockFallback,
            fallback_reason: Some(reason),
        }
    }

    pub fn failed(err: PortalError) -> Self {
        Self {
            outcome: Err(err),
            source: Source::ApiError,
            fallback_reason: None,
        }
    }

    pub fn is_ok(&self) -> bool {
        self.outcome.is_ok()
    }

    pub fn value(&self) -> Option<&T> {
        self.outcome.as_ref().ok()
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Resolved<U> {
        Resolved {
            outcome: self.outcome.map(f),
            source: self.source,
            fallback_reason: self.fallback_reason,
        }
    }

    /// The failure to surface to the user, if any: the hard error, or the
    /// reason the live call fell back.
    pub fn error_message(&self) -> Option<String> {
        match (&self.outcome, &self.fallback_reason) {
            (Err(e), _) => Some(e.to_string()),
            (Ok(_), Some(reason)) => Some(reason.to_string()),
            (Ok(_), None) => None,
        }
    }
}

/// Reply to the health-check probe.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthCheck {
    pub connected: bool,
}

/// Result of the background recommendation pre-generation call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrewarmSummary {
    pub success: bool,
    #[serde(default)]
    pub domains_processed: Option<u32>,
}

/// Data operations the state container depends on.
#[async_trait]
pub trait PortalBackend: Send + Sync {
    async fn health_check(&self) -> Resolved<HealthCheck>;
    async fn user_profile(&self, customer_id: u64) -> Resolved<UserProfile>;
    async fn dashboard(&self, customer_id: u64) -> Resolved<DashboardData>;
    /// Whole-customer view shaped like a domain modal.
    async fn overall_modal(&self, customer_id: u64) -> Resolved<DomainModal>;
    async fn domain_modal(&self, customer_id: u64, domain: &str) -> Resolved<DomainModal>;
    async fn recommendations(&self, customer_id: u64, domain: &str) -> Resolved<RecommendationSet>;
    /// Eligible trials for one domain.
    async fn domain_trials(&self, customer_id: u64, domain: &str) -> Resolved<Vec<ClinicalTrial>>;
    async fn trials(&self, filters: &TrialFilters) -> Resolved<Vec<ClinicalTrial>>;
    async fn prewarm_recommendations(&self, customer_id: u64) -> Result<PrewarmSummary, PortalError>;
}
