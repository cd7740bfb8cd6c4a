//! Live backend with mock-store fallback.

use async_trait::async_trait;
use futures_util::future::join;
use std::sync::Arc;
use url::form_urlencoded;

use crate::api::client::HttpClient;
use crate::api::wire::{
    CustomerInfoEnvelope, DashboardEnvelope, MicrobiomeEnvelope, ModalEnvelope, RecommendationsEnvelope,
    TrialsEnvelope,
};
use crate::api::{HealthCheck, PortalBackend, PrewarmSummary, Resolved};
use crate::config::Config;
use crate::domain::HealthDomain;
use crate::error::PortalError;
use crate::logging::{self, log_resolution, obj, v_str, Area, Level, TimingScope};
use crate::model::{ClinicalTrial, DashboardData, DomainModal, RecommendationSet, TrialFilters, UserProfile};
use crate::store::MockPatientStore;
use crate::transform::{eligible_trials, filter_trials};

pub struct ApiResolver {
    http: HttpClient,
    store: Arc<MockPatientStore>,
    trial_limit: u32,
}

impl ApiResolver {
    pub fn new(cfg: &Config, store: Arc<MockPatientStore>) -> Self {
        Self {
            http: HttpClient::new(cfg),
            store,
            trial_limit: cfg.trial_limit,
        }
    }

    /// Keep the live result, or fall back to the store and record why.
    fn settle<T>(
        &self,
        operation: &str,
        customer_id: u64,
        live: Result<T, PortalError>,
        fallback: impl FnOnce(&MockPatientStore) -> T,
    ) -> Resolved<T> {
        match live {
            Ok(value) => {
                log_resolution(operation, customer_id, "REAL_API", None);
                Resolved::real(value)
            }
            Err(err) => {
                log_resolution(operation, customer_id, "MOCK_FALLBACK", Some(&err.to_string()));
                Resolved::fallback(fallback(self.store.as_ref()), err)
            }
        }
    }

    /// No mock equivalent: a live failure is final.
    fn settle_live<T>(&self, operation: &str, customer_id: u64, live: Result<T, PortalError>) -> Resolved<T> {
        match live {
            Ok(value) => {
                log_resolution(operation, customer_id, "REAL_API", None);
                Resolved::real(value)
            }
            Err(err) => {
                log_resolution(operation, customer_id, "API_ERROR", Some(&err.to_string()));
                Resolved::failed(err)
            }
        }
    }

    fn recommendations_path(customer_id: u64, domain: &str) -> String {
        let query = form_urlencoded::Serializer::new(String::new())
            .append_pair("domain", domain)
            .append_pair("force_regenerate", "false")
            .finish();
        format!("/api/customer/{}/llm-recommendations?{}", customer_id, query)
    }

    async fn fetch_recommendations(&self, customer_id: u64, domain: &str) -> Result<RecommendationSet, PortalError> {
        let path = Self::recommendations_path(customer_id, domain);
        let env: RecommendationsEnvelope = self.http.get_json(&path).await?;
        env.into_set(&path)
    }

    async fn fetch_domain_modal(&self, customer_id: u64, domain: HealthDomain) -> Result<DomainModal, PortalError> {
        let path = format!("/api/health-domains/{}/modal-data/{}", domain.api_id(), customer_id);
        let (env, recs) = join(
            self.http.get_json::<ModalEnvelope>(&path),
            self.fetch_recommendations(customer_id, domain.as_str()),
        )
        .await;
        let mut modal = env?.into_modal(customer_id, domain);

        match recs {
            Ok(set) => modal.recommendations = Some(set),
            Err(err) => logging::log(
                Level::Warn,
                Area::Api,
                "recommendations_unavailable",
                obj(&[
                    ("customer_id", serde_json::json!(customer_id)),
                    ("domain", v_str(domain.as_str())),
                    ("msg", v_str(&err.to_string())),
                ]),
            ),
        }
        Ok(modal)
    }

    fn trials_query(filters: &TrialFilters) -> String {
        let mut query = form_urlencoded::Serializer::new(String::new());
        let pairs = [
            ("search", &filters.search),
            ("category", &filters.category),
            ("status", &filters.status),
            ("phase", &filters.phase),
        ];
        for (key, value) in pairs {
            match value.as_deref().map(str::trim) {
                Some(v) if !v.is_empty() && v != "all" => {
                    query.append_pair(key, v);
                }
                _ => {}
            }
        }
        query.finish()
    }
}

#[async_trait]
impl PortalBackend for ApiResolver {
    async fn health_check(&self) -> Resolved<HealthCheck> {
        let live = self.http.probe("/api/health-check").await;
        self.settle_live("health_check", 0, live.map(|_| HealthCheck { connected: true }))
    }

    async fn user_profile(&self, customer_id: u64) -> Resolved<UserProfile> {
        let _t = TimingScope::new(Area::Api, "user_profile");
        let live = self
            .http
            .get_json::<CustomerInfoEnvelope>(&format!("/api/customer/{}/info", customer_id))
            .await
            .map(UserProfile::from);
        self.settle("user_profile", customer_id, live, |s| s.get_user_profile(customer_id))
    }

    async fn dashboard(&self, customer_id: u64) -> Resolved<DashboardData> {
        let _t = TimingScope::new(Area::Api, "dashboard");
        let live = self
            .http
            .get_json::<DashboardEnvelope>(&format!("/api/customer/{}/dashboard-data", customer_id))
            .await
            .map(DashboardData::from);
        self.settle("dashboard", customer_id, live, |s| s.dashboard(customer_id))
    }

    async fn overall_modal(&self, customer_id: u64) -> Resolved<DomainModal> {
        let _t = TimingScope::new(Area::Api, "overall_modal");
        let live = self
            .http
            .get_json::<MicrobiomeEnvelope>(&format!("/api/customer/{}/microbiome-data", customer_id))
            .await
            .map(|env| env.into_overall_modal(customer_id));
        self.settle("overall_modal", customer_id, live, |s| {
            let mut modal = s.get_customer_microbiome_data(customer_id);
            modal.domain_info.domain_id = "overall".to_string();
            modal.recommendations = None;
            modal
        })
    }

    async fn domain_modal(&self, customer_id: u64, domain: &str) -> Resolved<DomainModal> {
        let _t = TimingScope::new(Area::Api, "domain_modal");
        let live = match HealthDomain::parse(domain) {
            Some(d) => self.fetch_domain_modal(customer_id, d).await,
            // no backend id to ask for
            None => Err(PortalError::InvalidDomain(domain.to_string())),
        };
        self.settle("domain_modal", customer_id, live, |s| {
            s.get_customer_domain_bacteria(customer_id, domain)
        })
    }

    async fn recommendations(&self, customer_id: u64, domain: &str) -> Resolved<RecommendationSet> {
        let live = self.fetch_recommendations(customer_id, domain).await;
        self.settle("recommendations", customer_id, live, |s| {
            s.get_customer_recommendations(customer_id, Some(domain))
        })
    }

    async fn domain_trials(&self, customer_id: u64, domain: &str) -> Resolved<Vec<ClinicalTrial>> {
        let Some(d) = HealthDomain::parse(domain) else {
            let err = PortalError::InvalidDomain(domain.to_string());
            log_resolution("domain_trials", customer_id, "API_ERROR", Some(&err.to_string()));
            return Resolved::failed(err);
        };
        let path = format!(
            "/api/health-domains/{}/clinical-trials?customer_id={}&limit={}",
            d.api_id(),
            customer_id,
            self.trial_limit
        );
        let live = match self.http.get_json::<TrialsEnvelope>(&path).await {
            Ok(env) => env.into_trials(&path).map(eligible_trials),
            Err(err) => Err(err),
        };
        self.settle_live("domain_trials", customer_id, live)
    }

    async fn trials(&self, filters: &TrialFilters) -> Resolved<Vec<ClinicalTrial>> {
        let query = Self::trials_query(filters);
        let path = if query.is_empty() {
            "/api/clinical-trials".to_string()
        } else {
            format!("/api/clinical-trials?{}", query)
        };
        let live = match self.http.get_json::<TrialsEnvelope>(&path).await {
            Ok(env) => env
                .into_trials(&path)
                .map(|all| filter_trials(&all, filters).into_iter().cloned().collect()),
            Err(err) => Err(err),
        };
        self.settle_live("trials", 0, live)
    }

    async fn prewarm_recommendations(&self, customer_id: u64) -> Result<PrewarmSummary, PortalError> {
        let path = format!("/api/customer/{}/generate-all-recommendations", customer_id);
        self.http.post_json::<(), PrewarmSummary>(&path, None).await
    }
}
