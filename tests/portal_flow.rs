//! State container flows against an in-process backend whose responses can
//! be held back, so completion order is under test control.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use futures_util::future::join;
use tokio::sync::Notify;

use microbiome_portal::api::{HealthCheck, PortalBackend, PrewarmSummary, Resolved};
use microbiome_portal::app::{ModalContent, Page, Portal, UserPatch};
use microbiome_portal::config::{Config, LaunchContext};
use microbiome_portal::error::PortalError;
use microbiome_portal::model::{
    CarouselBucket, ClinicalTrial, DashboardData, DomainModal, RecommendationSet, TrialFilters, UserProfile,
};
use microbiome_portal::store::MockPatientStore;

/// Serves the embedded store, optionally parking calls on a named gate.
struct GatedBackend {
    store: Arc<MockPatientStore>,
    gates: Mutex<HashMap<String, Arc<Notify>>>,
    broken: Mutex<Vec<String>>,
    prewarmed: Mutex<Vec<u64>>,
}

impl GatedBackend {
    fn new(store: Arc<MockPatientStore>) -> Self {
        Self {
            store,
            gates: Mutex::new(HashMap::new()),
            broken: Mutex::new(Vec::new()),
            prewarmed: Mutex::new(Vec::new()),
        }
    }

    /// Hold calls for `key` until `release(key)`.
    fn hold(&self, key: &str) {
        self.gates.lock().unwrap().insert(key.to_string(), Arc::new(Notify::new()));
    }

    fn release(&self, key: &str) {
        if let Some(gate) = self.gates.lock().unwrap().get(key) {
            gate.notify_one();
        }
    }

    fn break_domain(&self, domain: &str) {
        self.broken.lock().unwrap().push(domain.to_string());
    }

    async fn pass(&self, key: &str) {
        let gate = self.gates.lock().unwrap().get(key).cloned();
        if let Some(gate) = gate {
            gate.notified().await;
        }
    }
}

#[async_trait]
impl PortalBackend for GatedBackend {
    async fn health_check(&self) -> Resolved<HealthCheck> {
        Resolved::real(HealthCheck { connected: true })
    }

    async fn user_profile(&self, customer_id: u64) -> Resolved<UserProfile> {
        Resolved::real(self.store.get_user_profile(customer_id))
    }

    async fn dashboard(&self, customer_id: u64) -> Resolved<DashboardData> {
        self.pass(&format!("dashboard:{}", customer_id)).await;
        Resolved::real(self.store.dashboard(customer_id))
    }

    async fn overall_modal(&self, customer_id: u64) -> Resolved<DomainModal> {
        self.pass("modal:overall").await;
        let mut modal = self.store.get_customer_microbiome_data(customer_id);
        modal.domain_info.domain_id = "overall".to_string();
        Resolved::real(modal)
    }

    async fn domain_modal(&self, customer_id: u64, domain: &str) -> Resolved<DomainModal> {
        self.pass(&format!("modal:{}", domain)).await;
        let broken = self.broken.lock().unwrap().iter().any(|d| d == domain);
        if broken {
            return Resolved::failed(PortalError::Status {
                status: 500,
                reason: "Internal Server Error".to_string(),
            });
        }
        Resolved::real(self.store.get_customer_domain_bacteria(customer_id, domain))
    }

    async fn recommendations(&self, customer_id: u64, domain: &str) -> Resolved<RecommendationSet> {
        Resolved::real(self.store.get_customer_recommendations(customer_id, Some(domain)))
    }

    async fn domain_trials(&self, _customer_id: u64, _domain: &str) -> Resolved<Vec<ClinicalTrial>> {
        Resolved::real(Vec::new())
    }

    async fn trials(&self, _filters: &TrialFilters) -> Resolved<Vec<ClinicalTrial>> {
        Resolved::real(Vec::new())
    }

    async fn prewarm_recommendations(&self, customer_id: u64) -> Result<PrewarmSummary, PortalError> {
        self.prewarmed.lock().unwrap().push(customer_id);
        Ok(PrewarmSummary {
            success: true,
            domains_processed: Some(6),
        })
    }
}

fn setup() -> (Arc<GatedBackend>, Portal<GatedBackend>) {
    let store = Arc::new(MockPatientStore::load().expect("embedded dataset"));
    let backend = Arc::new(GatedBackend::new(Arc::clone(&store)));
    let portal = Portal::new(Arc::clone(&backend), store, Config::default());
    (backend, portal)
}

fn modal_of(content: &Option<ModalContent>) -> &DomainModal {
    match content {
        Some(ModalContent::Domain(modal)) => &**modal,
        other => panic!("expected domain modal, got {:?}", other),
    }
}

#[tokio::test]
async fn initialize_uses_launch_customer_and_prewarms() {
    let (backend, portal) = setup();
    let prewarm = portal.initialize(&LaunchContext::parse("?customer=8420")).await;
    prewarm.await.unwrap();

    let s = portal.state();
    assert_eq!(s.customer_id, Some(8420));
    assert_eq!(s.username.as_deref(), Some("customer_8420"));
    assert_eq!(s.user.name, "Jane Smith");
    assert!(s.api_connected);
    assert!(!s.loading);
    assert!(s.error.is_none());
    assert_eq!(*backend.prewarmed.lock().unwrap(), vec![8420]);
}

#[tokio::test]
async fn initialize_without_launch_customer_uses_default() {
    let (_backend, portal) = setup();
    let prewarm = portal.initialize(&LaunchContext::default()).await;
    prewarm.await.unwrap();
    let s = portal.state();
    assert_eq!(s.customer_id, Some(3091));
    assert_eq!(s.user.name, "John Doe");
    assert_eq!(s.health_data.domains.len(), 6);
}

#[tokio::test]
async fn stale_dashboard_never_overwrites_newer_customer() {
    let (backend, portal) = setup();
    backend.hold("dashboard:8420");

    let slow = portal.select_customer(8420);
    let fast = async {
        portal.select_customer(5500).await;
        backend.release("dashboard:8420");
    };
    join(slow, fast).await;

    let s = portal.state();
    assert_eq!(s.customer_id, Some(5500));
    assert_eq!(s.user.name, "Mike Johnson");
    assert!(!s.loading);
}

#[tokio::test]
async fn modal_shows_loading_until_data_arrives() {
    let (backend, portal) = setup();
    portal.initialize(&LaunchContext::default()).await;
    backend.hold("modal:gut");

    let open = portal.open_modal("gut", "ignored");
    let observe = async {
        tokio::task::yield_now().await;
        let mid = portal.state();
        assert!(mid.loading);
        assert!(!mid.modal.is_open);
        backend.release("modal:gut");
    };
    join(open, observe).await;

    let s = portal.state();
    assert!(!s.loading);
    assert!(s.modal.is_open);
    assert_eq!(s.modal.title, "Gut Health Details");
    let modal = modal_of(&s.modal.content);
    assert_eq!(modal.domain_info.domain_id, "gut");
    assert_eq!(modal.species_carousel[&CarouselBucket::Bacteria].status, "Fair");
}

#[tokio::test]
async fn later_modal_request_wins() {
    let (backend, portal) = setup();
    portal.initialize(&LaunchContext::default()).await;
    backend.hold("modal:gut");

    let slow = portal.open_modal("gut", "");
    let fast = async {
        portal.open_modal("heart", "").await;
        backend.release("modal:gut");
    };
    join(slow, fast).await;

    let s = portal.state();
    assert_eq!(s.modal.title, "Heart Health Details");
    assert_eq!(modal_of(&s.modal.content).domain_info.domain_id, "heart");
    assert!(!s.loading);
}

#[tokio::test]
async fn closing_during_fetch_keeps_modal_closed() {
    let (backend, portal) = setup();
    portal.initialize(&LaunchContext::default()).await;
    backend.hold("modal:skin");

    let open = portal.open_modal("skin", "");
    let close = async {
        tokio::task::yield_now().await;
        portal.close_modal();
        assert!(!portal.state().loading);
        backend.release("modal:skin");
    };
    join(open, close).await;

    let s = portal.state();
    assert!(!s.modal.is_open);
    assert!(s.modal.content.is_none());
    assert!(!s.loading);
}

#[tokio::test]
async fn customer_switch_discards_pending_modal() {
    let (backend, portal) = setup();
    portal.initialize(&LaunchContext::default()).await;
    backend.hold("modal:liver");

    let open = portal.open_modal("liver", "");
    let switch = async {
        tokio::task::yield_now().await;
        portal.select_customer(8420).await;
        backend.release("modal:liver");
    };
    join(open, switch).await;

    let s = portal.state();
    assert_eq!(s.customer_id, Some(8420));
    assert!(!s.modal.is_open);
    assert!(!s.loading);
}

#[tokio::test]
async fn payload_modal_is_shown_verbatim() {
    let (_backend, portal) = setup();
    portal.initialize(&LaunchContext::default()).await;
    portal.open_modal("unknown-domain-xyz", "Notice").await;

    let s = portal.state();
    assert!(s.modal.is_open);
    assert_eq!(s.modal.title, "Notice");
    assert_eq!(
        s.modal.content,
        Some(ModalContent::Payload("unknown-domain-xyz".to_string()))
    );
}

#[tokio::test]
async fn domain_modal_with_unknown_key_serves_gut_data() {
    let (_backend, portal) = setup();
    portal.initialize(&LaunchContext::default()).await;
    portal.open_domain_modal("unknown-domain-xyz").await;

    let s = portal.state();
    assert!(s.modal.is_open);
    assert_eq!(s.modal.title, "Gut Health Details");
    let modal = modal_of(&s.modal.content);
    assert_eq!(modal.domain_info.domain_id, "gut");
    assert_eq!(
        modal.metadata.as_ref().and_then(|m| m.domain.as_deref()),
        Some("unknown-domain-xyz")
    );
}

#[tokio::test]
async fn failed_modal_opens_error_payload() {
    let (backend, portal) = setup();
    portal.initialize(&LaunchContext::default()).await;
    backend.break_domain("cognitive");
    portal.open_modal("cognitive", "").await;

    let s = portal.state();
    assert!(s.modal.is_open);
    assert!(!s.loading);
    assert_eq!(s.modal.title, "Cognitive Health Details (Error)");
    assert_eq!(
        s.modal.content,
        Some(ModalContent::Payload("Error loading cognitive data for customer 3091".to_string()))
    );
}

#[tokio::test]
async fn open_modal_renders_display_view() {
    let (_backend, portal) = setup();
    portal.initialize(&LaunchContext::default()).await;
    assert!(portal.modal_view().is_none());

    portal.open_modal("gut", "").await;
    let view = portal.modal_view().expect("domain modal view");
    assert_eq!(view.title, "Gut Health Details");
    assert_eq!(view.domain_id, "gut");
    assert!(!view.slides.is_empty());
    assert!(view.slides.windows(2).all(|w| w[0].bucket < w[1].bucket));
    assert_eq!(view.slides.last().map(|s| s.bucket), Some(CarouselBucket::Bacteria));
    assert!(view.slides.iter().flat_map(|s| &s.species).all(|row| !row.level.is_empty()));
    assert!(!view.recommendations.is_empty());
    assert!(view
        .recommendations
        .iter()
        .filter(|g| g.category == "probiotics")
        .flat_map(|g| &g.items)
        .all(|item| item.is_recommended()));

    portal.open_modal("<p>Terms</p>", "Terms").await;
    assert!(portal.modal_view().is_none());
}

#[tokio::test]
async fn direct_updates_and_navigation() {
    let (_backend, portal) = setup();
    portal.initialize(&LaunchContext::default()).await;

    portal.navigate_to_page(Page::ClinicalTrials);
    portal.set_active_section("recommendations");
    portal.update_user(UserPatch {
        name: Some("J. Doe".to_string()),
        ..UserPatch::default()
    });
    portal.set_error(Some("boom".to_string()));

    let s = portal.state();
    assert_eq!(s.current_page, Page::ClinicalTrials);
    assert_eq!(s.active_section, "recommendations");
    assert_eq!(s.user.name, "J. Doe");
    assert_eq!(s.user.initials, "JD");
    assert_eq!(s.error.as_deref(), Some("boom"));
}

#[tokio::test]
async fn views_over_loaded_dashboard() {
    let (_backend, portal) = setup();
    portal.initialize(&LaunchContext::with_customer(3091)).await;

    let perf = portal.domain_performance();
    assert_eq!(perf.good.len(), 2);
    assert_eq!(perf.needs_attention.len(), 3);
    assert!(perf.needs_attention.iter().all(|d| d.score <= perf.good[1].score));
    assert_eq!(portal.analysis_cards().len(), 6);

    let recs = portal.recommendations("gut").await;
    assert!(recs.is_ok());
    assert!(portal.check_connection().await);
}
