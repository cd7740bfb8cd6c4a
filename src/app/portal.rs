//! The portal container.
//!
//! Owns the single `AppState` and is the only writer to it. Async operations
//! capture the customer generation or modal ticket they start under and
//! route their completions through guarded actions, so a slow response for a
//! superseded request never overwrites newer state. The state lock is never
//! held across an await.

use std::sync::{Arc, Mutex};
use tokio::task::JoinHandle;

use super::reducer::{reduce, Action, CustomerData, HealthDataPatch, UserPatch};
use super::state::{AppState, ModalContent, Page};
use crate::api::{PortalBackend, ReportKind, ReportService, Resolved, SavedReport, Source};
use crate::catalog;
use crate::config::{Config, LaunchContext};
use crate::domain::{DomainKey, HealthDomain};
use crate::error::{DownloadError, PortalError};
use crate::logging::{self, log_transition, obj, v_str, Area, Level};
use crate::model::{ClinicalTrial, DashboardData, HealthData, RecommendationSet, TrialFilters};
use crate::store::{user_from_info, MockPatientStore};
use crate::transform::{self, AnalysisCard, DomainPerformance, ModalView};

/// How a modal request is served.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModalRequest {
    Domain(HealthDomain),
    Overall,
    /// Pre-rendered content shown as-is.
    Payload(String),
}

impl ModalRequest {
    /// Only the six domains and "overall" are data requests; anything else
    /// is an opaque payload.
    pub fn classify(content: &str) -> Self {
        match DomainKey::parse(content) {
            DomainKey::Known(d) => ModalRequest::Domain(d),
            DomainKey::Overall => ModalRequest::Overall,
            DomainKey::Unknown(_) => ModalRequest::Payload(content.to_string()),
        }
    }
}

pub struct Portal<B: PortalBackend + 'static> {
    backend: Arc<B>,
    store: Arc<MockPatientStore>,
    reports: ReportService,
    cfg: Config,
    state: Mutex<AppState>,
}

impl<B: PortalBackend + 'static> Portal<B> {
    pub fn new(backend: Arc<B>, store: Arc<MockPatientStore>, cfg: Config) -> Self {
        Self {
            backend,
            store,
            reports: ReportService::new(&cfg),
            cfg,
            state: Mutex::new(AppState::initial()),
        }
    }

    pub fn with_reports(mut self, reports: ReportService) -> Self {
        self.reports = reports;
        self
    }

    pub fn config(&self) -> &Config {
        &self.cfg
    }

    /// Current snapshot.
    pub fn state(&self) -> AppState {
        self.lock().clone()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, AppState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Apply one transition. Returns whether it was applied.
    pub fn dispatch(&self, action: Action) -> bool {
        let mut guard = self.lock();
        self.apply_locked(&mut guard, action)
    }

    fn apply_locked(&self, state: &mut AppState, action: Action) -> bool {
        let name = action.name();
        let out = reduce(state, action);
        *state = out.state;
        log_transition(name, out.applied, state.seq, || state.fingerprint());
        out.applied
    }

    fn current_customer(&self) -> Result<u64, PortalError> {
        self.lock().customer_id.ok_or(PortalError::NoCustomer)
    }

    // =========================================================================
    // Session lifecycle
    // =========================================================================

    /// Resolve the customer, start the background pre-warm, then load the
    /// dashboard. The returned handle belongs to the pre-warm task; nothing
    /// needs to await it.
    pub async fn initialize(&self, launch: &LaunchContext) -> JoinHandle<()> {
        let customer_id = launch.resolve_customer(self.cfg.default_customer_id);
        logging::log(
            Level::Info,
            Area::System,
            "session_start",
            obj(&[
                ("customer_id", serde_json::json!(customer_id)),
                ("from_launch", serde_json::json!(launch.customer.is_some())),
            ]),
        );
        self.dispatch(Action::SetCustomerData(CustomerData::for_id(customer_id)));
        let prewarm = self.spawn_prewarm(customer_id);
        self.load_dashboard().await;
        prewarm
    }

    /// Fire-and-forget recommendation pre-generation. Failures go to the log
    /// only.
    pub fn spawn_prewarm(&self, customer_id: u64) -> JoinHandle<()> {
        let backend = Arc::clone(&self.backend);
        tokio::spawn(async move {
            match backend.prewarm_recommendations(customer_id).await {
                Ok(summary) => logging::log(
                    Level::Info,
                    Area::Api,
                    "prewarm_done",
                    obj(&[
                        ("customer_id", serde_json::json!(customer_id)),
                        ("success", serde_json::json!(summary.success)),
                        ("domains_processed", serde_json::json!(summary.domains_processed)),
                    ]),
                ),
                Err(err) => logging::log(
                    Level::Warn,
                    Area::Api,
                    "prewarm_failed",
                    obj(&[
                        ("customer_id", serde_json::json!(customer_id)),
                        ("msg", v_str(&err.to_string())),
                    ]),
                ),
            }
        })
    }

    /// Replace the customer and reload the dashboard for them.
    pub async fn select_customer(&self, customer_id: u64) {
        self.dispatch(Action::SetCustomerData(CustomerData::for_id(customer_id)));
        self.load_dashboard().await;
    }

    /// Load dashboard data for the current customer. The UI is never left
    /// empty: fallback data is installed on any failure.
    pub async fn load_dashboard(&self) {
        let (generation, customer_id) = {
            let mut guard = self.lock();
            let generation = guard.customer_generation;
            let Some(customer_id) = guard.customer_id else {
                logging::log(
                    Level::Warn,
                    Area::State,
                    "dashboard_skipped",
                    obj(&[("msg", v_str("no customer selected"))]),
                );
                return;
            };
            self.apply_locked(&mut guard, Action::SetLoading(true));
            self.apply_locked(&mut guard, Action::SetError(None));
            (generation, customer_id)
        };

        let resolved = self.backend.dashboard(customer_id).await;
        let message = resolved.error_message();
        let source = resolved.source;
        let (data, connected) = match resolved.outcome {
            Ok(data) => (data, source == Source::RealApi),
            Err(_) => (self.fallback_dashboard(customer_id), false),
        };

        let mut guard = self.lock();
        let guarded = |a| Action::for_customer(generation, a);
        self.apply_locked(&mut guard, guarded(Action::LoadDashboardData(data)));
        if !connected {
            self.apply_locked(&mut guard, guarded(Action::SetError(message)));
        }
        self.apply_locked(&mut guard, guarded(Action::SetApiConnected(connected)));
    }

    /// Placeholder figures under the customer's own header.
    fn fallback_dashboard(&self, customer_id: u64) -> DashboardData {
        DashboardData {
            user: user_from_info(self.store.get_customer_info(customer_id)),
            health_data: HealthData::placeholder(),
        }
    }

    // =========================================================================
    // Modal
    // =========================================================================

    /// Open the modal. Domain and "overall" content is fetched; anything
    /// else is shown as given under `title`.
    pub async fn open_modal(&self, content: &str, title: &str) {
        match ModalRequest::classify(content) {
            ModalRequest::Domain(d) => self.fetch_modal(DomainKey::Known(d)).await,
            ModalRequest::Overall => self.fetch_modal(DomainKey::Overall).await,
            ModalRequest::Payload(payload) => {
                let mut guard = self.lock();
                self.apply_locked(&mut guard, Action::BeginModal { fetch: false });
                self.apply_locked(
                    &mut guard,
                    Action::OpenModal {
                        content: ModalContent::Payload(payload),
                        title: title.to_string(),
                    },
                );
            }
        }
    }

    /// Always fetch, whatever the key. Unknown keys are served the gut data.
    pub async fn open_domain_modal(&self, key: &str) {
        self.fetch_modal(DomainKey::parse(key)).await;
    }

    pub fn close_modal(&self) {
        self.dispatch(Action::CloseModal);
    }

    /// Display view of the open domain modal. `None` while closed or when a
    /// payload is showing.
    pub fn modal_view(&self) -> Option<ModalView> {
        let guard = self.lock();
        if !guard.modal.is_open {
            return None;
        }
        match &guard.modal.content {
            Some(ModalContent::Domain(modal)) => Some(transform::modal_view(&guard.modal.title, modal)),
            _ => None,
        }
    }

    async fn fetch_modal(&self, key: DomainKey) {
        let (ticket, customer_id) = {
            let mut guard = self.lock();
            self.apply_locked(&mut guard, Action::BeginModal { fetch: true });
            self.apply_locked(&mut guard, Action::SetLoading(true));
            (guard.modal_generation, guard.customer_id)
        };

        let resolved = match customer_id {
            None => Resolved::failed(PortalError::NoCustomer),
            Some(id) => match &key {
                DomainKey::Overall => self.backend.overall_modal(id).await,
                other => self.backend.domain_modal(id, other.as_str()).await,
            },
        };

        let name = key.as_str();
        let open = match resolved.outcome {
            // titled by what was served: an unknown key is served gut data
            Ok(modal) => Action::OpenModal {
                title: catalog::modal_title(&modal.domain_info.domain_id),
                content: ModalContent::Domain(Box::new(modal)),
            },
            Err(err) => {
                let who = customer_id.map(|id| id.to_string()).unwrap_or_else(|| "unknown".to_string());
                logging::log(
                    Level::Error,
                    Area::State,
                    "modal_failed",
                    obj(&[("domain", v_str(name)), ("msg", v_str(&err.to_string()))]),
                );
                Action::OpenModal {
                    content: ModalContent::Payload(format!("Error loading {} data for customer {}", name, who)),
                    title: catalog::modal_error_title(name),
                }
            }
        };

        let mut guard = self.lock();
        self.apply_locked(&mut guard, Action::for_modal(ticket, open));
        self.apply_locked(&mut guard, Action::FinishModalFetch { ticket });
    }

    // =========================================================================
    // Navigation and direct updates
    // =========================================================================

    pub fn set_active_section(&self, section: &str) {
        self.dispatch(Action::SetActiveSection(section.to_string()));
    }

    pub fn navigate_to_page(&self, page: Page) {
        self.dispatch(Action::SetCurrentPage(page));
    }

    pub fn set_loading(&self, loading: bool) {
        self.dispatch(Action::SetLoading(loading));
    }

    pub fn set_error(&self, error: Option<String>) {
        self.dispatch(Action::SetError(error));
    }

    pub fn update_health_data(&self, patch: HealthDataPatch) {
        self.dispatch(Action::UpdateHealthData(patch));
    }

    pub fn update_user(&self, patch: UserPatch) {
        self.dispatch(Action::UpdateUser(patch));
    }

    // =========================================================================
    // Data views for the current customer
    // =========================================================================

    pub async fn check_connection(&self) -> bool {
        self.backend.health_check().await.is_ok()
    }

    pub async fn recommendations(&self, domain: &str) -> Resolved<RecommendationSet> {
        match self.current_customer() {
            Ok(id) => self.backend.recommendations(id, domain).await,
            Err(err) => Resolved::failed(err),
        }
    }

    pub async fn domain_trials(&self, domain: &str) -> Resolved<Vec<ClinicalTrial>> {
        match self.current_customer() {
            Ok(id) => self.backend.domain_trials(id, domain).await,
            Err(err) => Resolved::failed(err),
        }
    }

    pub async fn trials(&self, filters: &TrialFilters) -> Resolved<Vec<ClinicalTrial>> {
        self.backend.trials(filters).await
    }

    pub async fn download_report(&self, kind: &ReportKind) -> Result<SavedReport, DownloadError> {
        let customer_id = self.lock().customer_id;
        self.reports.download(customer_id, kind).await
    }

    pub fn domain_performance(&self) -> DomainPerformance {
        transform::domain_performance(&self.lock().health_data)
    }

    pub fn analysis_cards(&self) -> Vec<AnalysisCard> {
        transform::analysis_cards(&self.lock().health_data)
    }
}
