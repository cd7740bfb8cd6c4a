//! Pure reducer: (AppState, Action) -> AppState
//!
//! Every state change goes through here. Transitions produced by async work
//! carry the generation they were started under and are dropped when a newer
//! customer or modal request has superseded them.

use std::collections::BTreeMap;

use super::state::{AppState, ModalContent, ModalState, Page};
use crate::model::{DashboardData, DomainScore, User};

#[derive(Debug, Clone, PartialEq)]
pub struct CustomerData {
    pub customer_id: u64,
    pub user_id: u64,
    pub username: String,
}

impl CustomerData {
    pub fn for_id(customer_id: u64) -> Self {
        Self {
            customer_id,
            user_id: customer_id,
            username: format!("customer_{}", customer_id),
        }
    }
}

/// Partial update; absent fields keep their value.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct HealthDataPatch {
    pub diversity_score: Option<f64>,
    pub overall_score: Option<f64>,
    pub domains: Option<BTreeMap<String, DomainScore>>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct UserPatch {
    pub name: Option<String>,
    pub initials: Option<String>,
    pub report_id: Option<String>,
    pub last_updated: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    SetActiveSection(String),
    SetCurrentPage(Page),
    /// Replaces the customer wholesale; supersedes all in-flight work.
    SetCustomerData(CustomerData),
    /// Starts a modal request. `fetch` marks a data fetch that will finish
    /// with `FinishModalFetch`.
    BeginModal { fetch: bool },
    OpenModal { content: ModalContent, title: String },
    CloseModal,
    FinishModalFetch { ticket: u64 },
    SetLoading(bool),
    SetError(Option<String>),
    UpdateHealthData(HealthDataPatch),
    UpdateUser(UserPatch),
    SetApiConnected(bool),
    LoadDashboardData(DashboardData),
    /// Apply `action` only while `generation` is the current customer.
    ForCustomer { generation: u64, action: Box<Action> },
    /// Apply `action` only while `ticket` is the current modal request.
    ForModal { ticket: u64, action: Box<Action> },
}

impl Action {
    pub fn name(&self) -> &'static str {
        match self {
            Action::SetActiveSection(_) => "SetActiveSection",
            Action::SetCurrentPage(_) => "SetCurrentPage",
            Action::SetCustomerData(_) => "SetCustomerData",
            Action::BeginModal { .. } => "BeginModal",
            Action::OpenModal { .. } => "OpenModal",
            Action::CloseModal => "CloseModal",
            Action::FinishModalFetch { .. } => "FinishModalFetch",
            Action::SetLoading(_) => "SetLoading",
            Action::SetError(_) => "SetError",
            Action::UpdateHealthData(_) => "UpdateHealthData",
            Action::UpdateUser(_) => "UpdateUser",
            Action::SetApiConnected(_) => "SetApiConnected",
            Action::LoadDashboardData(_) => "LoadDashboardData",
            Action::ForCustomer { action, .. } => action.name(),
            Action::ForModal { action, .. } => action.name(),
        }
    }

    pub fn for_customer(generation: u64, action: Action) -> Self {
        Action::ForCustomer {
            generation,
            action: Box::new(action),
        }
    }

    pub fn for_modal(ticket: u64, action: Action) -> Self {
        Action::ForModal {
            ticket,
            action: Box::new(action),
        }
    }
}

/// Output of a single reduction.
#[derive(Debug, Clone)]
pub struct ReducerOutput {
    pub state: AppState,
    /// False when a guarded action was stale and dropped.
    pub applied: bool,
}

/// Compute the next snapshot. The input snapshot is never modified.
pub fn reduce(state: &AppState, action: Action) -> ReducerOutput {
    let mut next = state.clone();
    let applied = apply(&mut next, action);
    if applied {
        next.seq += 1;
    }
    ReducerOutput { state: next, applied }
}

fn apply(state: &mut AppState, action: Action) -> bool {
    match action {
        Action::ForCustomer { generation, action } => {
            if generation != state.customer_generation {
                return false;
            }
            apply(state, *action)
        }
        Action::ForModal { ticket, action } => {
            if ticket != state.modal_generation {
                return false;
            }
            apply(state, *action)
        }
        Action::SetActiveSection(section) => {
            state.active_section = section;
            true
        }
        Action::SetCurrentPage(page) => {
            state.current_page = page;
            true
        }
        Action::SetCustomerData(data) => {
            state.customer_id = Some(data.customer_id);
            state.user_id = Some(data.user_id);
            state.username = Some(data.username);
            state.customer_generation += 1;
            state.modal_generation += 1;
            state.modal_fetch = None;
            true
        }
        Action::BeginModal { fetch } => {
            if state.modal_fetch.is_some() && !fetch {
                state.loading = false;
            }
            state.modal_generation += 1;
            state.modal_fetch = fetch.then_some(state.modal_generation);
            true
        }
        Action::OpenModal { content, title } => {
            state.modal = ModalState {
                is_open: true,
                content: Some(content),
                title,
            };
            true
        }
        Action::CloseModal => {
            if state.modal_fetch.take().is_some() {
                state.loading = false;
            }
            state.modal_generation += 1;
            state.modal = ModalState::default();
            true
        }
        Action::FinishModalFetch { ticket } => {
            if state.modal_fetch != Some(ticket) {
                return false;
            }
            state.modal_fetch = None;
            state.loading = false;
            true
        }
        Action::SetLoading(loading) => {
            state.loading = loading;
            true
        }
        Action::SetError(error) => {
            state.error = error;
            true
        }
        Action::UpdateHealthData(patch) => {
            if let Some(v) = patch.diversity_score {
                state.health_data.diversity_score = v;
            }
            if let Some(v) = patch.overall_score {
                state.health_data.overall_score = v;
            }
            if let Some(domains) = patch.domains {
                state.health_data.domains = domains;
            }
            true
        }
        Action::UpdateUser(patch) => {
            let User {
                name,
                initials,
                report_id,
                last_updated,
            } = &mut state.user;
            if let Some(v) = patch.name {
                *name = v;
            }
            if let Some(v) = patch.initials {
                *initials = v;
            }
            if let Some(v) = patch.report_id {
                *report_id = v;
            }
            if let Some(v) = patch.last_updated {
                *last_updated = v;
            }
            true
        }
        Action::SetApiConnected(connected) => {
            state.api_connected = connected;
            true
        }
        Action::LoadDashboardData(data) => {
            state.user = data.user;
            state.health_data = data.health_data;
            state.loading = false;
            state.error = None;
            true
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
