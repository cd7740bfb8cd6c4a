//! Application state snapshot.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::model::{DomainModal, HealthData, User};

pub const DEFAULT_SECTION: &str = "current-report";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Page {
    Report,
    ClinicalTrials,
}

impl Page {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "report" => Some(Page::Report),
            "clinical-trials" => Some(Page::ClinicalTrials),
            _ => None,
        }
    }
}

/// What the modal renders: fetched domain data, or an opaque pre-rendered
/// payload shown as-is.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "data", rename_all = "snake_case")]
pub enum ModalContent {
    Domain(Box<DomainModal>),
    Payload(String),
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ModalState {
    pub is_open: bool,
    pub content: Option<ModalContent>,
    pub title: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppState {
    pub customer_id: Option<u64>,
    pub user_id: Option<u64>,
    pub username: Option<String>,
    pub user: User,
    pub health_data: HealthData,
    pub modal: ModalState,
    pub active_section: String,
    pub current_page: Page,
    pub loading: bool,
    pub error: Option<String>,
    pub api_connected: bool,

    /// Bumped whenever the customer is replaced.
    pub customer_generation: u64,
    /// Bumped whenever a newer modal request supersedes older ones.
    pub modal_generation: u64,
    /// Ticket of the modal fetch currently in flight.
    pub modal_fetch: Option<u64>,
    /// Count of applied transitions.
    pub seq: u64,
}

impl Default for AppState {
    fn default() -> Self {
        Self::initial()
    }
}

impl AppState {
    /// Placeholder state shown before anything loads.
    pub fn initial() -> Self {
        Self {
            customer_id: None,
            user_id: None,
            username: None,
            user: User::placeholder(),
            health_data: HealthData::placeholder(),
            modal: ModalState::default(),
            active_section: DEFAULT_SECTION.to_string(),
            current_page: Page::Report,
            loading: true,
            error: None,
            api_connected: false,
            customer_generation: 0,
            modal_generation: 0,
            modal_fetch: None,
            seq: 0,
        }
    }

    /// Deterministic fingerprint of the snapshot.
    pub fn fingerprint(&self) -> String {
        let bytes = serde_json::to_vec(self).unwrap_or_default();
        hex::encode(Sha256::digest(&bytes))
    }
}
