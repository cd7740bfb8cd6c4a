//! Health domain identifiers.

use serde::{Deserialize, Serialize};
use std::fmt;

/// One of the six scored health domains.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthDomain {
    Gut,
    Liver,
    Heart,
    Skin,
    Cognitive,
    Aging,
}

impl HealthDomain {
    pub const ALL: [HealthDomain; 6] = [
        HealthDomain::Gut,
        HealthDomain::Liver,
        HealthDomain::Heart,
        HealthDomain::Skin,
        HealthDomain::Cognitive,
        HealthDomain::Aging,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            HealthDomain::Gut => "gut",
            HealthDomain::Liver => "liver",
            HealthDomain::Heart => "heart",
            HealthDomain::Skin => "skin",
            HealthDomain::Cognitive => "cognitive",
            HealthDomain::Aging => "aging",
        }
    }

    /// Backend numeric id (`/api/health-domains/{id}/...`).
    pub fn api_id(&self) -> u8 {
        match self {
            HealthDomain::Gut => 1,
            HealthDomain::Liver => 2,
            HealthDomain::Heart => 3,
            HealthDomain::Skin => 4,
            HealthDomain::Cognitive => 5,
            HealthDomain::Aging => 6,
        }
    }

    pub fn from_api_id(id: u8) -> Option<Self> {
        Self::ALL.into_iter().find(|d| d.api_id() == id)
    }

    /// Case-insensitive name lookup.
    pub fn parse(name: &str) -> Option<Self> {
        let name = name.trim().to_ascii_lowercase();
        Self::ALL.into_iter().find(|d| d.as_str() == name)
    }
}

impl fmt::Display for HealthDomain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A domain key as requested by the UI: one of the six domains, the
/// whole-customer "overall" view, or anything else.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum DomainKey {
    Known(HealthDomain),
    Overall,
    Unknown(String),
}

impl DomainKey {
    pub fn parse(raw: &str) -> Self {
        if raw.trim().eq_ignore_ascii_case("overall") {
            return DomainKey::Overall;
        }
        match HealthDomain::parse(raw) {
            Some(d) => DomainKey::Known(d),
            None => DomainKey::Unknown(raw.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            DomainKey::Known(d) => d.as_str(),
            DomainKey::Overall => "overall",
            DomainKey::Unknown(raw) => raw,
        }
    }

    pub fn is_data_request(&self) -> bool {
        !matches!(self, DomainKey::Unknown(_))
    }
}

impl fmt::Display for DomainKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// "gut" -> "Gut"
pub fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
