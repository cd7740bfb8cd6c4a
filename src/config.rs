//! Environment configuration and launch context.

use url::Url;

pub const DEFAULT_CUSTOMER_ID: u64 = 3091;

#[derive(Debug, Clone)]
pub struct Config {
    pub api_base: String,
    pub reports_base: String,
    pub default_customer_id: u64,
    pub request_timeout_secs: u64,
    pub report_dir: String,
    pub trial_limit: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_base: "http://127.0.0.1:8001".to_string(),
            reports_base: "http://127.0.0.1:8001".to_string(),
            default_customer_id: DEFAULT_CUSTOMER_ID,
            request_timeout_secs: 10,
            report_dir: "./reports".to_string(),
            trial_limit: 5,
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        Self::from_vars(|key| std::env::var(key).ok())
    }

    /// Build from any variable source; unset or unparsable values keep
    /// their defaults.
    pub fn from_vars(var: impl Fn(&str) -> Option<String>) -> Self {
        let api_base = normalize_base(&var("PORTAL_API_BASE").unwrap_or_else(|| "http://127.0.0.1:8001".to_string()));
        Self {
            reports_base: var("PORTAL_REPORTS_BASE").map(|b| normalize_base(&b)).unwrap_or_else(|| api_base.clone()),
            api_base,
            default_customer_id: var("PORTAL_DEFAULT_CUSTOMER").and_then(|v| v.parse().ok()).unwrap_or(DEFAULT_CUSTOMER_ID),
            request_timeout_secs: var("PORTAL_REQUEST_TIMEOUT_SECS").and_then(|v| v.parse().ok()).unwrap_or(10),
            report_dir: var("PORTAL_REPORT_DIR").unwrap_or_else(|| "./reports".to_string()),
            trial_limit: var("PORTAL_TRIAL_LIMIT").and_then(|v| v.parse().ok()).unwrap_or(5),
        }
    }

    /// Same configuration pointed at another backend.
    pub fn with_api_base(mut self, base: &str) -> Self {
        let base = normalize_base(base);
        self.reports_base = base.clone();
        self.api_base = base;
        self
    }
}

/// Base URLs are joined with paths that start with '/'.
fn normalize_base(raw: &str) -> String {
    raw.trim().trim_end_matches('/').to_string()
}

/// Where the session was launched from. Only the `customer` query parameter
/// is meaningful.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LaunchContext {
    pub customer: Option<String>,
}

impl LaunchContext {
    /// Accepts a full URL (`https://host/report?customer=8420`) or a bare
    /// query string (`?customer=8420` / `customer=8420`).
    pub fn parse(raw: &str) -> Self {
        let raw = raw.trim();
        let url = Url::parse(raw).or_else(|_| {
            let query = raw.trim_start_matches('?');
            Url::parse(&format!("http://launch.local/?{}", query))
        });
        let customer = url.ok().and_then(|u| {
            u.query_pairs()
                .find(|(k, _)| k == "customer")
                .map(|(_, v)| v.into_owned())
        });
        Self { customer }
    }

    pub fn with_customer(id: u64) -> Self {
        Self {
            customer: Some(id.to_string()),
        }
    }

    /// The customer id this launch selects. Missing or non-numeric values
    /// resolve to `default`.
    pub fn resolve_customer(&self, default: u64) -> u64 {
        self.customer
            .as_deref()
            .and_then(|c| c.trim().parse::<u64>().ok())
            .filter(|id| *id > 0)
            .unwrap_or(default)
    }
}
