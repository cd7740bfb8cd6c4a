use thiserror::Error;

/// Failure of a single data operation.
#[derive(Debug, Error)]
pub enum PortalError {
    #[error("network error: {0}")]
    Network(String),

    #[error("HTTP {status}: {reason}")]
    Status { status: u16, reason: String },

    #[error("unexpected response from {endpoint}: {message}")]
    Decode { endpoint: String, message: String },

    #[error("invalid domain: {0}")]
    InvalidDomain(String),

    #[error("customer {0} not found")]
    CustomerNotFound(u64),

    #[error("no customer selected")]
    NoCustomer,

    #[error("embedded dataset is malformed: {0}")]
    Dataset(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl PortalError {
    pub fn decode(endpoint: &str, err: impl std::fmt::Display) -> Self {
        PortalError::Decode {
            endpoint: endpoint.to_string(),
            message: err.to_string(),
        }
    }
}

impl From<reqwest::Error> for PortalError {
    fn from(err: reqwest::Error) -> Self {
        match err.status() {
            Some(status) => PortalError::Status {
                status: status.as_u16(),
                reason: status.canonical_reason().unwrap_or("").to_string(),
            },
            None if err.is_decode() => PortalError::Decode {
                endpoint: err.url().map(|u| u.path().to_string()).unwrap_or_default(),
                message: err.to_string(),
            },
            None => PortalError::Network(err.to_string()),
        }
    }
}

/// Report download failure, worded for display to the patient.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DownloadError {
    #[error("Session error. Please refresh the page and try again.")]
    MissingCustomer,

    #[error("Customer data not found. Please contact support.")]
    NotFound,

    #[error("Please select at least one domain")]
    NoDomains,

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Service temporarily unavailable. Please try again later.")]
    Unavailable,

    #[error("Server error occurred. Please try again or contact support.")]
    Server,

    #[error("{0}")]
    Rejected(String),

    #[error("Received empty report file")]
    Empty,

    #[error("Received file appears to be corrupted or incomplete")]
    Truncated,

    #[error("Network error. Please check your connection and try again.")]
    Network,

    #[error("Failed to save report: {0}")]
    Save(String),
}

impl DownloadError {
    /// Map a non-success status to its message. `detail` is the server's
    /// `detail`/`message` field when the error body was JSON.
    pub fn from_status(status: u16, detail: Option<String>) -> Self {
        let detail =
            detail.unwrap_or_else(|| format!("Failed to generate report (Error {})", status));
        match status {
            404 => DownloadError::NotFound,
            400 => DownloadError::InvalidRequest(detail),
            503 => DownloadError::Unavailable,
            s if s >= 500 => DownloadError::Server,
            _ => DownloadError::Rejected(detail),
        }
    }
}
