//! Report generation and saving.

use chrono::{DateTime, Utc};
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use super::client::HttpClient;
use crate::config::Config;
use crate::domain::HealthDomain;
use crate::error::DownloadError;
use crate::logging::{self, obj, v_str, Area, Level};

/// Anything shorter cannot be a real report.
pub const MIN_REPORT_BYTES: usize = 100;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReportKind {
    Full,
    Domains(Vec<HealthDomain>),
}

impl ReportKind {
    pub fn type_str(&self) -> &'static str {
        match self {
            ReportKind::Full => "full",
            ReportKind::Domains(_) => "domain",
        }
    }

    fn domain_names(&self) -> Vec<String> {
        match self {
            ReportKind::Full => Vec::new(),
            ReportKind::Domains(ds) => ds.iter().map(|d| d.as_str().to_string()).collect(),
        }
    }
}

#[derive(Debug, Serialize)]
struct ReportRequest {
    #[serde(rename = "type")]
    kind: &'static str,
    domains: Vec<String>,
    format: &'static str,
    customer_id: u64,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    detail: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SavedReport {
    pub filename: String,
    pub path: PathBuf,
    pub size: usize,
    pub content_type: Option<String>,
}

pub struct ReportService {
    http: HttpClient,
    dir: PathBuf,
}

impl ReportService {
    pub fn new(cfg: &Config) -> Self {
        Self {
            http: HttpClient::at(cfg, &cfg.reports_base),
            dir: PathBuf::from(&cfg.report_dir),
        }
    }

    pub fn with_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.dir = dir.as_ref().to_path_buf();
        self
    }

    /// Generate a report for `customer_id` and save it under the report
    /// directory.
    pub async fn download(&self, customer_id: Option<u64>, kind: &ReportKind) -> Result<SavedReport, DownloadError> {
        let customer_id = match customer_id {
            Some(id) if id > 0 => id,
            _ => return Err(DownloadError::MissingCustomer),
        };
        if matches!(kind, ReportKind::Domains(ds) if ds.is_empty()) {
            return Err(DownloadError::NoDomains);
        }

        let endpoint = format!("/api/customer/{}/reports/generate", customer_id);
        let body = ReportRequest {
            kind: kind.type_str(),
            domains: kind.domain_names(),
            format: "pdf",
            customer_id,
        };
        let resp = self
            .http
            .post(&endpoint)
            .header(CONTENT_TYPE, "application/json")
            .header(ACCEPT, "application/pdf, application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                log_failure(customer_id, &e.to_string());
                DownloadError::Network
            })?;

        let status = resp.status();
        if !status.is_success() {
            let detail = resp
                .json::<ErrorBody>()
                .await
                .ok()
                .and_then(|b| b.detail.or(b.message));
            let err = DownloadError::from_status(status.as_u16(), detail);
            log_failure(customer_id, &err.to_string());
            return Err(err);
        }

        let content_type = resp
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let bytes = resp.bytes().await.map_err(|_| DownloadError::Network)?;
        check_size(bytes.len())?;

        let filename = format!(
            "{}{}",
            report_basename(kind, customer_id, Utc::now()),
            extension_for(content_type.as_deref())
        );
        let path = self.dir.join(&filename);
        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|e| DownloadError::Save(e.to_string()))?;
        tokio::fs::write(&path, &bytes)
            .await
            .map_err(|e| DownloadError::Save(e.to_string()))?;

        logging::log(
            Level::Info,
            Area::Download,
            "report_saved",
            obj(&[
                ("customer_id", serde_json::json!(customer_id)),
                ("filename", v_str(&filename)),
                ("bytes", serde_json::json!(bytes.len())),
            ]),
        );
        Ok(SavedReport {
            filename,
            path,
            size: bytes.len(),
            content_type,
        })
    }
}

fn log_failure(customer_id: u64, msg: &str) {
    logging::log(
        Level::Error,
        Area::Download,
        "report_failed",
        obj(&[("customer_id", serde_json::json!(customer_id)), ("msg", v_str(msg))]),
    );
}

pub fn check_size(len: usize) -> Result<(), DownloadError> {
    if len == 0 {
        Err(DownloadError::Empty)
    } else if len < MIN_REPORT_BYTES {
        Err(DownloadError::Truncated)
    } else {
        Ok(())
    }
}

/// File extension for a response content type; pdf when unknown.
pub fn extension_for(content_type: Option<&str>) -> &'static str {
    let Some(ct) = content_type else {
        return ".pdf";
    };
    let ct = ct.to_ascii_lowercase();
    if ct.contains("excel") || ct.contains("spreadsheet") {
        ".xlsx"
    } else if ct.contains("csv") {
        ".csv"
    } else if ct.contains("zip") {
        ".zip"
    } else {
        ".pdf"
    }
}

pub fn report_basename(kind: &ReportKind, customer_id: u64, at: DateTime<Utc>) -> String {
    let date = at.format("%Y-%m-%d");
    let time = at.format("%H-%M-%S");
    match kind {
        ReportKind::Full => format!("mannbiome-full-report-{}-{}-{}", customer_id, date, time),
        ReportKind::Domains(_) => format!(
            "mannbiome-domain-report-{}-{}-{}-{}",
            kind.domain_names().join("-"),
            customer_id,
            date,
            time
        ),
    }
}
