//! Thin JSON client over reqwest. One attempt per call, no retry.

use reqwest::header::{ACCEPT, CONTENT_TYPE};
use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::time::Duration;

use crate::config::Config;
use crate::error::PortalError;
use crate::logging::{self, obj, v_str, Area, Level};

#[derive(Clone)]
pub struct HttpClient {
    client: Client,
    base: String,
}

impl HttpClient {
    pub fn new(cfg: &Config) -> Self {
        Self::at(cfg, &cfg.api_base)
    }

    /// Same timeout policy, rooted at another base URL.
    pub fn at(cfg: &Config, base: &str) -> Self {
        Self {
            client: Client::builder()
                .timeout(Duration::from_secs(cfg.request_timeout_secs))
                .build()
                .unwrap_or_else(|_| Client::new()),
            base: base.trim_end_matches('/').to_string(),
        }
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base, path)
    }

    /// Bare POST for callers that read the response themselves.
    pub fn post(&self, path: &str) -> RequestBuilder {
        self.client.post(self.url(path))
    }

    pub async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, PortalError> {
        let req = self.client.get(self.url(path));
        self.send_json(path, req).await
    }

    pub async fn post_json<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        path: &str,
        body: Option<&B>,
    ) -> Result<T, PortalError> {
        let mut req = self.client.post(self.url(path));
        if let Some(body) = body {
            req = req.json(body);
        }
        self.send_json(path, req).await
    }

    /// Status probe only; the body is ignored.
    pub async fn probe(&self, path: &str) -> Result<(), PortalError> {
        let resp = self.client.get(self.url(path)).send().await?;
        check_status(resp.status())
    }

    async fn send_json<T: DeserializeOwned>(&self, path: &str, req: RequestBuilder) -> Result<T, PortalError> {
        logging::log(
            Level::Trace,
            Area::Api,
            "request",
            obj(&[("path", v_str(path))]),
        );
        let resp = req
            .header(ACCEPT, "application/json")
            .header(CONTENT_TYPE, "application/json")
            .send()
            .await?;
        check_status(resp.status())?;
        let body = resp.text().await?;
        serde_json::from_str(&body).map_err(|e| PortalError::decode(path, e))
    }
}

fn check_status(status: reqwest::StatusCode) -> Result<(), PortalError> {
    if status.is_success() {
        return Ok(());
    }
    Err(PortalError::Status {
        status: status.as_u16(),
        reason: status.canonical_reason().unwrap_or("").to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn urls_join_on_the_configured_base() {
        let cfg = Config::default().with_api_base("http://backend.test:8001/");
        let client = HttpClient::new(&cfg);
        assert_eq!(client.url("/api/health-check"), "http://backend.test:8001/api/health-check");
    }

    #[test]
    fn reports_client_shares_policy_on_its_own_base() {
        let cfg = Config::default();
        let client = HttpClient::at(&cfg, "http://reports.test:8000/");
        assert_eq!(
            client.url("/api/customer/3091/reports/generate"),
            "http://reports.test:8000/api/customer/3091/reports/generate"
        );
    }

    #[test]
    fn non_success_status_is_typed() {
        let err = check_status(reqwest::StatusCode::SERVICE_UNAVAILABLE).unwrap_err();
        assert!(matches!(err, PortalError::Status { status: 503, .. }));
        assert!(check_status(reqwest::StatusCode::OK).is_ok());
    }
}
