use std::sync::OnceLock;

use casedesk_wire::{JSON_MIME, SelectionResponse, parse_selection_response};
use reqwest::StatusCode;
use reqwest::header::ACCEPT;
use thiserror::Error;
use tracing::warn;

use crate::config::HttpConfig;

#[cfg(not(target_arch = "wasm32"))]
pub type FetchFuture = futures::future::BoxFuture<'static, Result<SelectionResponse, FetchError>>;
#[cfg(target_arch = "wasm32")]
pub type FetchFuture =
    futures::future::LocalBoxFuture<'static, Result<SelectionResponse, FetchError>>;

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("Unexpected response code: {0}")]
    UnexpectedStatus(StatusCode),
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),
    #[error("Parse error: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("Item source unavailable: {0}")]
    Unavailable(String),
}

/// Where the populator gets the two item partitions from.
pub trait ItemSource: Send + Sync {
    fn fetch(&self, url: String) -> FetchFuture;
}

/// Returns a shared reqwest client to reuse HTTP connections.
fn get_client() -> &'static reqwest::Client {
    static CLIENT: OnceLock<reqwest::Client> = OnceLock::new();
    CLIENT.get_or_init(reqwest::Client::new)
}

/// Fetches selections from the web application over HTTP.
#[derive(Debug, Clone)]
pub struct HttpItemSource {
    client: reqwest::Client,
    /// Prefixed to request URLs that are not absolute.
    base_url: Option<String>,
}

impl HttpItemSource {
    #[must_use]
    pub fn new(base_url: Option<String>) -> Self {
        Self {
            client: get_client().clone(),
            base_url,
        }
    }

    pub fn from_config(config: &HttpConfig) -> Result<Self, FetchError> {
        #[cfg(not(target_arch = "wasm32"))]
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_millis(config.timeout_ms))
            .user_agent(&config.user_agent)
            .build()?;
        #[cfg(target_arch = "wasm32")]
        let client = get_client().clone();
        Ok(Self {
            client,
            base_url: config.base_url.clone(),
        })
    }

    pub fn resolve(&self, url: &str) -> Result<String, FetchError> {
        if url.starts_with("http://") || url.starts_with("https://") {
            return Ok(url.to_string());
        }
        let base = self
            .base_url
            .as_deref()
            .ok_or_else(|| FetchError::Unavailable(format!("no base url to resolve {url}")))?;
        Ok(format!(
            "{}/{}",
            base.trim_end_matches('/'),
            url.trim_start_matches('/')
        ))
    }
}

impl ItemSource for HttpItemSource {
    fn fetch(&self, url: String) -> FetchFuture {
        let client = self.client.clone();
        let resolved = self.resolve(&url);
        Box::pin(async move {
            let resolved = resolved?;
            let response = client.get(&resolved).header(ACCEPT, JSON_MIME).send().await?;
            let status = response.status();
            if !status.is_success() {
                warn!("Unexpected response code {status} from {resolved}");
                return Err(FetchError::UnexpectedStatus(status));
            }
            let body = response.text().await?;
            Ok(parse_selection_response(&body)?)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_relative_urls() {
        let source = HttpItemSource::new(Some("http://localhost:8000/".to_string()));
        assert_eq!(
            source.resolve("/api/v1/caseselection/?product=7").unwrap(),
            "http://localhost:8000/api/v1/caseselection/?product=7"
        );
        assert_eq!(
            source.resolve("https://example.org/x").unwrap(),
            "https://example.org/x"
        );
    }

    #[test]
    fn relative_url_without_base_is_unavailable() {
        let source = HttpItemSource::new(None);
        assert!(matches!(
            source.resolve("/api/v1/caseselection/"),
            Err(FetchError::Unavailable(_))
        ));
    }
}
