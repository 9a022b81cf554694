//! Text retrieval: the single point of entry for calls to the text service.
//!
//! One attempt per reference, cache first. No retries and no rate limiting: a failure is
//! reported to the caller, which substitutes a placeholder and moves on.
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use thiserror::Error;

use crate::logging::LogSink;
use crate::models::booklet::SourceDocument;

pub mod cache;

pub use cache::DiskCache;

pub const DEFAULT_TEXT_SERVICE_URL: &str = "https://www.sefaria.org/api/v3/texts";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("HTTP {0}")]
    Status(u16),

    #[error("text service error: {0}")]
    Api(String),

    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Source of text documents keyed by reference string.
///
/// Carried in `AppState` as `Arc<dyn TextSource>`; tests swap in in-memory fakes.
#[async_trait]
pub trait TextSource: Send + Sync {
    async fn fetch(&self, reference: &str) -> Result<SourceDocument, FetchError>;
}

#[derive(Debug, Deserialize)]
struct ServiceError {
    error: String,
}

/// Parses a response body, surfacing `{"error": "..."}` payloads as `FetchError::Api`.
pub fn parse_document(body: &str) -> Result<SourceDocument, FetchError> {
    if let Ok(ServiceError { error }) = serde_json::from_str::<ServiceError>(body) {
        return Err(FetchError::Api(error));
    }
    Ok(serde_json::from_str(body)?)
}

/// Client for a Sefaria-compatible texts API with an on-disk response cache.
#[derive(Clone)]
pub struct SefariaClient {
    client: Client,
    base_url: String,
    cache: DiskCache,
    log: Arc<dyn LogSink>,
}

impl SefariaClient {
    pub fn new(
        base_url: impl Into<String>,
        cache: DiskCache,
        log: Arc<dyn LogSink>,
    ) -> Result<Self, FetchError> {
        Ok(Self {
            client: Client::builder().timeout(REQUEST_TIMEOUT).build()?,
            base_url: base_url.into(),
            cache,
            log,
        })
    }

    fn url_for(&self, reference: &str) -> String {
        format!("{}/{}", self.base_url.trim_end_matches('/'), reference)
    }

    async fn fetch_remote(&self, reference: &str) -> Result<String, FetchError> {
        let response = self
            .client
            .get(self.url_for(reference))
            .query(&[("return_format", "text_only")])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status(status.as_u16()));
        }
        Ok(response.text().await?)
    }
}

#[async_trait]
impl TextSource for SefariaClient {
    async fn fetch(&self, reference: &str) -> Result<SourceDocument, FetchError> {
        if let Some(body) = self.cache.load(reference, self.log.as_ref()).await {
            match parse_document(&body) {
                Ok(doc) => {
                    self.log.info(&format!("Loading {reference} from cache"));
                    return Ok(doc);
                }
                Err(e) => {
                    self.log.warn(&format!(
                        "Error reading cache for {reference}: {e}, fetching from API"
                    ));
                    self.cache.evict(reference).await;
                }
            }
        }

        let body = self.fetch_remote(reference).await?;
        let doc = parse_document(&body)?;
        self.cache.store(reference, &body, self.log.as_ref()).await;
        Ok(doc)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logging::RecordingSink;

    #[test]
    fn test_parse_document_success() {
        let doc = parse_document(r#"{"title": "Berakhot", "versions": [{"text": ["a", "b"]}]}"#)
            .unwrap();
        assert_eq!(doc.segments(), vec!["a", "b"]);
    }

    #[test]
    fn test_parse_document_service_error() {
        let err = parse_document(r#"{"error": "Could not find title"}"#).unwrap_err();
        assert!(matches!(err, FetchError::Api(ref m) if m == "Could not find title"));
    }

    #[test]
    fn test_parse_document_malformed() {
        assert!(matches!(
            parse_document("not json"),
            Err(FetchError::Parse(_))
        ));
    }

    #[test]
    fn test_url_joins_base_and_reference() {
        let client = SefariaClient::new(
            "https://example.org/api/v3/texts/",
            DiskCache::new("unused"),
            Arc::new(RecordingSink::new()),
        )
        .unwrap();
        assert_eq!(
            client.url_for("Berakhot_3a"),
            "https://example.org/api/v3/texts/Berakhot_3a"
        );
    }

    #[tokio::test]
    async fn test_cache_hit_skips_network() {
        let dir = tempfile::tempdir().unwrap();
        let cache = DiskCache::new(dir.path());
        let log = Arc::new(RecordingSink::new());
        cache
            .store(
                "Berakhot_3a",
                r#"{"title": "Berakhot", "versions": [{"text": "cached"}]}"#,
                log.as_ref(),
            )
            .await;

        // Unroutable base URL: any network attempt would fail the test.
        let client = SefariaClient::new("http://127.0.0.1:9", cache, log.clone()).unwrap();
        let doc = client.fetch("Berakhot_3a").await.unwrap();
        assert_eq!(doc.segments(), vec!["cached"]);
    }

    #[tokio::test]
    async fn test_corrupt_cache_falls_back_to_network() {
        let dir = tempfile::tempdir().unwrap();
        let cache = DiskCache::new(dir.path());
        let log = Arc::new(RecordingSink::new());
        cache.store("Berakhot_3a", "{corrupt", log.as_ref()).await;

        let client = SefariaClient::new("http://127.0.0.1:9", cache.clone(), log.clone()).unwrap();
        let err = client.fetch("Berakhot_3a").await.unwrap_err();
        assert!(matches!(err, FetchError::Http(_)), "got {err:?}");
        assert!(log.warnings().iter().any(|w| w.contains("fetching from API")));
        assert_eq!(cache.load("Berakhot_3a", log.as_ref()).await, None);
    }
}
