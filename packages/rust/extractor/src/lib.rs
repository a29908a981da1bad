//! Bounded PDF text extraction.
//!
//! This crate provides:
//! - [`events`]: a lazy [`ParseEvent`] sequence over a PDF document
//! - [`bounded`]: the page-ceiling accumulation loop
//! - [`PaperExtractor`]: downloads a PDF and runs both

pub mod bounded;
pub mod events;

use std::time::Duration;

use arxiv_assistant_shared::{AssistantError, DocumentsConfig, Result};
use bytes::{Bytes, BytesMut};
use reqwest::Client;
use tracing::{debug, info, instrument};

pub use bounded::{accumulate, page_separator};
pub use events::{ParseEvent, PdfEvents};

/// Largest PDF we are willing to download (50 MB).
const MAX_DOCUMENT_SIZE: u64 = 50 * 1024 * 1024;

/// Downloads paper PDFs and extracts their text up to a page ceiling.
#[derive(Debug, Clone)]
pub struct PaperExtractor {
    client: Client,
    timeout: Duration,
    max_bytes: u64,
}

impl PaperExtractor {
    /// Create an extractor on a shared HTTP client. The download timeout is
    /// applied per request.
    pub fn new(client: Client, config: &DocumentsConfig) -> Self {
        Self {
            client,
            timeout: Duration::from_secs(config.timeout_secs),
            max_bytes: MAX_DOCUMENT_SIZE,
        }
    }

    /// Download the document at `url` and extract at most `page_ceiling` pages of text.
    #[instrument(skip(self))]
    pub async fn extract(&self, url: &str, page_ceiling: u32) -> Result<String> {
        let bytes = self.fetch(url).await?;
        debug!(bytes = bytes.len(), "document downloaded");

        let content = tokio::task::spawn_blocking(move || {
            let events = PdfEvents::from_bytes(&bytes)?;
            debug!(pages = events.page_count(), page_ceiling, "document parsed");
            accumulate(events, page_ceiling)
        })
        .await
        .map_err(|e| AssistantError::Document(format!("extraction task failed: {e}")))??;

        info!(chars = content.len(), "document text extracted");
        Ok(content)
    }

    async fn fetch(&self, url: &str) -> Result<Bytes> {
        let mut response = self
            .client
            .get(url)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| AssistantError::Network(format!("{url}: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(AssistantError::Network(format!("{url}: HTTP {status}")));
        }

        let too_large = |len: u64| {
            AssistantError::validation(format!(
                "{url}: document too large ({len} bytes, max {})",
                self.max_bytes
            ))
        };

        if let Some(len) = response.content_length() {
            if len > self.max_bytes {
                return Err(too_large(len));
            }
        }

        // Chunked responses carry no length, so the cap is also enforced while reading.
        let mut buf = BytesMut::new();
        while let Some(chunk) = response
            .chunk()
            .await
            .map_err(|e| AssistantError::Network(format!("{url}: failed to read body: {e}")))?
        {
            buf.extend_from_slice(&chunk);
            if buf.len() as u64 > self.max_bytes {
                return Err(too_large(buf.len() as u64));
            }
        }
        Ok(buf.freeze())
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_pdf::build_pdf;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn extractor() -> PaperExtractor {
        PaperExtractor::new(Client::new(), &DocumentsConfig { timeout_secs: 5 })
    }

    #[tokio::test]
    async fn test_extract_stops_at_page_ceiling() {
        let server = MockServer::start().await;
        let pages: Vec<String> = (1..=8).map(|p| format!("Body{p}")).collect();
        let page_refs: Vec<&str> = pages.iter().map(String::as_str).collect();

        Mock::given(method("GET"))
            .and(path("/pdf/2402.01234v2"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(build_pdf(&page_refs)))
            .mount(&server)
            .await;

        let url = format!("{}/pdf/2402.01234v2", server.uri());
        let content = extractor().extract(&url, 5).await.unwrap();

        for page in 1..=5 {
            assert!(content.contains(&format!("---- Page {page} ----")));
            assert!(content.contains(&format!("Body{page}")));
        }
        for page in 6..=8 {
            assert!(!content.contains(&format!("---- Page {page} ----")));
            assert!(!content.contains(&format!("Body{page}")));
        }
    }

    #[tokio::test]
    async fn test_extract_http_error() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/pdf/missing"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let url = format!("{}/pdf/missing", server.uri());
        let err = extractor().extract(&url, 5).await.unwrap_err();
        assert!(matches!(err, AssistantError::Network(_)));
    }

    #[tokio::test]
    async fn test_extract_non_pdf_body() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/pdf/html"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>captcha</html>"))
            .mount(&server)
            .await;

        let url = format!("{}/pdf/html", server.uri());
        let err = extractor().extract(&url, 5).await.unwrap_err();
        assert!(matches!(err, AssistantError::Document(_)));
    }

    #[tokio::test]
    async fn test_extract_rejects_oversized_document() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/pdf/big"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(build_pdf(&["Body1"])))
            .mount(&server)
            .await;

        let url = format!("{}/pdf/big", server.uri());
        let small = PaperExtractor {
            max_bytes: 32,
            ..extractor()
        };
        let err = small.extract(&url, 5).await.unwrap_err();
        assert!(matches!(err, AssistantError::Validation { .. }));
        assert!(err.to_string().contains("too large"));
    }

    #[tokio::test]
    async fn test_extract_applies_request_timeout() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/pdf/slow"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_bytes(build_pdf(&["Body1"]))
                    .set_delay(Duration::from_secs(3)),
            )
            .mount(&server)
            .await;

        let url = format!("{}/pdf/slow", server.uri());
        let impatient = PaperExtractor {
            timeout: Duration::from_millis(200),
            ..extractor()
        };
        let err = impatient.extract(&url, 5).await.unwrap_err();
        assert!(matches!(err, AssistantError::Network(_)));
    }
}
