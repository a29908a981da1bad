//! arXiv paper discovery.
//!
//! Sends the formulated search query to the arXiv Atom API and maps the feed
//! entries to [`PaperRecord`]s. The feed's relevance order is preserved and no
//! further ranking or deduplication is applied.

mod parser;

use std::time::Duration;

use arxiv_assistant_shared::{ArxivConfig, AssistantError, PaperRecord, Result};
use reqwest::{Client, Response};
use tracing::{debug, info, instrument};

/// Default timeout in seconds for arXiv API requests.
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Maximum response size we consider valid (10 MB).
const MAX_RESPONSE_SIZE: u64 = 10 * 1024 * 1024;

// ---------------------------------------------------------------------------
// Discovery options
// ---------------------------------------------------------------------------

/// Configuration for the arXiv client.
#[derive(Debug, Clone)]
pub struct DiscoveryOptions {
    /// arXiv API query endpoint.
    pub base_url: String,
    /// Timeout for HTTP requests in seconds.
    pub timeout_secs: u64,
}

impl Default for DiscoveryOptions {
    fn default() -> Self {
        Self::from(&ArxivConfig::default())
    }
}

impl From<&ArxivConfig> for DiscoveryOptions {
    fn from(config: &ArxivConfig) -> Self {
        Self {
            base_url: config.base_url.clone(),
            timeout_secs: if config.timeout_secs == 0 {
                DEFAULT_TIMEOUT_SECS
            } else {
                config.timeout_secs
            },
        }
    }
}

// ---------------------------------------------------------------------------
// ArxivClient
// ---------------------------------------------------------------------------

/// Client for the arXiv search API.
#[derive(Debug, Clone)]
pub struct ArxivClient {
    client: Client,
    base_url: String,
    timeout: Duration,
    max_bytes: u64,
}

impl ArxivClient {
    /// Build a client on top of a shared `reqwest::Client`.
    ///
    /// The timeout from `opts` is applied per request, so the pool can be
    /// shared with other clients that use different limits.
    pub fn new(client: Client, opts: &DiscoveryOptions) -> Self {
        Self {
            client,
            base_url: opts.base_url.clone(),
            timeout: Duration::from_secs(opts.timeout_secs),
            max_bytes: MAX_RESPONSE_SIZE,
        }
    }

    /// Search arXiv for `query` and return at most `max_results` papers.
    ///
    /// A non-success status or a malformed feed is a hard error.
    #[instrument(skip(self), fields(base = %self.base_url))]
    pub async fn discover(&self, query: &str, max_results: usize) -> Result<Vec<PaperRecord>> {
        let search_query = format!("all:{query}");
        let max_param = max_results.to_string();

        info!(max_results, "querying arXiv");

        let response = self
            .client
            .get(&self.base_url)
            .query(&[
                ("search_query", search_query.as_str()),
                ("start", "0"),
                ("max_results", max_param.as_str()),
            ])
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| AssistantError::Network(format!("{}: {e}", self.base_url)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(AssistantError::Network(format!(
                "arXiv API returned HTTP {status}"
            )));
        }

        let body = self.read_body(response).await?;

        let mut records = parser::parse_feed(&body)?;
        if records.len() > max_results {
            debug!(
                returned = records.len(),
                max_results,
                "feed exceeded requested size, truncating"
            );
            records.truncate(max_results);
        }

        info!(papers = records.len(), "arXiv search complete");
        Ok(records)
    }

    /// Read the feed body, enforcing the size cap whether or not the server
    /// sent a `Content-Length`.
    async fn read_body(&self, mut response: Response) -> Result<String> {
        let too_large = |len: u64| {
            AssistantError::validation(format!(
                "arXiv response too large ({len} bytes, max {})",
                self.max_bytes
            ))
        };

        if let Some(len) = response.content_length() {
            if len > self.max_bytes {
                return Err(too_large(len));
            }
        }

        let mut buf = Vec::new();
        while let Some(chunk) = response
            .chunk()
            .await
            .map_err(|e| AssistantError::Network(format!("failed to read arXiv response: {e}")))?
        {
            buf.extend_from_slice(&chunk);
            if buf.len() as u64 > self.max_bytes {
                return Err(too_large(buf.len() as u64));
            }
        }

        String::from_utf8(buf)
            .map_err(|e| AssistantError::parse(format!("arXiv response is not UTF-8: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn fixture() -> String {
        std::fs::read_to_string("../../../fixtures/atom/arxiv-feed.xml").expect("read atom fixture")
    }

    fn client_for(server: &MockServer) -> ArxivClient {
        let opts = DiscoveryOptions {
            base_url: format!("{}/api/query", server.uri()),
            timeout_secs: 5,
        };
        ArxivClient::new(Client::new(), &opts)
    }

    #[tokio::test]
    async fn test_discover_sends_expected_query() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/api/query"))
            .and(query_param("search_query", "all:transformer efficiency"))
            .and(query_param("start", "0"))
            .and(query_param("max_results", "3"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string(fixture())
                    .insert_header("content-type", "application/atom+xml"),
            )
            .expect(1)
            .mount(&server)
            .await;

        let papers = client_for(&server)
            .discover("transformer efficiency", 3)
            .await
            .unwrap();

        assert_eq!(papers.len(), 3);
        assert_eq!(papers[0].link, "http://arxiv.org/abs/2402.01234v2");
        assert_eq!(papers[2].title, "Quantized Inference for Large Language Models");
    }

    #[tokio::test]
    async fn test_discover_truncates_to_ceiling() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/api/query"))
            .respond_with(ResponseTemplate::new(200).set_body_string(fixture()))
            .mount(&server)
            .await;

        let papers = client_for(&server).discover("anything", 2).await.unwrap();
        assert_eq!(papers.len(), 2);
        assert_eq!(papers[0].title, "Efficient Transformers via Sparse Attention");
        assert_eq!(papers[1].title, "Linear-Time Sequence Models & Their Limits");
    }

    #[tokio::test]
    async fn test_discover_http_error_is_fatal() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/api/query"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let err = client_for(&server).discover("anything", 3).await.unwrap_err();
        assert!(matches!(err, AssistantError::Network(_)));
        assert!(err.to_string().contains("503"));
    }

    #[tokio::test]
    async fn test_discover_malformed_feed() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/api/query"))
            .respond_with(
                ResponseTemplate::new(200).set_body_string("<feed><entry><title>x</entry>"),
            )
            .mount(&server)
            .await;

        let err = client_for(&server).discover("anything", 3).await.unwrap_err();
        assert!(matches!(err, AssistantError::Parse { .. }));
    }

    #[tokio::test]
    async fn test_discover_empty_feed() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/api/query"))
            .respond_with(ResponseTemplate::new(200).set_body_string(
                r#"<?xml version="1.0"?><feed xmlns="http://www.w3.org/2005/Atom"></feed>"#,
            ))
            .mount(&server)
            .await;

        let papers = client_for(&server).discover("nothing", 3).await.unwrap();
        assert!(papers.is_empty());
    }

    #[tokio::test]
    async fn test_discover_rejects_oversized_feed() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/api/query"))
            .respond_with(ResponseTemplate::new(200).set_body_string(fixture()))
            .mount(&server)
            .await;

        let client = ArxivClient {
            max_bytes: 64,
            ..client_for(&server)
        };
        let err = client.discover("anything", 3).await.unwrap_err();
        assert!(matches!(err, AssistantError::Validation { .. }));
        assert!(err.to_string().contains("too large"));
    }

    #[tokio::test]
    async fn test_discover_applies_request_timeout() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/api/query"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string(fixture())
                    .set_delay(Duration::from_secs(3)),
            )
            .mount(&server)
            .await;

        let client = ArxivClient {
            timeout: Duration::from_millis(200),
            ..client_for(&server)
        };
        let err = client.discover("anything", 3).await.unwrap_err();
        assert!(matches!(err, AssistantError::Network(_)));
    }
}
