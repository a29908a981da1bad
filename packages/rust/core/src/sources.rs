//! Seams between the coordinator and the network-facing crates.

use arxiv_assistant_discovery::ArxivClient;
use arxiv_assistant_extractor::PaperExtractor;
use arxiv_assistant_shared::{PaperRecord, Result};
use async_trait::async_trait;

/// Something that can find papers for a search query.
#[async_trait]
pub trait PaperSource: Send + Sync {
    async fn discover(&self, query: &str, max_results: usize) -> Result<Vec<PaperRecord>>;
}

/// Something that can turn a document URL into text.
#[async_trait]
pub trait ContentSource: Send + Sync {
    async fn extract(&self, url: &str, page_ceiling: u32) -> Result<String>;
}

#[async_trait]
impl PaperSource for ArxivClient {
    async fn discover(&self, query: &str, max_results: usize) -> Result<Vec<PaperRecord>> {
        ArxivClient::discover(self, query, max_results).await
    }
}

#[async_trait]
impl ContentSource for PaperExtractor {
    async fn extract(&self, url: &str, page_ceiling: u32) -> Result<String> {
        PaperExtractor::extract(self, url, page_ceiling).await
    }
}
