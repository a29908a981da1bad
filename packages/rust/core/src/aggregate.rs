//! Per-paper extraction with failure isolation, and the aggregated document.

use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};

use arxiv_assistant_shared::{AggregatedDocument, ExtractedContent, PaperRecord, Result};
use futures::future::join_all;
use tracing::{info, instrument, warn};

use crate::progress::ProgressReporter;
use crate::sources::ContentSource;

const BLOCK_RULE: &str = "------------------------------";

/// How papers are extracted.
#[derive(Debug, Clone, Copy)]
pub struct ExtractionOptions {
    /// Highest page number kept per document.
    pub page_ceiling: u32,
    /// Extract all papers at once instead of one after another.
    pub concurrent: bool,
}

impl Default for ExtractionOptions {
    fn default() -> Self {
        Self {
            page_ceiling: 5,
            concurrent: true,
        }
    }
}

/// Await `work`; on failure, log it and fall back to empty text.
pub async fn collect_or_default<F>(paper: PaperRecord, work: F) -> ExtractedContent
where
    F: Future<Output = Result<String>>,
{
    match work.await {
        Ok(text) => ExtractedContent {
            paper,
            text,
            failure: None,
        },
        Err(e) => {
            warn!(title = %paper.title, link = %paper.link, error = %e, "paper extraction failed, continuing with empty content");
            ExtractedContent {
                paper,
                text: String::new(),
                failure: Some(e.to_string()),
            }
        }
    }
}

async fn extract_one(
    source: &dyn ContentSource,
    paper: &PaperRecord,
    opts: &ExtractionOptions,
    settled: &AtomicUsize,
    total: usize,
    progress: &dyn ProgressReporter,
) -> ExtractedContent {
    let url = paper.pdf_url();
    let content = collect_or_default(paper.clone(), source.extract(&url, opts.page_ceiling)).await;
    let current = settled.fetch_add(1, Ordering::Relaxed) + 1;
    progress.paper_extracted(&content.paper.title, !content.is_failed(), current, total);
    content
}

/// Extract every paper. The output keeps the order of `papers`.
pub async fn extract_all(
    source: &dyn ContentSource,
    papers: &[PaperRecord],
    opts: &ExtractionOptions,
    progress: &dyn ProgressReporter,
) -> Vec<ExtractedContent> {
    let total = papers.len();
    let settled = AtomicUsize::new(0);

    if opts.concurrent {
        join_all(
            papers
                .iter()
                .map(|paper| extract_one(source, paper, opts, &settled, total, progress)),
        )
        .await
    } else {
        let mut contents = Vec::with_capacity(total);
        for paper in papers {
            contents.push(extract_one(source, paper, opts, &settled, total, progress).await);
        }
        contents
    }
}

/// Format one paper as a delimited block.
pub fn render_block(content: &ExtractedContent) -> String {
    let paper = &content.paper;
    format!(
        "{BLOCK_RULE}\nTitle: {}\nAuthors: {}\nSummary: {}\nContent:\n{}\n{BLOCK_RULE}",
        paper.title,
        paper.authors.join(", "),
        paper.summary,
        content.text
    )
}

/// Join blocks in order, separated by a blank line.
pub fn render_document(contents: &[ExtractedContent]) -> AggregatedDocument {
    AggregatedDocument(
        contents
            .iter()
            .map(render_block)
            .collect::<Vec<_>>()
            .join("\n\n"),
    )
}

/// Extract every paper and build the aggregated document.
#[instrument(skip_all, fields(papers = papers.len()))]
pub async fn aggregate(
    source: &dyn ContentSource,
    papers: &[PaperRecord],
    opts: &ExtractionOptions,
    progress: &dyn ProgressReporter,
) -> AggregatedDocument {
    let contents = extract_all(source, papers, opts, progress).await;
    let failed = contents.iter().filter(|c| c.is_failed()).count();
    info!(failed, "papers aggregated");
    render_document(&contents)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex;
    use std::time::Duration;

    use arxiv_assistant_shared::AssistantError;
    use async_trait::async_trait;

    use crate::progress::SilentProgress;

    /// Serves canned text per URL, with an optional per-URL delay.
    struct CannedContent {
        responses: HashMap<String, (u64, std::result::Result<String, String>)>,
        calls: Mutex<Vec<String>>,
    }

    impl CannedContent {
        fn new(entries: &[(&str, u64, std::result::Result<&str, &str>)]) -> Self {
            Self {
                responses: entries
                    .iter()
                    .map(|(url, delay, r)| {
                        let r = (*r).map(str::to_string).map_err(str::to_string);
                        (url.to_string(), (*delay, r))
                    })
                    .collect(),
                calls: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl ContentSource for CannedContent {
        async fn extract(&self, url: &str, _page_ceiling: u32) -> Result<String> {
            self.calls.lock().unwrap().push(url.to_string());
            let (delay, result) = self
                .responses
                .get(url)
                .cloned()
                .unwrap_or((0, Err("unknown url".into())));
            tokio::time::sleep(Duration::from_millis(delay)).await;
            result.map_err(AssistantError::Network)
        }
    }

    fn paper(id: &str, title: &str) -> PaperRecord {
        PaperRecord {
            title: title.into(),
            authors: vec!["Ada Lovelace".into(), "Alan Turing".into()],
            summary: format!("Summary of {title}"),
            link: format!("http://arxiv.org/abs/{id}"),
            published: "2024-02-01T00:00:00Z".into(),
        }
    }

    #[tokio::test]
    async fn collect_or_default_keeps_success() {
        let content = collect_or_default(paper("1", "A"), async { Ok("text".to_string()) }).await;
        assert_eq!(content.text, "text");
        assert!(!content.is_failed());
    }

    #[tokio::test]
    async fn collect_or_default_isolates_failure() {
        let content = collect_or_default(paper("1", "A"), async {
            Err(AssistantError::Network("HTTP 503".into()))
        })
        .await;
        assert_eq!(content.text, "");
        assert!(content.failure.as_deref().unwrap().contains("HTTP 503"));
        assert_eq!(content.paper.title, "A");
    }

    #[test]
    fn block_format() {
        let content = ExtractedContent {
            paper: paper("1", "Efficient Transformers"),
            text: " ---- Page 1 ---- \nHello ".into(),
            failure: None,
        };
        assert_eq!(
            render_block(&content),
            "------------------------------\n\
             Title: Efficient Transformers\n\
             Authors: Ada Lovelace, Alan Turing\n\
             Summary: Summary of Efficient Transformers\n\
             Content:\n \
             ---- Page 1 ---- \nHello \n\
             ------------------------------"
        );
    }

    #[tokio::test]
    async fn concurrent_extraction_keeps_discovery_order() {
        // First paper is the slowest, so it settles last.
        let source = CannedContent::new(&[
            ("http://arxiv.org/pdf/1", 60, Ok("first body")),
            ("http://arxiv.org/pdf/2", 20, Ok("second body")),
            ("http://arxiv.org/pdf/3", 0, Ok("third body")),
        ]);
        let papers = vec![paper("1", "One"), paper("2", "Two"), paper("3", "Three")];

        let contents =
            extract_all(&source, &papers, &ExtractionOptions::default(), &SilentProgress).await;
        let titles: Vec<&str> = contents.iter().map(|c| c.paper.title.as_str()).collect();
        assert_eq!(titles, vec!["One", "Two", "Three"]);
        assert_eq!(contents[0].text, "first body");
    }

    #[tokio::test]
    async fn sequential_extraction_calls_in_order() {
        let source = CannedContent::new(&[
            ("http://arxiv.org/pdf/1", 0, Ok("a")),
            ("http://arxiv.org/pdf/2", 0, Ok("b")),
        ]);
        let papers = vec![paper("1", "One"), paper("2", "Two")];
        let opts = ExtractionOptions {
            page_ceiling: 5,
            concurrent: false,
        };

        extract_all(&source, &papers, &opts, &SilentProgress).await;
        assert_eq!(
            *source.calls.lock().unwrap(),
            vec!["http://arxiv.org/pdf/1", "http://arxiv.org/pdf/2"]
        );
    }

    #[tokio::test]
    async fn failing_paper_still_gets_a_block() {
        let source = CannedContent::new(&[
            ("http://arxiv.org/pdf/1", 0, Err("connection reset")),
            ("http://arxiv.org/pdf/2", 0, Ok("second body")),
        ]);
        let papers = vec![paper("1", "Broken"), paper("2", "Fine")];

        let doc = aggregate(&source, &papers, &ExtractionOptions::default(), &SilentProgress).await;
        let text = doc.as_str();
        assert_eq!(text.matches("Title: ").count(), 2);
        assert!(text.find("Title: Broken").unwrap() < text.find("Title: Fine").unwrap());
        assert!(text.contains("Summary: Summary of Broken\nContent:\n\n------------------------------"));
        assert!(text.contains("Content:\nsecond body\n"));
    }

    #[tokio::test]
    async fn no_papers_is_empty_document() {
        let source = CannedContent::new(&[]);
        let doc = aggregate(&source, &[], &ExtractionOptions::default(), &SilentProgress).await;
        assert_eq!(doc.as_str(), "");
    }
}
