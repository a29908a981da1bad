//! Search-query formulation and extraction.

use std::sync::LazyLock;

use arxiv_assistant_llm::LanguageModel;
use arxiv_assistant_shared::{Result, SearchQuery};
use chrono::Datelike;
use regex::Regex;
use tracing::{debug, instrument};

static SEARCH_QUERY_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)<search_query>(.*?)</search_query>").expect("valid search_query regex")
});

/// Build the formulation prompt for `question`, anchored to `year`.
pub fn search_query_prompt(question: &str, year: i32) -> String {
    format!(
        "You are a helpful research analyst that helps users find relevant academic papers \
on arXiv to answer the following question:
{question}

DO NOT answer with your current knowledge, ONLY search for papers on arXiv.
IMPORTANT: We are in the year {year}.

Perform your arXiv search by returning your search query in the following format:

<search_query>
{{your search query}}
</search_query>
"
    )
}

/// Ask `model_id` for a search query. Returns the raw reply.
#[instrument(skip(model, question), fields(model = model_id))]
pub async fn formulate_query(
    model: &dyn LanguageModel,
    question: &str,
    model_id: &str,
) -> Result<String> {
    let year = chrono::Utc::now().year();
    let raw = model
        .complete(model_id, &search_query_prompt(question, year))
        .await?;
    debug!(chars = raw.len(), "formulator replied");
    Ok(raw)
}

/// Pull the search query out of the formulator's reply.
///
/// Takes the first `<search_query>` pair and strips double quotes and newlines.
/// Returns `None` when no pair is present or nothing is left after stripping.
pub fn extract_query(raw: &str) -> Option<SearchQuery> {
    let inner = SEARCH_QUERY_RE.captures(raw)?.get(1)?.as_str();
    let cleaned: String = inner.chars().filter(|c| *c != '"' && *c != '\n').collect();
    if cleaned.is_empty() {
        None
    } else {
        Some(SearchQuery(cleaned))
    }
}
