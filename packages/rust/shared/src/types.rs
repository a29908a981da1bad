//! Core domain types for a research run.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Event name that triggers a research run.
pub const RESEARCH_EVENT: &str = "arxiv-research-assistant.search";

/// Model used when a request does not name one.
pub const DEFAULT_MODEL: &str = "deepseek-ai/DeepSeek-R1-Distill-Qwen-32B";

// ---------------------------------------------------------------------------
// RunId
// ---------------------------------------------------------------------------

/// A UUID v7 wrapper for workflow run identifiers (time-sortable).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RunId(pub Uuid);

impl RunId {
    /// Generate a new time-sortable run identifier.
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }
}

impl Default for RunId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for RunId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for RunId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

/// Terminal (or in-flight) state of a journaled run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Running,
    Answered,
    NoQuery,
    Failed,
}

impl RunStatus {
    /// Column value stored in the journal.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Running => "running",
            Self::Answered => "answered",
            Self::NoQuery => "no_query",
            Self::Failed => "failed",
        }
    }

    /// Parse a stored column value.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "running" => Some(Self::Running),
            "answered" => Some(Self::Answered),
            "no_query" => Some(Self::NoQuery),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Request / response
// ---------------------------------------------------------------------------

/// Payload of the `arxiv-research-assistant.search` event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResearchRequest {
    /// The free-text research question.
    pub input: String,
    /// Model identifier; [`DEFAULT_MODEL`] when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
}

impl ResearchRequest {
    pub fn new(input: impl Into<String>) -> Self {
        Self {
            input: input.into(),
            model: None,
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    /// The model to route completions to.
    pub fn model_id(&self) -> &str {
        self.model.as_deref().unwrap_or(DEFAULT_MODEL)
    }
}

/// Terminal output of an answered run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResearchAnswer {
    pub answer: String,
}

/// A search query pulled out of the formulator's `<search_query>` markers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SearchQuery(pub String);

impl SearchQuery {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for SearchQuery {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

// ---------------------------------------------------------------------------
// Papers
// ---------------------------------------------------------------------------

/// One entry of the arXiv feed.
///
/// Missing feed fields degrade to empty strings rather than erroring.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaperRecord {
    pub title: String,
    pub authors: Vec<String>,
    pub summary: String,
    /// Canonical abstract-page URL (the Atom `<id>`).
    pub link: String,
    pub published: String,
}

impl PaperRecord {
    /// PDF URL derived from the abstract-page link.
    pub fn pdf_url(&self) -> String {
        self.link.replacen("/abs/", "/pdf/", 1)
    }
}

/// A paper together with whatever text could be extracted from it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractedContent {
    pub paper: PaperRecord,
    /// Extracted text; empty when extraction failed.
    pub text: String,
    /// Error message when extraction failed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure: Option<String>,
}

impl ExtractedContent {
    pub fn is_failed(&self) -> bool {
        self.failure.is_some()
    }
}

/// The composite text handed to the synthesizer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AggregatedDocument(pub String);

impl AggregatedDocument {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}
