//! End-to-end research pipeline: question → query → papers → analysis.
//!
//! Each stage runs inside a durable step, so replaying a run under the same
//! [`RunId`] skips every stage that already completed.

use std::sync::Arc;
use std::time::Instant;

use serde_json::{Value, json};
use tracing::{info, instrument, warn};

use arxiv_assistant_llm::LanguageModel;
use arxiv_assistant_shared::{
    AggregatedDocument, AppConfig, AssistantError, RESEARCH_EVENT, ResearchAnswer,
    ResearchRequest, Result, RunId, RunStatus,
};
use arxiv_assistant_storage::Storage;

use crate::aggregate::{ExtractionOptions, aggregate};
use crate::progress::ProgressReporter;
use crate::query::{extract_query, formulate_query};
use crate::sources::{ContentSource, PaperSource};
use crate::steps::{StepContext, durable_step};
use crate::synthesis::synthesize;

/// Step that formulates the search query.
pub const STEP_GENERATE_QUERY: &str = "generate-search-query";
/// Step that extracts the query, discovers papers, and aggregates their text.
pub const STEP_SEARCH: &str = "search-arxiv";
/// Step that synthesizes the answer.
pub const STEP_ANALYSIS: &str = "generate-analysis";

/// Tunables taken from [`AppConfig`].
#[derive(Debug, Clone, Copy)]
pub struct PipelineSettings {
    /// Upper bound on discovered papers.
    pub max_results: usize,
    pub extraction: ExtractionOptions,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            max_results: 3,
            extraction: ExtractionOptions::default(),
        }
    }
}

impl From<&AppConfig> for PipelineSettings {
    fn from(config: &AppConfig) -> Self {
        Self {
            max_results: config.defaults.max_results,
            extraction: ExtractionOptions {
                page_ceiling: config.defaults.max_pages,
                concurrent: config.defaults.concurrent_extraction,
            },
        }
    }
}

/// How a run ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PipelineOutcome {
    Answered(ResearchAnswer),
    /// The formulator's reply held no usable search query.
    NoQuery,
}

impl PipelineOutcome {
    pub fn status(&self) -> RunStatus {
        match self {
            Self::Answered(_) => RunStatus::Answered,
            Self::NoQuery => RunStatus::NoQuery,
        }
    }

    /// The event result: `{"answer": ...}`, or `null` when no query was found.
    pub fn event_result(&self) -> Value {
        match self {
            Self::Answered(answer) => json!({ "answer": answer.answer }),
            Self::NoQuery => Value::Null,
        }
    }
}

/// Coordinates formulation, discovery, extraction, and synthesis.
pub struct ResearchPipeline {
    model: Arc<dyn LanguageModel>,
    papers: Arc<dyn PaperSource>,
    content: Arc<dyn ContentSource>,
    settings: PipelineSettings,
}

impl ResearchPipeline {
    pub fn new(
        model: Arc<dyn LanguageModel>,
        papers: Arc<dyn PaperSource>,
        content: Arc<dyn ContentSource>,
        settings: PipelineSettings,
    ) -> Self {
        Self {
            model,
            papers,
            content,
            settings,
        }
    }

    /// Run all three steps for `request` under `ctx`.
    #[instrument(skip_all, fields(run_id = %ctx.run_id, model = request.model_id()))]
    pub async fn run(
        &self,
        ctx: &StepContext<'_>,
        request: &ResearchRequest,
    ) -> Result<PipelineOutcome> {
        let start = Instant::now();
        let model_id = request.model_id();
        let question = request.input.as_str();

        ctx.progress.phase("Formulating search query");
        let raw: String = durable_step(ctx, STEP_GENERATE_QUERY, &(question, model_id), || {
            formulate_query(self.model.as_ref(), question, model_id)
        })
        .await?;

        ctx.progress.phase("Searching arXiv");
        let search_input = (
            raw.as_str(),
            self.settings.max_results,
            self.settings.extraction.page_ceiling,
        );
        let papers: Option<AggregatedDocument> =
            durable_step(ctx, STEP_SEARCH, &search_input, || {
                self.search(&raw, ctx.progress)
            })
            .await?;

        let Some(papers) = papers else {
            info!("formulator reply held no search query, skipping analysis");
            return Ok(PipelineOutcome::NoQuery);
        };

        ctx.progress.phase("Generating analysis");
        let answer: String = durable_step(
            ctx,
            STEP_ANALYSIS,
            &(question, model_id, papers.as_str()),
            || synthesize(self.model.as_ref(), question, &papers, model_id),
        )
        .await?;

        info!(elapsed_ms = start.elapsed().as_millis() as u64, "run answered");
        Ok(PipelineOutcome::Answered(ResearchAnswer { answer }))
    }

    /// Query extraction, discovery, and aggregation. `None` when no query was found.
    async fn search(
        &self,
        raw: &str,
        progress: &dyn ProgressReporter,
    ) -> Result<Option<AggregatedDocument>> {
        let Some(query) = extract_query(raw) else {
            return Ok(None);
        };
        info!(query = %query, "search query extracted");

        let mut records = self
            .papers
            .discover(query.as_str(), self.settings.max_results)
            .await?;
        records.truncate(self.settings.max_results);
        info!(papers = records.len(), "papers discovered");

        progress.phase(&format!("Extracting {} papers", records.len()));
        let document = aggregate(
            self.content.as_ref(),
            &records,
            &self.settings.extraction,
            progress,
        )
        .await;
        Ok(Some(document))
    }

    /// Run `request` as `run_id`, recording the run in `storage`.
    ///
    /// A new id is inserted as `running`. A known id is put back into
    /// `running` and replayed. The final status, result, or error is written
    /// before returning.
    #[instrument(skip_all, fields(run_id = %run_id))]
    pub async fn run_journaled(
        &self,
        storage: &Storage,
        run_id: &RunId,
        request: &ResearchRequest,
        progress: &dyn ProgressReporter,
    ) -> Result<PipelineOutcome> {
        if storage.get_run(run_id).await?.is_some() {
            info!("replaying journaled run");
            storage.mark_running(run_id).await?;
        } else {
            let input_json = serde_json::to_string(request)
                .map_err(|e| AssistantError::validation(format!("serialize request: {e}")))?;
            storage.insert_run(run_id, RESEARCH_EVENT, &input_json).await?;
        }

        let ctx = StepContext {
            run_id: run_id.clone(),
            journal: storage,
            progress,
        };

        match self.run(&ctx, request).await {
            Ok(outcome) => {
                let result_json = outcome.event_result().to_string();
                storage
                    .finish_run(run_id, outcome.status(), Some(&result_json), None)
                    .await?;
                Ok(outcome)
            }
            Err(e) => {
                if let Err(journal_err) = storage
                    .finish_run(run_id, RunStatus::Failed, None, Some(&e.to_string()))
                    .await
                {
                    warn!(error = %journal_err, "could not record failed run");
                }
                Err(e)
            }
        }
    }
}

/// Reload the request a journaled run was started with.
pub async fn load_request(storage: &Storage, run_id: &RunId) -> Result<ResearchRequest> {
    let run = storage
        .get_run(run_id)
        .await?
        .ok_or_else(|| AssistantError::validation(format!("run {run_id} not found")))?;
    serde_json::from_str(&run.input_json)
        .map_err(|e| AssistantError::parse(format!("run {run_id} has an unreadable request: {e}")))
}
