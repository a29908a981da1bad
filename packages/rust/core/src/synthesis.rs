//! Answer synthesis over the aggregated papers.

use arxiv_assistant_llm::LanguageModel;
use arxiv_assistant_shared::{AggregatedDocument, Result};
use tracing::{info, instrument};

/// Build the analysis prompt.
pub fn analysis_prompt(question: &str, papers: &AggregatedDocument) -> String {
    format!(
        "You are a helpful research analyst that analyzes the papers found by the research \
agent to answer the following question:
{question}

Here are the papers:

{}
",
        papers.as_str()
    )
}

/// Ask `model_id` to answer `question` from `papers`. The reply is returned verbatim.
#[instrument(skip(model, question, papers), fields(model = model_id, chars = papers.as_str().len()))]
pub async fn synthesize(
    model: &dyn LanguageModel,
    question: &str,
    papers: &AggregatedDocument,
    model_id: &str,
) -> Result<String> {
    let answer = model
        .complete(model_id, &analysis_prompt(question, papers))
        .await?;
    info!(chars = answer.len(), "analysis generated");
    Ok(answer)
}
