//! Language-model access for the research pipeline.
//!
//! [`LanguageModel`] is the seam the pipeline talks to. [`RoutedModel`] is the
//! production implementation: every call resolves the model identifier through
//! the [`ProviderTable`], then issues one OpenAI-compatible chat completion.

pub mod openai;
pub mod routing;

use arxiv_assistant_shared::{ProviderRoute, Result};
use async_trait::async_trait;
use reqwest::Client;
use tracing::{info, instrument};

pub use openai::{ChatMessage, OpenAiCompatClient};
pub use routing::{ProviderTable, ResolvedProvider, validate_provider_credentials};

/// A text-completion capability.
#[async_trait]
pub trait LanguageModel: Send + Sync {
    /// Send `prompt` as a single user message to `model_id` and return the reply text.
    async fn complete(&self, model_id: &str, prompt: &str) -> Result<String>;
}

/// [`LanguageModel`] that routes each call through a [`ProviderTable`].
pub struct RoutedModel {
    table: ProviderTable,
    http: Client,
}

impl RoutedModel {
    pub fn new(http: Client, routes: Vec<ProviderRoute>) -> Self {
        Self {
            table: ProviderTable::new(routes),
            http,
        }
    }
}

#[async_trait]
impl LanguageModel for RoutedModel {
    #[instrument(skip_all, fields(model = model_id))]
    async fn complete(&self, model_id: &str, prompt: &str) -> Result<String> {
        let provider = self.table.resolve(model_id)?;
        info!(provider = %provider.name, temperature = provider.temperature, "routing completion");

        let client = OpenAiCompatClient::new(self.http.clone(), provider);
        client.chat(model_id, &[ChatMessage::user(prompt)]).await
    }
}
