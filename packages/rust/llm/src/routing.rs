//! Model-identifier routing.
//!
//! A [`ProviderTable`] maps model identifiers to credentials, endpoint and
//! temperature. Routes are checked in order and the first one whose pattern
//! occurs in the model identifier wins.

use arxiv_assistant_shared::{AssistantError, ProviderRoute, Result, default_provider_routes};

/// A route with its credentials and endpoint filled in.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedProvider {
    /// Route name, for logs.
    pub name: String,
    /// OpenAI-compatible base URL without trailing slash.
    pub base_url: String,
    /// Bearer token.
    pub api_key: String,
    /// Sampling temperature.
    pub temperature: f32,
}

/// Ordered routing table.
#[derive(Debug, Clone)]
pub struct ProviderTable {
    routes: Vec<ProviderRoute>,
}

impl Default for ProviderTable {
    fn default() -> Self {
        Self::new(default_provider_routes())
    }
}

impl ProviderTable {
    pub fn new(routes: Vec<ProviderRoute>) -> Self {
        Self { routes }
    }

    /// The route that handles `model_id`, without resolving credentials.
    pub fn route_for(&self, model_id: &str) -> Option<&ProviderRoute> {
        self.routes.iter().find(|r| r.matches(model_id))
    }

    /// Resolve `model_id` against the process environment.
    pub fn resolve(&self, model_id: &str) -> Result<ResolvedProvider> {
        self.resolve_with(model_id, |name| std::env::var(name).ok())
    }

    /// Resolve `model_id`, reading env vars through `lookup`.
    pub fn resolve_with<F>(&self, model_id: &str, lookup: F) -> Result<ResolvedProvider>
    where
        F: Fn(&str) -> Option<String>,
    {
        let route = self.route_for(model_id).ok_or_else(|| {
            AssistantError::config(format!("no provider route matches model '{model_id}'"))
        })?;

        let api_key = lookup(&route.api_key_env)
            .filter(|v| !v.is_empty())
            .ok_or_else(|| {
                AssistantError::config(format!(
                    "API key for provider '{}' not found. Set the {} environment variable.",
                    route.name, route.api_key_env
                ))
            })?;

        let base_url = match (&route.base_url, &route.base_url_env) {
            (Some(url), _) => url.clone(),
            (None, Some(var)) => lookup(var).filter(|v| !v.is_empty()).ok_or_else(|| {
                AssistantError::config(format!(
                    "base URL for provider '{}' not found. Set the {var} environment variable.",
                    route.name
                ))
            })?,
            (None, None) => {
                return Err(AssistantError::config(format!(
                    "provider '{}' has neither base_url nor base_url_env",
                    route.name
                )));
            }
        };

        Ok(ResolvedProvider {
            name: route.name.clone(),
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
            temperature: route.temperature,
        })
    }
}

/// Check that the route for `model_id` has its credentials available.
pub fn validate_provider_credentials(table: &ProviderTable, model_id: &str) -> Result<()> {
    table.resolve(model_id).map(|_| ())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn deepseek_models_use_deepseek_route() {
        let vars = env(&[
            ("DEEPSEEK_API_KEY", "ds-key"),
            ("DEEPSEEK_BASE_URL", "https://api.deepseek.example/"),
        ]);
        let resolved = ProviderTable::default()
            .resolve_with("deepseek-ai/DeepSeek-R1-Distill-Qwen-32B", |k| {
                vars.get(k).cloned()
            })
            .unwrap();

        assert_eq!(resolved.name, "deepseek");
        assert_eq!(resolved.api_key, "ds-key");
        assert_eq!(resolved.base_url, "https://api.deepseek.example");
        assert!((resolved.temperature - 0.6).abs() < f32::EPSILON);
    }

    #[test]
    fn other_models_fall_through_to_openai() {
        let vars = env(&[("OPENAI_API_KEY", "oa-key")]);
        let resolved = ProviderTable::default()
            .resolve_with("gpt-4o-mini", |k| vars.get(k).cloned())
            .unwrap();

        assert_eq!(resolved.name, "openai");
        assert_eq!(resolved.base_url, "https://api.openai.com/v1");
        assert!((resolved.temperature - 1.0).abs() < f32::EPSILON);
    }

    #[test]
    fn matching_is_case_sensitive_substring() {
        // "DeepSeek" alone does not contain the lowercase pattern.
        let table = ProviderTable::default();
        assert_eq!(table.route_for("DeepSeek-V3").map(|r| r.name.as_str()), Some("openai"));
        assert_eq!(table.route_for("my-deepseek-v3").map(|r| r.name.as_str()), Some("deepseek"));
    }

    #[test]
    fn missing_key_is_config_error() {
        let err = ProviderTable::default()
            .resolve_with("gpt-4o", |_| None)
            .unwrap_err();
        assert!(err.to_string().contains("OPENAI_API_KEY"));
    }

    #[test]
    fn missing_base_url_env_is_config_error() {
        let vars = env(&[("DEEPSEEK_API_KEY", "ds-key")]);
        let err = ProviderTable::default()
            .resolve_with("deepseek-chat", |k| vars.get(k).cloned())
            .unwrap_err();
        assert!(err.to_string().contains("DEEPSEEK_BASE_URL"));
    }

    #[test]
    fn no_route_is_config_error() {
        let table = ProviderTable::new(vec![]);
        let err = table.resolve_with("gpt-4o", |_| None).unwrap_err();
        assert!(err.to_string().contains("no provider route"));
    }
}
