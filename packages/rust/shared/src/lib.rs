//! Shared types, error model, and configuration for the arXiv research assistant.
//!
//! This crate is the foundation depended on by all other workspace crates.
//! It provides:
//! - [`AssistantError`], the unified error type
//! - Domain types ([`ResearchRequest`], [`PaperRecord`], [`ExtractedContent`], [`RunId`])
//! - Configuration ([`AppConfig`], [`ProviderRoute`], config loading)

pub mod config;
pub mod error;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AppConfig, ArxivConfig, DefaultsConfig, DocumentsConfig, JournalConfig, KeepaliveConfig,
    ProviderRoute, config_dir, config_file_path, default_provider_routes, init_config,
    load_config, load_config_from,
};
pub use error::{AssistantError, Result};
pub use types::{
    AggregatedDocument, DEFAULT_MODEL, ExtractedContent, PaperRecord, RESEARCH_EVENT,
    ResearchAnswer, ResearchRequest, RunId, RunStatus, SearchQuery,
};
