//! Durable steps.
//!
//! A step's output is journaled under `(run_id, step_name)` together with a
//! SHA-256 hash of its serialized input. Replaying the run with the same input
//! returns the journaled output without running the step again. Outputs are
//! written only after the step succeeds, so a failed step leaves no trace.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Mutex;

use arxiv_assistant_shared::{AssistantError, Result, RunId};
use arxiv_assistant_storage::{StepRecord, Storage};
use async_trait::async_trait;
use serde::Serialize;
use serde::de::DeserializeOwned;
use sha2::{Digest, Sha256};
use tracing::{debug, info, warn};

use crate::progress::ProgressReporter;

// ---------------------------------------------------------------------------
// Journal
// ---------------------------------------------------------------------------

/// Persistence for completed step outputs.
#[async_trait]
pub trait StepJournal: Send + Sync {
    async fn load(&self, run_id: &RunId, step: &str) -> Result<Option<StepRecord>>;
    async fn save(&self, run_id: &RunId, step: &str, input_hash: &str, output_json: &str)
    -> Result<()>;
}

#[async_trait]
impl StepJournal for Storage {
    async fn load(&self, run_id: &RunId, step: &str) -> Result<Option<StepRecord>> {
        self.get_step(run_id, step).await
    }

    async fn save(
        &self,
        run_id: &RunId,
        step: &str,
        input_hash: &str,
        output_json: &str,
    ) -> Result<()> {
        self.put_step(run_id, step, input_hash, output_json).await
    }
}

/// In-process journal. Nothing survives the process.
#[derive(Default)]
pub struct MemoryJournal {
    steps: Mutex<HashMap<(RunId, String), StepRecord>>,
}

impl MemoryJournal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of journaled steps across all runs.
    pub fn len(&self) -> usize {
        self.steps.lock().map(|s| s.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl StepJournal for MemoryJournal {
    async fn load(&self, run_id: &RunId, step: &str) -> Result<Option<StepRecord>> {
        let steps = self
            .steps
            .lock()
            .map_err(|_| AssistantError::Storage("step journal lock poisoned".into()))?;
        Ok(steps.get(&(run_id.clone(), step.to_string())).cloned())
    }

    async fn save(
        &self,
        run_id: &RunId,
        step: &str,
        input_hash: &str,
        output_json: &str,
    ) -> Result<()> {
        let mut steps = self
            .steps
            .lock()
            .map_err(|_| AssistantError::Storage("step journal lock poisoned".into()))?;
        steps.insert(
            (run_id.clone(), step.to_string()),
            StepRecord {
                input_hash: input_hash.to_string(),
                output_json: output_json.to_string(),
            },
        );
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// durable_step
// ---------------------------------------------------------------------------

/// The run a step belongs to.
pub struct StepContext<'a> {
    pub run_id: RunId,
    pub journal: &'a dyn StepJournal,
    pub progress: &'a dyn ProgressReporter,
}

/// SHA-256 hex digest of a serialized step input.
pub fn input_hash(input_json: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(input_json.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Run `f` as the step `name`, or return its journaled output.
///
/// A journaled output is reused only when its input hash matches `input`.
/// An output that no longer deserializes is treated as missing.
pub async fn durable_step<I, O, F, Fut>(
    ctx: &StepContext<'_>,
    name: &str,
    input: &I,
    f: F,
) -> Result<O>
where
    I: Serialize + ?Sized,
    O: Serialize + DeserializeOwned,
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<O>>,
{
    let input_json = serde_json::to_string(input)
        .map_err(|e| AssistantError::Storage(format!("step '{name}': serialize input: {e}")))?;
    let hash = input_hash(&input_json);

    if let Some(record) = ctx.journal.load(&ctx.run_id, name).await? {
        if record.input_hash == hash {
            match serde_json::from_str::<O>(&record.output_json) {
                Ok(output) => {
                    info!(run_id = %ctx.run_id, step = name, "step replayed from journal");
                    ctx.progress.step_replayed(name);
                    return Ok(output);
                }
                Err(e) => {
                    warn!(run_id = %ctx.run_id, step = name, error = %e, "journaled output unreadable, re-running step");
                }
            }
        } else {
            debug!(run_id = %ctx.run_id, step = name, "step input changed, re-running");
        }
    }

    let output = f().await?;

    let output_json = serde_json::to_string(&output)
        .map_err(|e| AssistantError::Storage(format!("step '{name}': serialize output: {e}")))?;
    ctx.journal
        .save(&ctx.run_id, name, &hash, &output_json)
        .await?;
    debug!(run_id = %ctx.run_id, step = name, "step journaled");

    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use crate::progress::SilentProgress;

    fn ctx(journal: &MemoryJournal, run_id: RunId) -> StepContext<'_> {
        StepContext {
            run_id,
            journal,
            progress: &SilentProgress,
        }
    }

    #[test]
    fn hash_is_sha256_hex() {
        let hash = input_hash("\"hello\"");
        assert_eq!(hash.len(), 64);
        assert_eq!(hash, input_hash("\"hello\""));
        assert_ne!(hash, input_hash("\"world\""));
    }

    #[tokio::test]
    async fn second_run_is_replayed() {
        let journal = MemoryJournal::new();
        let run_id = RunId::new();
        let calls = AtomicUsize::new(0);

        for _ in 0..2 {
            let out: String = durable_step(&ctx(&journal, run_id.clone()), "step", "in", || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok("out".to_string())
            })
            .await
            .unwrap();
            assert_eq!(out, "out");
        }

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(journal.len(), 1);
    }

    #[tokio::test]
    async fn changed_input_reruns() {
        let journal = MemoryJournal::new();
        let run_id = RunId::new();
        let calls = AtomicUsize::new(0);

        for input in ["a", "b"] {
            let _: String = durable_step(&ctx(&journal, run_id.clone()), "step", input, || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok(input.to_uppercase())
            })
            .await
            .unwrap();
        }

        assert_eq!(calls.load(Ordering::SeqCst), 2);
        let record = journal.load(&run_id, "step").await.unwrap().unwrap();
        assert_eq!(record.output_json, "\"B\"");
    }

    #[tokio::test]
    async fn failed_step_is_not_journaled() {
        let journal = MemoryJournal::new();
        let result: Result<String> =
            durable_step(&ctx(&journal, RunId::new()), "step", "in", || async {
                Err(AssistantError::Provider("boom".into()))
            })
            .await;

        assert!(result.is_err());
        assert!(journal.is_empty());
    }

    #[tokio::test]
    async fn runs_are_isolated() {
        let journal = MemoryJournal::new();
        let calls = AtomicUsize::new(0);

        for run_id in [RunId::new(), RunId::new()] {
            let _: Option<String> = durable_step(&ctx(&journal, run_id), "step", "in", || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok(None)
            })
            .await
            .unwrap();
        }

        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn storage_backed_journal_replays() {
        let path = std::env::temp_dir().join(format!("arxiv_assistant_steps_{}.db", RunId::new()));
        let storage = Storage::open(&path).await.unwrap();
        let run_id = RunId::new();
        storage.insert_run(&run_id, "evt", "{}").await.unwrap();
        let calls = AtomicUsize::new(0);

        for _ in 0..2 {
            let step_ctx = StepContext {
                run_id: run_id.clone(),
                journal: &storage,
                progress: &SilentProgress,
            };
            let out: Vec<String> = durable_step(&step_ctx, "search-arxiv", "query", || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok(vec!["paper".to_string()])
            })
            .await
            .unwrap();
            assert_eq!(out, vec!["paper"]);
        }

        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
