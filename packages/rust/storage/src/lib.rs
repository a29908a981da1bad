//! libSQL workflow journal (offline mode).
//!
//! The [`Storage`] struct wraps a local libSQL database holding workflow runs
//! and the outputs of their completed steps. A run can be replayed from here:
//! any step whose output is journaled is not executed again.
//!
//! **Access rules:**
//! - `ask`, `event`, `resume`: read-write via [`Storage::open`]
//! - `runs`: read-only via [`Storage::open_readonly`]

mod migrations;

use std::path::Path;

use arxiv_assistant_shared::{AssistantError, Result, RunId, RunStatus};
use chrono::Utc;
use libsql::{Connection, Database, Row, params};

/// A journaled workflow run.
#[derive(Debug, Clone, PartialEq)]
pub struct RunRecord {
    pub id: String,
    pub event_name: String,
    /// The triggering request, serialized.
    pub input_json: String,
    pub status: RunStatus,
    /// The event result, once the run has completed.
    pub result_json: Option<String>,
    pub error: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

/// A journaled step output.
#[derive(Debug, Clone, PartialEq)]
pub struct StepRecord {
    /// SHA-256 hex digest of the serialized step input.
    pub input_hash: String,
    pub output_json: String,
}

/// Primary storage handle wrapping a libSQL database.
pub struct Storage {
    #[allow(dead_code)]
    db: Database,
    conn: Connection,
    readonly: bool,
}

impl Storage {
    /// Open or create a database at `path` in read-write mode.
    pub async fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| AssistantError::io(parent, e))?;
        }

        let db = libsql::Builder::new_local(path)
            .build()
            .await
            .map_err(|e| AssistantError::Storage(e.to_string()))?;

        let conn = db
            .connect()
            .map_err(|e| AssistantError::Storage(e.to_string()))?;

        let storage = Self {
            db,
            conn,
            readonly: false,
        };
        storage.run_migrations().await?;
        Ok(storage)
    }

    /// Open an existing database at `path` in read-only mode.
    pub async fn open_readonly(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(AssistantError::Storage(format!(
                "journal not found at {}",
                path.display()
            )));
        }

        let db = libsql::Builder::new_local(path)
            .build()
            .await
            .map_err(|e| AssistantError::Storage(e.to_string()))?;

        let conn = db
            .connect()
            .map_err(|e| AssistantError::Storage(e.to_string()))?;

        Ok(Self {
            db,
            conn,
            readonly: true,
        })
    }

    /// Run pending schema migrations.
    async fn run_migrations(&self) -> Result<()> {
        let current_version = self.get_schema_version().await;

        for migration in migrations::all_migrations() {
            if migration.version > current_version {
                tracing::info!(
                    version = migration.version,
                    description = migration.description,
                    "applying migration"
                );
                self.conn
                    .execute_batch(migration.sql)
                    .await
                    .map_err(|e| {
                        AssistantError::Storage(format!(
                            "migration v{} failed: {e}",
                            migration.version
                        ))
                    })?;
            }
        }
        Ok(())
    }

    /// Get the current schema version, or 0 if no migrations have been applied.
    async fn get_schema_version(&self) -> u32 {
        let result = self
            .conn
            .query("SELECT MAX(version) FROM schema_migrations", params![])
            .await;

        match result {
            Ok(mut rows) => {
                if let Ok(Some(row)) = rows.next().await {
                    row.get::<u32>(0).unwrap_or(0)
                } else {
                    0
                }
            }
            Err(_) => 0, // Table doesn't exist yet
        }
    }

    fn check_writable(&self) -> Result<()> {
        if self.readonly {
            return Err(AssistantError::Storage(
                "database is opened in read-only mode".into(),
            ));
        }
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Run operations
    // -----------------------------------------------------------------------

    /// Record a new run in `running` state.
    pub async fn insert_run(&self, id: &RunId, event_name: &str, input_json: &str) -> Result<()> {
        self.check_writable()?;
        let now = Utc::now().to_rfc3339();
        let id = id.to_string();
        self.conn
            .execute(
                "INSERT INTO workflow_runs (id, event_name, input_json, status, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    id.as_str(),
                    event_name,
                    input_json,
                    RunStatus::Running.as_str(),
                    now.as_str(),
                    now.as_str()
                ],
            )
            .await
            .map_err(|e| AssistantError::Storage(e.to_string()))?;
        Ok(())
    }

    /// Get a run by ID.
    pub async fn get_run(&self, id: &RunId) -> Result<Option<RunRecord>> {
        let id = id.to_string();
        let mut rows = self
            .conn
            .query(
                "SELECT id, event_name, input_json, status, result_json, error, created_at, updated_at
                 FROM workflow_runs WHERE id = ?1",
                params![id.as_str()],
            )
            .await
            .map_err(|e| AssistantError::Storage(e.to_string()))?;

        match rows.next().await {
            Ok(Some(row)) => Ok(Some(row_to_run(&row)?)),
            Ok(None) => Ok(None),
            Err(e) => Err(AssistantError::Storage(e.to_string())),
        }
    }

    /// List the most recent runs, newest first.
    pub async fn list_runs(&self, limit: u32) -> Result<Vec<RunRecord>> {
        let mut rows = self
            .conn
            .query(
                "SELECT id, event_name, input_json, status, result_json, error, created_at, updated_at
                 FROM workflow_runs ORDER BY rowid DESC LIMIT ?1",
                params![limit],
            )
            .await
            .map_err(|e| AssistantError::Storage(e.to_string()))?;

        let mut results = Vec::new();
        while let Some(row) = rows
            .next()
            .await
            .map_err(|e| AssistantError::Storage(e.to_string()))?
        {
            results.push(row_to_run(&row)?);
        }
        Ok(results)
    }

    /// Put a run back into `running` state before a replay.
    pub async fn mark_running(&self, id: &RunId) -> Result<()> {
        self.set_status(id, RunStatus::Running, None, None).await
    }

    /// Record the final state of a run.
    pub async fn finish_run(
        &self,
        id: &RunId,
        status: RunStatus,
        result_json: Option<&str>,
        error: Option<&str>,
    ) -> Result<()> {
        self.set_status(id, status, result_json, error).await
    }

    async fn set_status(
        &self,
        id: &RunId,
        status: RunStatus,
        result_json: Option<&str>,
        error: Option<&str>,
    ) -> Result<()> {
        self.check_writable()?;
        let now = Utc::now().to_rfc3339();
        let id = id.to_string();
        let updated = self
            .conn
            .execute(
                "UPDATE workflow_runs
                 SET status = ?2, result_json = ?3, error = ?4, updated_at = ?5
                 WHERE id = ?1",
                params![id.as_str(), status.as_str(), result_json, error, now.as_str()],
            )
            .await
            .map_err(|e| AssistantError::Storage(e.to_string()))?;

        if updated == 0 {
            return Err(AssistantError::Storage(format!("run {id} not found")));
        }
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Step operations
    // -----------------------------------------------------------------------

    /// Get the journaled output of a step, if it completed.
    pub async fn get_step(&self, run_id: &RunId, step_name: &str) -> Result<Option<StepRecord>> {
        let run_id = run_id.to_string();
        let mut rows = self
            .conn
            .query(
                "SELECT input_hash, output_json FROM step_results
                 WHERE run_id = ?1 AND step_name = ?2",
                params![run_id.as_str(), step_name],
            )
            .await
            .map_err(|e| AssistantError::Storage(e.to_string()))?;

        match rows.next().await {
            Ok(Some(row)) => Ok(Some(StepRecord {
                input_hash: row
                    .get::<String>(0)
                    .map_err(|e| AssistantError::Storage(e.to_string()))?,
                output_json: row
                    .get::<String>(1)
                    .map_err(|e| AssistantError::Storage(e.to_string()))?,
            })),
            Ok(None) => Ok(None),
            Err(e) => Err(AssistantError::Storage(e.to_string())),
        }
    }

    /// Insert or replace the output of a completed step.
    pub async fn put_step(
        &self,
        run_id: &RunId,
        step_name: &str,
        input_hash: &str,
        output_json: &str,
    ) -> Result<()> {
        self.check_writable()?;
        let now = Utc::now().to_rfc3339();
        let run_id = run_id.to_string();
        self.conn
            .execute(
                "INSERT INTO step_results (run_id, step_name, input_hash, output_json, completed_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)
                 ON CONFLICT(run_id, step_name) DO UPDATE SET
                    input_hash = excluded.input_hash,
                    output_json = excluded.output_json,
                    completed_at = excluded.completed_at",
                params![run_id.as_str(), step_name, input_hash, output_json, now.as_str()],
            )
            .await
            .map_err(|e| AssistantError::Storage(e.to_string()))?;
        Ok(())
    }

    /// Names of the steps journaled for a run, in the order they were first saved.
    pub async fn list_steps(&self, run_id: &RunId) -> Result<Vec<String>> {
        let run_id = run_id.to_string();
        let mut rows = self
            .conn
            .query(
                "SELECT step_name FROM step_results WHERE run_id = ?1 ORDER BY rowid",
                params![run_id.as_str()],
            )
            .await
            .map_err(|e| AssistantError::Storage(e.to_string()))?;

        let mut names = Vec::new();
        while let Some(row) = rows
            .next()
            .await
            .map_err(|e| AssistantError::Storage(e.to_string()))?
        {
            names.push(
                row.get::<String>(0)
                    .map_err(|e| AssistantError::Storage(e.to_string()))?,
            );
        }
        Ok(names)
    }
}

fn row_to_run(row: &Row) -> Result<RunRecord> {
    let status_raw = row
        .get::<String>(3)
        .map_err(|e| AssistantError::Storage(e.to_string()))?;
    let status = RunStatus::parse(&status_raw)
        .ok_or_else(|| AssistantError::Storage(format!("unknown run status '{status_raw}'")))?;

    Ok(RunRecord {
        id: row
            .get::<String>(0)
            .map_err(|e| AssistantError::Storage(e.to_string()))?,
        event_name: row
            .get::<String>(1)
            .map_err(|e| AssistantError::Storage(e.to_string()))?,
        input_json: row
            .get::<String>(2)
            .map_err(|e| AssistantError::Storage(e.to_string()))?,
        status,
        result_json: row.get::<String>(4).ok(),
        error: row.get::<String>(5).ok(),
        created_at: row
            .get::<String>(6)
            .map_err(|e| AssistantError::Storage(e.to_string()))?,
        updated_at: row
            .get::<String>(7)
            .map_err(|e| AssistantError::Storage(e.to_string()))?,
    })
}
