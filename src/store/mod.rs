//! Saved analysis results.
//!
//! Every analysis is stored as one row keyed by its scope and the user it
//! was generated for. Saving again for the same key overwrites the row in a
//! single `INSERT .. ON CONFLICT DO UPDATE`, so readers always see the most
//! recent completed run and never a partial one.

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::fmt;
use std::path::Path;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("stored analysis is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// What an analysis covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    /// Enrollment summary across the user's classes.
    Roster,
    /// One class in one grading period.
    Class { class_id: u64, period_id: u64 },
    /// One student across all periods.
    Student { student_id: u64 },
}

impl Scope {
    fn kind(&self) -> &'static str {
        match self {
            Scope::Roster => "roster",
            Scope::Class { .. } => "class",
            Scope::Student { .. } => "student",
        }
    }

    fn key(&self) -> String {
        match self {
            Scope::Roster => String::new(),
            Scope::Class {
                class_id,
                period_id,
            } => format!("{}:{}", class_id, period_id),
            Scope::Student { student_id } => student_id.to_string(),
        }
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scope::Roster => write!(f, "roster"),
            Scope::Class {
                class_id,
                period_id,
            } => write!(f, "class {} / period {}", class_id, period_id),
            Scope::Student { student_id } => write!(f, "student {}", student_id),
        }
    }
}

/// A saved analysis together with the context it was generated from.
#[derive(Debug, Clone)]
pub struct StoredAnalysis<T> {
    pub payload: T,
    /// Statistical context that was sent to the model.
    pub source: Value,
    pub updated_at: DateTime<Utc>,
}

/// SQLite-backed analysis store.
pub struct AnalysisStore {
    conn: Connection,
}

impl AnalysisStore {
    /// Open (creating if needed) a store at `path`.
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let conn = Connection::open(path)?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.pragma_update(None, "synchronous", "NORMAL")?;
        Self::ensure_schema(&conn)?;

        debug!("Opened analysis store at {}", path.display());
        Ok(Self { conn })
    }

    #[cfg(test)]
    pub fn open_in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()?;
        Self::ensure_schema(&conn)?;
        Ok(Self { conn })
    }

    fn ensure_schema(conn: &Connection) -> Result<(), StoreError> {
        conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS analysis_results (
              scope_kind TEXT NOT NULL,
              scope_key TEXT NOT NULL,
              user_id INTEGER NOT NULL,
              payload_json TEXT NOT NULL,
              source_json TEXT NOT NULL,
              updated_at TEXT NOT NULL,
              PRIMARY KEY (scope_kind, scope_key, user_id)
            );
            ",
        )?;
        Ok(())
    }

    /// Insert or overwrite the analysis for `scope` and `user_id`.
    pub fn upsert<T, S>(
        &self,
        scope: &Scope,
        user_id: i64,
        payload: &T,
        source: &S,
    ) -> Result<(), StoreError>
    where
        T: Serialize,
        S: Serialize,
    {
        let payload_json = serde_json::to_string(payload)?;
        let source_json = serde_json::to_string(source)?;

        self.conn.execute(
            "
            INSERT INTO analysis_results(scope_kind, scope_key, user_id, payload_json, source_json, updated_at)
            VALUES(?1, ?2, ?3, ?4, ?5, ?6)
            ON CONFLICT(scope_kind, scope_key, user_id) DO UPDATE SET
              payload_json=excluded.payload_json,
              source_json=excluded.source_json,
              updated_at=excluded.updated_at
            ",
            params![
                scope.kind(),
                scope.key(),
                user_id,
                payload_json,
                source_json,
                Utc::now(),
            ],
        )?;

        debug!("Saved analysis for {} (user {})", scope, user_id);
        Ok(())
    }

    /// Latest saved analysis for `scope` and `user_id`, if any.
    pub fn fetch<T>(&self, scope: &Scope, user_id: i64) -> Result<Option<StoredAnalysis<T>>, StoreError>
    where
        T: DeserializeOwned,
    {
        let row: Option<(String, String, DateTime<Utc>)> = self
            .conn
            .query_row(
                "
                SELECT payload_json, source_json, updated_at
                FROM analysis_results
                WHERE scope_kind = ?1 AND scope_key = ?2 AND user_id = ?3
                ",
                params![scope.kind(), scope.key(), user_id],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
            )
            .optional()?;

        row.map(|(payload_json, source_json, updated_at)| {
            Ok(StoredAnalysis {
                payload: serde_json::from_str(&payload_json)?,
                source: serde_json::from_str(&source_json)?,
                updated_at,
            })
        })
        .transpose()
    }
}
