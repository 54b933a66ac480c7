//! Record store backing the `/api/data` routes
//!
//! Records live in memory and, when the store was opened on a path, are
//! written through to a single JSON file keyed by record id. Opening an
//! existing file restores its records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use shared::{process_debug, process_info, ProcessId};
use std::collections::BTreeMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use tokio::sync::RwLock;

use crate::error::BackendResult;

/// Data file used when no path is configured
pub const DEFAULT_DATA_PATH: &str = "storage/data.json";

type Records = BTreeMap<String, StoredRecord>;

/// Lifecycle of a stored processing result
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordStatus {
    Completed,
}

/// One stored result: the route-specific payload plus bookkeeping fields
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StoredRecord {
    pub id: String,
    pub status: RecordStatus,
    pub stored_at: DateTime<Utc>,
    /// 1 on first insert, bumped each time the same id is stored again
    pub version: u32,
    #[serde(flatten)]
    pub payload: serde_json::Map<String, Value>,
}

/// Listing entry for `GET /api/data`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RecordSummary {
    pub id: String,
    pub status: RecordStatus,
    pub stored_at: DateTime<Utc>,
    pub version: u32,
    pub input_type: Option<String>,
    pub template: Option<String>,
    pub word_count: u64,
    pub complexity_score: u64,
}

impl StoredRecord {
    fn summary(&self) -> RecordSummary {
        let text = |key: &str| self.payload.get(key).and_then(Value::as_str).map(str::to_string);
        let analysis_number = |key: &str| {
            self.payload
                .get("analysis")
                .and_then(|a| a.get(key))
                .and_then(Value::as_u64)
                .unwrap_or(0)
        };

        RecordSummary {
            id: self.id.clone(),
            status: self.status,
            stored_at: self.stored_at,
            version: self.version,
            input_type: text("input_type"),
            template: text("template"),
            word_count: analysis_number("word_count"),
            complexity_score: analysis_number("complexity_score"),
        }
    }
}

#[derive(Debug, Default)]
pub struct DataStore {
    /// `None` keeps records in memory only
    path: Option<PathBuf>,
    records: RwLock<Records>,
}

impl DataStore {
    /// Store without a backing file
    pub fn new() -> Self {
        Self::default()
    }

    /// Open the JSON data file at `path`, creating its directory if needed
    ///
    /// A missing file starts an empty store; the file is created on the
    /// first write.
    pub async fn open(path: impl Into<PathBuf>) -> BackendResult<Self> {
        let path = path.into();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }

        let records: Records = match tokio::fs::read(&path).await {
            Ok(bytes) if bytes.iter().all(u8::is_ascii_whitespace) => Records::new(),
            Ok(bytes) => serde_json::from_slice(&bytes)?,
            Err(e) if e.kind() == ErrorKind::NotFound => Records::new(),
            Err(e) => return Err(e.into()),
        };
        process_info!(
            ProcessId::current(),
            "💾 Data store at {} ({} record(s))",
            path.display(),
            records.len()
        );

        Ok(Self {
            path: Some(path),
            records: RwLock::new(records),
        })
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Store `payload` under `id`, replacing any previous record and bumping
    /// its version
    ///
    /// The in-memory map is left unchanged if the data file cannot be written.
    pub async fn insert(
        &self,
        id: &str,
        payload: serde_json::Map<String, Value>,
    ) -> BackendResult<StoredRecord> {
        let mut records = self.records.write().await;
        let version = records.get(id).map_or(1, |existing| existing.version + 1);
        let record = StoredRecord {
            id: id.to_string(),
            status: RecordStatus::Completed,
            stored_at: Utc::now(),
            version,
            payload,
        };

        let previous = records.insert(id.to_string(), record.clone());
        let persisted = self.persist(&records).await;
        if let Err(e) = persisted {
            match previous {
                Some(previous) => records.insert(id.to_string(), previous),
                None => records.remove(id),
            };
            return Err(e);
        }
        process_debug!(ProcessId::current(), "Stored {} (version {})", id, version);
        Ok(record)
    }

    pub async fn get(&self, id: &str) -> Option<StoredRecord> {
        self.records.read().await.get(id).cloned()
    }

    /// Summaries, most recently stored first
    pub async fn list(&self) -> Vec<RecordSummary> {
        let mut summaries: Vec<RecordSummary> = self
            .records
            .read()
            .await
            .values()
            .map(StoredRecord::summary)
            .collect();
        summaries.sort_by(|a, b| b.stored_at.cmp(&a.stored_at));
        summaries
    }

    /// # Returns
    /// `true` if a record was removed
    pub async fn remove(&self, id: &str) -> BackendResult<bool> {
        let mut records = self.records.write().await;
        let Some(removed) = records.remove(id) else {
            return Ok(false);
        };
        let persisted = self.persist(&records).await;
        if let Err(e) = persisted {
            records.insert(id.to_string(), removed);
            return Err(e);
        }
        Ok(true)
    }

    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    /// Replace the data file with `records` via a temp file and rename
    async fn persist(&self, records: &Records) -> BackendResult<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        let bytes = serde_json::to_vec_pretty(records)?;

        let mut temp_path = path.clone().into_os_string();
        temp_path.push(".tmp");
        let temp_path = PathBuf::from(temp_path);

        let mut file = tokio::fs::File::create(&temp_path).await?;
        file.write_all(&bytes).await?;
        file.sync_all().await?;
        drop(file);

        tokio::fs::rename(&temp_path, path).await?;
        Ok(())
    }
}
