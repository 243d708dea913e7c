//! Workspace-scoped keyed blob storage.
//!
//! The dock persists three small documents (source list, command overrides,
//! display names) through the `WorkspaceStore` trait. The storage engine is
//! an external collaborator; `JsonFileStore` is the file-backed default and
//! `MemoryStore` backs tests. Every write replaces the whole document
//! atomically so a crash mid-write never leaves a torn store.

use std::collections::BTreeMap;
use std::path::PathBuf;

use anyhow::Context;
use serde_json::Value;
use tracing::{debug, info, instrument};

use crate::error::{DockError, Result};

/// Keyed blob storage scoped to one workspace.
///
/// Mutations must persist synchronously before returning.
pub trait WorkspaceStore: Send {
    /// Read the value stored under `key`, if any.
    fn read(&self, key: &str) -> Option<Value>;

    /// Replace the value stored under `key` and persist before returning.
    fn write(&mut self, key: &str, value: Value) -> Result<()>;
}

/// JSON-file-backed store: one file per workspace holding a flat object.
pub struct JsonFileStore {
    file_path: PathBuf,
    // BTreeMap keeps the on-disk document stable across saves
    entries: BTreeMap<String, Value>,
}

impl JsonFileStore {
    /// Open (or start fresh at) `file_path`.
    ///
    /// An unreadable or unparsable file starts the store empty rather than
    /// failing activation; the first write replaces it.
    #[instrument(name = "store_open", skip_all, fields(path = %file_path.display()))]
    pub fn open(file_path: PathBuf) -> Self {
        let entries = match std::fs::read_to_string(&file_path) {
            Ok(content) => match serde_json::from_str::<BTreeMap<String, Value>>(&content) {
                Ok(entries) => {
                    info!(entry_count = entries.len(), "Loaded workspace store");
                    entries
                }
                Err(e) => {
                    tracing::warn!(error = %e, "Workspace store unparsable, starting fresh");
                    BTreeMap::new()
                }
            },
            Err(_) => {
                debug!("Workspace store file not found, starting fresh");
                BTreeMap::new()
            }
        };

        Self { file_path, entries }
    }

    /// Persist the whole document using atomic write (write temp + rename).
    fn save(&self) -> anyhow::Result<()> {
        if let Some(parent) = self.file_path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
        }

        let json =
            serde_json::to_string(&self.entries).context("Failed to serialize workspace store")?;

        // Atomic write: write to temp file, then rename
        let temp_path = self.file_path.with_extension("json.tmp");
        std::fs::write(&temp_path, &json)
            .with_context(|| format!("Failed to write temp store file: {}", temp_path.display()))?;
        std::fs::rename(&temp_path, &self.file_path).with_context(|| {
            format!("Failed to rename temp file to {}", self.file_path.display())
        })?;

        debug!(
            path = %self.file_path.display(),
            bytes = json.len(),
            "Saved workspace store (atomic)"
        );
        Ok(())
    }
}

impl WorkspaceStore for JsonFileStore {
    fn read(&self, key: &str) -> Option<Value> {
        self.entries.get(key).cloned()
    }

    fn write(&mut self, key: &str, value: Value) -> Result<()> {
        self.entries.insert(key.to_string(), value);
        self.save().map_err(|e| DockError::Storage(e.to_string()))
    }
}

/// In-memory store for tests and ephemeral hosts.
#[derive(Default)]
pub struct MemoryStore {
    entries: BTreeMap<String, Value>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl WorkspaceStore for MemoryStore {
    fn read(&self, key: &str) -> Option<Value> {
        self.entries.get(key).cloned()
    }

    fn write(&mut self, key: &str, value: Value) -> Result<()> {
        self.entries.insert(key.to_string(), value);
        Ok(())
    }
}
