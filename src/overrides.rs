//! Persisted identity -> string maps: command overrides and display names.
//!
//! Both maps are keyed by script identity and live independently of the
//! scripts themselves: an entry stays stored (inert) while its script is
//! absent and applies again when the identity reappears. Writes validate at
//! the boundary and persist synchronously; resolution is a pure lookup that
//! never fails.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{info, warn};

use crate::error::{DockError, Result};
use crate::storage::WorkspaceStore;

/// One persisted identity -> string map.
pub struct IdentityMap {
    store: Arc<Mutex<dyn WorkspaceStore>>,
    store_key: &'static str,
    entries: HashMap<String, String>,
}

impl IdentityMap {
    fn load(store: Arc<Mutex<dyn WorkspaceStore>>, store_key: &'static str) -> Self {
        let entries = store
            .lock()
            .read(store_key)
            .and_then(
                |value| match serde_json::from_value::<HashMap<String, String>>(value) {
                    Ok(entries) => Some(entries),
                    Err(e) => {
                        warn!(error = %e, store_key, "Stored map unparsable, starting empty");
                        None
                    }
                },
            )
            .unwrap_or_default();

        Self {
            store,
            store_key,
            entries,
        }
    }

    pub fn get(&self, identity: &str) -> Option<&str> {
        self.entries.get(identity).map(|s| s.as_str())
    }

    /// Store `value` for `identity`. Rejects values that are empty after
    /// trimming; persists before returning.
    pub fn set(&mut self, identity: &str, value: &str) -> Result<()> {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            return Err(DockError::InvalidCommand(
                "Value must not be empty".to_string(),
            ));
        }
        self.entries.insert(identity.to_string(), trimmed.to_string());
        self.persist()
    }

    /// Remove the entry for `identity`. Silent no-op when absent.
    pub fn clear(&mut self, identity: &str) -> Result<()> {
        if self.entries.remove(identity).is_some() {
            self.persist()?;
        }
        Ok(())
    }

    fn persist(&self) -> Result<()> {
        let value = serde_json::to_value(&self.entries)
            .map_err(|e| DockError::Storage(e.to_string()))?;
        self.store.lock().write(self.store_key, value)
    }
}

/// Command overrides: identity -> effective command.
pub struct CommandOverrides {
    map: IdentityMap,
}

impl CommandOverrides {
    pub fn load(store: Arc<Mutex<dyn WorkspaceStore>>) -> Self {
        Self {
            map: IdentityMap::load(store, "commandOverrides"),
        }
    }

    /// The effective command for a script: the stored override when present,
    /// else the default. Pure lookup, never fails.
    pub fn resolve(&self, identity: &str, default_command: &str) -> String {
        self.map
            .get(identity)
            .map(|c| c.to_string())
            .unwrap_or_else(|| default_command.to_string())
    }

    pub fn set(&mut self, identity: &str, command: &str) -> Result<()> {
        info!(identity, command, "Setting command override");
        self.map.set(identity, command)
    }

    pub fn clear(&mut self, identity: &str) -> Result<()> {
        self.map.clear(identity)
    }
}

/// Display names: identity -> label shown in the tree.
pub struct DisplayNames {
    map: IdentityMap,
}

impl DisplayNames {
    pub fn load(store: Arc<Mutex<dyn WorkspaceStore>>) -> Self {
        Self {
            map: IdentityMap::load(store, "displayNames"),
        }
    }

    /// The effective label: the stored name when present, else the default.
    pub fn resolve(&self, identity: &str, default_label: &str) -> String {
        self.map
            .get(identity)
            .map(|l| l.to_string())
            .unwrap_or_else(|| default_label.to_string())
    }

    pub fn set(&mut self, identity: &str, label: &str) -> Result<()> {
        info!(identity, label, "Setting display name");
        self.map.set(identity, label)
    }

    pub fn clear(&mut self, identity: &str) -> Result<()> {
        self.map.clear(identity)
    }
}
