//! Source Registry: the persisted set of user-added script sources.
//!
//! A source is a package manifest, a directory, or a single file. Identity is
//! `(kind, path)`; duplicates are rejected at add time and removal matches by
//! path alone. Every mutation persists synchronously before returning.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::{DockError, Result};
use crate::script_types;
use crate::storage::WorkspaceStore;

const STORE_KEY: &str = "sources";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SourceKind {
    PackageManifest,
    Directory,
    File,
}

/// One user-registered origin of scripts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Source {
    pub kind: SourceKind,
    pub path: PathBuf,
}

impl Source {
    pub fn new(kind: SourceKind, path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        // Expand ~ from user-entered paths; everything downstream is absolute
        let expanded = shellexpand::tilde(&path.to_string_lossy()).to_string();
        Self {
            kind,
            path: PathBuf::from(expanded),
        }
    }
}

pub struct SourceRegistry {
    store: Arc<Mutex<dyn WorkspaceStore>>,
    sources: Vec<Source>,
}

impl SourceRegistry {
    /// Load the registry from the workspace store.
    pub fn load(store: Arc<Mutex<dyn WorkspaceStore>>) -> Self {
        let sources = store
            .lock()
            .read(STORE_KEY)
            .and_then(|value| match serde_json::from_value::<Vec<Source>>(value) {
                Ok(sources) => Some(sources),
                Err(e) => {
                    warn!(error = %e, "Stored source list unparsable, starting empty");
                    None
                }
            })
            .unwrap_or_default();

        Self { store, sources }
    }

    /// All registered sources in persisted order.
    pub fn get_all(&self) -> Vec<Source> {
        self.sources.clone()
    }

    /// Add a source. Returns false (without persisting) when an identical
    /// `(kind, path)` entry already exists. File sources with an unrecognized
    /// extension are rejected so the caller can report them.
    pub fn add(&mut self, source: Source) -> Result<bool> {
        if source.kind == SourceKind::File {
            let recognized = source
                .path
                .extension()
                .and_then(|e| e.to_str())
                .map(|e| script_types::type_for_extension(&e.to_lowercase()).is_some())
                .unwrap_or(false);
            if !recognized {
                return Err(DockError::UnsupportedFileType {
                    path: source.path.display().to_string(),
                });
            }
        }

        if self.sources.contains(&source) {
            return Ok(false);
        }

        info!(kind = ?source.kind, path = %source.path.display(), "Adding script source");
        self.sources.push(source);
        self.persist()?;
        Ok(true)
    }

    /// Remove all sources matching `path`, regardless of kind. Silent no-op
    /// when nothing matches.
    pub fn remove(&mut self, path: &Path) -> Result<()> {
        let initial_len = self.sources.len();
        self.sources.retain(|s| s.path != path);
        if self.sources.len() < initial_len {
            info!(path = %path.display(), "Removed script source");
            self.persist()?;
        }
        Ok(())
    }

    fn persist(&self) -> Result<()> {
        let value = serde_json::to_value(&self.sources)
            .map_err(|e| DockError::Storage(e.to_string()))?;
        self.store.lock().write(STORE_KEY, value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;

    fn registry() -> SourceRegistry {
        SourceRegistry::load(Arc::new(Mutex::new(MemoryStore::new())))
    }

    #[test]
    fn test_add_deduplicates() {
        let mut reg = registry();
        let src = Source::new(SourceKind::Directory, "/a");
        assert!(reg.add(src.clone()).unwrap());
        assert!(!reg.add(src).unwrap());
        assert_eq!(reg.get_all().len(), 1);
    }

    #[test]
    fn test_same_path_different_kind_is_distinct() {
        let mut reg = registry();
        assert!(reg.add(Source::new(SourceKind::Directory, "/a")).unwrap());
        assert!(reg
            .add(Source::new(SourceKind::PackageManifest, "/a"))
            .unwrap());
        assert_eq!(reg.get_all().len(), 2);
    }

    #[test]
    fn test_remove_matches_by_path_only() {
        let mut reg = registry();
        reg.add(Source::new(SourceKind::Directory, "/a")).unwrap();
        reg.add(Source::new(SourceKind::PackageManifest, "/a")).unwrap();
        reg.add(Source::new(SourceKind::Directory, "/b")).unwrap();

        reg.remove(Path::new("/a")).unwrap();
        let remaining = reg.get_all();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].path, PathBuf::from("/b"));
    }

    #[test]
    fn test_remove_absent_is_silent() {
        let mut reg = registry();
        reg.remove(Path::new("/nothing")).unwrap();
        assert!(reg.get_all().is_empty());
    }

    #[test]
    fn test_unsupported_file_extension_rejected() {
        let mut reg = registry();
        let err = reg
            .add(Source::new(SourceKind::File, "/a/blob.exe"))
            .unwrap_err();
        assert!(matches!(err, DockError::UnsupportedFileType { .. }));
        assert!(reg.get_all().is_empty());
    }

    #[test]
    fn test_registry_persists_across_load() {
        let store: Arc<Mutex<dyn WorkspaceStore>> = Arc::new(Mutex::new(MemoryStore::new()));
        {
            let mut reg = SourceRegistry::load(store.clone());
            reg.add(Source::new(SourceKind::Directory, "/a")).unwrap();
        }
        let reg = SourceRegistry::load(store);
        assert_eq!(reg.get_all().len(), 1);
    }
}
