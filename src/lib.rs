//! script-dock: discovers runnable scripts across a workspace and tracks
//! which of them are executing in their terminals.
//!
//! The host embeds [`dock::ScriptDock`], supplies a
//! [`terminal::TerminalHost`] and a [`storage::WorkspaceStore`], routes
//! terminal lifecycle events in, and renders the [`tree::TreeGroup`]
//! snapshots it gets back.

pub mod config;
pub mod dock;
pub mod error;
pub mod executor;
pub mod logging;
pub mod overrides;
pub mod run_tracker;
pub mod script_types;
pub mod scripts;
pub mod sources;
pub mod storage;
pub mod terminal;
pub mod tree;

pub use config::DockConfig;
pub use dock::ScriptDock;
pub use error::{DockError, Result};
pub use run_tracker::{RunPhase, RunTracker};
pub use scripts::{Discovery, Script, ScriptKind};
pub use sources::{Source, SourceKind};
pub use storage::{JsonFileStore, MemoryStore, WorkspaceStore};
pub use terminal::{ExecutionId, TerminalEvent, TerminalHost};
pub use tree::{ScriptNode, TreeGroup};
