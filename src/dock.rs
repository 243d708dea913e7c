//! Activation wiring: one `ScriptDock` instance ties the registry, the
//! override maps, discovery, and the execution driver together for the host.
//!
//! The host constructs the dock at activation, routes terminal lifecycle
//! events into [`ScriptDock::on_terminal_event`], drains deferred timer
//! events via [`ScriptDock::pump`] on its event loop, and re-renders from
//! [`ScriptDock::refresh`] snapshots. Dropping the dock tears down all run
//! state.

use std::path::Path;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::instrument;

use crate::config::DockConfig;
use crate::error::Result;
use crate::executor::Executor;
use crate::overrides::{CommandOverrides, DisplayNames};
use crate::scripts;
use crate::sources::{Source, SourceRegistry};
use crate::storage::WorkspaceStore;
use crate::terminal::{TerminalEvent, TerminalHost};
use crate::tree::{self, ScriptNode, TreeGroup};

pub struct ScriptDock<H: TerminalHost> {
    registry: SourceRegistry,
    overrides: CommandOverrides,
    names: DisplayNames,
    executor: Executor<H>,
}

impl<H: TerminalHost> ScriptDock<H> {
    /// Wire the dock up from a workspace store, a terminal host, and config.
    pub fn activate(store: Arc<Mutex<dyn WorkspaceStore>>, host: H, config: DockConfig) -> Self {
        Self {
            registry: SourceRegistry::load(store.clone()),
            overrides: CommandOverrides::load(store.clone()),
            names: DisplayNames::load(store),
            executor: Executor::new(host, &config),
        }
    }

    /// Run a fresh discovery pass and compose the tree for rendering.
    #[instrument(level = "debug", skip(self))]
    pub fn refresh(&self) -> Vec<TreeGroup> {
        let discovery = scripts::discover(&self.registry.get_all());
        let tracker = self.executor.tracker();
        let tracker = tracker.lock();
        tree::build_tree(&discovery, &self.overrides, &self.names, &tracker)
    }

    // -- sources ------------------------------------------------------------

    pub fn add_source(&mut self, source: Source) -> Result<bool> {
        self.registry.add(source)
    }

    pub fn remove_source(&mut self, path: &Path) -> Result<()> {
        self.registry.remove(path)
    }

    pub fn sources(&self) -> Vec<Source> {
        self.registry.get_all()
    }

    // -- overrides and labels ----------------------------------------------

    pub fn set_override(&mut self, identity: &str, command: &str) -> Result<()> {
        self.overrides.set(identity, command)
    }

    pub fn clear_override(&mut self, identity: &str) -> Result<()> {
        self.overrides.clear(identity)
    }

    pub fn set_display_name(&mut self, identity: &str, label: &str) -> Result<()> {
        self.names.set(identity, label)
    }

    pub fn clear_display_name(&mut self, identity: &str) -> Result<()> {
        self.names.clear(identity)
    }

    // -- execution ----------------------------------------------------------

    /// Launch a script from a tree snapshot node.
    pub fn run_script(&mut self, node: &ScriptNode) {
        self.executor.run(&node.label, &node.command, &node.working_dir);
    }

    /// Stop the command running under `label`, if any.
    pub fn stop_script(&mut self, label: &str) {
        self.executor.stop(label);
    }

    /// Run when idle, stop when running.
    pub fn toggle_script(&mut self, node: &ScriptNode) {
        let running = self.executor.tracker().lock().is_running(&node.label);
        if running {
            self.stop_script(&node.label);
        } else {
            self.run_script(node);
        }
    }

    pub fn is_running(&self, label: &str) -> bool {
        self.executor.tracker().lock().is_running(label)
    }

    // -- event intake -------------------------------------------------------

    pub fn on_terminal_event(&mut self, event: TerminalEvent) {
        self.executor.handle_event(event);
    }

    /// Drain deferred timer events; call from the host event loop.
    pub fn pump(&mut self) {
        self.executor.pump();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sources::SourceKind;
    use crate::storage::MemoryStore;
    use crate::terminal::FakeTerminalHost;
    use crate::tree::GroupKind;

    fn dock() -> ScriptDock<FakeTerminalHost> {
        let store: Arc<Mutex<dyn WorkspaceStore>> = Arc::new(Mutex::new(MemoryStore::new()));
        ScriptDock::activate(store, FakeTerminalHost::new(), DockConfig::default())
    }

    #[test]
    fn test_end_to_end_pnpm_manifest() {
        let dir = tempfile::tempdir().unwrap();
        let manifest = dir.path().join("package.json");
        std::fs::write(&manifest, r#"{"name":"app","scripts":{"dev":"vite"}}"#).unwrap();
        std::fs::write(dir.path().join("pnpm-lock.yaml"), "").unwrap();

        let mut dock = dock();
        dock.add_source(Source::new(SourceKind::PackageManifest, &manifest))
            .unwrap();

        let tree = dock.refresh();
        assert_eq!(tree.len(), 1);
        assert_eq!(tree[0].kind, GroupKind::Package);
        assert_eq!(tree[0].label, "app");

        let node = &tree[0].children[0];
        assert_eq!(node.identity, format!("npm:{}:dev", manifest.display()));
        assert_eq!(node.command, "pnpm run dev");
        assert!(!node.running);
    }

    #[test]
    fn test_run_reflects_in_next_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let manifest = dir.path().join("package.json");
        std::fs::write(&manifest, r#"{"name":"app","scripts":{"dev":"vite"}}"#).unwrap();

        let mut dock = dock();
        dock.add_source(Source::new(SourceKind::PackageManifest, &manifest))
            .unwrap();

        let tree = dock.refresh();
        let node = tree[0].children[0].clone();
        dock.run_script(&node);

        let tree = dock.refresh();
        assert!(tree[0].children[0].running);

        dock.stop_script(&node.label);
        let tree = dock.refresh();
        assert!(!tree[0].children[0].running);
    }

    #[test]
    fn test_override_and_rename_apply_to_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let manifest = dir.path().join("package.json");
        std::fs::write(&manifest, r#"{"name":"app","scripts":{"dev":"vite"}}"#).unwrap();

        let mut dock = dock();
        dock.add_source(Source::new(SourceKind::PackageManifest, &manifest))
            .unwrap();

        let identity = format!("npm:{}:dev", manifest.display());
        dock.set_override(&identity, "pnpm dev --host").unwrap();
        dock.set_display_name(&identity, "Dev Server").unwrap();

        let tree = dock.refresh();
        let node = &tree[0].children[0];
        assert_eq!(node.command, "pnpm dev --host");
        assert_eq!(node.label, "Dev Server");
        // Identity is stable under the rename
        assert_eq!(node.identity, identity);
    }

    #[test]
    fn test_toggle_runs_then_stops() {
        let dir = tempfile::tempdir().unwrap();
        let manifest = dir.path().join("package.json");
        std::fs::write(&manifest, r#"{"scripts":{"dev":"vite"}}"#).unwrap();

        let mut dock = dock();
        dock.add_source(Source::new(SourceKind::PackageManifest, &manifest))
            .unwrap();

        let node = dock.refresh()[0].children[0].clone();
        dock.toggle_script(&node);
        assert!(dock.is_running(&node.label));
        dock.toggle_script(&node);
        assert!(!dock.is_running(&node.label));
    }
}
