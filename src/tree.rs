//! Tree composition: the data the presentation collaborator renders.
//!
//! Pure assembly of one discovery pass, the override and display-name maps,
//! and a run state snapshot. No widgets, icons, or decorations here.

use std::path::PathBuf;

use chrono::{DateTime, Utc};

use crate::overrides::{CommandOverrides, DisplayNames};
use crate::run_tracker::{RunPhase, RunTracker};
use crate::scripts::{Discovery, Script};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupKind {
    Package,
    Makefile,
    FileType,
}

/// One renderable script entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptNode {
    pub identity: String,
    /// Effective label (display-name map applied); also the terminal name
    pub label: String,
    /// Effective command (override map applied)
    pub command: String,
    pub working_dir: PathBuf,
    pub running: bool,
    pub phase: Option<RunPhase>,
    pub started_at: Option<DateTime<Utc>>,
}

/// One renderable group heading with its scripts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeGroup {
    pub kind: GroupKind,
    pub label: String,
    pub children: Vec<ScriptNode>,
}

/// Compose the full tree from one discovery pass and the current state.
pub fn build_tree(
    discovery: &Discovery,
    overrides: &CommandOverrides,
    names: &DisplayNames,
    tracker: &RunTracker,
) -> Vec<TreeGroup> {
    let mut groups = Vec::new();

    for package in &discovery.packages {
        groups.push(TreeGroup {
            kind: GroupKind::Package,
            label: package.label.clone(),
            children: compose_scripts(&package.scripts, overrides, names, tracker),
        });
    }

    for makefile in &discovery.makefiles {
        let label = makefile
            .makefile_path
            .parent()
            .and_then(|d| d.file_name())
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| "Makefile".to_string());
        groups.push(TreeGroup {
            kind: GroupKind::Makefile,
            label,
            children: compose_scripts(&makefile.targets, overrides, names, tracker),
        });
    }

    for file_group in &discovery.file_groups {
        groups.push(TreeGroup {
            kind: GroupKind::FileType,
            label: file_group.label.to_string(),
            children: compose_scripts(&file_group.scripts, overrides, names, tracker),
        });
    }

    groups
}

fn compose_scripts(
    scripts: &[Script],
    overrides: &CommandOverrides,
    names: &DisplayNames,
    tracker: &RunTracker,
) -> Vec<ScriptNode> {
    scripts
        .iter()
        .map(|script| {
            let label = names.resolve(&script.identity, &script.display_label);
            // Run state is keyed by terminal name, which is the label
            ScriptNode {
                identity: script.identity.clone(),
                running: tracker.is_running(&label),
                phase: tracker.phase(&label),
                started_at: tracker.started_at(&label),
                command: overrides.resolve(&script.identity, &script.default_command),
                working_dir: script.working_dir.clone(),
                label,
            }
        })
        .collect()
}
