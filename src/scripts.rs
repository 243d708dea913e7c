//! Script Discovery: turns the source registry plus the current filesystem
//! into concrete runnable scripts.
//!
//! Discovery is a pure function of the registry and the on-disk state: no
//! caching, no side effects, and two back-to-back passes over unchanged files
//! yield identical results. A malformed source is skipped with a warning and
//! never aborts the pass.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;
use tracing::{debug, instrument, warn};

use crate::error::ResultExt;
use crate::script_types::{self, ScriptType, SCRIPT_TYPES};
use crate::sources::{Source, SourceKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScriptKind {
    PackageScript,
    MakeTarget,
    FileScript,
}

/// One discovered runnable unit. Derived on every pass, never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Script {
    pub kind: ScriptKind,
    /// Stable lookup key for overrides, labels, and run state
    pub identity: String,
    pub display_label: String,
    pub default_command: String,
    pub working_dir: PathBuf,
    pub source_file: PathBuf,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PackageManager {
    Npm,
    Yarn,
    Pnpm,
    Bun,
}

impl PackageManager {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Npm => "npm",
            Self::Yarn => "yarn",
            Self::Pnpm => "pnpm",
            Self::Bun => "bun",
        }
    }

    fn run_command(&self, script_name: &str) -> String {
        format!("{} run {}", self.as_str(), script_name)
    }
}

/// Scripts grouped under one package manifest.
#[derive(Debug, Clone)]
pub struct PackageGroup {
    pub label: String,
    pub manager: PackageManager,
    pub manifest_path: PathBuf,
    pub scripts: Vec<Script>,
}

/// Targets grouped under one Makefile.
#[derive(Debug, Clone)]
pub struct MakefileGroup {
    pub makefile_path: PathBuf,
    pub targets: Vec<Script>,
}

/// Extension-matched files grouped per script type.
#[derive(Debug, Clone)]
pub struct TypeGroup {
    pub type_tag: &'static str,
    pub label: &'static str,
    pub scripts: Vec<Script>,
}

/// The full result of one discovery pass.
#[derive(Debug, Clone, Default)]
pub struct Discovery {
    pub packages: Vec<PackageGroup>,
    pub makefiles: Vec<MakefileGroup>,
    pub file_groups: Vec<TypeGroup>,
}

impl Default for PackageManager {
    fn default() -> Self {
        Self::Npm
    }
}

/// Run one discovery pass over the given sources.
#[instrument(level = "debug", skip_all, fields(source_count = sources.len()))]
pub fn discover(sources: &[Source]) -> Discovery {
    let mut discovery = Discovery::default();

    for source in sources {
        match source.kind {
            SourceKind::PackageManifest => {
                if let Some(group) = discover_package(&source.path) {
                    discovery.packages.push(group);
                }
            }
            SourceKind::Directory => {
                if let Some(group) = discover_makefile(&source.path) {
                    discovery.makefiles.push(group);
                }
            }
            SourceKind::File => {}
        }
    }

    discovery.file_groups = discover_file_scripts(sources);

    debug!(
        packages = discovery.packages.len(),
        makefiles = discovery.makefiles.len(),
        file_groups = discovery.file_groups.len(),
        "Discovery pass complete"
    );
    discovery
}

// ---------------------------------------------------------------------------
// Package manifests
// ---------------------------------------------------------------------------

/// Lock files checked for package manager inference, presence-only.
const LOCK_FILES: &[(&str, PackageManager)] = &[
    ("package-lock.json", PackageManager::Npm),
    ("yarn.lock", PackageManager::Yarn),
    ("pnpm-lock.yaml", PackageManager::Pnpm),
    ("bun.lockb", PackageManager::Bun),
];

/// Canonical lifecycle scripts inspected for manager invocations.
const LIFECYCLE_SCRIPTS: &[&str] = &["start", "dev", "build", "run"];

/// Manager tokens in specificity order: "pnpm run x" contains "npm", so the
/// generic token must be checked last.
const MANAGER_TOKENS: &[(&str, PackageManager)] = &[
    ("pnpm", PackageManager::Pnpm),
    ("yarn", PackageManager::Yarn),
    ("bun", PackageManager::Bun),
    ("npm", PackageManager::Npm),
];

fn discover_package(manifest_path: &Path) -> Option<PackageGroup> {
    let content = match std::fs::read_to_string(manifest_path) {
        Ok(content) => content,
        Err(e) => {
            warn!(error = %e, path = %manifest_path.display(), "Could not read manifest, skipping");
            return None;
        }
    };

    let manifest: Value = match serde_json::from_str(&content) {
        Ok(value) => value,
        Err(e) => {
            warn!(error = %e, path = %manifest_path.display(), "Manifest unparsable, skipping");
            return None;
        }
    };

    let scripts_map = manifest.get("scripts").and_then(|s| s.as_object())?;
    if scripts_map.is_empty() {
        return None;
    }

    let dir = manifest_path.parent().unwrap_or_else(|| Path::new("."));
    let label = manifest
        .get("name")
        .and_then(|n| n.as_str())
        .map(|n| n.to_string())
        .or_else(|| dir.file_name().map(|d| d.to_string_lossy().to_string()))
        .unwrap_or_else(|| "package".to_string());

    let manager = resolve_package_manager(&manifest, scripts_map, dir);

    let scripts = scripts_map
        .keys()
        .map(|name| Script {
            kind: ScriptKind::PackageScript,
            identity: format!("npm:{}:{}", manifest_path.display(), name),
            display_label: name.clone(),
            default_command: manager.run_command(name),
            working_dir: dir.to_path_buf(),
            source_file: manifest_path.to_path_buf(),
        })
        .collect();

    Some(PackageGroup {
        label,
        manager,
        manifest_path: manifest_path.to_path_buf(),
        scripts,
    })
}

/// Resolve the package manager for a manifest: explicit `packageManager`
/// field, then lock file presence, then manager tokens in the canonical
/// lifecycle scripts, defaulting to npm.
fn resolve_package_manager(
    manifest: &Value,
    scripts_map: &serde_json::Map<String, Value>,
    dir: &Path,
) -> PackageManager {
    // 1. Explicit "<tool>@<version>" field
    if let Some(field) = manifest.get("packageManager").and_then(|p| p.as_str()) {
        let tool = field.split('@').next().unwrap_or("");
        for (token, manager) in MANAGER_TOKENS {
            if tool == *token {
                return *manager;
            }
        }
    }

    // 2. Lock file presence
    for (lock_file, manager) in LOCK_FILES {
        if dir.join(lock_file).exists() {
            return *manager;
        }
    }

    // 3. Manager invocations inside lifecycle scripts
    for name in LIFECYCLE_SCRIPTS {
        if let Some(command) = scripts_map.get(*name).and_then(|c| c.as_str()) {
            for (token, manager) in MANAGER_TOKENS {
                if command.contains(token) {
                    return *manager;
                }
            }
        }
    }

    PackageManager::default()
}

// ---------------------------------------------------------------------------
// Makefiles
// ---------------------------------------------------------------------------

/// Canonical Makefile names, probed in order.
const MAKEFILE_NAMES: &[&str] = &["Makefile", "makefile", "GNUmakefile"];

/// A target line: identifier at start of line, immediately a rule colon.
/// Excludes dot rules (.PHONY), pattern rules, and := assignments.
static TARGET_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([A-Za-z_][A-Za-z0-9_-]*):(?:[^=]|$)").expect("valid target regex")
});

fn discover_makefile(dir: &Path) -> Option<MakefileGroup> {
    for name in MAKEFILE_NAMES {
        let makefile_path = dir.join(name);
        if !makefile_path.is_file() {
            continue;
        }

        let content = match std::fs::read_to_string(&makefile_path) {
            Ok(content) => content,
            Err(e) => {
                warn!(error = %e, path = %makefile_path.display(), "Could not read Makefile, skipping");
                continue;
            }
        };

        let targets = extract_make_targets(&content);
        if targets.is_empty() {
            // Probe order requires the first file that exists AND parses to
            // at least one target
            continue;
        }

        let make = script_types::make_type();
        let scripts = targets
            .into_iter()
            .map(|target| Script {
                kind: ScriptKind::MakeTarget,
                identity: format!("make:{}:{}", makefile_path.display(), target),
                display_label: target.clone(),
                default_command: make.default_command(&target),
                working_dir: dir.to_path_buf(),
                source_file: makefile_path.clone(),
            })
            .collect();

        return Some(MakefileGroup {
            makefile_path,
            targets: scripts,
        });
    }
    None
}

/// Extract target names from Makefile text: `identifier:` at start of line,
/// deduplicated, first-occurrence order.
pub fn extract_make_targets(content: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut targets = Vec::new();
    for line in content.lines() {
        if let Some(caps) = TARGET_LINE.captures(line) {
            let target = caps[1].to_string();
            if seen.insert(target.clone()) {
                targets.push(target);
            }
        }
    }
    targets
}

// ---------------------------------------------------------------------------
// File-type scripts
// ---------------------------------------------------------------------------

fn discover_file_scripts(sources: &[Source]) -> Vec<TypeGroup> {
    // One bucket per type, in table order; dedupe across all origins by
    // absolute path
    let mut buckets: Vec<Vec<Script>> = SCRIPT_TYPES.iter().map(|_| Vec::new()).collect();
    let mut seen: HashSet<PathBuf> = HashSet::new();

    for source in sources {
        match source.kind {
            SourceKind::Directory => {
                let mut children = match list_children(&source.path) {
                    Some(children) => children,
                    None => continue,
                };
                // Directory-sourced files sort by filename
                children.sort_by_key(|p| p.file_name().map(|n| n.to_os_string()));
                for path in children {
                    collect_file_script(&path, &mut buckets, &mut seen);
                }
            }
            SourceKind::File => {
                collect_file_script(&source.path, &mut buckets, &mut seen);
            }
            SourceKind::PackageManifest => {}
        }
    }

    let mut groups = Vec::new();
    for (i, script_type) in SCRIPT_TYPES.iter().enumerate() {
        let scripts = std::mem::take(&mut buckets[i]);
        if !scripts.is_empty() {
            groups.push(TypeGroup {
                type_tag: script_type.tag,
                label: script_type.label,
                scripts,
            });
        }
    }
    groups
}

fn list_children(dir: &Path) -> Option<Vec<PathBuf>> {
    let entries = std::fs::read_dir(dir).warn_on_err()?;
    Some(
        entries
            .flatten()
            .filter(|e| e.file_type().map(|t| t.is_file()).unwrap_or(false))
            .map(|e| e.path())
            .collect(),
    )
}

fn collect_file_script(
    path: &Path,
    buckets: &mut [Vec<Script>],
    seen: &mut HashSet<PathBuf>,
) {
    let ext = match path.extension().and_then(|e| e.to_str()) {
        Some(ext) => ext.to_lowercase(),
        None => return,
    };
    let script_type = match script_types::type_for_extension(&ext) {
        Some(script_type) => script_type,
        None => return,
    };
    if !seen.insert(path.to_path_buf()) {
        return;
    }

    let index = SCRIPT_TYPES
        .iter()
        .position(|t| t.tag == script_type.tag)
        .expect("type came from the static table");
    buckets[index].push(file_script(path, script_type));
}

fn file_script(path: &Path, script_type: &'static ScriptType) -> Script {
    let filename = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();
    Script {
        kind: ScriptKind::FileScript,
        identity: path.display().to_string(),
        display_label: filename.clone(),
        default_command: script_type.default_command(&filename),
        working_dir: path.parent().unwrap_or_else(|| Path::new(".")).to_path_buf(),
        source_file: path.to_path_buf(),
    }
}

// ---------------------------------------------------------------------------
// Script file creation (boilerplate templates)
// ---------------------------------------------------------------------------

/// Create a new script file seeded with the type's boilerplate template.
/// Fails if the file already exists.
pub fn create_script_file(dir: &Path, filename: &str, type_tag: &str) -> crate::error::Result<PathBuf> {
    let script_type = script_types::type_for_tag(type_tag).ok_or_else(|| {
        crate::error::DockError::UnsupportedFileType {
            path: filename.to_string(),
        }
    })?;

    let path = dir.join(filename);
    if path.exists() {
        return Err(crate::error::DockError::InvalidCommand(format!(
            "{} already exists",
            path.display()
        )));
    }

    std::fs::write(&path, script_type.boilerplate)?;
    debug!(path = %path.display(), type_tag, "Created script file from template");
    Ok(path)
}

#[cfg(test)]
#[path = "scripts_tests.rs"]
mod tests;
