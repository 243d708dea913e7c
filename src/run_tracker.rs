//! Run State Tracker: maps terminal names to the command believed to be
//! executing in them.
//!
//! One tracker instance owns all mutable run state (created at activation,
//! dropped at teardown; no ambient globals). Every transition is a
//! synchronous reaction to one event and returns the side effects for the
//! driver to apply, which keeps the machine drivable from tests without a
//! live terminal.
//!
//! Terminal name equals the script's display label, so two identities that
//! render the same label share one terminal and one run state. Renaming a
//! label does not rename an already-open terminal.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use tracing::{debug, info};

use crate::terminal::ExecutionId;

/// How completion will be detected for a running terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunPhase {
    /// Command queued; the shell's completion-detection capability has not
    /// signaled availability yet.
    AwaitingCapability,
    /// Dispatched through the capability; a completion event is expected.
    Trackable,
    /// Dispatched via raw text injection after the grace period; no
    /// completion event will ever arrive. Cleared only by terminal close or
    /// explicit stop.
    Untrackable,
}

/// Side effects for the driver to apply after a transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    CreateTerminal { name: String, cwd: PathBuf },
    Interrupt { name: String },
    SendText { name: String, text: String },
    /// Dispatch through the capability; the driver must record the returned
    /// handle via [`RunTracker::record_execution`].
    Execute { name: String, command: String },
    ScheduleGrace { name: String, generation: u64 },
    ScheduleSettleDispatch { name: String, command: String, generation: u64 },
}

/// A command queued for a terminal whose capability is not yet available.
/// The generation lets a stale grace timer recognize it has been superseded.
#[derive(Debug, Clone)]
struct PendingCommand {
    command: String,
    generation: u64,
}

#[derive(Default)]
pub struct RunTracker {
    /// Terminal names currently believed to be executing a command
    running: HashSet<String>,
    phase: HashMap<String, RunPhase>,
    pending: HashMap<String, PendingCommand>,
    /// In-flight trackable execution per terminal, matched against
    /// completion events
    tracked: HashMap<String, ExecutionId>,
    /// Terminals currently open
    open: HashSet<String>,
    /// Terminals whose capability has signaled availability
    capability_ready: HashSet<String>,
    generations: HashMap<String, u64>,
    started_at: HashMap<String, DateTime<Utc>>,
}

impl RunTracker {
    pub fn new() -> Self {
        Self::default()
    }

    // -- queries ------------------------------------------------------------

    pub fn is_running(&self, name: &str) -> bool {
        self.running.contains(name)
    }

    pub fn phase(&self, name: &str) -> Option<RunPhase> {
        self.phase.get(name).copied()
    }

    pub fn started_at(&self, name: &str) -> Option<DateTime<Utc>> {
        self.started_at.get(name).copied()
    }

    pub fn is_terminal_open(&self, name: &str) -> bool {
        self.open.contains(name)
    }

    /// Snapshot of running terminal names for display.
    pub fn running_snapshot(&self) -> Vec<String> {
        self.running.iter().cloned().collect()
    }

    // -- transitions --------------------------------------------------------

    /// Start `command` in the terminal named `name`.
    pub fn start_command(&mut self, name: &str, command: &str, cwd: &Path) -> Vec<Effect> {
        // Any previously tracked execution no longer represents the current
        // command; its completion event must not clear the new run.
        self.tracked.remove(name);

        self.running.insert(name.to_string());
        self.started_at.insert(name.to_string(), Utc::now());
        self.phase
            .insert(name.to_string(), RunPhase::AwaitingCapability);

        if !self.open.contains(name) {
            let generation = self.queue_pending(name, command);
            info!(terminal = name, command, "Starting command in new terminal");
            return vec![
                Effect::CreateTerminal {
                    name: name.to_string(),
                    cwd: cwd.to_path_buf(),
                },
                Effect::ScheduleGrace {
                    name: name.to_string(),
                    generation,
                },
            ];
        }

        if self.capability_ready.contains(name) {
            // Interrupt whatever is running, then dispatch after the settle
            // delay; interrupt and dispatch race inside the shell if sent
            // back-to-back. The generation lets a settle timer recognize a
            // later restart superseded it.
            let generation = self.next_generation(name);
            info!(terminal = name, command, "Reusing capability-ready terminal");
            return vec![
                Effect::Interrupt {
                    name: name.to_string(),
                },
                Effect::ScheduleSettleDispatch {
                    name: name.to_string(),
                    command: command.to_string(),
                    generation,
                },
            ];
        }

        let generation = self.queue_pending(name, command);
        info!(terminal = name, command, "Reusing terminal, capability unavailable");
        vec![
            Effect::Interrupt {
                name: name.to_string(),
            },
            Effect::ScheduleGrace {
                name: name.to_string(),
                generation,
            },
        ]
    }

    /// The terminal opened.
    pub fn on_terminal_opened(&mut self, name: &str) {
        debug!(terminal = name, "Terminal opened");
        self.open.insert(name.to_string());
    }

    /// The terminal's completion-detection capability became available.
    pub fn on_capability_available(&mut self, name: &str) -> Vec<Effect> {
        self.capability_ready.insert(name.to_string());

        if let Some(pending) = self.pending.remove(name) {
            debug!(terminal = name, "Capability available, dispatching queued command");
            return vec![Effect::Execute {
                name: name.to_string(),
                command: pending.command,
            }];
        }
        Vec::new()
    }

    /// The driver dispatched through the capability and received a handle.
    pub fn record_execution(&mut self, name: &str, execution: ExecutionId) {
        if !self.running.contains(name) {
            // Terminal closed or stop arrived between dispatch and record
            return;
        }
        self.tracked.insert(name.to_string(), execution);
        self.phase.insert(name.to_string(), RunPhase::Trackable);
    }

    /// The grace timer fired. Dispatches via raw text only when the queued
    /// command is still the one the timer was started for.
    pub fn on_grace_elapsed(&mut self, name: &str, generation: u64) -> Vec<Effect> {
        match self.pending.remove(name) {
            Some(pending) if pending.generation == generation => {
                info!(
                    terminal = name,
                    command = %pending.command,
                    "Capability never arrived, dispatching untracked"
                );
                self.phase.insert(name.to_string(), RunPhase::Untrackable);
                vec![Effect::SendText {
                    name: name.to_string(),
                    text: format!("{}\n", pending.command),
                }]
            }
            Some(newer) => {
                // A later start re-queued this terminal; put it back.
                self.pending.insert(name.to_string(), newer);
                Vec::new()
            }
            None => Vec::new(),
        }
    }

    /// The settle delay after an interrupt elapsed; dispatch unless a later
    /// restart superseded this timer or the terminal stopped or closed in
    /// the meantime.
    pub fn on_settle_elapsed(&mut self, name: &str, command: &str, generation: u64) -> Vec<Effect> {
        if self.generations.get(name) != Some(&generation) {
            debug!(terminal = name, generation, "Ignoring superseded settle dispatch");
            return Vec::new();
        }
        if self.running.contains(name) && self.open.contains(name) {
            return vec![Effect::Execute {
                name: name.to_string(),
                command: command.to_string(),
            }];
        }
        Vec::new()
    }

    /// A trackable execution ended. Stale or unrelated handles are ignored;
    /// they are an expected consequence of terminal reuse.
    pub fn on_execution_ended(&mut self, name: &str, execution: ExecutionId) {
        match self.tracked.get(name) {
            Some(current) if *current == execution => {
                info!(terminal = name, "Tracked execution ended");
                self.tracked.remove(name);
                self.clear_run_state(name);
            }
            _ => {
                debug!(terminal = name, ?execution, "Ignoring stale completion event");
            }
        }
    }

    /// The terminal closed: all state for the name goes away.
    pub fn on_terminal_closed(&mut self, name: &str) {
        debug!(terminal = name, "Terminal closed");
        self.open.remove(name);
        self.capability_ready.remove(name);
        self.pending.remove(name);
        self.tracked.remove(name);
        self.clear_run_state(name);
    }

    /// Explicit stop: interrupt and mark idle immediately, without waiting
    /// for confirmation. A command that ignores the interrupt leaves state
    /// and reality diverged until the terminal closes.
    pub fn stop(&mut self, name: &str) -> Vec<Effect> {
        if !self.running.contains(name) {
            return Vec::new();
        }
        info!(terminal = name, "Stopping command");
        self.pending.remove(name);
        self.tracked.remove(name);
        self.clear_run_state(name);
        vec![Effect::Interrupt {
            name: name.to_string(),
        }]
    }

    // -- internals ----------------------------------------------------------

    /// Bump and return the terminal's generation. Every start path takes a
    /// new generation so earlier grace and settle timers can detect they
    /// were superseded.
    fn next_generation(&mut self, name: &str) -> u64 {
        let generation = self
            .generations
            .entry(name.to_string())
            .and_modify(|g| *g += 1)
            .or_insert(1);
        *generation
    }

    fn queue_pending(&mut self, name: &str, command: &str) -> u64 {
        let generation = self.next_generation(name);
        // A later queue for the same terminal overwrites the earlier one
        self.pending.insert(
            name.to_string(),
            PendingCommand {
                command: command.to_string(),
                generation,
            },
        );
        generation
    }

    fn clear_run_state(&mut self, name: &str) {
        self.running.remove(name);
        self.phase.remove(name);
        self.started_at.remove(name);
    }
}

#[cfg(test)]
#[path = "run_tracker_tests.rs"]
mod tests;
