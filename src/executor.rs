//! Execution Driver: issues resolved commands into terminals and feeds the
//! run state tracker.
//!
//! The driver reuses an open terminal whose name equals the script's label,
//! or creates one anchored to the script's working directory and the user's
//! default shell. Dispatch is fire-and-forget: success or failure of the
//! underlying command is visible only through terminal output and the
//! derived run state.
//!
//! The two modeled delays (grace period after queuing, settle delay after an
//! interrupt) are deferred events posted from a timer thread back into the
//! single event queue the host drains via [`Executor::pump`] - not blocking
//! waits.

use std::path::Path;
use std::sync::mpsc::{channel, Receiver, Sender};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tracing::{debug, instrument};

use crate::config::DockConfig;
use crate::run_tracker::{Effect, RunTracker};
use crate::terminal::{TerminalEvent, TerminalHost};

/// Timer events re-entering the event queue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeferredEvent {
    /// The grace period for a queued command elapsed.
    GraceElapsed { name: String, generation: u64 },
    /// The settle delay after interrupting a busy terminal elapsed.
    DispatchAfterInterrupt {
        name: String,
        command: String,
        generation: u64,
    },
}

pub struct Executor<H: TerminalHost> {
    host: H,
    tracker: Arc<Mutex<RunTracker>>,
    tx: Sender<DeferredEvent>,
    rx: Receiver<DeferredEvent>,
    grace_period: Duration,
    settle_delay: Duration,
    shell: String,
}

impl<H: TerminalHost> Executor<H> {
    pub fn new(host: H, config: &DockConfig) -> Self {
        let (tx, rx) = channel();
        Self {
            host,
            tracker: Arc::new(Mutex::new(RunTracker::new())),
            tx,
            rx,
            grace_period: config.get_grace_period(),
            settle_delay: config.get_interrupt_settle(),
            shell: config.get_shell(),
        }
    }

    /// Shared handle to the run state, for display snapshots.
    pub fn tracker(&self) -> Arc<Mutex<RunTracker>> {
        self.tracker.clone()
    }

    /// Start `command` in the terminal named `label`. Fire-and-forget.
    #[instrument(level = "debug", skip(self))]
    pub fn run(&mut self, label: &str, command: &str, working_dir: &Path) {
        let effects = self.tracker.lock().start_command(label, command, working_dir);
        self.apply(effects);
    }

    /// Explicit stop action for the terminal named `label`.
    pub fn stop(&mut self, label: &str) {
        let effects = self.tracker.lock().stop(label);
        self.apply(effects);
    }

    /// Feed one terminal lifecycle event into the tracker.
    pub fn handle_event(&mut self, event: TerminalEvent) {
        let effects = match event {
            TerminalEvent::Opened { name } => {
                self.tracker.lock().on_terminal_opened(&name);
                Vec::new()
            }
            TerminalEvent::Closed { name } => {
                self.tracker.lock().on_terminal_closed(&name);
                Vec::new()
            }
            TerminalEvent::CapabilityAvailable { name } => {
                self.tracker.lock().on_capability_available(&name)
            }
            TerminalEvent::ExecutionEnded { name, execution } => {
                self.tracker.lock().on_execution_ended(&name, execution);
                Vec::new()
            }
        };
        self.apply(effects);
    }

    /// Drain deferred timer events. Call from the host's event loop.
    pub fn pump(&mut self) {
        while let Ok(event) = self.rx.try_recv() {
            self.handle_deferred(event);
        }
    }

    /// Handle one deferred timer event.
    pub fn handle_deferred(&mut self, event: DeferredEvent) {
        let effects = match event {
            DeferredEvent::GraceElapsed { name, generation } => {
                self.tracker.lock().on_grace_elapsed(&name, generation)
            }
            DeferredEvent::DispatchAfterInterrupt {
                name,
                command,
                generation,
            } => self
                .tracker
                .lock()
                .on_settle_elapsed(&name, &command, generation),
        };
        self.apply(effects);
    }

    fn apply(&mut self, effects: Vec<Effect>) {
        for effect in effects {
            match effect {
                Effect::CreateTerminal { name, cwd } => {
                    debug!(terminal = %name, cwd = %cwd.display(), shell = %self.shell, "Creating terminal");
                    self.host.create_terminal(&name, &cwd, &self.shell);
                }
                Effect::Interrupt { name } => {
                    self.host.interrupt(&name);
                }
                Effect::SendText { name, text } => {
                    self.host.send_text(&name, &text);
                }
                Effect::Execute { name, command } => {
                    let execution = self.host.execute(&name, &command);
                    self.tracker.lock().record_execution(&name, execution);
                }
                Effect::ScheduleGrace { name, generation } => {
                    self.defer(
                        DeferredEvent::GraceElapsed { name, generation },
                        self.grace_period,
                    );
                }
                Effect::ScheduleSettleDispatch {
                    name,
                    command,
                    generation,
                } => {
                    self.defer(
                        DeferredEvent::DispatchAfterInterrupt {
                            name,
                            command,
                            generation,
                        },
                        self.settle_delay,
                    );
                }
            }
        }
    }

    /// Post `event` back into the queue after `delay`.
    fn defer(&self, event: DeferredEvent, delay: Duration) {
        let tx = self.tx.clone();
        std::thread::spawn(move || {
            std::thread::sleep(delay);
            // Receiver gone means the executor was torn down
            let _ = tx.send(event);
        });
    }
}

#[cfg(test)]
#[path = "executor_tests.rs"]
mod tests;
