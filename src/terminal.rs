//! Interface to the execution substrate.
//!
//! The terminal is an opaque external collaborator: the dock can create one,
//! send text into it, and ask its shell to execute a command trackably once
//! that capability has been reported available. Process supervision is
//! explicitly not offered; completion is only ever observed through
//! `TerminalEvent::ExecutionEnded`.

use std::path::Path;

/// Conventional interrupt byte sequence (Ctrl+C).
pub const INTERRUPT_SEQUENCE: &str = "\u{3}";

/// Opaque handle identifying one trackable execution, issued by the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ExecutionId(pub u64);

/// The outward interface to the terminal substrate. Keyed by terminal name;
/// one named terminal per visible label.
pub trait TerminalHost {
    /// Open a terminal anchored to `cwd` running `shell`.
    fn create_terminal(&mut self, name: &str, cwd: &Path, shell: &str);

    /// Raw text injection. Untrackable: no completion event will follow.
    fn send_text(&mut self, name: &str, text: &str);

    /// Send the interrupt sequence into the terminal.
    fn interrupt(&mut self, name: &str) {
        self.send_text(name, INTERRUPT_SEQUENCE);
    }

    /// Execute a command through the shell's completion-reporting capability.
    /// Only valid after `TerminalEvent::CapabilityAvailable` for this
    /// terminal; the returned handle is matched against the eventual
    /// `ExecutionEnded` event.
    fn execute(&mut self, name: &str, command: &str) -> ExecutionId;
}

/// Lifecycle and shell-integration events delivered by the host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TerminalEvent {
    Opened { name: String },
    Closed { name: String },
    /// The terminal's shell activated trackable command execution.
    CapabilityAvailable { name: String },
    /// A previously trackable execution ended (success, failure, or
    /// interruption).
    ExecutionEnded { name: String, execution: ExecutionId },
}

/// Recording test double for the terminal substrate.
#[cfg(test)]
#[derive(Default)]
pub struct FakeTerminalHost {
    pub created: Vec<(String, std::path::PathBuf, String)>,
    pub sent: Vec<(String, String)>,
    pub executed: Vec<(String, String, ExecutionId)>,
    next_execution: u64,
}

#[cfg(test)]
impl FakeTerminalHost {
    pub fn new() -> Self {
        Self::default()
    }

    /// Text sent to `name`, in order.
    pub fn sent_to(&self, name: &str) -> Vec<&str> {
        self.sent
            .iter()
            .filter(|(n, _)| n == name)
            .map(|(_, text)| text.as_str())
            .collect()
    }

    pub fn last_execution(&self) -> Option<ExecutionId> {
        self.executed.last().map(|(_, _, id)| *id)
    }
}

#[cfg(test)]
impl TerminalHost for FakeTerminalHost {
    fn create_terminal(&mut self, name: &str, cwd: &Path, shell: &str) {
        self.created
            .push((name.to_string(), cwd.to_path_buf(), shell.to_string()));
    }

    fn send_text(&mut self, name: &str, text: &str) {
        self.sent.push((name.to_string(), text.to_string()));
    }

    fn execute(&mut self, name: &str, command: &str) -> ExecutionId {
        self.next_execution += 1;
        let id = ExecutionId(self.next_execution);
        self.executed
            .push((name.to_string(), command.to_string(), id));
        id
    }
}
