use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, instrument, warn};

/// Default grace period before a queued command falls back to raw text
/// injection (completion detection lost for that run).
pub const DEFAULT_GRACE_PERIOD_MS: u64 = 3000;

/// Default settle delay between interrupting a busy terminal and dispatching
/// the next command into it.
pub const DEFAULT_INTERRUPT_SETTLE_MS: u64 = 200;

/// User-tunable dock configuration, loaded from ~/.scriptdock/config.json.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct DockConfig {
    /// Grace period in milliseconds before untrackable fallback dispatch
    #[serde(default, skip_serializing_if = "Option::is_none", rename = "gracePeriodMs")]
    pub grace_period_ms: Option<u64>,
    /// Settle delay in milliseconds after interrupting a running command
    #[serde(default, skip_serializing_if = "Option::is_none", rename = "interruptSettleMs")]
    pub interrupt_settle_ms: Option<u64>,
    /// Shell binary for new terminals; falls back to $SHELL then a resolved sh
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shell: Option<String>,
}

impl DockConfig {
    /// Returns the grace period, or the default if not configured
    pub fn get_grace_period(&self) -> Duration {
        Duration::from_millis(self.grace_period_ms.unwrap_or(DEFAULT_GRACE_PERIOD_MS))
    }

    /// Returns the interrupt settle delay, or the default if not configured
    pub fn get_interrupt_settle(&self) -> Duration {
        Duration::from_millis(self.interrupt_settle_ms.unwrap_or(DEFAULT_INTERRUPT_SETTLE_MS))
    }

    /// Returns the configured shell, falling back to $SHELL, then a
    /// PATH-resolved sh, then /bin/sh.
    pub fn get_shell(&self) -> String {
        self.shell
            .clone()
            .or_else(|| std::env::var("SHELL").ok())
            .or_else(|| {
                which::which("sh")
                    .ok()
                    .map(|p| p.to_string_lossy().to_string())
            })
            .unwrap_or_else(|| "/bin/sh".to_string())
    }

    /// Default config file path (~/.scriptdock/config.json)
    pub fn default_path() -> PathBuf {
        PathBuf::from(shellexpand::tilde("~/.scriptdock/config.json").as_ref())
    }

    /// Load config from the default path, falling back to defaults when the
    /// file is missing or unparsable.
    #[instrument(name = "config_load")]
    pub fn load() -> Self {
        Self::load_from(&Self::default_path())
    }

    /// Load config from an explicit path.
    pub fn load_from(path: &Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(content) => match serde_json::from_str::<DockConfig>(&content) {
                Ok(config) => {
                    info!(path = %path.display(), "Loaded dock config");
                    config
                }
                Err(e) => {
                    warn!(error = %e, path = %path.display(), "Config unparsable, using defaults");
                    DockConfig::default()
                }
            },
            Err(_) => DockConfig::default(),
        }
    }
}
