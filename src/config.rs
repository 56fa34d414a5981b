//! TOML configuration for reachprobe.
//!
//! Layered model: compiled-in defaults, overridden by a config file found via
//! the `REACHPROBE_CONFIG` environment variable or the standard system
//! location, overridden in turn by command-line flags.

use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::probes::tcp::DEFAULT_PORT;
use crate::probes::ProbeMethod;
use crate::scheduler::RunSettings;

/// Environment variable naming an explicit config file.
pub const CONFIG_ENV: &str = "REACHPROBE_CONFIG";

/// Standard system location of the config file.
pub const SYSTEM_CONFIG_PATH: &str = "/etc/reachprobe/reachprobe.toml";

/// Default per-probe deadline.
pub const DEFAULT_TIMEOUT_MS: u64 = 5000;

/// Default pause between attempts.
pub const DEFAULT_PAUSE_MS: u64 = 500;

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

/// Root configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReachConfig {
    #[serde(default)]
    pub probe: ProbeConfig,
    #[serde(default)]
    pub schedule: ScheduleConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl ReachConfig {
    /// Load and validate configuration from a TOML file at `path`.
    ///
    /// A file that parses but names a zero deadline or a tcp probe without a
    /// port is rejected here, so every caller gets a usable probe setup.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file: {}", path.display()))?;
        let config: Self = toml::from_str(&content)
            .with_context(|| format!("failed to parse config file: {}", path.display()))?;
        config
            .validate()
            .with_context(|| format!("invalid config file: {}", path.display()))?;
        info!(
            path = %path.display(),
            method = %config.probe.method,
            timeout_ms = config.probe.timeout_ms,
            pause_ms = config.schedule.pause_ms,
            "loaded configuration"
        );
        Ok(config)
    }

    /// Use the first loadable, valid config among:
    /// 1. The path in the `REACHPROBE_CONFIG` environment variable.
    /// 2. `/etc/reachprobe/reachprobe.toml`.
    /// 3. Compiled-in defaults.
    ///
    /// A file that is unreadable, malformed or invalid is skipped with a warning.
    pub fn load_or_default() -> Self {
        if let Ok(env_path) = std::env::var(CONFIG_ENV) {
            let path = Path::new(&env_path);
            match Self::load(path) {
                Ok(cfg) => return cfg,
                Err(e) => {
                    warn!(
                        path = %path.display(),
                        error = %e,
                        "REACHPROBE_CONFIG set but file could not be loaded, trying fallback"
                    );
                }
            }
        }

        let system_path = Path::new(SYSTEM_CONFIG_PATH);
        if system_path.exists() {
            match Self::load(system_path) {
                Ok(cfg) => return cfg,
                Err(e) => {
                    warn!(
                        path = %system_path.display(),
                        error = %e,
                        "system config file exists but could not be loaded, using defaults"
                    );
                }
            }
        }

        debug!("no config file found, using compiled-in defaults");
        Self::default()
    }

    /// Reject values the probe contract cannot honour.
    ///
    /// Called by [`ReachConfig::load`]; call it again after applying
    /// command-line overrides.
    pub fn validate(&self) -> Result<()> {
        if self.probe.timeout_ms == 0 {
            anyhow::bail!("probe.timeout_ms must be greater than zero");
        }
        if self.probe.method == ProbeMethod::Tcp && self.probe.port == 0 {
            anyhow::bail!("probe.port must be set for the tcp method");
        }
        Ok(())
    }

    /// Timing settings for the scheduler.
    pub fn run_settings(&self) -> RunSettings {
        RunSettings {
            probe_timeout: Duration::from_millis(self.probe.timeout_ms),
            pause: Duration::from_millis(self.schedule.pause_ms),
        }
    }

    /// Render as TOML.
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).context("failed to serialize configuration")
    }
}

// ---------------------------------------------------------------------------
// Probe
// ---------------------------------------------------------------------------

/// Which probe to use and its deadline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProbeConfig {
    /// `"tcp"` (default) or `"icmp"`.
    pub method: ProbeMethod,
    /// Target port for the tcp method.
    pub port: u16,
    /// Per-probe deadline in milliseconds.
    pub timeout_ms: u64,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            method: ProbeMethod::Tcp,
            port: DEFAULT_PORT,
            timeout_ms: DEFAULT_TIMEOUT_MS,
        }
    }
}

// ---------------------------------------------------------------------------
// Schedule
// ---------------------------------------------------------------------------

/// Pacing of the attempt loop.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScheduleConfig {
    /// Pause between attempts in milliseconds.
    pub pause_ms: u64,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            pause_ms: DEFAULT_PAUSE_MS,
        }
    }
}

// ---------------------------------------------------------------------------
// Logging
// ---------------------------------------------------------------------------

/// Log output configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default filter directive when `RUST_LOG` is unset.
    pub level: String,
    /// Emit JSON lines instead of human-readable output.
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}
