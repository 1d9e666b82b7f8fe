//! TOML configuration for the controller.
//!
//! Every key is optional.  A missing file, or a file that only sets a few
//! keys, falls back to the defaults below:
//!
//! ```toml
//! [link]
//! robot_addr = "192.168.3.20:43893"
//! command_bind_addr = "0.0.0.0:0"
//! telemetry_bind_addr = "0.0.0.0:43893"
//!
//! [timing]
//! heartbeat_interval_ms = 500
//! axis_tick_ms = 10
//! heartbeat_warmup_ms = 1000
//!
//! [logging]
//! log_level = "info"
//! ```
//!
//! # Serde default values
//!
//! Fields annotated with `#[serde(default = "some_fn")]` use the return value
//! of `some_fn()` when the field is absent from the TOML file.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::application::SessionOptions;

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A file system I/O error other than "not found".
    #[error("I/O error reading config at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The TOML content could not be parsed.
    #[error("failed to parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),

    /// The file parsed but a value is out of range.
    #[error("invalid config: {0}")]
    Invalid(String),
}

// ── Config schema types ───────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ControllerConfig {
    #[serde(default)]
    pub link: LinkConfig,
    #[serde(default)]
    pub timing: TimingConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Socket addresses.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LinkConfig {
    /// Robot command port.
    #[serde(default = "default_robot_addr")]
    pub robot_addr: SocketAddr,
    /// Local address of the command socket.  Port 0 lets the OS choose.
    #[serde(default = "default_command_bind_addr")]
    pub command_bind_addr: SocketAddr,
    /// Where telemetry datagrams are received.
    #[serde(default = "default_telemetry_bind_addr")]
    pub telemetry_bind_addr: SocketAddr,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TimingConfig {
    #[serde(default = "default_heartbeat_interval_ms")]
    pub heartbeat_interval_ms: u64,
    #[serde(default = "default_axis_tick_ms")]
    pub axis_tick_ms: u64,
    /// Wait after starting the heartbeat before the first command.
    #[serde(default = "default_heartbeat_warmup_ms")]
    pub heartbeat_warmup_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LoggingConfig {
    /// `tracing` filter used when `RUST_LOG` is unset.
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

// ── Default helpers ───────────────────────────────────────────────────────────

fn default_robot_addr() -> SocketAddr {
    SocketAddr::from(([192, 168, 3, 20], 43893))
}
fn default_command_bind_addr() -> SocketAddr {
    SocketAddr::from(([0, 0, 0, 0], 0))
}
fn default_telemetry_bind_addr() -> SocketAddr {
    SocketAddr::from(([0, 0, 0, 0], 43893))
}
fn default_heartbeat_interval_ms() -> u64 {
    500
}
fn default_axis_tick_ms() -> u64 {
    10
}
fn default_heartbeat_warmup_ms() -> u64 {
    1000
}
fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            robot_addr: default_robot_addr(),
            command_bind_addr: default_command_bind_addr(),
            telemetry_bind_addr: default_telemetry_bind_addr(),
        }
    }
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            heartbeat_interval_ms: default_heartbeat_interval_ms(),
            axis_tick_ms: default_axis_tick_ms(),
            heartbeat_warmup_ms: default_heartbeat_warmup_ms(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
        }
    }
}

impl TimingConfig {
    pub fn session_options(&self) -> SessionOptions {
        SessionOptions {
            heartbeat_interval: Duration::from_millis(self.heartbeat_interval_ms),
            axis_tick: Duration::from_millis(self.axis_tick_ms),
            warmup: Duration::from_millis(self.heartbeat_warmup_ms),
        }
    }
}

impl ControllerConfig {
    /// Rejects values the timing loops cannot run with.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] for a zero heartbeat interval or axis
    /// tick.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.timing.heartbeat_interval_ms == 0 {
            return Err(ConfigError::Invalid(
                "timing.heartbeat_interval_ms must be greater than zero".to_string(),
            ));
        }
        if self.timing.axis_tick_ms == 0 {
            return Err(ConfigError::Invalid(
                "timing.axis_tick_ms must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

// ── Loading ───────────────────────────────────────────────────────────────────

/// Loads and validates the config at `path`, returning defaults if the file
/// does not exist.
///
/// # Errors
///
/// Returns [`ConfigError::Io`] for file-system errors other than "not found",
/// [`ConfigError::Parse`] if the TOML is malformed and
/// [`ConfigError::Invalid`] if validation fails.
pub fn load_config(path: &Path) -> Result<ControllerConfig, ConfigError> {
    let config = match std::fs::read_to_string(path) {
        Ok(content) => toml::from_str::<ControllerConfig>(&content)?,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => ControllerConfig::default(),
        Err(e) => {
            return Err(ConfigError::Io {
                path: path.to_path_buf(),
                source: e,
            })
        }
    };
    config.validate()?;
    Ok(config)
}

// ── Tests ─────────────────────────────────────────────────────────────────────
