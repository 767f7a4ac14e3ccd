//! TOML-based configuration for the client.
//!
//! Read from `$XDG_CONFIG_HOME/paperctl/config.toml`, or
//! `~/.config/paperctl/config.toml` when `XDG_CONFIG_HOME` is unset.  The file
//! is optional; every field has a default:
//!
//! ```toml
//! [service]
//! socket_name = ".hyprpaper.sock"
//!
//! [discovery]
//! enabled = true
//! broker_socket = "hyprwire/broker.sock"
//!
//! [logging]
//! level = "warn"
//! ```
//!
//! Fields annotated with `#[serde(default = "some_fn")]` use the return value
//! of `some_fn()` when the field is absent, so a partial file only overrides
//! what it names.

use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

use super::environment::{Environment, CONFIG_HOME, HOME};

/// Error type for configuration file operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A file system I/O error occurred.
    #[error("I/O error accessing config at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The TOML content could not be parsed.
    #[error("failed to parse config TOML at {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

// ── Config schema types ───────────────────────────────────────────────────────

/// Top-level client configuration.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct ClientConfig {
    #[serde(default)]
    pub service: ServiceConfig,
    #[serde(default)]
    pub discovery: DiscoveryConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Location of the wallpaper service's well-known socket.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct ServiceConfig {
    /// Socket file name inside `$XDG_RUNTIME_DIR/hypr/<instance>/`.
    #[serde(default = "default_socket_name")]
    pub socket_name: String,
}

/// Broker discovery settings.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct DiscoveryConfig {
    /// Whether to ask the broker before falling back to the well-known socket.
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Broker socket path relative to `$XDG_RUNTIME_DIR`.
    #[serde(default = "default_broker_socket")]
    pub broker_socket: PathBuf,
}

/// Logging settings.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct LoggingConfig {
    /// `tracing` level used when `RUST_LOG` is unset.
    #[serde(default = "default_log_level")]
    pub level: String,
}

// ── Default helpers ───────────────────────────────────────────────────────────

fn default_socket_name() -> String {
    ".hyprpaper.sock".to_string()
}
fn default_true() -> bool {
    true
}
fn default_broker_socket() -> PathBuf {
    PathBuf::from("hyprwire/broker.sock")
}
fn default_log_level() -> String {
    "warn".to_string()
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            socket_name: default_socket_name(),
        }
    }
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            enabled: default_true(),
            broker_socket: default_broker_socket(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

// ── Loading ───────────────────────────────────────────────────────────────────

impl ClientConfig {
    /// Default config file location, or `None` if neither
    /// `XDG_CONFIG_HOME` nor `HOME` is set.
    pub fn default_path(env: &dyn Environment) -> Option<PathBuf> {
        let base = env
            .var(CONFIG_HOME)
            .map(PathBuf::from)
            .or_else(|| env.var(HOME).map(|home| Path::new(&home).join(".config")))?;
        Some(base.join("paperctl").join("config.toml"))
    }

    /// Parses a config from TOML text.
    pub fn from_toml(text: &str, origin: &Path) -> Result<Self, ConfigError> {
        toml::from_str(text).map_err(|source| ConfigError::Parse {
            path: origin.to_path_buf(),
            source,
        })
    }

    /// Loads the config at `path`; a missing file yields the defaults.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the file exists but cannot be read or parsed.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        match std::fs::read_to_string(path) {
            Ok(text) => Self::from_toml(&text, path),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("no config at {}; using defaults", path.display());
                Ok(Self::default())
            }
            Err(source) => Err(ConfigError::Io {
                path: path.to_path_buf(),
                source,
            }),
        }
    }

    /// Loads `explicit` if given, otherwise the default location, otherwise
    /// the built-in defaults.
    pub fn load(explicit: Option<&Path>, env: &dyn Environment) -> Result<Self, ConfigError> {
        match explicit.map(Path::to_path_buf).or_else(|| Self::default_path(env)) {
            Some(path) => Self::load_from(&path),
            None => Ok(Self::default()),
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
