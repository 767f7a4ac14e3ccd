//! Dispatcher: delivers one wallpaper request, via discovery when possible
//! and via the well-known socket otherwise.
//!
//! ```text
//! parse -> check environment -> resolve path
//!       -> try_discovery ──ok──> send on discovered session -> result
//!              │ any DiscoveryError
//!              └──> send_direct -> result (or "not running")
//! ```
//!
//! Discovery is best effort.  Every [`DiscoveryError`] is logged (skips at
//! debug, broker failures at warn) and replaced by the direct attempt; only the direct path's errors and the service's own
//! failure reach the caller.  Nothing is retried.

use std::path::{Path, PathBuf};

use paper_core::interfaces::wallpaper;
use thiserror::Error;
use tracing::{debug, info, warn};

use super::request::{ParseError, PathError, Request, ResolvedRequest};
use crate::infrastructure::config::{ClientConfig, ConfigError};
use crate::infrastructure::discovery::{DiscoveryClient, DiscoveryError, DiscoveryFilter};
use crate::infrastructure::environment::{
    Environment, ProcessEnvironment, DISPLAY_TOKEN, INSTANCE_SIGNATURE, RUNTIME_DIR,
};
use crate::infrastructure::session::{ProtocolSession, SessionError};
use crate::infrastructure::transport::{Connector, Endpoint, UnixConnector};
use crate::infrastructure::wallpaper::set_wallpaper;

/// Every way a request can fail, as shown to the user.
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Path(#[from] PathError),

    #[error("XDG_RUNTIME_DIR is not set")]
    MissingRuntimeDir,

    #[error("HYPRLAND_INSTANCE_SIGNATURE is not set; is Hyprland running?")]
    MissingInstanceSignature,

    #[error("cannot connect to {}: hyprpaper is likely not running", .path.display())]
    NotRunning { path: PathBuf },

    #[error(transparent)]
    Session(#[from] SessionError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Socket addresses derived from the environment and config.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceAddresses {
    /// The wallpaper service's well-known socket.
    pub service: PathBuf,
    /// The discovery broker's socket.
    pub broker: PathBuf,
}

impl ServiceAddresses {
    /// Builds both addresses, failing if the runtime directory or instance
    /// signature is missing.
    pub fn from_env(env: &dyn Environment, config: &ClientConfig) -> Result<Self, DispatchError> {
        let runtime_dir = PathBuf::from(env.var(RUNTIME_DIR).ok_or(DispatchError::MissingRuntimeDir)?);
        let signature = env
            .var(INSTANCE_SIGNATURE)
            .ok_or(DispatchError::MissingInstanceSignature)?;

        Ok(Self {
            service: runtime_dir
                .join("hypr")
                .join(signature)
                .join(&config.service.socket_name),
            broker: runtime_dir.join(&config.discovery.broker_socket),
        })
    }
}

/// Runs wallpaper requests against a [`Connector`] and an [`Environment`].
pub struct Dispatcher<C, E> {
    connector: C,
    env: E,
    config: ClientConfig,
}

impl<C: Connector, E: Environment> Dispatcher<C, E> {
    pub fn new(connector: C, env: E, config: ClientConfig) -> Self {
        Self { connector, env, config }
    }

    /// Parses, resolves and delivers `raw`.
    ///
    /// # Errors
    ///
    /// Input and environment errors before any connection is made; then
    /// either [`DispatchError::NotRunning`], a session error on the final
    /// connection, or the service's failure code.
    pub fn make_request(&self, raw: &str) -> Result<(), DispatchError> {
        let request = Request::parse(raw)?;
        let addresses = ServiceAddresses::from_env(&self.env, &self.config)?;
        let request = request.resolve(&self.env)?;

        self.try_discovery(&addresses.broker, &request)
            .unwrap_or_else(|reason| {
                match reason {
                    DiscoveryError::Disabled | DiscoveryError::MissingDisplayToken => {
                        debug!("{reason}; using {}", addresses.service.display())
                    }
                    _ => warn!("discovery unavailable ({reason}); using {}", addresses.service.display()),
                }
                self.send_direct(&addresses.service, &request)
            })
    }

    /// The discovery branch.  The outer `Err` means "fall back"; the inner
    /// result is final.
    fn try_discovery(
        &self,
        broker: &Path,
        request: &ResolvedRequest,
    ) -> Result<Result<(), DispatchError>, DiscoveryError> {
        if !self.config.discovery.enabled {
            return Err(DiscoveryError::Disabled);
        }
        let display = self.env.var(DISPLAY_TOKEN).ok_or(DiscoveryError::MissingDisplayToken)?;

        let mut client = DiscoveryClient::connect(&self.connector, broker)?;
        let candidate = client
            .find_candidate(&DiscoveryFilter::for_display(&display))?
            .ok_or(DiscoveryError::NoCandidate)?;
        let descriptor = client
            .open_handle(candidate)?
            .ok_or(DiscoveryError::NoDescriptor(candidate.0))?;

        let socket = self
            .connector
            .open(Endpoint::Descriptor(descriptor))
            .ok_or(DiscoveryError::TargetUnreachable)?;
        let mut session =
            ProtocolSession::establish(socket, wallpaper::PROTOCOL).map_err(DiscoveryError::Target)?;

        info!("sending request to discovered service (candidate {})", candidate.0);
        Ok(deliver(&mut session, request))
    }

    /// The fallback branch: the well-known socket, with no further fallback.
    fn send_direct(&self, path: &Path, request: &ResolvedRequest) -> Result<(), DispatchError> {
        let socket = self
            .connector
            .open(Endpoint::Path(path.to_path_buf()))
            .ok_or_else(|| DispatchError::NotRunning {
                path: path.to_path_buf(),
            })?;
        let mut session = ProtocolSession::establish(socket, wallpaper::PROTOCOL)?;

        info!("sending request to {}", path.display());
        deliver(&mut session, request)
    }
}

fn deliver(session: &mut ProtocolSession, request: &ResolvedRequest) -> Result<(), DispatchError> {
    set_wallpaper(
        session,
        &request.output_name,
        &request.source_path,
        request.fit_mode,
    )?;
    Ok(())
}

/// Delivers `raw` using the process environment, the default config file and
/// real Unix sockets.  The error is the message to show the user.
pub fn make_request(raw: &str) -> Result<(), String> {
    let env = ProcessEnvironment;
    let config = ClientConfig::load(None, &env).map_err(|e| e.to_string())?;
    Dispatcher::new(UnixConnector, env, config)
        .make_request(raw)
        .map_err(|e| e.to_string())
}

// ── Tests ─────────────────────────────────────────────────────────────────────
