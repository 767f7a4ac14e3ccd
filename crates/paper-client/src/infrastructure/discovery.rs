//! Discovery broker client.
//!
//! The broker enumerates the services reachable in this user session and can
//! hand out a connected descriptor to one of them.  A [`DiscoveryClient`]
//! owns its own [`ProtocolSession`] bound to `hyprwire_broker`:
//!
//! 1. [`DiscoveryClient::find_candidate`] submits a [`DiscoveryFilter`] and
//!    keeps the first id the broker reports.
//! 2. [`DiscoveryClient::open_handle`] consumes the client, exchanges the
//!    candidate for a [`Descriptor`], and drops the broker connection.
//!
//! Because `open_handle` takes `self`, nothing can be read from the broker
//! transport once the descriptor exists.

use std::cell::{Cell, RefCell};
use std::path::{Path, PathBuf};
use std::rc::Rc;

use paper_core::interfaces::broker::{self, handle, manager, query, FilterMode};
use paper_core::interfaces::wallpaper;
use paper_core::protocol::messages::Argument;
use thiserror::Error;
use tracing::debug;

use super::environment::DISPLAY_TOKEN;
use super::session::{ProtocolSession, SessionError};
use super::transport::{Connector, Descriptor, Endpoint, Event};

/// Reasons discovery did not produce a usable connection.
///
/// None of these reach the user; the dispatcher logs them and falls back to
/// the well-known address.
#[derive(Debug, Error)]
pub enum DiscoveryError {
    #[error("discovery disabled by configuration")]
    Disabled,

    #[error("WAYLAND_DISPLAY is not set; skipping discovery")]
    MissingDisplayToken,

    #[error("broker at {} is unreachable", .0.display())]
    BrokerUnreachable(PathBuf),

    #[error("broker session failed: {0}")]
    Session(#[from] SessionError),

    #[error("broker reported no matching service")]
    NoCandidate,

    #[error("broker returned no descriptor for candidate {0}")]
    NoDescriptor(u32),

    #[error("could not open a session on the handed-over descriptor")]
    TargetUnreachable,

    #[error("discovered service session failed: {0}")]
    Target(#[source] SessionError),
}

/// Predicates a candidate must satisfy, evaluated by the broker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveryFilter {
    /// `key=value` facts about the caller's session.
    pub properties: Vec<String>,
    /// Protocol names the candidate must expose.
    pub protocols: Vec<String>,
}

impl DiscoveryFilter {
    /// Filter for a wallpaper service on display `display`.
    pub fn for_display(display: &str) -> Self {
        Self {
            properties: vec![format!("{DISPLAY_TOKEN}={display}")],
            protocols: vec![wallpaper::PROTOCOL.name.to_string()],
        }
    }
}

/// Broker-assigned id of one service instance, valid for the discovery
/// session that produced it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Candidate(pub u32);

/// A bound session to the discovery broker.
#[derive(Debug)]
pub struct DiscoveryClient {
    session: ProtocolSession,
}

impl DiscoveryClient {
    /// Connects to the broker at `path` and binds the broker protocol.
    pub fn connect(connector: &dyn Connector, path: &Path) -> Result<Self, DiscoveryError> {
        let socket = connector
            .open(Endpoint::Path(path.to_path_buf()))
            .ok_or_else(|| DiscoveryError::BrokerUnreachable(path.to_path_buf()))?;
        let session = ProtocolSession::establish(socket, broker::PROTOCOL)?;
        debug!("bound {} at {}", broker::PROTOCOL, path.display());
        Ok(Self { session })
    }

    /// Submits `filter` and returns the first matching candidate, if any.
    pub fn find_candidate(&mut self, filter: &DiscoveryFilter) -> Result<Option<Candidate>, DiscoveryError> {
        let found: Rc<Cell<Option<u32>>> = Rc::new(Cell::new(None));
        let slot = Rc::clone(&found);
        let listener = Box::new(move |event: Event| {
            if event.opcode != query::EVENT_RESULTS {
                return;
            }
            let ids = event.args.first().and_then(Argument::as_uint_array).unwrap_or_default();
            debug!("broker reported {} candidate(s)", ids.len());
            slot.set(ids.first().copied());
        });

        let manager_id = self.session.manager();
        let query_id = self
            .session
            .create_object(manager_id, manager::GET_QUERY_OBJECT, Vec::new(), listener)?;

        let mode = FilterMode::All.wire_value();
        self.session.send(
            query_id,
            query::SET_PROTOCOLS,
            vec![Argument::StrArray(filter.protocols.clone()), Argument::Uint(mode)],
        )?;
        self.session.send(
            query_id,
            query::SET_PROPERTIES,
            vec![Argument::StrArray(filter.properties.clone()), Argument::Uint(mode)],
        )?;
        self.session.send(query_id, query::SUBMIT, Vec::new())?;
        self.session.roundtrip()?;

        Ok(found.get().map(Candidate))
    }

    /// Exchanges `candidate` for a descriptor connected to that service.
    ///
    /// Consumes the client: the broker connection is closed on return.
    pub fn open_handle(mut self, candidate: Candidate) -> Result<Option<Descriptor>, DiscoveryError> {
        let received: Rc<RefCell<Option<Descriptor>>> = Rc::new(RefCell::new(None));
        let slot = Rc::clone(&received);
        let listener = Box::new(move |event: Event| {
            if event.opcode != handle::EVENT_FD {
                return;
            }
            match event.fds.into_iter().next() {
                Some(fd) => *slot.borrow_mut() = Some(Descriptor::new(fd)),
                None => debug!("fd event arrived without a descriptor"),
            }
        });

        let manager_id = self.session.manager();
        let handle_id = self.session.create_object(
            manager_id,
            manager::GET_HANDLE,
            vec![Argument::Uint(candidate.0)],
            listener,
        )?;
        self.session.send(handle_id, handle::CONNECT, Vec::new())?;
        self.session.roundtrip()?;

        let descriptor = received.borrow_mut().take();
        Ok(descriptor)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
