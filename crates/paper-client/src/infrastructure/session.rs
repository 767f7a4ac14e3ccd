//! Protocol sessions: a [`ClientSocket`] that has completed the handshake and
//! bound one protocol's manager object.
//!
//! [`ProtocolSession::establish`] runs the setup in a fixed order:
//!
//! ```text
//! implementation -> add_implementation -> handshake -> get_spec -> bind
//! ```
//!
//! Each step's failure maps to its own [`SessionError`] variant so callers can
//! tell "the peer never answered" from "the peer is the wrong service" from
//! "the peer is too old".  The session owns the socket; dropping the session
//! closes the connection.

use paper_core::protocol::messages::Argument;
use paper_core::ProtocolDescriptor;
use thiserror::Error;
use tracing::debug;

use super::transport::{ClientSocket, Listener, ObjectId, ProtocolImplementation, TransportError};

/// Errors raised while setting up or using a session.
#[derive(Debug, Error)]
pub enum SessionError {
    /// The peer did not complete the handshake.
    #[error("handshake with {protocol} peer did not complete")]
    HandshakeFailed { protocol: &'static str },

    /// The peer completed the handshake but does not expose the protocol.
    #[error("peer does not expose protocol {protocol}")]
    SpecUnavailable { protocol: &'static str },

    /// The peer refused to bind the protocol at our version.
    #[error("could not bind {protocol} at version {version}: {source}")]
    BindFailed {
        protocol: &'static str,
        version: u32,
        #[source]
        source: TransportError,
    },

    /// The service reported that the operation failed.
    #[error("{protocol} request failed with error code {code}")]
    ServiceFailed { protocol: &'static str, code: u32 },

    /// The connection broke during the exchange.
    #[error(transparent)]
    Transport(#[from] TransportError),
}

/// A socket with one protocol bound and ready for calls.
pub struct ProtocolSession {
    socket: Box<dyn ClientSocket>,
    protocol: ProtocolDescriptor,
    manager: ObjectId,
}

impl std::fmt::Debug for ProtocolSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProtocolSession")
            .field("protocol", &self.protocol)
            .field("manager", &self.manager)
            .finish_non_exhaustive()
    }
}

impl ProtocolSession {
    /// Takes ownership of `socket` and binds `protocol` on it.
    ///
    /// # Errors
    ///
    /// [`SessionError::HandshakeFailed`], [`SessionError::SpecUnavailable`],
    /// [`SessionError::BindFailed`], or a transport error during the spec
    /// lookup.  The socket is closed on every error path.
    pub fn establish(
        mut socket: Box<dyn ClientSocket>,
        protocol: ProtocolDescriptor,
    ) -> Result<Self, SessionError> {
        let implementation = ProtocolImplementation::new(protocol);
        socket.add_implementation(implementation);

        if !socket.wait_for_handshake() {
            return Err(SessionError::HandshakeFailed {
                protocol: protocol.name,
            });
        }

        let spec = socket
            .get_spec(protocol.name)?
            .ok_or(SessionError::SpecUnavailable {
                protocol: protocol.name,
            })?;
        debug!("peer offers {} v{}; binding v{}", spec.name, spec.version, implementation.version());

        let manager = socket
            .bind_protocol(&spec, implementation.version())
            .map_err(|source| SessionError::BindFailed {
                protocol: protocol.name,
                version: implementation.version(),
                source,
            })?;

        Ok(Self {
            socket,
            protocol,
            manager,
        })
    }

    pub fn protocol(&self) -> ProtocolDescriptor {
        self.protocol
    }

    /// The bound manager object.
    pub fn manager(&self) -> ObjectId {
        self.manager
    }

    /// Creates a child object through `parent` and installs its listener
    /// before anything that could trigger its events is sent.
    pub fn create_object(
        &mut self,
        parent: ObjectId,
        opcode: u16,
        args: Vec<Argument>,
        listener: Listener,
    ) -> Result<ObjectId, SessionError> {
        let object = self.socket.create_object(parent, opcode, args)?;
        self.socket.set_listener(object, listener);
        Ok(object)
    }

    /// Sends a one-way request.
    pub fn send(&mut self, object: ObjectId, opcode: u16, args: Vec<Argument>) -> Result<(), SessionError> {
        self.socket.send_request(object, opcode, args)?;
        Ok(())
    }

    /// Blocks until everything sent so far has been processed by the peer
    /// and every resulting event has been delivered.
    pub fn roundtrip(&mut self) -> Result<(), SessionError> {
        self.socket.roundtrip()?;
        Ok(())
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
