//! Client-side transport: the generic wire-protocol surface every session
//! is built on.
//!
//! - [`ClientSocket`] is the capability a session drives: register local
//!   protocol implementations, handshake, look up and bind protocols, create
//!   objects, send requests, and block in [`ClientSocket::roundtrip`] while
//!   inbound events are dispatched to per-object listeners.
//! - [`Connector`] opens a `ClientSocket` from either a filesystem address
//!   or a [`Descriptor`] handed over by the discovery broker.
//! - `channel` frames [`WireMessage`]s over a Unix stream and carries
//!   descriptors out-of-band; `unix` implements `ClientSocket` on top of it.

pub mod channel;
pub mod unix;

use std::fmt;
use std::os::fd::{AsRawFd, OwnedFd};
use std::os::unix::net::UnixStream;
use std::path::PathBuf;

use paper_core::protocol::messages::{Argument, MessageType};
use paper_core::{ProtocolDescriptor, ProtocolError};
use thiserror::Error;

pub use unix::{UnixClientSocket, UnixConnector};

/// Client-side id of a remote object.
pub type ObjectId = u32;

/// Callback invoked for every event addressed to one object.
pub type Listener = Box<dyn FnMut(Event)>;

/// Errors raised by the transport while talking to a peer.
#[derive(Debug, Error)]
pub enum TransportError {
    /// An I/O error occurred on the socket.
    #[error("socket I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// A system call used for descriptor passing failed.
    #[error("socket system call failed: {0}")]
    Os(#[from] nix::errno::Errno),
    /// A frame could not be encoded or decoded.
    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),
    /// The peer closed the connection.
    #[error("connection closed by peer")]
    Closed,
    /// The peer sent a message that makes no sense at this point.
    #[error("unexpected {0:?} message from peer")]
    Unexpected(MessageType),
    /// A frame announced descriptors that never arrived, or vice versa.
    #[error("frame expected {expected} descriptors, {available} available")]
    DescriptorMismatch { expected: usize, available: usize },
    /// More descriptors arrived in one read than the receive buffer holds;
    /// the surplus was discarded by the kernel.
    #[error("too many descriptors in one read (limit {limit})")]
    DescriptorsTruncated { limit: usize },
    /// A protocol was bound without a registered local implementation.
    #[error("no local implementation registered for protocol {0}")]
    NotImplemented(String),
    /// The peer refused to bind a protocol.
    #[error("peer rejected bind of {protocol} at version {version}")]
    BindRejected { protocol: String, version: u32 },
    /// The peer reported an unrecoverable error.
    #[error("fatal error on object {object} (code {code}): {message}")]
    Fatal {
        object: ObjectId,
        code: u32,
        message: String,
    },
}

/// A locally implemented protocol, registered on a socket before the
/// handshake.  It pins the version this client was built against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProtocolImplementation {
    descriptor: ProtocolDescriptor,
}

impl ProtocolImplementation {
    pub fn new(descriptor: ProtocolDescriptor) -> Self {
        Self { descriptor }
    }

    pub fn name(&self) -> &'static str {
        self.descriptor.name
    }

    pub fn version(&self) -> u32 {
        self.descriptor.version
    }
}

/// A protocol as the peer describes it in reply to a spec lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProtocolSpec {
    pub name: String,
    /// Highest version the peer supports.
    pub version: u32,
}

/// An event delivered to a listener, together with any descriptors that
/// arrived with it.
#[derive(Debug)]
pub struct Event {
    pub object: ObjectId,
    pub opcode: u16,
    pub args: Vec<Argument>,
    pub fds: Vec<OwnedFd>,
}

/// An open, connected transport endpoint received from the broker.
///
/// It is consumed exactly once by [`Connector::open`]; there is no way to
/// copy it or get it back.
pub struct Descriptor(OwnedFd);

impl Descriptor {
    pub fn new(fd: OwnedFd) -> Self {
        Self(fd)
    }

    /// Turns the descriptor into the stream a new session will own.
    pub fn into_stream(self) -> UnixStream {
        UnixStream::from(self.0)
    }
}

impl fmt::Debug for Descriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Descriptor").field(&self.0.as_raw_fd()).finish()
    }
}

/// Where to open a connection.
#[derive(Debug)]
pub enum Endpoint {
    /// A socket file to connect to.
    Path(PathBuf),
    /// An already-connected descriptor.
    Descriptor(Descriptor),
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Endpoint::Path(path) => write!(f, "{}", path.display()),
            Endpoint::Descriptor(descriptor) => write!(f, "{descriptor:?}"),
        }
    }
}

/// The generic wire-protocol surface a session is built on.
///
/// All calls block the calling thread.  Events are only dispatched while a
/// call is waiting on the peer, so listeners run synchronously inside
/// [`ClientSocket::roundtrip`] (or inside the spec/bind waits).
pub trait ClientSocket {
    /// Registers a local protocol implementation.  Must precede the handshake.
    fn add_implementation(&mut self, implementation: ProtocolImplementation);

    /// Performs the handshake.  Any failure to complete it yields `false`.
    fn wait_for_handshake(&mut self) -> bool;

    /// Asks the peer for a protocol by name; `Ok(None)` if it has no such protocol.
    fn get_spec(&mut self, name: &str) -> Result<Option<ProtocolSpec>, TransportError>;

    /// Binds `spec` at `version` and returns the manager object.
    fn bind_protocol(&mut self, spec: &ProtocolSpec, version: u32) -> Result<ObjectId, TransportError>;

    /// Sends a request on `parent` that creates a new object; the new id is
    /// sent as the first argument, ahead of `args`.
    fn create_object(
        &mut self,
        parent: ObjectId,
        opcode: u16,
        args: Vec<Argument>,
    ) -> Result<ObjectId, TransportError>;

    /// Installs the listener for events addressed to `object`.
    fn set_listener(&mut self, object: ObjectId, listener: Listener);

    /// Sends a one-way request.
    fn send_request(
        &mut self,
        object: ObjectId,
        opcode: u16,
        args: Vec<Argument>,
    ) -> Result<(), TransportError>;

    /// Blocks until the peer has processed everything sent so far, dispatching
    /// every event that arrives in the meantime.
    fn roundtrip(&mut self) -> Result<(), TransportError>;
}

/// Opens [`ClientSocket`]s.
#[cfg_attr(test, mockall::automock)]
pub trait Connector {
    /// Opens a socket to `endpoint`, or `None` if it cannot be reached.
    fn open(&self, endpoint: Endpoint) -> Option<Box<dyn ClientSocket>>;
}
