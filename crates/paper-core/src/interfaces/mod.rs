//! Typed descriptors of the remote interfaces.
//!
//! Each interface is a named, versioned protocol.  A client binds the
//! protocol's manager object at the version it was built against and then
//! creates child objects through the manager.  The opcode constants here are
//! the single source of truth for both sides of a connection.

pub mod broker;
pub mod wallpaper;

/// Name and version of a protocol as announced during the handshake and
/// requested at bind time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProtocolDescriptor {
    pub name: &'static str,
    pub version: u32,
}

impl std::fmt::Display for ProtocolDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} v{}", self.name, self.version)
    }
}
