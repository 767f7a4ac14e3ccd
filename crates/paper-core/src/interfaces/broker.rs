//! `hyprwire_broker`: the discovery broker protocol.
//!
//! ```text
//! manager
//!   get_query_object(new_id)              -> query
//!   get_handle(new_id, uint candidate)    -> handle
//! query
//!   set_protocols(string[], uint mode) set_properties(string[], uint mode) submit()
//!   <- results(uint[] candidates)
//! handle
//!   connect()
//!   <- fd(fd)
//! ```
//!
//! Candidate ids are only meaningful on the connection that produced them.

use super::ProtocolDescriptor;

pub const PROTOCOL: ProtocolDescriptor = ProtocolDescriptor {
    name: "hyprwire_broker",
    version: 1,
};

/// Manager requests.
pub mod manager {
    pub const GET_QUERY_OBJECT: u16 = 0;
    pub const GET_HANDLE: u16 = 1;
}

/// Query object requests and events.
pub mod query {
    pub const SET_PROTOCOLS: u16 = 0;
    pub const SET_PROPERTIES: u16 = 1;
    pub const SUBMIT: u16 = 2;

    pub const EVENT_RESULTS: u16 = 0;
}

/// Handle object requests and events.
pub mod handle {
    pub const CONNECT: u16 = 0;

    pub const EVENT_FD: u16 = 0;
}

/// How the broker combines the entries of one predicate list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum FilterMode {
    /// Every entry must match.
    All = 0,
    /// At least one entry must match.
    Any = 1,
}

impl FilterMode {
    pub fn wire_value(self) -> u32 {
        self as u32
    }
}
