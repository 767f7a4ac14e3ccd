//! # paper-core
//!
//! Shared wire-protocol library for `paperctl`: the frame codec and the typed
//! descriptors of the remote interfaces the client talks to.
//!
//! It has no dependencies on sockets or OS APIs; the client crate owns the
//! transport.
//!
//! - **`protocol`** – How bytes travel over the connection.  Messages are
//!   encoded into a compact binary format (16-byte header + payload) and
//!   decoded back into [`WireMessage`] values.
//!
//! - **`interfaces`** – Names, versions and opcodes of the remote protocols:
//!   the wallpaper service (`hyprpaper_core`) and the discovery broker
//!   (`hyprwire_broker`).

pub mod interfaces;
pub mod protocol;

pub use interfaces::ProtocolDescriptor;
pub use protocol::codec::{decode_message, encode_message, ProtocolError};
pub use protocol::messages::{Argument, WireMessage};
