//! Infrastructure layer for the client.
//!
//! OS-facing adapters and the wire-level building blocks the dispatcher
//! composes:
//!
//! - **`transport`** – the [`transport::ClientSocket`] capability and its Unix
//!   socket implementation, including descriptor passing.
//! - **`session`** – handshake, spec lookup and bind on top of a socket.
//! - **`wallpaper`** – the `hyprpaper_core` wallpaper call on a bound session.
//! - **`discovery`** – the broker client: candidate lookup and descriptor
//!   hand-off.
//! - **`environment`** – environment variable access behind a trait.
//! - **`config`** – the optional TOML configuration file.

pub mod config;
pub mod discovery;
pub mod environment;
pub mod session;
pub mod transport;
pub mod wallpaper;
