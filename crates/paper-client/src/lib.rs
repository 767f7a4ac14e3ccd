//! paper-client library entry point.
//!
//! Re-exports all public modules so that integration tests in `tests/`
//! and the binary entry point in `main.rs` share the same module tree.
//!
//! # What does paper-client do?
//!
//! It sets a wallpaper by sending one request to the hyprpaper service:
//!
//! 1. Parses `"/hyprpaper wallpaper <output>,<path>,<fit>"` and resolves the
//!    image path to an absolute, canonical one.
//! 2. Asks the discovery broker for a wallpaper service on the current
//!    display and, if one is found, receives a connected socket for it.
//! 3. Otherwise connects to the well-known socket under
//!    `$XDG_RUNTIME_DIR/hypr/<instance>/`.
//! 4. Binds `hyprpaper_core`, sends the wallpaper call, and waits for a
//!    single round trip to learn whether the service reported a failure.

/// Application layer: request model and dispatcher.
pub mod application;

/// Infrastructure layer: transport, sessions, discovery, environment, config.
pub mod infrastructure;

pub use application::dispatch::{make_request, DispatchError, Dispatcher};
