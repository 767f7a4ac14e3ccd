//! Application layer use cases for the client.
//!
//! - **`request`** – parses the `wallpaper <output>,<path>,<fit>` command into
//!   a typed request and resolves the image path.  Pure apart from the
//!   final canonicalization.
//!
//! - **`dispatch`** – delivers one request: discovery through the broker
//!   first, the well-known socket second, and the service's verdict last.
//!   Talks to the outside world only through the `Connector` and
//!   `Environment` seams, so every branch is testable with mocks.

pub mod dispatch;
pub mod request;
