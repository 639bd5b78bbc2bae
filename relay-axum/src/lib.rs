//! relay-axum: HTTP boundary for relay-blob.
//!
//! Mounts the upload routes on an Axum router, parses requests into
//! coordinator calls and shapes every failure as a Feathers-style error body.

pub mod app;
pub mod params;
pub mod routes;
pub mod state;
mod error;
pub use error::{ErrorKind, RelayHttpError};
pub use state::RelayState;

pub use app::{relay, shutdown_signal, RelayApp};
