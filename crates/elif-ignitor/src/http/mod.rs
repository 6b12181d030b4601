//! HTTP collaborators: the router and server bound into the container, the
//! transport that listens for connections, and the launch sequence tying
//! them together.

pub mod launch;
pub mod provider;
pub mod router;
pub mod server;
pub mod transport;

pub use launch::*;
pub use provider::*;
pub use router::*;
pub use server::*;
pub use transport::*;

use thiserror::Error;

/// HTTP error type
#[derive(Debug, Error)]
pub enum HttpError {
    #[error("Route {method} {path} is already defined")]
    DuplicateRoute { method: HttpMethod, path: String },

    #[error("Invalid route path '{path}': {message}")]
    InvalidPath { path: String, message: String },
}

/// Result type for HTTP operations
pub type HttpResult<T> = Result<T, HttpError>;
