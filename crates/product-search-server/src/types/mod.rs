//! HTTP-facing types for the server.

pub mod error;

pub use error::*;
