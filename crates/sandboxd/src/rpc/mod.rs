//! Connect-style unary RPC over HTTP with JSON bodies.
//!
//! - [`messages`] — request/response bodies and procedure paths
//! - [`error`]    — `RpcError`, the Connect error body and status mapping
//! - [`core`], [`file`], [`shell`] — one handler module per service

pub mod core;
pub mod error;
pub mod file;
pub mod messages;
pub mod shell;

pub use error::{Code, RpcError};
pub use messages::procedures;
