//! Agent Sandbox daemon library.
//!
//! Exposes the core services over Connect-style JSON RPC:
//!
//! - [`config`] — TOML + `SANDBOX_*` environment configuration
//! - [`state`]  — service wiring shared by handlers
//! - [`router`] — procedure table, access gate middleware, `/health`
//! - [`rpc`]    — wire messages, error mapping and handlers
//! - [`client`] — `SandboxClient` for the same protocol

pub mod client;
pub mod config;
pub mod router;
pub mod rpc;
pub mod state;

pub use client::{ClientError, ClientResult, SandboxClient};
pub use config::{Config, ConfigError, LogFormat, StoreBackend};
pub use router::router;
pub use rpc::{Code, RpcError};
pub use state::{AppState, StartupError};
