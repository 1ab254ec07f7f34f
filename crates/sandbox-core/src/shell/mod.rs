//! Bounded shell execution.
//!
//! - [`executor`] — `ShellExecutor`: `sh -c` with a deadline and process-group kill
//! - [`capture`]  — pipe draining and stdout/stderr merging
//! - [`error`]    — `ExecError` / `FailureReason`

mod capture;
pub mod error;
pub mod executor;

pub use capture::combine_output;
pub use error::{ExecError, ExecResult, FailureReason};
pub use executor::{ShellExecutor, DEFAULT_SHELL};
