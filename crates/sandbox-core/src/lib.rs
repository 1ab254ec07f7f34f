//! Agent Sandbox core library.
//!
//! Session-scoped access to a private workspace:
//!
//! - [`store`]     — `CredentialStore` trait with memory and file backends
//! - [`session`]   — `SessionService`: issue/revoke session + credential pairs
//! - [`gate`]      — `AccessGate`: authenticate every non-public procedure
//! - [`workspace`] — `FileService`: confined, size-bounded read/write/edit
//! - [`shell`]     — `ShellExecutor`: deadline-bounded `sh -c` with merged output
//! - [`obs`] / [`telemetry`] — structured events and subscriber setup
//!
//! Confinement is path based. It is not an OS-level isolation boundary.

pub mod gate;
pub mod obs;
pub mod session;
pub mod shell;
pub mod store;
pub mod telemetry;
pub mod workspace;

pub use gate::{mask_credential, AccessGate, Admission, GateError, API_KEY_HEADER};
pub use session::{IssuedSession, SessionError, SessionResult, SessionService};
pub use shell::{ExecError, ExecResult, FailureReason, ShellExecutor};
pub use store::{
    Credential, CredentialStore, FileCredentialStore, MemoryCredentialStore, SessionId,
    SessionRecord, StoreError, StoreResult,
};
pub use telemetry::init_tracing;
pub use workspace::{EditOutcome, FileError, FileResult, FileService, Workspace};
