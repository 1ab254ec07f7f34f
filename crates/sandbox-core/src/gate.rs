//! Access gate: credential check in front of every privileged procedure.
//!
//! The gate is transport-agnostic. A transport hands it the procedure name
//! and the raw credential header; the gate either admits the call (returning
//! the resolved [`SessionId`] for the handler to take as an explicit
//! argument) or rejects it before any handler runs.

use std::sync::Arc;

use thiserror::Error;

use crate::obs;
use crate::store::{CredentialStore, SessionId, StoreError};

/// Request header carrying the bearer credential.
pub const API_KEY_HEADER: &str = "X-Sandbox-Api-Key";

/// Procedures reachable without a credential, matched by suffix.
pub const PUBLIC_PROCEDURE_SUFFIXES: &[&str] = &["/InitSandbox"];

const MASK_VISIBLE_CHARS: usize = 8;

#[derive(Debug, Error)]
pub enum GateError {
    #[error("missing API key in header {}", API_KEY_HEADER)]
    MissingCredential,

    #[error("invalid API key")]
    InvalidCredential,

    #[error("credential store unavailable: {0}")]
    Store(#[from] StoreError),
}

impl GateError {
    /// Whether this is an authentication failure (as opposed to the store
    /// itself failing).
    pub fn is_unauthenticated(&self) -> bool {
        matches!(self, GateError::MissingCredential | GateError::InvalidCredential)
    }
}

/// Outcome of a successful admission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Admission {
    /// The procedure is exempt; no identity is attached.
    Public,
    /// The credential resolved to this session.
    Authenticated(SessionId),
}

impl Admission {
    pub fn session_id(&self) -> Option<&SessionId> {
        match self {
            Admission::Public => None,
            Admission::Authenticated(id) => Some(id),
        }
    }
}

#[derive(Clone)]
pub struct AccessGate {
    store: Arc<dyn CredentialStore>,
}

impl AccessGate {
    pub fn new(store: Arc<dyn CredentialStore>) -> Self {
        Self { store }
    }

    /// Whether `procedure` skips authentication.
    pub fn is_public(procedure: &str) -> bool {
        PUBLIC_PROCEDURE_SUFFIXES
            .iter()
            .any(|suffix| procedure.ends_with(suffix))
    }

    /// Decide whether a call to `procedure` carrying `presented` may proceed.
    ///
    /// An empty header value counts as missing.
    pub async fn admit(
        &self,
        procedure: &str,
        presented: Option<&str>,
    ) -> Result<Admission, GateError> {
        if Self::is_public(procedure) {
            return Ok(Admission::Public);
        }

        let Some(credential) = presented.filter(|v| !v.is_empty()) else {
            obs::emit_auth_rejected(procedure, "missing api key", None);
            return Err(GateError::MissingCredential);
        };

        match self.store.verify(credential).await? {
            Some(session_id) => {
                obs::emit_auth_accepted(procedure, &session_id);
                Ok(Admission::Authenticated(session_id))
            }
            None => {
                obs::emit_auth_rejected(procedure, "invalid api key", Some(credential));
                Err(GateError::InvalidCredential)
            }
        }
    }
}

/// Loggable form of a credential: the first 8 characters followed by `...`,
/// or `***` when there are 8 characters or fewer.
pub fn mask_credential(raw: &str) -> String {
    match raw.char_indices().nth(MASK_VISIBLE_CHARS) {
        Some((cut, _)) => format!("{}...", &raw[..cut]),
        None => "***".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{Credential, MemoryCredentialStore};

    #[test]
    fn mask_table() {
        let cases = [
            ("1234567890abcdef", "12345678..."),
            ("short", "***"),
            ("12345678", "***"),
            ("", "***"),
            ("123456789", "12345678..."),
        ];
        for (input, expected) in cases {
            assert_eq!(mask_credential(input), expected, "input {input:?}");
        }
    }

    #[test]
    fn mask_respects_char_boundaries() {
        assert_eq!(mask_credential("ééééééééé"), "éééééééé...");
    }

    #[test]
    fn only_init_sandbox_is_public() {
        assert!(AccessGate::is_public("/core.v1.CoreService/InitSandbox"));
        assert!(!AccessGate::is_public("/core.v1.CoreService/DestroySandbox"));
        assert!(!AccessGate::is_public("/file.v1.FileService/Read"));
        assert!(!AccessGate::is_public("/shell.v1.ShellService/Execute"));
    }

    #[test]
    fn error_messages() {
        assert!(GateError::MissingCredential
            .to_string()
            .contains(API_KEY_HEADER));
        assert!(GateError::InvalidCredential.to_string().contains("invalid"));
        assert!(GateError::InvalidCredential.is_unauthenticated());
    }

    async fn gate_with_session() -> (AccessGate, SessionId, Credential) {
        let store = Arc::new(MemoryCredentialStore::new());
        let sid = SessionId::new("sandbox-67890");
        let cred = Credential::new("sk_test-api-key-12345");
        store.store(&sid, &cred).await.unwrap();
        (AccessGate::new(store), sid, cred)
    }

    #[tokio::test]
    async fn public_procedure_needs_no_credential() {
        let (gate, _, _) = gate_with_session().await;
        let admission = gate
            .admit("/core.v1.CoreService/InitSandbox", None)
            .await
            .unwrap();
        assert_eq!(admission, Admission::Public);
        assert!(admission.session_id().is_none());
    }

    #[tokio::test]
    async fn missing_or_empty_credential_rejected() {
        let (gate, _, _) = gate_with_session().await;
        for presented in [None, Some("")] {
            let err = gate
                .admit("/file.v1.FileService/Read", presented)
                .await
                .unwrap_err();
            assert!(matches!(err, GateError::MissingCredential));
        }
    }

    #[tokio::test]
    async fn unknown_credential_rejected() {
        let (gate, _, _) = gate_with_session().await;
        let err = gate
            .admit("/shell.v1.ShellService/Execute", Some("sk_nope"))
            .await
            .unwrap_err();
        assert!(matches!(err, GateError::InvalidCredential));
    }

    #[tokio::test]
    async fn valid_credential_resolves_session() {
        let (gate, sid, cred) = gate_with_session().await;
        let admission = gate
            .admit("/file.v1.FileService/Write", Some(cred.expose()))
            .await
            .unwrap();
        assert_eq!(admission.session_id(), Some(&sid));
    }
}
