//! Error types for the shell executor.

use std::time::Duration;

/// Why a command that did run is considered failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureReason {
    NonZeroExit { code: i32 },
    Signaled { signal: Option<i32> },
    TimedOut { limit: Duration },
}

impl std::fmt::Display for FailureReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FailureReason::NonZeroExit { code } => write!(f, "exit status {code}"),
            FailureReason::Signaled { signal: Some(sig) } => write!(f, "killed by signal {sig}"),
            FailureReason::Signaled { signal: None } => f.write_str("terminated abnormally"),
            FailureReason::TimedOut { limit } => {
                write!(f, "timed out after {}s", limit.as_secs_f64())
            }
        }
    }
}

/// Errors produced by the shell executor.
#[derive(Debug, thiserror::Error)]
pub enum ExecError {
    /// Non-zero exit, signal or deadline. Carries whatever output was
    /// captured before the failure.
    #[error("command execution failed: {reason}")]
    Failed {
        reason: FailureReason,
        output: String,
    },

    #[error("failed to spawn shell: {0}")]
    Spawn(#[source] std::io::Error),

    #[error("failed waiting for command: {0}")]
    Wait(#[source] std::io::Error),
}

impl ExecError {
    /// Output captured before the failure, if any was produced.
    pub fn partial_output(&self) -> Option<&str> {
        match self {
            ExecError::Failed { output, .. } if !output.is_empty() => Some(output),
            _ => None,
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(
            self,
            ExecError::Failed {
                reason: FailureReason::TimedOut { .. },
                ..
            }
        )
    }
}

/// Result type for shell execution.
pub type ExecResult<T> = std::result::Result<T, ExecError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_output_only_when_non_empty() {
        let empty = ExecError::Failed {
            reason: FailureReason::NonZeroExit { code: 1 },
            output: String::new(),
        };
        assert_eq!(empty.partial_output(), None);

        let some = ExecError::Failed {
            reason: FailureReason::NonZeroExit { code: 2 },
            output: "boom".into(),
        };
        assert_eq!(some.partial_output(), Some("boom"));
        assert!(!some.is_timeout());
    }

    #[test]
    fn timeout_display() {
        let err = ExecError::Failed {
            reason: FailureReason::TimedOut {
                limit: Duration::from_secs(1),
            },
            output: String::new(),
        };
        assert!(err.is_timeout());
        assert_eq!(err.to_string(), "command execution failed: timed out after 1s");
    }
}
