//! Errors - 実行失敗の原因
//!
//! Executor が返す失敗の原因を分類する。dispatcher はこれを解釈せず、
//! `Failure` に載せて listener まで運ぶだけ。

use std::time::Duration;

use thiserror::Error;

/// Cause of a failed execution, delivered to `ResponseListener::on_failed`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExecuteError {
    /// The executor produced no result at all.
    #[error("Unknown abnormal.")]
    UnknownAbnormal,

    /// The executor noticed the cancellation flag and gave up.
    #[error("request was canceled")]
    Canceled,

    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    #[error("connect failed: {0}")]
    Connect(String),

    /// The server answered with a status the executor treats as failure.
    #[error("server responded with status {0}")]
    Status(u16),

    #[error("response could not be parsed: {0}")]
    Parse(String),

    /// The executor panicked or its task was aborted.
    #[error("executor panicked: {0}")]
    Panicked(String),

    #[error("{0}")]
    Other(String),
}

impl From<tokio::task::JoinError> for ExecuteError {
    fn from(err: tokio::task::JoinError) -> Self {
        if err.is_cancelled() {
            return ExecuteError::Panicked("task was aborted".to_string());
        }
        let payload = err.into_panic();
        let msg = payload
            .downcast_ref::<&str>()
            .map(|s| s.to_string())
            .or_else(|| payload.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "non-string panic payload".to_string());
        ExecuteError::Panicked(msg)
    }
}
