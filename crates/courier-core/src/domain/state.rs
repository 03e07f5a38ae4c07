//! Request lifecycle state.

use serde::{Deserialize, Serialize};

/// Lifecycle of a request inside the queue.
///
/// State transitions:
/// - Pending -> Running -> Finished
/// - Pending -> Dropped (canceled before a dispatcher picked it up)
///
/// Cancellation is a separate flag: a request canceled while Running still
/// ends up Finished, only its Responded notification is suppressed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RequestState {
    /// Created or waiting in the work queue.
    Pending,

    /// Taken by a dispatcher and handed to the executor.
    Running,

    /// Execution completed (whatever the outcome).
    Finished,

    /// Discarded by a dispatcher because it was canceled before execution.
    Dropped,
}

impl RequestState {
    /// Is this a terminal state (no further transitions)?
    pub fn is_terminal(self) -> bool {
        matches!(self, RequestState::Finished | RequestState::Dropped)
    }
}
