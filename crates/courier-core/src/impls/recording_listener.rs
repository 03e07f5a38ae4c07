//! RecordingListener - 呼ばれた順に記録するだけの listener
//!
//! テスト用。callback context 上で呼ばれる前提なので順序は投稿順になる。

use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use crate::domain::{Failure, Success};
use crate::ports::ResponseListener;

#[derive(Debug, Clone, PartialEq)]
pub enum ListenerEvent {
    Start(i32),
    Finish(i32),
    Succeed(i32, Success),
    Failed(i32, Failure),
}

impl ListenerEvent {
    pub fn what(&self) -> i32 {
        match self {
            ListenerEvent::Start(w)
            | ListenerEvent::Finish(w)
            | ListenerEvent::Succeed(w, _)
            | ListenerEvent::Failed(w, _) => *w,
        }
    }

    pub fn is_response(&self) -> bool {
        matches!(self, ListenerEvent::Succeed(..) | ListenerEvent::Failed(..))
    }
}

/// Listener that keeps every callback in order.
#[derive(Debug, Default)]
pub struct RecordingListener {
    events: Mutex<Vec<ListenerEvent>>,
}

impl RecordingListener {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<ListenerEvent> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Events for one `what`, in delivery order.
    pub fn events_for(&self, what: i32) -> Vec<ListenerEvent> {
        self.events()
            .into_iter()
            .filter(|e| e.what() == what)
            .collect()
    }

    pub fn len(&self) -> usize {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Poll until at least `n` events were recorded. Returns false on timeout.
    pub async fn wait_for(&self, n: usize, timeout: Duration) -> bool {
        tokio::time::timeout(timeout, async {
            while self.len() < n {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .is_ok()
    }

    fn record(&self, event: ListenerEvent) {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(event);
    }
}

impl ResponseListener for RecordingListener {
    fn on_start(&self, what: i32) {
        self.record(ListenerEvent::Start(what));
    }

    fn on_finish(&self, what: i32) {
        self.record(ListenerEvent::Finish(what));
    }

    fn on_succeed(&self, what: i32, success: &Success) {
        self.record(ListenerEvent::Succeed(what, success.clone()));
    }

    fn on_failed(&self, what: i32, failure: &Failure) {
        self.record(ListenerEvent::Failed(what, failure.clone()));
    }
}
