//! InMemoryWorkQueue - プロセス内の work queue
//!
//! tokio の Mutex + Notify で待ち合わせる。capacity を指定すると bounded になり、
//! 満杯の間 push は空きが出るまで待つ。

use std::collections::VecDeque;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{Mutex, Notify};

use crate::domain::{Request, RequestId};
use crate::error::CourierError;
use crate::ports::WorkQueue;

struct QueueState {
    items: VecDeque<Arc<Request>>,
    closed: bool,
}

/// In-memory FIFO of pending requests.
pub struct InMemoryWorkQueue {
    state: Mutex<QueueState>,
    capacity: Option<usize>,
    /// push 時の通知用
    not_empty: Notify,
    /// take / remove 時の通知用（bounded のみ意味がある）
    not_full: Notify,
}

impl InMemoryWorkQueue {
    pub fn unbounded() -> Self {
        Self::with_capacity(None)
    }

    /// `capacity` must be non-zero; the builder rejects zero before we get here.
    pub fn bounded(capacity: usize) -> Self {
        Self::with_capacity(Some(capacity.max(1)))
    }

    pub fn with_capacity(capacity: Option<usize>) -> Self {
        Self {
            state: Mutex::new(QueueState {
                items: VecDeque::new(),
                closed: false,
            }),
            capacity,
            not_empty: Notify::new(),
            not_full: Notify::new(),
        }
    }
}

impl Default for InMemoryWorkQueue {
    fn default() -> Self {
        Self::unbounded()
    }
}

#[async_trait]
impl WorkQueue for InMemoryWorkQueue {
    async fn push(&self, request: Arc<Request>) -> Result<(), CourierError> {
        loop {
            // close() の notify_waiters を取りこぼさないよう、ロック前に登録しておく
            let space = self.not_full.notified();
            tokio::pin!(space);
            space.as_mut().enable();

            {
                let mut state = self.state.lock().await;
                if state.closed {
                    return Err(CourierError::QueueClosed);
                }
                let full = self.capacity.is_some_and(|cap| state.items.len() >= cap);
                if !full {
                    state.items.push_back(request);
                    drop(state);
                    self.not_empty.notify_one();
                    return Ok(());
                }
            }

            space.await;
        }
    }

    async fn take(&self) -> Arc<Request> {
        loop {
            {
                let mut state = self.state.lock().await;
                if let Some(request) = state.items.pop_front() {
                    let more = !state.items.is_empty();
                    drop(state);
                    self.not_full.notify_one();
                    // 他の taker がまだ寝ているかもしれない
                    if more {
                        self.not_empty.notify_one();
                    }
                    return request;
                }
            }
            self.not_empty.notified().await;
        }
    }

    async fn remove(&self, id: RequestId) -> Option<Arc<Request>> {
        let removed = {
            let mut state = self.state.lock().await;
            let pos = state.items.iter().position(|r| r.id() == id)?;
            state.items.remove(pos)
        };
        self.not_full.notify_one();
        removed
    }

    async fn close(&self) {
        self.state.lock().await.closed = true;
        self.not_full.notify_waiters();
    }

    async fn len(&self) -> usize {
        self.state.lock().await.items.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn request(what: i32) -> Arc<Request> {
        Arc::new(Request::new(what, format!("http://example.com/{what}")))
    }

    #[tokio::test]
    async fn push_take_is_fifo() {
        let queue = InMemoryWorkQueue::unbounded();
        for what in 1..=3 {
            queue.push(request(what)).await.unwrap();
        }
        assert_eq!(queue.len().await, 3);

        assert_eq!(queue.take().await.what(), 1);
        assert_eq!(queue.take().await.what(), 2);
        assert_eq!(queue.take().await.what(), 3);
        assert!(queue.is_empty().await);
    }

    #[tokio::test]
    async fn take_waits_for_push() {
        let queue = Arc::new(InMemoryWorkQueue::unbounded());

        let taker = tokio::spawn({
            let queue = queue.clone();
            async move { queue.take().await }
        });

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(!taker.is_finished());

        queue.push(request(9)).await.unwrap();
        let taken = tokio::time::timeout(Duration::from_secs(1), taker)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(taken.what(), 9);
    }

    #[tokio::test]
    async fn bounded_push_waits_for_space() {
        let queue = Arc::new(InMemoryWorkQueue::bounded(1));
        queue.push(request(1)).await.unwrap();

        let pusher = tokio::spawn({
            let queue = queue.clone();
            async move { queue.push(request(2)).await }
        });

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(!pusher.is_finished());
        assert_eq!(queue.len().await, 1);

        assert_eq!(queue.take().await.what(), 1);
        tokio::time::timeout(Duration::from_secs(1), pusher)
            .await
            .unwrap()
            .unwrap()
            .unwrap();
        assert_eq!(queue.take().await.what(), 2);
    }

    #[tokio::test]
    async fn remove_drops_only_the_given_request() {
        let queue = InMemoryWorkQueue::unbounded();
        let a = request(1);
        let b = request(2);
        queue.push(a.clone()).await.unwrap();
        queue.push(b.clone()).await.unwrap();

        let removed = queue.remove(a.id()).await.unwrap();
        assert_eq!(removed.id(), a.id());
        assert!(queue.remove(a.id()).await.is_none());
        assert_eq!(queue.len().await, 1);
        assert_eq!(queue.take().await.id(), b.id());
    }

    #[tokio::test]
    async fn close_rejects_push_and_wakes_waiting_producers() {
        let queue = Arc::new(InMemoryWorkQueue::bounded(1));
        queue.push(request(1)).await.unwrap();

        let pusher = tokio::spawn({
            let queue = queue.clone();
            async move { queue.push(request(2)).await }
        });
        tokio::time::sleep(Duration::from_millis(50)).await;

        queue.close().await;
        let result = tokio::time::timeout(Duration::from_secs(1), pusher)
            .await
            .unwrap()
            .unwrap();
        assert!(matches!(result, Err(CourierError::QueueClosed)));

        // already queued work is still available
        assert_eq!(queue.take().await.what(), 1);
    }

    #[tokio::test]
    async fn dropped_take_does_not_lose_items() {
        let queue = InMemoryWorkQueue::unbounded();
        let timed_out = tokio::time::timeout(Duration::from_millis(20), queue.take()).await;
        assert!(timed_out.is_err());

        queue.push(request(5)).await.unwrap();
        assert_eq!(queue.take().await.what(), 5);
    }
}
