//! WorkQueue port - dispatcher が仕事を取り出すキュー
//!
//! 複数の dispatcher が同じキューを共有してよい。

use std::sync::Arc;

use async_trait::async_trait;

use crate::domain::{Request, RequestId};
use crate::error::CourierError;

/// Queue of pending requests.
#[async_trait]
pub trait WorkQueue: Send + Sync {
    /// Append a request. Waits while a bounded queue is full.
    async fn push(&self, request: Arc<Request>) -> Result<(), CourierError>;

    /// Take the oldest request, waiting until one is available.
    ///
    /// Must be cancel-safe: dropping the future never loses an item.
    async fn take(&self) -> Arc<Request>;

    /// Remove a specific request that has not been taken yet.
    async fn remove(&self, id: RequestId) -> Option<Arc<Request>>;

    /// Refuse further pushes and wake producers waiting for space.
    /// Already queued requests can still be taken.
    async fn close(&self);

    /// Number of requests waiting to be taken.
    async fn len(&self) -> usize;

    async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}
