//! RequestQueueBuilder - RequestQueue の構築とワイヤリング
//!
//! # Fail-fast 設計
//! - executor が無い、dispatcher が 0 本、capacity が 0、は build() で弾く
//! - 起動後に気づくより、組み立て時にエラーにした方が原因が分かりやすい

use std::sync::Arc;

use super::callback::CallbackChannel;
use super::request_queue::RequestQueue;
use crate::config::CourierConfig;
use crate::impls::InMemoryWorkQueue;
use crate::ports::{Clock, Executor, SystemClock, WorkQueue};

/// RequestQueueBuilder は RequestQueue を構築
///
/// # 使用例
/// ```ignore
/// let queue = RequestQueueBuilder::new()
///     .executor(Arc::new(MyExecutor))
///     .dispatchers(2)
///     .build()?;
/// queue.start()?;
/// ```
pub struct RequestQueueBuilder {
    config: CourierConfig,
    executor: Option<Arc<dyn Executor>>,
    work_queue: Option<Arc<dyn WorkQueue>>,
    callbacks: Option<CallbackChannel>,
    clock: Arc<dyn Clock>,
}

/// BuildError は RequestQueue 構築時のエラー
#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    #[error("no executor configured; call RequestQueueBuilder::executor()")]
    MissingExecutor,

    #[error("at least one dispatcher is required")]
    NoDispatchers,

    #[error("queue capacity must be greater than zero")]
    ZeroCapacity,
}

impl RequestQueueBuilder {
    pub fn new() -> Self {
        Self {
            config: CourierConfig::default(),
            executor: None,
            work_queue: None,
            callbacks: None,
            clock: Arc::new(SystemClock),
        }
    }

    /// Replace dispatcher count and capacity with `config`.
    pub fn config(mut self, config: CourierConfig) -> Self {
        self.config = config;
        self
    }

    pub fn executor(mut self, executor: Arc<dyn Executor>) -> Self {
        self.executor = Some(executor);
        self
    }

    pub fn dispatchers(mut self, n: usize) -> Self {
        self.config.dispatchers = n;
        self
    }

    pub fn queue_capacity(mut self, capacity: usize) -> Self {
        self.config.queue_capacity = Some(capacity);
        self
    }

    /// Use a custom work queue; `queue_capacity` is then ignored.
    pub fn work_queue(mut self, queue: Arc<dyn WorkQueue>) -> Self {
        self.work_queue = Some(queue);
        self
    }

    /// Post into an existing channel instead of spawning a private receiver.
    ///
    /// Several request queues can share one callback context this way.
    pub fn callbacks(mut self, callbacks: CallbackChannel) -> Self {
        self.callbacks = Some(callbacks);
        self
    }

    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn build(self) -> Result<RequestQueue, BuildError> {
        let executor = self.executor.ok_or(BuildError::MissingExecutor)?;
        if self.config.dispatchers == 0 {
            return Err(BuildError::NoDispatchers);
        }
        if self.config.queue_capacity == Some(0) && self.work_queue.is_none() {
            return Err(BuildError::ZeroCapacity);
        }

        let work_queue = self.work_queue.unwrap_or_else(|| {
            Arc::new(InMemoryWorkQueue::with_capacity(self.config.queue_capacity))
        });
        let (callbacks, receiver) = match self.callbacks {
            Some(callbacks) => (callbacks, None),
            None => {
                let (callbacks, receiver) = CallbackChannel::new();
                (callbacks, Some(receiver))
            }
        };

        Ok(RequestQueue::new(
            work_queue,
            executor,
            callbacks,
            receiver,
            self.clock,
            self.config.dispatchers,
        ))
    }
}

impl Default for RequestQueueBuilder {
    fn default() -> Self {
        Self::new()
    }
}
