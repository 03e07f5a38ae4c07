//! RequestQueue - producer から見た入口
//!
//! 1 つの WorkQueue / InFlightSet / CallbackChannel と、それを共有する
//! N 本の dispatcher をまとめて持つ。

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::task::JoinHandle;

use super::builder::RequestQueueBuilder;
use super::callback::{CallbackChannel, CallbackReceiver};
use super::dispatcher::{Dispatcher, DispatcherHandle};
use super::in_flight::InFlightSet;
use crate::domain::Request;
use crate::error::CourierError;
use crate::ports::{Clock, Executor, WorkQueue};

/// Producer facade over a shared work queue and its dispatchers.
pub struct RequestQueue {
    work_queue: Arc<dyn WorkQueue>,
    in_flight: Arc<InFlightSet>,
    executor: Arc<dyn Executor>,
    /// stop_and_join() で手放す。最後の sender が消えると receiver が終わる
    callbacks: Mutex<Option<CallbackChannel>>,
    /// builder が channel を作った場合だけ Some。start() で spawn する
    receiver: Mutex<Option<CallbackReceiver>>,
    receiver_task: Mutex<Option<JoinHandle<usize>>>,
    clock: Arc<dyn Clock>,
    dispatcher_count: usize,
    running: Mutex<Vec<DispatcherHandle>>,
    stopped: AtomicBool,
}

impl RequestQueue {
    pub fn builder() -> RequestQueueBuilder {
        RequestQueueBuilder::new()
    }

    pub(crate) fn new(
        work_queue: Arc<dyn WorkQueue>,
        executor: Arc<dyn Executor>,
        callbacks: CallbackChannel,
        receiver: Option<CallbackReceiver>,
        clock: Arc<dyn Clock>,
        dispatcher_count: usize,
    ) -> Self {
        Self {
            work_queue,
            in_flight: Arc::new(InFlightSet::new()),
            executor,
            callbacks: Mutex::new(Some(callbacks)),
            receiver: Mutex::new(receiver),
            receiver_task: Mutex::new(None),
            clock,
            dispatcher_count,
            running: Mutex::new(Vec::new()),
            stopped: AtomicBool::new(false),
        }
    }

    pub fn dispatcher_count(&self) -> usize {
        self.dispatcher_count
    }

    /// Spawn the dispatchers (and the private callback receiver, if any).
    ///
    /// Calling it again while running is a no-op. Must run inside a tokio runtime.
    pub fn start(&self) -> Result<(), CourierError> {
        if self.stopped.load(Ordering::Acquire) {
            return Err(CourierError::AlreadyStopped);
        }
        let mut running = self.running();
        if !running.is_empty() {
            return Ok(());
        }
        let callbacks = lock(&self.callbacks)
            .clone()
            .ok_or(CourierError::AlreadyStopped)?;

        if let Some(receiver) = lock(&self.receiver).take() {
            *lock(&self.receiver_task) = Some(tokio::spawn(receiver.run()));
        }
        for _ in 0..self.dispatcher_count {
            let dispatcher = Dispatcher::new(
                Arc::clone(&self.work_queue),
                Arc::clone(&self.in_flight),
                Arc::clone(&self.executor),
                callbacks.clone(),
            )
            .with_clock(Arc::clone(&self.clock));
            running.push(dispatcher.start());
        }
        tracing::info!(dispatchers = self.dispatcher_count, "request queue started");
        Ok(())
    }

    /// Track and enqueue a request. Waits while a bounded queue is full.
    pub async fn add(&self, request: Request) -> Result<Arc<Request>, CourierError> {
        if self.stopped.load(Ordering::Acquire) {
            return Err(CourierError::AlreadyStopped);
        }
        let request = Arc::new(request);
        self.in_flight.insert(Arc::clone(&request));
        if let Err(err) = self.work_queue.push(Arc::clone(&request)).await {
            self.in_flight.remove(request.id());
            return Err(err);
        }
        Ok(request)
    }

    /// Set the cancel flag. The request stays queued/tracked until a dispatcher sees it.
    pub fn cancel(&self, request: &Request) {
        request.cancel();
    }

    /// Cancel every tracked request carrying `tag`. Returns how many were newly canceled.
    pub fn cancel_by_tag(&self, tag: &serde_json::Value) -> usize {
        self.in_flight.cancel_where(|r| r.tag() == Some(tag))
    }

    pub fn cancel_all(&self) -> usize {
        self.in_flight.cancel_where(|_| true)
    }

    /// Take a request that is still waiting in the queue out of it and stop
    /// tracking it. No notification is posted.
    ///
    /// Returns `false` if a dispatcher already took it; use [`cancel`](Self::cancel) then.
    pub async fn remove(&self, request: &Request) -> bool {
        if self.work_queue.remove(request.id()).await.is_none() {
            return false;
        }
        request.mark_dropped(self.clock.now());
        self.in_flight.remove(request.id());
        tracing::debug!(
            what = request.what(),
            url = request.url(),
            "request removed from queue"
        );
        true
    }

    pub fn is_in_flight(&self, request: &Request) -> bool {
        self.in_flight.contains(request.id())
    }

    /// Requests added but not yet finished (queued or executing).
    pub fn unfinished_count(&self) -> usize {
        self.in_flight.len()
    }

    /// Requests still waiting in the work queue.
    pub async fn unstarted_count(&self) -> usize {
        self.work_queue.len().await
    }

    pub fn in_flight(&self) -> &Arc<InFlightSet> {
        &self.in_flight
    }

    /// Stop accepting requests and signal every dispatcher. Idempotent.
    ///
    /// Requests being executed run to completion; the backlog is left as is.
    pub async fn stop(&self) {
        if !self.stopped.swap(true, Ordering::AcqRel) {
            tracing::info!("request queue stopping");
        }
        {
            let running = self.running();
            for handle in running.iter() {
                handle.stop();
            }
        }
        self.work_queue.close().await;
    }

    /// `stop()`, wait for every dispatcher to exit, then wait until the
    /// private callback receiver has delivered everything they posted.
    ///
    /// With a channel passed to the builder the caller owns the receiver, so
    /// only the dispatchers are awaited.
    pub async fn stop_and_join(&self) -> Result<(), CourierError> {
        self.stop().await;
        let dispatchers = std::mem::take(&mut *self.running());
        let mut first_err = None;
        for handle in dispatchers {
            if let Err(err) = handle.join().await {
                tracing::error!(error = %err, "dispatcher exited with error");
                first_err.get_or_insert(err);
            }
        }

        // dispatcher の clone はもう無い。ここで手放せば receiver は残りを配送して終わる
        drop(lock(&self.callbacks).take());
        let receiver_task = lock(&self.receiver_task).take();
        if let Some(task) = receiver_task {
            match task.await {
                Ok(delivered) => tracing::debug!(delivered, "callback receiver finished"),
                Err(err) => {
                    first_err.get_or_insert(CourierError::Join(err.to_string()));
                }
            }
        }
        first_err.map_or(Ok(()), Err)
    }

    fn running(&self) -> MutexGuard<'_, Vec<DispatcherHandle>> {
        lock(&self.running)
    }
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}
