//! Dispatcher - request を 1 件ずつ実行して通知するループ
//!
//! # フロー
//! 1. WorkQueue::take() で request を取得（shutdown と競合させる）
//! 2. すでに cancel 済みなら通知せずに捨てる
//! 3. 開始時刻を記録して Started を投稿
//! 4. Executor で実行（panic は失敗結果に変換）
//! 5. InFlightSet から外す
//! 6. 終了時刻を記録して Finished を投稿
//! 7. cancel されていなければ Responded を投稿

use std::sync::Arc;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::Instrument;

use super::callback::CallbackChannel;
use super::in_flight::InFlightSet;
use crate::domain::{DispatcherId, ExecuteError, Failure, Notification, Request, Response};
use crate::error::CourierError;
use crate::ports::{Clock, Executor, SystemClock, WorkQueue};

/// A dispatch loop, configured but not yet running.
pub struct Dispatcher {
    id: DispatcherId,
    queue: Arc<dyn WorkQueue>,
    in_flight: Arc<InFlightSet>,
    executor: Arc<dyn Executor>,
    callbacks: CallbackChannel,
    clock: Arc<dyn Clock>,
}

/// Handle of a running dispatcher.
/// - `stop()` で終了を要求（実行中の 1 件は最後まで処理する）
/// - handle を drop しても止まる
pub struct DispatcherHandle {
    id: DispatcherId,
    shutdown_tx: watch::Sender<bool>,
    join: JoinHandle<Result<(), CourierError>>,
}

impl Dispatcher {
    pub fn new(
        queue: Arc<dyn WorkQueue>,
        in_flight: Arc<InFlightSet>,
        executor: Arc<dyn Executor>,
        callbacks: CallbackChannel,
    ) -> Self {
        Self {
            id: DispatcherId::generate(),
            queue,
            in_flight,
            executor,
            callbacks,
            clock: Arc::new(SystemClock),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn id(&self) -> DispatcherId {
        self.id
    }

    /// Spawn the loop on its own tokio task.
    pub fn start(self) -> DispatcherHandle {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let id = self.id;
        let span = tracing::info_span!("dispatcher", id = %id);
        let join = tokio::spawn(self.run(shutdown_rx).instrument(span));
        DispatcherHandle {
            id,
            shutdown_tx,
            join,
        }
    }

    async fn run(self, mut shutdown_rx: watch::Receiver<bool>) -> Result<(), CourierError> {
        tracing::info!("dispatcher started");
        loop {
            // shutdown が来ていたら抜ける
            if *shutdown_rx.borrow_and_update() {
                break;
            }

            let request = tokio::select! {
                biased;
                changed = shutdown_rx.changed() => {
                    if changed.is_err() {
                        // handle が drop された
                        break;
                    }
                    // flag が立っていなければ spurious wake。次のループで判定
                    continue;
                }
                request = self.queue.take() => request,
            };

            if let Err(err) = self.dispatch(request).await {
                tracing::error!(error = %err, "dispatcher cannot deliver notifications; exiting");
                return Err(err);
            }
        }
        tracing::info!("dispatcher stopped");
        Ok(())
    }

    async fn dispatch(&self, request: Arc<Request>) -> Result<(), CourierError> {
        let what = request.what();

        if request.is_canceled() {
            tracing::debug!(what, url = request.url(), "request is canceled");
            request.mark_dropped(self.clock.now());
            self.in_flight.remove(request.id());
            return Ok(());
        }

        let listener = request.listener().cloned();

        request.mark_started(self.clock.now());
        self.callbacks
            .post(Notification::started(what, listener.clone()))?;

        let response = self.execute(&request).await;

        self.in_flight.remove(request.id());

        request.mark_finished(self.clock.now());
        self.callbacks
            .post(Notification::finished(what, listener.clone()))?;

        if request.is_canceled() {
            tracing::debug!(what, url = request.url(), "request finished, but it's canceled");
            return Ok(());
        }

        let response = response.unwrap_or_else(|| Failure::unknown_abnormal().into());
        tracing::debug!(
            what,
            succeeded = response.is_succeeded(),
            network_millis = response.network_millis(),
            "request responded"
        );
        self.callbacks
            .post(Notification::responded(what, listener, response))
    }

    /// Run the executor on its own task so a panic stays contained to this request.
    async fn execute(&self, request: &Arc<Request>) -> Option<Response> {
        let executor = Arc::clone(&self.executor);
        let req = Arc::clone(request);
        match tokio::spawn(async move { executor.execute(req).await }).await {
            Ok(response) => response,
            Err(err) => {
                let cause = ExecuteError::from(err);
                tracing::error!(what = request.what(), error = %cause, "executor failed");
                let failure = Failure::for_request(request, cause)
                    .with_network_millis(request.elapsed_millis(self.clock.now()));
                Some(failure.into())
            }
        }
    }
}

impl DispatcherHandle {
    pub fn id(&self) -> DispatcherId {
        self.id
    }

    /// Request shutdown. Idempotent; wakes the loop if it is waiting for work.
    pub fn stop(&self) {
        self.shutdown_tx.send_replace(true);
    }

    pub fn is_finished(&self) -> bool {
        self.join.is_finished()
    }

    /// Wait for the loop to exit.
    pub async fn join(self) -> Result<(), CourierError> {
        // 待っている間に shutdown_tx を drop すると loop が止まってしまう
        let DispatcherHandle {
            shutdown_tx, join, ..
        } = self;
        let result = join
            .await
            .map_err(|e| CourierError::Join(e.to_string()))?;
        drop(shutdown_tx);
        result
    }

    pub async fn stop_and_join(self) -> Result<(), CourierError> {
        self.stop();
        self.join().await
    }
}
