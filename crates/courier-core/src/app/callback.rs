//! CallbackChannel - listener を呼ぶ唯一の場所
//!
//! dispatcher はいくつあっても、通知はすべてこの 1 本のチャネルに投稿され、
//! 受信側が投稿順に 1 件ずつ配送する。
//!
//! グローバルな handler を遅延初期化する代わりに、明示的に作って各 dispatcher に渡す。

use std::panic::{AssertUnwindSafe, catch_unwind};

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::domain::Notification;
use crate::error::CourierError;

/// Posting side. Cheap to clone; every dispatcher holds one.
#[derive(Debug, Clone)]
pub struct CallbackChannel {
    tx: mpsc::UnboundedSender<Notification>,
}

/// Delivery side. Exactly one exists per channel.
#[derive(Debug)]
pub struct CallbackReceiver {
    rx: mpsc::UnboundedReceiver<Notification>,
}

impl CallbackChannel {
    /// Create a channel whose receiver the caller drives (e.g. from a UI loop).
    pub fn new() -> (Self, CallbackReceiver) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, CallbackReceiver { rx })
    }

    /// Create a channel and run its receiver on a dedicated tokio task.
    ///
    /// The task ends once every `CallbackChannel` clone is dropped and the
    /// backlog is delivered; it yields the number of notifications delivered.
    pub fn spawn() -> (Self, JoinHandle<usize>) {
        let (channel, receiver) = Self::new();
        let join = tokio::spawn(receiver.run());
        (channel, join)
    }

    /// Enqueue a notification for delivery. Never waits.
    pub fn post(&self, notification: Notification) -> Result<(), CourierError> {
        self.tx
            .send(notification)
            .map_err(|_| CourierError::CallbackChannelClosed)
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

impl CallbackReceiver {
    /// Deliver notifications in post order until all senders are gone.
    pub async fn run(mut self) -> usize {
        let mut delivered = 0;
        while let Some(notification) = self.rx.recv().await {
            deliver(notification);
            delivered += 1;
        }
        tracing::debug!(delivered, "callback channel closed");
        delivered
    }

    /// Deliver everything queued right now without waiting for more.
    pub fn drain(&mut self) -> usize {
        let mut delivered = 0;
        while let Ok(notification) = self.rx.try_recv() {
            deliver(notification);
            delivered += 1;
        }
        delivered
    }
}

fn deliver(notification: Notification) {
    let what = notification.what();
    // listener の panic で配送が止まると後続の通知が全部失われる
    if catch_unwind(AssertUnwindSafe(|| notification.deliver())).is_err() {
        tracing::error!(what, "response listener panicked; continuing with next notification");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Failure, Success};
    use crate::impls::{ListenerEvent, RecordingListener};
    use crate::ports::ResponseListener;
    use std::sync::Arc;
    use std::time::Duration;

    #[test]
    fn drain_delivers_in_post_order() {
        let (channel, mut receiver) = CallbackChannel::new();
        let listener = Arc::new(RecordingListener::new());
        let l: Option<Arc<dyn ResponseListener>> = Some(listener.clone());

        channel.post(Notification::started(1, l.clone())).unwrap();
        channel.post(Notification::started(2, l.clone())).unwrap();
        channel.post(Notification::finished(1, l.clone())).unwrap();
        channel
            .post(Notification::responded(1, l, Failure::unknown_abnormal().into()))
            .unwrap();

        // 投稿しただけでは何も呼ばれない
        assert!(listener.is_empty());

        assert_eq!(receiver.drain(), 4);
        let events = listener.events();
        assert_eq!(events[0], ListenerEvent::Start(1));
        assert_eq!(events[1], ListenerEvent::Start(2));
        assert_eq!(events[2], ListenerEvent::Finish(1));
        assert!(matches!(events[3], ListenerEvent::Failed(1, _)));

        assert_eq!(receiver.drain(), 0);
    }

    #[test]
    fn notifications_without_listener_keep_order() {
        let (channel, mut receiver) = CallbackChannel::new();
        let listener = Arc::new(RecordingListener::new());
        let l: Option<Arc<dyn ResponseListener>> = Some(listener.clone());

        channel.post(Notification::started(1, None)).unwrap();
        channel.post(Notification::started(2, l.clone())).unwrap();
        channel.post(Notification::finished(1, None)).unwrap();
        channel.post(Notification::finished(2, l)).unwrap();

        assert_eq!(receiver.drain(), 4);
        assert_eq!(
            listener.events(),
            vec![ListenerEvent::Start(2), ListenerEvent::Finish(2)]
        );
    }

    #[test]
    fn post_fails_once_receiver_is_dropped() {
        let (channel, receiver) = CallbackChannel::new();
        drop(receiver);
        assert!(channel.is_closed());
        let err = channel.post(Notification::started(1, None)).unwrap_err();
        assert!(matches!(err, CourierError::CallbackChannelClosed));
    }

    struct PanickyListener;

    impl ResponseListener for PanickyListener {
        fn on_start(&self, _what: i32) {
            panic!("listener bug");
        }

        fn on_succeed(&self, _what: i32, _success: &Success) {}

        fn on_failed(&self, _what: i32, _failure: &Failure) {}
    }

    #[tokio::test]
    async fn panicking_listener_does_not_stop_delivery() {
        let (channel, join) = CallbackChannel::spawn();
        let listener = Arc::new(RecordingListener::new());

        channel
            .post(Notification::started(1, Some(Arc::new(PanickyListener))))
            .unwrap();
        channel
            .post(Notification::started(2, Some(listener.clone())))
            .unwrap();
        drop(channel);

        let delivered = tokio::time::timeout(Duration::from_secs(1), join)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(delivered, 2);
        assert_eq!(listener.events(), vec![ListenerEvent::Start(2)]);
    }
}
