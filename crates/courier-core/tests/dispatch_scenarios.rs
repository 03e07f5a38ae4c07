use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use courier_core::app::InFlightSet;
use courier_core::domain::{Failure, Request, Response, Success};
use courier_core::impls::{ListenerEvent, RecordingListener};
use courier_core::ports::{Executor, ResponseListener};
use courier_core::RequestQueue;
use tokio::sync::Notify;

const WAIT: Duration = Duration::from_secs(5);

struct OkExecutor;

#[async_trait]
impl Executor for OkExecutor {
    async fn execute(&self, request: Arc<Request>) -> Option<Response> {
        Some(Success::new(request.url(), serde_json::json!("ok")).into())
    }
}

/// Holds `what == gated` inside execute until released; everything else returns "ok".
struct GatedExecutor {
    gated: i32,
    entered: Notify,
    release: Notify,
}

impl GatedExecutor {
    fn new(gated: i32) -> Self {
        Self {
            gated,
            entered: Notify::new(),
            release: Notify::new(),
        }
    }
}

#[async_trait]
impl Executor for GatedExecutor {
    async fn execute(&self, request: Arc<Request>) -> Option<Response> {
        if request.what() == self.gated {
            self.entered.notify_one();
            self.release.notified().await;
        }
        Some(Success::new(request.url(), serde_json::json!("ok")).into())
    }
}

struct NoneExecutor;

#[async_trait]
impl Executor for NoneExecutor {
    async fn execute(&self, _request: Arc<Request>) -> Option<Response> {
        None
    }
}

fn queue_with(executor: Arc<dyn Executor>, dispatchers: usize) -> Arc<RequestQueue> {
    let queue = RequestQueue::builder()
        .executor(executor)
        .dispatchers(dispatchers)
        .build()
        .unwrap();
    queue.start().unwrap();
    Arc::new(queue)
}

fn request(what: i32, listener: &Arc<RecordingListener>) -> Request {
    let listener: Arc<dyn ResponseListener> = listener.clone();
    Request::new(what, format!("http://example.com/{what}")).with_listener(listener)
}

fn assert_full_triple(events: &[ListenerEvent], what: i32) {
    assert_eq!(events.len(), 3, "what={what}: {events:?}");
    assert_eq!(events[0], ListenerEvent::Start(what));
    assert_eq!(events[1], ListenerEvent::Finish(what));
    assert!(events[2].is_response(), "what={what}: {events:?}");
}

#[tokio::test]
async fn scenario_a_success_is_reported_in_order() {
    let queue = queue_with(Arc::new(OkExecutor), 1);
    let listener = Arc::new(RecordingListener::new());

    queue.add(request(1, &listener)).await.unwrap();

    assert!(listener.wait_for(3, WAIT).await);
    let events = listener.events();
    assert_eq!(events[0], ListenerEvent::Start(1));
    assert_eq!(events[1], ListenerEvent::Finish(1));
    assert!(matches!(&events[2], ListenerEvent::Succeed(1, s) if s.payload == "ok"));
    queue.stop_and_join().await.unwrap();
}

#[tokio::test]
async fn scenario_b_cancel_before_dequeue_yields_nothing() {
    let gate = Arc::new(GatedExecutor::new(1));
    let queue = queue_with(gate.clone(), 1);
    let listener = Arc::new(RecordingListener::new());

    queue.add(request(1, &listener)).await.unwrap();
    gate.entered.notified().await;

    let second = queue.add(request(2, &listener)).await.unwrap();
    queue.cancel(&second);
    gate.release.notify_one();

    assert!(listener.wait_for(3, WAIT).await);
    tokio::time::timeout(WAIT, async {
        while queue.is_in_flight(&second) {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .unwrap();
    tokio::time::sleep(Duration::from_millis(50)).await;

    assert!(listener.events_for(2).is_empty());
    assert_full_triple(&listener.events_for(1), 1);
    queue.stop_and_join().await.unwrap();
}

#[tokio::test]
async fn scenario_c_cancel_during_execution_suppresses_response() {
    let gate = Arc::new(GatedExecutor::new(3));
    let queue = queue_with(gate.clone(), 1);
    let listener = Arc::new(RecordingListener::new());

    let r = queue.add(request(3, &listener)).await.unwrap();
    gate.entered.notified().await;
    queue.cancel(&r);
    gate.release.notify_one();

    assert!(listener.wait_for(2, WAIT).await);
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(
        listener.events(),
        vec![ListenerEvent::Start(3), ListenerEvent::Finish(3)]
    );
    queue.stop_and_join().await.unwrap();
}

#[tokio::test]
async fn scenario_d_absent_result_is_unknown_abnormal() {
    let queue = queue_with(Arc::new(NoneExecutor), 1);
    let listener = Arc::new(RecordingListener::new());

    queue.add(request(4, &listener)).await.unwrap();

    assert!(listener.wait_for(3, WAIT).await);
    let events = listener.events();
    let ListenerEvent::Failed(4, failure) = &events[2] else {
        panic!("expected failure, got {events:?}");
    };
    assert_eq!(failure.url, None);
    assert_eq!(failure.tag, None);
    assert_eq!(failure.cause.to_string(), "Unknown abnormal.");
    assert_eq!(failure.status_code, 0);
    assert_eq!(failure.network_millis, 0);
    assert_eq!(*failure, Failure::unknown_abnormal());
    queue.stop_and_join().await.unwrap();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn scenario_e_concurrent_producers_single_dispatcher() {
    let queue = queue_with(Arc::new(OkExecutor), 1);
    let listener = Arc::new(RecordingListener::new());

    let producers: Vec<_> = (0..10)
        .map(|p| {
            let queue = queue.clone();
            let listener = listener.clone();
            tokio::spawn(async move {
                for i in 0..10 {
                    queue.add(request(p * 10 + i, &listener)).await.unwrap();
                }
            })
        })
        .collect();
    for p in producers {
        p.await.unwrap();
    }

    assert!(listener.wait_for(300, WAIT).await);
    let mut by_what: HashMap<i32, Vec<ListenerEvent>> = HashMap::new();
    for event in listener.events() {
        by_what.entry(event.what()).or_default().push(event);
    }
    assert_eq!(by_what.len(), 100);
    for (what, events) in &by_what {
        assert_full_triple(events, *what);
    }
    assert_eq!(queue.unfinished_count(), 0);
    queue.stop_and_join().await.unwrap();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn many_dispatchers_keep_per_request_order() {
    let queue = queue_with(Arc::new(OkExecutor), 4);
    let listener = Arc::new(RecordingListener::new());

    for what in 0..200 {
        queue.add(request(what, &listener)).await.unwrap();
    }

    assert!(listener.wait_for(600, WAIT).await);
    for what in 0..200 {
        assert_full_triple(&listener.events_for(what), what);
    }
    queue.stop_and_join().await.unwrap();
}

/// Records, at on_finish time, whether the request was still tracked.
struct TrackingProbe {
    in_flight: Arc<InFlightSet>,
    still_tracked: Mutex<Vec<(i32, bool)>>,
}

impl ResponseListener for TrackingProbe {
    fn on_finish(&self, what: i32) {
        let tracked = self
            .in_flight
            .snapshot()
            .iter()
            .any(|r| r.what() == what);
        self.still_tracked.lock().unwrap().push((what, tracked));
    }

    fn on_succeed(&self, _what: i32, _success: &Success) {}

    fn on_failed(&self, _what: i32, _failure: &Failure) {}
}

#[tokio::test]
async fn finished_requests_are_no_longer_in_flight() {
    let queue = queue_with(Arc::new(OkExecutor), 2);
    let probe = Arc::new(TrackingProbe {
        in_flight: queue.in_flight().clone(),
        still_tracked: Mutex::new(Vec::new()),
    });

    for what in 0..20 {
        let listener: Arc<dyn ResponseListener> = probe.clone();
        queue
            .add(Request::new(what, "http://example.com").with_listener(listener))
            .await
            .unwrap();
    }

    tokio::time::timeout(WAIT, async {
        while probe.still_tracked.lock().unwrap().len() < 20 {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .unwrap();
    assert!(probe.still_tracked.lock().unwrap().iter().all(|(_, t)| !t));
    queue.stop_and_join().await.unwrap();
}

#[tokio::test]
async fn stop_with_empty_queue_terminates_quickly() {
    let queue = queue_with(Arc::new(OkExecutor), 3);
    tokio::time::sleep(Duration::from_millis(20)).await;

    tokio::time::timeout(Duration::from_secs(1), queue.stop_and_join())
        .await
        .unwrap()
        .unwrap();
}
