use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use clap::Parser;
use courier_core::domain::{ExecuteError, Failure, Headers, Request, Response, Success};
use courier_core::ports::{Executor, ResponseListener};
use courier_core::{CourierConfig, RequestQueue};
use tokio::time::{Duration, sleep};
use tracing_subscriber::EnvFilter;

/// 疑似 executor で request queue を動かしてみるデモ
#[derive(Debug, Parser)]
#[command(name = "courier", version, about)]
struct Args {
    /// Number of requests to enqueue
    #[arg(long, default_value_t = 12)]
    requests: i32,

    /// Dispatcher count (overrides COURIER_DISPATCHERS)
    #[arg(long)]
    dispatchers: Option<usize>,

    /// Cancel every N-th request right after adding it (0 = never)
    #[arg(long, default_value_t = 5)]
    cancel_every: i32,

    /// Make every N-th request fail with HTTP 503 (0 = never)
    #[arg(long, default_value_t = 4)]
    fail_every: i32,

    /// Simulated network latency in milliseconds
    #[arg(long, default_value_t = 30)]
    latency_ms: u64,
}

/// sleep して結果をでっち上げる executor
struct SimulatedExecutor {
    latency: Duration,
    fail_every: i32,
}

#[async_trait]
impl Executor for SimulatedExecutor {
    async fn execute(&self, request: Arc<Request>) -> Option<Response> {
        sleep(self.latency).await;
        let millis = u64::try_from(self.latency.as_millis()).unwrap_or(u64::MAX);
        let what = request.what();

        // 実行中に cancel されたら早めに抜ける
        if request.is_canceled() {
            return Some(
                Failure::for_request(&request, ExecuteError::Canceled)
                    .with_network_millis(millis)
                    .into(),
            );
        }

        // 7 件に 1 件は結果なし（unknown abnormal になる）
        if what % 7 == 6 {
            return None;
        }
        if self.fail_every > 0 && what % self.fail_every == self.fail_every - 1 {
            let headers = Headers::new(503).with_header("Retry-After", "1");
            return Some(
                Failure::for_request(&request, ExecuteError::Status(503))
                    .with_headers(&headers)
                    .with_network_millis(millis)
                    .into(),
            );
        }
        Some(
            Success::new(request.url(), serde_json::json!({ "what": what }))
                .with_headers(Headers::new(200))
                .with_network_millis(millis)
                .into(),
        )
    }
}

#[derive(Default)]
struct PrintingListener {
    succeeded: AtomicUsize,
    failed: AtomicUsize,
}

impl ResponseListener for PrintingListener {
    fn on_start(&self, what: i32) {
        println!("[{what:>3}] start");
    }

    fn on_finish(&self, what: i32) {
        println!("[{what:>3}] finish");
    }

    fn on_succeed(&self, what: i32, success: &Success) {
        self.succeeded.fetch_add(1, Ordering::Relaxed);
        println!(
            "[{what:>3}] ok   {} ({} ms) {}",
            success.url, success.network_millis, success.payload
        );
    }

    fn on_failed(&self, what: i32, failure: &Failure) {
        self.failed.fetch_add(1, Ordering::Relaxed);
        println!(
            "[{what:>3}] fail status={} cause={}",
            failure.status_code, failure.cause
        );
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let args = Args::parse();
    let mut config = CourierConfig::from_env()?;
    if let Some(n) = args.dispatchers {
        config.dispatchers = n;
    }

    let queue = RequestQueue::builder()
        .config(config)
        .executor(Arc::new(SimulatedExecutor {
            latency: Duration::from_millis(args.latency_ms),
            fail_every: args.fail_every,
        }))
        .build()?;
    queue.start()?;

    let listener = Arc::new(PrintingListener::default());
    let mut canceled = 0;
    for what in 0..args.requests {
        let request = Request::new(what, format!("https://api.example.com/items/{what}"))
            .with_tag(serde_json::json!("demo"))
            .with_listener(listener.clone());
        let request = queue.add(request).await?;
        if args.cancel_every > 0 && what % args.cancel_every == args.cancel_every - 1 {
            queue.cancel(&request);
            canceled += 1;
        }
    }

    while queue.unfinished_count() > 0 {
        sleep(Duration::from_millis(10)).await;
    }
    // 残りの通知が全部配送されるまで待つ
    queue.stop_and_join().await?;

    println!(
        "done: requests={} succeeded={} failed={} canceled={}",
        args.requests,
        listener.succeeded.load(Ordering::Relaxed),
        listener.failed.load(Ordering::Relaxed),
        canceled,
    );
    Ok(())
}
