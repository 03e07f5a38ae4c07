//! BlockingExecutor - 同期関数を Executor にする
//!
//! 同期 I/O をする transport は async の worker を塞いでしまうので、
//! spawn_blocking で blocking pool に逃がす。

use std::sync::Arc;

use async_trait::async_trait;

use crate::domain::{Failure, Request, Response};
use crate::ports::Executor;

/// Runs a synchronous function on tokio's blocking pool.
pub struct BlockingExecutor<F> {
    f: Arc<F>,
}

impl<F> BlockingExecutor<F>
where
    F: Fn(&Request) -> Option<Response> + Send + Sync + 'static,
{
    pub fn new(f: F) -> Self {
        Self { f: Arc::new(f) }
    }
}

#[async_trait]
impl<F> Executor for BlockingExecutor<F>
where
    F: Fn(&Request) -> Option<Response> + Send + Sync + 'static,
{
    async fn execute(&self, request: Arc<Request>) -> Option<Response> {
        let f = Arc::clone(&self.f);
        let req = Arc::clone(&request);
        match tokio::task::spawn_blocking(move || f(&req)).await {
            Ok(response) => response,
            Err(err) => Some(Failure::for_request(&request, err.into()).into()),
        }
    }
}
