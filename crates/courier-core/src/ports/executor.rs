//! Executor port - request を実際に実行する外部コンポーネント
//!
//! transport / parser はこの trait の向こう側にある。dispatcher は結果を解釈しない。

use std::sync::Arc;

use async_trait::async_trait;

use crate::domain::{Request, Response};

/// Executes one request.
///
/// - `None` means "no result at all"; the dispatcher reports it as an
///   unknown abnormal failure.
/// - Timeouts and retries are the executor's business.
/// - Implementations should poll `request.is_canceled()` where they can and
///   bail out early; the dispatcher never aborts a running call.
#[async_trait]
pub trait Executor: Send + Sync {
    async fn execute(&self, request: Arc<Request>) -> Option<Response>;
}
