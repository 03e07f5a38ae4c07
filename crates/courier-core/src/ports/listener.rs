//! ResponseListener - producer 側が受け取るコールバック
//!
//! すべてのメソッドは callback context の上でだけ、投稿順に呼ばれる。

use crate::domain::{Failure, Success};

/// Lifecycle callbacks for requests sharing this listener.
///
/// `what` is the caller-assigned number of the request, so one listener can
/// serve many requests.
pub trait ResponseListener: Send + Sync {
    fn on_start(&self, _what: i32) {}

    fn on_finish(&self, _what: i32) {}

    fn on_succeed(&self, what: i32, success: &Success);

    /// `failure` carries url, tag, cause, status code and elapsed millis.
    fn on_failed(&self, what: i32, failure: &Failure);
}
