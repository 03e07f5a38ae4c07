//! Request - キューに積まれる 1 件の仕事
//!
//! Producer が作り、`Arc<Request>` としてキューと in-flight set の両方で共有される。
//! cancel フラグはどのスレッドからでも立てられる。

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::ids::RequestId;
use super::state::RequestState;
use crate::ports::ResponseListener;

/// HTTP method, carried for executors and diagnostics only.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Method {
    #[default]
    Get,
    Post,
    Put,
    Patch,
    Delete,
    Head,
    Options,
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Patch => "PATCH",
            Method::Delete => "DELETE",
            Method::Head => "HEAD",
            Method::Options => "OPTIONS",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Copy)]
struct Lifecycle {
    state: RequestState,
    started_at: Option<DateTime<Utc>>,
    finished_at: Option<DateTime<Utc>>,
}

/// One unit of work.
pub struct Request {
    id: RequestId,
    what: i32,
    url: String,
    method: Method,
    tag: Option<serde_json::Value>,
    payload: Option<serde_json::Value>,
    listener: Option<Arc<dyn ResponseListener>>,
    canceled: AtomicBool,
    lifecycle: Mutex<Lifecycle>,
}

impl Request {
    pub fn new(what: i32, url: impl Into<String>) -> Self {
        Self {
            id: RequestId::generate(),
            what,
            url: url.into(),
            method: Method::default(),
            tag: None,
            payload: None,
            listener: None,
            canceled: AtomicBool::new(false),
            lifecycle: Mutex::new(Lifecycle {
                state: RequestState::Pending,
                started_at: None,
                finished_at: None,
            }),
        }
    }

    pub fn with_method(mut self, method: Method) -> Self {
        self.method = method;
        self
    }

    /// Opaque caller value, echoed back in failures and used by `cancel_by_tag`.
    pub fn with_tag(mut self, tag: serde_json::Value) -> Self {
        self.tag = Some(tag);
        self
    }

    /// Body or parameters for the executor; the dispatcher never reads it.
    pub fn with_payload(mut self, payload: serde_json::Value) -> Self {
        self.payload = Some(payload);
        self
    }

    pub fn with_listener(mut self, listener: Arc<dyn ResponseListener>) -> Self {
        self.listener = Some(listener);
        self
    }

    pub fn id(&self) -> RequestId {
        self.id
    }

    pub fn what(&self) -> i32 {
        self.what
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn method(&self) -> Method {
        self.method
    }

    pub fn tag(&self) -> Option<&serde_json::Value> {
        self.tag.as_ref()
    }

    pub fn payload(&self) -> Option<&serde_json::Value> {
        self.payload.as_ref()
    }

    pub fn listener(&self) -> Option<&Arc<dyn ResponseListener>> {
        self.listener.as_ref()
    }

    /// Set the cancellation flag. Never interrupts a running executor.
    pub fn cancel(&self) {
        self.canceled.store(true, Ordering::Release);
    }

    pub fn is_canceled(&self) -> bool {
        self.canceled.load(Ordering::Acquire)
    }

    pub fn state(&self) -> RequestState {
        self.lifecycle().state
    }

    pub fn started_at(&self) -> Option<DateTime<Utc>> {
        self.lifecycle().started_at
    }

    pub fn finished_at(&self) -> Option<DateTime<Utc>> {
        self.lifecycle().finished_at
    }

    /// Milliseconds between start and finish (or `now` if still running).
    pub fn elapsed_millis(&self, now: DateTime<Utc>) -> u64 {
        let lc = self.lifecycle();
        match lc.started_at {
            Some(start) => {
                let end = lc.finished_at.unwrap_or(now);
                u64::try_from((end - start).num_milliseconds()).unwrap_or(0)
            }
            None => 0,
        }
    }

    pub(crate) fn mark_started(&self, at: DateTime<Utc>) {
        self.update(|lc| {
            lc.state = RequestState::Running;
            lc.started_at = Some(at);
        });
    }

    pub(crate) fn mark_finished(&self, at: DateTime<Utc>) {
        self.update(|lc| {
            lc.state = RequestState::Finished;
            lc.finished_at = Some(at);
        });
    }

    pub(crate) fn mark_dropped(&self, at: DateTime<Utc>) {
        self.update(|lc| {
            lc.state = RequestState::Dropped;
            lc.finished_at = Some(at);
        });
    }

    fn lifecycle(&self) -> Lifecycle {
        *self.lifecycle.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn update(&self, f: impl FnOnce(&mut Lifecycle)) {
        let mut lc = self.lifecycle.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut lc);
    }
}

impl fmt::Debug for Request {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Request")
            .field("id", &self.id)
            .field("what", &self.what)
            .field("method", &self.method)
            .field("url", &self.url)
            .field("tag", &self.tag)
            .field("canceled", &self.is_canceled())
            .field("state", &self.state())
            .field("has_listener", &self.listener.is_some())
            .finish()
    }
}
