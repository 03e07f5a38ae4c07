//! Notification - callback context に送る 1 件の通知
//!
//! Started / Finished / Responded を 1 つの enum で表し、
//! `deliver()` がちょうど 1 つの listener メソッドを呼ぶ。

use std::fmt;
use std::sync::Arc;

use super::response::Response;
use crate::ports::ResponseListener;

#[derive(Debug, Clone, PartialEq)]
pub enum NotificationKind {
    Started,
    Finished,
    Responded(Response),
}

/// One lifecycle event bound to a `what` and its listener.
pub struct Notification {
    what: i32,
    listener: Option<Arc<dyn ResponseListener>>,
    kind: NotificationKind,
}

impl Notification {
    pub fn new(
        what: i32,
        listener: Option<Arc<dyn ResponseListener>>,
        kind: NotificationKind,
    ) -> Self {
        Self {
            what,
            listener,
            kind,
        }
    }

    pub fn started(what: i32, listener: Option<Arc<dyn ResponseListener>>) -> Self {
        Self::new(what, listener, NotificationKind::Started)
    }

    pub fn finished(what: i32, listener: Option<Arc<dyn ResponseListener>>) -> Self {
        Self::new(what, listener, NotificationKind::Finished)
    }

    pub fn responded(
        what: i32,
        listener: Option<Arc<dyn ResponseListener>>,
        response: Response,
    ) -> Self {
        Self::new(what, listener, NotificationKind::Responded(response))
    }

    pub fn what(&self) -> i32 {
        self.what
    }

    /// Invoke the matching listener method. No listener means no-op.
    pub fn deliver(self) {
        let Some(listener) = self.listener else {
            return;
        };
        match self.kind {
            NotificationKind::Started => listener.on_start(self.what),
            NotificationKind::Finished => listener.on_finish(self.what),
            NotificationKind::Responded(Response::Succeeded(success)) => {
                listener.on_succeed(self.what, &success)
            }
            NotificationKind::Responded(Response::Failed(failure)) => {
                listener.on_failed(self.what, &failure)
            }
        }
    }
}

impl fmt::Debug for Notification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Notification")
            .field("what", &self.what)
            .field("kind", &self.kind)
            .field("has_listener", &self.listener.is_some())
            .finish()
    }
}
