//! InFlightSet - 投入済みでまだ終わっていない request の集合
//!
//! enqueue 時に入り、dispatcher が実行を終えた直後（Finished 通知の前）に抜ける。
//! cancel_by_tag などの一括操作はここを走査する。

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::domain::{Request, RequestId};

/// Concurrent set of tracked requests.
///
/// The lock is never held across an await point.
#[derive(Debug, Default)]
pub struct InFlightSet {
    requests: Mutex<HashMap<RequestId, Arc<Request>>>,
}

impl InFlightSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns false if the request was already tracked.
    pub fn insert(&self, request: Arc<Request>) -> bool {
        self.lock().insert(request.id(), request).is_none()
    }

    pub fn remove(&self, id: RequestId) -> Option<Arc<Request>> {
        self.lock().remove(&id)
    }

    pub fn contains(&self, id: RequestId) -> bool {
        self.lock().contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn snapshot(&self) -> Vec<Arc<Request>> {
        self.lock().values().cloned().collect()
    }

    /// Set the cancel flag on every tracked request matching `pred`.
    /// Requests stay tracked; the dispatcher untracks them.
    pub fn cancel_where(&self, pred: impl Fn(&Request) -> bool) -> usize {
        let requests = self.lock();
        let mut canceled = 0;
        for request in requests.values().filter(|r| pred(r)) {
            if !request.is_canceled() {
                request.cancel();
                canceled += 1;
            }
        }
        canceled
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<RequestId, Arc<Request>>> {
        self.requests.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
