//! Domain identifiers (strongly-typed IDs).
//!
//! # ULID ベースの ID
//! `what` は呼び出し側が自由に付ける番号なので重複し得る。
//! キュー内部で request を一意に追跡するためには別の ID が必要になる。
//!
//! ## Phantom Type パターン
//! `Id<T>` で共通実装を持ちつつ、`T` はマーカー型としてだけ使う。
//! RequestId と DispatcherId はコンパイル時に混同できない。

use serde::{Deserialize, Serialize};
use std::fmt;
use std::marker::PhantomData;
use ulid::Ulid;

/// IdMarker は各 ID 型のマーカー trait
///
/// Display で使うプレフィックス（"req-", "dispatcher-"）を提供します。
pub trait IdMarker: Send + Sync + 'static {
    fn prefix() -> &'static str;
}

/// ジェネリック ID 型
#[repr(transparent)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Id<T: IdMarker> {
    ulid: Ulid,
    #[serde(skip)]
    _marker: PhantomData<T>,
}

impl<T: IdMarker> Id<T> {
    /// Generate a fresh, time-ordered id.
    pub fn generate() -> Self {
        Self::from_ulid(Ulid::new())
    }

    pub fn from_ulid(ulid: Ulid) -> Self {
        Self {
            ulid,
            _marker: PhantomData,
        }
    }

    pub fn as_ulid(&self) -> Ulid {
        self.ulid
    }
}

impl<T: IdMarker> From<Ulid> for Id<T> {
    fn from(ulid: Ulid) -> Self {
        Self::from_ulid(ulid)
    }
}

impl<T: IdMarker> fmt::Display for Id<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", T::prefix(), self.ulid)
    }
}

// ========================================
// マーカー型の定義
// ========================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum RequestMarker {}

impl IdMarker for RequestMarker {
    fn prefix() -> &'static str {
        "req-"
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum DispatcherMarker {}

impl IdMarker for DispatcherMarker {
    fn prefix() -> &'static str {
        "dispatcher-"
    }
}

/// Identifier of a queued request (tracking unit inside the queue).
pub type RequestId = Id<RequestMarker>;

/// Identifier of one dispatcher loop (used in log spans).
pub type DispatcherId = Id<DispatcherMarker>;
