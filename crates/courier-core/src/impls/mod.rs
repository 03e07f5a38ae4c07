//! Impls - ports の実装
//!
//! # 含まれる実装
//! - **InMemoryWorkQueue**: プロセス内の work queue（bounded / unbounded）
//! - **BlockingExecutor**: 同期関数を blocking pool で動かす Executor
//! - **RecordingListener**: 呼ばれた順に記録する listener（テスト用）

pub mod blocking_executor;
pub mod inmem_queue;
pub mod recording_listener;

pub use self::blocking_executor::BlockingExecutor;
pub use self::inmem_queue::InMemoryWorkQueue;
pub use self::recording_listener::{ListenerEvent, RecordingListener};
