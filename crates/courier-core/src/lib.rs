//! courier-core
//!
//! Request dispatch core: dispatcher loops execute queued requests and report
//! their lifecycle to one serialized callback context.
//!
//! # モジュール構成
//! - **domain**: ドメインモデル（ids, request, response, notification, state, errors）
//! - **ports**: 抽象化レイヤー（WorkQueue, Executor, ResponseListener, Clock）
//! - **app**: Dispatcher, CallbackChannel, InFlightSet, RequestQueue
//! - **impls**: 実装（InMemoryWorkQueue, BlockingExecutor, RecordingListener）
//! - **config**: 設定（環境変数から読める）
//! - **error**: crate 共通のエラー型

pub mod app;
pub mod config;
pub mod domain;
pub mod error;
pub mod impls;
pub mod ports;

pub use app::{CallbackChannel, Dispatcher, RequestQueue, RequestQueueBuilder};
pub use config::CourierConfig;
pub use domain::{ExecuteError, Failure, Request, Response, Success};
pub use error::CourierError;
pub use ports::{Executor, ResponseListener};
