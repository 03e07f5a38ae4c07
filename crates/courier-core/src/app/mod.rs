//! App - アプリケーション層
//!
//! ports を組み合わせて dispatch の仕組みを作る。
//!
//! # 主要コンポーネント
//! - **Dispatcher**: take → cancel 判定 → execute → untrack → notify のループ
//! - **CallbackChannel**: listener を呼ぶ唯一の直列化されたコンテキスト
//! - **InFlightSet**: 投入済みで未完了の request の追跡
//! - **RequestQueue / RequestQueueBuilder**: producer 向けの入口と組み立て

pub mod builder;
pub mod callback;
pub mod dispatcher;
pub mod in_flight;
pub mod request_queue;

pub use self::builder::{BuildError, RequestQueueBuilder};
pub use self::callback::{CallbackChannel, CallbackReceiver};
pub use self::dispatcher::{Dispatcher, DispatcherHandle};
pub use self::in_flight::InFlightSet;
pub use self::request_queue::RequestQueue;
