//! Ports - 抽象化レイヤー
//!
//! dispatcher が外部と接する境目。実装は `impls` か利用側が用意する。

pub mod clock;
pub mod executor;
pub mod listener;
pub mod work_queue;

pub use self::clock::{Clock, FixedClock, SystemClock};
pub use self::executor::Executor;
pub use self::listener::ResponseListener;
pub use self::work_queue::WorkQueue;
