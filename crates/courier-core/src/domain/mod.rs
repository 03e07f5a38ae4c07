//! Domain model (IDs, requests, responses, notifications, ...).

pub mod errors;
pub mod ids;
pub mod notification;
pub mod request;
pub mod response;
pub mod state;

pub use self::errors::ExecuteError;
pub use self::ids::{DispatcherId, RequestId};
pub use self::notification::{Notification, NotificationKind};
pub use self::request::{Method, Request};
pub use self::response::{Failure, Headers, Response, Success};
pub use self::state::RequestState;
