use thiserror::Error;

#[derive(Debug, Error)]
pub enum CourierError {
    /// The callback receiver is gone; notifications can no longer be delivered.
    #[error("callback channel is closed")]
    CallbackChannelClosed,

    #[error("work queue is closed")]
    QueueClosed,

    #[error("request queue is stopped")]
    AlreadyStopped,

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("dispatcher task failed: {0}")]
    Join(String),
}
