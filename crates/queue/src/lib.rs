pub mod error;
pub mod item;
pub mod outbox;
pub mod sender;

pub use error::QueueError;
pub use item::{ItemStatus, OutboundItem};
pub use outbox::{DurableQueue, FlushReport};
pub use sender::OutboundSender;
