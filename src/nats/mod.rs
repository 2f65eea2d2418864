pub mod client;
pub mod messages;

pub use client::{NatsClient, NatsObserver};
pub use messages::NotificationMessage;
