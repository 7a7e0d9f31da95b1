//! The `error` module defines the error type shared by the `memqueue` crate.
//!
//! Wiring mistakes (unknown topics or consumers, bad topology) surface at setup
//! time. Runtime errors are limited to closed or full topics and failing sinks.

use crate::broker::topic::SubscriberId;

#[derive(Debug, thiserror::Error)]
pub enum BrokerError {
    #[error("message payload must not be empty")]
    InvalidPayload,

    #[error("unknown topic: {topic}")]
    UnknownTopic { topic: String },

    #[error("unknown consumer: {consumer_id}")]
    UnknownConsumer { consumer_id: SubscriberId },

    #[error("consumer already registered: {consumer_id}")]
    DuplicateConsumer { consumer_id: SubscriberId },

    #[error("topic '{topic}' is full (capacity: {capacity})")]
    QueueFull { topic: String, capacity: usize },

    #[error("topic '{topic}' is closed")]
    TopicClosed { topic: String },

    #[error("delivery to {consumer_id} failed: {reason}")]
    Delivery {
        consumer_id: SubscriberId,
        reason: String,
    },

    #[error("invalid topology: {reason}")]
    InvalidTopology { reason: String },

    #[error("configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for broker operations
pub type BrokerResult<T> = Result<T, BrokerError>;
