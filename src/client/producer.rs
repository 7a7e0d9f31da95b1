use uuid::Uuid;

use crate::broker::message::{Message, MessageId};
use crate::broker::topic::Topic;
use crate::utils::error::{BrokerError, BrokerResult};

/// Publishes payloads onto topics. Holds nothing but an id for log context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Producer {
    id: String,
}

impl Producer {
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: id.into() }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Wrap `content` into a message and enqueue it on `topic`.
    /// Empty payloads are rejected before anything is enqueued.
    pub fn produce(&self, topic: &Topic, content: impl Into<String>) -> BrokerResult<MessageId> {
        let content = content.into();
        if content.is_empty() {
            return Err(BrokerError::InvalidPayload);
        }
        topic.add_message(Message::new(content))
    }
}

impl Default for Producer {
    /// A producer with a random UUID as id.
    fn default() -> Self {
        Self::new(format!("producer-{}", Uuid::new_v4()))
    }
}
