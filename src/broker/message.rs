//! Message definitions for the broker
//!
//! `Message` is the unit that flows through a topic queue. It is immutable once
//! built: fields are private and only readable through accessors.
//!
//! Notes on fields:
//! - `id`: unique per message, assigned at creation
//! - `content`: the payload string handed to consumers
//! - `produced_at`: milliseconds since UNIX epoch, set when the message is built

use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub type MessageId = Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    id: MessageId,
    content: String,
    produced_at: i64,
}

impl Message {
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            content: content.into(),
            produced_at: chrono::Utc::now().timestamp_millis(),
        }
    }

    pub fn id(&self) -> MessageId {
        self.id
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn produced_at(&self) -> i64 {
        self.produced_at
    }
}
