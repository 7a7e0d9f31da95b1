//! Consumer representation
//!
//! A `Consumer` has an id, the names of the topics it listens to, and a sink
//! that receives one record per delivered message. The same consumer can be
//! driven by several workers at once (one per subscribed topic), so all of its
//! mutable state is synchronized.

use std::collections::BTreeSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::RwLock;

use crate::broker::message::Message;
use crate::broker::topic::SubscriberId;
use crate::client::sink::{DeliverySink, StdoutSink};
use crate::utils::error::{BrokerError, BrokerResult};

#[derive(Debug)]
pub struct Consumer {
    id: SubscriberId,
    subscribed_topics: RwLock<BTreeSet<String>>,
    sink: Arc<dyn DeliverySink>,
    received: AtomicU64,
}

impl Consumer {
    /// Create a consumer writing its records to `sink`.
    pub fn new(id: impl Into<SubscriberId>, sink: Arc<dyn DeliverySink>) -> Self {
        Self {
            id: id.into(),
            subscribed_topics: RwLock::new(BTreeSet::new()),
            sink,
            received: AtomicU64::new(0),
        }
    }

    /// Create a consumer printing its records to stdout.
    pub fn with_stdout(id: impl Into<SubscriberId>) -> Self {
        Self::new(id, Arc::new(StdoutSink))
    }

    pub fn id(&self) -> &SubscriberId {
        &self.id
    }

    /// Handle one message: writes `"<id> received <content>"` to the sink.
    pub fn receive_message(&self, message: &Message) -> BrokerResult<()> {
        let record = format!("{} received {}", self.id, message.content());
        self.sink
            .write_record(&record)
            .map_err(|e| BrokerError::Delivery {
                consumer_id: self.id.clone(),
                reason: e.to_string(),
            })?;
        self.received.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    pub fn received_count(&self) -> u64 {
        self.received.load(Ordering::Relaxed)
    }

    pub fn add_subscribed_topic(&self, topic: &str) -> bool {
        self.subscribed_topics.write().insert(topic.to_string())
    }

    pub fn remove_subscribed_topic(&self, topic: &str) -> bool {
        self.subscribed_topics.write().remove(topic)
    }

    pub fn is_subscribed_to(&self, topic: &str) -> bool {
        self.subscribed_topics.read().contains(topic)
    }

    pub fn subscribed_topics(&self) -> BTreeSet<String> {
        self.subscribed_topics.read().clone()
    }
}
