use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::broker::topic::OverflowPolicy;
use crate::utils::error::{BrokerError, BrokerResult};

/// Top-level configuration settings for the application.
///
/// Includes the broker's queue settings and the static topology to wire up.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct Settings {
    pub broker: BrokerSettings,
    pub topology: TopologySettings,
}

/// Configuration settings for the broker.
///
/// `queue_capacity` bounds every topic; `None` leaves topics unbounded.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Default)]
pub struct BrokerSettings {
    pub queue_capacity: Option<usize>,
    pub overflow_policy: OverflowPolicy,
}

/// Topics, consumers and producers to create at startup.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Default)]
pub struct TopologySettings {
    #[serde(default)]
    pub topics: Vec<String>,
    #[serde(default)]
    pub consumers: Vec<ConsumerSettings>,
    #[serde(default)]
    pub producers: Vec<ProducerSettings>,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct ConsumerSettings {
    pub id: String,
    pub topics: Vec<String>,
}

/// One producer worker: publishes `messages` to `topic` in order.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct ProducerSettings {
    pub id: String,
    pub topic: String,
    pub messages: Vec<String>,
}

/// Partial configuration settings loaded from files or environment.
///
/// Missing broker values are filled from defaults. A `topology` section, when
/// present, replaces the default topology as a whole.
#[derive(Debug, Deserialize)]
pub struct PartialSettings {
    pub broker: Option<PartialBrokerSettings>,
    pub topology: Option<TopologySettings>,
}

#[derive(Debug, Deserialize)]
pub struct PartialBrokerSettings {
    pub queue_capacity: Option<usize>,
    pub overflow_policy: Option<OverflowPolicy>,
}

impl Settings {
    /// Check that the topology only references declared topics and that ids
    /// are unique. Called before anything is wired.
    pub fn validate(&self) -> BrokerResult<()> {
        if self.broker.queue_capacity == Some(0) {
            return Err(invalid("queue_capacity must be at least 1"));
        }

        let mut topics = HashSet::new();
        for topic in &self.topology.topics {
            if topic.is_empty() {
                return Err(invalid("topic names must not be empty"));
            }
            if !topics.insert(topic.as_str()) {
                return Err(invalid(format!("topic '{topic}' declared twice")));
            }
        }

        let mut consumer_ids = HashSet::new();
        for consumer in &self.topology.consumers {
            if !consumer_ids.insert(consumer.id.as_str()) {
                return Err(invalid(format!("consumer '{}' declared twice", consumer.id)));
            }
            if consumer.topics.is_empty() {
                return Err(invalid(format!(
                    "consumer '{}' is not subscribed to any topic",
                    consumer.id
                )));
            }
            if let Some(topic) = consumer.topics.iter().find(|t| !topics.contains(t.as_str())) {
                return Err(BrokerError::UnknownTopic {
                    topic: topic.clone(),
                });
            }
        }

        for producer in &self.topology.producers {
            if !topics.contains(producer.topic.as_str()) {
                return Err(BrokerError::UnknownTopic {
                    topic: producer.topic.clone(),
                });
            }
            if producer.messages.iter().any(String::is_empty) {
                return Err(invalid(format!(
                    "producer '{}' has an empty message",
                    producer.id
                )));
            }
        }

        Ok(())
    }
}

fn invalid(reason: impl Into<String>) -> BrokerError {
    BrokerError::InvalidTopology {
        reason: reason.into(),
    }
}

/// Provides default values for `Settings`.
///
/// Unbounded topics and a small demo topology: two topics, five consumers
/// and two producers writing to both topics.
impl Default for Settings {
    fn default() -> Self {
        Self {
            broker: BrokerSettings::default(),
            topology: TopologySettings::demo(),
        }
    }
}

impl TopologySettings {
    pub fn demo() -> Self {
        let consumer = |id: &str, topics: &[&str]| ConsumerSettings {
            id: id.to_string(),
            topics: topics.iter().map(|t| t.to_string()).collect(),
        };
        let producer = |id: &str, topic: &str, messages: &[&str]| ProducerSettings {
            id: id.to_string(),
            topic: topic.to_string(),
            messages: messages.iter().map(|m| m.to_string()).collect(),
        };

        Self {
            topics: vec!["topic1".to_string(), "topic2".to_string()],
            consumers: vec![
                consumer("consumer1", &["topic1", "topic2"]),
                consumer("consumer2", &["topic1"]),
                consumer("consumer3", &["topic1", "topic2"]),
                consumer("consumer4", &["topic1", "topic2"]),
                consumer("consumer5", &["topic1"]),
            ],
            producers: vec![
                producer("producer1", "topic1", &["Message 1", "Message 2"]),
                producer("producer2", "topic1", &["Message 3"]),
                producer("producer1", "topic2", &["Message 4"]),
                producer("producer2", "topic2", &["Message 3", "Message 5"]),
            ],
        }
    }
}
