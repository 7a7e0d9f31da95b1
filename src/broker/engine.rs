//! Broker engine
//!
//! This module contains the broker that owns every topic, consumer and worker
//! thread. Responsibilities:
//! - creating topics and registering consumers
//! - wiring subscriptions and starting one consumer worker per (consumer, topic)
//! - starting producer workers that drain a fixed list of payloads
//! - stopping workers, either one subscription at a time or all at shutdown
//!
//! Delivery follows the competing-consumers model: each topic has a single
//! shared queue and every message goes to exactly one of its consumer workers.
//!
//! The broker is an ordinary value owned by the caller. Mutating calls take
//! `&mut self`; topics and consumers are shared with workers through `Arc`.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info};

use crate::broker::message::MessageId;
use crate::broker::topic::{OverflowPolicy, ShutdownMode, SubscriberId, Topic, TopicStats};
use crate::broker::worker::{self, WorkerHandle, WorkerKind, WorkerState};
use crate::client::{Consumer, DeliverySink, Producer};
use crate::config::{BrokerSettings, Settings};
use crate::utils::error::{BrokerError, BrokerResult};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BrokerStats {
    pub topics: Vec<TopicStats>,
    pub consumers: BTreeMap<SubscriberId, u64>,
}

/// What was left behind when the broker shut down.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ShutdownReport {
    pub undelivered: BTreeMap<String, usize>,
}

impl ShutdownReport {
    pub fn total_undelivered(&self) -> usize {
        self.undelivered.values().sum()
    }
}

/// Closes every topic of a broker from another thread or task.
#[derive(Debug, Clone)]
pub struct ShutdownHandle {
    topics: Vec<Arc<Topic>>,
}

impl ShutdownHandle {
    pub fn trigger(&self, mode: ShutdownMode) {
        for topic in &self.topics {
            topic.close(mode);
        }
    }
}

#[derive(Debug, Default)]
pub struct Broker {
    settings: BrokerSettings,
    topics: HashMap<String, Arc<Topic>>,
    consumers: HashMap<SubscriberId, Arc<Consumer>>,
    consumer_workers: HashMap<(SubscriberId, String), WorkerHandle>,
    producer_workers: Vec<WorkerHandle>,
    shut_down: bool,
}

impl Broker {
    pub fn new(settings: BrokerSettings) -> Self {
        Self {
            settings,
            topics: HashMap::new(),
            consumers: HashMap::new(),
            consumer_workers: HashMap::new(),
            producer_workers: Vec::new(),
            shut_down: false,
        }
    }

    /// Build a broker from a validated topology: topics first, then consumers
    /// and their workers, then producers. Every consumer writes to `sink`.
    pub fn from_settings(settings: &Settings, sink: Arc<dyn DeliverySink>) -> BrokerResult<Self> {
        settings.validate()?;

        let mut broker = Self::new(settings.broker.clone());
        for name in &settings.topology.topics {
            broker.create_topic(name);
        }
        for cfg in &settings.topology.consumers {
            broker.register_consumer(Consumer::new(cfg.id.clone(), sink.clone()))?;
            for topic in &cfg.topics {
                broker.subscribe(topic, &cfg.id)?;
            }
        }
        for cfg in &settings.topology.producers {
            broker.spawn_producer(Producer::new(cfg.id.clone()), &cfg.topic, cfg.messages.clone())?;
        }

        info!(
            topics = broker.topics.len(),
            consumers = broker.consumers.len(),
            producers = broker.producer_workers.len(),
            "broker wired"
        );
        Ok(broker)
    }

    /// Create a topic using the broker's capacity settings. Creating an
    /// existing topic returns the existing one.
    pub fn create_topic(&mut self, name: &str) -> Arc<Topic> {
        let settings = &self.settings;
        self.topics
            .entry(name.to_string())
            .or_insert_with(|| {
                info!(topic = name, capacity = ?settings.queue_capacity, "topic created");
                Arc::new(Topic::with_capacity(
                    name,
                    settings.queue_capacity,
                    settings.overflow_policy,
                ))
            })
            .clone()
    }

    pub fn topic(&self, name: &str) -> BrokerResult<Arc<Topic>> {
        self.topics
            .get(name)
            .cloned()
            .ok_or_else(|| BrokerError::UnknownTopic {
                topic: name.to_string(),
            })
    }

    pub fn topic_names(&self) -> Vec<String> {
        let mut names: Vec<_> = self.topics.keys().cloned().collect();
        names.sort();
        names
    }

    pub fn register_consumer(&mut self, consumer: Consumer) -> BrokerResult<Arc<Consumer>> {
        if self.consumers.contains_key(consumer.id()) {
            return Err(BrokerError::DuplicateConsumer {
                consumer_id: consumer.id().clone(),
            });
        }
        let consumer = Arc::new(consumer);
        self.consumers
            .insert(consumer.id().clone(), consumer.clone());
        debug!(consumer = %consumer.id(), "consumer registered");
        Ok(consumer)
    }

    pub fn consumer(&self, id: &str) -> BrokerResult<Arc<Consumer>> {
        self.consumers
            .get(id)
            .cloned()
            .ok_or_else(|| BrokerError::UnknownConsumer {
                consumer_id: id.to_string(),
            })
    }

    /// Subscribe a consumer to a topic and start the worker that delivers
    /// the topic's messages to it. Subscribing twice is a no-op.
    pub fn subscribe(&mut self, topic_name: &str, consumer_id: &str) -> BrokerResult<()> {
        let topic = self.topic(topic_name)?;
        let consumer = self.consumer(consumer_id)?;
        let key = (consumer_id.to_string(), topic_name.to_string());
        if self.consumer_workers.contains_key(&key) {
            return Ok(());
        }
        if topic.is_closed() {
            return Err(BrokerError::TopicClosed {
                topic: topic_name.to_string(),
            });
        }

        // record the subscription only once a worker is actually draining it
        let handle = worker::spawn_consumer(consumer.clone(), topic.clone())?;
        topic.subscribe(consumer.id().clone());
        consumer.add_subscribed_topic(topic_name);
        self.consumer_workers.insert(key, handle);
        info!(consumer = consumer_id, topic = topic_name, "subscribed");
        Ok(())
    }

    /// Remove a subscription and stop its worker. A message the worker is
    /// processing at that moment is finished first.
    pub fn unsubscribe(&mut self, topic_name: &str, consumer_id: &str) -> BrokerResult<()> {
        let topic = self.topic(topic_name)?;
        let consumer = self.consumer(consumer_id)?;

        topic.unsubscribe(consumer.id());
        consumer.remove_subscribed_topic(topic_name);
        if let Some(mut handle) = self
            .consumer_workers
            .remove(&(consumer_id.to_string(), topic_name.to_string()))
        {
            handle.stop();
            handle.join();
        }
        info!(consumer = consumer_id, topic = topic_name, "unsubscribed");
        Ok(())
    }

    /// Publish one message synchronously.
    pub fn produce(
        &self,
        topic_name: &str,
        producer: &Producer,
        content: impl Into<String>,
    ) -> BrokerResult<MessageId> {
        let topic = self.topic(topic_name)?;
        producer.produce(&topic, content)
    }

    /// Start a worker that publishes `messages` to `topic_name`, in order.
    pub fn spawn_producer(
        &mut self,
        producer: Producer,
        topic_name: &str,
        messages: Vec<String>,
    ) -> BrokerResult<()> {
        let topic = self.topic(topic_name)?;
        let handle = worker::spawn_producer(producer, topic, messages)?;
        self.producer_workers.push(handle);
        Ok(())
    }

    /// Block until every producer worker started so far has finished.
    pub fn wait_for_producers(&mut self) {
        for handle in &mut self.producer_workers {
            handle.join();
        }
        self.producer_workers.clear();
    }

    /// Snapshot of every live worker's state, sorted by worker name.
    pub fn worker_states(&self) -> Vec<(String, WorkerKind, WorkerState)> {
        let mut states: Vec<_> = self
            .consumer_workers
            .values()
            .chain(self.producer_workers.iter())
            .map(|h| (h.name().to_string(), h.kind(), h.state()))
            .collect();
        states.sort_by(|a, b| a.0.cmp(&b.0));
        states
    }

    pub fn shutdown_handle(&self) -> ShutdownHandle {
        ShutdownHandle {
            topics: self.topics.values().cloned().collect(),
        }
    }

    /// Close every topic and join every worker.
    ///
    /// With `ShutdownMode::Drain`, producers already running finish first and
    /// consumer workers empty their queues before stopping; topics without
    /// a consumer worker keep their messages. `Immediate` stops everything as soon
    /// as in-flight messages are processed.
    pub fn shutdown(&mut self, mode: ShutdownMode) -> ShutdownReport {
        if !self.shut_down {
            info!(?mode, "broker shutting down");
        }
        self.shut_down = true;

        if mode == ShutdownMode::Drain {
            // no worker will ever make room on these, so their producers could wait forever
            for topic in self.topics.values().filter(|t| {
                t.capacity().is_some()
                    && t.overflow_policy() == OverflowPolicy::Block
                    && !self.consumer_workers.keys().any(|(_, name)| name == t.name())
            }) {
                topic.close(ShutdownMode::Drain);
            }
            self.wait_for_producers();
        }
        for topic in self.topics.values() {
            topic.close(mode);
        }
        if mode == ShutdownMode::Immediate {
            for handle in self.producer_workers.iter().chain(self.consumer_workers.values()) {
                handle.stop();
            }
        }
        self.wait_for_producers();
        for (_, mut handle) in self.consumer_workers.drain() {
            handle.join();
        }

        ShutdownReport {
            undelivered: self
                .topics
                .values()
                .map(|t| (t.name().to_string(), t.len()))
                .collect(),
        }
    }

    pub fn stats(&self) -> BrokerStats {
        let mut topics: Vec<_> = self.topics.values().map(|t| t.stats()).collect();
        topics.sort_by(|a, b| a.name.cmp(&b.name));
        BrokerStats {
            topics,
            consumers: self
                .consumers
                .values()
                .map(|c| (c.id().clone(), c.received_count()))
                .collect(),
        }
    }
}

impl Drop for Broker {
    fn drop(&mut self) {
        if !self.producer_workers.is_empty() || !self.consumer_workers.is_empty() {
            self.shutdown(ShutdownMode::Immediate);
        }
    }
}
