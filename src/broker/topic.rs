//! Topic management
//!
//! A `Topic` is a thread-safe mailbox for one named channel. It holds a FIFO
//! queue of pending messages and the set of subscriber IDs. Delivery follows
//! the competing-consumers model: every dequeue removes the head message, so
//! each message reaches exactly one of the workers pulling from the topic.
//!
//! Concurrency note: queue, subscribers, counters and close state all live
//! behind one mutex per topic. Workers waiting for messages park on the
//! `available` condvar, producers waiting for room on a bounded topic park on
//! `space`. No code path ever holds two topic locks at once.

use std::collections::{HashSet, VecDeque};

use parking_lot::{Condvar, Mutex};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::broker::message::{Message, MessageId};
use crate::broker::worker::StopToken;
use crate::utils::error::{BrokerError, BrokerResult};

pub type SubscriberId = String;

/// What a bounded topic does with a new message when it is already full.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverflowPolicy {
    /// Producer waits until a consumer makes room or the topic closes.
    #[default]
    Block,
    /// Evict the oldest pending message to make room.
    DropOldest,
    /// Fail the enqueue with `BrokerError::QueueFull`.
    Reject,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShutdownMode {
    /// Keep handing out queued messages, stop once the queue is empty.
    Drain,
    /// Stop waiters right away; pending messages stay queued.
    Immediate,
}

/// Outcome of a blocking dequeue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Delivery {
    Message(Message),
    Shutdown,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TopicStats {
    pub name: String,
    pub pending: usize,
    pub produced: u64,
    pub dequeued: u64,
    pub dropped: u64,
    pub subscribers: Vec<SubscriberId>,
}

#[derive(Debug, Default)]
struct TopicState {
    queue: VecDeque<Message>,
    subscribers: HashSet<SubscriberId>,
    closed: Option<ShutdownMode>,
    produced: u64,
    dequeued: u64,
    dropped: u64,
}

impl TopicState {
    fn pop(&mut self) -> Option<Message> {
        let msg = self.queue.pop_front()?;
        self.dequeued += 1;
        Some(msg)
    }
}

#[derive(Debug)]
pub struct Topic {
    name: String,
    capacity: Option<usize>,
    policy: OverflowPolicy,
    state: Mutex<TopicState>,
    available: Condvar,
    space: Condvar,
}

impl Topic {
    /// Create a new, unbounded topic with the given name.
    pub fn new(name: &str) -> Self {
        Self::with_capacity(name, None, OverflowPolicy::default())
    }

    /// Create a topic holding at most `capacity` pending messages. `None`
    /// means unbounded, in which case `policy` never applies. A capacity of
    /// zero is raised to one.
    pub fn with_capacity(name: &str, capacity: Option<usize>, policy: OverflowPolicy) -> Self {
        Self {
            name: name.to_string(),
            capacity: capacity.map(|c| c.max(1)),
            policy,
            state: Mutex::new(TopicState::default()),
            available: Condvar::new(),
            space: Condvar::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn capacity(&self) -> Option<usize> {
        self.capacity
    }

    pub fn overflow_policy(&self) -> OverflowPolicy {
        self.policy
    }

    /// Append a message to the tail of the queue and wake one waiting worker.
    pub fn add_message(&self, msg: Message) -> BrokerResult<MessageId> {
        let mut state = self.state.lock();

        if let Some(capacity) = self.capacity {
            while state.closed.is_none() && state.queue.len() >= capacity {
                match self.policy {
                    OverflowPolicy::Block => {
                        debug!(topic = %self.name, "queue full, producer waiting for space");
                        self.space.wait(&mut state);
                    }
                    OverflowPolicy::DropOldest => {
                        if let Some(evicted) = state.queue.pop_front() {
                            state.dropped += 1;
                            warn!(
                                topic = %self.name,
                                message_id = %evicted.id(),
                                "queue full, dropped oldest message"
                            );
                        }
                    }
                    OverflowPolicy::Reject => {
                        return Err(BrokerError::QueueFull {
                            topic: self.name.clone(),
                            capacity,
                        });
                    }
                }
            }
        }

        if state.closed.is_some() {
            return Err(BrokerError::TopicClosed {
                topic: self.name.clone(),
            });
        }

        let id = msg.id();
        state.queue.push_back(msg);
        state.produced += 1;
        debug!(topic = %self.name, message_id = %id, pending = state.queue.len(), "enqueued");
        self.available.notify_one();
        Ok(id)
    }

    /// Block until a message is available and take it from the head of the
    /// queue. Returns `Delivery::Shutdown` only once the topic is closed.
    pub fn next_message(&self) -> Delivery {
        self.wait_next(None, &mut || {})
    }

    /// Like [`Topic::next_message`], but also gives up when `stop` is cancelled.
    pub fn next_message_or_stop(&self, stop: &StopToken) -> Delivery {
        self.wait_next(Some(stop), &mut || {})
    }

    /// Like [`Topic::next_message_or_stop`]. `on_wait` runs under the queue
    /// lock each time the caller is about to park, and never when a message
    /// is handed out straight away.
    pub(crate) fn next_message_notify_wait(
        &self,
        stop: &StopToken,
        mut on_wait: impl FnMut(),
    ) -> Delivery {
        self.wait_next(Some(stop), &mut on_wait)
    }

    /// Take the head message if there is one, without blocking.
    pub fn try_next_message(&self) -> Option<Message> {
        let mut state = self.state.lock();
        if state.closed == Some(ShutdownMode::Immediate) {
            return None;
        }
        let msg = state.pop();
        if msg.is_some() {
            self.space.notify_one();
        }
        msg
    }

    fn wait_next(&self, stop: Option<&StopToken>, on_wait: &mut dyn FnMut()) -> Delivery {
        let mut state = self.state.lock();
        loop {
            if state.closed == Some(ShutdownMode::Immediate)
                || stop.is_some_and(StopToken::is_cancelled)
            {
                return Delivery::Shutdown;
            }
            if let Some(msg) = state.pop() {
                self.space.notify_one();
                return Delivery::Message(msg);
            }
            if state.closed == Some(ShutdownMode::Drain) {
                return Delivery::Shutdown;
            }
            on_wait();
            // re-checked on every wakeup, spurious or not
            self.available.wait(&mut state);
        }
    }

    /// Close the topic. Enqueues fail from now on and waiters are released
    /// according to `mode`. An immediate close is never downgraded to drain.
    pub fn close(&self, mode: ShutdownMode) {
        let mut state = self.state.lock();
        let mode = state.closed.map_or(mode, |current| current.max(mode));
        if state.closed != Some(mode) {
            info!(topic = %self.name, ?mode, pending = state.queue.len(), "closing topic");
        }
        state.closed = Some(mode);
        self.available.notify_all();
        self.space.notify_all();
    }

    pub fn is_closed(&self) -> bool {
        self.state.lock().closed.is_some()
    }

    /// Wake every waiter so it can re-check its stop token.
    pub fn wake_all(&self) {
        let _state = self.state.lock();
        self.available.notify_all();
        self.space.notify_all();
    }

    /// Add a subscriber to the topic. Duplicate adds are ignored.
    /// Returns `true` if the subscriber was not present yet.
    pub fn subscribe(&self, id: SubscriberId) -> bool {
        self.state.lock().subscribers.insert(id)
    }

    /// Remove a subscriber from the topic.
    pub fn unsubscribe(&self, id: &SubscriberId) -> bool {
        self.state.lock().subscribers.remove(id)
    }

    pub fn is_subscribed(&self, id: &SubscriberId) -> bool {
        self.state.lock().subscribers.contains(id)
    }

    pub fn subscribers(&self) -> HashSet<SubscriberId> {
        self.state.lock().subscribers.clone()
    }

    pub fn len(&self) -> usize {
        self.state.lock().queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.lock().queue.is_empty()
    }

    pub fn stats(&self) -> TopicStats {
        let state = self.state.lock();
        let mut subscribers: Vec<_> = state.subscribers.iter().cloned().collect();
        subscribers.sort();
        TopicStats {
            name: self.name.clone(),
            pending: state.queue.len(),
            produced: state.produced,
            dequeued: state.dequeued,
            dropped: state.dropped,
            subscribers,
        }
    }
}
