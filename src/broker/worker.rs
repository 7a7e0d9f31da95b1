//! Worker threads
//!
//! Every (producer, topic) and (consumer, topic) pairing runs on its own OS
//! thread. Consumer workers loop on the topic's blocking dequeue and hand each
//! message to their consumer; producer workers drain a fixed list of payloads.
//!
//! Lifecycle of a consumer worker:
//! `Running` -> `Blocked` (parked inside the topic, set under the queue lock)
//! -> `Running` (processing) ... until its `StopToken` is cancelled or the
//! topic closes, at which point it reaches `Stopped`. A worker that finds a
//! message already queued stays `Running`.

use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::thread::{self, JoinHandle};

use serde::Serialize;
use tracing::{debug, error, info, warn};

use crate::broker::topic::{Delivery, Topic};
use crate::client::{Consumer, Producer};
use crate::utils::error::BrokerResult;

/// Cooperative cancellation flag shared between the broker and one worker.
#[derive(Debug, Clone, Default)]
pub struct StopToken(Arc<AtomicBool>);

impl StopToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkerState {
    Running,
    Blocked,
    Stopped,
}

impl WorkerState {
    fn from_u8(raw: u8) -> Self {
        match raw {
            0 => WorkerState::Running,
            1 => WorkerState::Blocked,
            _ => WorkerState::Stopped,
        }
    }
}

#[derive(Debug, Clone, Default)]
struct SharedState(Arc<AtomicU8>);

impl SharedState {
    fn set(&self, state: WorkerState) {
        self.0.store(state as u8, Ordering::SeqCst);
    }

    fn get(&self) -> WorkerState {
        WorkerState::from_u8(self.0.load(Ordering::SeqCst))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkerKind {
    Producer,
    Consumer,
}

#[derive(Debug)]
pub struct WorkerHandle {
    name: String,
    kind: WorkerKind,
    topic: Arc<Topic>,
    state: SharedState,
    stop: StopToken,
    thread: Option<JoinHandle<()>>,
}

impl WorkerHandle {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> WorkerKind {
        self.kind
    }

    pub fn state(&self) -> WorkerState {
        self.state.get()
    }

    /// Ask the worker to stop. A consumer parked inside the topic is woken.
    pub fn stop(&self) {
        self.stop.cancel();
        self.topic.wake_all();
    }

    /// Wait for the worker thread to exit.
    pub fn join(&mut self) {
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                error!(worker = %self.name, "worker thread panicked");
            }
            self.state.set(WorkerState::Stopped);
        }
    }
}

/// Start the worker that feeds `topic` messages to `consumer`.
pub fn spawn_consumer(consumer: Arc<Consumer>, topic: Arc<Topic>) -> BrokerResult<WorkerHandle> {
    let name = format!("{}@{}", consumer.id(), topic.name());
    let state = SharedState::default();
    let stop = StopToken::new();

    let thread = {
        let name = name.clone();
        let topic = topic.clone();
        let state = state.clone();
        let stop = stop.clone();
        thread::Builder::new()
            .name(name.clone())
            .spawn(move || consume_loop(&name, &consumer, &topic, &state, &stop))?
    };

    Ok(WorkerHandle {
        name,
        kind: WorkerKind::Consumer,
        topic,
        state,
        stop,
        thread: Some(thread),
    })
}

fn consume_loop(
    name: &str,
    consumer: &Consumer,
    topic: &Topic,
    state: &SharedState,
    stop: &StopToken,
) {
    info!(worker = %name, "consumer worker started");
    loop {
        let next = topic.next_message_notify_wait(stop, || state.set(WorkerState::Blocked));
        let msg = match next {
            Delivery::Message(msg) => msg,
            Delivery::Shutdown => break,
        };
        state.set(WorkerState::Running);

        // a failing consumer must not take the worker down with it
        match panic::catch_unwind(AssertUnwindSafe(|| consumer.receive_message(&msg))) {
            Ok(Ok(())) => debug!(worker = %name, message_id = %msg.id(), "delivered"),
            Ok(Err(e)) => warn!(worker = %name, message_id = %msg.id(), "consumer failed: {e}"),
            Err(_) => warn!(worker = %name, message_id = %msg.id(), "consumer panicked"),
        }
    }
    state.set(WorkerState::Stopped);
    info!(worker = %name, "consumer worker stopped");
}

/// Start the worker that publishes `messages` to `topic`, in order.
pub fn spawn_producer(
    producer: Producer,
    topic: Arc<Topic>,
    messages: Vec<String>,
) -> BrokerResult<WorkerHandle> {
    let name = format!("{}@{}", producer.id(), topic.name());
    let state = SharedState::default();
    let stop = StopToken::new();

    let thread = {
        let name = name.clone();
        let topic = topic.clone();
        let state = state.clone();
        let stop = stop.clone();
        thread::Builder::new().name(name.clone()).spawn(move || {
            for content in messages {
                if stop.is_cancelled() {
                    break;
                }
                // no retries: a failed enqueue ends this producer
                if let Err(e) = producer.produce(&topic, content) {
                    error!(worker = %name, "producer stopped: {e}");
                    break;
                }
            }
            state.set(WorkerState::Stopped);
            debug!(worker = %name, "producer worker finished");
        })?
    };

    Ok(WorkerHandle {
        name,
        kind: WorkerKind::Producer,
        topic,
        state,
        stop,
        thread: Some(thread),
    })
}
