//! # memqueue
//!
//! `memqueue` is an in-memory, multi-topic publish/subscribe queue. Producers
//! append messages to named topics; consumer workers block on each topic and
//! hand every message to exactly one subscribed consumer (competing consumers).
//!
//! ## Core Modules
//!
//! - `broker`: topics, the broker that wires them up, and the worker threads.
//! - `client`: the producer and consumer roles plus the sinks consumers write to.
//! - `config`: loading the broker settings and the static topology.
//! - `utils`: the shared error type and logging setup.
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use memqueue::broker::{Broker, ShutdownMode};
//! use memqueue::client::{Consumer, MemorySink, Producer};
//!
//! # fn main() -> Result<(), memqueue::utils::BrokerError> {
//! let sink = Arc::new(MemorySink::new());
//! let mut broker = Broker::default();
//! broker.create_topic("orders");
//! broker.register_consumer(Consumer::new("C1", sink.clone()))?;
//! broker.subscribe("orders", "C1")?;
//! broker.produce("orders", &Producer::new("P"), "order-1")?;
//! broker.shutdown(ShutdownMode::Drain);
//! assert_eq!(sink.records(), vec!["C1 received order-1"]);
//! # Ok(())
//! # }
//! ```

pub mod broker;
pub mod client;
pub mod config;
pub mod utils;
