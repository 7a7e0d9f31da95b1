//! The `client` module defines the roles that talk to topics.
//!
//! - `Producer` wraps payloads into messages and enqueues them.
//! - `Consumer` receives messages and writes one record per message to its
//!   `DeliverySink`.

pub mod consumer;
pub mod producer;
pub mod sink;

pub use consumer::Consumer;
pub use producer::Producer;
pub use sink::{DeliverySink, MemorySink, StdoutSink};
