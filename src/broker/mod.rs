pub mod engine;
pub mod message;
pub mod topic;
pub mod worker;

pub use engine::{Broker, BrokerStats, ShutdownHandle, ShutdownReport};
pub use message::{Message, MessageId};
pub use topic::{Delivery, OverflowPolicy, ShutdownMode, SubscriberId, Topic, TopicStats};
pub use worker::{StopToken, WorkerKind, WorkerState};
