//! The `utils` module provides the pieces shared across the `memqueue` crate:
//! the crate-wide error type and logging setup.

pub mod error;
pub mod logging;

pub use error::{BrokerError, BrokerResult};
