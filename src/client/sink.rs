//! Delivery sinks
//!
//! A sink is where a consumer writes its `"<consumer_id> received <content>"`
//! records. Sinks are shared between worker threads, so they must be
//! `Send + Sync` and synchronize internally.

use std::fmt;
use std::io::Write;

use parking_lot::Mutex;

use crate::utils::error::BrokerResult;

pub trait DeliverySink: Send + Sync + fmt::Debug {
    /// Write one record. Each call is one line of output.
    fn write_record(&self, record: &str) -> BrokerResult<()>;
}

/// Writes records to stdout, one per line.
#[derive(Debug, Default, Clone, Copy)]
pub struct StdoutSink;

impl DeliverySink for StdoutSink {
    fn write_record(&self, record: &str) -> BrokerResult<()> {
        // the stdout lock keeps concurrent records from interleaving
        let mut out = std::io::stdout().lock();
        writeln!(out, "{record}")?;
        out.flush()?;
        Ok(())
    }
}

/// Keeps records in memory in the order they were written.
#[derive(Debug, Default)]
pub struct MemorySink {
    records: Mutex<Vec<String>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> Vec<String> {
        self.records.lock().clone()
    }

    /// Records written by one consumer, in order.
    pub fn records_for(&self, consumer_id: &str) -> Vec<String> {
        let prefix = format!("{consumer_id} received ");
        self.records
            .lock()
            .iter()
            .filter(|r| r.starts_with(&prefix))
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.records.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.lock().is_empty()
    }
}

impl DeliverySink for MemorySink {
    fn write_record(&self, record: &str) -> BrokerResult<()> {
        self.records.lock().push(record.to_string());
        Ok(())
    }
}
