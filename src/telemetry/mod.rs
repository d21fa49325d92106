//! # Telemetry Module
//!
//! Numeric key/value diagnostics for operators.
//!
//! This module handles:
//! - The [`TelemetrySink`] capability injected into the pipeline
//! - In-memory and no-op sinks for tests and headless runs
//! - Writing per-cycle records to rotating JSONL files off the control thread
//!
//! Publishing failures never affect control output: the pipeline swallows
//! any error a sink returns. Keys are static so a sink can buffer a cycle
//! without allocating.

pub mod jsonl;

use std::collections::BTreeMap;

use crate::error::Result;

pub use jsonl::{telemetry_files, JsonlSink};

/// Destination for numeric diagnostics.
pub trait TelemetrySink: Send {
    /// Publishes one named value for the current cycle.
    fn put_number(&mut self, key: &'static str, value: f64) -> Result<()>;

    /// Marks the end of a control cycle.
    fn end_cycle(&mut self) -> Result<()> {
        Ok(())
    }
}

/// Sink that discards everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl TelemetrySink for NullSink {
    fn put_number(&mut self, _key: &'static str, _value: f64) -> Result<()> {
        Ok(())
    }
}

/// Sink that keeps the latest value per key.
///
/// # Examples
///
/// ```
/// use drive_shaper::telemetry::{MemorySink, TelemetrySink};
///
/// let mut sink = MemorySink::new();
/// sink.put_number("throttle_slewed", -0.12).unwrap();
/// assert_eq!(sink.get("throttle_slewed"), Some(-0.12));
/// ```
#[derive(Debug, Default, Clone)]
pub struct MemorySink {
    values: BTreeMap<&'static str, f64>,
    cycles: u64,
}

impl MemorySink {
    /// Creates an empty sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Latest value published under `key`.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<f64> {
        self.values.get(key).copied()
    }

    /// Number of completed cycles.
    #[must_use]
    pub fn cycles(&self) -> u64 {
        self.cycles
    }
}

impl TelemetrySink for MemorySink {
    fn put_number(&mut self, key: &'static str, value: f64) -> Result<()> {
        self.values.insert(key, value);
        Ok(())
    }

    fn end_cycle(&mut self) -> Result<()> {
        self.cycles += 1;
        Ok(())
    }
}
