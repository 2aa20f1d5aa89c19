//! Error types for the scheduling engine.
//!
//! Data problems never panic. Order-level and operation-level failures are
//! returned as [`ScheduleError`] and turned into alerts by the runner; a
//! failed order or operation never aborts the rest of the run.

use chrono::NaiveDateTime;
use thiserror::Error;

use crate::ledger::ResourceKind;

/// Errors raised while scheduling orders.
#[derive(Debug, Error)]
pub enum ScheduleError {
    /// Order failed validation (empty part number, zero quantity, ...).
    #[error("invalid order {part_number}: {reason}")]
    InvalidOrder { part_number: String, reason: String },

    /// The catalog returned no operations for the part.
    #[error("no operations found for part {part_number}")]
    NoOperations { part_number: String },

    /// Batch splitting produced batches that do not cover the order.
    #[error("invalid batch split for {part_number}: {reason}")]
    InvalidBatches { part_number: String, reason: String },

    /// A single operation could not be scheduled.
    #[error("operation {seq} failed: {reason}")]
    OperationFailed { seq: u32, reason: String },

    /// Timing calculation produced an inconsistent result.
    #[error("invalid timing: {0}")]
    InvalidTiming(String),

    /// A reservation would overlap an already committed one.
    #[error("{kind} {resource} is already reserved within {start} - {end}")]
    ReservationConflict {
        kind: ResourceKind,
        resource: String,
        start: NaiveDateTime,
        end: NaiveDateTime,
    },

    /// Configuration values are out of range.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Configuration or catalog JSON could not be parsed.
    #[error("failed to parse JSON: {0}")]
    Config(#[from] serde_json::Error),
}

/// Result type for scheduling operations.
pub type Result<T> = std::result::Result<T, ScheduleError>;

impl ScheduleError {
    /// Wraps any error as a failure of operation `seq`.
    pub fn operation(seq: u32, reason: impl std::fmt::Display) -> Self {
        Self::OperationFailed {
            seq,
            reason: reason.to_string(),
        }
    }
}
