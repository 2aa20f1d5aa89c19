//! Schedule output model.
//!
//! A run produces one [`OperationAssignment`] row per scheduled operation of
//! every batch, plus human-readable alerts for what could not be scheduled.
//!
//! # Reference
//! Pinedo (2016), "Scheduling: Theory, Algorithms, and Systems", Ch. 3

use std::collections::BTreeMap;

use chrono::{Duration, NaiveDateTime};
use serde::{Deserialize, Serialize};

use super::{Priority, TimeWindow};

/// Row status. Lateness is derived by comparing `run_end` with `due_date`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum AssignmentStatus {
    #[default]
    Scheduled,
}

/// One scheduled operation of one batch.
///
/// Invariants: `setup_start <= setup_end <= run_start <= run_end`; the
/// machine is held for `[setup_start, run_end)` and the operator for
/// `[setup_start, setup_end)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OperationAssignment {
    pub part_number: String,
    pub order_quantity: u32,
    pub priority: Priority,
    pub batch_id: String,
    pub batch_qty: u32,
    pub operation_seq: u32,
    pub operation_name: String,
    pub machine: String,
    pub operator: String,
    pub setup_start: NaiveDateTime,
    pub setup_end: NaiveDateTime,
    pub run_start: NaiveDateTime,
    pub run_end: NaiveDateTime,
    /// Total span label, see [`format_duration`].
    pub timing: String,
    pub due_date: NaiveDateTime,
    pub status: AssignmentStatus,
    /// Per-piece completion instants; element 0 triggers the next operation.
    #[serde(skip)]
    pub piece_completion_times: Vec<NaiveDateTime>,
}

impl OperationAssignment {
    /// Machine occupation `[setup_start, run_end)`.
    pub fn machine_window(&self) -> TimeWindow {
        TimeWindow::new(self.setup_start, self.run_end)
    }

    /// Operator occupation `[setup_start, setup_end)`.
    pub fn operator_window(&self) -> TimeWindow {
        TimeWindow::new(self.setup_start, self.setup_end)
    }

    /// Total span from setup start to last piece.
    #[inline]
    pub fn duration(&self) -> Duration {
        self.run_end - self.setup_start
    }

    /// Whether the last piece finishes after the due date.
    pub fn is_late(&self) -> bool {
        self.run_end > self.due_date
    }

    /// Ready time of the first piece, if piece data is available.
    pub fn first_piece_ready(&self) -> Option<NaiveDateTime> {
        self.piece_completion_times.first().copied()
    }
}

/// Formats a span as `1D3H`, `4H20M` or `45M`.
///
/// ```
/// use chrono::Duration;
/// use shop_schedule::models::format_duration;
///
/// assert_eq!(format_duration(Duration::minutes(45)), "45M");
/// assert_eq!(format_duration(Duration::minutes(260)), "4H20M");
/// assert_eq!(format_duration(Duration::minutes(27 * 60 + 10)), "1D3H");
/// ```
pub fn format_duration(span: Duration) -> String {
    let total_minutes = span.num_minutes().max(0);
    let hours = total_minutes / 60;
    let mins = total_minutes % 60;
    if hours >= 24 {
        format!("{}D{}H", hours / 24, hours % 24)
    } else if hours > 0 {
        format!("{hours}H{mins}M")
    } else {
        format!("{mins}M")
    }
}

/// Aggregate counts of a run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    pub total_orders: usize,
    pub total_operations: usize,
    /// `operations / orders × 100`; 0 when there are no orders.
    pub success_rate: f64,
}

impl RunSummary {
    pub fn new(total_orders: usize, total_operations: usize) -> Self {
        let success_rate = if total_orders == 0 {
            0.0
        } else {
            total_operations as f64 / total_orders as f64 * 100.0
        };
        Self {
            total_orders,
            total_operations,
            success_rate,
        }
    }
}

/// Result of a scheduling run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScheduleRun {
    /// Emitted rows in scheduling order.
    pub rows: Vec<OperationAssignment>,
    /// Non-fatal problems, in the order they happened.
    pub alerts: Vec<String>,
    pub summary: RunSummary,
    /// Set only when the run as a whole failed.
    pub error: Option<String>,
}

impl ScheduleRun {
    /// A run that failed before any order was scheduled.
    pub fn failed(message: impl Into<String>) -> Self {
        let message = message.into();
        Self {
            rows: Vec::new(),
            alerts: vec![format!("Critical scheduling error: {message}")],
            summary: RunSummary::default(),
            error: Some(message),
        }
    }

    /// Whether the run completed (possibly with alerts).
    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }

    /// Latest `run_end` across all rows.
    pub fn makespan_end(&self) -> Option<NaiveDateTime> {
        self.rows.iter().map(|r| r.run_end).max()
    }

    /// Rows of one part.
    pub fn rows_for_part(&self, part_number: &str) -> Vec<&OperationAssignment> {
        self.rows
            .iter()
            .filter(|r| r.part_number == part_number)
            .collect()
    }

    /// Rows held on one machine.
    pub fn rows_for_machine(&self, machine: &str) -> Vec<&OperationAssignment> {
        self.rows.iter().filter(|r| r.machine == machine).collect()
    }

    /// Rows of one batch of a part, in operation order.
    pub fn rows_for_batch(&self, part_number: &str, batch_id: &str) -> Vec<&OperationAssignment> {
        let mut rows: Vec<&OperationAssignment> = self
            .rows
            .iter()
            .filter(|r| r.part_number == part_number && r.batch_id == batch_id)
            .collect();
        rows.sort_by_key(|r| r.operation_seq);
        rows
    }

    /// Completion (latest `run_end`) of a part's rows.
    pub fn part_completion_time(&self, part_number: &str) -> Option<NaiveDateTime> {
        self.rows_for_part(part_number)
            .iter()
            .map(|r| r.run_end)
            .max()
    }

    /// Booked machine minutes per machine.
    pub fn machine_busy_minutes(&self) -> BTreeMap<String, i64> {
        let mut busy = BTreeMap::new();
        for row in &self.rows {
            *busy.entry(row.machine.clone()).or_insert(0) += row.duration().num_minutes();
        }
        busy
    }
}
