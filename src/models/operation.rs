//! Operation (routing step) model.
//!
//! An operation definition is one step of a part's routing: it has a setup
//! that occupies both machine and operator, followed by a per-piece cycle
//! that occupies only the machine.
//!
//! # Duration Model
//!
//! - **Setup**: `setup_time_min`, operator and machine.
//! - **Run**: `cycle_time_min × quantity`, machine only, produced piece by piece.
//!
//! Definitions reaching the engine are already normalised by the catalog:
//! both durations are positive and machine lists are trimmed.

use chrono::{Duration, NaiveDateTime};
use serde::{Deserialize, Serialize};

use super::TimeWindow;

/// Converts fractional minutes to a millisecond-precision duration.
pub fn minutes(value: f64) -> Duration {
    Duration::milliseconds((value * 60_000.0).round() as i64)
}

/// One step of a part's routing.
///
/// # Example
/// ```
/// use shop_schedule::models::OperationDefinition;
///
/// let op = OperationDefinition::new("P1", 10, "Turning")
///     .with_setup_time(60.0)
///     .with_cycle_time(2.0)
///     .with_eligible_machines(["M1", "M2"]);
///
/// assert_eq!(op.setup_duration().num_minutes(), 60);
/// assert_eq!(op.run_duration(100).num_minutes(), 200);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OperationDefinition {
    /// Part this step belongs to.
    pub part_number: String,
    /// Position in the routing (1-based, ascending).
    pub operation_seq: u32,
    /// Display name.
    pub operation_name: String,
    /// Setup time in minutes.
    pub setup_time_min: f64,
    /// Cycle time per piece in minutes.
    pub cycle_time_min: f64,
    /// Smallest batch the step should run.
    pub minimum_batch_size: u32,
    /// Machines that can run the step, in preference order.
    pub eligible_machines: Vec<String>,
    /// Operator hint from the routing sheet.
    pub operator: Option<String>,
}

impl OperationDefinition {
    /// Creates a definition with 60 min setup, 10 min cycle and no machines.
    pub fn new(
        part_number: impl Into<String>,
        operation_seq: u32,
        operation_name: impl Into<String>,
    ) -> Self {
        Self {
            part_number: part_number.into(),
            operation_seq,
            operation_name: operation_name.into(),
            setup_time_min: 60.0,
            cycle_time_min: 10.0,
            minimum_batch_size: 1,
            eligible_machines: Vec::new(),
            operator: None,
        }
    }

    /// Sets the setup time (minutes).
    pub fn with_setup_time(mut self, minutes: f64) -> Self {
        self.setup_time_min = minutes;
        self
    }

    /// Sets the per-piece cycle time (minutes).
    pub fn with_cycle_time(mut self, minutes: f64) -> Self {
        self.cycle_time_min = minutes;
        self
    }

    /// Sets the minimum batch size.
    pub fn with_minimum_batch_size(mut self, size: u32) -> Self {
        self.minimum_batch_size = size;
        self
    }

    /// Sets the eligible machines, keeping their order.
    pub fn with_eligible_machines<I, S>(mut self, machines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.eligible_machines = machines.into_iter().map(Into::into).collect();
        self
    }

    /// Sets the operator hint.
    pub fn with_operator(mut self, operator: impl Into<String>) -> Self {
        self.operator = Some(operator.into());
        self
    }

    #[inline]
    pub fn setup_duration(&self) -> Duration {
        minutes(self.setup_time_min)
    }

    #[inline]
    pub fn cycle_duration(&self) -> Duration {
        minutes(self.cycle_time_min)
    }

    /// Run time for `quantity` pieces.
    pub fn run_duration(&self, quantity: u32) -> Duration {
        self.cycle_duration() * quantity as i32
    }

    /// Machine occupation estimate `[start, start + setup + quantity × cycle)`.
    ///
    /// Used for conflict checks before the exact piece-level timing is known.
    pub fn estimated_window(&self, start: NaiveDateTime, quantity: u32) -> TimeWindow {
        TimeWindow::starting_at(start, self.setup_duration() + self.run_duration(quantity))
    }

    /// Whether both durations are usable.
    pub fn has_valid_times(&self) -> bool {
        self.setup_time_min.is_finite()
            && self.cycle_time_min.is_finite()
            && self.setup_time_min > 0.0
            && self.cycle_time_min > 0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn test_minutes_conversion() {
        assert_eq!(minutes(1.5), Duration::seconds(90));
        assert_eq!(minutes(0.0), Duration::zero());
    }

    #[test]
    fn test_estimated_window() {
        let start = NaiveDate::from_ymd_opt(2025, 1, 6)
            .unwrap()
            .and_hms_opt(8, 0, 0)
            .unwrap();
        let op = OperationDefinition::new("P1", 1, "Mill")
            .with_setup_time(30.0)
            .with_cycle_time(0.5);
        let window = op.estimated_window(start, 120);
        assert_eq!(window.duration(), Duration::minutes(90));
    }

    #[test]
    fn test_valid_times() {
        let op = OperationDefinition::new("P1", 1, "Mill");
        assert!(op.has_valid_times());
        assert!(!op.clone().with_cycle_time(0.0).has_valid_times());
        assert!(!op.with_setup_time(f64::NAN).has_valid_times());
    }
}
