//! Operator availability and reservation.
//!
//! Operators are only needed during setup. An operator is available for a
//! setup window when they have no overlapping setup in the ledger and, if a
//! shift is configured for them, the window lies inside that shift.

use std::collections::BTreeMap;

use crate::config::SchedulerConfig;
use crate::ledger::ResourceLedger;
use crate::models::{ShiftWindow, TimeWindow};

/// Availability checks and reservations for operators.
pub trait OperatorManager {
    /// No conflicting setup and on shift.
    fn is_operator_available(
        &self,
        ledger: &ResourceLedger,
        operator: &str,
        window: &TimeWindow,
    ) -> bool;

    /// Whether `operator` already has a setup overlapping `window`.
    fn has_operator_conflict(
        &self,
        ledger: &ResourceLedger,
        operator: &str,
        window: &TimeWindow,
    ) -> bool {
        ledger.operator_conflict(operator, window)
    }

    /// Commits the setup window. `false` means the operator was not
    /// available and nothing was written.
    fn reserve_operator(
        &self,
        ledger: &mut ResourceLedger,
        operator: &str,
        window: &TimeWindow,
    ) -> bool;

    /// Cumulative booked setup minutes of `operator`.
    fn total_operator_setup_minutes(&self, ledger: &ResourceLedger, operator: &str) -> i64 {
        ledger.operator_busy_minutes(operator)
    }
}

/// Operator manager with optional per-operator shifts.
///
/// # Example
/// ```
/// use chrono::{Duration, NaiveDate};
/// use shop_schedule::ledger::ResourceLedger;
/// use shop_schedule::models::{ShiftWindow, TimeWindow};
/// use shop_schedule::operators::{OperatorManager, ShiftOperatorManager};
///
/// let manager = ShiftOperatorManager::new()
///     .with_shift("C", ShiftWindow::from_hours(14, 22).unwrap());
/// let nine = NaiveDate::from_ymd_opt(2025, 3, 3).unwrap().and_hms_opt(9, 0, 0).unwrap();
/// let setup = TimeWindow::starting_at(nine, Duration::minutes(30));
///
/// let ledger = ResourceLedger::new();
/// assert!(manager.is_operator_available(&ledger, "A", &setup)); // no shift = always on
/// assert!(!manager.is_operator_available(&ledger, "C", &setup));
/// ```
#[derive(Debug, Clone, Default)]
pub struct ShiftOperatorManager {
    shifts: BTreeMap<String, ShiftWindow>,
}

impl ShiftOperatorManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_config(config: &SchedulerConfig) -> Self {
        Self {
            shifts: config.operator_shifts.clone(),
        }
    }

    pub fn with_shift(mut self, operator: impl Into<String>, shift: ShiftWindow) -> Self {
        self.shifts.insert(operator.into(), shift);
        self
    }

    /// Shift of `operator`, if restricted.
    pub fn shift_of(&self, operator: &str) -> Option<&ShiftWindow> {
        self.shifts.get(operator)
    }

    fn on_shift(&self, operator: &str, window: &TimeWindow) -> bool {
        self.shifts
            .get(operator)
            .map_or(true, |shift| shift.covers(window))
    }
}

impl OperatorManager for ShiftOperatorManager {
    fn is_operator_available(
        &self,
        ledger: &ResourceLedger,
        operator: &str,
        window: &TimeWindow,
    ) -> bool {
        self.on_shift(operator, window) && !self.has_operator_conflict(ledger, operator, window)
    }

    fn reserve_operator(
        &self,
        ledger: &mut ResourceLedger,
        operator: &str,
        window: &TimeWindow,
    ) -> bool {
        if !self.is_operator_available(ledger, operator, window) {
            tracing::debug!(operator, %window, "operator not available, reservation refused");
            return false;
        }
        match ledger.reserve_operator(operator, *window) {
            Ok(()) => true,
            Err(err) => {
                tracing::debug!(operator, error = %err, "operator reservation refused");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, NaiveDateTime};

    fn at(h: u32, m: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 3, 3)
            .unwrap()
            .and_hms_opt(h, m, 0)
            .unwrap()
    }

    #[test]
    fn test_reserve_then_conflict() {
        let manager = ShiftOperatorManager::new();
        let mut ledger = ResourceLedger::new();
        let setup = TimeWindow::new(at(8, 0), at(9, 0));
        assert!(manager.reserve_operator(&mut ledger, "A", &setup));
        assert!(manager.has_operator_conflict(&ledger, "A", &TimeWindow::new(at(8, 30), at(9, 30))));
        assert!(!manager.reserve_operator(&mut ledger, "A", &setup));
        assert!(manager.is_operator_available(&ledger, "A", &TimeWindow::new(at(9, 0), at(10, 0))));
        assert_eq!(manager.total_operator_setup_minutes(&ledger, "A"), 60);
        assert_eq!(manager.total_operator_setup_minutes(&ledger, "B"), 0);
    }

    #[test]
    fn test_off_shift_reservation_refused() {
        let manager = ShiftOperatorManager::new().with_shift("A", ShiftWindow::from_hours(6, 14).unwrap());
        let mut ledger = ResourceLedger::new();
        let late = TimeWindow::new(at(13, 30), at(14, 30));
        assert!(!manager.is_operator_available(&ledger, "A", &late));
        assert!(!manager.reserve_operator(&mut ledger, "A", &late));
        assert!(ledger.operator_reservations("A").is_empty());
        // Conflict check ignores shifts.
        assert!(!manager.has_operator_conflict(&ledger, "A", &late));
    }

    #[test]
    fn test_from_config_shifts() {
        let config = SchedulerConfig::default()
            .with_operator_shift("D", ShiftWindow::from_hours(14, 22).unwrap());
        let manager = ShiftOperatorManager::from_config(&config);
        assert!(manager.shift_of("D").is_some());
        assert!(manager.shift_of("A").is_none());
    }
}
