//! Reservation ledger for machines and operators.
//!
//! The ledger is the single source of truth about committed capacity during
//! a run. It holds two tables (machines, operators), each mapping a resource
//! id to its reserved windows sorted by start.
//!
//! # Invariant
//! No two windows of the same resource overlap. Every `reserve_*` call that
//! would break this is refused with [`ScheduleError::ReservationConflict`],
//! so the invariant holds whatever the caller does.
//!
//! # Determinism
//! Tables are `BTreeMap`s; every query iterates in a stable order.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{Duration, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::error::{Result, ScheduleError};
use crate::models::TimeWindow;

/// Which table a reservation lives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ResourceKind {
    Machine,
    Operator,
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResourceKind::Machine => f.write_str("machine"),
            ResourceKind::Operator => f.write_str("operator"),
        }
    }
}

#[derive(Debug, Clone, Default)]
struct ReservationTable {
    by_owner: BTreeMap<String, Vec<TimeWindow>>,
}

impl ReservationTable {
    fn windows(&self, owner: &str) -> &[TimeWindow] {
        self.by_owner.get(owner).map(Vec::as_slice).unwrap_or(&[])
    }

    fn overlap(&self, owner: &str, window: &TimeWindow) -> Option<TimeWindow> {
        self.windows(owner)
            .iter()
            .find(|w| w.overlaps(window))
            .copied()
    }

    /// First instant `>= time` not covered by a reservation.
    fn free_at(&self, owner: &str, time: NaiveDateTime) -> NaiveDateTime {
        let mut t = time;
        for w in self.windows(owner) {
            if w.contains(t) {
                t = w.end;
            }
        }
        t
    }

    /// Earliest start `>= from` of a free gap at least `duration` long.
    fn earliest_gap(&self, owner: &str, from: NaiveDateTime, duration: Duration) -> NaiveDateTime {
        let mut t = from;
        for w in self.windows(owner) {
            if w.end <= t {
                continue;
            }
            if w.start >= t + duration {
                break;
            }
            t = w.end;
        }
        t
    }

    fn insert(
        &mut self,
        kind: ResourceKind,
        owner: &str,
        window: TimeWindow,
    ) -> Result<()> {
        if window.end < window.start {
            return Err(ScheduleError::InvalidTiming(format!(
                "{kind} {owner}: window {window} ends before it starts"
            )));
        }
        if self.overlap(owner, &window).is_some() {
            return Err(ScheduleError::ReservationConflict {
                kind,
                resource: owner.to_string(),
                start: window.start,
                end: window.end,
            });
        }
        let windows = self.by_owner.entry(owner.to_string()).or_default();
        let pos = windows.partition_point(|w| w.start <= window.start);
        windows.insert(pos, window);
        Ok(())
    }

    fn busy_minutes(&self, owner: &str) -> i64 {
        self.windows(owner)
            .iter()
            .map(|w| w.duration().num_minutes())
            .sum()
    }

    fn iter(&self) -> impl Iterator<Item = (&str, &[TimeWindow])> {
        self.by_owner
            .iter()
            .map(|(owner, windows)| (owner.as_str(), windows.as_slice()))
    }

    fn len(&self) -> usize {
        self.by_owner.values().map(Vec::len).sum()
    }
}

/// Committed machine and operator reservations of a run.
///
/// # Example
/// ```
/// use chrono::{Duration, NaiveDate};
/// use shop_schedule::ledger::ResourceLedger;
/// use shop_schedule::models::TimeWindow;
///
/// let t0 = NaiveDate::from_ymd_opt(2025, 3, 3).unwrap().and_hms_opt(8, 0, 0).unwrap();
/// let mut ledger = ResourceLedger::new();
/// ledger.reserve_machine("M1", TimeWindow::starting_at(t0, Duration::hours(2))).unwrap();
///
/// // Overlapping reservations are refused.
/// assert!(ledger
///     .reserve_machine("M1", TimeWindow::starting_at(t0 + Duration::hours(1), Duration::hours(1)))
///     .is_err());
/// assert_eq!(ledger.machine_free_at("M1", t0), t0 + Duration::hours(2));
/// ```
#[derive(Debug, Clone, Default)]
pub struct ResourceLedger {
    machines: ReservationTable,
    operators: ReservationTable,
}

impl ResourceLedger {
    /// Creates an empty ledger.
    pub fn new() -> Self {
        Self::default()
    }

    // ---- machines ----

    /// Reserved windows of `machine`, sorted by start.
    pub fn machine_reservations(&self, machine: &str) -> &[TimeWindow] {
        self.machines.windows(machine)
    }

    /// First committed window of `machine` overlapping `window`.
    pub fn machine_overlap(&self, machine: &str, window: &TimeWindow) -> Option<TimeWindow> {
        self.machines.overlap(machine, window)
    }

    pub fn is_machine_free(&self, machine: &str, window: &TimeWindow) -> bool {
        self.machine_overlap(machine, window).is_none()
    }

    /// First instant at or after `time` when `machine` is not occupied.
    pub fn machine_free_at(&self, machine: &str, time: NaiveDateTime) -> NaiveDateTime {
        self.machines.free_at(machine, time)
    }

    /// Earliest start at or after `from` where `machine` is free for `duration`.
    pub fn earliest_machine_gap(
        &self,
        machine: &str,
        from: NaiveDateTime,
        duration: Duration,
    ) -> NaiveDateTime {
        self.machines.earliest_gap(machine, from, duration)
    }

    /// Commits `window` on `machine`.
    pub fn reserve_machine(&mut self, machine: &str, window: TimeWindow) -> Result<()> {
        self.machines.insert(ResourceKind::Machine, machine, window)?;
        tracing::debug!(machine, %window, "machine reserved");
        Ok(())
    }

    /// Total booked minutes on `machine`.
    pub fn machine_busy_minutes(&self, machine: &str) -> i64 {
        self.machines.busy_minutes(machine)
    }

    /// Machines holding at least one reservation, sorted by id.
    pub fn machines_in_use(&self) -> Vec<String> {
        self.machines
            .iter()
            .filter(|(_, windows)| !windows.is_empty())
            .map(|(machine, _)| machine.to_string())
            .collect()
    }

    // ---- operators ----

    pub fn operator_reservations(&self, operator: &str) -> &[TimeWindow] {
        self.operators.windows(operator)
    }

    /// Whether `operator` already has a setup overlapping `window`.
    pub fn operator_conflict(&self, operator: &str, window: &TimeWindow) -> bool {
        self.operators.overlap(operator, window).is_some()
    }

    /// Commits `window` for `operator`.
    pub fn reserve_operator(&mut self, operator: &str, window: TimeWindow) -> Result<()> {
        self.operators.insert(ResourceKind::Operator, operator, window)?;
        tracing::debug!(operator, %window, "operator reserved");
        Ok(())
    }

    /// Total booked setup minutes of `operator`.
    pub fn operator_busy_minutes(&self, operator: &str) -> i64 {
        self.operators.busy_minutes(operator)
    }

    // ---- whole ledger ----

    /// All reservations of one table, owner by owner.
    pub fn reservations(
        &self,
        kind: ResourceKind,
    ) -> impl Iterator<Item = (&str, &[TimeWindow])> {
        match kind {
            ResourceKind::Machine => self.machines.iter(),
            ResourceKind::Operator => self.operators.iter(),
        }
    }

    /// Number of committed reservations in both tables.
    pub fn reservation_count(&self) -> usize {
        self.machines.len() + self.operators.len()
    }
}
