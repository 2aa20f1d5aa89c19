//! Machine selection.
//!
//! Picks the machine for an operation and the instant it can start, reading
//! the ledger but never writing to it. Writing happens through
//! [`MachineSelector::reserve_machine`] once the engine has settled the exact
//! timing.
//!
//! # Strategy ([`LedgerMachineSelector`])
//!
//! 1. Drop machines in breakdown (order-level breakdown first, else the
//!    plant-wide list).
//! 2. For every remaining machine find the earliest start at or after the
//!    requested instant where the estimated occupation fits.
//! 3. Machines that can start within the immediate-start tolerance win.
//!    Among them: for later operations, machines not used earlier in the
//!    batch and not held by other batches come first; then least booked
//!    time; then eligibility order.
//! 4. Otherwise the earliest start wins, ties by eligibility order.
//!
//! Every step is deterministic.

use chrono::{Duration, NaiveDateTime};

use crate::config::SchedulerConfig;
use crate::error::{Result, ScheduleError};
use crate::ledger::ResourceLedger;
use crate::models::{OperationDefinition, Order, TimeWindow};

/// Batch-level facts the selector may use to spread work.
#[derive(Debug, Clone, Copy)]
pub struct MachineContext<'a> {
    pub operation_seq: u32,
    /// Whether this is the first scheduled operation of the batch.
    pub first_in_batch: bool,
    pub batch_id: &'a str,
    pub batch_qty: u32,
    /// Machines used by earlier operations of this batch.
    pub previous_operation_machines: &'a [String],
    /// Machines holding reservations of any batch.
    pub other_batch_machines: &'a [String],
}

/// Machine and start proposed for an operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MachineProposal {
    pub machine: String,
    pub actual_setup_start: NaiveDateTime,
    pub actual_setup_end: NaiveDateTime,
}

/// Chooses machines and reports their availability.
pub trait MachineSelector {
    /// Proposes a machine for `operation` at or after `setup_start`.
    ///
    /// `run_end_hint`, when given, bounds the occupation to check instead of
    /// the setup + run estimate.
    fn select_optimal_machine(
        &self,
        ledger: &ResourceLedger,
        operation: &OperationDefinition,
        order: &Order,
        setup_start: NaiveDateTime,
        run_end_hint: Option<NaiveDateTime>,
        context: &MachineContext<'_>,
    ) -> Result<MachineProposal>;

    /// First instant `>= requested` at which `machine` is not occupied.
    fn earliest_free_time(
        &self,
        ledger: &ResourceLedger,
        machine: &str,
        requested: NaiveDateTime,
    ) -> NaiveDateTime {
        ledger.machine_free_at(machine, requested)
    }

    /// Commits the occupation window of `machine`.
    fn reserve_machine(
        &self,
        ledger: &mut ResourceLedger,
        machine: &str,
        window: TimeWindow,
    ) -> Result<()> {
        ledger.reserve_machine(machine, window)
    }

    /// Machines allowed for `operation` of `order` during `window`.
    fn usable_machines(
        &self,
        operation: &OperationDefinition,
        order: &Order,
        window: &TimeWindow,
    ) -> Vec<String>;
}

/// Eligible machines minus breakdowns, in eligibility order.
///
/// An empty eligibility list falls back to `all_machines`. An order-level
/// breakdown replaces the plant-wide list; it only excludes its machine when
/// `window` touches the breakdown period.
pub fn usable_machines(
    operation: &OperationDefinition,
    order: &Order,
    breakdown_machines: &[String],
    all_machines: &[String],
    window: &TimeWindow,
) -> Vec<String> {
    let eligible = if operation.eligible_machines.is_empty() {
        all_machines
    } else {
        &operation.eligible_machines
    };
    eligible
        .iter()
        .filter(|m| match &order.breakdown {
            Some(breakdown) => !breakdown.blocks(m, window),
            None => !breakdown_machines.contains(m),
        })
        .cloned()
        .collect()
}

#[derive(Debug)]
struct Candidate<'m> {
    machine: &'m str,
    index: usize,
    start: NaiveDateTime,
    delay: Duration,
    booked_minutes: i64,
    used_in_batch: bool,
    held_by_others: bool,
}

/// Default selector working directly off the reservation ledger.
///
/// # Example
/// ```
/// use chrono::NaiveDate;
/// use shop_schedule::config::SchedulerConfig;
/// use shop_schedule::ledger::ResourceLedger;
/// use shop_schedule::machines::{LedgerMachineSelector, MachineContext, MachineSelector};
/// use shop_schedule::models::{OperationDefinition, Order};
///
/// let t0 = NaiveDate::from_ymd_opt(2025, 3, 3).unwrap().and_hms_opt(8, 0, 0).unwrap();
/// let selector = LedgerMachineSelector::from_config(&SchedulerConfig::default());
/// let op = OperationDefinition::new("P1", 1, "Turn").with_eligible_machines(["M1", "M2"]);
/// let order = Order::new("P1", 10, t0);
/// let ctx = MachineContext {
///     operation_seq: 1,
///     first_in_batch: true,
///     batch_id: "B01",
///     batch_qty: 10,
///     previous_operation_machines: &[],
///     other_batch_machines: &[],
/// };
///
/// let proposal = selector
///     .select_optimal_machine(&ResourceLedger::new(), &op, &order, t0, None, &ctx)
///     .unwrap();
/// assert_eq!(proposal.machine, "M1");
/// assert_eq!(proposal.actual_setup_start, t0);
/// ```
#[derive(Debug, Clone, Default)]
pub struct LedgerMachineSelector {
    breakdown_machines: Vec<String>,
    all_machines: Vec<String>,
    immediate_tolerance: Duration,
}

impl LedgerMachineSelector {
    pub fn new(
        breakdown_machines: Vec<String>,
        all_machines: Vec<String>,
        immediate_tolerance: Duration,
    ) -> Self {
        Self {
            breakdown_machines,
            all_machines,
            immediate_tolerance,
        }
    }

    pub fn from_config(config: &SchedulerConfig) -> Self {
        Self::new(
            config.breakdown_machines.clone(),
            config.machines.clone(),
            config.immediate_start_tolerance(),
        )
    }

    fn pick<'c, 'm>(
        &self,
        candidates: &'c [Candidate<'m>],
        first_in_batch: bool,
    ) -> Option<&'c Candidate<'m>> {
        let spread = !first_in_batch;
        let immediate = candidates
            .iter()
            .filter(|c| c.delay <= self.immediate_tolerance)
            .min_by_key(|c| {
                (
                    spread && c.used_in_batch,
                    spread && c.held_by_others,
                    c.booked_minutes,
                    c.index,
                )
            });
        immediate.or_else(|| candidates.iter().min_by_key(|c| (c.start, c.index)))
    }
}

impl MachineSelector for LedgerMachineSelector {
    fn select_optimal_machine(
        &self,
        ledger: &ResourceLedger,
        operation: &OperationDefinition,
        order: &Order,
        setup_start: NaiveDateTime,
        run_end_hint: Option<NaiveDateTime>,
        context: &MachineContext<'_>,
    ) -> Result<MachineProposal> {
        let occupation = match run_end_hint {
            Some(end) if end > setup_start => end - setup_start,
            _ => operation
                .estimated_window(setup_start, context.batch_qty)
                .duration(),
        };
        let requested = TimeWindow::starting_at(setup_start, occupation);
        let machines = self.usable_machines(operation, order, &requested);

        if machines.is_empty() {
            let fallback = operation
                .eligible_machines
                .first()
                .or_else(|| self.all_machines.first())
                .ok_or_else(|| {
                    ScheduleError::operation(operation.operation_seq, "no eligible machines")
                })?;
            tracing::warn!(
                part = %order.part_number,
                seq = operation.operation_seq,
                machine = %fallback,
                "all eligible machines in breakdown, using fallback"
            );
            return Ok(MachineProposal {
                machine: fallback.clone(),
                actual_setup_start: setup_start,
                actual_setup_end: setup_start + operation.setup_duration(),
            });
        }

        let candidates: Vec<Candidate<'_>> = machines
            .iter()
            .enumerate()
            .map(|(index, machine)| {
                let start = ledger.earliest_machine_gap(machine, setup_start, occupation);
                Candidate {
                    machine: machine.as_str(),
                    index,
                    start,
                    delay: start - setup_start,
                    booked_minutes: ledger.machine_busy_minutes(machine),
                    used_in_batch: context.previous_operation_machines.contains(machine),
                    held_by_others: context.other_batch_machines.contains(machine),
                }
            })
            .collect();

        let best = self
            .pick(&candidates, context.first_in_batch)
            .ok_or_else(|| ScheduleError::operation(operation.operation_seq, "no machine candidates"))?;

        tracing::debug!(
            part = %order.part_number,
            batch = context.batch_id,
            seq = operation.operation_seq,
            machine = best.machine,
            start = %best.start,
            delay_min = best.delay.num_minutes(),
            "machine selected"
        );

        Ok(MachineProposal {
            machine: best.machine.to_string(),
            actual_setup_start: best.start,
            actual_setup_end: best.start + operation.setup_duration(),
        })
    }

    fn usable_machines(
        &self,
        operation: &OperationDefinition,
        order: &Order,
        window: &TimeWindow,
    ) -> Vec<String> {
        usable_machines(
            operation,
            order,
            &self.breakdown_machines,
            &self.all_machines,
            window,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::BreakdownWindow;
    use chrono::NaiveDate;

    fn at(h: u32, m: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 3, 3)
            .unwrap()
            .and_hms_opt(h, m, 0)
            .unwrap()
    }

    fn op(machines: &[&str]) -> OperationDefinition {
        OperationDefinition::new("P1", 1, "Turn")
            .with_setup_time(30.0)
            .with_cycle_time(1.0)
            .with_eligible_machines(machines.iter().copied())
    }

    fn ctx<'a>(seq: u32, previous: &'a [String], others: &'a [String]) -> MachineContext<'a> {
        MachineContext {
            operation_seq: seq,
            first_in_batch: seq == 1,
            batch_id: "B01",
            batch_qty: 30,
            previous_operation_machines: previous,
            other_batch_machines: others,
        }
    }

    fn selector() -> LedgerMachineSelector {
        LedgerMachineSelector::from_config(&SchedulerConfig::default())
    }

    #[test]
    fn test_first_eligible_on_tie() {
        let order = Order::new("P1", 30, at(18, 0));
        let p = selector()
            .select_optimal_machine(&ResourceLedger::new(), &op(&["M2", "M1"]), &order, at(8, 0), None, &ctx(1, &[], &[]))
            .unwrap();
        assert_eq!(p.machine, "M2");
        assert_eq!(p.actual_setup_end, at(8, 30));
    }

    #[test]
    fn test_busy_machine_skipped_for_immediate_one() {
        let mut ledger = ResourceLedger::new();
        ledger
            .reserve_machine("M1", TimeWindow::new(at(7, 0), at(12, 0)))
            .unwrap();
        let order = Order::new("P1", 30, at(18, 0));
        let p = selector()
            .select_optimal_machine(&ledger, &op(&["M1", "M2"]), &order, at(8, 0), None, &ctx(1, &[], &[]))
            .unwrap();
        assert_eq!(p.machine, "M2");
        assert_eq!(p.actual_setup_start, at(8, 0));
    }

    #[test]
    fn test_earliest_start_when_all_busy() {
        let mut ledger = ResourceLedger::new();
        ledger
            .reserve_machine("M1", TimeWindow::new(at(7, 0), at(12, 0)))
            .unwrap();
        ledger
            .reserve_machine("M2", TimeWindow::new(at(7, 0), at(10, 0)))
            .unwrap();
        let order = Order::new("P1", 30, at(18, 0));
        let p = selector()
            .select_optimal_machine(&ledger, &op(&["M1", "M2"]), &order, at(8, 0), None, &ctx(1, &[], &[]))
            .unwrap();
        assert_eq!(p.machine, "M2");
        assert_eq!(p.actual_setup_start, at(10, 0));
    }

    #[test]
    fn test_least_booked_among_immediate() {
        let mut ledger = ResourceLedger::new();
        ledger
            .reserve_machine("M1", TimeWindow::new(at(1, 0), at(5, 0)))
            .unwrap();
        ledger
            .reserve_machine("M2", TimeWindow::new(at(1, 0), at(2, 0)))
            .unwrap();
        let order = Order::new("P1", 30, at(18, 0));
        let p = selector()
            .select_optimal_machine(&ledger, &op(&["M1", "M2"]), &order, at(8, 0), None, &ctx(1, &[], &[]))
            .unwrap();
        assert_eq!(p.machine, "M2");
    }

    #[test]
    fn test_later_operation_prefers_unused_machine() {
        let previous = vec!["M1".to_string()];
        let order = Order::new("P1", 30, at(18, 0));
        let p = selector()
            .select_optimal_machine(&ResourceLedger::new(), &op(&["M1", "M2"]), &order, at(8, 0), None, &ctx(2, &previous, &[]))
            .unwrap();
        assert_eq!(p.machine, "M2");
    }

    #[test]
    fn test_first_operation_ignores_other_batches_whatever_its_seq() {
        let others = vec!["M1".to_string()];
        let order = Order::new("P1", 30, at(18, 0));
        let context = MachineContext {
            first_in_batch: true,
            ..ctx(3, &[], &others)
        };
        let p = selector()
            .select_optimal_machine(&ResourceLedger::new(), &op(&["M1", "M2"]), &order, at(8, 0), None, &context)
            .unwrap();
        assert_eq!(p.machine, "M1");

        let later = ctx(3, &[], &others);
        let p = selector()
            .select_optimal_machine(&ResourceLedger::new(), &op(&["M1", "M2"]), &order, at(8, 0), None, &later)
            .unwrap();
        assert_eq!(p.machine, "M2");
    }

    #[test]
    fn test_global_breakdown_excluded() {
        let selector = LedgerMachineSelector::new(
            vec!["M1".into()],
            Vec::new(),
            Duration::minutes(5),
        );
        let order = Order::new("P1", 30, at(18, 0));
        let p = selector
            .select_optimal_machine(&ResourceLedger::new(), &op(&["M1", "M2"]), &order, at(8, 0), None, &ctx(1, &[], &[]))
            .unwrap();
        assert_eq!(p.machine, "M2");
    }

    #[test]
    fn test_all_broken_falls_back_to_first_eligible() {
        let order = Order::new("P1", 30, at(18, 0)).with_breakdown(BreakdownWindow::new("M1"));
        let p = selector()
            .select_optimal_machine(&ResourceLedger::new(), &op(&["M1"]), &order, at(8, 0), None, &ctx(1, &[], &[]))
            .unwrap();
        assert_eq!(p.machine, "M1");
        assert_eq!(p.actual_setup_start, at(8, 0));
    }

    #[test]
    fn test_breakdown_window_only_blocks_overlap() {
        let order = Order::new("P1", 30, at(18, 0))
            .with_breakdown(BreakdownWindow::new("M1").between(at(12, 0), at(14, 0)));
        let window = TimeWindow::new(at(8, 0), at(9, 0));
        let usable = selector().usable_machines(&op(&["M1", "M2"]), &order, &window);
        assert_eq!(usable, vec!["M1", "M2"]);
        let window = TimeWindow::new(at(11, 0), at(13, 0));
        let usable = selector().usable_machines(&op(&["M1", "M2"]), &order, &window);
        assert_eq!(usable, vec!["M2"]);
    }

    #[test]
    fn test_empty_eligibility_uses_plant_machines() {
        let order = Order::new("P1", 30, at(18, 0));
        let p = selector()
            .select_optimal_machine(&ResourceLedger::new(), &op(&[]), &order, at(8, 0), None, &ctx(1, &[], &[]))
            .unwrap();
        assert_eq!(p.machine, "VMC 1");
    }

    #[test]
    fn test_no_machines_at_all_is_error() {
        let selector = LedgerMachineSelector::new(Vec::new(), Vec::new(), Duration::minutes(5));
        let order = Order::new("P1", 30, at(18, 0));
        let err = selector
            .select_optimal_machine(&ResourceLedger::new(), &op(&[]), &order, at(8, 0), None, &ctx(1, &[], &[]))
            .unwrap_err();
        assert!(matches!(err, ScheduleError::OperationFailed { seq: 1, .. }));
    }
}
