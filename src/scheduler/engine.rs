//! Greedy first-fit scheduling engine.
//!
//! # Algorithm
//!
//! 1. Sequence orders (earliest due date, then priority weight).
//! 2. For each order, resolve its operations and split it into batches.
//! 3. Give every batch one operator, round-robin over the pool.
//! 4. For each batch, schedule operations in sequence order:
//!    - propose a machine, then resolve a conflict on it by switching to a
//!      free alternate, waiting, or starting just after it frees;
//!    - pick an operator and move the start if they are not available,
//!      unless piece flow already fixes the start;
//!    - compute piece-level timing and shift it to the next machine gap
//!      until the machine window is clear;
//!    - commit machine and operator reservations, emit the row.
//!
//! Operations of one batch overlap in time: the next operation may start
//! its setup once the first piece of the previous one is ready.
//!
//! # Complexity
//! O(b * m * (r + p)) per order where b=batches, m=operations, r=reservations
//! per resource, p=pieces per batch.
//!
//! # Reference
//! Pinedo (2016), "Scheduling", Ch. 4: Priority Dispatching

use std::collections::BTreeMap;
use std::fmt;

use chrono::{Duration, NaiveDateTime};

use super::resolution::{MachineResolution, OperatorResolution};
use crate::batching::{BatchProcessor, BatchRequest, RuleBasedBatchProcessor};
use crate::catalog::OperationCatalog;
use crate::config::SchedulerConfig;
use crate::dispatching::sequence_orders;
use crate::error::{Result, ScheduleError};
use crate::ledger::ResourceLedger;
use crate::machines::{LedgerMachineSelector, MachineContext, MachineSelector};
use crate::models::{
    format_duration, AssignmentStatus, Batch, OperationAssignment, OperationDefinition, Order,
    RunSummary, ScheduleRun, TimeWindow,
};
use crate::operators::{OperatorManager, ShiftOperatorManager};
use crate::timing::{
    OperationTiming, PieceFlowTimingCalculator, TimingCalculator, TimingRequest,
};
use crate::validation::{self, ValidationError};

/// Upper bound on timing recomputations while looking for a clear machine
/// window, and on operator re-checks after the start settled.
const MAX_SETTLE_ROUNDS: usize = 16;

/// What one operation hands to the next within a batch.
#[derive(Debug, Clone, Default)]
struct BatchFlow {
    run_end: Option<NaiveDateTime>,
    pieces: Option<Vec<NaiveDateTime>>,
}

impl BatchFlow {
    /// First piece ready, else the previous run end.
    fn trigger(&self) -> Option<NaiveDateTime> {
        self.pieces
            .as_ref()
            .and_then(|pieces| pieces.first().copied())
            .or(self.run_end)
    }

    fn has_pieces(&self) -> bool {
        self.pieces.as_ref().is_some_and(|pieces| !pieces.is_empty())
    }

    fn advance(&mut self, row: &OperationAssignment) {
        self.run_end = Some(row.run_end);
        self.pieces = Some(row.piece_completion_times.clone());
    }
}

/// Greedy scheduler committing into a [`ResourceLedger`].
///
/// Collaborators are replaceable trait objects; the defaults are built from
/// the [`SchedulerConfig`]. The engine owns the ledger and is the only
/// writer; reservations are never rolled back within a run.
///
/// # Example
///
/// ```
/// use chrono::{Duration, NaiveDate};
/// use shop_schedule::catalog::InMemoryCatalog;
/// use shop_schedule::config::SchedulerConfig;
/// use shop_schedule::models::{OperationDefinition, Order};
/// use shop_schedule::scheduler::SchedulingEngine;
///
/// let now = NaiveDate::from_ymd_opt(2025, 3, 3).unwrap().and_hms_opt(8, 0, 0).unwrap();
/// let catalog = InMemoryCatalog::new(vec![
///     OperationDefinition::new("P1", 1, "Turning")
///         .with_setup_time(60.0)
///         .with_cycle_time(2.0)
///         .with_eligible_machines(["M1", "M2"]),
/// ]);
/// let mut engine = SchedulingEngine::new(catalog, SchedulerConfig::default(), now).unwrap();
///
/// let rows = engine.schedule_order(&Order::new("P1", 100, now + Duration::days(2))).unwrap();
/// assert_eq!(rows.len(), 1);
/// assert_eq!(rows[0].machine, "M1");
/// assert_eq!(rows[0].setup_end, now + Duration::minutes(60));
/// assert_eq!(rows[0].run_end, rows[0].setup_end + Duration::minutes(200));
/// ```
pub struct SchedulingEngine {
    config: SchedulerConfig,
    ledger: ResourceLedger,
    catalog: Box<dyn OperationCatalog>,
    batch_processor: Box<dyn BatchProcessor>,
    machine_selector: Box<dyn MachineSelector>,
    operator_manager: Box<dyn OperatorManager>,
    timing: Box<dyn TimingCalculator>,
    now: NaiveDateTime,
    alerts: Vec<String>,
}

impl SchedulingEngine {
    /// Creates an engine with the default collaborators.
    ///
    /// Fails with [`ScheduleError::InvalidConfig`] when `config` does not
    /// validate.
    pub fn new<C>(catalog: C, config: SchedulerConfig, now: NaiveDateTime) -> Result<Self>
    where
        C: OperationCatalog + 'static,
    {
        config.validate()?;
        Ok(Self {
            ledger: ResourceLedger::new(),
            catalog: Box::new(catalog),
            batch_processor: Box::new(RuleBasedBatchProcessor::new()),
            machine_selector: Box::new(LedgerMachineSelector::from_config(&config)),
            operator_manager: Box::new(ShiftOperatorManager::from_config(&config)),
            timing: Box::new(PieceFlowTimingCalculator::new(config.setup_window)),
            now,
            alerts: Vec::new(),
            config,
        })
    }

    /// Replaces the batch splitting strategy.
    pub fn with_batch_processor<B: BatchProcessor + 'static>(mut self, processor: B) -> Self {
        self.batch_processor = Box::new(processor);
        self
    }

    /// Replaces the machine selection strategy.
    pub fn with_machine_selector<M: MachineSelector + 'static>(mut self, selector: M) -> Self {
        self.machine_selector = Box::new(selector);
        self
    }

    /// Replaces the operator manager.
    pub fn with_operator_manager<O: OperatorManager + 'static>(mut self, manager: O) -> Self {
        self.operator_manager = Box::new(manager);
        self
    }

    /// Replaces the timing calculator.
    pub fn with_timing_calculator<T: TimingCalculator + 'static>(mut self, timing: T) -> Self {
        self.timing = Box::new(timing);
        self
    }

    /// Starts from existing reservations instead of an empty ledger.
    pub fn with_ledger(mut self, ledger: ResourceLedger) -> Self {
        self.ledger = ledger;
        self
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    /// Committed reservations so far.
    pub fn ledger(&self) -> &ResourceLedger {
        &self.ledger
    }

    pub fn now(&self) -> NaiveDateTime {
        self.now
    }

    /// Alerts collected since the last [`take_alerts`](Self::take_alerts).
    pub fn alerts(&self) -> &[String] {
        &self.alerts
    }

    /// Drains collected alerts.
    pub fn take_alerts(&mut self) -> Vec<String> {
        std::mem::take(&mut self.alerts)
    }

    /// Schedules a whole order book.
    ///
    /// Orders are sequenced first. A failing order adds one alert and the run
    /// continues; an order that yields no rows adds a "could not be
    /// scheduled" alert.
    pub fn run(&mut self, orders: &[Order]) -> ScheduleRun {
        let sequenced = sequence_orders(orders);
        tracing::info!(orders = sequenced.len(), now = %self.now, "scheduling run started");

        let mut rows = Vec::new();
        for order in &sequenced {
            match self.schedule_order(order) {
                Ok(order_rows) if order_rows.is_empty() => {
                    self.alerts
                        .push(format!("Order {} could not be scheduled", order.part_number));
                }
                Ok(order_rows) => rows.extend(order_rows),
                Err(err) => {
                    tracing::error!(part = %order.part_number, error = %err, "order skipped");
                    self.alerts
                        .push(format!("Error scheduling order {}: {err}", order.part_number));
                }
            }
        }

        let summary = RunSummary::new(sequenced.len(), rows.len());
        tracing::info!(
            rows = rows.len(),
            alerts = self.alerts.len(),
            success_rate = summary.success_rate,
            "scheduling run finished"
        );
        ScheduleRun {
            rows,
            alerts: self.take_alerts(),
            summary,
            error: None,
        }
    }

    /// Schedules every batch of one order.
    ///
    /// Invalid orders, parts without operations and bad batch splits are
    /// errors. Failures of single operations are recorded as alerts and do
    /// not fail the order.
    pub fn schedule_order(&mut self, order: &Order) -> Result<Vec<OperationAssignment>> {
        validation::validate_order(order).map_err(|errors| ScheduleError::InvalidOrder {
            part_number: order.part_number.clone(),
            reason: joined(&errors),
        })?;

        let operations = self
            .catalog
            .operations_for(&order.part_number, &order.operation_seq);
        if operations.is_empty() {
            return Err(ScheduleError::NoOperations {
                part_number: order.part_number.clone(),
            });
        }

        let min_batch_size = operations
            .iter()
            .map(|op| op.minimum_batch_size)
            .filter(|&size| size > 0)
            .max()
            .unwrap_or(self.config.default_min_batch_size);
        let request = BatchRequest {
            quantity: order.quantity,
            min_batch_size,
            priority: order.priority,
            due_date: order.due_date,
            start_date: order.start_date,
            batch_mode: order.batch_mode,
            custom_batch_size: order.custom_batch_size,
            operations: &operations,
        };
        let batches = self.batch_processor.calculate_batch_splitting(&request);
        validation::validate_batches(&batches, order.quantity).map_err(|errors| {
            ScheduleError::InvalidBatches {
                part_number: order.part_number.clone(),
                reason: joined(&errors),
            }
        })?;

        let operators = self.assign_persons_to_batches(&batches);
        tracing::info!(
            part = %order.part_number,
            quantity = order.quantity,
            priority = %order.priority,
            batches = batches.len(),
            operations = operations.len(),
            "scheduling order"
        );

        let mut rows = Vec::with_capacity(batches.len() * operations.len());
        for batch in batches {
            let batch = match operators.get(&batch.batch_id) {
                Some(operator) => batch.with_operator(operator.clone()),
                None => batch,
            };
            rows.extend(self.schedule_batch(&batch, order, &operations));
        }

        tracing::info!(part = %order.part_number, rows = rows.len(), "order scheduled");
        Ok(rows)
    }

    /// Fixes one operator per batch: `pool[index % pool.len()]`.
    ///
    /// A batch that already carries an operator keeps it.
    pub fn assign_persons_to_batches(&self, batches: &[Batch]) -> BTreeMap<String, String> {
        let pool = &self.config.operator_pool;
        let mut assignment = BTreeMap::new();
        for batch in batches {
            let operator = batch
                .assigned_operator
                .clone()
                .or_else(|| pool.get(batch.sequence_index % pool.len().max(1)).cloned());
            if let Some(operator) = operator {
                tracing::debug!(batch = %batch.batch_id, operator = %operator, "batch operator");
                assignment.insert(batch.batch_id.clone(), operator);
            }
        }
        assignment
    }

    /// Schedules the operations of one batch in the given order.
    ///
    /// A failed operation adds an alert; the next one continues from the
    /// last successfully scheduled operation.
    pub fn schedule_batch(
        &mut self,
        batch: &Batch,
        order: &Order,
        operations: &[OperationDefinition],
    ) -> Vec<OperationAssignment> {
        let mut flow = BatchFlow::default();
        let mut used_machines: Vec<String> = Vec::new();
        let mut rows = Vec::with_capacity(operations.len());

        for (index, operation) in operations.iter().enumerate() {
            let first = index == 0;
            match self.schedule_operation(batch, order, operation, first, &flow, &mut used_machines) {
                Ok(row) => {
                    flow.advance(&row);
                    rows.push(row);
                }
                Err(err) => {
                    tracing::error!(
                        part = %order.part_number,
                        batch = %batch.batch_id,
                        seq = operation.operation_seq,
                        error = %err,
                        "operation skipped"
                    );
                    self.alerts.push(format!(
                        "Error scheduling {} batch {} operation {}: {err}",
                        order.part_number, batch.batch_id, operation.operation_seq
                    ));
                }
            }
        }
        rows
    }

    fn schedule_operation(
        &mut self,
        batch: &Batch,
        order: &Order,
        operation: &OperationDefinition,
        first: bool,
        flow: &BatchFlow,
        used_machines: &mut Vec<String>,
    ) -> Result<OperationAssignment> {
        let seq = operation.operation_seq;
        let batch_operator = batch
            .assigned_operator
            .clone()
            .or_else(|| self.config.operator_pool.first().cloned())
            .ok_or_else(|| ScheduleError::operation(seq, "no operator for batch"))?;

        let requested = flow.trigger().unwrap_or_else(|| self.first_start(order));

        let other_batch_machines = self.ledger.machines_in_use();
        let context = MachineContext {
            operation_seq: seq,
            first_in_batch: first,
            batch_id: &batch.batch_id,
            batch_qty: batch.quantity,
            previous_operation_machines: used_machines.as_slice(),
            other_batch_machines: &other_batch_machines,
        };
        let proposal = self.machine_selector.select_optimal_machine(
            &self.ledger,
            operation,
            order,
            requested,
            None,
            &context,
        )?;
        let start = proposal.actual_setup_start.max(requested);

        let (machine, start, machine_resolution) =
            self.resolve_machine_conflict(operation, order, batch.quantity, proposal.machine, start);
        if !used_machines.contains(&machine) {
            used_machines.push(machine.clone());
        }

        let setup = operation.setup_duration();
        let mut start = start;
        let mut rounds = 0;
        let (operator, operator_resolution, timing) = loop {
            let operator = self.select_operator(&batch_operator, TimeWindow::starting_at(start, setup));
            let (resolved, operator_resolution) =
                self.resolve_operator(&operator, start, setup, first, flow.has_pieces());
            let timing =
                self.settle_timing(operation, order, batch.quantity, &machine, &operator, resolved, flow)?;
            rounds += 1;

            // A settled start invalidates the operator check made before it.
            let moved = timing.setup_start != resolved;
            if !moved
                || rounds >= MAX_SETTLE_ROUNDS
                || self.operator_manager.is_operator_available(
                    &self.ledger,
                    &operator,
                    &timing.operator_window(),
                )
            {
                break (operator, operator_resolution, timing);
            }
            tracing::debug!(
                seq,
                operator = %operator,
                from = %resolved,
                to = %timing.setup_start,
                "settled start moved, re-checking operator"
            );
            start = timing.setup_start;
        };

        self.machine_selector
            .reserve_machine(&mut self.ledger, &machine, timing.machine_window())?;
        let operator_window = timing.operator_window();
        if !self
            .operator_manager
            .reserve_operator(&mut self.ledger, &operator, &operator_window)
        {
            tracing::warn!(
                part = %order.part_number,
                batch = %batch.batch_id,
                seq,
                operator = %operator,
                window = %operator_window,
                "operator double-booked after machine commit"
            );
        }

        tracing::info!(
            part = %order.part_number,
            batch = %batch.batch_id,
            seq,
            machine = %machine,
            operator = %operator,
            setup_start = %timing.setup_start,
            run_end = %timing.run_end,
            machine_resolution = %machine_resolution,
            operator_resolution = %operator_resolution,
            "operation scheduled"
        );

        Ok(OperationAssignment {
            part_number: order.part_number.clone(),
            order_quantity: order.quantity,
            priority: order.priority,
            batch_id: batch.batch_id.clone(),
            batch_qty: batch.quantity,
            operation_seq: seq,
            operation_name: operation.operation_name.clone(),
            machine,
            operator,
            setup_start: timing.setup_start,
            setup_end: timing.setup_end,
            run_start: timing.run_start,
            run_end: timing.run_end,
            timing: format_duration(timing.run_end - timing.setup_start),
            due_date: order.due_date,
            status: AssignmentStatus::Scheduled,
            piece_completion_times: timing.piece_completion_times,
        })
    }

    /// Start of a batch's first operation.
    fn first_start(&self, order: &Order) -> NaiveDateTime {
        order
            .start_date
            .map_or(self.now, |start| start.max(self.now))
    }

    fn resolve_machine_conflict(
        &self,
        operation: &OperationDefinition,
        order: &Order,
        batch_qty: u32,
        machine: String,
        start: NaiveDateTime,
    ) -> (String, NaiveDateTime, MachineResolution) {
        let window = operation.estimated_window(start, batch_qty);
        let free_at = self
            .machine_selector
            .earliest_free_time(&self.ledger, &machine, start);
        let busy_until = if free_at > start {
            free_at
        } else if let Some(blocking) = self.ledger.machine_overlap(&machine, &window) {
            blocking.end
        } else {
            return (machine, start, MachineResolution::NoConflict);
        };

        let alternate = self
            .machine_selector
            .usable_machines(operation, order, &window)
            .into_iter()
            .find(|candidate| *candidate != machine && self.ledger.is_machine_free(candidate, &window));
        if let Some(alternate) = alternate {
            tracing::debug!(
                seq = operation.operation_seq,
                from = %machine,
                to = %alternate,
                "machine busy, switched to alternate"
            );
            return (
                alternate,
                start,
                MachineResolution::AlternateMachine { replaced: machine },
            );
        }

        if busy_until - start <= self.config.machine_wait_horizon() {
            tracing::debug!(seq = operation.operation_seq, machine = %machine, until = %busy_until, "waiting for machine");
            return (machine, busy_until, MachineResolution::Wait { until: busy_until });
        }

        let fallback = busy_until + self.config.best_effort_delay();
        tracing::warn!(
            seq = operation.operation_seq,
            machine = %machine,
            busy_until = %busy_until,
            start = %fallback,
            "machine busy beyond wait horizon, best-effort start"
        );
        (machine, fallback, MachineResolution::BestEffort { busy_until })
    }

    /// Batch operator when free, else the least-loaded free operator
    /// (pool order on ties), else the batch operator anyway.
    fn select_operator(&self, batch_operator: &str, window: TimeWindow) -> String {
        let manager = self.operator_manager.as_ref();
        if manager.is_operator_available(&self.ledger, batch_operator, &window) {
            return batch_operator.to_string();
        }
        let selected = self
            .config
            .operator_pool
            .iter()
            .filter(|op| manager.is_operator_available(&self.ledger, op, &window))
            .min_by_key(|op| manager.total_operator_setup_minutes(&self.ledger, op));
        match selected {
            Some(operator) => {
                tracing::debug!(from = batch_operator, to = %operator, "batch operator busy, reassigned");
                operator.clone()
            }
            None => batch_operator.to_string(),
        }
    }

    fn resolve_operator(
        &self,
        operator: &str,
        start: NaiveDateTime,
        setup: Duration,
        first: bool,
        has_pieces: bool,
    ) -> (NaiveDateTime, OperatorResolution) {
        let available = |at: NaiveDateTime| {
            self.operator_manager.is_operator_available(
                &self.ledger,
                operator,
                &TimeWindow::starting_at(at, setup),
            )
        };
        if available(start) {
            return (start, OperatorResolution::Free);
        }

        let step = self.config.operator_probe_step();
        let slot = (0..self.config.operator_probe_count)
            .map(|k| start + step * k as i32)
            .find(|&at| available(at));

        let resolved = match slot {
            Some(at) if first || !has_pieces => (at, OperatorResolution::ShiftStart { to: at }),
            Some(_) => (start, OperatorResolution::KeepPipelinedStart),
            None => {
                let to = start + self.config.operator_fallback_delay();
                (to, OperatorResolution::Delayed { to })
            }
        };
        tracing::debug!(operator, from = %start, resolution = %resolved.1, "operator not available");
        resolved
    }

    /// Computes timing and moves it to the next machine gap until its machine
    /// window overlaps no committed reservation.
    #[allow(clippy::too_many_arguments)]
    fn settle_timing(
        &self,
        operation: &OperationDefinition,
        order: &Order,
        batch_qty: u32,
        machine: &str,
        operator: &str,
        start: NaiveDateTime,
        flow: &BatchFlow,
    ) -> Result<OperationTiming> {
        let ledger = &self.ledger;
        let selector = self.machine_selector.as_ref();
        let machine_available =
            |m: &str, t: NaiveDateTime| selector.earliest_free_time(ledger, m, t);

        let mut start = start;
        for _ in 0..MAX_SETTLE_ROUNDS {
            let request = TimingRequest {
                operation,
                order,
                batch_qty,
                machine,
                operator,
                setup_start: start,
                previous_piece_completion_times: flow.pieces.as_deref(),
                previous_run_end: flow.run_end,
            };
            let timing = self
                .timing
                .calculate_operation_timing(&request, &machine_available)
                .map_err(|err| ScheduleError::operation(operation.operation_seq, err))?;

            let window = timing.machine_window();
            let Some(blocking) = ledger.machine_overlap(machine, &window) else {
                return Ok(timing);
            };
            let next = ledger.earliest_machine_gap(machine, timing.setup_start, window.duration());
            tracing::debug!(
                seq = operation.operation_seq,
                machine,
                blocking = %blocking,
                from = %timing.setup_start,
                to = %next,
                "machine window overlaps, shifting"
            );
            start = next;
        }
        Err(ScheduleError::operation(
            operation.operation_seq,
            format!("no clear window on {machine} after {MAX_SETTLE_ROUNDS} attempts"),
        ))
    }
}

fn joined(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(|e| e.message.as_str())
        .collect::<Vec<_>>()
        .join("; ")
}

impl fmt::Debug for SchedulingEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SchedulingEngine")
            .field("config", &self.config)
            .field("now", &self.now)
            .field("reservations", &self.ledger.reservation_count())
            .field("alerts", &self.alerts.len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::InMemoryCatalog;
    use crate::machines::{usable_machines, MachineProposal};
    use crate::models::ShiftWindow;
    use chrono::NaiveDate;

    fn at(day: u32, h: u32, m: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 3, day)
            .unwrap()
            .and_hms_opt(h, m, 0)
            .unwrap()
    }

    fn now() -> NaiveDateTime {
        at(3, 8, 0)
    }

    fn op(seq: u32, machines: &[&str]) -> OperationDefinition {
        OperationDefinition::new("P1", seq, format!("Op {seq}"))
            .with_setup_time(30.0)
            .with_cycle_time(1.0)
            .with_eligible_machines(machines.iter().copied())
    }

    fn order(qty: u32) -> Order {
        Order::new("P1", qty, at(10, 17, 0))
    }

    fn config(pool: &[&str]) -> SchedulerConfig {
        SchedulerConfig::default().with_operator_pool(pool.iter().copied())
    }

    fn engine(ops: Vec<OperationDefinition>, config: SchedulerConfig) -> SchedulingEngine {
        SchedulingEngine::new(InMemoryCatalog::new(ops), config, now()).unwrap()
    }

    /// Always proposes the first eligible machine at the requested start.
    #[derive(Debug)]
    struct FirstEligibleSelector;

    impl MachineSelector for FirstEligibleSelector {
        fn select_optimal_machine(
            &self,
            _ledger: &ResourceLedger,
            operation: &OperationDefinition,
            _order: &Order,
            setup_start: NaiveDateTime,
            _run_end_hint: Option<NaiveDateTime>,
            _context: &MachineContext<'_>,
        ) -> Result<MachineProposal> {
            let machine = operation
                .eligible_machines
                .first()
                .cloned()
                .ok_or_else(|| ScheduleError::operation(operation.operation_seq, "no machines"))?;
            Ok(MachineProposal {
                machine,
                actual_setup_start: setup_start,
                actual_setup_end: setup_start + operation.setup_duration(),
            })
        }

        fn usable_machines(
            &self,
            operation: &OperationDefinition,
            order: &Order,
            window: &TimeWindow,
        ) -> Vec<String> {
            usable_machines(operation, order, &[], &[], window)
        }
    }

    fn busy_machine(machine: &str, start: NaiveDateTime, end: NaiveDateTime) -> ResourceLedger {
        let mut ledger = ResourceLedger::new();
        ledger
            .reserve_machine(machine, TimeWindow::new(start, end))
            .unwrap();
        ledger
    }

    #[test]
    fn test_single_operation_timing() {
        let mut engine = engine(vec![op(1, &["M1", "M2"])], config(&["A"]));
        let rows = engine.schedule_order(&order(10)).unwrap();
        assert_eq!(rows.len(), 1);
        let row = &rows[0];
        assert_eq!(row.machine, "M1");
        assert_eq!(row.operator, "A");
        assert_eq!(row.setup_start, now());
        assert_eq!(row.setup_end, at(3, 8, 30));
        assert_eq!(row.run_end, at(3, 8, 40));
        assert_eq!(row.timing, "40M");
        assert_eq!(row.piece_completion_times.len(), 10);
        assert_eq!(engine.ledger().machine_reservations("M1"), &[row.machine_window()]);
        assert_eq!(engine.ledger().operator_reservations("A"), &[row.operator_window()]);
    }

    #[test]
    fn test_conflict_switches_to_alternate_machine() {
        let mut engine = engine(vec![op(1, &["M1", "M2"])], config(&["A"]))
            .with_machine_selector(FirstEligibleSelector)
            .with_ledger(busy_machine("M1", at(3, 7, 0), at(3, 12, 0)));
        let rows = engine.schedule_order(&order(10)).unwrap();
        assert_eq!(rows[0].machine, "M2");
        assert_eq!(rows[0].setup_start, now());
    }

    #[test]
    fn test_conflict_waits_within_horizon() {
        let mut engine = engine(vec![op(1, &["M1"])], config(&["A"]))
            .with_machine_selector(FirstEligibleSelector)
            .with_ledger(busy_machine("M1", at(3, 7, 0), at(3, 12, 0)));
        let rows = engine.schedule_order(&order(10)).unwrap();
        assert_eq!(rows[0].machine, "M1");
        assert_eq!(rows[0].setup_start, at(3, 12, 0));
        assert_eq!(rows[0].run_end, at(3, 12, 40));
    }

    #[test]
    fn test_conflict_best_effort_beyond_horizon() {
        let mut engine = engine(vec![op(1, &["M1"])], config(&["A"]))
            .with_machine_selector(FirstEligibleSelector)
            .with_ledger(busy_machine("M1", at(3, 7, 0), at(4, 10, 0)));
        let rows = engine.schedule_order(&order(10)).unwrap();
        assert_eq!(rows[0].setup_start, at(4, 10, 1));
    }

    #[test]
    fn test_busy_batch_operator_replaced_by_free_one() {
        let mut ledger = ResourceLedger::new();
        ledger
            .reserve_operator("A", TimeWindow::new(at(3, 7, 30), at(3, 9, 0)))
            .unwrap();
        ledger
            .reserve_operator("B", TimeWindow::new(at(3, 1, 0), at(3, 3, 0)))
            .unwrap();
        let mut engine = engine(vec![op(1, &["M1"])], config(&["A", "B", "C"])).with_ledger(ledger);
        let rows = engine.schedule_order(&order(10)).unwrap();
        // B is free but has 120 booked minutes; C has none.
        assert_eq!(rows[0].operator, "C");
        assert_eq!(rows[0].setup_start, now());
    }

    #[test]
    fn test_operator_shift_moves_first_operation() {
        let config = config(&["A"]).with_operator_shift("A", ShiftWindow::from_hours(10, 22).unwrap());
        let mut engine = engine(vec![op(1, &["M1"]).with_setup_time(60.0)], config);
        let rows = engine.schedule_order(&order(10)).unwrap();
        assert_eq!(rows[0].setup_start, at(3, 10, 0));
        assert_eq!(rows[0].setup_end, at(3, 11, 0));
    }

    #[test]
    fn test_pipelined_start_kept_despite_busy_operator() {
        let mut ledger = ResourceLedger::new();
        ledger
            .reserve_operator("A", TimeWindow::new(at(3, 9, 0), at(3, 9, 30)))
            .unwrap();
        let ops = vec![op(1, &["M1"]).with_setup_time(60.0), op(2, &["M2"])];
        let mut engine = engine(ops, config(&["A"])).with_ledger(ledger);
        let rows = engine.schedule_order(&order(10)).unwrap();

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].piece_completion_times[0], at(3, 9, 1));
        assert_eq!(rows[1].setup_start, at(3, 9, 1));
        assert_eq!(rows[1].operator, "A");
        // The second setup could not be booked for A.
        assert_eq!(engine.ledger().operator_reservations("A").len(), 2);
    }

    #[test]
    fn test_operator_never_free_delays_by_a_day() {
        let mut ledger = ResourceLedger::new();
        ledger
            .reserve_operator("A", TimeWindow::new(at(3, 7, 0), at(4, 12, 0)))
            .unwrap();
        let mut engine = engine(vec![op(1, &["M1"])], config(&["A"])).with_ledger(ledger);
        let rows = engine.schedule_order(&order(10)).unwrap();
        assert_eq!(rows[0].setup_start, at(4, 8, 0));
    }

    #[test]
    fn test_shifted_start_settles_to_next_machine_gap() {
        // Free at 8:00, but the operator only starts at 10:00 and M1 is
        // booked 10:20-11:00.
        let config = config(&["A"]).with_operator_shift("A", ShiftWindow::from_hours(10, 22).unwrap());
        let mut engine = engine(vec![op(1, &["M1"]).with_setup_time(60.0)], config)
            .with_ledger(busy_machine("M1", at(3, 10, 20), at(3, 11, 0)));
        let rows = engine.schedule_order(&order(10)).unwrap();
        assert_eq!(rows[0].setup_start, at(3, 11, 0));
        assert_eq!(rows[0].run_end, at(3, 12, 10));
        assert_eq!(engine.ledger().machine_reservations("M1").len(), 2);
    }

    #[test]
    fn test_start_date_in_future_is_honoured() {
        let mut engine = engine(vec![op(1, &["M1"])], config(&["A"]));
        let rows = engine
            .schedule_order(&order(10).with_start_date(at(4, 6, 0)))
            .unwrap();
        assert_eq!(rows[0].setup_start, at(4, 6, 0));

        let rows = engine
            .schedule_order(&order(10).with_start_date(at(1, 6, 0)))
            .unwrap();
        assert!(rows[0].setup_start >= now());
    }

    #[test]
    fn test_default_setup_window_moves_night_start() {
        let mut engine = engine(vec![op(1, &["M1"])], config(&["A"]));
        let rows = engine
            .schedule_order(&order(10).with_start_date(at(4, 23, 0)))
            .unwrap();
        assert_eq!(rows[0].setup_start, at(5, 6, 0));
    }

    #[test]
    fn test_operator_free_only_after_last_probe_delays_a_day() {
        // A is busy until 08:45 next day; probing 09:01 + 0..23 h finds
        // nothing, so the pipelined operation is pushed by a full day.
        let mut ledger = ResourceLedger::new();
        ledger
            .reserve_operator("A", TimeWindow::new(at(3, 9, 0), at(4, 8, 45)))
            .unwrap();
        let ops = vec![op(1, &["M1"]).with_setup_time(60.0), op(2, &["M2"])];
        let mut engine = engine(ops, config(&["A"])).with_ledger(ledger);
        let rows = engine.schedule_order(&order(10)).unwrap();

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].piece_completion_times[0], at(3, 9, 1));
        assert_eq!(rows[1].setup_start, at(4, 9, 1));
        assert_eq!(engine.ledger().operator_reservations("A").len(), 3);
    }

    #[test]
    fn test_operator_rechecked_after_machine_settle() {
        // A is free at 09:00, but M1 only frees at 10:00 where A is busy
        // again; the setup moves on to A's next free probe.
        let mut ledger = busy_machine("M1", at(3, 9, 0), at(3, 10, 0));
        ledger
            .reserve_operator("A", TimeWindow::new(at(3, 8, 0), at(3, 8, 30)))
            .unwrap();
        ledger
            .reserve_operator("A", TimeWindow::new(at(3, 10, 0), at(3, 10, 30)))
            .unwrap();
        let mut engine = engine(vec![op(1, &["M1"])], config(&["A"])).with_ledger(ledger);
        let rows = engine.schedule_order(&order(10)).unwrap();

        let row = &rows[0];
        assert_eq!(row.operator, "A");
        assert_eq!(row.setup_start, at(3, 11, 0));
        let booked = engine.ledger().operator_reservations("A");
        assert_eq!(booked.len(), 3);
        assert!(booked.contains(&row.operator_window()));
        assert!(validation::audit_ledger(engine.ledger()).is_empty());
    }

    #[test]
    fn test_invalid_orders_are_errors() {
        let mut engine = engine(vec![op(1, &["M1"])], config(&["A"]));
        assert!(matches!(
            engine.schedule_order(&order(0)),
            Err(ScheduleError::InvalidOrder { .. })
        ));
        assert!(matches!(
            engine.schedule_order(&Order::new("Unknown", 5, at(10, 0, 0))),
            Err(ScheduleError::InvalidOrder { .. })
        ));
        assert!(matches!(
            engine.schedule_order(&Order::new("P9", 5, at(10, 0, 0))),
            Err(ScheduleError::NoOperations { .. })
        ));
        assert_eq!(engine.ledger().reservation_count(), 0);
    }

    #[test]
    fn test_failed_operation_adds_alert_and_continues() {
        let ops = vec![op(1, &["M1"]).with_setup_time(0.0), op(2, &["M2"])];
        let mut engine = engine(ops, config(&["A"]));
        let rows = engine.schedule_order(&order(10)).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].operation_seq, 2);
        assert_eq!(rows[0].setup_start, now());
        let alerts = engine.take_alerts();
        assert_eq!(alerts.len(), 1);
        assert!(alerts[0].starts_with("Error scheduling P1 batch B01 operation 1"));
        assert!(engine.alerts().is_empty());
    }

    #[test]
    fn test_round_robin_batch_operators() {
        let engine = engine(vec![op(1, &["M1"])], config(&["A", "B"]));
        let batches = Batch::from_sizes([10, 10, 10]);
        let mapping = engine.assign_persons_to_batches(&batches);
        assert_eq!(mapping["B01"], "A");
        assert_eq!(mapping["B02"], "B");
        assert_eq!(mapping["B03"], "A");

        let preset = vec![Batch::new(0, 10).with_operator("Z")];
        assert_eq!(engine.assign_persons_to_batches(&preset)["B01"], "Z");
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = SchedulerConfig::default().with_operator_pool(Vec::<String>::new());
        let err = SchedulingEngine::new(InMemoryCatalog::new(Vec::new()), config, now()).unwrap_err();
        assert!(matches!(err, ScheduleError::InvalidConfig(_)));
    }
}
