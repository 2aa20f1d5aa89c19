//! Operation timing with piece-level flow.
//!
//! # Model
//!
//! ```text
//! setup_start ──setup──▶ setup_end = run_start ──piece 1──▶ … ──piece n──▶ run_end
//! ```
//!
//! Pieces move to the next operation one by one. The next operation's setup
//! may begin as soon as the first piece of the previous one is ready, and
//! each of its pieces starts no earlier than the matching piece upstream:
//!
//! `piece[i].start = max(piece[i-1].end, upstream[i])`, `piece[i].end = piece[i].start + cycle`.
//!
//! # Setup window
//! When a setup window applies (order override, else plant-wide), the setup
//! start is moved into it with [`ShiftWindow::fit_setup`].

use chrono::NaiveDateTime;

use crate::error::{Result, ScheduleError};
use crate::models::{OperationDefinition, Order, ShiftWindow, TimeWindow};

/// Inputs to a timing calculation.
#[derive(Debug, Clone, Copy)]
pub struct TimingRequest<'a> {
    pub operation: &'a OperationDefinition,
    pub order: &'a Order,
    pub batch_qty: u32,
    pub machine: &'a str,
    pub operator: &'a str,
    /// Earliest setup start already agreed with machine and operator.
    pub setup_start: NaiveDateTime,
    /// Upstream piece completions of the same batch, if any.
    pub previous_piece_completion_times: Option<&'a [NaiveDateTime]>,
    pub previous_run_end: Option<NaiveDateTime>,
}

/// Resolved timing of one operation of one batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperationTiming {
    pub setup_start: NaiveDateTime,
    pub setup_end: NaiveDateTime,
    pub run_start: NaiveDateTime,
    pub run_end: NaiveDateTime,
    pub piece_completion_times: Vec<NaiveDateTime>,
}

impl OperationTiming {
    /// Machine occupation `[setup_start, run_end)`.
    pub fn machine_window(&self) -> TimeWindow {
        TimeWindow::new(self.setup_start, self.run_end)
    }

    /// Operator occupation `[setup_start, setup_end)`.
    pub fn operator_window(&self) -> TimeWindow {
        TimeWindow::new(self.setup_start, self.setup_end)
    }

    /// Checks ordering and piece schedule shape.
    pub fn validate(&self, batch_qty: u32) -> Result<()> {
        if !(self.setup_start <= self.setup_end
            && self.setup_end <= self.run_start
            && self.run_start <= self.run_end)
        {
            return Err(ScheduleError::InvalidTiming(format!(
                "out of order: setup {} - {}, run {} - {}",
                self.setup_start, self.setup_end, self.run_start, self.run_end
            )));
        }
        if self.piece_completion_times.len() != batch_qty as usize {
            return Err(ScheduleError::InvalidTiming(format!(
                "{} piece times for batch of {}",
                self.piece_completion_times.len(),
                batch_qty
            )));
        }
        if self
            .piece_completion_times
            .windows(2)
            .any(|pair| pair[1] < pair[0])
        {
            return Err(ScheduleError::InvalidTiming(
                "piece completion times decrease".into(),
            ));
        }
        if self.piece_completion_times.last() != Some(&self.run_end) {
            return Err(ScheduleError::InvalidTiming(
                "run end differs from last piece".into(),
            ));
        }
        Ok(())
    }
}

/// Machine availability callback: first instant `>= t` the machine is free.
pub type MachineAvailability<'a> = &'a dyn Fn(&str, NaiveDateTime) -> NaiveDateTime;

/// Computes setup, run and per-piece timing.
pub trait TimingCalculator {
    fn calculate_operation_timing(
        &self,
        request: &TimingRequest<'_>,
        machine_available: MachineAvailability<'_>,
    ) -> Result<OperationTiming>;
}

/// Default piece-flow timing.
///
/// # Example
/// ```
/// use chrono::{Duration, NaiveDate};
/// use shop_schedule::models::{OperationDefinition, Order};
/// use shop_schedule::timing::{PieceFlowTimingCalculator, TimingCalculator, TimingRequest};
///
/// let t0 = NaiveDate::from_ymd_opt(2025, 3, 3).unwrap().and_hms_opt(8, 0, 0).unwrap();
/// let op = OperationDefinition::new("P1", 1, "Turn").with_setup_time(60.0).with_cycle_time(2.0);
/// let order = Order::new("P1", 100, t0 + Duration::days(2));
/// let request = TimingRequest {
///     operation: &op,
///     order: &order,
///     batch_qty: 100,
///     machine: "M1",
///     operator: "A",
///     setup_start: t0,
///     previous_piece_completion_times: None,
///     previous_run_end: None,
/// };
///
/// let timing = PieceFlowTimingCalculator::default()
///     .calculate_operation_timing(&request, &|_: &str, t| t)
///     .unwrap();
/// assert_eq!(timing.setup_end, t0 + Duration::minutes(60));
/// assert_eq!(timing.run_end, timing.setup_end + Duration::minutes(200));
/// assert_eq!(timing.piece_completion_times[0], timing.setup_end + Duration::minutes(2));
/// ```
#[derive(Debug, Clone, Default)]
pub struct PieceFlowTimingCalculator {
    setup_window: Option<ShiftWindow>,
}

impl PieceFlowTimingCalculator {
    pub fn new(setup_window: Option<ShiftWindow>) -> Self {
        Self { setup_window }
    }

    fn window_for(&self, order: &Order) -> Option<ShiftWindow> {
        order.setup_window.or(self.setup_window)
    }
}

impl TimingCalculator for PieceFlowTimingCalculator {
    fn calculate_operation_timing(
        &self,
        request: &TimingRequest<'_>,
        machine_available: MachineAvailability<'_>,
    ) -> Result<OperationTiming> {
        let op = request.operation;
        if request.batch_qty == 0 {
            return Err(ScheduleError::InvalidTiming("empty batch".into()));
        }
        if !op.has_valid_times() {
            return Err(ScheduleError::InvalidTiming(format!(
                "operation {} has setup {} / cycle {}",
                op.operation_seq, op.setup_time_min, op.cycle_time_min
            )));
        }

        let upstream = request
            .previous_piece_completion_times
            .filter(|pieces| !pieces.is_empty());

        let mut setup_start = request.setup_start;
        match (upstream, request.previous_run_end) {
            (Some(pieces), _) => setup_start = setup_start.max(pieces[0]),
            (None, Some(run_end)) => setup_start = setup_start.max(run_end),
            (None, None) => {}
        }

        let setup = op.setup_duration();
        if let Some(window) = self.window_for(request.order) {
            let fitted = window.fit_setup(setup_start, setup);
            if fitted != setup_start {
                tracing::debug!(
                    seq = op.operation_seq,
                    from = %setup_start,
                    to = %fitted,
                    "setup moved into setup window"
                );
            }
            setup_start = fitted;
        }
        let setup_end = setup_start + setup;
        let run_start = setup_end.max(machine_available(request.machine, setup_end));

        let cycle = op.cycle_duration();
        let mut pieces = Vec::with_capacity(request.batch_qty as usize);
        let mut machine_ready = run_start;
        for i in 0..request.batch_qty as usize {
            let start = match upstream.and_then(|p| p.get(i)) {
                Some(&ready) if i > 0 => machine_ready.max(ready),
                _ => machine_ready,
            };
            machine_ready = start + cycle;
            pieces.push(machine_ready);
        }
        let run_end = machine_ready;

        let timing = OperationTiming {
            setup_start,
            setup_end,
            run_start,
            run_end,
            piece_completion_times: pieces,
        };
        timing.validate(request.batch_qty)?;
        Ok(timing)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, NaiveDate};

    fn at(h: u32, m: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 3, 3)
            .unwrap()
            .and_hms_opt(h, m, 0)
            .unwrap()
    }

    fn request<'a>(
        op: &'a OperationDefinition,
        order: &'a Order,
        qty: u32,
        start: NaiveDateTime,
        upstream: Option<&'a [NaiveDateTime]>,
    ) -> TimingRequest<'a> {
        TimingRequest {
            operation: op,
            order,
            batch_qty: qty,
            machine: "M1",
            operator: "A",
            setup_start: start,
            previous_piece_completion_times: upstream,
            previous_run_end: None,
        }
    }

    fn free(_: &str, t: NaiveDateTime) -> NaiveDateTime {
        t
    }

    #[test]
    fn test_plain_timing() {
        let op = OperationDefinition::new("P1", 1, "Turn")
            .with_setup_time(30.0)
            .with_cycle_time(5.0);
        let order = Order::new("P1", 4, at(20, 0));
        let t = PieceFlowTimingCalculator::default()
            .calculate_operation_timing(&request(&op, &order, 4, at(8, 0), None), &free)
            .unwrap();
        assert_eq!(t.setup_end, at(8, 30));
        assert_eq!(t.run_start, at(8, 30));
        assert_eq!(
            t.piece_completion_times,
            vec![at(8, 35), at(8, 40), at(8, 45), at(8, 50)]
        );
        assert_eq!(t.run_end, at(8, 50));
    }

    #[test]
    fn test_pipelined_setup_and_slow_upstream() {
        // Upstream produces a piece every 10 minutes; downstream cycle is 2.
        let upstream = vec![at(9, 10), at(9, 20), at(9, 30)];
        let op = OperationDefinition::new("P1", 2, "Drill")
            .with_setup_time(5.0)
            .with_cycle_time(2.0);
        let order = Order::new("P1", 3, at(20, 0));
        let t = PieceFlowTimingCalculator::default()
            .calculate_operation_timing(&request(&op, &order, 3, at(8, 0), Some(&upstream)), &free)
            .unwrap();
        assert_eq!(t.setup_start, at(9, 10));
        assert_eq!(t.run_start, at(9, 15));
        assert_eq!(
            t.piece_completion_times,
            vec![at(9, 17), at(9, 22), at(9, 32)]
        );
    }

    #[test]
    fn test_previous_run_end_without_pieces() {
        let op = OperationDefinition::new("P1", 2, "Drill")
            .with_setup_time(5.0)
            .with_cycle_time(1.0);
        let order = Order::new("P1", 1, at(20, 0));
        let mut req = request(&op, &order, 1, at(8, 0), None);
        req.previous_run_end = Some(at(10, 0));
        let t = PieceFlowTimingCalculator::default()
            .calculate_operation_timing(&req, &free)
            .unwrap();
        assert_eq!(t.setup_start, at(10, 0));
    }

    #[test]
    fn test_run_waits_for_machine() {
        let op = OperationDefinition::new("P1", 1, "Turn")
            .with_setup_time(30.0)
            .with_cycle_time(1.0);
        let order = Order::new("P1", 2, at(20, 0));
        let busy_until_nine = |_: &str, t: NaiveDateTime| t.max(at(9, 0));
        let t = PieceFlowTimingCalculator::default()
            .calculate_operation_timing(&request(&op, &order, 2, at(8, 0), None), &busy_until_nine)
            .unwrap();
        assert_eq!(t.setup_end, at(8, 30));
        assert_eq!(t.run_start, at(9, 0));
        assert_eq!(t.run_end, at(9, 2));
    }

    #[test]
    fn test_setup_window_applied() {
        let op = OperationDefinition::new("P1", 1, "Turn")
            .with_setup_time(60.0)
            .with_cycle_time(1.0);
        let order = Order::new("P1", 1, at(20, 0));
        let calc = PieceFlowTimingCalculator::new(Some(ShiftWindow::from_hours(6, 22).unwrap()));
        let t = calc
            .calculate_operation_timing(&request(&op, &order, 1, at(3, 0), None), &free)
            .unwrap();
        assert_eq!(t.setup_start, at(6, 0));
        assert_eq!(t.setup_end - t.setup_start, Duration::minutes(60));

        // Order override wins.
        let order = order.with_setup_window(ShiftWindow::from_hours(7, 15).unwrap());
        let t = calc
            .calculate_operation_timing(&request(&op, &order, 1, at(3, 0), None), &free)
            .unwrap();
        assert_eq!(t.setup_start, at(7, 0));
    }

    #[test]
    fn test_zero_batch_rejected() {
        let op = OperationDefinition::new("P1", 1, "Turn");
        let order = Order::new("P1", 1, at(20, 0));
        let err = PieceFlowTimingCalculator::default()
            .calculate_operation_timing(&request(&op, &order, 0, at(8, 0), None), &free)
            .unwrap_err();
        assert!(matches!(err, ScheduleError::InvalidTiming(_)));
    }

    #[test]
    fn test_validate_catches_bad_shape() {
        let bad = OperationTiming {
            setup_start: at(9, 0),
            setup_end: at(8, 0),
            run_start: at(9, 0),
            run_end: at(10, 0),
            piece_completion_times: vec![at(10, 0)],
        };
        assert!(bad.validate(1).is_err());
        let short = OperationTiming {
            setup_start: at(8, 0),
            setup_end: at(9, 0),
            run_start: at(9, 0),
            run_end: at(10, 0),
            piece_completion_times: vec![at(10, 0)],
        };
        assert!(short.validate(2).is_err());
        assert!(short.validate(1).is_ok());
    }
}
