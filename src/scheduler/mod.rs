//! Greedy scheduling engine, run entry point and KPI evaluation.
//!
//! # Algorithm
//!
//! [`SchedulingEngine`] uses a greedy, due-date-driven, first-fit
//! heuristic with piece-level pipelining between the operations of a batch.
//! It is not optimal, but it is fast and fully deterministic: identical
//! inputs and the same `now` produce identical rows.
//!
//! # KPI
//!
//! [`ScheduleKpi`] computes makespan, tardiness, on-time rate and machine
//! utilization from emitted rows.
//!
//! # References
//!
//! - Pinedo (2016), "Scheduling: Theory, Algorithms, and Systems", Ch. 3-4
//! - Baker & Trietsch (2019), "Principles of Sequencing and Scheduling"

mod engine;
mod kpi;
mod resolution;
mod runner;

pub use engine::SchedulingEngine;
pub use kpi::ScheduleKpi;
pub use resolution::{MachineResolution, OperatorResolution};
pub use runner::run_scheduling;
