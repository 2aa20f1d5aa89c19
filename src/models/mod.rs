//! Scheduling domain models.
//!
//! Provides the data types flowing through a run: orders in, batches and
//! operation assignments out.
//!
//! # Domain Mappings
//!
//! | shop-schedule | Shop floor | Generic scheduling |
//! |---------------|-----------|--------------------|
//! | Order | Customer/production order | Job |
//! | OperationDefinition | Routing step | Activity |
//! | Batch | Transfer lot | Sub-job |
//! | OperationAssignment | Dispatch list line | Assignment |
//! | ScheduleRun | Production plan | Schedule |

mod batch;
mod calendar;
mod operation;
mod order;
mod schedule;

pub use batch::Batch;
pub use calendar::{ShiftWindow, TimeWindow};
pub use operation::{minutes, OperationDefinition};
pub use order::{BatchMode, BreakdownWindow, OperationSeqFilter, Order, Priority};
pub use schedule::{
    format_duration, AssignmentStatus, OperationAssignment, RunSummary, ScheduleRun,
};
