//! Batch and operation scheduling for machining shops.
//!
//! Turns manufacturing orders into a time-phased plan of machine and
//! operator assignments. Orders are split into batches, every batch runs
//! its routing in sequence, and consecutive operations overlap at piece
//! level: an operation may start its setup as soon as the first piece of
//! the previous one is ready.
//!
//! The engine is a greedy first-fit heuristic. It never double-books a
//! machine or an operator in its reservation ledger and is deterministic for
//! a given input and `now`.
//!
//! # Modules
//!
//! - **`models`**: Domain types: `Order`, `OperationDefinition`, `Batch`,
//!   `OperationAssignment`, `ScheduleRun`, `TimeWindow`, `ShiftWindow`
//! - **`dispatching`**: Order sequencing (EDD, priority weight)
//! - **`scheduler`**: `SchedulingEngine`, `run_scheduling`, `ScheduleKpi`
//! - **`ledger`**: Committed machine and operator reservations
//! - **`catalog`**, **`batching`**, **`machines`**, **`operators`**,
//!   **`timing`**: Collaborator traits with default implementations
//! - **`config`**: `SchedulerConfig`
//! - **`validation`**: Input checks and ledger audit
//!
//! # Example
//!
//! ```
//! use chrono::{Duration, NaiveDate};
//! use shop_schedule::catalog::InMemoryCatalog;
//! use shop_schedule::config::SchedulerConfig;
//! use shop_schedule::models::{OperationDefinition, Order};
//! use shop_schedule::run_scheduling;
//!
//! let now = NaiveDate::from_ymd_opt(2025, 3, 3).unwrap().and_hms_opt(8, 0, 0).unwrap();
//! let catalog = InMemoryCatalog::new(vec![
//!     OperationDefinition::new("P1", 1, "Turning")
//!         .with_setup_time(60.0)
//!         .with_cycle_time(2.0)
//!         .with_eligible_machines(["M1"]),
//!     OperationDefinition::new("P1", 2, "Milling")
//!         .with_setup_time(30.0)
//!         .with_cycle_time(3.0)
//!         .with_eligible_machines(["M2"]),
//! ]);
//!
//! let orders = vec![Order::new("P1", 50, now + Duration::days(3))];
//! let run = run_scheduling(&orders, catalog, SchedulerConfig::default(), now);
//!
//! assert_eq!(run.rows.len(), 2);
//! // Milling is set up as soon as the first turned piece is ready.
//! assert_eq!(run.rows[1].setup_start, run.rows[0].piece_completion_times[0]);
//! assert!(run.rows[1].setup_start < run.rows[0].run_end);
//! ```
//!
//! # References
//!
//! - Pinedo (2016), "Scheduling: Theory, Algorithms, and Systems"
//! - Baker & Trietsch (2019), "Principles of Sequencing and Scheduling"

pub mod batching;
pub mod catalog;
pub mod config;
pub mod dispatching;
pub mod error;
pub mod ledger;
pub mod machines;
pub mod models;
pub mod operators;
pub mod scheduler;
pub mod timing;
pub mod validation;

pub use config::SchedulerConfig;
pub use error::{Result, ScheduleError};
pub use scheduler::{run_scheduling, SchedulingEngine};
