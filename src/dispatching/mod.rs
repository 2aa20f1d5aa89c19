//! Order sequencing with dispatching rules.
//!
//! Orders are scheduled one after another in the order the sequencer
//! returns, so the sequence decides who gets first pick of machines and
//! operators.
//!
//! # Usage
//!
//! ```
//! use chrono::NaiveDate;
//! use shop_schedule::dispatching::{rules, sequence_orders, RuleEngine};
//! use shop_schedule::models::{Order, Priority};
//!
//! let day = |d| NaiveDate::from_ymd_opt(2025, 3, d).unwrap().and_hms_opt(17, 0, 0).unwrap();
//! let orders = vec![
//!     Order::new("LATE", 10, day(12)),
//!     Order::new("SOON", 10, day(10)),
//!     Order::new("SOON-URGENT", 10, day(10)).with_priority(Priority::Urgent),
//! ];
//!
//! let sequenced = sequence_orders(&orders);
//! let parts: Vec<&str> = sequenced.iter().map(|o| o.part_number.as_str()).collect();
//! assert_eq!(parts, ["SOON-URGENT", "SOON", "LATE"]);
//!
//! // Same thing, spelled out.
//! let engine = RuleEngine::new()
//!     .with_rule(rules::Edd)
//!     .with_tie_breaker(rules::PriorityWeight);
//! assert_eq!(engine.sort_indices(&orders), vec![2, 1, 0]);
//! ```
//!
//! # References
//!
//! - Pinedo (2016), "Scheduling: Theory, Algorithms, and Systems", Ch. 4
//! - Jackson (1955), EDD rule for minimising maximum lateness

mod engine;
pub mod rules;

pub use engine::RuleEngine;

use crate::models::Order;
use std::fmt::Debug;

/// Score returned by a dispatching rule.
///
/// Lower scores = higher priority (scheduled first).
pub type RuleScore = i64;

/// A dispatching rule that evaluates order priority.
///
/// # Score Convention
/// **Lower score = higher priority.**
pub trait DispatchingRule: Send + Sync + Debug {
    /// Rule name (e.g., "EDD").
    fn name(&self) -> &'static str;

    /// Evaluates the priority of an order.
    fn evaluate(&self, order: &Order) -> RuleScore;

    /// Rule description.
    fn description(&self) -> &'static str {
        self.name()
    }
}

/// Orders sorted by due date, then priority weight, then input order.
pub fn sequence_orders(orders: &[Order]) -> Vec<Order> {
    RuleEngine::edd_then_priority()
        .sort_indices(orders)
        .into_iter()
        .map(|i| orders[i].clone())
        .collect()
}
