//! Built-in order dispatching rules.
//!
//! # Score Convention
//! All rules return lower scores for orders that should go first.
//!
//! # References
//! - Pinedo (2016), "Scheduling: Theory, Algorithms, and Systems", Ch. 4
//! - Jackson (1955), "Scheduling a Production Line to Minimize Maximum Tardiness"

use super::{DispatchingRule, RuleScore};
use crate::models::Order;

/// Earliest Due Date.
///
/// Prioritizes orders with earlier due dates.
/// Minimizes maximum lateness on a single machine.
///
/// # Reference
/// Jackson (1955)
#[derive(Debug, Clone, Copy)]
pub struct Edd;

impl DispatchingRule for Edd {
    fn name(&self) -> &'static str {
        "EDD"
    }

    fn evaluate(&self, order: &Order) -> RuleScore {
        order.due_date.and_utc().timestamp_millis()
    }

    fn description(&self) -> &'static str {
        "Earliest Due Date"
    }
}

/// Priority class weight: Urgent > High > Normal > Low.
#[derive(Debug, Clone, Copy)]
pub struct PriorityWeight;

impl DispatchingRule for PriorityWeight {
    fn name(&self) -> &'static str {
        "PRIORITY"
    }

    fn evaluate(&self, order: &Order) -> RuleScore {
        -RuleScore::from(order.priority.weight())
    }

    fn description(&self) -> &'static str {
        "Priority class weight"
    }
}
