//! Rule engine for multi-criteria order sequencing.
//!
//! Composes dispatching rules lexicographically: the first rule decides,
//! later rules only break ties. Sorting is stable, so orders that tie on
//! every rule keep their input order.
//!
//! # Reference
//! Haupt (1989), "A Survey of Priority Rule-Based Scheduling"

use std::sync::Arc;

use super::rules;
use super::{DispatchingRule, RuleScore};
use crate::models::Order;

/// A composable rule engine for order prioritisation.
///
/// # Example
/// ```
/// use shop_schedule::dispatching::{rules, RuleEngine};
///
/// let engine = RuleEngine::new()
///     .with_rule(rules::Edd)
///     .with_tie_breaker(rules::PriorityWeight);
/// assert_eq!(engine.rule_names(), vec!["EDD", "PRIORITY"]);
/// ```
#[derive(Clone)]
pub struct RuleEngine {
    rules: Vec<Arc<dyn DispatchingRule>>,
}

impl RuleEngine {
    /// Creates an empty rule engine.
    pub fn new() -> Self {
        Self { rules: Vec::new() }
    }

    /// Due date first, priority weight on ties.
    pub fn edd_then_priority() -> Self {
        Self::new()
            .with_rule(rules::Edd)
            .with_tie_breaker(rules::PriorityWeight)
    }

    /// Adds a primary rule.
    pub fn with_rule<R: DispatchingRule + 'static>(mut self, rule: R) -> Self {
        self.rules.push(Arc::new(rule));
        self
    }

    /// Adds a rule consulted only when all earlier rules tie.
    pub fn with_tie_breaker<R: DispatchingRule + 'static>(self, rule: R) -> Self {
        self.with_rule(rule)
    }

    /// Rule names in evaluation order.
    pub fn rule_names(&self) -> Vec<&'static str> {
        self.rules.iter().map(|r| r.name()).collect()
    }

    /// Sorts orders by priority (highest priority first).
    ///
    /// Returns indices into the original slice. Full ties keep input order.
    pub fn sort_indices(&self, orders: &[Order]) -> Vec<usize> {
        let scores: Vec<Vec<RuleScore>> = orders.iter().map(|o| self.evaluate(o)).collect();
        let mut indices: Vec<usize> = (0..orders.len()).collect();
        indices.sort_by(|&a, &b| scores[a].cmp(&scores[b]));
        indices
    }

    /// Returns the index of the highest-priority order.
    pub fn select_best(&self, orders: &[Order]) -> Option<usize> {
        self.sort_indices(orders).first().copied()
    }

    /// Evaluates a single order and returns scores from each rule.
    pub fn evaluate(&self, order: &Order) -> Vec<RuleScore> {
        self.rules.iter().map(|r| r.evaluate(order)).collect()
    }
}

impl Default for RuleEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for RuleEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RuleEngine")
            .field("rules", &self.rule_names())
            .finish()
    }
}
