//! Input validation and reservation audits.
//!
//! Checks structural integrity of orders, operation definitions and batch
//! splits before scheduling, collecting every problem instead of stopping
//! at the first. Detects:
//! - Missing or placeholder part numbers
//! - Zero quantities
//! - Duplicate operation sequences and batch ids
//! - Non-positive setup or cycle times
//! - Batch splits that do not cover the order quantity
//!
//! [`audit_ledger`] re-checks committed reservations for overlaps after a run.

use std::collections::HashSet;

use serde::Serialize;

use crate::ledger::{ResourceKind, ResourceLedger};
use crate::models::{Batch, OperationDefinition, Order, TimeWindow};

/// Part number used by upstream systems for "not resolved".
pub const UNKNOWN_PART: &str = "Unknown";

/// Validation result.
pub type ValidationResult = Result<(), Vec<ValidationError>>;

/// A validation error.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationError {
    /// Error category.
    pub kind: ValidationErrorKind,
    /// Human-readable description.
    pub message: String,
}

/// Categories of validation errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationErrorKind {
    /// Part number empty or the `Unknown` placeholder.
    MissingPartNumber,
    /// Order quantity is zero.
    InvalidQuantity,
    /// Two entities share the same ID.
    DuplicateId,
    /// Operation sequence number is zero.
    InvalidSequence,
    /// Setup or cycle time is not a positive number.
    InvalidTime,
    /// A batch split is empty or contains an empty batch.
    EmptyBatch,
    /// Batch quantities do not add up to the order quantity.
    QuantityMismatch,
}

impl ValidationError {
    fn new(kind: ValidationErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.message)
    }
}

fn finish(errors: Vec<ValidationError>) -> ValidationResult {
    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Validates a single order.
///
/// # Example
/// ```
/// use chrono::NaiveDate;
/// use shop_schedule::models::Order;
/// use shop_schedule::validation::{validate_order, ValidationErrorKind};
///
/// let due = NaiveDate::from_ymd_opt(2025, 3, 10).unwrap().and_hms_opt(0, 0, 0).unwrap();
/// assert!(validate_order(&Order::new("P1", 5, due)).is_ok());
///
/// let errors = validate_order(&Order::new("Unknown", 0, due)).unwrap_err();
/// assert_eq!(errors.len(), 2);
/// assert_eq!(errors[1].kind, ValidationErrorKind::InvalidQuantity);
/// ```
pub fn validate_order(order: &Order) -> ValidationResult {
    let mut errors = Vec::new();
    check_order(order, &mut errors);
    finish(errors)
}

fn check_order(order: &Order, errors: &mut Vec<ValidationError>) {
    let part = order.part_number.trim();
    if part.is_empty() {
        errors.push(ValidationError::new(
            ValidationErrorKind::MissingPartNumber,
            "missing part number",
        ));
    } else if part == UNKNOWN_PART {
        errors.push(ValidationError::new(
            ValidationErrorKind::MissingPartNumber,
            "part number is 'Unknown'",
        ));
    }
    if order.quantity == 0 {
        errors.push(ValidationError::new(
            ValidationErrorKind::InvalidQuantity,
            format!("invalid quantity {}", order.quantity),
        ));
    }
}

/// Validates an order book. Messages are prefixed with the order position.
pub fn validate_orders(orders: &[Order]) -> ValidationResult {
    let mut errors = Vec::new();
    for (index, order) in orders.iter().enumerate() {
        let mut found = Vec::new();
        check_order(order, &mut found);
        errors.extend(found.into_iter().map(|e| ValidationError {
            message: format!("order #{index} ({}): {}", order.part_number, e.message),
            ..e
        }));
    }
    finish(errors)
}

/// Validates operation definitions.
///
/// Checks:
/// 1. Part number present
/// 2. Sequence numbers positive and unique per part
/// 3. Setup and cycle times positive and finite
pub fn validate_operations(operations: &[OperationDefinition]) -> ValidationResult {
    let mut errors = Vec::new();
    let mut seen: HashSet<(&str, u32)> = HashSet::new();

    for op in operations {
        if op.part_number.trim().is_empty() {
            errors.push(ValidationError::new(
                ValidationErrorKind::MissingPartNumber,
                format!("operation {} has no part number", op.operation_seq),
            ));
        }
        if op.operation_seq == 0 {
            errors.push(ValidationError::new(
                ValidationErrorKind::InvalidSequence,
                format!("part '{}': operation sequence must start at 1", op.part_number),
            ));
        }
        if !seen.insert((op.part_number.as_str(), op.operation_seq)) {
            errors.push(ValidationError::new(
                ValidationErrorKind::DuplicateId,
                format!(
                    "part '{}': duplicate operation {}",
                    op.part_number, op.operation_seq
                ),
            ));
        }
        if !op.has_valid_times() {
            errors.push(ValidationError::new(
                ValidationErrorKind::InvalidTime,
                format!(
                    "part '{}' operation {}: setup {} / cycle {} min",
                    op.part_number, op.operation_seq, op.setup_time_min, op.cycle_time_min
                ),
            ));
        }
    }

    finish(errors)
}

/// Validates a batch split of an order of `quantity` pieces.
pub fn validate_batches(batches: &[Batch], quantity: u32) -> ValidationResult {
    let mut errors = Vec::new();
    if batches.is_empty() {
        errors.push(ValidationError::new(
            ValidationErrorKind::EmptyBatch,
            "no batches",
        ));
        return finish(errors);
    }

    let mut ids = HashSet::new();
    for batch in batches {
        if !ids.insert(batch.batch_id.as_str()) {
            errors.push(ValidationError::new(
                ValidationErrorKind::DuplicateId,
                format!("duplicate batch id {}", batch.batch_id),
            ));
        }
        if batch.quantity == 0 {
            errors.push(ValidationError::new(
                ValidationErrorKind::EmptyBatch,
                format!("batch {} is empty", batch.batch_id),
            ));
        }
    }

    let total: u64 = batches.iter().map(|b| u64::from(b.quantity)).sum();
    if total != u64::from(quantity) {
        errors.push(ValidationError::new(
            ValidationErrorKind::QuantityMismatch,
            format!("batches total {total}, order quantity {quantity}"),
        ));
    }

    finish(errors)
}

/// Two committed windows of one resource that overlap.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Overlap {
    pub kind: ResourceKind,
    pub owner: String,
    pub first: TimeWindow,
    pub second: TimeWindow,
}

/// Lists every overlapping pair of reservations in both tables.
///
/// An empty result means no machine or operator is double-booked.
pub fn audit_ledger(ledger: &ResourceLedger) -> Vec<Overlap> {
    let mut overlaps = Vec::new();
    for kind in [ResourceKind::Machine, ResourceKind::Operator] {
        for (owner, windows) in ledger.reservations(kind) {
            overlaps.extend(audit_windows(windows).into_iter().map(|(first, second)| Overlap {
                kind,
                owner: owner.to_string(),
                first,
                second,
            }));
        }
    }
    overlaps
}

/// Overlapping pairs among `windows`, in start order.
pub fn audit_windows(windows: &[TimeWindow]) -> Vec<(TimeWindow, TimeWindow)> {
    let mut sorted = windows.to_vec();
    sorted.sort();
    let mut pairs = Vec::new();
    for (i, a) in sorted.iter().enumerate() {
        for b in &sorted[i + 1..] {
            if b.start >= a.end {
                break;
            }
            if a.overlaps(b) {
                pairs.push((*a, *b));
            }
        }
    }
    pairs
}
