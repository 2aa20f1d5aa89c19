//! Batch splitting.
//!
//! An order's quantity is cut into batches that flow through the routing
//! independently, so that later batches can start on other machines while
//! earlier ones are still running.
//!
//! # Rules ([`RuleBasedBatchProcessor`])
//!
//! | Mode | Quantity | Batches |
//! |------|----------|---------|
//! | `Fixed` | any | 1 |
//! | `Custom` | any | chunks of `custom_batch_size` (default 300), last one smaller |
//! | `AutoSplit` | ≤ 250 | 1 |
//! | `AutoSplit` | 251–500 | 2 halves, larger first |
//! | `AutoSplit` | 501–1000 | 3 if High/Urgent, else 3 when `q % 3 < q % 2`, else 2 |
//! | `AutoSplit` | > 1000 | `⌈q / 334⌉` if High/Urgent, else `⌈q / 500⌉` |
//!
//! Multi-batch auto splits are balanced: sizes differ by at most one piece and
//! the remainder goes to the first batches.

use chrono::NaiveDateTime;

use crate::models::{Batch, BatchMode, OperationDefinition, Priority};

/// Default chunk size for [`BatchMode::Custom`] without an explicit size.
pub const DEFAULT_CUSTOM_BATCH_SIZE: u32 = 300;

/// Inputs to a batch split.
#[derive(Debug, Clone)]
pub struct BatchRequest<'a> {
    pub quantity: u32,
    pub min_batch_size: u32,
    pub priority: Priority,
    pub due_date: NaiveDateTime,
    pub start_date: Option<NaiveDateTime>,
    pub batch_mode: BatchMode,
    pub custom_batch_size: Option<u32>,
    /// Routing of the part, for bottleneck-aware strategies.
    pub operations: &'a [OperationDefinition],
}

/// Splits an order's quantity into batches.
///
/// Implementations must return batches whose quantities sum exactly to the
/// requested quantity, with ids `B01`, `B02`, ... in order.
pub trait BatchProcessor {
    fn calculate_batch_splitting(&self, request: &BatchRequest<'_>) -> Vec<Batch>;
}

/// Quantity-driven splitting rules used on the shop floor.
///
/// # Example
/// ```
/// use chrono::NaiveDate;
/// use shop_schedule::batching::{BatchProcessor, BatchRequest, RuleBasedBatchProcessor};
/// use shop_schedule::models::{BatchMode, Priority};
///
/// let due = NaiveDate::from_ymd_opt(2025, 3, 10).unwrap().and_hms_opt(0, 0, 0).unwrap();
/// let request = BatchRequest {
///     quantity: 301,
///     min_batch_size: 1,
///     priority: Priority::Normal,
///     due_date: due,
///     start_date: None,
///     batch_mode: BatchMode::AutoSplit,
///     custom_batch_size: None,
///     operations: &[],
/// };
/// let batches = RuleBasedBatchProcessor::default().calculate_batch_splitting(&request);
/// let sizes: Vec<u32> = batches.iter().map(|b| b.quantity).collect();
/// assert_eq!(sizes, vec![151, 150]);
/// ```
#[derive(Debug, Clone)]
pub struct RuleBasedBatchProcessor {
    /// Chunk size for custom mode when the order gives none.
    pub default_custom_size: u32,
}

impl Default for RuleBasedBatchProcessor {
    fn default() -> Self {
        Self {
            default_custom_size: DEFAULT_CUSTOM_BATCH_SIZE,
        }
    }
}

impl RuleBasedBatchProcessor {
    pub fn new() -> Self {
        Self::default()
    }

    fn auto_split(quantity: u32, priority: Priority) -> Vec<u32> {
        if quantity <= 250 {
            return vec![quantity];
        }
        if quantity <= 500 {
            let first = quantity.div_ceil(2);
            return vec![first, quantity - first];
        }
        let count = if quantity <= 1000 {
            if priority.is_expedited() || quantity % 3 < quantity % 2 {
                3
            } else {
                2
            }
        } else if priority.is_expedited() {
            quantity.div_ceil(334)
        } else {
            quantity.div_ceil(500)
        };
        balanced(quantity, count)
    }

    fn custom_split(quantity: u32, size: u32) -> Vec<u32> {
        let mut sizes = Vec::with_capacity(quantity.div_ceil(size) as usize);
        let mut remaining = quantity;
        while remaining > 0 {
            let chunk = size.min(remaining);
            sizes.push(chunk);
            remaining -= chunk;
        }
        sizes
    }
}

impl BatchProcessor for RuleBasedBatchProcessor {
    fn calculate_batch_splitting(&self, request: &BatchRequest<'_>) -> Vec<Batch> {
        let effective_min = effective_min_batch_size(request.min_batch_size, request.operations);
        let sizes = match request.batch_mode {
            BatchMode::Fixed => vec![request.quantity],
            BatchMode::Custom => {
                let size = request
                    .custom_batch_size
                    .filter(|s| *s > 0)
                    .unwrap_or(self.default_custom_size)
                    .max(1);
                Self::custom_split(request.quantity, size)
            }
            BatchMode::AutoSplit => Self::auto_split(request.quantity, request.priority),
        };

        tracing::debug!(
            quantity = request.quantity,
            mode = ?request.batch_mode,
            priority = %request.priority,
            effective_min,
            batches = sizes.len(),
            "batch split"
        );
        Batch::from_sizes(sizes)
    }
}

/// `count` sizes summing to `quantity`, differing by at most one, larger first.
pub fn balanced(quantity: u32, count: u32) -> Vec<u32> {
    let count = count.max(1);
    let base = quantity / count;
    let remainder = quantity % count;
    (0..count)
        .map(|i| base + u32::from(i < remainder))
        .collect()
}

/// Minimum batch size after considering the routing's bottleneck.
///
/// A bottleneck cycle above 10 minutes raises the minimum to at least 50.
pub fn effective_min_batch_size(min_batch_size: u32, operations: &[OperationDefinition]) -> u32 {
    let bottleneck = operations
        .iter()
        .map(|op| op.cycle_time_min)
        .fold(0.0_f64, f64::max);
    if bottleneck > 10.0 {
        min_batch_size.max(50)
    } else {
        min_batch_size
    }
}
