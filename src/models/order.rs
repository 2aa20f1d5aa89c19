//! Order model.
//!
//! An order is one request to produce `quantity` pieces of a part by a due
//! date. It is the unit the sequencer orders and the engine splits into
//! batches.

use std::collections::BTreeSet;
use std::fmt;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use super::{ShiftWindow, TimeWindow};

/// Order priority.
///
/// Used as the tie-breaker after due date and to decide how aggressively
/// large orders are split.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Priority {
    Urgent,
    High,
    #[default]
    Normal,
    Low,
}

impl Priority {
    /// Sequencing weight (higher = sooner among equal due dates).
    pub fn weight(self) -> u8 {
        match self {
            Priority::Urgent => 4,
            Priority::High => 3,
            Priority::Normal => 2,
            Priority::Low => 1,
        }
    }

    /// High and Urgent orders get smaller batches.
    pub fn is_expedited(self) -> bool {
        matches!(self, Priority::Urgent | Priority::High)
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Priority::Urgent => "Urgent",
            Priority::High => "High",
            Priority::Normal => "Normal",
            Priority::Low => "Low",
        };
        f.write_str(name)
    }
}

/// How an order's quantity is cut into batches.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BatchMode {
    /// Quantity-driven split rules.
    #[default]
    AutoSplit,
    /// Whole order as one batch.
    Fixed,
    /// Fixed-size chunks of `custom_batch_size`.
    Custom,
}

/// Which operation sequence numbers of the part to schedule.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum OperationSeqFilter {
    /// Every operation in the routing.
    #[default]
    All,
    /// Only the listed sequence numbers.
    Only(BTreeSet<u32>),
}

impl OperationSeqFilter {
    /// Whether `seq` passes the filter.
    pub fn matches(&self, seq: u32) -> bool {
        match self {
            OperationSeqFilter::All => true,
            OperationSeqFilter::Only(set) => set.contains(&seq),
        }
    }

    /// Parses `"All"`, `""`, `"2"` or `"1, 3"`. Unparseable tokens are ignored;
    /// a filter with no valid numbers means all operations.
    ///
    /// ```
    /// use shop_schedule::models::OperationSeqFilter;
    ///
    /// let f = OperationSeqFilter::parse("1, 3");
    /// assert!(f.matches(3));
    /// assert!(!f.matches(2));
    /// assert_eq!(OperationSeqFilter::parse("All"), OperationSeqFilter::All);
    /// ```
    pub fn parse(text: &str) -> Self {
        let text = text.trim();
        if text.is_empty() || text.eq_ignore_ascii_case("all") {
            return OperationSeqFilter::All;
        }
        let seqs: BTreeSet<u32> = text
            .split(',')
            .filter_map(|token| token.trim().parse().ok())
            .collect();
        if seqs.is_empty() {
            OperationSeqFilter::All
        } else {
            OperationSeqFilter::Only(seqs)
        }
    }
}

/// A machine that is down for this order, optionally only within a window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BreakdownWindow {
    /// Machine identifier.
    pub machine: String,
    /// Breakdown start. `None` = down since forever.
    pub start: Option<NaiveDateTime>,
    /// Breakdown end. `None` = down until further notice.
    pub end: Option<NaiveDateTime>,
}

impl BreakdownWindow {
    /// A breakdown with no time bounds.
    pub fn new(machine: impl Into<String>) -> Self {
        Self {
            machine: machine.into(),
            start: None,
            end: None,
        }
    }

    /// Restricts the breakdown to `[start, end)`.
    pub fn between(mut self, start: NaiveDateTime, end: NaiveDateTime) -> Self {
        self.start = Some(start);
        self.end = Some(end);
        self
    }

    /// Whether `machine` is unusable during `window`.
    pub fn blocks(&self, machine: &str, window: &TimeWindow) -> bool {
        if self.machine != machine {
            return false;
        }
        let after_start = self.start.map_or(true, |s| window.end > s);
        let before_end = self.end.map_or(true, |e| window.start < e);
        after_start && before_end
    }
}

/// A production order.
///
/// # Example
/// ```
/// use chrono::NaiveDate;
/// use shop_schedule::models::{BatchMode, Order, Priority};
///
/// let due = NaiveDate::from_ymd_opt(2025, 3, 10).unwrap().and_hms_opt(17, 0, 0).unwrap();
/// let order = Order::new("P-100", 400, due)
///     .with_priority(Priority::High)
///     .with_batch_mode(BatchMode::Custom)
///     .with_custom_batch_size(150);
///
/// assert_eq!(order.priority.weight(), 3);
/// assert_eq!(order.custom_batch_size, Some(150));
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    /// Part to produce.
    pub part_number: String,
    /// Pieces ordered.
    pub quantity: u32,
    /// Priority class.
    #[serde(default)]
    pub priority: Priority,
    /// Due date.
    pub due_date: NaiveDateTime,
    /// Earliest start for the first operation. `None` = engine's "now".
    #[serde(default)]
    pub start_date: Option<NaiveDateTime>,
    /// Operation sequence filter.
    #[serde(default)]
    pub operation_seq: OperationSeqFilter,
    /// Batch splitting mode.
    #[serde(default)]
    pub batch_mode: BatchMode,
    /// Chunk size for [`BatchMode::Custom`].
    #[serde(default)]
    pub custom_batch_size: Option<u32>,
    /// Machine known to be down for this order.
    #[serde(default)]
    pub breakdown: Option<BreakdownWindow>,
    /// Setup window override for this order.
    #[serde(default)]
    pub setup_window: Option<ShiftWindow>,
}

impl Order {
    /// Creates an order with default priority and auto-split batching.
    pub fn new(part_number: impl Into<String>, quantity: u32, due_date: NaiveDateTime) -> Self {
        Self {
            part_number: part_number.into(),
            quantity,
            priority: Priority::Normal,
            due_date,
            start_date: None,
            operation_seq: OperationSeqFilter::All,
            batch_mode: BatchMode::AutoSplit,
            custom_batch_size: None,
            breakdown: None,
            setup_window: None,
        }
    }

    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_start_date(mut self, start_date: NaiveDateTime) -> Self {
        self.start_date = Some(start_date);
        self
    }

    pub fn with_operation_seq(mut self, filter: OperationSeqFilter) -> Self {
        self.operation_seq = filter;
        self
    }

    pub fn with_batch_mode(mut self, mode: BatchMode) -> Self {
        self.batch_mode = mode;
        self
    }

    pub fn with_custom_batch_size(mut self, size: u32) -> Self {
        self.custom_batch_size = Some(size);
        self
    }

    pub fn with_breakdown(mut self, breakdown: BreakdownWindow) -> Self {
        self.breakdown = Some(breakdown);
        self
    }

    pub fn with_setup_window(mut self, window: ShiftWindow) -> Self {
        self.setup_window = Some(window);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at(day: u32, h: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 3, day)
            .unwrap()
            .and_hms_opt(h, 0, 0)
            .unwrap()
    }

    #[test]
    fn test_priority_weights() {
        assert!(Priority::Urgent.weight() > Priority::High.weight());
        assert!(Priority::High.weight() > Priority::Normal.weight());
        assert!(Priority::Normal.weight() > Priority::Low.weight());
        assert!(Priority::High.is_expedited());
        assert!(!Priority::Normal.is_expedited());
    }

    #[test]
    fn test_seq_filter_parse() {
        assert_eq!(OperationSeqFilter::parse(""), OperationSeqFilter::All);
        assert_eq!(OperationSeqFilter::parse("x, y"), OperationSeqFilter::All);
        let only = OperationSeqFilter::parse("2");
        assert!(only.matches(2));
        assert!(!only.matches(1));
    }

    #[test]
    fn test_breakdown_without_window_blocks_always() {
        let b = BreakdownWindow::new("M1");
        let w = TimeWindow::new(at(3, 8), at(3, 9));
        assert!(b.blocks("M1", &w));
        assert!(!b.blocks("M2", &w));
    }

    #[test]
    fn test_breakdown_window_aware() {
        let b = BreakdownWindow::new("M1").between(at(3, 8), at(3, 12));
        assert!(b.blocks("M1", &TimeWindow::new(at(3, 11), at(3, 13))));
        assert!(!b.blocks("M1", &TimeWindow::new(at(3, 12), at(3, 13))));
        assert!(!b.blocks("M1", &TimeWindow::new(at(3, 6), at(3, 8))));
    }

    #[test]
    fn test_batch_mode_serde_names() {
        let json = serde_json::to_string(&BatchMode::AutoSplit).unwrap();
        assert_eq!(json, "\"auto-split\"");
        let mode: BatchMode = serde_json::from_str("\"custom\"").unwrap();
        assert_eq!(mode, BatchMode::Custom);
    }
}
