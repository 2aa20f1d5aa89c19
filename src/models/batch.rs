//! Batch model.

use serde::{Deserialize, Serialize};

/// A slice of an order's quantity that flows through the routing together.
///
/// Batch ids are `B01`, `B02`, ... in split order, unique within one order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Batch {
    /// `B01`, `B02`, ...
    pub batch_id: String,
    /// Pieces in this batch.
    pub quantity: u32,
    /// Position in the split (0-based).
    pub sequence_index: usize,
    /// Operator fixed for the batch's setups.
    pub assigned_operator: Option<String>,
}

impl Batch {
    /// Creates the batch at `sequence_index` with its canonical id.
    pub fn new(sequence_index: usize, quantity: u32) -> Self {
        Self {
            batch_id: format!("B{:02}", sequence_index + 1),
            quantity,
            sequence_index,
            assigned_operator: None,
        }
    }

    /// Builds batches for the given sizes, in order.
    pub fn from_sizes(sizes: impl IntoIterator<Item = u32>) -> Vec<Self> {
        sizes
            .into_iter()
            .enumerate()
            .map(|(i, qty)| Self::new(i, qty))
            .collect()
    }

    pub fn with_operator(mut self, operator: impl Into<String>) -> Self {
        self.assigned_operator = Some(operator.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_batch_ids() {
        let batches = Batch::from_sizes([10, 20, 30]);
        let ids: Vec<&str> = batches.iter().map(|b| b.batch_id.as_str()).collect();
        assert_eq!(ids, ["B01", "B02", "B03"]);
        assert_eq!(batches[2].sequence_index, 2);
        assert_eq!(Batch::new(11, 5).batch_id, "B12");
    }
}
