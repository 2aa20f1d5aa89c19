//! Operation catalog: the routing master data.
//!
//! Routing sheets arrive with inconsistent headers (`PartNumber`,
//! `Part Number`, `partnumber`, a misspelled `Operater` column, numbers
//! typed as text). [`RawOperationRecord`] accepts all of those through serde
//! aliases and [`RawOperationRecord::normalize`] turns a record into a clean
//! [`OperationDefinition`] exactly once, at the catalog boundary. Nothing
//! downstream ever sees a raw field name or a missing duration.
//!
//! # Defaults applied during normalisation
//!
//! | Field | When missing or not positive |
//! |-------|------------------------------|
//! | operation name | `"Unknown Operation"` |
//! | setup time | 60 min |
//! | cycle time | 10 min |
//! | minimum batch size | 1 |

use serde::Deserialize;

use crate::error::Result;
use crate::models::{OperationDefinition, OperationSeqFilter};

const DEFAULT_SETUP_MIN: f64 = 60.0;
const DEFAULT_CYCLE_MIN: f64 = 10.0;

/// Source of operation definitions for a part.
pub trait OperationCatalog {
    /// Operations of `part_number` passing `filter`, sorted by sequence.
    fn operations_for(
        &self,
        part_number: &str,
        filter: &OperationSeqFilter,
    ) -> Vec<OperationDefinition>;
}

/// A number that may have been typed as text.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum LooseNumber {
    Number(f64),
    Text(String),
}

impl LooseNumber {
    fn value(&self) -> Option<f64> {
        match self {
            LooseNumber::Number(n) => Some(*n),
            LooseNumber::Text(s) => s.trim().parse().ok(),
        }
    }
}

/// Machine list given either as `"VMC 1, VMC 2"` or as an array.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum MachineList {
    Csv(String),
    List(Vec<String>),
}

impl Default for MachineList {
    fn default() -> Self {
        MachineList::List(Vec::new())
    }
}

impl MachineList {
    fn into_machines(self) -> Vec<String> {
        let raw: Vec<String> = match self {
            MachineList::Csv(text) => text.split(',').map(str::to_string).collect(),
            MachineList::List(list) => list,
        };
        raw.into_iter()
            .map(|m| m.trim().to_string())
            .filter(|m| !m.is_empty())
            .collect()
    }
}

/// One routing row as found in an imported sheet.
#[derive(Debug, Clone, Deserialize)]
pub struct RawOperationRecord {
    #[serde(alias = "PartNumber", alias = "Part Number", alias = "partnumber", alias = "partNumber")]
    pub part_number: String,

    #[serde(alias = "OperationSeq", alias = "Operation Seq", alias = "operationseq", alias = "operationSeq")]
    pub operation_seq: LooseNumber,

    #[serde(
        default,
        alias = "OperationName",
        alias = "Operation Name",
        alias = "operationname",
        alias = "operationName"
    )]
    pub operation_name: Option<String>,

    #[serde(
        default,
        alias = "SetupTime_Min",
        alias = "Setup Time",
        alias = "setuptime_min",
        alias = "setupTimeMin"
    )]
    pub setup_time_min: Option<LooseNumber>,

    #[serde(
        default,
        alias = "CycleTime_Min",
        alias = "Cycle Time",
        alias = "cycletime_min",
        alias = "cycleTimeMin"
    )]
    pub cycle_time_min: Option<LooseNumber>,

    #[serde(
        default,
        alias = "Minimum_BatchSize",
        alias = "Min Batch Size",
        alias = "minimum_batchsize",
        alias = "minimumBatchSize"
    )]
    pub minimum_batch_size: Option<LooseNumber>,

    #[serde(
        default,
        alias = "EligibleMachines",
        alias = "Eligible Machines",
        alias = "eligiblemachines",
        alias = "eligibleMachines"
    )]
    pub eligible_machines: MachineList,

    #[serde(default, alias = "Operator", alias = "Operater", alias = "operater")]
    pub operator: Option<String>,
}

impl RawOperationRecord {
    /// Produces a clean definition. Returns `None` when the part number is
    /// blank or the sequence number is not a positive integer.
    pub fn normalize(self) -> Option<OperationDefinition> {
        let part_number = self.part_number.trim().to_string();
        if part_number.is_empty() {
            return None;
        }
        let seq = self.operation_seq.value()?;
        if !(seq >= 1.0 && seq.fract() == 0.0 && seq <= u32::MAX as f64) {
            return None;
        }

        let positive = |n: Option<LooseNumber>, default: f64| {
            n.and_then(|n| n.value())
                .filter(|v| v.is_finite() && *v > 0.0)
                .unwrap_or(default)
        };

        let operation_name = self
            .operation_name
            .map(|n| n.trim().to_string())
            .filter(|n| !n.is_empty())
            .unwrap_or_else(|| "Unknown Operation".to_string());

        Some(OperationDefinition {
            part_number,
            operation_seq: seq as u32,
            operation_name,
            setup_time_min: positive(self.setup_time_min, DEFAULT_SETUP_MIN),
            cycle_time_min: positive(self.cycle_time_min, DEFAULT_CYCLE_MIN),
            minimum_batch_size: positive(self.minimum_batch_size, 1.0).round() as u32,
            eligible_machines: self.eligible_machines.into_machines(),
            operator: self
                .operator
                .map(|o| o.trim().to_string())
                .filter(|o| !o.is_empty()),
        })
    }
}

/// Catalog held in memory, typically loaded from an exported routing sheet.
///
/// # Example
/// ```
/// use shop_schedule::catalog::{InMemoryCatalog, OperationCatalog};
/// use shop_schedule::models::OperationSeqFilter;
///
/// let catalog = InMemoryCatalog::from_json_str(r#"[
///     { "PartNumber": "P1", "OperationSeq": 2, "SetupTime_Min": 30, "CycleTime_Min": 1.5,
///       "EligibleMachines": "VMC 2, VMC 3", "Operater": "B" },
///     { "PartNumber": "P1", "OperationSeq": 1, "EligibleMachines": "VMC 1" }
/// ]"#).unwrap();
///
/// let ops = catalog.operations_for("P1", &OperationSeqFilter::All);
/// assert_eq!(ops[0].operation_seq, 1);
/// assert_eq!(ops[0].setup_time_min, 60.0); // defaulted
/// assert_eq!(ops[1].eligible_machines, vec!["VMC 2", "VMC 3"]);
/// assert_eq!(ops[1].operator.as_deref(), Some("B"));
/// ```
#[derive(Debug, Clone, Default)]
pub struct InMemoryCatalog {
    operations: Vec<OperationDefinition>,
}

impl InMemoryCatalog {
    /// Creates a catalog from already clean definitions.
    pub fn new(operations: Vec<OperationDefinition>) -> Self {
        Self { operations }
    }

    /// Normalises raw records, dropping unusable ones.
    pub fn from_records(records: impl IntoIterator<Item = RawOperationRecord>) -> Self {
        let mut operations = Vec::new();
        for record in records {
            let part = record.part_number.clone();
            match record.normalize() {
                Some(op) => operations.push(op),
                None => tracing::warn!(part = %part, "dropping routing row without usable part/sequence"),
            }
        }
        Self { operations }
    }

    /// Parses a JSON array of raw routing rows.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let records: Vec<RawOperationRecord> = serde_json::from_str(json)?;
        Ok(Self::from_records(records))
    }

    /// Adds one definition.
    pub fn with_operation(mut self, operation: OperationDefinition) -> Self {
        self.operations.push(operation);
        self
    }

    pub fn len(&self) -> usize {
        self.operations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }

    /// All definitions in insertion order.
    pub fn operations(&self) -> &[OperationDefinition] {
        &self.operations
    }
}

impl OperationCatalog for InMemoryCatalog {
    fn operations_for(
        &self,
        part_number: &str,
        filter: &OperationSeqFilter,
    ) -> Vec<OperationDefinition> {
        let mut ops: Vec<OperationDefinition> = self
            .operations
            .iter()
            .filter(|op| op.part_number == part_number && filter.matches(op.operation_seq))
            .cloned()
            .collect();
        ops.sort_by_key(|op| op.operation_seq);
        ops
    }
}
