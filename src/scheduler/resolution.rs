//! Outcomes of machine and operator conflict handling.
//!
//! One operation passes through
//!
//! ```text
//! PROPOSE_MACHINE → CHECK_CONFLICT → {NO_CONFLICT | ALTERNATE_MACHINE | WAIT | BEST_EFFORT}
//!   → PROPOSE_OPERATOR → CHECK_OPERATOR → {FREE | SHIFT_START | KEEP_PIPELINED_START | DELAYED}
//!   → COMPUTE_TIMING → COMMIT
//! ```
//!
//! The enums below record which branch was taken; the engine attaches them
//! to its trace events.

use std::fmt;

use chrono::NaiveDateTime;

/// How a busy proposed machine was handled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MachineResolution {
    /// Proposed machine was free for the estimated window.
    NoConflict,
    /// Another eligible machine was free at the same start.
    AlternateMachine { replaced: String },
    /// Kept the machine and waited until it frees.
    Wait { until: NaiveDateTime },
    /// Machine stays busy past the wait horizon; started just after it frees.
    BestEffort { busy_until: NaiveDateTime },
}

impl fmt::Display for MachineResolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoConflict => f.write_str("no-conflict"),
            Self::AlternateMachine { replaced } => write!(f, "alternate-machine (replaced {replaced})"),
            Self::Wait { until } => write!(f, "wait until {until}"),
            Self::BestEffort { busy_until } => write!(f, "best-effort after {busy_until}"),
        }
    }
}

/// How operator availability affected the setup start.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperatorResolution {
    /// Operator free at the requested start.
    Free,
    /// Start moved to the first probed slot where the operator is free.
    ShiftStart { to: NaiveDateTime },
    /// A free slot exists later, but piece flow keeps the earlier start.
    KeepPipelinedStart,
    /// No free slot within the probe range; start pushed by the fallback delay.
    Delayed { to: NaiveDateTime },
}

impl fmt::Display for OperatorResolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Free => f.write_str("free"),
            Self::ShiftStart { to } => write!(f, "shift-start to {to}"),
            Self::KeepPipelinedStart => f.write_str("keep-pipelined-start"),
            Self::Delayed { to } => write!(f, "delayed to {to}"),
        }
    }
}
