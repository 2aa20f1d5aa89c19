//! Schedule quality metrics (KPIs).
//!
//! Computes standard performance indicators from emitted rows.
//!
//! # Metrics
//!
//! | Metric | Definition |
//! |--------|-----------|
//! | Makespan (C_max) | Latest run end minus earliest setup start |
//! | Total Tardiness | Sum of max(0, completion - due date) per order |
//! | Maximum Tardiness | Largest single delay |
//! | On-Time Rate | Fraction of orders completing by their due date |
//! | Avg Utilization | Mean machine busyness over the schedule horizon |
//!
//! An order is identified by part number and due date; its completion is
//! the latest `run_end` among its rows.
//!
//! # Reference
//! Pinedo (2016), "Scheduling", Ch. 1.2: Performance Measures

use std::collections::BTreeMap;

use chrono::NaiveDateTime;

use crate::models::OperationAssignment;

/// Schedule performance indicators.
///
/// All durations are in minutes.
#[derive(Debug, Clone, PartialEq)]
pub struct ScheduleKpi {
    /// Earliest setup start across all rows.
    pub horizon_start: Option<NaiveDateTime>,
    /// Latest run end across all rows.
    pub horizon_end: Option<NaiveDateTime>,
    /// Horizon length (minutes).
    pub makespan_min: i64,
    /// Sum of order tardiness (minutes).
    pub total_tardiness_min: i64,
    /// Maximum tardiness of any single order (minutes).
    pub max_tardiness_min: i64,
    /// Fraction of orders completing on time (0.0..1.0).
    pub on_time_rate: f64,
    /// Completion per `(part_number, due_date)`.
    pub completion_by_order: BTreeMap<(String, NaiveDateTime), NaiveDateTime>,
    /// Average machine utilization (0.0..1.0).
    pub avg_utilization: f64,
    /// Booked minutes / makespan per machine.
    pub utilization_by_machine: BTreeMap<String, f64>,
}

impl ScheduleKpi {
    /// Computes KPIs from scheduled rows.
    ///
    /// # Example
    /// ```
    /// use shop_schedule::scheduler::ScheduleKpi;
    ///
    /// let kpi = ScheduleKpi::calculate(&[]);
    /// assert_eq!(kpi.makespan_min, 0);
    /// assert_eq!(kpi.on_time_rate, 1.0);
    /// ```
    pub fn calculate(rows: &[OperationAssignment]) -> Self {
        let horizon_start = rows.iter().map(|r| r.setup_start).min();
        let horizon_end = rows.iter().map(|r| r.run_end).max();
        let makespan_min = match (horizon_start, horizon_end) {
            (Some(start), Some(end)) => (end - start).num_minutes(),
            _ => 0,
        };

        let mut completion_by_order: BTreeMap<(String, NaiveDateTime), NaiveDateTime> =
            BTreeMap::new();
        for row in rows {
            let completion = completion_by_order
                .entry((row.part_number.clone(), row.due_date))
                .or_insert(row.run_end);
            *completion = (*completion).max(row.run_end);
        }

        let mut total_tardiness_min = 0;
        let mut max_tardiness_min = 0;
        let mut on_time = 0usize;
        for ((_, due), completion) in &completion_by_order {
            let tardiness = (*completion - *due).num_minutes();
            if tardiness > 0 {
                total_tardiness_min += tardiness;
                max_tardiness_min = max_tardiness_min.max(tardiness);
            } else {
                on_time += 1;
            }
        }
        let on_time_rate = if completion_by_order.is_empty() {
            1.0
        } else {
            on_time as f64 / completion_by_order.len() as f64
        };

        let mut busy: BTreeMap<String, i64> = BTreeMap::new();
        for row in rows {
            *busy.entry(row.machine.clone()).or_insert(0) += row.duration().num_minutes();
        }
        let utilization_by_machine: BTreeMap<String, f64> = busy
            .into_iter()
            .map(|(machine, minutes)| {
                let utilization = if makespan_min > 0 {
                    minutes as f64 / makespan_min as f64
                } else {
                    0.0
                };
                (machine, utilization)
            })
            .collect();
        let avg_utilization = if utilization_by_machine.is_empty() {
            0.0
        } else {
            utilization_by_machine.values().sum::<f64>() / utilization_by_machine.len() as f64
        };

        Self {
            horizon_start,
            horizon_end,
            makespan_min,
            total_tardiness_min,
            max_tardiness_min,
            on_time_rate,
            completion_by_order,
            avg_utilization,
            utilization_by_machine,
        }
    }

    /// Whether the schedule meets the given quality thresholds.
    pub fn meets_thresholds(&self, max_tardiness_min: i64, min_utilization: f64) -> bool {
        self.max_tardiness_min <= max_tardiness_min && self.avg_utilization >= min_utilization
    }

    /// Number of orders finishing after their due date.
    pub fn late_orders(&self) -> usize {
        self.completion_by_order
            .iter()
            .filter(|(key, completion)| **completion > key.1)
            .count()
    }
}
