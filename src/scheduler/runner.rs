//! One-call entry point for a scheduling run.

use chrono::NaiveDateTime;

use super::SchedulingEngine;
use crate::catalog::OperationCatalog;
use crate::config::SchedulerConfig;
use crate::models::{Order, ScheduleRun};

/// Schedules `orders` against `catalog` with a fresh engine.
///
/// Never panics on bad data: order problems become alerts, and a
/// configuration that does not validate yields [`ScheduleRun::failed`].
///
/// # Example
/// ```
/// use chrono::{Duration, NaiveDate};
/// use shop_schedule::catalog::InMemoryCatalog;
/// use shop_schedule::config::SchedulerConfig;
/// use shop_schedule::models::{OperationDefinition, Order};
/// use shop_schedule::scheduler::run_scheduling;
///
/// let now = NaiveDate::from_ymd_opt(2025, 3, 3).unwrap().and_hms_opt(8, 0, 0).unwrap();
/// let catalog = InMemoryCatalog::new(vec![OperationDefinition::new("P1", 1, "Turning")]);
/// let orders = vec![
///     Order::new("P1", 20, now + Duration::days(1)),
///     Order::new("P1", 0, now + Duration::days(1)),
/// ];
///
/// let run = run_scheduling(&orders, catalog, SchedulerConfig::default(), now);
/// assert!(run.is_ok());
/// assert_eq!(run.rows.len(), 1);
/// assert_eq!(run.alerts.len(), 1);
/// assert_eq!(run.summary.total_orders, 2);
/// ```
pub fn run_scheduling<C>(
    orders: &[Order],
    catalog: C,
    config: SchedulerConfig,
    now: NaiveDateTime,
) -> ScheduleRun
where
    C: OperationCatalog + 'static,
{
    match SchedulingEngine::new(catalog, config, now) {
        Ok(mut engine) => engine.run(orders),
        Err(err) => {
            tracing::error!(error = %err, "scheduling run aborted");
            ScheduleRun::failed(err.to_string())
        }
    }
}
