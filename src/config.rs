//! Engine configuration.
//!
//! Every field has a working default, so an empty JSON object is a valid
//! configuration:
//!
//! ```
//! use shop_schedule::config::SchedulerConfig;
//!
//! let config = SchedulerConfig::from_json_str(r#"{ "operator_pool": ["A", "B"] }"#).unwrap();
//! assert_eq!(config.operator_pool, vec!["A", "B"]);
//! assert_eq!(config.machine_wait_horizon_min, 24 * 60);
//! ```

use std::collections::BTreeMap;

use chrono::Duration;
use serde::{Deserialize, Serialize};

use crate::error::{Result, ScheduleError};
use crate::models::ShiftWindow;

/// Tunables and plant data shared by every order of a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Machines used when an operation lists no eligible machines.
    pub machines: Vec<String>,
    /// Operators available for setups, in round-robin order.
    pub operator_pool: Vec<String>,
    /// Machines down for the whole run.
    pub breakdown_machines: Vec<String>,
    /// Plant-wide setup window, `06:00-22:00` unless configured; orders may
    /// override it. `null` in JSON lets setups start around the clock.
    pub setup_window: Option<ShiftWindow>,
    /// Optional shift per operator. Operators without an entry are always on shift.
    pub operator_shifts: BTreeMap<String, ShiftWindow>,
    /// A busy machine is waited for when it frees up within this many minutes.
    pub machine_wait_horizon_min: i64,
    /// Step between operator availability probes.
    pub operator_probe_step_min: i64,
    /// Number of operator availability probes.
    pub operator_probe_count: u32,
    /// Delay applied when no operator probe succeeds.
    pub operator_fallback_delay_min: i64,
    /// Gap added after busy-until for a best-effort machine start.
    pub best_effort_delay_min: i64,
    /// A machine able to start within this many minutes counts as immediate.
    pub immediate_start_tolerance_min: i64,
    /// Batch size assumed when the routing carries no minimum.
    pub default_min_batch_size: u32,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            machines: (1..=9).map(|i| format!("VMC {i}")).collect(),
            operator_pool: ["A", "B", "C", "D"].map(String::from).to_vec(),
            breakdown_machines: Vec::new(),
            setup_window: ShiftWindow::from_hours(6, 22).ok(),
            operator_shifts: BTreeMap::new(),
            machine_wait_horizon_min: 24 * 60,
            operator_probe_step_min: 60,
            operator_probe_count: 24,
            operator_fallback_delay_min: 24 * 60,
            best_effort_delay_min: 1,
            immediate_start_tolerance_min: 5,
            default_min_batch_size: 100,
        }
    }
}

impl SchedulerConfig {
    /// Creates the default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses and validates a JSON configuration.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn with_machines<I, S>(mut self, machines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.machines = machines.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_operator_pool<I, S>(mut self, operators: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.operator_pool = operators.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_breakdown_machines<I, S>(mut self, machines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.breakdown_machines = machines.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_setup_window(mut self, window: ShiftWindow) -> Self {
        self.setup_window = Some(window);
        self
    }

    /// Lets setups start at any time of day.
    pub fn without_setup_window(mut self) -> Self {
        self.setup_window = None;
        self
    }

    /// Restricts `operator` to `shift`.
    pub fn with_operator_shift(mut self, operator: impl Into<String>, shift: ShiftWindow) -> Self {
        self.operator_shifts.insert(operator.into(), shift);
        self
    }

    pub fn with_machine_wait_horizon(mut self, minutes: i64) -> Self {
        self.machine_wait_horizon_min = minutes;
        self
    }

    /// Sets the operator probe step and count.
    pub fn with_operator_probe(mut self, step_min: i64, count: u32) -> Self {
        self.operator_probe_step_min = step_min;
        self.operator_probe_count = count;
        self
    }

    /// Checks value ranges.
    pub fn validate(&self) -> Result<()> {
        if self.operator_pool.is_empty() {
            return Err(ScheduleError::InvalidConfig(
                "operator pool must not be empty".into(),
            ));
        }
        if self.operator_pool.iter().any(|op| op.trim().is_empty()) {
            return Err(ScheduleError::InvalidConfig(
                "operator names must not be blank".into(),
            ));
        }
        let positive = [
            ("machine_wait_horizon_min", self.machine_wait_horizon_min),
            ("operator_probe_step_min", self.operator_probe_step_min),
            ("operator_fallback_delay_min", self.operator_fallback_delay_min),
            ("best_effort_delay_min", self.best_effort_delay_min),
        ];
        for (name, value) in positive {
            if value <= 0 {
                return Err(ScheduleError::InvalidConfig(format!(
                    "{name} must be positive, got {value}"
                )));
            }
        }
        if self.immediate_start_tolerance_min < 0 {
            return Err(ScheduleError::InvalidConfig(
                "immediate_start_tolerance_min must not be negative".into(),
            ));
        }
        if self.default_min_batch_size == 0 {
            return Err(ScheduleError::InvalidConfig(
                "default_min_batch_size must be positive".into(),
            ));
        }
        Ok(())
    }

    #[inline]
    pub fn machine_wait_horizon(&self) -> Duration {
        Duration::minutes(self.machine_wait_horizon_min)
    }

    #[inline]
    pub fn operator_probe_step(&self) -> Duration {
        Duration::minutes(self.operator_probe_step_min)
    }

    #[inline]
    pub fn operator_fallback_delay(&self) -> Duration {
        Duration::minutes(self.operator_fallback_delay_min)
    }

    #[inline]
    pub fn best_effort_delay(&self) -> Duration {
        Duration::minutes(self.best_effort_delay_min)
    }

    #[inline]
    pub fn immediate_start_tolerance(&self) -> Duration {
        Duration::minutes(self.immediate_start_tolerance_min)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = SchedulerConfig::default();
        assert_eq!(config.operator_pool, vec!["A", "B", "C", "D"]);
        assert_eq!(config.machines.len(), 9);
        assert_eq!(config.machines[0], "VMC 1");
        assert_eq!(config.operator_probe_count, 24);
        assert_eq!(config.setup_window.unwrap().to_string(), "06:00-22:00");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_setup_window_can_be_disabled() {
        let config = SchedulerConfig::from_json_str(r#"{ "setup_window": null }"#).unwrap();
        assert!(config.setup_window.is_none());
        assert!(SchedulerConfig::default().without_setup_window().setup_window.is_none());
        // Absent key keeps the default.
        let config = SchedulerConfig::from_json_str("{}").unwrap();
        assert!(config.setup_window.is_some());
    }

    #[test]
    fn test_from_json_with_windows() {
        let json = r#"{
            "breakdown_machines": ["VMC 3"],
            "setup_window": "06:00-22:00",
            "operator_shifts": { "A": "06:00-14:00", "C": "14:00-22:00" }
        }"#;
        let config = SchedulerConfig::from_json_str(json).unwrap();
        assert_eq!(config.breakdown_machines, vec!["VMC 3"]);
        assert_eq!(config.setup_window.unwrap().to_string(), "06:00-22:00");
        assert_eq!(config.operator_shifts["C"].to_string(), "14:00-22:00");
        // Untouched fields keep their defaults.
        assert_eq!(config.operator_pool.len(), 4);
    }

    #[test]
    fn test_malformed_json_is_config_error() {
        let err = SchedulerConfig::from_json_str(r#"{ "operator_pool": "#).unwrap_err();
        assert!(matches!(err, ScheduleError::Config(_)));
    }

    #[test]
    fn test_from_json_rejects_bad_window() {
        let err = SchedulerConfig::from_json_str(r#"{ "setup_window": "22:00-06:00" }"#);
        assert!(err.is_err());
    }

    #[test]
    fn test_validate_rejects_empty_pool() {
        let config = SchedulerConfig::default().with_operator_pool(Vec::<String>::new());
        assert!(matches!(
            config.validate(),
            Err(ScheduleError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_validate_rejects_non_positive_horizon() {
        let config = SchedulerConfig::default().with_machine_wait_horizon(0);
        assert!(config.validate().is_err());
        let config = SchedulerConfig::default().with_operator_probe(0, 24);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_roundtrip_json() {
        let config = SchedulerConfig::default()
            .with_setup_window(ShiftWindow::from_hours(7, 19).unwrap())
            .with_operator_shift("B", ShiftWindow::from_hours(6, 14).unwrap());
        let json = serde_json::to_string(&config).unwrap();
        assert_eq!(SchedulerConfig::from_json_str(&json).unwrap(), config);
    }
}
