//! Time records
//!
//! A time record captures one stretch of work on a task. Its duration is
//! either set explicitly or derived from the start and end timestamps.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::clock::Clock;
use super::id::{TaskId, TimeRecordId};
use super::record::PlainRecord;

const SECONDS_PER_HOUR: f64 = 3600.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeRecord {
    #[serde(default)]
    pub id: TimeRecordId,

    pub task_id: TaskId,

    #[serde(default = "Utc::now")]
    pub start_time: DateTime<Utc>,

    /// Unset while the record is still running
    #[serde(default)]
    pub end_time: Option<DateTime<Utc>>,

    /// Explicit duration in hours, overriding the timestamps
    #[serde(default)]
    pub duration_override: Option<f64>,

    #[serde(default)]
    pub description: String,

    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
}

impl TimeRecord {
    /// Starts a running record for a task
    pub fn start(task_id: TaskId, clock: &dyn Clock) -> Self {
        let now = clock.now();
        Self {
            id: TimeRecordId::new(),
            task_id,
            start_time: now,
            end_time: None,
            duration_override: None,
            description: String::new(),
            created_at: now,
        }
    }

    /// Hours worked: the explicit override, else end minus start, else 0
    pub fn duration(&self) -> f64 {
        if let Some(hours) = self.duration_override {
            return hours;
        }
        match self.end_time {
            Some(end) => {
                (end - self.start_time).num_milliseconds() as f64 / 1000.0 / SECONDS_PER_HOUR
            }
            None => 0.0,
        }
    }

    /// Sets an explicit duration in hours
    pub fn set_duration(&mut self, hours: f64) {
        self.duration_override = Some(hours);
    }

    /// Stops a running record; the duration is then derived from timestamps
    pub fn stop(&mut self, clock: &dyn Clock) -> bool {
        if self.end_time.is_some() {
            return false;
        }
        self.end_time = Some(clock.now());
        self.duration_override = None;
        true
    }

    /// Returns true while the record is running
    pub fn is_active(&self) -> bool {
        self.end_time.is_none()
    }
}

impl PlainRecord for TimeRecord {
    const KIND: &'static str = "time record";

    fn derived_fields(&self) -> Vec<(&'static str, Value)> {
        vec![("duration", Value::from(self.duration()))]
    }

    fn derived_keys() -> &'static [&'static str] {
        &["duration"]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::clock::FixedClock;
    use chrono::TimeZone;

    fn at(hour: u32, min: u32) -> FixedClock {
        FixedClock(Utc.with_ymd_and_hms(2025, 3, 1, hour, min, 0).unwrap())
    }

    #[test]
    fn running_record_has_zero_duration() {
        let record = TimeRecord::start(TaskId::new(), &at(9, 0));
        assert!(record.is_active());
        assert_eq!(record.duration(), 0.0);
    }

    #[test]
    fn stopped_record_derives_duration() {
        let mut record = TimeRecord::start(TaskId::new(), &at(9, 0));
        assert!(record.stop(&at(11, 30)));
        assert!(!record.is_active());
        assert_eq!(record.duration(), 2.5);

        // Stopping twice keeps the first end time
        assert!(!record.stop(&at(18, 0)));
        assert_eq!(record.duration(), 2.5);
    }

    #[test]
    fn explicit_duration_wins_until_stopped() {
        let mut record = TimeRecord::start(TaskId::new(), &at(9, 0));
        record.set_duration(4.0);
        assert_eq!(record.duration(), 4.0);

        record.stop(&at(10, 0));
        assert_eq!(record.duration(), 1.0);
    }

    #[test]
    fn record_roundtrip() {
        let mut record = TimeRecord::start(TaskId::new(), &at(9, 0));
        record.stop(&at(9, 45));
        record.description = "pairing".to_string();

        let encoded = record.to_record().unwrap();
        assert_eq!(encoded["duration"], Value::from(0.75));

        let decoded = TimeRecord::from_record(encoded).unwrap();
        assert_eq!(decoded, record);
    }
}
