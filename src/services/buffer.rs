//! Project buffer sizing and consumption
//!
//! The project buffer is a reserve of hours placed after the critical chain.
//! It is sized as a fixed ratio of the chain's total effort. Consumption is
//! judged relative to progress: burning 30% of the buffer at 10% completion is
//! worse than burning 50% of it at 90%.

use thiserror::Error;

use crate::domain::{BufferStatus, BufferThresholds, Project, Task};

/// Buffer size as a share of the critical chain's effort
pub const DEFAULT_BUFFER_RATIO: f64 = 0.5;

#[derive(Debug, Error, PartialEq)]
pub enum BufferConfigError {
    #[error("Buffer ratio must be a non-negative number, got {0}")]
    InvalidRatio(f64),
}

/// Sizes project buffers and classifies their consumption
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BufferCalculationService {
    ratio: f64,
    thresholds: BufferThresholds,
}

impl Default for BufferCalculationService {
    fn default() -> Self {
        Self {
            ratio: DEFAULT_BUFFER_RATIO,
            thresholds: BufferThresholds::default(),
        }
    }
}

impl BufferCalculationService {
    /// Creates a service with the given buffer ratio and default thresholds
    pub fn new(ratio: f64) -> Result<Self, BufferConfigError> {
        if !ratio.is_finite() || ratio < 0.0 {
            return Err(BufferConfigError::InvalidRatio(ratio));
        }
        Ok(Self {
            ratio,
            thresholds: BufferThresholds::default(),
        })
    }

    /// Replaces the thresholds used by [`get_buffer_status`](Self::get_buffer_status)
    pub fn with_thresholds(mut self, thresholds: BufferThresholds) -> Self {
        self.thresholds = thresholds;
        self
    }

    pub fn ratio(&self) -> f64 {
        self.ratio
    }

    pub fn thresholds(&self) -> &BufferThresholds {
        &self.thresholds
    }

    /// Buffer hours for a critical chain: ratio times the chain's total effort
    pub fn calculate_project_buffer<'a>(
        &self,
        critical_chain_tasks: impl IntoIterator<Item = &'a Task>,
    ) -> f64 {
        let mut tasks = critical_chain_tasks.into_iter().peekable();
        if tasks.peek().is_none() {
            return 0.0;
        }

        let chain_length: f64 = tasks.map(|task| task.estimated_hours).sum();
        chain_length * self.ratio
    }

    /// Buffer consumption relative to progress, in [0, 1]
    ///
    /// With no buffer the rate is 0. With no progress yet the raw share of the
    /// buffer consumed is reported, since there is nothing to compare it to.
    pub fn calculate_buffer_consumption_rate(&self, project: &Project, completed_percentage: f64) -> f64 {
        if project.buffer_size <= 0.0 {
            return 0.0;
        }

        let actual_consumption = project.buffer_consumed / project.buffer_size;

        if completed_percentage <= 0.0 {
            return actual_consumption.min(1.0);
        }

        (actual_consumption / completed_percentage).min(1.0)
    }

    /// Classifies the project's relative buffer consumption
    pub fn get_buffer_status(&self, project: &Project, completed_percentage: f64) -> BufferStatus {
        let rate = self.calculate_buffer_consumption_rate(project, completed_percentage);
        BufferStatus::with_thresholds(rate, self.thresholds)
    }

    /// Advisory buffer pressure of a single task
    ///
    /// Positive values mean the task overran and eats into the buffer;
    /// negative values mean buffer that could be released. Nothing is applied
    /// to the project.
    pub fn calculate_buffer_impact(&self, task: &Task) -> f64 {
        task.variance()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{BufferZone, FixedClock, ProjectId};
    use chrono::{TimeZone, Utc};

    fn clock() -> FixedClock {
        FixedClock(Utc.with_ymd_and_hms(2025, 3, 1, 9, 0, 0).unwrap())
    }

    fn chain(hours: &[f64]) -> Vec<Task> {
        let project_id = ProjectId::new();
        hours
            .iter()
            .map(|&h| Task::new(project_id, "Task", h, &clock()))
            .collect()
    }

    fn project(size: f64, consumed: f64) -> Project {
        let mut project = Project::new("Launch", &clock());
        project.buffer_size = size;
        project.buffer_consumed = consumed;
        project
    }

    #[test]
    fn default_ratio_halves_chain() {
        let service = BufferCalculationService::default();
        assert_eq!(service.ratio(), 0.5);
        assert_eq!(service.calculate_project_buffer(&chain(&[10.0, 20.0, 5.0])), 17.5);
    }

    #[test]
    fn empty_chain_has_no_buffer() {
        let service = BufferCalculationService::new(2.0).unwrap();
        assert_eq!(service.calculate_project_buffer(&[] as &[Task]), 0.0);
    }

    #[test]
    fn ratio_is_injectable() {
        let service = BufferCalculationService::new(0.25).unwrap();
        assert_eq!(service.calculate_project_buffer(&chain(&[8.0, 8.0])), 4.0);

        let none = BufferCalculationService::new(0.0).unwrap();
        assert_eq!(none.calculate_project_buffer(&chain(&[8.0])), 0.0);
    }

    #[test]
    fn invalid_ratio_rejected() {
        assert_eq!(
            BufferCalculationService::new(-0.5),
            Err(BufferConfigError::InvalidRatio(-0.5))
        );
        assert!(BufferCalculationService::new(f64::INFINITY).is_err());
        assert!(BufferCalculationService::new(f64::NAN).is_err());
    }

    #[test]
    fn zero_buffer_is_always_safe() {
        let service = BufferCalculationService::default();
        let project = project(0.0, 50.0);
        assert_eq!(service.calculate_buffer_consumption_rate(&project, 0.0), 0.0);
        assert_eq!(service.calculate_buffer_consumption_rate(&project, 0.5), 0.0);
        assert!(service.get_buffer_status(&project, 0.5).is_safe());
    }

    #[test]
    fn no_progress_reports_raw_consumption() {
        let service = BufferCalculationService::default();
        assert_eq!(service.calculate_buffer_consumption_rate(&project(10.0, 4.0), 0.0), 0.4);
        assert_eq!(service.calculate_buffer_consumption_rate(&project(10.0, 40.0), 0.0), 1.0);
    }

    #[test]
    fn consumption_is_relative_to_progress() {
        let service = BufferCalculationService::default();
        // 20% of the buffer at 80% completion
        let rate = service.calculate_buffer_consumption_rate(&project(10.0, 2.0), 0.8);
        assert!((rate - 0.25).abs() < 1e-12);

        // 30% of the buffer at 10% completion is maxed out
        assert_eq!(service.calculate_buffer_consumption_rate(&project(10.0, 3.0), 0.1), 1.0);
    }

    #[test]
    fn consumption_is_clamped() {
        let service = BufferCalculationService::default();
        for consumed in [0.0, 5.0, 17.5, 100.0, 1e9] {
            for progress in [0.0, 0.01, 0.5, 1.0] {
                let rate = service.calculate_buffer_consumption_rate(&project(17.5, consumed), progress);
                assert!((0.0..=1.0).contains(&rate), "rate {rate} out of range");
            }
        }
    }

    #[test]
    fn status_uses_configured_thresholds() {
        let strict = BufferThresholds::new(0.1, 0.2, 1.0).unwrap();
        let service = BufferCalculationService::default().with_thresholds(strict);
        let status = service.get_buffer_status(&project(10.0, 1.5), 1.0);
        assert_eq!(status.zone(), BufferZone::Warning);
        assert_eq!(status.thresholds(), &strict);

        let default_status = BufferCalculationService::default().get_buffer_status(&project(10.0, 1.5), 1.0);
        assert!(default_status.is_safe());
    }

    #[test]
    fn impact_is_variance() {
        let service = BufferCalculationService::default();
        let mut tasks = chain(&[10.0]);
        tasks[0].actual_hours = 13.0;
        assert_eq!(service.calculate_buffer_impact(&tasks[0]), 3.0);
        tasks[0].actual_hours = 6.0;
        assert_eq!(service.calculate_buffer_impact(&tasks[0]), -4.0);
    }
}
