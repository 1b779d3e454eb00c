//! Buffer status classification
//!
//! A [`BufferStatus`] is an immutable snapshot: a consumption rate clamped to
//! [0, 1] plus the thresholds used to band it. It is recomputed whenever it is
//! needed and never persisted.
//!
//! | Zone | Rate | Color |
//! |------|------|-------|
//! | Safe | `rate <= green` | green `#28a745` |
//! | Warning | `green < rate <= yellow` | yellow `#ffc107` |
//! | Danger | `rate > yellow` | red `#dc3545` |

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum ThresholdError {
    #[error("Buffer threshold '{name}' must be a number between 0 and 1, got {value}")]
    OutOfRange { name: &'static str, value: f64 },

    #[error("Buffer thresholds must satisfy green < yellow <= red, got {green} / {yellow} / {red}")]
    NotAscending { green: f64, yellow: f64, red: f64 },
}

/// Upper bounds of the three buffer zones
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BufferThresholds {
    green: f64,
    yellow: f64,
    red: f64,
}

impl BufferThresholds {
    pub const DEFAULT_GREEN: f64 = 0.33;
    pub const DEFAULT_YELLOW: f64 = 0.67;
    pub const DEFAULT_RED: f64 = 1.0;

    /// Validates and builds a threshold triple
    pub fn new(green: f64, yellow: f64, red: f64) -> Result<Self, ThresholdError> {
        for (name, value) in [("green", green), ("yellow", yellow), ("red", red)] {
            if !value.is_finite() || !(0.0..=1.0).contains(&value) {
                return Err(ThresholdError::OutOfRange { name, value });
            }
        }
        if !(green < yellow && yellow <= red) {
            return Err(ThresholdError::NotAscending { green, yellow, red });
        }
        Ok(Self { green, yellow, red })
    }

    pub fn green(&self) -> f64 {
        self.green
    }

    pub fn yellow(&self) -> f64 {
        self.yellow
    }

    pub fn red(&self) -> f64 {
        self.red
    }

    /// Bands a rate into a zone
    pub fn classify(&self, rate: f64) -> BufferZone {
        if rate <= self.green {
            BufferZone::Safe
        } else if rate <= self.yellow {
            BufferZone::Warning
        } else {
            BufferZone::Danger
        }
    }
}

impl Default for BufferThresholds {
    fn default() -> Self {
        Self {
            green: Self::DEFAULT_GREEN,
            yellow: Self::DEFAULT_YELLOW,
            red: Self::DEFAULT_RED,
        }
    }
}

/// The three ordered buffer zones
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BufferZone {
    Safe,
    Warning,
    Danger,
}

impl BufferZone {
    /// Color name
    pub fn color(&self) -> &'static str {
        match self {
            BufferZone::Safe => "green",
            BufferZone::Warning => "yellow",
            BufferZone::Danger => "red",
        }
    }

    pub fn color_hex(&self) -> &'static str {
        match self {
            BufferZone::Safe => "#28a745",
            BufferZone::Warning => "#ffc107",
            BufferZone::Danger => "#dc3545",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            BufferZone::Safe => "Safe: buffer consumption is within plan",
            BufferZone::Warning => "Caution: buffer consumption is increasing",
            BufferZone::Danger => "Danger: buffer consumption exceeds plan",
        }
    }
}

/// Buffer consumption rate with its classification
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BufferStatus {
    consumption_rate: f64,
    thresholds: BufferThresholds,
}

impl BufferStatus {
    /// Builds a status with the default thresholds
    pub fn new(consumption_rate: f64) -> Self {
        Self::with_thresholds(consumption_rate, BufferThresholds::default())
    }

    /// Builds a status, clamping the rate to [0, 1]
    pub fn with_thresholds(consumption_rate: f64, thresholds: BufferThresholds) -> Self {
        // NaN compares false everywhere; treat it as no consumption.
        let consumption_rate = if consumption_rate.is_nan() {
            0.0
        } else {
            consumption_rate.clamp(0.0, 1.0)
        };
        Self {
            consumption_rate,
            thresholds,
        }
    }

    pub fn consumption_rate(&self) -> f64 {
        self.consumption_rate
    }

    pub fn thresholds(&self) -> &BufferThresholds {
        &self.thresholds
    }

    pub fn zone(&self) -> BufferZone {
        self.thresholds.classify(self.consumption_rate)
    }

    pub fn is_safe(&self) -> bool {
        self.zone() == BufferZone::Safe
    }

    pub fn is_warning(&self) -> bool {
        self.zone() == BufferZone::Warning
    }

    pub fn is_danger(&self) -> bool {
        self.zone() == BufferZone::Danger
    }

    pub fn color_hex(&self) -> &'static str {
        self.zone().color_hex()
    }

    /// Returns (color name, color hex, description)
    pub fn display_info(&self) -> (&'static str, &'static str, &'static str) {
        let zone = self.zone();
        (zone.color(), zone.color_hex(), zone.description())
    }

    /// Serializable summary for reports
    pub fn summary(&self) -> BufferStatusSummary {
        let zone = self.zone();
        BufferStatusSummary {
            consumption_rate: self.consumption_rate,
            zone,
            color: zone.color(),
            color_hex: zone.color_hex(),
            description: zone.description(),
            is_safe: zone == BufferZone::Safe,
            is_warning: zone == BufferZone::Warning,
            is_danger: zone == BufferZone::Danger,
        }
    }
}

impl fmt::Display for BufferStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (color, _, description) = self.display_info();
        write!(
            f,
            "BufferStatus({:.2}, {}, '{}')",
            self.consumption_rate, color, description
        )
    }
}

/// Flat view of a [`BufferStatus`]
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BufferStatusSummary {
    pub consumption_rate: f64,
    pub zone: BufferZone,
    pub color: &'static str,
    pub color_hex: &'static str,
    pub description: &'static str,
    pub is_safe: bool,
    pub is_warning: bool,
    pub is_danger: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_boundaries() {
        assert_eq!(BufferStatus::new(0.20).zone(), BufferZone::Safe);
        assert_eq!(BufferStatus::new(0.33).zone(), BufferZone::Safe);
        assert_eq!(BufferStatus::new(0.50).zone(), BufferZone::Warning);
        assert_eq!(BufferStatus::new(0.67).zone(), BufferZone::Warning);
        assert_eq!(BufferStatus::new(0.90).zone(), BufferZone::Danger);
        assert_eq!(BufferStatus::new(1.0).zone(), BufferZone::Danger);
    }

    #[test]
    fn rate_is_clamped() {
        assert_eq!(BufferStatus::new(-0.5).consumption_rate(), 0.0);
        assert_eq!(BufferStatus::new(3.0).consumption_rate(), 1.0);
        assert_eq!(BufferStatus::new(f64::NAN).consumption_rate(), 0.0);
        assert!(BufferStatus::new(3.0).is_danger());
    }

    #[test]
    fn flags_follow_zone() {
        let status = BufferStatus::new(0.5);
        assert!(!status.is_safe());
        assert!(status.is_warning());
        assert!(!status.is_danger());
    }

    #[test]
    fn display_info_table() {
        assert_eq!(
            BufferStatus::new(0.1).display_info(),
            ("green", "#28a745", "Safe: buffer consumption is within plan")
        );
        assert_eq!(BufferStatus::new(0.5).color_hex(), "#ffc107");
        assert_eq!(BufferStatus::new(0.9).display_info().0, "red");
    }

    #[test]
    fn display_format() {
        let status = BufferStatus::new(0.5);
        assert_eq!(
            status.to_string(),
            "BufferStatus(0.50, yellow, 'Caution: buffer consumption is increasing')"
        );
    }

    #[test]
    fn equality_needs_rate_and_thresholds() {
        let custom = BufferThresholds::new(0.2, 0.5, 1.0).unwrap();
        assert_eq!(BufferStatus::new(0.4), BufferStatus::new(0.4));
        assert_ne!(BufferStatus::new(0.4), BufferStatus::new(0.41));
        assert_ne!(
            BufferStatus::new(0.4),
            BufferStatus::with_thresholds(0.4, custom)
        );
    }

    #[test]
    fn custom_thresholds_shift_bands() {
        let strict = BufferThresholds::new(0.1, 0.2, 1.0).unwrap();
        assert!(BufferStatus::with_thresholds(0.15, strict).is_warning());
        assert!(BufferStatus::with_thresholds(0.25, strict).is_danger());
    }

    #[test]
    fn thresholds_validated() {
        assert_eq!(
            BufferThresholds::new(0.5, 0.5, 1.0),
            Err(ThresholdError::NotAscending {
                green: 0.5,
                yellow: 0.5,
                red: 1.0
            })
        );
        assert!(BufferThresholds::new(0.3, 0.6, 0.5).is_err());
        assert!(BufferThresholds::new(-0.1, 0.6, 1.0).is_err());
        assert!(BufferThresholds::new(0.1, f64::NAN, 1.0).is_err());
        // yellow may equal red
        assert!(BufferThresholds::new(0.3, 1.0, 1.0).is_ok());
    }

    #[test]
    fn summary_serializes() {
        let json = serde_json::to_value(BufferStatus::new(0.9).summary()).unwrap();
        assert_eq!(json["zone"], "danger");
        assert_eq!(json["color"], "red");
        assert_eq!(json["is_danger"], true);
    }
}
