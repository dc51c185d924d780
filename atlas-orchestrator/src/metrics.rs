//! Host metric classification feeding the `server_monitor` demo worker:
//! per-metric threshold comparison, worst-of aggregation across metrics,
//! and a mapping from the worst status to a risk/urgency pair.

use atlas_core::{RiskLevel, UrgencyLevel};

/// Coarse health of a single metric or of a host overall.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum MetricStatus {
    /// Within normal bounds.
    Normal,
    /// Past the warning threshold.
    Warning,
    /// Past the critical threshold.
    Critical,
}

impl MetricStatus {
    /// Classifies a raw metric value against warning/critical thresholds.
    #[must_use]
    pub fn classify(value: f64, warning_threshold: f64, critical_threshold: f64) -> Self {
        if value >= critical_threshold {
            Self::Critical
        } else if value >= warning_threshold {
            Self::Warning
        } else {
            Self::Normal
        }
    }

    /// The worse of two statuses, `Critical` > `Warning` > `Normal`.
    #[must_use]
    pub fn worst_of(self, other: Self) -> Self {
        self.max(other)
    }

    /// Maps an overall host status to a `(risk, urgency)` pair.
    #[must_use]
    pub fn to_risk_urgency(self, unreachable: bool, service_down: bool) -> (RiskLevel, UrgencyLevel) {
        match self {
            Self::Normal => (RiskLevel::Low, UrgencyLevel::Low),
            Self::Warning => (RiskLevel::Medium, UrgencyLevel::Medium),
            Self::Critical if unreachable || service_down => (RiskLevel::High, UrgencyLevel::High),
            Self::Critical => (RiskLevel::High, UrgencyLevel::Medium),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classify_picks_the_right_tier() {
        assert_eq!(MetricStatus::classify(40.0, 70.0, 90.0), MetricStatus::Normal);
        assert_eq!(MetricStatus::classify(75.0, 70.0, 90.0), MetricStatus::Warning);
        assert_eq!(MetricStatus::classify(95.0, 70.0, 90.0), MetricStatus::Critical);
    }

    #[test]
    fn worst_of_prefers_critical() {
        assert_eq!(MetricStatus::Normal.worst_of(MetricStatus::Critical), MetricStatus::Critical);
        assert_eq!(MetricStatus::Warning.worst_of(MetricStatus::Normal), MetricStatus::Warning);
    }

    #[test]
    fn critical_without_unreachable_or_down_is_medium_urgency() {
        let (risk, urgency) = MetricStatus::Critical.to_risk_urgency(false, false);
        assert_eq!(risk, RiskLevel::High);
        assert_eq!(urgency, UrgencyLevel::Medium);
    }

    #[test]
    fn critical_with_service_down_is_high_urgency() {
        let (risk, urgency) = MetricStatus::Critical.to_risk_urgency(false, true);
        assert_eq!(risk, RiskLevel::High);
        assert_eq!(urgency, UrgencyLevel::High);
    }
}
