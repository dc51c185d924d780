use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Recognized configuration knobs for the ATLAS core.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AtlasConfig {
    /// Gate threshold θ used by the confidence gate.
    pub confidence_threshold: f64,
    /// Risk tolerance `r` used by the confidence gate.
    pub risk_tolerance: f64,
    /// Maximum number of retained audit entries before oldest is dropped.
    pub max_audit_history: usize,
    /// Default approval timeout in seconds when a request doesn't override it.
    pub approval_default_timeout: u64,
    /// Per-monitor check interval overrides, keyed by monitor name.
    pub monitor_intervals: HashMap<String, u64>,
    /// Whether the self-coding pipeline's safe executor runs in sandbox mode.
    pub executor_sandbox: bool,
}

impl Default for AtlasConfig {
    fn default() -> Self {
        Self {
            confidence_threshold: 0.6,
            risk_tolerance: 0.5,
            max_audit_history: 1000,
            approval_default_timeout: 300,
            monitor_intervals: HashMap::new(),
            executor_sandbox: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_have_documented_values() {
        let config = AtlasConfig::default();
        assert!((config.confidence_threshold - 0.6).abs() < f64::EPSILON);
        assert!((config.risk_tolerance - 0.5).abs() < f64::EPSILON);
        assert_eq!(config.max_audit_history, 1000);
        assert!(config.executor_sandbox);
    }
}
