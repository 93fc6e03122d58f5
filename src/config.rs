use std::time::Duration;

use serde::Deserialize;

use crate::error::MetricsError;

// ─── Defaults ────────────────────────────────────────────────────

/// Reservoir size used for every histogram and timer.
pub const DEFAULT_RESERVOIR_SIZE: usize = 1028;

/// Forward-decay factor; biases the reservoir towards the last ~5 minutes.
pub const DEFAULT_DECAY_ALPHA: f64 = 0.015;

fn default_reservoir_size() -> usize {
    DEFAULT_RESERVOIR_SIZE
}
fn default_decay_alpha() -> f64 {
    DEFAULT_DECAY_ALPHA
}

// ─── Metrics ─────────────────────────────────────────────────────

/// Tuning knobs for a metrics registry and its reporter.
#[derive(Debug, Clone, Deserialize)]
pub struct MetricsConfig {
    /// Samples kept per histogram / timer reservoir
    #[serde(default = "default_reservoir_size")]
    pub reservoir_size: usize,

    /// Decay factor of the reservoir's forward-decay priorities
    #[serde(default = "default_decay_alpha")]
    pub decay_alpha: f64,

    #[serde(default)]
    pub reporter: ReporterConfig,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            reservoir_size: DEFAULT_RESERVOIR_SIZE,
            decay_alpha: DEFAULT_DECAY_ALPHA,
            reporter: ReporterConfig::default(),
        }
    }
}

impl MetricsConfig {
    /// Rejects values that would make the statistics meaningless.
    pub fn validate(&self) -> Result<(), MetricsError> {
        if self.reservoir_size == 0 {
            return Err(MetricsError::InvalidConfig(
                "reservoir_size must be at least 1".into(),
            ));
        }
        if !self.decay_alpha.is_finite() || self.decay_alpha <= 0.0 {
            return Err(MetricsError::InvalidConfig(format!(
                "decay_alpha must be a positive number, got {}",
                self.decay_alpha
            )));
        }
        self.reporter.validate()
    }
}

// ─── Reporter ────────────────────────────────────────────────────

/// What the reporting task does when a snapshot cannot be serialized.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SerializationFailurePolicy {
    /// Log at error level and end the reporting task
    #[default]
    Stop,
    /// Log at error level and wait for the next tick
    Skip,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ReporterConfig {
    /// Upper bound on a single `emit` call; unbounded when absent
    #[serde(default)]
    pub emit_timeout_ms: Option<u64>,

    #[serde(default)]
    pub on_serialization_failure: SerializationFailurePolicy,
}

impl ReporterConfig {
    pub fn emit_timeout(&self) -> Option<Duration> {
        self.emit_timeout_ms.map(Duration::from_millis)
    }

    pub fn validate(&self) -> Result<(), MetricsError> {
        if self.emit_timeout_ms == Some(0) {
            return Err(MetricsError::InvalidConfig(
                "emit_timeout_ms must be greater than zero".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_config_default() {
        let config = MetricsConfig::default();
        assert_eq!(config.reservoir_size, 1028);
        assert_eq!(config.decay_alpha, 0.015);
        assert_eq!(config.reporter.emit_timeout(), None);
        assert_eq!(
            config.reporter.on_serialization_failure,
            SerializationFailurePolicy::Stop
        );
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_metrics_config_from_partial_json() {
        let config: MetricsConfig = serde_json::from_str(
            r#"{"reservoir_size": 64, "reporter": {"emit_timeout_ms": 250, "on_serialization_failure": "skip"}}"#,
        )
        .unwrap();
        assert_eq!(config.reservoir_size, 64);
        assert_eq!(config.decay_alpha, DEFAULT_DECAY_ALPHA);
        assert_eq!(
            config.reporter.emit_timeout(),
            Some(Duration::from_millis(250))
        );
        assert_eq!(
            config.reporter.on_serialization_failure,
            SerializationFailurePolicy::Skip
        );
    }

    #[test]
    fn test_metrics_config_rejects_bad_values() {
        let zero_reservoir = MetricsConfig {
            reservoir_size: 0,
            ..MetricsConfig::default()
        };
        assert!(matches!(
            zero_reservoir.validate(),
            Err(MetricsError::InvalidConfig(_))
        ));

        let nan_alpha = MetricsConfig {
            decay_alpha: f64::NAN,
            ..MetricsConfig::default()
        };
        assert!(nan_alpha.validate().is_err());

        let zero_timeout = MetricsConfig {
            reporter: ReporterConfig {
                emit_timeout_ms: Some(0),
                ..ReporterConfig::default()
            },
            ..MetricsConfig::default()
        };
        assert!(zero_timeout.validate().is_err());
    }
}
