use std::time::Duration;

use thiserror::Error;

use crate::metrics::MetricKind;

/// Errors surfaced by the registry, the configuration layer and the reporter.
///
/// Producer-side metric updates never return one of these; only setup,
/// shutdown and the reporting task itself can fail.
#[derive(Error, Debug)]
pub enum MetricsError {
    #[error("metric '{name}' is registered as a {existing}, not a {requested}")]
    KindMismatch {
        name: String,
        existing: MetricKind,
        requested: MetricKind,
    },

    #[error("metric '{0}' is already registered")]
    Duplicate(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Reporter task failed: {0}")]
    Join(String),

    #[error("No async runtime available: {0}")]
    Runtime(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),
}

/// Failure reported by an emitter for a single payload.
///
/// The reporter drops the payload and carries on with the next tick.
#[derive(Error, Debug)]
pub enum EmitError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("emit did not complete within {0:?}")]
    Timeout(Duration),

    #[error("payload rejected: {0}")]
    Rejected(String),
}
