//! Sinks for serialized metric snapshots.
//!
//! The reporter asks an emitter for its interval once, then hands it one
//! JSON payload per tick. Emitters are always called sequentially from the
//! single reporting task.

pub mod file;
pub mod pubsub;
pub mod stdout;

use std::time::Duration;

use async_trait::async_trait;

use crate::error::EmitError;

pub use self::file::FileEmitter;
pub use self::pubsub::RedisEmitter;
pub use self::stdout::StdoutEmitter;

/// Interval used by emitters that were not given one explicitly.
pub const DEFAULT_REPORTING_INTERVAL: Duration = Duration::from_secs(60);

#[async_trait]
pub trait MetricsEmitter: Send + Sync {
    /// Period between two reports. Read once when the reporter starts.
    fn reporting_interval(&self) -> Duration;

    /// Delivers one serialized snapshot.
    async fn emit(&self, payload: &[u8]) -> Result<(), EmitError>;
}

/// Discards every payload. The default when no sink is configured.
#[derive(Debug, Clone, Copy)]
pub struct NoopEmitter {
    interval: Duration,
}

impl Default for NoopEmitter {
    fn default() -> Self {
        Self {
            interval: DEFAULT_REPORTING_INTERVAL,
        }
    }
}

impl NoopEmitter {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl MetricsEmitter for NoopEmitter {
    fn reporting_interval(&self) -> Duration {
        self.interval
    }

    async fn emit(&self, _payload: &[u8]) -> Result<(), EmitError> {
        Ok(())
    }
}
