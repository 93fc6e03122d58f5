use std::time::Duration;

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;

use super::MetricsEmitter;
use crate::error::EmitError;

/// Writes each payload to standard output as one line.
#[derive(Debug, Clone, Copy)]
pub struct StdoutEmitter {
    interval: Duration,
}

impl StdoutEmitter {
    pub fn new(interval: Duration) -> Self {
        Self { interval }
    }
}

#[async_trait]
impl MetricsEmitter for StdoutEmitter {
    fn reporting_interval(&self) -> Duration {
        self.interval
    }

    async fn emit(&self, payload: &[u8]) -> Result<(), EmitError> {
        let mut out = tokio::io::stdout();
        out.write_all(payload).await?;
        out.write_all(b"\n").await?;
        out.flush().await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_stdout_emitter_writes_line() {
        let emitter = StdoutEmitter::new(Duration::from_secs(5));
        assert_eq!(emitter.reporting_interval(), Duration::from_secs(5));
        assert!(emitter.emit(br#"{"X":{"count":1.0}}"#).await.is_ok());
    }
}
