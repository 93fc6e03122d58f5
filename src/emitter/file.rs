use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use tokio::fs::OpenOptions;
use tokio::io::AsyncWriteExt;

use super::MetricsEmitter;
use crate::error::EmitError;

/// Appends each payload to a file, one JSON document per line.
///
/// The file is opened per emit, so external rotation is picked up on the
/// next tick.
#[derive(Debug, Clone)]
pub struct FileEmitter {
    path: PathBuf,
    interval: Duration,
}

impl FileEmitter {
    pub fn new(path: impl Into<PathBuf>, interval: Duration) -> Self {
        Self {
            path: path.into(),
            interval,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl MetricsEmitter for FileEmitter {
    fn reporting_interval(&self) -> Duration {
        self.interval
    }

    async fn emit(&self, payload: &[u8]) -> Result<(), EmitError> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;

        let mut line = Vec::with_capacity(payload.len() + 1);
        line.extend_from_slice(payload);
        line.push(b'\n');
        file.write_all(&line).await?;
        file.flush().await?;
        Ok(())
    }
}
