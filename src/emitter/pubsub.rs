use std::time::Duration;

use async_trait::async_trait;
use redis::aio::ConnectionManager;

use super::MetricsEmitter;
use crate::error::{EmitError, MetricsError};

/// Publishes each payload on a Redis pub/sub channel.
///
/// `ConnectionManager` is cheaply cloneable and reconnects on its own, so a
/// Redis outage only costs the ticks that fall inside it.
#[derive(Clone)]
pub struct RedisEmitter {
    conn: ConnectionManager,
    channel: String,
    interval: Duration,
}

impl RedisEmitter {
    /// Opens a managed connection to `url`.
    pub async fn connect(
        url: &str,
        channel: impl Into<String>,
        interval: Duration,
    ) -> Result<Self, MetricsError> {
        let client = redis::Client::open(url)?;
        let conn = ConnectionManager::new(client).await?;
        Ok(Self::new(conn, channel, interval))
    }

    pub fn new(conn: ConnectionManager, channel: impl Into<String>, interval: Duration) -> Self {
        Self {
            conn,
            channel: channel.into(),
            interval,
        }
    }

    pub fn channel(&self) -> &str {
        &self.channel
    }
}

#[async_trait]
impl MetricsEmitter for RedisEmitter {
    fn reporting_interval(&self) -> Duration {
        self.interval
    }

    async fn emit(&self, payload: &[u8]) -> Result<(), EmitError> {
        let mut conn = self.conn.clone();
        let receivers: i64 = redis::cmd("PUBLISH")
            .arg(&self.channel)
            .arg(payload)
            .query_async(&mut conn)
            .await?;

        tracing::trace!(channel = %self.channel, receivers, "Published metrics");
        Ok(())
    }
}
