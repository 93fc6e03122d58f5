use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;

use consumer_metrics::{
    FileEmitter, MetricsConfig, MetricsEmitter, MetricsError, NoopEmitter, RedisEmitter,
    StdoutEmitter,
};

/// Environment variable naming an optional JSON config file.
pub const CONFIG_ENV: &str = "OBSERVATORY_CONFIG";

// ─── Top level ───────────────────────────────────────────────────

#[derive(Debug, Clone, Deserialize)]
pub struct ObservatoryConfig {
    /// Suffix of every metric name, e.g. `FetchDuration-<consumer_name>`
    #[serde(default = "default_consumer_name")]
    pub consumer_name: String,

    #[serde(default = "default_listen_addr")]
    pub listen_addr: String,

    #[serde(default)]
    pub emitter: EmitterConfig,

    #[serde(default)]
    pub metrics: MetricsConfig,

    #[serde(default)]
    pub load: LoadConfig,
}

fn default_consumer_name() -> String {
    "observatory".into()
}
fn default_listen_addr() -> String {
    "0.0.0.0:3000".into()
}

impl Default for ObservatoryConfig {
    fn default() -> Self {
        Self {
            consumer_name: default_consumer_name(),
            listen_addr: default_listen_addr(),
            emitter: EmitterConfig::default(),
            metrics: MetricsConfig::default(),
            load: LoadConfig::default(),
        }
    }
}

impl ObservatoryConfig {
    /// Reads the file named by `OBSERVATORY_CONFIG`, or falls back to defaults.
    pub fn load() -> Result<Self, MetricsError> {
        match std::env::var(CONFIG_ENV) {
            Ok(path) => Self::from_file(&path),
            Err(_) => Ok(Self::default()),
        }
    }

    pub fn from_file(path: &str) -> Result<Self, MetricsError> {
        let raw = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&raw)?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), MetricsError> {
        if self.consumer_name.is_empty() {
            return Err(MetricsError::InvalidConfig(
                "consumer_name must not be empty".into(),
            ));
        }
        self.metrics.validate()?;
        self.load.validate()
    }
}

// ─── Emitter selection ───────────────────────────────────────────

fn default_interval_ms() -> u64 {
    10_000
}
fn default_channel() -> String {
    "consumer-metrics".into()
}

/// Where snapshots go. `none` discards them.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EmitterConfig {
    #[default]
    None,
    Stdout {
        #[serde(default = "default_interval_ms")]
        interval_ms: u64,
    },
    File {
        path: PathBuf,
        #[serde(default = "default_interval_ms")]
        interval_ms: u64,
    },
    Redis {
        url: String,
        #[serde(default = "default_channel")]
        channel: String,
        #[serde(default = "default_interval_ms")]
        interval_ms: u64,
    },
}

impl EmitterConfig {
    pub async fn build(&self) -> Result<Arc<dyn MetricsEmitter>, MetricsError> {
        let emitter: Arc<dyn MetricsEmitter> = match self {
            Self::None => Arc::new(NoopEmitter::new()),
            Self::Stdout { interval_ms } => {
                Arc::new(StdoutEmitter::new(Duration::from_millis(*interval_ms)))
            }
            Self::File { path, interval_ms } => Arc::new(FileEmitter::new(
                path.clone(),
                Duration::from_millis(*interval_ms),
            )),
            Self::Redis {
                url,
                channel,
                interval_ms,
            } => Arc::new(
                RedisEmitter::connect(url, channel.clone(), Duration::from_millis(*interval_ms))
                    .await?,
            ),
        };
        Ok(emitter)
    }
}

// ─── Simulated load ──────────────────────────────────────────────

fn default_fetchers() -> u32 {
    4
}
fn default_worker_managers() -> u32 {
    2
}
fn default_workers_per_manager() -> u32 {
    8
}
fn default_seed() -> u64 {
    1000
}

/// Shape of the synthetic consumer that drives the metrics.
#[derive(Debug, Clone, Deserialize)]
pub struct LoadConfig {
    #[serde(default = "default_fetchers")]
    pub fetchers: u32,

    #[serde(default = "default_worker_managers")]
    pub worker_managers: u32,

    /// Upper bound on a single batch handed to a worker manager
    #[serde(default = "default_workers_per_manager")]
    pub workers_per_manager: u32,

    #[serde(default = "default_seed")]
    pub seed: u64,
}

impl Default for LoadConfig {
    fn default() -> Self {
        Self {
            fetchers: default_fetchers(),
            worker_managers: default_worker_managers(),
            workers_per_manager: default_workers_per_manager(),
            seed: default_seed(),
        }
    }
}

impl LoadConfig {
    pub fn validate(&self) -> Result<(), MetricsError> {
        if self.fetchers > 500 || self.worker_managers > 500 {
            return Err(MetricsError::InvalidConfig(
                "fetchers and worker_managers must be at most 500".into(),
            ));
        }
        if self.workers_per_manager == 0 {
            return Err(MetricsError::InvalidConfig(
                "workers_per_manager must be at least 1".into(),
            ));
        }
        Ok(())
    }
}
