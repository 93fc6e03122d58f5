//! Metrics collection and periodic reporting for a streaming consumer.
//!
//! Producers obtain `Arc` handles to counters, gauges, histograms, meters
//! and timers from a [`Registry`] and update them without coordination. A
//! [`Reporter`] periodically snapshots the registry into a
//! `name → statistic → f64` document, serializes it to JSON and hands it to
//! a [`MetricsEmitter`].

pub mod config;
pub mod consumer;
pub mod emitter;
pub mod error;
pub mod metrics;
pub mod registry;
pub mod reporter;
pub mod snapshot;

pub use config::{MetricsConfig, ReporterConfig, SerializationFailurePolicy};
pub use consumer::ConsumerMetrics;
pub use emitter::{FileEmitter, MetricsEmitter, NoopEmitter, RedisEmitter, StdoutEmitter};
pub use error::{EmitError, MetricsError};
pub use metrics::{Counter, Gauge, Histogram, Meter, Metric, MetricKind, StatSet, Timer};
pub use registry::Registry;
pub use reporter::{Reporter, ReporterState};
pub use snapshot::{snapshot, to_json, Stats};
