use std::collections::BTreeMap;

use crate::error::MetricsError;
use crate::metrics::StatSet;
use crate::registry::Registry;

/// Metric name → statistic name → value.
///
/// Ordered maps keep the serialized payload stable between ticks.
pub type Stats = BTreeMap<String, StatSet>;

/// Reads every registered metric, one metric at a time.
///
/// Metrics are read independently; two metrics may reflect different
/// instants if producers are updating them concurrently.
pub fn snapshot(registry: &Registry) -> Stats {
    let mut stats = Stats::new();
    registry.each(|name, metric| {
        stats.insert(name.to_owned(), metric.stats());
    });
    stats
}

/// Serializes a snapshot to the JSON document handed to emitters.
pub fn to_json(stats: &Stats) -> Result<Vec<u8>, MetricsError> {
    Ok(serde_json::to_vec(stats)?)
}
