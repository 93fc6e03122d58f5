use rand::rngs::StdRng;
use rand::Rng;
use rand::SeedableRng;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use consumer_metrics::ConsumerMetrics;

use crate::settings::LoadConfig;

// ─── Public entry point ──────────────────────────────────────────

/// Spawns the simulated fetch routines and worker managers and waits for
/// them to wind down once `running` is cleared.
pub async fn run(running: Arc<AtomicBool>, metrics: Arc<ConsumerMetrics>, config: LoadConfig) {
    let mut handles = Vec::with_capacity((config.fetchers + config.worker_managers) as usize);

    for id in 0..config.fetchers {
        let running = running.clone();
        let metrics = metrics.clone();
        let seed = config.seed + id as u64;
        handles.push(tokio::spawn(async move {
            fetcher(running, metrics, seed).await;
        }));
    }

    metrics
        .num_worker_managers_gauge()
        .update(config.worker_managers as i64);

    for id in 0..config.worker_managers {
        let running = running.clone();
        let metrics = metrics.clone();
        let seed = config.seed + 10_000 + id as u64;
        let max_batch = config.workers_per_manager;
        handles.push(tokio::spawn(async move {
            worker_manager(running, metrics, seed, max_batch).await;
        }));
    }

    tracing::info!(
        fetchers = config.fetchers,
        worker_managers = config.worker_managers,
        "Simulated load started"
    );

    // Wait for every routine to finish
    for h in handles {
        if let Err(e) = h.await {
            tracing::warn!(error = %e, "Simulated routine ended abnormally");
        }
    }

    metrics.num_worker_managers_gauge().update(0);
    tracing::info!("Simulated load stopped");
}

// ─── Fetch routine ───────────────────────────────────────────────

async fn fetcher(running: Arc<AtomicBool>, metrics: Arc<ConsumerMetrics>, seed: u64) {
    let mut rng = StdRng::seed_from_u64(seed);
    metrics.num_fetch_routines_counter().inc(1);

    while running.load(Ordering::Relaxed) {
        // Waiting for the next fetch request
        let idle_start = Instant::now();
        tokio::time::sleep(Duration::from_millis(rng.gen_range(1..25))).await;
        metrics.fetchers_idle_timer().update_since(idle_start);

        // Broker round-trip
        let fetch = metrics.fetch_duration_timer().start();
        tokio::time::sleep(Duration::from_millis(rng.gen_range(2..40))).await;
        fetch.stop();
    }

    metrics.num_fetch_routines_counter().dec(1);
}

// ─── Worker manager ──────────────────────────────────────────────

async fn worker_manager(
    running: Arc<AtomicBool>,
    metrics: Arc<ConsumerMetrics>,
    seed: u64,
    max_batch: u32,
) {
    let mut rng = StdRng::seed_from_u64(seed);

    while running.load(Ordering::Relaxed) {
        let batch = rng.gen_range(1..=max_batch) as i64;
        metrics.pending_wms_tasks_counter().inc(batch);

        // Idle until workers free up
        let idle_start = Instant::now();
        tokio::time::sleep(Duration::from_millis(rng.gen_range(1..15))).await;
        metrics.wms_idle_timer().update_since(idle_start);

        // Hand the whole batch to workers
        metrics.pending_wms_tasks_counter().dec(batch);
        metrics.active_workers_counter().inc(batch);

        let batch_start = Instant::now();
        let per_task_ms = rng.gen_range(1..10u64);
        tokio::time::sleep(Duration::from_millis(per_task_ms * batch as u64)).await;
        metrics.wms_batch_duration_timer().update_since(batch_start);

        metrics.active_workers_counter().dec(batch);
    }
}
