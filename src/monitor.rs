//! Periodic sampling on top of a blocking collector
//!
//! `collect()` has no timeout of its own, so each collection runs on the
//! blocking thread pool and is abandoned if it overruns. An abandoned call may
//! still finish in the background; its result is dropped.
//!
//! Backends log their own failures, so a skipped tick is only noted at debug
//! level here.

use anyhow::{Context, Result, anyhow};
use log::{debug, info};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::MissedTickBehavior;

use crate::collectors::{InterfaceStatsCollector, SampleBatch};

/// Runs one collection on a worker thread, giving up after `timeout`
pub async fn collect_with_timeout(
    collector: Arc<dyn InterfaceStatsCollector>,
    timeout: Duration,
) -> Result<SampleBatch> {
    let backend = collector.backend_name();
    let worker = tokio::task::spawn_blocking(move || collector.collect());

    let samples = tokio::time::timeout(timeout, worker)
        .await
        .map_err(|_| anyhow!("{} collection did not finish within {:?}", backend, timeout))?
        .context("Collection worker panicked")??;

    Ok(SampleBatch::new(backend, samples))
}

/// Polls `collector` every `interval` and passes each successful batch to `emit`
///
/// Stops after `ticks` collection attempts when a limit is given. Failed or
/// timed-out attempts are logged and count towards the limit. Returns the
/// number of batches emitted.
pub async fn watch<F>(
    collector: Arc<dyn InterfaceStatsCollector>,
    interval: Duration,
    timeout: Duration,
    ticks: Option<u64>,
    mut emit: F,
) -> Result<u64>
where
    F: FnMut(&SampleBatch) -> Result<()>,
{
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    info!(
        "Watching interface counters via {} every {:?} (timeout {:?})",
        collector.backend_name(),
        interval,
        timeout
    );

    let mut attempts = 0u64;
    let mut emitted = 0u64;

    while ticks.is_none_or(|limit| attempts < limit) {
        ticker.tick().await;
        attempts += 1;

        match collect_with_timeout(Arc::clone(&collector), timeout).await {
            Ok(batch) => {
                debug!(
                    "Tick #{}: {} interfaces from {}",
                    attempts,
                    batch.samples.len(),
                    batch.backend
                );
                emit(&batch)?;
                emitted += 1;
            }
            Err(e) => {
                debug!("Tick #{} produced no samples: {:#}", attempts, e);
            }
        }
    }

    Ok(emitted)
}
