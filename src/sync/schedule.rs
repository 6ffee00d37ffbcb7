//! Periodic background passes.

use std::time::Duration;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use super::engine::SyncEngine;

/// Run full passes in the background.
///
/// With `run_on_start` a pass starts immediately. After that a pass runs every
/// `interval`; a zero interval disables the timer. Cancelling `cancel` stops
/// the loop and interrupts a running pass between files.
pub fn spawn_periodic(
    engine: SyncEngine,
    interval: Duration,
    run_on_start: bool,
    cancel: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        if run_on_start {
            run_once(&engine, &cancel).await;
        }

        if interval.is_zero() {
            tracing::debug!("Periodic sync disabled");
            return;
        }

        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        // The first tick completes immediately.
        ticker.tick().await;

        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => run_once(&engine, &cancel).await,
            }
        }
        tracing::debug!("Periodic sync stopped");
    })
}

async fn run_once(engine: &SyncEngine, cancel: &CancellationToken) {
    if cancel.is_cancelled() {
        return;
    }
    let roots = match engine.store().list_roots() {
        Ok(roots) => roots,
        Err(e) => {
            tracing::error!(error = %e, "Failed to list media roots for scheduled sync");
            return;
        }
    };
    let report = engine.synchronize_with_cancel(&roots, cancel).await;
    let totals = report.totals();
    tracing::info!(
        roots = report.roots.len(),
        created = totals.created,
        updated = totals.updated,
        deleted = totals.deleted,
        failed = totals.failed,
        "Scheduled sync finished"
    );
}
