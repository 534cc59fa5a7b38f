use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use tokio::time;
use tracing::{error, info, warn};

use crate::fleet::snapshot::ServerReport;
use crate::registry::FleetRegistry;
use crate::AsyncMutex;

/// The narrow contract with the external collector: one call per cycle,
/// returning every server it could reach along with that server's devices.
/// How the collector talks to the hardware is its own business.
#[async_trait]
pub trait SnapshotSource: Send + Sync {
    async fn poll(&self) -> anyhow::Result<Vec<ServerReport>>;
}

/// Runs one collector cycle against the shared registry. Device-level
/// failures are logged and swallowed here; a failed poll propagates.
pub async fn ingest_once<S: SnapshotSource>(
    registry: &Arc<AsyncMutex<FleetRegistry>>,
    source: &S,
) -> anyhow::Result<()> {
    let reports = source.poll().await?;
    let mut registry = registry.lock().await;
    for e in registry.apply_poll(reports, Utc::now()) {
        warn!(error = %e, "Dropped device report during ingest");
    }
    Ok(())
}

/// Drives the poll cadence forever. A failed poll logs and leaves the
/// registry untouched - servers keep their previous validity until the
/// collector answers again - so callers normally spawn this and forget it.
pub async fn run_ingest<S: SnapshotSource>(
    registry: Arc<AsyncMutex<FleetRegistry>>,
    source: S,
    interval: Duration,
) {
    info!("Starting snapshot ingest with {:?} interval", interval);
    let mut ticker = time::interval(interval);
    loop {
        ticker.tick().await;
        if let Err(e) = ingest_once(&registry, &source).await {
            error!("Snapshot poll failed: {}", e);
        }
    }
}
