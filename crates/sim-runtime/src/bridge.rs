//! Periodic snapshots of the whole store to durable storage.

use crate::scheduler::TaskGuard;
use crate::{EconomyService, Inner, RoomEconomy, RuntimeError};
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

async fn run_bridge(inner: Weak<Inner>, period: Duration) {
    let mut ticker = interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    loop {
        ticker.tick().await;
        let Some(inner) = inner.upgrade() else {
            break;
        };
        let service = EconomyService { inner };
        // Failures are logged; the next save overwrites the snapshot anyway.
        if let Err(e) = service.save_snapshot().await {
            warn!(error = %e, "periodic snapshot failed");
        }
    }
}

impl EconomyService {
    /// Start the periodic aggregate snapshot. No-op without a store.
    pub async fn start_persistence(&self) {
        if self.inner.persistence.is_none() {
            debug!("no snapshot store configured, persistence bridge disabled");
            return;
        }
        let period = Duration::from_millis(self.inner.config.save_interval_ms);
        let handle = tokio::spawn(run_bridge(Arc::downgrade(&self.inner), period));
        *self.inner.bridge.lock().await = Some(TaskGuard::new(handle));
        info!(?period, "persistence bridge started");
    }

    pub async fn stop_persistence(&self) {
        if self.inner.bridge.lock().await.take().is_some() {
            info!("persistence bridge stopped");
        }
    }

    /// Write a point-in-time snapshot of every room now.
    pub async fn save_snapshot(&self) -> Result<(), RuntimeError> {
        let Some(store) = &self.inner.persistence else {
            return Ok(());
        };
        let snapshot = self.snapshot_all().await;
        store.save_aggregate(&snapshot).await?;
        debug!(rooms = snapshot.rooms.len(), "aggregate snapshot written");
        Ok(())
    }

    /// Reload every room from the last aggregate snapshot.
    ///
    /// Rooms whose states fail validation are skipped. Returns the number of
    /// rooms restored.
    pub async fn restore_snapshot(&self) -> Result<usize, RuntimeError> {
        let Some(store) = &self.inner.persistence else {
            return Ok(0);
        };
        let Some(snapshot) = store.load_aggregate().await? else {
            return Ok(0);
        };
        let mut restored = 0;
        for (room, room_snapshot) in snapshot.rooms {
            match RoomEconomy::from_snapshot(room_snapshot, &self.inner.config) {
                Ok(economy) => {
                    self.inner.store.insert(economy).await;
                    restored += 1;
                }
                Err(e) => warn!(%room, error = %e, "snapshot rejected, room not restored"),
            }
        }
        info!(restored, "rooms restored from snapshot");
        Ok(restored)
    }
}
