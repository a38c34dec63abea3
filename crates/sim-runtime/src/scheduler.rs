//! Per-room periodic driver.
//!
//! Every started room gets its own tokio task ticking at the master
//! interval. The task holds only a weak reference to the service, and its
//! [`TaskGuard`] aborts it when the room is stopped or removed.

use crate::{EconomyService, Inner, RuntimeError};
use sim_core::RoomName;
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

/// Aborts the wrapped task on drop.
#[derive(Debug)]
pub struct TaskGuard(JoinHandle<()>);

impl TaskGuard {
    pub fn new(handle: JoinHandle<()>) -> Self {
        Self(handle)
    }

    pub fn is_finished(&self) -> bool {
        self.0.is_finished()
    }
}

impl Drop for TaskGuard {
    fn drop(&mut self) {
        self.0.abort();
    }
}

async fn run_room(inner: Weak<Inner>, room: RoomName, period: Duration) {
    let mut ticker = interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    loop {
        ticker.tick().await;
        let Some(inner) = inner.upgrade() else {
            break;
        };
        let service = EconomyService { inner };
        match service.tick_room(&room).await {
            Ok(Some(report)) if !report.failed.is_empty() => {
                warn!(%room, failed = report.failed.len(), "tick completed with failures");
            }
            Ok(_) => {}
            Err(RuntimeError::RoomNotFound(_)) => {
                debug!(%room, "room gone, timer exits");
                break;
            }
            Err(e) => warn!(%room, error = %e, "tick failed"),
        }
    }
}

impl EconomyService {
    /// Start ticking `room` every master interval. Restarts an existing timer.
    pub async fn start_room(&self, room: &RoomName) -> Result<(), RuntimeError> {
        self.inner.store.get(room).await?;
        let period = Duration::from_millis(self.inner.config.master_interval_ms);
        let handle = tokio::spawn(run_room(Arc::downgrade(&self.inner), room.clone(), period));
        self.inner
            .timers
            .lock()
            .await
            .insert(room.clone(), TaskGuard::new(handle));
        info!(%room, ?period, "room scheduler started");
        Ok(())
    }

    /// Cancel the room's timer; returns whether one was running.
    pub async fn stop_room(&self, room: &RoomName) -> bool {
        let stopped = self.inner.timers.lock().await.remove(room).is_some();
        if stopped {
            info!(%room, "room scheduler stopped");
        }
        stopped
    }

    pub async fn is_scheduled(&self, room: &RoomName) -> bool {
        self.inner
            .timers
            .lock()
            .await
            .get(room)
            .is_some_and(|guard| !guard.is_finished())
    }
}
