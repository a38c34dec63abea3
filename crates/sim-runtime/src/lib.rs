#![deny(warnings)]

//! Runtime for the geo-economy engine: per-room state, scheduled ticks,
//! policy gateway and snapshot persistence.
//!
//! [`EconomyService`] is the single entry point. It owns the room store and
//! the collaborators handed to it at construction; every operation is scoped
//! to one room and serialised by that room's lock.

use chrono::Utc;
use persistence::SnapshotStore;
use sim_core::{
    validate_engine_config, CountryCatalog, CountryEconomicState, CountryName, EngineConfig,
    RoomName, RoomSnapshot, StoreSnapshot,
};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

pub mod bridge;
pub mod collaborators;
pub mod error;
pub mod events;
pub mod gateway;
pub mod scheduler;
pub mod step;
pub mod store;

pub use collaborators::{AgreementSource, OnlinePlayers, Presence, TradeBook, Transport};
pub use error::RuntimeError;
pub use events::{BroadcastTransport, EngineEvent, Notification};
pub use gateway::BondIssueResponse;
pub use scheduler::TaskGuard;
pub use step::{LedgerEvent, StepContext, StepMode};
pub use store::{RoomEconomy, RoomStore, RoomTick};

/// External services the engine depends on.
#[derive(Clone)]
pub struct Collaborators {
    pub presence: Arc<dyn Presence>,
    pub agreements: Arc<dyn AgreementSource>,
    pub transport: Arc<dyn Transport>,
}

struct Inner {
    config: EngineConfig,
    store: RoomStore,
    collaborators: Collaborators,
    persistence: Option<SnapshotStore>,
    timers: Mutex<HashMap<RoomName, TaskGuard>>,
    bridge: Mutex<Option<TaskGuard>>,
}

/// Handle to the economy engine; cheap to clone.
#[derive(Clone)]
pub struct EconomyService {
    inner: Arc<Inner>,
}

impl EconomyService {
    pub fn new(
        config: EngineConfig,
        collaborators: Collaborators,
        persistence: Option<SnapshotStore>,
    ) -> Result<Self, RuntimeError> {
        validate_engine_config(&config)?;
        Ok(Self {
            inner: Arc::new(Inner {
                config,
                store: RoomStore::default(),
                collaborators,
                persistence,
                timers: Mutex::new(HashMap::new()),
                bridge: Mutex::new(None),
            }),
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.inner.config
    }

    /// Seed (or re-seed) a room from the country catalog.
    ///
    /// Does not start the room's timer; see [`EconomyService::start_room`].
    pub async fn initialize_room(
        &self,
        room: RoomName,
        catalog: &CountryCatalog,
    ) -> Result<BTreeMap<CountryName, CountryEconomicState>, RuntimeError> {
        let economy = RoomEconomy::from_catalog(room.clone(), catalog, &self.inner.config, Utc::now());
        let states = economy.states.clone();
        self.inner.store.insert(economy).await;
        info!(%room, countries = states.len(), "room economy initialised");
        Ok(states)
    }

    /// Tear a room down: stop its timer, drop its states and debt books,
    /// write a final room snapshot and rewrite the aggregate without it.
    /// Persistence failures are logged only.
    pub async fn remove_room(&self, room: &RoomName) -> Result<(), RuntimeError> {
        self.stop_room(room).await;
        let shared = self
            .inner
            .store
            .remove(room)
            .await
            .ok_or_else(|| RuntimeError::RoomNotFound(room.clone()))?;
        let snapshot = shared.lock().await.snapshot(Utc::now());
        if let Some(store) = &self.inner.persistence {
            if let Err(e) = store.save_room(&snapshot).await {
                warn!(%room, error = %e, "final room snapshot failed");
            }
            // The aggregate must not resurrect the room on restore.
            if let Err(e) = self.save_snapshot().await {
                warn!(%room, error = %e, "aggregate snapshot after removal failed");
            }
        }
        info!(%room, "room economy removed");
        Ok(())
    }

    /// Run one scheduled tick for `room`.
    ///
    /// Returns `None` when nobody is online in the room and the tick was
    /// skipped.
    pub async fn tick_room(&self, room: &RoomName) -> Result<Option<RoomTick>, RuntimeError> {
        let shared = self.inner.store.get(room).await?;
        let collab = &self.inner.collaborators;
        if !collab.presence.has_online_players(room) {
            debug!(%room, "no players online, tick skipped");
            return Ok(None);
        }
        let agreements = collab.agreements.trade_agreements(room);
        let now = Utc::now();
        let ctx = StepContext {
            config: &self.inner.config,
            agreements: &agreements,
            now,
        };

        let (report, states) = {
            let mut economy = shared.lock().await;
            let report = economy.tick(&ctx);
            (report, economy.states.clone())
        };

        for (country, event) in &report.events {
            self.notify(room, country, Notification::from_ledger(country, event));
        }
        collab.transport.publish(EngineEvent::StatesUpdated {
            room_name: room.clone(),
            states,
            timestamp: now,
        });
        Ok(Some(report))
    }

    /// Send a notification to the player controlling `country`, if online.
    fn notify(&self, room: &RoomName, country: &CountryName, notification: Notification) {
        let collab = &self.inner.collaborators;
        if let Some(player) = collab.presence.controller_of(room, country) {
            collab.transport.publish(EngineEvent::Notify {
                room_name: room.clone(),
                player,
                notification,
            });
        }
    }

    pub async fn country_state(
        &self,
        room: &RoomName,
        country: &CountryName,
    ) -> Result<CountryEconomicState, RuntimeError> {
        let shared = self.inner.store.get(room).await?;
        let economy = shared.lock().await;
        economy.state(country).cloned()
    }

    pub async fn room_states(
        &self,
        room: &RoomName,
    ) -> Result<BTreeMap<CountryName, CountryEconomicState>, RuntimeError> {
        let shared = self.inner.store.get(room).await?;
        let states = shared.lock().await.states.clone();
        Ok(states)
    }

    pub async fn snapshot_room(&self, room: &RoomName) -> Result<RoomSnapshot, RuntimeError> {
        let shared = self.inner.store.get(room).await?;
        let snapshot = shared.lock().await.snapshot(Utc::now());
        Ok(snapshot)
    }

    pub async fn snapshot_all(&self) -> StoreSnapshot {
        self.inner.store.snapshot_all(Utc::now()).await
    }

    pub async fn room_names(&self) -> Vec<RoomName> {
        self.inner.store.room_names().await
    }
}
