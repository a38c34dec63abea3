//! Room-scoped economic state.
//!
//! Each room is an independent [`RoomEconomy`] behind its own mutex: ticks,
//! policy changes and bond issuance for a room are serialised, rooms never
//! block each other.

use crate::error::RuntimeError;
use crate::step::{step_country, LedgerEvent, StepContext, StepMode};
use chrono::{DateTime, Utc};
use sim_core::{
    validate_country_state, CountryCatalog, CountryEconomicState, CountryName, DebtContract,
    EngineConfig, PolicyLever, RoomName, RoomSnapshot, StoreSnapshot,
};
use sim_econ::{debt, indicators, room_rng, EconRng};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tracing::error;

/// Every country of one room, their debt books and the room's RNG.
#[derive(Debug)]
pub struct RoomEconomy {
    pub room_name: RoomName,
    pub states: BTreeMap<CountryName, CountryEconomicState>,
    pub debts: BTreeMap<CountryName, Vec<DebtContract>>,
    pub next_debt_id: u64,
    rng: EconRng,
}

/// Outcome of one scheduled room tick.
#[derive(Debug, Default)]
pub struct RoomTick {
    pub events: Vec<(CountryName, LedgerEvent)>,
    pub failed: Vec<CountryName>,
}

impl RoomEconomy {
    /// Seed a room from static country definitions.
    pub fn from_catalog(
        room_name: RoomName,
        catalog: &CountryCatalog,
        config: &EngineConfig,
        now: DateTime<Utc>,
    ) -> Self {
        let mut states = BTreeMap::new();
        let mut debts = BTreeMap::new();
        let mut next_debt_id = 1;
        for (country, def) in catalog {
            let mut state = def.seed_state();
            state.credit_rating = indicators::credit_rating(&state);
            let book =
                debt::seed_initial_contracts(state.public_debt, state.interest_rate, next_debt_id, now);
            next_debt_id += book.len() as u64;
            debts.insert(country.clone(), book);
            states.insert(country.clone(), state);
        }
        let rng = room_rng(config.rng_seed, &room_name.0);
        Self {
            room_name,
            states,
            debts,
            next_debt_id,
            rng,
        }
    }

    /// Rebuild a room from a snapshot, rejecting states that break invariants.
    pub fn from_snapshot(snapshot: RoomSnapshot, config: &EngineConfig) -> Result<Self, RuntimeError> {
        for state in snapshot.states.values() {
            validate_country_state(state)?;
        }
        let rng = room_rng(config.rng_seed, &snapshot.room_name.0);
        Ok(Self {
            room_name: snapshot.room_name,
            states: snapshot.states,
            debts: snapshot.debts,
            next_debt_id: snapshot.next_debt_id,
            rng,
        })
    }

    pub fn snapshot(&self, taken_at: DateTime<Utc>) -> RoomSnapshot {
        RoomSnapshot {
            room_name: self.room_name.clone(),
            states: self.states.clone(),
            debts: self.debts.clone(),
            next_debt_id: self.next_debt_id,
            taken_at,
        }
    }

    pub fn state(&self, country: &CountryName) -> Result<&CountryEconomicState, RuntimeError> {
        self.states
            .get(country)
            .ok_or_else(|| RuntimeError::CountryNotFound {
                room: self.room_name.clone(),
                country: country.clone(),
            })
    }

    pub fn contracts(&self, country: &CountryName) -> &[DebtContract] {
        self.debts.get(country).map(Vec::as_slice).unwrap_or(&[])
    }

    fn step(
        &mut self,
        country: &CountryName,
        draft: Option<CountryEconomicState>,
        ctx: &StepContext<'_>,
        mode: StepMode,
    ) -> Result<Vec<LedgerEvent>, RuntimeError> {
        let current = self
            .states
            .get(country)
            .ok_or_else(|| RuntimeError::CountryNotFound {
                room: self.room_name.clone(),
                country: country.clone(),
            })?;
        let base = draft.as_ref().unwrap_or(current);
        let book = self.debts.get(country).map(Vec::as_slice).unwrap_or(&[]);
        let out = step_country(country, base, book, self.next_debt_id, ctx, mode, &mut self.rng)?;
        self.states.insert(country.clone(), out.state);
        self.debts.insert(country.clone(), out.debts);
        self.next_debt_id = out.next_debt_id;
        Ok(out.events)
    }

    /// Advance every country by one master tick.
    ///
    /// A country whose step fails keeps its previous state; the others still
    /// advance.
    pub fn tick(&mut self, ctx: &StepContext<'_>) -> RoomTick {
        let mut report = RoomTick::default();
        let countries: Vec<CountryName> = self.states.keys().cloned().collect();
        for country in countries {
            match self.step(&country, None, ctx, StepMode::Scheduled) {
                Ok(events) => report
                    .events
                    .extend(events.into_iter().map(|e| (country.clone(), e))),
                Err(e) => {
                    error!(room = %self.room_name, %country, error = %e, "country tick failed, state kept");
                    report.failed.push(country);
                }
            }
        }
        report
    }

    /// Store a new lever value and recompute the country immediately.
    pub fn apply_policy(
        &mut self,
        country: &CountryName,
        lever: PolicyLever,
        value: f64,
        ctx: &StepContext<'_>,
    ) -> Result<&CountryEconomicState, RuntimeError> {
        let mut draft = self.state(country)?.clone();
        draft.set_lever(lever, value);
        self.step(country, Some(draft), ctx, StepMode::Immediate)?;
        self.state(country)
    }

    /// Issue voluntary bonds for `country`, committing only a valid result.
    pub fn issue_bonds(
        &mut self,
        country: &CountryName,
        amount: f64,
        now: DateTime<Utc>,
    ) -> Result<DebtContract, RuntimeError> {
        let mut draft = self.state(country)?.clone();
        let contract = debt::issue_bonds(&mut draft, amount, self.next_debt_id, now, &mut self.rng)?;
        validate_country_state(&draft)?;
        self.states.insert(country.clone(), draft);
        self.debts
            .entry(country.clone())
            .or_default()
            .push(contract.clone());
        self.next_debt_id += 1;
        Ok(contract)
    }
}

pub type SharedRoom = Arc<Mutex<RoomEconomy>>;

/// All rooms, keyed by name.
#[derive(Debug, Default)]
pub struct RoomStore {
    rooms: RwLock<HashMap<RoomName, SharedRoom>>,
}

impl RoomStore {
    /// Insert or replace a room.
    pub async fn insert(&self, economy: RoomEconomy) -> SharedRoom {
        let room = Arc::new(Mutex::new(economy));
        let name = room.lock().await.room_name.clone();
        self.rooms.write().await.insert(name, room.clone());
        room
    }

    pub async fn get(&self, room: &RoomName) -> Result<SharedRoom, RuntimeError> {
        self.rooms
            .read()
            .await
            .get(room)
            .cloned()
            .ok_or_else(|| RuntimeError::RoomNotFound(room.clone()))
    }

    pub async fn remove(&self, room: &RoomName) -> Option<SharedRoom> {
        self.rooms.write().await.remove(room)
    }

    pub async fn room_names(&self) -> Vec<RoomName> {
        let mut names: Vec<RoomName> = self.rooms.read().await.keys().cloned().collect();
        names.sort();
        names
    }

    /// Point-in-time copy of every room.
    ///
    /// Rooms are copied one at a time, so a tick in one room only delays the
    /// copy of that room.
    pub async fn snapshot_all(&self, taken_at: DateTime<Utc>) -> StoreSnapshot {
        let rooms: Vec<SharedRoom> = self.rooms.read().await.values().cloned().collect();
        let mut out = StoreSnapshot::default();
        for room in rooms {
            let snap = room.lock().await.snapshot(taken_at);
            out.rooms.insert(snap.room_name.clone(), snap);
        }
        out
    }
}
