//! Interfaces to the rest of the game server, plus in-memory implementations.
//!
//! The engine never reaches for globals: presence, trade agreements and the
//! outbound transport are handed to [`crate::EconomyService::new`].

use crate::error::RuntimeError;
use crate::events::EngineEvent;
use sim_core::{CountryName, PlayerId, Product, RoomName, TradeAgreement, TradeKind};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{PoisonError, RwLock};
use tracing::debug;

/// Who is connected to which room.
pub trait Presence: Send + Sync {
    fn has_online_players(&self, room: &RoomName) -> bool;
    fn controller_of(&self, room: &RoomName, country: &CountryName) -> Option<PlayerId>;
}

/// Read access to a room's current trade agreements.
pub trait AgreementSource: Send + Sync {
    fn trade_agreements(&self, room: &RoomName) -> Vec<TradeAgreement>;
}

/// Fire-and-forget outbound channel.
pub trait Transport: Send + Sync {
    fn publish(&self, event: EngineEvent);
}

/// Presence table maintained by the connection layer.
#[derive(Debug, Default)]
pub struct OnlinePlayers {
    rooms: RwLock<HashMap<RoomName, HashMap<CountryName, PlayerId>>>,
}

impl OnlinePlayers {
    pub fn join(&self, room: RoomName, country: CountryName, player: PlayerId) {
        let mut rooms = self.rooms.write().unwrap_or_else(PoisonError::into_inner);
        rooms.entry(room).or_default().insert(country, player);
    }

    pub fn leave(&self, room: &RoomName, country: &CountryName) {
        let mut rooms = self.rooms.write().unwrap_or_else(PoisonError::into_inner);
        if let Some(players) = rooms.get_mut(room) {
            players.remove(country);
            if players.is_empty() {
                rooms.remove(room);
            }
        }
    }
}

impl Presence for OnlinePlayers {
    fn has_online_players(&self, room: &RoomName) -> bool {
        let rooms = self.rooms.read().unwrap_or_else(PoisonError::into_inner);
        rooms.get(room).is_some_and(|p| !p.is_empty())
    }

    fn controller_of(&self, room: &RoomName, country: &CountryName) -> Option<PlayerId> {
        let rooms = self.rooms.read().unwrap_or_else(PoisonError::into_inner);
        rooms.get(room)?.get(country).cloned()
    }
}

/// In-memory agreement book storing every agreement as a mirrored pair.
#[derive(Debug, Default)]
pub struct TradeBook {
    rooms: RwLock<HashMap<RoomName, Vec<TradeAgreement>>>,
    next_id: AtomicU64,
}

impl TradeBook {
    /// Record an agreement seen from `origin`, plus its mirror seen from
    /// `target`. An existing pair with the same direction, product and
    /// partners is replaced. Returns the id shared by both halves.
    pub fn create(
        &self,
        room: &RoomName,
        kind: TradeKind,
        product: Product,
        origin: CountryName,
        target: CountryName,
        value: f64,
    ) -> Result<String, RuntimeError> {
        if !value.is_finite() || value <= 0.0 {
            return Err(RuntimeError::InvalidAgreement("value must be > 0"));
        }
        if origin == target {
            return Err(RuntimeError::InvalidAgreement("a country cannot trade with itself"));
        }
        let id = format!("trade-{}", self.next_id.fetch_add(1, Ordering::Relaxed) + 1);
        let primary = TradeAgreement {
            id: id.clone(),
            kind,
            product,
            value,
            origin_country: origin.clone(),
            target_country: target.clone(),
        };
        let mirror = TradeAgreement {
            id: id.clone(),
            kind: kind.mirrored(),
            product,
            value,
            origin_country: target,
            target_country: origin,
        };

        let mut rooms = self.rooms.write().unwrap_or_else(PoisonError::into_inner);
        let book = rooms.entry(room.clone()).or_default();
        let replaced: Vec<String> = book
            .iter()
            .filter(|a| {
                a.kind == primary.kind
                    && a.product == primary.product
                    && a.origin_country == primary.origin_country
                    && a.target_country == primary.target_country
            })
            .map(|a| a.id.clone())
            .collect();
        book.retain(|a| !replaced.contains(&a.id));
        debug!(%room, %id, replaced = replaced.len(), "trade agreement recorded");
        book.push(primary);
        book.push(mirror);
        Ok(id)
    }

    /// Cancel both halves of an agreement; returns whether it existed.
    pub fn cancel(&self, room: &RoomName, id: &str) -> bool {
        let mut rooms = self.rooms.write().unwrap_or_else(PoisonError::into_inner);
        let Some(book) = rooms.get_mut(room) else {
            return false;
        };
        let before = book.len();
        book.retain(|a| a.id != id);
        book.len() != before
    }
}

impl AgreementSource for TradeBook {
    fn trade_agreements(&self, room: &RoomName) -> Vec<TradeAgreement> {
        let rooms = self.rooms.read().unwrap_or_else(PoisonError::into_inner);
        rooms.get(room).cloned().unwrap_or_default()
    }
}
