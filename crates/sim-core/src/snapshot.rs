use crate::debt::DebtContract;
use crate::state::CountryEconomicState;
use crate::{CountryName, RoomName};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Point-in-time copy of one room: every country state and its debt book.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomSnapshot {
    pub room_name: RoomName,
    pub states: BTreeMap<CountryName, CountryEconomicState>,
    #[serde(default)]
    pub debts: BTreeMap<CountryName, Vec<DebtContract>>,
    pub next_debt_id: u64,
    pub taken_at: DateTime<Utc>,
}

/// Snapshot of every room, written for process-restart recovery.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreSnapshot {
    pub rooms: BTreeMap<RoomName, RoomSnapshot>,
}
