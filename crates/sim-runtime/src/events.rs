use crate::collaborators::Transport;
use crate::step::LedgerEvent;
use chrono::{DateTime, Utc};
use serde::Serialize;
use sim_core::{CountryEconomicState, CountryName, CreditRating, PlayerId, RoomName};
use std::collections::BTreeMap;
use tokio::sync::broadcast;

/// Debt notifications addressed to the player controlling a country.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum Notification {
    DebtContractsUpdated {
        country: CountryName,
        contracts_completed: usize,
        active_contracts: usize,
        total_remaining_debt: f64,
        total_payment: f64,
        cycle: u64,
    },
    EmergencyBondsIssued {
        country: CountryName,
        amount: f64,
        rate: f64,
        rating: CreditRating,
        at_limit: bool,
    },
    DebtCeilingLocked {
        country: CountryName,
        shortfall: f64,
    },
}

impl Notification {
    pub fn from_ledger(country: &CountryName, event: &LedgerEvent) -> Self {
        match event {
            LedgerEvent::Payments {
                summary,
                active_contracts,
                total_remaining,
                cycle,
            } => Notification::DebtContractsUpdated {
                country: country.clone(),
                contracts_completed: summary.contracts_closed,
                active_contracts: *active_contracts,
                total_remaining_debt: *total_remaining,
                total_payment: summary.total_paid,
                cycle: *cycle,
            },
            LedgerEvent::EmergencyIssued {
                amount,
                rate,
                rating,
                at_limit,
            } => Notification::EmergencyBondsIssued {
                country: country.clone(),
                amount: *amount,
                rate: *rate,
                rating: *rating,
                at_limit: *at_limit,
            },
            LedgerEvent::CeilingLocked { shortfall } => Notification::DebtCeilingLocked {
                country: country.clone(),
                shortfall: *shortfall,
            },
        }
    }
}

/// Everything the engine pushes to the outside world.
#[derive(Clone, Debug, Serialize)]
#[serde(tag = "event", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum EngineEvent {
    /// Full room state after a tick or a policy change.
    StatesUpdated {
        room_name: RoomName,
        states: BTreeMap<CountryName, CountryEconomicState>,
        timestamp: DateTime<Utc>,
    },
    Notify {
        room_name: RoomName,
        player: PlayerId,
        notification: Notification,
    },
}

impl EngineEvent {
    pub fn room_name(&self) -> &RoomName {
        match self {
            EngineEvent::StatesUpdated { room_name, .. } | EngineEvent::Notify { room_name, .. } => {
                room_name
            }
        }
    }
}

/// [`Transport`] fanning events out over a tokio broadcast channel.
#[derive(Clone)]
pub struct BroadcastTransport {
    tx: broadcast::Sender<EngineEvent>,
}

impl BroadcastTransport {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<EngineEvent> {
        self.tx.subscribe()
    }
}

impl Default for BroadcastTransport {
    fn default() -> Self {
        Self::new(1024)
    }
}

impl Transport for BroadcastTransport {
    fn publish(&self, event: EngineEvent) {
        // No subscribers is not an error.
        let _ = self.tx.send(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sim_econ::PaymentSummary;

    #[test]
    fn notifications_serialize_tagged() {
        let n = Notification::from_ledger(
            &"Chile".into(),
            &LedgerEvent::CeilingLocked { shortfall: 4.0 },
        );
        let json = serde_json::to_value(&n).unwrap();
        assert_eq!(json["type"], "debtCeilingLocked");
        assert_eq!(json["country"], "Chile");
    }

    #[test]
    fn payments_map_to_contract_update() {
        let event = LedgerEvent::Payments {
            summary: PaymentSummary {
                total_paid: 2.5,
                contracts_closed: 1,
                ..Default::default()
            },
            active_contracts: 3,
            total_remaining: 80.0,
            cycle: 120,
        };
        match Notification::from_ledger(&"Peru".into(), &event) {
            Notification::DebtContractsUpdated {
                contracts_completed,
                active_contracts,
                total_payment,
                ..
            } => {
                assert_eq!(contracts_completed, 1);
                assert_eq!(active_contracts, 3);
                assert_eq!(total_payment, 2.5);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[tokio::test]
    async fn broadcast_reaches_subscribers() {
        let transport = BroadcastTransport::new(8);
        let mut rx = transport.subscribe();
        transport.publish(EngineEvent::StatesUpdated {
            room_name: "r".into(),
            states: BTreeMap::new(),
            timestamp: Utc::now(),
        });
        let got = rx.recv().await.unwrap();
        assert_eq!(got.room_name(), &RoomName::from("r"));
    }
}
