use crate::models::address::{Address, Amount};
use crate::models::seat::SeatClass;
use chrono::{DateTime, Utc};

/// Notification emitted for every committed state change of the ledger.
#[derive(Debug, serde::Serialize, serde::Deserialize, Clone, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LedgerEvent {
    AdminChanged {
        admin: Address,
    },
    AirplaneRegistered {
        airplane_id: u64,
    },
    AirplaneOnHold {
        airplane_id: u64,
    },
    AirplaneAvailable {
        airplane_id: u64,
    },
    AirplaneDeleted {
        airplane_id: u64,
    },
    FlightScheduled {
        flight_id: u64,
    },
    FlightCanceled {
        flight_id: u64,
    },
    TicketBought {
        flight_id: u64,
        buyer: Address,
        seat_class: SeatClass,
    },
    TicketCanceled {
        ticket_id: u64,
        ex_buyer: Address,
    },
    FundsWithdrawn {
        to: Address,
        amount: Amount,
    },
}

impl LedgerEvent {
    /// Stable topic-style name, used as the log key.
    pub fn name(&self) -> &'static str {
        match self {
            LedgerEvent::AdminChanged { .. } => "admin.changed",
            LedgerEvent::AirplaneRegistered { .. } => "airplane.registered",
            LedgerEvent::AirplaneOnHold { .. } => "airplane.on_hold",
            LedgerEvent::AirplaneAvailable { .. } => "airplane.available",
            LedgerEvent::AirplaneDeleted { .. } => "airplane.deleted",
            LedgerEvent::FlightScheduled { .. } => "flight.scheduled",
            LedgerEvent::FlightCanceled { .. } => "flight.canceled",
            LedgerEvent::TicketBought { .. } => "ticket.bought",
            LedgerEvent::TicketCanceled { .. } => "ticket.canceled",
            LedgerEvent::FundsWithdrawn { .. } => "funds.withdrawn",
        }
    }
}

#[derive(Debug, serde::Serialize, serde::Deserialize, Clone, PartialEq, Eq)]
pub struct EventRecord {
    pub sequence: u64,
    pub recorded_at: DateTime<Utc>,
    pub event: LedgerEvent,
}
