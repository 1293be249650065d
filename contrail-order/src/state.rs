use crate::escrow::Escrow;
use crate::ticket::TicketLedger;
use chrono::{DateTime, Utc};
use contrail_catalog::{FleetRegistry, FlightSchedule};
use contrail_core::{AdminSuccession, EventLog};
use contrail_shared::{Address, LedgerEvent};

/// Everything a ledger call may mutate.
///
/// Calls run against a clone and replace the original only on success, so
/// `Clone` here is what makes every operation all-or-nothing. The event log
/// is kept outside; see [`Journal`].
#[derive(Debug, Clone)]
pub struct LedgerState {
    pub admin: AdminSuccession,
    pub fleet: FleetRegistry,
    pub schedule: FlightSchedule,
    pub tickets: TicketLedger,
    pub escrow: Escrow,
}

impl LedgerState {
    pub fn new(admin: Address, max_tickets_per_flight: u32, start: DateTime<Utc>) -> Self {
        Self {
            admin: AdminSuccession::new(admin),
            fleet: FleetRegistry::new(),
            schedule: FlightSchedule::new(start),
            tickets: TicketLedger::new(max_tickets_per_flight),
            escrow: Escrow::new(),
        }
    }
}

/// The clock reading of one call and the events it raises.
///
/// Events wait here until the call commits, then go to the log in order.
#[derive(Debug)]
pub struct Journal {
    now: DateTime<Utc>,
    pending: Vec<LedgerEvent>,
}

impl Journal {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            now,
            pending: Vec::new(),
        }
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.now
    }

    pub fn emit(&mut self, event: LedgerEvent) {
        self.pending.push(event);
    }

    /// Append the pending events to `log`, stamped with the call's time.
    pub fn publish(self, log: &mut EventLog) {
        for event in self.pending {
            log.emit(self.now, event);
        }
    }
}
