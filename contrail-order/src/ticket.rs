use chrono::{DateTime, Utc};
use contrail_catalog::{FleetRegistry, FlightId, FlightSchedule};
use contrail_core::{IdAllocator, LedgerError, LedgerResult};
use contrail_shared::{Address, Amount, SeatClass};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

pub type TicketId = u64;

/// Default cap on live tickets one buyer may hold for a single flight.
pub const MAX_TICKETS_PER_FLIGHT: u32 = 4;

/// A sold seat. `amount_paid` is the class price, never the offered price.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ticket {
    pub buyer: Address,
    pub amount_paid: Amount,
    pub flight_id: FlightId,
    pub seat_class: SeatClass,
}

/// Result of erasing a ticket, carrying what the payout step needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cancellation {
    pub ticket_id: TicketId,
    pub ticket: Ticket,
    pub departure_time: DateTime<Utc>,
}

/// Issued tickets and the per-(flight, buyer) purchase counters.
#[derive(Debug, Clone)]
pub struct TicketLedger {
    tickets: Vec<Option<Ticket>>,
    ids: IdAllocator,
    holdings: HashMap<(FlightId, Address), u32>,
    max_per_flight: u32,
}

impl TicketLedger {
    pub fn new(max_per_flight: u32) -> Self {
        Self {
            tickets: Vec::new(),
            ids: IdAllocator::new("ticket"),
            holdings: HashMap::new(),
            max_per_flight,
        }
    }

    /// Validate a purchase, take the seat and record the ticket.
    #[allow(clippy::too_many_arguments)]
    pub fn issue(
        &mut self,
        schedule: &mut FlightSchedule,
        fleet: &FleetRegistry,
        flight_id: FlightId,
        buyer: Address,
        seat_class: SeatClass,
        offered_price: Amount,
        now: DateTime<Utc>,
    ) -> LedgerResult<(TicketId, Ticket)> {
        let flight = schedule.get(flight_id)?;

        if flight.has_departed(now) {
            return Err(LedgerError::AlreadyDeparted(format!(
                "flight {} is closed for sale",
                flight_id
            )));
        }

        let grounded = flight.airplane.on_hold
            || fleet
                .get(flight.airplane_id)
                .map(|airplane| airplane.on_hold)
                .unwrap_or(false);
        if grounded {
            return Err(LedgerError::InvariantViolation(format!(
                "airplane {} of flight {} is on hold",
                flight.airplane_id, flight_id
            )));
        }

        let held = self.tickets_held(flight_id, buyer);
        if held >= self.max_per_flight {
            return Err(LedgerError::InvariantViolation(format!(
                "{} already holds {} tickets for flight {}",
                buyer, held, flight_id
            )));
        }

        if flight.remaining_total() == 0 {
            return Err(LedgerError::InvariantViolation(format!(
                "flight {} is sold out",
                flight_id
            )));
        }
        if flight.remaining(seat_class) == 0 {
            return Err(LedgerError::InvariantViolation(format!(
                "no {} seats left on flight {}",
                seat_class, flight_id
            )));
        }

        let price = flight.price(seat_class);
        if offered_price < price {
            return Err(LedgerError::InvalidArgument(format!(
                "offered {} is below the {} price {}",
                offered_price, seat_class, price
            )));
        }

        schedule.get_mut(flight_id)?.take_seat(seat_class)?;
        *self.holdings.entry((flight_id, buyer)).or_insert(0) += 1;

        let ticket = Ticket {
            buyer,
            amount_paid: price,
            flight_id,
            seat_class,
        };
        let ticket_id = self.ids.allocate();
        self.tickets.push(Some(ticket.clone()));

        Ok((ticket_id, ticket))
    }

    /// Return the seat and erase the ticket. Only the recorded buyer may do
    /// this, and only before the flight departs.
    pub fn void(
        &mut self,
        schedule: &mut FlightSchedule,
        ticket_id: TicketId,
        caller: Address,
        now: DateTime<Utc>,
    ) -> LedgerResult<Cancellation> {
        let ticket = self.get(ticket_id)?.clone();
        if ticket.buyer != caller {
            return Err(LedgerError::Unauthorized(format!(
                "{} does not hold ticket {}",
                caller, ticket_id
            )));
        }

        let flight = schedule.get_mut(ticket.flight_id)?;
        if flight.has_departed(now) {
            return Err(LedgerError::AlreadyDeparted(format!(
                "flight {} of ticket {} departed at {}",
                ticket.flight_id,
                ticket_id,
                flight.departure_time.to_rfc3339()
            )));
        }
        flight.release_seat(ticket.seat_class)?;
        let departure_time = flight.departure_time;

        let key = (ticket.flight_id, ticket.buyer);
        if let Some(count) = self.holdings.get_mut(&key) {
            *count = count.saturating_sub(1);
            if *count == 0 {
                self.holdings.remove(&key);
            }
        }

        if let Some(slot) = self.tickets.get_mut(slot(ticket_id)) {
            *slot = None;
        }

        Ok(Cancellation {
            ticket_id,
            ticket,
            departure_time,
        })
    }

    pub fn get(&self, ticket_id: TicketId) -> LedgerResult<&Ticket> {
        self.ids.ensure_issued(ticket_id)?;
        self.tickets
            .get(slot(ticket_id))
            .and_then(Option::as_ref)
            .ok_or_else(|| LedgerError::NotFound(format!("ticket {} was canceled", ticket_id)))
    }

    pub fn tickets_held(&self, flight_id: FlightId, buyer: Address) -> u32 {
        self.holdings.get(&(flight_id, buyer)).copied().unwrap_or(0)
    }

    /// Live tickets of one class on one flight.
    pub fn live_tickets(&self, flight_id: FlightId, seat_class: SeatClass) -> u32 {
        let count = self
            .tickets
            .iter()
            .flatten()
            .filter(|t| t.flight_id == flight_id && t.seat_class == seat_class)
            .count();
        u32::try_from(count).unwrap_or(u32::MAX)
    }

    pub fn count(&self) -> u64 {
        self.ids.count()
    }

    pub fn max_per_flight(&self) -> u32 {
        self.max_per_flight
    }
}

impl Default for TicketLedger {
    fn default() -> Self {
        Self::new(MAX_TICKETS_PER_FLIGHT)
    }
}

fn slot(id: u64) -> usize {
    usize::try_from(id).unwrap_or(usize::MAX)
}
