use chrono::{DateTime, Utc};
use contrail_catalog::{AirplaneId, FlightId};
use contrail_core::LedgerResult;
use contrail_order::{Airline, TicketId};
use contrail_shared::{Address, Amount, SeatClass};
use serde::{Deserialize, Serialize};

/// One ledger call as it appears in a replay script.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum Command {
    AcceptAdminRole,
    CancelAdminRole,
    ChangeAdmin {
        candidate: Address,
    },
    RegisterAirplane {
        seats_first: u32,
        seats_economy: u32,
    },
    PutOnHold {
        airplane_id: AirplaneId,
    },
    PutAvailable {
        airplane_id: AirplaneId,
    },
    DeleteAirplane {
        airplane_id: AirplaneId,
    },
    ScheduleFlight {
        airplane_id: AirplaneId,
        destination: String,
        departure_time: DateTime<Utc>,
        price_first: Amount,
        price_economy: Amount,
    },
    CancelFlight {
        flight_id: FlightId,
    },
    BuyTicket {
        flight_id: FlightId,
        seat_class: SeatClass,
        offered_price: Amount,
    },
    CancelTicket {
        ticket_id: TicketId,
    },
    Withdraw,
}

/// Value returned by a successful call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum Outcome {
    Done,
    AirplaneRegistered { airplane_id: AirplaneId },
    FlightScheduled { flight_id: FlightId },
    TicketIssued { ticket_id: TicketId },
    Refunded { amount: Amount },
    Withdrawn { amount: Amount },
}

pub async fn execute(
    airline: &Airline,
    caller: Address,
    command: Command,
) -> LedgerResult<Outcome> {
    let outcome = match command {
        Command::AcceptAdminRole => {
            airline.accept_new_admin_role(caller).await?;
            Outcome::Done
        }
        Command::CancelAdminRole => {
            airline.cancel_new_admin_role(caller).await?;
            Outcome::Done
        }
        Command::ChangeAdmin { candidate } => {
            airline.change_admin(caller, candidate).await?;
            Outcome::Done
        }
        Command::RegisterAirplane {
            seats_first,
            seats_economy,
        } => Outcome::AirplaneRegistered {
            airplane_id: airline.register_airplane(caller, seats_first, seats_economy).await?,
        },
        Command::PutOnHold { airplane_id } => {
            airline.put_on_hold(caller, airplane_id).await?;
            Outcome::Done
        }
        Command::PutAvailable { airplane_id } => {
            airline.put_available(caller, airplane_id).await?;
            Outcome::Done
        }
        Command::DeleteAirplane { airplane_id } => {
            airline.delete_airplane(caller, airplane_id).await?;
            Outcome::Done
        }
        Command::ScheduleFlight {
            airplane_id,
            destination,
            departure_time,
            price_first,
            price_economy,
        } => Outcome::FlightScheduled {
            flight_id: airline
                .schedule_flight(
                    caller,
                    airplane_id,
                    &destination,
                    departure_time,
                    price_first,
                    price_economy,
                )
                .await?,
        },
        Command::CancelFlight { flight_id } => {
            airline.cancel_flight(caller, flight_id).await?;
            Outcome::Done
        }
        Command::BuyTicket {
            flight_id,
            seat_class,
            offered_price,
        } => Outcome::TicketIssued {
            ticket_id: airline
                .buy_ticket(caller, flight_id, seat_class, offered_price)
                .await?,
        },
        Command::CancelTicket { ticket_id } => Outcome::Refunded {
            amount: airline.cancel_ticket(caller, ticket_id).await?,
        },
        Command::Withdraw => Outcome::Withdrawn {
            amount: airline.withdraw(caller).await?,
        },
    };
    Ok(outcome)
}
