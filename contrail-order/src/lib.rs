pub mod airline;
pub mod escrow;
pub mod state;
pub mod ticket;

pub use airline::{Airline, AirlinePolicy};
pub use escrow::{Escrow, RefundPolicy};
pub use state::LedgerState;
pub use ticket::{Cancellation, Ticket, TicketId, TicketLedger, MAX_TICKETS_PER_FLIGHT};
