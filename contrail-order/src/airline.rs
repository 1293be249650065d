use crate::escrow::RefundPolicy;
use crate::state::{Journal, LedgerState};
use crate::ticket::{Ticket, TicketId, MAX_TICKETS_PER_FLIGHT};
use chrono::{DateTime, Utc};
use contrail_catalog::{Airplane, AirplaneId, Flight, FlightId};
use contrail_core::token::TokenError;
use contrail_core::{Clock, EventLog, LedgerError, LedgerResult, ReentrancyGuard, TokenLedger};
use contrail_shared::{Address, Amount, EventRecord, LedgerEvent, SeatClass};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

/// Business rules fixed at construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AirlinePolicy {
    pub max_tickets_per_flight: u32,
    pub refund: RefundPolicy,
}

impl Default for AirlinePolicy {
    fn default() -> Self {
        Self {
            max_tickets_per_flight: MAX_TICKETS_PER_FLIGHT,
            refund: RefundPolicy::default(),
        }
    }
}

#[derive(Debug)]
struct Books {
    state: LedgerState,
    events: EventLog,
}

/// The ledger as it was before a guarded call committed.
struct Checkpoint {
    state: LedgerState,
    events: usize,
}

/// The airline ledger: fleet, schedule, tickets and escrow behind one
/// admin role.
///
/// Calls run one at a time, each for its whole duration including the token
/// callout; concurrent callers wait their turn. Each call runs on a staged
/// copy of [`LedgerState`] and commits only if it succeeds. Calls that move
/// tokens (`buy_ticket`, `cancel_ticket`, `withdraw`) commit their effects
/// before the token callout and restore the pre-call state if the callout
/// fails. A token that calls back into the ledger from its callout may use
/// every operation except those three.
pub struct Airline {
    books: Mutex<Books>,
    guard: ReentrancyGuard,
    token: Arc<dyn TokenLedger>,
    clock: Arc<dyn Clock>,
    custody: Address,
    policy: AirlinePolicy,
}

impl Airline {
    /// `custody` is the ledger's own token account; `admin` receives the admin role.
    pub fn new(
        admin: Address,
        custody: Address,
        token: Arc<dyn TokenLedger>,
        clock: Arc<dyn Clock>,
        policy: AirlinePolicy,
    ) -> LedgerResult<Self> {
        if admin.is_zero() {
            return Err(LedgerError::InvalidArgument("admin is the zero address".to_string()));
        }
        if custody.is_zero() || custody == admin {
            return Err(LedgerError::InvalidArgument(
                "custody account must be a dedicated non-zero address".to_string(),
            ));
        }
        if policy.max_tickets_per_flight == 0 {
            return Err(LedgerError::InvalidArgument("ticket cap must be positive".to_string()));
        }
        policy.refund.validate()?;

        let start = clock.now();
        info!(
            "Airline ledger opened at {} with admin {} and custody {}",
            start.to_rfc3339(),
            admin,
            custody
        );

        Ok(Self {
            books: Mutex::new(Books {
                state: LedgerState::new(admin, policy.max_tickets_per_flight, start),
                events: EventLog::new(),
            }),
            guard: ReentrancyGuard::new(),
            token,
            clock,
            custody,
            policy,
        })
    }

    pub fn custody(&self) -> Address {
        self.custody
    }

    pub fn policy(&self) -> &AirlinePolicy {
        &self.policy
    }

    // ------------------------------------------------------------------
    // Admin succession
    // ------------------------------------------------------------------

    pub async fn accept_new_admin_role(&self, caller: Address) -> LedgerResult<()> {
        self.commit("accept_new_admin_role", |state, _| {
            state.admin.accept_new_admin_role(caller)
        })
        .await?;
        info!("{} accepted the admin role candidacy", caller);
        Ok(())
    }

    pub async fn cancel_new_admin_role(&self, caller: Address) -> LedgerResult<()> {
        self.commit("cancel_new_admin_role", |state, _| {
            state.admin.cancel_new_admin_role(caller);
            Ok(())
        })
        .await?;
        info!("{} withdrew the admin role candidacy", caller);
        Ok(())
    }

    pub async fn change_admin(&self, caller: Address, candidate: Address) -> LedgerResult<()> {
        self.commit("change_admin", |state, journal| {
            state.admin.change_admin(caller, candidate)?;
            journal.emit(LedgerEvent::AdminChanged { admin: candidate });
            Ok(())
        })
        .await?;
        info!("Admin role handed from {} to {}", caller, candidate);
        Ok(())
    }

    // ------------------------------------------------------------------
    // Fleet
    // ------------------------------------------------------------------

    pub async fn register_airplane(
        &self,
        caller: Address,
        seats_first: u32,
        seats_economy: u32,
    ) -> LedgerResult<AirplaneId> {
        let airplane_id = self
            .commit("register_airplane", |state, journal| {
                state.admin.ensure_admin(caller)?;
                let airplane_id = state.fleet.register(seats_first, seats_economy)?;
                journal.emit(LedgerEvent::AirplaneRegistered { airplane_id });
                Ok(airplane_id)
            })
            .await?;
        info!(
            "Registered airplane {} ({} first, {} economy)",
            airplane_id, seats_first, seats_economy
        );
        Ok(airplane_id)
    }

    pub async fn put_on_hold(&self, caller: Address, airplane_id: AirplaneId) -> LedgerResult<()> {
        self.commit("put_on_hold", |state, journal| {
            state.admin.ensure_admin(caller)?;
            state.fleet.put_on_hold(airplane_id)?;
            journal.emit(LedgerEvent::AirplaneOnHold { airplane_id });
            Ok(())
        })
        .await?;
        info!("Airplane {} put on hold", airplane_id);
        Ok(())
    }

    pub async fn put_available(
        &self,
        caller: Address,
        airplane_id: AirplaneId,
    ) -> LedgerResult<()> {
        self.commit("put_available", |state, journal| {
            state.admin.ensure_admin(caller)?;
            state.fleet.put_available(airplane_id)?;
            journal.emit(LedgerEvent::AirplaneAvailable { airplane_id });
            Ok(())
        })
        .await?;
        info!("Airplane {} available", airplane_id);
        Ok(())
    }

    pub async fn delete_airplane(
        &self,
        caller: Address,
        airplane_id: AirplaneId,
    ) -> LedgerResult<()> {
        self.commit("delete_airplane", |state, journal| {
            state.admin.ensure_admin(caller)?;
            state.fleet.delete(airplane_id)?;
            journal.emit(LedgerEvent::AirplaneDeleted { airplane_id });
            Ok(())
        })
        .await?;
        info!("Airplane {} deleted", airplane_id);
        Ok(())
    }

    // ------------------------------------------------------------------
    // Schedule
    // ------------------------------------------------------------------

    pub async fn schedule_flight(
        &self,
        caller: Address,
        airplane_id: AirplaneId,
        destination: &str,
        departure_time: DateTime<Utc>,
        price_first: Amount,
        price_economy: Amount,
    ) -> LedgerResult<FlightId> {
        let flight_id = self
            .commit("schedule_flight", |state, journal| {
                state.admin.ensure_admin(caller)?;
                let flight_id = state.schedule.schedule(
                    &mut state.fleet,
                    airplane_id,
                    destination,
                    departure_time,
                    price_first,
                    price_economy,
                    journal.now(),
                )?;
                journal.emit(LedgerEvent::FlightScheduled { flight_id });
                Ok(flight_id)
            })
            .await?;
        info!(
            "Scheduled flight {} on airplane {} to {} departing {}",
            flight_id,
            airplane_id,
            destination,
            departure_time.to_rfc3339()
        );
        Ok(flight_id)
    }

    pub async fn cancel_flight(&self, caller: Address, flight_id: FlightId) -> LedgerResult<()> {
        self.commit("cancel_flight", |state, journal| {
            state.admin.ensure_admin(caller)?;
            state.schedule.cancel(flight_id, journal.now())?;
            journal.emit(LedgerEvent::FlightCanceled { flight_id });
            Ok(())
        })
        .await?;
        info!("Flight {} canceled", flight_id);
        Ok(())
    }

    // ------------------------------------------------------------------
    // Tickets and escrow
    // ------------------------------------------------------------------

    /// Sell one seat and pull the class price from the buyer into custody.
    pub async fn buy_ticket(
        &self,
        caller: Address,
        flight_id: FlightId,
        seat_class: SeatClass,
        offered_price: Amount,
    ) -> LedgerResult<TicketId> {
        self.guard
            .serialize(self.sell(caller, flight_id, seat_class, offered_price))
            .await
    }

    /// Return the seat and pay the tiered refund to the ticket's buyer.
    /// Returns the refunded amount.
    pub async fn cancel_ticket(
        &self,
        caller: Address,
        ticket_id: TicketId,
    ) -> LedgerResult<Amount> {
        self.guard.serialize(self.refund(caller, ticket_id)).await
    }

    /// Move the whole custody balance to the admin once every scheduled
    /// flight has departed. Returns the amount moved.
    pub async fn withdraw(&self, caller: Address) -> LedgerResult<Amount> {
        self.guard.serialize(self.pay_out(caller)).await
    }

    async fn sell(
        &self,
        caller: Address,
        flight_id: FlightId,
        seat_class: SeatClass,
        offered_price: Amount,
    ) -> LedgerResult<TicketId> {
        let _entered = self.guard.enter("buy_ticket")?;

        let ((ticket_id, amount), checkpoint) = self
            .stage("buy_ticket", |state, journal| {
                let (ticket_id, ticket) = state.tickets.issue(
                    &mut state.schedule,
                    &state.fleet,
                    flight_id,
                    caller,
                    seat_class,
                    offered_price,
                    journal.now(),
                )?;
                state.escrow.deposit(ticket.amount_paid)?;
                journal.emit(LedgerEvent::TicketBought {
                    flight_id,
                    buyer: caller,
                    seat_class,
                });
                Ok((ticket_id, ticket.amount_paid))
            })
            .await?;

        debug!("Pulling {} from {} into custody for ticket {}", amount, caller, ticket_id);
        let pulled = self
            .token
            .transfer_from(self.custody, caller, self.custody, amount)
            .await;
        if let Err(e) = settle(pulled, "transfer_from") {
            self.restore(checkpoint).await;
            warn!("buy_ticket rolled back for {} on flight {}: {}", caller, flight_id, e);
            return Err(e);
        }

        info!(
            "Ticket {} sold to {} on flight {} ({}) for {}",
            ticket_id, caller, flight_id, seat_class, amount
        );
        Ok(ticket_id)
    }

    async fn refund(&self, caller: Address, ticket_id: TicketId) -> LedgerResult<Amount> {
        let _entered = self.guard.enter("cancel_ticket")?;
        let refund_policy = self.policy.refund;

        let ((buyer, refund), checkpoint) = self
            .stage("cancel_ticket", |state, journal| {
                let now = journal.now();
                let cancellation = state.tickets.void(&mut state.schedule, ticket_id, caller, now)?;
                let buyer = cancellation.ticket.buyer;
                let refund = refund_policy.refund_amount(
                    cancellation.ticket.amount_paid,
                    cancellation.departure_time,
                    now,
                );
                state.escrow.release(refund)?;
                journal.emit(LedgerEvent::TicketCanceled {
                    ticket_id,
                    ex_buyer: buyer,
                });
                Ok((buyer, refund))
            })
            .await?;

        if refund > 0 {
            debug!("Paying refund of {} to {} for ticket {}", refund, buyer, ticket_id);
            let paid = self.token.transfer(self.custody, buyer, refund).await;
            if let Err(e) = settle(paid, "transfer") {
                self.restore(checkpoint).await;
                warn!("cancel_ticket rolled back for ticket {}: {}", ticket_id, e);
                return Err(e);
            }
        }

        info!("Ticket {} canceled by {}, refunded {}", ticket_id, buyer, refund);
        Ok(refund)
    }

    async fn pay_out(&self, caller: Address) -> LedgerResult<Amount> {
        let _entered = self.guard.enter("withdraw")?;

        self.inspect(|state, now| Self::check_withdrawal(state, caller, now))
            .await?;

        let balance = self
            .token
            .balance_of(self.custody)
            .await
            .map_err(|e| LedgerError::PaymentFailed(format!("balance_of failed: {}", e)))?;

        let (admin, checkpoint) = self
            .stage("withdraw", |state, journal| {
                let admin = Self::check_withdrawal(state, caller, journal.now())?;
                state.escrow.drain();
                journal.emit(LedgerEvent::FundsWithdrawn {
                    to: admin,
                    amount: balance,
                });
                Ok(admin)
            })
            .await?;

        if balance > 0 {
            let paid = self.token.transfer(self.custody, admin, balance).await;
            if let Err(e) = settle(paid, "transfer") {
                self.restore(checkpoint).await;
                warn!("withdraw rolled back: {}", e);
                return Err(e);
            }
        }

        info!("Withdrew {} from custody to admin {}", balance, admin);
        Ok(balance)
    }

    fn check_withdrawal(
        state: &LedgerState,
        caller: Address,
        now: DateTime<Utc>,
    ) -> LedgerResult<Address> {
        state.admin.ensure_admin(caller)?;
        let latest = state.schedule.latest_departure();
        if now <= latest {
            return Err(LedgerError::InvariantViolation(format!(
                "funds are locked until the last departure at {}",
                latest.to_rfc3339()
            )));
        }
        Ok(state.admin.admin())
    }

    // ------------------------------------------------------------------
    // Views
    // ------------------------------------------------------------------

    pub async fn admin(&self) -> Address {
        self.read(|books| books.state.admin.admin()).await
    }

    pub async fn has_consented(&self, candidate: Address) -> bool {
        self.read(|books| books.state.admin.has_consented(candidate)).await
    }

    pub async fn airplane(&self, airplane_id: AirplaneId) -> LedgerResult<Airplane> {
        self.read(|books| books.state.fleet.get(airplane_id).cloned()).await
    }

    pub async fn airplane_count(&self) -> u64 {
        self.read(|books| books.state.fleet.count()).await
    }

    pub async fn flight(&self, flight_id: FlightId) -> LedgerResult<Flight> {
        self.read(|books| books.state.schedule.get(flight_id).cloned()).await
    }

    pub async fn flight_count(&self) -> u64 {
        self.read(|books| books.state.schedule.count()).await
    }

    pub async fn latest_departure(&self) -> DateTime<Utc> {
        self.read(|books| books.state.schedule.latest_departure()).await
    }

    pub async fn ticket(&self, ticket_id: TicketId) -> LedgerResult<Ticket> {
        self.read(|books| books.state.tickets.get(ticket_id).cloned()).await
    }

    pub async fn ticket_count(&self) -> u64 {
        self.read(|books| books.state.tickets.count()).await
    }

    pub async fn tickets_held(&self, flight_id: FlightId, buyer: Address) -> u32 {
        self.read(|books| books.state.tickets.tickets_held(flight_id, buyer))
            .await
    }

    pub async fn live_tickets(&self, flight_id: FlightId, seat_class: SeatClass) -> u32 {
        self.read(|books| books.state.tickets.live_tickets(flight_id, seat_class))
            .await
    }

    /// Funds the ledger accounts for in custody.
    pub async fn escrowed(&self) -> Amount {
        self.read(|books| books.state.escrow.held()).await
    }

    /// Committed events with `sequence >= from`.
    pub async fn events_since(&self, from: u64) -> Vec<EventRecord> {
        self.read(|books| books.events.since(from).to_vec()).await
    }

    // ------------------------------------------------------------------
    // Staging
    // ------------------------------------------------------------------

    /// Read the books on this call's turn, never mid-way through another call.
    async fn read<R>(&self, view: impl FnOnce(&Books) -> R) -> R {
        self.guard
            .serialize(async {
                let books = self.books.lock().await;
                view(&books)
            })
            .await
    }

    async fn inspect<R, F>(&self, op: F) -> LedgerResult<R>
    where
        F: FnOnce(&LedgerState, DateTime<Utc>) -> LedgerResult<R>,
    {
        let now = self.clock.now();
        let books = self.books.lock().await;
        op(&books.state, now)
    }

    /// Run `op` on a copy of the state, on this call's turn, and keep the
    /// copy only on success.
    async fn commit<R, F>(&self, operation: &str, op: F) -> LedgerResult<R>
    where
        F: FnOnce(&mut LedgerState, &mut Journal) -> LedgerResult<R>,
    {
        let (out, _) = self.guard.serialize(self.stage(operation, op)).await?;
        Ok(out)
    }

    /// Like [`Airline::commit`], also handing back the books as they were
    /// before the call so a failed callout can put them back. Runs on the
    /// caller's turn.
    async fn stage<R, F>(&self, operation: &str, op: F) -> LedgerResult<(R, Checkpoint)>
    where
        F: FnOnce(&mut LedgerState, &mut Journal) -> LedgerResult<R>,
    {
        let mut journal = Journal::new(self.clock.now());
        let mut books = self.books.lock().await;
        let mut draft = books.state.clone();

        match op(&mut draft, &mut journal) {
            Ok(out) => {
                let checkpoint = Checkpoint {
                    state: std::mem::replace(&mut books.state, draft),
                    events: books.events.len(),
                };
                journal.publish(&mut books.events);
                Ok((out, checkpoint))
            }
            Err(e) => {
                warn!("{} rejected: {}", operation, e);
                Err(e)
            }
        }
    }

    /// Put back the books of a guarded call. Anything committed since came
    /// from that call or its own callbacks, since calls take turns.
    async fn restore(&self, checkpoint: Checkpoint) {
        let mut books = self.books.lock().await;
        books.state = checkpoint.state;
        books.events.rewind(checkpoint.events);
    }
}

fn settle(result: Result<bool, TokenError>, call: &str) -> LedgerResult<()> {
    match result {
        Ok(true) => Ok(()),
        Ok(false) => Err(LedgerError::PaymentFailed(format!("token refused {}", call))),
        Err(e) => Err(LedgerError::PaymentFailed(format!("{} failed: {}", call, e))),
    }
}
