use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use contrail_core::token::TokenError;
use contrail_core::{LedgerError, ManualClock, TokenLedger};
use contrail_order::{Airline, AirlinePolicy};
use contrail_shared::{Address, Amount, SeatClass};
use contrail_store::InMemoryToken;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, OnceLock, Weak};

/// What the token does when the ledger calls out to it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Behaviour {
    Honest,
    /// Call back into the ledger before moving funds.
    Reenter,
    /// Fail every outgoing `transfer`.
    BreakTransfers,
}

/// Token that can misbehave while the ledger waits on it.
struct HostileToken {
    inner: InMemoryToken,
    airline: OnceLock<Weak<Airline>>,
    behaviour: Mutex<Behaviour>,
    nested: Mutex<Vec<LedgerError>>,
    nested_admin_ok: AtomicBool,
}

impl HostileToken {
    fn new() -> Self {
        Self {
            inner: InMemoryToken::new(),
            airline: OnceLock::new(),
            behaviour: Mutex::new(Behaviour::Honest),
            nested: Mutex::new(Vec::new()),
            nested_admin_ok: AtomicBool::new(false),
        }
    }

    fn set(&self, behaviour: Behaviour) {
        *self.behaviour.lock().unwrap() = behaviour;
    }

    fn behaviour(&self) -> Behaviour {
        *self.behaviour.lock().unwrap()
    }

    fn nested_errors(&self) -> Vec<LedgerError> {
        self.nested.lock().unwrap().clone()
    }

    async fn call_back(&self, victim: Address) {
        let Some(airline) = self.airline.get().and_then(Weak::upgrade) else {
            return;
        };
        let admin = airline.admin().await;

        let attempts = [
            airline.buy_ticket(victim, 0, SeatClass::Economy, 50).await.err(),
            airline.cancel_ticket(victim, 0).await.err(),
            airline.withdraw(admin).await.err(),
        ];
        self.nested
            .lock()
            .unwrap()
            .extend(attempts.into_iter().flatten());

        // Unguarded operations stay reachable during a callout.
        if airline.register_airplane(admin, 1, 1).await.is_ok() {
            self.nested_admin_ok.store(true, Ordering::SeqCst);
        }
    }
}

#[async_trait]
impl TokenLedger for HostileToken {
    async fn transfer_from(
        &self,
        spender: Address,
        from: Address,
        to: Address,
        amount: Amount,
    ) -> Result<bool, TokenError> {
        if self.behaviour() == Behaviour::Reenter {
            self.call_back(from).await;
        }
        self.inner.transfer_from(spender, from, to, amount).await
    }

    async fn transfer(
        &self,
        sender: Address,
        to: Address,
        amount: Amount,
    ) -> Result<bool, TokenError> {
        match self.behaviour() {
            Behaviour::BreakTransfers => Err("token contract paused".into()),
            Behaviour::Reenter => {
                self.call_back(to).await;
                self.inner.transfer(sender, to, amount).await
            }
            Behaviour::Honest => self.inner.transfer(sender, to, amount).await,
        }
    }

    async fn approve(
        &self,
        owner: Address,
        spender: Address,
        amount: Amount,
    ) -> Result<bool, TokenError> {
        self.inner.approve(owner, spender, amount).await
    }

    async fn balance_of(&self, owner: Address) -> Result<Amount, TokenError> {
        self.inner.balance_of(owner).await
    }
}

fn start() -> DateTime<Utc> {
    DateTime::parse_from_rfc3339("2025-02-01T00:00:00Z")
        .unwrap()
        .with_timezone(&Utc)
}

struct Setup {
    airline: Arc<Airline>,
    token: Arc<HostileToken>,
    clock: Arc<ManualClock>,
    admin: Address,
    buyer: Address,
    flight_id: u64,
}

async fn setup() -> Setup {
    let token = Arc::new(HostileToken::new());
    let clock = Arc::new(ManualClock::new(start()));
    let admin = Address::random();
    let airline = Arc::new(
        Airline::new(
            admin,
            Address::random(),
            token.clone(),
            clock.clone(),
            AirlinePolicy::default(),
        )
        .unwrap(),
    );
    token.airline.set(Arc::downgrade(&airline)).unwrap();

    let airplane_id = airline.register_airplane(admin, 2, 3).await.unwrap();
    let flight_id = airline
        .schedule_flight(admin, airplane_id, "FRA", start() + Duration::hours(72), 100, 50)
        .await
        .unwrap();

    let buyer = Address::random();
    token.inner.mint(buyer, 1_000).await.unwrap();
    token.approve(buyer, airline.custody(), 1_000).await.unwrap();

    Setup {
        airline,
        token,
        clock,
        admin,
        buyer,
        flight_id,
    }
}

#[tokio::test]
async fn test_reentrant_calls_during_purchase_are_rejected() {
    let s = setup().await;
    s.token.set(Behaviour::Reenter);

    let ticket_id = s
        .airline
        .buy_ticket(s.buyer, s.flight_id, SeatClass::First, 100)
        .await
        .unwrap();

    let nested = s.token.nested_errors();
    assert_eq!(nested.len(), 3);
    assert!(nested.iter().all(|e| matches!(e, LedgerError::Reentrancy(_))));
    assert!(s.token.nested_admin_ok.load(Ordering::SeqCst));

    // Exactly one seat sold.
    assert_eq!(s.airline.ticket_count().await, 1);
    assert_eq!(s.airline.ticket(ticket_id).await.unwrap().buyer, s.buyer);
    let flight = s.airline.flight(s.flight_id).await.unwrap();
    assert_eq!(flight.remaining(SeatClass::First), 1);
    assert_eq!(flight.remaining(SeatClass::Economy), 3);
}

#[tokio::test]
async fn test_reentrant_calls_during_refund_are_rejected() {
    let s = setup().await;
    let ticket_id = s
        .airline
        .buy_ticket(s.buyer, s.flight_id, SeatClass::First, 100)
        .await
        .unwrap();

    s.token.set(Behaviour::Reenter);
    let refund = s.airline.cancel_ticket(s.buyer, ticket_id).await.unwrap();

    assert_eq!(refund, 100);
    assert!(s
        .token
        .nested_errors()
        .iter()
        .all(|e| matches!(e, LedgerError::Reentrancy(_))));
    assert_eq!(s.token.balance_of(s.buyer).await.unwrap(), 1_000);
}

#[tokio::test]
async fn test_failed_refund_rolls_back_cancellation() {
    let s = setup().await;
    let ticket_id = s
        .airline
        .buy_ticket(s.buyer, s.flight_id, SeatClass::Economy, 50)
        .await
        .unwrap();
    let events_before = s.airline.events_since(0).await.len();

    s.token.set(Behaviour::BreakTransfers);
    let result = s.airline.cancel_ticket(s.buyer, ticket_id).await;

    assert!(matches!(result, Err(LedgerError::PaymentFailed(_))));
    assert!(s.airline.ticket(ticket_id).await.is_ok());
    assert_eq!(s.airline.tickets_held(s.flight_id, s.buyer).await, 1);
    assert_eq!(
        s.airline.flight(s.flight_id).await.unwrap().remaining(SeatClass::Economy),
        2
    );
    assert_eq!(s.airline.escrowed().await, 50);
    assert_eq!(s.airline.events_since(0).await.len(), events_before);

    // The guard was released on the failure path.
    s.token.set(Behaviour::Honest);
    assert_eq!(s.airline.cancel_ticket(s.buyer, ticket_id).await.unwrap(), 50);
}

#[tokio::test]
async fn test_failed_withdrawal_keeps_escrow() {
    let s = setup().await;
    s.airline
        .buy_ticket(s.buyer, s.flight_id, SeatClass::First, 100)
        .await
        .unwrap();
    s.clock.set(start() + Duration::hours(73));

    s.token.set(Behaviour::BreakTransfers);
    let result = s.airline.withdraw(s.admin).await;

    assert!(matches!(result, Err(LedgerError::PaymentFailed(_))));
    assert_eq!(s.airline.escrowed().await, 100);
    assert_eq!(s.token.balance_of(s.airline.custody()).await.unwrap(), 100);

    s.token.set(Behaviour::Honest);
    assert_eq!(s.airline.withdraw(s.admin).await.unwrap(), 100);
    assert_eq!(s.token.balance_of(s.admin).await.unwrap(), 100);
}
