pub mod admin;
pub mod clock;
pub mod events;
pub mod guard;
pub mod ids;
pub mod token;

pub use admin::AdminSuccession;
pub use clock::{Clock, ManualClock, SystemClock};
pub use events::EventLog;
pub use guard::ReentrancyGuard;
pub use ids::IdAllocator;
pub use token::TokenLedger;

/// Failure taxonomy shared by every ledger component.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LedgerError {
    #[error("Unauthorized: {0}")]
    Unauthorized(String),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
    #[error("Invariant violation: {0}")]
    InvariantViolation(String),
    #[error("Already departed: {0}")]
    AlreadyDeparted(String),
    #[error("Payment failed: {0}")]
    PaymentFailed(String),
    #[error("Re-entrant call rejected: {0}")]
    Reentrancy(String),
}

pub type LedgerResult<T> = Result<T, LedgerError>;
