use async_trait::async_trait;
use contrail_shared::{Address, Amount};

pub type TokenError = Box<dyn std::error::Error + Send + Sync>;

/// The fungible-token ledger used for payment.
///
/// Calls are untrusted callouts: an implementation may refuse (`Ok(false)`),
/// fail (`Err`), or call back into the airline ledger while a transfer is
/// in flight.
#[async_trait]
pub trait TokenLedger: Send + Sync {
    /// Move `amount` from `from` to `to`, spending `spender`'s allowance.
    async fn transfer_from(
        &self,
        spender: Address,
        from: Address,
        to: Address,
        amount: Amount,
    ) -> Result<bool, TokenError>;

    /// Move `amount` out of `sender`'s own balance.
    async fn transfer(
        &self,
        sender: Address,
        to: Address,
        amount: Amount,
    ) -> Result<bool, TokenError>;

    /// Let `spender` move up to `amount` of `owner`'s balance.
    async fn approve(
        &self,
        owner: Address,
        spender: Address,
        amount: Amount,
    ) -> Result<bool, TokenError>;

    async fn balance_of(&self, owner: Address) -> Result<Amount, TokenError>;
}
