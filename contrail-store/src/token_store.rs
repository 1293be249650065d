use async_trait::async_trait;
use contrail_core::token::{TokenError, TokenLedger};
use contrail_shared::{Address, Amount};
use std::collections::HashMap;
use tokio::sync::Mutex;
use tracing::{debug, info};

#[derive(Debug, Default)]
struct Accounts {
    balances: HashMap<Address, Amount>,
    allowances: HashMap<(Address, Address), Amount>,
}

impl Accounts {
    fn balance(&self, owner: Address) -> Amount {
        self.balances.get(&owner).copied().unwrap_or(0)
    }

    fn credit(&mut self, owner: Address, amount: Amount) -> Result<(), TokenError> {
        let balance = self.balances.entry(owner).or_insert(0);
        *balance = balance
            .checked_add(amount)
            .ok_or_else(|| format!("balance overflow for {}", owner))?;
        Ok(())
    }

    /// Moves funds if `from` can cover them. Returns false otherwise.
    fn move_funds(
        &mut self,
        from: Address,
        to: Address,
        amount: Amount,
    ) -> Result<bool, TokenError> {
        let available = self.balance(from);
        if available < amount {
            return Ok(false);
        }
        if from == to {
            return Ok(true);
        }
        self.balances.insert(from, available - amount);
        self.credit(to, amount)?;
        Ok(true)
    }
}

/// Process-local fungible token with ERC-20 style allowances.
///
/// Refusals (insufficient balance or allowance) are reported as `Ok(false)`,
/// never as errors.
#[derive(Debug, Default)]
pub struct InMemoryToken {
    accounts: Mutex<Accounts>,
}

impl InMemoryToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create `amount` new tokens in `to`'s account.
    pub async fn mint(&self, to: Address, amount: Amount) -> Result<(), TokenError> {
        self.accounts.lock().await.credit(to, amount)?;
        info!("Minted {} for {}", amount, to);
        Ok(())
    }

    pub async fn allowance(&self, owner: Address, spender: Address) -> Amount {
        self.accounts
            .lock()
            .await
            .allowances
            .get(&(owner, spender))
            .copied()
            .unwrap_or(0)
    }

    /// Sum of all balances.
    pub async fn total_supply(&self) -> Amount {
        self.accounts.lock().await.balances.values().sum()
    }
}

#[async_trait]
impl TokenLedger for InMemoryToken {
    async fn transfer_from(
        &self,
        spender: Address,
        from: Address,
        to: Address,
        amount: Amount,
    ) -> Result<bool, TokenError> {
        let mut accounts = self.accounts.lock().await;
        let allowed = accounts.allowances.get(&(from, spender)).copied().unwrap_or(0);
        if allowed < amount {
            debug!(
                "transfer_from refused: {} allowed {} of {}, needs {}",
                from, spender, allowed, amount
            );
            return Ok(false);
        }
        if !accounts.move_funds(from, to, amount)? {
            debug!("transfer_from refused: {} cannot cover {}", from, amount);
            return Ok(false);
        }
        accounts.allowances.insert((from, spender), allowed - amount);
        Ok(true)
    }

    async fn transfer(
        &self,
        sender: Address,
        to: Address,
        amount: Amount,
    ) -> Result<bool, TokenError> {
        let moved = self.accounts.lock().await.move_funds(sender, to, amount)?;
        if !moved {
            debug!("transfer refused: {} cannot cover {}", sender, amount);
        }
        Ok(moved)
    }

    async fn approve(
        &self,
        owner: Address,
        spender: Address,
        amount: Amount,
    ) -> Result<bool, TokenError> {
        self.accounts.lock().await.allowances.insert((owner, spender), amount);
        Ok(true)
    }

    async fn balance_of(&self, owner: Address) -> Result<Amount, TokenError> {
        Ok(self.accounts.lock().await.balance(owner))
    }
}
