use chrono::{DateTime, Duration, Utc};
use contrail_core::{LedgerError, LedgerResult};
use contrail_shared::Amount;
use serde::{Deserialize, Serialize};

/// Time-based refund tiers for canceled tickets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefundPolicy {
    /// More than this before departure refunds everything.
    pub full_refund_hours: i64,
    /// More than this (and not more than the full window) refunds `partial_refund_percent`.
    pub partial_refund_hours: i64,
    pub partial_refund_percent: u8,
}

impl Default for RefundPolicy {
    fn default() -> Self {
        Self {
            full_refund_hours: 48,
            partial_refund_hours: 24,
            partial_refund_percent: 80,
        }
    }
}

impl RefundPolicy {
    pub fn validate(&self) -> LedgerResult<()> {
        if self.partial_refund_hours < 0 || self.full_refund_hours < self.partial_refund_hours {
            return Err(LedgerError::InvalidArgument(format!(
                "refund windows must satisfy 0 <= partial ({}h) <= full ({}h)",
                self.partial_refund_hours, self.full_refund_hours
            )));
        }
        if self.partial_refund_percent > 100 {
            return Err(LedgerError::InvalidArgument(format!(
                "partial refund of {}% exceeds 100%",
                self.partial_refund_percent
            )));
        }
        Ok(())
    }

    /// Amount paid back when a ticket is canceled at `now`.
    ///
    /// Pure function of its inputs; percentages truncate toward zero.
    pub fn refund_amount(
        &self,
        amount_paid: Amount,
        departure: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Amount {
        let until_departure = departure - now;

        if until_departure > Duration::hours(self.full_refund_hours) {
            amount_paid
        } else if until_departure > Duration::hours(self.partial_refund_hours) {
            percent_of(amount_paid, self.partial_refund_percent)
        } else {
            0
        }
    }
}

fn percent_of(amount: Amount, percent: u8) -> Amount {
    let scaled = u128::from(amount) * u128::from(percent) / 100;
    // percent <= 100 keeps the result within the input range
    Amount::try_from(scaled).unwrap_or(amount)
}

/// Bookkeeping of the funds held in custody between purchase and payout.
#[derive(Debug, Clone, Default)]
pub struct Escrow {
    held: Amount,
}

impl Escrow {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn held(&self) -> Amount {
        self.held
    }

    pub fn deposit(&mut self, amount: Amount) -> LedgerResult<()> {
        self.held = self
            .held
            .checked_add(amount)
            .ok_or_else(|| LedgerError::InvariantViolation("escrow balance overflow".to_string()))?;
        Ok(())
    }

    pub fn release(&mut self, amount: Amount) -> LedgerResult<()> {
        self.held = self.held.checked_sub(amount).ok_or_else(|| {
            LedgerError::InvariantViolation(format!(
                "cannot release {} from escrow holding {}",
                amount, self.held
            ))
        })?;
        Ok(())
    }

    /// Empty the escrow, returning what it held.
    pub fn drain(&mut self) -> Amount {
        std::mem::take(&mut self.held)
    }
}
