use crate::commands::{execute, Command, Outcome};
use crate::error::error_code;
use chrono::{DateTime, Duration, Utc};
use contrail_core::{Clock, ManualClock, TokenLedger};
use contrail_order::{Airline, AirlinePolicy, RefundPolicy};
use contrail_shared::{Address, Amount, EventRecord};
use contrail_store::app_config::LedgerRules;
use contrail_store::InMemoryToken;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// A funded token account. The runner mints `amount` and approves the
/// ledger's custody account to spend all of it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Funding {
    pub owner: Address,
    pub amount: Amount,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "step", rename_all = "snake_case")]
pub enum ScriptStep {
    /// Move the ledger clock forward.
    Advance { hours: i64 },
    Call { caller: Address, command: Command },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Script {
    pub admin: Address,
    /// Custody account of the ledger. A fresh one is generated when absent.
    #[serde(default)]
    pub custody: Option<Address>,
    #[serde(default)]
    pub accounts: Vec<Funding>,
    pub steps: Vec<ScriptStep>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum StepResult {
    Advanced { now: DateTime<Utc> },
    Ok { outcome: Outcome },
    Failed { code: String, message: String },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Balance {
    pub owner: Address,
    pub amount: Amount,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Report {
    pub results: Vec<StepResult>,
    pub events: Vec<EventRecord>,
    pub escrowed: Amount,
    pub balances: Vec<Balance>,
}

pub fn policy_from(rules: &LedgerRules) -> AirlinePolicy {
    AirlinePolicy {
        max_tickets_per_flight: rules.max_tickets_per_flight,
        refund: RefundPolicy {
            full_refund_hours: rules.full_refund_hours,
            partial_refund_hours: rules.partial_refund_hours,
            partial_refund_percent: rules.partial_refund_percent,
        },
    }
}

/// Runs `script` against a fresh ledger backed by an in-memory token.
///
/// Failed calls are recorded in the report and do not stop the replay.
pub async fn replay(
    script: Script,
    rules: &LedgerRules,
    start: DateTime<Utc>,
) -> anyhow::Result<Report> {
    let token = Arc::new(InMemoryToken::new());
    let clock = Arc::new(ManualClock::new(start));
    let custody = script.custody.unwrap_or_else(Address::random);
    let airline = Airline::new(
        script.admin,
        custody,
        token.clone(),
        clock.clone(),
        policy_from(rules),
    )?;

    for funding in &script.accounts {
        token
            .mint(funding.owner, funding.amount)
            .await
            .map_err(|e| anyhow::anyhow!("minting for {}: {}", funding.owner, e))?;
        token
            .approve(funding.owner, custody, funding.amount)
            .await
            .map_err(|e| anyhow::anyhow!("approval for {}: {}", funding.owner, e))?;
    }
    info!(
        "Replaying {} steps with {} funded accounts",
        script.steps.len(),
        script.accounts.len()
    );

    let mut results = Vec::with_capacity(script.steps.len());
    for (index, step) in script.steps.into_iter().enumerate() {
        let result = match step {
            ScriptStep::Advance { hours } => {
                clock.advance(Duration::hours(hours));
                debug!("Step {}: clock at {}", index, clock.now());
                StepResult::Advanced { now: clock.now() }
            }
            ScriptStep::Call { caller, command } => match execute(&airline, caller, command).await {
                Ok(outcome) => {
                    debug!("Step {}: {:?}", index, outcome);
                    StepResult::Ok { outcome }
                }
                Err(e) => {
                    warn!("Step {} failed: {}", index, e);
                    StepResult::Failed {
                        code: error_code(&e).to_string(),
                        message: e.to_string(),
                    }
                }
            },
        };
        results.push(result);
    }

    let mut owners: Vec<Address> = vec![airline.admin().await];
    for funding in &script.accounts {
        if !owners.contains(&funding.owner) {
            owners.push(funding.owner);
        }
    }
    let mut balances = Vec::with_capacity(owners.len());
    for owner in owners {
        let amount = token
            .balance_of(owner)
            .await
            .map_err(|e| anyhow::anyhow!("balance of {}: {}", owner, e))?;
        balances.push(Balance { owner, amount });
    }

    Ok(Report {
        results,
        events: airline.events_since(0).await,
        escrowed: airline.escrowed().await,
        balances,
    })
}
