//! Replay of JSON command scripts against an in-process storefront
//!
//! A script is a JSON array of steps, e.g.
//! `[{"step": "mint", "to": "0xb", "amount": 1000}, {"step": "advance", "seconds": 3600}]`.

use std::{io::Write, sync::Arc};

use chrono::{DateTime, Duration, Utc};
use serde::Deserialize;
use serde_json::{json, Value};
use storefront_escrow::{
    error::StorefrontError, Amount, Clock, Command, EscrowResult, Identity, ManualClock, Query,
    Storefront, StorefrontConfig, TokenVault,
};
use tracing::{info, warn};

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "step", rename_all = "snake_case")]
pub enum Step {
    Command { command: Command },
    Query { query: Query },
    /// Issue settlement tokens to an identity
    Mint { to: Identity, amount: Amount },
    /// Set the allowance an identity grants the storefront
    Approve { holder: Identity, amount: Amount },
    /// Move the replay clock forward
    Advance { seconds: i64 },
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ReplaySummary {
    pub succeeded: usize,
    pub failed: usize,
}

pub struct Replay {
    storefront: Storefront,
    vault: TokenVault,
    clock: ManualClock,
}

impl Replay {
    pub fn new(config: StorefrontConfig, start: DateTime<Utc>) -> EscrowResult<Self> {
        let vault = TokenVault::new();
        let clock = ManualClock::new(start);
        let storefront =
            Storefront::new(config, Arc::new(vault.clone()), Arc::new(clock.clone()))?;

        Ok(Self {
            storefront,
            vault,
            clock,
        })
    }

    pub fn parse(script: &str) -> serde_json::Result<Vec<Step>> {
        serde_json::from_str(script)
    }

    /// Run every step, writing one JSON line per step. Failing steps are
    /// reported and the replay continues.
    pub async fn run<W: Write>(
        &self,
        steps: Vec<Step>,
        out: &mut W,
    ) -> anyhow::Result<ReplaySummary> {
        let mut summary = ReplaySummary::default();

        for (n, step) in steps.into_iter().enumerate() {
            let line = match self.run_step(step).await {
                Ok(result) => {
                    summary.succeeded += 1;
                    json!({ "step": n, "at": self.clock.now(), "ok": result })
                }
                Err(e) => {
                    summary.failed += 1;
                    warn!("Step {} failed: {}", n, e);
                    json!({
                        "step": n,
                        "at": self.clock.now(),
                        "error": { "kind": e.kind(), "message": e.to_string() },
                    })
                }
            };
            writeln!(out, "{}", line)?;
        }

        info!(
            "Replay finished: {} succeeded, {} failed",
            summary.succeeded, summary.failed
        );

        Ok(summary)
    }

    pub async fn run_step(&self, step: Step) -> EscrowResult<Value> {
        match step {
            Step::Command { command } => {
                Ok(serde_json::to_value(self.storefront.execute(command).await?)?)
            }
            Step::Query { query } => Ok(serde_json::to_value(self.storefront.query(query).await?)?),
            Step::Mint { to, amount } => {
                let balance = self.vault.mint(&to, amount).await?;
                Ok(json!({ "holder": to, "balance": serde_json::to_value(balance)? }))
            }
            Step::Approve { holder, amount } => {
                self.vault.approve(&holder, amount).await;
                Ok(json!({ "holder": holder, "allowance": serde_json::to_value(amount)? }))
            }
            Step::Advance { seconds } => {
                let by = Duration::try_seconds(seconds).ok_or_else(|| {
                    StorefrontError::invalid_argument(format!(
                        "Cannot advance the clock by {} seconds",
                        seconds
                    ))
                })?;
                let now = self.clock.advance(by)?;
                Ok(json!({ "now": now }))
            }
        }
    }

    pub fn storefront(&self) -> &Storefront {
        &self.storefront
    }
}
