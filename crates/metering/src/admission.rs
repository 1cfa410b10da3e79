//! Admission control — the single entry point every AI-consuming request
//! goes through before any tokens are spent.
//!
//! [`AdmissionController::try_consume`] runs a read-roll-check-commit loop:
//! the loaded account is rolled (pure), the plan's overage policy decides
//! allow/overage/deny, and the new state — counters and fired alerts
//! together — is committed under the store's per-row version guard.  A lost
//! race re-reads and retries with jittered backoff up to the configured
//! bound; every other failure is terminal for the call.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use rand::Rng;

use tm_domain::{AccountRef, Decision, DenyReason, Error, MeterConfig, Result, UsageCategory};

use crate::account::{QuotaAccount, UsageSnapshot};
use crate::alerts::{self, AlertEvent};
use crate::catalog::PlanCatalog;
use crate::ledger::{UsageEvent, UsageLedger};
use crate::roller;
use crate::store::AccountStore;

/// Result of one admission check: the decision, any alerts that fired with
/// it (to be forwarded to the notification transport), and the committed
/// state for display.
#[derive(Debug, Clone)]
pub struct Admission {
    pub decision: Decision,
    pub alerts: Vec<AlertEvent>,
    pub snapshot: UsageSnapshot,
}

/// Receipt for a token top-up purchase.  Payment capture happens elsewhere;
/// this only reports what the purchase costs and the resulting allowance.
#[derive(Debug, Clone)]
pub struct PurchaseReceipt {
    pub tokens_added: u64,
    pub new_allowance: u64,
    pub cost_usd: f64,
}

pub struct AdmissionController {
    store: Arc<dyn AccountStore>,
    ledger: Arc<dyn UsageLedger>,
    catalog: PlanCatalog,
    config: MeterConfig,
}

impl AdmissionController {
    pub fn new(
        store: Arc<dyn AccountStore>,
        ledger: Arc<dyn UsageLedger>,
        catalog: PlanCatalog,
        config: MeterConfig,
    ) -> Self {
        Self {
            store,
            ledger,
            catalog,
            config,
        }
    }

    /// Create a quota account for a newly provisioned subtenant (or family
    /// pool): zeroed counters, period anchored at `today`, no fired alerts.
    pub async fn provision(
        &self,
        account: AccountRef,
        plan_id: &str,
        today: chrono::NaiveDate,
    ) -> Result<()> {
        // Reject bad plan ids up front rather than on first consumption.
        self.catalog.tier(plan_id)?;
        self.store
            .insert(QuotaAccount::new(account, plan_id, today))
            .await
    }

    /// Atomically admit or refuse a token spend.  See the module docs for
    /// the commit loop; this uses the wall clock, [`Self::try_consume_at`]
    /// takes an explicit one.
    pub async fn try_consume(
        &self,
        account: &AccountRef,
        amount: u64,
        category: UsageCategory,
    ) -> Result<Admission> {
        self.try_consume_at(account, amount, category, Utc::now())
            .await
    }

    /// [`Self::try_consume`] with an injected clock.
    pub async fn try_consume_at(
        &self,
        account: &AccountRef,
        amount: u64,
        category: UsageCategory,
        now: DateTime<Utc>,
    ) -> Result<Admission> {
        let today = now.date_naive();
        let thresholds = self.config.sorted_thresholds();

        let mut attempt = 0u32;
        loop {
            let row = self.store.load(account).await?;
            let mut state = roller::roll(row.value, today);
            // Validated after the load so a bad amount against a missing
            // account still reports the missing account.
            if amount == 0 {
                return Err(Error::InvalidAmount(0));
            }
            let tier = self.catalog.tier(&state.plan_id)?;
            let allowance = state.effective_allowance(tier.monthly_tokens);
            let consumed_after = state.tokens_consumed.saturating_add(amount);

            if !tier.overage_allowed && consumed_after > allowance {
                // Hard deny: nothing is charged, no state is written (a
                // pending lazy roll stays pending), but the refused attempt
                // still lands in the audit trail.
                let decision = Decision::Denied {
                    reason: DenyReason::LimitReached,
                };
                self.append_event(account, amount, category, decision, now)
                    .await;
                return Ok(Admission {
                    decision,
                    alerts: Vec::new(),
                    snapshot: state.snapshot(allowance),
                });
            }

            let overage_before = state.overage_tokens;
            state.tokens_consumed = consumed_after;
            state.overage_tokens = consumed_after.saturating_sub(allowance);
            let alerts = alerts::evaluate(&mut state, allowance, &thresholds);

            match self.store.commit(row.version, state.clone()).await {
                Ok(_) => {
                    let decision = if consumed_after <= allowance {
                        Decision::Allowed
                    } else {
                        Decision::AllowedWithOverage {
                            overage_tokens: state.overage_tokens - overage_before,
                        }
                    };
                    self.append_event(account, amount, category, decision, now)
                        .await;
                    return Ok(Admission {
                        decision,
                        alerts,
                        snapshot: state.snapshot(allowance),
                    });
                }
                Err(Error::Conflict) => {
                    attempt += 1;
                    if attempt > self.config.max_commit_retries {
                        return Err(Error::TransientFailure(format!(
                            "commit retry budget exhausted for {account}"
                        )));
                    }
                    tracing::debug!(%account, attempt, "quota commit conflict, retrying");
                    self.backoff().await;
                }
                Err(other) => return Err(other),
            }
        }
    }

    /// Read-only dashboard view.  Applies a pending roll to the *view* so a
    /// stale account displays as fresh, but writes nothing.
    pub async fn snapshot(&self, account: &AccountRef) -> Result<UsageSnapshot> {
        self.snapshot_at(account, Utc::now()).await
    }

    /// [`Self::snapshot`] with an injected clock.
    pub async fn snapshot_at(
        &self,
        account: &AccountRef,
        now: DateTime<Utc>,
    ) -> Result<UsageSnapshot> {
        let row = self.store.load(account).await?;
        let state = roller::roll(row.value, now.date_naive());
        let tier = self.catalog.tier(&state.plan_id)?;
        Ok(state.snapshot(state.effective_allowance(tier.monthly_tokens)))
    }

    /// Purchase top-up tokens at the plan's overage rate, raising the
    /// account's effective allowance.  Only plans with overage purchasing
    /// may buy.
    pub async fn grant_extra_tokens(
        &self,
        account: &AccountRef,
        tokens: u64,
    ) -> Result<PurchaseReceipt> {
        self.grant_extra_tokens_at(account, tokens, Utc::now()).await
    }

    /// [`Self::grant_extra_tokens`] with an injected clock.
    pub async fn grant_extra_tokens_at(
        &self,
        account: &AccountRef,
        tokens: u64,
        now: DateTime<Utc>,
    ) -> Result<PurchaseReceipt> {
        let today = now.date_naive();

        let mut attempt = 0u32;
        loop {
            let row = self.store.load(account).await?;
            let mut state = roller::roll(row.value, today);
            if tokens == 0 {
                return Err(Error::InvalidAmount(0));
            }
            let tier = self.catalog.tier(&state.plan_id)?;
            if !tier.overage_allowed {
                return Err(Error::Other(format!(
                    "plan '{}' does not permit token purchases",
                    tier.id
                )));
            }
            state.extra_tokens = state.extra_tokens.saturating_add(tokens);
            let new_allowance = state.effective_allowance(tier.monthly_tokens);
            // The raised allowance may swallow overage already accumulated
            // this period.
            state.overage_tokens = state.tokens_consumed.saturating_sub(new_allowance);
            let cost_usd = tokens as f64 * tier.overage_rate_usd;

            match self.store.commit(row.version, state).await {
                Ok(_) => {
                    tracing::info!(%account, tokens, cost_usd, "token top-up purchased");
                    return Ok(PurchaseReceipt {
                        tokens_added: tokens,
                        new_allowance,
                        cost_usd,
                    });
                }
                Err(Error::Conflict) => {
                    attempt += 1;
                    if attempt > self.config.max_commit_retries {
                        return Err(Error::TransientFailure(format!(
                            "commit retry budget exhausted for {account}"
                        )));
                    }
                    self.backoff().await;
                }
                Err(other) => return Err(other),
            }
        }
    }

    /// Best-effort ledger append.  Failure is a reconciliation discrepancy,
    /// never a reason to roll back a committed quota decision.
    ///
    /// Denied attempts are appended too, audit-only: the ledger's token sums
    /// skip them (see `UsageLedger::tokens_since`), so recorded refusals
    /// never inflate consumption.
    async fn append_event(
        &self,
        account: &AccountRef,
        amount: u64,
        category: UsageCategory,
        decision: Decision,
        now: DateTime<Utc>,
    ) {
        let event = UsageEvent::new(account.clone(), amount, category, decision, now);
        if let Err(e) = self.ledger.append(event).await {
            tracing::warn!(
                %account,
                amount,
                decision = decision.label(),
                error = %e,
                "usage ledger append failed; quota commit stands, reconcile asynchronously"
            );
        }
    }

    /// Yield between conflicting commit attempts so rapid-fire calls on one
    /// account don't retry in lockstep.
    async fn backoff(&self) {
        let jitter = if self.config.retry_jitter_ms > 0 {
            rand::thread_rng().gen_range(0..self.config.retry_jitter_ms)
        } else {
            0
        };
        tokio::time::sleep(Duration::from_millis(self.config.retry_backoff_ms + jitter)).await;
    }
}
