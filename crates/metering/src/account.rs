//! Quota account state — the one mutable row per child or family pool.

use std::collections::BTreeSet;

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

use tm_domain::AccountRef;

use crate::roller;

/// Per-account counter state for the current billing period.
///
/// Mutated only by the admission controller (consumption, purchases) and the
/// period roller (reset); every write goes through the versioned
/// [`crate::store::AccountStore::commit`] path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuotaAccount {
    pub account: AccountRef,
    pub plan_id: String,
    /// Tokens consumed this period.  Monotonically non-decreasing between
    /// rolls.
    pub tokens_consumed: u64,
    /// Tokens consumed beyond the effective allowance this period.
    pub overage_tokens: u64,
    /// Purchased top-up tokens; raises the effective allowance and survives
    /// period rolls.
    pub extra_tokens: u64,
    /// The date the current billing period began.
    pub period_anchor: NaiveDate,
    /// Day-of-month the account was provisioned on.  Rolls clamp to the
    /// target month's length but always start from this day, so an account
    /// anchored on the 31st goes Jan 31 → Feb 28 → Mar 31 rather than
    /// drifting to the 28th for good.
    pub anchor_day: u8,
    /// Alert thresholds already fired this period.  Cleared exactly when the
    /// period rolls.
    pub alerts_fired: BTreeSet<u8>,
}

impl QuotaAccount {
    /// Fresh account: zeroed counters, anchor at `today`, no fired alerts.
    pub fn new(account: AccountRef, plan_id: impl Into<String>, today: NaiveDate) -> Self {
        Self {
            account,
            plan_id: plan_id.into(),
            tokens_consumed: 0,
            overage_tokens: 0,
            extra_tokens: 0,
            period_anchor: today,
            anchor_day: today.day() as u8,
            alerts_fired: BTreeSet::new(),
        }
    }

    /// Plan allowance plus purchased top-up tokens.
    pub fn effective_allowance(&self, plan_allowance: u64) -> u64 {
        plan_allowance.saturating_add(self.extra_tokens)
    }

    /// Dashboard view of the account against the given allowance.
    pub fn snapshot(&self, allowance: u64) -> UsageSnapshot {
        UsageSnapshot {
            account: self.account.clone(),
            tokens_consumed: self.tokens_consumed,
            allowance,
            remaining: allowance.saturating_sub(self.tokens_consumed),
            overage_tokens: self.overage_tokens,
            period_anchor: self.period_anchor,
            next_reset: roller::next_reset(self.period_anchor, self.anchor_day),
        }
    }
}

/// A value read from the store together with its row version.
///
/// The version must be echoed back on commit; a mismatch means another
/// writer got there first.
#[derive(Debug, Clone)]
pub struct Versioned<T> {
    pub value: T,
    pub version: u64,
}

/// Read-only usage view exposed to dashboards.
#[derive(Debug, Clone, Serialize)]
pub struct UsageSnapshot {
    pub account: AccountRef,
    pub tokens_consumed: u64,
    pub allowance: u64,
    pub remaining: u64,
    pub overage_tokens: u64,
    pub period_anchor: NaiveDate,
    pub next_reset: NaiveDate,
}
