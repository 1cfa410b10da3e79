//! Billable overage computation for a period.

use chrono::NaiveDate;
use serde::Serialize;

use tm_domain::AccountRef;

use crate::account::QuotaAccount;
use crate::catalog::PlanTier;

/// What the current period's overage costs, for the billing collaborator.
#[derive(Debug, Clone, Serialize)]
pub struct OverageBill {
    pub account: AccountRef,
    pub period_anchor: NaiveDate,
    pub overage_tokens: u64,
    pub rate_usd: f64,
    pub amount_usd: f64,
}

/// Price the account's accumulated overage at its tier's rate.
pub fn overage_bill(account: &QuotaAccount, tier: &PlanTier) -> OverageBill {
    OverageBill {
        account: account.account.clone(),
        period_anchor: account.period_anchor,
        overage_tokens: account.overage_tokens,
        rate_usd: tier.overage_rate_usd,
        amount_usd: account.overage_tokens as f64 * tier.overage_rate_usd,
    }
}
