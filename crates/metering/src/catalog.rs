//! Subscription plan catalog — monthly allowances and overage policy.
//!
//! Pure lookup table, read-only at request time.  Tier changes apply only to
//! newly provisioned accounts; an account keeps the tier it was created
//! against until its subscription changes.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use tm_domain::{Error, Result};

/// One subscription tier.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlanTier {
    pub id: String,
    pub name: String,
    /// Token allowance per billing period.
    pub monthly_tokens: u64,
    /// USD billed per token consumed beyond the allowance.
    pub overage_rate_usd: f64,
    /// When false the plan hard-denies at the limit instead of
    /// accumulating billable overage.
    pub overage_allowed: bool,
    /// Whether children on this plan draw from a shared family pool.
    pub family_pool: bool,
}

/// Lookup table of subscription tiers keyed by plan id.
#[derive(Debug, Clone)]
pub struct PlanCatalog {
    tiers: HashMap<String, PlanTier>,
}

impl PlanCatalog {
    pub fn new(tiers: impl IntoIterator<Item = PlanTier>) -> Self {
        Self {
            tiers: tiers.into_iter().map(|t| (t.id.clone(), t)).collect(),
        }
    }

    /// The product's stock tiers.
    pub fn builtin() -> Self {
        Self::new([
            PlanTier {
                id: "basic".into(),
                name: "Basic".into(),
                monthly_tokens: 50_000,
                overage_rate_usd: 0.01,
                overage_allowed: false,
                family_pool: false,
            },
            PlanTier {
                id: "premium".into(),
                name: "Premium".into(),
                monthly_tokens: 200_000,
                overage_rate_usd: 0.01,
                overage_allowed: true,
                family_pool: false,
            },
            PlanTier {
                id: "family".into(),
                name: "Family".into(),
                monthly_tokens: 300_000,
                overage_rate_usd: 0.01,
                overage_allowed: true,
                family_pool: true,
            },
        ])
    }

    /// Look up a tier by plan id.
    pub fn tier(&self, plan_id: &str) -> Result<&PlanTier> {
        self.tiers
            .get(plan_id)
            .ok_or_else(|| Error::UnknownPlan(plan_id.to_string()))
    }

    pub fn contains(&self, plan_id: &str) -> bool {
        self.tiers.contains_key(plan_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_tiers_resolve() {
        let catalog = PlanCatalog::builtin();
        let basic = catalog.tier("basic").unwrap();
        assert_eq!(basic.monthly_tokens, 50_000);
        assert!(!basic.overage_allowed);

        let premium = catalog.tier("premium").unwrap();
        assert_eq!(premium.monthly_tokens, 200_000);
        assert!(premium.overage_allowed);
        assert!(!premium.family_pool);

        let family = catalog.tier("family").unwrap();
        assert!(family.family_pool);
    }

    #[test]
    fn unknown_plan_is_an_error() {
        let catalog = PlanCatalog::builtin();
        let err = catalog.tier("platinum").unwrap_err();
        assert!(matches!(err, Error::UnknownPlan(p) if p == "platinum"));
    }
}
