//! Append-only usage ledger — the financial audit trail.
//!
//! One event per consuming attempt, including refused ones; events are never
//! updated or deleted.  The ledger is best-effort relative to the quota
//! commit: an append failure degrades the audit trail, never the admission
//! decision, and is reconciled asynchronously.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::Serialize;
use uuid::Uuid;

use tm_domain::{AccountRef, Decision, Result, UsageCategory};

/// Immutable ledger entry.
#[derive(Debug, Clone, Serialize)]
pub struct UsageEvent {
    pub id: Uuid,
    pub account: AccountRef,
    pub amount: u64,
    pub category: UsageCategory,
    pub decision: Decision,
    pub recorded_at: DateTime<Utc>,
}

impl UsageEvent {
    pub fn new(
        account: AccountRef,
        amount: u64,
        category: UsageCategory,
        decision: Decision,
        recorded_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            account,
            amount,
            category,
            decision,
            recorded_at,
        }
    }
}

/// Per-category slice of an account's usage over some window.
#[derive(Debug, Clone, Serialize)]
pub struct CategoryUsage {
    pub category: UsageCategory,
    pub tokens: u64,
    /// This category's share of the window's admitted tokens, 0–100.
    pub share_pct: f64,
}

#[async_trait]
pub trait UsageLedger: Send + Sync {
    /// Append one event.  Events are write-once.
    ///
    /// Implementations report backend failures as
    /// [`tm_domain::Error::Ledger`]; the admission controller treats any
    /// append failure as a reconciliation discrepancy, not a rollback.
    async fn append(&self, event: UsageEvent) -> Result<()>;

    /// All events for an account, oldest first.
    async fn events_for(&self, account: &AccountRef) -> Result<Vec<UsageEvent>>;

    /// Sum of *admitted* tokens for an account since `since`.  Denied
    /// attempts are recorded but never counted.
    async fn tokens_since(&self, account: &AccountRef, since: DateTime<Utc>) -> Result<u64> {
        Ok(self
            .events_for(account)
            .await?
            .iter()
            .filter(|e| e.recorded_at >= since && e.decision.is_admitted())
            .map(|e| e.amount)
            .sum())
    }

    /// Admitted tokens per category since `since`, largest first, with each
    /// category's share of the total.
    async fn breakdown_since(
        &self,
        account: &AccountRef,
        since: DateTime<Utc>,
    ) -> Result<Vec<CategoryUsage>> {
        let events = self.events_for(account).await?;
        let mut totals: Vec<(UsageCategory, u64)> = Vec::new();
        for event in events
            .iter()
            .filter(|e| e.recorded_at >= since && e.decision.is_admitted())
        {
            match totals.iter_mut().find(|(c, _)| *c == event.category) {
                Some((_, tokens)) => *tokens += event.amount,
                None => totals.push((event.category, event.amount)),
            }
        }
        let grand_total: u64 = totals.iter().map(|(_, t)| *t).sum();
        let mut breakdown: Vec<CategoryUsage> = totals
            .into_iter()
            .map(|(category, tokens)| CategoryUsage {
                category,
                tokens,
                share_pct: if grand_total > 0 {
                    tokens as f64 / grand_total as f64 * 100.0
                } else {
                    0.0
                },
            })
            .collect();
        breakdown.sort_by(|a, b| b.tokens.cmp(&a.tokens));
        Ok(breakdown)
    }
}

/// In-memory ledger used by tests and single-process deployments.
#[derive(Default)]
pub struct MemoryUsageLedger {
    events: RwLock<Vec<UsageEvent>>,
}

impl MemoryUsageLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.events.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.read().is_empty()
    }
}

#[async_trait]
impl UsageLedger for MemoryUsageLedger {
    async fn append(&self, event: UsageEvent) -> Result<()> {
        self.events.write().push(event);
        Ok(())
    }

    async fn events_for(&self, account: &AccountRef) -> Result<Vec<UsageEvent>> {
        Ok(self
            .events
            .read()
            .iter()
            .filter(|e| &e.account == account)
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tm_domain::DenyReason;

    fn event(account: &AccountRef, amount: u64, category: UsageCategory, decision: Decision) -> UsageEvent {
        UsageEvent::new(account.clone(), amount, category, decision, Utc::now())
    }

    #[tokio::test]
    async fn events_are_scoped_per_account() {
        let ledger = MemoryUsageLedger::new();
        let a = AccountRef::child("a");
        let b = AccountRef::child("b");
        ledger
            .append(event(&a, 10, UsageCategory::Chat, Decision::Allowed))
            .await
            .unwrap();
        ledger
            .append(event(&b, 20, UsageCategory::Image, Decision::Allowed))
            .await
            .unwrap();

        assert_eq!(ledger.events_for(&a).await.unwrap().len(), 1);
        assert_eq!(ledger.events_for(&b).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn denied_attempts_are_recorded_but_not_counted() {
        let ledger = MemoryUsageLedger::new();
        let a = AccountRef::child("a");
        let since = Utc::now() - chrono::Duration::hours(1);
        ledger
            .append(event(&a, 10, UsageCategory::Chat, Decision::Allowed))
            .await
            .unwrap();
        ledger
            .append(event(
                &a,
                500,
                UsageCategory::Chat,
                Decision::Denied {
                    reason: DenyReason::LimitReached,
                },
            ))
            .await
            .unwrap();

        assert_eq!(ledger.events_for(&a).await.unwrap().len(), 2);
        assert_eq!(ledger.tokens_since(&a, since).await.unwrap(), 10);
    }

    #[tokio::test]
    async fn breakdown_orders_by_tokens_and_reports_shares() {
        let ledger = MemoryUsageLedger::new();
        let a = AccountRef::child("a");
        let since = Utc::now() - chrono::Duration::hours(1);
        ledger
            .append(event(&a, 300, UsageCategory::Chat, Decision::Allowed))
            .await
            .unwrap();
        ledger
            .append(event(&a, 600, UsageCategory::Image, Decision::Allowed))
            .await
            .unwrap();
        ledger
            .append(event(&a, 100, UsageCategory::Voice, Decision::Allowed))
            .await
            .unwrap();

        let breakdown = ledger.breakdown_since(&a, since).await.unwrap();
        assert_eq!(breakdown.len(), 3);
        assert_eq!(breakdown[0].category, UsageCategory::Image);
        assert_eq!(breakdown[0].tokens, 600);
        assert!((breakdown[0].share_pct - 60.0).abs() < 1e-9);
        assert_eq!(breakdown[2].category, UsageCategory::Voice);
        assert!((breakdown[2].share_pct - 10.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn breakdown_of_empty_window_is_empty() {
        let ledger = MemoryUsageLedger::new();
        let a = AccountRef::child("a");
        let breakdown = ledger.breakdown_since(&a, Utc::now()).await.unwrap();
        assert!(breakdown.is_empty());
    }
}
