//! Token metering and quota enforcement for per-child AI usage.
//!
//! Every AI-consuming action (chat turn, image generation, voice synthesis,
//! avatar creation) passes through [`AdmissionController::try_consume`],
//! which atomically checks and updates the caller's monthly token budget,
//! tracks billable overage, and fires usage alerts at most once per
//! threshold per billing period.
//!
//! The engine assumes a single consistent datastore behind the
//! [`store::AccountStore`] seam; per-account optimistic concurrency is the
//! only serialization point, so unrelated accounts never contend.

pub mod account;
pub mod admission;
pub mod alerts;
pub mod billing;
pub mod catalog;
pub mod ledger;
pub mod resolver;
pub mod roller;
pub mod store;

pub use account::{QuotaAccount, UsageSnapshot, Versioned};
pub use admission::{Admission, AdmissionController, PurchaseReceipt};
pub use alerts::AlertEvent;
pub use billing::{overage_bill, OverageBill};
pub use catalog::{PlanCatalog, PlanTier};
pub use ledger::{CategoryUsage, MemoryUsageLedger, UsageEvent, UsageLedger};
pub use resolver::PoolResolver;
pub use store::{AccountStore, MemoryAccountStore};
