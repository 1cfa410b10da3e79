use std::fmt;

use serde::{Deserialize, Serialize};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Account references
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Identifier of a single child subtenant.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChildId(pub String);

/// Identifier of a family whose children share one token pool.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FamilyId(pub String);

impl ChildId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }
}

impl FamilyId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }
}

/// What a quota account is keyed by: an individual child, or a family pool
/// shared by several children.
///
/// The admission controller treats both uniformly; only the pool resolver
/// cares which one a request maps to.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "lowercase")]
pub enum AccountRef {
    Child(ChildId),
    Family(FamilyId),
}

impl AccountRef {
    pub fn child(id: impl Into<String>) -> Self {
        AccountRef::Child(ChildId::new(id))
    }

    pub fn family(id: impl Into<String>) -> Self {
        AccountRef::Family(FamilyId::new(id))
    }

    pub fn as_str(&self) -> &str {
        match self {
            AccountRef::Child(c) => &c.0,
            AccountRef::Family(f) => &f.0,
        }
    }
}

impl fmt::Display for AccountRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AccountRef::Child(c) => write!(f, "child:{}", c.0),
            AccountRef::Family(fam) => write!(f, "family:{}", fam.0),
        }
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Usage categories
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// The kind of AI-consuming action a token spend belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UsageCategory {
    Chat,
    Image,
    Voice,
    Avatar,
}

impl UsageCategory {
    pub fn label(&self) -> &'static str {
        match self {
            UsageCategory::Chat => "chat",
            UsageCategory::Image => "image",
            UsageCategory::Voice => "voice",
            UsageCategory::Avatar => "avatar",
        }
    }

    pub const ALL: [UsageCategory; 4] = [
        UsageCategory::Chat,
        UsageCategory::Image,
        UsageCategory::Voice,
        UsageCategory::Avatar,
    ];
}

impl fmt::Display for UsageCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Admission decisions
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Why a consumption attempt was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DenyReason {
    /// The plan has no overage purchasing and the call would exceed the
    /// allowance.  A normal business outcome — the caller should show an
    /// upgrade or token-purchase prompt, not an error page.
    LimitReached,
}

impl DenyReason {
    pub fn label(&self) -> &'static str {
        match self {
            DenyReason::LimitReached => "limit_reached",
        }
    }
}

/// Outcome of an admission check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum Decision {
    /// Within the allowance.
    Allowed,
    /// Admitted, but some of this call's tokens fall beyond the allowance
    /// and will be billed at the plan's overage rate.
    AllowedWithOverage {
        /// Overage tokens attributable to *this* call only.
        overage_tokens: u64,
    },
    /// Refused; the account was not charged.
    Denied { reason: DenyReason },
}

impl Decision {
    /// Whether the caller may perform the AI-consuming action.
    pub fn is_admitted(&self) -> bool {
        !matches!(self, Decision::Denied { .. })
    }

    /// Stable label persisted in the usage ledger.
    pub fn label(&self) -> &'static str {
        match self {
            Decision::Allowed => "allowed",
            Decision::AllowedWithOverage { .. } => "overage_allowed",
            Decision::Denied { .. } => "denied",
        }
    }
}
