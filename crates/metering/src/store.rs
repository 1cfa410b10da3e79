//! Account persistence seam — versioned read, conditional write.
//!
//! The version handed out by [`AccountStore::load`] must be echoed back on
//! [`AccountStore::commit`]; a mismatch fails with [`Error::Conflict`] and
//! the caller re-reads and retries.  This per-row guard is the engine's only
//! serialization point, so unrelated accounts never contend and no other
//! mutation path may exist.

use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::RwLock;

use tm_domain::{AccountRef, Error, Result};

use crate::account::{QuotaAccount, Versioned};

#[async_trait]
pub trait AccountStore: Send + Sync {
    /// Read an account row together with its current version.
    ///
    /// Fails with [`Error::UnknownAccount`] when the row does not exist.
    async fn load(&self, account: &AccountRef) -> Result<Versioned<QuotaAccount>>;

    /// Conditionally write `state`, keyed by `state.account`.
    ///
    /// Succeeds only when the stored version still equals
    /// `expected_version`; otherwise fails with [`Error::Conflict`] and
    /// leaves the row untouched.  Returns the new version.
    async fn commit(&self, expected_version: u64, state: QuotaAccount) -> Result<u64>;

    /// Create a new account row at version 1.
    ///
    /// Fails with [`Error::Storage`] when the row already exists.
    async fn insert(&self, state: QuotaAccount) -> Result<()>;
}

/// In-memory account store; each account is an independently versioned cell
/// behind one map-level lock held only for the duration of the copy.
#[derive(Default)]
pub struct MemoryAccountStore {
    rows: RwLock<HashMap<AccountRef, (QuotaAccount, u64)>>,
}

impl MemoryAccountStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl AccountStore for MemoryAccountStore {
    async fn load(&self, account: &AccountRef) -> Result<Versioned<QuotaAccount>> {
        let rows = self.rows.read();
        let (state, version) = rows
            .get(account)
            .ok_or_else(|| Error::UnknownAccount(account.to_string()))?;
        Ok(Versioned {
            value: state.clone(),
            version: *version,
        })
    }

    async fn commit(&self, expected_version: u64, state: QuotaAccount) -> Result<u64> {
        let mut rows = self.rows.write();
        let entry = rows
            .get_mut(&state.account)
            .ok_or_else(|| Error::UnknownAccount(state.account.to_string()))?;
        if entry.1 != expected_version {
            return Err(Error::Conflict);
        }
        let new_version = expected_version + 1;
        *entry = (state, new_version);
        Ok(new_version)
    }

    async fn insert(&self, state: QuotaAccount) -> Result<()> {
        let mut rows = self.rows.write();
        if rows.contains_key(&state.account) {
            return Err(Error::Storage(format!(
                "account already provisioned: {}",
                state.account
            )));
        }
        rows.insert(state.account.clone(), (state, 1));
        Ok(())
    }
}
