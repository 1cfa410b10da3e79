/// Shared error type used across all TokenMeter crates.
///
/// `Denied` admission outcomes are *not* errors — they are carried in
/// [`crate::types::Decision`].  `Conflict` is internal: the admission
/// controller retries it and callers only ever see `TransientFailure` once
/// the retry budget is exhausted.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("unknown account: {0}")]
    UnknownAccount(String),

    #[error("unknown plan: {0}")]
    UnknownPlan(String),

    #[error("invalid amount: {0}")]
    InvalidAmount(i64),

    #[error("version conflict")]
    Conflict,

    #[error("transient failure: {0}")]
    TransientFailure(String),

    #[error("storage: {0}")]
    Storage(String),

    #[error("ledger: {0}")]
    Ledger(String),

    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Whether the caller may safely retry the whole operation.
    ///
    /// Only transient failures qualify; everything else is either a caller
    /// defect (`UnknownAccount`, `UnknownPlan`, `InvalidAmount`) or handled
    /// internally (`Conflict`).
    pub fn is_retryable(&self) -> bool {
        matches!(self, Error::TransientFailure(_))
    }
}

pub type Result<T> = std::result::Result<T, Error>;
