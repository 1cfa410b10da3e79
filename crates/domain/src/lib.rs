//! Shared domain types for the TokenMeter workspace: account references,
//! usage categories, admission decisions, engine configuration, and the
//! common error type.

pub mod config;
pub mod error;
pub mod types;

pub use config::MeterConfig;
pub use error::{Error, Result};
pub use types::{AccountRef, ChildId, Decision, DenyReason, FamilyId, UsageCategory};
