//! Monthly period roll — lazy counter reset on the account's anchor day.
//!
//! [`roll`] is a pure function; the admission controller applies it to every
//! loaded account before deciding, and the new anchor is persisted together
//! with the consumption commit.  Rolling an account whose period has not
//! elapsed returns the input unchanged, which makes concurrent rolls and
//! redundant sweeps safe.

use chrono::{Datelike, NaiveDate};

use crate::account::QuotaAccount;

/// Date the current period ends and the next one begins: one calendar month
/// after `anchor`, on `anchor_day` clamped to the target month's length.
pub fn next_reset(anchor: NaiveDate, anchor_day: u8) -> NaiveDate {
    let (year, month) = if anchor.month() == 12 {
        (anchor.year() + 1, 1)
    } else {
        (anchor.year(), anchor.month() + 1)
    };
    clamped_date(year, month, anchor_day)
}

/// The given day in the given month, pulled back to the month's last day
/// when it doesn't exist (day 31 in February → Feb 28/29).
fn clamped_date(year: i32, month: u32, day: u8) -> NaiveDate {
    let mut day = u32::from(day).clamp(1, 31);
    loop {
        if let Some(date) = NaiveDate::from_ymd_opt(year, month, day) {
            return date;
        }
        day -= 1;
    }
}

/// Advance `account` through every billing boundary that has elapsed by
/// `today`, zeroing the period counters and clearing the fired-alert set at
/// each boundary.
///
/// Boundaries are crossed one period at a time so long-dormant accounts land
/// on a real anchor date rather than on "now", and repeated invocation is
/// idempotent.
pub fn roll(mut account: QuotaAccount, today: NaiveDate) -> QuotaAccount {
    loop {
        let boundary = next_reset(account.period_anchor, account.anchor_day);
        if boundary > today {
            return account;
        }
        account.period_anchor = boundary;
        account.tokens_consumed = 0;
        account.overage_tokens = 0;
        account.alerts_fired.clear();
    }
}
