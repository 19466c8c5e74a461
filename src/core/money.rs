//! Yen amounts and the even-split helper.
//!
//! All money is an `i64` count of yen; there is no fractional subunit and no floating
//! point anywhere in the ledger. Bounding every stored amount by [`MAX_AMOUNT`] keeps
//! any realistic sum of entries far away from `i64` overflow.

use crate::errors::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// A yen amount. Viewer-facing figures are positive when owed to the viewer.
pub type Amount = i64;

/// Upper bound for a single lending, share or repayment (one trillion yen).
pub const MAX_AMOUNT: Amount = 1_000_000_000_000;

/// One user's part of a lending.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShareInput {
    /// User responsible for the share
    pub user_id: String,
    /// Share in yen
    pub amount: Amount,
}

impl ShareInput {
    /// Convenience constructor.
    pub fn new(user_id: impl Into<String>, amount: Amount) -> Self {
        Self {
            user_id: user_id.into(),
            amount,
        }
    }
}

/// Ensures `amount` is strictly positive and within [`MAX_AMOUNT`].
pub fn validate_positive(amount: Amount) -> Result<Amount> {
    if amount <= 0 || amount > MAX_AMOUNT {
        return Err(Error::InvalidAmount { amount });
    }
    Ok(amount)
}

/// Checks the share invariants of a lending of `amount`.
///
/// Shares must be non-empty, non-negative, unique per user, and sum to `amount`.
pub fn validate_shares(amount: Amount, shares: &[ShareInput]) -> Result<()> {
    validate_positive(amount)?;
    if shares.is_empty() {
        return Err(Error::invalid("shares", "at least one share is required"));
    }

    let mut seen = HashSet::with_capacity(shares.len());
    let mut total: Amount = 0;
    for share in shares {
        if share.user_id.trim().is_empty() {
            return Err(Error::invalid("shares", "share user id cannot be empty"));
        }
        if !seen.insert(share.user_id.as_str()) {
            return Err(Error::invalid(
                "shares",
                format!("user {} appears more than once", share.user_id),
            ));
        }
        if share.amount < 0 || share.amount > MAX_AMOUNT {
            return Err(Error::invalid(
                "shares",
                format!("share for {} must be between 0 and {MAX_AMOUNT}", share.user_id),
            ));
        }
        total += share.amount;
    }

    if total != amount {
        return Err(Error::ShareSumMismatch {
            expected: amount,
            actual: total,
        });
    }
    Ok(())
}

/// Splits `amount` evenly across `participants`.
///
/// Everyone gets `amount / n`. The remainder goes to `payer` when the payer is one of
/// the participants; otherwise it is handed out one yen at a time to participants in
/// ascending user-id order. The result is sorted by user id.
pub fn split_evenly(amount: Amount, participants: &[String], payer: &str) -> Result<Vec<ShareInput>> {
    validate_positive(amount)?;
    if participants.is_empty() {
        return Err(Error::invalid("participants", "at least one participant is required"));
    }

    let mut ids: Vec<&str> = participants.iter().map(String::as_str).collect();
    ids.sort_unstable();
    if ids.windows(2).any(|pair| pair[0] == pair[1]) {
        return Err(Error::invalid("participants", "participants must be unique"));
    }

    let count = Amount::try_from(ids.len())?;
    let base = amount / count;
    let remainder = amount % count;
    let payer_participates = ids.contains(&payer);

    let shares = (0..)
        .zip(&ids)
        .map(|(index, id): (Amount, &&str)| {
            let extra = match (payer_participates, *id == payer) {
                (true, true) => remainder,
                (false, _) if index < remainder => 1,
                _ => 0,
            };
            ShareInput::new(*id, base + extra)
        })
        .collect();
    Ok(shares)
}
