//! Repayment business logic - Recording, correcting and listing settlements.
//!
//! A repayment is an append-only event: recording one never reads or rewrites a stored
//! balance, so two members settling at the same time cannot lose each other's update.
//! Repaying more than is owed is allowed and simply flips the direction of the debt.

use crate::{
    cache::BalanceCache,
    core::{
        group::{MemberRole, authorize_entry_edit, ensure_group_exists, member_ids, require_member},
        money::{Amount, validate_positive},
    },
    entities::{Repayment, repayment},
    errors::{Error, Result},
};
use chrono::Utc;
use sea_orm::{Condition, QueryOrder, Set, TransactionTrait, prelude::*};
use serde::Serialize;
use tracing::{debug, info};

/// A repayment to record.
#[derive(Debug, Clone)]
pub struct NewRepayment {
    /// Member handing over the money
    pub payer_id: String,
    /// Member receiving it
    pub payee_id: String,
    /// Amount in yen
    pub amount: Amount,
    /// When it was paid; defaults to now
    pub paid_at: Option<DateTimeUtc>,
}

/// Correction to an existing repayment.
#[derive(Debug, Clone)]
pub struct RepaymentUpdate {
    /// New amount in yen
    pub amount: Amount,
    /// New payment date; unchanged when `None`
    pub paid_at: Option<DateTimeUtc>,
}

/// Repayments a user took part in, across all groups.
#[derive(Debug, Clone, Default, Serialize)]
pub struct UserPayments {
    /// Repayments the user made, newest first
    pub sent: Vec<repayment::Model>,
    /// Repayments the user received, newest first
    pub received: Vec<repayment::Model>,
}

fn validate_new(new: &NewRepayment) -> Result<()> {
    validate_positive(new.amount)?;
    if new.payer_id.trim().is_empty() {
        return Err(Error::invalid("payer_id", "payer is required"));
    }
    if new.payee_id.trim().is_empty() {
        return Err(Error::invalid("payee_id", "payee is required"));
    }
    if new.payer_id == new.payee_id {
        return Err(Error::SelfRepayment {
            user_id: new.payer_id.clone(),
        });
    }
    Ok(())
}

/// Records a repayment in `group_id` on behalf of `actor`.
///
/// The actor must be a member and either one of the two parties or a group owner. Both
/// parties must be current members. The group's cached balances are invalidated before
/// this returns, so the actor's next read sees the repayment.
pub async fn record_repayment(
    db: &DatabaseConnection,
    cache: &BalanceCache,
    group_id: i64,
    actor: &str,
    new: NewRepayment,
) -> Result<repayment::Model> {
    validate_new(&new)?;

    let txn = db.begin().await?;

    ensure_group_exists(&txn, group_id).await?;
    let membership = require_member(&txn, group_id, actor).await?;
    let is_party = actor == new.payer_id || actor == new.payee_id;
    if !is_party && MemberRole::from_stored(&membership.role) != MemberRole::Owner {
        return Err(Error::forbidden(
            "only the payer, the payee or a group owner can record a repayment",
        ));
    }

    let members = member_ids(&txn, group_id).await?;
    for (field, party) in [("payer_id", &new.payer_id), ("payee_id", &new.payee_id)] {
        if !members.contains(party) {
            return Err(Error::NotGroupMember {
                group_id,
                user_id: party.clone(),
                field,
            });
        }
    }

    let now = Utc::now();
    let repayment = repayment::ActiveModel {
        group_id: Set(group_id),
        payer_id: Set(new.payer_id),
        payee_id: Set(new.payee_id),
        amount: Set(new.amount),
        paid_at: Set(new.paid_at.unwrap_or(now)),
        created_by: Set(actor.to_string()),
        created_at: Set(now),
        ..Default::default()
    }
    .insert(&txn)
    .await?;

    txn.commit().await?;
    cache.invalidate(group_id).await;

    info!(
        group_id,
        repayment_id = repayment.id,
        payer_id = %repayment.payer_id,
        payee_id = %repayment.payee_id,
        amount = repayment.amount,
        "Repayment recorded"
    );
    Ok(repayment)
}

/// Corrects the amount and/or date of a repayment.
pub async fn update_repayment(
    db: &DatabaseConnection,
    cache: &BalanceCache,
    repayment_id: i64,
    actor: &str,
    update: RepaymentUpdate,
) -> Result<repayment::Model> {
    validate_positive(update.amount)?;

    let txn = db.begin().await?;

    let existing = Repayment::find_by_id(repayment_id)
        .one(&txn)
        .await?
        .ok_or(Error::RepaymentNotFound { id: repayment_id })?;
    let group_id = existing.group_id;
    authorize_entry_edit(&txn, group_id, actor, &existing.created_by).await?;

    let paid_at = update.paid_at.unwrap_or(existing.paid_at);
    let mut active: repayment::ActiveModel = existing.into();
    active.amount = Set(update.amount);
    active.paid_at = Set(paid_at);
    let updated = active.update(&txn).await?;

    txn.commit().await?;
    cache.invalidate(group_id).await;

    info!(group_id, repayment_id, amount = updated.amount, actor, "Repayment updated");
    Ok(updated)
}

/// Deletes a repayment. Deleting an unknown id returns `false`.
pub async fn delete_repayment(
    db: &DatabaseConnection,
    cache: &BalanceCache,
    repayment_id: i64,
    actor: &str,
) -> Result<bool> {
    let txn = db.begin().await?;

    let Some(existing) = Repayment::find_by_id(repayment_id).one(&txn).await? else {
        debug!(repayment_id, "Repayment already gone");
        return Ok(false);
    };
    let group_id = existing.group_id;
    authorize_entry_edit(&txn, group_id, actor, &existing.created_by).await?;

    existing.delete(&txn).await?;
    txn.commit().await?;
    cache.invalidate(group_id).await;

    info!(group_id, repayment_id, actor, "Repayment deleted");
    Ok(true)
}

/// Finds a repayment by id.
pub async fn get_repayment(
    db: &DatabaseConnection,
    repayment_id: i64,
) -> Result<Option<repayment::Model>> {
    Repayment::find_by_id(repayment_id)
        .one(db)
        .await
        .map_err(Into::into)
}

/// Lists a group's repayments, newest first.
pub async fn list_repayments(
    db: &DatabaseConnection,
    group_id: i64,
) -> Result<Vec<repayment::Model>> {
    ensure_group_exists(db, group_id).await?;
    Repayment::find()
        .filter(repayment::Column::GroupId.eq(group_id))
        .order_by_desc(repayment::Column::PaidAt)
        .order_by_desc(repayment::Column::Id)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Every repayment the user sent or received, across groups.
pub async fn list_user_payments(db: &DatabaseConnection, user_id: &str) -> Result<UserPayments> {
    let rows = Repayment::find()
        .filter(
            Condition::any()
                .add(repayment::Column::PayerId.eq(user_id))
                .add(repayment::Column::PayeeId.eq(user_id)),
        )
        .order_by_desc(repayment::Column::PaidAt)
        .order_by_desc(repayment::Column::Id)
        .all(db)
        .await?;

    let (sent, received): (Vec<_>, Vec<_>) =
        rows.into_iter().partition(|r| r.payer_id == user_id);
    Ok(UserPayments { sent, received })
}
