//! Lending business logic - Create, replace, delete and list lendings with their shares.
//!
//! A lending is written together with its shares in one database transaction, after the
//! share invariant has been checked: shares are non-negative, one per user, reference
//! current group members only, and add up to the lending amount. Updates replace the
//! whole share set rather than patching it. Every successful write invalidates the
//! group's cached balances before returning.

use crate::{
    cache::BalanceCache,
    core::{
        group::{authorize_entry_edit, ensure_group_exists, member_ids, require_member},
        money::{Amount, ShareInput, split_evenly, validate_shares},
    },
    entities::{Lending, LendingShare, lending, lending_share},
    errors::{Error, Result},
};
use chrono::Utc;
use sea_orm::{DatabaseTransaction, QueryOrder, Set, TransactionTrait, prelude::*};
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use tracing::{debug, info};

/// How a lending's amount is divided.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SharePlan {
    /// Caller-supplied shares that must add up to the amount
    Explicit(Vec<ShareInput>),
    /// Split evenly among these users (see [`split_evenly`])
    Even(Vec<String>),
}

/// Full description of a lending, used both to create and to replace one.
#[derive(Debug, Clone)]
pub struct NewLending {
    /// Short description
    pub name: String,
    /// Member who paid
    pub payer_id: String,
    /// Total paid, in yen
    pub amount: Amount,
    /// When the expense happened; defaults to now
    pub occurred_at: Option<DateTimeUtc>,
    /// How the amount is divided
    pub shares: SharePlan,
}

/// A lending with its shares.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LendingDetail {
    /// The lending row
    #[serde(flatten)]
    pub lending: lending::Model,
    /// Shares ordered by user id
    pub shares: Vec<lending_share::Model>,
}

/// Validates the input and resolves the share plan into concrete shares.
///
/// Runs before any database access so malformed lendings never reach storage.
pub fn resolve_shares(new: &NewLending) -> Result<Vec<ShareInput>> {
    if new.name.trim().is_empty() {
        return Err(Error::invalid("name", "lending name cannot be empty"));
    }
    if new.payer_id.trim().is_empty() {
        return Err(Error::invalid("payer_id", "payer is required"));
    }

    let mut shares = match &new.shares {
        SharePlan::Explicit(shares) => shares.clone(),
        SharePlan::Even(participants) => split_evenly(new.amount, participants, &new.payer_id)?,
    };
    validate_shares(new.amount, &shares)?;
    shares.sort_by(|a, b| a.user_id.cmp(&b.user_id));
    Ok(shares)
}

fn check_participants(
    group_id: i64,
    members: &HashSet<String>,
    payer_id: &str,
    shares: &[ShareInput],
) -> Result<()> {
    let outsider = std::iter::once(("payer_id", payer_id))
        .chain(shares.iter().map(|s| ("shares", s.user_id.as_str())))
        .find(|(_, id)| !members.contains(*id));
    match outsider {
        Some((field, user_id)) => Err(Error::NotGroupMember {
            group_id,
            user_id: user_id.to_string(),
            field,
        }),
        None => Ok(()),
    }
}

async fn insert_shares(
    txn: &DatabaseTransaction,
    lending_id: i64,
    shares: Vec<ShareInput>,
) -> Result<Vec<lending_share::Model>> {
    let mut inserted = Vec::with_capacity(shares.len());
    for share in shares {
        let model = lending_share::ActiveModel {
            lending_id: Set(lending_id),
            user_id: Set(share.user_id),
            amount: Set(share.amount),
            ..Default::default()
        }
        .insert(txn)
        .await?;
        inserted.push(model);
    }
    Ok(inserted)
}

async fn load_shares<C>(conn: &C, lending_ids: Vec<i64>) -> Result<HashMap<i64, Vec<lending_share::Model>>>
where
    C: ConnectionTrait,
{
    let mut by_lending: HashMap<i64, Vec<lending_share::Model>> = HashMap::new();
    if lending_ids.is_empty() {
        return Ok(by_lending);
    }
    let shares = LendingShare::find()
        .filter(lending_share::Column::LendingId.is_in(lending_ids))
        .order_by_asc(lending_share::Column::UserId)
        .all(conn)
        .await?;
    for share in shares {
        by_lending.entry(share.lending_id).or_default().push(share);
    }
    Ok(by_lending)
}

/// Loads every lending of a group with its shares, newest first.
pub async fn load_group_lendings<C>(conn: &C, group_id: i64) -> Result<Vec<LendingDetail>>
where
    C: ConnectionTrait,
{
    let lendings = Lending::find()
        .filter(lending::Column::GroupId.eq(group_id))
        .order_by_desc(lending::Column::OccurredAt)
        .order_by_desc(lending::Column::Id)
        .all(conn)
        .await?;

    let mut shares = load_shares(conn, lendings.iter().map(|l| l.id).collect()).await?;
    Ok(lendings
        .into_iter()
        .map(|lending| {
            let shares = shares.remove(&lending.id).unwrap_or_default();
            LendingDetail { lending, shares }
        })
        .collect())
}

/// Records a new lending in `group_id` on behalf of `actor`.
///
/// # Errors
/// Validation errors for bad amounts or shares, `NotGroupMember` when the payer or a
/// share user is not a current member, `Forbidden` when the actor is not a member,
/// `GroupNotFound` for an unknown group.
pub async fn create_lending(
    db: &DatabaseConnection,
    cache: &BalanceCache,
    group_id: i64,
    actor: &str,
    new: NewLending,
) -> Result<LendingDetail> {
    let shares = resolve_shares(&new)?;

    let txn = db.begin().await?;

    ensure_group_exists(&txn, group_id).await?;
    require_member(&txn, group_id, actor).await?;
    let members = member_ids(&txn, group_id).await?;
    check_participants(group_id, &members, &new.payer_id, &shares)?;

    let now = Utc::now();
    let lending = lending::ActiveModel {
        group_id: Set(group_id),
        name: Set(new.name.trim().to_string()),
        payer_id: Set(new.payer_id),
        amount: Set(new.amount),
        occurred_at: Set(new.occurred_at.unwrap_or(now)),
        created_by: Set(actor.to_string()),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(&txn)
    .await?;

    let shares = insert_shares(&txn, lending.id, shares).await?;

    txn.commit().await?;
    cache.invalidate(group_id).await;

    info!(
        group_id,
        lending_id = lending.id,
        payer_id = %lending.payer_id,
        amount = lending.amount,
        shares = shares.len(),
        "Lending created"
    );
    Ok(LendingDetail { lending, shares })
}

/// Replaces a lending's description, payer, amount, date and full share set.
///
/// # Errors
/// Same validation as [`create_lending`], plus `LendingNotFound` and `Forbidden` when the
/// actor is neither the creator nor a group owner.
pub async fn update_lending(
    db: &DatabaseConnection,
    cache: &BalanceCache,
    lending_id: i64,
    actor: &str,
    replacement: NewLending,
) -> Result<LendingDetail> {
    let shares = resolve_shares(&replacement)?;

    let txn = db.begin().await?;

    let existing = Lending::find_by_id(lending_id)
        .one(&txn)
        .await?
        .ok_or(Error::LendingNotFound { id: lending_id })?;
    let group_id = existing.group_id;

    authorize_entry_edit(&txn, group_id, actor, &existing.created_by).await?;
    let members = member_ids(&txn, group_id).await?;
    check_participants(group_id, &members, &replacement.payer_id, &shares)?;

    let occurred_at = replacement.occurred_at.unwrap_or(existing.occurred_at);
    let mut active: lending::ActiveModel = existing.into();
    active.name = Set(replacement.name.trim().to_string());
    active.payer_id = Set(replacement.payer_id);
    active.amount = Set(replacement.amount);
    active.occurred_at = Set(occurred_at);
    active.updated_at = Set(Utc::now());
    let lending = active.update(&txn).await?;

    let removed = LendingShare::delete_many()
        .filter(lending_share::Column::LendingId.eq(lending_id))
        .exec(&txn)
        .await?;
    let shares = insert_shares(&txn, lending_id, shares).await?;

    txn.commit().await?;
    cache.invalidate(group_id).await;

    debug!(lending_id, replaced_shares = removed.rows_affected, "Shares replaced");
    info!(group_id, lending_id, amount = lending.amount, actor, "Lending updated");
    Ok(LendingDetail { lending, shares })
}

/// Deletes a lending and its shares. Deleting an unknown id is not an error and
/// returns `false`.
pub async fn delete_lending(
    db: &DatabaseConnection,
    cache: &BalanceCache,
    lending_id: i64,
    actor: &str,
) -> Result<bool> {
    let txn = db.begin().await?;

    let Some(existing) = Lending::find_by_id(lending_id).one(&txn).await? else {
        debug!(lending_id, "Lending already gone");
        return Ok(false);
    };
    let group_id = existing.group_id;
    authorize_entry_edit(&txn, group_id, actor, &existing.created_by).await?;

    LendingShare::delete_many()
        .filter(lending_share::Column::LendingId.eq(lending_id))
        .exec(&txn)
        .await?;
    existing.delete(&txn).await?;

    txn.commit().await?;
    cache.invalidate(group_id).await;

    info!(group_id, lending_id, actor, "Lending deleted");
    Ok(true)
}

/// Finds a lending with its shares.
pub async fn get_lending(db: &DatabaseConnection, lending_id: i64) -> Result<Option<LendingDetail>> {
    let Some(lending) = Lending::find_by_id(lending_id).one(db).await? else {
        return Ok(None);
    };
    let shares = load_shares(db, vec![lending_id])
        .await?
        .remove(&lending_id)
        .unwrap_or_default();
    Ok(Some(LendingDetail { lending, shares }))
}

/// Lists a group's lendings, newest first.
pub async fn list_lendings(db: &DatabaseConnection, group_id: i64) -> Result<Vec<LendingDetail>> {
    ensure_group_exists(db, group_id).await?;
    load_group_lendings(db, group_id).await
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::core::balance::compute_balances;
    use crate::test_utils::*;

    fn explicit(payer: &str, amount: Amount, shares: &[(&str, Amount)]) -> NewLending {
        NewLending {
            name: "Groceries".to_string(),
            payer_id: payer.to_string(),
            amount,
            occurred_at: None,
            shares: SharePlan::Explicit(
                shares
                    .iter()
                    .map(|(user, amount)| ShareInput::new(*user, *amount))
                    .collect(),
            ),
        }
    }

    #[tokio::test]
    async fn test_create_lending_validation_before_storage() -> Result<()> {
        let db = setup_test_db().await?;
        let cache = BalanceCache::default();

        let result = create_lending(&db, &cache, 1, "a", explicit("a", 1000, &[("b", 999)])).await;
        assert!(matches!(
            result.unwrap_err(),
            Error::ShareSumMismatch {
                expected: 1000,
                actual: 999
            }
        ));

        let result = create_lending(&db, &cache, 1, "a", explicit("a", 0, &[("b", 0)])).await;
        assert!(matches!(
            result.unwrap_err(),
            Error::InvalidAmount { amount: 0 }
        ));

        let mut unnamed = explicit("a", 100, &[("b", 100)]);
        unnamed.name = "  ".to_string();
        let result = create_lending(&db, &cache, 1, "a", unnamed).await;
        assert!(matches!(
            result.unwrap_err(),
            Error::InvalidField { field: "name", .. }
        ));
        assert!(Lending::find().all(&db).await?.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_create_lending_even_split() -> Result<()> {
        let fixture = setup_group_with_members(&["alice", "bob", "carol"]).await?;

        let detail = create_lending(
            &fixture.db,
            &fixture.cache,
            fixture.group.id,
            "alice",
            NewLending {
                name: "Taxi".to_string(),
                payer_id: "alice".to_string(),
                amount: 1000,
                occurred_at: None,
                shares: SharePlan::Even(vec![
                    "bob".to_string(),
                    "alice".to_string(),
                    "carol".to_string(),
                ]),
            },
        )
        .await?;

        let amounts: Vec<(&str, Amount)> = detail
            .shares
            .iter()
            .map(|s| (s.user_id.as_str(), s.amount))
            .collect();
        assert_eq!(amounts, vec![("alice", 334), ("bob", 333), ("carol", 333)]);
        assert_eq!(detail.lending.created_by, "alice");

        let stored = get_lending(&fixture.db, detail.lending.id).await?.unwrap();
        assert_eq!(stored, detail);
        Ok(())
    }

    #[tokio::test]
    async fn test_create_lending_rejects_non_members() -> Result<()> {
        let fixture = setup_group_with_members(&["alice", "bob"]).await?;
        create_test_user(&fixture.db, "outsider").await?;
        let group_id = fixture.group.id;

        let result = create_lending(
            &fixture.db,
            &fixture.cache,
            group_id,
            "alice",
            explicit("alice", 1000, &[("bob", 500), ("outsider", 500)]),
        )
        .await;
        assert!(matches!(
            result,
            Err(Error::NotGroupMember { ref user_id, .. }) if user_id == "outsider"
        ));

        let result = create_lending(
            &fixture.db,
            &fixture.cache,
            group_id,
            "outsider",
            explicit("alice", 1000, &[("bob", 1000)]),
        )
        .await;
        assert!(matches!(result, Err(Error::Forbidden { .. })));

        assert!(list_lendings(&fixture.db, group_id).await?.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_create_lending_unknown_group() -> Result<()> {
        let db = setup_test_db().await?;
        let cache = BalanceCache::default();
        let result = create_lending(&db, &cache, 99, "a", explicit("a", 10, &[("a", 10)])).await;
        assert!(matches!(result, Err(Error::GroupNotFound { id: 99 })));
        Ok(())
    }

    #[tokio::test]
    async fn test_update_lending_replaces_shares() -> Result<()> {
        let fixture = setup_group_with_members(&["alice", "bob", "carol"]).await?;
        let group_id = fixture.group.id;

        let created = create_test_lending(
            &fixture.db,
            &fixture.cache,
            group_id,
            "alice",
            vec![ShareInput::new("bob", 600), ShareInput::new("carol", 400)],
        )
        .await?;

        let updated = update_lending(
            &fixture.db,
            &fixture.cache,
            created.lending.id,
            "alice",
            explicit("alice", 900, &[("carol", 900)]),
        )
        .await?;
        assert_eq!(updated.lending.amount, 900);
        assert_eq!(updated.shares.len(), 1);
        assert_eq!(updated.lending.occurred_at, created.lending.occurred_at);

        let balances = compute_balances(&fixture.db, group_id).await?;
        assert_eq!(balances.net("bob", "alice"), 0);
        assert_eq!(balances.net("carol", "alice"), 900);
        Ok(())
    }

    #[tokio::test]
    async fn test_update_lending_revalidates() -> Result<()> {
        let fixture = setup_group_with_members(&["alice", "bob"]).await?;
        let created = create_test_lending(
            &fixture.db,
            &fixture.cache,
            fixture.group.id,
            "alice",
            vec![ShareInput::new("bob", 500)],
        )
        .await?;

        let result = update_lending(
            &fixture.db,
            &fixture.cache,
            created.lending.id,
            "alice",
            explicit("alice", 500, &[("bob", 400)]),
        )
        .await;
        assert!(matches!(result, Err(Error::ShareSumMismatch { .. })));

        // Nothing changed
        let stored = get_lending(&fixture.db, created.lending.id).await?.unwrap();
        assert_eq!(stored, created);
        Ok(())
    }

    #[tokio::test]
    async fn test_only_creator_or_owner_can_edit() -> Result<()> {
        let fixture = setup_group_with_members(&["alice", "bob", "carol"]).await?;
        let created = create_test_lending(
            &fixture.db,
            &fixture.cache,
            fixture.group.id,
            "bob",
            vec![ShareInput::new("carol", 300)],
        )
        .await?;

        let result = delete_lending(&fixture.db, &fixture.cache, created.lending.id, "carol").await;
        assert!(matches!(result, Err(Error::Forbidden { .. })));

        // alice owns the group
        assert!(delete_lending(&fixture.db, &fixture.cache, created.lending.id, "alice").await?);
        Ok(())
    }

    #[tokio::test]
    async fn test_delete_lending_is_idempotent() -> Result<()> {
        let fixture = setup_group_with_members(&["alice", "bob"]).await?;
        let created = create_test_lending(
            &fixture.db,
            &fixture.cache,
            fixture.group.id,
            "alice",
            vec![ShareInput::new("bob", 500)],
        )
        .await?;

        assert!(delete_lending(&fixture.db, &fixture.cache, created.lending.id, "alice").await?);
        assert!(!delete_lending(&fixture.db, &fixture.cache, created.lending.id, "alice").await?);
        assert!(get_lending(&fixture.db, created.lending.id).await?.is_none());
        assert!(compute_balances(&fixture.db, fixture.group.id).await?.is_settled());
        Ok(())
    }

    #[tokio::test]
    async fn test_removed_member_history_is_kept() -> Result<()> {
        let fixture = setup_group_with_members(&["alice", "bob"]).await?;
        let group_id = fixture.group.id;
        create_test_lending(
            &fixture.db,
            &fixture.cache,
            group_id,
            "alice",
            vec![ShareInput::new("bob", 700)],
        )
        .await?;

        create_test_repayment(&fixture.db, &fixture.cache, group_id, "bob", "alice", 700).await?;
        assert!(crate::core::group::remove_member(&fixture.db, group_id, "alice", "bob").await?);

        let history = list_lendings(&fixture.db, group_id).await?;
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].shares[0].user_id, "bob");
        assert!(compute_balances(&fixture.db, group_id).await?.is_settled());

        // but bob can no longer be put on new lendings
        let result = create_lending(
            &fixture.db,
            &fixture.cache,
            group_id,
            "alice",
            explicit("alice", 100, &[("bob", 100)]),
        )
        .await;
        assert!(matches!(
            result,
            Err(Error::NotGroupMember { field: "shares", .. })
        ));
        Ok(())
    }

    #[tokio::test]
    async fn test_list_lendings_newest_first() -> Result<()> {
        let fixture = setup_group_with_members(&["alice", "bob"]).await?;
        let group_id = fixture.group.id;
        let older = Utc::now() - chrono::Duration::days(3);

        let mut first = explicit("alice", 100, &[("bob", 100)]);
        first.occurred_at = Some(older);
        let first = create_lending(&fixture.db, &fixture.cache, group_id, "alice", first).await?;
        let second = create_test_lending(
            &fixture.db,
            &fixture.cache,
            group_id,
            "bob",
            vec![ShareInput::new("alice", 50)],
        )
        .await?;

        let listed = list_lendings(&fixture.db, group_id).await?;
        let ids: Vec<i64> = listed.iter().map(|d| d.lending.id).collect();
        assert_eq!(ids, vec![second.lending.id, first.lending.id]);
        Ok(())
    }
}
