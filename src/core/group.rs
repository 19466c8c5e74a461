//! Group business logic - Groups, memberships and the permission checks built on them.
//!
//! Membership decides who may be referenced by *new* ledger entries and who may read a
//! group's balances. Removing a member never rewrites history: lendings and repayments
//! that mention them keep contributing to balances. Because a departed member cannot be
//! named on a new repayment, only settled members may leave.

use crate::{
    core::balance::load_balances,
    entities::{Group, GroupMember, User, group, group_member},
    errors::{Error, Result},
};
use sea_orm::{QueryOrder, Set, TransactionTrait, prelude::*};
use serde::Serialize;
use std::collections::HashSet;
use tracing::info;

/// Role of a member inside a group.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemberRole {
    /// May rename the group, remove members and edit any entry
    Owner,
    /// Regular member
    Member,
}

impl MemberRole {
    /// Value stored in the `role` column.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Owner => "owner",
            Self::Member => "member",
        }
    }

    /// Parses a stored role; anything unknown is treated as a plain member.
    #[must_use]
    pub fn from_stored(value: &str) -> Self {
        if value == Self::Owner.as_str() {
            Self::Owner
        } else {
            Self::Member
        }
    }
}

/// A group together with its current members.
#[derive(Debug, Clone, Serialize)]
pub struct GroupDetail {
    /// The group row
    #[serde(flatten)]
    pub group: group::Model,
    /// Current members, owners first then by join time
    pub members: Vec<group_member::Model>,
}

fn validate_group_name(name: &str) -> Result<String> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(Error::invalid("name", "group name cannot be empty"));
    }
    if trimmed.chars().count() > 100 {
        return Err(Error::invalid("name", "group name must be at most 100 characters"));
    }
    Ok(trimmed.to_string())
}

/// Returns the group or `GroupNotFound`.
pub async fn ensure_group_exists<C>(conn: &C, group_id: i64) -> Result<group::Model>
where
    C: ConnectionTrait,
{
    Group::find_by_id(group_id)
        .one(conn)
        .await?
        .ok_or(Error::GroupNotFound { id: group_id })
}

/// Looks up a user's membership row in a group.
pub async fn find_membership<C>(
    conn: &C,
    group_id: i64,
    user_id: &str,
) -> Result<Option<group_member::Model>>
where
    C: ConnectionTrait,
{
    GroupMember::find()
        .filter(group_member::Column::GroupId.eq(group_id))
        .filter(group_member::Column::UserId.eq(user_id))
        .one(conn)
        .await
        .map_err(Into::into)
}

/// Requires `user_id` to be a current member of the group, for access control.
///
/// # Errors
/// `Forbidden` when the user is not a member.
pub async fn require_member<C>(
    conn: &C,
    group_id: i64,
    user_id: &str,
) -> Result<group_member::Model>
where
    C: ConnectionTrait,
{
    find_membership(conn, group_id, user_id)
        .await?
        .ok_or_else(|| Error::forbidden(format!("not a member of group {group_id}")))
}

/// Whether `user_id` currently owns the group.
pub async fn is_owner<C>(conn: &C, group_id: i64, user_id: &str) -> Result<bool>
where
    C: ConnectionTrait,
{
    Ok(find_membership(conn, group_id, user_id)
        .await?
        .is_some_and(|m| MemberRole::from_stored(&m.role) == MemberRole::Owner))
}

/// Ids of every current member.
pub async fn member_ids<C>(conn: &C, group_id: i64) -> Result<HashSet<String>>
where
    C: ConnectionTrait,
{
    let members = GroupMember::find()
        .filter(group_member::Column::GroupId.eq(group_id))
        .all(conn)
        .await?;
    Ok(members.into_iter().map(|m| m.user_id).collect())
}

/// Only the creator of an entry or a group owner may change or delete it.
pub async fn authorize_entry_edit<C>(
    conn: &C,
    group_id: i64,
    actor: &str,
    created_by: &str,
) -> Result<()>
where
    C: ConnectionTrait,
{
    let membership = require_member(conn, group_id, actor).await?;
    if actor == created_by || MemberRole::from_stored(&membership.role) == MemberRole::Owner {
        return Ok(());
    }
    Err(Error::forbidden(
        "only the entry's creator or a group owner can change it",
    ))
}

/// Creates a group; the creator becomes its owner.
pub async fn create_group(db: &DatabaseConnection, name: &str, creator: &str) -> Result<group::Model> {
    let name = validate_group_name(name)?;

    let txn = db.begin().await?;

    User::find_by_id(creator)
        .one(&txn)
        .await?
        .ok_or_else(|| Error::UserNotFound {
            id: creator.to_string(),
        })?;

    let now = chrono::Utc::now();
    let group = group::ActiveModel {
        name: Set(name),
        created_by: Set(creator.to_string()),
        created_at: Set(now),
        ..Default::default()
    }
    .insert(&txn)
    .await?;

    group_member::ActiveModel {
        group_id: Set(group.id),
        user_id: Set(creator.to_string()),
        role: Set(MemberRole::Owner.as_str().to_string()),
        joined_at: Set(now),
        ..Default::default()
    }
    .insert(&txn)
    .await?;

    txn.commit().await?;

    info!(group_id = group.id, creator, "Group created");
    Ok(group)
}

/// Finds a group by id.
pub async fn get_group(db: &DatabaseConnection, group_id: i64) -> Result<Option<group::Model>> {
    Group::find_by_id(group_id).one(db).await.map_err(Into::into)
}

/// Loads a group and its current members.
pub async fn get_group_detail(db: &DatabaseConnection, group_id: i64) -> Result<GroupDetail> {
    let group = ensure_group_exists(db, group_id).await?;
    let mut members = GroupMember::find()
        .filter(group_member::Column::GroupId.eq(group_id))
        .order_by_asc(group_member::Column::JoinedAt)
        .order_by_asc(group_member::Column::Id)
        .all(db)
        .await?;
    members.sort_by_key(|m| MemberRole::from_stored(&m.role) != MemberRole::Owner);
    Ok(GroupDetail { group, members })
}

/// Groups the user currently belongs to, ordered by name.
pub async fn list_groups_for_user(
    db: &DatabaseConnection,
    user_id: &str,
) -> Result<Vec<group::Model>> {
    let group_ids: Vec<i64> = GroupMember::find()
        .filter(group_member::Column::UserId.eq(user_id))
        .all(db)
        .await?
        .into_iter()
        .map(|m| m.group_id)
        .collect();

    if group_ids.is_empty() {
        return Ok(Vec::new());
    }

    Group::find()
        .filter(group::Column::Id.is_in(group_ids))
        .order_by_asc(group::Column::Name)
        .order_by_asc(group::Column::Id)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Renames a group. Owners only.
pub async fn rename_group(
    db: &DatabaseConnection,
    group_id: i64,
    actor: &str,
    name: &str,
) -> Result<group::Model> {
    let name = validate_group_name(name)?;
    let group = ensure_group_exists(db, group_id).await?;
    if !is_owner(db, group_id, actor).await? {
        return Err(Error::forbidden("only a group owner can rename the group"));
    }

    let mut active: group::ActiveModel = group.into();
    active.name = Set(name);
    let updated = active.update(db).await?;
    info!(group_id, actor, "Group renamed");
    Ok(updated)
}

/// Adds an existing user to the group. Any member may add people; adding a current
/// member again returns the existing membership.
pub async fn add_member(
    db: &DatabaseConnection,
    group_id: i64,
    actor: &str,
    user_id: &str,
) -> Result<group_member::Model> {
    let txn = db.begin().await?;

    ensure_group_exists(&txn, group_id).await?;
    require_member(&txn, group_id, actor).await?;
    User::find_by_id(user_id)
        .one(&txn)
        .await?
        .ok_or_else(|| Error::UserNotFound {
            id: user_id.to_string(),
        })?;

    if let Some(existing) = find_membership(&txn, group_id, user_id).await? {
        return Ok(existing);
    }

    let membership = group_member::ActiveModel {
        group_id: Set(group_id),
        user_id: Set(user_id.to_string()),
        role: Set(MemberRole::Member.as_str().to_string()),
        joined_at: Set(chrono::Utc::now()),
        ..Default::default()
    }
    .insert(&txn)
    .await?;

    txn.commit().await?;

    info!(group_id, actor, user_id, "Member added");
    Ok(membership)
}

/// Removes a member. Owners can remove anyone, members only themselves. The last owner
/// cannot leave, and neither can anyone whose balance in the group is not settled.
/// Returns `false` when the user was not a member.
pub async fn remove_member(
    db: &DatabaseConnection,
    group_id: i64,
    actor: &str,
    user_id: &str,
) -> Result<bool> {
    let txn = db.begin().await?;

    ensure_group_exists(&txn, group_id).await?;
    let actor_membership = require_member(&txn, group_id, actor).await?;
    let actor_is_owner = MemberRole::from_stored(&actor_membership.role) == MemberRole::Owner;
    if actor != user_id && !actor_is_owner {
        return Err(Error::forbidden("only a group owner can remove other members"));
    }

    let Some(target) = find_membership(&txn, group_id, user_id).await? else {
        return Ok(false);
    };

    if MemberRole::from_stored(&target.role) == MemberRole::Owner {
        let owners = GroupMember::find()
            .filter(group_member::Column::GroupId.eq(group_id))
            .filter(group_member::Column::Role.eq(MemberRole::Owner.as_str()))
            .count(&txn)
            .await?;
        if owners <= 1 {
            return Err(Error::Conflict {
                message: "the last owner cannot leave the group".to_string(),
            });
        }
    }

    // Departed members cannot be named on new entries, so their debts must be settled first.
    let balances = load_balances(&txn, group_id).await?;
    if balances.counterparts(user_id).next().is_some() {
        return Err(Error::Conflict {
            message: format!("{user_id} still has unsettled balances in this group"),
        });
    }

    target.delete(&txn).await?;
    txn.commit().await?;

    info!(group_id, actor, user_id, "Member removed");
    Ok(true)
}
