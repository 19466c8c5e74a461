//! Friend business logic - Requests between users and the resulting friend lists.
//!
//! A pair of users shares at most one friendship row. Sending a request to someone who
//! already asked you accepts theirs instead of creating a second row.

use crate::{
    core::user::require_user,
    entities::{Friendship, User, friendship, user},
    errors::{Error, Result},
};
use sea_orm::{Condition, QueryOrder, Set, TransactionTrait, prelude::*};
use tracing::info;

const PENDING: &str = "pending";
const ACCEPTED: &str = "accepted";

async fn find_pair<C>(conn: &C, a: &str, b: &str) -> Result<Option<friendship::Model>>
where
    C: ConnectionTrait,
{
    Friendship::find()
        .filter(
            Condition::any()
                .add(
                    Condition::all()
                        .add(friendship::Column::RequesterId.eq(a))
                        .add(friendship::Column::AddresseeId.eq(b)),
                )
                .add(
                    Condition::all()
                        .add(friendship::Column::RequesterId.eq(b))
                        .add(friendship::Column::AddresseeId.eq(a)),
                ),
        )
        .one(conn)
        .await
        .map_err(Into::into)
}

async fn mark_accepted<C>(conn: &C, row: friendship::Model) -> Result<friendship::Model>
where
    C: ConnectionTrait,
{
    let mut active: friendship::ActiveModel = row.into();
    active.status = Set(ACCEPTED.to_string());
    active.update(conn).await.map_err(Into::into)
}

/// Sends a friend request from `from` to `to`.
///
/// Returns the existing row when the pair is already connected or the same request is
/// pending, and accepts the reverse request when `to` had already asked `from`.
pub async fn send_friend_request(
    db: &DatabaseConnection,
    from: &str,
    to: &str,
) -> Result<friendship::Model> {
    if from == to {
        return Err(Error::invalid("user_id", "you cannot befriend yourself"));
    }

    let txn = db.begin().await?;
    require_user(&txn, from).await?;
    require_user(&txn, to).await?;

    let row = match find_pair(&txn, from, to).await? {
        Some(existing) if existing.status == PENDING && existing.requester_id == to => {
            info!(from, to, "Reverse friend request accepted");
            mark_accepted(&txn, existing).await?
        }
        Some(existing) => existing,
        None => {
            let created = friendship::ActiveModel {
                requester_id: Set(from.to_string()),
                addressee_id: Set(to.to_string()),
                status: Set(PENDING.to_string()),
                created_at: Set(chrono::Utc::now()),
                ..Default::default()
            }
            .insert(&txn)
            .await?;
            info!(from, to, "Friend request sent");
            created
        }
    };

    txn.commit().await?;
    Ok(row)
}

/// Accepts a pending request `requester` sent to `user`.
pub async fn accept_friend_request(
    db: &DatabaseConnection,
    user: &str,
    requester: &str,
) -> Result<friendship::Model> {
    let row = Friendship::find()
        .filter(friendship::Column::RequesterId.eq(requester))
        .filter(friendship::Column::AddresseeId.eq(user))
        .one(db)
        .await?
        .ok_or_else(|| Error::FriendRequestNotFound {
            user_id: requester.to_string(),
        })?;

    if row.status == ACCEPTED {
        return Ok(row);
    }
    let accepted = mark_accepted(db, row).await?;
    info!(user, requester, "Friend request accepted");
    Ok(accepted)
}

async fn users_by_ids(db: &DatabaseConnection, ids: Vec<String>) -> Result<Vec<user::Model>> {
    if ids.is_empty() {
        return Ok(Vec::new());
    }
    User::find()
        .filter(user::Column::Id.is_in(ids))
        .order_by_asc(user::Column::Name)
        .order_by_asc(user::Column::Id)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Accepted friends of `user_id`, ordered by name.
pub async fn list_friends(db: &DatabaseConnection, user_id: &str) -> Result<Vec<user::Model>> {
    let rows = Friendship::find()
        .filter(friendship::Column::Status.eq(ACCEPTED))
        .filter(
            Condition::any()
                .add(friendship::Column::RequesterId.eq(user_id))
                .add(friendship::Column::AddresseeId.eq(user_id)),
        )
        .all(db)
        .await?;

    let friend_ids = rows
        .into_iter()
        .map(|row| {
            if row.requester_id == user_id {
                row.addressee_id
            } else {
                row.requester_id
            }
        })
        .collect();
    users_by_ids(db, friend_ids).await
}

/// Users waiting for `user_id` to accept their request.
pub async fn list_incoming_requests(
    db: &DatabaseConnection,
    user_id: &str,
) -> Result<Vec<user::Model>> {
    let requester_ids = Friendship::find()
        .filter(friendship::Column::Status.eq(PENDING))
        .filter(friendship::Column::AddresseeId.eq(user_id))
        .all(db)
        .await?
        .into_iter()
        .map(|row| row.requester_id)
        .collect();
    users_by_ids(db, requester_ids).await
}

/// Removes a friendship or request in either direction. Returns `false` if none existed.
pub async fn remove_friend(db: &DatabaseConnection, user_id: &str, other: &str) -> Result<bool> {
    let Some(row) = find_pair(db, user_id, other).await? else {
        return Ok(false);
    };
    row.delete(db).await?;
    info!(user_id, other, "Friendship removed");
    Ok(true)
}
