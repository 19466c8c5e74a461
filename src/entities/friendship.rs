//! Friendship entity - A friend request, pending or accepted.
//!
//! At most one row exists per unordered pair of users.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Friendship database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "friendships")]
pub struct Model {
    /// Unique identifier
    #[sea_orm(primary_key)]
    pub id: i64,
    /// User who sent the request
    pub requester_id: String,
    /// User who received the request
    pub addressee_id: String,
    /// `"pending"` or `"accepted"`
    pub status: String,
    /// When the request was sent
    pub created_at: DateTimeUtc,
}

/// `Friendship` rows are looked up by user id only
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
