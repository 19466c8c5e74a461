//! User entity - A person who can join groups, lend and repay.
//!
//! The primary key is the subject issued by the external identity provider, so it is a
//! string rather than an auto-incremented integer. Users are never deleted because
//! historical lendings and repayments keep referencing them.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// User database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "users")]
pub struct Model {
    /// Identity provider subject (e.g. a JWT `sub` claim)
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    /// Display name
    pub name: String,
    /// Contact email address
    pub email: String,
    /// Optional avatar URL
    pub photo_url: Option<String>,
    /// Four digit bank code, set together with the branch and account codes
    pub bank_code: Option<String>,
    /// Three digit branch code
    pub branch_code: Option<String>,
    /// Seven digit account number
    pub account_code: Option<String>,
    /// When the user signed up
    pub created_at: DateTimeUtc,
    /// When the profile was last modified
    pub updated_at: DateTimeUtc,
}

/// Defines relationships between User and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// One user has many group memberships
    #[sea_orm(has_many = "super::group_member::Entity")]
    Memberships,
}

impl Related<super::group_member::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Memberships.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
