//! Lending entity - An expense one member paid on behalf of others.
//!
//! The split itself lives in `lending_share`; the shares of a lending always add up to
//! its `amount`. That invariant is enforced when the lending is written, not here.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Lending database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "lendings")]
pub struct Model {
    /// Unique identifier for the lending
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Group the lending is recorded in
    pub group_id: i64,
    /// Short description (e.g. "Dinner at Ichiran")
    pub name: String,
    /// Member who paid
    pub payer_id: String,
    /// Total amount paid, in yen
    pub amount: i64,
    /// When the expense happened
    pub occurred_at: DateTimeUtc,
    /// Member who recorded the lending
    pub created_by: String,
    /// When the row was inserted
    pub created_at: DateTimeUtc,
    /// When the lending was last replaced
    pub updated_at: DateTimeUtc,
}

/// Defines relationships between Lending and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each lending belongs to one group
    #[sea_orm(
        belongs_to = "super::group::Entity",
        from = "Column::GroupId",
        to = "super::group::Column::Id"
    )]
    Group,
    /// One lending has many shares
    #[sea_orm(has_many = "super::lending_share::Entity")]
    Shares,
}

impl Related<super::group::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Group.def()
    }
}

impl Related<super::lending_share::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Shares.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
