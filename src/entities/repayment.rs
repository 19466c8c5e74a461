//! Repayment entity - A direct payment from one member to another.
//!
//! Repayments are appended, never merged into a stored balance, so concurrent repayments
//! between the same pair simply add up.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Repayment database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "repayments")]
pub struct Model {
    /// Unique identifier for the repayment
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Group the repayment settles debt in
    pub group_id: i64,
    /// Member who handed over the money
    pub payer_id: String,
    /// Member who received it
    pub payee_id: String,
    /// Amount in yen, always positive
    pub amount: i64,
    /// When the money changed hands
    pub paid_at: DateTimeUtc,
    /// Member who recorded the repayment
    pub created_by: String,
    /// When the row was inserted
    pub created_at: DateTimeUtc,
}

/// Defines relationships between Repayment and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each repayment belongs to one group
    #[sea_orm(
        belongs_to = "super::group::Entity",
        from = "Column::GroupId",
        to = "super::group::Column::Id"
    )]
    Group,
}

impl Related<super::group::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Group.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
