//! Lending share entity - The part of a lending one user is responsible for.
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Lending share database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "lending_shares")]
pub struct Model {
    /// Unique identifier
    #[sea_orm(primary_key)]
    #[serde(skip)]
    pub id: i64,
    /// Lending this share belongs to
    #[serde(skip)]
    pub lending_id: i64,
    /// User responsible for the share (may be the payer)
    pub user_id: String,
    /// Share amount in yen, never negative
    pub amount: i64,
}

/// Defines relationships between `LendingShare` and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each share belongs to one lending
    #[sea_orm(
        belongs_to = "super::lending::Entity",
        from = "Column::LendingId",
        to = "super::lending::Column::Id"
    )]
    Lending,
}

impl Related<super::lending::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Lending.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
