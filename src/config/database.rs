//! Database configuration module for Datti.
//!
//! This module handles `SQLite` database connection and table creation using `SeaORM`.
//! Tables are generated from the entity definitions with `Schema::create_table_from_entity`,
//! so the schema always matches the Rust structs without hand-written SQL. Creation is
//! `IF NOT EXISTS`, which makes start-up against an existing database file a no-op.

use crate::entities::{
    Friendship, Group, GroupMember, Lending, LendingShare, Repayment, User, friendship,
    group_member, lending_share,
};
use crate::errors::Result;
use sea_orm::{
    ConnectionTrait, Database, DatabaseConnection, EntityTrait, IdenStatic, Schema,
    sea_query::Index,
};
use tracing::debug;

/// Default location of the ledger database when neither config nor `DATABASE_URL` set one.
pub const DEFAULT_DATABASE_URL: &str = "sqlite://data/datti.sqlite?mode=rwc";

/// Creates the directory holding a file-backed `SQLite` database, if any.
///
/// In-memory and non-`SQLite` URLs are left alone.
pub fn ensure_sqlite_dir(database_url: &str) -> Result<()> {
    let Some(rest) = database_url.strip_prefix("sqlite://") else {
        return Ok(());
    };
    let path = rest.split('?').next().unwrap_or_default();
    if path.is_empty() || path.starts_with(':') {
        return Ok(());
    }
    if let Some(parent) = std::path::Path::new(path).parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
        debug!(?parent, "Ensured database directory");
    }
    Ok(())
}

/// Establishes a connection to the database at `database_url`.
pub async fn create_connection(database_url: &str) -> Result<DatabaseConnection> {
    debug!(database_url, "Connecting to database");
    Database::connect(database_url).await.map_err(Into::into)
}

async fn create_table<E>(db: &DatabaseConnection, schema: &Schema, entity: E) -> Result<()>
where
    E: EntityTrait,
{
    let builder = db.get_database_backend();
    let mut statement = schema.create_table_from_entity(entity);
    statement.if_not_exists();
    db.execute(builder.build(&statement)).await?;
    Ok(())
}

async fn create_unique_index<E, C>(
    db: &DatabaseConnection,
    name: &str,
    entity: E,
    columns: [C; 2],
) -> Result<()>
where
    E: EntityTrait,
    C: IdenStatic,
{
    let builder = db.get_database_backend();
    let mut statement = Index::create();
    statement.name(name).table(entity).unique().if_not_exists();
    for column in columns {
        statement.col(column);
    }
    db.execute(builder.build(&statement)).await?;
    Ok(())
}

/// Creates all ledger tables and their uniqueness constraints.
///
/// Tables referenced by foreign keys are created first: users and groups, then
/// memberships and friendships, then lendings, their shares, and repayments. A user
/// appears at most once per group and once per lending, and a directed friend request
/// exists at most once.
pub async fn create_tables(db: &DatabaseConnection) -> Result<()> {
    let schema = Schema::new(db.get_database_backend());

    create_table(db, &schema, User).await?;
    create_table(db, &schema, Group).await?;
    create_table(db, &schema, GroupMember).await?;
    create_table(db, &schema, Friendship).await?;
    create_table(db, &schema, Lending).await?;
    create_table(db, &schema, LendingShare).await?;
    create_table(db, &schema, Repayment).await?;

    create_unique_index(
        db,
        "idx_group_member_unique",
        GroupMember,
        [group_member::Column::GroupId, group_member::Column::UserId],
    )
    .await?;
    create_unique_index(
        db,
        "idx_friendship_unique",
        Friendship,
        [friendship::Column::RequesterId, friendship::Column::AddresseeId],
    )
    .await?;
    create_unique_index(
        db,
        "idx_lending_share_unique",
        LendingShare,
        [lending_share::Column::LendingId, lending_share::Column::UserId],
    )
    .await?;

    Ok(())
}
