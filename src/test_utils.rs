//! Shared test utilities for Datti.
//!
//! This module provides common helper functions for setting up test databases
//! and creating test entities with sensible defaults.

use crate::{
    cache::BalanceCache,
    config::database::{create_connection, create_tables},
    core::{
        group,
        lending::{self, LendingDetail, NewLending, SharePlan},
        money::ShareInput,
        repayment::{self, NewRepayment},
        user::{self, NewUser},
    },
    entities,
    errors::Result,
};
use sea_orm::DatabaseConnection;
use tracing_subscriber::EnvFilter;

/// A database with one group, its members, and a fresh cache.
pub struct GroupFixture {
    /// In-memory database
    pub db: DatabaseConnection,
    /// Cache shared by the helpers
    pub cache: BalanceCache,
    /// The group; its first member is the owner
    pub group: entities::group::Model,
}

/// Routes `tracing` output through the test harness.
pub fn init_test_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("trace")),
        )
        .with_test_writer()
        .try_init();
}

/// Creates an in-memory `SQLite` database with all tables initialized.
/// This is the standard setup for all integration tests.
pub async fn setup_test_db() -> Result<DatabaseConnection> {
    let db = create_connection("sqlite::memory:").await?;
    create_tables(&db).await?;
    Ok(db)
}

/// Registers a user whose name is its id.
///
/// # Defaults
/// * `email`: `"<id>@example.com"`
/// * `photo_url`: None
pub async fn create_test_user(db: &DatabaseConnection, id: &str) -> Result<entities::user::Model> {
    user::register_user(
        db,
        NewUser {
            id: id.to_string(),
            name: id.to_string(),
            email: format!("{id}@example.com"),
            photo_url: None,
        },
    )
    .await
}

/// Sets up a database with a "Test Group" containing `members`.
/// The first member creates the group and owns it; the rest are added by that owner.
pub async fn setup_group_with_members(members: &[&str]) -> Result<GroupFixture> {
    let db = setup_test_db().await?;
    for member in members {
        create_test_user(&db, member).await?;
    }

    let owner = members.first().copied().unwrap_or("owner");
    if members.is_empty() {
        create_test_user(&db, owner).await?;
    }
    let group = group::create_group(&db, "Test Group", owner).await?;
    for member in members.iter().skip(1) {
        group::add_member(&db, group.id, owner, member).await?;
    }

    Ok(GroupFixture {
        db,
        cache: BalanceCache::default(),
        group,
    })
}

/// Creates a lending paid and recorded by `payer` whose amount is the sum of `shares`.
pub async fn create_test_lending(
    db: &DatabaseConnection,
    cache: &BalanceCache,
    group_id: i64,
    payer: &str,
    shares: Vec<ShareInput>,
) -> Result<LendingDetail> {
    let amount = shares.iter().map(|s| s.amount).sum();
    lending::create_lending(
        db,
        cache,
        group_id,
        payer,
        NewLending {
            name: "Test lending".to_string(),
            payer_id: payer.to_string(),
            amount,
            occurred_at: None,
            shares: SharePlan::Explicit(shares),
        },
    )
    .await
}

/// Records a repayment from `payer` to `payee`, entered by the payer.
pub async fn create_test_repayment(
    db: &DatabaseConnection,
    cache: &BalanceCache,
    group_id: i64,
    payer: &str,
    payee: &str,
    amount: i64,
) -> Result<entities::repayment::Model> {
    repayment::record_repayment(
        db,
        cache,
        group_id,
        payer,
        NewRepayment {
            payer_id: payer.to_string(),
            payee_id: payee.to_string(),
            amount,
            paid_at: None,
        },
    )
    .await
}
