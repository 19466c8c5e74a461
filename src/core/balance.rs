//! Balance aggregation - Folds a group's lendings and repayments into net balances.
//!
//! Balances are never stored. They are recomputed from the entry tables every time (or
//! served from [`crate::cache::BalanceCache`], which is invalidated on every write), so
//! deleting or replacing an entry can never leave residue behind.
//!
//! `net(a, b)` is what `a` owes `b`. The matrix is kept antisymmetric
//! (`net(a, b) == -net(b, a)`) and sparse: settled pairs are removed.

use crate::{
    core::{lending::LendingDetail, money::Amount},
    entities::{Group, Repayment, repayment},
    errors::{Error, Result},
};
use sea_orm::{QueryOrder, TransactionTrait, prelude::*};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;

/// Net balance matrix for one group, keyed by debtor then creditor.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Balances {
    matrix: BTreeMap<String, BTreeMap<String, Amount>>,
}

impl Balances {
    /// An empty, fully settled matrix.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Folds validated entries into a matrix. Total: never fails.
    #[must_use]
    pub fn from_entries(lendings: &[LendingDetail], repayments: &[repayment::Model]) -> Self {
        let mut balances = Self::new();
        for lending in lendings {
            balances.apply_lending(lending);
        }
        for repayment in repayments {
            balances.apply_repayment(repayment);
        }
        balances
    }

    /// Every beneficiary other than the payer now owes the payer their share.
    pub fn apply_lending(&mut self, lending: &LendingDetail) {
        let payer = lending.lending.payer_id.as_str();
        for share in &lending.shares {
            if share.user_id != payer {
                self.add_debt(&share.user_id, payer, share.amount);
            }
        }
    }

    /// A repayment reduces what the payer owes the payee (and can overshoot).
    pub fn apply_repayment(&mut self, repayment: &repayment::Model) {
        self.add_debt(&repayment.payee_id, &repayment.payer_id, repayment.amount);
    }

    /// Records that `debtor` owes `creditor` an additional `amount`.
    pub fn add_debt(&mut self, debtor: &str, creditor: &str, amount: Amount) {
        if debtor == creditor || amount == 0 {
            return;
        }
        self.adjust(debtor, creditor, amount);
        self.adjust(creditor, debtor, -amount);
    }

    fn adjust(&mut self, from: &str, to: &str, delta: Amount) {
        let row = self.matrix.entry(from.to_string()).or_default();
        let cell = row.entry(to.to_string()).or_insert(0);
        *cell += delta;
        if *cell == 0 {
            row.remove(to);
            if row.is_empty() {
                self.matrix.remove(from);
            }
        }
    }

    /// What `a` owes `b`; negative when `b` owes `a`.
    #[must_use]
    pub fn net(&self, a: &str, b: &str) -> Amount {
        self.matrix
            .get(a)
            .and_then(|row| row.get(b))
            .copied()
            .unwrap_or(0)
    }

    /// Viewer-signed balance: positive when `other` owes `viewer`.
    #[must_use]
    pub fn position(&self, viewer: &str, other: &str) -> Amount {
        self.net(other, viewer)
    }

    /// Non-zero `net(user, counterpart)` cells for one user.
    pub fn counterparts<'a>(&'a self, user: &str) -> impl Iterator<Item = (&'a str, Amount)> + use<'a> {
        self.matrix
            .get(user)
            .into_iter()
            .flat_map(|row| row.iter().map(|(id, amount)| (id.as_str(), *amount)))
    }

    /// Users with at least one unsettled balance.
    #[must_use]
    pub fn users(&self) -> BTreeSet<&str> {
        self.matrix.keys().map(String::as_str).collect()
    }

    /// Whether every pair in the group is settled.
    #[must_use]
    pub fn is_settled(&self) -> bool {
        self.matrix.is_empty()
    }

    /// Full matrix, debtor then creditor.
    #[must_use]
    pub const fn as_map(&self) -> &BTreeMap<String, BTreeMap<String, Amount>> {
        &self.matrix
    }
}

/// Loads every entry of a group in a single read transaction and aggregates them.
///
/// # Errors
/// Returns `GroupNotFound` for an unknown group, or a database error.
pub async fn compute_balances(db: &DatabaseConnection, group_id: i64) -> Result<Balances> {
    let txn = db.begin().await?;
    let balances = load_balances(&txn, group_id).await?;
    txn.commit().await?;
    Ok(balances)
}

/// Aggregates a group's entries on `conn`; callers inside a transaction pass it here.
pub async fn load_balances<C>(conn: &C, group_id: i64) -> Result<Balances>
where
    C: ConnectionTrait,
{
    Group::find_by_id(group_id)
        .one(conn)
        .await?
        .ok_or(Error::GroupNotFound { id: group_id })?;

    let lendings = crate::core::lending::load_group_lendings(conn, group_id).await?;
    let repayments = Repayment::find()
        .filter(repayment::Column::GroupId.eq(group_id))
        .order_by_asc(repayment::Column::Id)
        .all(conn)
        .await?;

    let balances = Balances::from_entries(&lendings, &repayments);
    debug!(
        group_id,
        lendings = lendings.len(),
        repayments = repayments.len(),
        open_pairs = balances.users().len(),
        "Computed group balances"
    );
    Ok(balances)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::core::lending::{self, NewLending, SharePlan};
    use crate::core::money::ShareInput;
    use crate::core::repayment::{self, NewRepayment};
    use crate::entities::{lending as lending_entity, lending_share, repayment as repayment_entity};
    use crate::test_utils::*;
    use chrono::Utc;

    fn detail(id: i64, payer: &str, shares: &[(&str, Amount)]) -> LendingDetail {
        let now = Utc::now();
        LendingDetail {
            lending: lending_entity::Model {
                id,
                group_id: 1,
                name: format!("lending {id}"),
                payer_id: payer.to_string(),
                amount: shares.iter().map(|(_, a)| a).sum(),
                occurred_at: now,
                created_by: payer.to_string(),
                created_at: now,
                updated_at: now,
            },
            shares: shares
                .iter()
                .map(|(user, amount)| lending_share::Model {
                    id: 0,
                    lending_id: id,
                    user_id: (*user).to_string(),
                    amount: *amount,
                })
                .collect(),
        }
    }

    fn repaid(id: i64, payer: &str, payee: &str, amount: Amount) -> repayment_entity::Model {
        let now = Utc::now();
        repayment_entity::Model {
            id,
            group_id: 1,
            payer_id: payer.to_string(),
            payee_id: payee.to_string(),
            amount,
            paid_at: now,
            created_by: payer.to_string(),
            created_at: now,
        }
    }

    fn sample_entries() -> (Vec<LendingDetail>, Vec<repayment_entity::Model>) {
        let lendings = vec![
            detail(1, "a", &[("a", 1000), ("b", 1000), ("c", 1000)]),
            detail(2, "b", &[("a", 700), ("d", 1300)]),
            detail(3, "c", &[("b", 0), ("c", 250), ("d", 4750)]),
            detail(4, "d", &[("a", 333), ("b", 333), ("c", 334)]),
        ];
        let repayments = vec![
            repaid(1, "b", "a", 400),
            repaid(2, "d", "c", 5000),
            repaid(3, "a", "d", 50),
        ];
        (lendings, repayments)
    }

    const USERS: [&str; 4] = ["a", "b", "c", "d"];

    #[test]
    fn test_even_split_scenario() {
        let lendings = vec![detail(1, "a", &[("a", 1000), ("b", 1000), ("c", 1000)])];
        let mut balances = Balances::from_entries(&lendings, &[]);

        assert_eq!(balances.net("b", "a"), 1000);
        assert_eq!(balances.net("c", "a"), 1000);
        assert_eq!(balances.net("a", "b"), -1000);
        assert_eq!(balances.net("b", "c"), 0);

        balances.apply_repayment(&repaid(1, "b", "a", 1000));
        assert_eq!(balances.net("b", "a"), 0);
        assert_eq!(balances.counterparts("b").count(), 0);
        assert_eq!(balances.position("a", "c"), 1000);
    }

    #[test]
    fn test_overpayment_reverses_direction() {
        let lendings = vec![detail(1, "a", &[("a", 500), ("b", 500)])];
        let repayments = vec![repaid(1, "b", "a", 800)];
        let balances = Balances::from_entries(&lendings, &repayments);

        assert_eq!(balances.net("b", "a"), -300);
        assert_eq!(balances.net("a", "b"), 300);
        assert_eq!(balances.position("a", "b"), -300);
    }

    #[test]
    fn test_antisymmetry_holds_for_all_pairs() {
        let (lendings, repayments) = sample_entries();
        let balances = Balances::from_entries(&lendings, &repayments);

        for a in USERS {
            for b in USERS {
                assert_eq!(balances.net(a, b), -balances.net(b, a), "pair ({a}, {b})");
            }
            assert_eq!(balances.net(a, a), 0);
        }
    }

    #[test]
    fn test_conservation_per_user() {
        let (lendings, repayments) = sample_entries();
        let balances = Balances::from_entries(&lendings, &repayments);

        for viewer in USERS {
            let total_position: Amount = USERS
                .iter()
                .filter(|u| **u != viewer)
                .map(|u| balances.position(viewer, u))
                .sum();

            let lent: Amount = lendings
                .iter()
                .filter(|l| l.lending.payer_id == viewer)
                .flat_map(|l| l.shares.iter())
                .filter(|s| s.user_id != viewer)
                .map(|s| s.amount)
                .sum();
            let borrowed: Amount = lendings
                .iter()
                .filter(|l| l.lending.payer_id != viewer)
                .flat_map(|l| l.shares.iter())
                .filter(|s| s.user_id == viewer)
                .map(|s| s.amount)
                .sum();
            let sent: Amount = repayments
                .iter()
                .filter(|r| r.payer_id == viewer)
                .map(|r| r.amount)
                .sum();
            let received: Amount = repayments
                .iter()
                .filter(|r| r.payee_id == viewer)
                .map(|r| r.amount)
                .sum();

            assert_eq!(
                total_position,
                lent - borrowed + sent - received,
                "conservation for {viewer}"
            );
        }
    }

    #[test]
    fn test_recompute_is_idempotent() {
        let (lendings, repayments) = sample_entries();
        let first = Balances::from_entries(&lendings, &repayments);
        let second = Balances::from_entries(&lendings, &repayments);
        assert_eq!(first, second);
    }

    #[test]
    fn test_removing_a_lending_removes_its_contribution() {
        let (mut lendings, repayments) = sample_entries();
        let with_all = Balances::from_entries(&lendings, &repayments);
        let removed = lendings.remove(1);
        let without = Balances::from_entries(&lendings, &repayments);

        let mut rebuilt = without.clone();
        rebuilt.apply_lending(&removed);
        assert_eq!(rebuilt, with_all);
        assert_ne!(without, with_all);
    }

    #[test]
    fn test_settled_pairs_are_pruned() {
        let lendings = vec![detail(1, "a", &[("b", 200)])];
        let repayments = vec![repaid(1, "b", "a", 200)];
        let balances = Balances::from_entries(&lendings, &repayments);
        assert!(balances.is_settled());
        assert!(balances.as_map().is_empty());
    }

    #[tokio::test]
    async fn test_compute_balances_unknown_group() -> Result<()> {
        let db = setup_test_db().await?;
        let result = compute_balances(&db, 42).await;
        assert!(matches!(result, Err(Error::GroupNotFound { id: 42 })));
        Ok(())
    }

    #[tokio::test]
    async fn test_compute_balances_integration() -> Result<()> {
        let fixture = setup_group_with_members(&["alice", "bob", "carol"]).await?;
        let db = &fixture.db;
        let cache = &fixture.cache;

        lending::create_lending(
            db,
            cache,
            fixture.group.id,
            "alice",
            NewLending {
                name: "Dinner".to_string(),
                payer_id: "alice".to_string(),
                amount: 3000,
                occurred_at: None,
                shares: SharePlan::Even(vec![
                    "alice".to_string(),
                    "bob".to_string(),
                    "carol".to_string(),
                ]),
            },
        )
        .await?;

        let balances = compute_balances(db, fixture.group.id).await?;
        assert_eq!(balances.net("bob", "alice"), 1000);
        assert_eq!(balances.net("carol", "alice"), 1000);

        repayment::record_repayment(
            db,
            cache,
            fixture.group.id,
            "bob",
            NewRepayment {
                payer_id: "bob".to_string(),
                payee_id: "alice".to_string(),
                amount: 1000,
                paid_at: None,
            },
        )
        .await?;

        let balances = compute_balances(db, fixture.group.id).await?;
        assert_eq!(balances.net("bob", "alice"), 0);
        assert_eq!(balances.net("carol", "alice"), 1000);
        Ok(())
    }

    #[tokio::test]
    async fn test_deleted_lending_matches_recompute_without_it() -> Result<()> {
        let fixture = setup_group_with_members(&["alice", "bob"]).await?;
        let db = &fixture.db;
        let cache = &fixture.cache;

        let kept = create_test_lending(
            db,
            cache,
            fixture.group.id,
            "alice",
            vec![ShareInput::new("bob", 1200)],
        )
        .await?;
        let before = compute_balances(db, fixture.group.id).await?;

        let doomed = create_test_lending(
            db,
            cache,
            fixture.group.id,
            "bob",
            vec![ShareInput::new("alice", 500), ShareInput::new("bob", 500)],
        )
        .await?;
        assert_ne!(compute_balances(db, fixture.group.id).await?, before);

        assert!(lending::delete_lending(db, cache, doomed.lending.id, "bob").await?);
        let after = compute_balances(db, fixture.group.id).await?;

        assert_eq!(after, before);
        assert_eq!(after, Balances::from_entries(&[kept], &[]));
        Ok(())
    }
}
