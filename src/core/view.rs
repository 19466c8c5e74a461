//! Credit/debt views - What a single viewer is owed and owes.
//!
//! Views are projections of [`Balances`]: credits are counterparts with a positive
//! position (they owe the viewer), debts are counterparts with a negative one. Settled
//! pairs never appear. Both lists are sorted by amount descending, then by counterpart id.

use crate::{
    cache::BalanceCache,
    core::{
        balance::Balances,
        group::{list_groups_for_user, require_member},
        money::Amount,
    },
    errors::Result,
};
use sea_orm::DatabaseConnection;
use serde::Serialize;

/// An amount owed between the viewer and one counterpart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CounterpartAmount {
    /// The other user
    pub user_id: String,
    /// Always positive
    pub amount: Amount,
}

/// A viewer's credits and debts within one balance matrix.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BalanceView {
    /// Counterparts who owe the viewer
    pub credits: Vec<CounterpartAmount>,
    /// Counterparts the viewer owes
    pub debts: Vec<CounterpartAmount>,
}

impl BalanceView {
    /// Sum of all credits.
    #[must_use]
    pub fn total_credit(&self) -> Amount {
        self.credits.iter().map(|c| c.amount).sum()
    }

    /// Sum of all debts.
    #[must_use]
    pub fn total_debt(&self) -> Amount {
        self.debts.iter().map(|d| d.amount).sum()
    }

    /// Whether the viewer is fully settled.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.credits.is_empty() && self.debts.is_empty()
    }
}

fn sort_for_display(entries: &mut [CounterpartAmount]) {
    entries.sort_by(|a, b| b.amount.cmp(&a.amount).then_with(|| a.user_id.cmp(&b.user_id)));
}

/// Projects the matrix onto `viewer`.
#[must_use]
pub fn build_view(balances: &Balances, viewer: &str) -> BalanceView {
    let mut view = BalanceView::default();
    // `net(viewer, other)` is what the viewer owes; flip it to the viewer's position.
    for (other, owed_by_viewer) in balances.counterparts(viewer) {
        let position = -owed_by_viewer;
        let entry = CounterpartAmount {
            user_id: other.to_string(),
            amount: position.abs(),
        };
        match position.signum() {
            1 => view.credits.push(entry),
            -1 => view.debts.push(entry),
            _ => {}
        }
    }
    sort_for_display(&mut view.credits);
    sort_for_display(&mut view.debts);
    view
}

/// The caller's view of one group's balances. Requires current membership.
pub async fn group_view(
    db: &DatabaseConnection,
    cache: &BalanceCache,
    group_id: i64,
    viewer: &str,
) -> Result<BalanceView> {
    crate::core::group::ensure_group_exists(db, group_id).await?;
    require_member(db, group_id, viewer).await?;
    let balances = cache.get_or_compute(db, group_id).await?;
    Ok(build_view(&balances, viewer))
}

/// One group's contribution to a [`UserSummary`].
#[derive(Debug, Clone, Serialize)]
pub struct GroupBalanceView {
    /// Group id
    pub group_id: i64,
    /// Group name at the time of the read
    pub group_name: String,
    /// Viewer's credits and debts in that group
    #[serde(flatten)]
    pub view: BalanceView,
}

/// A user's unsettled balances across every group they belong to.
#[derive(Debug, Clone, Default, Serialize)]
pub struct UserSummary {
    /// Groups with at least one open balance, in group-name order
    pub groups: Vec<GroupBalanceView>,
    /// Sum of credits over all groups
    pub total_credit: Amount,
    /// Sum of debts over all groups
    pub total_debt: Amount,
}

/// Builds the cross-group summary for `user_id`.
pub async fn user_summary(
    db: &DatabaseConnection,
    cache: &BalanceCache,
    user_id: &str,
) -> Result<UserSummary> {
    let mut summary = UserSummary::default();
    for group in list_groups_for_user(db, user_id).await? {
        let balances = cache.get_or_compute(db, group.id).await?;
        let view = build_view(&balances, user_id);
        if view.is_empty() {
            continue;
        }
        summary.total_credit += view.total_credit();
        summary.total_debt += view.total_debt();
        summary.groups.push(GroupBalanceView {
            group_id: group.id,
            group_name: group.name,
            view,
        });
    }
    Ok(summary)
}
