use super::{AppState, CurrentUser, Deleted, Json, Path};
use crate::{
    core::{
        group,
        lending::{self, LendingDetail, NewLending, SharePlan},
        money::{Amount, ShareInput},
    },
    errors::{Error, Result},
};
use axum::{extract::State, http::StatusCode};
use sea_orm::prelude::DateTimeUtc;
use serde::Deserialize;

/// Lending body for both create and replace.
///
/// Exactly one of `shares` (explicit amounts) or `participants` (split evenly) must be
/// present. The payer defaults to the caller.
#[derive(Debug, Deserialize)]
pub(super) struct LendingRequest {
    name: String,
    #[serde(default)]
    payer_id: Option<String>,
    amount: Amount,
    #[serde(default)]
    occurred_at: Option<DateTimeUtc>,
    #[serde(default)]
    shares: Option<Vec<ShareInput>>,
    #[serde(default)]
    participants: Option<Vec<String>>,
}

impl LendingRequest {
    fn into_new_lending(self, caller: &str) -> Result<NewLending> {
        let shares = match (self.shares, self.participants) {
            (Some(shares), None) => SharePlan::Explicit(shares),
            (None, Some(participants)) => SharePlan::Even(participants),
            _ => {
                return Err(Error::invalid(
                    "shares",
                    "provide either shares or participants",
                ));
            }
        };
        Ok(NewLending {
            name: self.name,
            payer_id: self.payer_id.unwrap_or_else(|| caller.to_string()),
            amount: self.amount,
            occurred_at: self.occurred_at,
            shares,
        })
    }
}

/// Loads a lending only if it belongs to `group_id`.
async fn find_in_group(
    state: &AppState,
    group_id: i64,
    lending_id: i64,
) -> Result<Option<LendingDetail>> {
    Ok(lending::get_lending(&state.database, lending_id)
        .await?
        .filter(|detail| detail.lending.group_id == group_id))
}

pub(super) async fn list(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
    Path(group_id): Path<i64>,
) -> Result<Json<Vec<LendingDetail>>> {
    group::ensure_group_exists(&state.database, group_id).await?;
    group::require_member(&state.database, group_id, &user_id).await?;
    Ok(Json(lending::list_lendings(&state.database, group_id).await?))
}

pub(super) async fn create(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
    Path(group_id): Path<i64>,
    Json(body): Json<LendingRequest>,
) -> Result<(StatusCode, Json<LendingDetail>)> {
    let new = body.into_new_lending(&user_id)?;
    let created =
        lending::create_lending(&state.database, &state.cache, group_id, &user_id, new).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

pub(super) async fn fetch(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
    Path((group_id, lending_id)): Path<(i64, i64)>,
) -> Result<Json<LendingDetail>> {
    group::ensure_group_exists(&state.database, group_id).await?;
    group::require_member(&state.database, group_id, &user_id).await?;
    find_in_group(&state, group_id, lending_id)
        .await?
        .map(Json)
        .ok_or(Error::LendingNotFound { id: lending_id })
}

pub(super) async fn replace(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
    Path((group_id, lending_id)): Path<(i64, i64)>,
    Json(body): Json<LendingRequest>,
) -> Result<Json<LendingDetail>> {
    let replacement = body.into_new_lending(&user_id)?;
    if find_in_group(&state, group_id, lending_id).await?.is_none() {
        return Err(Error::LendingNotFound { id: lending_id });
    }
    let updated = lending::update_lending(
        &state.database,
        &state.cache,
        lending_id,
        &user_id,
        replacement,
    )
    .await?;
    Ok(Json(updated))
}

pub(super) async fn remove(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
    Path((group_id, lending_id)): Path<(i64, i64)>,
) -> Result<Json<Deleted>> {
    if find_in_group(&state, group_id, lending_id).await?.is_none() {
        return Ok(Json(Deleted { deleted: false }));
    }
    let deleted =
        lending::delete_lending(&state.database, &state.cache, lending_id, &user_id).await?;
    Ok(Json(Deleted { deleted }))
}
