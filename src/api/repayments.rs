use super::{AppState, CurrentUser, Deleted, Json, Path};
use crate::{
    core::{
        group,
        money::Amount,
        repayment::{self, NewRepayment, RepaymentUpdate},
    },
    entities::repayment as repayment_entity,
    errors::{Error, Result},
};
use axum::{extract::State, http::StatusCode};
use sea_orm::prelude::DateTimeUtc;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub(super) struct RepaymentRequest {
    /// Defaults to the caller
    #[serde(default)]
    payer_id: Option<String>,
    payee_id: String,
    amount: Amount,
    #[serde(default)]
    paid_at: Option<DateTimeUtc>,
}

#[derive(Debug, Deserialize)]
pub(super) struct RepaymentUpdateRequest {
    amount: Amount,
    #[serde(default)]
    paid_at: Option<DateTimeUtc>,
}

async fn find_in_group(
    state: &AppState,
    group_id: i64,
    repayment_id: i64,
) -> Result<Option<repayment_entity::Model>> {
    Ok(repayment::get_repayment(&state.database, repayment_id)
        .await?
        .filter(|r| r.group_id == group_id))
}

pub(super) async fn list(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
    Path(group_id): Path<i64>,
) -> Result<Json<Vec<repayment_entity::Model>>> {
    group::ensure_group_exists(&state.database, group_id).await?;
    group::require_member(&state.database, group_id, &user_id).await?;
    Ok(Json(
        repayment::list_repayments(&state.database, group_id).await?,
    ))
}

pub(super) async fn record(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
    Path(group_id): Path<i64>,
    Json(body): Json<RepaymentRequest>,
) -> Result<(StatusCode, Json<repayment_entity::Model>)> {
    let new = NewRepayment {
        payer_id: body.payer_id.unwrap_or_else(|| user_id.clone()),
        payee_id: body.payee_id,
        amount: body.amount,
        paid_at: body.paid_at,
    };
    let recorded =
        repayment::record_repayment(&state.database, &state.cache, group_id, &user_id, new)
            .await?;
    Ok((StatusCode::CREATED, Json(recorded)))
}

pub(super) async fn fetch(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
    Path((group_id, repayment_id)): Path<(i64, i64)>,
) -> Result<Json<repayment_entity::Model>> {
    group::ensure_group_exists(&state.database, group_id).await?;
    group::require_member(&state.database, group_id, &user_id).await?;
    find_in_group(&state, group_id, repayment_id)
        .await?
        .map(Json)
        .ok_or(Error::RepaymentNotFound { id: repayment_id })
}

pub(super) async fn update(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
    Path((group_id, repayment_id)): Path<(i64, i64)>,
    Json(body): Json<RepaymentUpdateRequest>,
) -> Result<Json<repayment_entity::Model>> {
    if find_in_group(&state, group_id, repayment_id).await?.is_none() {
        return Err(Error::RepaymentNotFound { id: repayment_id });
    }
    let updated = repayment::update_repayment(
        &state.database,
        &state.cache,
        repayment_id,
        &user_id,
        RepaymentUpdate {
            amount: body.amount,
            paid_at: body.paid_at,
        },
    )
    .await?;
    Ok(Json(updated))
}

pub(super) async fn remove(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
    Path((group_id, repayment_id)): Path<(i64, i64)>,
) -> Result<Json<Deleted>> {
    if find_in_group(&state, group_id, repayment_id).await?.is_none() {
        return Ok(Json(Deleted { deleted: false }));
    }
    let deleted =
        repayment::delete_repayment(&state.database, &state.cache, repayment_id, &user_id)
            .await?;
    Ok(Json(Deleted { deleted }))
}
