use super::{AppState, CurrentUser, Json, Path};
use crate::{
    core::{
        repayment::{UserPayments, list_user_payments},
        view::{BalanceView, UserSummary, group_view, user_summary},
    },
    errors::Result,
};
use axum::extract::State;

pub(super) async fn group(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
    Path(group_id): Path<i64>,
) -> Result<Json<BalanceView>> {
    Ok(Json(
        group_view(&state.database, &state.cache, group_id, &user_id).await?,
    ))
}

pub(super) async fn summary(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
) -> Result<Json<UserSummary>> {
    Ok(Json(
        user_summary(&state.database, &state.cache, &user_id).await?,
    ))
}

pub(super) async fn payments(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
) -> Result<Json<UserPayments>> {
    Ok(Json(list_user_payments(&state.database, &user_id).await?))
}
