use super::{AppState, CurrentUser, Json, Path};
use crate::{
    core::user::{self, BankAccount, NewUser, ProfileUpdate, UserProfile},
    errors::{Error, Result},
};
use axum::{extract::State, http::StatusCode};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub(super) struct RegisterRequest {
    name: String,
    email: String,
    #[serde(default)]
    photo_url: Option<String>,
}

pub(super) async fn register(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
    Json(body): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<UserProfile>)> {
    let created = user::register_user(
        &state.database,
        NewUser {
            id: user_id,
            name: body.name,
            email: body.email,
            photo_url: body.photo_url,
        },
    )
    .await?;
    Ok((StatusCode::CREATED, Json(created.into())))
}

pub(super) async fn me(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
) -> Result<Json<UserProfile>> {
    profile(State(state), Path(user_id)).await
}

pub(super) async fn update(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
    Json(body): Json<ProfileUpdate>,
) -> Result<Json<UserProfile>> {
    let updated = user::update_profile(&state.database, &user_id, body).await?;
    Ok(Json(updated.into()))
}

pub(super) async fn set_bank(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
    Json(body): Json<BankAccount>,
) -> Result<Json<UserProfile>> {
    let updated = user::set_bank_account(&state.database, &user_id, body).await?;
    Ok(Json(updated.into()))
}

pub(super) async fn clear_bank(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
) -> Result<Json<UserProfile>> {
    let updated = user::clear_bank_account(&state.database, &user_id).await?;
    Ok(Json(updated.into()))
}

/// Any signed-in user may look up another user's profile, bank account included,
/// so they know where to send a repayment.
pub(super) async fn profile(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<Json<UserProfile>> {
    user::get_user(&state.database, &user_id)
        .await?
        .map(|u| Json(u.into()))
        .ok_or(Error::UserNotFound { id: user_id })
}
