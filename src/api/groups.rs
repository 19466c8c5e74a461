use super::{AppState, CurrentUser, Deleted, Json, Path};
use crate::{
    core::group::{self, GroupDetail},
    entities::{group as group_entity, group_member},
    errors::Result,
};
use axum::{extract::State, http::StatusCode};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub(super) struct GroupRequest {
    name: String,
}

#[derive(Debug, Deserialize)]
pub(super) struct MemberRequest {
    user_id: String,
}

pub(super) async fn list(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
) -> Result<Json<Vec<group_entity::Model>>> {
    Ok(Json(
        group::list_groups_for_user(&state.database, &user_id).await?,
    ))
}

pub(super) async fn create(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
    Json(body): Json<GroupRequest>,
) -> Result<(StatusCode, Json<group_entity::Model>)> {
    let created = group::create_group(&state.database, &body.name, &user_id).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

pub(super) async fn detail(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
    Path(group_id): Path<i64>,
) -> Result<Json<GroupDetail>> {
    group::ensure_group_exists(&state.database, group_id).await?;
    group::require_member(&state.database, group_id, &user_id).await?;
    Ok(Json(
        group::get_group_detail(&state.database, group_id).await?,
    ))
}

pub(super) async fn rename(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
    Path(group_id): Path<i64>,
    Json(body): Json<GroupRequest>,
) -> Result<Json<group_entity::Model>> {
    let renamed = group::rename_group(&state.database, group_id, &user_id, &body.name).await?;
    Ok(Json(renamed))
}

pub(super) async fn add_member(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
    Path(group_id): Path<i64>,
    Json(body): Json<MemberRequest>,
) -> Result<Json<group_member::Model>> {
    let member = group::add_member(&state.database, group_id, &user_id, &body.user_id).await?;
    Ok(Json(member))
}

pub(super) async fn remove_member(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
    Path((group_id, member_id)): Path<(i64, String)>,
) -> Result<Json<Deleted>> {
    let deleted = group::remove_member(&state.database, group_id, &user_id, &member_id).await?;
    Ok(Json(Deleted { deleted }))
}
