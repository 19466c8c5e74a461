use super::{AppState, CurrentUser, Deleted, Json, Path};
use crate::{
    core::{friend, user::UserProfile},
    entities::friendship,
    errors::Result,
};
use axum::extract::State;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub(super) struct FriendRequest {
    user_id: String,
}

fn profiles(users: Vec<crate::entities::user::Model>) -> Json<Vec<UserProfile>> {
    Json(users.into_iter().map(UserProfile::from).collect())
}

pub(super) async fn list(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
) -> Result<Json<Vec<UserProfile>>> {
    Ok(profiles(friend::list_friends(&state.database, &user_id).await?))
}

pub(super) async fn incoming(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
) -> Result<Json<Vec<UserProfile>>> {
    Ok(profiles(
        friend::list_incoming_requests(&state.database, &user_id).await?,
    ))
}

pub(super) async fn request(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
    Json(body): Json<FriendRequest>,
) -> Result<Json<friendship::Model>> {
    let link = friend::send_friend_request(&state.database, &user_id, &body.user_id).await?;
    Ok(Json(link))
}

pub(super) async fn accept(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
    Path(requester): Path<String>,
) -> Result<Json<friendship::Model>> {
    let link = friend::accept_friend_request(&state.database, &user_id, &requester).await?;
    Ok(Json(link))
}

pub(super) async fn remove(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
    Path(other): Path<String>,
) -> Result<Json<Deleted>> {
    let deleted = friend::remove_friend(&state.database, &user_id, &other).await?;
    Ok(Json(Deleted { deleted }))
}
