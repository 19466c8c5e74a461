//! HTTP surface - axum routes over the core operations.
//!
//! Handlers stay thin: resolve the caller through [`CurrentUser`], translate the JSON
//! body into core types, call one core function, and serialize its result. Errors are
//! rendered by the [`IntoResponse`](axum::response::IntoResponse) impl in [`error`].

use crate::{
    auth::IdentityProvider,
    cache::BalanceCache,
    errors::{Error, Result},
};
use axum::{
    Router,
    extract::{FromRequest, FromRequestParts},
    http::{Method, request::Parts},
    response::{IntoResponse, Response},
    routing::{get, post, put},
};
use sea_orm::DatabaseConnection;
use serde::Serialize;
use std::sync::Arc;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

mod balances;
pub mod error;
mod friends;
mod groups;
mod lendings;
mod repayments;
mod users;


/// Shared handler state. Cheap to clone.
#[derive(Clone)]
pub struct AppState {
    /// Connection pool
    pub database: DatabaseConnection,
    /// Computed balances, shared by every request
    pub cache: BalanceCache,
    /// Resolves the caller of each request
    pub identity: Arc<dyn IdentityProvider>,
}

/// JSON body extractor and response. Malformed bodies are rejected as [`Error`], so
/// they get the same JSON error shape as every other failure.
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(Error))]
pub struct Json<T>(pub T);

impl<T: Serialize> IntoResponse for Json<T> {
    fn into_response(self) -> Response {
        axum::Json(self.0).into_response()
    }
}

/// Path parameter extractor with [`Error`] rejections.
#[derive(Debug, FromRequestParts)]
#[from_request(via(axum::extract::Path), rejection(Error))]
pub struct Path<T>(pub T);

/// The authenticated caller's user id.
#[derive(Debug, Clone)]
pub struct CurrentUser(pub String);

#[axum::async_trait]
impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = Error;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self> {
        state.identity.current_user_id(&parts.headers).map(Self)
    }
}

/// Body returned by every DELETE route.
#[derive(Debug, Serialize)]
pub struct Deleted {
    /// False when there was nothing to delete
    pub deleted: bool,
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// Builds the full router with CORS and request tracing.
pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health_check))
        .route(
            "/users/me",
            get(users::me).post(users::register).put(users::update),
        )
        .route(
            "/users/me/bank",
            put(users::set_bank).delete(users::clear_bank),
        )
        .route("/users/:user_id", get(users::profile))
        .route("/friends", get(friends::list).post(friends::request))
        .route("/friends/requests", get(friends::incoming))
        .route("/friends/:user_id/accept", post(friends::accept))
        .route("/friends/:user_id", axum::routing::delete(friends::remove))
        .route("/groups", get(groups::list).post(groups::create))
        .route("/groups/:group_id", get(groups::detail).put(groups::rename))
        .route("/groups/:group_id/members", post(groups::add_member))
        .route(
            "/groups/:group_id/members/:user_id",
            axum::routing::delete(groups::remove_member),
        )
        .route(
            "/groups/:group_id/lendings",
            get(lendings::list).post(lendings::create),
        )
        .route(
            "/groups/:group_id/lendings/:lending_id",
            get(lendings::fetch)
                .put(lendings::replace)
                .delete(lendings::remove),
        )
        .route(
            "/groups/:group_id/repayments",
            get(repayments::list).post(repayments::record),
        )
        .route(
            "/groups/:group_id/repayments/:repayment_id",
            get(repayments::fetch)
                .put(repayments::update)
                .delete(repayments::remove),
        )
        .route("/groups/:group_id/balances", get(balances::group))
        .route("/balances", get(balances::summary))
        .route("/payments", get(balances::payments))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
