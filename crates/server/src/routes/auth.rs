use axum::{
    Extension, Json, Router,
    extract::State,
    response::Json as ResponseJson,
    routing::{get, post},
};
use db::models::user::{CreateUser, User};
use serde::{Deserialize, Serialize};
use utils::response::ApiResponse;
use uuid::Uuid;

use crate::{AppState, error::ApiError, http::auth::AuthUser};

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub user_name: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub access_token: String,
    pub user: User,
}

pub async fn register(
    State(state): State<AppState>,
    Json(payload): Json<CreateUser>,
) -> Result<ResponseJson<ApiResponse<User>>, ApiError> {
    let user = User::create(&state.db().pool, &payload, Uuid::new_v4()).await?;
    tracing::info!("Registered user '{}' ({})", user.user_name, user.id);
    Ok(ResponseJson(ApiResponse::success(user)))
}

pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<ResponseJson<ApiResponse<LoginResponse>>, ApiError> {
    let user = User::authenticate(&state.db().pool, &payload.user_name, &payload.password).await?;

    let access_token = state
        .signer()
        .issue(user.id, &user.user_name)
        .map_err(|err| ApiError::Internal(format!("Failed to issue token: {err}")))?;

    Ok(ResponseJson(ApiResponse::success(LoginResponse {
        access_token,
        user,
    })))
}

pub async fn profile(
    Extension(auth): Extension<AuthUser>,
    State(state): State<AppState>,
) -> Result<ResponseJson<ApiResponse<User>>, ApiError> {
    let user = User::find_by_id(&state.db().pool, auth.id)
        .await?
        .ok_or(ApiError::NotFound("User not found".to_string()))?;
    Ok(ResponseJson(ApiResponse::success(user)))
}

/// Routes reachable without a bearer token.
pub fn public_router() -> Router<AppState> {
    Router::new()
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
}

pub fn router() -> Router<AppState> {
    Router::new().route("/auth/profile", get(profile))
}
