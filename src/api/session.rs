use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::api::error::ApiError;
use crate::api::AppState;
use crate::types::{AuthInfo, Authorization, Credentials, Session, SessionInfo};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct AuthInfoReq {
    pub username: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct AuthReq {
    pub username: String,
    #[serde(flatten)]
    pub credentials: Credentials,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct RefreshReq {
    #[serde(rename = "UID")]
    pub uid: String,
    pub refresh_token: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct TwoFactorReq {
    pub two_factor_code: String,
}

/// POST /core/v4/auth/info
pub async fn auth_info(
    State(state): State<AppState>,
    Json(req): Json<AuthInfoReq>,
) -> Result<Json<AuthInfo>, ApiError> {
    Ok(Json(state.backend.auth_info(&req.username).await?))
}

/// POST /core/v4/auth
pub async fn authenticate(
    State(state): State<AppState>,
    Json(req): Json<AuthReq>,
) -> Result<Json<Session>, ApiError> {
    let session = state
        .backend
        .authenticate(&req.username, &req.credentials)
        .await?;
    Ok(Json(session))
}

/// POST /core/v4/auth/refresh
pub async fn refresh(
    State(state): State<AppState>,
    Json(req): Json<RefreshReq>,
) -> Result<Json<Session>, ApiError> {
    Ok(Json(
        state
            .backend
            .refresh_session(&req.uid, &req.refresh_token)
            .await?,
    ))
}

/// POST /core/v4/auth/2fa
pub async fn two_factor(
    State(state): State<AppState>,
    Extension(auth): Extension<Authorization>,
    Json(req): Json<TwoFactorReq>,
) -> Result<StatusCode, ApiError> {
    state
        .backend
        .upgrade_session(&auth.uid, &req.two_factor_code)
        .await?;
    Ok(StatusCode::OK)
}

/// DELETE /core/v4/auth: Log out the calling session
pub async fn logout(
    State(state): State<AppState>,
    Extension(auth): Extension<Authorization>,
) -> Result<StatusCode, ApiError> {
    state
        .backend
        .revoke_session(&auth.account_id, &auth.uid)
        .await?;
    Ok(StatusCode::OK)
}

/// GET /auth/v4/sessions
pub async fn list_sessions(
    State(state): State<AppState>,
    Extension(auth): Extension<Authorization>,
) -> Result<Json<Value>, ApiError> {
    let sessions: Vec<SessionInfo> = state.backend.list_sessions(&auth.account_id).await?;
    Ok(Json(json!({ "Sessions": sessions })))
}

/// DELETE /auth/v4/sessions: Revoke every session of the caller
pub async fn revoke_all(
    State(state): State<AppState>,
    Extension(auth): Extension<Authorization>,
) -> Result<StatusCode, ApiError> {
    state.backend.revoke_all_sessions(&auth.account_id).await?;
    Ok(StatusCode::OK)
}

/// DELETE /auth/v4/sessions/:uid
pub async fn revoke(
    State(state): State<AppState>,
    Extension(auth): Extension<Authorization>,
    Path(uid): Path<String>,
) -> Result<StatusCode, ApiError> {
    state.backend.revoke_session(&auth.account_id, &uid).await?;
    Ok(StatusCode::OK)
}
