use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::api::error::ApiError;
use crate::api::AppState;
use crate::types::{Authorization, UserSettings};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct KeysQuery {
    pub email: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct AddressOrderReq {
    #[serde(rename = "AddressIDs")]
    pub address_ids: Vec<String>,
}

/// GET /core/v4/users
pub async fn get_user(
    State(state): State<AppState>,
    Extension(auth): Extension<Authorization>,
) -> Result<Json<Value>, ApiError> {
    let user = state.backend.get_user(&auth.account_id).await?;
    Ok(Json(json!({ "User": user })))
}

/// GET /core/v4/settings
pub async fn get_settings(
    State(state): State<AppState>,
    Extension(auth): Extension<Authorization>,
) -> Result<Json<Value>, ApiError> {
    let settings = state.backend.get_user_settings(&auth.account_id).await?;
    Ok(Json(json!({ "UserSettings": settings })))
}

/// PUT /core/v4/settings
pub async fn put_settings(
    State(state): State<AppState>,
    Extension(auth): Extension<Authorization>,
    Json(settings): Json<UserSettings>,
) -> Result<Json<Value>, ApiError> {
    let settings = state
        .backend
        .set_user_settings(&auth.account_id, settings)
        .await?;
    Ok(Json(json!({ "UserSettings": settings })))
}

/// GET /core/v4/keys: Public keys of any address on this backend
pub async fn get_public_keys(
    State(state): State<AppState>,
    Query(query): Query<KeysQuery>,
) -> Result<Json<Value>, ApiError> {
    let keys = state.backend.get_public_keys(&query.email).await?;
    Ok(Json(json!({ "Keys": keys })))
}

/// GET /core/v4/keys/salts
pub async fn get_key_salts(
    State(state): State<AppState>,
    Extension(auth): Extension<Authorization>,
) -> Result<Json<Value>, ApiError> {
    let salts = state.backend.get_key_salts(&auth.account_id).await?;
    Ok(Json(json!({ "KeySalts": salts })))
}

/// GET /core/v4/addresses
pub async fn list_addresses(
    State(state): State<AppState>,
    Extension(auth): Extension<Authorization>,
) -> Result<Json<Value>, ApiError> {
    let addresses = state.backend.list_addresses(&auth.account_id).await?;
    Ok(Json(json!({ "Addresses": addresses })))
}

/// GET /core/v4/addresses/:address_id
pub async fn get_address(
    State(state): State<AppState>,
    Extension(auth): Extension<Authorization>,
    Path(address_id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let address = state
        .backend
        .get_address(&auth.account_id, &address_id)
        .await?;
    Ok(Json(json!({ "Address": address })))
}

/// PUT /core/v4/addresses/order
pub async fn put_address_order(
    State(state): State<AppState>,
    Extension(auth): Extension<Authorization>,
    Json(req): Json<AddressOrderReq>,
) -> Result<StatusCode, ApiError> {
    state
        .backend
        .set_address_order(&auth.account_id, &req.address_ids)
        .await?;
    Ok(StatusCode::OK)
}
