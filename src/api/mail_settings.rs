use axum::{extract::State, Extension, Json};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::api::error::ApiError;
use crate::api::AppState;
use crate::types::{Authorization, EncryptionScheme, MailSettings, MimeType};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct AttachPublicKeyReq {
    pub attach_public_key: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct SignReq {
    pub sign: bool,
}

#[derive(Debug, Deserialize)]
pub struct DraftTypeReq {
    #[serde(rename = "MIMEType")]
    pub mime_type: MimeType,
}

#[derive(Debug, Deserialize)]
pub struct PgpSchemeReq {
    #[serde(rename = "PGPScheme")]
    pub pgp_scheme: EncryptionScheme,
}

fn settings_response(settings: MailSettings) -> Json<Value> {
    Json(json!({ "MailSettings": settings }))
}

/// GET /mail/v4/settings
pub async fn get_mail_settings(
    State(state): State<AppState>,
    Extension(auth): Extension<Authorization>,
) -> Result<Json<Value>, ApiError> {
    let settings = state.backend.get_mail_settings(&auth.account_id).await?;
    Ok(settings_response(settings))
}

/// PUT /mail/v4/settings/attachpublic
pub async fn put_attach_public_key(
    State(state): State<AppState>,
    Extension(auth): Extension<Authorization>,
    Json(req): Json<AttachPublicKeyReq>,
) -> Result<Json<Value>, ApiError> {
    let settings = state
        .backend
        .set_mail_settings_attach_public_key(&auth.account_id, req.attach_public_key)
        .await?;
    Ok(settings_response(settings))
}

/// PUT /mail/v4/settings/sign
pub async fn put_sign(
    State(state): State<AppState>,
    Extension(auth): Extension<Authorization>,
    Json(req): Json<SignReq>,
) -> Result<Json<Value>, ApiError> {
    let settings = state
        .backend
        .set_mail_settings_sign(&auth.account_id, req.sign)
        .await?;
    Ok(settings_response(settings))
}

/// PUT /mail/v4/settings/drafttype
pub async fn put_draft_type(
    State(state): State<AppState>,
    Extension(auth): Extension<Authorization>,
    Json(req): Json<DraftTypeReq>,
) -> Result<Json<Value>, ApiError> {
    let settings = state
        .backend
        .set_mail_settings_draft_mime_type(&auth.account_id, req.mime_type)
        .await?;
    Ok(settings_response(settings))
}

/// PUT /mail/v4/settings/pgpscheme
pub async fn put_pgp_scheme(
    State(state): State<AppState>,
    Extension(auth): Extension<Authorization>,
    Json(req): Json<PgpSchemeReq>,
) -> Result<Json<Value>, ApiError> {
    let settings = state
        .backend
        .set_mail_settings_pgp_scheme(&auth.account_id, req.pgp_scheme)
        .await?;
    Ok(settings_response(settings))
}
