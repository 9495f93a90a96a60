use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Extension, Json,
};
use base64::engine::general_purpose::STANDARD as BASE64_STANDARD;
use base64::Engine;
use bytes::Bytes;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::api::error::ApiError;
use crate::api::AppState;
use crate::types::{AttachmentTemplate, Authorization, Disposition};

/// Attachment upload. Binary fields travel base64-encoded.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct CreateAttachmentReq {
    #[serde(rename = "MessageID")]
    pub message_id: String,
    pub filename: String,
    #[serde(rename = "MIMEType")]
    pub mime_type: String,
    pub disposition: Disposition,
    #[serde(rename = "ContentID")]
    pub content_id: Option<String>,
    pub key_packets: String,
    pub data_packet: String,
    pub signature: Option<String>,
}

fn decode(field: &str, value: &str) -> Result<Vec<u8>, ApiError> {
    BASE64_STANDARD
        .decode(value)
        .map_err(|e| ApiError::BadRequest(format!("{} is not valid base64: {}", field, e)))
}

/// POST /mail/v4/attachments
pub async fn create_attachment(
    State(state): State<AppState>,
    Extension(auth): Extension<Authorization>,
    Json(req): Json<CreateAttachmentReq>,
) -> Result<Json<Value>, ApiError> {
    let template = AttachmentTemplate {
        key_packets: decode("KeyPackets", &req.key_packets)?,
        data: Bytes::from(decode("DataPacket", &req.data_packet)?),
        filename: req.filename,
        mime_type: req.mime_type,
        disposition: req.disposition,
        content_id: req.content_id,
        signature: req.signature,
    };

    let attachment = state
        .backend
        .create_attachment(&auth.account_id, &req.message_id, template)
        .await?;
    Ok(Json(json!({ "Attachment": attachment })))
}

/// GET /mail/v4/attachments/:attachment_id: Raw payload bytes
pub async fn get_attachment(
    State(state): State<AppState>,
    Extension(auth): Extension<Authorization>,
    Path(attachment_id): Path<String>,
) -> Result<Response, ApiError> {
    let data = state
        .backend
        .get_attachment_payload(&auth.account_id, &attachment_id)
        .await?;

    Ok((
        StatusCode::OK,
        [("Content-Type", "application/octet-stream")],
        data,
    )
        .into_response())
}

/// DELETE /mail/v4/attachments/:attachment_id
pub async fn delete_attachment(
    State(state): State<AppState>,
    Extension(auth): Extension<Authorization>,
    Path(attachment_id): Path<String>,
) -> Result<StatusCode, ApiError> {
    state
        .backend
        .delete_attachment(&auth.account_id, &attachment_id)
        .await?;
    Ok(StatusCode::OK)
}
