use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::api::error::ApiError;
use crate::api::AppState;
use crate::types::{
    Authorization, DraftAction, DraftTemplate, ImportTemplate, MailAddress, MessageFilter,
    MessageFlags, MimeType,
};

const DEFAULT_PAGE_SIZE: usize = 150;

fn default_page_size() -> usize {
    DEFAULT_PAGE_SIZE
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct MessagesQuery {
    #[serde(default)]
    pub page: usize,
    #[serde(default = "default_page_size")]
    pub page_size: usize,
    #[serde(rename = "LabelID")]
    pub label_id: Option<String>,
    pub subject: Option<String>,
    #[serde(rename = "AddressID")]
    pub address_id: Option<String>,
    #[serde(rename = "ExternalID")]
    pub external_id: Option<String>,
    #[serde(rename = "EndID")]
    pub end_id: Option<String>,
    #[serde(default)]
    pub desc: bool,
}

impl From<MessagesQuery> for MessageFilter {
    fn from(query: MessagesQuery) -> Self {
        MessageFilter {
            ids: Vec::new(),
            subject: query.subject,
            address_id: query.address_id,
            external_id: query.external_id,
            label_id: query.label_id,
            end_id: query.end_id,
            desc: query.desc,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct MessageIdsQuery {
    #[serde(rename = "AfterID")]
    pub after_id: Option<String>,
    #[serde(rename = "Limit", default)]
    pub limit: usize,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct CreateDraftReq {
    pub message: DraftTemplate,
    #[serde(rename = "AddressID")]
    pub address_id: String,
    #[serde(rename = "ParentID")]
    pub parent_id: Option<String>,
    pub action: Option<DraftAction>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct UpdateDraftReq {
    pub message: DraftTemplate,
}

#[derive(Debug, Deserialize)]
pub struct MessageIdsReq {
    #[serde(rename = "IDs")]
    pub ids: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct LabelMessagesReq {
    #[serde(rename = "LabelID")]
    pub label_id: String,
    #[serde(rename = "IDs")]
    pub ids: Vec<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ImportReq {
    #[serde(rename = "AddressID")]
    pub address_id: String,
    pub subject: String,
    pub sender: MailAddress,
    #[serde(default)]
    pub to_list: Vec<MailAddress>,
    #[serde(default, rename = "CCList")]
    pub cc_list: Vec<MailAddress>,
    #[serde(default, rename = "BCCList")]
    pub bcc_list: Vec<MailAddress>,
    #[serde(default)]
    pub reply_tos: Vec<MailAddress>,
    #[serde(default)]
    pub body: String,
    #[serde(default, rename = "MIMEType")]
    pub mime_type: MimeType,
    #[serde(default)]
    pub flags: MessageFlags,
    #[serde(default)]
    pub unread: bool,
    #[serde(default)]
    pub starred: bool,
}

impl From<ImportReq> for ImportTemplate {
    fn from(req: ImportReq) -> Self {
        ImportTemplate {
            subject: req.subject,
            sender: req.sender,
            to_list: req.to_list,
            cc_list: req.cc_list,
            bcc_list: req.bcc_list,
            reply_tos: req.reply_tos,
            body: req.body,
            mime_type: req.mime_type,
            flags: req.flags,
            unread: req.unread,
            starred: req.starred,
        }
    }
}

/// GET /mail/v4/messages: One page of filtered metadata
pub async fn list_messages(
    State(state): State<AppState>,
    Extension(auth): Extension<Authorization>,
    Query(query): Query<MessagesQuery>,
) -> Result<Json<Value>, ApiError> {
    let (page, page_size) = (query.page, query.page_size);
    let messages = state
        .backend
        .get_messages(&auth.account_id, page, page_size, &query.into())
        .await?;
    Ok(Json(json!({
        "Total": messages.len(),
        "Messages": messages,
    })))
}

/// GET /mail/v4/messages/ids
pub async fn list_message_ids(
    State(state): State<AppState>,
    Extension(auth): Extension<Authorization>,
    Query(query): Query<MessageIdsQuery>,
) -> Result<Json<Value>, ApiError> {
    let ids = state
        .backend
        .list_message_ids(&auth.account_id, query.after_id.as_deref(), query.limit)
        .await?;
    Ok(Json(json!({ "IDs": ids })))
}

/// GET /mail/v4/messages/count
pub async fn message_counts(
    State(state): State<AppState>,
    Extension(auth): Extension<Authorization>,
) -> Result<Json<Value>, ApiError> {
    let counts = state.backend.message_group_counts(&auth.account_id).await?;
    Ok(Json(json!({ "Counts": counts })))
}

/// GET /mail/v4/messages/:message_id
pub async fn get_message(
    State(state): State<AppState>,
    Extension(auth): Extension<Authorization>,
    Path(message_id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let message = state
        .backend
        .get_message(&auth.account_id, &message_id)
        .await?;
    Ok(Json(json!({ "Message": message })))
}

/// POST /mail/v4/messages: Create a draft
pub async fn create_draft(
    State(state): State<AppState>,
    Extension(auth): Extension<Authorization>,
    Json(req): Json<CreateDraftReq>,
) -> Result<Json<Value>, ApiError> {
    let parent = match (&req.parent_id, req.action) {
        (Some(parent_id), Some(action)) => Some((parent_id.as_str(), action)),
        (None, None) => None,
        _ => {
            return Err(ApiError::BadRequest(
                "ParentID and Action must be given together".to_string(),
            ))
        }
    };

    let message = state
        .backend
        .create_draft(&auth.account_id, &req.address_id, req.message, parent)
        .await?;
    Ok(Json(json!({ "Message": message })))
}

/// PUT /mail/v4/messages/:message_id: Replace a draft's contents
pub async fn update_draft(
    State(state): State<AppState>,
    Extension(auth): Extension<Authorization>,
    Path(message_id): Path<String>,
    Json(req): Json<UpdateDraftReq>,
) -> Result<Json<Value>, ApiError> {
    let message = state
        .backend
        .update_draft(&auth.account_id, &message_id, req.message)
        .await?;
    Ok(Json(json!({ "Message": message })))
}

/// POST /mail/v4/messages/:message_id: Send a draft
pub async fn send_message(
    State(state): State<AppState>,
    Extension(auth): Extension<Authorization>,
    Path(message_id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let sent = state
        .backend
        .send_message(&auth.account_id, &message_id)
        .await?;
    Ok(Json(json!({ "Sent": sent })))
}

/// POST /mail/v4/messages/import
pub async fn import_message(
    State(state): State<AppState>,
    Extension(auth): Extension<Authorization>,
    Json(req): Json<ImportReq>,
) -> Result<Json<Value>, ApiError> {
    let address_id = req.address_id.clone();
    let message_id = state
        .backend
        .import_message(&auth.account_id, &address_id, req.into())
        .await?;
    Ok(Json(json!({ "MessageID": message_id })))
}

/// PUT /mail/v4/messages/read
pub async fn mark_read(
    State(state): State<AppState>,
    Extension(auth): Extension<Authorization>,
    Json(req): Json<MessageIdsReq>,
) -> Result<StatusCode, ApiError> {
    state
        .backend
        .set_messages_read(&auth.account_id, true, &req.ids)
        .await?;
    Ok(StatusCode::OK)
}

/// PUT /mail/v4/messages/unread
pub async fn mark_unread(
    State(state): State<AppState>,
    Extension(auth): Extension<Authorization>,
    Json(req): Json<MessageIdsReq>,
) -> Result<StatusCode, ApiError> {
    state
        .backend
        .set_messages_read(&auth.account_id, false, &req.ids)
        .await?;
    Ok(StatusCode::OK)
}

/// PUT /mail/v4/messages/label
pub async fn label_messages(
    State(state): State<AppState>,
    Extension(auth): Extension<Authorization>,
    Json(req): Json<LabelMessagesReq>,
) -> Result<StatusCode, ApiError> {
    state
        .backend
        .label_messages(&auth.account_id, &req.label_id, &req.ids)
        .await?;
    Ok(StatusCode::OK)
}

/// PUT /mail/v4/messages/unlabel
pub async fn unlabel_messages(
    State(state): State<AppState>,
    Extension(auth): Extension<Authorization>,
    Json(req): Json<LabelMessagesReq>,
) -> Result<StatusCode, ApiError> {
    state
        .backend
        .unlabel_messages(&auth.account_id, &req.label_id, &req.ids)
        .await?;
    Ok(StatusCode::OK)
}

/// PUT /mail/v4/messages/delete
pub async fn delete_messages(
    State(state): State<AppState>,
    Extension(auth): Extension<Authorization>,
    Json(req): Json<MessageIdsReq>,
) -> Result<StatusCode, ApiError> {
    for id in &req.ids {
        state.backend.delete_message(&auth.account_id, id).await?;
    }
    Ok(StatusCode::OK)
}
