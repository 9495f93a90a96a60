use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::api::error::ApiError;
use crate::api::AppState;
use crate::types::{Authorization, LabelType};

#[derive(Debug, Deserialize)]
pub struct LabelsQuery {
    #[serde(rename = "Type")]
    pub label_type: Option<LabelType>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct CreateLabelReq {
    pub name: String,
    #[serde(rename = "ParentID")]
    pub parent_id: Option<String>,
    #[serde(rename = "Type")]
    pub label_type: LabelType,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct UpdateLabelReq {
    pub name: String,
    #[serde(rename = "ParentID")]
    pub parent_id: Option<String>,
}

/// GET /core/v4/labels: Optionally filtered by `?Type=`
pub async fn list_labels(
    State(state): State<AppState>,
    Extension(auth): Extension<Authorization>,
    Query(query): Query<LabelsQuery>,
) -> Result<Json<Value>, ApiError> {
    let types: Vec<LabelType> = query.label_type.into_iter().collect();
    let labels = state.backend.list_labels(&auth.account_id, &types).await?;
    Ok(Json(json!({ "Labels": labels })))
}

/// POST /core/v4/labels
pub async fn create_label(
    State(state): State<AppState>,
    Extension(auth): Extension<Authorization>,
    Json(req): Json<CreateLabelReq>,
) -> Result<Json<Value>, ApiError> {
    let label = state
        .backend
        .create_label(
            &auth.account_id,
            &req.name,
            req.parent_id.as_deref(),
            req.label_type,
        )
        .await?;
    Ok(Json(json!({ "Label": label })))
}

/// PUT /core/v4/labels/:label_id
pub async fn update_label(
    State(state): State<AppState>,
    Extension(auth): Extension<Authorization>,
    Path(label_id): Path<String>,
    Json(req): Json<UpdateLabelReq>,
) -> Result<Json<Value>, ApiError> {
    let label = state
        .backend
        .update_label(
            &auth.account_id,
            &label_id,
            &req.name,
            req.parent_id.as_deref(),
        )
        .await?;
    Ok(Json(json!({ "Label": label })))
}

/// DELETE /core/v4/labels/:label_id
pub async fn delete_label(
    State(state): State<AppState>,
    Extension(auth): Extension<Authorization>,
    Path(label_id): Path<String>,
) -> Result<StatusCode, ApiError> {
    state
        .backend
        .delete_label(&auth.account_id, &label_id)
        .await?;
    Ok(StatusCode::OK)
}
