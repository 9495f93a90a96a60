use axum::{
    extract::{Path, State},
    Extension, Json,
};
use serde_json::{json, Value};

use crate::api::error::ApiError;
use crate::api::AppState;
use crate::event::EventPage;
use crate::types::Authorization;

/// GET /core/v4/events/latest
pub async fn latest_event_id(
    State(state): State<AppState>,
    Extension(auth): Extension<Authorization>,
) -> Result<Json<Value>, ApiError> {
    let event_id = state.backend.get_latest_event_id(&auth.account_id).await?;
    Ok(Json(json!({ "EventID": event_id })))
}

/// GET /core/v4/events/:event_id
pub async fn get_event(
    State(state): State<AppState>,
    Extension(auth): Extension<Authorization>,
    Path(event_id): Path<String>,
) -> Result<Json<EventPage>, ApiError> {
    let page = state
        .backend
        .get_event(&auth.account_id, &event_id)
        .await?;
    tracing::debug!(
        "Event poll from {} -> {} (more: {})",
        event_id,
        page.last_event_id,
        page.more
    );
    Ok(Json(page))
}
