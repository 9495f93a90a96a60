use axum::{
    extract::{Request, State},
    http::{header, HeaderValue},
    middleware::Next,
    response::Response,
};

use crate::api::error::ApiError;
use crate::api::AppState;
use crate::types::Scope;

pub const UID_HEADER: &str = "x-pm-uid";
pub const REISSUED_ACCESS_TOKEN_HEADER: &str = "x-pm-access-token";
pub const REISSUED_REFRESH_TOKEN_HEADER: &str = "x-pm-refresh-token";

/// Simple request logger middleware
pub async fn log_middleware(req: Request, next: Next) -> Response {
    let method = req.method().clone();
    let uri = req.uri().clone();
    tracing::info!(">>> {} {}", method, uri);
    let res = next.run(req).await;
    tracing::info!("<<< {} {} -> {}", method, uri, res.status());
    res
}

/// Session auth for routes that need a fully authorized session
pub async fn require_auth(
    State(state): State<AppState>,
    req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    authorize_request(state, req, next, Scope::Full).await
}

/// Session auth for routes reachable while the second factor is pending
pub async fn require_session(
    State(state): State<AppState>,
    req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    authorize_request(state, req, next, Scope::PendingTwoFactor).await
}

async fn authorize_request(
    state: AppState,
    mut req: Request,
    next: Next,
    required: Scope,
) -> Result<Response, ApiError> {
    let headers = req.headers();

    let uid = headers
        .get(UID_HEADER)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| ApiError::Unauthorized("Missing x-pm-uid header".to_string()))?
        .to_string();

    let token = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .ok_or_else(|| ApiError::Unauthorized("Missing bearer token".to_string()))?
        .to_string();

    let auth = state.backend.authorize(&uid, &token, required).await?;
    let reissued = auth.reissued.clone();
    req.extensions_mut().insert(auth);

    let mut res = next.run(req).await;

    // The presented token is dead now; hand the new pair to the client.
    if let Some(session) = reissued {
        let headers = res.headers_mut();
        if let Ok(value) = HeaderValue::from_str(&session.access_token) {
            headers.insert(REISSUED_ACCESS_TOKEN_HEADER, value);
        }
        if let Ok(value) = HeaderValue::from_str(&session.refresh_token) {
            headers.insert(REISSUED_REFRESH_TOKEN_HEADER, value);
        }
    }

    Ok(res)
}
