use axum::{
    middleware,
    routing::{delete, get, post, put},
    Router,
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::api::middleware::{log_middleware, require_auth, require_session};
use crate::api::{
    attachments, events, labels, mail_settings, messages, session, users, AppState,
};

async fn ping() -> &'static str {
    "pong"
}

/// Build the mail API router
pub fn build_router(state: AppState) -> Router {
    // Login and token refresh run before any session exists.
    let public_router = Router::new()
        .route("/core/v4/auth", post(session::authenticate))
        .route("/core/v4/auth/info", post(session::auth_info))
        .route("/core/v4/auth/refresh", post(session::refresh))
        .route("/tests/ping", get(ping));

    // The second factor is submitted with a half-authorized session.
    let pending_router = Router::new()
        .route("/core/v4/auth/2fa", post(session::two_factor))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            require_session,
        ));

    let core_router = Router::new()
        .route("/core/v4/auth", delete(session::logout))
        .route("/core/v4/users", get(users::get_user))
        .route(
            "/core/v4/settings",
            get(users::get_settings).put(users::put_settings),
        )
        // Addresses
        .route("/core/v4/addresses", get(users::list_addresses))
        .route("/core/v4/addresses/order", put(users::put_address_order))
        .route("/core/v4/addresses/:address_id", get(users::get_address))
        // Keys
        .route("/core/v4/keys", get(users::get_public_keys))
        .route("/core/v4/keys/salts", get(users::get_key_salts))
        // Labels
        .route(
            "/core/v4/labels",
            get(labels::list_labels).post(labels::create_label),
        )
        .route(
            "/core/v4/labels/:label_id",
            put(labels::update_label).delete(labels::delete_label),
        )
        // Events
        .route("/core/v4/events/latest", get(events::latest_event_id))
        .route("/core/v4/events/:event_id", get(events::get_event))
        // Sessions
        .route(
            "/auth/v4/sessions",
            get(session::list_sessions).delete(session::revoke_all),
        )
        .route("/auth/v4/sessions/:uid", delete(session::revoke));

    let mail_router = Router::new()
        .route("/mail/v4/settings", get(mail_settings::get_mail_settings))
        .route(
            "/mail/v4/settings/attachpublic",
            put(mail_settings::put_attach_public_key),
        )
        .route("/mail/v4/settings/sign", put(mail_settings::put_sign))
        .route(
            "/mail/v4/settings/drafttype",
            put(mail_settings::put_draft_type),
        )
        .route(
            "/mail/v4/settings/pgpscheme",
            put(mail_settings::put_pgp_scheme),
        )
        .route(
            "/mail/v4/messages",
            get(messages::list_messages).post(messages::create_draft),
        )
        .route("/mail/v4/messages/ids", get(messages::list_message_ids))
        .route("/mail/v4/messages/count", get(messages::message_counts))
        .route("/mail/v4/messages/import", post(messages::import_message))
        .route("/mail/v4/messages/read", put(messages::mark_read))
        .route("/mail/v4/messages/unread", put(messages::mark_unread))
        .route("/mail/v4/messages/label", put(messages::label_messages))
        .route("/mail/v4/messages/unlabel", put(messages::unlabel_messages))
        .route("/mail/v4/messages/delete", put(messages::delete_messages))
        .route(
            "/mail/v4/messages/:message_id",
            get(messages::get_message)
                .put(messages::update_draft)
                .post(messages::send_message),
        )
        // Attachments
        .route("/mail/v4/attachments", post(attachments::create_attachment))
        .route(
            "/mail/v4/attachments/:attachment_id",
            get(attachments::get_attachment).delete(attachments::delete_attachment),
        );

    let protected_router = core_router
        .merge(mail_router)
        .route_layer(middleware::from_fn_with_state(state.clone(), require_auth));

    public_router
        .merge(pending_router)
        .merge(protected_router)
        .layer(middleware::from_fn(log_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .layer(axum::extract::DefaultBodyLimit::max(32 * 1024 * 1024))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::middleware::{REISSUED_ACCESS_TOKEN_HEADER, UID_HEADER};
    use crate::backend::Backend;
    use crate::crypto::srp;
    use crate::types::{AddressStatus, AddressType, AuthInfo, Session};
    use axum::body::{to_bytes, Body};
    use axum::http::{header, Method, Request, StatusCode};
    use serde_json::{json, Value};
    use std::sync::Arc;
    use std::time::Duration;
    use tower::ServiceExt;

    async fn app_with_user() -> (Router, Arc<Backend>) {
        let backend = Arc::new(Backend::default());
        let account_id = backend.create_account("alice", b"secret").await.unwrap();
        backend
            .create_address(
                &account_id,
                "alice@proton.local",
                true,
                AddressStatus::Enabled,
                AddressType::Original,
            )
            .await
            .unwrap();

        let app = build_router(AppState {
            backend: backend.clone(),
        });
        (app, backend)
    }

    async fn call(
        app: &Router,
        method: Method,
        uri: &str,
        session: Option<&Session>,
        body: Option<Value>,
    ) -> (StatusCode, axum::http::HeaderMap, Value) {
        let mut req = Request::builder().method(method).uri(uri);
        if let Some(session) = session {
            req = req
                .header(UID_HEADER, &session.uid)
                .header(
                    header::AUTHORIZATION,
                    format!("Bearer {}", session.access_token),
                );
        }

        let req = match body {
            Some(body) => req
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => req.body(Body::empty()).unwrap(),
        };

        let res = app.clone().oneshot(req).await.unwrap();
        let status = res.status();
        let headers = res.headers().clone();
        let bytes = to_bytes(res.into_body(), usize::MAX).await.unwrap();
        let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, headers, value)
    }

    async fn login(app: &Router) -> Session {
        let (status, _, info) = call(
            app,
            Method::POST,
            "/core/v4/auth/info",
            None,
            Some(json!({ "Username": "alice" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        let info: AuthInfo = serde_json::from_value(info).unwrap();
        let credentials = srp::client_credentials(b"secret", &info).unwrap();

        let (status, _, session) = call(
            app,
            Method::POST,
            "/core/v4/auth",
            None,
            Some(json!({
                "Username": "alice",
                "SRPSession": credentials.srp_session,
                "ClientProof": credentials.client_proof,
            })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        serde_json::from_value(session).unwrap()
    }

    #[tokio::test]
    async fn test_mail_settings_and_keys() {
        let (app, _) = app_with_user().await;
        let session = login(&app).await;

        let (status, _, body) = call(
            &app,
            Method::PUT,
            "/mail/v4/settings/drafttype",
            Some(&session),
            Some(json!({ "MIMEType": "text/plain" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["MailSettings"]["DraftMIMEType"], "text/plain");

        let (status, _, body) = call(
            &app,
            Method::GET,
            "/mail/v4/settings",
            Some(&session),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["MailSettings"]["DisplayName"], "alice");
        assert_eq!(body["MailSettings"]["DraftMIMEType"], "text/plain");

        let (status, _, body) = call(
            &app,
            Method::GET,
            "/core/v4/keys?Email=alice@proton.local",
            Some(&session),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["Keys"].as_array().unwrap().len(), 1);

        let (status, _, body) = call(
            &app,
            Method::GET,
            "/core/v4/keys/salts",
            Some(&session),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["KeySalts"].as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_message_listing_pages() {
        let (app, backend) = app_with_user().await;
        let session = login(&app).await;
        let address_id = backend
            .address_id_by_email("alice@proton.local")
            .await
            .unwrap();

        for subject in ["one", "two", "three"] {
            let (status, _, _) = call(
                &app,
                Method::POST,
                "/mail/v4/messages",
                Some(&session),
                Some(json!({
                    "AddressID": address_id,
                    "Message": { "Subject": subject, "Body": "", "ToList": [] },
                })),
            )
            .await;
            assert_eq!(status, StatusCode::OK);
        }

        let (status, _, body) = call(
            &app,
            Method::GET,
            "/mail/v4/messages?Page=1&PageSize=2",
            Some(&session),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["Messages"][0]["Subject"], "three");
        assert_eq!(body["Messages"].as_array().unwrap().len(), 1);

        let (status, _, body) = call(
            &app,
            Method::GET,
            "/mail/v4/messages?Subject=tw",
            Some(&session),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["Messages"][0]["Subject"], "two");
        assert_eq!(body["Messages"].as_array().unwrap().len(), 1);

        let (status, _, _) = call(
            &app,
            Method::GET,
            "/mail/v4/messages?PageSize=0",
            Some(&session),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn test_ping_is_public() {
        let (app, _) = app_with_user().await;
        let req = Request::builder()
            .uri("/tests/ping")
            .body(Body::empty())
            .unwrap();
        let res = app.oneshot(req).await.unwrap();
        assert_eq!(res.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_protected_routes_require_session() {
        let (app, _) = app_with_user().await;
        let (status, _, body) = call(&app, Method::GET, "/core/v4/users", None, None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert!(body["Error"].is_string());

        let (status, _, _) = call(
            &app,
            Method::POST,
            "/core/v4/auth/info",
            None,
            Some(json!({ "Username": "nobody" })),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_login_and_poll_events() {
        let (app, _) = app_with_user().await;
        let session = login(&app).await;

        let (status, _, user) =
            call(&app, Method::GET, "/core/v4/users", Some(&session), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(user["User"]["Name"], "alice");

        let (_, _, latest) = call(
            &app,
            Method::GET,
            "/core/v4/events/latest",
            Some(&session),
            None,
        )
        .await;
        let since = latest["EventID"].as_str().unwrap().to_string();

        let (status, _, label) = call(
            &app,
            Method::POST,
            "/core/v4/labels",
            Some(&session),
            Some(json!({ "Name": "work", "Type": "Label" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let label_id = label["Label"]["ID"].as_str().unwrap().to_string();

        let (status, _, page) = call(
            &app,
            Method::GET,
            &format!("/core/v4/events/{}", since),
            Some(&session),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(page["More"], false);
        assert_eq!(page["Event"]["Labels"][0]["ID"], label_id.as_str());
        assert_eq!(page["Event"]["Labels"][0]["Action"], "Create");

        let (status, _, body) = call(
            &app,
            Method::GET,
            "/core/v4/events/not-a-number",
            Some(&session),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["Code"], 2001);
    }

    #[tokio::test]
    async fn test_draft_send_and_fetch() {
        let (app, backend) = app_with_user().await;
        let session = login(&app).await;
        let address_id = backend
            .address_id_by_email("alice@proton.local")
            .await
            .unwrap();

        let (status, _, draft) = call(
            &app,
            Method::POST,
            "/mail/v4/messages",
            Some(&session),
            Some(json!({
                "AddressID": address_id,
                "Message": { "Subject": "hello", "Body": "hi", "ToList": [] },
            })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let message_id = draft["Message"]["ID"].as_str().unwrap().to_string();

        let (status, _, sent) = call(
            &app,
            Method::POST,
            &format!("/mail/v4/messages/{}", message_id),
            Some(&session),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(sent["Sent"]["Subject"], "hello");

        let (status, _, body) = call(
            &app,
            Method::GET,
            "/mail/v4/messages/missing",
            Some(&session),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["Code"], 2501);
    }

    #[tokio::test]
    async fn test_expired_session_reissued_in_headers() {
        let (app, backend) = app_with_user().await;
        let session = login(&app).await;
        backend.set_auth_life(Duration::ZERO).await;
        tokio::time::sleep(Duration::from_millis(5)).await;

        let (status, headers, _) =
            call(&app, Method::GET, "/core/v4/users", Some(&session), None).await;
        assert_eq!(status, StatusCode::OK);
        assert!(headers.contains_key(REISSUED_ACCESS_TOKEN_HEADER));

        // The token that triggered the re-issue is now stale.
        let (status, _, body) =
            call(&app, Method::GET, "/core/v4/users", Some(&session), None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["Code"], 10013);
    }
}
