use chrono::Utc;
use uuid::Uuid;

use super::Backend;
use crate::crypto::srp::{self, Challenge};
use crate::entities::SessionRecord;
use crate::error::{BackendError, Result};
use crate::types::{AuthInfo, Authorization, Credentials, Scope, Session, SessionInfo};

impl Backend {
    /// First step of login: issues a challenge for `username`.
    pub async fn auth_info(&self, username: &str) -> Result<AuthInfo> {
        self.write(|s| {
            let account_id = s
                .account_by_name(username)
                .map(|a| a.id.clone())
                .ok_or_else(|| {
                    tracing::warn!("Auth info requested for unknown user '{}'", username);
                    BackendError::AuthFailed(format!("unknown user {}", username))
                })?;

            let account = s.account_mut(&account_id)?;
            let srp_session = Uuid::new_v4().to_string();
            let challenge = Challenge::new();
            let info = srp::auth_info(&account.verifier, &challenge, &srp_session);

            account.challenges.insert(srp_session, challenge);

            Ok(info)
        })
        .await
    }

    /// Second step of login. The challenge is consumed whether or not the
    /// proof checks out.
    pub async fn authenticate(&self, username: &str, credentials: &Credentials) -> Result<Session> {
        self.write(|s| {
            let account_id = s
                .account_by_name(username)
                .map(|a| a.id.clone())
                .ok_or_else(|| BackendError::AuthFailed(format!("unknown user {}", username)))?;

            let account = s.account_mut(&account_id)?;

            let challenge = account
                .challenges
                .remove(&credentials.srp_session)
                .ok_or_else(|| BackendError::AuthFailed("unknown SRP session".to_string()))?;

            let server_proof = account
                .verifier
                .verify_proof(&challenge.ephemeral, &credentials.client_proof)
                .inspect_err(|_| tracing::warn!("Rejected credentials for '{}'", username))?;

            let scope = if account.two_factor.is_some() {
                Scope::PendingTwoFactor
            } else {
                Scope::Full
            };

            let session = SessionRecord::issue(scope);
            let view = session.to_session(&account.id, Some(server_proof));
            account.sessions.insert(session.uid.clone(), session);

            tracing::info!("Session {} opened for '{}' ({:?})", view.uid, username, scope);

            Ok(view)
        })
        .await
    }

    /// Exchanges a refresh token for a new token pair under the same UID.
    pub async fn refresh_session(&self, uid: &str, refresh_token: &str) -> Result<Session> {
        self.write(|s| {
            let account = s
                .accounts
                .values_mut()
                .find(|a| a.sessions.contains_key(uid))
                .ok_or_else(|| BackendError::AuthFailed(format!("unknown session {}", uid)))?;

            let account_id = account.id.clone();
            let session = account
                .sessions
                .get_mut(uid)
                .ok_or_else(|| BackendError::AuthFailed(format!("unknown session {}", uid)))?;

            if session.refresh_token != refresh_token {
                return Err(BackendError::SessionExpired(uid.to_string()));
            }

            session.reissue();

            tracing::debug!("Session {} refreshed", uid);

            Ok(session.to_session(&account_id, None))
        })
        .await
    }

    /// Checks an access token and the scope it grants.
    ///
    /// A valid token on an expired session is re-issued in place and the new
    /// pair returned in [`Authorization::reissued`]; the presented token
    /// stops working from then on.
    pub async fn authorize(
        &self,
        uid: &str,
        access_token: &str,
        required: Scope,
    ) -> Result<Authorization> {
        self.write(|s| {
            let auth_life = s.auth_life;

            let account = s
                .accounts
                .values_mut()
                .find(|a| a.sessions.contains_key(uid))
                .ok_or_else(|| BackendError::AuthFailed(format!("unknown session {}", uid)))?;

            let account_id = account.id.clone();
            let session = account
                .sessions
                .get_mut(uid)
                .ok_or_else(|| BackendError::AuthFailed(format!("unknown session {}", uid)))?;

            if session.access_token != access_token {
                return Err(BackendError::SessionExpired(uid.to_string()));
            }

            if !session.scope.satisfies(required) {
                return Err(BackendError::ScopeError {
                    required,
                    granted: session.scope,
                });
            }

            let reissued = if session.is_expired(Utc::now(), auth_life) {
                session.reissue();
                tracing::debug!("Session {} expired, re-issued", uid);
                Some(session.to_session(&account_id, None))
            } else {
                None
            };

            Ok(Authorization {
                account_id,
                uid: uid.to_string(),
                scope: session.scope,
                reissued,
            })
        })
        .await
    }

    /// Promotes a session waiting on its second factor to full scope.
    pub async fn upgrade_session(&self, uid: &str, code: &str) -> Result<()> {
        self.write(|s| {
            let account = s
                .accounts
                .values_mut()
                .find(|a| a.sessions.contains_key(uid))
                .ok_or_else(|| BackendError::AuthFailed(format!("unknown session {}", uid)))?;

            let expected = account
                .two_factor
                .clone()
                .ok_or_else(|| BackendError::invalid_state("two-factor is not enabled"))?;

            let session = account
                .sessions
                .get_mut(uid)
                .ok_or_else(|| BackendError::AuthFailed(format!("unknown session {}", uid)))?;

            if session.scope != Scope::PendingTwoFactor {
                return Err(BackendError::invalid_state(
                    "session is not waiting for a second factor",
                ));
            }

            if expected != code {
                tracing::warn!("Rejected second factor for session {}", uid);
                return Err(BackendError::AuthFailed("invalid two-factor code".to_string()));
            }

            session.scope = Scope::Full;

            Ok(())
        })
        .await
    }

    pub async fn enable_two_factor(&self, account_id: &str, code: &str) -> Result<()> {
        self.write(|s| {
            s.account_mut(account_id)?.two_factor = Some(code.to_string());
            Ok(())
        })
        .await
    }

    pub async fn disable_two_factor(&self, account_id: &str) -> Result<()> {
        self.write(|s| {
            s.account_mut(account_id)?.two_factor = None;
            Ok(())
        })
        .await
    }

    /// The account's sessions, oldest first.
    pub async fn list_sessions(&self, account_id: &str) -> Result<Vec<SessionInfo>> {
        self.read(|s| {
            let mut sessions: Vec<SessionInfo> = s
                .account(account_id)?
                .sessions
                .values()
                .map(SessionRecord::to_info)
                .collect();
            sessions.sort_by(|a, b| (a.create_time, &a.uid).cmp(&(b.create_time, &b.uid)));
            Ok(sessions)
        })
        .await
    }

    pub async fn revoke_session(&self, account_id: &str, uid: &str) -> Result<()> {
        self.write(|s| {
            s.account_mut(account_id)?
                .sessions
                .remove(uid)
                .ok_or_else(|| BackendError::not_found("session", uid))?;

            tracing::info!("Session {} revoked", uid);

            Ok(())
        })
        .await
    }

    /// Deletes every session of one account. Returns how many were removed.
    pub async fn revoke_all_sessions(&self, account_id: &str) -> Result<usize> {
        self.write(|s| {
            let account = s.account_mut(account_id)?;
            let count = account.sessions.len();
            account.sessions.clear();

            tracing::info!("Revoked {} sessions of account {}", count, account_id);

            Ok(count)
        })
        .await
    }
}
