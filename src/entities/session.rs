use chrono::{DateTime, Duration, Utc};
use uuid::Uuid;

use crate::types::{Scope, Session, SessionInfo};

/// An authenticated session. The UID is the stable reference; the token
/// pair is replaced on every refresh or re-issue.
#[derive(Debug, Clone)]
pub struct SessionRecord {
    pub uid: String,
    pub access_token: String,
    pub refresh_token: String,
    pub scope: Scope,
    pub created_at: DateTime<Utc>,
}

fn new_token() -> String {
    Uuid::new_v4().simple().to_string()
}

impl SessionRecord {
    pub fn issue(scope: Scope) -> Self {
        Self {
            uid: Uuid::new_v4().to_string(),
            access_token: new_token(),
            refresh_token: new_token(),
            scope,
            created_at: Utc::now(),
        }
    }

    /// Replaces the token pair in place. Previously issued tokens stop
    /// matching.
    pub fn reissue(&mut self) {
        self.access_token = new_token();
        self.refresh_token = new_token();
        self.created_at = Utc::now();
    }

    pub fn is_expired(&self, now: DateTime<Utc>, life: Duration) -> bool {
        now - self.created_at >= life
    }

    pub fn to_session(&self, account_id: &str, server_proof: Option<String>) -> Session {
        Session {
            uid: self.uid.clone(),
            account_id: account_id.to_string(),
            access_token: self.access_token.clone(),
            refresh_token: self.refresh_token.clone(),
            scope: self.scope,
            server_proof,
            create_time: self.created_at.timestamp(),
        }
    }

    pub fn to_info(&self) -> SessionInfo {
        SessionInfo {
            uid: self.uid.clone(),
            scope: self.scope,
            create_time: self.created_at.timestamp(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reissue_replaces_tokens() {
        let mut session = SessionRecord::issue(Scope::Full);
        let (uid, access, refresh) = (
            session.uid.clone(),
            session.access_token.clone(),
            session.refresh_token.clone(),
        );

        session.reissue();

        assert_eq!(session.uid, uid);
        assert_ne!(session.access_token, access);
        assert_ne!(session.refresh_token, refresh);
        assert_eq!(session.scope, Scope::Full);
    }

    #[test]
    fn test_expiry() {
        let session = SessionRecord::issue(Scope::Full);
        let now = session.created_at;
        assert!(!session.is_expired(now, Duration::seconds(10)));
        assert!(session.is_expired(now + Duration::seconds(10), Duration::seconds(10)));
        assert!(session.is_expired(now, Duration::zero()));
    }
}
