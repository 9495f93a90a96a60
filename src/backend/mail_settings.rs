use super::Backend;
use crate::error::Result;
use crate::types::{EncryptionScheme, MailSettings, MimeType};

impl Backend {
    pub async fn get_mail_settings(&self, account_id: &str) -> Result<MailSettings> {
        self.read(|s| Ok(s.account(account_id)?.mail_settings.clone()))
            .await
    }

    pub async fn set_mail_settings_attach_public_key(
        &self,
        account_id: &str,
        attach: bool,
    ) -> Result<MailSettings> {
        self.update_mail_settings(account_id, |m| m.attach_public_key = attach)
            .await
    }

    pub async fn set_mail_settings_sign(&self, account_id: &str, sign: bool) -> Result<MailSettings> {
        self.update_mail_settings(account_id, |m| m.sign = sign).await
    }

    pub async fn set_mail_settings_draft_mime_type(
        &self,
        account_id: &str,
        mime_type: MimeType,
    ) -> Result<MailSettings> {
        self.update_mail_settings(account_id, |m| m.draft_mime_type = mime_type)
            .await
    }

    pub async fn set_mail_settings_pgp_scheme(
        &self,
        account_id: &str,
        scheme: EncryptionScheme,
    ) -> Result<MailSettings> {
        self.update_mail_settings(account_id, |m| m.pgp_scheme = scheme)
            .await
    }

    /// Mail settings are not part of the event stream; callers read them back.
    async fn update_mail_settings(
        &self,
        account_id: &str,
        f: impl FnOnce(&mut MailSettings),
    ) -> Result<MailSettings> {
        self.write(|s| {
            let settings = &mut s.account_mut(account_id)?.mail_settings;
            f(settings);

            tracing::debug!("Mail settings of {} changed", account_id);

            Ok(settings.clone())
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::testutil::backend_with_user;
    use crate::error::BackendError;

    #[tokio::test]
    async fn test_mail_settings_defaults() {
        let (backend, account_id, _) = backend_with_user("alice").await;
        let settings = backend.get_mail_settings(&account_id).await.unwrap();

        assert_eq!(settings.display_name, "alice");
        assert_eq!(settings.draft_mime_type, MimeType::TextHtml);
        assert!(!settings.attach_public_key);
        assert!(!settings.sign);
        assert_eq!(settings.pgp_scheme, EncryptionScheme::Internal);
    }

    #[tokio::test]
    async fn test_mail_settings_setters() {
        let (backend, account_id, _) = backend_with_user("alice").await;
        let since = backend.get_latest_event_id(&account_id).await.unwrap();

        backend
            .set_mail_settings_attach_public_key(&account_id, true)
            .await
            .unwrap();
        backend.set_mail_settings_sign(&account_id, true).await.unwrap();
        backend
            .set_mail_settings_draft_mime_type(&account_id, MimeType::TextPlain)
            .await
            .unwrap();
        let returned = backend
            .set_mail_settings_pgp_scheme(&account_id, EncryptionScheme::PgpMime)
            .await
            .unwrap();

        let settings = backend.get_mail_settings(&account_id).await.unwrap();
        assert_eq!(returned, settings);
        assert!(settings.attach_public_key);
        assert!(settings.sign);
        assert_eq!(settings.draft_mime_type, MimeType::TextPlain);
        assert_eq!(settings.pgp_scheme, EncryptionScheme::PgpMime);

        assert_eq!(
            backend.get_latest_event_id(&account_id).await.unwrap(),
            since
        );
    }

    #[tokio::test]
    async fn test_mail_settings_unknown_account() {
        let backend = Backend::default();
        assert!(matches!(
            backend.set_mail_settings_sign("nope", true).await,
            Err(BackendError::AccountNotFound(_))
        ));
    }
}
