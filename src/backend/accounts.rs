use base64::engine::general_purpose::STANDARD as BASE64_STANDARD;
use base64::Engine;
use uuid::Uuid;

use super::Backend;
use crate::crypto::keys::generate_user_key;
use crate::crypto::srp::PasswordVerifier;
use crate::entities::Account;
use crate::error::{BackendError, Result};
use crate::types::{KeySalt, RefreshFlag, User, UserSettings};
use crate::update::Update;

impl Backend {
    /// Creates an account and seeds its history so it always has a latest
    /// event ID.
    pub async fn create_account(&self, username: &str, password: &[u8]) -> Result<String> {
        self.write(|s| {
            if username.is_empty() {
                return Err(BackendError::invalid_state("username must not be empty"));
            }

            if s.account_by_name(username).is_some() {
                return Err(BackendError::invalid_state(format!(
                    "username {} is taken",
                    username
                )));
            }

            let account_id = Uuid::new_v4().to_string();
            let account = Account::new(
                account_id.clone(),
                username.to_string(),
                PasswordVerifier::new(password),
                generate_user_key(username, password),
            );

            s.accounts.insert(account_id.clone(), account);
            s.record(&account_id, Update::UserUpdated)?;

            tracing::info!("Account {} created for '{}'", account_id, username);

            Ok(account_id)
        })
        .await
    }

    /// Deletes an account with every message, attachment, label, address
    /// and session it owns. Its records stay in the global log.
    pub async fn delete_account(&self, account_id: &str) -> Result<()> {
        self.write(|s| {
            let account = s
                .accounts
                .remove(account_id)
                .ok_or_else(|| BackendError::AccountNotFound(account_id.to_string()))?;

            for message_id in &account.message_ids {
                s.remove_message(message_id);
            }

            for label_id in &account.label_ids {
                s.labels.remove(label_id);
            }

            tracing::info!(
                "Account {} deleted ({} messages, {} labels, {} addresses)",
                account_id,
                account.message_ids.len(),
                account.label_ids.len(),
                account.addresses.len()
            );

            Ok(())
        })
        .await
    }

    /// Appends a refresh record. An ALL refresh supersedes the account's
    /// earlier history.
    pub async fn refresh_account(&self, account_id: &str, refresh: RefreshFlag) -> Result<()> {
        self.write(|s| {
            s.record(account_id, Update::Refresh(refresh))?;
            tracing::info!("Account {} refreshed ({:?})", account_id, refresh);
            Ok(())
        })
        .await
    }

    pub async fn get_user(&self, account_id: &str) -> Result<User> {
        self.read(|s| Ok(s.user_view(s.account(account_id)?))).await
    }

    pub async fn account_id_by_name(&self, username: &str) -> Result<String> {
        self.read(|s| {
            s.account_by_name(username)
                .map(|a| a.id.clone())
                .ok_or_else(|| BackendError::AccountNotFound(username.to_string()))
        })
        .await
    }

    /// Adds a user key. The password must be the account's.
    pub async fn create_user_key(&self, account_id: &str, password: &[u8]) -> Result<String> {
        self.write(|s| {
            let account = s.account_mut(account_id)?;

            if !account.verifier.matches(password) {
                return Err(BackendError::AuthFailed("wrong password".to_string()));
            }

            let key = generate_user_key(&account.username, password);
            let key_id = key.key_id.clone();
            account.keys.push(key);

            s.record(account_id, Update::UserUpdated)?;

            Ok(key_id)
        })
        .await
    }

    pub async fn remove_user_key(&self, account_id: &str, key_id: &str) -> Result<()> {
        self.write(|s| {
            let account = s.account_mut(account_id)?;

            let idx = account
                .keys
                .iter()
                .position(|k| k.key_id == key_id)
                .ok_or_else(|| BackendError::not_found("key", key_id))?;

            account.keys.remove(idx);

            s.record(account_id, Update::UserUpdated)?;

            Ok(())
        })
        .await
    }

    /// The password salt paired with each user key.
    pub async fn get_key_salts(&self, account_id: &str) -> Result<Vec<KeySalt>> {
        self.read(|s| {
            let account = s.account(account_id)?;
            let salt = BASE64_STANDARD.encode(account.verifier.salt());

            Ok(account
                .keys
                .iter()
                .map(|key| KeySalt {
                    id: key.key_id.clone(),
                    key_salt: salt.clone(),
                })
                .collect())
        })
        .await
    }

    pub async fn get_user_settings(&self, account_id: &str) -> Result<UserSettings> {
        self.read(|s| Ok(s.account(account_id)?.settings)).await
    }

    pub async fn set_user_settings(
        &self,
        account_id: &str,
        settings: UserSettings,
    ) -> Result<UserSettings> {
        self.write(|s| {
            s.account_mut(account_id)?.settings = settings;
            s.record(account_id, Update::SettingsChanged(settings))?;
            Ok(settings)
        })
        .await
    }
}
