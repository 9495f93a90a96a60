//! The backend facade.
//!
//! All state sits behind one reader/writer lock. Every public operation
//! takes the lock exactly once, runs a synchronous closure against
//! [`BackendState`], and releases it. Closures cannot await and cannot
//! reach another public operation, so a partially applied mutation is never
//! observable and the lock is never taken twice by the same call.

mod accounts;
mod addresses;
mod attachments;
mod auth;
mod events;
mod labels;
mod mail_settings;
mod messages;
mod state;

use std::time::Duration;
use tokio::sync::RwLock;

use crate::config::BackendConfig;
use state::BackendState;

pub use labels::SYSTEM_LABELS;

pub struct Backend {
    state: RwLock<BackendState>,
}

impl Backend {
    pub fn new(config: BackendConfig) -> Self {
        tracing::info!(
            "Backend ready (auth life {:?}, max updates per event {}, dedup {})",
            config.auth_life,
            config.max_updates_per_event,
            config.enable_dedup
        );

        Self {
            state: RwLock::new(BackendState::new(&config)),
        }
    }

    pub async fn set_auth_life(&self, auth_life: Duration) {
        self.write(|s| s.set_auth_life(auth_life)).await
    }

    /// Caps how many update records one event may merge; 0 disables the cap.
    pub async fn set_max_updates_per_event(&self, max: usize) {
        self.write(|s| s.max_updates_per_event = max).await
    }

    pub async fn domain(&self) -> String {
        self.read(|s| s.domain.clone()).await
    }

    async fn read<T>(&self, f: impl FnOnce(&BackendState) -> T) -> T {
        let state = self.state.read().await;
        f(&state)
    }

    async fn write<T>(&self, f: impl FnOnce(&mut BackendState) -> T) -> T {
        let mut state = self.state.write().await;
        f(&mut state)
    }
}

impl Default for Backend {
    fn default() -> Self {
        Self::new(BackendConfig::default())
    }
}

#[cfg(test)]
pub(crate) mod testutil {
    use super::*;
    use crate::types::{AddressStatus, AddressType};

    /// A backend with one account and one enabled address `<name>@x`.
    pub async fn backend_with_user(name: &str) -> (Backend, String, String) {
        let backend = Backend::default();
        let (account_id, address_id) = add_user(&backend, name).await;
        (backend, account_id, address_id)
    }

    pub async fn add_user(backend: &Backend, name: &str) -> (String, String) {
        let account_id = backend.create_account(name, b"password").await.unwrap();
        let address_id = backend
            .create_address(
                &account_id,
                &format!("{}@x", name),
                true,
                AddressStatus::Enabled,
                AddressType::Original,
            )
            .await
            .unwrap();
        (account_id, address_id)
    }
}
