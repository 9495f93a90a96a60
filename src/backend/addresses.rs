use std::collections::HashSet;
use uuid::Uuid;

use super::state::BackendState;
use super::Backend;
use crate::crypto::keys::generate_address_key;
use crate::entities::AddressRecord;
use crate::error::{BackendError, Result};
use crate::types::{Address, AddressStatus, AddressType, KeyState, PublicKey};
use crate::update::Update;

impl BackendState {
    fn insert_address(
        &mut self,
        account_id: &str,
        email: &str,
        with_key: bool,
        status: AddressStatus,
        address_type: AddressType,
        as_update: bool,
    ) -> Result<String> {
        if self.find_address(email).is_some() {
            return Err(BackendError::invalid_state(format!(
                "address {} already exists",
                email
            )));
        }

        let account = self.account_mut(account_id)?;

        let keys = if with_key {
            let user_key = account
                .keys
                .first()
                .ok_or_else(|| BackendError::invalid_state("account has no user key"))?;
            vec![generate_address_key(&account.username, email, user_key)]
        } else {
            Vec::new()
        };

        let address_id = Uuid::new_v4().to_string();
        let order = account.addresses.len() + 1;

        account.addresses.insert(
            address_id.clone(),
            AddressRecord {
                id: address_id.clone(),
                email: email.to_string(),
                display_name: email.to_string(),
                order,
                status,
                address_type,
                keys,
                allow_send: true,
            },
        );

        let update = if as_update {
            Update::AddressUpdated(address_id.clone())
        } else {
            Update::AddressCreated(address_id.clone())
        };
        self.record(account_id, update)?;

        if order == 1 {
            self.record(account_id, Update::UserUpdated)?;
        }

        tracing::info!("Address {} ({}) added to account {}", email, address_id, account_id);

        Ok(address_id)
    }

    /// Applies `f` to one address and records the change.
    fn update_address(
        &mut self,
        account_id: &str,
        address_id: &str,
        f: impl FnOnce(&mut AddressRecord) -> Result<()>,
    ) -> Result<()> {
        f(self.address_mut(account_id, address_id)?)?;
        self.record(account_id, Update::AddressUpdated(address_id.to_string()))?;
        Ok(())
    }
}

impl Backend {
    pub async fn create_address(
        &self,
        account_id: &str,
        email: &str,
        with_key: bool,
        status: AddressStatus,
        address_type: AddressType,
    ) -> Result<String> {
        self.write(|s| s.insert_address(account_id, email, with_key, status, address_type, false))
            .await
    }

    /// Like [`Backend::create_address`] but announced to pollers as an
    /// update rather than a creation.
    pub async fn create_address_as_update(
        &self,
        account_id: &str,
        email: &str,
        with_key: bool,
        status: AddressStatus,
        address_type: AddressType,
    ) -> Result<String> {
        self.write(|s| s.insert_address(account_id, email, with_key, status, address_type, true))
            .await
    }

    pub async fn get_address(&self, account_id: &str, address_id: &str) -> Result<Address> {
        self.read(|s| Ok(s.address(account_id, address_id)?.to_address()))
            .await
    }

    /// The account's addresses, primary first.
    pub async fn list_addresses(&self, account_id: &str) -> Result<Vec<Address>> {
        self.read(|s| {
            Ok(s.account(account_id)?
                .ordered_addresses()
                .into_iter()
                .map(AddressRecord::to_address)
                .collect())
        })
        .await
    }

    pub async fn address_id_by_email(&self, email: &str) -> Result<String> {
        self.read(|s| {
            s.find_address(email)
                .map(|(_, address)| address.id.clone())
                .ok_or_else(|| BackendError::not_found("address", email))
        })
        .await
    }

    /// Public keys of the address owning `email`, in key order.
    pub async fn get_public_keys(&self, email: &str) -> Result<Vec<PublicKey>> {
        self.read(|s| {
            let (_, address) = s
                .find_address(email)
                .ok_or_else(|| BackendError::not_found("address", email))?;

            Ok(address
                .keys
                .iter()
                .map(|key| PublicKey {
                    flags: KeyState::TRUSTED | KeyState::ACTIVE,
                    public_key: key.public_armor(),
                })
                .collect())
        })
        .await
    }

    pub async fn set_address_status(
        &self,
        account_id: &str,
        address_id: &str,
        status: AddressStatus,
    ) -> Result<()> {
        self.write(|s| {
            s.update_address(account_id, address_id, |a| {
                a.status = status;
                Ok(())
            })
        })
        .await
    }

    pub async fn set_address_type(
        &self,
        account_id: &str,
        address_id: &str,
        address_type: AddressType,
    ) -> Result<()> {
        self.write(|s| {
            s.update_address(account_id, address_id, |a| {
                a.address_type = address_type;
                Ok(())
            })
        })
        .await
    }

    pub async fn set_address_allow_send(
        &self,
        account_id: &str,
        address_id: &str,
        allow_send: bool,
    ) -> Result<()> {
        self.write(|s| {
            s.update_address(account_id, address_id, |a| {
                a.allow_send = allow_send;
                Ok(())
            })
        })
        .await
    }

    pub async fn set_address_display_name(
        &self,
        account_id: &str,
        address_id: &str,
        display_name: &str,
    ) -> Result<()> {
        self.write(|s| {
            s.update_address(account_id, address_id, |a| {
                a.display_name = display_name.to_string();
                Ok(())
            })
        })
        .await
    }

    /// Deletes a disabled address. The remaining ranks close up to 1..N.
    pub async fn delete_address(&self, account_id: &str, address_id: &str) -> Result<()> {
        self.write(|s| {
            if s.address(account_id, address_id)?.status != AddressStatus::Disabled {
                return Err(BackendError::invalid_state(format!(
                    "address {} is not disabled",
                    address_id
                )));
            }

            let account = s.account_mut(account_id)?;
            let primary_before = account.primary_address().map(|a| a.id.clone());

            account.addresses.remove(address_id);
            let reranked = account.rerank();
            let primary_after = account.primary_address().map(|a| a.id.clone());

            s.record(account_id, Update::AddressDeleted(address_id.to_string()))?;
            for id in reranked {
                s.record(account_id, Update::AddressUpdated(id))?;
            }
            if primary_before != primary_after {
                s.record(account_id, Update::UserUpdated)?;
            }

            tracing::info!("Address {} deleted from account {}", address_id, account_id);

            Ok(())
        })
        .await
    }

    /// Reorders addresses. `address_ids` must list every address of the
    /// account exactly once; the first becomes primary.
    pub async fn set_address_order(&self, account_id: &str, address_ids: &[String]) -> Result<()> {
        self.write(|s| {
            let account = s.account_mut(account_id)?;

            for id in address_ids {
                if !account.addresses.contains_key(id) {
                    return Err(BackendError::not_found("address", id.as_str()));
                }
            }

            let unique: HashSet<&String> = address_ids.iter().collect();
            if unique.len() != address_ids.len() || unique.len() != account.addresses.len() {
                return Err(BackendError::invalid_state(
                    "address order must list every address exactly once",
                ));
            }

            let primary_before = account.primary_address().map(|a| a.id.clone());

            let mut changed = Vec::new();
            for (i, id) in address_ids.iter().enumerate() {
                if let Some(address) = account.addresses.get_mut(id) {
                    if address.order != i + 1 {
                        address.order = i + 1;
                        changed.push(id.clone());
                    }
                }
            }

            let primary_after = account.primary_address().map(|a| a.id.clone());

            for id in changed {
                s.record(account_id, Update::AddressUpdated(id))?;
            }
            if primary_before != primary_after {
                s.record(account_id, Update::UserUpdated)?;
            }

            Ok(())
        })
        .await
    }

    /// Adds a key to an address. The password must be the account's.
    pub async fn create_address_key(
        &self,
        account_id: &str,
        address_id: &str,
        password: &[u8],
    ) -> Result<String> {
        self.write(|s| {
            let account = s.account(account_id)?;

            if !account.verifier.matches(password) {
                return Err(BackendError::AuthFailed("wrong password".to_string()));
            }

            let user_key = account
                .keys
                .first()
                .ok_or_else(|| BackendError::invalid_state("account has no user key"))?;
            let email = &s.address(account_id, address_id)?.email;
            let key = generate_address_key(&account.username, email, user_key);
            let key_id = key.key_id.clone();

            s.update_address(account_id, address_id, |a| {
                a.keys.push(key);
                Ok(())
            })?;

            Ok(key_id)
        })
        .await
    }

    pub async fn remove_address_key(
        &self,
        account_id: &str,
        address_id: &str,
        key_id: &str,
    ) -> Result<()> {
        self.write(|s| {
            s.update_address(account_id, address_id, |a| {
                let idx = a
                    .keys
                    .iter()
                    .position(|k| k.key_id == key_id)
                    .ok_or_else(|| BackendError::not_found("key", key_id))?;
                a.keys.remove(idx);
                Ok(())
            })
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::testutil::backend_with_user;
    use crate::event::EventAction;

    async fn add(backend: &Backend, account_id: &str, email: &str) -> String {
        backend
            .create_address(
                account_id,
                email,
                true,
                AddressStatus::Enabled,
                AddressType::Alias,
            )
            .await
            .unwrap()
    }

    fn orders(addresses: &[Address]) -> Vec<(String, usize)> {
        addresses
            .iter()
            .map(|a| (a.email.clone(), a.order))
            .collect()
    }

    #[tokio::test]
    async fn test_create_address() {
        let (backend, account_id, address_id) = backend_with_user("alice").await;

        let address = backend.get_address(&account_id, &address_id).await.unwrap();
        assert_eq!(address.email, "alice@x");
        assert_eq!(address.order, 1);
        assert!(address.send && address.receive);
        assert_eq!(address.keys.len(), 1);
        assert!(address.keys[0].primary);

        assert_eq!(
            backend.get_user(&account_id).await.unwrap().email,
            "alice@x"
        );
        assert_eq!(
            backend.address_id_by_email("ALICE@x").await.unwrap(),
            address_id
        );
    }

    #[tokio::test]
    async fn test_email_must_be_unique() {
        let (backend, account_id, _) = backend_with_user("alice").await;
        let other = backend.create_account("bob", b"pw").await.unwrap();

        for owner in [&account_id, &other] {
            assert!(matches!(
                backend
                    .create_address(
                        owner,
                        "alice@x",
                        false,
                        AddressStatus::Enabled,
                        AddressType::Original
                    )
                    .await,
                Err(BackendError::InvalidState(_))
            ));
        }
    }

    #[tokio::test]
    async fn test_create_as_update_event() {
        let (backend, account_id, _) = backend_with_user("alice").await;
        let since = backend.get_latest_event_id(&account_id).await.unwrap();

        let id = backend
            .create_address_as_update(
                &account_id,
                "alias@x",
                false,
                AddressStatus::Enabled,
                AddressType::Alias,
            )
            .await
            .unwrap();

        let event = backend.get_event(&account_id, &since).await.unwrap().event;
        assert_eq!(event.addresses.len(), 1);
        assert_eq!(event.addresses[0].id, id);
        assert_eq!(event.addresses[0].action, EventAction::Update);
    }

    #[tokio::test]
    async fn test_delete_requires_disabled() {
        let (backend, account_id, primary) = backend_with_user("alice").await;
        let second = add(&backend, &account_id, "second@x").await;
        let third = add(&backend, &account_id, "third@x").await;

        assert!(matches!(
            backend.delete_address(&account_id, &second).await,
            Err(BackendError::InvalidState(_))
        ));

        backend
            .set_address_status(&account_id, &second, AddressStatus::Disabled)
            .await
            .unwrap();
        let disabled = backend.get_address(&account_id, &second).await.unwrap();
        assert!(!disabled.send && !disabled.receive);

        backend.delete_address(&account_id, &second).await.unwrap();

        let addresses = backend.list_addresses(&account_id).await.unwrap();
        assert_eq!(
            orders(&addresses),
            vec![("alice@x".to_string(), 1), ("third@x".to_string(), 2)]
        );
        assert_eq!(addresses[0].id, primary);
        assert_eq!(addresses[1].id, third);
    }

    #[tokio::test]
    async fn test_set_address_order() {
        let (backend, account_id, primary) = backend_with_user("alice").await;
        let second = add(&backend, &account_id, "second@x").await;
        let since = backend.get_latest_event_id(&account_id).await.unwrap();

        backend
            .set_address_order(&account_id, &[second.clone(), primary.clone()])
            .await
            .unwrap();

        let addresses = backend.list_addresses(&account_id).await.unwrap();
        assert_eq!(addresses[0].id, second);
        assert_eq!(
            backend.get_user(&account_id).await.unwrap().email,
            "second@x"
        );

        let event = backend.get_event(&account_id, &since).await.unwrap().event;
        assert_eq!(event.addresses.len(), 2);
        assert_eq!(event.user.unwrap().email, "second@x");
    }

    #[tokio::test]
    async fn test_set_address_order_validates() {
        let (backend, account_id, primary) = backend_with_user("alice").await;
        let second = add(&backend, &account_id, "second@x").await;

        assert!(backend
            .set_address_order(&account_id, &["nope".to_string(), primary.clone()])
            .await
            .unwrap_err()
            .is_not_found());
        assert!(matches!(
            backend
                .set_address_order(&account_id, &[primary.clone(), primary.clone()])
                .await,
            Err(BackendError::InvalidState(_))
        ));
        assert!(matches!(
            backend.set_address_order(&account_id, &[second]).await,
            Err(BackendError::InvalidState(_))
        ));

        let addresses = backend.list_addresses(&account_id).await.unwrap();
        assert_eq!(addresses[0].id, primary);
    }

    #[tokio::test]
    async fn test_public_keys_by_email() {
        let (backend, account_id, address_id) = backend_with_user("alice").await;

        let keys = backend.get_public_keys("ALICE@x").await.unwrap();
        assert_eq!(keys.len(), 1);
        assert_eq!(keys[0].flags, KeyState::TRUSTED | KeyState::ACTIVE);
        assert!(keys[0].public_key.contains("PUBLIC KEY BLOCK"));

        backend
            .create_address_key(&account_id, &address_id, b"password")
            .await
            .unwrap();
        assert_eq!(backend.get_public_keys("alice@x").await.unwrap().len(), 2);

        assert!(backend
            .get_public_keys("nobody@x")
            .await
            .unwrap_err()
            .is_not_found());
    }

    #[tokio::test]
    async fn test_address_keys_and_fields() {
        let (backend, account_id, address_id) = backend_with_user("alice").await;

        let key_id = backend
            .create_address_key(&account_id, &address_id, b"password")
            .await
            .unwrap();
        assert!(matches!(
            backend
                .create_address_key(&account_id, &address_id, b"wrong")
                .await,
            Err(BackendError::AuthFailed(_))
        ));

        backend
            .set_address_display_name(&account_id, &address_id, "Alice A.")
            .await
            .unwrap();
        backend
            .set_address_type(&account_id, &address_id, AddressType::Custom)
            .await
            .unwrap();
        backend
            .set_address_allow_send(&account_id, &address_id, false)
            .await
            .unwrap();

        let address = backend.get_address(&account_id, &address_id).await.unwrap();
        assert_eq!(address.keys.len(), 2);
        assert_eq!(address.display_name, "Alice A.");
        assert_eq!(address.address_type, AddressType::Custom);
        assert!(!address.send);

        backend
            .remove_address_key(&account_id, &address_id, &key_id)
            .await
            .unwrap();
        assert!(backend
            .remove_address_key(&account_id, &address_id, &key_id)
            .await
            .unwrap_err()
            .is_not_found());
    }
}
