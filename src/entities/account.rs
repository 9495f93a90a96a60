use chrono::{DateTime, Utc};
use std::collections::HashMap;

use crate::crypto::keys::KeyMaterial;
use crate::crypto::srp::{Challenge, PasswordVerifier};
use crate::entities::{AddressRecord, SessionRecord};
use crate::error::{BackendError, Result};
use crate::types::{MailSettings, User, UserSettings};
use crate::update::{Update, UpdateId, UpdateLog};

#[derive(Debug)]
pub struct Account {
    pub id: String,
    pub username: String,
    pub verifier: PasswordVerifier,
    pub keys: Vec<KeyMaterial>,

    pub addresses: HashMap<String, AddressRecord>,
    pub message_ids: Vec<String>,
    pub label_ids: Vec<String>,

    /// Positions in the global log that belong to this account, in log order.
    pub update_ids: Vec<UpdateId>,
    /// IDs dropped from `update_ids` by full refreshes, in log order. They
    /// resolve to the start of the current list.
    pub pruned_ids: Vec<UpdateId>,

    pub sessions: HashMap<String, SessionRecord>,
    /// Outstanding challenges keyed by SRP session ID.
    pub challenges: HashMap<String, Challenge>,
    pub two_factor: Option<String>,

    pub settings: UserSettings,
    pub mail_settings: MailSettings,
    pub created_at: DateTime<Utc>,
}

impl Account {
    pub fn new(id: String, username: String, verifier: PasswordVerifier, key: KeyMaterial) -> Self {
        let mail_settings = MailSettings::new(&username);

        Self {
            id,
            username,
            verifier,
            keys: vec![key],
            addresses: HashMap::new(),
            message_ids: Vec::new(),
            label_ids: Vec::new(),
            update_ids: Vec::new(),
            pruned_ids: Vec::new(),
            sessions: HashMap::new(),
            challenges: HashMap::new(),
            two_factor: None,
            settings: UserSettings::default(),
            mail_settings,
            created_at: Utc::now(),
        }
    }

    /// Appends `update` to the global log and to this account's index list.
    /// Both happen here so they cannot diverge.
    pub fn record(&mut self, log: &mut UpdateLog, update: Update) -> UpdateId {
        let full_refresh = update.is_full_refresh();
        let id = log.push(update);

        if full_refresh {
            let pruned = std::mem::replace(&mut self.update_ids, vec![id]);
            self.pruned_ids.extend(pruned);
        } else {
            self.update_ids.push(id);
        }

        id
    }

    pub fn latest_update(&self) -> Option<UpdateId> {
        self.update_ids.last().copied()
    }

    /// Index into `update_ids` of the first record strictly after `since`.
    pub fn window_start(&self, since: UpdateId) -> Result<usize> {
        if let Ok(pos) = self.update_ids.binary_search(&since) {
            return Ok(pos + 1);
        }

        // The refresh record sits at position 0 after pruning.
        if self.pruned_ids.binary_search(&since).is_ok() {
            return Ok(0);
        }

        Err(BackendError::InvalidEventId(since.to_string()))
    }

    /// Addresses sorted by rank, primary first.
    pub fn ordered_addresses(&self) -> Vec<&AddressRecord> {
        let mut addresses: Vec<&AddressRecord> = self.addresses.values().collect();
        addresses.sort_by_key(|a| a.order);
        addresses
    }

    pub fn primary_address(&self) -> Option<&AddressRecord> {
        self.addresses.values().min_by_key(|a| a.order)
    }

    /// Renumbers ranks to 1..N, keeping relative order. Returns the IDs
    /// whose rank changed.
    pub fn rerank(&mut self) -> Vec<String> {
        let mut ids: Vec<(usize, String)> = self
            .addresses
            .values()
            .map(|a| (a.order, a.id.clone()))
            .collect();
        ids.sort();

        let mut changed = Vec::new();
        for (rank, (_, id)) in ids.into_iter().enumerate() {
            if let Some(address) = self.addresses.get_mut(&id) {
                if address.order != rank + 1 {
                    address.order = rank + 1;
                    changed.push(id);
                }
            }
        }

        changed
    }

    pub fn to_user(&self, used_space: u64) -> User {
        let primary = self.primary_address();

        User {
            id: self.id.clone(),
            name: self.username.clone(),
            display_name: primary
                .map(|a| a.display_name.clone())
                .unwrap_or_else(|| self.username.clone()),
            email: primary.map(|a| a.email.clone()).unwrap_or_default(),
            used_space,
            keys: self
                .keys
                .iter()
                .enumerate()
                .map(|(i, key)| key.to_key(i == 0))
                .collect(),
        }
    }
}
