use std::collections::HashMap;
use std::time::Duration;

use crate::config::BackendConfig;
use crate::entities::{Account, AddressRecord, AttachmentRecord, LabelRecord, MessageRecord};
use crate::error::{BackendError, Result};
use crate::event::EntityViews;
use crate::storage::PayloadStore;
use crate::types::{Address, Label, MessageMetadata, User, UserSettings};
use crate::update::{Update, UpdateId, UpdateLog};

/// Everything the facade lock guards. Only reachable through
/// [`super::Backend`]'s `read`/`write` closures.
pub(super) struct BackendState {
    pub(super) accounts: HashMap<String, Account>,
    pub(super) messages: HashMap<String, MessageRecord>,
    pub(super) labels: HashMap<String, LabelRecord>,
    pub(super) attachments: HashMap<String, AttachmentRecord>,
    pub(super) payloads: PayloadStore,
    pub(super) updates: UpdateLog,

    pub(super) domain: String,
    pub(super) auth_life: chrono::Duration,
    pub(super) max_updates_per_event: usize,
    pub(super) enable_dedup: bool,
}

fn to_chrono(duration: Duration) -> chrono::Duration {
    chrono::Duration::from_std(duration).unwrap_or(chrono::Duration::MAX)
}

impl BackendState {
    pub(super) fn new(config: &BackendConfig) -> Self {
        Self {
            accounts: HashMap::new(),
            messages: HashMap::new(),
            labels: HashMap::new(),
            attachments: HashMap::new(),
            payloads: PayloadStore::new(),
            updates: UpdateLog::new(),
            domain: config.domain.clone(),
            auth_life: to_chrono(config.auth_life),
            max_updates_per_event: config.max_updates_per_event,
            enable_dedup: config.enable_dedup,
        }
    }

    pub(super) fn set_auth_life(&mut self, auth_life: Duration) {
        self.auth_life = to_chrono(auth_life);
    }

    pub(super) fn account(&self, account_id: &str) -> Result<&Account> {
        self.accounts
            .get(account_id)
            .ok_or_else(|| BackendError::AccountNotFound(account_id.to_string()))
    }

    pub(super) fn account_mut(&mut self, account_id: &str) -> Result<&mut Account> {
        self.accounts
            .get_mut(account_id)
            .ok_or_else(|| BackendError::AccountNotFound(account_id.to_string()))
    }

    pub(super) fn account_by_name(&self, username: &str) -> Option<&Account> {
        self.accounts.values().find(|a| a.username == username)
    }

    /// Appends `update` to the log and to the account's index list.
    pub(super) fn record(&mut self, account_id: &str, update: Update) -> Result<UpdateId> {
        let account = self
            .accounts
            .get_mut(account_id)
            .ok_or_else(|| BackendError::AccountNotFound(account_id.to_string()))?;

        Ok(account.record(&mut self.updates, update))
    }

    pub(super) fn address(&self, account_id: &str, address_id: &str) -> Result<&AddressRecord> {
        self.account(account_id)?
            .addresses
            .get(address_id)
            .ok_or_else(|| BackendError::not_found("address", address_id))
    }

    pub(super) fn address_mut(
        &mut self,
        account_id: &str,
        address_id: &str,
    ) -> Result<&mut AddressRecord> {
        self.account_mut(account_id)?
            .addresses
            .get_mut(address_id)
            .ok_or_else(|| BackendError::not_found("address", address_id))
    }

    /// The account and address owning `email`, compared case-insensitively.
    pub(super) fn find_address(&self, email: &str) -> Option<(&Account, &AddressRecord)> {
        self.accounts.values().find_map(|account| {
            account
                .addresses
                .values()
                .find(|a| a.email.eq_ignore_ascii_case(email))
                .map(|address| (account, address))
        })
    }

    pub(super) fn message(&self, account_id: &str, message_id: &str) -> Result<&MessageRecord> {
        self.account(account_id)?;

        self.messages
            .get(message_id)
            .filter(|m| m.account_id == account_id)
            .ok_or_else(|| BackendError::not_found("message", message_id))
    }

    pub(super) fn message_mut(
        &mut self,
        account_id: &str,
        message_id: &str,
    ) -> Result<&mut MessageRecord> {
        self.account(account_id)?;

        self.messages
            .get_mut(message_id)
            .filter(|m| m.account_id == account_id)
            .ok_or_else(|| BackendError::not_found("message", message_id))
    }

    /// Fails with NotFound on the first ID the account does not own.
    pub(super) fn check_messages(&self, account_id: &str, message_ids: &[String]) -> Result<()> {
        for id in message_ids {
            self.message(account_id, id)?;
        }
        Ok(())
    }

    pub(super) fn label(&self, account_id: &str, label_id: &str) -> Result<&LabelRecord> {
        self.account(account_id)?;

        self.labels
            .get(label_id)
            .filter(|l| l.account_id == account_id)
            .ok_or_else(|| BackendError::not_found("label", label_id))
    }

    pub(super) fn attachment(
        &self,
        account_id: &str,
        attachment_id: &str,
    ) -> Result<&AttachmentRecord> {
        let attachment = self
            .attachments
            .get(attachment_id)
            .ok_or_else(|| BackendError::not_found("attachment", attachment_id))?;

        // Ownership runs through the message.
        self.message(account_id, &attachment.message_id)
            .map_err(|_| BackendError::not_found("attachment", attachment_id))?;

        Ok(attachment)
    }

    /// Drops an attachment record and its reference on the payload.
    pub(super) fn remove_attachment(&mut self, attachment_id: &str) {
        if let Some(attachment) = self.attachments.remove(attachment_id) {
            self.payloads.release(&attachment.payload_key);
        }
    }

    /// Drops a message with its attachments. The account's message list and
    /// the update log are the caller's business.
    pub(super) fn remove_message(&mut self, message_id: &str) -> Option<MessageRecord> {
        let message = self.messages.remove(message_id)?;

        for attachment_id in &message.attachment_ids {
            self.remove_attachment(attachment_id);
        }

        Some(message)
    }

    /// Bytes used by an account's messages and their attachment payloads.
    pub(super) fn used_space(&self, account: &Account) -> u64 {
        account
            .message_ids
            .iter()
            .filter_map(|id| self.messages.get(id))
            .map(|m| m.size(&self.attachments, &self.payloads) as u64)
            .sum()
    }

    pub(super) fn user_view(&self, account: &Account) -> User {
        account.to_user(self.used_space(account))
    }

    pub(super) fn label_view(&self, label: &LabelRecord) -> Label {
        label.to_label(&self.labels)
    }

    pub(super) fn metadata_view(&self, message: &MessageRecord) -> MessageMetadata {
        message.to_metadata(&self.attachments, &self.payloads)
    }

    pub(super) fn views<'a>(&'a self, account: &'a Account) -> AccountViews<'a> {
        AccountViews {
            state: self,
            account,
        }
    }
}

/// Current views of one account's entities, for the event builder.
pub(super) struct AccountViews<'a> {
    state: &'a BackendState,
    account: &'a Account,
}

impl EntityViews for AccountViews<'_> {
    fn message(&self, id: &str) -> Option<MessageMetadata> {
        self.state
            .messages
            .get(id)
            .filter(|m| m.account_id == self.account.id)
            .map(|m| self.state.metadata_view(m))
    }

    fn label(&self, id: &str) -> Option<Label> {
        self.state
            .labels
            .get(id)
            .filter(|l| l.account_id == self.account.id)
            .map(|l| self.state.label_view(l))
    }

    fn address(&self, id: &str) -> Option<Address> {
        self.account.addresses.get(id).map(|a| a.to_address())
    }

    fn user(&self) -> Option<User> {
        Some(self.state.user_view(self.account))
    }

    fn user_settings(&self) -> UserSettings {
        self.account.settings
    }
}
