use std::collections::{HashMap, HashSet};
use uuid::Uuid;

use super::state::BackendState;
use super::Backend;
use crate::entities::label::subtree_ids;
use crate::entities::{LabelRecord, LabelTarget};
use crate::error::{BackendError, Result};
use crate::types::{label_id, Label, LabelType, SystemLabel};
use crate::update::Update;

/// Built-in labels every account has, as listed to clients.
pub const SYSTEM_LABELS: [(&str, &str); 12] = [
    (label_id::INBOX, "Inbox"),
    (label_id::ALL_DRAFTS, "AllDrafts"),
    (label_id::ALL_SENT, "AllSent"),
    (label_id::TRASH, "Trash"),
    (label_id::SPAM, "Spam"),
    (label_id::ALL_MAIL, "All Mail"),
    (label_id::ARCHIVE, "Archive"),
    (label_id::SENT, "Sent"),
    (label_id::DRAFTS, "Drafts"),
    (label_id::OUTBOX, "Outbox"),
    (label_id::STARRED, "Starred"),
    (label_id::ALL_SCHEDULED, "Scheduled"),
];

fn system_label_view(id: &str, name: &str) -> Label {
    Label {
        id: id.to_string(),
        parent_id: None,
        name: name.to_string(),
        path: vec![name.to_string()],
        label_type: LabelType::System,
    }
}

/// Resolves a label ID a message can be (un)labelled with. Aggregate views
/// like All Mail are derived from flags and cannot be assigned.
pub(super) fn label_target<'a>(
    labels: &'a HashMap<String, LabelRecord>,
    account_id: &str,
    label_id: &str,
) -> Result<LabelTarget<'a>> {
    if label_id == label_id::STARRED {
        return Ok(LabelTarget::Starred);
    }

    if let Some(system) = SystemLabel::from_id(label_id) {
        return Ok(LabelTarget::System(system));
    }

    if SYSTEM_LABELS.iter().any(|(id, _)| *id == label_id) {
        return Err(BackendError::invalid_state(format!(
            "label {} cannot be assigned",
            label_id
        )));
    }

    labels
        .get(label_id)
        .filter(|l| l.account_id == account_id)
        .map(LabelTarget::User)
        .ok_or_else(|| BackendError::not_found("label", label_id))
}

impl BackendState {
    /// Checks a name and parent for a user label. `label_id` is the label
    /// being edited, if any.
    fn validate_label(
        &self,
        account_id: &str,
        label_id: Option<&str>,
        name: &str,
        parent_id: Option<&str>,
        label_type: LabelType,
    ) -> Result<()> {
        if name.is_empty() {
            return Err(BackendError::invalid_state("label name must not be empty"));
        }

        if let Some(parent_id) = parent_id {
            if label_type != LabelType::Folder {
                return Err(BackendError::invalid_state(
                    "only folders can have a parent",
                ));
            }

            let parent = self.label(account_id, parent_id)?;
            if parent.label_type != LabelType::Folder {
                return Err(BackendError::invalid_state(format!(
                    "parent {} is not a folder",
                    parent_id
                )));
            }

            if let Some(label_id) = label_id {
                if parent.descends_from(label_id, &self.labels) {
                    return Err(BackendError::invalid_state(
                        "a folder cannot be moved under itself",
                    ));
                }
            }
        }

        let account = self.account(account_id)?;
        let duplicate = account
            .label_ids
            .iter()
            .filter_map(|id| self.labels.get(id))
            .any(|l| {
                Some(l.id.as_str()) != label_id
                    && l.label_type == label_type
                    && l.parent_id.as_deref() == parent_id
                    && l.name == name
            });
        if duplicate {
            return Err(BackendError::invalid_state(format!(
                "a label named {} already exists there",
                name
            )));
        }

        Ok(())
    }
}

impl Backend {
    pub async fn create_label(
        &self,
        account_id: &str,
        name: &str,
        parent_id: Option<&str>,
        label_type: LabelType,
    ) -> Result<Label> {
        self.write(|s| {
            if label_type == LabelType::System {
                return Err(BackendError::invalid_state(
                    "system labels cannot be created",
                ));
            }

            s.validate_label(account_id, None, name, parent_id, label_type)?;

            let label = LabelRecord {
                id: Uuid::new_v4().to_string(),
                account_id: account_id.to_string(),
                name: name.to_string(),
                parent_id: parent_id.map(str::to_string),
                label_type,
            };
            let label_id = label.id.clone();

            s.labels.insert(label_id.clone(), label);
            s.account_mut(account_id)?.label_ids.push(label_id.clone());
            s.record(account_id, Update::LabelCreated(label_id.clone()))?;

            tracing::info!("Label '{}' ({}) created in account {}", name, label_id, account_id);

            s.label(account_id, &label_id).map(|l| s.label_view(l))
        })
        .await
    }

    /// Renames or moves a label. Descendants are reported too since their
    /// paths change.
    pub async fn update_label(
        &self,
        account_id: &str,
        label_id: &str,
        name: &str,
        parent_id: Option<&str>,
    ) -> Result<Label> {
        self.write(|s| {
            let label_type = s.label(account_id, label_id)?.label_type;
            s.validate_label(account_id, Some(label_id), name, parent_id, label_type)?;

            if let Some(label) = s.labels.get_mut(label_id) {
                label.name = name.to_string();
                label.parent_id = parent_id.map(str::to_string);
            }

            for id in subtree_ids(label_id, &s.labels) {
                s.record(account_id, Update::LabelUpdated(id))?;
            }

            s.label(account_id, label_id).map(|l| s.label_view(l))
        })
        .await
    }

    /// Deletes a label with all its descendants and strips them from every
    /// message of the account.
    pub async fn delete_label(&self, account_id: &str, label_id: &str) -> Result<()> {
        self.write(|s| {
            s.label(account_id, label_id)?;

            let doomed = subtree_ids(label_id, &s.labels);
            let doomed_set: HashSet<&str> = doomed.iter().map(String::as_str).collect();

            for id in &doomed {
                s.labels.remove(id);
            }

            let account = s.account_mut(account_id)?;
            account.label_ids.retain(|id| !doomed_set.contains(id.as_str()));
            let message_ids = account.message_ids.clone();

            // Plain scan over every message of the account.
            let mut touched = Vec::new();
            for message_id in message_ids {
                if let Some(message) = s.messages.get_mut(&message_id) {
                    let before = message.label_ids.len();
                    message.label_ids.retain(|id| !doomed_set.contains(id.as_str()));
                    if message.label_ids.len() != before {
                        touched.push(message_id);
                    }
                }
            }

            for id in &doomed {
                s.record(account_id, Update::LabelDeleted(id.clone()))?;
            }
            for id in touched {
                s.record(account_id, Update::MessageUpdated(id))?;
            }

            tracing::info!(
                "Label {} deleted from account {} ({} labels removed)",
                label_id,
                account_id,
                doomed.len()
            );

            Ok(())
        })
        .await
    }

    /// Looks up a user label or one of the built-ins.
    pub async fn get_label(&self, account_id: &str, label_id: &str) -> Result<Label> {
        self.read(|s| {
            s.account(account_id)?;

            if let Some((id, name)) = SYSTEM_LABELS.iter().find(|(id, _)| *id == label_id) {
                return Ok(system_label_view(id, name));
            }

            s.label(account_id, label_id).map(|l| s.label_view(l))
        })
        .await
    }

    /// User labels in creation order followed by the built-ins, filtered to
    /// `types` unless it is empty.
    pub async fn list_labels(&self, account_id: &str, types: &[LabelType]) -> Result<Vec<Label>> {
        self.read(|s| {
            let account = s.account(account_id)?;

            let labels = account
                .label_ids
                .iter()
                .filter_map(|id| s.labels.get(id))
                .map(|l| s.label_view(l))
                .chain(
                    SYSTEM_LABELS
                        .iter()
                        .map(|(id, name)| system_label_view(id, name)),
                )
                .filter(|l| types.is_empty() || types.contains(&l.label_type))
                .collect();

            Ok(labels)
        })
        .await
    }

    /// Finds a user label by name.
    pub async fn label_id_by_name(&self, account_id: &str, name: &str) -> Result<Option<String>> {
        self.read(|s| {
            Ok(s.account(account_id)?
                .label_ids
                .iter()
                .filter_map(|id| s.labels.get(id))
                .find(|l| l.name == name)
                .map(|l| l.id.clone()))
        })
        .await
    }
}
