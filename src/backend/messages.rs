use std::collections::{BTreeMap, HashSet};

use super::labels::label_target;
use super::state::BackendState;
use super::Backend;
use crate::entities::attachment::sort_attachments;
use crate::entities::{AttachmentRecord, LabelTarget, MessageRecord};
use crate::error::{BackendError, Result};
use crate::types::{
    AddressStatus, DraftAction, DraftTemplate, ImportTemplate, MailAddress, Message, MessageFlags,
    MessageFilter, MessageGroupCount, MessageMetadata, MimeType, SystemLabel,
};
use crate::update::Update;

fn same_addresses(a: &[MailAddress], b: &[MailAddress]) -> bool {
    a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x.address == y.address)
}

fn check_body_type(mime_type: MimeType) -> Result<()> {
    match mime_type {
        MimeType::TextPlain | MimeType::TextHtml => Ok(()),
        other => Err(BackendError::invalid_state(format!(
            "draft MIME type must be text/plain or text/html, not {}",
            other.as_str()
        ))),
    }
}

impl BackendState {
    fn insert_message(&mut self, message: MessageRecord) -> Result<String> {
        let account_id = message.account_id.clone();
        let message_id = message.id.clone();

        self.account_mut(&account_id)?
            .message_ids
            .push(message_id.clone());
        self.messages.insert(message_id.clone(), message);
        self.record(&account_id, Update::MessageCreated(message_id.clone()))?;

        Ok(message_id)
    }

    fn message_view(&self, account_id: &str, message_id: &str) -> Result<Message> {
        self.message(account_id, message_id)
            .map(|m| m.to_message(&self.attachments, &self.payloads))
    }

    /// An existing message of the same address with the same sender,
    /// recipients and subject.
    fn find_duplicate(&self, candidate: &MessageRecord) -> Option<String> {
        self.account(&candidate.account_id)
            .ok()?
            .message_ids
            .iter()
            .filter_map(|id| self.messages.get(id))
            .find(|m| {
                m.address_id == candidate.address_id
                    && m.sender.address == candidate.sender.address
                    && m.subject == candidate.subject
                    && same_addresses(&m.to_list, &candidate.to_list)
                    && same_addresses(&m.cc_list, &candidate.cc_list)
                    && same_addresses(&m.bcc_list, &candidate.bcc_list)
            })
            .map(|m| m.id.clone())
    }

    /// Applies `f` to each message and records one update per message.
    /// Every ID is checked before anything changes.
    fn update_messages(
        &mut self,
        account_id: &str,
        message_ids: &[String],
        mut f: impl FnMut(&mut MessageRecord),
    ) -> Result<()> {
        self.check_messages(account_id, message_ids)?;

        for id in message_ids {
            f(self.message_mut(account_id, id)?);
            self.record(account_id, Update::MessageUpdated(id.clone()))?;
        }

        Ok(())
    }

    /// Hands a sent message to every recipient that is an enabled address in
    /// this backend. Returns the delivered copies' IDs.
    fn deliver(&mut self, sent_id: &str) -> Result<Vec<String>> {
        let sent = self
            .messages
            .get(sent_id)
            .cloned()
            .ok_or_else(|| BackendError::not_found("message", sent_id))?;

        let mut seen = HashSet::new();
        let targets: Vec<(String, String)> = sent
            .recipients()
            .filter(|r| seen.insert(r.address.to_ascii_lowercase()))
            .filter_map(|r| self.find_address(&r.address))
            .filter(|(_, address)| address.status == AddressStatus::Enabled)
            .map(|(account, address)| (account.id.clone(), address.id.clone()))
            .collect();

        let mut delivered = Vec::new();

        for (account_id, address_id) in targets {
            let mut copy = MessageRecord::new_delivered(&account_id, &address_id, &sent);

            for attachment_id in &sent.attachment_ids {
                let Some(original) = self.attachments.get(attachment_id).cloned() else {
                    continue;
                };

                if !self.payloads.retain(&original.payload_key) {
                    continue;
                }

                let attachment = AttachmentRecord {
                    id: uuid::Uuid::new_v4().to_string(),
                    message_id: copy.id.clone(),
                    ..original
                };
                copy.attachment_ids.push(attachment.id.clone());
                self.attachments.insert(attachment.id.clone(), attachment);
            }

            sort_attachments(&mut copy.attachment_ids, &self.attachments);

            tracing::debug!("Delivering {} to account {}", sent_id, account_id);
            delivered.push(self.insert_message(copy)?);
        }

        Ok(delivered)
    }
}

impl Backend {
    /// Creates a draft in the Drafts folder. A parent and action, when
    /// given, are applied to the parent once the draft is sent.
    pub async fn create_draft(
        &self,
        account_id: &str,
        address_id: &str,
        template: DraftTemplate,
        parent: Option<(&str, DraftAction)>,
    ) -> Result<Message> {
        self.write(|s| {
            let address = s.address(account_id, address_id)?;
            check_body_type(template.mime_type)?;

            if let Some((parent_id, _)) = parent {
                s.message(account_id, parent_id)?;
            }

            let sender = template.sender.clone().unwrap_or_else(|| {
                MailAddress::new(address.display_name.clone(), address.email.clone())
            });

            let mut draft = MessageRecord::new_draft(account_id, address_id, template);
            draft.sender = sender;
            if let Some((parent_id, action)) = parent {
                draft.parent_id = Some(parent_id.to_string());
                draft.action = Some(action);
            }

            let message_id = s.insert_message(draft)?;

            tracing::info!("Draft {} created in account {}", message_id, account_id);

            s.message_view(account_id, &message_id)
        })
        .await
    }

    /// Replaces a draft's fields. The sender and a text body type are
    /// required.
    pub async fn update_draft(
        &self,
        account_id: &str,
        draft_id: &str,
        changes: DraftTemplate,
    ) -> Result<Message> {
        self.write(|s| {
            match &changes.sender {
                Some(sender) if !sender.address.is_empty() => {}
                _ => return Err(BackendError::invalid_state("draft sender is required")),
            }
            check_body_type(changes.mime_type)?;

            if !s.message(account_id, draft_id)?.is_draft() {
                return Err(BackendError::invalid_state(format!(
                    "message {} is not a draft",
                    draft_id
                )));
            }

            s.message_mut(account_id, draft_id)?.apply_draft(changes);
            s.record(account_id, Update::MessageUpdated(draft_id.to_string()))?;

            s.message_view(account_id, draft_id)
        })
        .await
    }

    /// Sends a draft: it moves to Sent, its parent gets the reply/forward
    /// flag, and every internal recipient receives a copy.
    pub async fn send_message(&self, account_id: &str, message_id: &str) -> Result<Message> {
        self.write(|s| {
            let draft = s.message(account_id, message_id)?;
            if !draft.is_draft() {
                return Err(BackendError::invalid_state(format!(
                    "message {} is not a draft",
                    message_id
                )));
            }

            let parent = match (draft.parent_id.clone(), draft.action) {
                (Some(parent_id), Some(action)) if s.messages.contains_key(&parent_id) => {
                    Some((parent_id, action))
                }
                _ => None,
            };

            if let Some(message) = s.messages.get_mut(message_id) {
                message.flags |= MessageFlags::SENT;
                message.add_label(LabelTarget::System(SystemLabel::Sent), &s.labels);
                message.time = chrono::Utc::now();
            }

            if let Some((parent_id, action)) = parent {
                if let Some(parent) = s.messages.get_mut(&parent_id) {
                    parent.flags |= action.parent_flag();
                }
                s.record(account_id, Update::MessageUpdated(parent_id))?;
            }

            s.record(account_id, Update::MessageUpdated(message_id.to_string()))?;

            let delivered = s.deliver(message_id)?;

            tracing::info!(
                "Message {} sent from account {} ({} internal deliveries)",
                message_id,
                account_id,
                delivered.len()
            );

            s.message_view(account_id, message_id)
        })
        .await
    }

    /// Stores a received message as-is. With dedup enabled, a duplicate of
    /// an existing message returns that message's ID and records nothing.
    pub async fn import_message(
        &self,
        account_id: &str,
        address_id: &str,
        template: ImportTemplate,
    ) -> Result<String> {
        self.write(|s| {
            s.address(account_id, address_id)?;

            let message = MessageRecord::new_imported(account_id, address_id, template);

            if s.enable_dedup {
                if let Some(existing) = s.find_duplicate(&message) {
                    tracing::debug!("Import deduplicated onto {}", existing);
                    return Ok(existing);
                }
            }

            s.insert_message(message)
        })
        .await
    }

    /// Deletes a message and its attachments. Payloads shared with other
    /// attachments survive.
    pub async fn delete_message(&self, account_id: &str, message_id: &str) -> Result<()> {
        self.write(|s| {
            s.message(account_id, message_id)?;

            s.remove_message(message_id);
            s.account_mut(account_id)?
                .message_ids
                .retain(|id| id != message_id);
            s.record(account_id, Update::MessageDeleted(message_id.to_string()))?;

            tracing::info!("Message {} deleted from account {}", message_id, account_id);

            Ok(())
        })
        .await
    }

    pub async fn label_messages(
        &self,
        account_id: &str,
        label_id: &str,
        message_ids: &[String],
    ) -> Result<()> {
        self.write(|s| {
            s.account(account_id)?;
            let target = label_target(&s.labels, account_id, label_id)?;
            s.check_messages(account_id, message_ids)?;

            for id in message_ids {
                if let Some(message) = s.messages.get_mut(id) {
                    message.add_label(target, &s.labels);
                }
            }

            for id in message_ids {
                s.record(account_id, Update::MessageUpdated(id.clone()))?;
            }

            Ok(())
        })
        .await
    }

    pub async fn unlabel_messages(
        &self,
        account_id: &str,
        label_id: &str,
        message_ids: &[String],
    ) -> Result<()> {
        self.write(|s| {
            s.account(account_id)?;
            let target = label_target(&s.labels, account_id, label_id)?;
            s.check_messages(account_id, message_ids)?;

            for id in message_ids {
                if let Some(message) = s.messages.get_mut(id) {
                    message.remove_label(target);
                }
            }

            for id in message_ids {
                s.record(account_id, Update::MessageUpdated(id.clone()))?;
            }

            Ok(())
        })
        .await
    }

    pub async fn set_messages_read(
        &self,
        account_id: &str,
        read: bool,
        message_ids: &[String],
    ) -> Result<()> {
        self.write(|s| s.update_messages(account_id, message_ids, |m| m.unread = !read))
            .await
    }

    pub async fn set_messages_forwarded(
        &self,
        account_id: &str,
        forwarded: bool,
        message_ids: &[String],
    ) -> Result<()> {
        self.write(|s| {
            s.update_messages(account_id, message_ids, |m| {
                m.flags.set(MessageFlags::FORWARDED, forwarded)
            })
        })
        .await
    }

    pub async fn get_message(&self, account_id: &str, message_id: &str) -> Result<Message> {
        self.read(|s| s.message_view(account_id, message_id)).await
    }

    /// Metadata of the account's messages in creation order, optionally
    /// only those carrying `label_id`.
    pub async fn list_messages(
        &self,
        account_id: &str,
        label_id: Option<&str>,
    ) -> Result<Vec<MessageMetadata>> {
        self.read(|s| {
            Ok(s.account(account_id)?
                .message_ids
                .iter()
                .filter_map(|id| s.messages.get(id))
                .map(|m| s.metadata_view(m))
                .filter(|m| label_id.map_or(true, |l| m.has_label(l)))
                .collect())
        })
        .await
    }

    /// Message IDs in creation order, starting after `after` and at most
    /// `limit` long; 0 means no limit.
    pub async fn list_message_ids(
        &self,
        account_id: &str,
        after: Option<&str>,
        limit: usize,
    ) -> Result<Vec<String>> {
        self.read(|s| {
            let ids = &s.account(account_id)?.message_ids;

            let start = match after {
                Some(after) => ids
                    .iter()
                    .position(|id| id == after)
                    .map(|pos| pos + 1)
                    .ok_or_else(|| BackendError::not_found("message", after))?,
                None => 0,
            };

            let end = if limit == 0 {
                ids.len()
            } else {
                start.saturating_add(limit).min(ids.len())
            };

            Ok(ids[start..end].to_vec())
        })
        .await
    }

    /// One page of metadata matching `filter`.
    ///
    /// Messages are taken in creation order, or newest first when
    /// `filter.desc` is set. An `end_id` present in the listing makes it
    /// start at that message. Pages past the end are empty.
    pub async fn get_messages(
        &self,
        account_id: &str,
        page: usize,
        page_size: usize,
        filter: &MessageFilter,
    ) -> Result<Vec<MessageMetadata>> {
        if page_size == 0 {
            return Err(BackendError::invalid_state("page size must be positive"));
        }

        self.read(|s| {
            let mut metadata: Vec<MessageMetadata> = s
                .account(account_id)?
                .message_ids
                .iter()
                .filter_map(|id| s.messages.get(id))
                .map(|m| s.metadata_view(m))
                .collect();

            if filter.desc {
                metadata.reverse();
            }

            if let Some(end_id) = filter.end_id.as_deref() {
                if let Some(pos) = metadata.iter().position(|m| m.id == end_id) {
                    metadata.drain(..pos);
                }
            }

            Ok(metadata
                .into_iter()
                .filter(|m| filter.matches(m))
                .skip(page.saturating_mul(page_size))
                .take(page_size)
                .collect())
        })
        .await
    }

    pub async fn count_messages(&self, account_id: &str) -> Result<usize> {
        self.read(|s| Ok(s.account(account_id)?.message_ids.len()))
            .await
    }

    /// Total and unread counts per materialized label, ordered by label ID.
    pub async fn message_group_counts(&self, account_id: &str) -> Result<Vec<MessageGroupCount>> {
        self.read(|s| {
            let mut counts: BTreeMap<String, (usize, usize)> = BTreeMap::new();

            for message in s
                .account(account_id)?
                .message_ids
                .iter()
                .filter_map(|id| s.messages.get(id))
            {
                for label_id in message.materialized_label_ids() {
                    let entry = counts.entry(label_id).or_default();
                    entry.0 += 1;
                    if message.unread {
                        entry.1 += 1;
                    }
                }
            }

            Ok(counts
                .into_iter()
                .map(|(label_id, (total, unread))| MessageGroupCount {
                    label_id,
                    total,
                    unread,
                })
                .collect())
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::testutil::{add_user, backend_with_user};
    use crate::config::BackendConfig;
    use crate::event::EventAction;
    use crate::types::{label_id, AttachmentTemplate, Disposition, LabelType};
    use bytes::Bytes;
    use std::sync::Arc;

    fn draft_to(subject: &str, to: &[&str]) -> DraftTemplate {
        DraftTemplate {
            subject: subject.to_string(),
            to_list: to.iter().map(|a| MailAddress::new("", *a)).collect(),
            body: "body".to_string(),
            ..Default::default()
        }
    }

    fn import(subject: &str) -> ImportTemplate {
        ImportTemplate {
            subject: subject.to_string(),
            sender: MailAddress::new("Bob", "bob@y"),
            to_list: vec![MailAddress::new("", "alice@x")],
            body: "hello".to_string(),
            unread: true,
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_draft_defaults_sender_to_address() {
        let (backend, account_id, address_id) = backend_with_user("alice").await;
        let draft = backend
            .create_draft(&account_id, &address_id, draft_to("hi", &[]), None)
            .await
            .unwrap();

        assert_eq!(draft.metadata.sender.address, "alice@x");
        assert!(draft.metadata.has_label(label_id::DRAFTS));
        assert!(draft.metadata.has_label(label_id::ALL_DRAFTS));
        assert_eq!(backend.count_messages(&account_id).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_update_draft_validation() {
        let (backend, account_id, address_id) = backend_with_user("alice").await;
        let draft = backend
            .create_draft(&account_id, &address_id, draft_to("hi", &[]), None)
            .await
            .unwrap();
        let id = draft.metadata.id;

        assert!(matches!(
            backend
                .update_draft(&account_id, &id, draft_to("no sender", &[]))
                .await,
            Err(BackendError::InvalidState(_))
        ));

        let mut changes = draft_to("new", &["bob@y"]);
        changes.sender = Some(MailAddress::new("", "alice@x"));
        changes.mime_type = MimeType::MultipartMixed;
        assert!(matches!(
            backend.update_draft(&account_id, &id, changes.clone()).await,
            Err(BackendError::InvalidState(_))
        ));

        changes.mime_type = MimeType::TextHtml;
        let updated = backend.update_draft(&account_id, &id, changes).await.unwrap();
        assert_eq!(updated.metadata.subject, "new");
        assert_eq!(updated.mime_type, MimeType::TextHtml);
    }

    #[tokio::test]
    async fn test_starred_scenario() {
        let (backend, account_id, address_id) = backend_with_user("alice").await;
        let draft = backend
            .create_draft(&account_id, &address_id, draft_to("hi", &[]), None)
            .await
            .unwrap();
        let since = backend.get_latest_event_id(&account_id).await.unwrap();

        backend
            .label_messages(&account_id, label_id::STARRED, &[draft.metadata.id.clone()])
            .await
            .unwrap();

        let page = backend.get_event(&account_id, &since).await.unwrap();
        assert!(!page.more);
        assert_eq!(page.event.messages.len(), 1);

        let entry = &page.event.messages[0];
        assert_eq!(entry.id, draft.metadata.id);
        assert_eq!(entry.action, EventAction::Update);
        let metadata = entry.message.as_ref().unwrap();
        assert!(metadata.starred);
        assert!(metadata.has_label(label_id::STARRED));
    }

    #[tokio::test]
    async fn test_system_labels_exclusive_user_labels_kept() {
        let (backend, account_id, address_id) = backend_with_user("alice").await;
        let work = backend
            .create_label(&account_id, "work", None, LabelType::Label)
            .await
            .unwrap();
        let id = backend
            .import_message(&account_id, &address_id, import("hi"))
            .await
            .unwrap();
        let ids = [id.clone()];

        backend.label_messages(&account_id, &work.id, &ids).await.unwrap();
        backend
            .label_messages(&account_id, label_id::TRASH, &ids)
            .await
            .unwrap();
        backend
            .label_messages(&account_id, label_id::SPAM, &ids)
            .await
            .unwrap();

        let message = backend.get_message(&account_id, &id).await.unwrap().metadata;
        assert!(message.has_label(label_id::SPAM));
        assert!(!message.has_label(label_id::TRASH));
        assert!(!message.has_label(label_id::INBOX));
        assert!(message.has_label(&work.id));

        backend
            .unlabel_messages(&account_id, &work.id, &ids)
            .await
            .unwrap();
        let message = backend.get_message(&account_id, &id).await.unwrap().metadata;
        assert!(!message.has_label(&work.id));
        assert!(message.has_label(label_id::SPAM));
    }

    #[tokio::test]
    async fn test_aggregate_labels_not_assignable() {
        let (backend, account_id, address_id) = backend_with_user("alice").await;
        let id = backend
            .import_message(&account_id, &address_id, import("hi"))
            .await
            .unwrap();

        for label in [label_id::ALL_MAIL, label_id::ALL_DRAFTS, label_id::ALL_SENT] {
            assert!(matches!(
                backend
                    .label_messages(&account_id, label, &[id.clone()])
                    .await,
                Err(BackendError::InvalidState(_))
            ));
        }
    }

    #[tokio::test]
    async fn test_label_unknown_message_changes_nothing() {
        let (backend, account_id, address_id) = backend_with_user("alice").await;
        let id = backend
            .import_message(&account_id, &address_id, import("hi"))
            .await
            .unwrap();
        let before = backend.get_latest_event_id(&account_id).await.unwrap();

        let err = backend
            .label_messages(
                &account_id,
                label_id::STARRED,
                &[id.clone(), "missing".to_string()],
            )
            .await
            .unwrap_err();
        assert!(err.is_not_found());

        assert!(!backend.get_message(&account_id, &id).await.unwrap().metadata.starred);
        assert_eq!(backend.get_latest_event_id(&account_id).await.unwrap(), before);
    }

    #[tokio::test]
    async fn test_send_delivers_internally() {
        let (backend, alice, alice_addr) = backend_with_user("alice").await;
        let (bob, _) = add_user(&backend, "bob").await;

        let draft = backend
            .create_draft(&alice, &alice_addr, draft_to("hi", &["bob@x", "carol@elsewhere"]), None)
            .await
            .unwrap();
        backend
            .create_attachment(
                &alice,
                &draft.metadata.id,
                AttachmentTemplate {
                    filename: "a.txt".to_string(),
                    mime_type: "text/plain".to_string(),
                    disposition: Disposition::Attachment,
                    content_id: None,
                    key_packets: vec![1],
                    data: Bytes::from_static(b"shared"),
                    signature: None,
                },
            )
            .await
            .unwrap();

        let sent = backend.send_message(&alice, &draft.metadata.id).await.unwrap();
        assert!(sent.metadata.flags.contains(MessageFlags::SENT));
        assert!(sent.metadata.has_label(label_id::SENT));
        assert!(sent.metadata.has_label(label_id::ALL_SENT));
        assert!(!sent.metadata.has_label(label_id::DRAFTS));

        let inbox = backend
            .list_messages(&bob, Some(label_id::INBOX))
            .await
            .unwrap();
        assert_eq!(inbox.len(), 1);
        assert!(inbox[0].unread);
        assert_eq!(inbox[0].subject, "hi");
        assert_eq!(inbox[0].num_attachments, 1);

        // Deleting the sender's copy leaves the recipient's attachment intact.
        backend.delete_message(&alice, &draft.metadata.id).await.unwrap();
        let received = backend.get_message(&bob, &inbox[0].id).await.unwrap();
        let payload = backend
            .get_attachment_payload(&bob, &received.attachments[0].id)
            .await
            .unwrap();
        assert_eq!(payload, Bytes::from_static(b"shared"));

        assert!(matches!(
            backend.send_message(&alice, &draft.metadata.id).await,
            Err(BackendError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_send_twice_rejected() {
        let (backend, account_id, address_id) = backend_with_user("alice").await;
        let draft = backend
            .create_draft(&account_id, &address_id, draft_to("hi", &[]), None)
            .await
            .unwrap();
        backend.send_message(&account_id, &draft.metadata.id).await.unwrap();
        assert!(matches!(
            backend.send_message(&account_id, &draft.metadata.id).await,
            Err(BackendError::InvalidState(_))
        ));
    }

    #[tokio::test]
    async fn test_reply_flags_parent() {
        let (backend, account_id, address_id) = backend_with_user("alice").await;
        let parent = backend
            .import_message(&account_id, &address_id, import("question"))
            .await
            .unwrap();

        let reply = backend
            .create_draft(
                &account_id,
                &address_id,
                draft_to("Re: question", &["bob@y"]),
                Some((&parent, DraftAction::ReplyAll)),
            )
            .await
            .unwrap();
        let since = backend.get_latest_event_id(&account_id).await.unwrap();

        backend.send_message(&account_id, &reply.metadata.id).await.unwrap();

        let parent_view = backend.get_message(&account_id, &parent).await.unwrap();
        assert!(parent_view.metadata.flags.contains(MessageFlags::REPLIED_ALL));

        let event = backend.get_event(&account_id, &since).await.unwrap().event;
        let ids: Vec<&str> = event.messages.iter().map(|m| m.id.as_str()).collect();
        assert_eq!(ids, vec![parent.as_str(), reply.metadata.id.as_str()]);
    }

    #[tokio::test]
    async fn test_import_dedup() {
        let backend = Backend::new(BackendConfig {
            enable_dedup: true,
            ..Default::default()
        });
        let (account_id, address_id) = add_user(&backend, "alice").await;

        let first = backend
            .import_message(&account_id, &address_id, import("same"))
            .await
            .unwrap();
        let second = backend
            .import_message(&account_id, &address_id, import("same"))
            .await
            .unwrap();
        let third = backend
            .import_message(&account_id, &address_id, import("different"))
            .await
            .unwrap();

        assert_eq!(first, second);
        assert_ne!(first, third);
        assert_eq!(backend.count_messages(&account_id).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_message_ids_paging() {
        let (backend, account_id, address_id) = backend_with_user("alice").await;
        let mut ids = Vec::new();
        for i in 0..5 {
            ids.push(
                backend
                    .import_message(&account_id, &address_id, import(&format!("m{}", i)))
                    .await
                    .unwrap(),
            );
        }

        let first = backend
            .list_message_ids(&account_id, None, 2)
            .await
            .unwrap();
        assert_eq!(first, ids[..2]);

        let rest = backend
            .list_message_ids(&account_id, Some(&first[1]), 0)
            .await
            .unwrap();
        assert_eq!(rest, ids[2..]);
        let unbounded = backend
            .list_message_ids(&account_id, Some(&first[0]), usize::MAX)
            .await
            .unwrap();
        assert_eq!(unbounded, ids[1..]);
    }

    #[tokio::test]
    async fn test_get_messages_pages_and_filters() {
        let (backend, account_id, address_id) = backend_with_user("alice").await;
        let mut ids = Vec::new();
        for subject in ["report 1", "lunch", "report 2", "report 3"] {
            ids.push(
                backend
                    .import_message(&account_id, &address_id, import(subject))
                    .await
                    .unwrap(),
            );
        }
        backend
            .label_messages(&account_id, label_id::ARCHIVE, &[ids[3].clone()])
            .await
            .unwrap();

        let page_ids = |page: Vec<MessageMetadata>| -> Vec<String> {
            page.into_iter().map(|m| m.id).collect()
        };

        let reports = MessageFilter {
            subject: Some("report".to_string()),
            ..Default::default()
        };
        let first = backend
            .get_messages(&account_id, 0, 2, &reports)
            .await
            .unwrap();
        assert_eq!(page_ids(first), vec![ids[0].clone(), ids[2].clone()]);
        let second = backend
            .get_messages(&account_id, 1, 2, &reports)
            .await
            .unwrap();
        assert_eq!(page_ids(second), vec![ids[3].clone()]);
        assert!(backend
            .get_messages(&account_id, 5, 2, &reports)
            .await
            .unwrap()
            .is_empty());

        let newest_first = MessageFilter {
            desc: true,
            end_id: Some(ids[2].clone()),
            ..Default::default()
        };
        let listed = backend
            .get_messages(&account_id, 0, 10, &newest_first)
            .await
            .unwrap();
        assert_eq!(
            page_ids(listed),
            vec![ids[2].clone(), ids[1].clone(), ids[0].clone()]
        );

        let inbox = MessageFilter {
            label_id: Some(label_id::INBOX.to_string()),
            address_id: Some(address_id.clone()),
            ids: vec![ids[1].clone(), ids[3].clone()],
            ..Default::default()
        };
        let listed = backend
            .get_messages(&account_id, 0, 10, &inbox)
            .await
            .unwrap();
        assert_eq!(page_ids(listed), vec![ids[1].clone()]);

        assert!(matches!(
            backend
                .get_messages(&account_id, 0, 0, &MessageFilter::default())
                .await,
            Err(BackendError::InvalidState(_))
        ));
        assert!(backend
            .get_messages(&account_id, usize::MAX, usize::MAX, &reports)
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn test_read_forwarded_and_counts() {
        let (backend, account_id, address_id) = backend_with_user("alice").await;
        let a = backend
            .import_message(&account_id, &address_id, import("a"))
            .await
            .unwrap();
        backend
            .import_message(&account_id, &address_id, import("b"))
            .await
            .unwrap();

        backend
            .set_messages_read(&account_id, true, &[a.clone()])
            .await
            .unwrap();
        backend
            .set_messages_forwarded(&account_id, true, &[a.clone()])
            .await
            .unwrap();

        let message = backend.get_message(&account_id, &a).await.unwrap().metadata;
        assert!(!message.unread);
        assert!(message.flags.contains(MessageFlags::FORWARDED));

        let counts = backend.message_group_counts(&account_id).await.unwrap();
        let inbox = counts
            .iter()
            .find(|c| c.label_id == label_id::INBOX)
            .unwrap();
        assert_eq!((inbox.total, inbox.unread), (2, 1));
        assert!(counts.iter().any(|c| c.label_id == label_id::ALL_MAIL));
    }

    #[tokio::test]
    async fn test_messages_are_per_account() {
        let (backend, alice, address_id) = backend_with_user("alice").await;
        let (bob, _) = add_user(&backend, "bob").await;
        let id = backend
            .import_message(&alice, &address_id, import("private"))
            .await
            .unwrap();

        assert!(backend.get_message(&bob, &id).await.unwrap_err().is_not_found());
        assert!(backend
            .delete_message(&bob, &id)
            .await
            .unwrap_err()
            .is_not_found());
        assert!(backend
            .create_draft(&bob, &address_id, DraftTemplate::default(), None)
            .await
            .unwrap_err()
            .is_not_found());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_mutations_are_linearized() {
        let (backend, account_id, address_id) = backend_with_user("alice").await;
        let backend = Arc::new(backend);
        let since = backend.get_latest_event_id(&account_id).await.unwrap();

        let mut tasks = Vec::new();
        for i in 0..32 {
            let backend = backend.clone();
            let account_id = account_id.clone();
            let address_id = address_id.clone();
            tasks.push(tokio::spawn(async move {
                let id = backend
                    .import_message(&account_id, &address_id, import(&format!("m{}", i)))
                    .await
                    .unwrap();
                backend
                    .label_messages(&account_id, label_id::STARRED, &[id.clone()])
                    .await
                    .unwrap();
                id
            }));
        }

        let mut readers = Vec::new();
        for _ in 0..8 {
            let backend = backend.clone();
            let account_id = account_id.clone();
            let since = since.clone();
            readers.push(tokio::spawn(async move {
                for _ in 0..10 {
                    let page = backend.get_event(&account_id, &since).await.unwrap();
                    // Every created message is already fully visible.
                    for entry in &page.event.messages {
                        assert!(entry.message.is_some());
                    }
                }
            }));
        }

        let mut ids = HashSet::new();
        for task in tasks {
            ids.insert(task.await.unwrap());
        }
        for reader in readers {
            reader.await.unwrap();
        }

        let page = backend.get_event(&account_id, &since).await.unwrap();
        assert!(!page.more);
        let created: HashSet<String> = page
            .event
            .messages
            .iter()
            .filter(|m| m.action == EventAction::Create)
            .map(|m| m.id.clone())
            .collect();
        assert_eq!(created, ids);
        assert!(page
            .event
            .messages
            .iter()
            .all(|m| m.message.as_ref().unwrap().starred));
    }
}
