use chrono::{DateTime, Utc};
use std::collections::HashMap;
use uuid::Uuid;

use crate::entities::{AttachmentRecord, LabelRecord};
use crate::storage::PayloadStore;
use crate::types::{
    label_id, DraftAction, DraftTemplate, ImportTemplate, LabelType, MailAddress, Message,
    MessageFlags, MessageMetadata, MimeType, SystemLabel,
};

/// What a label ID resolves to when applied to a message.
#[derive(Debug, Clone, Copy)]
pub enum LabelTarget<'a> {
    System(SystemLabel),
    Starred,
    User(&'a LabelRecord),
}

#[derive(Debug, Clone)]
pub struct MessageRecord {
    pub id: String,
    pub account_id: String,
    pub address_id: String,
    pub external_id: Option<String>,

    /// User labels and folders. Independent of `system_label`.
    pub label_ids: Vec<String>,
    pub system_label: Option<SystemLabel>,
    pub attachment_ids: Vec<String>,

    pub subject: String,
    pub sender: MailAddress,
    pub to_list: Vec<MailAddress>,
    pub cc_list: Vec<MailAddress>,
    pub bcc_list: Vec<MailAddress>,
    pub reply_tos: Vec<MailAddress>,
    pub time: DateTime<Utc>,

    pub body: String,
    pub mime_type: MimeType,

    pub flags: MessageFlags,
    pub unread: bool,
    pub starred: bool,

    pub parent_id: Option<String>,
    pub action: Option<DraftAction>,
}

impl MessageRecord {
    pub fn new_draft(account_id: &str, address_id: &str, template: DraftTemplate) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            account_id: account_id.to_string(),
            address_id: address_id.to_string(),
            external_id: template.external_id,
            label_ids: Vec::new(),
            system_label: Some(SystemLabel::Drafts),
            attachment_ids: Vec::new(),
            subject: template.subject,
            sender: template.sender.unwrap_or_default(),
            to_list: template.to_list,
            cc_list: template.cc_list,
            bcc_list: template.bcc_list,
            reply_tos: Vec::new(),
            time: Utc::now(),
            body: template.body,
            mime_type: template.mime_type,
            flags: MessageFlags::empty(),
            unread: template.unread,
            starred: false,
            parent_id: None,
            action: None,
        }
    }

    /// An imported message lands in Sent when flagged as sent, otherwise in
    /// the inbox as received mail.
    pub fn new_imported(account_id: &str, address_id: &str, template: ImportTemplate) -> Self {
        let (system_label, direction) = if template.flags.contains(MessageFlags::SENT) {
            (SystemLabel::Sent, MessageFlags::SENT)
        } else {
            (SystemLabel::Inbox, MessageFlags::RECEIVED)
        };

        Self {
            id: Uuid::new_v4().to_string(),
            account_id: account_id.to_string(),
            address_id: address_id.to_string(),
            external_id: None,
            label_ids: Vec::new(),
            system_label: Some(system_label),
            attachment_ids: Vec::new(),
            subject: template.subject,
            sender: template.sender,
            to_list: template.to_list,
            cc_list: template.cc_list,
            bcc_list: template.bcc_list,
            reply_tos: template.reply_tos,
            time: Utc::now(),
            body: template.body,
            mime_type: template.mime_type,
            flags: template.flags | direction | MessageFlags::IMPORTED,
            unread: template.unread,
            starred: template.starred,
            parent_id: None,
            action: None,
        }
    }

    /// The copy a recipient account receives when `sent` is delivered.
    /// Attachments are attached by the caller.
    pub fn new_delivered(account_id: &str, address_id: &str, sent: &MessageRecord) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            account_id: account_id.to_string(),
            address_id: address_id.to_string(),
            external_id: sent.external_id.clone(),
            label_ids: Vec::new(),
            system_label: Some(SystemLabel::Inbox),
            attachment_ids: Vec::new(),
            subject: sent.subject.clone(),
            sender: sent.sender.clone(),
            to_list: sent.to_list.clone(),
            cc_list: sent.cc_list.clone(),
            bcc_list: Vec::new(),
            reply_tos: sent.reply_tos.clone(),
            time: Utc::now(),
            body: sent.body.clone(),
            mime_type: sent.mime_type,
            flags: MessageFlags::RECEIVED | MessageFlags::INTERNAL,
            unread: true,
            starred: false,
            parent_id: None,
            action: None,
        }
    }

    pub fn is_draft(&self) -> bool {
        !self
            .flags
            .intersects(MessageFlags::SENT | MessageFlags::RECEIVED)
    }

    /// Every recipient address, in to/cc/bcc order.
    pub fn recipients(&self) -> impl Iterator<Item = &MailAddress> {
        self.to_list
            .iter()
            .chain(self.cc_list.iter())
            .chain(self.bcc_list.iter())
    }

    /// Replaces draft fields. Empty subject and body leave the old value.
    pub fn apply_draft(&mut self, changes: DraftTemplate) {
        if !changes.subject.is_empty() {
            self.subject = changes.subject;
        }

        if let Some(sender) = changes.sender {
            self.sender = sender;
        }

        self.to_list = changes.to_list;
        self.cc_list = changes.cc_list;
        self.bcc_list = changes.bcc_list;

        if !changes.body.is_empty() {
            self.body = changes.body;
        }

        self.mime_type = changes.mime_type;

        if changes.external_id.is_some() {
            self.external_id = changes.external_id;
        }
    }

    fn retain_plain_labels(&mut self, labels: &HashMap<String, LabelRecord>) {
        self.label_ids.retain(|id| {
            labels
                .get(id)
                .map(|l| l.label_type == LabelType::Label)
                .unwrap_or(false)
        });
    }

    /// Adds a label. A system location replaces the previous one and evicts
    /// folders; a folder clears the system location and evicts other folders;
    /// a plain label touches nothing else.
    pub fn add_label(&mut self, target: LabelTarget<'_>, labels: &HashMap<String, LabelRecord>) {
        match target {
            LabelTarget::System(system) => {
                self.retain_plain_labels(labels);
                self.system_label = Some(system);
            }

            LabelTarget::Starred => self.starred = true,

            LabelTarget::User(label) => {
                if label.label_type == LabelType::Folder {
                    self.retain_plain_labels(labels);
                    self.system_label = None;
                }

                if !self.label_ids.contains(&label.id) {
                    self.label_ids.push(label.id.clone());
                }
            }
        }
    }

    pub fn remove_label(&mut self, target: LabelTarget<'_>) {
        match target {
            LabelTarget::System(system) => {
                if self.system_label == Some(system) {
                    self.system_label = None;
                }
            }

            LabelTarget::Starred => self.starred = false,

            LabelTarget::User(label) => self.label_ids.retain(|id| id != &label.id),
        }
    }

    /// The label IDs a client sees: memberships plus the implicit built-ins.
    pub fn materialized_label_ids(&self) -> Vec<String> {
        let mut ids = self.label_ids.clone();

        ids.push(label_id::ALL_MAIL.to_string());

        if self.flags.contains(MessageFlags::SENT) {
            ids.push(label_id::ALL_SENT.to_string());
        }

        if self.is_draft() {
            ids.push(label_id::ALL_DRAFTS.to_string());
        }

        if self.starred {
            ids.push(label_id::STARRED.to_string());
        }

        if let Some(system) = self.system_label {
            ids.push(system.id().to_string());
        }

        ids
    }

    pub fn size(&self, attachments: &HashMap<String, AttachmentRecord>, payloads: &PayloadStore) -> usize {
        self.body.len()
            + self
                .attachment_ids
                .iter()
                .filter_map(|id| attachments.get(id))
                .map(|att| payloads.size_of(&att.payload_key))
                .sum::<usize>()
    }

    pub fn to_metadata(
        &self,
        attachments: &HashMap<String, AttachmentRecord>,
        payloads: &PayloadStore,
    ) -> MessageMetadata {
        MessageMetadata {
            id: self.id.clone(),
            external_id: self.external_id.clone(),
            address_id: self.address_id.clone(),
            label_ids: self.materialized_label_ids(),
            subject: self.subject.clone(),
            sender: self.sender.clone(),
            to_list: self.to_list.clone(),
            cc_list: self.cc_list.clone(),
            bcc_list: self.bcc_list.clone(),
            reply_tos: self.reply_tos.clone(),
            time: self.time.timestamp(),
            size: self.size(attachments, payloads),
            flags: self.flags,
            unread: self.unread,
            starred: self.starred,
            num_attachments: self.attachment_ids.len(),
        }
    }

    pub fn to_message(
        &self,
        attachments: &HashMap<String, AttachmentRecord>,
        payloads: &PayloadStore,
    ) -> Message {
        Message {
            metadata: self.to_metadata(attachments, payloads),
            header: self.header(),
            body: self.body.clone(),
            mime_type: self.mime_type,
            attachments: self
                .attachment_ids
                .iter()
                .filter_map(|id| attachments.get(id))
                .map(|att| att.to_attachment(payloads))
                .collect(),
        }
    }

    fn header(&self) -> String {
        let join = |list: &[MailAddress]| {
            list.iter()
                .map(|a| a.to_string())
                .collect::<Vec<_>>()
                .join(", ")
        };

        let mut header = format!("Subject: {}\r\n", self.subject);

        if !self.sender.address.is_empty() || !self.sender.name.is_empty() {
            header.push_str(&format!("From: {}\r\n", self.sender));
        }
        if !self.to_list.is_empty() {
            header.push_str(&format!("To: {}\r\n", join(&self.to_list)));
        }
        if !self.cc_list.is_empty() {
            header.push_str(&format!("Cc: {}\r\n", join(&self.cc_list)));
        }
        if !self.bcc_list.is_empty() {
            header.push_str(&format!("Bcc: {}\r\n", join(&self.bcc_list)));
        }

        header.push_str(&format!("Content-Type: {}\r\n", self.mime_type.as_str()));
        header.push_str(&format!("Date: {}\r\n", self.time.to_rfc2822()));

        header
    }
}
