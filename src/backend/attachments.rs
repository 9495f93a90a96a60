use bytes::Bytes;
use uuid::Uuid;

use super::Backend;
use crate::entities::attachment::sort_attachments;
use crate::entities::AttachmentRecord;
use crate::error::{BackendError, Result};
use crate::types::{Attachment, AttachmentTemplate, Disposition};
use crate::update::Update;

impl Backend {
    /// Attaches a payload to a message. Identical payloads are stored once.
    pub async fn create_attachment(
        &self,
        account_id: &str,
        message_id: &str,
        template: AttachmentTemplate,
    ) -> Result<Attachment> {
        self.write(|s| {
            s.message(account_id, message_id)?;

            if template.disposition == Disposition::Inline
                && template.content_id.as_deref().map_or(true, str::is_empty)
            {
                return Err(BackendError::invalid_state(
                    "inline attachment requires a content ID",
                ));
            }

            let payload_key = s.payloads.retain_data(template.data);
            let attachment = AttachmentRecord {
                id: Uuid::new_v4().to_string(),
                message_id: message_id.to_string(),
                payload_key,
                filename: template.filename,
                mime_type: template.mime_type,
                disposition: template.disposition,
                content_id: template.content_id,
                key_packets: template.key_packets,
                signature: template.signature,
            };
            let attachment_id = attachment.id.clone();
            let view = attachment.to_attachment(&s.payloads);

            s.attachments.insert(attachment_id.clone(), attachment);
            if let Some(message) = s.messages.get_mut(message_id) {
                message.attachment_ids.push(attachment_id.clone());
                sort_attachments(&mut message.attachment_ids, &s.attachments);
            }

            s.record(account_id, Update::MessageUpdated(message_id.to_string()))?;

            tracing::debug!(
                "Attachment {} ({} bytes) added to message {}",
                attachment_id,
                view.size,
                message_id
            );

            Ok(view)
        })
        .await
    }

    pub async fn get_attachment(&self, account_id: &str, attachment_id: &str) -> Result<Attachment> {
        self.read(|s| {
            s.attachment(account_id, attachment_id)
                .map(|a| a.to_attachment(&s.payloads))
        })
        .await
    }

    pub async fn get_attachment_payload(
        &self,
        account_id: &str,
        attachment_id: &str,
    ) -> Result<Bytes> {
        self.read(|s| {
            let attachment = s.attachment(account_id, attachment_id)?;
            s.payloads
                .get(&attachment.payload_key)
                .ok_or_else(|| BackendError::not_found("payload", &attachment.payload_key))
        })
        .await
    }

    /// Detaches an attachment from its message and drops its payload
    /// reference.
    pub async fn delete_attachment(&self, account_id: &str, attachment_id: &str) -> Result<()> {
        self.write(|s| {
            let message_id = s.attachment(account_id, attachment_id)?.message_id.clone();

            s.remove_attachment(attachment_id);
            if let Some(message) = s.messages.get_mut(&message_id) {
                message.attachment_ids.retain(|id| id != attachment_id);
            }

            s.record(account_id, Update::MessageUpdated(message_id))?;

            Ok(())
        })
        .await
    }
}
