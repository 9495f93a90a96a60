use base64::engine::general_purpose::STANDARD as BASE64_STANDARD;
use base64::Engine;
use std::collections::HashMap;

use crate::storage::PayloadStore;
use crate::types::{Attachment, Disposition};

/// Per-attachment metadata. The bytes live in the [`PayloadStore`] under
/// `payload_key`, shared with every attachment carrying identical data.
#[derive(Debug, Clone)]
pub struct AttachmentRecord {
    pub id: String,
    pub message_id: String,
    pub payload_key: String,
    pub filename: String,
    pub mime_type: String,
    pub disposition: Disposition,
    pub content_id: Option<String>,
    pub key_packets: Vec<u8>,
    pub signature: Option<String>,
}

impl AttachmentRecord {
    pub fn to_attachment(&self, payloads: &PayloadStore) -> Attachment {
        Attachment {
            id: self.id.clone(),
            name: self.filename.clone(),
            mime_type: self.mime_type.clone(),
            disposition: self.disposition,
            content_id: self.content_id.clone(),
            size: payloads.size_of(&self.payload_key),
            key_packets: BASE64_STANDARD.encode(&self.key_packets),
            signature: self.signature.clone(),
        }
    }
}

/// Orders attachment IDs for display: those with a content ID first, by
/// content ID, then the rest by filename.
pub fn sort_attachments(ids: &mut [String], attachments: &HashMap<String, AttachmentRecord>) {
    ids.sort_by(|a, b| {
        let key = |id: &String| {
            attachments
                .get(id)
                .map(|att| match &att.content_id {
                    Some(cid) => (0, cid.clone()),
                    None => (1, att.filename.clone()),
                })
                .unwrap_or((2, String::new()))
        };
        key(a).cmp(&key(b))
    });
}
