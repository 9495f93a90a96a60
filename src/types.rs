//! Public value types: enums, flag sets, input templates and the
//! materialized views the backend hands to its callers.
//!
//! Views are snapshots. Nothing here references live backend state.

use bitflags::bitflags;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::fmt;

/// IDs of the built-in labels every account has.
pub mod label_id {
    pub const INBOX: &str = "0";
    pub const ALL_DRAFTS: &str = "1";
    pub const ALL_SENT: &str = "2";
    pub const TRASH: &str = "3";
    pub const SPAM: &str = "4";
    pub const ALL_MAIL: &str = "5";
    pub const ARCHIVE: &str = "6";
    pub const SENT: &str = "7";
    pub const DRAFTS: &str = "8";
    pub const OUTBOX: &str = "9";
    pub const STARRED: &str = "10";
    pub const ALL_SCHEDULED: &str = "12";
}

/// The mutually exclusive mailbox locations. A message sits in at most one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SystemLabel {
    Inbox,
    Sent,
    Drafts,
    Trash,
    Spam,
    Archive,
}

impl SystemLabel {
    pub fn id(self) -> &'static str {
        match self {
            SystemLabel::Inbox => label_id::INBOX,
            SystemLabel::Sent => label_id::SENT,
            SystemLabel::Drafts => label_id::DRAFTS,
            SystemLabel::Trash => label_id::TRASH,
            SystemLabel::Spam => label_id::SPAM,
            SystemLabel::Archive => label_id::ARCHIVE,
        }
    }

    pub fn from_id(id: &str) -> Option<Self> {
        match id {
            label_id::INBOX => Some(SystemLabel::Inbox),
            label_id::SENT => Some(SystemLabel::Sent),
            label_id::DRAFTS => Some(SystemLabel::Drafts),
            label_id::TRASH => Some(SystemLabel::Trash),
            label_id::SPAM => Some(SystemLabel::Spam),
            label_id::ARCHIVE => Some(SystemLabel::Archive),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LabelType {
    System,
    Label,
    Folder,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AddressStatus {
    Disabled,
    Enabled,
    Deleting,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AddressType {
    Original,
    Alias,
    Custom,
    Premium,
    External,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Disposition {
    Attachment,
    Inline,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum MimeType {
    #[default]
    #[serde(rename = "text/plain")]
    TextPlain,
    #[serde(rename = "text/html")]
    TextHtml,
    #[serde(rename = "multipart/mixed")]
    MultipartMixed,
}

impl MimeType {
    pub fn as_str(self) -> &'static str {
        match self {
            MimeType::TextPlain => "text/plain",
            MimeType::TextHtml => "text/html",
            MimeType::MultipartMixed => "multipart/mixed",
        }
    }
}

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    pub struct MessageFlags: u64 {
        const RECEIVED = 1 << 0;
        const SENT = 1 << 1;
        const INTERNAL = 1 << 2;
        const E2E = 1 << 3;
        const AUTO = 1 << 4;
        const REPLIED = 1 << 5;
        const REPLIED_ALL = 1 << 6;
        const FORWARDED = 1 << 7;
        const AUTO_REPLIED = 1 << 8;
        const IMPORTED = 1 << 9;
        const OPENED = 1 << 10;
    }
}

bitflags! {
    /// What a client must resynchronize after a full refresh.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    pub struct RefreshFlag: u8 {
        const MAIL = 1;
        const ALL = 0xFF;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DraftAction {
    Reply,
    ReplyAll,
    Forward,
}

impl DraftAction {
    /// Flag set on the parent message once the draft is sent.
    pub fn parent_flag(self) -> MessageFlags {
        match self {
            DraftAction::Reply => MessageFlags::REPLIED,
            DraftAction::ReplyAll => MessageFlags::REPLIED_ALL,
            DraftAction::Forward => MessageFlags::FORWARDED,
        }
    }
}

/// Authorization level of a session, ordered from weakest to strongest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Scope {
    None,
    PendingTwoFactor,
    Full,
}

impl Scope {
    pub fn satisfies(self, required: Scope) -> bool {
        self >= required
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct MailAddress {
    pub name: String,
    pub address: String,
}

impl MailAddress {
    pub fn new(name: impl Into<String>, address: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            address: address.into(),
        }
    }
}

impl fmt::Display for MailAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.name.is_empty() {
            write!(f, "<{}>", self.address)
        } else {
            write!(f, "\"{}\" <{}>", self.name, self.address)
        }
    }
}

// ========== Input templates ==========

/// Contents of a draft, used both to create one and to replace its fields.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct DraftTemplate {
    pub subject: String,
    pub sender: Option<MailAddress>,
    #[serde(default)]
    pub to_list: Vec<MailAddress>,
    #[serde(default)]
    pub cc_list: Vec<MailAddress>,
    #[serde(default)]
    pub bcc_list: Vec<MailAddress>,
    #[serde(default)]
    pub body: String,
    #[serde(default, rename = "MIMEType")]
    pub mime_type: MimeType,
    pub external_id: Option<String>,
    #[serde(default)]
    pub unread: bool,
}

/// A received message handed to the backend as-is.
#[derive(Debug, Clone, Default)]
pub struct ImportTemplate {
    pub subject: String,
    pub sender: MailAddress,
    pub to_list: Vec<MailAddress>,
    pub cc_list: Vec<MailAddress>,
    pub bcc_list: Vec<MailAddress>,
    pub reply_tos: Vec<MailAddress>,
    pub body: String,
    pub mime_type: MimeType,
    pub flags: MessageFlags,
    pub unread: bool,
    pub starred: bool,
}

#[derive(Debug, Clone)]
pub struct AttachmentTemplate {
    pub filename: String,
    pub mime_type: String,
    pub disposition: Disposition,
    pub content_id: Option<String>,
    pub key_packets: Vec<u8>,
    pub data: Bytes,
    pub signature: Option<String>,
}

/// Criteria for paged message listing. Empty fields match everything.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct MessageFilter {
    #[serde(default, rename = "ID")]
    pub ids: Vec<String>,
    pub subject: Option<String>,
    #[serde(rename = "AddressID")]
    pub address_id: Option<String>,
    #[serde(rename = "ExternalID")]
    pub external_id: Option<String>,
    #[serde(rename = "LabelID")]
    pub label_id: Option<String>,
    /// Listing starts at this message, in the chosen direction.
    #[serde(rename = "EndID")]
    pub end_id: Option<String>,
    #[serde(default)]
    pub desc: bool,
}

impl MessageFilter {
    pub fn matches(&self, metadata: &MessageMetadata) -> bool {
        (self.ids.is_empty() || self.ids.contains(&metadata.id))
            && self
                .subject
                .as_deref()
                .map_or(true, |s| metadata.subject.contains(s))
            && self
                .address_id
                .as_deref()
                .map_or(true, |id| metadata.address_id == id)
            && self
                .external_id
                .as_deref()
                .map_or(true, |id| metadata.external_id.as_deref() == Some(id))
            && self.label_id.as_deref().map_or(true, |id| metadata.has_label(id))
    }
}

// ========== Views ==========

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Key {
    #[serde(rename = "ID")]
    pub id: String,
    pub private_key: String,
    pub token: Option<String>,
    pub signature: Option<String>,
    pub primary: bool,
    pub active: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct User {
    #[serde(rename = "ID")]
    pub id: String,
    pub name: String,
    pub display_name: String,
    pub email: String,
    pub used_space: u64,
    pub keys: Vec<Key>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct UserSettings {
    pub telemetry: bool,
    pub crash_reports: bool,
}

impl Default for UserSettings {
    fn default() -> Self {
        Self {
            telemetry: true,
            crash_reports: true,
        }
    }
}

/// How mail to a recipient is protected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum EncryptionScheme {
    #[default]
    Internal,
    EncryptedOutside,
    Clear,
    PgpInline,
    PgpMime,
    ClearMime,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct MailSettings {
    pub display_name: String,
    #[serde(rename = "DraftMIMEType")]
    pub draft_mime_type: MimeType,
    pub attach_public_key: bool,
    pub sign: bool,
    #[serde(rename = "PGPScheme")]
    pub pgp_scheme: EncryptionScheme,
}

impl MailSettings {
    pub fn new(display_name: &str) -> Self {
        Self {
            display_name: display_name.to_string(),
            draft_mime_type: MimeType::TextHtml,
            attach_public_key: false,
            sign: false,
            pgp_scheme: EncryptionScheme::default(),
        }
    }
}

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    pub struct KeyState: u8 {
        const TRUSTED = 1 << 0;
        const ACTIVE = 1 << 1;
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct PublicKey {
    pub flags: KeyState,
    pub public_key: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct KeySalt {
    #[serde(rename = "ID")]
    pub id: String,
    pub key_salt: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Address {
    #[serde(rename = "ID")]
    pub id: String,
    pub email: String,
    pub display_name: String,
    pub order: usize,
    pub status: AddressStatus,
    #[serde(rename = "Type")]
    pub address_type: AddressType,
    pub send: bool,
    pub receive: bool,
    pub keys: Vec<Key>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Label {
    #[serde(rename = "ID")]
    pub id: String,
    #[serde(rename = "ParentID")]
    pub parent_id: Option<String>,
    pub name: String,
    pub path: Vec<String>,
    #[serde(rename = "Type")]
    pub label_type: LabelType,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Attachment {
    #[serde(rename = "ID")]
    pub id: String,
    pub name: String,
    #[serde(rename = "MIMEType")]
    pub mime_type: String,
    pub disposition: Disposition,
    #[serde(rename = "ContentID")]
    pub content_id: Option<String>,
    pub size: usize,
    pub key_packets: String,
    pub signature: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct MessageMetadata {
    #[serde(rename = "ID")]
    pub id: String,
    #[serde(rename = "ExternalID")]
    pub external_id: Option<String>,
    #[serde(rename = "AddressID")]
    pub address_id: String,
    #[serde(rename = "LabelIDs")]
    pub label_ids: Vec<String>,
    pub subject: String,
    pub sender: MailAddress,
    pub to_list: Vec<MailAddress>,
    #[serde(rename = "CCList")]
    pub cc_list: Vec<MailAddress>,
    #[serde(rename = "BCCList")]
    pub bcc_list: Vec<MailAddress>,
    pub reply_tos: Vec<MailAddress>,
    pub time: i64,
    pub size: usize,
    pub flags: MessageFlags,
    pub unread: bool,
    pub starred: bool,
    pub num_attachments: usize,
}

impl MessageMetadata {
    pub fn has_label(&self, label_id: &str) -> bool {
        self.label_ids.iter().any(|id| id == label_id)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Message {
    #[serde(flatten)]
    pub metadata: MessageMetadata,
    pub header: String,
    pub body: String,
    #[serde(rename = "MIMEType")]
    pub mime_type: MimeType,
    pub attachments: Vec<Attachment>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct MessageGroupCount {
    #[serde(rename = "LabelID")]
    pub label_id: String,
    pub total: usize,
    pub unread: usize,
}

// ========== Authentication ==========

/// First half of the credential exchange.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct AuthInfo {
    pub version: u8,
    pub salt: String,
    pub server_ephemeral: String,
    #[serde(rename = "SRPSession")]
    pub srp_session: String,
}

/// Second half of the credential exchange, computed by the client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Credentials {
    #[serde(rename = "SRPSession")]
    pub srp_session: String,
    pub client_proof: String,
}

/// An issued token pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Session {
    #[serde(rename = "UID")]
    pub uid: String,
    #[serde(rename = "UserID")]
    pub account_id: String,
    pub access_token: String,
    pub refresh_token: String,
    pub scope: Scope,
    pub server_proof: Option<String>,
    pub create_time: i64,
}

/// Listing entry for an account's sessions. Carries no tokens.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct SessionInfo {
    #[serde(rename = "UID")]
    pub uid: String,
    pub scope: Scope,
    pub create_time: i64,
}

/// Outcome of a successful token check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Authorization {
    pub account_id: String,
    pub uid: String,
    pub scope: Scope,
    /// Set when the session had expired and a fresh pair was issued in place.
    pub reissued: Option<Session>,
}
