//! Internal mutable records. They never leave the backend; callers only
//! ever see the views produced by their `to_*` materializers.

pub mod account;
pub mod address;
pub mod attachment;
pub mod label;
pub mod message;
pub mod session;

pub use account::Account;
pub use address::AddressRecord;
pub use attachment::AttachmentRecord;
pub use label::LabelRecord;
pub use message::{LabelTarget, MessageRecord};
pub use session::SessionRecord;
