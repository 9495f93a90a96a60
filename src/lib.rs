//! An in-process mock of a mail service backend.
//!
//! Accounts own addresses, labels, messages and attachments. Every mutation
//! appends a record to a global update log, and clients catch up by polling
//! [`Backend::get_event`] with the last event ID they saw.

pub mod api;
pub mod backend;
pub mod config;
pub mod crypto;
pub mod entities;
pub mod error;
pub mod event;
pub mod storage;
pub mod types;
pub mod update;

pub use backend::Backend;
pub use config::{AppConfig, BackendConfig};
pub use error::{BackendError, Result};
pub use event::{Event, EventAction, EventPage};
