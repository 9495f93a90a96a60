//! JSON-over-HTTP surface for the backend, laid out after the real
//! service's `/core/v4`, `/mail/v4` and `/auth/v4` routes.

pub mod error;
pub mod middleware;
pub mod router;

mod attachments;
mod events;
mod labels;
mod mail_settings;
mod messages;
mod session;
mod users;

use std::sync::Arc;

use crate::backend::Backend;

pub use router::build_router;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub backend: Arc<Backend>,
}
