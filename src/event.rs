//! The externally visible event and the builder that merges a window of
//! update records into one.

use serde::{Deserialize, Serialize};

use crate::types::{Address, Label, MessageMetadata, RefreshFlag, User, UserSettings};
use crate::update::Update;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventAction {
    Delete,
    Create,
    Update,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct MessageEvent {
    #[serde(rename = "ID")]
    pub id: String,
    pub action: EventAction,
    pub message: Option<MessageMetadata>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct LabelEvent {
    #[serde(rename = "ID")]
    pub id: String,
    pub action: EventAction,
    pub label: Option<Label>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct AddressEvent {
    #[serde(rename = "ID")]
    pub id: String,
    pub action: EventAction,
    pub address: Option<Address>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Event {
    #[serde(rename = "EventID")]
    pub event_id: String,
    pub refresh: RefreshFlag,
    pub user: Option<User>,
    pub user_settings: Option<UserSettings>,
    pub messages: Vec<MessageEvent>,
    pub labels: Vec<LabelEvent>,
    pub addresses: Vec<AddressEvent>,
}

/// Result of one `GetEvent` call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct EventPage {
    pub event: Event,
    /// Resume point for the next poll.
    #[serde(rename = "LastEventID")]
    pub last_event_id: String,
    pub more: bool,
}

/// Current state the builder reads views from. Views are taken at merge
/// time, never from the moment the update was recorded.
pub trait EntityViews {
    fn message(&self, id: &str) -> Option<MessageMetadata>;
    fn label(&self, id: &str) -> Option<Label>;
    fn address(&self, id: &str) -> Option<Address>;
    fn user(&self) -> Option<User>;
    fn user_settings(&self) -> UserSettings;
}

/// One entity kind's entries while merging.
struct Entries {
    items: Vec<(String, EventAction)>,
}

impl Entries {
    fn new() -> Self {
        Self { items: Vec::new() }
    }

    fn push(&mut self, id: &str, action: EventAction) {
        // Update+update collapses onto the later position.
        if action == EventAction::Update {
            self.items
                .retain(|(existing, a)| !(existing == id && *a == EventAction::Update));
        }
        self.items.push((id.to_string(), action));
    }

    /// Resolves entries to views. Updates for entities that are gone are
    /// dropped; creates and deletes are always kept.
    fn resolve<T, V>(
        self,
        view: impl Fn(&str) -> Option<V>,
        build: impl Fn(String, EventAction, Option<V>) -> T,
    ) -> Vec<T> {
        self.items
            .into_iter()
            .filter_map(|(id, action)| match action {
                EventAction::Delete => Some(build(id, action, None)),
                EventAction::Create => {
                    let current = view(&id);
                    Some(build(id, action, current))
                }
                EventAction::Update => {
                    let current = view(&id)?;
                    Some(build(id, action, Some(current)))
                }
            })
            .collect()
    }
}

/// Merges `updates`, in log order, into a single event tagged `event_id`.
pub fn build_event<'a, V>(
    event_id: String,
    updates: impl IntoIterator<Item = &'a Update>,
    views: &V,
) -> Event
where
    V: EntityViews + ?Sized,
{
    let mut messages = Entries::new();
    let mut labels = Entries::new();
    let mut addresses = Entries::new();

    let mut refresh = RefreshFlag::empty();
    let mut settings: Option<UserSettings> = None;
    let mut user_changed = false;

    for update in updates {
        match update {
            Update::MessageCreated(id) => messages.push(id, EventAction::Create),
            Update::MessageUpdated(id) => messages.push(id, EventAction::Update),
            Update::MessageDeleted(id) => messages.push(id, EventAction::Delete),

            Update::LabelCreated(id) => labels.push(id, EventAction::Create),
            Update::LabelUpdated(id) => labels.push(id, EventAction::Update),
            Update::LabelDeleted(id) => labels.push(id, EventAction::Delete),

            Update::AddressCreated(id) => addresses.push(id, EventAction::Create),
            Update::AddressUpdated(id) => addresses.push(id, EventAction::Update),
            Update::AddressDeleted(id) => addresses.push(id, EventAction::Delete),

            Update::UserUpdated => user_changed = true,

            Update::SettingsChanged(value) => settings = Some(*value),

            Update::Refresh(flag) => {
                refresh |= *flag;
                user_changed = true;
                settings = Some(views.user_settings());
            }
        }
    }

    Event {
        event_id,
        refresh,
        user: if user_changed { views.user() } else { None },
        user_settings: settings,
        messages: messages.resolve(
            |id| views.message(id),
            |id, action, message| MessageEvent {
                id,
                action,
                message,
            },
        ),
        labels: labels.resolve(
            |id| views.label(id),
            |id, action, label| LabelEvent { id, action, label },
        ),
        addresses: addresses.resolve(
            |id| views.address(id),
            |id, action, address| AddressEvent {
                id,
                action,
                address,
            },
        ),
    }
}
