//! The global, append-only log of update records.
//!
//! Records are never edited or removed. Each account keeps its own ordered
//! list of [`UpdateId`]s into this log; only that list is ever pruned.

use std::fmt;
use std::str::FromStr;

use crate::error::BackendError;
use crate::types::{RefreshFlag, UserSettings};

/// Position of a record in the global log. Doubles as the event ID handed
/// to clients, in its decimal string form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct UpdateId(u64);

impl UpdateId {
    pub fn value(self) -> u64 {
        self.0
    }
}

impl fmt::Display for UpdateId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for UpdateId {
    type Err = BackendError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim()
            .parse::<u64>()
            .map(UpdateId)
            .map_err(|_| BackendError::InvalidEventId(s.to_string()))
    }
}

/// One immutable fact about an account. Carries the affected entity's ID
/// only, except for settings and refresh which carry their new value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Update {
    MessageCreated(String),
    MessageUpdated(String),
    MessageDeleted(String),
    LabelCreated(String),
    LabelUpdated(String),
    LabelDeleted(String),
    AddressCreated(String),
    AddressUpdated(String),
    AddressDeleted(String),
    /// Account-level user info changed (primary address, keys, creation).
    UserUpdated,
    SettingsChanged(UserSettings),
    Refresh(RefreshFlag),
}

impl Update {
    /// An ALL refresh supersedes every earlier record of the account.
    pub fn is_full_refresh(&self) -> bool {
        matches!(self, Update::Refresh(flag) if flag.contains(RefreshFlag::ALL))
    }
}

#[derive(Debug, Default)]
pub struct UpdateLog {
    records: Vec<Update>,
}

impl UpdateLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends `update` and returns its identifier. Identifiers increase
    /// strictly with every append.
    pub fn push(&mut self, update: Update) -> UpdateId {
        let id = UpdateId(self.records.len() as u64);
        self.records.push(update);
        id
    }

    pub fn get(&self, id: UpdateId) -> Option<&Update> {
        self.records.get(id.0 as usize)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
