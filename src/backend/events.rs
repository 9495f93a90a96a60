use super::Backend;
use crate::error::{BackendError, Result};
use crate::event::{build_event, EventPage};
use crate::update::UpdateId;

impl Backend {
    /// The ID of the account's newest update record. Every account has at
    /// least one from its creation.
    pub async fn get_latest_event_id(&self, account_id: &str) -> Result<String> {
        self.read(|s| {
            s.account(account_id)?
                .latest_update()
                .map(|id| id.to_string())
                .ok_or_else(|| BackendError::invalid_state("account has no history"))
        })
        .await
    }

    /// Merges the account's updates recorded after `since` into one event.
    ///
    /// At most `max_updates_per_event` records are consumed per call; `more`
    /// tells the caller to poll again from `last_event_id`. An empty window
    /// hands `since` back unchanged.
    pub async fn get_event(&self, account_id: &str, since: &str) -> Result<EventPage> {
        self.read(|s| {
            let account = s.account(account_id)?;
            let start = account.window_start(since.parse::<UpdateId>()?)?;

            let len = account.update_ids.len();
            let max = s.max_updates_per_event;
            let end = if max == 0 {
                len
            } else {
                start.saturating_add(max).min(len)
            };

            let last_event_id = if end > start {
                account.update_ids[end - 1].to_string()
            } else {
                since.to_string()
            };

            let updates = account.update_ids[start..end]
                .iter()
                .filter_map(|id| s.updates.get(*id));

            let event = build_event(last_event_id.clone(), updates, &s.views(account));

            tracing::trace!(
                "Event for {} from {}: {} records, more {}",
                account_id,
                since,
                end - start,
                end != len
            );

            Ok(EventPage {
                event,
                last_event_id,
                more: end != len,
            })
        })
        .await
    }
}
