//! Upcoming events and missing submissions.

use super::{Aggregator, MISSING_FETCH, UPCOMING_FETCH};
use crate::canvas::Transport;
use crate::error::Result;
use crate::models::Event;
use serde_json::Value;
use tracing::{info, warn};

impl<'a, T: Transport + ?Sized> Aggregator<'a, T> {
    /// Fetch upcoming events followed by missing submissions, in API order.
    pub async fn fetch_events(&self) -> Result<Vec<Event>> {
        let mut events = self.fetch_event_list("upcoming_events", UPCOMING_FETCH).await?;
        let upcoming = events.len();

        events.extend(
            self.fetch_event_list("missing_submissions", MISSING_FETCH)
                .await?,
        );
        info!(
            "Found {} upcoming events and {} missing submissions",
            upcoming,
            events.len() - upcoming
        );

        Ok(events)
    }

    async fn fetch_event_list(&self, endpoint: &str, resource: &'static str) -> Result<Vec<Event>> {
        let url = format!(
            "{}/api/v1/users/self/{}?access_token={}",
            self.base_url, endpoint, self.token
        );
        let records: Vec<Value> = self.request(&url, resource).await?.decode(resource, &url)?;

        Ok(records
            .iter()
            .filter_map(|record| {
                let event = Event::from_value(record);
                if event.is_none() {
                    let id = record.get("id").cloned().unwrap_or_default();
                    warn!("Skipping {} record with unknown shape (id {})", endpoint, id);
                }
                event
            })
            .collect())
    }
}
