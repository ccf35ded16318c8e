//! Canvas data aggregation.
//!
//! The [`Aggregator`] walks the Canvas API (courses → modules → items →
//! assignment details) and assembles an [`AggregateRoot`](crate::models::AggregateRoot),
//! or fetches the flat upcoming/missing event list.

pub mod events;
pub mod tree;

use crate::canvas::Transport;
use crate::error::{CanvasError, Result};

pub(crate) const COURSE_FETCH: &str = "course fetch";
pub(crate) const MODULE_FETCH: &str = "module fetch";
pub(crate) const ASSIGNMENT_DETAIL_FETCH: &str = "assignment detail fetch";
pub(crate) const UPCOMING_FETCH: &str = "upcoming events fetch";
pub(crate) const MISSING_FETCH: &str = "missing submissions fetch";

/// Fetches Canvas data for one user.
pub struct Aggregator<'a, T: Transport + ?Sized> {
    transport: &'a T,
    base_url: String,
    token: String,
    concurrency: usize,
}

impl<'a, T: Transport + ?Sized> Aggregator<'a, T> {
    /// Create an aggregator, failing with `MissingConfig` when the base URL
    /// or token is empty. No request is made here.
    pub fn new(transport: &'a T, base_url: &str, token: &str) -> Result<Self> {
        let base_url = base_url.trim().trim_end_matches('/');
        let token = token.trim();

        if base_url.is_empty() {
            return Err(CanvasError::MissingConfig { field: "base URL" });
        }
        if token.is_empty() {
            return Err(CanvasError::MissingConfig { field: "access token" });
        }

        Ok(Self {
            transport,
            base_url: base_url.to_string(),
            token: token.to_string(),
            concurrency: 1,
        })
    }

    /// Maximum number of module-item and detail requests in flight per course.
    ///
    /// `1` (the default) issues every request sequentially.
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    /// GET `url`, labelling any failure with `resource`.
    async fn request(
        &self,
        url: &str,
        resource: &'static str,
    ) -> Result<crate::canvas::ApiResponse> {
        self.transport
            .get(url)
            .await
            .map_err(|e| e.with_resource(resource))
    }
}
