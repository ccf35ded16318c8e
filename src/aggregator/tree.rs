//! Course tree aggregation.
//!
//! Walks courses → modules (paginated) → module items → assignment details
//! and returns them in API order.

use super::{Aggregator, ASSIGNMENT_DETAIL_FETCH, COURSE_FETCH, MODULE_FETCH};
use crate::canvas::pagination::{has_next_page, modules_page_url};
use crate::canvas::Transport;
use crate::error::Result;
use crate::models::{
    AggregateRoot, AssignmentDetail, AssignmentEntry, Course, CourseRecord, Module,
    ModuleItemStub, ModuleRecord, ResourceId,
};
use futures::stream::{self, StreamExt, TryStreamExt};
use tracing::{debug, info};

impl<'a, T: Transport + ?Sized> Aggregator<'a, T> {
    /// Fetch every accessible course with its modules and assignments.
    ///
    /// The first failing request aborts the whole fetch.
    pub async fn fetch_all(&self) -> Result<AggregateRoot> {
        let records = self.fetch_courses().await?;

        // One entry per record up front, so restricted courses keep their slot.
        let mut root = AggregateRoot {
            courses: records.into_iter().map(Course::from).collect(),
        };
        info!(
            "Found {} courses ({} accessible)",
            root.courses.len(),
            root.accessible_courses().count()
        );

        for course in root.courses.iter_mut() {
            if !course.is_accessible() {
                debug!("Skipping course {}: not accessible", course.id);
                continue;
            }
            self.populate_course(course).await?;
        }

        Ok(root)
    }

    async fn fetch_courses(&self) -> Result<Vec<CourseRecord>> {
        let url = format!("{}/api/v1/courses?access_token={}", self.base_url, self.token);
        self.request(&url, COURSE_FETCH)
            .await?
            .decode(COURSE_FETCH, &url)
    }

    async fn populate_course(&self, course: &mut Course) -> Result<()> {
        let course_id = course.id.to_string();
        let modules = self.fetch_modules(&course_id).await?;
        info!(
            "Course {}: {} modules",
            course.name.as_deref().unwrap_or_default(),
            modules.len()
        );

        course.modules = modules.into_iter().map(Module::from).collect();

        // buffered() yields in submission order, so module order is kept
        // regardless of which request finishes first.
        let assignments: Vec<Vec<AssignmentEntry>> = stream::iter(course.modules.iter())
            .map(|module| self.fetch_module_assignments(&course_id, &module.id))
            .buffered(self.concurrency)
            .try_collect()
            .await?;

        for (module, entries) in course.modules.iter_mut().zip(assignments) {
            module.assignments = entries;
        }

        Ok(())
    }

    /// Fetch all pages of a course's modules.
    async fn fetch_modules(&self, course_id: &str) -> Result<Vec<ModuleRecord>> {
        let mut modules = Vec::new();
        let mut page = 1;

        loop {
            let url = modules_page_url(&self.base_url, &self.token, course_id, page);
            let resp = self.request(&url, MODULE_FETCH).await?;
            let batch: Vec<ModuleRecord> = resp.decode(MODULE_FETCH, &url)?;
            debug!("Course {} modules page {}: {} records", course_id, page, batch.len());

            let fetched = batch.len();
            modules.extend(batch);

            if fetched == 0 || !has_next_page(resp.link.as_deref()) {
                break;
            }
            page += 1;
        }

        Ok(modules)
    }

    async fn fetch_module_assignments(
        &self,
        course_id: &str,
        module_id: &ResourceId,
    ) -> Result<Vec<AssignmentEntry>> {
        let url = format!(
            "{}/api/v1/courses/{}/modules/{}/items?access_token={}",
            self.base_url, course_id, module_id, self.token
        );
        let stubs: Vec<ModuleItemStub> = self
            .request(&url, ASSIGNMENT_DETAIL_FETCH)
            .await?
            .decode(ASSIGNMENT_DETAIL_FETCH, &url)?;

        let detail_urls: Vec<String> = stubs
            .into_iter()
            .filter_map(|stub| {
                if stub.url.is_none() {
                    debug!(
                        "Skipping module item {:?} ({})",
                        stub.title.as_deref().unwrap_or_default(),
                        stub.item_type.as_deref().unwrap_or("unknown type")
                    );
                }
                stub.url
            })
            .collect();

        stream::iter(detail_urls.iter())
            .map(|detail_url| self.fetch_assignment_detail(detail_url))
            .buffered(self.concurrency)
            .try_collect()
            .await
    }

    async fn fetch_assignment_detail(&self, detail_url: &str) -> Result<AssignmentEntry> {
        let separator = if detail_url.contains('?') { '&' } else { '?' };
        let url = format!("{}{}access_token={}", detail_url, separator, self.token);

        let detail: AssignmentDetail = self
            .request(&url, ASSIGNMENT_DETAIL_FETCH)
            .await?
            .decode(ASSIGNMENT_DETAIL_FETCH, &url)?;

        Ok(AssignmentEntry::from_detail(detail))
    }
}

#[cfg(test)]
mod tests {
    use super::super::testing::*;
    use super::*;
    use crate::error::CanvasError;
    use serde_json::json;

    fn names(root: &AggregateRoot) -> Vec<Option<&str>> {
        root.courses.iter().map(|c| c.name.as_deref()).collect()
    }

    #[test]
    fn test_fetch_all_builds_tree_in_api_order() {
        let transport = FixtureTransport::canvas();
        let aggregator = Aggregator::new(&transport, BASE, TOKEN).unwrap();

        let root = tokio_test::block_on(aggregator.fetch_all()).unwrap();

        assert_eq!(names(&root), vec![Some("CS101"), None, Some("MATH200")]);

        let cs101 = &root.courses[0];
        let module_names: Vec<_> = cs101.modules.iter().map(|m| m.name.as_deref()).collect();
        assert_eq!(module_names, vec![Some("Week 1"), Some("Week 2")]);

        // The sub-header item has no url and is skipped.
        assert_eq!(cs101.modules[0].assignments.len(), 1);
        assert_eq!(cs101.modules[0].assignments[0].name.as_deref(), Some("HW1"));
        assert_eq!(
            cs101.modules[0].assignments[0].data.due_at.as_deref(),
            Some("2024-01-10")
        );
        assert!(cs101.modules[1].assignments[0].data.due_at.is_none());

        // Restricted course kept, untouched.
        assert!(root.courses[1].modules.is_empty());
    }

    #[test]
    fn test_restricted_course_never_fetches_modules() {
        let transport = FixtureTransport::canvas();
        let aggregator = Aggregator::new(&transport, BASE, TOKEN).unwrap();

        tokio_test::block_on(aggregator.fetch_all()).unwrap();

        let calls = transport.calls();
        assert!(calls.iter().all(|c| !c.contains("/courses/102/")));
        assert_eq!(
            calls,
            vec![
                format!("{}/api/v1/courses?access_token=tok", BASE),
                format!("{}/api/v1/courses/101/modules?page=1&per_page=10&access_token=tok", BASE),
                format!("{}/api/v1/courses/101/modules/1/items?access_token=tok", BASE),
                format!("{}/api/v1/courses/101/assignments/501?access_token=tok", BASE),
                format!("{}/api/v1/courses/101/modules/2/items?access_token=tok", BASE),
                format!("{}/api/v1/courses/101/assignments/502?access_token=tok", BASE),
                format!("{}/api/v1/courses/103/modules?page=1&per_page=10&access_token=tok", BASE),
                format!("{}/api/v1/courses/103/modules/3/items?access_token=tok", BASE),
                format!("{}/api/v1/courses/103/assignments/601?access_token=tok", BASE),
            ]
        );
    }

    #[test]
    fn test_module_pagination_follows_next_relation() {
        let page = |n: u32| {
            format!(
                "{}/api/v1/courses/1/modules?page={}&per_page=10&access_token=tok",
                BASE, n
            )
        };
        let link = |rels: &str| format!("<{}>; rel=\"current\",<{}>; {}", page(1), page(2), rels);

        let transport = FixtureTransport::new()
            .route(
                format!("{}/api/v1/courses?access_token=tok", BASE),
                json!([{"id": 1, "name": "Bio"}]),
            )
            .route_with_link(page(1), json!([{"id": 10, "name": "M1"}, {"id": 11, "name": "M2"}]), &link("rel=\"next\""))
            .route_with_link(page(2), json!([{"id": 12, "name": "M3"}]), &link("rel=\"next\""))
            .route_with_link(page(3), json!([{"id": 13, "name": "M4"}]), &link("rel=\"first\""))
            .route(format!("{}/api/v1/courses/1/modules/10/items?access_token=tok", BASE), json!([]))
            .route(format!("{}/api/v1/courses/1/modules/11/items?access_token=tok", BASE), json!([]))
            .route(format!("{}/api/v1/courses/1/modules/12/items?access_token=tok", BASE), json!([]))
            .route(format!("{}/api/v1/courses/1/modules/13/items?access_token=tok", BASE), json!([]));

        let aggregator = Aggregator::new(&transport, BASE, TOKEN).unwrap();
        let root = tokio_test::block_on(aggregator.fetch_all()).unwrap();

        let module_names: Vec<_> = root.courses[0]
            .modules
            .iter()
            .map(|m| m.name.clone().unwrap())
            .collect();
        assert_eq!(module_names, vec!["M1", "M2", "M3", "M4"]);

        let page_requests: Vec<_> = transport
            .calls()
            .into_iter()
            .filter(|c| c.contains("/modules?page="))
            .collect();
        assert_eq!(page_requests, vec![page(1), page(2), page(3)]);
    }

    #[test]
    fn test_course_fetch_failure_aborts() {
        let transport = FixtureTransport::new();
        let aggregator = Aggregator::new(&transport, BASE, TOKEN).unwrap();

        let err = tokio_test::block_on(aggregator.fetch_all()).unwrap_err();

        assert!(err.to_string().contains("course fetch"));
        assert_eq!(transport.calls().len(), 1);
    }

    #[test]
    fn test_module_page_failure_aborts() {
        let transport = FixtureTransport::new()
            .route(
                format!("{}/api/v1/courses?access_token=tok", BASE),
                json!([{"id": 1, "name": "Bio"}, {"id": 2, "name": "Chem"}]),
            )
            .route_with_link(
                format!("{}/api/v1/courses/1/modules?page=1&per_page=10&access_token=tok", BASE),
                json!([{"id": 10, "name": "M1"}]),
                "<https://canvas.test/x?page=2>; rel=\"next\"",
            );

        let aggregator = Aggregator::new(&transport, BASE, TOKEN).unwrap();
        let err = tokio_test::block_on(aggregator.fetch_all()).unwrap_err();

        match &err {
            CanvasError::Transport { resource, url, .. } => {
                assert_eq!(*resource, "module fetch");
                assert!(url.contains("page=2"));
                assert!(url.ends_with("access_token=***"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
        // Chem is never reached.
        assert!(transport.calls().iter().all(|c| !c.contains("/courses/2/")));
    }

    #[test]
    fn test_detail_failure_is_assignment_detail_error() {
        let transport = FixtureTransport::new()
            .route(
                format!("{}/api/v1/courses?access_token=tok", BASE),
                json!([{"id": 1, "name": "Bio"}]),
            )
            .route(
                format!("{}/api/v1/courses/1/modules?page=1&per_page=10&access_token=tok", BASE),
                json!([{"id": 10, "name": "M1"}]),
            )
            .route(
                format!("{}/api/v1/courses/1/modules/10/items?access_token=tok", BASE),
                json!([{"title": "Gone", "url": format!("{}/api/v1/courses/1/assignments/9", BASE)}]),
            );

        let aggregator = Aggregator::new(&transport, BASE, TOKEN).unwrap();
        let err = tokio_test::block_on(aggregator.fetch_all()).unwrap_err();

        assert!(err.to_string().contains("assignment detail fetch"));
        assert!(err.url().unwrap().contains("/assignments/9"));
    }

    #[test]
    fn test_unexpected_items_shape_is_parse_error() {
        let transport = FixtureTransport::new()
            .route(
                format!("{}/api/v1/courses?access_token=tok", BASE),
                json!([{"id": 1, "name": "Bio"}]),
            )
            .route(
                format!("{}/api/v1/courses/1/modules?page=1&per_page=10&access_token=tok", BASE),
                json!([{"id": 10, "name": "M1"}]),
            )
            .route(
                format!("{}/api/v1/courses/1/modules/10/items?access_token=tok", BASE),
                json!({"errors": [{"message": "unauthorized"}]}),
            );

        let aggregator = Aggregator::new(&transport, BASE, TOKEN).unwrap();
        let err = tokio_test::block_on(aggregator.fetch_all()).unwrap_err();

        assert!(matches!(
            err,
            CanvasError::Parse {
                resource: "assignment detail fetch",
                ..
            }
        ));
    }

    #[test]
    fn test_concurrent_fetch_keeps_order() {
        let sequential = FixtureTransport::canvas();
        let concurrent = FixtureTransport::canvas();

        let a = tokio_test::block_on(
            Aggregator::new(&sequential, BASE, TOKEN).unwrap().fetch_all(),
        )
        .unwrap();
        let b = tokio_test::block_on(
            Aggregator::new(&concurrent, BASE, TOKEN)
                .unwrap()
                .with_concurrency(8)
                .fetch_all(),
        )
        .unwrap();

        assert_eq!(a, b);
    }

    #[test]
    fn test_detail_url_with_query_gets_ampersand() {
        let detail = format!("{}/api/v1/courses/1/assignments/5?include=submission", BASE);
        let transport = FixtureTransport::new().route(
            format!("{}&access_token=tok", detail),
            json!({"name": "Quiz", "due_at": "2024-05-01"}),
        );
        let aggregator = Aggregator::new(&transport, BASE, TOKEN).unwrap();

        let entry = tokio_test::block_on(aggregator.fetch_assignment_detail(&detail)).unwrap();
        assert_eq!(entry.name.as_deref(), Some("Quiz"));
    }
}
