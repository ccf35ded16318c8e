//! Data models for Canvas courses, modules and assignments.
//!
//! This module contains the records returned by the Canvas REST API and
//! the aggregated tree that the renderer walks. The tree is rebuilt on
//! every run and never persisted.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// Identifier of a Canvas resource.
///
/// Canvas returns numeric ids, but string ids show up behind some proxies
/// and in cross-shard references, so both are accepted.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ResourceId {
    Number(u64),
    Text(String),
}

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResourceId::Number(n) => write!(f, "{}", n),
            ResourceId::Text(s) => write!(f, "{}", s),
        }
    }
}

/// A course record as returned by `/api/v1/courses`.
///
/// Courses the user cannot view (unpublished, restricted by date) come back
/// without a `name`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CourseRecord {
    pub id: ResourceId,
    #[serde(default)]
    pub name: Option<String>,
}

/// A module record as returned by `/api/v1/courses/:id/modules`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModuleRecord {
    pub id: ResourceId,
    #[serde(default)]
    pub name: Option<String>,
}

/// A module item stub as returned by `/modules/:id/items`.
///
/// Only items pointing at an API resource (assignments, quizzes, ...)
/// carry a `url`; pages, headers and external links do not.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModuleItemStub {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default, rename = "type")]
    pub item_type: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
}

/// Full assignment record fetched from an item's detail URL.
///
/// Only `name` and `due_at` are interpreted; every other field is kept
/// verbatim in `extra`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AssignmentDetail {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub due_at: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// An assignment inside a module.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssignmentEntry {
    /// Name of the assignment; absent when the detail had none.
    pub name: Option<String>,
    pub data: AssignmentDetail,
}

impl AssignmentEntry {
    pub fn from_detail(detail: AssignmentDetail) -> Self {
        Self {
            name: detail.name.clone(),
            data: detail,
        }
    }

    /// Name and due date, if this entry should produce a checklist line.
    pub fn checklist_fields(&self) -> Option<(&str, &str)> {
        let name = self.name.as_deref()?;
        let due_at = self.data.due_at.as_deref()?;
        Some((name, due_at))
    }
}

/// A named group of assignments within a course.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Module {
    pub name: Option<String>,
    pub id: ResourceId,
    pub assignments: Vec<AssignmentEntry>,
}

impl From<ModuleRecord> for Module {
    fn from(record: ModuleRecord) -> Self {
        Self {
            name: record.name,
            id: record.id,
            assignments: Vec::new(),
        }
    }
}

/// A course and its modules.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Course {
    /// Absent when the user is not allowed to view the course.
    pub name: Option<String>,
    pub id: ResourceId,
    pub modules: Vec<Module>,
}

impl Course {
    /// Whether the course can be traversed and rendered.
    pub fn is_accessible(&self) -> bool {
        self.name.is_some()
    }
}

impl From<CourseRecord> for Course {
    fn from(record: CourseRecord) -> Self {
        Self {
            name: record.name,
            id: record.id,
            modules: Vec::new(),
        }
    }
}

/// The aggregated course tree, in API order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AggregateRoot {
    pub courses: Vec<Course>,
}

impl AggregateRoot {
    /// Courses that will be rendered.
    pub fn accessible_courses(&self) -> impl Iterator<Item = &Course> {
        self.courses.iter().filter(|c| c.is_accessible())
    }
}

/// An entry from the upcoming-events or missing-submissions endpoints.
///
/// The endpoints return three shapes that are told apart only by which
/// fields are present; see [`Event::from_value`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    /// `{"name": .., "due_at": ..}`: a plain assignment.
    Assignment { name: String, due_at: Option<String> },
    /// `{"assignment": {"name": .., "due_at": ..}}`: a missing submission.
    MissingSubmission { name: String, due_at: Option<String> },
    /// `{"title": .., "start_at": ..}`: a calendar event.
    Calendar { title: String, start_at: Option<String> },
}

impl Event {
    /// Classify a raw record by probing its fields.
    ///
    /// Returns `None` for records matching none of the known shapes.
    pub fn from_value(value: &Value) -> Option<Self> {
        let string_field = |v: &Value, key: &str| v.get(key).and_then(Value::as_str).map(String::from);

        if let Some(assignment) = value.get("assignment").filter(|a| a.is_object()) {
            if let Some(name) = string_field(assignment, "name") {
                return Some(Event::MissingSubmission {
                    name,
                    due_at: string_field(assignment, "due_at"),
                });
            }
        }

        if let Some(name) = string_field(value, "name") {
            return Some(Event::Assignment {
                name,
                due_at: string_field(value, "due_at"),
            });
        }

        if let Some(title) = string_field(value, "title") {
            return Some(Event::Calendar {
                title,
                start_at: string_field(value, "start_at"),
            });
        }

        None
    }

    /// Display label of the event.
    pub fn label(&self) -> &str {
        match self {
            Event::Assignment { name, .. } | Event::MissingSubmission { name, .. } => name,
            Event::Calendar { title, .. } => title,
        }
    }

    /// Raw timestamp of the event, whichever field its shape provides.
    pub fn timestamp(&self) -> Option<&str> {
        match self {
            Event::Assignment { due_at, .. } | Event::MissingSubmission { due_at, .. } => {
                due_at.as_deref()
            }
            Event::Calendar { start_at, .. } => start_at.as_deref(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_resource_id_accepts_numbers_and_strings() {
        let course: CourseRecord = serde_json::from_value(json!({"id": 42, "name": "CS101"})).unwrap();
        assert_eq!(course.id, ResourceId::Number(42));
        assert_eq!(course.id.to_string(), "42");

        let course: CourseRecord = serde_json::from_value(json!({"id": "7~12"})).unwrap();
        assert_eq!(course.id.to_string(), "7~12");
        assert!(course.name.is_none());
    }

    #[test]
    fn test_restricted_course_is_not_accessible() {
        let record: CourseRecord =
            serde_json::from_value(json!({"id": 3, "access_restricted_by_date": true})).unwrap();
        let course = Course::from(record);
        assert!(!course.is_accessible());
        assert!(course.modules.is_empty());
    }

    #[test]
    fn test_assignment_detail_keeps_unknown_fields() {
        let detail: AssignmentDetail = serde_json::from_value(json!({
            "name": "HW1",
            "due_at": "2024-01-10T23:59:00Z",
            "points_possible": 10
        }))
        .unwrap();
        assert_eq!(detail.name.as_deref(), Some("HW1"));
        assert_eq!(detail.extra.get("points_possible"), Some(&json!(10)));

        let entry = AssignmentEntry::from_detail(detail);
        assert_eq!(entry.checklist_fields(), Some(("HW1", "2024-01-10T23:59:00Z")));
    }

    #[test]
    fn test_checklist_fields_require_name_and_due_date() {
        let undated = AssignmentEntry::from_detail(AssignmentDetail {
            name: Some("Reading".to_string()),
            ..Default::default()
        });
        assert!(undated.checklist_fields().is_none());

        let unnamed = AssignmentEntry::from_detail(AssignmentDetail {
            due_at: Some("2024-01-10".to_string()),
            ..Default::default()
        });
        assert!(unnamed.checklist_fields().is_none());
    }

    #[test]
    fn test_event_shapes() {
        let plain = Event::from_value(&json!({"name": "HW2", "due_at": "2024-03-05T08:00:00Z"}));
        assert_eq!(
            plain,
            Some(Event::Assignment {
                name: "HW2".to_string(),
                due_at: Some("2024-03-05T08:00:00Z".to_string())
            })
        );

        let missing = Event::from_value(&json!({
            "title": "ignored",
            "assignment": {"name": "Lab 3", "due_at": "2024-02-01T00:00:00Z"}
        }))
        .unwrap();
        assert!(matches!(missing, Event::MissingSubmission { .. }));
        assert_eq!(missing.label(), "Lab 3");

        let calendar = Event::from_value(&json!({"title": "Midterm", "start_at": "2024-04-01T09:00:00Z"})).unwrap();
        assert_eq!(calendar.label(), "Midterm");
        assert_eq!(calendar.timestamp(), Some("2024-04-01T09:00:00Z"));

        assert!(Event::from_value(&json!({"id": 5})).is_none());
    }
}
