use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;
use validator::Validate;

use crate::error::AppError;
use crate::models::query::{contains_pattern, deserialize_non_null, deserialize_some, order_by, where_clause, Binder, OrderingField};

/// Represents the priority of a task.
/// Stored as a `SMALLINT` and exchanged as the integers 1, 2 and 3.
#[derive(
    Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, sqlx::Type,
)]
#[serde(try_from = "i64", into = "i64")]
#[repr(i16)]
pub enum TaskPriority {
    /// Low priority.
    Low = 1,
    /// Medium priority.
    #[default]
    Medium = 2,
    /// High priority.
    High = 3,
}

impl TaskPriority {
    pub fn label(self) -> &'static str {
        match self {
            TaskPriority::Low => "Low",
            TaskPriority::Medium => "Medium",
            TaskPriority::High => "High",
        }
    }
}

impl TryFrom<i64> for TaskPriority {
    type Error = String;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(TaskPriority::Low),
            2 => Ok(TaskPriority::Medium),
            3 => Ok(TaskPriority::High),
            other => Err(format!("\"{}\" is not a valid priority; expected 1, 2 or 3", other)),
        }
    }
}

impl From<TaskPriority> for i64 {
    fn from(priority: TaskPriority) -> i64 {
        priority as i64
    }
}

/// Input structure for creating a task.
///
/// `assigned_to` is required and is never inferred from the requester.
#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct TaskInput {
    /// Must be between 1 and 255 characters.
    #[validate(length(min = 1, max = 255))]
    pub title: String,
    pub description: Option<String>,
    pub due_date: DateTime<Utc>,
    #[serde(default)]
    pub priority: TaskPriority,
    pub assigned_to: i32,
    #[serde(default)]
    pub project: Option<Uuid>,
    #[serde(default)]
    pub completed: bool,
}

/// Partial update of a task. Absent fields are left untouched;
/// `id`, `created_at` and `updated_at` cannot be written.
#[derive(Debug, Default, Serialize, Deserialize, Validate)]
pub struct TaskPatch {
    #[validate(length(min = 1, max = 255))]
    #[serde(default, deserialize_with = "deserialize_non_null")]
    pub title: Option<String>,
    #[serde(default, deserialize_with = "deserialize_some")]
    pub description: Option<Option<String>>,
    #[serde(default, deserialize_with = "deserialize_non_null")]
    pub due_date: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "deserialize_non_null")]
    pub priority: Option<TaskPriority>,
    #[serde(default, deserialize_with = "deserialize_non_null")]
    pub completed: Option<bool>,
    #[serde(default, deserialize_with = "deserialize_non_null")]
    pub assigned_to: Option<i32>,
    #[serde(default, deserialize_with = "deserialize_some")]
    pub project: Option<Option<Uuid>>,
}

/// Represents a task entity as returned by the API.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Task {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub due_date: DateTime<Utc>,
    pub priority: TaskPriority,
    pub completed: bool,
    /// Identifier of the user the task is assigned to.
    pub assigned_to: i32,
    /// Username of the assignee (read-only).
    pub assigned_to_username: String,
    /// Project the task belongs to, if any.
    pub project: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl fmt::Display for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.title, self.priority.label())
    }
}

/// Fields tasks can be ordered by.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskOrdering {
    DueDate,
    Priority,
    CreatedAt,
    UpdatedAt,
}

impl OrderingField for TaskOrdering {
    fn parse(name: &str) -> Option<Self> {
        match name {
            "due_date" => Some(TaskOrdering::DueDate),
            "priority" => Some(TaskOrdering::Priority),
            "created_at" => Some(TaskOrdering::CreatedAt),
            "updated_at" => Some(TaskOrdering::UpdatedAt),
            _ => None,
        }
    }

    fn column(self) -> &'static str {
        match self {
            TaskOrdering::DueDate => "t.due_date",
            TaskOrdering::Priority => "t.priority",
            TaskOrdering::CreatedAt => "t.created_at",
            TaskOrdering::UpdatedAt => "t.updated_at",
        }
    }
}

/// Represents query parameters for filtering, searching and ordering tasks.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct TaskQuery {
    pub due_date: Option<DateTime<Utc>>,
    #[serde(rename = "due_date__lt")]
    pub due_date_lt: Option<DateTime<Utc>>,
    #[serde(rename = "due_date__gt")]
    pub due_date_gt: Option<DateTime<Utc>>,
    #[serde(rename = "due_date__lte")]
    pub due_date_lte: Option<DateTime<Utc>>,
    #[serde(rename = "due_date__gte")]
    pub due_date_gte: Option<DateTime<Utc>>,
    pub priority: Option<TaskPriority>,
    pub completed: Option<bool>,
    /// Assignee's user ID.
    pub assigned_to: Option<i32>,
    /// Assignee's exact username.
    #[serde(rename = "assigned_to__username")]
    pub assigned_to_username: Option<String>,
    /// Case-insensitive substring of the assignee's username.
    #[serde(rename = "assigned_to__username__icontains")]
    pub assigned_to_username_contains: Option<String>,
    pub project: Option<Uuid>,
    /// Case-insensitive substring matched against title OR description.
    pub search: Option<String>,
    /// Comma separated fields, `-` prefix for descending. Defaults to `due_date`.
    pub ordering: Option<String>,
}

const TASK_COLUMNS: &str = "t.id, t.title, t.description, t.due_date, t.priority, t.completed, \
                            t.assigned_to, u.username AS assigned_to_username, t.project_id AS project, \
                            t.created_at, t.updated_at";

const ASSIGNEE_JOIN: &str = "JOIN users u ON u.id = t.assigned_to";

impl TaskQuery {
    /// Builds the list query. Listing never filters by ownership.
    pub fn to_sql(&self) -> Result<(String, Binder), AppError> {
        let mut binder = Binder::new();
        let mut conditions: Vec<String> = Vec::new();

        if let Some(due_date) = self.due_date {
            conditions.push(format!("t.due_date = {}", binder.push(due_date)));
        }
        if let Some(due_date) = self.due_date_lt {
            conditions.push(format!("t.due_date < {}", binder.push(due_date)));
        }
        if let Some(due_date) = self.due_date_gt {
            conditions.push(format!("t.due_date > {}", binder.push(due_date)));
        }
        if let Some(due_date) = self.due_date_lte {
            conditions.push(format!("t.due_date <= {}", binder.push(due_date)));
        }
        if let Some(due_date) = self.due_date_gte {
            conditions.push(format!("t.due_date >= {}", binder.push(due_date)));
        }
        if let Some(priority) = self.priority {
            conditions.push(format!("t.priority = {}", binder.push(priority)));
        }
        if let Some(completed) = self.completed {
            conditions.push(format!("t.completed = {}", binder.push(completed)));
        }
        if let Some(assigned_to) = self.assigned_to {
            conditions.push(format!("t.assigned_to = {}", binder.push(assigned_to)));
        }
        if let Some(username) = &self.assigned_to_username {
            conditions.push(format!("u.username = {}", binder.push(username.clone())));
        }
        if let Some(fragment) = &self.assigned_to_username_contains {
            conditions.push(format!("u.username ILIKE {}", binder.push(contains_pattern(fragment))));
        }
        if let Some(project) = self.project {
            conditions.push(format!("t.project_id = {}", binder.push(project)));
        }
        if let Some(search) = self.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            let pattern = binder.push(contains_pattern(search));
            conditions.push(format!(
                "(t.title ILIKE {0} OR COALESCE(t.description, '') ILIKE {0})",
                pattern
            ));
        }

        let order = order_by(
            self.ordering.as_deref(),
            &[(TaskOrdering::DueDate, false)],
            "t.id",
        )?;

        let sql = format!(
            "SELECT {} FROM tasks t {}{} ORDER BY {}",
            TASK_COLUMNS,
            ASSIGNEE_JOIN,
            where_clause(&conditions),
            order
        );

        Ok((sql, binder))
    }
}

impl TaskPatch {
    /// Builds the `SET` list for this patch. `updated_at` is always refreshed.
    fn set_clauses(self, binder: &mut Binder) -> Vec<String> {
        let mut sets: Vec<String> = Vec::new();

        if let Some(title) = self.title {
            sets.push(format!("title = {}", binder.push(title)));
        }
        if let Some(description) = self.description {
            sets.push(format!("description = {}", binder.push(description)));
        }
        if let Some(due_date) = self.due_date {
            sets.push(format!("due_date = {}", binder.push(due_date)));
        }
        if let Some(priority) = self.priority {
            sets.push(format!("priority = {}", binder.push(priority)));
        }
        if let Some(completed) = self.completed {
            sets.push(format!("completed = {}", binder.push(completed)));
        }
        if let Some(assigned_to) = self.assigned_to {
            sets.push(format!("assigned_to = {}", binder.push(assigned_to)));
        }
        if let Some(project) = self.project {
            sets.push(format!("project_id = {}", binder.push(project)));
        }
        sets.push("updated_at = NOW()".to_string());

        sets
    }
}

impl Task {
    pub async fn list(pool: &PgPool, query: &TaskQuery) -> Result<Vec<Task>, AppError> {
        let (sql, binder) = query.to_sql()?;
        let tasks = sqlx::query_as_with::<_, Task, _>(&sql, binder.into_arguments())
            .fetch_all(pool)
            .await?;
        Ok(tasks)
    }

    pub async fn find(pool: &PgPool, id: Uuid) -> Result<Option<Task>, AppError> {
        let sql = format!(
            "SELECT {} FROM tasks t {} WHERE t.id = $1",
            TASK_COLUMNS, ASSIGNEE_JOIN
        );
        let task = sqlx::query_as::<_, Task>(&sql)
            .bind(id)
            .fetch_optional(pool)
            .await?;
        Ok(task)
    }

    /// Inserts a validated task and returns it with its assignee's username.
    pub async fn create(pool: &PgPool, input: TaskInput) -> Result<Task, AppError> {
        let sql = format!(
            "WITH t AS ( \
                INSERT INTO tasks (id, title, description, due_date, priority, completed, assigned_to, project_id) \
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8) RETURNING * \
             ) SELECT {} FROM t {}",
            TASK_COLUMNS, ASSIGNEE_JOIN
        );

        let task = sqlx::query_as::<_, Task>(&sql)
            .bind(Uuid::new_v4())
            .bind(input.title)
            .bind(input.description)
            .bind(input.due_date)
            .bind(input.priority)
            .bind(input.completed)
            .bind(input.assigned_to)
            .bind(input.project)
            .fetch_one(pool)
            .await?;

        Ok(task)
    }

    /// Applies a partial update. Last write wins; there is no version check.
    pub async fn update(pool: &PgPool, id: Uuid, patch: TaskPatch) -> Result<Task, AppError> {
        let mut binder = Binder::new();
        let sets = patch.set_clauses(&mut binder);
        let id_placeholder = binder.push(id);

        let sql = format!(
            "WITH t AS (UPDATE tasks SET {} WHERE id = {} RETURNING *) SELECT {} FROM t {}",
            sets.join(", "),
            id_placeholder,
            TASK_COLUMNS,
            ASSIGNEE_JOIN
        );

        sqlx::query_as_with::<_, Task, _>(&sql, binder.into_arguments())
            .fetch_optional(pool)
            .await?
            .ok_or_else(|| AppError::NotFound("Task not found".into()))
    }

    pub async fn delete(pool: &PgPool, id: Uuid) -> Result<(), AppError> {
        let result = sqlx::query("DELETE FROM tasks WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("Task not found".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;

    fn sample_task(priority: TaskPriority) -> Task {
        let now = Utc::now();
        Task {
            id: Uuid::new_v4(),
            title: "Alice's Task".to_string(),
            description: None,
            due_date: now,
            priority,
            completed: false,
            assigned_to: 1,
            assigned_to_username: "alice".to_string(),
            project: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_task_display() {
        assert_eq!(sample_task(TaskPriority::Low).to_string(), "Alice's Task (Low)");
        assert_eq!(sample_task(TaskPriority::Medium).to_string(), "Alice's Task (Medium)");
    }

    #[test]
    fn test_priority_serializes_as_integer() {
        assert_eq!(serde_json::to_value(TaskPriority::High).unwrap(), 3);
        assert_eq!(serde_json::from_str::<TaskPriority>("1").unwrap(), TaskPriority::Low);
        assert!(serde_json::from_str::<TaskPriority>("4").is_err());
        assert!(serde_json::from_str::<TaskPriority>("\"high\"").is_err());
        assert!(TaskPriority::Low < TaskPriority::High);
    }

    #[test]
    fn test_task_input_defaults_and_validation() {
        let input: TaskInput = serde_json::from_str(
            r#"{"title": "T1", "due_date": "2025-08-01T00:00:00Z", "assigned_to": 7}"#,
        )
        .unwrap();
        assert_eq!(input.priority, TaskPriority::Medium);
        assert!(!input.completed);
        assert_eq!(input.project, None);
        assert_eq!(input.due_date, Utc.with_ymd_and_hms(2025, 8, 1, 0, 0, 0).unwrap());
        assert!(input.validate().is_ok());

        let empty_title = TaskInput {
            title: String::new(),
            ..input
        };
        assert!(empty_title.validate().is_err());
    }

    #[test]
    fn test_task_input_rejects_bad_payloads() {
        // Missing due date
        assert!(serde_json::from_str::<TaskInput>(r#"{"title": "T", "assigned_to": 1}"#).is_err());
        // Missing assignee
        assert!(serde_json::from_str::<TaskInput>(
            r#"{"title": "T", "due_date": "2025-08-01T00:00:00Z"}"#
        )
        .is_err());
        // Malformed date
        assert!(serde_json::from_str::<TaskInput>(
            r#"{"title": "T", "due_date": "tomorrow", "assigned_to": 1}"#
        )
        .is_err());
        // Out-of-range priority
        assert!(serde_json::from_str::<TaskInput>(
            r#"{"title": "T", "due_date": "2025-08-01T00:00:00Z", "assigned_to": 1, "priority": 9}"#
        )
        .is_err());
    }

    #[test]
    fn test_patch_ignores_read_only_fields() {
        let patch: TaskPatch = serde_json::from_str(
            r#"{"id": "00000000-0000-0000-0000-000000000000", "created_at": "2020-01-01T00:00:00Z", "completed": true}"#,
        )
        .unwrap();

        let mut binder = Binder::new();
        let sets = patch.set_clauses(&mut binder);
        assert_eq!(sets, vec!["completed = $1", "updated_at = NOW()"]);
        assert_eq!(binder.len(), 1);
    }

    #[test]
    fn test_patch_can_clear_project() {
        let patch: TaskPatch = serde_json::from_str(r#"{"project": null, "title": "Renamed"}"#).unwrap();
        assert_eq!(patch.project, Some(None));

        let mut binder = Binder::new();
        let sets = patch.set_clauses(&mut binder);
        assert_eq!(sets, vec!["title = $1", "project_id = $2", "updated_at = NOW()"]);
    }

    #[test]
    fn test_patch_rejects_null_on_required_fields() {
        for field in ["title", "due_date", "priority", "completed", "assigned_to"] {
            let body = format!(r#"{{"{}": null}}"#, field);
            assert!(serde_json::from_str::<TaskPatch>(&body).is_err(), "{}", field);
        }
        assert!(serde_json::from_str::<TaskPatch>(r#"{"description": null}"#).is_ok());
    }

    #[test]
    fn test_default_list_query() {
        let (sql, binder) = TaskQuery::default().to_sql().unwrap();
        assert!(binder.is_empty());
        assert!(!sql.contains("WHERE"));
        assert!(sql.ends_with("ORDER BY t.due_date ASC, t.id ASC"));
    }

    #[test]
    fn test_filtered_list_query() {
        let query = TaskQuery {
            due_date_lt: Some(Utc.with_ymd_and_hms(2025, 9, 1, 0, 0, 0).unwrap()),
            priority: Some(TaskPriority::Low),
            completed: Some(false),
            assigned_to_username_contains: Some("ali".to_string()),
            search: Some("report".to_string()),
            ordering: Some("-priority".to_string()),
            ..Default::default()
        };

        let (sql, binder) = query.to_sql().unwrap();
        assert_eq!(binder.len(), 5);
        assert!(sql.contains(
            " WHERE t.due_date < $1 AND t.priority = $2 AND t.completed = $3 \
             AND u.username ILIKE $4 AND (t.title ILIKE $5 OR COALESCE(t.description, '') ILIKE $5)"
        ));
        assert!(sql.ends_with("ORDER BY t.priority DESC, t.id ASC"));
    }

    #[test]
    fn test_blank_search_is_ignored() {
        let query = TaskQuery {
            search: Some("   ".to_string()),
            ..Default::default()
        };
        let (sql, binder) = query.to_sql().unwrap();
        assert!(binder.is_empty());
        assert!(!sql.contains("ILIKE"));
    }

    #[test]
    fn test_query_string_parsing() {
        let query: TaskQuery = parse_query(
            "priority=1&completed=true&due_date__gt=2025-08-01T00:00:00Z&assigned_to__username=alice",
        );
        assert_eq!(query.priority, Some(TaskPriority::Low));
        assert_eq!(query.completed, Some(true));
        assert_eq!(query.assigned_to_username.as_deref(), Some("alice"));
        assert!(query.due_date_gt.is_some());
    }

    #[test]
    fn test_unknown_ordering_is_rejected() {
        let query = TaskQuery {
            ordering: Some("title".to_string()),
            ..Default::default()
        };
        assert!(matches!(query.to_sql(), Err(AppError::ValidationError(_))));
    }

    fn parse_query(qs: &str) -> TaskQuery {
        actix_web::web::Query::<TaskQuery>::from_query(qs)
            .unwrap()
            .into_inner()
    }
}
