use chrono::{DateTime, NaiveDate, Utc};
use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;
use validator::{Validate, ValidationError};

use crate::error::AppError;
use crate::models::query::{contains_pattern, deserialize_non_null, deserialize_some, order_by, where_clause, Binder, OrderingField};

lazy_static! {
    static ref HEX_COLOR_REGEX: Regex = Regex::new(r"^#[0-9A-Fa-f]{6}$").unwrap();
}

fn validate_color(color: &str) -> Result<(), ValidationError> {
    if HEX_COLOR_REGEX.is_match(color) {
        Ok(())
    } else {
        let mut error = ValidationError::new("color");
        error.message = Some("Color must be a hex string like #1A2B3C".into());
        Err(error)
    }
}

fn default_color() -> String {
    "#000000".to_string()
}

/// Lifecycle status of a project. Corresponds to the `project_status` SQL enum.
///
/// Any status may follow any other.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default, sqlx::Type)]
#[sqlx(type_name = "project_status", rename_all = "kebab-case")]
#[serde(rename_all = "kebab-case")]
pub enum ProjectStatus {
    #[default]
    Pending,
    InProgress,
    Completed,
    Archived,
}

/// Priority of a project. Corresponds to the `project_priority` SQL enum,
/// whose declaration order is the sort order.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default, sqlx::Type)]
#[sqlx(type_name = "project_priority", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ProjectPriority {
    Low,
    #[default]
    Medium,
    High,
    Urgent,
}

/// Input for creating a project. The owner is always the requester.
#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct ProjectInput {
    #[validate(length(min = 1, max = 255))]
    pub name: String,
    pub description: Option<String>,
    pub due_date: NaiveDate,
    #[serde(default = "default_color")]
    #[validate(custom = "validate_color")]
    pub color: String,
    #[serde(default)]
    pub status: ProjectStatus,
    #[serde(default)]
    pub priority: ProjectPriority,
}

/// Partial update of a project. `owner` and timestamps are read-only.
#[derive(Debug, Default, Serialize, Deserialize, Validate)]
pub struct ProjectPatch {
    #[validate(length(min = 1, max = 255))]
    #[serde(default, deserialize_with = "deserialize_non_null")]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "deserialize_some")]
    pub description: Option<Option<String>>,
    #[serde(default, deserialize_with = "deserialize_non_null")]
    pub due_date: Option<NaiveDate>,
    #[validate(custom = "validate_color")]
    #[serde(default, deserialize_with = "deserialize_non_null")]
    pub color: Option<String>,
    #[serde(default, deserialize_with = "deserialize_non_null")]
    pub status: Option<ProjectStatus>,
    #[serde(default, deserialize_with = "deserialize_non_null")]
    pub priority: Option<ProjectPriority>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Project {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub due_date: NaiveDate,
    pub color: String,
    pub status: ProjectStatus,
    pub priority: ProjectPriority,
    /// Identifier of the owning user.
    pub owner: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProjectOrdering {
    DueDate,
    Priority,
    CreatedAt,
    UpdatedAt,
}

impl OrderingField for ProjectOrdering {
    fn parse(name: &str) -> Option<Self> {
        match name {
            "due_date" => Some(ProjectOrdering::DueDate),
            "priority" => Some(ProjectOrdering::Priority),
            "created_at" => Some(ProjectOrdering::CreatedAt),
            "updated_at" => Some(ProjectOrdering::UpdatedAt),
            _ => None,
        }
    }

    fn column(self) -> &'static str {
        match self {
            ProjectOrdering::DueDate => "p.due_date",
            ProjectOrdering::Priority => "p.priority",
            ProjectOrdering::CreatedAt => "p.created_at",
            ProjectOrdering::UpdatedAt => "p.updated_at",
        }
    }
}

/// Query parameters for listing projects.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct ProjectQuery {
    pub due_date: Option<NaiveDate>,
    #[serde(rename = "due_date__lt")]
    pub due_date_lt: Option<NaiveDate>,
    #[serde(rename = "due_date__gt")]
    pub due_date_gt: Option<NaiveDate>,
    #[serde(rename = "due_date__lte")]
    pub due_date_lte: Option<NaiveDate>,
    #[serde(rename = "due_date__gte")]
    pub due_date_gte: Option<NaiveDate>,
    pub status: Option<ProjectStatus>,
    pub priority: Option<ProjectPriority>,
    pub owner: Option<i32>,
    #[serde(rename = "owner__username")]
    pub owner_username: Option<String>,
    #[serde(rename = "owner__username__icontains")]
    pub owner_username_contains: Option<String>,
    /// Case-insensitive substring matched against name OR description.
    pub search: Option<String>,
    pub ordering: Option<String>,
}

const PROJECT_COLUMNS: &str = "p.id, p.name, p.description, p.due_date, p.color, p.status, p.priority, \
                               p.owner_id AS owner, p.created_at, p.updated_at";

const OWNER_JOIN: &str = "JOIN users u ON u.id = p.owner_id";

impl ProjectQuery {
    pub fn to_sql(&self) -> Result<(String, Binder), AppError> {
        let mut binder = Binder::new();
        let mut conditions: Vec<String> = Vec::new();

        let date_filters = [
            ("=", self.due_date),
            ("<", self.due_date_lt),
            (">", self.due_date_gt),
            ("<=", self.due_date_lte),
            (">=", self.due_date_gte),
        ];
        for (op, value) in date_filters {
            if let Some(date) = value {
                conditions.push(format!("p.due_date {} {}", op, binder.push(date)));
            }
        }
        if let Some(status) = self.status {
            conditions.push(format!("p.status = {}", binder.push(status)));
        }
        if let Some(priority) = self.priority {
            conditions.push(format!("p.priority = {}", binder.push(priority)));
        }
        if let Some(owner) = self.owner {
            conditions.push(format!("p.owner_id = {}", binder.push(owner)));
        }
        if let Some(username) = &self.owner_username {
            conditions.push(format!("u.username = {}", binder.push(username.clone())));
        }
        if let Some(fragment) = &self.owner_username_contains {
            conditions.push(format!("u.username ILIKE {}", binder.push(contains_pattern(fragment))));
        }
        if let Some(search) = self.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            let pattern = binder.push(contains_pattern(search));
            conditions.push(format!(
                "(p.name ILIKE {0} OR COALESCE(p.description, '') ILIKE {0})",
                pattern
            ));
        }

        let order = order_by(
            self.ordering.as_deref(),
            &[(ProjectOrdering::DueDate, false)],
            "p.id",
        )?;

        let sql = format!(
            "SELECT {} FROM projects p {}{} ORDER BY {}",
            PROJECT_COLUMNS,
            OWNER_JOIN,
            where_clause(&conditions),
            order
        );

        Ok((sql, binder))
    }
}

impl Project {
    pub async fn list(pool: &PgPool, query: &ProjectQuery) -> Result<Vec<Project>, AppError> {
        let (sql, binder) = query.to_sql()?;
        let projects = sqlx::query_as_with::<_, Project, _>(&sql, binder.into_arguments())
            .fetch_all(pool)
            .await?;
        Ok(projects)
    }

    pub async fn find(pool: &PgPool, id: Uuid) -> Result<Option<Project>, AppError> {
        let sql = format!("SELECT {} FROM projects p WHERE p.id = $1", PROJECT_COLUMNS);
        let project = sqlx::query_as::<_, Project>(&sql)
            .bind(id)
            .fetch_optional(pool)
            .await?;
        Ok(project)
    }

    pub async fn create(pool: &PgPool, input: ProjectInput, owner_id: i32) -> Result<Project, AppError> {
        let sql = format!(
            "WITH p AS ( \
                INSERT INTO projects (id, name, description, due_date, color, status, priority, owner_id) \
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8) RETURNING * \
             ) SELECT {} FROM p",
            PROJECT_COLUMNS
        );

        let project = sqlx::query_as::<_, Project>(&sql)
            .bind(Uuid::new_v4())
            .bind(input.name)
            .bind(input.description)
            .bind(input.due_date)
            .bind(input.color)
            .bind(input.status)
            .bind(input.priority)
            .bind(owner_id)
            .fetch_one(pool)
            .await?;

        Ok(project)
    }

    pub async fn update(pool: &PgPool, id: Uuid, patch: ProjectPatch) -> Result<Project, AppError> {
        let mut binder = Binder::new();
        let mut sets: Vec<String> = Vec::new();

        if let Some(name) = patch.name {
            sets.push(format!("name = {}", binder.push(name)));
        }
        if let Some(description) = patch.description {
            sets.push(format!("description = {}", binder.push(description)));
        }
        if let Some(due_date) = patch.due_date {
            sets.push(format!("due_date = {}", binder.push(due_date)));
        }
        if let Some(color) = patch.color {
            sets.push(format!("color = {}", binder.push(color)));
        }
        if let Some(status) = patch.status {
            sets.push(format!("status = {}", binder.push(status)));
        }
        if let Some(priority) = patch.priority {
            sets.push(format!("priority = {}", binder.push(priority)));
        }
        sets.push("updated_at = NOW()".to_string());

        let id_placeholder = binder.push(id);
        let sql = format!(
            "WITH p AS (UPDATE projects SET {} WHERE id = {} RETURNING *) SELECT {} FROM p",
            sets.join(", "),
            id_placeholder,
            PROJECT_COLUMNS
        );

        sqlx::query_as_with::<_, Project, _>(&sql, binder.into_arguments())
            .fetch_optional(pool)
            .await?
            .ok_or_else(|| AppError::NotFound("Project not found".into()))
    }

    /// Deletes a project. Its tasks survive with `project` cleared.
    pub async fn delete(pool: &PgPool, id: Uuid) -> Result<(), AppError> {
        let result = sqlx::query("DELETE FROM projects WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("Project not found".into()));
        }
        Ok(())
    }
}
