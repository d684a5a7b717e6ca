use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use validator::Validate;

use crate::error::AppError;
use crate::models::query::{deserialize_non_null, Binder};

/// Account role. Corresponds to the `user_role` SQL enum.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default, sqlx::Type)]
#[sqlx(type_name = "user_role", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Full access to every task, project and account.
    Admin,
    /// Regular account.
    #[default]
    User,
}

/// The privilege flags a role implies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Privileges {
    pub is_staff: bool,
    pub is_superuser: bool,
}

impl Role {
    /// Privilege flags are a pure function of the role; there is no other way to elevate.
    pub fn privileges(self) -> Privileges {
        let elevated = self == Role::Admin;
        Privileges {
            is_staff: elevated,
            is_superuser: elevated,
        }
    }
}

/// Profile avatar, one of a fixed set of emoji. Corresponds to the `user_avatar` SQL enum.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default, sqlx::Type)]
#[sqlx(type_name = "user_avatar")]
pub enum Avatar {
    #[default]
    #[serde(rename = "👤")]
    #[sqlx(rename = "👤")]
    Default,
    #[serde(rename = "😊")]
    #[sqlx(rename = "😊")]
    Happy,
    #[serde(rename = "🤓")]
    #[sqlx(rename = "🤓")]
    Nerd,
    #[serde(rename = "😎")]
    #[sqlx(rename = "😎")]
    Cool,
    #[serde(rename = "🚀")]
    #[sqlx(rename = "🚀")]
    Rocket,
    #[serde(rename = "⭐")]
    #[sqlx(rename = "⭐")]
    Star,
    #[serde(rename = "🎯")]
    #[sqlx(rename = "🎯")]
    Target,
    #[serde(rename = "💼")]
    #[sqlx(rename = "💼")]
    Business,
    #[serde(rename = "🎨")]
    #[sqlx(rename = "🎨")]
    Creative,
    #[serde(rename = "🔥")]
    #[sqlx(rename = "🔥")]
    Fire,
}

/// An account as stored in the `users` table.
///
/// `password_hash` is never serialized into responses.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: i32,
    pub username: String,
    pub email: String,
    #[serde(skip_serializing, default)]
    pub password_hash: String,
    pub first_name: String,
    pub last_name: String,
    pub role: Role,
    pub avatar: Avatar,
    pub is_staff: bool,
    pub is_superuser: bool,
    pub date_joined: DateTime<Utc>,
}

/// A user together with the number of tasks assigned to them.
#[derive(Debug, Serialize, Deserialize, FromRow)]
pub struct UserSummary {
    #[serde(flatten)]
    #[sqlx(flatten)]
    pub user: User,
    pub task_count: i64,
}

/// Fields required to insert a new account. The password must already be hashed.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub first_name: String,
    pub last_name: String,
    pub role: Role,
    pub avatar: Avatar,
}

/// Fields a profile update may change. `None` leaves the stored value untouched.
#[derive(Debug, Default, Clone, Deserialize, Validate)]
pub struct ProfileChanges {
    #[validate(email)]
    #[serde(default, deserialize_with = "deserialize_non_null")]
    pub email: Option<String>,
    #[validate(length(max = 150))]
    #[serde(default, deserialize_with = "deserialize_non_null")]
    pub first_name: Option<String>,
    #[validate(length(max = 150))]
    #[serde(default, deserialize_with = "deserialize_non_null")]
    pub last_name: Option<String>,
    #[serde(default, deserialize_with = "deserialize_non_null")]
    pub avatar: Option<Avatar>,
    #[serde(default, deserialize_with = "deserialize_non_null")]
    pub role: Option<Role>,
}

const USER_COLUMNS: &str = "id, username, email, password_hash, first_name, last_name, role, avatar, \
                            is_staff, is_superuser, date_joined";

impl User {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    /// Inserts a new account; privilege flags are derived from `role`.
    pub async fn create(pool: &PgPool, new_user: NewUser) -> Result<User, AppError> {
        let privileges = new_user.role.privileges();
        let sql = format!(
            "INSERT INTO users (username, email, password_hash, first_name, last_name, role, avatar, is_staff, is_superuser) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9) RETURNING {}",
            USER_COLUMNS
        );

        let user = sqlx::query_as::<_, User>(&sql)
            .bind(new_user.username)
            .bind(new_user.email)
            .bind(new_user.password_hash)
            .bind(new_user.first_name)
            .bind(new_user.last_name)
            .bind(new_user.role)
            .bind(new_user.avatar)
            .bind(privileges.is_staff)
            .bind(privileges.is_superuser)
            .fetch_one(pool)
            .await?;

        Ok(user)
    }

    pub async fn find(pool: &PgPool, id: i32) -> Result<Option<User>, AppError> {
        let sql = format!("SELECT {} FROM users WHERE id = $1", USER_COLUMNS);
        let user = sqlx::query_as::<_, User>(&sql)
            .bind(id)
            .fetch_optional(pool)
            .await?;
        Ok(user)
    }

    pub async fn find_by_username(pool: &PgPool, username: &str) -> Result<Option<User>, AppError> {
        let sql = format!("SELECT {} FROM users WHERE username = $1", USER_COLUMNS);
        let user = sqlx::query_as::<_, User>(&sql)
            .bind(username)
            .fetch_optional(pool)
            .await?;
        Ok(user)
    }

    pub async fn find_by_email(pool: &PgPool, email: &str) -> Result<Option<User>, AppError> {
        let sql = format!("SELECT {} FROM users WHERE LOWER(email) = LOWER($1)", USER_COLUMNS);
        let user = sqlx::query_as::<_, User>(&sql)
            .bind(email)
            .fetch_optional(pool)
            .await?;
        Ok(user)
    }

    /// Lists every account with its assigned task count, ordered by id.
    pub async fn list_with_task_counts(pool: &PgPool) -> Result<Vec<UserSummary>, AppError> {
        let sql = "SELECT u.id, u.username, u.email, u.password_hash, u.first_name, u.last_name, u.role, \
                   u.avatar, u.is_staff, u.is_superuser, u.date_joined, \
                   (SELECT COUNT(*) FROM tasks t WHERE t.assigned_to = u.id) AS task_count \
                   FROM users u ORDER BY u.id";
        let users = sqlx::query_as::<_, UserSummary>(sql).fetch_all(pool).await?;
        Ok(users)
    }

    /// Number of tasks assigned to this user.
    pub async fn task_count(&self, pool: &PgPool) -> Result<i64, AppError> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM tasks WHERE assigned_to = $1")
            .bind(self.id)
            .fetch_one(pool)
            .await?;
        Ok(count)
    }

    /// Applies a partial profile update and returns the stored row.
    ///
    /// The privilege flags are always rewritten from the resulting role.
    pub async fn update_profile(
        pool: &PgPool,
        id: i32,
        changes: ProfileChanges,
    ) -> Result<User, AppError> {
        let mut binder = Binder::new();
        let mut sets: Vec<String> = Vec::new();

        if let Some(email) = changes.email {
            sets.push(format!("email = {}", binder.push(email)));
        }
        if let Some(first_name) = changes.first_name {
            sets.push(format!("first_name = {}", binder.push(first_name)));
        }
        if let Some(last_name) = changes.last_name {
            sets.push(format!("last_name = {}", binder.push(last_name)));
        }
        if let Some(avatar) = changes.avatar {
            sets.push(format!("avatar = {}", binder.push(avatar)));
        }
        // Privilege flags are rewritten on every save. SET expressions see the
        // pre-update row, so an unchanged role can be read back from the column.
        match changes.role {
            Some(role) => {
                let privileges = role.privileges();
                sets.push(format!("role = {}", binder.push(role)));
                sets.push(format!("is_staff = {}", binder.push(privileges.is_staff)));
                sets.push(format!("is_superuser = {}", binder.push(privileges.is_superuser)));
            }
            None => {
                sets.push("is_staff = (role = 'admin')".to_string());
                sets.push("is_superuser = (role = 'admin')".to_string());
            }
        }

        let id_placeholder = binder.push(id);
        let sql = format!(
            "UPDATE users SET {} WHERE id = {} RETURNING {}",
            sets.join(", "),
            id_placeholder,
            USER_COLUMNS
        );

        let user = sqlx::query_as_with::<_, User, _>(&sql, binder.into_arguments())
            .fetch_optional(pool)
            .await?
            .ok_or_else(|| AppError::NotFound("User not found".into()))?;

        Ok(user)
    }

    /// Deletes an account. Owned projects and assigned tasks go with it.
    pub async fn delete(pool: &PgPool, id: i32) -> Result<(), AppError> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("User not found".into()));
        }
        Ok(())
    }
}
