//! Authorization predicates.
//!
//! Reads are open to every authenticated user; writes are gated on ownership or
//! the admin role. The authenticated user is always passed in explicitly.
//!
//! Two predicate sets exist:
//!
//! * [`has_permission`] / [`has_object_permission`] for tasks and projects: admins
//!   may do anything, safe actions are allowed, anything else requires ownership
//!   (`assigned_to` for tasks, `owner` for projects).
//! * [`profile_has_object_permission`] for accounts: reads are allowed, writes only
//!   to the account itself or an admin.

use crate::error::AppError;
use crate::models::{Project, Task, User};

/// What a request is trying to do to an object.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    List,
    Retrieve,
    Create,
    Update,
    Delete,
}

impl Action {
    /// List and retrieve are read-only.
    pub fn is_safe(self) -> bool {
        matches!(self, Action::List | Action::Retrieve)
    }

    fn verb(self) -> &'static str {
        match self {
            Action::List => "list",
            Action::Retrieve => "view",
            Action::Create => "create",
            Action::Update => "update",
            Action::Delete => "delete",
        }
    }
}

/// An object whose writes are restricted to one user.
pub trait Owned {
    /// Human readable name used in error messages.
    const KIND: &'static str;

    fn owner_id(&self) -> i32;
}

impl Owned for Task {
    const KIND: &'static str = "task";

    fn owner_id(&self) -> i32 {
        self.assigned_to
    }
}

impl Owned for Project {
    const KIND: &'static str = "project";

    fn owner_id(&self) -> i32 {
        self.owner
    }
}

impl Owned for User {
    const KIND: &'static str = "profile";

    fn owner_id(&self) -> i32 {
        self.id
    }
}

/// View-level check: the request must be authenticated.
pub fn has_permission(user: Option<&User>) -> bool {
    user.is_some()
}

/// Object-level check for tasks and projects.
pub fn has_object_permission<T: Owned>(user: &User, action: Action, object: &T) -> bool {
    if user.is_admin() {
        return true;
    }
    if action.is_safe() {
        return true;
    }
    object.owner_id() == user.id
}

/// Object-level check for accounts.
pub fn profile_has_object_permission(user: &User, action: Action, profile: &User) -> bool {
    if action.is_safe() {
        return true;
    }
    profile.owner_id() == user.id || user.is_admin()
}

/// Only admins pass.
pub fn is_admin_user(user: Option<&User>) -> bool {
    user.map_or(false, User::is_admin)
}

/// Only admins may change an account's role.
pub fn can_change_role(user: &User) -> bool {
    user.is_admin()
}

/// Runs [`has_object_permission`] and turns a denial into `Forbidden`.
pub fn authorize<T: Owned>(user: &User, action: Action, object: &T) -> Result<(), AppError> {
    if has_object_permission(user, action, object) {
        Ok(())
    } else {
        Err(denied(user, action, T::KIND))
    }
}

/// Runs [`profile_has_object_permission`] and turns a denial into `Forbidden`.
pub fn authorize_profile(user: &User, action: Action, profile: &User) -> Result<(), AppError> {
    if profile_has_object_permission(user, action, profile) {
        Ok(())
    } else {
        Err(denied(user, action, User::KIND))
    }
}

pub fn require_admin(user: &User) -> Result<(), AppError> {
    if is_admin_user(Some(user)) {
        Ok(())
    } else {
        log::warn!("user {} denied admin-only access", user.id);
        Err(AppError::Forbidden(
            "You do not have permission to perform this action".into(),
        ))
    }
}

fn denied(user: &User, action: Action, kind: &str) -> AppError {
    log::warn!("user {} denied {} on {}", user.id, action.verb(), kind);
    AppError::Forbidden(format!(
        "You do not have permission to {} this {}",
        action.verb(),
        kind
    ))
}
