pub mod project;
pub mod query;
pub mod task;
pub mod user;

pub use project::{Project, ProjectInput, ProjectPatch, ProjectPriority, ProjectQuery, ProjectStatus};
pub use task::{Task, TaskInput, TaskPatch, TaskPriority, TaskQuery};
pub use user::{Avatar, NewUser, ProfileChanges, Role, User, UserSummary};
