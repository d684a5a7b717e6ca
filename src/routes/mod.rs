pub mod auth;
pub mod health;
pub mod projects;
pub mod tasks;
pub mod users;

use actix_web::{web, HttpRequest};

use crate::error::AppError;

/// Mounts every API resource. Expected to be configured under the `/api` scope.
pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.app_data(json_config())
        .app_data(query_config())
        .service(
            web::scope("/auth")
                .service(auth::login)
                .service(auth::refresh)
                .service(auth::register)
                .service(auth::signup)
                .service(auth::get_profile)
                .service(auth::update_profile),
        )
        .service(
            web::scope("/tasks")
                .service(tasks::get_tasks)
                .service(tasks::create_task)
                .service(tasks::get_task)
                .service(tasks::update_task)
                .service(tasks::delete_task),
        )
        .service(
            web::scope("/projects")
                .service(projects::get_projects)
                .service(projects::create_project)
                .service(projects::get_project)
                .service(projects::update_project)
                .service(projects::delete_project),
        )
        .service(
            web::scope("/users")
                .service(users::get_users)
                .service(users::get_user)
                .service(users::delete_user),
        );
}

/// Malformed JSON bodies (missing fields, unknown enum values, bad dates) are validation errors.
pub fn json_config() -> web::JsonConfig {
    web::JsonConfig::default().error_handler(|err, _req: &HttpRequest| {
        AppError::ValidationError(err.to_string()).into()
    })
}

/// Same as [`json_config`] for query strings.
pub fn query_config() -> web::QueryConfig {
    web::QueryConfig::default().error_handler(|err, _req: &HttpRequest| {
        AppError::ValidationError(err.to_string()).into()
    })
}
