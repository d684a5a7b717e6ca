use crate::{
    auth::AuthenticatedUser,
    error::AppError,
    models::User,
    permissions::{authorize_profile, require_admin, Action},
};
use actix_web::{delete, get, web, HttpResponse, Responder};
use sqlx::PgPool;

/// Lists every account with the number of tasks assigned to it. Admin only.
#[get("")]
pub async fn get_users(
    pool: web::Data<PgPool>,
    user: AuthenticatedUser,
) -> Result<impl Responder, AppError> {
    require_admin(&user)?;

    let users = User::list_with_task_counts(&pool).await?;
    Ok(HttpResponse::Ok().json(users))
}

/// Any authenticated user may view an account.
#[get("/{id}")]
pub async fn get_user(
    pool: web::Data<PgPool>,
    user: AuthenticatedUser,
    user_id: web::Path<i32>,
) -> Result<impl Responder, AppError> {
    let profile = find_user(&pool, *user_id).await?;
    authorize_profile(&user, Action::Retrieve, &profile)?;
    Ok(HttpResponse::Ok().json(profile))
}

/// Deletes an account together with its projects and assigned tasks.
///
/// Allowed for the account itself or an admin. Answers `204 No Content`.
#[delete("/{id}")]
pub async fn delete_user(
    pool: web::Data<PgPool>,
    user: AuthenticatedUser,
    user_id: web::Path<i32>,
) -> Result<impl Responder, AppError> {
    let profile = find_user(&pool, *user_id).await?;
    authorize_profile(&user, Action::Delete, &profile)?;

    User::delete(&pool, profile.id).await?;
    log::info!("user {} deleted account {}", user.id, profile.id);

    Ok(HttpResponse::NoContent().finish())
}

async fn find_user(pool: &PgPool, id: i32) -> Result<User, AppError> {
    User::find(pool, id)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".into()))
}
