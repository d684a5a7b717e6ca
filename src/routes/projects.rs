use crate::{
    auth::AuthenticatedUser,
    error::AppError,
    models::{Project, ProjectInput, ProjectPatch, ProjectQuery},
    permissions::{authorize, Action},
};
use actix_web::{delete, get, post, route, web, HttpResponse, Responder};
use sqlx::PgPool;
use uuid::Uuid;
use validator::Validate;

/// Lists every project.
///
/// ## Query Parameters:
/// - `status`, `priority`, `owner` (user id), `owner__username`, `owner__username__icontains`.
/// - `due_date` and its `__lt`, `__gt`, `__lte`, `__gte` variants (`YYYY-MM-DD`).
/// - `search`: case-insensitive substring match on name and description.
/// - `ordering`: `due_date`, `priority`, `created_at`, `updated_at`, `-` for descending.
#[get("")]
pub async fn get_projects(
    pool: web::Data<PgPool>,
    _user: AuthenticatedUser,
    query_params: web::Query<ProjectQuery>,
) -> Result<impl Responder, AppError> {
    let projects = Project::list(&pool, &query_params).await?;
    Ok(HttpResponse::Ok().json(projects))
}

/// Creates a project owned by the requester. Answers `201 Created`.
#[post("")]
pub async fn create_project(
    pool: web::Data<PgPool>,
    user: AuthenticatedUser,
    project_data: web::Json<ProjectInput>,
) -> Result<impl Responder, AppError> {
    project_data.validate()?;

    let project = Project::create(&pool, project_data.into_inner(), user.id).await?;
    log::info!("user {} created project {}", user.id, project.id);

    Ok(HttpResponse::Created().json(project))
}

#[get("/{id}")]
pub async fn get_project(
    pool: web::Data<PgPool>,
    user: AuthenticatedUser,
    project_id: web::Path<Uuid>,
) -> Result<impl Responder, AppError> {
    let project = find_project(&pool, *project_id).await?;
    authorize(&user, Action::Retrieve, &project)?;
    Ok(HttpResponse::Ok().json(project))
}

/// Partially updates a project. Only the owner or an admin may do so; `owner` is read-only.
#[route("/{id}", method = "PATCH", method = "PUT")]
pub async fn update_project(
    pool: web::Data<PgPool>,
    user: AuthenticatedUser,
    project_id: web::Path<Uuid>,
    project_data: web::Json<ProjectPatch>,
) -> Result<impl Responder, AppError> {
    project_data.validate()?;

    let project = find_project(&pool, *project_id).await?;
    authorize(&user, Action::Update, &project)?;

    let updated = Project::update(&pool, project.id, project_data.into_inner()).await?;
    log::info!("user {} updated project {}", user.id, updated.id);

    Ok(HttpResponse::Ok().json(updated))
}

/// Deletes a project. Its tasks are kept with `project` set to null.
#[delete("/{id}")]
pub async fn delete_project(
    pool: web::Data<PgPool>,
    user: AuthenticatedUser,
    project_id: web::Path<Uuid>,
) -> Result<impl Responder, AppError> {
    let project = find_project(&pool, *project_id).await?;
    authorize(&user, Action::Delete, &project)?;

    Project::delete(&pool, project.id).await?;
    log::info!("user {} deleted project {}", user.id, project.id);

    Ok(HttpResponse::NoContent().finish())
}

async fn find_project(pool: &PgPool, id: Uuid) -> Result<Project, AppError> {
    Project::find(pool, id)
        .await?
        .ok_or_else(|| AppError::NotFound("Project not found".into()))
}
