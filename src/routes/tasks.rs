use crate::{
    auth::AuthenticatedUser,
    error::AppError,
    models::{Task, TaskInput, TaskPatch, TaskQuery},
    permissions::{authorize, Action},
};
use actix_web::{delete, get, post, route, web, HttpResponse, Responder};
use sqlx::PgPool;
use uuid::Uuid;
use validator::Validate;

/// Retrieves a list of tasks.
///
/// Every authenticated user sees every task; there is no per-user scoping on reads.
///
/// ## Query Parameters:
/// - `due_date`, `due_date__lt`, `due_date__gt`, `due_date__lte`, `due_date__gte`: RFC 3339 timestamps.
/// - `priority` (1-3), `completed`, `assigned_to` (user id), `project` (project id).
/// - `assigned_to__username` (exact) and `assigned_to__username__icontains` (case-insensitive substring).
/// - `search`: case-insensitive substring match on title and description.
/// - `ordering`: comma-separated list of `due_date`, `priority`, `created_at`, `updated_at`;
///   prefix with `-` for descending. Defaults to `due_date`.
///
/// ## Responses:
/// - `200 OK`: JSON array of `Task` objects.
/// - `400 Bad Request`: Malformed filter value or unknown ordering field.
/// - `401 Unauthorized`: Missing or invalid access token.
#[get("")]
pub async fn get_tasks(
    pool: web::Data<PgPool>,
    _user: AuthenticatedUser,
    query_params: web::Query<TaskQuery>,
) -> Result<impl Responder, AppError> {
    let tasks = Task::list(&pool, &query_params).await?;
    Ok(HttpResponse::Ok().json(tasks))
}

/// Creates a new task.
///
/// `assigned_to` is taken from the body and must reference an existing user;
/// `project`, when given, must reference an existing project.
///
/// ## Responses:
/// - `201 Created`: The newly created `Task`.
/// - `400 Bad Request`: Missing or invalid fields, unknown assignee or project.
/// - `401 Unauthorized`: Missing or invalid access token.
#[post("")]
pub async fn create_task(
    pool: web::Data<PgPool>,
    user: AuthenticatedUser,
    task_data: web::Json<TaskInput>,
) -> Result<impl Responder, AppError> {
    task_data.validate()?;

    let task = Task::create(&pool, task_data.into_inner()).await?;
    log::info!("user {} created task {} ({})", user.id, task.id, task);

    Ok(HttpResponse::Created().json(task))
}

/// Retrieves a specific task by its ID.
///
/// ## Responses:
/// - `200 OK`: The `Task`.
/// - `404 Not Found`: No task with this id.
#[get("/{id}")]
pub async fn get_task(
    pool: web::Data<PgPool>,
    user: AuthenticatedUser,
    task_id: web::Path<Uuid>,
) -> Result<impl Responder, AppError> {
    let task = find_task(&pool, *task_id).await?;
    authorize(&user, Action::Retrieve, &task)?;
    Ok(HttpResponse::Ok().json(task))
}

/// Partially updates a task.
///
/// Only the assignee or an admin may update a task.
///
/// ## Responses:
/// - `200 OK`: The updated `Task`.
/// - `400 Bad Request`: Invalid fields.
/// - `403 Forbidden`: The requester is neither the assignee nor an admin.
/// - `404 Not Found`: No task with this id.
#[route("/{id}", method = "PATCH", method = "PUT")]
pub async fn update_task(
    pool: web::Data<PgPool>,
    user: AuthenticatedUser,
    task_id: web::Path<Uuid>,
    task_data: web::Json<TaskPatch>,
) -> Result<impl Responder, AppError> {
    task_data.validate()?;

    let task = find_task(&pool, *task_id).await?;
    authorize(&user, Action::Update, &task)?;

    let updated = Task::update(&pool, task.id, task_data.into_inner()).await?;
    log::info!("user {} updated task {}", user.id, updated.id);

    Ok(HttpResponse::Ok().json(updated))
}

/// Deletes a task.
///
/// ## Responses:
/// - `204 No Content`: The task was deleted.
/// - `403 Forbidden`: The requester is neither the assignee nor an admin.
/// - `404 Not Found`: No task with this id.
#[delete("/{id}")]
pub async fn delete_task(
    pool: web::Data<PgPool>,
    user: AuthenticatedUser,
    task_id: web::Path<Uuid>,
) -> Result<impl Responder, AppError> {
    let task = find_task(&pool, *task_id).await?;
    authorize(&user, Action::Delete, &task)?;

    Task::delete(&pool, task.id).await?;
    log::info!("user {} deleted task {}", user.id, task.id);

    Ok(HttpResponse::NoContent().finish())
}

async fn find_task(pool: &PgPool, id: Uuid) -> Result<Task, AppError> {
    Task::find(pool, id)
        .await?
        .ok_or_else(|| AppError::NotFound("Task not found".into()))
}
