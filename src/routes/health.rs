use actix_web::{get, web, HttpResponse, Responder};
use chrono::Utc;
use serde_json::json;
use sqlx::PgPool;

/// Health check endpoint
///
/// Reports the API status, the database reachability and the current timestamp.
/// Answers `503 Service Unavailable` when the database cannot be reached.
#[get("/health")]
pub async fn health(pool: Option<web::Data<PgPool>>) -> impl Responder {
    let database = match pool {
        Some(pool) => match sqlx::query("SELECT 1").execute(pool.get_ref()).await {
            Ok(_) => "ok",
            Err(e) => {
                log::error!("health check could not reach the database: {}", e);
                "unavailable"
            }
        },
        None => "not configured",
    };

    let body = json!({
        "status": if database == "unavailable" { "degraded" } else { "ok" },
        "database": database,
        "timestamp": Utc::now()
    });

    if database == "unavailable" {
        HttpResponse::ServiceUnavailable().json(body)
    } else {
        HttpResponse::Ok().json(body)
    }
}
