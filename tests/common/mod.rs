#![allow(dead_code)]

use actix_web::{body::MessageBody, dev::ServiceResponse, http::StatusCode, test};
use dotenv::dotenv;
use serde_json::Value;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use taskhub::auth::{generate_token, hash_password, TokenType};
use taskhub::models::{Avatar, NewUser, Role, User};
use taskhub::AuthConfig;
use uuid::Uuid;

pub const PASSWORD: &str = "password123";
pub const SECRET: &str = "integration_test_secret";

/// Connects to `DATABASE_URL` and applies migrations.
///
/// Returns `None` when no database is configured so the calling test can bail out.
pub async fn test_pool() -> Option<PgPool> {
    dotenv().ok();
    let _ = env_logger::builder().is_test(true).try_init();

    let database_url = match std::env::var("DATABASE_URL") {
        Ok(url) => url,
        Err(_) => {
            log::warn!("DATABASE_URL is not set, skipping database test");
            return None;
        }
    };

    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&database_url)
        .await
        .expect("Failed to connect to test DB");
    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("Failed to run migrations");

    Some(pool)
}

pub fn auth_config() -> AuthConfig {
    AuthConfig::new(SECRET)
}

/// Builds the full application the same way the binary does.
macro_rules! test_app {
    ($pool:expr) => {
        test_app!($pool, common::auth_config())
    };
    ($pool:expr, $auth_config:expr) => {
        actix_web::test::init_service(
            actix_web::App::new()
                .app_data(actix_web::web::Data::new($pool.clone()))
                .app_data(actix_web::web::Data::new($auth_config))
                .wrap(actix_cors::Cors::permissive())
                .wrap(actix_web::middleware::Logger::default())
                .service(taskhub::routes::health::health)
                .service(
                    actix_web::web::scope("/api")
                        .wrap(taskhub::auth::AuthMiddleware)
                        .configure(taskhub::routes::config),
                ),
        )
        .await
    };
}

/// A username no other test run will collide with.
pub fn unique(prefix: &str) -> String {
    format!("{}_{}", prefix, &Uuid::new_v4().simple().to_string()[..12])
}

/// Inserts an account directly, bypassing registration.
pub async fn create_user(pool: &PgPool, role: Role) -> User {
    let username = unique(match role {
        Role::Admin => "admin",
        Role::User => "user",
    });
    User::create(
        pool,
        NewUser {
            email: format!("{}@example.com", username),
            username,
            password_hash: hash_password(PASSWORD).expect("Failed to hash password"),
            first_name: String::new(),
            last_name: String::new(),
            role,
            avatar: Avatar::Default,
        },
    )
    .await
    .expect("Failed to create user")
}

/// `Authorization` header value carrying a valid access token for `user`.
pub fn bearer(user: &User) -> (&'static str, String) {
    let token = generate_token(&auth_config(), user.id, TokenType::Access).expect("Failed to sign token");
    ("Authorization", format!("Bearer {}", token))
}

/// Reads the response status and its JSON body (`Value::Null` for an empty body).
pub async fn json_response<B: MessageBody>(resp: ServiceResponse<B>) -> (StatusCode, Value) {
    let status = resp.status();
    let bytes = test::read_body(resp).await;
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or_else(|e| {
            panic!(
                "Response body is not JSON ({}): {}",
                e,
                String::from_utf8_lossy(&bytes)
            )
        })
    };
    (status, body)
}

pub async fn delete_user(pool: &PgPool, user: &User) {
    let _ = User::delete(pool, user.id).await;
}
