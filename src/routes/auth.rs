use crate::{
    auth::{
        hash_password, issue_token_pair, refresh_access_token, verify_password, AuthenticatedUser,
        LoginRequest, LoginResponse, RefreshRequest, RefreshResponse, RegisterRequest,
    },
    config::AuthConfig,
    error::AppError,
    models::{NewUser, ProfileChanges, Role, User},
    permissions::{authorize_profile, can_change_role, Action},
};
use actix_web::{get, post, route, web, HttpResponse, Responder};
use sqlx::PgPool;
use validator::Validate;

/// Login user
///
/// Checks `username`/`password` and returns the user together with a fresh
/// access/refresh token pair. Missing fields and wrong credentials both answer 401.
#[post("/login")]
pub async fn login(
    pool: web::Data<PgPool>,
    auth_config: web::Data<AuthConfig>,
    login_data: web::Json<LoginRequest>,
) -> Result<impl Responder, AppError> {
    let (username, password) = login_data.into_inner().credentials()?;

    let user = match User::find_by_username(&pool, &username).await? {
        Some(user) if verify_password(&password, &user.password_hash)? => user,
        _ => {
            log::warn!("failed login attempt for username {:?}", username);
            return Err(AppError::Unauthorized(
                "No active account found with the given credentials".into(),
            ));
        }
    };

    let tokens = issue_token_pair(&auth_config, user.id)?;
    log::info!("user {} logged in", user.id);

    Ok(HttpResponse::Ok().json(LoginResponse {
        user,
        access: tokens.access,
        refresh: tokens.refresh,
    }))
}

/// Exchange a refresh token for a new access token.
#[post("/token/refresh")]
pub async fn refresh(
    auth_config: web::Data<AuthConfig>,
    refresh_data: web::Json<RefreshRequest>,
) -> Result<impl Responder, AppError> {
    let access = refresh_access_token(&auth_config, &refresh_data.refresh).map_err(|e| {
        log::warn!("refresh rejected: {}", e);
        e
    })?;

    Ok(HttpResponse::Ok().json(RefreshResponse { access }))
}

/// Register a new user
///
/// Creates a `user` account (or an `admin` one when self-service admin
/// registration is enabled) and answers `201 Created` with the stored record.
#[post("/register")]
pub async fn register(
    pool: web::Data<PgPool>,
    auth_config: web::Data<AuthConfig>,
    register_data: web::Json<RegisterRequest>,
) -> Result<impl Responder, AppError> {
    create_account(&pool, &auth_config, register_data.into_inner()).await
}

/// Alias of [`register`].
#[post("/signup")]
pub async fn signup(
    pool: web::Data<PgPool>,
    auth_config: web::Data<AuthConfig>,
    register_data: web::Json<RegisterRequest>,
) -> Result<impl Responder, AppError> {
    create_account(&pool, &auth_config, register_data.into_inner()).await
}

async fn create_account(
    pool: &PgPool,
    auth_config: &AuthConfig,
    request: RegisterRequest,
) -> Result<HttpResponse, AppError> {
    request.validate()?;

    let role = request.role.unwrap_or_default();
    if role == Role::Admin && !auth_config.allow_admin_registration {
        log::warn!("refused self-registration of admin account {:?}", request.username);
        return Err(AppError::Forbidden(
            "Admin accounts cannot be created through registration".into(),
        ));
    }

    if User::find_by_username(pool, &request.username).await?.is_some() {
        return Err(AppError::ValidationError(
            "A user with that username already exists".into(),
        ));
    }
    if User::find_by_email(pool, &request.email).await?.is_some() {
        return Err(AppError::ValidationError("Email already registered".into()));
    }

    let password_hash = hash_password(&request.password)?;

    let user = User::create(
        pool,
        NewUser {
            username: request.username,
            email: request.email,
            password_hash,
            first_name: request.first_name.unwrap_or_default(),
            last_name: request.last_name.unwrap_or_default(),
            role,
            avatar: request.avatar.unwrap_or_default(),
        },
    )
    .await?;

    log::info!("registered user {} ({:?})", user.id, user.role);
    Ok(HttpResponse::Created().json(user))
}

/// The authenticated user's own record.
#[get("/profile")]
pub async fn get_profile(user: AuthenticatedUser) -> Result<impl Responder, AppError> {
    Ok(HttpResponse::Ok().json(user.into_inner()))
}

/// Partially update the authenticated user's profile.
///
/// Accepts `first_name`, `last_name`, `email`, `avatar` and `role`. Only an
/// admin may change a role.
#[route("/profile", method = "PUT", method = "PATCH")]
pub async fn update_profile(
    pool: web::Data<PgPool>,
    user: AuthenticatedUser,
    changes: web::Json<ProfileChanges>,
) -> Result<impl Responder, AppError> {
    changes.validate()?;
    authorize_profile(&user, Action::Update, &user)?;

    let changes = changes.into_inner();
    if matches!(changes.role, Some(role) if role != user.role) && !can_change_role(&user) {
        log::warn!("user {} attempted to change their own role", user.id);
        return Err(AppError::Forbidden(
            "Only administrators can change roles".into(),
        ));
    }
    if let Some(email) = changes.email.as_deref() {
        if matches!(User::find_by_email(&pool, email).await?, Some(other) if other.id != user.id) {
            return Err(AppError::ValidationError("Email already registered".into()));
        }
    }

    let updated = User::update_profile(&pool, user.id, changes).await?;
    log::info!("user {} updated their profile", updated.id);

    Ok(HttpResponse::Ok().json(updated))
}
