use actix_web::dev::Payload;
use actix_web::{web, Error as ActixError, FromRequest, HttpMessage, HttpRequest};
use futures::future::LocalBoxFuture;
use sqlx::PgPool;

use crate::auth::token::Claims;
use crate::error::AppError;
use crate::models::User;
use crate::permissions::has_permission;

/// The user making the request, loaded from the database.
///
/// Relies on `AuthMiddleware` having validated the access token and stored its
/// [`Claims`] in the request extensions. Fails with `AppError::Unauthorized` when
/// the claims are absent or the account no longer exists.
#[derive(Debug, Clone)]
pub struct AuthenticatedUser(pub User);

impl AuthenticatedUser {
    pub fn into_inner(self) -> User {
        self.0
    }
}

impl std::ops::Deref for AuthenticatedUser {
    type Target = User;

    fn deref(&self) -> &User {
        &self.0
    }
}

impl FromRequest for AuthenticatedUser {
    type Error = ActixError;
    type Future = LocalBoxFuture<'static, Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        let user_id = req.extensions().get::<Claims>().map(|claims| claims.sub);
        let pool = req.app_data::<web::Data<PgPool>>().cloned();

        Box::pin(async move {
            let user_id = user_id.ok_or_else(|| {
                AppError::Unauthorized("Authentication credentials were not provided".into())
            })?;
            let pool = pool.ok_or_else(|| {
                AppError::InternalServerError("Database pool is not registered".into())
            })?;

            match User::find(&pool, user_id).await? {
                Some(user) if has_permission(Some(&user)) => Ok(AuthenticatedUser(user)),
                _ => {
                    log::warn!("token for missing user {} rejected", user_id);
                    Err(AppError::Unauthorized("User not found".into()).into())
                }
            }
        })
    }
}
