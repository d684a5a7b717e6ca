pub mod extractors;
pub mod middleware;
pub mod password;
pub mod token;

use lazy_static::lazy_static;
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::error::AppError;
use crate::models::{Avatar, Role, User};

// Re-export necessary items
pub use extractors::AuthenticatedUser;
pub use middleware::AuthMiddleware;
pub use password::{hash_password, verify_password};
pub use token::{generate_token, issue_token_pair, refresh_access_token, verify_token, Claims, TokenPair, TokenType};

lazy_static! {
    // Letters, digits and @ . + - _
    static ref USERNAME_REGEX: regex::Regex = regex::Regex::new(r"^[A-Za-z0-9@.+_-]+$").unwrap();
}

/// Represents the payload for a login request.
///
/// Both fields are optional at the wire level so a missing one is reported as
/// invalid credentials rather than a malformed body.
#[derive(Debug, Default, Deserialize)]
pub struct LoginRequest {
    pub username: Option<String>,
    pub password: Option<String>,
}

impl LoginRequest {
    /// Returns `(username, password)` or `Unauthorized` when either is missing or blank.
    pub fn credentials(self) -> Result<(String, String), AppError> {
        match (self.username, self.password) {
            (Some(username), Some(password)) if !username.trim().is_empty() && !password.is_empty() => {
                Ok((username, password))
            }
            _ => Err(AppError::Unauthorized(
                "Must include \"username\" and \"password\".".into(),
            )),
        }
    }
}

/// Represents the payload for a new user registration request.
#[derive(Debug, Deserialize, Validate)]
pub struct RegisterRequest {
    /// Between 3 and 150 characters: letters, digits and `@ . + - _`.
    #[validate(
        length(min = 3, max = 150),
        regex(
            path = "USERNAME_REGEX",
            message = "Username may only contain letters, digits and @/./+/-/_"
        )
    )]
    pub username: String,
    #[validate(email)]
    pub email: String,
    /// Must be at least 8 characters long.
    #[validate(length(min = 8))]
    pub password: String,
    /// Defaults to `user`.
    pub role: Option<Role>,
    #[validate(length(max = 150))]
    pub first_name: Option<String>,
    #[validate(length(max = 150))]
    pub last_name: Option<String>,
    pub avatar: Option<Avatar>,
}

/// Response body of a successful login.
#[derive(Debug, Serialize, Deserialize)]
pub struct LoginResponse {
    pub user: User,
    pub access: String,
    pub refresh: String,
}

#[derive(Debug, Deserialize)]
pub struct RefreshRequest {
    pub refresh: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RefreshResponse {
    pub access: String,
}
