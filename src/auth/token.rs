use crate::config::AuthConfig;
use crate::error::AppError;
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Distinguishes short-lived access tokens from long-lived refresh tokens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenType {
    /// Sent with every request in the `Authorization` header.
    Access,
    /// Only accepted by the refresh endpoint to mint a new access token.
    Refresh,
}

impl TokenType {
    fn lifetime(self, config: &AuthConfig) -> Duration {
        match self {
            TokenType::Access => config.access_token_ttl,
            TokenType::Refresh => config.refresh_token_ttl,
        }
    }
}

/// Represents the claims encoded within a JWT (JSON Web Token).
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    /// Subject of the token, the user's id.
    pub sub: i32,
    /// Expiration timestamp (seconds since epoch).
    pub exp: i64,
    /// Issued-at timestamp (seconds since epoch).
    pub iat: i64,
    /// Unique token id; two tokens issued in the same second still differ.
    pub jti: Uuid,
    pub token_type: TokenType,
}

/// An access token together with the refresh token that can renew it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenPair {
    pub access: String,
    pub refresh: String,
}

/// Signs a token of the given type for `user_id`, valid for the configured lifetime.
pub fn generate_token(config: &AuthConfig, user_id: i32, token_type: TokenType) -> Result<String, AppError> {
    let now = Utc::now();
    let claims = Claims {
        sub: user_id,
        exp: (now + token_type.lifetime(config)).timestamp(),
        iat: now.timestamp(),
        jti: Uuid::new_v4(),
        token_type,
    };

    encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(config.jwt_secret.as_bytes()),
    )
    .map_err(|e| AppError::InternalServerError(format!("Failed to generate token: {}", e)))
}

/// Issues a fresh access/refresh pair after a successful login.
pub fn issue_token_pair(config: &AuthConfig, user_id: i32) -> Result<TokenPair, AppError> {
    Ok(TokenPair {
        access: generate_token(config, user_id, TokenType::Access)?,
        refresh: generate_token(config, user_id, TokenType::Refresh)?,
    })
}

/// Verifies signature and expiry and checks the token is of the `expected` type.
///
/// Any failure is `AppError::Unauthorized`.
pub fn verify_token(config: &AuthConfig, token: &str, expected: TokenType) -> Result<Claims, AppError> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.leeway = 0;

    let claims = decode::<Claims>(
        token,
        &DecodingKey::from_secret(config.jwt_secret.as_bytes()),
        &validation,
    )
    .map(|data| data.claims)?;

    if claims.token_type != expected {
        return Err(AppError::Unauthorized(format!(
            "Invalid token: expected a {:?} token",
            expected
        )));
    }

    Ok(claims)
}

/// Exchanges a valid refresh token for a new access token.
pub fn refresh_access_token(config: &AuthConfig, refresh_token: &str) -> Result<String, AppError> {
    let claims = verify_token(config, refresh_token, TokenType::Refresh)?;
    generate_token(config, claims.sub, TokenType::Access)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(secret: &str) -> AuthConfig {
        AuthConfig::new(secret)
    }

    #[test]
    fn test_token_generation_and_verification() {
        let config = config("test_secret_for_gen_verify");
        let token = generate_token(&config, 1, TokenType::Access).unwrap();
        let claims = verify_token(&config, &token, TokenType::Access).unwrap();
        assert_eq!(claims.sub, 1);
        assert_eq!(claims.token_type, TokenType::Access);
        assert_eq!(claims.exp - claims.iat, 5 * 60);
    }

    #[test]
    fn test_token_pair_lifetimes() {
        let config = config("pair_secret");
        let pair = issue_token_pair(&config, 7).unwrap();
        assert!(!pair.access.is_empty());
        assert!(!pair.refresh.is_empty());
        assert_ne!(pair.access, pair.refresh);

        let refresh = verify_token(&config, &pair.refresh, TokenType::Refresh).unwrap();
        assert_eq!(refresh.exp - refresh.iat, 24 * 60 * 60);
    }

    #[test]
    fn test_token_types_are_not_interchangeable() {
        let config = config("type_secret");
        let pair = issue_token_pair(&config, 3).unwrap();

        assert!(matches!(
            verify_token(&config, &pair.refresh, TokenType::Access),
            Err(AppError::Unauthorized(_))
        ));
        assert!(matches!(
            refresh_access_token(&config, &pair.access),
            Err(AppError::Unauthorized(_))
        ));
    }

    #[test]
    fn test_refresh_issues_new_access_token() {
        let config = config("refresh_secret");
        let pair = issue_token_pair(&config, 42).unwrap();

        let access = refresh_access_token(&config, &pair.refresh).unwrap();
        assert_ne!(access, pair.access);
        let claims = verify_token(&config, &access, TokenType::Access).unwrap();
        assert_eq!(claims.sub, 42);
    }

    #[test]
    fn test_token_expiration() {
        let config = config("test_secret_for_expiration");
        let past = Utc::now() - Duration::hours(2);
        let claims_expired = Claims {
            sub: 2,
            exp: past.timestamp(),
            iat: (past - Duration::minutes(5)).timestamp(),
            jti: Uuid::new_v4(),
            token_type: TokenType::Access,
        };
        let expired_token = encode(
            &Header::default(),
            &claims_expired,
            &EncodingKey::from_secret(config.jwt_secret.as_bytes()),
        )
        .unwrap();

        match verify_token(&config, &expired_token, TokenType::Access) {
            Err(AppError::Unauthorized(msg)) => assert!(msg.contains("ExpiredSignature"), "{}", msg),
            other => panic!("Token should have been rejected as expired, got {:?}", other),
        }
    }

    #[test]
    fn test_invalid_token_signature() {
        let token = generate_token(&config("signing_secret"), 1, TokenType::Access).unwrap();

        match verify_token(&config("a_completely_different_secret"), &token, TokenType::Access) {
            Err(AppError::Unauthorized(msg)) => assert!(msg.contains("InvalidSignature"), "{}", msg),
            other => panic!("Token should have been invalid due to signature mismatch, got {:?}", other),
        }
    }

    #[test]
    fn test_tampered_token_is_rejected() {
        let config = config("tamper_secret");
        let token = generate_token(&config, 1, TokenType::Access).unwrap();
        let tampered = format!("{}x", token);
        assert!(verify_token(&config, &tampered, TokenType::Access).is_err());
        assert!(verify_token(&config, "not-a-jwt", TokenType::Access).is_err());
    }
}
