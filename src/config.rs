use std::env;

use chrono::Duration;

/// Upper bound for any token lifetime: one year.
const MAX_TOKEN_TTL_MINUTES: i64 = 365 * 24 * 60;

/// Errors raised while reading configuration from the environment.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),
    #[error("{name} has an invalid value: {value}")]
    Invalid { name: &'static str, value: String },
}

/// Settings shared by the token issuer, the auth middleware and registration.
#[derive(Debug, Clone)]
pub struct AuthConfig {
    /// HMAC secret used to sign and verify access and refresh tokens.
    pub jwt_secret: String,
    /// Lifetime of an access token.
    pub access_token_ttl: Duration,
    /// Lifetime of a refresh token.
    pub refresh_token_ttl: Duration,
    /// Whether self-service registration may request the `admin` role.
    pub allow_admin_registration: bool,
}

impl AuthConfig {
    /// Builds an `AuthConfig` with default lifetimes (5 minutes / 1 day).
    pub fn new(jwt_secret: impl Into<String>) -> Self {
        Self {
            jwt_secret: jwt_secret.into(),
            access_token_ttl: Duration::minutes(5),
            refresh_token_ttl: Duration::days(1),
            allow_admin_registration: false,
        }
    }
}

pub struct Config {
    pub database_url: String,
    pub database_max_connections: u32,
    pub server_port: u16,
    pub server_host: String,
    pub auth: AuthConfig,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        let database_url = required("DATABASE_URL")?;
        let jwt_secret = required("JWT_SECRET")?;

        let auth = AuthConfig {
            jwt_secret,
            access_token_ttl: ttl_minutes("ACCESS_TOKEN_TTL_MINUTES", 5)?,
            refresh_token_ttl: ttl_minutes("REFRESH_TOKEN_TTL_MINUTES", 24 * 60)?,
            allow_admin_registration: parsed("ALLOW_ADMIN_REGISTRATION", false)?,
        };

        Ok(Self {
            database_url,
            database_max_connections: parsed("DATABASE_MAX_CONNECTIONS", 5)?,
            server_port: parsed("SERVER_PORT", 8080)?,
            server_host: env::var("SERVER_HOST").unwrap_or_else(|_| "127.0.0.1".to_string()),
            auth,
        })
    }

    pub fn server_url(&self) -> String {
        format!("http://{}:{}", self.server_host, self.server_port)
    }
}

fn required(name: &'static str) -> Result<String, ConfigError> {
    env::var(name).map_err(|_| ConfigError::Missing(name))
}

fn parsed<T: std::str::FromStr>(name: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(name) {
        Ok(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { name, value }),
        Err(_) => Ok(default),
    }
}

/// A token lifetime in minutes, between one minute and [`MAX_TOKEN_TTL_MINUTES`].
fn ttl_minutes(name: &'static str, default: i64) -> Result<Duration, ConfigError> {
    let minutes = parsed(name, default)?;
    if !(1..=MAX_TOKEN_TTL_MINUTES).contains(&minutes) {
        return Err(ConfigError::Invalid { name, value: minutes.to_string() });
    }
    Ok(Duration::minutes(minutes))
}

#[cfg(test)]
mod tests {
    use super::*;

    // All environment mutation lives in one test so parallel tests never race on it.
    #[test]
    fn test_config_from_env() {
        env::remove_var("DATABASE_URL");
        env::set_var("JWT_SECRET", "secret");
        assert!(matches!(
            Config::from_env(),
            Err(ConfigError::Missing("DATABASE_URL"))
        ));

        env::set_var("DATABASE_URL", "postgres://test");
        env::remove_var("SERVER_PORT");
        env::remove_var("SERVER_HOST");
        env::remove_var("ACCESS_TOKEN_TTL_MINUTES");
        env::remove_var("REFRESH_TOKEN_TTL_MINUTES");
        env::remove_var("ALLOW_ADMIN_REGISTRATION");

        let config = Config::from_env().unwrap();

        assert_eq!(config.database_url, "postgres://test");
        assert_eq!(config.server_port, 8080);
        assert_eq!(config.server_host, "127.0.0.1");
        assert_eq!(config.auth.access_token_ttl, Duration::minutes(5));
        assert_eq!(config.auth.refresh_token_ttl, Duration::days(1));
        assert!(!config.auth.allow_admin_registration);
        assert_eq!(config.server_url(), "http://127.0.0.1:8080");

        // Test custom values
        env::set_var("SERVER_PORT", "3000");
        env::set_var("SERVER_HOST", "0.0.0.0");
        env::set_var("ACCESS_TOKEN_TTL_MINUTES", "15");
        env::set_var("ALLOW_ADMIN_REGISTRATION", "true");

        let config = Config::from_env().unwrap();

        assert_eq!(config.server_port, 3000);
        assert_eq!(config.server_host, "0.0.0.0");
        assert_eq!(config.auth.access_token_ttl, Duration::minutes(15));
        assert!(config.auth.allow_admin_registration);

        env::set_var("SERVER_PORT", "not-a-port");
        assert!(matches!(
            Config::from_env(),
            Err(ConfigError::Invalid { name: "SERVER_PORT", .. })
        ));

        env::remove_var("SERVER_PORT");

        // Token lifetimes must be positive and at most a year
        for value in ["0", "-5", "525601", "999999999999"] {
            env::set_var("ACCESS_TOKEN_TTL_MINUTES", value);
            assert!(
                matches!(
                    Config::from_env(),
                    Err(ConfigError::Invalid { name: "ACCESS_TOKEN_TTL_MINUTES", .. })
                ),
                "{}",
                value
            );
        }
        env::remove_var("ACCESS_TOKEN_TTL_MINUTES");

        env::set_var("REFRESH_TOKEN_TTL_MINUTES", "525600");
        assert_eq!(Config::from_env().unwrap().auth.refresh_token_ttl, Duration::days(365));
        env::set_var("REFRESH_TOKEN_TTL_MINUTES", "-1");
        assert!(matches!(
            Config::from_env(),
            Err(ConfigError::Invalid { name: "REFRESH_TOKEN_TTL_MINUTES", .. })
        ));

        env::remove_var("SERVER_HOST");
        env::remove_var("REFRESH_TOKEN_TTL_MINUTES");
        env::remove_var("ALLOW_ADMIN_REGISTRATION");
    }
}
