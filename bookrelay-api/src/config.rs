/// Configuration management for the API server
///
/// This module loads configuration from environment variables and
/// provides a type-safe configuration struct.
///
/// # Environment Variables
///
/// - `DATABASE_URL`: PostgreSQL connection string (required)
/// - `DATABASE_MAX_CONNECTIONS`: Pool size (default: 10)
/// - `API_HOST`: Host to bind to (default: 0.0.0.0)
/// - `API_PORT`: Port to bind to (default: 8080)
/// - `JWT_SECRET`: Secret key for JWT signing (required, >= 32 bytes)
/// - `MAIL_ENDPOINT`: Mail relay URL; activation codes are logged
///   instead of sent when unset
/// - `MAIL_FROM`: Sender address (default: no-reply@bookrelay.local)
/// - `COVERS_DIR`: Directory for cover assets (default: ./covers)
/// - `RUST_LOG`: Log level (default: info)
///
/// # Example
///
/// ```no_run
/// use bookrelay_api::config::Config;
///
/// # fn example() -> anyhow::Result<()> {
/// let config = Config::from_env()?;
/// println!("Server will listen on {}:{}", config.api.host, config.api.port);
/// # Ok(())
/// # }
/// ```

use serde::{Deserialize, Serialize};
use std::env;

/// Complete application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// API server configuration
    pub api: ApiConfig,

    /// Database configuration
    pub database: DatabaseConfig,

    /// JWT configuration
    pub jwt: JwtConfig,

    /// Outbound mail configuration
    pub mail: MailConfig,

    /// Cover asset storage configuration
    pub covers: CoversConfig,
}

/// API server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Host to bind to
    pub host: String,

    /// Port to bind to
    pub port: u16,
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// PostgreSQL connection URL
    pub url: String,

    /// Maximum number of connections in pool
    pub max_connections: u32,
}

/// JWT configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JwtConfig {
    /// Secret key for JWT signing
    ///
    /// IMPORTANT: This must be kept secret and should be at least 32 bytes.
    /// Generate with: `openssl rand -hex 32`
    pub secret: String,
}

/// Outbound mail configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MailConfig {
    /// HTTP endpoint of the mail relay; None disables delivery and
    /// logs the activation codes instead
    pub endpoint: Option<String>,

    /// Sender address
    pub from: String,
}

/// Cover asset storage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoversConfig {
    /// Directory where cover files are written
    pub dir: String,
}

impl Config {
    /// Loads configuration from environment variables
    ///
    /// # Errors
    ///
    /// Returns an error if required environment variables are missing
    /// or have invalid values.
    pub fn from_env() -> anyhow::Result<Self> {
        // Load .env file if present (for development)
        dotenvy::dotenv().ok();

        let api_host = env::var("API_HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
        let api_port = env::var("API_PORT")
            .unwrap_or_else(|_| "8080".to_string())
            .parse::<u16>()?;

        let database_url = env::var("DATABASE_URL")
            .map_err(|_| anyhow::anyhow!("DATABASE_URL environment variable is required"))?;

        let max_connections = env::var("DATABASE_MAX_CONNECTIONS")
            .unwrap_or_else(|_| "10".to_string())
            .parse::<u32>()?;

        let jwt_secret = env::var("JWT_SECRET")
            .map_err(|_| anyhow::anyhow!("JWT_SECRET environment variable is required"))?;

        if jwt_secret.len() < 32 {
            anyhow::bail!("JWT_SECRET must be at least 32 characters long");
        }

        let mail_endpoint = env::var("MAIL_ENDPOINT").ok();
        let mail_from =
            env::var("MAIL_FROM").unwrap_or_else(|_| "no-reply@bookrelay.local".to_string());

        let covers_dir = env::var("COVERS_DIR").unwrap_or_else(|_| "./covers".to_string());

        Ok(Self {
            api: ApiConfig {
                host: api_host,
                port: api_port,
            },
            database: DatabaseConfig {
                url: database_url,
                max_connections,
            },
            jwt: JwtConfig { secret: jwt_secret },
            mail: MailConfig {
                endpoint: mail_endpoint,
                from: mail_from,
            },
            covers: CoversConfig { dir: covers_dir },
        })
    }

    /// Returns the server bind address
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.api.host, self.api.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bind_address() {
        let config = Config {
            api: ApiConfig {
                host: "127.0.0.1".to_string(),
                port: 8080,
            },
            database: DatabaseConfig {
                url: "postgresql://localhost/test".to_string(),
                max_connections: 10,
            },
            jwt: JwtConfig {
                secret: "test-secret-key-at-least-32-bytes-long".to_string(),
            },
            mail: MailConfig {
                endpoint: None,
                from: "no-reply@bookrelay.local".to_string(),
            },
            covers: CoversConfig {
                dir: "./covers".to_string(),
            },
        };

        assert_eq!(config.bind_address(), "127.0.0.1:8080");
    }
}
