use serde::{Deserialize, Serialize};
use std::env;

use crate::models::UserId;

/// Terms rejected in comments unless `BLOCKED_TERMS` overrides them.
pub const DEFAULT_BLOCKED_TERMS: &[&str] = &["porn", "nude", "nudes", "sex", "badword"];

pub const DEFAULT_CORS_ORIGIN: &str = "http://localhost:5173";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub database: DatabaseConfig,
    pub server: ServerConfig,
    pub auth: AuthConfig,
    pub moderation: ModerationConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Snowflake node id, must be below 1024.
    pub node_id: u16,
    /// Browser origins allowed to call the API with the session cookie.
    pub cors_origins: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    pub secret_key: String,
    /// The protected owner account. `None` disables owner privileges entirely.
    pub owner_id: Option<UserId>,
    pub session_ttl_hours: i64,
    pub secure_cookies: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModerationConfig {
    pub blocked_terms: Vec<String>,
    /// Terms that may not appear in usernames or emails at registration.
    pub reserved_terms: Vec<String>,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        let secret_key = env::var("SECRET_KEY")
            .map_err(|_| anyhow::anyhow!("SECRET_KEY must be set"))?;

        let owner_id = match env::var("OWNER_ID") {
            Ok(raw) if !raw.trim().is_empty() => Some(
                raw.trim()
                    .parse::<UserId>()
                    .map_err(|e| anyhow::anyhow!("OWNER_ID is not a valid id: {}", e))?,
            ),
            _ => None,
        };

        let node_id: u16 = env::var("NODE_ID")
            .unwrap_or_else(|_| "0".to_string())
            .parse()
            .unwrap_or(0);
        if node_id >= 1024 {
            anyhow::bail!("NODE_ID must be less than 1024, got {}", node_id);
        }

        Ok(Self {
            database: DatabaseConfig {
                url: env::var("DATABASE_URL")
                    .unwrap_or_else(|_| "sqlite:data/social_graph.db?mode=rwc".to_string()),
                max_connections: env::var("DATABASE_MAX_CONNECTIONS")
                    .unwrap_or_else(|_| "8".to_string())
                    .parse()
                    .unwrap_or(8),
            },
            server: ServerConfig {
                host: env::var("SERVER_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
                port: env::var("SERVER_PORT")
                    .unwrap_or_else(|_| "8000".to_string())
                    .parse()
                    .unwrap_or(8000),
                node_id,
                cors_origins: term_list("CORS_ALLOWED_ORIGINS")
                    .unwrap_or_else(|| vec![DEFAULT_CORS_ORIGIN.to_string()]),
            },
            auth: AuthConfig {
                secret_key,
                owner_id,
                session_ttl_hours: 24,
                secure_cookies: env::var("APP_ENV").map(|v| v == "production").unwrap_or(false),
            },
            moderation: ModerationConfig {
                blocked_terms: term_list("BLOCKED_TERMS")
                    .unwrap_or_else(|| DEFAULT_BLOCKED_TERMS.iter().map(|t| t.to_string()).collect()),
                reserved_terms: term_list("RESERVED_TERMS").unwrap_or_default(),
            },
        })
    }

    pub fn server_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

/// Comma separated list from the environment, blanks dropped.
fn term_list(key: &str) -> Option<Vec<String>> {
    env::var(key).ok().map(|raw| parse_terms(&raw))
}

fn parse_terms(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}
