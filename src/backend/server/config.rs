/**
 * Server Configuration
 *
 * Loads server settings from the environment (`.env` is read by the binary
 * through `dotenv`) and connects the optional PostgreSQL database.
 *
 * # Environment
 *
 * - `SERVER_PORT` - listen port, default 3000
 * - `DATABASE_URL` - PostgreSQL URL; persistence is disabled when unset
 * - `JWT_SECRET` - token signing secret
 * - `DEV_USER_ID` - when set, a token for this user is logged at startup
 *
 * # Error Handling
 *
 * Database errors are logged but do not prevent server startup. The server
 * keeps running on the in-memory store alone.
 */

use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use uuid::Uuid;

pub const DEFAULT_SERVER_PORT: u16 = 3000;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub port: u16,
    pub database_url: Option<String>,
    pub dev_user_id: Option<Uuid>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_SERVER_PORT,
            database_url: None,
            dev_user_id: None,
        }
    }
}

impl ServerConfig {
    pub fn from_env() -> Self {
        let port = match std::env::var("SERVER_PORT") {
            Ok(value) => value.parse::<u16>().unwrap_or_else(|_| {
                tracing::warn!("Invalid SERVER_PORT '{}', using {}", value, DEFAULT_SERVER_PORT);
                DEFAULT_SERVER_PORT
            }),
            Err(_) => DEFAULT_SERVER_PORT,
        };

        let dev_user_id = std::env::var("DEV_USER_ID").ok().and_then(|value| {
            Uuid::parse_str(&value)
                .map_err(|e| tracing::warn!("Ignoring invalid DEV_USER_ID: {}", e))
                .ok()
        });

        Self {
            port,
            database_url: std::env::var("DATABASE_URL").ok().filter(|url| !url.is_empty()),
            dev_user_id,
        }
    }
}

/// Database configuration result, `None` when persistence is disabled
pub type DatabaseConfig = Option<PgPool>;

/// Connect to PostgreSQL and run migrations.
///
/// Returns `None` when no URL is configured or the connection fails.
pub async fn load_database(database_url: Option<&str>) -> DatabaseConfig {
    let Some(database_url) = database_url else {
        tracing::warn!("DATABASE_URL not set. Progress will not be persisted.");
        return None;
    };

    tracing::info!("Connecting to database...");

    let pool = match PgPoolOptions::new().max_connections(5).connect(database_url).await {
        Ok(pool) => pool,
        Err(e) => {
            tracing::error!("Failed to create database connection pool: {:?}", e);
            tracing::warn!("Progress will not be persisted.");
            return None;
        }
    };

    tracing::info!("Running database migrations...");
    match sqlx::migrate!().run(&pool).await {
        Ok(_) => tracing::info!("Database migrations completed successfully"),
        Err(e) => {
            tracing::error!("Failed to run database migrations: {}", e);
            tracing::warn!("Continuing without migrations - database might not be up to date");
        }
    }

    Some(pool)
}
