use crate::auth::{MAX_HASH_COST, MIN_HASH_COST};
use serde::Deserialize;
use std::env;
use std::path::PathBuf;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub session: SessionConfig,
    pub database: DatabaseConfig,
    pub uploads: UploadConfig,
    pub pagination: PaginationConfig,
    pub feed: FeedConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SessionConfig {
    pub secret: String,
    pub lifetime_hours: i64,
    pub remember_me_days: i64,
    pub bcrypt_cost: u32,
    /// Marks the session cookie `Secure`; leave off for plain-HTTP development.
    pub secure_cookie: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UploadConfig {
    pub folder: PathBuf,
    pub max_content_length: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PaginationConfig {
    pub posts_per_page: u64,
    pub users_per_page: u64,
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct FeedConfig {
    pub include_own_posts: bool,
}

fn var_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.parse::<T>().ok())
        .unwrap_or(default)
}

impl Config {
    pub fn from_env() -> Result<Self, anyhow::Error> {
        dotenv::dotenv().ok();

        let secret = env::var("SECRET_KEY").unwrap_or_else(|_| {
            log::warn!("SECRET_KEY not set, falling back to the development key");
            "dev-secret-key-change-in-production".to_string()
        });

        let bcrypt_cost = var_or("BCRYPT_COST", bcrypt::DEFAULT_COST);
        if !(MIN_HASH_COST..=MAX_HASH_COST).contains(&bcrypt_cost) {
            anyhow::bail!(
                "BCRYPT_COST must be between {} and {}",
                MIN_HASH_COST,
                MAX_HASH_COST
            );
        }

        Ok(Config {
            server: ServerConfig {
                host: env::var("SERVER_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
                port: var_or("SERVER_PORT", 8080),
            },
            session: SessionConfig {
                secret,
                lifetime_hours: var_or("SESSION_LIFETIME_HOURS", 1),
                remember_me_days: var_or("REMEMBER_ME_DAYS", 365),
                bcrypt_cost,
                secure_cookie: var_or("SESSION_COOKIE_SECURE", false),
            },
            database: DatabaseConfig {
                url: env::var("DATABASE_URL")
                    .unwrap_or_else(|_| "sqlite://socialconnect.db?mode=rwc".to_string()),
            },
            uploads: UploadConfig {
                folder: env::var("UPLOAD_FOLDER")
                    .map(PathBuf::from)
                    .unwrap_or_else(|_| PathBuf::from("static/uploads")),
                max_content_length: var_or("MAX_CONTENT_LENGTH", 16 * 1024 * 1024),
            },
            pagination: PaginationConfig {
                posts_per_page: var_or("POSTS_PER_PAGE", 10),
                users_per_page: var_or("USERS_PER_PAGE", 20),
            },
            feed: FeedConfig {
                include_own_posts: var_or("FEED_INCLUDE_OWN_POSTS", true),
            },
        })
    }

    /// In-memory database, cheap password hashing and a caller-owned upload
    /// directory.
    pub fn for_tests(upload_folder: PathBuf) -> Self {
        Config {
            server: ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 0,
            },
            session: SessionConfig {
                secret: "test-secret-key".to_string(),
                lifetime_hours: 1,
                remember_me_days: 365,
                bcrypt_cost: MIN_HASH_COST,
                secure_cookie: false,
            },
            database: DatabaseConfig {
                url: "sqlite::memory:".to_string(),
            },
            uploads: UploadConfig {
                folder: upload_folder,
                max_content_length: 16 * 1024 * 1024,
            },
            pagination: PaginationConfig {
                posts_per_page: 10,
                users_per_page: 20,
            },
            feed: FeedConfig {
                include_own_posts: true,
            },
        }
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}
