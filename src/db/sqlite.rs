use crate::config::Config;
use sea_orm::{ConnectOptions, ConnectionTrait, Database, DatabaseConnection, DbErr, Statement};
use std::time::Duration;

pub type DbPool = DatabaseConnection;

const SCHEMA: &str = r#"
    CREATE TABLE IF NOT EXISTS users (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        username VARCHAR(20) NOT NULL UNIQUE,
        email VARCHAR(120) NOT NULL UNIQUE,
        password_hash VARCHAR(128) NOT NULL,
        bio VARCHAR(200),
        avatar VARCHAR(100) NOT NULL DEFAULT 'default_avatar.png',
        created_at TEXT NOT NULL
    );

    CREATE TABLE IF NOT EXISTS posts (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        content TEXT NOT NULL,
        image VARCHAR(100),
        user_id INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
        created_at TEXT NOT NULL
    );

    CREATE INDEX IF NOT EXISTS idx_posts_user_id ON posts(user_id);

    CREATE INDEX IF NOT EXISTS idx_posts_created_at ON posts(created_at);

    CREATE TABLE IF NOT EXISTS comments (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        content TEXT NOT NULL,
        user_id INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
        post_id INTEGER NOT NULL REFERENCES posts(id) ON DELETE CASCADE,
        created_at TEXT NOT NULL
    );

    CREATE INDEX IF NOT EXISTS idx_comments_post_id ON comments(post_id);

    CREATE TABLE IF NOT EXISTS likes (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        user_id INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
        post_id INTEGER NOT NULL REFERENCES posts(id) ON DELETE CASCADE,
        created_at TEXT NOT NULL,
        UNIQUE (user_id, post_id)
    );

    CREATE INDEX IF NOT EXISTS idx_likes_post_id ON likes(post_id);

    CREATE TABLE IF NOT EXISTS follows (
        follower_id INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
        followed_id INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
        created_at TEXT NOT NULL,
        PRIMARY KEY (follower_id, followed_id),
        CHECK (follower_id != followed_id)
    );

    CREATE INDEX IF NOT EXISTS idx_follows_followed_id ON follows(followed_id)
"#;

pub async fn create_pool(config: &Config) -> Result<DbPool, anyhow::Error> {
    let url = config.database.url.clone();
    let mut options = ConnectOptions::new(url.clone());
    options
        .connect_timeout(Duration::from_secs(8))
        .sqlx_logging(false);

    // Every connection to `:memory:` opens its own private database.
    if url.contains(":memory:") {
        options.max_connections(1).min_connections(1);
    }

    let db = Database::connect(options).await?;
    create_schema(&db).await?;

    log::info!("Database ready at {}", url);
    Ok(db)
}

pub async fn create_schema(db: &DbPool) -> Result<(), DbErr> {
    db.execute(Statement::from_string(
        db.get_database_backend(),
        "PRAGMA foreign_keys = ON".to_string(),
    ))
    .await?;

    for statement in SCHEMA.split(';') {
        let statement = statement.trim();
        if !statement.is_empty() {
            let stmt = Statement::from_string(db.get_database_backend(), statement.to_string());
            db.execute(stmt).await?;
        }
    }

    Ok(())
}
