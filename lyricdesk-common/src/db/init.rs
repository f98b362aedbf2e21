//! Database initialization for local mode
//!
//! Creates the SQLite file on first run and brings the schema up idempotently
//! (`CREATE TABLE IF NOT EXISTS`), so the service can start against an empty
//! data folder.

use crate::db::models::title_key;
use crate::Result;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;
use tracing::info;

/// Open (creating if needed) the database file and ensure the schema exists
pub async fn init_database(db_path: &Path) -> Result<SqlitePool> {
    let newly_created = !db_path.exists();

    // Create parent directory if it doesn't exist
    if let Some(parent) = db_path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    // Foreign keys are a per-connection pragma, so set them on the options
    let options = SqliteConnectOptions::from_str(&format!("sqlite://{}", db_path.display()))?
        .create_if_missing(true)
        .foreign_keys(true)
        .journal_mode(SqliteJournalMode::Wal)
        .busy_timeout(Duration::from_millis(5000));

    let pool = SqlitePoolOptions::new()
        .max_connections(8)
        .connect_with(options)
        .await?;

    if newly_created {
        info!("Initialized new database: {}", db_path.display());
    } else {
        info!("Opened existing database: {}", db_path.display());
    }

    create_schema(&pool).await?;
    Ok(pool)
}

/// In-memory database with the full schema
///
/// Limited to a single connection: every SQLite memory connection is its own
/// database.
pub async fn init_memory_database() -> Result<SqlitePool> {
    let options = SqliteConnectOptions::from_str("sqlite::memory:")?.foreign_keys(true);
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .min_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect_with(options)
        .await?;

    create_schema(&pool).await?;
    Ok(pool)
}

/// Create all tables (idempotent - safe to call multiple times)
pub async fn create_schema(pool: &SqlitePool) -> Result<()> {
    create_categories_table(pool).await?;
    create_songs_table(pool).await?;
    create_profiles_table(pool).await?;
    create_invite_logs_table(pool).await?;
    create_auth_users_table(pool).await?;
    Ok(())
}

async fn create_categories_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS categories (
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_songs_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS songs (
            id TEXT PRIMARY KEY,
            title TEXT NOT NULL CHECK (length(trim(title)) > 0),
            title_key TEXT,
            artist TEXT,
            album TEXT,
            genre TEXT,
            language TEXT,
            status TEXT NOT NULL DEFAULT 'draft'
                CHECK (status IN ('draft', 'published', 'archived')),
            featured INTEGER NOT NULL DEFAULT 0,
            lyrics TEXT,
            chords TEXT,
            lyrics_chordpro TEXT,
            cover_url TEXT,
            category_id TEXT REFERENCES categories(id) ON DELETE SET NULL,
            duration REAL CHECK (duration IS NULL OR duration >= 0),
            pending_lyrics TEXT,
            pending_chords TEXT,
            lyrics_approved INTEGER NOT NULL DEFAULT 1,
            chords_approved INTEGER NOT NULL DEFAULT 1,
            created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
            updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    ensure_title_key_column(pool).await?;
    backfill_title_keys(pool).await?;

    sqlx::query("DROP INDEX IF EXISTS idx_songs_title_lower")
        .execute(pool)
        .await?;
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_songs_title_key ON songs (title_key)")
        .execute(pool)
        .await?;

    Ok(())
}

/// Add `songs.title_key` to databases created before it existed
async fn ensure_title_key_column(pool: &SqlitePool) -> Result<()> {
    let exists: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM pragma_table_info('songs') WHERE name = 'title_key'",
    )
    .fetch_one(pool)
    .await?;

    if exists == 0 {
        sqlx::query("ALTER TABLE songs ADD COLUMN title_key TEXT")
            .execute(pool)
            .await?;
        info!("Added songs.title_key column");
    }
    Ok(())
}

/// Fill `title_key` for rows written before the column existed
async fn backfill_title_keys(pool: &SqlitePool) -> Result<()> {
    let rows: Vec<(String, String)> =
        sqlx::query_as("SELECT id, title FROM songs WHERE title_key IS NULL")
            .fetch_all(pool)
            .await?;
    if rows.is_empty() {
        return Ok(());
    }

    let mut tx = pool.begin().await?;
    for (id, title) in &rows {
        sqlx::query("UPDATE songs SET title_key = ? WHERE id = ?")
            .bind(title_key(title))
            .bind(id)
            .execute(&mut *tx)
            .await?;
    }
    tx.commit().await?;

    info!(rows = rows.len(), "Backfilled song title keys");
    Ok(())
}

async fn create_profiles_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS profiles (
            id TEXT PRIMARY KEY,
            email TEXT,
            role TEXT,
            is_admin INTEGER NOT NULL DEFAULT 0,
            invited INTEGER NOT NULL DEFAULT 0,
            deactivated INTEGER NOT NULL DEFAULT 0,
            banned INTEGER NOT NULL DEFAULT 0,
            created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_invite_logs_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS invite_logs (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            user_id TEXT,
            email TEXT,
            action TEXT NOT NULL,
            reason TEXT,
            created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// Identity records for the local identity provider
async fn create_auth_users_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS auth_users (
            id TEXT PRIMARY KEY,
            email TEXT NOT NULL UNIQUE COLLATE NOCASE,
            password_hash TEXT,
            password_salt TEXT,
            email_confirmed INTEGER NOT NULL DEFAULT 0,
            invited_at TIMESTAMP,
            created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
            updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}
