use super::model::{SessionRow, StagedImageRow};
use anyhow::Result;
use chrono::{DateTime, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};
use tracing::instrument;

pub type Pool = SqlitePool;

pub async fn init_pool(database_url: &str) -> Result<Pool> {
    let normalized = prepare_sqlite_url(database_url);
    let pool = SqlitePool::connect(&normalized).await?;
    // Enable WAL and stricter durability.
    sqlx::query("PRAGMA journal_mode=WAL;")
        .execute(&pool)
        .await?;
    sqlx::query("PRAGMA synchronous=FULL;")
        .execute(&pool)
        .await?;
    Ok(pool)
}

/// If using a file-backed SQLite URL, expand a leading `~/` and ensure the parent
/// directory exists. Leaves in-memory URLs untouched. Returns possibly-updated URL.
fn prepare_sqlite_url(url: &str) -> String {
    // Pass through non-sqlite schemes
    if !url.starts_with("sqlite:") {
        return url.to_string();
    }

    // In-memory URLs like sqlite::memory: or sqlite::memory:?cache=shared
    if url.starts_with("sqlite::memory") {
        return url.to_string();
    }

    // Strip prefix and optional //
    let rest = &url["sqlite:".len()..];
    let path_with_query = rest.strip_prefix("//").unwrap_or(rest);

    // Separate query string if any
    let (path_part, query_part) = match path_with_query.split_once('?') {
        Some((p, q)) => (p, Some(q)),
        None => (path_with_query, None),
    };

    if path_part.is_empty() {
        // nothing to normalize
        return url.to_string();
    }

    // Expand leading ~/ to HOME
    let expanded_path = if let Some(rest) = path_part.strip_prefix("~/") {
        if let Ok(home) = std::env::var("HOME") {
            format!("{}/{}", home.trim_end_matches('/'), rest)
        } else {
            path_part.to_string()
        }
    } else {
        path_part.to_string()
    };

    // Ensure parent directory exists if any
    if let Some(parent) = std::path::Path::new(&expanded_path).parent() {
        if !parent.as_os_str().is_empty() {
            let _ = std::fs::create_dir_all(parent);
        }
    }

    // Rebuild URL, prefer sqlite:// form
    let mut rebuilt = String::from("sqlite://");
    rebuilt.push_str(&expanded_path);
    if let Some(q) = query_part {
        rebuilt.push('?');
        rebuilt.push_str(q);
    }
    rebuilt
}

pub async fn run_migrations(pool: &Pool) -> Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}

// ---- sessions ----

#[instrument(skip_all)]
pub async fn create_session(
    pool: &Pool,
    token: &str,
    author_ref: &str,
    name: &str,
    expires_at: DateTime<Utc>,
) -> Result<()> {
    sqlx::query(
        "INSERT INTO sessions (token, author_ref, name, created_at, expires_at) \
         VALUES (?, ?, ?, ?, ?)",
    )
    .bind(token)
    .bind(author_ref)
    .bind(name)
    .bind(Utc::now())
    .bind(expires_at)
    .execute(pool)
    .await?;
    Ok(())
}

/// Fetch a session by token if it has not expired yet.
#[instrument(skip_all)]
pub async fn find_live_session(pool: &Pool, token: &str) -> Result<Option<SessionRow>> {
    let row = sqlx::query("SELECT * FROM sessions WHERE token = ? AND expires_at > ?")
        .bind(token)
        .bind(Utc::now())
        .fetch_optional(pool)
        .await?;
    Ok(row.map(map_session))
}

#[instrument(skip_all)]
pub async fn delete_session(pool: &Pool, token: &str) -> Result<()> {
    sqlx::query("DELETE FROM sessions WHERE token = ?")
        .bind(token)
        .execute(pool)
        .await?;
    Ok(())
}

/// Remove sessions past their expiry; returns how many rows went away.
#[instrument(skip_all)]
pub async fn delete_expired_sessions(pool: &Pool, now: DateTime<Utc>) -> Result<u64> {
    let res = sqlx::query("DELETE FROM sessions WHERE expires_at <= ?")
        .bind(now)
        .execute(pool)
        .await?;
    Ok(res.rows_affected())
}

// ---- staged images ----

/// Insert a freshly staged image for a session, replacing any previous
/// staging. Returns the superseded row's file path, if there was one,
/// so the caller can release it.
#[instrument(skip_all)]
pub async fn replace_staged_image(pool: &Pool, row: &StagedImageRow) -> Result<Option<String>> {
    let mut tx = pool.begin().await?;
    let previous: Option<String> =
        sqlx::query_scalar("SELECT path FROM staged_images WHERE session_token = ?")
            .bind(&row.session_token)
            .fetch_optional(&mut *tx)
            .await?;
    sqlx::query("DELETE FROM staged_images WHERE session_token = ?")
        .bind(&row.session_token)
        .execute(&mut *tx)
        .await?;
    sqlx::query(
        "INSERT INTO staged_images \
         (token, session_token, path, original_filename, content_type, byte_size, created_at) \
         VALUES (?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(&row.token)
    .bind(&row.session_token)
    .bind(&row.path)
    .bind(&row.original_filename)
    .bind(&row.content_type)
    .bind(row.byte_size)
    .bind(row.created_at)
    .execute(&mut *tx)
    .await?;
    tx.commit().await?;
    Ok(previous)
}

#[instrument(skip_all)]
pub async fn staged_image_for_session(
    pool: &Pool,
    session_token: &str,
) -> Result<Option<StagedImageRow>> {
    let row = sqlx::query("SELECT * FROM staged_images WHERE session_token = ?")
        .bind(session_token)
        .fetch_optional(pool)
        .await?;
    Ok(row.map(map_staged_image))
}

#[instrument(skip_all)]
pub async fn staged_image_by_token(pool: &Pool, token: &str) -> Result<Option<StagedImageRow>> {
    let row = sqlx::query("SELECT * FROM staged_images WHERE token = ?")
        .bind(token)
        .fetch_optional(pool)
        .await?;
    Ok(row.map(map_staged_image))
}

/// Clear a session's staging, if any. Returns the removed row's file
/// path so the caller can release it; `None` means there was nothing
/// staged (clearing twice is a no-op).
#[instrument(skip_all)]
pub async fn clear_staged_image(pool: &Pool, session_token: &str) -> Result<Option<String>> {
    let mut tx = pool.begin().await?;
    let previous: Option<String> =
        sqlx::query_scalar("SELECT path FROM staged_images WHERE session_token = ?")
            .bind(session_token)
            .fetch_optional(&mut *tx)
            .await?;
    if previous.is_some() {
        sqlx::query("DELETE FROM staged_images WHERE session_token = ?")
            .bind(session_token)
            .execute(&mut *tx)
            .await?;
    }
    tx.commit().await?;
    Ok(previous)
}

/// Remove stagings older than `cutoff` and return the removed rows so
/// the caller can release their files.
#[instrument(skip_all)]
pub async fn take_expired_staged_images(
    pool: &Pool,
    cutoff: DateTime<Utc>,
) -> Result<Vec<StagedImageRow>> {
    let mut tx = pool.begin().await?;
    let rows = sqlx::query("SELECT * FROM staged_images WHERE created_at <= ?")
        .bind(cutoff)
        .fetch_all(&mut *tx)
        .await?;
    let expired: Vec<StagedImageRow> = rows.into_iter().map(map_staged_image).collect();
    sqlx::query("DELETE FROM staged_images WHERE created_at <= ?")
        .bind(cutoff)
        .execute(&mut *tx)
        .await?;
    tx.commit().await?;
    Ok(expired)
}

fn map_session(row: SqliteRow) -> SessionRow {
    SessionRow {
        token: row.get("token"),
        author_ref: row.get("author_ref"),
        name: row.get("name"),
        created_at: row.get("created_at"),
        expires_at: row.get("expires_at"),
    }
}

fn map_staged_image(row: SqliteRow) -> StagedImageRow {
    StagedImageRow {
        token: row.get("token"),
        session_token: row.get("session_token"),
        path: row.get("path"),
        original_filename: row.get("original_filename"),
        content_type: row.get("content_type"),
        byte_size: row.get("byte_size"),
        created_at: row.get("created_at"),
    }
}
