//! Server-side staging for the submission form's image slot.
//!
//! A session holds at most one staged image at a time. Staging a new
//! one supersedes the old (row and file), resetting clears the slot,
//! and a successful submit consumes it. Everything left behind is aged
//! out by the maintenance sweep.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use std::path::PathBuf;
use tokio::fs;
use tracing::{instrument, warn};
use uuid::Uuid;

use crate::db::{self, Pool, StagedImageRow};

#[derive(Debug, Clone)]
pub struct Intake {
    pool: Pool,
    staging_dir: PathBuf,
}

impl Intake {
    pub fn new(pool: Pool, staging_dir: PathBuf) -> Self {
        Self { pool, staging_dir }
    }

    /// Stage an image for the session, superseding any previous one.
    /// The superseded file is removed from disk. If recording the row
    /// fails, the freshly written file is removed again.
    #[instrument(skip_all)]
    pub async fn stage(
        &self,
        session_token: &str,
        filename: &str,
        content_type: &str,
        bytes: &[u8],
    ) -> Result<StagedImageRow> {
        let token = Uuid::new_v4().to_string();
        let path = self.staging_dir.join(&token);
        fs::write(&path, bytes)
            .await
            .with_context(|| format!("failed to write staging file {}", path.display()))?;

        let row = StagedImageRow {
            token,
            session_token: session_token.to_string(),
            path: path.to_string_lossy().into_owned(),
            original_filename: filename.to_string(),
            content_type: content_type.to_string(),
            byte_size: bytes.len() as i64,
            created_at: Utc::now(),
        };

        match db::replace_staged_image(&self.pool, &row).await {
            Ok(superseded) => {
                if let Some(prev) = superseded {
                    if let Err(err) = fs::remove_file(&prev).await {
                        warn!(path = %prev, "failed to remove superseded staging file: {err}");
                    }
                }
                Ok(row)
            }
            Err(err) => {
                if let Err(rm) = fs::remove_file(&path).await {
                    warn!(path = %path.display(), "failed to undo staging file write: {rm}");
                }
                Err(err)
            }
        }
    }

    pub async fn current(&self, session_token: &str) -> Result<Option<StagedImageRow>> {
        db::staged_image_for_session(&self.pool, session_token).await
    }

    /// Clear the session's staging slot; clearing an empty slot is a
    /// no-op. Returns whether anything was staged.
    #[instrument(skip_all)]
    pub async fn reset(&self, session_token: &str) -> Result<bool> {
        let Some(path) = db::clear_staged_image(&self.pool, session_token).await? else {
            return Ok(false);
        };
        if let Err(err) = fs::remove_file(&path).await {
            warn!(path = %path, "failed to remove staging file: {err}");
        }
        Ok(true)
    }

    /// File bytes and content type behind a preview token.
    pub async fn open_preview(&self, token: &str) -> Result<Option<(Vec<u8>, String)>> {
        let Some(row) = db::staged_image_by_token(&self.pool, token).await? else {
            return Ok(None);
        };
        let bytes = fs::read(&row.path)
            .await
            .with_context(|| format!("failed to read staged file {}", row.path))?;
        Ok(Some((bytes, row.content_type)))
    }

    /// Load a staged row's file for submission.
    pub async fn read_bytes(&self, row: &StagedImageRow) -> Result<Vec<u8>> {
        fs::read(&row.path)
            .await
            .with_context(|| format!("failed to read staged file {}", row.path))
    }

    /// Drop stagings older than `cutoff` and their files. Returns how
    /// many were removed.
    #[instrument(skip_all)]
    pub async fn sweep_expired(&self, cutoff: DateTime<Utc>) -> Result<usize> {
        let rows = db::take_expired_staged_images(&self.pool, cutoff).await?;
        let count = rows.len();
        for row in rows {
            if let Err(err) = fs::remove_file(&row.path).await {
                warn!(path = %row.path, "failed to remove expired staging file: {err}");
            }
        }
        Ok(count)
    }
}
