use crate::db;
use crate::intake::Intake;
use anyhow::Result;
use chrono::{Duration, Utc};
use sqlx::SqlitePool;
use tracing::{info, instrument};

/// One maintenance pass: drop expired sessions and age out staged
/// images past their TTL. Returns (sessions removed, stagings removed).
#[instrument(skip_all)]
pub async fn run_sweep(
    pool: &SqlitePool,
    intake: &Intake,
    staging_ttl_minutes: u64,
) -> Result<(u64, usize)> {
    let now = Utc::now();
    let sessions = db::delete_expired_sessions(pool, now).await?;
    let cutoff = now - Duration::minutes(staging_ttl_minutes as i64);
    let stagings = intake.sweep_expired(cutoff).await?;
    if sessions > 0 || stagings > 0 {
        info!(sessions, stagings, "maintenance sweep removed expired state");
    }
    Ok((sessions, stagings))
}
