use anyhow::Result;
use async_trait::async_trait;
use chrono::{Duration, Utc};
use tracing::info;
use uuid::Uuid;

use crate::config::Config;
use crate::db::{self, Pool};
use crate::model::SessionIdentity;

pub const SESSION_COOKIE: &str = "pitchboard_session";

/// Maps an opaque session token to the signed-in identity, if any.
#[async_trait]
pub trait SessionResolver: Send + Sync {
    async fn resolve(&self, token: Option<&str>) -> Result<Option<SessionIdentity>>;
}

/// Session store backed by the service database.
#[derive(Clone)]
pub struct DbSessions {
    pool: Pool,
    ttl_hours: u64,
}

impl DbSessions {
    pub fn new(pool: Pool, ttl_hours: u64) -> Self {
        Self { pool, ttl_hours }
    }

    /// Exchange an access key for a fresh session token. `None` means
    /// the key does not belong to any configured member.
    pub async fn sign_in(&self, cfg: &Config, access_key: &str) -> Result<Option<String>> {
        let Some(member) = cfg.member_for_key(access_key) else {
            return Ok(None);
        };
        let token = Uuid::new_v4().to_string();
        let expires_at = Utc::now() + Duration::hours(self.ttl_hours as i64);
        db::create_session(&self.pool, &token, &member.author_ref, &member.name, expires_at)
            .await?;
        info!(name = %member.name, "member signed in");
        Ok(Some(token))
    }

    pub async fn sign_out(&self, token: &str) -> Result<()> {
        db::delete_session(&self.pool, token).await
    }
}

#[async_trait]
impl SessionResolver for DbSessions {
    async fn resolve(&self, token: Option<&str>) -> Result<Option<SessionIdentity>> {
        let Some(token) = token else {
            return Ok(None);
        };
        let row = db::find_live_session(&self.pool, token).await?;
        Ok(row.map(|r| SessionIdentity {
            author_ref: r.author_ref,
            name: r.name,
        }))
    }
}

/// Pull a named cookie's value out of a raw `Cookie` header.
pub fn cookie_value<'a>(header: &'a str, name: &str) -> Option<&'a str> {
    header.split(';').find_map(|pair| {
        let (k, v) = pair.trim().split_once('=')?;
        (k == name).then_some(v)
    })
}
