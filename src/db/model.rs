//! Database entity models used by repositories.
//!
//! Keep these structs focused on the data returned by queries. Business logic
//! should live in higher layers.

use chrono::{DateTime, Utc};

/// One signed-in session: the cookie token and the author identity it
/// resolves to.
#[derive(Debug, Clone)]
pub struct SessionRow {
    pub token: String,
    pub author_ref: String,
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

/// One staged (selected but not yet submitted) image.
#[derive(Debug, Clone)]
pub struct StagedImageRow {
    pub token: String,
    pub session_token: String,
    pub path: String,
    pub original_filename: String,
    pub content_type: String,
    pub byte_size: i64,
    pub created_at: DateTime<Utc>,
}
