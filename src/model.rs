use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Terminal state of one submission attempt, as carried on the wire.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum SubmitStatus {
    #[serde(rename = "INITIAL")]
    Initial,
    #[serde(rename = "SUCCESS")]
    Success,
    #[serde(rename = "ERROR")]
    Error,
}

impl SubmitStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SubmitStatus::Initial => "INITIAL",
            SubmitStatus::Success => "SUCCESS",
            SubmitStatus::Error => "ERROR",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "INITIAL" => Some(SubmitStatus::Initial),
            "SUCCESS" => Some(SubmitStatus::Success),
            "ERROR" => Some(SubmitStatus::Error),
            _ => None,
        }
    }
}

/// The signed-in caller as the pipeline sees it: the author document in
/// the content store plus a display name.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SessionIdentity {
    pub author_ref: String,
    pub name: String,
}

/// A pointer to another document in the content store.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Reference {
    #[serde(rename = "_type")]
    pub type_tag: String,
    #[serde(rename = "_ref")]
    pub ref_id: String,
}

impl Reference {
    pub fn to(id: impl Into<String>) -> Self {
        Self {
            type_tag: "reference".to_string(),
            ref_id: id.into(),
        }
    }
}

/// Slug field as stored on a startup document.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SlugField {
    #[serde(rename = "_type")]
    pub type_tag: String,
    pub current: String,
}

impl SlugField {
    pub fn new(current: impl Into<String>) -> Self {
        Self {
            type_tag: "slug".to_string(),
            current: current.into(),
        }
    }
}

/// Image field: a reference to an uploaded asset record.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ImageField {
    pub asset: Reference,
}

impl ImageField {
    pub fn of_asset(asset_id: impl Into<String>) -> Self {
        Self {
            asset: Reference::to(asset_id),
        }
    }
}

/// A startup document about to be created. `type_tag` is always
/// `"startup"`; the id and revision are assigned by the store.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NewStartup {
    #[serde(rename = "_type")]
    pub type_tag: String,
    pub title: String,
    pub description: String,
    pub category: String,
    pub pitch: String,
    pub slug: SlugField,
    pub author: Reference,
    pub image: ImageField,
    pub views: i64,
}

impl NewStartup {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        title: impl Into<String>,
        description: impl Into<String>,
        category: impl Into<String>,
        pitch: impl Into<String>,
        slug: SlugField,
        author_ref: &str,
        asset_id: &str,
    ) -> Self {
        Self {
            type_tag: "startup".to_string(),
            title: title.into(),
            description: description.into(),
            category: category.into(),
            pitch: pitch.into(),
            slug,
            author: Reference::to(author_ref),
            image: ImageField::of_asset(asset_id),
            views: 0,
        }
    }
}

/// A persisted startup document as returned by the content store.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StartupRecord {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(rename = "_createdAt")]
    pub created_at: DateTime<Utc>,
    pub title: String,
    pub description: String,
    pub category: String,
    pub pitch: String,
    pub slug: SlugField,
    pub author: Reference,
    pub image: ImageField,
    #[serde(default)]
    pub views: i64,
}

/// Card projection of a startup for the listing page. Field names match
/// the aliases used by the directory query.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StartupSummary {
    pub id: String,
    pub created_at: DateTime<Utc>,
    pub title: String,
    pub description: String,
    pub category: String,
    pub author_ref: String,
    pub author_name: String,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub views: i64,
}

/// Full projection for the detail page: the summary fields plus the
/// pitch body.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StartupDetail {
    pub id: String,
    pub created_at: DateTime<Utc>,
    pub title: String,
    pub description: String,
    pub category: String,
    pub pitch: String,
    pub author_ref: String,
    pub author_name: String,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub views: i64,
}
