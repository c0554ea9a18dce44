//! The submission pipeline and its result envelope.
//!
//! `create_pitch` never returns an error: every exit, including
//! upstream faults, is folded into a [`PitchResponse`] so callers deal
//! with exactly one shape.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, error, info, instrument, warn};

use crate::model::{NewStartup, SlugField, StartupRecord, SubmitStatus};
use crate::sanity::{AssetStore, DocumentStore};
use crate::session::SessionResolver;
use crate::slug::slugify;
use crate::validate::FieldErrors;

const DEFAULT_ERROR: &str = "An unexpected error has occurred";

/// Wire envelope for one submission attempt. On success the created
/// document's fields are spread into the envelope alongside `status`
/// and `error`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PitchResponse {
    pub status: SubmitStatus,
    #[serde(default)]
    pub error: String,
    #[serde(flatten)]
    pub document: Option<StartupRecord>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub field_errors: Option<FieldErrors>,
}

impl PitchResponse {
    /// State before any submission attempt.
    pub fn initial() -> Self {
        Self {
            status: SubmitStatus::Initial,
            error: String::new(),
            document: None,
            field_errors: None,
        }
    }

    pub fn success(document: StartupRecord) -> Self {
        Self {
            status: SubmitStatus::Success,
            error: String::new(),
            document: Some(document),
            field_errors: None,
        }
    }

    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            status: SubmitStatus::Error,
            error: error.into(),
            document: None,
            field_errors: None,
        }
    }

    /// Rejection before the pipeline runs: per-field messages plus the
    /// generic banner text.
    pub fn invalid(field_errors: FieldErrors) -> Self {
        Self {
            status: SubmitStatus::Error,
            error: "Validation failed".to_string(),
            document: None,
            field_errors: Some(field_errors),
        }
    }

    /// Force the envelope into a consistent terminal shape: SUCCESS
    /// must carry a document and ERROR must carry a message. Applying
    /// this twice changes nothing.
    pub fn normalize(self) -> Self {
        match self.status {
            SubmitStatus::Success if self.document.is_none() => Self {
                status: SubmitStatus::Error,
                error: DEFAULT_ERROR.to_string(),
                document: None,
                field_errors: self.field_errors,
            },
            SubmitStatus::Error if self.error.is_empty() => Self {
                error: DEFAULT_ERROR.to_string(),
                ..self
            },
            _ => self,
        }
    }
}

/// The posted form fields plus the pitch body, exactly as received.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PitchDraft {
    pub title: String,
    pub description: String,
    pub category: String,
    pub pitch: String,
}

/// The staged image as handed to the pipeline.
#[derive(Debug, Clone)]
pub struct PitchImage {
    pub bytes: Vec<u8>,
    pub content_type: String,
    pub filename: String,
}

/// Orchestrates one submission: authenticate, upload, persist. All
/// collaborators are injected so tests can substitute fakes.
#[derive(Clone)]
pub struct Pipeline {
    sessions: Arc<dyn SessionResolver>,
    assets: Arc<dyn AssetStore>,
    docs: Arc<dyn DocumentStore>,
}

impl Pipeline {
    pub fn new(
        sessions: Arc<dyn SessionResolver>,
        assets: Arc<dyn AssetStore>,
        docs: Arc<dyn DocumentStore>,
    ) -> Self {
        Self {
            sessions,
            assets,
            docs,
        }
    }

    /// Run the submission steps in order; each is gated on the one
    /// before it. `prev` is the caller's previous envelope state and is
    /// carried for the wire contract only, never consulted.
    #[instrument(skip_all)]
    pub async fn create_pitch(
        &self,
        prev: SubmitStatus,
        session_token: Option<&str>,
        draft: &PitchDraft,
        image: Option<PitchImage>,
    ) -> PitchResponse {
        debug!(prev = prev.as_str(), title = %draft.title, "pitch submission started");

        let identity = match self.sessions.resolve(session_token).await {
            Ok(Some(identity)) => identity,
            Ok(None) => return PitchResponse::failure("Not signed in").normalize(),
            Err(err) => return fault("resolve session", err),
        };

        let Some(image) = image else {
            return PitchResponse::failure("No image file provided").normalize();
        };

        let asset = match self
            .assets
            .upload_asset(image.bytes, &image.content_type, &image.filename)
            .await
        {
            Ok(asset) => asset,
            Err(err) => return fault("upload image asset", err),
        };

        let slug = SlugField::new(slugify(&draft.title));
        let doc = NewStartup::new(
            &draft.title,
            &draft.description,
            &draft.category,
            &draft.pitch,
            slug,
            &identity.author_ref,
            &asset.id,
        );

        match self.docs.create_startup(&doc).await {
            Ok(record) => {
                info!(id = %record.id, slug = %record.slug.current, "pitch published");
                PitchResponse::success(record).normalize()
            }
            Err(err) => {
                // The asset went up but nothing references it; take it
                // back so the store does not collect orphans.
                if let Err(del) = self.assets.delete_asset(&asset.id).await {
                    warn!(asset = %asset.id, "failed to remove orphaned asset: {del:#}");
                }
                fault("create startup document", err)
            }
        }
    }
}

/// Fold an upstream fault into the envelope: log the chain, hand the
/// stringified chain back to the caller.
fn fault(step: &str, err: anyhow::Error) -> PitchResponse {
    error!("pitch submission failed at {step}: {err:#}");
    PitchResponse::failure(format!("{err:#}")).normalize()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ImageField, Reference, SlugField};
    use chrono::Utc;

    fn record() -> StartupRecord {
        StartupRecord {
            id: "startup-1".to_string(),
            created_at: Utc::now(),
            title: "We Robots".to_string(),
            description: "d".repeat(20),
            category: "Robots".to_string(),
            pitch: "The whole pitch.".to_string(),
            slug: SlugField::new("we-robots"),
            author: Reference::to("author-1"),
            image: ImageField::of_asset("image-abc"),
            views: 0,
        }
    }

    #[test]
    fn normalize_is_a_fixed_point() {
        let cases = vec![
            PitchResponse::initial(),
            PitchResponse::success(record()),
            PitchResponse::failure("boom"),
            PitchResponse::failure(""),
            PitchResponse {
                status: SubmitStatus::Success,
                error: String::new(),
                document: None,
                field_errors: None,
            },
        ];
        for case in cases {
            let once = case.normalize();
            let twice = once.clone().normalize();
            assert_eq!(once, twice);
        }
    }

    #[test]
    fn normalize_repairs_inconsistent_envelopes() {
        let hollow_success = PitchResponse {
            status: SubmitStatus::Success,
            error: String::new(),
            document: None,
            field_errors: None,
        }
        .normalize();
        assert_eq!(hollow_success.status, SubmitStatus::Error);
        assert!(!hollow_success.error.is_empty());

        let silent_error = PitchResponse::failure("").normalize();
        assert_eq!(silent_error.status, SubmitStatus::Error);
        assert_eq!(silent_error.error, "An unexpected error has occurred");
    }

    #[test]
    fn success_envelope_spreads_document_fields() {
        let json = serde_json::to_value(PitchResponse::success(record())).unwrap();
        assert_eq!(json["status"], "SUCCESS");
        assert_eq!(json["error"], "");
        assert_eq!(json["_id"], "startup-1");
        assert_eq!(json["slug"]["current"], "we-robots");
        assert!(json.get("document").is_none());
        assert!(json.get("field_errors").is_none());
    }

    #[test]
    fn error_envelope_has_no_document_fields() {
        let json = serde_json::to_value(PitchResponse::failure("Not signed in")).unwrap();
        assert_eq!(json["status"], "ERROR");
        assert_eq!(json["error"], "Not signed in");
        assert!(json.get("_id").is_none());
    }

    #[test]
    fn invalid_envelope_carries_field_errors() {
        let mut errors = FieldErrors::default();
        errors.0.insert("title".into(), "too short".into());
        let resp = PitchResponse::invalid(errors).normalize();
        assert_eq!(resp.status, SubmitStatus::Error);
        assert_eq!(resp.error, "Validation failed");
        assert_eq!(
            resp.field_errors.as_ref().unwrap().get("title"),
            Some("too short")
        );
    }
}
