use anyhow::{anyhow, Result};
use chrono::Utc;
use std::collections::VecDeque;
use std::sync::Arc;
use tokio::sync::Mutex;

use pitchboard::model::{NewStartup, SessionIdentity, StartupRecord, SubmitStatus};
use pitchboard::pipeline::{Pipeline, PitchDraft, PitchImage};
use pitchboard::sanity::{AssetStore, DocumentStore, SanityAsset};
use pitchboard::session::SessionResolver;

fn identity() -> SessionIdentity {
    SessionIdentity {
        author_ref: "author-1".to_string(),
        name: "Ada Example".to_string(),
    }
}

fn asset(id: &str) -> SanityAsset {
    SanityAsset {
        id: id.to_string(),
        url: format!("https://cdn.example/{id}.png"),
    }
}

fn record_from(doc: &NewStartup) -> StartupRecord {
    StartupRecord {
        id: "startup-1".to_string(),
        created_at: Utc::now(),
        title: doc.title.clone(),
        description: doc.description.clone(),
        category: doc.category.clone(),
        pitch: doc.pitch.clone(),
        slug: doc.slug.clone(),
        author: doc.author.clone(),
        image: doc.image.clone(),
        views: doc.views,
    }
}

fn draft() -> PitchDraft {
    PitchDraft {
        title: "My Cool Idea!".to_string(),
        description: "A description long enough to pass validation.".to_string(),
        category: "Tech".to_string(),
        pitch: "Ten chars plus of pitch body.".to_string(),
    }
}

fn image() -> PitchImage {
    PitchImage {
        bytes: b"png-bytes".to_vec(),
        content_type: "image/png".to_string(),
        filename: "logo.png".to_string(),
    }
}

/// Records every store call and pops queued responses; an empty queue
/// answers with the happy path.
#[derive(Clone, Default)]
struct RecordingStore {
    sessions: Arc<Mutex<VecDeque<Result<Option<SessionIdentity>>>>>,
    uploads: Arc<Mutex<VecDeque<Result<SanityAsset>>>>,
    creates: Arc<Mutex<VecDeque<Result<StartupRecord>>>>,
    upload_calls: Arc<Mutex<Vec<(usize, String, String)>>>,
    create_calls: Arc<Mutex<Vec<NewStartup>>>,
    delete_calls: Arc<Mutex<Vec<String>>>,
}

impl RecordingStore {
    async fn push_session(&self, response: Result<Option<SessionIdentity>>) {
        self.sessions.lock().await.push_back(response);
    }

    async fn push_upload(&self, response: Result<SanityAsset>) {
        self.uploads.lock().await.push_back(response);
    }

    async fn push_create(&self, response: Result<StartupRecord>) {
        self.creates.lock().await.push_back(response);
    }

    async fn upload_calls(&self) -> Vec<(usize, String, String)> {
        self.upload_calls.lock().await.clone()
    }

    async fn create_calls(&self) -> Vec<NewStartup> {
        self.create_calls.lock().await.clone()
    }

    async fn delete_calls(&self) -> Vec<String> {
        self.delete_calls.lock().await.clone()
    }
}

#[async_trait::async_trait]
impl SessionResolver for RecordingStore {
    async fn resolve(&self, _token: Option<&str>) -> Result<Option<SessionIdentity>> {
        let mut guard = self.sessions.lock().await;
        guard.pop_front().unwrap_or_else(|| Ok(Some(identity())))
    }
}

#[async_trait::async_trait]
impl AssetStore for RecordingStore {
    async fn upload_asset(
        &self,
        bytes: Vec<u8>,
        content_type: &str,
        filename: &str,
    ) -> Result<SanityAsset> {
        self.upload_calls.lock().await.push((
            bytes.len(),
            content_type.to_string(),
            filename.to_string(),
        ));
        let mut guard = self.uploads.lock().await;
        guard.pop_front().unwrap_or_else(|| Ok(asset("image-1")))
    }

    async fn delete_asset(&self, asset_id: &str) -> Result<()> {
        self.delete_calls.lock().await.push(asset_id.to_string());
        Ok(())
    }
}

#[async_trait::async_trait]
impl DocumentStore for RecordingStore {
    async fn create_startup(&self, doc: &NewStartup) -> Result<StartupRecord> {
        self.create_calls.lock().await.push(doc.clone());
        let mut guard = self.creates.lock().await;
        guard.pop_front().unwrap_or_else(|| Ok(record_from(doc)))
    }
}

fn pipeline_with(store: &Arc<RecordingStore>) -> Pipeline {
    Pipeline::new(store.clone(), store.clone(), store.clone())
}

#[tokio::test]
async fn successful_submission_publishes_the_document() {
    let store = Arc::new(RecordingStore::default());
    let pipeline = pipeline_with(&store);

    let envelope = pipeline
        .create_pitch(SubmitStatus::Initial, Some("sess"), &draft(), Some(image()))
        .await;

    println!("envelope: {envelope:?}");
    assert_eq!(envelope.status, SubmitStatus::Success);
    assert_eq!(envelope.error, "");
    let doc = envelope.document.expect("success carries the document");
    assert_eq!(doc.title, "My Cool Idea!");

    let uploads = store.upload_calls().await;
    assert_eq!(uploads.len(), 1);
    assert_eq!(uploads[0], (9, "image/png".to_string(), "logo.png".to_string()));

    let creates = store.create_calls().await;
    assert_eq!(creates.len(), 1);
    assert_eq!(creates[0].type_tag, "startup");
    assert_eq!(creates[0].slug.current, "my-cool-idea");
    assert_eq!(creates[0].author.ref_id, "author-1");
    assert_eq!(creates[0].image.asset.ref_id, "image-1");
    assert_eq!(creates[0].views, 0);

    assert!(store.delete_calls().await.is_empty());
}

#[tokio::test]
async fn unauthenticated_submission_never_touches_the_store() {
    let store = Arc::new(RecordingStore::default());
    store.push_session(Ok(None)).await;
    let pipeline = pipeline_with(&store);

    let envelope = pipeline
        .create_pitch(SubmitStatus::Initial, None, &draft(), Some(image()))
        .await;

    assert_eq!(envelope.status, SubmitStatus::Error);
    assert_eq!(envelope.error, "Not signed in");
    assert!(envelope.document.is_none());
    assert!(store.upload_calls().await.is_empty());
    assert!(store.create_calls().await.is_empty());
}

#[tokio::test]
async fn missing_image_is_rejected_before_any_upload() {
    let store = Arc::new(RecordingStore::default());
    let pipeline = pipeline_with(&store);

    let envelope = pipeline
        .create_pitch(SubmitStatus::Initial, Some("sess"), &draft(), None)
        .await;

    assert_eq!(envelope.status, SubmitStatus::Error);
    assert_eq!(envelope.error, "No image file provided");
    assert!(store.upload_calls().await.is_empty());
    assert!(store.create_calls().await.is_empty());
}

#[tokio::test]
async fn upload_failure_stops_before_the_document() {
    let store = Arc::new(RecordingStore::default());
    store.push_upload(Err(anyhow!("asset endpoint said no"))).await;
    let pipeline = pipeline_with(&store);

    let envelope = pipeline
        .create_pitch(SubmitStatus::Initial, Some("sess"), &draft(), Some(image()))
        .await;

    assert_eq!(envelope.status, SubmitStatus::Error);
    assert!(envelope.error.contains("asset endpoint said no"));
    assert!(store.create_calls().await.is_empty());
    assert!(store.delete_calls().await.is_empty());
}

#[tokio::test]
async fn create_failure_takes_back_the_uploaded_asset() {
    let store = Arc::new(RecordingStore::default());
    store.push_upload(Ok(asset("image-9"))).await;
    store.push_create(Err(anyhow!("mutation rejected"))).await;
    let pipeline = pipeline_with(&store);

    let envelope = pipeline
        .create_pitch(SubmitStatus::Initial, Some("sess"), &draft(), Some(image()))
        .await;

    assert_eq!(envelope.status, SubmitStatus::Error);
    assert!(envelope.error.contains("mutation rejected"));
    assert!(envelope.document.is_none());

    // Exactly one compensating delete, for the asset that went up.
    let deletes = store.delete_calls().await;
    assert_eq!(deletes, vec!["image-9".to_string()]);
}

#[tokio::test]
async fn resolver_fault_becomes_an_error_envelope() {
    let store = Arc::new(RecordingStore::default());
    store.push_session(Err(anyhow!("session backend down"))).await;
    let pipeline = pipeline_with(&store);

    let envelope = pipeline
        .create_pitch(SubmitStatus::Initial, Some("sess"), &draft(), Some(image()))
        .await;

    assert_eq!(envelope.status, SubmitStatus::Error);
    assert!(envelope.error.contains("session backend down"));
    assert!(store.upload_calls().await.is_empty());
}
