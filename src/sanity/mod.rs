use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use reqwest::{Client, StatusCode, Url};
use serde_json::{json, Value};
use std::fmt;
use tracing::{info, warn};

use crate::config::Config;
use crate::model::{NewStartup, StartupDetail, StartupRecord, StartupSummary};
use crate::sanity::model::{MutateResp, QueryResp, UploadAssetResp};

pub mod model;

pub use model::SanityAsset;

/// GROQ projection behind the listing page. `$search` is either null
/// (no filter) or a wildcard pattern matched against title, category
/// and the dereferenced author name.
const DIRECTORY_QUERY: &str = r#"*[_type == "startup" && defined(slug.current)
  && (!defined($search) || title match $search || category match $search || author->name match $search)]
  | order(_createdAt desc) {
    "id": _id,
    "created_at": _createdAt,
    title,
    description,
    category,
    "author_ref": author._ref,
    "author_name": coalesce(author->name, ""),
    "image_url": image.asset->url,
    "views": coalesce(views, 0)
  }"#;

const STARTUP_QUERY: &str = r#"*[_type == "startup" && _id == $id][0] {
    "id": _id,
    "created_at": _createdAt,
    title,
    description,
    category,
    pitch,
    "author_ref": author._ref,
    "author_name": coalesce(author->name, ""),
    "image_url": image.asset->url,
    "views": coalesce(views, 0)
  }"#;

#[derive(Clone)]
pub struct SanityClient {
    http: Client,
    base_url: Url,
    dataset: String,
    api_version: String,
    token: String,
}

impl fmt::Debug for SanityClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SanityClient")
            .field("base_url", &self.base_url)
            .field("dataset", &self.dataset)
            .finish_non_exhaustive()
    }
}

/// Uploads and removes binary image assets.
#[async_trait]
pub trait AssetStore: Send + Sync {
    async fn upload_asset(
        &self,
        bytes: Vec<u8>,
        content_type: &str,
        filename: &str,
    ) -> Result<SanityAsset>;

    async fn delete_asset(&self, asset_id: &str) -> Result<()>;
}

/// Creates startup documents.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn create_startup(&self, doc: &NewStartup) -> Result<StartupRecord>;
}

/// Read side: the queries behind the listing and detail pages.
#[async_trait]
pub trait Directory: Send + Sync {
    async fn list_startups(&self, search: Option<&str>) -> Result<Vec<StartupSummary>>;

    async fn get_startup(&self, id: &str) -> Result<Option<StartupDetail>>;

    /// Bump the view counter for a pitch. Best-effort; the default
    /// does nothing.
    async fn record_view(&self, _id: &str) -> Result<()> {
        Ok(())
    }
}

impl SanityClient {
    pub fn from_config(cfg: &Config) -> Result<Self> {
        let base_url = match &cfg.sanity.base_url {
            Some(url) => Url::parse(url).context("invalid sanity.base_url")?,
            None => Url::parse(&format!("https://{}.api.sanity.io/", cfg.sanity.project_id))
                .context("invalid sanity.project_id")?,
        };
        Ok(Self::with_base_url(
            cfg.sanity.token.clone(),
            cfg.sanity.api_version.clone(),
            cfg.sanity.dataset.clone(),
            base_url,
        ))
    }

    pub fn with_base_url(token: String, api_version: String, dataset: String, base_url: Url) -> Self {
        let http = Client::builder()
            .user_agent("pitchboard/0.1")
            .no_proxy()
            .build()
            .expect("reqwest client");
        Self {
            http,
            base_url,
            dataset,
            api_version,
            token,
        }
    }

    fn endpoint(&self, kind: &str) -> Result<Url> {
        self.base_url
            .join(&format!("v{}/{}/{}", self.api_version, kind, self.dataset))
            .context("invalid content store base URL")
    }

    pub fn build_mutate_request(&self, body: &Value) -> Result<reqwest::Request> {
        let mut endpoint = self.endpoint("data/mutate")?;
        endpoint
            .query_pairs_mut()
            .append_pair("returnDocuments", "true");
        self.http
            .post(endpoint)
            .header("Authorization", format!("Bearer {}", self.token))
            .header("Content-Type", "application/json")
            .json(body)
            .build()
            .context("failed to build mutate request")
    }

    async fn execute_mutate(&self, body: &Value) -> Result<MutateResp> {
        let request = self.build_mutate_request(body)?;
        let res = self
            .http
            .execute(request)
            .await
            .context("failed to reach content store")?;
        if res.status() == StatusCode::TOO_MANY_REQUESTS {
            let body = res.text().await.unwrap_or_default();
            warn!("rate limited by content store: {}", body);
            return Err(anyhow!("received 429 from content store: {}", body));
        }
        if !res.status().is_success() {
            let status = res.status();
            let body = res.text().await.unwrap_or_default();
            warn!(%status, "content store mutate failed: {}", body);
            return Err(anyhow!("sanity mutate error {}: {}", status, body));
        }
        res.json::<MutateResp>()
            .await
            .context("invalid mutate response JSON")
    }

    async fn execute_query<T: serde::de::DeserializeOwned>(
        &self,
        query: &str,
        params: Value,
    ) -> Result<T> {
        let endpoint = self.endpoint("data/query")?;
        let body = build_query_body(query, params);
        let res = self
            .http
            .post(endpoint)
            .header("Authorization", format!("Bearer {}", self.token))
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .context("failed to reach content store")?;
        if !res.status().is_success() {
            let status = res.status();
            let body = res.text().await.unwrap_or_default();
            warn!(%status, "content store query failed: {}", body);
            return Err(anyhow!("sanity query error {}: {}", status, body));
        }
        let payload: QueryResp<T> = res.json().await.context("invalid query response JSON")?;
        Ok(payload.result)
    }

    pub async fn upload_asset(
        &self,
        bytes: Vec<u8>,
        content_type: &str,
        filename: &str,
    ) -> Result<SanityAsset> {
        let mut endpoint = self.endpoint("assets/images")?;
        endpoint.query_pairs_mut().append_pair("filename", filename);
        let res = self
            .http
            .post(endpoint)
            .header("Authorization", format!("Bearer {}", self.token))
            .header("Content-Type", content_type)
            .body(bytes)
            .send()
            .await
            .context("failed to reach content store")?;
        if res.status() == StatusCode::TOO_MANY_REQUESTS {
            let body = res.text().await.unwrap_or_default();
            warn!("rate limited by content store: {}", body);
            return Err(anyhow!("received 429 from content store: {}", body));
        }
        if !res.status().is_success() {
            let status = res.status();
            let body = res.text().await.unwrap_or_default();
            warn!(%status, "asset upload failed: {}", body);
            return Err(anyhow!("sanity upload error {}: {}", status, body));
        }
        let payload: UploadAssetResp = res.json().await.context("invalid upload response JSON")?;
        info!(asset = %payload.document.id, "uploaded image asset");
        Ok(payload.document)
    }

    pub async fn create_startup(&self, doc: &NewStartup) -> Result<StartupRecord> {
        let body = build_create_mutation(doc);
        let resp = self.execute_mutate(&body).await?;
        let document = resp
            .results
            .into_iter()
            .next()
            .and_then(|r| r.document)
            .ok_or_else(|| anyhow!("mutate response carried no document"))?;
        let record: StartupRecord = serde_json::from_value(document)
            .context("invalid startup document in mutate response")?;
        info!(id = %record.id, "created startup document");
        Ok(record)
    }

    pub async fn delete_asset(&self, asset_id: &str) -> Result<()> {
        let body = build_delete_mutation(asset_id);
        let resp = self.execute_mutate(&body).await?;
        info!(tx = %resp.transaction_id, asset = %asset_id, "deleted image asset");
        Ok(())
    }

    pub async fn list_startups(&self, search: Option<&str>) -> Result<Vec<StartupSummary>> {
        self.execute_query(DIRECTORY_QUERY, search_params(search))
            .await
    }

    pub async fn get_startup(&self, id: &str) -> Result<Option<StartupDetail>> {
        self.execute_query(STARTUP_QUERY, json!({ "id": id })).await
    }

    pub async fn record_view(&self, id: &str) -> Result<()> {
        let body = build_view_patch(id);
        self.execute_mutate(&body).await?;
        Ok(())
    }

    /// Connectivity check: run a constant query against the
    /// configured dataset.
    pub async fn ping(&self) -> Result<()> {
        let _: i64 = self.execute_query("count(*[_type == \"startup\"])", json!({})).await?;
        Ok(())
    }
}

#[async_trait]
impl AssetStore for SanityClient {
    async fn upload_asset(
        &self,
        bytes: Vec<u8>,
        content_type: &str,
        filename: &str,
    ) -> Result<SanityAsset> {
        SanityClient::upload_asset(self, bytes, content_type, filename).await
    }

    async fn delete_asset(&self, asset_id: &str) -> Result<()> {
        SanityClient::delete_asset(self, asset_id).await
    }
}

#[async_trait]
impl DocumentStore for SanityClient {
    async fn create_startup(&self, doc: &NewStartup) -> Result<StartupRecord> {
        SanityClient::create_startup(self, doc).await
    }
}

#[async_trait]
impl Directory for SanityClient {
    async fn list_startups(&self, search: Option<&str>) -> Result<Vec<StartupSummary>> {
        SanityClient::list_startups(self, search).await
    }

    async fn get_startup(&self, id: &str) -> Result<Option<StartupDetail>> {
        SanityClient::get_startup(self, id).await
    }

    async fn record_view(&self, id: &str) -> Result<()> {
        SanityClient::record_view(self, id).await
    }
}

pub fn build_create_mutation(doc: &NewStartup) -> Value {
    json!({ "mutations": [ { "create": doc } ] })
}

pub fn build_delete_mutation(document_id: &str) -> Value {
    json!({ "mutations": [ { "delete": { "id": document_id } } ] })
}

/// Atomic view-counter bump; `setIfMissing` covers documents created
/// before the counter existed.
pub fn build_view_patch(document_id: &str) -> Value {
    json!({
        "mutations": [ {
            "patch": {
                "id": document_id,
                "setIfMissing": { "views": 0 },
                "inc": { "views": 1 }
            }
        } ]
    })
}

pub fn build_query_body(query: &str, params: Value) -> Value {
    json!({ "query": query, "params": params })
}

/// Null when there is no usable search term, otherwise the wildcard
/// pattern fed to GROQ `match`.
pub fn search_params(search: Option<&str>) -> Value {
    match search.map(str::trim).filter(|s| !s.is_empty()) {
        Some(term) => json!({ "search": format!("*{}*", term) }),
        None => json!({ "search": null }),
    }
}
