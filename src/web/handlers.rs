use axum::extract::{Multipart, Path, Query, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{AppendHeaders, Html, IntoResponse, Json, Redirect, Response};
use axum::Form;
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use tracing::{debug, instrument, warn};

use crate::intake::Intake;
use crate::model::{SessionIdentity, SubmitStatus};
use crate::pipeline::{PitchDraft, PitchImage, PitchResponse};
use crate::session::{cookie_value, SessionResolver, SESSION_COOKIE};
use crate::validate::{self, Candidate, ImageMeta};
use crate::web::{pages, AppState, SubmitGuard, WebError, WebResult};

fn session_token(headers: &HeaderMap) -> Option<String> {
    let cookies = headers.get(header::COOKIE)?.to_str().ok()?;
    cookie_value(cookies, SESSION_COOKIE).map(str::to_string)
}

/// Form posts from fetch() ask for JSON; plain browser posts do not.
fn wants_json(headers: &HeaderMap) -> bool {
    headers
        .get(header::ACCEPT)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.contains("application/json"))
        .unwrap_or(false)
}

async fn identity_for(
    state: &AppState,
    headers: &HeaderMap,
) -> WebResult<Option<(String, SessionIdentity)>> {
    let Some(token) = session_token(headers) else {
        return Ok(None);
    };
    let identity = state.sessions.resolve(Some(&token)).await?;
    Ok(identity.map(|id| (token, id)))
}

#[derive(Debug, Deserialize)]
pub struct SearchParams {
    #[serde(default)]
    pub query: Option<String>,
}

pub async fn home(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(params): Query<SearchParams>,
) -> WebResult<Html<String>> {
    let identity = identity_for(&state, &headers).await?.map(|(_, id)| id);
    let term = params
        .query
        .as_deref()
        .map(str::trim)
        .filter(|t| !t.is_empty());
    let startups = state.directory.list_startups(term).await?;
    Ok(Html(
        pages::home_page(identity.as_ref(), term, &startups).into_string(),
    ))
}

#[derive(Debug, Deserialize)]
pub struct DetailParams {
    #[serde(default)]
    pub created: Option<String>,
}

pub async fn startup_detail(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Query(params): Query<DetailParams>,
) -> WebResult<Html<String>> {
    let identity = identity_for(&state, &headers).await?.map(|(_, id)| id);
    let startup = state
        .directory
        .get_startup(&id)
        .await?
        .ok_or(WebError::NotFound)?;

    // Count the view without holding up the page.
    let directory = state.directory.clone();
    let viewed = startup.id.clone();
    tokio::spawn(async move {
        if let Err(err) = directory.record_view(&viewed).await {
            warn!("failed to record view for {viewed}: {err:#}");
        }
    });

    let just_created = params.created.as_deref() == Some("1");
    Ok(Html(
        pages::detail_page(identity.as_ref(), &startup, just_created).into_string(),
    ))
}

pub async fn submit_form(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> WebResult<Response> {
    let Some((token, identity)) = identity_for(&state, &headers).await? else {
        return Ok(Redirect::to("/signin").into_response());
    };
    let staged = state.intake.current(&token).await?;
    let pending = state.is_submitting(&token);
    let page = pages::submit_page(
        &identity,
        &PitchDraft::default(),
        staged.as_ref(),
        None,
        pending,
    );
    Ok(Html(page.into_string()).into_response())
}

#[derive(Debug, Deserialize)]
pub struct SubmitForm {
    #[serde(default)]
    pub prev: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub pitch: String,
}

#[instrument(skip_all)]
pub async fn submit(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Form(form): Form<SubmitForm>,
) -> WebResult<Response> {
    let token = session_token(&headers);
    let prev = SubmitStatus::parse(&form.prev).unwrap_or(SubmitStatus::Initial);
    let draft = PitchDraft {
        title: form.title,
        description: form.description,
        category: form.category,
        pitch: form.pitch,
    };

    // One submission per session at a time.
    let guard = match &token {
        Some(tok) => match state.begin_submit(tok) {
            Some(guard) => Some(guard),
            None => {
                debug!("submission already in flight for session");
                let envelope =
                    PitchResponse::failure("A submission is already in progress").normalize();
                return respond_submit(&state, &headers, token.as_deref(), &draft, envelope).await;
            }
        },
        None => None,
    };

    // The whole attempt runs detached so a dropped connection cannot
    // cancel the store mutations or skip cleanup. The slot guard rides
    // along and is released when the task finishes, not when the
    // response future is dropped.
    let handle = tokio::spawn({
        let state = state.clone();
        let token = token.clone();
        let draft = draft.clone();
        async move { run_submission(&state, token.as_deref(), prev, &draft, guard).await }
    });
    let envelope = match handle.await {
        Ok(outcome) => outcome?,
        Err(err) => PitchResponse::failure(format!("submission task failed: {err}")).normalize(),
    };

    respond_submit(&state, &headers, token.as_deref(), &draft, envelope).await
}

async fn run_submission(
    state: &AppState,
    token: Option<&str>,
    prev: SubmitStatus,
    draft: &PitchDraft,
    _guard: Option<SubmitGuard>,
) -> WebResult<PitchResponse> {
    let staged = match token {
        Some(tok) => state.intake.current(tok).await?,
        None => None,
    };

    // Field validation runs before anything touches the content store.
    let meta = staged.as_ref().map(|row| ImageMeta {
        byte_size: row.byte_size as u64,
        content_type: row.content_type.clone(),
        filename: row.original_filename.clone(),
    });
    let candidate = Candidate {
        title: &draft.title,
        description: &draft.description,
        category: &draft.category,
        pitch: &draft.pitch,
        image: meta.as_ref(),
    };
    if let Err(errors) = validate::validate_submission(&candidate) {
        return Ok(PitchResponse::invalid(errors));
    }

    let image = match &staged {
        Some(row) => Some(PitchImage {
            bytes: state.intake.read_bytes(row).await?,
            content_type: row.content_type.clone(),
            filename: row.original_filename.clone(),
        }),
        None => None,
    };

    let envelope = state.pipeline.create_pitch(prev, token, draft, image).await;

    if envelope.status == SubmitStatus::Success {
        if let Some(tok) = token {
            // The staged image is consumed by the published pitch.
            release_staging(&state.intake, tok).await;
        }
    }

    Ok(envelope)
}

/// Clear the staged image once a pitch is published. The pitch is
/// already live at this point, so a failed cleanup is logged and the
/// stale row is left for the maintenance sweep.
async fn release_staging(intake: &Intake, token: &str) {
    if let Err(err) = intake.reset(token).await {
        warn!("failed to clear staged image after publish: {err:#}");
    }
}

/// JSON callers get the envelope itself; browsers get a redirect on
/// success and the re-rendered form otherwise.
async fn respond_submit(
    state: &AppState,
    headers: &HeaderMap,
    token: Option<&str>,
    draft: &PitchDraft,
    envelope: PitchResponse,
) -> WebResult<Response> {
    if wants_json(headers) {
        return Ok(Json(envelope).into_response());
    }

    if envelope.status == SubmitStatus::Success {
        if let Some(doc) = &envelope.document {
            return Ok(Redirect::to(&format!("/startup/{}?created=1", doc.id)).into_response());
        }
    }

    let identity = match token {
        Some(tok) => state.sessions.resolve(Some(tok)).await?,
        None => None,
    };
    let Some(identity) = identity else {
        return Ok(Redirect::to("/signin").into_response());
    };
    let staged = match token {
        Some(tok) => state.intake.current(tok).await?,
        None => None,
    };
    let pending = token.map(|tok| state.is_submitting(tok)).unwrap_or(false);
    let page = pages::submit_page(&identity, draft, staged.as_ref(), Some(&envelope), pending);
    Ok(Html(page.into_string()).into_response())
}

/// Multipart target for the drop zone and the plain file form. The
/// first field named `file` wins; anything else in the body is skipped.
#[instrument(skip_all)]
pub async fn stage_image(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    mut multipart: Multipart,
) -> WebResult<Response> {
    let Some((token, _identity)) = identity_for(&state, &headers).await? else {
        return Err(WebError::Unauthorized);
    };

    let mut staged = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| WebError::BadRequest(format!("malformed multipart body: {e}")))?
    {
        if field.name() != Some("file") {
            continue;
        }
        let filename = field
            .file_name()
            .map(str::to_string)
            .unwrap_or_else(|| "upload".to_string());
        let content_type = normalize_mime(field.content_type().unwrap_or(""));
        let bytes = field
            .bytes()
            .await
            .map_err(|e| WebError::BadRequest(format!("failed to read upload: {e}")))?;
        staged = Some(state.intake.stage(&token, &filename, &content_type, &bytes).await?);
        break;
    }

    let Some(row) = staged else {
        return Err(WebError::BadRequest("no file field in upload".to_string()));
    };

    if wants_json(&headers) {
        Ok(Json(json!({
            "token": row.token,
            "filename": row.original_filename,
            "byte_size": row.byte_size,
            "preview_url": format!("/submit/preview/{}", row.token),
        }))
        .into_response())
    } else {
        Ok(Redirect::to("/submit").into_response())
    }
}

/// Lowercase the media type and drop any parameters, so staging stores
/// `image/jpeg` rather than `image/JPEG; charset=binary`.
fn normalize_mime(raw: &str) -> String {
    let essence = raw.split(';').next().unwrap_or("").trim();
    if essence.is_empty() {
        "application/octet-stream".to_string()
    } else {
        essence.to_ascii_lowercase()
    }
}

pub async fn reset_image(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> WebResult<Response> {
    let Some((token, _identity)) = identity_for(&state, &headers).await? else {
        return Err(WebError::Unauthorized);
    };
    let cleared = state.intake.reset(&token).await?;

    if wants_json(&headers) {
        Ok(Json(json!({ "cleared": cleared })).into_response())
    } else {
        Ok(Redirect::to("/submit").into_response())
    }
}

/// Staged files are addressed by an unguessable token, not by session,
/// so the preview URL works in a plain `<img>` tag.
pub async fn preview(
    State(state): State<Arc<AppState>>,
    Path(token): Path<String>,
) -> WebResult<Response> {
    let Some((bytes, content_type)) = state.intake.open_preview(&token).await? else {
        return Err(WebError::NotFound);
    };
    Ok(([(header::CONTENT_TYPE, content_type)], bytes).into_response())
}

pub async fn signin_form(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> WebResult<Response> {
    if identity_for(&state, &headers).await?.is_some() {
        return Ok(Redirect::to("/").into_response());
    }
    Ok(Html(pages::signin_page(None).into_string()).into_response())
}

#[derive(Debug, Deserialize)]
pub struct SigninForm {
    #[serde(default)]
    pub access_key: String,
}

#[instrument(skip_all)]
pub async fn signin(
    State(state): State<Arc<AppState>>,
    Form(form): Form<SigninForm>,
) -> WebResult<Response> {
    let Some(token) = state
        .sessions
        .sign_in(&state.cfg, form.access_key.trim())
        .await?
    else {
        let page = pages::signin_page(Some("That access key is not recognized."));
        return Ok((StatusCode::UNAUTHORIZED, Html(page.into_string())).into_response());
    };

    let max_age = state.cfg.app.session_ttl_hours * 3600;
    let cookie = format!(
        "{SESSION_COOKIE}={token}; Path=/; HttpOnly; SameSite=Lax; Max-Age={max_age}"
    );
    Ok((
        AppendHeaders([(header::SET_COOKIE, cookie)]),
        Redirect::to("/"),
    )
        .into_response())
}

pub async fn signout(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> WebResult<Response> {
    if let Some(token) = session_token(&headers) {
        state.sessions.sign_out(&token).await?;
    }
    let cookie = format!("{SESSION_COOKIE}=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0");
    Ok((
        AppendHeaders([(header::SET_COOKIE, cookie)]),
        Redirect::to("/"),
    )
        .into_response())
}

pub async fn healthz() -> &'static str {
    "ok"
}
