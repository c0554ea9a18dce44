use axum::extract::DefaultBodyLimit;
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};
use axum::routing::{get, post};
use axum::Router;
use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use thiserror::Error;
use tower_http::trace::TraceLayer;
use tracing::error;

use crate::config::Config;
use crate::intake::Intake;
use crate::pipeline::Pipeline;
use crate::sanity::Directory;
use crate::session::DbSessions;

pub mod handlers;
pub mod pages;

/// Request bodies above this are rejected outright; the validator's
/// own 5 MB image rule is enforced later with a friendlier message.
const MAX_BODY_BYTES: usize = 16 * 1024 * 1024;

/// Per-session single-flight set for submissions. `begin` hands out a
/// guard that releases the slot on drop, so an abandoned or panicked
/// submission cannot wedge its session.
#[derive(Debug, Clone, Default)]
struct InFlight(Arc<Mutex<HashSet<String>>>);

impl InFlight {
    /// `None` means a submission is already running for the session.
    fn begin(&self, session: &str) -> Option<SubmitGuard> {
        let mut slots = self.0.lock().unwrap_or_else(|e| e.into_inner());
        if !slots.insert(session.to_string()) {
            return None;
        }
        Some(SubmitGuard {
            slots: self.clone(),
            session: session.to_string(),
        })
    }

    fn contains(&self, session: &str) -> bool {
        let slots = self.0.lock().unwrap_or_else(|e| e.into_inner());
        slots.contains(session)
    }

    fn release(&self, session: &str) {
        let mut slots = self.0.lock().unwrap_or_else(|e| e.into_inner());
        slots.remove(session);
    }
}

/// Releases the session's submission slot when dropped.
#[derive(Debug)]
pub struct SubmitGuard {
    slots: InFlight,
    session: String,
}

impl Drop for SubmitGuard {
    fn drop(&mut self) {
        self.slots.release(&self.session);
    }
}

/// Everything the handlers share. Wrapped in an `Arc` by the router.
pub struct AppState {
    pub cfg: Config,
    pub intake: Intake,
    pub pipeline: Pipeline,
    pub directory: Arc<dyn Directory>,
    pub sessions: DbSessions,
    in_flight: InFlight,
}

impl AppState {
    pub fn new(
        cfg: Config,
        intake: Intake,
        pipeline: Pipeline,
        directory: Arc<dyn Directory>,
        sessions: DbSessions,
    ) -> Self {
        Self {
            cfg,
            intake,
            pipeline,
            directory,
            sessions,
            in_flight: InFlight::default(),
        }
    }

    /// Claim the session's submission slot. `None` means one is
    /// already running and the caller must not start another. The
    /// guard keeps the slot claimed until it is dropped, whichever
    /// path the submission takes.
    pub fn begin_submit(&self, session: &str) -> Option<SubmitGuard> {
        self.in_flight.begin(session)
    }

    pub fn is_submitting(&self, session: &str) -> bool {
        self.in_flight.contains(session)
    }
}

#[derive(Debug, Error)]
pub enum WebError {
    #[error("page not found")]
    NotFound,
    #[error("sign-in required")]
    Unauthorized,
    #[error("bad request: {0}")]
    BadRequest(String),
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

pub type WebResult<T> = Result<T, WebError>;

impl IntoResponse for WebError {
    fn into_response(self) -> Response {
        match self {
            WebError::NotFound => {
                (StatusCode::NOT_FOUND, Html(pages::not_found_page().into_string()))
                    .into_response()
            }
            WebError::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                Html(pages::unauthorized_page().into_string()),
            )
                .into_response(),
            WebError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg).into_response(),
            WebError::Internal(err) => {
                error!("request failed: {err:#}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Html(pages::server_error_page().into_string()),
                )
                    .into_response()
            }
        }
    }
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(handlers::home))
        .route("/startup/{id}", get(handlers::startup_detail))
        .route("/submit", get(handlers::submit_form).post(handlers::submit))
        .route("/submit/image", post(handlers::stage_image))
        .route("/submit/image/reset", post(handlers::reset_image))
        .route("/submit/preview/{token}", get(handlers::preview))
        .route("/signin", get(handlers::signin_form).post(handlers::signin))
        .route("/signout", post(handlers::signout))
        .route("/healthz", get(handlers::healthz))
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
