//! HTTP routes for the note API.
//!
//! # Invariants
//! - Drafts are validated before any storage call; failures are `422`.
//! - Malformed bodies and query strings are `422` with the same error body.
//! - A note response pairs its head with history from the same transaction.
//! - Unknown or malformed note/version ids are `404`.
//! - Storage failures are `503` and safe to retry; task failures are `500`.

use crate::extract::{parse_flag, JsonBody, QueryParams};
use crate::state::{AppState, CallError};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json},
    routing::{get, post},
    Router,
};
use log::{error, warn};
use notevault_core::{
    DiffBase, DiffReport, Note, NoteDraft, NoteHistory, NoteId, NoteServiceError, NoteVersion,
    VersionId,
};
use serde::{Deserialize, Serialize};

/// Create the router with all routes.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .route("/notes", get(notes_list).post(note_create))
        .route(
            "/notes/{id}",
            get(note_get).put(note_update).delete(note_delete),
        )
        .route("/notes/{id}/versions", get(versions_list))
        .route("/notes/{id}/versions/{version_id}", get(version_get))
        .route("/notes/{id}/versions/{version_id}/diff", get(version_diff))
        .route("/notes/{id}/revert/{version_id}", post(note_revert))
        .with_state(state)
}

// =============================================================================
// Request / response types
// =============================================================================

#[derive(Debug, Deserialize)]
struct NoteRequest {
    title: String,
    content: String,
}

impl From<NoteRequest> for NoteDraft {
    fn from(value: NoteRequest) -> Self {
        NoteDraft::new(value.title, value.content)
    }
}

#[derive(Debug, Default, Deserialize)]
struct DiffQuery {
    /// Compare against the preceding version instead of the current head.
    previous: Option<String>,
}

/// Note head together with its history, newest first.
#[derive(Debug, Serialize)]
struct NoteResponse {
    #[serde(flatten)]
    note: Note,
    versions: Vec<NoteVersion>,
}

impl From<NoteHistory> for NoteResponse {
    fn from(value: NoteHistory) -> Self {
        Self {
            note: value.note,
            versions: value.versions,
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct ApiError {
    pub(crate) error: String,
    pub(crate) code: String,
}

type ApiResult<T> = Result<T, (StatusCode, Json<ApiError>)>;

impl ApiError {
    fn new(error: impl Into<String>, code: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            code: code.into(),
        }
    }

    fn not_found(msg: impl Into<String>) -> (StatusCode, Json<Self>) {
        (StatusCode::NOT_FOUND, Json(Self::new(msg, "NOT_FOUND")))
    }

    pub(crate) fn validation(msg: impl Into<String>) -> (StatusCode, Json<Self>) {
        (
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(Self::new(msg, "VALIDATION_ERROR")),
        )
    }

    fn storage(msg: impl Into<String>) -> (StatusCode, Json<Self>) {
        (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(Self::new(msg, "STORAGE_ERROR")),
        )
    }

    fn internal(msg: impl Into<String>) -> (StatusCode, Json<Self>) {
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(Self::new(msg, "INTERNAL_ERROR")),
        )
    }

    fn from_call(err: CallError) -> (StatusCode, Json<Self>) {
        match err {
            CallError::Service(err) if err.is_not_found() => Self::not_found(err.to_string()),
            CallError::Service(NoteServiceError::Validation(err)) => {
                Self::validation(err.to_string())
            }
            CallError::Service(err) => {
                error!(
                    "event=http_request module=server status=error error_code=storage retryable={} error={err}",
                    err.is_retryable()
                );
                Self::storage("storage temporarily unavailable")
            }
            CallError::Open(err) => {
                error!("event=http_request module=server status=error error_code=db_open error={err}");
                Self::storage("storage temporarily unavailable")
            }
            CallError::Join(err) => {
                error!("event=http_request module=server status=error error_code=join error={err}");
                Self::internal("internal server error")
            }
        }
    }
}

fn parse_note_id(raw: &str) -> ApiResult<NoteId> {
    NoteId::parse_str(raw).map_err(|_| {
        warn!("event=http_request module=server status=rejected error_code=malformed_note_id");
        ApiError::not_found(format!("note not found: {raw}"))
    })
}

fn parse_version_id(raw: &str) -> ApiResult<VersionId> {
    raw.parse::<VersionId>().map_err(|_| {
        warn!("event=http_request module=server status=rejected error_code=malformed_version_id");
        ApiError::not_found(format!("version not found: {raw}"))
    })
}

fn validated_draft(request: NoteRequest) -> ApiResult<NoteDraft> {
    let draft = NoteDraft::from(request);
    draft
        .validate()
        .map_err(|err| ApiError::validation(err.to_string()))?;
    Ok(draft)
}

// =============================================================================
// Service endpoints
// =============================================================================

async fn root() -> impl IntoResponse {
    Json(serde_json::json!({
        "message": "Welcome to the Versioned Notes API"
    }))
}

/// Health check endpoint.
async fn health() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

// =============================================================================
// Note endpoints
// =============================================================================

async fn notes_list(State(state): State<AppState>) -> ApiResult<Json<Vec<NoteResponse>>> {
    let histories = state
        .with_service(|service| service.list_with_history())
        .await
        .map_err(ApiError::from_call)?;
    Ok(Json(histories.into_iter().map(NoteResponse::from).collect()))
}

async fn note_create(
    State(state): State<AppState>,
    JsonBody(req): JsonBody<NoteRequest>,
) -> ApiResult<(StatusCode, Json<NoteResponse>)> {
    let draft = validated_draft(req)?;
    let history = state
        .with_service(move |service| service.create_with_history(&draft))
        .await
        .map_err(ApiError::from_call)?;
    Ok((StatusCode::CREATED, Json(history.into())))
}

async fn note_get(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<NoteResponse>> {
    let note_id = parse_note_id(&id)?;
    let history = state
        .with_service(move |service| {
            service
                .get_with_history(note_id)?
                .ok_or(NoteServiceError::NoteNotFound(note_id))
        })
        .await
        .map_err(ApiError::from_call)?;
    Ok(Json(history.into()))
}

async fn note_update(
    State(state): State<AppState>,
    Path(id): Path<String>,
    JsonBody(req): JsonBody<NoteRequest>,
) -> ApiResult<Json<NoteResponse>> {
    let note_id = parse_note_id(&id)?;
    let draft = validated_draft(req)?;
    let history = state
        .with_service(move |service| {
            service
                .update_with_outcome(note_id, &draft)
                .map(|outcome| outcome.into_history())
        })
        .await
        .map_err(ApiError::from_call)?;
    Ok(Json(history.into()))
}

async fn note_delete(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    let note_id = parse_note_id(&id)?;
    state
        .with_service(move |service| service.delete(note_id))
        .await
        .map_err(ApiError::from_call)?;
    Ok(StatusCode::NO_CONTENT)
}

async fn note_revert(
    State(state): State<AppState>,
    Path((id, version_id)): Path<(String, String)>,
) -> ApiResult<Json<NoteResponse>> {
    let note_id = parse_note_id(&id)?;
    let version_id = parse_version_id(&version_id)?;
    let history = state
        .with_service(move |service| service.revert_with_history(note_id, version_id))
        .await
        .map_err(ApiError::from_call)?;
    Ok(Json(history.into()))
}

// =============================================================================
// Version endpoints
// =============================================================================

async fn versions_list(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Vec<NoteVersion>>> {
    let note_id = parse_note_id(&id)?;
    let versions = state
        .with_service(move |service| service.list_versions(note_id))
        .await
        .map_err(ApiError::from_call)?;
    Ok(Json(versions))
}

async fn version_get(
    State(state): State<AppState>,
    Path((id, version_id)): Path<(String, String)>,
) -> ApiResult<Json<NoteVersion>> {
    let note_id = parse_note_id(&id)?;
    let version_id = parse_version_id(&version_id)?;
    let version = state
        .with_service(move |service| {
            service
                .get_version(note_id, version_id)?
                .ok_or(NoteServiceError::VersionNotFound {
                    note_id,
                    version_id,
                })
        })
        .await
        .map_err(ApiError::from_call)?;
    Ok(Json(version))
}

async fn version_diff(
    State(state): State<AppState>,
    Path((id, version_id)): Path<(String, String)>,
    QueryParams(query): QueryParams<DiffQuery>,
) -> ApiResult<Json<DiffReport>> {
    let note_id = parse_note_id(&id)?;
    let version_id = parse_version_id(&version_id)?;
    let previous = match query.previous.as_deref() {
        Some(raw) => parse_flag("previous", raw)?,
        None => false,
    };
    let base = if previous {
        DiffBase::PreviousVersion
    } else {
        DiffBase::CurrentHead
    };
    let report = state
        .with_service(move |service| service.diff(note_id, version_id, base))
        .await
        .map_err(ApiError::from_call)?;
    Ok(Json(report))
}
