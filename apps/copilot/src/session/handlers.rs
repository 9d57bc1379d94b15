//! Axum route handlers for the session workspace.

use axum::{
    extract::{multipart::MultipartError, Multipart, State},
    http::StatusCode,
    Json,
};
use bytes::Bytes;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::backend_client::BackendError;
use crate::errors::{AppError, ACCEPTED_TYPES_MESSAGE};
use crate::ingestion::{ContentKind, ExtractionResult, UploadedFile};
use crate::models::analysis::{CoverLetter, MatchResult};
use crate::session::{ActionState, ResumeDocument, Ticket, Tracked, Workspace, WorkspaceSnapshot};
use crate::state::AppState;

const FILE_FIELD: &str = "file";

#[derive(Debug, Deserialize)]
pub struct JobDescriptionRequest {
    pub job_description: String,
}

#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub resume: ResumeDocument,
    /// False when a newer upload started before this one finished; the
    /// workspace then keeps the newer result.
    pub current: bool,
}

/// GET /api/v1/session
pub async fn handle_get_session(State(state): State<AppState>) -> Json<WorkspaceSnapshot> {
    Json(state.workspace.read().snapshot())
}

/// PUT /api/v1/session/job-description
pub async fn handle_set_job_description(
    State(state): State<AppState>,
    Json(request): Json<JobDescriptionRequest>,
) -> Json<WorkspaceSnapshot> {
    let mut workspace = state.workspace.write();
    workspace.set_job_description(request.job_description);
    Json(workspace.snapshot())
}

/// POST /api/v1/session/resume
///
/// Multipart with a single `file` field. The field's Content-Type is the
/// declared content type and is trusted as-is.
pub async fn handle_upload_resume(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>, AppError> {
    let file = read_file_field(&mut multipart).await?;
    let ticket = state.workspace.write().begin_ingestion(&file.display_name);

    let result = state.pipeline.extract(&file).await;
    debug!(phase = ?result.phase(), "Ingestion of '{}' settled", file.display_name);

    let outcome = match result {
        ExtractionResult::Text(text) => Ok(ResumeDocument {
            display_name: file.display_name.clone(),
            content_type: file.declared_content_type.clone(),
            text,
            extracted_at: Utc::now(),
        }),
        ExtractionResult::Unsupported(content_type) => Err(AppError::UnsupportedFileType(content_type)),
        ExtractionResult::ExtractionFailure(e) => Err(AppError::Extraction(e)),
    };

    let update = match &outcome {
        Ok(resume) => ActionState::Succeeded(resume.clone()),
        Err(AppError::UnsupportedFileType(_)) => ActionState::failed(ACCEPTED_TYPES_MESSAGE),
        Err(e) => ActionState::failed(e),
    };
    let current = state.workspace.write().finish_ingestion(ticket, update);
    if !current {
        debug!("Discarded stale extraction of '{}'", file.display_name);
    }

    outcome.map(|resume| Json(UploadResponse { resume, current }))
}

/// POST /api/v1/session/analyze
pub async fn handle_analyze(
    State(state): State<AppState>,
) -> Result<Json<ActionState<MatchResult>>, AppError> {
    let (request, ticket) = {
        let mut workspace = state.workspace.write();
        let request = workspace.analysis_request()?;
        if workspace.analysis_mut().state().is_loading() {
            debug!("Superseding in-flight analysis run");
        }
        (request, workspace.analysis_mut().begin())
    };

    info!("Requesting match analysis");
    let result = state.backend.analyze_job(&request).await;
    settle(&state, ticket, result, Workspace::analysis_mut)
}

/// POST /api/v1/session/cover-letter
pub async fn handle_cover_letter(
    State(state): State<AppState>,
) -> Result<Json<ActionState<CoverLetter>>, AppError> {
    let (request, ticket) = {
        let mut workspace = state.workspace.write();
        let request = workspace.analysis_request()?;
        if workspace.cover_letter_mut().state().is_loading() {
            debug!("Superseding in-flight cover letter run");
        }
        (request, workspace.cover_letter_mut().begin())
    };

    info!("Requesting cover letter");
    let result = state.backend.generate_cover_letter(&request).await;
    settle(&state, ticket, result, Workspace::cover_letter_mut)
}

/// Records the backend outcome on the action, then reports it to the caller.
fn settle<T: Clone>(
    state: &AppState,
    ticket: Ticket,
    result: Result<T, BackendError>,
    action: fn(&mut Workspace) -> &mut Tracked<T>,
) -> Result<Json<ActionState<T>>, AppError> {
    let update = match &result {
        Ok(payload) => ActionState::Succeeded(payload.clone()),
        Err(e) => ActionState::failed(e),
    };

    if !action(&mut state.workspace.write()).finish(ticket, update.clone()) {
        debug!("Discarded stale backend response");
    }

    match result {
        Ok(_) => Ok(Json(update)),
        Err(e) => Err(AppError::Backend(e)),
    }
}

async fn read_file_field(multipart: &mut Multipart) -> Result<UploadedFile, AppError> {
    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        if field.name() != Some(FILE_FIELD) {
            continue;
        }

        let declared_content_type = field.content_type().unwrap_or_default().to_string();
        let display_name = field.file_name().unwrap_or("resume").to_string();

        // Unsupported uploads are rejected by the pipeline without a read, so
        // their body is never buffered.
        if ContentKind::from_declared(&declared_content_type).is_none() {
            return Ok(UploadedFile::new(declared_content_type, display_name, Bytes::new()));
        }

        let bytes = field.bytes().await.map_err(multipart_error)?;
        return Ok(UploadedFile::new(declared_content_type, display_name, bytes));
    }

    Err(AppError::Validation(format!(
        "Multipart body must contain a '{FILE_FIELD}' field"
    )))
}

fn multipart_error(e: MultipartError) -> AppError {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        AppError::PayloadTooLarge(e.body_text())
    } else {
        AppError::Validation(format!("Invalid multipart body: {}", e.body_text()))
    }
}
