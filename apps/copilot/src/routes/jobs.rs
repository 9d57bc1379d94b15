use axum::{extract::State, Json};

use crate::errors::AppError;
use crate::models::analysis::JobPosting;
use crate::state::AppState;

/// GET /api/v1/jobs
/// Passes through the analysis service's sample job listing.
pub async fn handle_list_jobs(
    State(state): State<AppState>,
) -> Result<Json<Vec<JobPosting>>, AppError> {
    Ok(Json(state.backend.list_jobs().await?))
}
