/// Backend Client — the single point of entry for calls to the analysis service.
///
/// The service computes match scores and writes cover letters; it lives outside
/// this repository. No authentication, no retry, no request timeout.
use reqwest::{Client, Response};
use serde::{de::DeserializeOwned, Deserialize};
use thiserror::Error;
use tracing::{debug, warn};

use crate::models::analysis::{AnalysisRequest, CoverLetter, JobPosting, MatchResult};

const ANALYZE_JOB_PATH: &str = "/analyze-job";
const COVER_LETTER_PATH: &str = "/generate-cover-letter";
const JOBS_PATH: &str = "/jobs";

#[derive(Debug, Error)]
pub enum BackendError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Backend error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Malformed backend response: {0}")]
    Parse(#[from] serde_json::Error),
}

/// FastAPI error body: `{"detail": "..."}`.
#[derive(Debug, Deserialize)]
struct BackendErrorBody {
    detail: serde_json::Value,
}

#[derive(Clone)]
pub struct BackendClient {
    client: Client,
    base_url: String,
}

impl BackendClient {
    pub fn new(base_url: impl Into<String>) -> Result<Self, BackendError> {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        let client = Client::builder()
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { client, base_url })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// POST /analyze-job
    pub async fn analyze_job(&self, request: &AnalysisRequest) -> Result<MatchResult, BackendError> {
        log_request(ANALYZE_JOB_PATH, request);
        let response = self
            .client
            .post(self.url(ANALYZE_JOB_PATH))
            .json(request)
            .send()
            .await?;
        let result: MatchResult = decode(ANALYZE_JOB_PATH, response).await?;

        debug!(
            "Match analysis succeeded: score={}, missing_keywords={}",
            result.match_score,
            result.missing_keywords.len()
        );
        Ok(result)
    }

    /// POST /generate-cover-letter
    pub async fn generate_cover_letter(
        &self,
        request: &AnalysisRequest,
    ) -> Result<CoverLetter, BackendError> {
        log_request(COVER_LETTER_PATH, request);
        let response = self
            .client
            .post(self.url(COVER_LETTER_PATH))
            .json(request)
            .send()
            .await?;
        let letter: CoverLetter = decode(COVER_LETTER_PATH, response).await?;

        debug!(
            "Cover letter generated: {} chars",
            letter.cover_letter.chars().count()
        );
        Ok(letter)
    }

    /// GET /jobs
    pub async fn list_jobs(&self) -> Result<Vec<JobPosting>, BackendError> {
        let response = self.client.get(self.url(JOBS_PATH)).send().await?;
        decode(JOBS_PATH, response).await
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

fn log_request(path: &str, request: &AnalysisRequest) {
    debug!(
        "POST {path}: job_description={} chars, resume={} chars",
        request.job_description().chars().count(),
        request.resume().chars().count()
    );
}

/// Reads the body as text first so a malformed payload surfaces as `Parse`.
async fn decode<T: DeserializeOwned>(path: &str, response: Response) -> Result<T, BackendError> {
    let status = response.status();
    let body = response.text().await?;

    if !status.is_success() {
        warn!("Backend {path} returned {status}: {body}");
        return Err(BackendError::Api {
            status: status.as_u16(),
            message: error_message(&body),
        });
    }

    serde_json::from_str(&body).map_err(BackendError::Parse)
}

/// Prefers the FastAPI `detail` field; falls back to the raw body.
fn error_message(body: &str) -> String {
    match serde_json::from_str::<BackendErrorBody>(body) {
        Ok(BackendErrorBody {
            detail: serde_json::Value::String(detail),
        }) => detail,
        Ok(BackendErrorBody { detail }) => detail.to_string(),
        Err(_) => body.to_string(),
    }
}
