use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AnalysisRequestError {
    #[error("job description is empty")]
    EmptyJobDescription,

    #[error("resume is empty")]
    EmptyResume,
}

/// Body for both backend actions. Only constructible when both texts are
/// non-empty.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalysisRequest {
    job_description: String,
    resume: String,
}

impl AnalysisRequest {
    pub fn new(
        job_description: impl Into<String>,
        resume: impl Into<String>,
    ) -> Result<Self, AnalysisRequestError> {
        let job_description = job_description.into();
        let resume = resume.into();

        if job_description.is_empty() {
            return Err(AnalysisRequestError::EmptyJobDescription);
        }
        if resume.is_empty() {
            return Err(AnalysisRequestError::EmptyResume);
        }

        Ok(Self {
            job_description,
            resume,
        })
    }

    pub fn job_description(&self) -> &str {
        &self.job_description
    }

    pub fn resume(&self) -> &str {
        &self.resume
    }
}

/// Response of `POST /analyze-job`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchResult {
    pub match_score: f64,
    /// Backend order is preserved.
    pub missing_keywords: Vec<String>,
}

/// Response of `POST /generate-cover-letter`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoverLetter {
    pub cover_letter: String,
}

/// One entry of the backend's `GET /jobs` sample listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobPosting {
    pub id: u64,
    pub title: String,
    pub company: String,
    pub description: String,
}
