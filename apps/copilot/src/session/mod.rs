//! Session Workspace — the per-action state rendered by the single page.
//!
//! Each user action owns one `ActionState` instead of loose flags, so a
//! result can never be half-applied. `Tracked` adds a generation counter:
//! only the most recently started run of an action may publish its outcome.

pub mod handlers;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::models::analysis::{AnalysisRequest, AnalysisRequestError, CoverLetter, MatchResult};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", content = "payload", rename_all = "snake_case")]
pub enum ActionState<T> {
    Idle,
    Loading,
    Succeeded(T),
    Failed { error: String },
}

impl<T> Default for ActionState<T> {
    fn default() -> Self {
        Self::Idle
    }
}

impl<T> ActionState<T> {
    pub fn is_loading(&self) -> bool {
        matches!(self, Self::Loading)
    }

    pub fn failed(error: impl ToString) -> Self {
        Self::Failed {
            error: error.to_string(),
        }
    }
}

/// Proof of which run of an action a completion belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ticket(u64);

/// Serializes as its current state only.
#[derive(Debug, Clone, Serialize)]
#[serde(transparent)]
pub struct Tracked<T> {
    #[serde(skip)]
    generation: u64,
    state: ActionState<T>,
}

impl<T> Default for Tracked<T> {
    fn default() -> Self {
        Self {
            generation: 0,
            state: ActionState::Idle,
        }
    }
}

impl<T> Tracked<T> {
    /// Starts a new run; any earlier ticket becomes stale.
    pub fn begin(&mut self) -> Ticket {
        self.generation += 1;
        self.state = ActionState::Loading;
        Ticket(self.generation)
    }

    /// Publishes `state` if `ticket` is still the latest run. Returns whether
    /// it was applied.
    pub fn finish(&mut self, ticket: Ticket, state: ActionState<T>) -> bool {
        if ticket.0 != self.generation {
            return false;
        }
        self.state = state;
        true
    }

    pub fn is_current(&self, ticket: Ticket) -> bool {
        ticket.0 == self.generation
    }

    pub fn state(&self) -> &ActionState<T> {
        &self.state
    }
}

/// The resume text currently held for analysis.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResumeDocument {
    pub display_name: String,
    /// Declared MIME type of the file it was extracted from.
    pub content_type: String,
    pub text: String,
    pub extracted_at: DateTime<Utc>,
}

#[derive(Debug, Default)]
pub struct Workspace {
    job_description: String,
    resume: Option<ResumeDocument>,
    /// Display name of the latest selected file, accepted or not.
    selected_file: Option<String>,
    ingestion: Tracked<ResumeDocument>,
    analysis: Tracked<MatchResult>,
    cover_letter: Tracked<CoverLetter>,
}

/// Serializable view of the workspace.
#[derive(Debug, Clone, Serialize)]
pub struct WorkspaceSnapshot {
    pub job_description: String,
    pub resume: Option<ResumeDocument>,
    pub selected_file: Option<String>,
    pub actions_enabled: bool,
    pub ingestion: Tracked<ResumeDocument>,
    pub analysis: Tracked<MatchResult>,
    pub cover_letter: Tracked<CoverLetter>,
}

impl Workspace {
    pub fn set_job_description(&mut self, job_description: String) {
        self.job_description = job_description;
    }

    /// Builds the backend request from the current texts. Fails exactly when
    /// the triggering actions are disabled.
    pub fn analysis_request(&self) -> Result<AnalysisRequest, AnalysisRequestError> {
        let resume = self.resume.as_ref().map(|r| r.text.as_str()).unwrap_or("");
        AnalysisRequest::new(self.job_description.clone(), resume)
    }

    pub fn actions_enabled(&self) -> bool {
        self.analysis_request().is_ok()
    }

    pub fn begin_ingestion(&mut self, display_name: &str) -> Ticket {
        self.selected_file = Some(display_name.to_string());
        self.ingestion.begin()
    }

    /// A successful extraction replaces the resume; a failure keeps the old one.
    pub fn finish_ingestion(&mut self, ticket: Ticket, state: ActionState<ResumeDocument>) -> bool {
        if !self.ingestion.is_current(ticket) {
            return false;
        }
        if let ActionState::Succeeded(document) = &state {
            self.resume = Some(document.clone());
        }
        self.ingestion.finish(ticket, state)
    }

    pub fn analysis_mut(&mut self) -> &mut Tracked<MatchResult> {
        &mut self.analysis
    }

    pub fn cover_letter_mut(&mut self) -> &mut Tracked<CoverLetter> {
        &mut self.cover_letter
    }

    pub fn snapshot(&self) -> WorkspaceSnapshot {
        WorkspaceSnapshot {
            job_description: self.job_description.clone(),
            resume: self.resume.clone(),
            selected_file: self.selected_file.clone(),
            actions_enabled: self.actions_enabled(),
            ingestion: self.ingestion.clone(),
            analysis: self.analysis.clone(),
            cover_letter: self.cover_letter.clone(),
        }
    }
}
