//! File Ingestion — turns an uploaded resume file into plain text.
//!
//! Dispatch is an exact match on the declared content type. Bytes are never
//! sniffed. PDF and DOCX parsing are CPU-bound and run on the blocking pool.
//!
//! Per invocation: Idle → Reading → Extracting → {Done | Failed | Rejected}.
//! No cancellation, no retry.

pub mod docx;
pub mod pdf;

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::ingestion::docx::{DocxReader, DocxRsReader};
use crate::ingestion::pdf::{extract_pdf_text, LopdfReader, PdfReader};

pub const PDF_MIME: &str = "application/pdf";
pub const DOCX_MIME: &str =
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document";
pub const PLAIN_TEXT_MIME: &str = "text/plain";

#[derive(Debug, Error)]
pub enum ExtractionError {
    #[error("failed to read upload: {0}")]
    Read(#[from] std::io::Error),

    #[error("PDF extraction failed: {0}")]
    Pdf(String),

    #[error("DOCX extraction failed: {0}")]
    Docx(String),

    #[error("extraction worker failed: {0}")]
    Worker(String),
}

// ────────────────────────────────────────────────────────────────────────────
// Inputs
// ────────────────────────────────────────────────────────────────────────────

/// The supported resume formats. Add a variant to support a new one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentKind {
    Pdf,
    Docx,
    PlainText,
}

impl ContentKind {
    /// Exact match on the declared MIME type; no normalization, no fallback.
    pub fn from_declared(content_type: &str) -> Option<Self> {
        match content_type {
            PDF_MIME => Some(Self::Pdf),
            DOCX_MIME => Some(Self::Docx),
            PLAIN_TEXT_MIME => Some(Self::PlainText),
            _ => None,
        }
    }
}

/// A readable binary source behind an uploaded file.
#[async_trait]
pub trait ByteSource: Send + Sync {
    async fn read_all(&self) -> Result<Bytes, std::io::Error>;
}

#[async_trait]
impl ByteSource for Bytes {
    async fn read_all(&self) -> Result<Bytes, std::io::Error> {
        Ok(self.clone())
    }
}

/// A user-selected file. The declared content type is trusted as-is.
pub struct UploadedFile {
    pub declared_content_type: String,
    pub display_name: String,
    source: Box<dyn ByteSource>,
}

impl UploadedFile {
    pub fn new(
        declared_content_type: impl Into<String>,
        display_name: impl Into<String>,
        source: impl ByteSource + 'static,
    ) -> Self {
        Self {
            declared_content_type: declared_content_type.into(),
            display_name: display_name.into(),
            source: Box::new(source),
        }
    }
}

impl fmt::Debug for UploadedFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UploadedFile")
            .field("declared_content_type", &self.declared_content_type)
            .field("display_name", &self.display_name)
            .finish_non_exhaustive()
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Outputs
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug)]
pub enum ExtractionResult {
    /// Extracted text. Not checked for emptiness.
    Text(String),
    /// Carries the declared content type that matched no supported kind.
    Unsupported(String),
    ExtractionFailure(ExtractionError),
}

impl ExtractionResult {
    /// The terminal phase this result corresponds to.
    pub fn phase(&self) -> IngestionPhase {
        match self {
            Self::Text(_) => IngestionPhase::Done,
            Self::Unsupported(_) => IngestionPhase::Rejected,
            Self::ExtractionFailure(_) => IngestionPhase::Failed,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IngestionPhase {
    Idle,
    Reading,
    Extracting,
    Done,
    Failed,
    Rejected,
}

// ────────────────────────────────────────────────────────────────────────────
// Pipeline
// ────────────────────────────────────────────────────────────────────────────

/// Maps an `UploadedFile` to an `ExtractionResult`.
///
/// Holds no per-call state: overlapping calls are independent and the caller
/// decides which result to keep.
#[derive(Clone)]
pub struct FileIngestionPipeline {
    pdf: Arc<dyn PdfReader>,
    docx: Arc<dyn DocxReader>,
}

impl Default for FileIngestionPipeline {
    fn default() -> Self {
        Self::new(Arc::new(LopdfReader), Arc::new(DocxRsReader))
    }
}

impl FileIngestionPipeline {
    pub fn new(pdf: Arc<dyn PdfReader>, docx: Arc<dyn DocxReader>) -> Self {
        Self { pdf, docx }
    }

    pub async fn extract(&self, file: &UploadedFile) -> ExtractionResult {
        debug!(file = %file.display_name, phase = ?IngestionPhase::Idle, "Ingestion started");

        let Some(kind) = ContentKind::from_declared(&file.declared_content_type) else {
            info!(
                file = %file.display_name,
                content_type = %file.declared_content_type,
                phase = ?IngestionPhase::Rejected,
                "Unsupported resume file type"
            );
            return ExtractionResult::Unsupported(file.declared_content_type.clone());
        };

        debug!(file = %file.display_name, phase = ?IngestionPhase::Reading, ?kind);
        let bytes = match file.source.read_all().await {
            Ok(bytes) => bytes,
            Err(e) => return failed(file, ExtractionError::Read(e)),
        };

        debug!(
            file = %file.display_name,
            phase = ?IngestionPhase::Extracting,
            bytes = bytes.len()
        );
        let outcome = match kind {
            ContentKind::Pdf => {
                let reader = Arc::clone(&self.pdf);
                run_blocking(move || extract_pdf_text(reader.as_ref(), &bytes)).await
            }
            ContentKind::Docx => {
                let reader = Arc::clone(&self.docx);
                run_blocking(move || reader.extract_raw_text(&bytes)).await
            }
            ContentKind::PlainText => Ok(String::from_utf8_lossy(&bytes).into_owned()),
        };

        match outcome {
            Ok(text) => {
                info!(
                    file = %file.display_name,
                    phase = ?IngestionPhase::Done,
                    chars = text.chars().count(),
                    "Resume text extracted"
                );
                ExtractionResult::Text(text)
            }
            Err(e) => failed(file, e),
        }
    }
}

fn failed(file: &UploadedFile, error: ExtractionError) -> ExtractionResult {
    warn!(file = %file.display_name, phase = ?IngestionPhase::Failed, "{error}");
    ExtractionResult::ExtractionFailure(error)
}

/// Library panics surface as `ExtractionError::Worker` through the join handle.
async fn run_blocking<F>(job: F) -> Result<String, ExtractionError>
where
    F: FnOnce() -> Result<String, ExtractionError> + Send + 'static,
{
    tokio::task::spawn_blocking(job)
        .await
        .map_err(|e| ExtractionError::Worker(e.to_string()))?
}
