//! PDF text extraction: load → pages 1..N in order → fragments per page.

use std::collections::BTreeMap;

use lopdf::{Document, Encoding, Object, ObjectId};
use tracing::debug;

use crate::ingestion::ExtractionError;

/// Loads a PDF from memory. Implementations must be shareable across the
/// blocking pool.
pub trait PdfReader: Send + Sync {
    fn load(&self, bytes: &[u8]) -> Result<Box<dyn PdfDocument>, ExtractionError>;
}

pub trait PdfDocument {
    fn page_count(&self) -> u32;

    /// Ordered text fragments of a 1-based page.
    fn text_fragments(&self, page: u32) -> Result<Vec<String>, ExtractionError>;
}

/// Fragments are joined with a single space per page; every page, the last
/// included, is followed by a newline.
pub fn extract_pdf_text(reader: &dyn PdfReader, bytes: &[u8]) -> Result<String, ExtractionError> {
    let document = reader.load(bytes)?;

    let mut text = String::new();
    for page in 1..=document.page_count() {
        let fragments = document.text_fragments(page)?;
        text.push_str(&fragments.join(" "));
        text.push('\n');
    }
    Ok(text)
}

/// `lopdf`-backed reader.
pub struct LopdfReader;

impl PdfReader for LopdfReader {
    fn load(&self, bytes: &[u8]) -> Result<Box<dyn PdfDocument>, ExtractionError> {
        let document = Document::load_mem(bytes)
            .map_err(|e| ExtractionError::Pdf(format!("failed to load document: {e}")))?;
        let page_ids = document.get_pages().into_values().collect();
        Ok(Box::new(LopdfDocument { document, page_ids }))
    }
}

struct LopdfDocument {
    document: Document,
    /// Page objects in document order.
    page_ids: Vec<ObjectId>,
}

impl PdfDocument for LopdfDocument {
    fn page_count(&self) -> u32 {
        self.page_ids.len() as u32
    }

    /// One fragment per text-showing operator (`Tj`, `TJ`, `'`, `"`), in
    /// content stream order.
    fn text_fragments(&self, page: u32) -> Result<Vec<String>, ExtractionError> {
        let page_id = page
            .checked_sub(1)
            .and_then(|i| self.page_ids.get(i as usize))
            .copied()
            .ok_or_else(|| ExtractionError::Pdf(format!("page {page} out of range")))?;
        let page_error = |e: lopdf::Error| ExtractionError::Pdf(format!("page {page}: {e}"));

        let encodings = self
            .document
            .get_page_fonts(page_id)
            .map_err(page_error)?
            .into_iter()
            .map(|(name, font)| font.get_font_encoding(&self.document).map(|enc| (name, enc)))
            .collect::<Result<BTreeMap<Vec<u8>, Encoding>, _>>()
            .map_err(page_error)?;
        let content = self
            .document
            .get_and_decode_page_content(page_id)
            .map_err(page_error)?;

        let mut fragments = Vec::new();
        let mut encoding = None;
        for operation in &content.operations {
            match operation.operator.as_str() {
                "Tf" => {
                    encoding = operation
                        .operands
                        .first()
                        .and_then(|font| font.as_name().ok())
                        .and_then(|font| encodings.get(font));
                }
                "Tj" | "TJ" | "'" | "\"" => {
                    let Some(encoding) = encoding else {
                        debug!(page, operator = %operation.operator, "Text shown without a known font");
                        continue;
                    };
                    // `"` carries word and character spacing before the string.
                    let shown = match operation.operator.as_str() {
                        "\"" => operation.operands.last().map(std::slice::from_ref).unwrap_or_default(),
                        _ => operation.operands.as_slice(),
                    };
                    let mut fragment = String::new();
                    collect_shown_text(&mut fragment, encoding, shown).map_err(page_error)?;
                    let fragment = fragment.trim();
                    if !fragment.is_empty() {
                        fragments.push(fragment.to_string());
                    }
                }
                _ => {}
            }
        }
        Ok(fragments)
    }
}

/// Kerning offsets wider than a tenth of an em inside `TJ` count as a word gap.
const WORD_GAP_KERNING: f32 = -100.0;

fn collect_shown_text(
    out: &mut String,
    encoding: &Encoding,
    operands: &[Object],
) -> Result<(), lopdf::Error> {
    for operand in operands {
        match operand {
            Object::String(bytes, _) => out.push_str(&Document::decode_text(encoding, bytes)?),
            Object::Array(items) => collect_shown_text(out, encoding, items)?,
            Object::Integer(offset) if (*offset as f32) < WORD_GAP_KERNING => out.push(' '),
            Object::Real(offset) if *offset < WORD_GAP_KERNING => out.push(' '),
            _ => {}
        }
    }
    Ok(())
}
