//! DOCX raw-text extraction.

use docx_rs::{
    DocumentChild, InsertChild, MoveToChild, Paragraph, ParagraphChild, Run, RunChild,
    StructuredDataTag, StructuredDataTagChild, Table, TableCellContent, TableChild, TableRowChild,
};

use crate::ingestion::ExtractionError;

/// Extracts raw text from DOCX bytes. The pipeline returns the result verbatim.
pub trait DocxReader: Send + Sync {
    fn extract_raw_text(&self, bytes: &[u8]) -> Result<String, ExtractionError>;
}

/// `docx-rs`-backed reader.
///
/// Body order is preserved. Every paragraph, including those inside table
/// cells, is followed by a blank line.
pub struct DocxRsReader;

impl DocxReader for DocxRsReader {
    fn extract_raw_text(&self, bytes: &[u8]) -> Result<String, ExtractionError> {
        let docx = docx_rs::read_docx(bytes).map_err(|e| ExtractionError::Docx(e.to_string()))?;

        let mut text = String::new();
        for child in &docx.document.children {
            match child {
                DocumentChild::Paragraph(paragraph) => push_paragraph(paragraph, &mut text),
                DocumentChild::Table(table) => push_table(table, &mut text),
                DocumentChild::StructuredDataTag(tag) => push_structured_data_tag(tag, &mut text),
                _ => {}
            }
        }
        Ok(text)
    }
}

fn push_paragraph(paragraph: &Paragraph, out: &mut String) {
    push_paragraph_children(&paragraph.children, out);
    out.push_str("\n\n");
}

fn push_paragraph_children(children: &[ParagraphChild], out: &mut String) {
    for child in children {
        match child {
            ParagraphChild::Run(run) => push_run(run, out),
            ParagraphChild::Hyperlink(link) => push_paragraph_children(&link.children, out),
            ParagraphChild::StructuredDataTag(tag) => push_structured_data_tag(tag, out),
            // Tracked insertions and moves are live text; deletions are not.
            ParagraphChild::Insert(insert) => {
                for child in &insert.children {
                    if let InsertChild::Run(run) = child {
                        push_run(run, out);
                    }
                }
            }
            ParagraphChild::MoveTo(moved) => {
                for child in &moved.children {
                    if let MoveToChild::Run(run) = child {
                        push_run(run, out);
                    }
                }
            }
            _ => {}
        }
    }
}

fn push_run(run: &Run, out: &mut String) {
    for child in &run.children {
        match child {
            RunChild::Text(t) => out.push_str(&t.text),
            RunChild::Tab(_) => out.push('\t'),
            RunChild::Break(_) => out.push('\n'),
            _ => {}
        }
    }
}

fn push_table(table: &Table, out: &mut String) {
    for row in &table.rows {
        #[allow(irrefutable_let_patterns)]
        let TableChild::TableRow(row) = row else { continue };
        for cell in &row.cells {
            #[allow(irrefutable_let_patterns)]
            let TableRowChild::TableCell(cell) = cell else { continue };
            for content in &cell.children {
                match content {
                    TableCellContent::Paragraph(paragraph) => push_paragraph(paragraph, out),
                    TableCellContent::Table(nested) => push_table(nested, out),
                    TableCellContent::StructuredDataTag(tag) => push_structured_data_tag(tag, out),
                    _ => {}
                }
            }
        }
    }
}

/// Content controls are transparent: their content is walked in place.
fn push_structured_data_tag(tag: &StructuredDataTag, out: &mut String) {
    for child in &tag.children {
        match child {
            StructuredDataTagChild::Run(run) => push_run(run, out),
            StructuredDataTagChild::Paragraph(paragraph) => push_paragraph(paragraph, out),
            StructuredDataTagChild::Table(table) => push_table(table, out),
            StructuredDataTagChild::StructuredDataTag(nested) => push_structured_data_tag(nested, out),
            _ => {}
        }
    }
}
