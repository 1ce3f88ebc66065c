//! Transcript rendering to a paginated PDF.
//!
//! US letter pages, 0.75in margins, a bold title on the first page and one
//! monospaced line per second below it.

use printpdf::{BuiltinFont, IndirectFontRef, Mm, PdfDocument, PdfDocumentReference, PdfLayerReference};
use std::ops::Range;

use super::common::{TranscriptLine, transcript_title};
use crate::error::{Result, ConvkitError};

const PAGE_WIDTH: f32 = 612.0;
const PAGE_HEIGHT: f32 = 792.0;
const MARGIN: f32 = 54.0;
const TITLE_SIZE: f32 = 14.0;
const TITLE_GAP: f32 = 28.8;
const BODY_SIZE: f32 = 10.0;
const LINE_HEIGHT: f32 = 13.0;

fn mm(points: f32) -> Mm {
    Mm(points * 25.4 / 72.0)
}

/// Baselines a page can hold starting from `top`
fn lines_from(top: f32) -> usize {
    ((top - MARGIN) / LINE_HEIGHT).floor() as usize + 1
}

/// Line index ranges per page; the first page loses room to the title
pub fn paginate(line_count: usize) -> Vec<Range<usize>> {
    let first = lines_from(PAGE_HEIGHT - MARGIN - TITLE_GAP);
    let rest = lines_from(PAGE_HEIGHT - MARGIN);

    let mut pages = vec![0..line_count.min(first)];
    let mut start = first;
    while start < line_count {
        let end = (start + rest).min(line_count);
        pages.push(start..end);
        start = end;
    }
    pages
}

/// Render the per-second transcript as PDF bytes
pub fn render_transcript_pdf(input_name: &str, language: Option<&str>, lines: &[TranscriptLine]) -> Result<Vec<u8>> {
    let title = transcript_title(input_name, language);
    let (doc, page, layer) = PdfDocument::new(&title, mm(PAGE_WIDTH), mm(PAGE_HEIGHT), "Transcript");

    let title_font = doc.add_builtin_font(BuiltinFont::HelveticaBold).map_err(pdf_error)?;
    let body_font = doc.add_builtin_font(BuiltinFont::Courier).map_err(pdf_error)?;

    let mut current = doc.get_page(page).get_layer(layer);
    current.use_text(&title, TITLE_SIZE, mm(MARGIN), mm(PAGE_HEIGHT - MARGIN), &title_font);

    for (index, range) in paginate(lines.len()).into_iter().enumerate() {
        let mut y = PAGE_HEIGHT - MARGIN;
        if index == 0 {
            y -= TITLE_GAP;
        } else {
            current = new_page(&doc);
        }

        for line in &lines[range] {
            draw_line(&current, &line.render(), y, &body_font);
            y -= LINE_HEIGHT;
        }
    }

    doc.save_to_bytes().map_err(pdf_error)
}

fn new_page(doc: &PdfDocumentReference) -> PdfLayerReference {
    let (page, layer) = doc.add_page(mm(PAGE_WIDTH), mm(PAGE_HEIGHT), "Transcript");
    doc.get_page(page).get_layer(layer)
}

fn draw_line(layer: &PdfLayerReference, text: &str, y: f32, font: &IndirectFontRef) {
    layer.use_text(text, BODY_SIZE, mm(MARGIN), mm(y), font);
}

fn pdf_error(e: printpdf::Error) -> ConvkitError {
    ConvkitError::Pdf(e.to_string())
}
