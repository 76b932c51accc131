// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// PDF reader — page counts and the embedded text layer, via `lopdf`.

use docwerk_core::error::{DocwerkError, Result};
use lopdf::Document;
use tracing::{debug, instrument, warn};

/// Read-only view over an existing PDF.
pub struct PdfReader {
    document: Document,
}

impl PdfReader {
    /// Parse PDF bytes already read from disk.
    #[instrument(skip_all, fields(bytes_len = data.len()))]
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        let document = Document::load_mem(data)
            .map_err(|err| DocwerkError::PdfError(format!("unreadable PDF: {err}")))?;
        debug!(pages = document.get_pages().len(), "PDF loaded");
        Ok(Self { document })
    }

    pub fn page_count(&self) -> usize {
        self.document.get_pages().len()
    }

    // -- Text layer -----------------------------------------------------------

    /// Text of every page, in page order.
    ///
    /// Pages whose content streams cannot be decoded yield an empty string
    /// rather than failing the whole document.
    pub fn page_texts(&self) -> Vec<String> {
        let mut page_numbers: Vec<u32> = self.document.get_pages().keys().copied().collect();
        page_numbers.sort_unstable();

        page_numbers
            .into_iter()
            .map(|number| match self.document.extract_text(&[number]) {
                Ok(text) => normalise_page_text(&text),
                Err(err) => {
                    warn!(page = number, %err, "page text unreadable");
                    String::new()
                }
            })
            .collect()
    }

    /// Whole-document text with pages separated by a blank line.
    ///
    /// Fails only when the document has no pages at all.
    #[instrument(skip(self), fields(pages = self.page_count()))]
    pub fn extract_text(&self) -> Result<String> {
        if self.page_count() == 0 {
            return Err(DocwerkError::PdfError("document has no pages".into()));
        }
        let text = self
            .page_texts()
            .into_iter()
            .filter(|page| !page.is_empty())
            .collect::<Vec<_>>()
            .join("\n\n");
        debug!(chars = text.chars().count(), "PDF text extracted");
        Ok(text)
    }
}

/// Trim trailing whitespace per line and drop leading/trailing blank lines.
fn normalise_page_text(text: &str) -> String {
    text.lines()
        .map(str::trim_end)
        .collect::<Vec<_>>()
        .join("\n")
        .trim_matches('\n')
        .to_string()
}
