//! Pull-based parse events over a PDF document.
//!
//! [`PdfEvents`] yields a [`ParseEvent::PageBoundary`] before each page's text
//! and one [`ParseEvent::Text`] per non-empty line on that page. A page's text
//! is only extracted once the consumer asks for the event after its boundary.
//! A consumer that stops at a boundary never pays for parsing that page.
//! The iterator ending is end-of-stream.

use std::collections::VecDeque;

use arxiv_assistant_shared::{AssistantError, Result};
use lopdf::Document;

/// One item of the document's text stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseEvent {
    /// A fragment of text on the current page.
    Text(String),
    /// Start of page `n` (1-based).
    PageBoundary(u32),
}

/// Lazy event sequence over a loaded PDF.
pub struct PdfEvents {
    doc: Document,
    pages: std::vec::IntoIter<u32>,
    /// Page whose boundary has been emitted but whose text has not been read.
    awaiting: Option<u32>,
    pending: VecDeque<String>,
    failed: bool,
}

impl PdfEvents {
    /// Load a PDF from memory.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let doc = Document::load_mem(bytes)
            .map_err(|e| AssistantError::Document(format!("failed to load PDF: {e}")))?;
        Ok(Self::new(doc))
    }

    /// Wrap an already-loaded document.
    pub fn new(doc: Document) -> Self {
        let pages: Vec<u32> = doc.get_pages().keys().copied().collect();
        Self {
            doc,
            pages: pages.into_iter(),
            awaiting: None,
            pending: VecDeque::new(),
            failed: false,
        }
    }

    /// Number of pages in the underlying document.
    pub fn page_count(&self) -> usize {
        self.doc.get_pages().len()
    }

    fn read_page(&mut self, page: u32) -> Result<()> {
        let text = self.doc.extract_text(&[page]).map_err(|e| {
            AssistantError::Document(format!("failed to extract text from page {page}: {e}"))
        })?;
        self.pending.extend(
            text.lines()
                .map(str::trim)
                .filter(|line| !line.is_empty())
                .map(str::to_string),
        );
        Ok(())
    }
}

impl Iterator for PdfEvents {
    type Item = Result<ParseEvent>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }

        loop {
            if let Some(text) = self.pending.pop_front() {
                return Some(Ok(ParseEvent::Text(text)));
            }

            if let Some(page) = self.awaiting.take() {
                if let Err(e) = self.read_page(page) {
                    self.failed = true;
                    return Some(Err(e));
                }
                continue;
            }

            let page = self.pages.next()?;
            self.awaiting = Some(page);
            return Some(Ok(ParseEvent::PageBoundary(page)));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_pdf::build_pdf;

    #[test]
    fn yields_boundary_then_text_per_page() {
        let bytes = build_pdf(&["alpha", "beta"]);
        let events: Vec<ParseEvent> = PdfEvents::from_bytes(&bytes)
            .expect("load")
            .collect::<Result<_>>()
            .expect("events");

        let boundaries: Vec<u32> = events
            .iter()
            .filter_map(|e| match e {
                ParseEvent::PageBoundary(n) => Some(*n),
                _ => None,
            })
            .collect();
        assert_eq!(boundaries, vec![1, 2]);
        assert_eq!(events[0], ParseEvent::PageBoundary(1));

        let second = events
            .iter()
            .position(|e| *e == ParseEvent::PageBoundary(2))
            .expect("page 2 boundary");
        let page_one_text: String = events[1..second]
            .iter()
            .filter_map(|e| match e {
                ParseEvent::Text(t) => Some(t.as_str()),
                _ => None,
            })
            .collect();
        assert!(page_one_text.contains("alpha"));
        assert!(!page_one_text.contains("beta"));
    }

    #[test]
    fn counts_pages() {
        let bytes = build_pdf(&["a", "b", "c"]);
        let events = PdfEvents::from_bytes(&bytes).expect("load");
        assert_eq!(events.page_count(), 3);
    }

    #[test]
    fn garbage_bytes_fail_to_load() {
        let err = PdfEvents::from_bytes(b"<html>not a pdf</html>")
            .err()
            .expect("load should fail");
        assert!(matches!(err, AssistantError::Document(_)));
    }
}
