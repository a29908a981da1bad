//! Page-bounded text accumulation.

use arxiv_assistant_shared::Result;
use tracing::debug;

use crate::events::ParseEvent;

/// Separator written when a page at or below the ceiling starts.
pub fn page_separator(page: u32) -> String {
    format!(" ---- Page {page} ---- \n")
}

/// Accumulate text from `events` until a boundary beyond `page_ceiling` or end-of-stream.
///
/// Text fragments are appended followed by a single space. Content up to and
/// including the ceiling page is kept. The first boundary past the ceiling
/// stops consumption without reading further events. Any event error aborts
/// the whole accumulation.
pub fn accumulate<I>(events: I, page_ceiling: u32) -> Result<String>
where
    I: IntoIterator<Item = Result<ParseEvent>>,
{
    let mut content = String::new();

    for event in events {
        match event? {
            ParseEvent::Text(text) => {
                content.push_str(&text);
                content.push(' ');
            }
            ParseEvent::PageBoundary(page) if page > page_ceiling => {
                debug!(page, page_ceiling, "page ceiling reached, stopping extraction");
                break;
            }
            ParseEvent::PageBoundary(page) => content.push_str(&page_separator(page)),
        }
    }

    Ok(content)
}
