//! arXiv Atom feed parser.
//!
//! The arXiv API answers with an Atom feed whose `<entry>` elements carry:
//! - `<id>`: the canonical abstract-page URL
//! - `<title>`, `<summary>`, `<published>`
//! - one `<author><name>…</name></author>` per author
//!
//! Every field takes the first value seen in the entry. Missing fields become
//! empty strings. Feed-level elements outside `<entry>` are ignored.

use arxiv_assistant_shared::{AssistantError, PaperRecord, Result};
use quick_xml::Reader;
use quick_xml::events::Event;

/// Entry field currently collecting text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    Id,
    Title,
    Summary,
    Published,
    AuthorName,
}

impl Field {
    fn for_tag(tag: &[u8], in_author: bool) -> Option<Self> {
        match tag {
            b"id" => Some(Self::Id),
            b"title" => Some(Self::Title),
            b"summary" => Some(Self::Summary),
            b"published" => Some(Self::Published),
            b"name" if in_author => Some(Self::AuthorName),
            _ => None,
        }
    }
}

/// Fields gathered for one `<entry>` before it is closed.
#[derive(Debug, Default)]
struct EntryDraft {
    link: Option<String>,
    title: Option<String>,
    summary: Option<String>,
    published: Option<String>,
    authors: Vec<String>,
}

impl EntryDraft {
    fn set_first(slot: &mut Option<String>, value: String) {
        if slot.is_none() {
            *slot = Some(value);
        }
    }

    fn commit(&mut self, field: Field, value: String, author_name: &mut Option<String>) {
        match field {
            Field::Id => Self::set_first(&mut self.link, value),
            Field::Title => Self::set_first(&mut self.title, value),
            Field::Summary => Self::set_first(&mut self.summary, value),
            Field::Published => Self::set_first(&mut self.published, value),
            Field::AuthorName => Self::set_first(author_name, value),
        }
    }

    fn finish(self) -> PaperRecord {
        PaperRecord {
            title: self.title.unwrap_or_default(),
            authors: self.authors,
            summary: self.summary.unwrap_or_default(),
            link: self.link.unwrap_or_default(),
            published: self.published.unwrap_or_default(),
        }
    }
}

/// Parse an Atom feed into paper records, in feed order.
pub(crate) fn parse_feed(xml: &str) -> Result<Vec<PaperRecord>> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut records = Vec::new();
    let mut entry: Option<EntryDraft> = None;
    let mut in_author = false;
    let mut author_name: Option<String> = None;
    let mut current: Option<(Field, String)> = None;

    loop {
        let event = reader.read_event().map_err(|e| {
            AssistantError::parse(format!(
                "malformed arXiv feed at byte {}: {e}",
                reader.buffer_position()
            ))
        })?;

        match event {
            Event::Start(e) => {
                let local = e.local_name();
                let tag = local.as_ref();
                if tag == b"entry" {
                    entry = Some(EntryDraft::default());
                    in_author = false;
                    current = None;
                } else if entry.is_some() {
                    if tag == b"author" {
                        in_author = true;
                        author_name = None;
                    } else if current.is_none() {
                        current = Field::for_tag(tag, in_author).map(|f| (f, String::new()));
                    }
                }
            }
            Event::Text(t) => {
                if let Some((_, buf)) = current.as_mut() {
                    let text = t
                        .unescape()
                        .map_err(|e| AssistantError::parse(format!("bad text in feed: {e}")))?;
                    buf.push_str(&text);
                }
            }
            Event::CData(c) => {
                if let Some((_, buf)) = current.as_mut() {
                    buf.push_str(&String::from_utf8_lossy(&c.into_inner()));
                }
            }
            Event::End(e) => {
                let local = e.local_name();
                let tag = local.as_ref();

                if let Some((field, _)) = current.as_ref() {
                    if Field::for_tag(tag, in_author) == Some(*field) {
                        let finished = current.take();
                        if let (Some((field, value)), Some(draft)) = (finished, entry.as_mut()) {
                            draft.commit(field, value, &mut author_name);
                        }
                        continue;
                    }
                }

                match tag {
                    b"author" if in_author => {
                        in_author = false;
                        if let Some(draft) = entry.as_mut() {
                            draft.authors.push(author_name.take().unwrap_or_default());
                        }
                    }
                    b"entry" => {
                        if let Some(draft) = entry.take() {
                            records.push(draft.finish());
                        }
                    }
                    _ => {}
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(records)
}
