//! Atom + CAP parsing
//!
//! Reads the document as a stream of XML events. Only direct children of
//! `<entry>` are considered; namespaced tags match on their local name, so
//! `<cap:severity>` and `<severity>` are the same field. Text split by a
//! nested element is rejoined with a single space.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};
use tempest_protocol::{AlertRecord, AlertRecordBuilder};
use tracing::trace;

use crate::error::FeedError;

const ROOT: &str = "feed";
const ENTRY: &str = "entry";

/// Parse an Atom document into records, in feed order
///
/// `allowed` lists the extension tag names to keep. Atom core elements
/// (`id`, `title`, `summary`, `updated`) are always read.
///
/// # Errors
///
/// Returns `FeedError::Parse` if the XML is malformed, the root element is
/// not `<feed>`, an entry has no `<id>`, or a timestamp is unreadable.
pub fn parse_feed(
    xml: &str,
    allowed: &HashSet<String>,
    now: DateTime<Utc>,
) -> Result<Vec<AlertRecord>, FeedError> {
    let mut reader = Reader::from_str(xml);

    let mut saw_root = false;
    let mut records = Vec::new();

    // Open entry and how deep we are below it
    let mut entry: Option<AlertRecordBuilder> = None;
    let mut depth = 0usize;
    // Direct child currently being read
    let mut field: Option<String> = None;
    let mut text = String::new();

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => {
                let name = local_name(&e);
                if !saw_root {
                    check_root(&name)?;
                    saw_root = true;
                    continue;
                }

                if entry.is_some() {
                    depth += 1;
                    if depth == 1 {
                        field = Some(name);
                        text.clear();
                    }
                } else if name == ENTRY {
                    entry = Some(AlertRecordBuilder::new());
                    depth = 0;
                }
            }
            Ok(Event::Empty(e)) => {
                if !saw_root {
                    check_root(&local_name(&e))?;
                    // A self-closed root holds no entries
                    saw_root = true;
                }
            }
            Ok(Event::Text(e)) => {
                if depth == 1 && field.is_some() {
                    let value = e
                        .unescape()
                        .map_err(|err| FeedError::parse(format!("XML unescape error: {err}")))?;
                    push_segment(&mut text, &value);
                }
            }
            Ok(Event::CData(e)) => {
                if depth == 1 && field.is_some() {
                    push_segment(&mut text, &String::from_utf8_lossy(&e.into_inner()));
                }
            }
            Ok(Event::End(_)) => {
                if entry.is_none() {
                    continue;
                }
                if depth == 0 {
                    if let Some(done) = entry.take() {
                        records.push(done.build(now)?);
                    }
                    continue;
                }
                if depth == 1
                    && let Some(name) = field.take()
                    && let Some(builder) = entry.as_mut()
                {
                    apply_field(builder, &name, std::mem::take(&mut text), allowed);
                }
                depth -= 1;
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(FeedError::parse(format!(
                    "malformed XML at position {}: {e}",
                    reader.buffer_position()
                )));
            }
            _ => {}
        }
    }

    if !saw_root {
        return Err(FeedError::parse("document has no <feed> root element"));
    }

    Ok(records)
}

fn local_name(e: &BytesStart<'_>) -> String {
    String::from_utf8_lossy(e.local_name().as_ref()).into_owned()
}

/// Append a trimmed text run, space-separated from the previous one
fn push_segment(text: &mut String, segment: &str) {
    let segment = segment.trim();
    if segment.is_empty() {
        return;
    }
    if !text.is_empty() {
        text.push(' ');
    }
    text.push_str(segment);
}

fn check_root(name: &str) -> Result<(), FeedError> {
    if name == ROOT {
        Ok(())
    } else {
        Err(FeedError::parse(format!(
            "expected <{ROOT}> root element, found <{name}>"
        )))
    }
}

fn apply_field(builder: &mut AlertRecordBuilder, name: &str, value: String, allowed: &HashSet<String>) {
    match name {
        "id" => {
            builder.uri(value);
        }
        "title" => {
            builder.title(value);
        }
        "summary" => {
            builder.summary(value);
        }
        "updated" => {
            builder.updated(value);
        }
        _ if allowed.contains(name) => {
            if !builder.extension(name, value) {
                trace!(tag = name, "allow-listed tag has no record column, dropped");
            }
        }
        _ => {}
    }
}
