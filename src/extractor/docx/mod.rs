
use std::io::{Cursor, Read};

use tracing::{debug, error};
use zip::ZipArchive;

use crate::{RagError, Result};

const DOCUMENT_PART: &str = "word/document.xml";

/// Extract paragraph text from a DOCX package, one line per paragraph
#[inline]
pub fn extract_text(bytes: &[u8]) -> Result<String> {
    let mut archive = ZipArchive::new(Cursor::new(bytes)).map_err(|e| {
        error!("DOCX archive could not be opened: {}", e);
        RagError::Extraction(format!("invalid DOCX archive: {e}"))
    })?;

    let mut xml = String::new();
    archive
        .by_name(DOCUMENT_PART)
        .map_err(|e| RagError::Extraction(format!("DOCX is missing {DOCUMENT_PART}: {e}")))?
        .read_to_string(&mut xml)
        .map_err(|e| RagError::Extraction(format!("failed to read {DOCUMENT_PART}: {e}")))?;

    let text = paragraphs_text(&xml);
    debug!(
        "Extracted {} paragraphs from DOCX",
        text.chars().filter(|&c| c == '\n').count()
    );
    Ok(text)
}

/// A start, end or self-closing tag in WordprocessingML
#[derive(Debug, PartialEq, Eq)]
enum Tag<'a> {
    Open(&'a str),
    Close(&'a str),
    Empty(&'a str),
}

fn parse_tag(raw: &str) -> Option<Tag<'_>> {
    if raw.starts_with('?') || raw.starts_with('!') {
        return None;
    }

    if let Some(name) = raw.strip_prefix('/') {
        return Some(Tag::Close(name.trim()));
    }

    let self_closing = raw.ends_with('/');
    let body = raw.trim_end_matches('/');
    let name = body
        .split(|c: char| c.is_whitespace())
        .next()
        .unwrap_or_default();

    Some(if self_closing {
        Tag::Empty(name)
    } else {
        Tag::Open(name)
    })
}

/// An open `w:p`: its slot in the output and the runs open inside it
struct OpenParagraph {
    slot: usize,
    run_depth: usize,
}

/// Walk `document.xml` and collect the text of every `w:p`, each followed by a
/// newline. Runs contribute `w:t` text, `w:tab` as a tab and `w:br`/`w:cr` as
/// line breaks; `mc:Fallback` content duplicates its `mc:Choice` and is skipped.
///
/// Paragraphs nested inside another paragraph (text boxes) are kept separate
/// and ordered by where they open, so the enclosing paragraph comes first.
fn paragraphs_text(xml: &str) -> String {
    let mut paragraphs: Vec<String> = Vec::new();
    let mut open: Vec<OpenParagraph> = Vec::new();
    let mut in_text = false;
    let mut fallback_depth = 0usize;

    let mut rest = xml;
    while let Some(start) = rest.find('<') {
        let (before, after) = rest.split_at(start);
        if in_text
            && fallback_depth == 0
            && let Some(current) = open.last()
            && let Some(paragraph) = paragraphs.get_mut(current.slot)
        {
            paragraph.push_str(&decode_entities(before));
        }

        let Some(close) = after.find('>') else {
            break;
        };
        let (raw_tag, remainder) = after.split_at(close);
        rest = remainder.get(1..).unwrap_or_default();

        let Some(tag) = parse_tag(raw_tag.get(1..).unwrap_or_default()) else {
            continue;
        };

        let in_run = open.last().is_some_and(|current| current.run_depth > 0);
        let inline = match tag {
            Tag::Open("mc:Fallback") => {
                fallback_depth += 1;
                None
            }
            Tag::Close("mc:Fallback") => {
                fallback_depth = fallback_depth.saturating_sub(1);
                None
            }
            _ if fallback_depth > 0 => None,
            Tag::Open("w:p") => {
                open.push(OpenParagraph {
                    slot: paragraphs.len(),
                    run_depth: 0,
                });
                paragraphs.push(String::new());
                None
            }
            Tag::Close("w:p") => {
                open.pop();
                None
            }
            Tag::Empty("w:p") => {
                paragraphs.push(String::new());
                None
            }
            Tag::Open("w:r") => {
                if let Some(current) = open.last_mut() {
                    current.run_depth += 1;
                }
                None
            }
            Tag::Close("w:r") => {
                if let Some(current) = open.last_mut() {
                    current.run_depth = current.run_depth.saturating_sub(1);
                }
                None
            }
            Tag::Open("w:t") => {
                in_text = true;
                None
            }
            Tag::Close("w:t") => {
                in_text = false;
                None
            }
            Tag::Open("w:tab") | Tag::Empty("w:tab") if in_run => Some('\t'),
            Tag::Open("w:br" | "w:cr") | Tag::Empty("w:br" | "w:cr") if in_run => Some('\n'),
            _ => None,
        };

        if let Some(ch) = inline
            && let Some(current) = open.last()
            && let Some(paragraph) = paragraphs.get_mut(current.slot)
        {
            paragraph.push(ch);
        }
    }

    let mut output = String::new();
    for paragraph in &paragraphs {
        output.push_str(paragraph);
        output.push('\n');
    }
    output
}

/// Decode the predefined XML entities and numeric character references
fn decode_entities(text: &str) -> String {
    if !text.contains('&') {
        return text.to_string();
    }

    let mut decoded = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(amp) = rest.find('&') {
        let (before, after) = rest.split_at(amp);
        decoded.push_str(before);

        let Some(semi) = after.find(';') else {
            decoded.push_str(after);
            return decoded;
        };
        let (entity, remainder) = after.split_at(semi + 1);
        let name = entity.trim_start_matches('&').trim_end_matches(';');

        match resolve_entity(name) {
            Some(ch) => decoded.push(ch),
            None => decoded.push_str(entity),
        }
        rest = remainder;
    }
    decoded.push_str(rest);
    decoded
}

fn resolve_entity(name: &str) -> Option<char> {
    match name {
        "amp" => Some('&'),
        "lt" => Some('<'),
        "gt" => Some('>'),
        "quot" => Some('"'),
        "apos" => Some('\''),
        _ => {
            let code = if let Some(hex) = name
                .strip_prefix("#x")
                .or_else(|| name.strip_prefix("#X"))
            {
                u32::from_str_radix(hex, 16).ok()?
            } else {
                name.strip_prefix('#')?.parse().ok()?
            };
            char::from_u32(code)
        }
    }
}
