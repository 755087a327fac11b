//! Content extraction: turn a source descriptor (Google Docs URL or uploaded
//! file bytes) into plain text for the completion request.
//!
//! The Google Docs path always fetches the DOCX export and runs it through
//! structured extraction; export bytes are never treated as text directly.

use std::io::{Cursor, Read};

use once_cell::sync::Lazy;
use quick_xml::events::Event;
use quick_xml::Reader;
use regex::Regex;

use crate::error::ExtractError;

static DOC_ID: Lazy<Regex> = Lazy::new(|| Regex::new(r"/d/([A-Za-z0-9_-]+)").unwrap());

/// Pull the document id out of a Google Docs sharing URL.
///
/// Accepts any URL carrying a `/d/{id}` segment, e.g.
/// `https://docs.google.com/document/d/ABC123xyz/edit`.
pub fn parse_doc_id(url: &str) -> Result<&str, ExtractError> {
    DOC_ID
        .captures(url)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str())
        .ok_or(ExtractError::InvalidSourceUrl)
}

/// Fetch a publicly shared Google Doc via its DOCX export endpoint and extract
/// its text. `export_base` is the scheme+host of the export service
/// (`https://docs.google.com` in production, a stub in tests).
///
/// The URL is parsed before any network call is made; a malformed reference
/// never issues an outbound fetch.
pub async fn fetch_google_doc(
    client: &reqwest::Client,
    export_base: &str,
    url: &str,
) -> Result<String, ExtractError> {
    let doc_id = parse_doc_id(url)?;
    let export_url = format!("{export_base}/document/d/{doc_id}/export?format=docx");

    let resp = client
        .get(&export_url)
        .send()
        .await
        .map_err(|_| ExtractError::SourceUnreachable)?;
    if !resp.status().is_success() {
        return Err(ExtractError::SourceUnreachable);
    }
    let bytes = resp
        .bytes()
        .await
        .map_err(|_| ExtractError::SourceUnreachable)?;

    extract_docx(&bytes)
}

/// Decode an uploaded Markdown file. Strict UTF-8; no further parsing.
pub fn extract_markdown(bytes: &[u8]) -> Result<String, ExtractError> {
    String::from_utf8(bytes.to_vec()).map_err(|_| ExtractError::InvalidUtf8)
}

/// Extract the plain text runs from a DOCX byte buffer.
///
/// Unzips the OOXML container, walks `word/document.xml` and concatenates the
/// contents of `w:t` elements. Paragraph boundaries and `w:br` become
/// newlines, `w:tab` becomes a tab. Everything else (styling, tables beyond
/// their text, images) is dropped.
pub fn extract_docx(bytes: &[u8]) -> Result<String, ExtractError> {
    let mut archive = zip::ZipArchive::new(Cursor::new(bytes))
        .map_err(|e| ExtractError::Docx(format!("not a DOCX container: {e}")))?;
    let mut document = archive
        .by_name("word/document.xml")
        .map_err(|e| ExtractError::Docx(format!("missing word/document.xml: {e}")))?;
    let mut xml = String::new();
    document
        .read_to_string(&mut xml)
        .map_err(|e| ExtractError::Docx(format!("unreadable document part: {e}")))?;

    extract_document_xml(&xml)
}

fn extract_document_xml(xml: &str) -> Result<String, ExtractError> {
    let mut reader = Reader::from_str(xml);
    let mut text = String::new();
    let mut in_text_run = false;

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => {
                if e.name().as_ref() == b"w:t" {
                    in_text_run = true;
                }
            }
            Ok(Event::Text(t)) if in_text_run => {
                let piece = t
                    .unescape()
                    .map_err(|e| ExtractError::Docx(format!("bad text run: {e}")))?;
                text.push_str(&piece);
            }
            Ok(Event::End(e)) => match e.name().as_ref() {
                b"w:t" => in_text_run = false,
                b"w:p" => text.push('\n'),
                _ => {}
            },
            Ok(Event::Empty(e)) => match e.name().as_ref() {
                b"w:tab" => text.push('\t'),
                b"w:br" => text.push('\n'),
                _ => {}
            },
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(e) => return Err(ExtractError::Docx(format!("malformed document XML: {e}"))),
        }
    }

    Ok(text)
}
