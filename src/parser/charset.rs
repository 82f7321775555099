//! Text decoding of the root HTML part.
//!
//! Declared hints come first: the MIME `charset` parameter, then a
//! `<meta charset>` declaration inside the document. Without a usable hint
//! the bytes go through a fixed fallback list, strictly, and the last
//! candidate decodes with replacement characters so decoding never fails.

use encoding_rs::{Encoding, BIG5, GBK, UTF_8, WINDOWS_1252};
use tracing::{debug, warn};

use crate::model::part::MimePart;

/// Ordered fallback encodings. The last one decodes lossily.
fn fallback_encodings() -> [&'static Encoding; 4] {
    [UTF_8, GBK, BIG5, WINDOWS_1252]
}

/// How far into the document to look for a `<meta charset>` declaration.
const META_SNIFF_LIMIT: usize = 4096;

/// Result of decoding the HTML part.
#[derive(Debug, Clone)]
pub struct DecodedText {
    /// The decoded document, without a leading BOM.
    pub text: String,
    /// Encoding actually used.
    pub encoding: &'static Encoding,
    /// Charset label found in the MIME headers, if any.
    pub declared: Option<String>,
    /// `true` when a declared hint was unusable, or a fallback beyond the
    /// primary candidate had to be used.
    pub degraded: bool,
}

/// Decode the text of an HTML part. Never fails.
pub fn decode_html_text(part: &MimePart<'_>) -> DecodedText {
    decode_with_hint(&part.decoded_body, part.charset().as_deref())
}

/// Decode `bytes` trying `declared` first, then the document's own meta
/// declaration, then the fallback list.
pub fn decode_with_hint(bytes: &[u8], declared: Option<&str>) -> DecodedText {
    let (bom, payload) = match Encoding::for_bom(bytes) {
        Some((encoding, bom_len)) => (Some(encoding), &bytes[bom_len..]),
        None => (None, bytes),
    };

    let mut hints: Vec<&'static Encoding> = Vec::new();
    if let Some(label) = declared {
        match Encoding::for_label(label.trim().as_bytes()) {
            Some(encoding) => hints.push(encoding),
            None => warn!(charset = label, "Unknown declared charset"),
        }
    }
    if let Some(encoding) = sniff_meta_charset(payload) {
        if !hints.contains(&encoding) {
            hints.push(encoding);
        }
    }

    for &encoding in &hints {
        if let Some(text) = decode_strict(encoding, payload) {
            debug!(encoding = encoding.name(), "Decoded HTML with declared charset");
            return DecodedText {
                text,
                encoding,
                declared: declared.map(str::to_string),
                degraded: false,
            };
        }
        warn!(
            encoding = encoding.name(),
            "HTML is not valid in its declared charset"
        );
    }

    let mut candidates: Vec<&'static Encoding> = Vec::with_capacity(5);
    for encoding in bom.into_iter().chain(fallback_encodings()) {
        if !candidates.contains(&encoding) && !hints.contains(&encoding) {
            candidates.push(encoding);
        }
    }
    // A hinted encoding may have removed the lossy tail of the list
    if candidates.is_empty() {
        candidates.push(WINDOWS_1252);
    }

    let hinted = declared.is_some() || !hints.is_empty();
    let primary = candidates[0];

    let last = candidates[candidates.len() - 1];
    let strict = &candidates[..candidates.len() - 1];

    for &encoding in strict {
        if let Some(text) = decode_strict(encoding, payload) {
            return DecodedText {
                text,
                encoding,
                declared: declared.map(str::to_string),
                degraded: hinted || encoding != primary,
            };
        }
    }

    let (text, had_errors) = last.decode_without_bom_handling(payload);
    if had_errors {
        warn!(
            encoding = last.name(),
            "No candidate encoding fits, decoded with replacement characters"
        );
    }
    DecodedText {
        text: strip_bom(text.into_owned()),
        encoding: last,
        declared: declared.map(str::to_string),
        degraded: hinted || last != primary || had_errors,
    }
}

/// Decode without replacement; `None` on any malformed sequence.
fn decode_strict(encoding: &'static Encoding, bytes: &[u8]) -> Option<String> {
    encoding
        .decode_without_bom_handling_and_without_replacement(bytes)
        .map(|text| strip_bom(text.into_owned()))
}

fn strip_bom(text: String) -> String {
    match text.strip_prefix('\u{FEFF}') {
        Some(rest) => rest.to_string(),
        None => text,
    }
}

/// Find a `<meta charset="...">` or `<meta http-equiv ... content="...; charset=...">`
/// declaration near the start of the document.
fn sniff_meta_charset(bytes: &[u8]) -> Option<&'static Encoding> {
    let window = &bytes[..bytes.len().min(META_SNIFF_LIMIT)];
    let lower = window.to_ascii_lowercase();

    let mut from = 0;
    while let Some(rel) = find(&lower[from..], b"<meta") {
        let tag_start = from + rel;
        let tag_end = lower[tag_start..]
            .iter()
            .position(|&b| b == b'>')
            .map_or(lower.len(), |p| tag_start + p);
        let tag = &lower[tag_start..tag_end];

        if let Some(pos) = find(tag, b"charset") {
            let rest = &tag[pos + b"charset".len()..];
            let rest = trim_start(rest);
            if let Some(rest) = rest.strip_prefix(b"=") {
                let rest = trim_start(rest);
                let rest = rest
                    .strip_prefix(b"\"")
                    .or_else(|| rest.strip_prefix(b"'"))
                    .unwrap_or(rest);
                let label_len = rest
                    .iter()
                    .position(|&b| matches!(b, b'"' | b'\'' | b';' | b'/' | b'>') || b.is_ascii_whitespace())
                    .unwrap_or(rest.len());
                if let Some(encoding) = Encoding::for_label(&rest[..label_len]) {
                    return Some(encoding);
                }
            }
        }
        from = tag_end;
    }
    None
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|w| w == needle)
}

fn trim_start(bytes: &[u8]) -> &[u8] {
    let start = bytes
        .iter()
        .position(|b| !b.is_ascii_whitespace())
        .unwrap_or(bytes.len());
    &bytes[start..]
}
