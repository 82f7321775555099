//! MHTML container parsing: top-level headers, boundary discovery, and
//! splitting the multipart body into [`MimePart`]s.
//!
//! `mail-parser` does the multipart walk. Its part offsets are mapped back
//! onto the input so every [`MimePart`] borrows its raw body from the
//! caller's buffer (typically a memory map). A line-based boundary scanner
//! takes over for input `mail-parser` does not split into parts, and when
//! the caller forces a boundary.

use std::borrow::Cow;

use mail_parser::{MessageParser, MimeHeaders, PartType};
use tracing::{debug, warn};

use super::header::{
    content_type_param, decode_header_bytes, split_header_block, strip_angle_brackets,
    unfold_headers,
};
use super::transfer;
use crate::error::{MhtmlError, Result};
use crate::model::document::MhtmlDocument;
use crate::model::part::{Headers, MimePart, TransferEncoding};

/// Parse an MHTML archive.
///
/// `declared_boundary` overrides the boundary from the top-level
/// `Content-Type` header. Fails when no boundary can be determined, when no
/// part is found, or when none of the parts is `text/html`.
pub fn parse<'a>(raw: &'a [u8], declared_boundary: Option<&str>) -> Result<MhtmlDocument<'a>> {
    let data = skip_bom(raw);
    let (header_bytes, body_start) = split_header_block(data);
    let headers = unfold_headers(&decode_header_bytes(header_bytes));

    let boundary = declared_boundary
        .map(str::to_string)
        .or_else(|| find_boundary(&headers))
        .filter(|b| !b.is_empty())
        .ok_or_else(|| {
            MhtmlError::MalformedContainer("no multipart boundary in top-level header".into())
        })?;
    debug!(boundary = %boundary, "Found multipart boundary");

    let structured = match declared_boundary {
        Some(_) => None,
        None => parse_structured(data),
    };
    let parts = match structured {
        Some(parts) => parts,
        None => {
            debug!("Falling back to the boundary scanner");
            split_parts(&data[body_start..], &boundary)
        }
    };
    if parts.is_empty() {
        return Err(MhtmlError::MalformedContainer(format!(
            "no parts delimited by boundary '{boundary}'"
        )));
    }

    let html_parts = parts.iter().filter(|p| p.is_html()).count();
    if html_parts > 1 {
        debug!(
            count = html_parts,
            "Several text/html parts; the first is the root document"
        );
    }
    debug!(parts = parts.len(), "Parsed MHTML container");

    MhtmlDocument::new(headers, boundary, parts)
        .ok_or_else(|| MhtmlError::MalformedContainer("no text/html part".into()))
}

/// Direct children of the top-level multipart, as parsed by `mail-parser`.
///
/// `None` when the message is not multipart or has no usable child.
fn parse_structured(data: &[u8]) -> Option<Vec<MimePart<'_>>> {
    let message = MessageParser::default().parse(data)?;
    let root = message.parts.first()?;
    let PartType::Multipart(children) = &root.body else {
        return None;
    };

    let parts: Vec<MimePart<'_>> = children
        .iter()
        .filter_map(|&id| message.parts.get(id as usize))
        .filter_map(|part| part_from_parsed(part, data))
        .collect();
    debug!(parts = parts.len(), "mail-parser split the container");
    (!parts.is_empty()).then_some(parts)
}

/// Map one `mail-parser` part onto the input buffer.
fn part_from_parsed<'a>(
    part: &mail_parser::MessagePart<'a>,
    data: &'a [u8],
) -> Option<MimePart<'a>> {
    let header_start = part.offset_header as usize;
    let body_start = part.offset_body as usize;
    let body_end = delimiter_start(data, body_start, part.offset_end as usize);
    let header_bytes = data.get(header_start..body_start)?;
    let raw_body = data.get(body_start..body_end)?;

    if header_bytes.iter().chain(raw_body).all(u8::is_ascii_whitespace) {
        return None;
    }
    let headers = unfold_headers(&decode_header_bytes(header_bytes));

    let decoded_body = match &part.body {
        PartType::Binary(body) | PartType::InlineBinary(body) => match body {
            Cow::Borrowed(bytes) => Cow::Borrowed(*bytes),
            Cow::Owned(bytes) => Cow::Owned(bytes.clone()),
        },
        // Text comes back charset-decoded; the encoding resolver needs the
        // original bytes. Nested containers stay opaque.
        _ => {
            let encoding = TransferEncoding::parse(headers.get("content-transfer-encoding"));
            transfer::decode_body(raw_body, &encoding)
        }
    };

    let mut mime = MimePart::with_decoded_body(headers, raw_body, decoded_body);
    if let Some(id) = part.content_id().map(strip_angle_brackets) {
        if !id.is_empty() {
            mime.content_id = Some(id);
        }
    }
    if let Some(location) = part.content_location().map(str::trim) {
        if !location.is_empty() {
            mime.content_location = Some(location.to_string());
        }
    }
    Some(mime)
}

/// End of a body that `mail-parser` reported as ending at `end`, without
/// the line break that belongs to the following delimiter.
fn delimiter_start(data: &[u8], start: usize, end: usize) -> usize {
    let end = end.min(data.len());
    if end >= start && data[end..].starts_with(b"--") {
        strip_trailing_newline(data, start, end)
    } else {
        end
    }
}

/// Boundary from the top-level `Content-Type`, or failing that from any
/// top-level header carrying a `boundary=` parameter.
fn find_boundary(headers: &Headers) -> Option<String> {
    headers
        .get("content-type")
        .and_then(|ct| content_type_param(ct, "boundary"))
        .or_else(|| {
            headers
                .iter()
                .find_map(|(_, value)| content_type_param(value, "boundary"))
        })
}

/// Split the multipart body on delimiter lines.
///
/// A delimiter is a line equal to `--boundary` (optionally followed by
/// whitespace); `--boundary--` closes the container. The line break that
/// precedes a delimiter belongs to the delimiter (RFC 2046 §5.1.1), so part
/// bodies never end with it. The preamble and epilogue are discarded.
fn split_parts<'a>(body: &'a [u8], boundary: &str) -> Vec<MimePart<'a>> {
    let delimiter = format!("--{boundary}");
    let delimiter = delimiter.as_bytes();

    let mut parts = Vec::new();
    // Start of the current segment, `None` while in the preamble
    let mut segment_start: Option<usize> = None;
    let mut pos = 0;

    while pos < body.len() {
        let line_end = memchr_newline(&body[pos..]).map_or(body.len(), |p| pos + p + 1);
        let line = trim_line_end(&body[pos..line_end]);

        if let Some(kind) = classify_delimiter(line, delimiter) {
            if let Some(start) = segment_start {
                let end = strip_trailing_newline(body, start, pos);
                if let Some(part) = build_part(&body[start..end]) {
                    parts.push(part);
                }
            }
            if kind == Delimiter::Close {
                return parts;
            }
            segment_start = Some(line_end);
        }
        pos = line_end;
    }

    // Unterminated container: keep the last segment
    if let Some(start) = segment_start {
        if start < body.len() {
            warn!("MHTML container is missing its closing delimiter");
            if let Some(part) = build_part(&body[start..]) {
                parts.push(part);
            }
        }
    }

    parts
}

#[derive(Debug, PartialEq, Eq)]
enum Delimiter {
    Part,
    Close,
}

fn classify_delimiter(line: &[u8], delimiter: &[u8]) -> Option<Delimiter> {
    let rest = line.strip_prefix(delimiter)?;
    if rest.is_empty() {
        Some(Delimiter::Part)
    } else if rest == b"--" {
        Some(Delimiter::Close)
    } else {
        None
    }
}

/// Parse one segment into a part. Blank segments yield `None`.
fn build_part(segment: &[u8]) -> Option<MimePart<'_>> {
    if segment.iter().all(u8::is_ascii_whitespace) {
        return None;
    }
    let (header_bytes, body_start) = split_header_block(segment);
    let headers = unfold_headers(&decode_header_bytes(header_bytes));
    Some(MimePart::new(headers, &segment[body_start..]))
}

/// End of a segment that is followed by a delimiter line at `delimiter_pos`:
/// drops the CRLF or LF directly before the delimiter.
fn strip_trailing_newline(body: &[u8], start: usize, delimiter_pos: usize) -> usize {
    let mut end = delimiter_pos;
    if end > start && body[end - 1] == b'\n' {
        end -= 1;
        if end > start && body[end - 1] == b'\r' {
            end -= 1;
        }
    }
    end
}

/// Strip the line terminator and trailing transport padding.
fn trim_line_end(line: &[u8]) -> &[u8] {
    let end = line
        .iter()
        .rposition(|b| !matches!(b, b'\r' | b'\n' | b' ' | b'\t'))
        .map_or(0, |p| p + 1);
    &line[..end]
}

/// Fast newline search (equivalent to memchr for `\n`).
#[inline]
fn memchr_newline(buf: &[u8]) -> Option<usize> {
    buf.iter().position(|&b| b == b'\n')
}

/// Skip a UTF-8 BOM at the start of the archive.
fn skip_bom(data: &[u8]) -> &[u8] {
    data.strip_prefix(&[0xEF, 0xBB, 0xBF]).unwrap_or(data)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SIMPLE: &[u8] = b"From: <Saved by Blink>\r\n\
Subject: Test page\r\n\
MIME-Version: 1.0\r\n\
Content-Type: multipart/related;\r\n\
\ttype=\"text/html\";\r\n\
\tboundary=\"----MultipartBoundary--abc\"\r\n\
\r\n\
------MultipartBoundary--abc\r\n\
Content-Type: text/html\r\n\
Content-Location: https://example.com/\r\n\
\r\n\
<html><body><img src=\"cid:img1\"></body></html>\r\n\
------MultipartBoundary--abc\r\n\
Content-Type: image/png\r\n\
Content-ID: <img1>\r\n\
Content-Transfer-Encoding: base64\r\n\
\r\n\
iVBORw0KGgo=\r\n\
------MultipartBoundary--abc--\r\n";

    #[test]
    fn test_parse_simple_container() {
        let doc = parse(SIMPLE, None).unwrap();
        assert_eq!(doc.boundary, "----MultipartBoundary--abc");
        assert_eq!(doc.parts.len(), 2);
        assert_eq!(
            doc.root().raw_body,
            b"<html><body><img src=\"cid:img1\"></body></html>"
        );
        let image = &doc.parts[1];
        assert_eq!(image.content_id.as_deref(), Some("img1"));
        assert_eq!(image.decoded_body.as_ref(), b"\x89PNG\r\n\x1a\n");
    }

    #[test]
    fn test_declared_boundary_overrides_header() {
        let data = b"Content-Type: multipart/related\n\n--X\nContent-Type: text/html\n\n<p>a</p>\n--X--\n";
        let doc = parse(data, Some("X")).unwrap();
        assert_eq!(doc.parts.len(), 1);
        assert_eq!(doc.root().raw_body, b"<p>a</p>");
    }

    #[test]
    fn test_missing_boundary_is_malformed() {
        let err = parse(b"Content-Type: text/html\n\n<p>a</p>", None).unwrap_err();
        assert!(matches!(err, MhtmlError::MalformedContainer(_)));
    }

    #[test]
    fn test_zero_parts_is_malformed() {
        let data = b"Content-Type: multipart/related; boundary=X\n\nno delimiters here\n";
        assert!(matches!(
            parse(data, None),
            Err(MhtmlError::MalformedContainer(_))
        ));
    }

    #[test]
    fn test_blank_segments_are_skipped() {
        let data = b"Content-Type: multipart/related; boundary=X\n\n--X\n\n  \n--X\nContent-Type: text/html\n\n<p>a</p>\n--X--\n";
        let doc = parse(data, None).unwrap();
        assert_eq!(doc.parts.len(), 1);
    }

    #[test]
    fn test_nested_multipart_is_opaque() {
        let data = b"Content-Type: multipart/related; boundary=OUT\n\n\
--OUT\nContent-Type: text/html\n\n<p>a</p>\n\
--OUT\nContent-Type: multipart/alternative; boundary=IN\n\n--IN\nContent-Type: text/plain\n\nx\n--IN--\n\
--OUT--\n";
        let doc = parse(data, None).unwrap();
        assert_eq!(doc.parts.len(), 2);
        let nested = &doc.parts[1];
        assert!(nested.is_multipart());
        assert!(nested.raw_body.starts_with(b"--IN\n"));
        assert!(nested.raw_body.trim_ascii_end().ends_with(b"--IN--"));
        assert_eq!(nested.decoded_body.as_ref(), nested.raw_body);

        let scanned = split_parts(b"--OUT\nContent-Type: text/html\n\n<p>a</p>\n\
--OUT\nContent-Type: multipart/alternative; boundary=IN\n\n--IN\nx\n--IN--\n--OUT--\n", "OUT");
        assert_eq!(scanned[1].raw_body, b"--IN\nx\n--IN--");
    }

    #[test]
    fn test_unterminated_container_keeps_last_part() {
        let parts = split_parts(b"--X\nContent-Type: text/html\n\n<p>a</p>\n", "X");
        assert_eq!(parts.len(), 1);
        assert_eq!(parts[0].raw_body, b"<p>a</p>\n");
    }

    #[test]
    fn test_boundary_prefix_in_body_is_not_a_delimiter() {
        let parts = split_parts(b"--X\nContent-Type: text/html\n\n--XY is text\n--X--\n", "X");
        assert_eq!(parts.len(), 1);
        assert_eq!(parts[0].raw_body, b"--XY is text");
    }

    #[test]
    fn test_no_html_part_is_malformed() {
        let data = b"Content-Type: multipart/related; boundary=X\n\n--X\nContent-Type: image/gif\n\nGIF\n--X--\n";
        assert!(matches!(
            parse(data, None),
            Err(MhtmlError::MalformedContainer(_))
        ));
    }

    #[test]
    fn test_location_and_id_come_from_parsed_headers() {
        let doc = parse(SIMPLE, None).unwrap();
        assert_eq!(
            doc.root().content_location.as_deref(),
            Some("https://example.com/")
        );
        assert_eq!(doc.parts[1].content_id.as_deref(), Some("img1"));
        assert!(matches!(doc.parts[1].decoded_body, Cow::Owned(_)));
    }

    #[test]
    fn test_text_part_keeps_original_bytes() {
        // Latin-1 bytes must reach the charset resolver undecoded
        let data = b"Content-Type: multipart/related; boundary=X\r\n\r\n\
--X\r\nContent-Type: text/html; charset=iso-8859-1\r\n\
Content-Transfer-Encoding: quoted-printable\r\n\r\n<p>caf=E9</p>\r\n--X--\r\n";
        let doc = parse(data, None).unwrap();
        assert_eq!(doc.root().decoded_body.as_ref(), b"<p>caf\xe9</p>");
    }

    #[test]
    fn test_delimiter_start_drops_line_break() {
        let data = b"body\r\n--X";
        assert_eq!(delimiter_start(data, 0, 6), 4);
        assert_eq!(delimiter_start(data, 0, 4), 4);
        assert_eq!(delimiter_start(b"tail\n", 0, 5), 5);
    }
}
