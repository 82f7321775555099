//! A single MIME part of an MHTML container.

use std::borrow::Cow;

use crate::parser::header;
use crate::parser::transfer;

/// Case-insensitive header collection.
///
/// Raw header names are not unique; lookups return the value of the
/// **last** occurrence of a name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Headers {
    /// `(lowercase_name, unfolded_value)` in appearance order.
    entries: Vec<(String, String)>,
}

impl Headers {
    /// Create an empty header collection.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a header. The name is stored lowercased.
    pub fn push(&mut self, name: &str, value: impl Into<String>) {
        self.entries.push((name.trim().to_ascii_lowercase(), value.into()));
    }

    /// Value of the last header called `name` (case-insensitive).
    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .rev()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Iterate over `(lowercase_name, value)` pairs in appearance order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Number of raw header lines (after unfolding).
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// `true` if no headers were present.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Content-Transfer-Encoding of a part (RFC 2045 §6).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransferEncoding {
    Base64,
    QuotedPrintable,
    SevenBit,
    EightBit,
    Binary,
    /// No `Content-Transfer-Encoding` header.
    Absent,
    /// An unrecognized token; the body is passed through untouched.
    Unknown(String),
}

impl TransferEncoding {
    /// Classify a raw header value.
    pub fn parse(value: Option<&str>) -> Self {
        let Some(value) = value else {
            return Self::Absent;
        };
        match value.trim().to_ascii_lowercase().as_str() {
            "base64" => Self::Base64,
            "quoted-printable" => Self::QuotedPrintable,
            "7bit" => Self::SevenBit,
            "8bit" => Self::EightBit,
            "binary" => Self::Binary,
            "" => Self::Absent,
            other => Self::Unknown(other.to_string()),
        }
    }
}

/// One body segment of the container, with its headers and both the raw
/// and the transfer-decoded body.
///
/// Borrowed from the input buffer: the raw body is a slice of it, and the
/// decoded body only allocates when a transfer encoding actually applies.
#[derive(Debug, Clone)]
pub struct MimePart<'a> {
    /// All headers of the part.
    pub headers: Headers,

    /// Lowercase MIME essence (`"text/html"`, `"image/png"`).
    /// Defaults to `"text/plain"` when the header is missing (RFC 2045 §5.2).
    pub content_type: String,

    /// Trimmed `Content-Location` value, if present.
    pub content_location: Option<String>,

    /// `Content-ID` without its `<`/`>` delimiters, if present.
    pub content_id: Option<String>,

    /// Declared transfer encoding.
    pub transfer_encoding: TransferEncoding,

    /// Body bytes exactly as they appear in the container.
    pub raw_body: &'a [u8],

    /// Body bytes after transfer decoding. Derived once from `raw_body`.
    pub decoded_body: Cow<'a, [u8]>,
}

impl<'a> MimePart<'a> {
    /// Build a part from its parsed headers and raw body, deriving every
    /// other field.
    pub fn new(headers: Headers, raw_body: &'a [u8]) -> Self {
        let transfer_encoding = TransferEncoding::parse(headers.get("content-transfer-encoding"));
        let decoded_body = transfer::decode_body(raw_body, &transfer_encoding);
        Self::with_decoded_body(headers, raw_body, decoded_body)
    }

    /// Build a part whose body was already transfer-decoded elsewhere.
    pub fn with_decoded_body(
        headers: Headers,
        raw_body: &'a [u8],
        decoded_body: Cow<'a, [u8]>,
    ) -> Self {
        let content_type = headers
            .get("content-type")
            .map(header::mime_essence)
            .filter(|ct| !ct.is_empty())
            .unwrap_or_else(|| "text/plain".to_string());

        let content_location = headers
            .get("content-location")
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty());

        let content_id = headers
            .get("content-id")
            .map(header::strip_angle_brackets)
            .filter(|v| !v.is_empty());

        let transfer_encoding = TransferEncoding::parse(headers.get("content-transfer-encoding"));

        Self {
            headers,
            content_type,
            content_location,
            content_id,
            transfer_encoding,
            raw_body,
            decoded_body,
        }
    }

    /// Raw `Content-Type` header value, parameters included.
    pub fn content_type_header(&self) -> Option<&str> {
        self.headers.get("content-type")
    }

    /// `charset` parameter of the `Content-Type` header.
    pub fn charset(&self) -> Option<String> {
        self.content_type_header()
            .and_then(|ct| header::content_type_param(ct, "charset"))
    }

    /// Suggested file name from `Content-Disposition` or the `name` parameter.
    pub fn file_name(&self) -> Option<String> {
        self.headers
            .get("content-disposition")
            .and_then(|cd| header::content_type_param(cd, "filename"))
            .or_else(|| {
                self.content_type_header()
                    .and_then(|ct| header::content_type_param(ct, "name"))
            })
            .filter(|n| !n.trim().is_empty())
    }

    /// `true` for `text/html` parts.
    pub fn is_html(&self) -> bool {
        self.content_type == "text/html"
    }

    /// `true` for any `image/*` part.
    pub fn is_image(&self) -> bool {
        self.content_type.starts_with("image/")
    }

    /// `true` for nested containers (`multipart/*`), which are kept opaque.
    pub fn is_multipart(&self) -> bool {
        self.content_type.starts_with("multipart/")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headers(pairs: &[(&str, &str)]) -> Headers {
        let mut h = Headers::new();
        for (k, v) in pairs {
            h.push(k, *v);
        }
        h
    }

    #[test]
    fn test_headers_last_occurrence_wins() {
        let h = headers(&[("Content-Type", "text/plain"), ("content-type", "text/html")]);
        assert_eq!(h.get("CONTENT-TYPE"), Some("text/html"));
        assert_eq!(h.len(), 2);
    }

    #[test]
    fn test_transfer_encoding_parse() {
        assert_eq!(TransferEncoding::parse(Some(" Base64 ")), TransferEncoding::Base64);
        assert_eq!(
            TransferEncoding::parse(Some("quoted-printable")),
            TransferEncoding::QuotedPrintable
        );
        assert_eq!(TransferEncoding::parse(None), TransferEncoding::Absent);
        assert_eq!(
            TransferEncoding::parse(Some("x-uuencode")),
            TransferEncoding::Unknown("x-uuencode".into())
        );
    }

    #[test]
    fn test_part_derives_fields() {
        let h = headers(&[
            ("Content-Type", "image/PNG; name=\"logo.png\""),
            ("Content-ID", "<img1@example>"),
            ("Content-Location", "  http://example.com/logo.png "),
            ("Content-Transfer-Encoding", "base64"),
        ]);
        let part = MimePart::new(h, b"aGVsbG8=\r\n");
        assert_eq!(part.content_type, "image/png");
        assert_eq!(part.content_id.as_deref(), Some("img1@example"));
        assert_eq!(
            part.content_location.as_deref(),
            Some("http://example.com/logo.png")
        );
        assert_eq!(part.decoded_body.as_ref(), b"hello");
        assert_eq!(part.file_name().as_deref(), Some("logo.png"));
        assert!(part.is_image());
    }

    #[test]
    fn test_part_defaults_to_text_plain() {
        let part = MimePart::new(Headers::new(), b"body");
        assert_eq!(part.content_type, "text/plain");
        assert_eq!(part.transfer_encoding, TransferEncoding::Absent);
        assert!(matches!(part.decoded_body, Cow::Borrowed(_)));
    }
}
