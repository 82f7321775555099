//! The parsed MHTML container.

use super::part::{Headers, MimePart};

/// A parsed MHTML archive: the top-level headers, the multipart boundary
/// and every part in stream order.
///
/// Read-only after construction. The root document is the first
/// `text/html` part; later HTML parts (frames) are ordinary resources.
#[derive(Debug, Clone)]
pub struct MhtmlDocument<'a> {
    /// Top-level headers (before the first boundary).
    pub headers: Headers,
    /// The multipart boundary token, without the leading `--`.
    pub boundary: String,
    /// Parts in appearance order.
    pub parts: Vec<MimePart<'a>>,
    /// Position of the root HTML part within `parts`.
    root: usize,
}

impl<'a> MhtmlDocument<'a> {
    /// Assemble a document, selecting the root HTML part.
    ///
    /// Returns `None` when no part is `text/html`.
    pub fn new(headers: Headers, boundary: String, parts: Vec<MimePart<'a>>) -> Option<Self> {
        let root = parts.iter().position(MimePart::is_html)?;
        Some(Self {
            headers,
            boundary,
            parts,
            root,
        })
    }

    /// The designated root HTML part.
    pub fn root(&self) -> &MimePart<'a> {
        &self.parts[self.root]
    }

    /// Position of the root part within [`parts`](Self::parts).
    pub fn root_index(&self) -> usize {
        self.root
    }

    /// Every part except the root, with its position in the stream.
    pub fn resources(&self) -> impl Iterator<Item = (usize, &MimePart<'a>)> {
        let root = self.root;
        self.parts
            .iter()
            .enumerate()
            .filter(move |(i, _)| *i != root)
    }

    /// Decoded `Subject` header (the page title as saved by the browser).
    pub fn subject(&self) -> Option<String> {
        self.headers
            .get("subject")
            .map(crate::parser::header::decode_encoded_words)
            .filter(|s| !s.is_empty())
    }

    /// URL the page was captured from (`Snapshot-Content-Location`, falling
    /// back to the root part's `Content-Location`).
    pub fn source_url(&self) -> Option<&str> {
        self.headers
            .get("snapshot-content-location")
            .map(str::trim)
            .or_else(|| self.root().content_location.as_deref())
    }

    /// Raw `Date` header of the capture.
    pub fn date(&self) -> Option<&str> {
        self.headers.get("date").map(str::trim)
    }
}
