//! Deterministic, collision-safe names for extracted resources.

use std::collections::HashSet;

use sha2::{Digest, Sha256};

use crate::model::part::MimePart;

/// Longest stem kept from an original name.
const MAX_STEM_LEN: usize = 60;

/// Hands out unique file names within one conversion run.
#[derive(Debug, Default)]
pub struct FileNamer {
    used: HashSet<String>,
}

impl FileNamer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Name for `part`, first referenced as `reference`.
    ///
    /// Format: `<stem>_<hash>.<ext>` where the hash is the first 8 hex digits
    /// of the SHA-256 of the decoded body. A numeric suffix is added when
    /// the name was already handed out.
    pub fn name_for(&mut self, part: &MimePart<'_>, reference: &str) -> String {
        let source = original_name(part, reference);
        let (stem, source_ext) = split_extension(&source);
        let stem = sanitize_filename_part(stem, MAX_STEM_LEN);
        let ext = extension_for(&part.content_type)
            .map(str::to_string)
            .or(source_ext)
            .unwrap_or_else(|| "bin".to_string());
        let hash = short_hash(&part.decoded_body);

        let mut name = format!("{stem}_{hash}.{ext}");
        let mut n = 2;
        while self.used.contains(&name) {
            name = format!("{stem}_{hash}_{n}.{ext}");
            n += 1;
        }
        self.used.insert(name.clone());
        name
    }
}

/// Best available original name: the part's declared file name, the last
/// path segment of its location, its Content-ID, or the reference itself.
fn original_name(part: &MimePart<'_>, reference: &str) -> String {
    part.file_name()
        .or_else(|| part.content_location.as_deref().and_then(last_segment))
        .or_else(|| part.content_id.clone())
        .or_else(|| last_segment(reference))
        .unwrap_or_default()
}

/// Last path segment of a URL, without query or fragment.
fn last_segment(url: &str) -> Option<String> {
    let url = url.split(['?', '#']).next().unwrap_or(url);
    let url = url
        .strip_prefix("cid:")
        .or_else(|| url.strip_prefix("CID:"))
        .unwrap_or(url);
    let segment = url.trim_end_matches('/').rsplit('/').next()?;
    let decoded = percent_encoding::percent_decode_str(segment).decode_utf8_lossy();
    let decoded = decoded.trim();
    (!decoded.is_empty() && !decoded.contains(':')).then(|| decoded.to_string())
}

/// Split `name.ext` into stem and a plausible lowercase extension.
fn split_extension(name: &str) -> (&str, Option<String>) {
    match name.rsplit_once('.') {
        Some((stem, ext))
            if !stem.is_empty()
                && (1..=5).contains(&ext.len())
                && ext.chars().all(|c| c.is_ascii_alphanumeric()) =>
        {
            (stem, Some(ext.to_ascii_lowercase()))
        }
        _ => (name, None),
    }
}

/// Conventional extension of a MIME type, for the common image types.
pub fn extension_for(content_type: &str) -> Option<&'static str> {
    match content_type {
        "image/jpeg" | "image/jpg" | "image/pjpeg" => Some("jpg"),
        "image/png" => Some("png"),
        "image/gif" => Some("gif"),
        "image/webp" => Some("webp"),
        "image/bmp" => Some("bmp"),
        "image/x-icon" | "image/vnd.microsoft.icon" => Some("ico"),
        "image/svg+xml" => Some("svg"),
        "image/avif" => Some("avif"),
        "text/css" => Some("css"),
        "text/javascript" | "application/javascript" => Some("js"),
        "text/html" => Some("html"),
        _ => None,
    }
}

/// Sanitize a string for use as part of a filename.
///
/// Replaces any character that isn't alphanumeric, `-`, `.`, or `_` with
/// `_` and limits the result to `max_len` characters.
pub fn sanitize_filename_part(s: &str, max_len: usize) -> String {
    let sanitized: String = s
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || c == '-' || c == '.' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .take(max_len)
        .collect();
    let sanitized = sanitized.trim_matches('.');

    if sanitized.is_empty() {
        "resource".to_string()
    } else {
        sanitized.to_string()
    }
}

fn short_hash(data: &[u8]) -> String {
    let digest = Sha256::digest(data);
    digest[..4].iter().map(|b| format!("{b:02x}")).collect()
}
