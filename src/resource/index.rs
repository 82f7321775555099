//! Lookup table from reference keys to resource parts.

use std::collections::HashMap;

use percent_encoding::percent_decode_str;
use tracing::debug;

use crate::model::part::MimePart;
use crate::parser::header::strip_angle_brackets;

/// Resource parts keyed by `Content-Location` and `Content-ID`.
///
/// Built once per conversion and read-only afterwards. When two parts
/// share a key the later one wins.
#[derive(Debug, Default)]
pub struct ResourceIndex<'d> {
    parts: HashMap<usize, &'d MimePart<'d>>,
    by_location: HashMap<String, usize>,
    by_id: HashMap<String, usize>,
}

/// A reference resolved to a resource part.
#[derive(Debug, Clone, Copy)]
pub struct Resolved<'d> {
    /// Position of the part within the document.
    pub index: usize,
    pub part: &'d MimePart<'d>,
}

impl<'d> ResourceIndex<'d> {
    /// Index the given `(position, part)` pairs.
    pub fn build<'a: 'd, I>(resources: I) -> Self
    where
        I: IntoIterator<Item = (usize, &'d MimePart<'a>)>,
    {
        let mut index = Self::default();
        for (i, part) in resources {
            if let Some(location) = &part.content_location {
                index.by_location.insert(location.clone(), i);
            }
            if let Some(id) = &part.content_id {
                index.by_id.insert(id.clone(), i);
            }
            index.parts.insert(i, part);
        }
        debug!(
            resources = index.parts.len(),
            locations = index.by_location.len(),
            ids = index.by_id.len(),
            "Built resource index"
        );
        index
    }

    /// Resolve a reference as written in the HTML (already entity-unescaped).
    ///
    /// `cid:` references match `Content-ID` after percent-decoding and
    /// stripping `<`/`>`, then fall back to an exact `Content-Location`
    /// match. Everything else matches `Content-Location` exactly after
    /// trimming.
    pub fn resolve(&self, reference: &str) -> Option<Resolved<'d>> {
        let reference = reference.trim();
        if reference.is_empty() {
            return None;
        }

        let found = match cid_value(reference) {
            Some(id) => self
                .by_id
                .get(&id)
                .or_else(|| self.by_location.get(reference)),
            None => self.by_location.get(reference),
        }?;

        self.parts.get(found).map(|&part| Resolved {
            index: *found,
            part,
        })
    }

    pub fn len(&self) -> usize {
        self.parts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parts.is_empty()
    }
}

/// The identifier of a `cid:` URI, or `None` for other references.
pub fn cid_value(reference: &str) -> Option<String> {
    let scheme = reference.get(..4)?;
    if !scheme.eq_ignore_ascii_case("cid:") {
        return None;
    }
    let id = percent_decode_str(&reference[4..]).decode_utf8_lossy();
    Some(strip_angle_brackets(&id))
}

/// `true` when `reference` uses the `cid:` scheme.
pub fn is_cid(reference: &str) -> bool {
    reference
        .trim()
        .get(..4)
        .is_some_and(|s| s.eq_ignore_ascii_case("cid:"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::part::Headers;

    fn part(pairs: &[(&str, &str)]) -> MimePart<'static> {
        let mut h = Headers::new();
        for (k, v) in pairs {
            h.push(k, *v);
        }
        MimePart::new(h, b"data")
    }

    #[test]
    fn test_resolve_by_location_and_id() {
        let parts = [
            part(&[
                ("Content-Type", "image/png"),
                ("Content-Location", "https://example.com/a.png"),
            ]),
            part(&[("Content-Type", "image/gif"), ("Content-ID", "<img-1@mhtml>")]),
        ];
        let index = ResourceIndex::build(parts.iter().enumerate());
        assert_eq!(index.len(), 2);

        let hit = index.resolve(" https://example.com/a.png ").unwrap();
        assert_eq!(hit.index, 0);
        assert_eq!(index.resolve("cid:img-1@mhtml").unwrap().index, 1);
        assert_eq!(index.resolve("CID:<img-1@mhtml>").unwrap().index, 1);
        assert!(index.resolve("https://example.com/b.png").is_none());
        assert!(index.resolve("cid:other").is_none());
    }

    #[test]
    fn test_cid_is_percent_decoded() {
        let parts = [part(&[("Content-ID", "<a b@x>")])];
        let index = ResourceIndex::build(parts.iter().enumerate());
        assert!(index.resolve("cid:a%20b@x").is_some());
    }

    #[test]
    fn test_cid_reference_falls_back_to_location() {
        let parts = [part(&[("Content-Location", "cid:frame-1@mhtml.blink")])];
        let index = ResourceIndex::build(parts.iter().enumerate());
        assert!(index.resolve("cid:frame-1@mhtml.blink").is_some());
    }

    #[test]
    fn test_later_part_wins_duplicate_key() {
        let parts = [
            part(&[("Content-Location", "x.css")]),
            part(&[("Content-Location", "x.css")]),
        ];
        let index = ResourceIndex::build(parts.iter().enumerate());
        assert_eq!(index.resolve("x.css").unwrap().index, 1);
    }

    #[test]
    fn test_is_cid() {
        assert!(is_cid(" cid:abc"));
        assert!(!is_cid("https://x/cid:abc"));
        assert_eq!(cid_value("cid:<abc>").as_deref(), Some("abc"));
        assert_eq!(cid_value("http://x"), None);
    }
}
