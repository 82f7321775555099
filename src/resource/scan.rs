//! Discovery of resource references in HTML text.

use std::ops::Range;

use crate::html::{TokenKind, Tokenizer};

/// Attributes whose whole value is a single URL.
const URL_ATTRIBUTES: &[&str] = &["src", "href", "background", "poster", "data", "lowsrc"];

/// Elements whose `href` loads a resource rather than navigating.
const LOADING_HREF_ELEMENTS: &[&str] = &["link", "image", "use"];

/// A candidate resource reference found in the HTML.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reference {
    /// Byte range of the reference text as written, so it may still
    /// contain character references such as `&amp;`.
    pub span: Range<usize>,
    /// `false` for navigation links (`<a href>`), whose target is not
    /// expected inside the archive.
    pub loads_resource: bool,
}

/// Every candidate resource reference in `html`, in document order and
/// non-overlapping.
pub fn find_references(html: &str) -> Vec<Reference> {
    let mut refs = Vec::new();

    for token in Tokenizer::new(html) {
        match token.kind {
            TokenKind::StartTag(tag) => {
                let href_loads = LOADING_HREF_ELEMENTS.contains(&tag.name.as_str());
                for attr in &tag.attributes {
                    let Some(span) = attr.value_span.clone() else {
                        continue;
                    };
                    let name = attr.name.to_ascii_lowercase();
                    if URL_ATTRIBUTES.contains(&name.as_str()) {
                        let loads = name != "href" || href_loads;
                        push_url(html, span, loads, &mut refs);
                    } else if name == "srcset" {
                        srcset_urls(html, span, &mut refs);
                    } else if name == "style" {
                        css_urls(html, span, &mut refs);
                    }
                }
            }
            TokenKind::RawText(element) if element == "style" => {
                css_urls(html, token.span, &mut refs);
            }
            _ => {}
        }
    }

    refs
}

/// `true` for references that never name an archived resource.
pub fn is_ignored(reference: &str) -> bool {
    let lower = reference.trim_start().to_ascii_lowercase();
    lower.is_empty()
        || lower.starts_with('#')
        || ["data:", "javascript:", "about:", "mailto:", "tel:"]
            .iter()
            .any(|scheme| lower.starts_with(scheme))
}

/// Push the trimmed `span` unless it is empty or ignorable.
fn push_url(html: &str, span: Range<usize>, loads_resource: bool, refs: &mut Vec<Reference>) {
    let span = trim_span(html, span);
    if !span.is_empty() && !is_ignored(&html[span.clone()]) {
        refs.push(Reference {
            span,
            loads_resource,
        });
    }
}

fn trim_span(html: &str, span: Range<usize>) -> Range<usize> {
    let text = &html[span.clone()];
    let start = span.start + (text.len() - text.trim_start().len());
    let end = span.end - (text.len() - text.trim_end().len());
    start..end.max(start)
}

/// Candidate URLs of a `srcset` value: `url [descriptor], url [descriptor]`.
fn srcset_urls(html: &str, span: Range<usize>, refs: &mut Vec<Reference>) {
    let bytes = html.as_bytes();
    let mut i = span.start;

    while i < span.end {
        while i < span.end && (bytes[i].is_ascii_whitespace() || bytes[i] == b',') {
            i += 1;
        }
        let url_start = i;
        while i < span.end && !bytes[i].is_ascii_whitespace() {
            i += 1;
        }
        let mut url_end = i;
        let had_comma = url_end > url_start && bytes[url_end - 1] == b',';
        while url_end > url_start && bytes[url_end - 1] == b',' {
            url_end -= 1;
        }
        if url_end > url_start {
            push_url(html, url_start..url_end, true, refs);
        }
        if had_comma {
            continue;
        }

        // Descriptors run to the next comma outside parentheses
        let mut depth = 0usize;
        while i < span.end {
            match bytes[i] {
                b'(' => depth += 1,
                b')' => depth = depth.saturating_sub(1),
                b',' if depth == 0 => break,
                _ => {}
            }
            i += 1;
        }
    }
}

/// `url(...)` and `@import "..."` references inside CSS text.
///
/// Quotes may be written as `&quot;`, which is how browsers serialize
/// quoted URLs inside `style` attributes.
fn css_urls(html: &str, span: Range<usize>, refs: &mut Vec<Reference>) {
    let lower = html[span.clone()].to_ascii_lowercase();
    let base = span.start;
    let mut from = 0;

    loop {
        let url_at = lower[from..].find("url(").map(|p| from + p);
        let import_at = lower[from..].find("@import").map(|p| from + p);
        let (at, is_import) = match (url_at, import_at) {
            (Some(u), Some(m)) if m < u => (m, true),
            (Some(u), _) => (u, false),
            (None, Some(m)) => (m, true),
            (None, None) => break,
        };

        let open = if is_import { at + "@import".len() } else { at + "url(".len() };
        let rest = &lower[open..];
        let skipped = rest.len() - rest.trim_start().len();
        let start = open + skipped;
        let rest = &lower[start..];

        let quote = ["\"", "'", "&quot;", "&#39;"]
            .into_iter()
            .find(|q| rest.starts_with(q));

        let found = match quote {
            Some(q) => lower[start + q.len()..]
                .find(q)
                .map(|p| (start + q.len(), start + q.len() + p, start + q.len() + p + q.len())),
            // `@import url(...)` is picked up as a `url(` on the next pass
            None if is_import => None,
            None => lower[start..].find(')').map(|p| (start, start + p, start + p + 1)),
        };

        match found {
            Some((value_start, value_end, next)) => {
                push_url(html, base + value_start..base + value_end, true, refs);
                from = next;
            }
            None => from = open,
        }
    }
}
