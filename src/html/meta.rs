//! Rewriting of the document's character set declaration.
//!
//! Decoded documents are written out as UTF-8, so whatever charset the
//! archived page declared has to be replaced.

use std::ops::Range;

use super::{Tag, TokenKind, Tokenizer};

const UTF8_META: &str = "<meta charset=\"utf-8\">";
const UTF8_LABEL: &str = "utf-8";

/// Make `html` declare UTF-8.
///
/// Every `<meta charset>` value, and the `charset=` label inside a
/// `<meta http-equiv="Content-Type">` content value, is replaced up to the
/// `<body>` start tag. A document without either declaration gets a
/// `<meta charset="utf-8">` after its `<head>` (or `<html>`) start tag, or
/// after a leading doctype.
pub fn declare_utf8(html: &str) -> String {
    let mut labels: Vec<Range<usize>> = Vec::new();
    let mut insert_at: Option<usize> = None;

    for token in Tokenizer::new(html) {
        match &token.kind {
            TokenKind::StartTag(tag) => match tag.name.as_str() {
                "body" => break,
                "head" => insert_at = Some(token.span.end),
                "html" if insert_at.is_none() => insert_at = Some(token.span.end),
                "meta" => labels.extend(charset_label(tag)),
                _ => {}
            },
            TokenKind::EndTag(name) if name == "head" => break,
            _ => {}
        }
    }

    if labels.is_empty() {
        let at = insert_at.unwrap_or_else(|| prologue_end(html));
        let mut out = String::with_capacity(html.len() + UTF8_META.len());
        out.push_str(&html[..at]);
        out.push_str(UTF8_META);
        out.push_str(&html[at..]);
        return out;
    }

    let mut out = String::with_capacity(html.len());
    let mut last = 0;
    for label in labels {
        out.push_str(&html[last..label.start]);
        out.push_str(UTF8_LABEL);
        last = label.end;
    }
    out.push_str(&html[last..]);
    out
}

/// Source range of the charset label declared by a `<meta>` tag.
fn charset_label(tag: &Tag<'_>) -> Option<Range<usize>> {
    if let Some(span) = tag.attribute("charset").and_then(|a| a.value_span.clone()) {
        return (!span.is_empty()).then_some(span);
    }

    let is_content_type = tag
        .attribute("http-equiv")
        .and_then(|a| a.value)
        .is_some_and(|v| v.trim().eq_ignore_ascii_case("content-type"));
    if !is_content_type {
        return None;
    }

    let content = tag.attribute("content")?;
    let (value, span) = (content.value?, content.value_span.clone()?);
    let at = value.to_ascii_lowercase().find("charset")? + "charset".len();

    let rest = &value[at..];
    let after_name = rest.trim_start();
    let after_eq = after_name.strip_prefix('=')?;
    let label = after_eq.trim_start();
    let start = value.len() - label.len();
    let len = label
        .find(|c: char| matches!(c, ';' | '"' | '\'') || c.is_whitespace())
        .unwrap_or(label.len());

    (len > 0).then(|| span.start + start..span.start + start + len)
}

/// End of a leading doctype, or `0`.
fn prologue_end(html: &str) -> usize {
    for token in Tokenizer::new(html) {
        match token.kind {
            TokenKind::Text if html[token.span.clone()].trim().is_empty() => continue,
            TokenKind::Declaration => return token.span.end,
            _ => return 0,
        }
    }
    0
}
