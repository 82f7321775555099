//! Splitting of oversized HTML into self-contained chunks.
//!
//! The document shell (everything up to and including `<body ...>`, or
//! `</head>` when there is no body, and everything from `</body>` on) is
//! repeated around each chunk; only the
//! body content is partitioned, at checkpoints found by the structural
//! scanner. The byte budget is soft: a chunk grows past it until the next
//! checkpoint rather than cutting through an element.

pub mod scanner;

use std::ops::Range;

use tracing::{debug, info, warn};

use crate::html::{TokenKind, Tokenizer};
use crate::model::output::{ConversionWarning, HtmlChunk};

/// Shell used when the document has no `<body>` and for raw splits.
const SYNTHETIC_HEAD: &str =
    "<!DOCTYPE html>\n<html>\n<head><meta charset=\"utf-8\"></head>\n<body>\n";
const SYNTHETIC_TAIL: &str = "\n</body>\n</html>\n";

/// Chunks in document order, plus a warning when a raw split was needed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SplitOutcome {
    pub chunks: Vec<HtmlChunk>,
    pub warning: Option<ConversionWarning>,
}

/// Split `html` into chunks of roughly `max_bytes` each.
///
/// `None`, or a document that already fits, yields a single chunk holding
/// the document unchanged.
pub fn split(html: &str, max_bytes: Option<usize>) -> SplitOutcome {
    let max_bytes = match max_bytes {
        Some(max) if html.len() > max => max,
        _ => return single(html),
    };

    let shell = Shell::locate(html);
    let content = &html[shell.content.clone()];
    let budget = content_budget(max_bytes, shell.head.len() + shell.tail.len());
    debug!(
        max_bytes,
        budget,
        content = content.len(),
        synthetic = shell.synthetic,
        "Splitting HTML"
    );

    if content.len() <= budget {
        return single(html);
    }

    let points = scanner::checkpoints(content);
    if points.is_empty() {
        return raw_split(content, shell.content.start, max_bytes);
    }

    let mut chunks = Vec::new();
    let mut start = 0;
    while start < content.len() {
        let end = next_cut(&points, start, budget, content.len());
        let mut text = String::with_capacity(shell.head.len() + (end - start) + shell.tail.len());
        text.push_str(shell.head);
        text.push_str(&content[start..end]);
        text.push_str(shell.tail);

        let offset = shell.content.start;
        chunks.push(HtmlChunk::new(
            chunks.len() + 1,
            text,
            offset + start..offset + end,
        ));
        start = end;
    }

    info!(chunks = chunks.len(), max_bytes, "Split HTML into chunks");
    SplitOutcome {
        chunks,
        warning: None,
    }
}

fn single(html: &str) -> SplitOutcome {
    SplitOutcome {
        chunks: vec![HtmlChunk::new(1, html.to_string(), 0..html.len())],
        warning: None,
    }
}

/// Bytes of body content allowed per chunk once the shell is accounted for.
fn content_budget(max_bytes: usize, shell_len: usize) -> usize {
    if shell_len > max_bytes / 2 {
        (max_bytes / 2).max(1)
    } else {
        max_bytes - shell_len
    }
}

/// End of the chunk starting at `start`: the last checkpoint within the
/// budget, else the first one past it, else the end of the content.
fn next_cut(points: &[usize], start: usize, budget: usize, len: usize) -> usize {
    let limit = start.saturating_add(budget);
    if limit >= len {
        return len;
    }
    let first_after_start = points.partition_point(|&p| p <= start);
    let first_past_limit = points.partition_point(|&p| p <= limit);

    if first_past_limit > first_after_start {
        points[first_past_limit - 1]
    } else {
        points.get(first_past_limit).copied().unwrap_or(len)
    }
}

/// The document split into head, body content and tail.
struct Shell<'h> {
    head: &'h str,
    tail: &'h str,
    content: Range<usize>,
    synthetic: bool,
}

impl<'h> Shell<'h> {
    fn locate(html: &'h str) -> Self {
        let mut body_open: Option<usize> = None;
        let mut body_close: Option<usize> = None;
        let mut head_close: Option<usize> = None;
        let mut html_close: Option<usize> = None;

        for token in Tokenizer::new(html) {
            match &token.kind {
                TokenKind::StartTag(tag) if tag.name == "body" && body_open.is_none() => {
                    body_open = Some(token.span.end);
                }
                TokenKind::EndTag(name) if name == "body" => body_close = Some(token.span.start),
                TokenKind::EndTag(name) if name == "head" && head_close.is_none() => {
                    head_close = Some(token.span.end);
                }
                TokenKind::EndTag(name) if name == "html" => html_close = Some(token.span.start),
                _ => {}
            }
        }

        // Without `<body>`, the content starts after `</head>`
        let content_start = body_open.or(head_close);
        match content_start {
            Some(start) => {
                let close = if body_open.is_some() {
                    body_close.or(html_close)
                } else {
                    html_close
                };
                let end = close.filter(|&end| end >= start).unwrap_or(html.len());
                Self {
                    head: &html[..start],
                    tail: &html[end..],
                    content: start..end,
                    synthetic: false,
                }
            }
            None => Self {
                head: SYNTHETIC_HEAD,
                tail: SYNTHETIC_TAIL,
                content: 0..html.len(),
                synthetic: true,
            },
        }
    }
}

/// Cut `content` on size alone, preferring to cut after a `>` or
/// whitespace, and wrap every piece in the synthetic shell.
fn raw_split(content: &str, offset: usize, max_bytes: usize) -> SplitOutcome {
    let budget = content_budget(max_bytes, SYNTHETIC_HEAD.len() + SYNTHETIC_TAIL.len());
    let bytes = content.as_bytes();
    let mut chunks = Vec::new();
    let mut broken = 0;
    let mut start = 0;

    while start < content.len() {
        let mut end = (start + budget).min(content.len());
        if end < content.len() {
            let floor = start + budget / 2;
            if let Some(p) = bytes[floor..end]
                .iter()
                .rposition(|&b| b == b'>' || b.is_ascii_whitespace())
            {
                end = floor + p + 1;
            }
            while !content.is_char_boundary(end) {
                end -= 1;
            }
            if end <= start {
                end = start + 1;
                while !content.is_char_boundary(end) {
                    end += 1;
                }
            }
        }

        let piece = &content[start..end];
        if cuts_inside_tag(piece) {
            broken += 1;
        }
        let mut text = String::with_capacity(SYNTHETIC_HEAD.len() + piece.len() + SYNTHETIC_TAIL.len());
        text.push_str(SYNTHETIC_HEAD);
        text.push_str(piece);
        text.push_str(SYNTHETIC_TAIL);
        chunks.push(HtmlChunk::new(
            chunks.len() + 1,
            text,
            offset + start..offset + end,
        ));
        start = end;
    }

    warn!(
        chunks = chunks.len(),
        broken_chunks = broken,
        "No safe split points found, split on size"
    );
    SplitOutcome {
        warning: Some(ConversionWarning::SplitFallback {
            chunks: chunks.len(),
            broken_chunks: broken,
        }),
        chunks,
    }
}

/// `true` when `piece` ends inside a tag, i.e. its last `<` has no `>`.
fn cuts_inside_tag(piece: &str) -> bool {
    match (piece.rfind('<'), piece.rfind('>')) {
        (Some(open), Some(close)) => open > close,
        (Some(_), None) => true,
        _ => false,
    }
}
