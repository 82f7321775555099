//! Structural scan of body content for safe cut points.
//!
//! Tracks an open-element stack over the token stream and records a
//! checkpoint wherever the stack is empty at a block boundary. Cutting at a
//! checkpoint never leaves an element open on either side.

use crate::html::elements::{implicitly_closes, is_block, is_void};
use crate::html::{TokenKind, Tokenizer};

/// Ascending byte offsets into `content` at which it may be cut.
///
/// Offsets are strictly between `0` and `content.len()`.
pub fn checkpoints(content: &str) -> Vec<usize> {
    let mut stack: Vec<String> = Vec::new();
    let mut points: Vec<usize> = Vec::new();

    for token in Tokenizer::new(content) {
        match token.kind {
            TokenKind::StartTag(tag) => {
                let was_open = !stack.is_empty();
                while stack.last().is_some_and(|top| implicitly_closes(top, &tag.name)) {
                    stack.pop();
                }
                if was_open && stack.is_empty() {
                    points.push(token.span.start);
                }

                if is_void(&tag.name) || tag.self_closing {
                    if stack.is_empty() && is_block(&tag.name) {
                        points.push(token.span.end);
                    }
                } else {
                    stack.push(tag.name);
                }
            }
            TokenKind::EndTag(name) => {
                if let Some(pos) = stack.iter().rposition(|open| *open == name) {
                    stack.truncate(pos);
                    if stack.is_empty() && is_block(&name) {
                        points.push(token.span.end);
                    }
                }
            }
            TokenKind::Text if stack.is_empty() => {
                let text = &content[token.span.clone()];
                points.extend(
                    text.match_indices('\n')
                        .map(|(i, _)| token.span.start + i + 1),
                );
            }
            _ => {}
        }
    }

    points.retain(|&p| p > 0 && p < content.len());
    points.dedup();
    points
}
