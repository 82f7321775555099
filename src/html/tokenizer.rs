//! Forgiving, allocation-light HTML tokenizer.
//!
//! Produces a flat token stream with byte spans into the source text. No
//! tree is built and nothing is normalized: callers reproduce the document
//! by copying spans. Every byte of the input belongs to exactly one token.

use std::ops::Range;

use super::elements::is_raw_text;

/// One lexical unit of an HTML document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token<'a> {
    pub kind: TokenKind<'a>,
    /// Byte range of the whole token in the source.
    pub span: Range<usize>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenKind<'a> {
    StartTag(Tag<'a>),
    /// End tag with its lowercase element name.
    EndTag(String),
    Text,
    Comment,
    /// `<!DOCTYPE ...>`, `<?...>`, `<![CDATA[...]]>` and other bogus markup.
    Declaration,
    /// Content of a raw-text element (`script`, `style`, ...).
    RawText(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tag<'a> {
    /// Lowercase element name.
    pub name: String,
    pub attributes: Vec<Attribute<'a>>,
    pub self_closing: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute<'a> {
    /// Attribute name as written.
    pub name: &'a str,
    /// Unquoted value text, still HTML-escaped.
    pub value: Option<&'a str>,
    /// Source range of `value` (without quotes).
    pub value_span: Option<Range<usize>>,
}

impl Tag<'_> {
    /// Look up an attribute by case-insensitive name.
    pub fn attribute(&self, name: &str) -> Option<&Attribute<'_>> {
        self.attributes
            .iter()
            .find(|a| a.name.eq_ignore_ascii_case(name))
    }
}

/// Iterator over the tokens of `html`.
pub struct Tokenizer<'a> {
    html: &'a str,
    bytes: &'a [u8],
    pos: usize,
    /// Set after the start tag of a raw-text element.
    raw_text_of: Option<String>,
}

impl<'a> Tokenizer<'a> {
    pub fn new(html: &'a str) -> Self {
        Self {
            html,
            bytes: html.as_bytes(),
            pos: 0,
            raw_text_of: None,
        }
    }

    fn emit(&mut self, kind: TokenKind<'a>, end: usize) -> Token<'a> {
        let span = self.pos..end;
        self.pos = end;
        Token { kind, span }
    }

    fn raw_text(&mut self, element: String) -> Option<Token<'a>> {
        let end = find_end_tag(self.bytes, self.pos, &element).unwrap_or(self.bytes.len());
        if end == self.pos {
            return None;
        }
        Some(self.emit(TokenKind::RawText(element), end))
    }

    fn text(&mut self) -> Token<'a> {
        let end = self.bytes[self.pos + 1..]
            .iter()
            .position(|&b| b == b'<')
            .map_or(self.bytes.len(), |p| self.pos + 1 + p);
        self.emit(TokenKind::Text, end)
    }

    fn markup(&mut self) -> Token<'a> {
        let rest = &self.bytes[self.pos..];
        if rest.starts_with(b"<!--") {
            let end = find(self.bytes, self.pos + 4, b"-->").map_or(self.bytes.len(), |p| p + 3);
            return self.emit(TokenKind::Comment, end);
        }
        if rest.starts_with(b"<!") || rest.starts_with(b"<?") {
            let end = find(self.bytes, self.pos + 2, b">").map_or(self.bytes.len(), |p| p + 1);
            return self.emit(TokenKind::Declaration, end);
        }
        if rest.starts_with(b"</") {
            if rest.get(2).is_some_and(u8::is_ascii_alphabetic) {
                let name_start = self.pos + 2;
                let name_end = scan_name(self.bytes, name_start);
                let name = self.html[name_start..name_end].to_ascii_lowercase();
                let end = find(self.bytes, name_end, b">").map_or(self.bytes.len(), |p| p + 1);
                return self.emit(TokenKind::EndTag(name), end);
            }
            let end = find(self.bytes, self.pos + 2, b">").map_or(self.bytes.len(), |p| p + 1);
            return self.emit(TokenKind::Declaration, end);
        }
        if rest.get(1).is_some_and(u8::is_ascii_alphabetic) {
            if let Some((tag, end)) = self.start_tag() {
                if is_raw_text(&tag.name) && !tag.self_closing {
                    self.raw_text_of = Some(tag.name.clone());
                }
                return self.emit(TokenKind::StartTag(tag), end);
            }
            // Unterminated tag at end of input
            return self.emit(TokenKind::Text, self.bytes.len());
        }
        self.text()
    }

    /// Parse the start tag at `self.pos`. Returns the tag and the offset
    /// just past its `>`, or `None` when the input ends inside the tag.
    fn start_tag(&self) -> Option<(Tag<'a>, usize)> {
        let html = self.html;
        let bytes = self.bytes;
        let name_start = self.pos + 1;
        let mut i = scan_name(bytes, name_start);
        let name = html[name_start..i].to_ascii_lowercase();
        let mut attributes = Vec::new();
        let mut self_closing = false;

        loop {
            while i < bytes.len() && bytes[i].is_ascii_whitespace() {
                i += 1;
            }
            match bytes.get(i)? {
                b'>' => break,
                b'/' => {
                    i += 1;
                    self_closing = bytes.get(i) == Some(&b'>');
                    continue;
                }
                _ => {}
            }
            self_closing = false;

            let attr_start = i;
            i += 1;
            while i < bytes.len()
                && !bytes[i].is_ascii_whitespace()
                && !matches!(bytes[i], b'=' | b'>' | b'/')
            {
                i += 1;
            }
            let attr_name = &html[attr_start..i];

            let mut j = i;
            while j < bytes.len() && bytes[j].is_ascii_whitespace() {
                j += 1;
            }
            if bytes.get(j) != Some(&b'=') {
                attributes.push(Attribute {
                    name: attr_name,
                    value: None,
                    value_span: None,
                });
                continue;
            }
            j += 1;
            while j < bytes.len() && bytes[j].is_ascii_whitespace() {
                j += 1;
            }

            let value_span = match bytes.get(j)? {
                &quote @ (b'"' | b'\'') => {
                    let close = find(bytes, j + 1, &[quote])?;
                    i = close + 1;
                    j + 1..close
                }
                _ => {
                    let mut k = j;
                    while k < bytes.len() && !bytes[k].is_ascii_whitespace() && bytes[k] != b'>' {
                        k += 1;
                    }
                    i = k;
                    j..k
                }
            };
            attributes.push(Attribute {
                name: attr_name,
                value: Some(&html[value_span.clone()]),
                value_span: Some(value_span),
            });
        }

        Some((
            Tag {
                name,
                attributes,
                self_closing,
            },
            i + 1,
        ))
    }
}

impl<'a> Iterator for Tokenizer<'a> {
    type Item = Token<'a>;

    fn next(&mut self) -> Option<Token<'a>> {
        if let Some(element) = self.raw_text_of.take() {
            if let Some(token) = self.raw_text(element) {
                return Some(token);
            }
        }
        if self.pos >= self.bytes.len() {
            return None;
        }
        if self.bytes[self.pos] == b'<' {
            Some(self.markup())
        } else {
            Some(self.text())
        }
    }
}

/// End of an element or attribute name starting at `start`.
fn scan_name(bytes: &[u8], start: usize) -> usize {
    let mut i = start;
    while i < bytes.len() && !bytes[i].is_ascii_whitespace() && !matches!(bytes[i], b'/' | b'>') {
        i += 1;
    }
    i
}

fn find(bytes: &[u8], from: usize, needle: &[u8]) -> Option<usize> {
    if from >= bytes.len() {
        return None;
    }
    bytes[from..]
        .windows(needle.len())
        .position(|w| w == needle)
        .map(|p| from + p)
}

/// Offset of the `</element` that terminates raw text starting at `from`.
fn find_end_tag(bytes: &[u8], from: usize, element: &str) -> Option<usize> {
    let name = element.as_bytes();
    let mut i = from;
    while let Some(p) = find(bytes, i, b"</") {
        let after = p + 2;
        let candidate = bytes.get(after..after + name.len());
        if candidate.is_some_and(|c| c.eq_ignore_ascii_case(name)) {
            let next = bytes.get(after + name.len());
            if next.is_none_or(|&b| b.is_ascii_whitespace() || b == b'/' || b == b'>') {
                return Some(p);
            }
        }
        i = after;
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(html: &str) -> Vec<TokenKind<'_>> {
        Tokenizer::new(html).map(|t| t.kind).collect()
    }

    #[test]
    fn test_spans_cover_input() {
        let html = "<!DOCTYPE html><p class=a>x &amp; y</p><!-- c --><br/>tail";
        let mut end = 0;
        for token in Tokenizer::new(html) {
            assert_eq!(token.span.start, end);
            end = token.span.end;
        }
        assert_eq!(end, html.len());
    }

    #[test]
    fn test_attributes() {
        let html = r#"<IMG Src="a.png" alt='x > y' width=10 hidden>"#;
        let token = Tokenizer::new(html).next().unwrap();
        let TokenKind::StartTag(tag) = token.kind else {
            panic!("expected start tag");
        };
        assert_eq!(tag.name, "img");
        assert_eq!(tag.attributes.len(), 4);
        let src = tag.attribute("src").unwrap();
        assert_eq!(src.value, Some("a.png"));
        assert_eq!(&html[src.value_span.clone().unwrap()], "a.png");
        assert_eq!(tag.attribute("alt").unwrap().value, Some("x > y"));
        assert_eq!(tag.attribute("width").unwrap().value, Some("10"));
        assert_eq!(tag.attribute("hidden").unwrap().value, None);
        assert_eq!(token.span, 0..html.len());
    }

    #[test]
    fn test_self_closing() {
        let tokens = kinds("<br/><img src=x />");
        assert!(matches!(&tokens[0], TokenKind::StartTag(t) if t.self_closing));
        assert!(matches!(&tokens[1], TokenKind::StartTag(t) if t.self_closing));
    }

    #[test]
    fn test_raw_text_is_opaque() {
        let tokens = kinds("<script>if (a < b) { x = '</div>'; }</SCRIPT><p>");
        assert!(matches!(&tokens[0], TokenKind::StartTag(t) if t.name == "script"));
        assert_eq!(tokens[1], TokenKind::RawText("script".into()));
        assert_eq!(tokens[2], TokenKind::EndTag("script".into()));
        assert!(matches!(&tokens[3], TokenKind::StartTag(t) if t.name == "p"));
    }

    #[test]
    fn test_empty_raw_text() {
        let tokens = kinds("<style></style>");
        assert_eq!(tokens.len(), 2);
    }

    #[test]
    fn test_stray_angle_bracket_is_text() {
        let tokens = kinds("a < b <3");
        assert!(tokens.iter().all(|k| *k == TokenKind::Text));
    }

    #[test]
    fn test_comment_hides_tags() {
        let tokens = kinds("<!-- <div> -->x");
        assert_eq!(tokens, vec![TokenKind::Comment, TokenKind::Text]);
    }

    #[test]
    fn test_unterminated_tag_is_text() {
        let tokens = kinds("<p>ok<img src=\"x");
        assert_eq!(tokens.last(), Some(&TokenKind::Text));
    }

    #[test]
    fn test_multibyte_text() {
        let html = "<p>日本語</p>";
        let spans: Vec<_> = Tokenizer::new(html).map(|t| t.span).collect();
        assert_eq!(&html[spans[1].clone()], "日本語");
    }
}
