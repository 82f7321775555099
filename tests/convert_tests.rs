//! Integration tests for container parsing, resource rewriting, splitting and
//! persistence, driven by the archives in `tests/fixtures/`.

use std::path::{Path, PathBuf};

use assert_fs::prelude::*;
use predicates::prelude::*;

use mhtconv::convert::convert;
use mhtconv::error::MhtmlError;
use mhtconv::export::html::write_result;
use mhtconv::html::{TokenKind, Tokenizer};
use mhtconv::input::{base_name, InputFile};
use mhtconv::model::output::{ConversionWarning, ConvertOptions};
use mhtconv::parser::mime;
use mhtconv::split::split;

fn fixture(name: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name)
}

fn read_fixture(name: &str) -> Vec<u8> {
    std::fs::read(fixture(name)).unwrap()
}

/// A minimal archive with one HTML part.
fn archive(content_type: &str, html: &[u8]) -> Vec<u8> {
    let mut raw = b"MIME-Version: 1.0\r\n\
Content-Type: multipart/related; type=\"text/html\"; boundary=\"----b\"\r\n\r\n\
------b\r\n"
        .to_vec();
    raw.extend_from_slice(format!("Content-Type: {content_type}\r\n").as_bytes());
    raw.extend_from_slice(b"Content-Transfer-Encoding: 8bit\r\n\r\n");
    raw.extend_from_slice(html);
    raw.extend_from_slice(b"\r\n------b--\r\n");
    raw
}

// ─── Test 1: Blink archive structure ────────────────────────────────

#[test]
fn test_parse_blink_archive() {
    let raw = read_fixture("blink.mht");
    let doc = mime::parse(&raw, None).unwrap();

    assert_eq!(doc.parts.len(), 5);
    assert_eq!(doc.root_index(), 0);
    assert_eq!(
        doc.boundary,
        "----MultipartBoundary--Q0n3YmVdyxeWd0XnAXkHqvT4FVCqsXAxbGGL0UH2Pf----"
    );
    assert_eq!(
        doc.root().content_location.as_deref(),
        Some("https://example.com/menu")
    );
    assert_eq!(doc.parts[4].content_id.as_deref(), Some("bg-1@mhtml.blink"));
    assert!(doc.parts[2].decoded_body.starts_with(b"\x89PNG"));
}

// ─── Test 2: Default conversion extracts images ─────────────────────

#[test]
fn test_convert_blink_extracts_images() {
    let raw = read_fixture("blink.mht");
    let result = convert(&raw, &ConvertOptions::default()).unwrap();

    assert_eq!(result.chunks.len(), 1);
    assert!(result.warnings.is_empty());

    let names: Vec<&str> = result
        .extracted_files
        .iter()
        .map(|f| f.file_name.as_str())
        .collect();
    assert_eq!(
        names,
        vec!["logo_62d7693d.png", "bg-1_mhtml_62d7693d.png", "dot_b1442e85.gif"]
    );
    assert_eq!(
        result.missing_references,
        vec!["cid:gone-1@mhtml.blink".to_string()]
    );

    let html = &result.chunks[0].html_text;
    assert!(html.contains("<p>Today: crème brûlée</p>"));
    assert!(html.contains(r#"<img src="images/logo_62d7693d.png" alt="logo">"#));
    assert!(html.contains("url(&quot;images/bg-1_mhtml_62d7693d.png&quot;)"));
    assert!(html.contains(r#"srcset="images/logo_62d7693d.png 1x, images/dot_b1442e85.gif 2x""#));
    assert!(html.contains(r#"href="data:text/css;base64,"#));
    // Unresolved references stay as written
    assert!(html.contains(r#"src="cid:gone-1@mhtml.blink""#));
    assert!(html.contains(r#"href="https://example.com/about""#));
}

// ─── Test 3: Document metadata ──────────────────────────────────────

#[test]
fn test_convert_blink_document_info() {
    let raw = read_fixture("blink.mht");
    let result = convert(&raw, &ConvertOptions::default()).unwrap();

    assert_eq!(result.info.subject.as_deref(), Some("Café menu"));
    assert_eq!(
        result.info.source_url.as_deref(),
        Some("https://example.com/menu")
    );
    assert_eq!(
        result.info.date.as_deref(),
        Some("Mon, 5 Oct 2026 10:15:00 +0200")
    );
    assert_eq!(result.info.encoding, "UTF-8");
    assert_eq!(result.info.part_count, 5);
}

// ─── Test 4: Embedding inlines every resource ───────────────────────

#[test]
fn test_convert_embed_images() {
    let raw = read_fixture("blink.mht");
    let options = ConvertOptions {
        embed_images: true,
        ..Default::default()
    };
    let result = convert(&raw, &options).unwrap();

    assert!(result.extracted_files.is_empty());
    let html = &result.chunks[0].html_text;
    assert!(html.contains(r#"<img src="data:image/png;base64,iVBORw0KGgo"#));
    assert!(html.contains("data:image/gif;base64,R0lGODlh"));
    assert!(!html.contains("images/"));
}

// ─── Test 5: Processing disabled leaves references alone ────────────

#[test]
fn test_convert_without_image_processing() {
    let raw = read_fixture("blink.mht");
    let options = ConvertOptions {
        process_images: false,
        ..Default::default()
    };
    let result = convert(&raw, &options).unwrap();

    assert!(result.extracted_files.is_empty());
    assert!(result.missing_references.is_empty());
    let html = &result.chunks[0].html_text;
    assert!(html.contains(r#"src="https://example.com/img/logo.png""#));
    assert!(html.contains("cid:bg-1@mhtml.blink"));
}

// ─── Test 6: Legacy GBK archive with a meta charset ─────────────────

#[test]
fn test_convert_ie_gbk_archive() {
    let raw = read_fixture("ie_gbk.mht");
    let result = convert(&raw, &ConvertOptions::default()).unwrap();

    assert!(result.warnings.is_empty());
    assert_eq!(result.info.encoding, "GBK");
    assert_eq!(result.info.subject.as_deref(), Some("中文页面"));

    let html = &result.chunks[0].html_text;
    assert!(html.contains("<P>你好，世界</P>"));
    assert!(html.contains("<TITLE>中文页面</TITLE>"));
    assert_eq!(result.extracted_files.len(), 1);
    assert_eq!(result.extracted_files[0].file_name, "a_b1442e85.gif");
    assert!(html.contains(r#"<IMG src="images/a_b1442e85.gif">"#));
    // The output is UTF-8, so the declared charset must say so
    assert!(html.contains(r#"content="text/html; charset=utf-8""#));
    assert!(!html.contains("gb2312"));
}

// ─── Test 7: Wrong declared charset is a warning, not an error ──────

#[test]
fn test_wrong_charset_degrades() {
    // 你好 in GBK, declared as UTF-8
    let raw = archive(
        "text/html; charset=utf-8",
        b"<html><body><p>\xc4\xe3\xba\xc3</p></body></html>",
    );
    let result = convert(&raw, &ConvertOptions::default()).unwrap();

    assert_eq!(
        result.warnings,
        vec![ConversionWarning::DecodeDegradation {
            declared: Some("utf-8".into()),
            used: "GBK".into(),
        }]
    );
    assert!(result.chunks[0].html_text.contains("<p>你好</p>"));
}

// ─── Test 8: Malformed input is a hard error ────────────────────────

#[test]
fn test_malformed_archive_fails() {
    let raw = read_fixture("malformed.mht");
    let err = convert(&raw, &ConvertOptions::default()).unwrap_err();
    assert!(matches!(err.0, MhtmlError::MalformedContainer(_)));
}

// ─── Test 9: Oversized HTML splits into valid chunks ────────────────

#[test]
fn test_split_large_document() {
    const HEAD: &str =
        "<!DOCTYPE html><html><head><meta charset=\"utf-8\"><title>big</title></head><body>";
    const TAIL: &str = "</body></html>";
    let rows: String = (0..300)
        .map(|i| format!("<div class=\"row\"><p>Row {i}: some text to fill space</p></div>\n"))
        .collect();
    let html = format!("{HEAD}{rows}{TAIL}");
    let raw = archive("text/html; charset=utf-8", html.as_bytes());

    let options = ConvertOptions {
        split_size_bytes: Some(4096),
        ..Default::default()
    };
    let result = convert(&raw, &options).unwrap();

    assert!(result.chunks.len() > 3);
    assert!(result.warnings.is_empty());

    let mut rebuilt = String::new();
    for (i, chunk) in result.chunks.iter().enumerate() {
        assert_eq!(chunk.sequence_index, i + 1);
        assert!(chunk.html_text.starts_with(HEAD));
        assert!(chunk.html_text.ends_with(TAIL));
        // One row may overshoot the budget
        assert!(chunk.approximate_byte_size <= 4096 + 80);

        let inner = &chunk.html_text[HEAD.len()..chunk.html_text.len() - TAIL.len()];
        assert_eq!(inner.matches("<div").count(), inner.matches("</div>").count());
        rebuilt.push_str(inner);
    }
    assert_eq!(rebuilt, rows);
}

// ─── Test 10: Splitting disabled keeps one chunk ────────────────────

#[test]
fn test_split_disabled() {
    let body = "<p>x</p>\n".repeat(2000);
    let raw = archive("text/html", format!("<html><body>{body}</body></html>").as_bytes());
    let result = convert(&raw, &ConvertOptions::default()).unwrap();
    assert_eq!(result.chunks.len(), 1);
    assert_eq!(
        result.chunks[0].html_text,
        format!("<html><meta charset=\"utf-8\"><body>{body}</body></html>")
    );
}

// ─── Test 11: Same input, same output ───────────────────────────────

#[test]
fn test_conversion_is_deterministic() {
    let raw = read_fixture("blink.mht");
    let a = convert(&raw, &ConvertOptions::default()).unwrap();
    let b = convert(&raw, &ConvertOptions::default()).unwrap();
    assert_eq!(a.chunks, b.chunks);
    assert_eq!(a.extracted_files, b.extracted_files);
}

// ─── Test 12: Convert and write to disk ─────────────────────────────

#[test]
fn test_convert_and_write() {
    let temp = assert_fs::TempDir::new().unwrap();
    let path = fixture("blink.mht");
    let input = InputFile::open(&path).unwrap();
    let base = base_name(&path).unwrap();
    assert_eq!(base, "blink");

    let result = convert(&input, &ConvertOptions::default()).unwrap();
    let written = write_result(&result, &base, temp.path()).unwrap();

    assert_eq!(written.html.len(), 1);
    assert_eq!(written.extracted.len(), 3);
    temp.child("blink.html")
        .assert(predicate::str::contains("images/logo_62d7693d.png"));
    temp.child("images/logo_62d7693d.png")
        .assert(predicate::path::exists());
    temp.child("images/dot_b1442e85.gif")
        .assert(predicate::path::exists());
    temp.close().unwrap();
}

// ─── Test 13: Archive without resource parts ────────────────────────

#[test]
fn test_convert_archive_without_resources() {
    let raw = archive(
        "text/html; charset=utf-8",
        b"<html><head><title>t</title></head><body><p>text only</p><a href=\"next.html\">next</a></body></html>",
    );
    let result = convert(&raw, &ConvertOptions::default()).unwrap();

    assert!(result.missing_references.is_empty());
    assert!(result.extracted_files.is_empty());
    assert!(result.warnings.is_empty());
    assert_eq!(result.chunks.len(), 1);
    assert!(result.chunks[0].html_text.contains("<p>text only</p>"));
}

// ─── Test 14: Chunks reassemble the body and stay balanced ──────────

/// Start tags minus end tags for `name`, ignoring raw text and comments.
fn open_count(html: &str, name: &str) -> i64 {
    Tokenizer::new(html)
        .map(|token| match token.kind {
            TokenKind::StartTag(tag) if tag.name == name && !tag.self_closing => 1,
            TokenKind::EndTag(end) if end == name => -1,
            _ => 0,
        })
        .sum()
}

#[test]
fn test_split_invariants_across_budgets() {
    const HEAD: &str = "<html><head><meta charset=\"utf-8\"></head><body>";
    const TAIL: &str = "</body></html>";

    let bodies: Vec<(&str, String)> = vec![
        (
            "implicit paragraph ends",
            (0..150).map(|i| format!("<p>paragraph {i} text")).collect(),
        ),
        (
            "list items",
            (0..80)
                .map(|i| format!("<ul><li>first {i}<li>second {i}</ul>\n"))
                .collect(),
        ),
        (
            "text lines at depth zero",
            (0..80).map(|i| format!("loose line {i}\n<div>boxed {i}</div>\n")).collect(),
        ),
        (
            "raw text and comments",
            (0..40)
                .map(|i| {
                    format!(
                        "<script>if (a < {i}) {{ w(\"<div>\"); }}</script>\
                         <!-- <ul> {i} --><div>after {i}</div>\n"
                    )
                })
                .collect(),
        ),
    ];

    for (label, body) in &bodies {
        assert!(body.len() > 2 * 1200, "{label}: body too small to split");
        let html = format!("{HEAD}{body}{TAIL}");
        for budget in [150, 400, 1200] {
            let out = split(&html, Some(budget));
            assert!(out.warning.is_none(), "{label} @ {budget}: raw split");

            let rebuilt: String = out
                .chunks
                .iter()
                .map(|c| &html[c.body_span.clone()])
                .collect();
            assert_eq!(&rebuilt, body, "{label} @ {budget}: body lost");

            for chunk in &out.chunks {
                assert!(chunk.html_text.starts_with(HEAD), "{label} @ {budget}");
                assert!(chunk.html_text.ends_with(TAIL), "{label} @ {budget}");
                let inner = &html[chunk.body_span.clone()];
                for name in ["div", "ul", "script"] {
                    assert_eq!(
                        open_count(inner, name),
                        0,
                        "{label} @ {budget}: unbalanced <{name}> in chunk {}",
                        chunk.sequence_index
                    );
                }
            }
        }
    }
}
