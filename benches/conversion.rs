use criterion::{criterion_group, criterion_main, Criterion};
use std::path::Path;

use mhtconv::model::output::ConvertOptions;

fn fixture_bytes() -> Vec<u8> {
    let path = Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join("blink.mht");
    std::fs::read(path).unwrap()
}

/// A single-part archive with a large body of simple rows.
fn large_archive(rows: usize) -> Vec<u8> {
    let mut raw = b"Content-Type: multipart/related; boundary=\"B\"\r\n\r\n\
--B\r\n\
Content-Type: text/html; charset=utf-8\r\n\r\n\
<!DOCTYPE html><html><head><title>rows</title></head><body>\n"
        .to_vec();
    for i in 0..rows {
        raw.extend_from_slice(
            format!("<div class=\"row\"><p>Row {i}</p><img src=\"cid:img{i}\"></div>\n").as_bytes(),
        );
    }
    raw.extend_from_slice(b"</body></html>\r\n--B--\r\n");
    raw
}

fn bench_parse_container(c: &mut Criterion) {
    let raw = fixture_bytes();
    c.bench_function("parse_blink_container", |b| {
        b.iter(|| mhtconv::parser::mime::parse(&raw, None).unwrap().parts.len())
    });
}

fn bench_convert(c: &mut Criterion) {
    let raw = fixture_bytes();
    let options = ConvertOptions::default();
    c.bench_function("convert_blink", |b| {
        b.iter(|| mhtconv::convert::convert(&raw, &options).unwrap())
    });
}

fn bench_convert_split(c: &mut Criterion) {
    let raw = large_archive(20_000);
    let options = ConvertOptions {
        split_size_bytes: Some(64 * 1024),
        ..Default::default()
    };
    c.bench_function("convert_split_large", |b| {
        b.iter(|| mhtconv::convert::convert(&raw, &options).unwrap().chunks.len())
    });
}

criterion_group!(benches, bench_parse_container, bench_convert, bench_convert_split);
criterion_main!(benches);
