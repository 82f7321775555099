//! The conversion pipeline: container parsing, text decoding, resource
//! rewriting and splitting, in that order.

use tracing::{debug, info, warn};

use crate::error::ConversionError;
use crate::html::meta;
use crate::model::output::{ConversionResult, ConversionWarning, ConvertOptions, DocumentInfo};
use crate::parser::{charset, mime};
use crate::resource::{self, ResourceIndex};
use crate::split;

/// Convert a raw MHTML archive into HTML chunks and extracted resources.
///
/// Only a malformed container is a hard failure. Decoding, rewriting and
/// splitting degrade gracefully and report through
/// [`ConversionResult::warnings`] and
/// [`ConversionResult::missing_references`].
pub fn convert(raw: &[u8], options: &ConvertOptions) -> Result<ConversionResult, ConversionError> {
    let document = mime::parse(raw, None)?;
    let root = document.root();
    debug!(
        parts = document.parts.len(),
        root = document.root_index(),
        "Parsed archive"
    );

    let mut warnings = Vec::new();

    let decoded = charset::decode_html_text(root);
    if decoded.degraded {
        warn!(
            declared = decoded.declared.as_deref().unwrap_or("-"),
            used = decoded.encoding.name(),
            "HTML decoded with a fallback encoding"
        );
        warnings.push(ConversionWarning::DecodeDegradation {
            declared: decoded.declared.clone(),
            used: decoded.encoding.name().to_string(),
        });
    }

    // Output is UTF-8 whatever the page declared
    let text = meta::declare_utf8(&decoded.text);

    let index = ResourceIndex::build(document.resources());
    let rewritten = resource::rewrite(&text, &index, options);

    let outcome = split::split(&rewritten.html, options.split_size_bytes);
    warnings.extend(outcome.warning);

    let info = DocumentInfo {
        subject: document.subject(),
        source_url: document.source_url().map(str::to_string),
        date: document.date().map(str::to_string),
        encoding: decoded.encoding.name().to_string(),
        part_count: document.parts.len(),
    };

    info!(
        chunks = outcome.chunks.len(),
        extracted = rewritten.extracted.len(),
        missing = rewritten.missing.len(),
        warnings = warnings.len(),
        "Conversion finished"
    );

    Ok(ConversionResult {
        info,
        chunks: outcome.chunks,
        extracted_files: rewritten.extracted,
        missing_references: rewritten.missing,
        warnings,
    })
}
