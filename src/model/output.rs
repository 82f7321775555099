//! Conversion options and the artifacts a conversion produces.

use std::ops::Range;

use serde::Serialize;

/// Default relative folder for extracted resources.
pub const DEFAULT_IMAGES_DIR: &str = "images";

/// Options consumed by the conversion core.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConvertOptions {
    /// Maximum size of one HTML chunk in bytes; `None` disables splitting.
    pub split_size_bytes: Option<usize>,
    /// Inline every resource as a `data:` URI instead of extracting images.
    pub embed_images: bool,
    /// When `false`, resource references are left untouched.
    pub process_images: bool,
    /// Relative folder used in rewritten paths of extracted files.
    pub images_dir: String,
}

impl Default for ConvertOptions {
    fn default() -> Self {
        Self {
            split_size_bytes: None,
            embed_images: false,
            process_images: true,
            images_dir: DEFAULT_IMAGES_DIR.to_string(),
        }
    }
}

/// Decision taken once per resource within a conversion run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RewritePlan {
    /// Reference the resource through a file written next to the HTML.
    ExtractToFile { relative_path: String },
    /// Replace the reference with a `data:` URI.
    InlineAsDataUri { mime_type: String, payload: String },
}

impl RewritePlan {
    /// Append the text that replaces a reference to `out`.
    pub fn write_replacement(&self, out: &mut String) {
        match self {
            Self::ExtractToFile { relative_path } => out.push_str(relative_path),
            Self::InlineAsDataUri { mime_type, payload } => {
                out.push_str("data:");
                out.push_str(mime_type);
                out.push_str(";base64,");
                out.push_str(payload);
            }
        }
    }

    /// The replacement text as an owned string.
    pub fn replacement(&self) -> String {
        let mut out = String::new();
        self.write_replacement(&mut out);
        out
    }
}

/// A resource to be written to disk by the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedFile {
    /// Bare file name (`logo_1a2b3c4d.png`).
    pub file_name: String,
    /// Path used inside the HTML (`images/logo_1a2b3c4d.png`).
    pub relative_path: String,
    /// MIME type of the source part.
    pub content_type: String,
    /// The first reference that resolved to this resource.
    pub reference: String,
    /// Transfer-decoded bytes of the source part.
    pub data: Vec<u8>,
}

/// One self-contained HTML document produced by the splitter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HtmlChunk {
    /// 1-based position in document order.
    pub sequence_index: usize,
    /// Complete HTML text, shell included.
    pub html_text: String,
    /// Size of `html_text` in bytes.
    pub approximate_byte_size: usize,
    /// Byte range of the source HTML carried verbatim by this chunk.
    pub body_span: Range<usize>,
}

impl HtmlChunk {
    pub fn new(sequence_index: usize, html_text: String, body_span: Range<usize>) -> Self {
        let approximate_byte_size = html_text.len();
        Self {
            sequence_index,
            html_text,
            approximate_byte_size,
            body_span,
        }
    }
}

/// Non-fatal conditions surfaced alongside a successful conversion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ConversionWarning {
    /// The HTML text was not decoded with its declared (or primary)
    /// charset; it may contain replacement characters.
    DecodeDegradation {
        declared: Option<String>,
        used: String,
    },
    /// Structural splitting was impossible and a raw split was used.
    SplitFallback {
        chunks: usize,
        broken_chunks: usize,
    },
}

impl std::fmt::Display for ConversionWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::DecodeDegradation { declared, used } => match declared {
                Some(d) => write!(f, "declared charset '{d}' unusable, decoded as {used}"),
                None => write!(f, "no usable charset declared, decoded as {used}"),
            },
            Self::SplitFallback {
                chunks,
                broken_chunks,
            } => write!(
                f,
                "no safe split points, raw split into {chunks} chunk(s) ({broken_chunks} may have broken markup)"
            ),
        }
    }
}

/// Descriptive metadata of the converted page.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DocumentInfo {
    pub subject: Option<String>,
    pub source_url: Option<String>,
    pub date: Option<String>,
    /// Encoding the HTML text was decoded with.
    pub encoding: String,
    /// Number of MIME parts in the container.
    pub part_count: usize,
}

/// Everything a conversion run hands back to the persistence layer.
#[derive(Debug, Clone, Default)]
pub struct ConversionResult {
    pub info: DocumentInfo,
    pub chunks: Vec<HtmlChunk>,
    pub extracted_files: Vec<ExtractedFile>,
    /// Unresolved `cid:` references, unique, in order of appearance.
    pub missing_references: Vec<String>,
    pub warnings: Vec<ConversionWarning>,
}
