//! Writing a conversion result to disk.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::{MhtmlError, Result};
use crate::model::output::ConversionResult;

/// A file written by [`write_result`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WrittenFile {
    pub path: PathBuf,
    pub bytes: u64,
}

/// Everything written for one input.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WrittenOutput {
    /// HTML chunks in sequence order.
    pub html: Vec<WrittenFile>,
    /// Extracted resources, in the order of [`ConversionResult::extracted_files`].
    pub extracted: Vec<WrittenFile>,
}

impl WrittenOutput {
    pub fn total_bytes(&self) -> u64 {
        self.html
            .iter()
            .chain(&self.extracted)
            .map(|f| f.bytes)
            .sum()
    }
}

/// File name of chunk `seq` (1-based) out of `total`.
///
/// `page.html` for a single chunk, `page_part1.html`, `page_part2.html`, ...
/// otherwise.
pub fn chunk_file_name(base: &str, seq: usize, total: usize) -> String {
    if total <= 1 {
        format!("{base}.html")
    } else {
        format!("{base}_part{seq}.html")
    }
}

/// Write every chunk and extracted file of `result` under `output_dir`.
///
/// Extracted files land at their `relative_path`, which is what the HTML
/// references. Existing files with the same names are overwritten.
pub fn write_result(result: &ConversionResult, base: &str, output_dir: &Path) -> Result<WrittenOutput> {
    fs::create_dir_all(output_dir).map_err(|e| MhtmlError::io(output_dir, e))?;
    let mut written = WrittenOutput::default();

    let total = result.chunks.len();
    for chunk in &result.chunks {
        let path = output_dir.join(chunk_file_name(base, chunk.sequence_index, total));
        fs::write(&path, chunk.html_text.as_bytes()).map_err(|e| MhtmlError::io(&path, e))?;
        debug!(path = %path.display(), bytes = chunk.approximate_byte_size, "Wrote HTML chunk");
        written.html.push(WrittenFile {
            path,
            bytes: chunk.approximate_byte_size as u64,
        });
    }

    for file in &result.extracted_files {
        let path = extracted_path(output_dir, &file.relative_path)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| MhtmlError::io(parent, e))?;
        }
        fs::write(&path, &file.data).map_err(|e| MhtmlError::io(&path, e))?;
        debug!(path = %path.display(), bytes = file.data.len(), "Wrote extracted file");
        written.extracted.push(WrittenFile {
            path,
            bytes: file.data.len() as u64,
        });
    }

    Ok(written)
}

/// Join a relative path from the HTML onto `output_dir`, refusing anything
/// that would escape it.
fn extracted_path(output_dir: &Path, relative: &str) -> Result<PathBuf> {
    let relative = Path::new(relative);
    let escapes = relative.is_absolute()
        || relative
            .components()
            .any(|c| matches!(c, std::path::Component::ParentDir));
    if escapes {
        return Err(MhtmlError::InvalidPath(relative.display().to_string()));
    }
    Ok(output_dir.join(relative))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::output::{ExtractedFile, HtmlChunk};

    #[test]
    fn test_chunk_file_name() {
        assert_eq!(chunk_file_name("page", 1, 1), "page.html");
        assert_eq!(chunk_file_name("page", 1, 3), "page_part1.html");
        assert_eq!(chunk_file_name("page", 3, 3), "page_part3.html");
    }

    #[test]
    fn test_write_result() {
        let dir = tempfile::tempdir().unwrap();
        let result = ConversionResult {
            chunks: vec![
                HtmlChunk::new(1, "<p>a</p>".into(), 0..8),
                HtmlChunk::new(2, "<p>b</p>".into(), 8..16),
            ],
            extracted_files: vec![ExtractedFile {
                file_name: "x_00000000.png".into(),
                relative_path: "images/x_00000000.png".into(),
                content_type: "image/png".into(),
                reference: "cid:x".into(),
                data: vec![1, 2, 3],
            }],
            ..Default::default()
        };

        let written = write_result(&result, "page", dir.path()).unwrap();
        assert_eq!(written.html.len(), 2);
        assert_eq!(
            fs::read_to_string(dir.path().join("page_part2.html")).unwrap(),
            "<p>b</p>"
        );
        assert_eq!(
            fs::read(dir.path().join("images/x_00000000.png")).unwrap(),
            vec![1, 2, 3]
        );
        assert_eq!(written.total_bytes(), 19);
    }

    #[test]
    fn test_extracted_path_cannot_escape() {
        let dir = Path::new("/tmp/out");
        assert!(extracted_path(dir, "../evil.png").is_err());
        assert!(extracted_path(dir, "/etc/passwd").is_err());
        assert_eq!(
            extracted_path(dir, "images/a.png").unwrap(),
            dir.join("images/a.png")
        );
    }
}
