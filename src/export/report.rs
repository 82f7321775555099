//! JSON report of a conversion, written in debug mode.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::html::WrittenOutput;
use crate::error::{MhtmlError, Result};
use crate::model::output::{ConversionResult, ConversionWarning, DocumentInfo};

/// Summary of one converted archive.
#[derive(Debug, Clone, Serialize)]
pub struct ConversionReport {
    pub input: PathBuf,
    pub generated_at: DateTime<Utc>,
    pub elapsed_ms: u64,
    pub document: DocumentInfo,
    pub outputs: Vec<OutputEntry>,
    pub extracted: Vec<ExtractedEntry>,
    pub missing_references: Vec<String>,
    pub warnings: Vec<ConversionWarning>,
}

#[derive(Debug, Clone, Serialize)]
pub struct OutputEntry {
    pub path: PathBuf,
    pub bytes: u64,
}

/// Where one reference ended up.
#[derive(Debug, Clone, Serialize)]
pub struct ExtractedEntry {
    pub reference: String,
    pub path: PathBuf,
    pub content_type: String,
    pub bytes: u64,
}

impl ConversionReport {
    pub fn new(input: &Path, result: &ConversionResult, written: &WrittenOutput, elapsed_ms: u64) -> Self {
        let outputs = written
            .html
            .iter()
            .map(|f| OutputEntry {
                path: f.path.clone(),
                bytes: f.bytes,
            })
            .collect();
        let extracted = result
            .extracted_files
            .iter()
            .zip(&written.extracted)
            .map(|(file, out)| ExtractedEntry {
                reference: file.reference.clone(),
                path: out.path.clone(),
                content_type: file.content_type.clone(),
                bytes: out.bytes,
            })
            .collect();

        Self {
            input: input.to_path_buf(),
            generated_at: Utc::now(),
            elapsed_ms,
            document: result.info.clone(),
            outputs,
            extracted,
            missing_references: result.missing_references.clone(),
            warnings: result.warnings.clone(),
        }
    }
}

/// Path of the report for `base` inside `output_dir`.
pub fn report_path(output_dir: &Path, base: &str) -> PathBuf {
    output_dir.join(format!("{base}_report.json"))
}

/// Write `report` as pretty-printed JSON.
pub fn write_report(report: &ConversionReport, path: &Path) -> Result<()> {
    let json = serde_json::to_string_pretty(report)
        .map_err(|e| MhtmlError::ExportError(format!("cannot serialize report: {e}")))?;
    std::fs::write(path, json).map_err(|e| MhtmlError::io(path, e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::export::html::WrittenFile;

    #[test]
    fn test_write_report() {
        let dir = tempfile::tempdir().unwrap();
        let result = ConversionResult {
            missing_references: vec!["cid:gone".into()],
            warnings: vec![ConversionWarning::DecodeDegradation {
                declared: Some("utf-8".into()),
                used: "GBK".into(),
            }],
            ..Default::default()
        };
        let written = WrittenOutput {
            html: vec![WrittenFile {
                path: dir.path().join("page.html"),
                bytes: 10,
            }],
            extracted: Vec::new(),
        };
        let report = ConversionReport::new(Path::new("page.mht"), &result, &written, 42);
        let path = report_path(dir.path(), "page");
        write_report(&report, &path).unwrap();

        let json: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(json["elapsed_ms"], 42);
        assert_eq!(json["missing_references"][0], "cid:gone");
        assert_eq!(json["warnings"][0]["kind"], "decode_degradation");
        assert_eq!(json["warnings"][0]["used"], "GBK");
        assert_eq!(json["outputs"][0]["bytes"], 10);
    }
}
