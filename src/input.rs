//! Locating and reading input archives.

use std::fs::{self, File};
use std::ops::Deref;
use std::path::{Path, PathBuf};

use memmap2::Mmap;
use tracing::debug;

use crate::error::{MhtmlError, Result};

/// File extensions recognized as MHTML archives (compared case-insensitively).
pub const MHTML_EXTENSIONS: &[&str] = &["mht", "mhtml"];

/// `true` when `path` has an MHTML extension.
pub fn is_mhtml(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| MHTML_EXTENSIONS.iter().any(|x| e.eq_ignore_ascii_case(x)))
}

/// Every MHTML archive directly inside `dir`, sorted by path.
pub fn discover_inputs(dir: &Path) -> Result<Vec<PathBuf>> {
    let entries = fs::read_dir(dir).map_err(|e| MhtmlError::io(dir, e))?;
    let mut found = Vec::new();
    for entry in entries {
        let path = entry.map_err(|e| MhtmlError::io(dir, e))?.path();
        if path.is_file() && is_mhtml(&path) {
            found.push(path);
        }
    }
    found.sort();
    debug!(dir = %dir.display(), count = found.len(), "Discovered input archives");
    Ok(found)
}

/// Resolve the command-line input into the list of archives to convert.
///
/// A file is taken as-is, a directory is scanned, and no input means the
/// current directory.
pub fn resolve_inputs(input: Option<&Path>) -> Result<Vec<PathBuf>> {
    match input {
        Some(path) if path.is_dir() => discover_inputs(path),
        Some(path) if path.exists() => Ok(vec![path.to_path_buf()]),
        Some(path) => Err(MhtmlError::FileNotFound(path.to_path_buf())),
        None => discover_inputs(Path::new(".")),
    }
}

/// Output base name for an input: its file stem.
pub fn base_name(path: &Path) -> Result<String> {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .filter(|s| !s.is_empty())
        .ok_or_else(|| MhtmlError::InvalidPath(path.display().to_string()))
}

/// An input archive mapped into memory.
pub struct InputFile {
    path: PathBuf,
    data: Data,
}

enum Data {
    Mapped(Mmap),
    Empty,
}

impl InputFile {
    /// Map `path` read-only.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if !path.exists() {
            return Err(MhtmlError::FileNotFound(path));
        }
        let file = File::open(&path).map_err(|e| MhtmlError::io(&path, e))?;
        let len = file.metadata().map_err(|e| MhtmlError::io(&path, e))?.len();

        // Mapping a zero-length file fails on some platforms
        let data = if len == 0 {
            Data::Empty
        } else {
            // SAFETY: the map is read-only and lives no longer than this
            // value; the file is not modified by this process while mapped.
            let map = unsafe { Mmap::map(&file) }.map_err(|e| MhtmlError::io(&path, e))?;
            Data::Mapped(map)
        };
        debug!(path = %path.display(), bytes = len, "Opened input archive");
        Ok(Self { path, data })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn bytes(&self) -> &[u8] {
        match &self.data {
            Data::Mapped(map) => &map[..],
            Data::Empty => &[],
        }
    }
}

impl Deref for InputFile {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        self.bytes()
    }
}
