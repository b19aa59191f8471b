use anyhow::{Context, Result};
use std::fs;
use std::io::Write;
use std::path::Path;
use tempfile::NamedTempFile;

// @module: File and directory utilities

/// UTF-8 byte-order mark
pub const BOM: char = '\u{FEFF}';

// @struct: File operations utility
pub struct FileManager;

impl FileManager {
    // @checks: File existence
    pub fn file_exists<P: AsRef<Path>>(path: P) -> bool {
        path.as_ref().exists() && path.as_ref().is_file()
    }

    // @creates: Directory and parents if needed
    pub fn ensure_dir<P: AsRef<Path>>(path: P) -> Result<()> {
        let path = path.as_ref();
        if !path.as_os_str().is_empty() && !path.exists() {
            fs::create_dir_all(path).with_context(|| format!("Failed to create directory: {:?}", path))?;
        }
        Ok(())
    }

    /// Read a file to a string, byte-order mark included
    pub fn read_to_string<P: AsRef<Path>>(path: P) -> Result<String> {
        fs::read_to_string(&path).with_context(|| format!("Failed to read file: {:?}", path.as_ref()))
    }

    /// Write a subtitle document as UTF-8 with a byte-order mark
    ///
    /// The text goes to a temporary file next to the target which then
    /// replaces it, so the target never holds a partial document. A BOM
    /// already present in `content` is not doubled.
    pub fn write_document<P: AsRef<Path>>(path: P, content: &str) -> Result<()> {
        let path = path.as_ref();
        let parent = path.parent().filter(|p| !p.as_os_str().is_empty()).unwrap_or(Path::new("."));
        Self::ensure_dir(parent)?;

        let mut file = NamedTempFile::new_in(parent)
            .with_context(|| format!("Failed to create temporary file in {:?}", parent))?;
        if !content.starts_with(BOM) {
            let mut buf = [0u8; 3];
            file.write_all(BOM.encode_utf8(&mut buf).as_bytes())?;
        }
        file.write_all(content.as_bytes())
            .with_context(|| format!("Failed to write to file: {:?}", path))?;
        file.flush()?;
        file.persist(path)
            .with_context(|| format!("Failed to write to file: {:?}", path))?;
        Ok(())
    }
}
