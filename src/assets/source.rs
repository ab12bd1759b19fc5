//! Where asset bytes come from
//!
//! Loader jobs only ever see an [`AssetSource`], so the viewer reads from
//! disk while tests serve files from memory.

use std::{
    collections::HashMap,
    path::PathBuf,
    sync::Mutex,
};

use crate::error::AssetError;

/// Read-only file access used by loader threads.
pub trait AssetSource: Send + Sync {
    fn read_bytes(&self, path: &str) -> Result<Vec<u8>, AssetError>;

    fn read_text(&self, path: &str) -> Result<String, AssetError> {
        let bytes = self.read_bytes(path)?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }
}

/// Reads assets relative to a root directory.
#[derive(Debug, Clone)]
pub struct FileSource {
    root: PathBuf,
}

impl FileSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl AssetSource for FileSource {
    fn read_bytes(&self, path: &str) -> Result<Vec<u8>, AssetError> {
        let full = self.root.join(path.trim_start_matches("./"));
        std::fs::read(&full).map_err(|source| {
            if source.kind() == std::io::ErrorKind::NotFound {
                AssetError::NotFound(full.display().to_string())
            } else {
                AssetError::Io {
                    path: full.display().to_string(),
                    source,
                }
            }
        })
    }
}

/// In-memory files. Counts reads per path so tests can check de-duplication.
#[derive(Debug, Default)]
pub struct MemorySource {
    files: HashMap<String, Vec<u8>>,
    reads: Mutex<HashMap<String, usize>>,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_text(self, path: &str, text: &str) -> Self {
        self.with_bytes(path, text.as_bytes().to_vec())
    }

    pub fn with_bytes(mut self, path: &str, bytes: Vec<u8>) -> Self {
        self.files.insert(path.to_string(), bytes);
        self
    }

    /// How often `path` has been read so far.
    pub fn reads(&self, path: &str) -> usize {
        self.reads
            .lock()
            .map(|reads| reads.get(path).copied().unwrap_or(0))
            .unwrap_or(0)
    }
}

impl AssetSource for MemorySource {
    fn read_bytes(&self, path: &str) -> Result<Vec<u8>, AssetError> {
        if let Ok(mut reads) = self.reads.lock() {
            *reads.entry(path.to_string()).or_insert(0) += 1;
        }
        self.files
            .get(path)
            .cloned()
            .ok_or_else(|| AssetError::NotFound(path.to_string()))
    }
}

/// Directory part of `path` including the trailing slash, or `""`.
pub fn base_dir(path: &str) -> &str {
    match path.rfind('/') {
        Some(slash) => &path[..=slash],
        None => "",
    }
}

/// Joins a filename from an asset file onto that file's directory.
pub fn resolve(base_dir: &str, filename: &str) -> String {
    format!("{}{}", base_dir, filename)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_dir() {
        assert_eq!(base_dir("data/Letto/Letto.obj"), "data/Letto/");
        assert_eq!(base_dir("Letto.obj"), "");
        assert_eq!(resolve(base_dir("data/Letto/Letto.obj"), "wood.png"), "data/Letto/wood.png");
    }

    #[test]
    fn test_memory_source_counts_reads() {
        let source = MemorySource::new().with_text("a.obj", "v 0 0 0");
        assert_eq!(source.reads("a.obj"), 0);
        assert_eq!(source.read_text("a.obj").unwrap(), "v 0 0 0");
        assert_eq!(source.reads("a.obj"), 1);
        assert!(matches!(
            source.read_bytes("missing.obj"),
            Err(AssetError::NotFound(_))
        ));
    }

    #[test]
    fn test_file_source_reports_missing_files() {
        let source = FileSource::new(std::env::temp_dir());
        assert!(matches!(
            source.read_bytes("roomview-does-not-exist/none.obj"),
            Err(AssetError::NotFound(_))
        ));
    }
}
