//! Plain-text corpus loader
//!
//! The ingestion boundary: reads a data directory into [`Document`]s, one
//! per supported file, with pages split on form-feed. Unreadable files are
//! collected as per-document failures instead of aborting the run; richer
//! formats (PDF extraction and friends) are upstream of this boundary.

use std::fs;
use std::path::Path;

use crate::corpus::Document;
use crate::errors::{RagError, Result};

/// File extensions the loader accepts
pub const SUPPORTED_EXTENSIONS: &[&str] = &["txt", "md"];

/// Page delimiter inside a source file
const PAGE_BREAK: char = '\u{000C}';

/// Result of loading a corpus directory
#[derive(Debug, Default)]
pub struct LoadOutcome {
    pub documents: Vec<Document>,
    /// Per-file `RagError::Ingestion` failures, in directory order
    pub failures: Vec<RagError>,
}

/// Loads supported files from a directory into documents
pub struct CorpusLoader;

impl CorpusLoader {
    /// Load every supported file under `data_path` (non-recursive).
    ///
    /// Fails only when the directory itself is unusable; individual file
    /// failures land in [`LoadOutcome::failures`].
    pub fn load_dir(data_path: &Path) -> Result<LoadOutcome> {
        if !data_path.is_dir() {
            return Err(RagError::Config(format!(
                "data path '{}' is not a directory",
                data_path.display()
            )));
        }

        let mut paths: Vec<_> = fs::read_dir(data_path)?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|p| p.is_file() && has_supported_extension(p))
            .collect();
        // directory order is platform-dependent; sort for determinism
        paths.sort();

        let mut outcome = LoadOutcome::default();
        for path in paths {
            let source_id = path.display().to_string();
            match fs::read_to_string(&path) {
                Ok(text) => {
                    let pages = text.split(PAGE_BREAK).map(str::to_string).collect();
                    outcome.documents.push(Document::new(source_id, pages));
                }
                Err(e) => outcome.failures.push(RagError::Ingestion {
                    source_id,
                    reason: e.to_string(),
                }),
            }
        }
        Ok(outcome)
    }
}

fn has_supported_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| SUPPORTED_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    fn write_file(dir: &TempDir, name: &str, contents: &[u8]) {
        let mut f = fs::File::create(dir.path().join(name)).unwrap();
        f.write_all(contents).unwrap();
    }

    #[test]
    fn test_missing_directory_is_config_error() {
        let result = CorpusLoader::load_dir(Path::new("/no/such/dir"));
        assert!(matches!(result, Err(RagError::Config(_))));
    }

    #[test]
    fn test_loads_supported_files_in_sorted_order() {
        let dir = TempDir::new().unwrap();
        write_file(&dir, "b.txt", b"beta");
        write_file(&dir, "a.md", b"alpha");
        write_file(&dir, "ignored.pdf", b"binary");

        let outcome = CorpusLoader::load_dir(dir.path()).unwrap();
        assert_eq!(outcome.documents.len(), 2);
        assert!(outcome.failures.is_empty());
        assert!(outcome.documents[0].source_id.ends_with("a.md"));
        assert!(outcome.documents[1].source_id.ends_with("b.txt"));
        assert_eq!(outcome.documents[0].pages, vec!["alpha".to_string()]);
    }

    #[test]
    fn test_form_feed_splits_pages() {
        let dir = TempDir::new().unwrap();
        write_file(&dir, "paged.txt", b"page one\x0Cpage two");

        let outcome = CorpusLoader::load_dir(dir.path()).unwrap();
        assert_eq!(outcome.documents[0].pages.len(), 2);
        assert_eq!(outcome.documents[0].pages[1], "page two");
    }

    #[test]
    fn test_unreadable_file_collected_not_fatal() {
        let dir = TempDir::new().unwrap();
        write_file(&dir, "good.txt", b"fine");
        // invalid UTF-8 makes read_to_string fail for this file only
        write_file(&dir, "bad.txt", &[0xFF, 0xFE, 0x00]);

        let outcome = CorpusLoader::load_dir(dir.path()).unwrap();
        assert_eq!(outcome.documents.len(), 1);
        assert_eq!(outcome.failures.len(), 1);
        assert!(matches!(outcome.failures[0], RagError::Ingestion { .. }));
    }

    #[test]
    fn test_empty_directory_is_ok() {
        let dir = TempDir::new().unwrap();
        let outcome = CorpusLoader::load_dir(dir.path()).unwrap();
        assert!(outcome.documents.is_empty());
        assert!(outcome.failures.is_empty());
    }
}
