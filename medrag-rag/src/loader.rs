//! PDF directory loader.
//!
//! This module is only available when the `pdf` feature is enabled.

use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::document::Document;
use crate::error::{RagError, Result};

fn loader_err(path: &Path, message: impl std::fmt::Display) -> RagError {
    RagError::LoaderError { path: path.display().to_string(), message: message.to_string() }
}

/// Discovers `*.pdf` files in a directory and extracts their text page by page.
///
/// ```rust,ignore
/// let documents = PdfDirectoryLoader::new("data").recursive(true).load()?;
/// ```
#[derive(Debug, Clone)]
pub struct PdfDirectoryLoader {
    dir: PathBuf,
    recursive: bool,
}

impl PdfDirectoryLoader {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into(), recursive: false }
    }

    /// Also descend into subdirectories (`**/*.pdf`).
    pub fn recursive(mut self, recursive: bool) -> Self {
        self.recursive = recursive;
        self
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// List matching files in sorted order.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::LoaderError`] if the directory does not exist or
    /// cannot be read.
    pub fn discover(&self) -> Result<Vec<PathBuf>> {
        if !self.dir.is_dir() {
            return Err(loader_err(&self.dir, "directory does not exist"));
        }

        let escaped = glob::Pattern::escape(&self.dir.to_string_lossy());
        let pattern =
            if self.recursive { format!("{escaped}/**/*.pdf") } else { format!("{escaped}/*.pdf") };

        let mut paths = Vec::new();
        for entry in glob::glob(&pattern).map_err(|e| loader_err(&self.dir, e))? {
            let path = entry.map_err(|e| loader_err(e.path(), e.error()))?;
            if path.is_file() {
                paths.push(path);
            }
        }
        paths.sort();

        debug!(
            dir = %self.dir.display(),
            recursive = self.recursive,
            files = paths.len(),
            "discovered pdf files"
        );
        Ok(paths)
    }

    /// Load every discovered file. The first unreadable file aborts the load.
    pub fn load(&self) -> Result<Vec<Document>> {
        let paths = self.discover()?;
        if paths.is_empty() {
            warn!(dir = %self.dir.display(), "no pdf files found");
        }

        let mut documents = Vec::with_capacity(paths.len());
        for path in paths {
            let document = load_pdf(&path)?.with_id(self.document_id(&path));
            info!(path = %path.display(), pages = document.pages.len(), "loaded document");
            documents.push(document);
        }
        Ok(documents)
    }
}

impl PdfDirectoryLoader {
    /// `path` relative to the loader directory, `/`-separated, so the same
    /// file gets the same id however the directory was spelled.
    fn document_id(&self, path: &Path) -> String {
        match path.strip_prefix(&self.dir) {
            Ok(relative) => relative
                .components()
                .map(|c| c.as_os_str().to_string_lossy())
                .collect::<Vec<_>>()
                .join("/"),
            Err(_) => path.display().to_string(),
        }
    }
}

/// Extract the text of each page of a single PDF.
///
/// # Errors
///
/// Returns [`RagError::LoaderError`] if the file cannot be read or parsed.
pub fn load_pdf(path: &Path) -> Result<Document> {
    let owned = path.to_path_buf();
    // pdf-extract panics on some malformed inputs instead of returning an error.
    let extracted = std::panic::catch_unwind(move || pdf_extract::extract_text_by_pages(&owned))
        .map_err(|_| loader_err(path, "pdf parser panicked"))?
        .map_err(|e| loader_err(path, e))?;

    Ok(Document::from_pages(path, extracted))
}

#[cfg(test)]
mod tests {
    use super::*;

    const FIXTURE: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/tests/fixtures/aspirin.pdf");

    #[test]
    fn extracts_page_text_and_file_name() {
        let document = load_pdf(Path::new(FIXTURE)).unwrap();
        assert_eq!(document.pages.len(), 1);
        assert_eq!(document.pages[0].trim(), "Aspirin reduces fever.");
        assert_eq!(document.metadata["file_name"], "aspirin.pdf");
        assert_eq!(document.metadata["source"], FIXTURE);
    }

    #[test]
    fn document_ids_ignore_how_the_directory_is_spelled() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("nested")).unwrap();
        std::fs::copy(FIXTURE, dir.path().join("aspirin.pdf")).unwrap();
        std::fs::copy(FIXTURE, dir.path().join("nested").join("again.pdf")).unwrap();

        let ids = |root: PathBuf| -> Vec<String> {
            PdfDirectoryLoader::new(root)
                .recursive(true)
                .load()
                .unwrap()
                .into_iter()
                .map(|d| d.id)
                .collect()
        };
        let plain = ids(dir.path().to_path_buf());
        assert_eq!(plain, vec!["aspirin.pdf", "nested/again.pdf"]);
        assert_eq!(ids(dir.path().join(".")), plain);
    }

    #[test]
    fn missing_directory_is_an_error() {
        let err = PdfDirectoryLoader::new("/definitely/not/here").discover().unwrap_err();
        assert!(matches!(err, RagError::LoaderError { .. }));
    }

    #[test]
    fn discovers_only_top_level_pdfs_by_default() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("b.pdf"), b"x").unwrap();
        std::fs::write(dir.path().join("a.pdf"), b"x").unwrap();
        std::fs::write(dir.path().join("notes.txt"), b"x").unwrap();
        std::fs::create_dir(dir.path().join("nested")).unwrap();
        std::fs::write(dir.path().join("nested").join("c.pdf"), b"x").unwrap();

        let flat = PdfDirectoryLoader::new(dir.path()).discover().unwrap();
        let names: Vec<_> =
            flat.iter().map(|p| p.file_name().unwrap().to_string_lossy().into_owned()).collect();
        assert_eq!(names, vec!["a.pdf", "b.pdf"]);

        let deep = PdfDirectoryLoader::new(dir.path()).recursive(true).discover().unwrap();
        assert_eq!(deep.len(), 3);
    }

    #[test]
    fn empty_directory_loads_nothing() {
        let dir = tempfile::tempdir().unwrap();
        assert!(PdfDirectoryLoader::new(dir.path()).load().unwrap().is_empty());
    }

    #[test]
    fn unreadable_pdf_aborts_the_load() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("broken.pdf"), b"this is not a pdf").unwrap();

        let err = PdfDirectoryLoader::new(dir.path()).load().unwrap_err();
        match err {
            RagError::LoaderError { path, .. } => assert!(path.ends_with("broken.pdf")),
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
