//! Owned snapshots of text documents
//!
//! A [`Document`] is what the pipeline needs to know about an open file: its
//! URI, language id and full text. Only `file://` documents have a local path;
//! everything else runs without a working directory.

use std::path::{Path, PathBuf};
use tower_lsp::lsp_types::{Position, Range, Url};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    pub uri: Url,
    pub language_id: String,
    pub version: Option<i32>,
    pub text: String,
}

impl Document {
    pub fn new(uri: Url, language_id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            uri,
            language_id: language_id.into(),
            version: None,
            text: text.into(),
        }
    }

    pub fn with_version(mut self, version: i32) -> Self {
        self.version = Some(version);
        self
    }

    /// Build a document for a file on disk. The path must be absolute.
    pub fn from_path(path: &Path, language_id: Option<&str>, text: impl Into<String>) -> Option<Self> {
        let uri = Url::from_file_path(path).ok()?;
        let language_id = language_id.unwrap_or_else(|| language_id_for_path(path));
        Some(Self::new(uri, language_id, text))
    }

    /// The local filesystem path, for `file://` URIs only.
    pub fn local_path(&self) -> Option<PathBuf> {
        if self.uri.scheme() != "file" {
            return None;
        }
        self.uri.to_file_path().ok()
    }

    pub fn parent_dir(&self) -> Option<PathBuf> {
        self.local_path()?.parent().map(Path::to_path_buf)
    }

    /// The range covering the whole text, in LSP (UTF-16) coordinates.
    pub fn full_range(&self) -> Range {
        Range {
            start: Position::new(0, 0),
            end: end_position(&self.text),
        }
    }
}

/// Position just past the last character of `text`.
pub fn end_position(text: &str) -> Position {
    let line = text.matches('\n').count() as u32;
    let last_line = text.rsplit('\n').next().unwrap_or("");
    let character = last_line.encode_utf16().count() as u32;
    Position::new(line, character)
}

/// The most specific workspace folder containing the document.
pub fn workspace_folder_for(document: &Document, folders: &[PathBuf]) -> Option<PathBuf> {
    let path = document.local_path()?;
    folders
        .iter()
        .filter(|folder| path.starts_with(folder))
        .max_by_key(|folder| folder.components().count())
        .cloned()
}

/// Guess an editor language id from a file extension.
pub fn language_id_for_path(path: &Path) -> &'static str {
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase);

    match extension.as_deref() {
        Some("jinja" | "jinja2" | "j2") => "jinja",
        Some("njk" | "nunjucks") => "nunjucks",
        Some("hbs" | "handlebars") => "handlebars",
        Some("mustache") => "mustache",
        Some("twig") => "twig",
        _ => "html",
    }
}
