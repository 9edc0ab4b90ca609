//! Command handlers for the djlint-ls CLI.
//!
//! Each subcommand has its own module with a public handler function
//! that `main()` dispatches to.

pub mod completions;
pub mod format;
pub mod lint;
pub mod server;
pub mod version;

use anyhow::{Context, Result};
use std::io::Read;
use std::path::{Path, PathBuf};

use djlint_ls::Document;
use djlint_ls::config::Settings;
use tower_lsp::lsp_types::Url;

/// A template read from disk or stdin.
pub(crate) struct Source {
    /// Name shown in messages
    pub display: String,
    /// File to write back to; `None` for stdin
    pub path: Option<PathBuf>,
    pub document: Document,
}

/// Defaults, then the settings file, then `--python`.
pub(crate) fn load_settings(config: Option<&str>, python: Option<&str>) -> Result<Settings> {
    let mut settings = Settings::default();

    let file = match config {
        Some(path) => Some(PathBuf::from(path)),
        None => std::env::current_dir().ok().and_then(|cwd| Settings::discover(&cwd)),
    };
    if let Some(file) = file {
        let file_settings = Settings::load_file(&file)?;
        log::debug!("Loaded settings from: {}", file.display());
        settings.merge(&file_settings);
    }

    if let Some(python) = python {
        settings.set("pythonPath", python);
        settings.set("useVenv", false);
    }
    Ok(settings)
}

/// Read every path; `-` reads stdin.
pub(crate) fn read_sources(paths: &[String], language_id: Option<&str>) -> Result<Vec<Source>> {
    let cwd = std::env::current_dir().context("Failed to determine the current directory")?;
    paths.iter().map(|path| read_source(path, language_id, &cwd)).collect()
}

fn read_source(path: &str, language_id: Option<&str>, cwd: &Path) -> Result<Source> {
    if path == "-" {
        let mut text = String::new();
        std::io::stdin()
            .read_to_string(&mut text)
            .context("Failed to read from stdin")?;
        let uri = Url::parse("untitled:stdin").context("Invalid stdin URI")?;
        return Ok(Source {
            display: "<stdin>".to_string(),
            path: None,
            document: Document::new(uri, language_id.unwrap_or("html"), text),
        });
    }

    let absolute = cwd.join(path);
    let text = std::fs::read_to_string(&absolute).with_context(|| format!("Failed to read {path}"))?;
    let document = Document::from_path(&absolute, language_id, text)
        .with_context(|| format!("Cannot build a file URI for {path}"))?;
    Ok(Source {
        display: path.to_string(),
        path: Some(absolute),
        document,
    })
}

/// Current-thread runtime for one-shot commands.
pub(crate) fn runtime() -> Result<tokio::runtime::Runtime> {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("Failed to create Tokio runtime")
}
