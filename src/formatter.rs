//! Document formatting through `djlint --reformat`

use tower_lsp::lsp_types::TextEdit;

use crate::args::Mode;
use crate::errors::DjlintError;
use crate::runner::{Invocation, Runner};

/// Reformat a document.
///
/// Returns a single edit replacing the whole text, or no edits when the
/// language is not configured for formatting or djLint left the text as it
/// was. On failure nothing is returned, so a failed run can never leave a
/// half-applied edit behind.
pub async fn format_document(runner: &Runner, invocation: &Invocation<'_>) -> Result<Vec<TextEdit>, DjlintError> {
    let document = invocation.document;
    if !invocation.settings.formats_language(&document.language_id) {
        log::debug!("Not formatting {}: language '{}' is not enabled", document.uri, document.language_id);
        return Ok(Vec::new());
    }

    let formatted = runner.run(invocation, Mode::Format).await?;
    Ok(edits_for(document, formatted))
}

/// Format and return the new text instead of edits.
pub async fn format_text(runner: &Runner, invocation: &Invocation<'_>) -> Result<String, DjlintError> {
    runner.run(invocation, Mode::Format).await
}

fn edits_for(document: &crate::document::Document, formatted: String) -> Vec<TextEdit> {
    if formatted == document.text {
        return Vec::new();
    }
    vec![TextEdit {
        range: document.full_range(),
        new_text: formatted,
    }]
}
