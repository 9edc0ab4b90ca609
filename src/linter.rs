//! Document linting through `djlint --lint`

use tower_lsp::lsp_types::Diagnostic;

use crate::args::Mode;
use crate::errors::DjlintError;
use crate::lsp::types::{record_to_diagnostic, severity_from_settings};
use crate::parser::{self, LintRecord, OutputFormat};
use crate::runner::{Invocation, Runner};

/// Whether a document should be linted at all under these settings.
pub fn should_lint(invocation: &Invocation<'_>) -> bool {
    invocation.settings.linting_enabled() && invocation.settings.lints_language(&invocation.document.language_id)
}

/// Lint a document and return the parsed records.
pub async fn lint_records(runner: &Runner, invocation: &Invocation<'_>) -> Result<Vec<LintRecord>, DjlintError> {
    if !should_lint(invocation) {
        return Ok(Vec::new());
    }

    let stdout = runner.run(invocation, Mode::Lint).await?;
    let records = parser::parse(&stdout, OutputFormat::from_settings(invocation.settings));
    log::debug!("{} problem(s) in {}", records.len(), invocation.document.uri);
    Ok(records)
}

/// Lint a document and return editor diagnostics.
pub async fn lint_document(runner: &Runner, invocation: &Invocation<'_>) -> Result<Vec<Diagnostic>, DjlintError> {
    let severity = severity_from_settings(invocation.settings);
    let records = lint_records(runner, invocation).await?;
    Ok(records.iter().map(|record| record_to_diagnostic(record, severity)).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Settings;
    use crate::document::Document;
    use crate::isolated::IsolatedEnvironment;
    use serde_json::json;
    use tower_lsp::lsp_types::Url;

    fn runner() -> Runner {
        Runner::new(IsolatedEnvironment::new(std::env::temp_dir().join("djlint-ls-unused")))
    }

    #[test]
    fn test_should_lint() {
        let doc = Document::new(Url::parse("file:///tmp/a.html").unwrap(), "html", "");
        let md = Document::new(Url::parse("file:///tmp/a.md").unwrap(), "markdown", "");
        let on = Settings::default();
        let mut off = Settings::default();
        off.set("enableLinting", false);

        assert!(should_lint(&Invocation::new(&doc, &on)));
        assert!(!should_lint(&Invocation::new(&md, &on)));
        assert!(!should_lint(&Invocation::new(&doc, &off)));
    }

    #[tokio::test]
    async fn test_disabled_linting_never_runs_the_tool() {
        // An invalid interpreter would fail if the tool were run
        let settings = Settings::from_value(json!({ "enableLinting": false, "pythonPath": "" })).unwrap();
        let doc = Document::new(Url::parse("file:///tmp/a.html").unwrap(), "html", "<div>");
        let records = lint_records(&runner(), &Invocation::new(&doc, &settings)).await.unwrap();
        assert!(records.is_empty());
    }
}
