//! LSP type conversions for djlint-ls

use tower_lsp::lsp_types::*;

use crate::config::Settings;
use crate::parser::LintRecord;

/// Source reported on every diagnostic.
pub const DIAGNOSTIC_SOURCE: &str = "djlint";

/// Message actions offered with error notifications.
pub const DETAILS_ACTION: &str = "Details";
pub const HIDE_FOR_WORKSPACE_ACTION: &str = "Do not show again (workspace)";
pub const HIDE_GLOBALLY_ACTION: &str = "Do not show again (global)";

/// Parse the `diagnosticSeverity` setting; unknown values fall back to warning.
pub fn severity_from_settings(settings: &Settings) -> DiagnosticSeverity {
    match settings.string("diagnosticSeverity").map(str::to_ascii_lowercase).as_deref() {
        Some("error") => DiagnosticSeverity::ERROR,
        Some("information" | "info") => DiagnosticSeverity::INFORMATION,
        Some("hint") => DiagnosticSeverity::HINT,
        _ => DiagnosticSeverity::WARNING,
    }
}

/// Convert a djLint record into a zero-width diagnostic at its position.
pub fn record_to_diagnostic(record: &LintRecord, severity: DiagnosticSeverity) -> Diagnostic {
    let position = Position {
        line: record.line,
        character: record.column,
    };

    Diagnostic {
        range: Range {
            start: position,
            end: position,
        },
        severity: Some(severity),
        code: Some(NumberOrString::String(record.code.clone())),
        source: Some(DIAGNOSTIC_SOURCE.to_string()),
        message: record.label(),
        related_information: None,
        tags: None,
        code_description: None,
        data: None,
    }
}

pub fn action(title: &str) -> MessageActionItem {
    MessageActionItem {
        title: title.to_string(),
        properties: Default::default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_record_to_diagnostic() {
        let record = LintRecord {
            line: 4,
            column: 2,
            code: "H1".to_string(),
            message: "Bad tag".to_string(),
        };
        let diagnostic = record_to_diagnostic(&record, DiagnosticSeverity::WARNING);
        assert_eq!(diagnostic.range.start, Position::new(4, 2));
        assert_eq!(diagnostic.range.end, Position::new(4, 2));
        assert_eq!(diagnostic.message, "Bad tag (H1)");
        assert_eq!(diagnostic.code, Some(NumberOrString::String("H1".to_string())));
        assert_eq!(diagnostic.source.as_deref(), Some("djlint"));
    }

    #[test]
    fn test_severity_from_settings() {
        let severity = |value: &str| {
            let settings = Settings::from_value(json!({ "diagnosticSeverity": value })).unwrap();
            severity_from_settings(&settings)
        };
        assert_eq!(severity("Error"), DiagnosticSeverity::ERROR);
        assert_eq!(severity("information"), DiagnosticSeverity::INFORMATION);
        assert_eq!(severity("hint"), DiagnosticSeverity::HINT);
        assert_eq!(severity("nonsense"), DiagnosticSeverity::WARNING);
        assert_eq!(severity_from_settings(&Settings::empty()), DiagnosticSeverity::WARNING);
    }
}
