//! Parsing of djLint's lint report
//!
//! djLint prints one problem per line in one of two layouts:
//!
//! - legacy: `H006 3:10 Img tag should have height and width attributes.`
//! - delimited (`--linter-output-format`):
//!   `<filename>-</filename><line>3:10</line><code>H006</code><message>...</message>`
//!
//! Lines matching neither layout (headers, summaries, blank lines) are skipped.

use std::sync::LazyLock;

use regex::Regex;

static LEGACY_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^([A-Z]+\d+)\s+(\d+):(\d+)\s+(.+?)\r?$").unwrap());

static DELIMITED_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?m)^<filename>(.*)</filename><line>(\d+):(\d+)</line><code>(.+)</code><message>(.+)</message>\r?$",
    )
    .unwrap()
});

/// Which report layout to expect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Legacy,
    Delimited,
}

impl OutputFormat {
    pub fn from_settings(settings: &crate::config::Settings) -> Self {
        if settings.bool("useNewLinterOutputParser") {
            OutputFormat::Delimited
        } else {
            OutputFormat::Legacy
        }
    }
}

/// One problem reported by djLint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LintRecord {
    /// 0-based line
    pub line: u32,
    /// Column as printed by djLint
    pub column: u32,
    pub code: String,
    pub message: String,
}

impl LintRecord {
    /// Message shown in the editor, e.g. `Bad tag (H1)`.
    pub fn label(&self) -> String {
        format!("{} ({})", self.message, self.code)
    }
}

pub fn parse(stdout: &str, format: OutputFormat) -> Vec<LintRecord> {
    match format {
        OutputFormat::Legacy => parse_legacy(stdout),
        OutputFormat::Delimited => parse_delimited(stdout),
    }
}

pub fn parse_legacy(stdout: &str) -> Vec<LintRecord> {
    LEGACY_REGEX
        .captures_iter(stdout)
        .filter_map(|caps| record(&caps[2], &caps[3], &caps[1], &caps[4]))
        .collect()
}

pub fn parse_delimited(stdout: &str) -> Vec<LintRecord> {
    DELIMITED_REGEX
        .captures_iter(stdout)
        .filter_map(|caps| record(&caps[2], &caps[3], &caps[4], &caps[5]))
        .collect()
}

fn record(line: &str, column: &str, code: &str, message: &str) -> Option<LintRecord> {
    // Out-of-range numbers are treated like any other unmatched line
    let line: u32 = line.parse().ok()?;
    let column: u32 = column.parse().ok()?;
    Some(LintRecord {
        line: line.saturating_sub(1),
        column,
        code: code.to_string(),
        message: message.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_legacy_single_record() {
        let records = parse_legacy("E001 3:10 Some message\n");
        assert_eq!(
            records,
            vec![LintRecord {
                line: 2,
                column: 10,
                code: "E001".to_string(),
                message: "Some message".to_string(),
            }]
        );
        assert_eq!(records[0].label(), "Some message (E001)");
    }

    #[test]
    fn test_delimited_single_record() {
        let records =
            parse_delimited("<filename>a.html</filename><line>5:2</line><code>H1</code><message>Bad tag</message>");
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].line, 4);
        assert_eq!(records[0].column, 2);
        assert_eq!(records[0].label(), "Bad tag (H1)");
    }

    #[test]
    fn test_legacy_ignores_noise() {
        let stdout = "\nLinting 1/1 files\n-\n─────────\nH006 1:0 Img tag should have height and width attributes.\nT003 12:4 Endblock should have name. Ex: {% endblock body %}.\n\n1 file linted, found 2 errors.\n";
        let records = parse_legacy(stdout);
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].code, "H006");
        assert_eq!(records[0].line, 0);
        assert_eq!(records[1].code, "T003");
        assert_eq!(records[1].line, 11);
        assert_eq!(records[1].column, 4);
        assert_eq!(records[1].message, "Endblock should have name. Ex: {% endblock body %}.");
    }

    #[test]
    fn test_crlf_output() {
        let records = parse_legacy("H025 2:0 Orphan tag found.\r\n");
        assert_eq!(records[0].message, "Orphan tag found.");

        let records =
            parse_delimited("<filename>-</filename><line>2:0</line><code>H025</code><message>Orphan tag</message>\r\n");
        assert_eq!(records[0].message, "Orphan tag");
    }

    #[test]
    fn test_formats_do_not_cross_parse() {
        let delimited = "<filename>-</filename><line>1:0</line><code>H005</code><message>Html tag should have lang attribute.</message>";
        assert!(parse_legacy(delimited).is_empty());
        assert!(parse_delimited("H005 1:0 Html tag should have lang attribute.").is_empty());
    }

    #[test]
    fn test_line_zero_saturates() {
        let records = parse_legacy("H001 0:0 Weird\n");
        assert_eq!(records[0].line, 0);
    }

    #[test]
    fn test_format_selection() {
        let mut settings = crate::config::Settings::empty();
        assert_eq!(OutputFormat::from_settings(&settings), OutputFormat::Legacy);
        settings.set("useNewLinterOutputParser", true);
        assert_eq!(OutputFormat::from_settings(&settings), OutputFormat::Delimited);
        assert_eq!(parse("H1 1:1 x", OutputFormat::Legacy).len(), 1);
    }
}
