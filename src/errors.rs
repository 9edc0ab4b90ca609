//! Error classification for djLint invocations
//!
//! djLint reports most problems on stderr with a non-zero exit code, but a
//! non-zero exit code alone does not mean failure: linting exits with 1 when it
//! finds problems, and reformatting exits with 1 when it changed something.
//! [`classify`] sorts stderr into the cases the rest of the server cares about.

use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;

use crate::args::{CliArg, find_by_cli_name};

static NOT_AN_ERROR_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?:^$|Linting\s+\d+/\d+\s+files)").unwrap());

static NOT_INSTALLED_REGEX: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"No\s+module\s+named\s+djlint").unwrap());

static NO_SUCH_OPTION_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"No\s+such\s+option:\s*(?<option>\S+)").unwrap());

/// What a failed invocation's stderr means.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    /// Empty stderr or progress output; stdout is the result
    NotAnError,
    /// The interpreter has no djlint module
    NotInstalled,
    /// The installed djLint is too old for one of our flags
    UnsupportedOption(&'static CliArg),
    /// Anything else; pass stderr through
    Unknown,
}

pub fn classify(stderr: &str) -> Classification {
    if NOT_AN_ERROR_REGEX.is_match(stderr) {
        return Classification::NotAnError;
    }
    if NOT_INSTALLED_REGEX.is_match(stderr) {
        return Classification::NotInstalled;
    }
    if let Some(caps) = NO_SUCH_OPTION_REGEX.captures(stderr)
        && let Some(arg) = find_by_cli_name(&caps["option"])
    {
        return Classification::UnsupportedOption(arg);
    }
    Classification::Unknown
}

/// Everything worth knowing about a failed subprocess, kept for the detail log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FailureReport {
    pub program: String,
    pub args: Vec<String>,
    pub cwd: Option<String>,
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl FailureReport {
    pub fn to_json(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_else(|_| format!("{self:?}"))
    }
}

#[derive(Debug, thiserror::Error)]
pub enum DjlintError {
    /// No usable interpreter could be resolved.
    #[error("{0}")]
    Configuration(String),

    #[error(
        "djLint is not installed for the current active Python interpreter. Install it with the `{} -m pip install -U djlint` command.",
        .python.display()
    )]
    NotInstalled {
        python: PathBuf,
        report: Box<FailureReport>,
    },

    #[error(
        "Your version of djLint does not support the `{option}` option. Disable it in the settings or update djLint with the `{} -m pip install -U djlint>={min_version}` command.",
        .python.display()
    )]
    UnsupportedOption {
        option: String,
        min_version: String,
        python: PathBuf,
        report: Box<FailureReport>,
    },

    /// Unrecognised failure; the message is djLint's own stderr.
    #[error("{message}")]
    Tool {
        message: String,
        report: Box<FailureReport>,
    },

    #[error("Failed to run {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{0}")]
    IsolatedEnvironment(String),
}

impl DjlintError {
    /// Turn a failed run into the matching error, or `None` when the run
    /// actually succeeded.
    ///
    /// A run without an exit code was killed by a signal; its stdout is
    /// truncated whatever stderr says.
    pub fn from_failure(python: &Path, report: FailureReport) -> Option<Self> {
        if report.exit_code.is_none() {
            return Some(DjlintError::Tool {
                message: "djLint was terminated by a signal".to_string(),
                report: Box::new(report),
            });
        }

        let error = match classify(&report.stderr) {
            Classification::NotAnError => return None,
            Classification::NotInstalled => DjlintError::NotInstalled {
                python: python.to_path_buf(),
                report: Box::new(report),
            },
            Classification::UnsupportedOption(arg) => DjlintError::UnsupportedOption {
                option: arg.display_name(),
                min_version: arg.min_version.unwrap_or("0").to_string(),
                python: python.to_path_buf(),
                report: Box::new(report),
            },
            Classification::Unknown => {
                let stderr = report.stderr.trim();
                let message = if stderr.is_empty() {
                    format!("djLint exited with code {}", exit_code_label(report.exit_code))
                } else {
                    stderr.to_string()
                };
                DjlintError::Tool {
                    message,
                    report: Box::new(report),
                }
            }
        };
        Some(error)
    }

    /// Failures that will repeat until the user changes something.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            DjlintError::Configuration(_)
                | DjlintError::NotInstalled { .. }
                | DjlintError::UnsupportedOption { .. }
                | DjlintError::Spawn { .. }
        )
    }

    pub fn report(&self) -> Option<&FailureReport> {
        match self {
            DjlintError::NotInstalled { report, .. }
            | DjlintError::UnsupportedOption { report, .. }
            | DjlintError::Tool { report, .. } => Some(report),
            _ => None,
        }
    }

    /// Full detail for logs: the message plus the structured report, if any.
    pub fn details(&self) -> String {
        match self.report() {
            Some(report) => format!("{self}\n{}", report.to_json()),
            None => self.to_string(),
        }
    }
}

fn exit_code_label(code: Option<i32>) -> String {
    code.map_or_else(|| "unknown".to_string(), |code| code.to_string())
}
