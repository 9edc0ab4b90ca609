//! Argument descriptors: editor settings rendered as djLint flags
//!
//! Each [`CliArg`] pairs one setting with one command-line flag and the djLint
//! version that introduced the flag. The tables below are the whole surface
//! the server exposes; their order is the order of the final argument list.

use crate::config::Settings;
use crate::document::Document;
use tower_lsp::lsp_types::FormattingOptions;

/// Template passed to `--linter-output-format` when the delimited parser is on.
pub const DELIMITED_OUTPUT_TEMPLATE: &str =
    "<filename>{filename}</filename><line>{line}</line><code>{code}</code><message>{message}</message>";

/// How a descriptor turns its setting into tokens.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArgKind {
    /// Always present, no setting involved
    Fixed,
    /// Flag alone when the setting is `true`
    Bool,
    /// Flag and value when the setting is a non-empty string
    String,
    /// Flag and comma-joined value when the setting is a non-empty list
    StringList,
    /// Flag and value when the setting is a number; `null` means "tool default"
    NumberOrNull,
    /// Flag and a fixed value when the setting is `true`
    Template(&'static str),
    /// `profile`, or a profile guessed from the language id
    Profile,
    /// Editor tab size, or the `indentation` setting
    Indentation,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CliArg {
    pub kind: ArgKind,
    pub setting: Option<&'static str>,
    pub cli_name: &'static str,
    pub min_version: Option<&'static str>,
}

impl CliArg {
    const fn fixed(cli_name: &'static str) -> Self {
        Self {
            kind: ArgKind::Fixed,
            setting: None,
            cli_name,
            min_version: None,
        }
    }

    const fn with(kind: ArgKind, setting: &'static str, cli_name: &'static str, min_version: &'static str) -> Self {
        Self {
            kind,
            setting: Some(setting),
            cli_name,
            min_version: Some(min_version),
        }
    }

    /// Render this descriptor into zero or more command-line tokens.
    pub fn render(
        &self,
        settings: &Settings,
        document: &Document,
        formatting_options: Option<&FormattingOptions>,
    ) -> Vec<String> {
        let flag = self.cli_name.to_string();
        let key = self.setting.unwrap_or_default();

        match self.kind {
            ArgKind::Fixed => vec![flag],
            ArgKind::Bool => {
                if settings.bool(key) {
                    vec![flag]
                } else {
                    Vec::new()
                }
            }
            ArgKind::String => match settings.string(key) {
                Some(value) => vec![flag, value.to_string()],
                None => Vec::new(),
            },
            ArgKind::StringList => {
                let values = settings.string_list(key);
                if values.is_empty() {
                    Vec::new()
                } else {
                    vec![flag, values.join(",")]
                }
            }
            ArgKind::NumberOrNull => match settings.number(key) {
                Some(value) => vec![flag, value.to_string()],
                None => Vec::new(),
            },
            ArgKind::Template(value) => {
                if settings.bool(key) {
                    vec![flag, value.to_string()]
                } else {
                    Vec::new()
                }
            }
            ArgKind::Profile => {
                let profile = settings.string(key).or_else(|| {
                    if settings.bool("guessProfile") {
                        guess_profile(&document.language_id)
                    } else {
                        None
                    }
                });
                match profile {
                    Some(profile) => vec![flag, profile.to_string()],
                    None => Vec::new(),
                }
            }
            ArgKind::Indentation => {
                let from_editor = formatting_options
                    .filter(|_| settings.bool("useEditorIndentation"))
                    .map(|options| i64::from(options.tab_size));
                match from_editor.or_else(|| settings.number(key)) {
                    Some(size) => vec![flag, size.to_string()],
                    None => Vec::new(),
                }
            }
        }
    }

    /// The user-facing name of the setting behind this flag.
    pub fn display_name(&self) -> String {
        match self.setting {
            Some(setting) => format!("{}.{setting}", crate::config::SECTION),
            None => self.cli_name.to_string(),
        }
    }
}

/// Map an editor language id onto a djLint profile.
pub fn guess_profile(language_id: &str) -> Option<&'static str> {
    match language_id {
        "django-html" => Some("django"),
        "handlebars" | "hbs" | "mustache" => Some("handlebars"),
        "jinja" | "jinja-html" => Some("jinja"),
        "nj" | "njk" | "nunjucks" | "twig" => Some("nunjucks"),
        _ => None,
    }
}

pub const CONFIGURATION_ARG: CliArg = CliArg::with(ArgKind::String, "configuration", "--configuration", "1.13.0");

pub static COMMON_ARGS: &[CliArg] = &[
    CONFIGURATION_ARG,
    CliArg::with(ArgKind::Profile, "profile", "--profile", "0.7.0"),
    CliArg::with(ArgKind::StringList, "customBlocks", "--custom-blocks", "1.5.0"),
    CliArg::with(ArgKind::StringList, "customHtml", "--custom-html", "1.5.0"),
    CliArg::with(ArgKind::NumberOrNull, "maxLineLength", "--max-line-length", "1.25.0"),
    CliArg::with(ArgKind::NumberOrNull, "maxAttributeLength", "--max-attribute-length", "1.25.0"),
    CliArg::with(ArgKind::Bool, "requirePragma", "--require-pragma", "1.19.0"),
    CliArg::with(ArgKind::Bool, "ignoreCase", "--ignore-case", "1.19.0"),
];

pub static FORMATTING_ARGS: &[CliArg] = &[
    CliArg::fixed("--reformat"),
    CliArg::with(ArgKind::Indentation, "indentation", "--indent", "1.0.0"),
    CliArg::with(ArgKind::Bool, "formatAttributeTemplateTags", "--format-attribute-template-tags", "1.25.0"),
    CliArg::with(ArgKind::Bool, "formatCss", "--format-css", "1.9.0"),
    CliArg::with(ArgKind::Bool, "formatJs", "--format-js", "1.9.0"),
    CliArg::with(ArgKind::NumberOrNull, "indentCss", "--indent-css", "1.9.0"),
    CliArg::with(ArgKind::NumberOrNull, "indentJs", "--indent-js", "1.9.0"),
    CliArg::with(ArgKind::Bool, "preserveBlankLines", "--preserve-blank-lines", "1.3.0"),
    CliArg::with(ArgKind::Bool, "preserveLeadingSpace", "--preserve-leading-space", "1.2.0"),
    CliArg::with(ArgKind::NumberOrNull, "maxBlankLines", "--max-blank-lines", "1.25.0"),
    CliArg::with(ArgKind::StringList, "blankLineAfterTag", "--blank-line-after-tag", "1.25.0"),
    CliArg::with(ArgKind::StringList, "blankLineBeforeTag", "--blank-line-before-tag", "1.25.0"),
    CliArg::with(ArgKind::Bool, "closeVoidTags", "--close-void-tags", "1.25.0"),
    CliArg::with(ArgKind::Bool, "lineBreakAfterMultilineTag", "--line-break-after-multiline-tag", "1.25.0"),
    CliArg::with(ArgKind::StringList, "ignoreBlocks", "--ignore-blocks", "1.25.0"),
    CliArg::with(ArgKind::Bool, "noLineAfterYaml", "--no-line-after-yaml", "1.29.0"),
    CliArg::with(ArgKind::Bool, "noFunctionFormatting", "--no-function-formatting", "1.32.0"),
    CliArg::with(ArgKind::Bool, "noSetFormatting", "--no-set-formatting", "1.32.0"),
];

pub static LINTING_ARGS: &[CliArg] = &[
    CliArg::fixed("--lint"),
    CliArg::with(ArgKind::StringList, "ignore", "--ignore", "1.0.0"),
    CliArg::with(ArgKind::StringList, "include", "--include", "1.0.0"),
    CliArg::with(
        ArgKind::Template(DELIMITED_OUTPUT_TEMPLATE),
        "useNewLinterOutputParser",
        "--linter-output-format",
        "1.25.0",
    ),
];

/// Which of the two tool operations an invocation performs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Format,
    Lint,
}

impl Mode {
    /// Mode-specific descriptors first, then the shared ones.
    pub fn descriptors(self) -> impl Iterator<Item = &'static CliArg> {
        let specific = match self {
            Mode::Format => FORMATTING_ARGS,
            Mode::Lint => LINTING_ARGS,
        };
        specific.iter().chain(COMMON_ARGS.iter())
    }

    pub fn build(
        self,
        settings: &Settings,
        document: &Document,
        formatting_options: Option<&FormattingOptions>,
    ) -> Vec<String> {
        self.descriptors()
            .flat_map(|arg| arg.render(settings, document, formatting_options))
            .collect()
    }
}

/// Look a descriptor up by its flag, across every table.
pub fn find_by_cli_name(cli_name: &str) -> Option<&'static CliArg> {
    COMMON_ARGS
        .iter()
        .chain(FORMATTING_ARGS.iter())
        .chain(LINTING_ARGS.iter())
        .find(|arg| arg.cli_name == cli_name)
}
