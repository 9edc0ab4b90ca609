//! Settings for djlint-ls
//!
//! Settings are a flat key-value object with camelCase keys, the same shape an
//! editor sends under its `djlint` configuration section. Three layers are
//! merged, later layers winning:
//!
//! 1. Built-in defaults ([`Settings::default`])
//! 2. An optional settings file (`djlint-ls.toml` or `.djlint-ls.toml`)
//! 3. Settings pushed by the editor (initialization options,
//!    `workspace/didChangeConfiguration`, `workspace/configuration`)
//!
//! Argument descriptors read their values through the typed accessors
//! ([`Settings::bool`], [`Settings::string`], [`Settings::number`],
//! [`Settings::string_list`]). A missing or wrongly typed value reads as
//! absent.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use std::fs;
use std::path::{Path, PathBuf};

/// Configuration section used by editors and by the settings file.
pub const SECTION: &str = "djlint";

/// File names searched for when discovering a settings file.
pub const CONFIG_FILE_NAMES: [&str; 2] = ["djlint-ls.toml", ".djlint-ls.toml"];

/// Languages formatted and linted unless the user narrows the list.
pub const DEFAULT_LANGUAGES: [&str; 10] = [
    "django-html",
    "handlebars",
    "hbs",
    "html",
    "jinja",
    "jinja-html",
    "nj",
    "njk",
    "nunjucks",
    "twig",
];

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read settings file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse settings file {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: toml::de::Error,
    },

    #[error("Settings must be an object, got: {0}")]
    NotAnObject(String),
}

/// Layered key-value settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Settings {
    values: Map<String, Value>,
}

impl Default for Settings {
    fn default() -> Self {
        let defaults = json!({
            "pythonPath": "python",
            "useVenv": true,
            "useIsolatedEnvironment": false,
            "showInstallError": true,
            "enableLinting": true,
            "guessProfile": true,
            "useEditorIndentation": true,
            "useNewLinterOutputParser": true,
            "diagnosticSeverity": "warning",
            "formatLanguages": DEFAULT_LANGUAGES,
            "lintLanguages": DEFAULT_LANGUAGES,
        });

        match defaults {
            Value::Object(values) => Self { values },
            _ => Self::empty(),
        }
    }
}

impl Settings {
    /// Settings with no values at all, not even defaults.
    pub fn empty() -> Self {
        Self { values: Map::new() }
    }

    /// Build an override layer from a JSON value.
    ///
    /// Accepts either a flat object or one nested under the `djlint` key, which
    /// is what most clients send with `workspace/didChangeConfiguration`.
    /// `null` yields an empty layer.
    pub fn from_value(value: Value) -> Result<Self, ConfigError> {
        match value {
            Value::Null => Ok(Self::empty()),
            Value::Object(mut values) => {
                if let Some(Value::Object(section)) = values.remove(SECTION) {
                    return Ok(Self { values: section });
                }
                Ok(Self { values })
            }
            other => Err(ConfigError::NotAnObject(other.to_string())),
        }
    }

    /// Load an override layer from a TOML settings file.
    pub fn load_file(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml_str(&content).map_err(|source| ConfigError::Parse {
            path: path.display().to_string(),
            source,
        })
    }

    fn from_toml_str(content: &str) -> Result<Self, toml::de::Error> {
        let table: Map<String, Value> = toml::from_str(content)?;
        // Non-object values are impossible here since a TOML document is always a table
        Ok(Self::from_value(Value::Object(table)).unwrap_or_else(|_| Self::empty()))
    }

    /// Find a settings file in `start` or one of its ancestors.
    pub fn discover(start: &Path) -> Option<PathBuf> {
        start.ancestors().find_map(|dir| {
            CONFIG_FILE_NAMES
                .iter()
                .map(|name| dir.join(name))
                .find(|candidate| candidate.is_file())
        })
    }

    /// Overlay `other` on top of these settings. Keys present in `other` win.
    pub fn merge(&mut self, other: &Settings) {
        for (key, value) in &other.values {
            self.values.insert(key.clone(), value.clone());
        }
    }

    /// Return a copy with `other` overlaid.
    pub fn merged(&self, other: &Settings) -> Settings {
        let mut merged = self.clone();
        merged.merge(other);
        merged
    }

    pub fn set(&mut self, key: &str, value: impl Into<Value>) {
        self.values.insert(key.to_string(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// `true` only when the value is the JSON boolean `true`.
    pub fn bool(&self, key: &str) -> bool {
        matches!(self.values.get(key), Some(Value::Bool(true)))
    }

    /// A non-empty string value.
    pub fn string(&self, key: &str) -> Option<&str> {
        match self.values.get(key) {
            Some(Value::String(s)) if !s.is_empty() => Some(s),
            _ => None,
        }
    }

    /// An integral number. Floats without a fractional part are accepted
    /// because some clients serialise every number as a float.
    pub fn number(&self, key: &str) -> Option<i64> {
        let number = self.values.get(key)?.as_number()?;
        if let Some(n) = number.as_i64() {
            return Some(n);
        }
        number
            .as_f64()
            .filter(|f| f.fract() == 0.0 && f.is_finite())
            .map(|f| f as i64)
    }

    /// The string entries of a list value. Non-string entries are skipped.
    pub fn string_list(&self, key: &str) -> Vec<String> {
        match self.values.get(key) {
            Some(Value::Array(items)) => items
                .iter()
                .filter_map(|item| item.as_str())
                .filter(|item| !item.is_empty())
                .map(str::to_string)
                .collect(),
            _ => Vec::new(),
        }
    }

    pub fn python_path(&self) -> Option<&str> {
        self.string("pythonPath")
    }

    pub fn linting_enabled(&self) -> bool {
        self.bool("enableLinting")
    }

    pub fn formats_language(&self, language_id: &str) -> bool {
        self.string_list("formatLanguages").iter().any(|l| l == language_id)
    }

    pub fn lints_language(&self, language_id: &str) -> bool {
        self.string_list("lintLanguages").iter().any(|l| l == language_id)
    }
}
