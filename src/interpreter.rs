//! Python interpreter resolution
//!
//! djLint is a Python module, so every invocation needs an interpreter. The
//! lookup order is:
//!
//! 1. the active Python environment, when `useVenv` is on and an
//!    [`EnvironmentLocator`] can see one
//! 2. the isolated environment, when `useIsolatedEnvironment` is on
//! 3. the `pythonPath` setting
//!
//! and a configuration error when none of these yields a path.

use std::env;
use std::path::{Path, PathBuf};

use crate::config::{SECTION, Settings};
use crate::document::Document;
use crate::errors::DjlintError;
use crate::isolated::IsolatedEnvironment;

/// Directory names treated as project-local virtual environments.
const LOCAL_VENV_DIRS: [&str; 2] = [".venv", "venv"];

/// Answer from an environment locator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Lookup {
    /// The locator has nothing to say; fall through to the next tier
    Unavailable,
    /// An environment is active and this is its interpreter
    Found(PathBuf),
    /// An environment is active but has no usable interpreter
    Missing,
}

/// Integration point for whatever manages Python environments.
pub trait EnvironmentLocator: Send + Sync {
    fn locate(&self, document: &Document, workspace_folder: Option<&Path>) -> Lookup;
}

/// Locator that follows the usual activation conventions.
///
/// Checks `VIRTUAL_ENV`, then `CONDA_PREFIX`, then `.venv`/`venv` in the
/// document's ancestors up to (and including) its workspace folder.
#[derive(Debug, Default, Clone, Copy)]
pub struct ActiveEnvironmentLocator;

impl EnvironmentLocator for ActiveEnvironmentLocator {
    fn locate(&self, document: &Document, workspace_folder: Option<&Path>) -> Lookup {
        for var in ["VIRTUAL_ENV", "CONDA_PREFIX"] {
            if let Some(root) = env::var_os(var).filter(|v| !v.is_empty()) {
                let python = interpreter_in(Path::new(&root));
                log::debug!("{var} is set, expecting interpreter at {}", python.display());
                return if python.is_file() { Lookup::Found(python) } else { Lookup::Missing };
            }
        }

        let Some(start) = document.parent_dir().or_else(|| workspace_folder.map(Path::to_path_buf)) else {
            return Lookup::Unavailable;
        };

        for dir in start.ancestors() {
            for name in LOCAL_VENV_DIRS {
                let python = interpreter_in(&dir.join(name));
                if python.is_file() {
                    return Lookup::Found(python);
                }
            }
            if workspace_folder.is_some_and(|folder| folder == dir) {
                break;
            }
        }

        Lookup::Unavailable
    }
}

/// Path of the interpreter inside a virtual environment root.
pub fn interpreter_in(env_root: &Path) -> PathBuf {
    if cfg!(windows) {
        env_root.join("Scripts").join("python.exe")
    } else {
        env_root.join("bin").join("python")
    }
}

/// Where a resolved interpreter came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InterpreterSource {
    ActiveEnvironment,
    Isolated,
    ConfiguredPath,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Interpreter {
    pub path: PathBuf,
    pub source: InterpreterSource,
}

/// Walk the fallback chain and return the first usable interpreter.
pub async fn resolve(
    settings: &Settings,
    document: &Document,
    workspace_folder: Option<&Path>,
    locator: &dyn EnvironmentLocator,
    isolated: &IsolatedEnvironment,
) -> Result<Interpreter, DjlintError> {
    if settings.bool("useVenv") {
        match locator.locate(document, workspace_folder) {
            Lookup::Found(path) => {
                return Ok(Interpreter {
                    path,
                    source: InterpreterSource::ActiveEnvironment,
                });
            }
            Lookup::Missing => {
                return Err(DjlintError::Configuration(
                    "Failed to get Python interpreter from the active environment.".to_string(),
                ));
            }
            Lookup::Unavailable => {}
        }
    }

    if settings.bool("useIsolatedEnvironment") {
        let path = isolated.ensure().await?;
        return Ok(Interpreter {
            path,
            source: InterpreterSource::Isolated,
        });
    }

    if let Some(path) = settings.python_path() {
        return Ok(Interpreter {
            path: PathBuf::from(path),
            source: InterpreterSource::ConfiguredPath,
        });
    }

    Err(DjlintError::Configuration(format!("Invalid {SECTION}.pythonPath setting.")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use serial_test::serial;
    use std::fs;
    use tower_lsp::lsp_types::Url;

    struct FixedLocator(Lookup);

    impl EnvironmentLocator for FixedLocator {
        fn locate(&self, _: &Document, _: Option<&Path>) -> Lookup {
            self.0.clone()
        }
    }

    fn doc_at(path: &Path) -> Document {
        Document::from_path(path, Some("html"), "").unwrap()
    }

    fn settings(value: serde_json::Value) -> Settings {
        Settings::from_value(value).unwrap()
    }

    fn isolated() -> IsolatedEnvironment {
        IsolatedEnvironment::new(std::env::temp_dir().join("djlint-ls-never-created"))
    }

    fn make_venv(root: &Path) -> PathBuf {
        let python = interpreter_in(root);
        fs::create_dir_all(python.parent().unwrap()).unwrap();
        fs::write(&python, "").unwrap();
        python
    }

    #[tokio::test]
    async fn test_configured_path() {
        let doc = doc_at(Path::new("/srv/app/index.html"));
        let s = settings(json!({ "useVenv": false, "pythonPath": "/usr/bin/python3" }));
        let interpreter = resolve(&s, &doc, None, &ActiveEnvironmentLocator, &isolated()).await.unwrap();
        assert_eq!(interpreter.path, PathBuf::from("/usr/bin/python3"));
        assert_eq!(interpreter.source, InterpreterSource::ConfiguredPath);
    }

    #[tokio::test]
    async fn test_missing_python_path_is_a_configuration_error() {
        let doc = doc_at(Path::new("/srv/app/index.html"));
        let s = settings(json!({ "useVenv": false, "pythonPath": "" }));
        let error = resolve(&s, &doc, None, &ActiveEnvironmentLocator, &isolated()).await.unwrap_err();
        assert!(matches!(error, DjlintError::Configuration(_)));
        assert_eq!(error.to_string(), "Invalid djlint.pythonPath setting.");
    }

    #[tokio::test]
    async fn test_locator_tiers() {
        let doc = doc_at(Path::new("/srv/app/index.html"));
        let s = settings(json!({ "useVenv": true, "pythonPath": "python" }));

        let found = FixedLocator(Lookup::Found(PathBuf::from("/venv/bin/python")));
        let interpreter = resolve(&s, &doc, None, &found, &isolated()).await.unwrap();
        assert_eq!(interpreter.source, InterpreterSource::ActiveEnvironment);

        let missing = FixedLocator(Lookup::Missing);
        let error = resolve(&s, &doc, None, &missing, &isolated()).await.unwrap_err();
        assert_eq!(error.to_string(), "Failed to get Python interpreter from the active environment.");

        let unavailable = FixedLocator(Lookup::Unavailable);
        let interpreter = resolve(&s, &doc, None, &unavailable, &isolated()).await.unwrap();
        assert_eq!(interpreter.path, PathBuf::from("python"));

        // The locator is ignored entirely when useVenv is off
        let off = settings(json!({ "useVenv": false, "pythonPath": "python" }));
        let interpreter = resolve(&off, &doc, None, &missing, &isolated()).await.unwrap();
        assert_eq!(interpreter.source, InterpreterSource::ConfiguredPath);
    }

    #[cfg(unix)]
    #[tokio::test]
    #[serial]
    async fn test_isolated_environment_wins_over_python_path() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let venv = dir.path().join("djlint-venv");
        let python = make_venv(&venv);
        // Stands in for a venv that already has djLint installed
        fs::write(&python, "#!/bin/sh\nexit 0\n").unwrap();
        fs::set_permissions(&python, fs::Permissions::from_mode(0o755)).unwrap();

        let doc = doc_at(&dir.path().join("index.html"));
        let s = settings(json!({
            "useVenv": false,
            "useIsolatedEnvironment": true,
            "pythonPath": "/usr/bin/python3",
        }));
        let isolated = IsolatedEnvironment::new(venv);

        let interpreter = resolve(&s, &doc, None, &ActiveEnvironmentLocator, &isolated).await.unwrap();
        assert_eq!(interpreter.source, InterpreterSource::Isolated);
        assert_eq!(interpreter.path, python);
        assert!(isolated.is_initialized());
    }

    #[test]
    #[serial]
    fn test_active_locator_finds_project_venv() {
        // SAFETY: serialised with the other environment tests
        unsafe {
            env::remove_var("VIRTUAL_ENV");
            env::remove_var("CONDA_PREFIX");
        }
        let dir = tempfile::tempdir().unwrap();
        let python = make_venv(&dir.path().join(".venv"));
        let templates = dir.path().join("app/templates");
        fs::create_dir_all(&templates).unwrap();

        let doc = doc_at(&templates.join("base.html"));
        assert_eq!(
            ActiveEnvironmentLocator.locate(&doc, Some(dir.path())),
            Lookup::Found(python)
        );

        // Stops at the workspace folder
        let inner = dir.path().join("app");
        assert_eq!(ActiveEnvironmentLocator.locate(&doc, Some(&inner)), Lookup::Unavailable);
    }

    #[test]
    #[serial]
    fn test_active_locator_honours_virtual_env() {
        let dir = tempfile::tempdir().unwrap();
        let python = make_venv(dir.path());
        let doc = Document::new(Url::parse("untitled:Untitled-1").unwrap(), "html", "");

        // SAFETY: serialised with the other environment tests
        unsafe {
            env::remove_var("CONDA_PREFIX");
            env::set_var("VIRTUAL_ENV", dir.path());
        }
        assert_eq!(ActiveEnvironmentLocator.locate(&doc, None), Lookup::Found(python));

        unsafe {
            env::set_var("VIRTUAL_ENV", dir.path().join("gone"));
        }
        assert_eq!(ActiveEnvironmentLocator.locate(&doc, None), Lookup::Missing);

        unsafe {
            env::remove_var("VIRTUAL_ENV");
        }
        assert_eq!(ActiveEnvironmentLocator.locate(&doc, None), Lookup::Unavailable);
    }
}
