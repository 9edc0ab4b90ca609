//! Persistent "do not show again" choices for the not-installed message
//!
//! Stored as JSON in the platform data directory so the choice survives
//! restarts. A workspace choice applies to one workspace folder; a global
//! choice applies everywhere.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::config::Settings;

const STATE_FILE_NAME: &str = "state.json";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SuppressionScope {
    Global,
    Workspace(PathBuf),
}

#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SuppressionState {
    #[serde(default)]
    hide_install_error_globally: bool,
    #[serde(default)]
    hide_install_error_in: BTreeSet<String>,
}

#[derive(Debug)]
pub struct SuppressionStore {
    path: Option<PathBuf>,
    state: Mutex<SuppressionState>,
}

impl SuppressionStore {
    /// A store that forgets everything on exit.
    pub fn in_memory() -> Self {
        Self {
            path: None,
            state: Mutex::new(SuppressionState::default()),
        }
    }

    /// Open (or start) the store at `path`. Unreadable files start empty.
    pub fn open(path: PathBuf) -> Self {
        let state = match fs::read_to_string(&path) {
            Ok(content) => serde_json::from_str(&content).unwrap_or_else(|e| {
                log::warn!("Ignoring unreadable state file {}: {e}", path.display());
                SuppressionState::default()
            }),
            Err(e) if e.kind() == io::ErrorKind::NotFound => SuppressionState::default(),
            Err(e) => {
                log::warn!("Failed to read state file {}: {e}", path.display());
                SuppressionState::default()
            }
        };
        Self {
            path: Some(path),
            state: Mutex::new(state),
        }
    }

    /// The store in the platform data directory, or an in-memory one when
    /// there is no such directory.
    pub fn open_default() -> Self {
        use etcetera::{BaseStrategy, choose_base_strategy};

        match choose_base_strategy() {
            Ok(strategy) => Self::open(strategy.data_dir().join("djlint-ls").join(STATE_FILE_NAME)),
            Err(e) => {
                log::debug!("Failed to determine data directory, suppressions will not persist: {e}");
                Self::in_memory()
            }
        }
    }

    pub fn is_suppressed(&self, workspace_folder: Option<&Path>) -> bool {
        let state = self.lock();
        state.hide_install_error_globally
            || workspace_folder.is_some_and(|folder| state.hide_install_error_in.contains(&key(folder)))
    }

    /// Record a choice and write it to disk.
    pub fn suppress(&self, scope: SuppressionScope) -> io::Result<()> {
        let snapshot = {
            let mut state = self.lock();
            match scope {
                SuppressionScope::Global => state.hide_install_error_globally = true,
                SuppressionScope::Workspace(folder) => {
                    state.hide_install_error_in.insert(key(&folder));
                }
            }
            state.clone()
        };
        self.save(&snapshot)
    }

    /// Apply stored choices to the effective settings for a document.
    pub fn apply(&self, settings: &mut Settings, workspace_folder: Option<&Path>) {
        if self.is_suppressed(workspace_folder) {
            settings.set("showInstallError", false);
        }
    }

    fn save(&self, state: &SuppressionState) -> io::Result<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(state).map_err(io::Error::other)?;
        fs::write(path, content)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, SuppressionState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

fn key(folder: &Path) -> String {
    folder.display().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_workspace_scope() {
        let store = SuppressionStore::in_memory();
        let project = Path::new("/srv/project");
        assert!(!store.is_suppressed(Some(project)));

        store.suppress(SuppressionScope::Workspace(project.to_path_buf())).unwrap();
        assert!(store.is_suppressed(Some(project)));
        assert!(!store.is_suppressed(Some(Path::new("/srv/other"))));
        assert!(!store.is_suppressed(None));
    }

    #[test]
    fn test_global_scope_and_apply() {
        let store = SuppressionStore::in_memory();
        store.suppress(SuppressionScope::Global).unwrap();
        assert!(store.is_suppressed(None));

        let mut settings = Settings::default();
        store.apply(&mut settings, None);
        assert!(!settings.bool("showInstallError"));
    }

    #[test]
    fn test_choices_persist() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/state.json");

        let store = SuppressionStore::open(path.clone());
        store
            .suppress(SuppressionScope::Workspace(PathBuf::from("/srv/project")))
            .unwrap();

        let reopened = SuppressionStore::open(path);
        assert!(reopened.is_suppressed(Some(Path::new("/srv/project"))));
        assert!(!reopened.is_suppressed(None));
    }

    #[test]
    fn test_corrupt_state_starts_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");
        fs::write(&path, "{ not json").unwrap();
        let store = SuppressionStore::open(path);
        assert!(!store.is_suppressed(None));
    }
}
