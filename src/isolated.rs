//! Isolated djLint environment
//!
//! A private virtual environment with djLint installed, used when the user
//! opts into `useIsolatedEnvironment` instead of relying on their own Python
//! setup. It is created lazily on first use and reused afterwards.
//!
//! Only these setup steps carry timeouts; djLint runs themselves do not.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tokio::process::Command;
use tokio::sync::Mutex;

use crate::errors::DjlintError;
use crate::interpreter::interpreter_in;

const VALIDATE_TIMEOUT: Duration = Duration::from_secs(10);
const PROBE_TIMEOUT: Duration = Duration::from_secs(5);
const CREATE_TIMEOUT: Duration = Duration::from_secs(30);
const INSTALL_TIMEOUT: Duration = Duration::from_secs(120);

/// Directory name of the environment under the data directory.
pub const VENV_DIR_NAME: &str = "djlint-venv";

#[cfg(windows)]
const BASE_PYTHON_CANDIDATES: &[&str] = &["python", "python3", "py"];
#[cfg(not(windows))]
const BASE_PYTHON_CANDIDATES: &[&str] = &["python3", "python"];

pub struct IsolatedEnvironment {
    venv_path: PathBuf,
    python: PathBuf,
    initialized: AtomicBool,
    /// Serialises initialisation so concurrent callers share one setup
    init_lock: Mutex<()>,
}

impl IsolatedEnvironment {
    pub fn new(venv_path: PathBuf) -> Self {
        let python = interpreter_in(&venv_path);
        Self {
            venv_path,
            python,
            initialized: AtomicBool::new(false),
            init_lock: Mutex::new(()),
        }
    }

    /// Environment in the platform data directory, e.g.
    /// `~/.local/share/djlint-ls/djlint-venv` on Linux.
    pub fn in_data_dir() -> Self {
        use etcetera::{BaseStrategy, choose_base_strategy};

        let base = match choose_base_strategy() {
            Ok(strategy) => strategy.data_dir().join("djlint-ls"),
            Err(e) => {
                log::debug!("Failed to determine data directory, using temp dir: {e}");
                std::env::temp_dir().join("djlint-ls")
            }
        };
        Self::new(base.join(VENV_DIR_NAME))
    }

    pub fn venv_path(&self) -> &Path {
        &self.venv_path
    }

    pub fn python(&self) -> &Path {
        &self.python
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized.load(Ordering::Acquire)
    }

    /// Make sure the environment exists and has djLint, and return its
    /// interpreter. Failures are not remembered; the next call retries.
    pub async fn ensure(&self) -> Result<PathBuf, DjlintError> {
        if self.is_initialized() {
            return Ok(self.python.clone());
        }

        let _guard = self.init_lock.lock().await;
        // Another caller may have finished while we waited
        if self.is_initialized() {
            return Ok(self.python.clone());
        }

        if let Err(e) = self.initialize().await {
            log::error!("Failed to initialize isolated djLint environment: {e}");
            return Err(e);
        }
        self.initialized.store(true, Ordering::Release);
        Ok(self.python.clone())
    }

    /// Forget the initialised state. The directory stays on disk because
    /// another server instance may be using it.
    pub fn dispose(&self) {
        self.initialized.store(false, Ordering::Release);
    }

    async fn initialize(&self) -> Result<(), DjlintError> {
        if self.is_valid().await {
            log::info!("Using existing djLint virtual environment at {}", self.venv_path.display());
            return Ok(());
        }

        log::info!("Setting up isolated djLint environment at {}", self.venv_path.display());
        self.create_venv().await?;
        self.install_djlint().await?;
        log::info!("djLint isolated environment setup completed");
        Ok(())
    }

    async fn is_valid(&self) -> bool {
        if !self.python.is_file() {
            return false;
        }
        run_quiet(&self.python, &["-m", "djlint", "--version"], VALIDATE_TIMEOUT)
            .await
            .is_ok()
    }

    async fn create_venv(&self) -> Result<(), DjlintError> {
        if self.venv_path.exists() {
            tokio::fs::remove_dir_all(&self.venv_path).await.map_err(|e| {
                DjlintError::IsolatedEnvironment(format!(
                    "Failed to remove invalid environment {}: {e}",
                    self.venv_path.display()
                ))
            })?;
        }

        let base = find_base_python().await?;
        let venv = self.venv_path.to_string_lossy();
        run_quiet(Path::new(base), &["-m", "venv", venv.as_ref()], CREATE_TIMEOUT)
            .await
            .map_err(|e| DjlintError::IsolatedEnvironment(format!("Failed to create virtual environment: {e}")))
    }

    async fn install_djlint(&self) -> Result<(), DjlintError> {
        run_quiet(&self.python, &["-m", "pip", "install", "-U", "djlint"], INSTALL_TIMEOUT)
            .await
            .map_err(|e| {
                log::error!("Failed to install djLint in isolated environment: {e}");
                DjlintError::IsolatedEnvironment(
                    "Failed to install djLint in isolated environment. Check your internet connection and try again."
                        .to_string(),
                )
            })
    }
}

impl std::fmt::Debug for IsolatedEnvironment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IsolatedEnvironment")
            .field("venv_path", &self.venv_path)
            .field("initialized", &self.is_initialized())
            .finish()
    }
}

/// First interpreter on PATH that can create virtual environments.
async fn find_base_python() -> Result<&'static str, DjlintError> {
    for &candidate in BASE_PYTHON_CANDIDATES {
        match run_quiet(Path::new(candidate), &["-m", "venv", "--help"], PROBE_TIMEOUT).await {
            Ok(()) => return Ok(candidate),
            Err(e) => log::debug!("{candidate} cannot create virtual environments: {e}"),
        }
    }
    Err(DjlintError::IsolatedEnvironment(
        "No suitable Python executable found. Python 3.3+ is required.".to_string(),
    ))
}

/// Run a setup command, discarding its output, within `timeout`.
async fn run_quiet(program: &Path, args: &[&str], timeout: Duration) -> Result<(), String> {
    let mut cmd = Command::new(program);
    cmd.args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    let child = cmd
        .spawn()
        .map_err(|e| format!("failed to spawn '{}': {e}", program.display()))?;

    let output = tokio::time::timeout(timeout, child.wait_with_output())
        .await
        .map_err(|_| format!("'{}' timed out after {}s", program.display(), timeout.as_secs()))?
        .map_err(|e| format!("failed to wait for '{}': {e}", program.display()))?;

    if output.status.success() {
        Ok(())
    } else {
        Err(format!(
            "'{}' exited with {}: {}",
            program.display(),
            output.status,
            String::from_utf8_lossy(&output.stderr).trim()
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_paths() {
        let env = IsolatedEnvironment::new(PathBuf::from("/data/djlint-venv"));
        assert_eq!(env.venv_path(), Path::new("/data/djlint-venv"));
        assert_eq!(env.python(), interpreter_in(Path::new("/data/djlint-venv")));
        assert!(!env.is_initialized());
    }

    #[test]
    fn test_data_dir_location() {
        let env = IsolatedEnvironment::in_data_dir();
        assert!(env.venv_path().ends_with(Path::new("djlint-ls").join(VENV_DIR_NAME)));
    }

    #[tokio::test]
    async fn test_run_quiet_reports_spawn_failure() {
        let err = run_quiet(Path::new("djlint-ls-no-such-program"), &[], PROBE_TIMEOUT)
            .await
            .unwrap_err();
        assert!(err.contains("failed to spawn"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_run_quiet_times_out() {
        let err = run_quiet(Path::new("sleep"), &["5"], Duration::from_millis(50))
            .await
            .unwrap_err();
        assert!(err.contains("timed out"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_ensure_accepts_existing_environment() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let env = IsolatedEnvironment::new(dir.path().join(VENV_DIR_NAME));
        std::fs::create_dir_all(env.python().parent().unwrap()).unwrap();
        // Stands in for a venv interpreter whose djlint answers --version
        std::fs::write(env.python(), "#!/bin/sh\nexit 0\n").unwrap();
        std::fs::set_permissions(env.python(), std::fs::Permissions::from_mode(0o755)).unwrap();

        let python = env.ensure().await.unwrap();
        assert_eq!(python, env.python());
        assert!(env.is_initialized());

        env.dispose();
        assert!(!env.is_initialized());
    }

    #[tokio::test]
    #[ignore = "creates a virtual environment and installs djLint from PyPI"]
    async fn test_ensure_creates_environment() {
        let dir = tempfile::tempdir().unwrap();
        let env = IsolatedEnvironment::new(dir.path().join(VENV_DIR_NAME));
        let python = env.ensure().await.expect("setup should succeed with network access");
        assert!(python.is_file());
    }
}
