//! Execution engine for djLint invocations.
//!
//! Every request becomes `python -m djlint - <flags>` with the document on
//! stdin. Output is buffered in full and handed back once the process exits;
//! nothing is streamed. The primary invocation has no timeout.
//!
//! Cancellation is by drop: children are spawned with `kill_on_drop`, so
//! dropping the future returned by [`Runner::run`] kills the process.

use std::io;
use std::path::{Path, PathBuf};
use std::process::Stdio;

use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tower_lsp::lsp_types::FormattingOptions;

use crate::args::{CONFIGURATION_ARG, Mode};
use crate::config::Settings;
use crate::document::Document;
use crate::errors::{DjlintError, FailureReport};
use crate::interpreter::{self, ActiveEnvironmentLocator, EnvironmentLocator, Interpreter};
use crate::isolated::IsolatedEnvironment;

/// Result of running the tool once.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolOutput {
    pub stdout: String,
    pub stderr: String,
    /// `None` when the process was terminated by a signal.
    pub exit_code: Option<i32>,
}

impl ToolOutput {
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }
}

/// Everything one invocation needs besides the runner itself.
#[derive(Debug, Clone, Copy)]
pub struct Invocation<'a> {
    pub document: &'a Document,
    pub settings: &'a Settings,
    pub workspace_folder: Option<&'a Path>,
    pub formatting_options: Option<&'a FormattingOptions>,
}

impl<'a> Invocation<'a> {
    pub fn new(document: &'a Document, settings: &'a Settings) -> Self {
        Self {
            document,
            settings,
            workspace_folder: None,
            formatting_options: None,
        }
    }

    pub fn workspace_folder(mut self, folder: Option<&'a Path>) -> Self {
        self.workspace_folder = folder;
        self
    }

    pub fn formatting_options(mut self, options: Option<&'a FormattingOptions>) -> Self {
        self.formatting_options = options;
        self
    }
}

/// Runs djLint. Owns the isolated environment and the environment locator.
pub struct Runner {
    locator: Box<dyn EnvironmentLocator>,
    isolated: IsolatedEnvironment,
}

impl Runner {
    pub fn new(isolated: IsolatedEnvironment) -> Self {
        Self::with_locator(isolated, Box::new(ActiveEnvironmentLocator))
    }

    pub fn with_locator(isolated: IsolatedEnvironment, locator: Box<dyn EnvironmentLocator>) -> Self {
        Self { locator, isolated }
    }

    pub fn isolated(&self) -> &IsolatedEnvironment {
        &self.isolated
    }

    pub async fn resolve_interpreter(&self, invocation: &Invocation<'_>) -> Result<Interpreter, DjlintError> {
        interpreter::resolve(
            invocation.settings,
            invocation.document,
            invocation.workspace_folder,
            self.locator.as_ref(),
            &self.isolated,
        )
        .await
    }

    /// Run djLint on the document and return its stdout.
    pub async fn run(&self, invocation: &Invocation<'_>, mode: Mode) -> Result<String, DjlintError> {
        let interpreter = self.resolve_interpreter(invocation).await?;
        let args = command_args(invocation, mode);
        let cwd = working_directory(&args, invocation.document, invocation.workspace_folder);

        log::debug!(
            "Running {} {} (cwd: {:?}, interpreter from {:?})",
            interpreter.path.display(),
            args.join(" "),
            cwd,
            interpreter.source
        );

        let output = execute(&interpreter.path, &args, cwd.as_deref(), &invocation.document.text).await?;
        if output.success() {
            return Ok(output.stdout);
        }

        let report = FailureReport {
            program: interpreter.path.display().to_string(),
            args,
            cwd: cwd.map(|dir| dir.display().to_string()),
            exit_code: output.exit_code,
            stdout: output.stdout,
            stderr: output.stderr,
        };

        match DjlintError::from_failure(&interpreter.path, report.clone()) {
            Some(error) => Err(error),
            // Non-zero exit with only progress on stderr: djLint found problems
            // or changed the file, and stdout is the answer
            None => Ok(report.stdout),
        }
    }

    /// Release the isolated environment.
    pub fn dispose(&self) {
        self.isolated.dispose();
    }
}

/// `-m djlint -` followed by the rendered descriptors for `mode`.
pub fn command_args(invocation: &Invocation<'_>, mode: Mode) -> Vec<String> {
    let mut args = vec!["-m".to_string(), "djlint".to_string(), "-".to_string()];
    args.extend(mode.build(invocation.settings, invocation.document, invocation.formatting_options));
    args
}

/// Directory to run djLint in.
///
/// With `--configuration` the workspace folder wins so relative config paths
/// resolve the way the user wrote them; otherwise the document's directory,
/// where djLint finds `pyproject.toml` and friends on its own.
pub fn working_directory(args: &[String], document: &Document, workspace_folder: Option<&Path>) -> Option<PathBuf> {
    if args.iter().any(|arg| arg == CONFIGURATION_ARG.cli_name)
        && let Some(folder) = workspace_folder
    {
        return Some(folder.to_path_buf());
    }

    let dir = document.parent_dir();
    if dir.is_none() {
        log::warn!(
            "Cannot determine a working directory for {} (scheme '{}'); running without one",
            document.uri,
            document.uri.scheme()
        );
    }
    dir
}

/// Spawn `program`, feed `input` on stdin and collect everything it prints.
pub async fn execute(
    program: &Path,
    args: &[String],
    cwd: Option<&Path>,
    input: &str,
) -> Result<ToolOutput, DjlintError> {
    let mut cmd = Command::new(program);
    cmd.args(args)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);
    if let Some(dir) = cwd {
        cmd.current_dir(dir);
    }

    let mut child = cmd.spawn().map_err(|source| DjlintError::Spawn {
        program: program.display().to_string(),
        source,
    })?;

    let stdin = child.stdin.take();
    let write = async move {
        if let Some(mut stdin) = stdin {
            stdin.write_all(input.as_bytes()).await?;
            stdin.shutdown().await?;
        }
        Ok::<(), io::Error>(())
    };

    // Write and read concurrently so a large document cannot deadlock on full pipes
    let (written, output) = tokio::join!(write, child.wait_with_output());
    let output = output.map_err(|source| DjlintError::Spawn {
        program: program.display().to_string(),
        source,
    })?;

    if let Err(e) = written {
        // Expected when the interpreter exits before reading, e.g. missing module
        log::debug!("Failed to write document to {}: {e}", program.display());
    }

    Ok(ToolOutput {
        stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
        stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        exit_code: output.status.code(),
    })
}
