//! Main Language Server Protocol server implementation for djlint-ls
//!
//! The server keeps a snapshot of every open document, lints it on open,
//! change and save, and formats it on request. Each operation is one djLint
//! subprocess; see [`crate::runner`].

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use tokio::sync::{Mutex, RwLock};
use tokio_util::sync::CancellationToken;
use tower_lsp::jsonrpc::Result as JsonRpcResult;
use tower_lsp::lsp_types::*;
use tower_lsp::{Client, LanguageServer};

use crate::config::{SECTION, Settings};
use crate::document::{Document, workspace_folder_for};
use crate::errors::DjlintError;
use crate::isolated::IsolatedEnvironment;
use crate::lsp::types::{DETAILS_ACTION, HIDE_FOR_WORKSPACE_ACTION, HIDE_GLOBALLY_ACTION, action};
use crate::runner::{Invocation, Runner};
use crate::suppression::{SuppressionScope, SuppressionStore};
use crate::{formatter, linter};

/// Handle of the lint currently running for a document.
struct InFlight {
    id: u64,
    token: CancellationToken,
}

/// LSP server that formats and lints templates with djLint
pub struct DjlintLanguageServer {
    client: Client,
    /// Explicit settings file given on the command line
    config_path: Option<PathBuf>,
    /// Defaults plus the settings file
    base_settings: Arc<RwLock<Settings>>,
    /// Settings pushed by the client
    client_settings: Arc<RwLock<Settings>>,
    /// Open documents
    documents: Arc<RwLock<HashMap<Url, Document>>>,
    /// Last published diagnostics per document
    diagnostics: Arc<RwLock<HashMap<Url, Vec<Diagnostic>>>>,
    workspace_folders: Arc<RwLock<Vec<PathBuf>>>,
    /// At most one lint per document; a newer one cancels the older
    in_flight: Arc<Mutex<HashMap<Url, InFlight>>>,
    next_lint_id: AtomicU64,
    /// Message of the last error popup, to avoid repeating it on every keystroke
    last_error: Arc<Mutex<Option<String>>>,
    runner: Arc<Runner>,
    suppression: Arc<SuppressionStore>,
    supports_configuration: AtomicBool,
}

impl DjlintLanguageServer {
    pub fn new(client: Client, config_path: Option<&str>) -> Self {
        let mut server = Self::with_components(
            client,
            Runner::new(IsolatedEnvironment::in_data_dir()),
            SuppressionStore::open_default(),
        );
        server.config_path = config_path.map(PathBuf::from);
        server
    }

    /// Build a server around an existing runner and suppression store.
    pub fn with_components(client: Client, runner: Runner, suppression: SuppressionStore) -> Self {
        Self {
            client,
            config_path: None,
            base_settings: Arc::new(RwLock::new(Settings::default())),
            client_settings: Arc::new(RwLock::new(Settings::empty())),
            documents: Arc::new(RwLock::new(HashMap::new())),
            diagnostics: Arc::new(RwLock::new(HashMap::new())),
            workspace_folders: Arc::new(RwLock::new(Vec::new())),
            in_flight: Arc::new(Mutex::new(HashMap::new())),
            next_lint_id: AtomicU64::new(0),
            last_error: Arc::new(Mutex::new(None)),
            runner: Arc::new(runner),
            suppression: Arc::new(suppression),
            supports_configuration: AtomicBool::new(false),
        }
    }

    /// Diagnostics last published for a document.
    pub async fn diagnostics(&self, uri: &Url) -> Option<Vec<Diagnostic>> {
        self.diagnostics.read().await.get(uri).cloned()
    }

    /// Merge defaults, the settings file and client settings for one document.
    pub async fn settings_for(&self, document: &Document, workspace_folder: Option<&Path>) -> Settings {
        let mut settings = self.base_settings.read().await.merged(&*self.client_settings.read().await);

        if self.supports_configuration.load(Ordering::Relaxed) {
            let item = ConfigurationItem {
                scope_uri: Some(document.uri.clone()),
                section: Some(SECTION.to_string()),
            };
            match self.client.configuration(vec![item]).await {
                Ok(mut values) => match values.pop().map(Settings::from_value) {
                    Some(Ok(scoped)) => settings.merge(&scoped),
                    Some(Err(e)) => log::warn!("Ignoring settings for {}: {e}", document.uri),
                    None => {}
                },
                Err(e) => log::debug!("workspace/configuration failed for {}: {e}", document.uri),
            }
        }

        self.suppression.apply(&mut settings, workspace_folder);
        settings
    }

    async fn workspace_folder(&self, document: &Document) -> Option<PathBuf> {
        workspace_folder_for(document, &self.workspace_folders.read().await)
    }

    /// Load the settings file into the base layer.
    async fn load_settings_file(&self) {
        let path = match &self.config_path {
            Some(path) => Some(path.clone()),
            None => {
                let folders = self.workspace_folders.read().await;
                folders.iter().find_map(|folder| Settings::discover(folder))
            }
        };
        let Some(path) = path else {
            return;
        };

        match Settings::load_file(&path) {
            Ok(file_settings) => {
                self.base_settings.write().await.merge(&file_settings);
                log::info!("Loaded settings from: {}", path.display());
            }
            Err(e) => {
                log::warn!("{e}");
                self.client.log_message(MessageType::WARNING, e.to_string()).await;
            }
        }
    }

    /// Lint a document and publish the result, superseding any lint still
    /// running for it.
    async fn lint_and_publish(&self, uri: Url) {
        let Some(document) = self.documents.read().await.get(&uri).cloned() else {
            return;
        };

        let id = self.next_lint_id.fetch_add(1, Ordering::Relaxed);
        let token = CancellationToken::new();
        let previous = self.in_flight.lock().await.insert(
            uri.clone(),
            InFlight {
                id,
                token: token.clone(),
            },
        );
        if let Some(previous) = previous {
            previous.token.cancel();
        }

        let folder = self.workspace_folder(&document).await;
        let settings = self.settings_for(&document, folder.as_deref()).await;
        let invocation = Invocation::new(&document, &settings).workspace_folder(folder.as_deref());

        // Dropping the lint future on cancellation kills the subprocess
        let result = tokio::select! {
            _ = token.cancelled() => None,
            result = linter::lint_document(&self.runner, &invocation) => Some(result),
        };

        {
            let mut in_flight = self.in_flight.lock().await;
            if in_flight.get(&uri).is_some_and(|current| current.id == id) {
                in_flight.remove(&uri);
            }
        }

        let Some(result) = result.filter(|_| !token.is_cancelled()) else {
            log::debug!("Lint of {uri} superseded by a newer request");
            return;
        };

        match result {
            Ok(diagnostics) => {
                self.last_error.lock().await.take();
                self.diagnostics.write().await.insert(uri.clone(), diagnostics.clone());
                self.client.publish_diagnostics(uri, diagnostics, document.version).await;
            }
            Err(error) => {
                // Configuration problems make old results meaningless; transient
                // failures leave the last good set in place
                if error.is_configuration() {
                    self.diagnostics.write().await.remove(&uri);
                    self.client.publish_diagnostics(uri, Vec::new(), document.version).await;
                }
                self.report_error(&error, &settings, folder).await;
            }
        }
    }

    async fn lint_all_open(&self) {
        let uris: Vec<Url> = self.documents.read().await.keys().cloned().collect();
        for uri in uris {
            self.lint_and_publish(uri).await;
        }
    }

    /// Log an error and show it to the user.
    async fn report_error(&self, error: &DjlintError, settings: &Settings, folder: Option<PathBuf>) {
        let details = error.details();
        log::error!("{details}");
        self.client.log_message(MessageType::ERROR, &details).await;

        let mut actions = Vec::new();
        if matches!(error, DjlintError::NotInstalled { .. }) {
            if !settings.bool("showInstallError") {
                return;
            }
            if folder.is_some() {
                actions.push(action(HIDE_FOR_WORKSPACE_ACTION));
            }
            actions.push(action(HIDE_GLOBALLY_ACTION));
        }
        actions.push(action(DETAILS_ACTION));

        let message = error.to_string();
        {
            let mut last_error = self.last_error.lock().await;
            if last_error.as_deref() == Some(message.as_str()) {
                return;
            }
            *last_error = Some(message.clone());
        }

        // The request waits on the user, so it must not hold up the caller
        let client = self.client.clone();
        let suppression = Arc::clone(&self.suppression);
        tokio::spawn(async move {
            let choice = match client.show_message_request(MessageType::ERROR, &message, Some(actions)).await {
                Ok(Some(choice)) => choice,
                Ok(None) => return,
                Err(e) => {
                    log::debug!("window/showMessageRequest failed: {e}");
                    return;
                }
            };

            let scope = match choice.title.as_str() {
                DETAILS_ACTION => {
                    client.show_message(MessageType::INFO, details).await;
                    return;
                }
                HIDE_FOR_WORKSPACE_ACTION => match folder {
                    Some(folder) => SuppressionScope::Workspace(folder),
                    None => return,
                },
                HIDE_GLOBALLY_ACTION => SuppressionScope::Global,
                _ => return,
            };
            if let Err(e) = suppression.suppress(scope) {
                log::warn!("Failed to save notification preference: {e}");
            }
        });
    }
}

#[tower_lsp::async_trait]
impl LanguageServer for DjlintLanguageServer {
    async fn initialize(&self, params: InitializeParams) -> JsonRpcResult<InitializeResult> {
        log::info!("Initializing djlint-ls");

        let supports_configuration = params
            .capabilities
            .workspace
            .as_ref()
            .and_then(|workspace| workspace.configuration)
            .unwrap_or(false);
        self.supports_configuration
            .store(supports_configuration, Ordering::Relaxed);

        let mut folders: Vec<PathBuf> = params
            .workspace_folders
            .unwrap_or_default()
            .iter()
            .filter_map(|folder| folder.uri.to_file_path().ok())
            .collect();
        #[allow(deprecated)]
        let root_uri = params.root_uri.as_ref();
        if folders.is_empty()
            && let Some(root) = root_uri.and_then(|uri| uri.to_file_path().ok())
        {
            folders.push(root);
        }
        *self.workspace_folders.write().await = folders;

        if let Some(options) = params.initialization_options {
            match Settings::from_value(options) {
                Ok(settings) => *self.client_settings.write().await = settings,
                Err(e) => log::warn!("Ignoring initialization options: {e}"),
            }
        }

        self.load_settings_file().await;

        Ok(InitializeResult {
            capabilities: ServerCapabilities {
                text_document_sync: Some(TextDocumentSyncCapability::Options(TextDocumentSyncOptions {
                    open_close: Some(true),
                    change: Some(TextDocumentSyncKind::FULL),
                    will_save: None,
                    will_save_wait_until: None,
                    save: Some(TextDocumentSyncSaveOptions::SaveOptions(SaveOptions {
                        include_text: Some(false),
                    })),
                })),
                document_formatting_provider: Some(OneOf::Left(true)),
                workspace: Some(WorkspaceServerCapabilities {
                    workspace_folders: Some(WorkspaceFoldersServerCapabilities {
                        supported: Some(true),
                        change_notifications: Some(OneOf::Left(true)),
                    }),
                    file_operations: None,
                }),
                ..Default::default()
            },
            server_info: Some(ServerInfo {
                name: "djlint-ls".to_string(),
                version: Some(env!("CARGO_PKG_VERSION").to_string()),
            }),
        })
    }

    async fn initialized(&self, _: InitializedParams) {
        log::info!("djlint-ls initialized");

        self.client
            .log_message(MessageType::INFO, "djlint-ls started")
            .await;
    }

    async fn shutdown(&self) -> JsonRpcResult<()> {
        log::info!("Shutting down djlint-ls");

        for (_, in_flight) in self.in_flight.lock().await.drain() {
            in_flight.token.cancel();
        }
        self.runner.dispose();
        Ok(())
    }

    async fn did_open(&self, params: DidOpenTextDocumentParams) {
        let item = params.text_document;
        let document = Document::new(item.uri.clone(), item.language_id, item.text).with_version(item.version);

        self.documents.write().await.insert(item.uri.clone(), document);
        self.lint_and_publish(item.uri).await;
    }

    async fn did_change(&self, params: DidChangeTextDocumentParams) {
        let uri = params.text_document.uri;

        // FULL sync: the last change carries the whole text
        let Some(change) = params.content_changes.into_iter().last() else {
            return;
        };

        {
            let mut documents = self.documents.write().await;
            let Some(document) = documents.get_mut(&uri) else {
                log::debug!("Change for unknown document {uri}");
                return;
            };
            document.text = change.text;
            document.version = Some(params.text_document.version);
        }

        self.lint_and_publish(uri).await;
    }

    async fn did_save(&self, params: DidSaveTextDocumentParams) {
        let uri = params.text_document.uri;
        if let Some(text) = params.text
            && let Some(document) = self.documents.write().await.get_mut(&uri)
        {
            document.text = text;
        }

        self.lint_and_publish(uri).await;
    }

    async fn did_close(&self, params: DidCloseTextDocumentParams) {
        let uri = params.text_document.uri;

        if let Some(in_flight) = self.in_flight.lock().await.remove(&uri) {
            in_flight.token.cancel();
        }
        self.documents.write().await.remove(&uri);
        self.diagnostics.write().await.remove(&uri);

        self.client.publish_diagnostics(uri, Vec::new(), None).await;
    }

    async fn did_change_configuration(&self, params: DidChangeConfigurationParams) {
        // Pull-model clients send null and expect us to ask again
        if !params.settings.is_null() {
            match Settings::from_value(params.settings) {
                Ok(settings) => *self.client_settings.write().await = settings,
                Err(e) => {
                    log::warn!("Ignoring configuration change: {e}");
                    return;
                }
            }
        }

        self.last_error.lock().await.take();
        self.lint_all_open().await;
    }

    async fn did_change_workspace_folders(&self, params: DidChangeWorkspaceFoldersParams) {
        let mut folders = self.workspace_folders.write().await;
        for removed in params.event.removed {
            if let Ok(path) = removed.uri.to_file_path() {
                folders.retain(|folder| folder != &path);
            }
        }
        for added in params.event.added {
            if let Ok(path) = added.uri.to_file_path()
                && !folders.contains(&path)
            {
                folders.push(path);
            }
        }
    }

    async fn formatting(&self, params: DocumentFormattingParams) -> JsonRpcResult<Option<Vec<TextEdit>>> {
        let uri = params.text_document.uri;
        let Some(document) = self.documents.read().await.get(&uri).cloned() else {
            log::debug!("Formatting requested for unknown document {uri}");
            return Ok(None);
        };

        let folder = self.workspace_folder(&document).await;
        let settings = self.settings_for(&document, folder.as_deref()).await;
        let invocation = Invocation::new(&document, &settings)
            .workspace_folder(folder.as_deref())
            .formatting_options(Some(&params.options));

        match formatter::format_document(&self.runner, &invocation).await {
            Ok(edits) => Ok(Some(edits)),
            Err(error) => {
                self.report_error(&error, &settings, folder).await;
                Ok(None)
            }
        }
    }
}
