//! Handler for the `server` command.

use colored::*;
use std::path::Path;

use djlint_ls::exit_codes::exit;

/// Serve LSP on stdio, or on a local TCP port when `--port` is given.
pub fn handle_server(port: Option<u16>, stdio: bool, config: Option<String>) {
    if let Some(path) = config.as_deref().filter(|path| !Path::new(path).is_file()) {
        eprintln!("{}: Configuration file not found: {path}", "Error".red().bold());
        exit::tool_error();
    }
    if stdio && port.is_some() {
        log::warn!("--stdio ignored because --port was given");
    }

    let served = tokio::runtime::Runtime::new()
        .map_err(anyhow::Error::from)
        .and_then(|runtime| {
            runtime.block_on(async {
                match port {
                    Some(port) => djlint_ls::lsp::start_tcp_server(port, config.as_deref()).await,
                    None => djlint_ls::lsp::start_server(config.as_deref()).await,
                }
            })
        });

    if let Err(e) = served {
        eprintln!("{}: Language server stopped: {e:#}", "Error".red().bold());
        exit::tool_error();
    }
}
