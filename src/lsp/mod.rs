//! Language Server Protocol implementation for djlint-ls
//!
//! The server speaks LSP over stdio (the default) or TCP for debugging, and
//! delegates all template work to a djLint subprocess.

pub mod server;
pub mod types;

pub use server::DjlintLanguageServer;
pub use types::{record_to_diagnostic, severity_from_settings};

use anyhow::Result;
use tokio::net::TcpListener;
use tower_lsp::{LspService, Server};

/// Start the Language Server Protocol server on stdio
pub async fn start_server(config_path: Option<&str>) -> Result<()> {
    let stdin = tokio::io::stdin();
    let stdout = tokio::io::stdout();

    let (service, socket) = LspService::new(|client| DjlintLanguageServer::new(client, config_path));

    log::info!("Starting djlint-ls Language Server Protocol server");

    Server::new(stdin, stdout, socket).serve(service).await;

    Ok(())
}

/// Start the LSP server over TCP (useful for debugging)
pub async fn start_tcp_server(port: u16, config_path: Option<&str>) -> Result<()> {
    let listener = TcpListener::bind(format!("127.0.0.1:{port}")).await?;
    log::info!("djlint-ls LSP server listening on 127.0.0.1:{port}");

    loop {
        let (stream, _) = listener.accept().await?;
        let config_path = config_path.map(str::to_string);
        let (service, socket) =
            LspService::new(move |client| DjlintLanguageServer::new(client, config_path.as_deref()));

        tokio::spawn(async move {
            let (read, write) = tokio::io::split(stream);
            Server::new(read, write, socket).serve(service).await;
        });
    }
}
