use clap::{Parser, Subcommand};
use clap_complete::Shell;

mod cli_types;
mod commands;

use cli_types::{FormatArgs, LintArgs};

#[derive(Parser)]
#[command(
    author,
    version,
    about = "Language server and CLI front end for the djLint template linter",
    long_about = None
)]
pub(crate) struct Cli {
    /// Settings file (TOML) to use instead of discovering djlint-ls.toml
    #[arg(short, long, global = true)]
    config: Option<String>,

    /// Show detailed output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the Language Server Protocol server
    Server {
        /// TCP port to listen on (for debugging)
        #[arg(long)]
        port: Option<u16>,

        /// Use stdio for communication (default)
        #[arg(long)]
        stdio: bool,
    },
    /// Format templates with djLint
    Format(FormatArgs),
    /// Lint templates with djLint and print the problems
    Lint(LintArgs),
    /// Generate shell completion scripts
    Completions {
        /// Shell to generate completions for (detected from $SHELL if omitted)
        #[arg(value_enum)]
        shell: Option<Shell>,

        /// List available shells
        #[arg(long)]
        list: bool,
    },
    /// Show version information
    Version,
}

fn main() {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .format_timestamp(None)
        .init();

    match cli.command {
        Commands::Server { port, stdio } => commands::server::handle_server(port, stdio, cli.config),
        Commands::Format(args) => commands::format::handle_format(args, cli.config.as_deref()),
        Commands::Lint(args) => commands::lint::handle_lint(args, cli.config.as_deref()),
        Commands::Completions { shell, list } => commands::completions::handle_completions(shell, list),
        Commands::Version => commands::version::handle_version(),
    }
}
