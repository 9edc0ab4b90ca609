//! Handler for the `completions` command.

use clap::{CommandFactory, ValueEnum};
use clap_complete::{Shell, generate};
use colored::*;
use std::io::stdout;

use djlint_ls::exit_codes::exit;

/// Generate a shell completion script, or list the supported shells.
pub fn handle_completions(shell: Option<Shell>, list: bool) {
    if list {
        println!("Available shells:");
        for shell in Shell::value_variants() {
            println!("  {shell}");
        }
        return;
    }

    let Some(shell) = shell.or_else(Shell::from_env) else {
        eprintln!(
            "{}: Could not detect shell from $SHELL, pass one explicitly (e.g. `djlint-ls completions bash`)",
            "Error".red().bold()
        );
        exit::tool_error();
    };

    generate(shell, &mut crate::Cli::command(), "djlint-ls", &mut stdout());
}
