//! Handler for the `lint` command.

use colored::*;

use djlint_ls::exit_codes::exit;
use djlint_ls::isolated::IsolatedEnvironment;
use djlint_ls::{Invocation, Runner, linter};

use super::{load_settings, read_sources, runtime};
use crate::cli_types::LintArgs;

/// Lint each file and print one line per problem, positioned the way djLint
/// prints them (1-based line, column as given).
pub fn handle_lint(args: LintArgs, config: Option<&str>) {
    let result = (|| -> anyhow::Result<usize> {
        let settings = load_settings(config, args.python.as_deref())?;
        let sources = read_sources(&args.paths, args.language_id.as_deref())?;
        let runner = Runner::new(IsolatedEnvironment::in_data_dir());

        runtime()?.block_on(async {
            let mut total = 0;
            for source in &sources {
                let invocation = Invocation::new(&source.document, &settings);
                let records = linter::lint_records(&runner, &invocation).await?;
                for record in &records {
                    println!(
                        "{}:{}:{}: {} {}",
                        source.display.bold(),
                        record.line + 1,
                        record.column,
                        record.code.red(),
                        record.message
                    );
                }
                total += records.len();
            }
            Ok::<_, anyhow::Error>(total)
        })
    })();

    match result {
        Ok(0) => {}
        Ok(total) => {
            eprintln!("Found {total} problem(s)");
            exit::problems_found();
        }
        Err(e) => {
            eprintln!("{}: {e:#}", "Error".red().bold());
            exit::tool_error();
        }
    }
}
