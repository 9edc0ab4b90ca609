//! Handler for the `format` command.

use colored::*;
use std::fs;

use djlint_ls::exit_codes::exit;
use djlint_ls::isolated::IsolatedEnvironment;
use djlint_ls::{Invocation, Runner, formatter};

use super::{Source, load_settings, read_sources, runtime};
use crate::cli_types::FormatArgs;

/// Format each file in place, print stdin input to stdout, or with `--check`
/// only report what would change.
pub fn handle_format(args: FormatArgs, config: Option<&str>) {
    let result = (|| -> anyhow::Result<usize> {
        let settings = load_settings(config, args.python.as_deref())?;
        let sources = read_sources(&args.paths, args.language_id.as_deref())?;
        let runner = Runner::new(IsolatedEnvironment::in_data_dir());

        runtime()?.block_on(async {
            let mut changed = 0;
            for source in &sources {
                let invocation = Invocation::new(&source.document, &settings);
                let formatted = formatter::format_text(&runner, &invocation).await?;
                if write_result(source, &formatted, args.check)? {
                    changed += 1;
                }
            }
            Ok::<_, anyhow::Error>(changed)
        })
    })();

    match result {
        Ok(changed) if args.check && changed > 0 => {
            eprintln!("{changed} file(s) would be reformatted");
            exit::problems_found();
        }
        Ok(_) => {}
        Err(e) => {
            eprintln!("{}: {e:#}", "Error".red().bold());
            exit::tool_error();
        }
    }
}

/// Returns whether the source changed.
fn write_result(source: &Source, formatted: &str, check: bool) -> anyhow::Result<bool> {
    let changed = formatted != source.document.text;

    match &source.path {
        None if !check => print!("{formatted}"),
        Some(path) if changed && !check => {
            fs::write(path, formatted)?;
            println!("{} {}", "Reformatted".green(), source.display);
        }
        _ if changed => println!("{} {}", "Would reformat".yellow(), source.display),
        _ => {}
    }
    Ok(changed)
}
