//! Implementation of the `tmacro check` command.

use std::fs::read_to_string;
use std::path::PathBuf;

use miette::{miette, IntoDiagnostic, Report};
use owo_colors::{OwoColorize, Stream};
use serde::Serialize;
use tmacro::parse_template;

use crate::output::TemplateDiagnostic;

/// Arguments for the check command.
#[derive(Debug, clap::Args)]
pub struct CheckArgs {
    /// Template files to check
    #[arg(required = true)]
    pub files: Vec<PathBuf>,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

/// JSON output for one reported problem.
#[derive(Debug, Serialize)]
struct CheckProblem {
    file: String,
    offset: usize,
    message: String,
}

/// Every lexer error and parse warning in `content`.
fn diagnose(name: &str, content: &str) -> Vec<TemplateDiagnostic> {
    let parsed = parse_template(content);
    let mut diagnostics: Vec<TemplateDiagnostic> = parsed
        .lex_errors
        .iter()
        .map(|err| TemplateDiagnostic::from_lex_error(name, content, err))
        .chain(
            parsed
                .warnings
                .iter()
                .map(|warning| TemplateDiagnostic::from_parse_warning(name, content, warning)),
        )
        .collect();
    diagnostics.sort_by_key(TemplateDiagnostic::offset);
    diagnostics
}

/// Run the check command.
pub fn run_check(args: CheckArgs) -> miette::Result<i32> {
    let mut problems = Vec::new();
    let mut failed = false;

    for path in &args.files {
        let content = read_to_string(path)
            .map_err(|e| miette!("Cannot read template file {}: {}", path.display(), e))?;
        let name = path.display().to_string();
        let diagnostics = diagnose(&name, &content);
        failed |= !diagnostics.is_empty();

        if args.json {
            problems.extend(diagnostics.iter().map(|d| CheckProblem {
                file: name.clone(),
                offset: d.offset(),
                message: d.message().to_string(),
            }));
        } else if diagnostics.is_empty() {
            println!("{} {}", "ok".if_supports_color(Stream::Stdout, |t| t.green()), name);
        } else {
            for diagnostic in diagnostics {
                eprintln!("{:?}", Report::new(diagnostic));
            }
        }
    }

    if args.json {
        println!("{}", serde_json::to_string_pretty(&problems).into_diagnostic()?);
    }

    if failed {
        Ok(exitcode::DATAERR)
    } else {
        Ok(exitcode::OK)
    }
}
