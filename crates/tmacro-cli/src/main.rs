//! tmacro CLI entry point.
//!
//! Provides command-line tools for working with macro templates:
//! - `tmacro eval` - Expand a template
//! - `tmacro check` - Report malformed macros in template files
//! - `tmacro tokens` - Show the token stream of a template
//! - `tmacro macros` - List the built-in macros

mod commands;
mod output;

use std::io::stderr;
use std::process::exit;

use clap::{Parser, Subcommand};
use commands::{
    run_check, run_eval, run_macros, run_tokens, CheckArgs, EvalArgs, MacrosArgs, TokensArgs,
};
use miette::MietteHandlerOpts;
use tracing_subscriber::EnvFilter;

/// Macro template tools.
#[derive(Debug, Parser)]
#[command(name = "tmacro")]
#[command(about = "Macro template tools", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Disable colored output (`NO_COLOR` is also honored)
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Log evaluation details to stderr
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Expand the macros in a template
    Eval(EvalArgs),
    /// Report malformed or unterminated macros
    Check(CheckArgs),
    /// Print the token stream of a template
    Tokens(TokensArgs),
    /// List the built-in macros and filters
    Macros(MacrosArgs),
}

/// `RUST_LOG` wins; otherwise warnings, or debug with `--verbose`.
fn setup_logging(verbose: bool) {
    let fallback = if verbose { "tmacro=debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(stderr)
        .with_target(false)
        .init();
}

fn run(command: Commands) -> miette::Result<i32> {
    match command {
        Commands::Eval(args) => run_eval(args),
        Commands::Check(args) => run_check(args),
        Commands::Tokens(args) => run_tokens(args),
        Commands::Macros(args) => run_macros(args),
    }
}

fn main() -> miette::Result<()> {
    let cli = Cli::parse();
    if cli.no_color {
        owo_colors::set_override(false);
    }
    setup_logging(cli.verbose);

    miette::set_hook(Box::new(|_| {
        Box::new(
            MietteHandlerOpts::new()
                .terminal_links(true)
                .unicode(true)
                .context_lines(2)
                .build(),
        )
    }))?;

    let code = run(cli.command).unwrap_or_else(|report| {
        eprintln!("{report:?}");
        exitcode::SOFTWARE
    });
    exit(code)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_color_is_accepted_after_the_subcommand() {
        let cli = Cli::try_parse_from(["tmacro", "macros", "--no-color"]).unwrap();
        assert!(cli.no_color);
        assert!(matches!(cli.command, Commands::Macros(_)));
    }

    #[test]
    fn color_is_on_by_default() {
        let cli = Cli::try_parse_from(["tmacro", "tokens", "{{user}}"]).unwrap();
        assert!(!cli.no_color);
        assert!(!cli.verbose);
    }
}
