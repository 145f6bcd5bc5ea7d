//! Implementation of the `tmacro tokens` command.

use miette::IntoDiagnostic;
use serde::Serialize;
use tmacro::tokenize;

use crate::commands::input::TemplateInput;
use crate::output::table::format_token_table;

/// Arguments for the tokens command.
#[derive(Debug, clap::Args)]
pub struct TokensArgs {
    #[command(flatten)]
    pub input: TemplateInput,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Serialize)]
struct TokenJson {
    kind: String,
    start: usize,
    text: String,
}

/// Run the tokens command.
pub fn run_tokens(args: TokensArgs) -> miette::Result<i32> {
    let (_, content) = args.input.read()?;
    let lexed = tokenize(&content);

    if args.json {
        let tokens: Vec<TokenJson> = lexed
            .tokens
            .iter()
            .map(|token| TokenJson {
                kind: token.kind.to_string(),
                start: token.start,
                text: token.text.clone(),
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&tokens).into_diagnostic()?);
    } else {
        println!("{}", format_token_table(&lexed.tokens));
        for error in &lexed.errors {
            eprintln!("{error}");
        }
    }
    Ok(exitcode::OK)
}
