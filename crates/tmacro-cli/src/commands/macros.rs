//! Implementation of the `tmacro macros` command.

use std::sync::Arc;

use miette::IntoDiagnostic;
use serde::Serialize;
use tmacro::{MacroDefinition, MacroEngine};

use crate::output::table::format_macro_table;

/// Arguments for the macros command.
#[derive(Debug, clap::Args)]
pub struct MacrosArgs {
    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Serialize)]
struct MacrosJson {
    macros: Vec<MacroJson>,
    filters: Vec<String>,
}

#[derive(Debug, Serialize)]
struct MacroJson {
    name: String,
    description: String,
    min_args: usize,
    max_args: Option<usize>,
    delayed: bool,
}

/// Run the macros command.
pub fn run_macros(args: MacrosArgs) -> miette::Result<i32> {
    let engine = MacroEngine::with_builtins();
    let definitions: Vec<Arc<MacroDefinition>> = engine
        .registry()
        .names()
        .iter()
        .filter_map(|name| engine.get_macro(name))
        .collect();
    let filters = engine.filters().names();

    if args.json {
        let output = MacrosJson {
            macros: definitions
                .iter()
                .map(|definition| {
                    let (min_args, max_args) = definition.arity();
                    MacroJson {
                        name: definition.name.clone(),
                        description: definition.description.clone(),
                        min_args,
                        max_args,
                        delayed: definition.delay_arg_resolution,
                    }
                })
                .collect(),
            filters,
        };
        println!("{}", serde_json::to_string_pretty(&output).into_diagnostic()?);
    } else {
        println!("{}", format_macro_table(&definitions));
        println!("\nFilters: {}", filters.join(", "));
    }
    Ok(exitcode::OK)
}
