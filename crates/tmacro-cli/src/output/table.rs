//! Table formatting utilities for CLI output.

use std::sync::Arc;

use comfy_table::{presets, ContentArrangement, Table};
use tmacro::parser::Token;
use tmacro::MacroDefinition;

fn table(header: Vec<&str>) -> Table {
    let mut table = Table::new();
    table.load_preset(presets::UTF8_BORDERS_ONLY);
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(header);
    table
}

/// One row per token: offset, kind and text.
pub fn format_token_table(tokens: &[Token]) -> Table {
    let mut table = table(vec!["Offset", "Kind", "Text"]);
    for token in tokens {
        table.add_row(vec![
            token.start.to_string(),
            token.kind.to_string(),
            format!("{:?}", token.text),
        ]);
    }
    table
}

/// One row per macro: name, argument signature and description.
pub fn format_macro_table(definitions: &[Arc<MacroDefinition>]) -> Table {
    let mut table = table(vec!["Macro", "Args", "Description"]);
    for definition in definitions {
        let mut args: Vec<String> = definition
            .unnamed_args
            .iter()
            .map(|spec| {
                if spec.optional {
                    format!("[{}]", spec.name)
                } else {
                    spec.name.clone()
                }
            })
            .collect();
        args.extend(
            definition
                .named_args
                .iter()
                .map(|spec| format!("{}=", spec.name)),
        );
        if definition.list.is_some() {
            args.push("...".to_string());
        }
        table.add_row(vec![
            definition.name.clone(),
            args.join(" "),
            definition.description.clone(),
        ]);
    }
    table
}
