use crate::interpreter::call::{ArgValue, MacroCall};
use crate::interpreter::engine::MacroEngine;
use crate::interpreter::error::MacroError;
use crate::interpreter::registry::{ArgSpec, ArgType, MacroDefinition, macro_handler};
use crate::parser::trim_block;

/// Upper bound on `{{repeat}}` counts.
const MAX_REPEAT: usize = 1000;

pub(super) fn register(engine: &mut MacroEngine) {
    engine.register_macro(
        MacroDefinition::builder()
            .name("if")
            .description("Resolve the content when the condition holds, else the part after {{else}}.")
            .unnamed_args(vec![ArgSpec::required("condition"), ArgSpec::required("content")])
            .delay_arg_resolution(true)
            .handler(macro_handler(if_handler))
            .build(),
    );
    engine.register_macro(
        MacroDefinition::builder()
            .name("repeat")
            .description("Repeat content a number of times.")
            .unnamed_args(vec![
                ArgSpec::typed("count", ArgType::Integer),
                ArgSpec::required("content"),
            ])
            .named_args(vec![
                ArgSpec::builder()
                    .name("separator")
                    .optional(true)
                    .default_value("")
                    .build(),
            ])
            .strict_args(true)
            .handler(macro_handler(repeat_handler))
            .build(),
    );
}

fn if_handler(call: &MacroCall<'_>) -> Result<String, MacroError> {
    let condition = call.resolve_arg(0).unwrap_or_default();
    let holds = condition_holds(call, &condition);
    let Some(ArgValue::Deferred(content)) = call.raw_arg(1) else {
        return Ok(String::new());
    };
    let branches = content.split_on("else");
    let branch = if holds {
        branches.first()
    } else {
        branches.get(1)
    };
    Ok(branch
        .map(|branch| {
            if call.trims_content() {
                call.resolve(&trim_block(branch))
            } else {
                call.resolve(branch)
            }
        })
        .unwrap_or_default())
}

/// A condition is false when empty, `0` or `false`. A leading `!` negates it.
/// A bare macro name is evaluated first.
fn condition_holds(call: &MacroCall<'_>, condition: &str) -> bool {
    let condition = condition.trim();
    let (negate, condition) = match condition.strip_prefix('!') {
        Some(rest) => (true, rest.trim_start()),
        None => (false, condition),
    };
    let value = if is_macro_name(condition) && call.has_macro(condition) {
        call.evaluate_text(&format!("{{{{{condition}}}}}"))
    } else {
        condition.to_string()
    };
    let truthy = !matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "" | "0" | "false"
    );
    truthy != negate
}

fn is_macro_name(text: &str) -> bool {
    text.starts_with(|c: char| c.is_ascii_alphabetic())
        && text
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}

fn repeat_handler(call: &MacroCall<'_>) -> Result<String, MacroError> {
    let count = call.arg(0).unwrap_or_default().trim();
    let count: usize = count
        .parse()
        .map_err(|_| MacroError::invalid_argument("count", format!("'{count}' is not a count")))?;
    if count > MAX_REPEAT {
        return Err(MacroError::invalid_argument(
            "count",
            format!("{count} exceeds the limit of {MAX_REPEAT}"),
        ));
    }
    let content = call.arg(1).unwrap_or_default();
    let separator = call.named("separator").unwrap_or_default();
    Ok(vec![content; count].join(separator))
}
