//! Built-in macros, filters and the unescape post-processor.

mod control;
mod filters;
mod random;
mod text;
mod variables;

use crate::interpreter::call::MacroCall;
use crate::interpreter::engine::MacroEngine;
use crate::interpreter::error::MacroError;
use crate::interpreter::processors::{ProcessorOptions, processor};
use crate::interpreter::registry::{ArgSpec, MacroDefinition, macro_handler};

/// Post-processors registered by the engine run after user ones by default.
const UNESCAPE_PRIORITY: i32 = 1000;

pub(crate) fn install(engine: &mut MacroEngine) {
    text::register(engine);
    variables::register(engine);
    control::register(engine);
    random::register(engine);
    filters::register(engine);
    engine.add_post_processor(
        processor(|text, _| unescape_braces(text)),
        ProcessorOptions::builder()
            .priority(UNESCAPE_PRIORITY)
            .source("builtin:unescape")
            .build(),
    );
}

/// Turn `\{{` and `\}}` into literal braces.
pub fn unescape_braces(text: &str) -> String {
    text.replace("\\{{", "{{").replace("\\}}", "}}")
}

/// A definition taking the given required unnamed arguments.
fn define<F>(name: &str, description: &str, args: &[&str], handler: F) -> MacroDefinition
where
    F: Fn(&MacroCall<'_>) -> Result<String, MacroError> + Send + Sync + 'static,
{
    MacroDefinition::builder()
        .name(name)
        .description(description)
        .unnamed_args(args.iter().map(|arg| ArgSpec::required(*arg)).collect())
        .handler(macro_handler(handler))
        .build()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unescape_leaves_plain_braces() {
        assert_eq!(unescape_braces(r"\{{user\}} {a}"), "{{user}} {a}");
    }
}
