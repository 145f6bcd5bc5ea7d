use unicode_segmentation::UnicodeSegmentation;

use crate::interpreter::builtins::define;
use crate::interpreter::engine::MacroEngine;
use crate::interpreter::env::Character;

type CardField = fn(&Character) -> String;

const CARD_FIELDS: [(&str, &str, CardField); 5] = [
    ("description", "Character description.", |c| c.description.clone()),
    ("personality", "Character personality.", |c| c.personality.clone()),
    ("scenario", "Character scenario.", |c| c.scenario.clone()),
    ("mesExamples", "Example dialogue.", |c| c.mes_examples.clone()),
    ("firstMessage", "Character greeting.", |c| c.first_message.clone()),
];

pub(super) fn register(engine: &mut MacroEngine) {
    engine.register_macro(define("user", "User display name.", &[], |call| {
        Ok(call.env().names.user.clone())
    }));
    engine.register_macro(define("char", "Character display name.", &[], |call| {
        Ok(call.env().names.char.clone())
    }));
    engine.register_macro(define("group", "Group member names.", &[], |call| {
        Ok(call.env().names.group.clone())
    }));

    for (name, description, field) in CARD_FIELDS {
        engine.register_macro(define(name, description, &[], move |call| {
            Ok(call.env().character.as_ref().map(field).unwrap_or_default())
        }));
    }

    engine.register_macro(define("newline", "A line break.", &[], |_| Ok("\n".to_string())));
    engine.register_macro(define("noop", "Expands to nothing.", &[], |_| Ok(String::new())));
    engine.register_macro(define(
        "original",
        "The original text, once per evaluation.",
        &[],
        |call| Ok(call.env().take_original()),
    ));
    engine.register_macro(define(
        "reverse",
        "Reverse text by grapheme.",
        &["value"],
        |call| Ok(call.arg(0).unwrap_or_default().graphemes(true).rev().collect()),
    ));
}
