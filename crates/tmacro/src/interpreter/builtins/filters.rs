use unicode_segmentation::UnicodeSegmentation;

use crate::interpreter::engine::MacroEngine;
use crate::interpreter::error::MacroError;

fn expect_args(filter: &str, args: &[String], count: usize) -> Result<(), MacroError> {
    if args.len() == count {
        Ok(())
    } else {
        Err(MacroError::invalid_argument(
            filter,
            format!("expects {count} arguments, got {}", args.len()),
        ))
    }
}

/// Uppercase the first grapheme.
pub fn capitalize(value: &str) -> String {
    let mut graphemes = value.graphemes(true);
    match graphemes.next() {
        Some(first) => format!("{}{}", first.to_uppercase(), graphemes.as_str()),
        None => String::new(),
    }
}

pub(super) fn register(engine: &mut MacroEngine) {
    engine.register_filter("upper", |value, args| {
        expect_args("upper", args, 0)?;
        Ok(value.to_uppercase())
    });
    engine.register_filter("lower", |value, args| {
        expect_args("lower", args, 0)?;
        Ok(value.to_lowercase())
    });
    engine.register_filter("trim", |value, args| {
        expect_args("trim", args, 0)?;
        Ok(value.trim().to_string())
    });
    engine.register_filter("capitalize", |value, args| {
        expect_args("capitalize", args, 0)?;
        Ok(capitalize(value))
    });
    engine.register_filter("replace", |value, args| {
        expect_args("replace", args, 2)?;
        if args[0].is_empty() {
            return Err(MacroError::invalid_argument("replace", "pattern is empty"));
        }
        Ok(value.replace(&args[0], &args[1]))
    });
    engine.register_filter("default", |value, args| {
        expect_args("default", args, 1)?;
        if value.is_empty() {
            Ok(args[0].clone())
        } else {
            Ok(value.to_string())
        }
    });
}
