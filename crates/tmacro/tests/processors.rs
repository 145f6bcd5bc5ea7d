//! Pre- and post-processor pipelines around resolution.

use std::sync::{Arc, Mutex, PoisonError};

use tmacro::{EnvBuilder, Environment, MacroEngine, ProcessorOptions, RawEnv, processor};

fn env(content: &str) -> Environment {
    EnvBuilder::default().build(RawEnv::builder().content(content).build())
}

fn options(priority: i32, source: &str) -> ProcessorOptions {
    ProcessorOptions::builder()
        .priority(priority)
        .source(source)
        .build()
}

#[test]
fn pre_processor_output_is_resolved() {
    let mut engine = MacroEngine::with_builtins();
    engine.add_pre_processor(
        processor(|text, _| text.replace("@name", "{{user}}")),
        ProcessorOptions::default(),
    );
    assert_eq!(engine.evaluate("Hi @name", &env("Hi @name")), "Hi User");
}

#[test]
fn post_processor_sees_resolved_text() {
    let mut engine = MacroEngine::with_builtins();
    engine.add_post_processor(
        processor(|text, env| format!("{text} ({})", env.names.char)),
        ProcessorOptions::default(),
    );
    assert_eq!(engine.evaluate("{{user}}", &env("{{user}}")), "User (Character)");
}

#[test]
fn processors_run_by_priority_then_registration() {
    let mut engine = MacroEngine::new();
    engine.add_post_processor(processor(|text, _| format!("{text}b")), options(5, "b"));
    engine.add_post_processor(processor(|text, _| format!("{text}a")), options(-1, "a"));
    engine.add_post_processor(processor(|text, _| format!("{text}c")), options(5, "c"));
    assert_eq!(engine.post_processors().sources(), vec!["a", "b", "c"]);
    assert_eq!(engine.evaluate("", &env("")), "abc");
}

#[test]
fn remove_by_handle() {
    let mut engine = MacroEngine::new();
    let shout = processor(|text, _| text.to_uppercase());
    let same_body = processor(|text, _| text.to_uppercase());
    engine.add_pre_processor(Arc::clone(&shout), options(0, "shout"));
    engine.add_pre_processor(same_body, options(0, "other"));
    assert!(engine.remove_pre_processor(&shout));
    assert!(!engine.remove_pre_processor(&shout));
    assert_eq!(engine.pre_processors().sources(), vec!["other"]);
}

#[test]
fn builtin_unescape_runs_after_default_priority() {
    let seen = Arc::new(Mutex::new(String::new()));
    let mut engine = MacroEngine::with_builtins();
    let record = Arc::clone(&seen);
    engine.add_post_processor(
        processor(move |text, _| {
            *record.lock().unwrap_or_else(PoisonError::into_inner) = text.to_string();
            text.to_string()
        }),
        ProcessorOptions::default(),
    );
    let input = r"\{{user\}}";
    assert_eq!(engine.evaluate(input, &env(input)), "{{user}}");
    assert_eq!(
        seen.lock().unwrap_or_else(PoisonError::into_inner).as_str(),
        r"\{{user\}}"
    );
    assert_eq!(
        engine.post_processors().sources(),
        vec!["", "builtin:unescape"]
    );
}

#[test]
fn engine_without_builtins_keeps_escapes() {
    let engine = MacroEngine::new();
    let input = r"\{{user}}";
    assert_eq!(engine.evaluate(input, &env(input)), r"\{{user}}");
}
