//! End-to-end evaluation through the engine with built-in macros.

use std::sync::Arc;

use pretty_assertions::assert_eq;
use tmacro::{
    EnvBuilder, EnvDefaults, EvalWarning, MacroEngine, MemoryVariableStore, RawEnv, Variables,
};

fn eval(input: &str) -> String {
    let engine = MacroEngine::with_builtins();
    let env = EnvBuilder::default().build(RawEnv::builder().content(input).build());
    engine.evaluate(input, &env)
}

/// An engine and environment builder sharing one pair of variable stores.
struct Session {
    engine: MacroEngine,
    builder: EnvBuilder,
    local: Arc<MemoryVariableStore>,
}

impl Session {
    fn new() -> Self {
        let local = Arc::new(MemoryVariableStore::new());
        let global = Arc::new(MemoryVariableStore::new());
        let defaults = EnvDefaults::builder()
            .variables(Variables::new(local.clone(), global))
            .build();
        Self {
            engine: MacroEngine::with_builtins(),
            builder: EnvBuilder::new(defaults),
            local,
        }
    }

    fn eval(&self, input: &str) -> String {
        let env = self.builder.build(RawEnv::builder().content(input).build());
        self.engine.evaluate(input, &env)
    }

    fn var(&self, name: &str) -> Option<String> {
        self.local.snapshot().get(name).cloned()
    }
}

// =============================================================================
// Scenarios
// =============================================================================

#[test]
fn greeting_uses_default_user_name() {
    assert_eq!(eval("Hello, {{user}}!"), "Hello, User!");
}

#[test]
fn set_then_get_variable() {
    assert_eq!(eval("{{setvar::test::4}}{{getvar::test}}"), "4");
}

#[test]
fn unknown_macro_keeps_literal_with_inner_resolved() {
    assert_eq!(eval("{{unknown::{{newline}}}}"), "{{unknown::\n}}");
}

#[test]
fn nested_reversal_resolves_inside_out() {
    assert_eq!(eval("{{reverse::{{reverse::abc}}}}"), "abc");
}

#[test]
fn arity_mismatch_stays_literal() {
    let engine = MacroEngine::with_builtins();
    let input = "{{char::extra}}";
    let env = EnvBuilder::default().build(RawEnv::builder().content(input).build());
    let evaluation = engine.evaluate_with_diagnostics(input, &env);
    assert_eq!(evaluation.output, "{{char::extra}}");
    assert!(evaluation.diagnostics.iter().any(|warning| matches!(
        warning,
        EvalWarning::ArgumentCount { name, got: 1, .. } if name == "char"
    )));
}

#[test]
fn scoped_content_is_dedented() {
    let session = Session::new();
    let output = session.eval("{{setvar::v}}\n  line1\n  line2\n{{/setvar}}{{getvar::v}}");
    assert_eq!(output, "line1\nline2");
    assert_eq!(session.var("v").as_deref(), Some("line1\nline2"));
}

#[test]
fn plain_text_is_unchanged() {
    let text = "No macros here: just {single} braces and a | pipe.";
    assert_eq!(eval(text), text);
    assert_eq!(eval(&eval(text)), text);
}

#[test]
fn empty_input() {
    assert_eq!(eval(""), "");
}

// =============================================================================
// Braces and Escapes
// =============================================================================

#[test]
fn extra_braces_are_peeled() {
    assert_eq!(eval("{{{char}}}"), "{Character}");
    assert_eq!(eval("{{{{char}}}}"), "{{Character}}");
}

#[test]
fn unbalanced_brace_in_argument() {
    let input = "{{setvar::x::a{b}}[{{getvar::x}}]";
    let env = EnvBuilder::default().build(RawEnv::builder().content(input).build());
    let evaluation = MacroEngine::with_builtins().evaluate_with_diagnostics(input, &env);
    assert_eq!(evaluation.output, "[a{b]");
    assert!(evaluation.diagnostics.is_empty());
    assert_eq!(eval("{{reverse::b}a}}"), "a}b");
    assert_eq!(eval("{{reverse::{{{char}}}}}"), "}retcarahC{");
}

#[test]
fn escaped_macro_is_unescaped_after_resolution() {
    assert_eq!(eval(r"\{{user\}} is {{user}}"), "{{user}} is User");
}

#[test]
fn unterminated_macro_is_kept() {
    assert_eq!(eval("Hi {{user"), "Hi {{user");
    assert_eq!(eval("Hi {{reverse::{{user}}"), "Hi {{reverse::User");
}

#[test]
fn malformed_macro_is_kept_and_later_macros_resolve() {
    assert_eq!(eval("{{user!}} and {{user}}"), "{{user!}} and User");
    assert_eq!(eval("{{42}}{{char}}"), "{{42}}Character");
}

// =============================================================================
// Argument Forms
// =============================================================================

#[test]
fn legacy_separators() {
    assert_eq!(eval("{{reverse abc}}"), "cba");
    assert_eq!(eval("{{setvar:x::5}}{{getvar:x}}"), "5");
    assert_eq!(eval("{{setvar x::6}}{{getvar x}}"), "6");
}

#[test]
fn quoted_argument_keeps_separators() {
    assert_eq!(eval(r#"{{setvar::q::"a :: b"}}{{getvar::q}}"#), "a :: b");
}

#[test]
fn escaped_pipe_is_literal() {
    assert_eq!(eval(r"{{reverse::a\|b}}"), "b|a");
}

#[test]
fn undeclared_key_value_is_unnamed() {
    assert_eq!(eval("{{reverse::a=b}}"), "b=a");
}

#[test]
fn names_are_case_insensitive() {
    assert_eq!(eval("{{USER}} {{Char}}"), "User Character");
}

// =============================================================================
// Filters
// =============================================================================

#[test]
fn filters_apply_left_to_right() {
    assert_eq!(eval("{{user | upper}}"), "USER");
    assert_eq!(eval("{{user|replace::U::J|upper}}"), "JSER");
    assert_eq!(eval("{{user|upper|replace::U::J}}"), "JSER");
}

#[test]
fn filter_on_nested_result() {
    assert_eq!(eval("{{reverse::{{char|lower}}}}"), "retcarahc");
}

#[test]
fn unknown_filter_keeps_literal() {
    assert_eq!(eval("{{user|nope}}"), "{{user|nope}}");
}

#[test]
fn filter_with_flag_keeps_literal() {
    assert_eq!(eval("{{user|!upper}}"), "{{user|!upper}}");
}

#[test]
fn failing_filter_keeps_literal() {
    assert_eq!(eval("{{user|replace::x}}"), "{{user|replace::x}}");
}

// =============================================================================
// Depth
// =============================================================================

#[test]
fn depth_limit_leaves_innermost_as_written() {
    let mut engine = MacroEngine::builder().max_depth(2).build();
    engine.install_builtins();
    let input = "{{reverse::{{reverse::{{reverse::abc}}}}}}";
    let env = EnvBuilder::default().build(RawEnv::builder().content(input).build());
    let evaluation = engine.evaluate_with_diagnostics(input, &env);
    assert_eq!(evaluation.output, "{{reverse::abc}}");
    assert!(evaluation
        .diagnostics
        .contains(&EvalWarning::MaxDepthExceeded {
            name: "reverse".to_string(),
            depth: 2,
        }));
}

#[test]
fn engine_defaults() {
    let engine = MacroEngine::new();
    assert_eq!(engine.max_depth(), 64);
    assert!(engine.trim_scoped_content());
    assert!(engine.registry().is_empty());
}
