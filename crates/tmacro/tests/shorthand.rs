//! Variable shorthand: `{{.local}}` and `{{$global}}` expressions.

use std::sync::Arc;

use tmacro::{
    EnvBuilder, EnvDefaults, EvalWarning, Evaluation, MacroEngine, MemoryVariableStore, RawEnv,
    Variables,
};

struct Session {
    engine: MacroEngine,
    builder: EnvBuilder,
    local: Arc<MemoryVariableStore>,
    global: Arc<MemoryVariableStore>,
}

impl Session {
    fn new() -> Self {
        let local = Arc::new(MemoryVariableStore::new());
        let global = Arc::new(MemoryVariableStore::new());
        let defaults = EnvDefaults::builder()
            .variables(Variables::new(local.clone(), global.clone()))
            .build();
        Self {
            engine: MacroEngine::with_builtins(),
            builder: EnvBuilder::new(defaults),
            local,
            global,
        }
    }

    fn evaluate(&self, input: &str) -> Evaluation {
        let env = self.builder.build(RawEnv::builder().content(input).build());
        self.engine.evaluate_with_diagnostics(input, &env)
    }

    fn eval(&self, input: &str) -> String {
        self.evaluate(input).output
    }

    fn local(&self, name: &str) -> Option<String> {
        self.local.snapshot().get(name).cloned()
    }
}

// =============================================================================
// Reads and Assignment
// =============================================================================

#[test]
fn read_undefined_is_empty() {
    assert_eq!(Session::new().eval("[{{.missing}}]"), "[]");
}

#[test]
fn assign_then_read() {
    let session = Session::new();
    assert_eq!(session.eval("{{.name = Alice}}Hi {{.name}}"), "Hi Alice");
    assert_eq!(session.local("name").as_deref(), Some("Alice"));
}

#[test]
fn assignment_value_resolves_macros() {
    let session = Session::new();
    session.eval("{{.who = {{user}} and {{char}}}}");
    assert_eq!(session.local("who").as_deref(), Some("User and Character"));
}

#[test]
fn shorthand_and_macros_share_stores() {
    let session = Session::new();
    assert_eq!(session.eval("{{.x = 3}}{{getvar::x}}"), "3");
    assert_eq!(session.eval("{{setglobalvar::g::7}}{{$g}}"), "7");
}

#[test]
fn local_and_global_are_separate() {
    let session = Session::new();
    session.eval("{{.v = local}}{{$v = global}}");
    assert_eq!(session.local("v").as_deref(), Some("local"));
    assert_eq!(
        session.global.snapshot().get("v").map(String::as_str),
        Some("global")
    );
}

#[test]
fn hyphenated_names() {
    let session = Session::new();
    assert_eq!(session.eval("{{.my-var = 1}}{{.my-var++}}"), "2");
}

#[test]
fn filter_on_variable() {
    let session = Session::new();
    assert_eq!(session.eval("{{.n = bob}}{{.n|capitalize}}"), "Bob");
}

// =============================================================================
// Arithmetic
// =============================================================================

#[test]
fn increment_and_decrement_return_new_value() {
    let session = Session::new();
    assert_eq!(session.eval("{{.n++}}{{.n++}}{{.n--}}"), "121");
    assert_eq!(session.local("n").as_deref(), Some("1"));
}

#[test]
fn add_and_subtract_assign() {
    let session = Session::new();
    assert_eq!(session.eval("{{.hp = 10}}{{.hp -= 3}}{{.hp += 0.5}}{{.hp}}"), "7.5");
}

#[test]
fn add_assign_appends_text() {
    let session = Session::new();
    session.eval("{{.log = a}}{{.log += b}}{{.log += 1}}");
    assert_eq!(session.local("log").as_deref(), Some("ab1"));
}

#[test]
fn increment_on_text_stays_literal() {
    let session = Session::new();
    let evaluation = session.evaluate("{{.s = abc}}{{.s++}}");
    assert_eq!(evaluation.output, "{{.s++}}");
    assert!(evaluation
        .diagnostics
        .contains(&EvalWarning::NonNumericVariable {
            name: "s".to_string(),
            op: "++".to_string(),
            value: "abc".to_string(),
        }));
    assert_eq!(session.local("s").as_deref(), Some("abc"));
}

#[test]
fn subtract_non_number_stays_literal() {
    let session = Session::new();
    assert_eq!(session.eval("{{.n = 5}}{{.n -= x}}"), "{{.n -= x}}");
    assert_eq!(session.local("n").as_deref(), Some("5"));
}

// =============================================================================
// Logical and Comparison Operators
// =============================================================================

#[test]
fn or_treats_zero_and_empty_as_false() {
    let session = Session::new();
    assert_eq!(session.eval("{{.z = 0}}{{.z || fallback}}"), "fallback");
    assert_eq!(session.eval("{{.missing || fallback}}"), "fallback");
    assert_eq!(session.eval("{{.v = yes}}{{.v || fallback}}"), "yes");
}

#[test]
fn nullish_only_replaces_undefined() {
    let session = Session::new();
    assert_eq!(session.eval("{{.z = 0}}{{.z ?? fallback}}"), "0");
    assert_eq!(session.eval("{{.undefined ?? fallback}}"), "fallback");
    assert_eq!(session.local("undefined"), None);
}

#[test]
fn comparisons() {
    let session = Session::new();
    session.eval("{{.hp = 10}}{{.name = bob}}");
    let cases = [
        ("{{.hp > 5}}", "true"),
        ("{{.hp >= 10}}", "true"),
        ("{{.hp < 9.5}}", "false"),
        ("{{.hp <= 10}}", "true"),
        ("{{.hp == 10.0}}", "true"),
        ("{{.hp != 10}}", "false"),
        ("{{.name == bob}}", "true"),
        ("{{.name != alice}}", "true"),
        ("{{.name > alice}}", "false"),
    ];
    for (input, expected) in cases {
        assert_eq!(session.eval(input), expected, "{input}");
    }
}

#[test]
fn comparison_drives_if() {
    let session = Session::new();
    session.eval("{{.hp = 3}}");
    assert_eq!(
        session.eval("{{if::{{.hp < 5}}::low{{else}}fine}}"),
        "low"
    );
}
