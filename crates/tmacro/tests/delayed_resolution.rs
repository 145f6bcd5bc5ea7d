//! Eager versus delayed argument resolution and lazy operators.

use std::collections::{BTreeSet, HashMap};
use std::sync::{Arc, Mutex, PoisonError};

use tmacro::{
    ArgSpec, EnvBuilder, EnvDefaults, MacroDefinition, MacroEngine, MemoryVariableStore, RawEnv,
    VariableStore, Variables, macro_handler,
};

/// Records every value written so transient writes are visible.
#[derive(Default)]
struct RecordingStore {
    inner: MemoryVariableStore,
    writes: Mutex<Vec<(String, String)>>,
}

impl RecordingStore {
    fn record(&self, key: &str, value: &str) {
        self.writes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((key.to_string(), value.to_string()));
    }

    fn writes(&self) -> Vec<(String, String)> {
        self.writes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl VariableStore for RecordingStore {
    fn get(&self, key: &str) -> Option<String> {
        self.inner.get(key)
    }

    fn set(&self, key: &str, value: String) {
        self.record(key, &value);
        self.inner.set(key, value);
    }

    fn delete(&self, key: &str) -> bool {
        self.inner.delete(key)
    }

    fn update(
        &self,
        key: &str,
        f: &mut dyn FnMut(Option<&str>) -> Option<String>,
    ) -> Option<String> {
        let stored = self.inner.update(key, f);
        if let Some(value) = &stored {
            self.record(key, value);
        }
        stored
    }
}

struct Session {
    engine: MacroEngine,
    builder: EnvBuilder,
    local: Arc<RecordingStore>,
}

impl Session {
    fn new() -> Self {
        let local = Arc::new(RecordingStore::default());
        let defaults = EnvDefaults::builder()
            .variables(Variables::new(
                local.clone(),
                Arc::new(MemoryVariableStore::new()),
            ))
            .build();
        let mut engine = MacroEngine::with_builtins();
        engine.register_macro(
            MacroDefinition::builder()
                .name("skip")
                .unnamed_args(vec![ArgSpec::required("content")])
                .delay_arg_resolution(true)
                .handler(macro_handler(|_| Ok(String::new())))
                .build(),
        );
        engine.register_macro(
            MacroDefinition::builder()
                .name("twice")
                .unnamed_args(vec![ArgSpec::required("content")])
                .delay_arg_resolution(true)
                .handler(macro_handler(|call| {
                    let first = call.resolve_arg(0).unwrap_or_default();
                    let second = call.resolve_arg(0).unwrap_or_default();
                    Ok(first + &second)
                }))
                .build(),
        );
        engine.register_macro(
            MacroDefinition::builder()
                .name("echo2")
                .unnamed_args(vec![ArgSpec::required("content")])
                .handler(macro_handler(|call| Ok(call.arg(0).unwrap_or_default().repeat(2))))
                .build(),
        );
        Self {
            engine,
            builder: EnvBuilder::new(defaults),
            local,
        }
    }

    fn eval(&self, input: &str) -> String {
        let env = self.builder.build(RawEnv::builder().content(input).build());
        self.engine.evaluate(input, &env)
    }

    fn var(&self, name: &str) -> Option<String> {
        self.local.get(name)
    }
}

// =============================================================================
// Branch Isolation
// =============================================================================

#[test]
fn untaken_branch_never_runs() {
    let session = Session::new();
    let output = session.eval("{{if 0}}{{setvar::x::A}}{{else}}{{setvar::x::B}}{{/if}}");
    assert_eq!(output, "");
    assert_eq!(session.var("x").as_deref(), Some("B"));
    assert_eq!(session.local.writes(), vec![("x".to_string(), "B".to_string())]);
}

#[test]
fn taken_branch_runs_once() {
    let session = Session::new();
    session.eval("{{if 1}}{{incvar::n}}{{else}}{{setvar::n::99}}{{/if}}");
    assert_eq!(session.var("n").as_deref(), Some("1"));
    assert_eq!(session.local.writes().len(), 1);
}

#[test]
fn condition_can_be_a_macro_name() {
    let session = Session::new();
    assert_eq!(session.eval("{{if::user::has user}}"), "has user");
    assert_eq!(session.eval("{{if::noop::never}}"), "");
    assert_eq!(session.eval("{{if::!noop::negated}}"), "negated");
}

#[test]
fn condition_resolves_nested_macros() {
    let session = Session::new();
    assert_eq!(session.eval("{{if::{{getvar::flag}}::on}}"), "");
    assert_eq!(session.eval("{{setvar::flag::yes}}{{if::{{getvar::flag}}::on}}"), "on");
    assert_eq!(session.eval("{{if::false::on{{else}}off}}"), "off");
}

// =============================================================================
// Delayed Handlers
// =============================================================================

#[test]
fn delayed_argument_is_not_resolved_unless_asked() {
    let session = Session::new();
    assert_eq!(session.eval("{{skip::{{setvar::x::1}}}}"), "");
    assert_eq!(session.var("x"), None);
    assert!(session.local.writes().is_empty());
}

#[test]
fn delayed_handler_controls_evaluation_count() {
    let session = Session::new();
    assert_eq!(session.eval("{{twice::{{incvar::n}}}}"), "12");
}

#[test]
fn eager_argument_resolves_once() {
    let session = Session::new();
    assert_eq!(session.eval("{{echo2::{{incvar::n}}}}"), "11");
    assert_eq!(session.var("n").as_deref(), Some("1"));
}

// =============================================================================
// Lazy Operators
// =============================================================================

#[test]
fn nullish_assign_evaluates_fallback_once() {
    let session = Session::new();
    assert_eq!(session.eval("{{.x ??= {{.t = hit}}val}}"), "val");
    assert_eq!(session.var("x").as_deref(), Some("val"));
    assert_eq!(session.var("t").as_deref(), Some("hit"));
    let writes_of_t = session
        .local
        .writes()
        .iter()
        .filter(|(key, _)| key == "t")
        .count();
    assert_eq!(writes_of_t, 1);
}

#[test]
fn nullish_assign_skips_fallback_when_defined() {
    let session = Session::new();
    session.local.set("x", "existing".to_string());
    assert_eq!(session.eval("{{.x ??= {{.t = hit}}val}}"), "existing");
    assert_eq!(session.var("t"), None);
}

#[test]
fn or_skips_fallback_when_truthy() {
    let session = Session::new();
    session.local.set("x", "set".to_string());
    assert_eq!(session.eval("{{.x || {{setvar::t::1}}fallback}}"), "set");
    assert_eq!(session.var("t"), None);
}

#[test]
fn or_assign_replaces_falsy_value() {
    let session = Session::new();
    session.local.set("x", "0".to_string());
    assert_eq!(session.eval("{{.x ||= fresh}}"), "fresh");
    assert_eq!(session.var("x").as_deref(), Some("fresh"));
}

// =============================================================================
// Position-Stable Randomness
// =============================================================================

fn pick_all_letters() -> String {
    let options = ('a'..='z')
        .map(|c| c.to_string())
        .collect::<Vec<_>>()
        .join("::");
    format!("{{{{pick::{options}}}}}")
}

#[test]
fn pick_is_stable_for_same_content_and_position() {
    let engine = MacroEngine::with_builtins();
    let env = EnvBuilder::default().build(RawEnv::builder().content("fixed").build());
    let input = format!("abcdefgh{}", pick_all_letters());
    let first = engine.evaluate(&input, &env);
    let second = engine.evaluate(&input, &env);
    assert_eq!(first, second);

    // `{{if 1}}` is eight bytes, so the pick sits at the same offset.
    let inside_block = format!("{{{{if 1}}}}{}{{{{/if}}}}", pick_all_letters());
    assert_eq!(
        engine.evaluate(&inside_block, &env),
        first.trim_start_matches("abcdefgh")
    );
}

#[test]
fn pick_varies_with_position() {
    let engine = MacroEngine::with_builtins();
    let env = EnvBuilder::default().build(RawEnv::builder().content("fixed").build());
    let results: BTreeSet<String> = (0..12)
        .map(|n| {
            let input = format!("{}{}", " ".repeat(n), pick_all_letters());
            engine.evaluate(&input, &env).trim_start().to_string()
        })
        .collect();
    assert!(results.len() > 1, "pick returned {results:?} at every offset");
}

#[test]
fn pick_splits_single_argument_on_commas() {
    let engine = MacroEngine::with_builtins();
    let input = "{{pick::red, green, blue}}";
    let env = EnvBuilder::default().build(RawEnv::builder().content(input).build());
    let output = engine.evaluate(input, &env);
    assert!(["red", "green", "blue"].contains(&output.as_str()), "{output}");
}

#[test]
fn dynamic_macro_is_resolved_lazily_too() {
    let session = Session::new();
    let input = "{{if 0}}{{weather}}{{/if}}";
    let env = session.builder.build(
        RawEnv::builder()
            .content(input)
            .dynamic_macros(HashMap::from([("weather".to_string(), "rain".into())]))
            .build(),
    );
    assert_eq!(session.engine.evaluate(input, &env), "");
    assert_eq!(session.engine.evaluate("{{weather}}", &env), "rain");
}
