use crate::interpreter::builtins::define;
use crate::interpreter::call::MacroCall;
use crate::interpreter::engine::MacroEngine;
use crate::interpreter::error::MacroError;
use crate::interpreter::shorthand::{add_values, step_variable};
use crate::interpreter::variables::VariableStore;
use crate::parser::VarScope;

fn store<'c>(call: &'c MacroCall<'_>, scope: VarScope) -> &'c dyn VariableStore {
    call.env().variables.scope(scope)
}

fn key(call: &MacroCall<'_>) -> String {
    call.arg(0).unwrap_or_default().trim().to_string()
}

fn step(call: &MacroCall<'_>, scope: VarScope, delta: f64) -> Result<String, MacroError> {
    let name = key(call);
    step_variable(store(call, scope), &name, delta).map_err(|value| {
        MacroError::invalid_argument(name, format!("'{value}' is not a number"))
    })
}

/// `setvar`, `getvar` and friends, plus the `*globalvar` variants.
pub(super) fn register(engine: &mut MacroEngine) {
    for (scope, suffix) in [(VarScope::Local, "var"), (VarScope::Global, "globalvar")] {
        engine.register_macro(define(
            &format!("set{suffix}"),
            "Set a variable.",
            &["name", "value"],
            move |call| {
                let value = call.arg(1).unwrap_or_default().to_string();
                store(call, scope).set(&key(call), value);
                Ok(String::new())
            },
        ));
        engine.register_macro(define(
            &format!("get{suffix}"),
            "Read a variable.",
            &["name"],
            move |call| Ok(store(call, scope).get(&key(call)).unwrap_or_default()),
        ));
        engine.register_macro(define(
            &format!("add{suffix}"),
            "Add to a number, or append to text.",
            &["name", "value"],
            move |call| {
                let rhs = call.arg(1).unwrap_or_default();
                store(call, scope).update(&key(call), &mut |current| Some(add_values(current, rhs)));
                Ok(String::new())
            },
        ));
        engine.register_macro(define(
            &format!("inc{suffix}"),
            "Increment and return a number.",
            &["name"],
            move |call| step(call, scope, 1.0),
        ));
        engine.register_macro(define(
            &format!("dec{suffix}"),
            "Decrement and return a number.",
            &["name"],
            move |call| step(call, scope, -1.0),
        ));
        engine.register_macro(define(
            &format!("has{suffix}"),
            "Whether a variable is defined.",
            &["name"],
            move |call| Ok(store(call, scope).has(&key(call)).to_string()),
        ));
        engine.register_macro(define(
            &format!("delete{suffix}"),
            "Remove a variable.",
            &["name"],
            move |call| {
                store(call, scope).delete(&key(call));
                Ok(String::new())
            },
        ));
    }
}
