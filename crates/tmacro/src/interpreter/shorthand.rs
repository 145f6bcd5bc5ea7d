//! Variable shorthand: `{{.name}}`, `{{$name op rhs}}`.

use crate::interpreter::error::EvalWarning;
use crate::interpreter::resolver::Resolver;
use crate::interpreter::variables::VariableStore;
use crate::parser::{VarOp, VarScope, VariableExpr};

/// Parse a finite number, ignoring surrounding whitespace.
pub fn parse_number(value: &str) -> Option<f64> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }
    value.parse::<f64>().ok().filter(|n| n.is_finite())
}

/// Format a number without a fractional part when it has none.
pub fn format_number(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        format!("{value}")
    }
}

/// Falsy means empty or `"0"`.
pub fn is_truthy(value: &str) -> bool {
    !value.is_empty() && value != "0"
}

/// Numeric sum when both sides are numbers, otherwise concatenation.
/// An undefined or empty variable counts as zero.
pub fn add_values(current: Option<&str>, rhs: &str) -> String {
    match (numeric_or_zero(current), parse_number(rhs)) {
        (Some(a), Some(b)) => format_number(a + b),
        _ => format!("{}{rhs}", current.unwrap_or_default()),
    }
}

fn numeric_or_zero(value: Option<&str>) -> Option<f64> {
    match value {
        Some(v) if !v.trim().is_empty() => parse_number(v),
        _ => Some(0.0),
    }
}

/// Add `delta` to a numeric variable in one store update.
///
/// Returns the stored value, or the current value when it is not a number.
pub fn step_variable(store: &dyn VariableStore, name: &str, delta: f64) -> Result<String, String> {
    let mut rejected = String::new();
    let stored = store.update(name, &mut |current| match numeric_or_zero(current) {
        Some(n) => Some(format_number(n + delta)),
        None => {
            rejected = current.unwrap_or_default().to_string();
            None
        }
    });
    stored.ok_or(rejected)
}

/// Result of a comparison operator. Ordering needs numbers on both sides;
/// equality falls back to text.
pub fn compare(op: VarOp, lhs: &str, rhs: &str) -> bool {
    let numbers = parse_number(lhs).zip(parse_number(rhs));
    match op {
        VarOp::Eq => numbers.map_or(lhs == rhs, |(a, b)| a == b),
        VarOp::Ne => numbers.map_or(lhs != rhs, |(a, b)| a != b),
        VarOp::Gt => numbers.is_some_and(|(a, b)| a > b),
        VarOp::Ge => numbers.is_some_and(|(a, b)| a >= b),
        VarOp::Lt => numbers.is_some_and(|(a, b)| a < b),
        VarOp::Le => numbers.is_some_and(|(a, b)| a <= b),
        _ => false,
    }
}

impl Resolver<'_> {
    pub(crate) fn resolve_variable(&self, expr: &VariableExpr) -> String {
        let Some(_guard) = self.enter(&expr.name) else {
            return expr.literal.source();
        };
        let label = match expr.scope {
            VarScope::Local => format!(".{}", expr.name),
            VarScope::Global => format!("${}", expr.name),
        };
        if !self.check_filters(&label, &expr.filters) {
            return self.resolve_literal(&expr.literal);
        }
        self.apply_operator(expr)
            .and_then(|value| self.apply_filters(&label, &expr.filters, value))
            .unwrap_or_else(|| self.resolve_literal(&expr.literal))
    }

    /// `None` leaves the expression as literal text.
    fn apply_operator(&self, expr: &VariableExpr) -> Option<String> {
        let store = self.env().variables.scope(expr.scope);
        let name = expr.name.as_str();
        // Right-hand sides are resolved only on the paths that use them.
        let rhs = || {
            expr.operand
                .as_ref()
                .map(|operand| self.resolve(operand))
                .unwrap_or_default()
        };

        let Some(op) = expr.op else {
            return Some(store.get(name).unwrap_or_default());
        };
        match op {
            VarOp::Assign => {
                store.set(name, rhs());
                Some(String::new())
            }
            VarOp::AddAssign => {
                let rhs = rhs();
                store.update(name, &mut |current| Some(add_values(current, &rhs)));
                Some(String::new())
            }
            VarOp::SubAssign => {
                let rhs = rhs();
                let Some(delta) = parse_number(&rhs) else {
                    self.non_numeric(expr, op, rhs);
                    return None;
                };
                self.step(expr, op, store, -delta).map(|_| String::new())
            }
            VarOp::Increment => self.step(expr, op, store, 1.0),
            VarOp::Decrement => self.step(expr, op, store, -1.0),
            VarOp::Or => match store.get(name) {
                Some(value) if is_truthy(&value) => Some(value),
                _ => Some(rhs()),
            },
            VarOp::Nullish => Some(store.get(name).unwrap_or_else(rhs)),
            VarOp::OrAssign => match store.get(name) {
                Some(value) if is_truthy(&value) => Some(value),
                _ => {
                    let value = rhs();
                    store.set(name, value.clone());
                    Some(value)
                }
            },
            VarOp::NullishAssign => match store.get(name) {
                Some(value) => Some(value),
                None => {
                    let value = rhs();
                    store.set(name, value.clone());
                    Some(value)
                }
            },
            VarOp::Eq | VarOp::Ne | VarOp::Gt | VarOp::Ge | VarOp::Lt | VarOp::Le => {
                let lhs = store.get(name).unwrap_or_default();
                Some(compare(op, &lhs, &rhs()).to_string())
            }
        }
    }

    fn step(
        &self,
        expr: &VariableExpr,
        op: VarOp,
        store: &dyn VariableStore,
        delta: f64,
    ) -> Option<String> {
        match step_variable(store, &expr.name, delta) {
            Ok(value) => Some(value),
            Err(current) => {
                self.non_numeric(expr, op, current);
                None
            }
        }
    }

    fn non_numeric(&self, expr: &VariableExpr, op: VarOp, value: String) {
        self.warn(EvalWarning::NonNumericVariable {
            name: expr.name.clone(),
            op: op.to_string(),
            value,
        });
    }
}
