//! CLI command implementations.

mod check;
mod eval;
mod input;
mod macros;
mod tokens;

pub use check::{run_check, CheckArgs};
pub use eval::{run_eval, EvalArgs};
pub use macros::{run_macros, MacrosArgs};
pub use tokens::{run_tokens, TokensArgs};
