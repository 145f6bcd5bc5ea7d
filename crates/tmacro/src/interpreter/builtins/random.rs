use const_fnv1a_hash::fnv1a_hash_str_64;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use winnow::ascii::{digit1, space0};
use winnow::combinator::{opt, preceded};
use winnow::error::{ContextError, ErrMode};
use winnow::prelude::*;
use winnow::token::one_of;

use crate::interpreter::call::MacroCall;
use crate::interpreter::engine::MacroEngine;
use crate::interpreter::error::MacroError;
use crate::interpreter::registry::{ArgSpec, ListBounds, MacroDefinition, macro_handler};

const MAX_DICE: u32 = 100;
const MAX_SIDES: u32 = 10_000;

pub(super) fn register(engine: &mut MacroEngine) {
    engine.register_macro(
        MacroDefinition::builder()
            .name("pick")
            .description("Choose one option, stable for this position in the content.")
            .list(ListBounds::unbounded(1))
            .handler(macro_handler(|call| {
                let options = options(call);
                let seed = fnv1a_hash_str_64(&format!(
                    "{}:{}",
                    call.env().content_hash,
                    call.offset()
                ));
                let mut rng = StdRng::seed_from_u64(seed);
                Ok(options[rng.gen_range(0..options.len())].clone())
            }))
            .build(),
    );
    engine.register_macro(
        MacroDefinition::builder()
            .name("random")
            .description("Choose one option at random.")
            .list(ListBounds::unbounded(1))
            .handler(macro_handler(|call| {
                let options = options(call);
                Ok(options[rand::thread_rng().gen_range(0..options.len())].clone())
            }))
            .build(),
    );
    engine.register_macro(
        MacroDefinition::builder()
            .name("roll")
            .description("Roll dice written as NdS+M.")
            .unnamed_args(vec![ArgSpec::required("formula")])
            .handler(macro_handler(|call| {
                let formula = call.arg(0).unwrap_or_default();
                let dice = parse_dice(formula)?;
                Ok(dice.roll(&mut rand::thread_rng()).to_string())
            }))
            .build(),
    );
}

/// Choices from the arguments. A single argument is split on commas.
fn options(call: &MacroCall<'_>) -> Vec<String> {
    match call.args().as_slice() {
        [single] => single.split(',').map(|s| s.trim().to_string()).collect(),
        many => many.iter().map(|s| (*s).to_string()).collect(),
    }
}

/// A parsed dice formula.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Dice {
    count: u32,
    sides: u32,
    modifier: i64,
}

impl Dice {
    fn roll(&self, rng: &mut impl Rng) -> i64 {
        let total: i64 = (0..self.count)
            .map(|_| i64::from(rng.gen_range(1..=self.sides)))
            .sum();
        total + self.modifier
    }
}

fn parse_dice(formula: &str) -> Result<Dice, MacroError> {
    let invalid = || MacroError::invalid_argument("formula", format!("'{formula}' is not a dice formula"));
    let mut remaining = formula.trim();
    let dice = dice(&mut remaining).map_err(|_| invalid())?;
    if !remaining.is_empty() {
        return Err(invalid());
    }
    if dice.count == 0 || dice.count > MAX_DICE || dice.sides == 0 || dice.sides > MAX_SIDES {
        return Err(invalid());
    }
    Ok(dice)
}

fn number(input: &mut &str) -> ModalResult<u32> {
    digit1.parse_to().parse_next(input)
}

/// `NdS`, `dS` or a bare `S`, with an optional `+M`/`-M`.
fn dice(input: &mut &str) -> ModalResult<Dice> {
    let count = opt(number).parse_next(input)?;
    let sides = opt(preceded(one_of(['d', 'D']), number)).parse_next(input)?;
    let modifier = opt((space0, one_of(['+', '-']), space0, number))
        .map(|m| match m {
            Some((_, '-', _, n)) => -i64::from(n),
            Some((_, _, _, n)) => i64::from(n),
            None => 0,
        })
        .parse_next(input)?;
    let (count, sides) = match (count, sides) {
        (count, Some(sides)) => (count.unwrap_or(1), sides),
        (Some(sides), None) => (1, sides),
        (None, None) => return Err(ErrMode::Backtrack(ContextError::new())),
    };
    Ok(Dice {
        count,
        sides,
        modifier,
    })
}
