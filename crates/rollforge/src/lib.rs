// ABOUTME: Core library for tokenizing, rolling, and evaluating dice formulas.
// ABOUTME: Supports advantage, exploding criticals, vicious dice, and d44/d66/d88.

//! # Rollforge
//!
//! A dice-formula engine: tokenizer, roller, and expression evaluator with
//! a human-readable breakdown of every die rolled, kept, dropped, or
//! exploded.
//!
//! ## Quick Start
//!
//! ```
//! use rollforge::{roll, RollOptions};
//!
//! let result = roll("2d6 + 3", RollOptions::default()).unwrap();
//! println!("{}", result.display);  // e.g., "[4] + [6] + 3"
//! println!("{}", result.total);    // 13
//! ```
//!
//! ## Supported Notation
//!
//! - Basic rolls: `2d6`, `d20`, `d100`
//! - Double-digit dice: `d44`, `d66`, `d88`
//! - Exploding criticals: `1d6!` (first die), `3d6!!` (every die)
//! - Vicious bonus dice: `1d6v`
//! - Advantage/disadvantage: `2d20a`, `2d20d2`
//! - Arithmetic: `2d6 + 5`, `(1d6 + 2) * 3`
//! - Variables: `1d20 + STR` (substitute before rolling)
//!
//! ## Variables
//!
//! Uppercase names tokenize as placeholders. Tokenize first, substitute
//! values, then roll:
//!
//! ```
//! use rollforge::{resolve_variables, roll_tokens, tokenize, RollOptions};
//!
//! let mut tokens = tokenize("1d20 + STR").unwrap();
//! resolve_variables(&mut tokens, |name| (name == "STR").then_some(4));
//! let result = roll_tokens(&tokens, RollOptions::default()).unwrap();
//! assert!(result.total >= 5 && result.total <= 24);
//! ```

pub mod display;
pub mod error;
pub mod eval;
pub mod lexer;
pub mod roller;
pub mod sim;
pub mod token;

pub use error::{Error, Result};
pub use lexer::tokenize;
pub use roller::{
    Die, DieCategory, FastRng, FormulaResult, ResolvedToken, Rng, RolledDice, ScriptedRng,
};
pub use sim::{simulate, simulate_seeded, SimResult};
pub use token::{DiceToken, DieSize, FormulaToken, Modifier, Op, RollOptions};

/// Tokenize, roll, and evaluate a formula in one step.
///
/// # Examples
///
/// ```
/// use rollforge::{roll, RollOptions};
///
/// let result = roll("3d6 + 2", RollOptions::default()).unwrap();
/// assert!(result.total >= 5 && result.total <= 20);
/// ```
pub fn roll(formula: &str, options: RollOptions) -> Result<FormulaResult> {
    roll_with_rng(formula, options, &mut FastRng::new())
}

/// Tokenize, roll, and evaluate a formula with a custom RNG.
///
/// Useful for testing or when you need reproducible results.
///
/// # Examples
///
/// ```
/// use rollforge::{roll_with_rng, FastRng, RollOptions};
///
/// let mut rng = FastRng::with_seed(42);
/// let result = roll_with_rng("2d6", RollOptions::default(), &mut rng).unwrap();
/// ```
pub fn roll_with_rng(
    formula: &str,
    options: RollOptions,
    rng: &mut impl Rng,
) -> Result<FormulaResult> {
    let tokens = lexer::tokenize(formula)?;
    roll_tokens_with_rng(&tokens, options, rng)
}

/// Roll and evaluate an already-tokenized formula.
///
/// For pipelines that tokenize once, substitute variables, and roll later;
/// see [`resolve_variables`].
pub fn roll_tokens(tokens: &[FormulaToken], options: RollOptions) -> Result<FormulaResult> {
    roll_tokens_with_rng(tokens, options, &mut FastRng::new())
}

/// Roll and evaluate an already-tokenized formula with a custom RNG.
pub fn roll_tokens_with_rng(
    tokens: &[FormulaToken],
    options: RollOptions,
    rng: &mut impl Rng,
) -> Result<FormulaResult> {
    let resolved = roller::resolve(tokens, &options, rng)?;
    let total = eval::total(&resolved)?;

    let mut criticals = 0;
    let mut fumble = false;
    for token in &resolved {
        if let ResolvedToken::Dice { rolled, .. } = token {
            criticals += rolled.criticals;
            fumble |= rolled.fumble;
        }
    }

    Ok(FormulaResult {
        display: display::render(&resolved, total),
        formula: display::canonical_formula(tokens),
        tokens: resolved,
        total,
        criticals,
        fumble,
    })
}

/// Substitute variable tokens in place using a lookup function.
///
/// Names the lookup does not know stay unresolved; rolling a formula with
/// an unresolved variable fails with [`Error::UnresolvedVariable`].
pub fn resolve_variables<F>(tokens: &mut [FormulaToken], lookup: F)
where
    F: Fn(&str) -> Option<i64>,
{
    for token in tokens {
        if let FormulaToken::Static {
            value,
            text,
            is_variable,
        } = token
        {
            if *is_variable {
                if let Some(resolved) = lookup(text) {
                    *value = resolved;
                    *is_variable = false;
                }
            }
        }
    }
}
