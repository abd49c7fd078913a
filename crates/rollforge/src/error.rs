// ABOUTME: Error types for the rollforge library.
// ABOUTME: Covers tokenization, resolution, and expression evaluation errors.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Invalid characters in formula: '{0}'")]
    InvalidCharacters(String),

    #[error("Invalid dice type: d{0}")]
    InvalidDieSize(u32),

    #[error("Invalid dice count: {0}")]
    InvalidDiceCount(u32),

    #[error("Double-digit dice (d{0}) can only be rolled one at a time.")]
    DoubleDigitCount(u32),

    #[error("Unsubstituted variable: {0}")]
    UnresolvedVariable(String),

    #[error("Invalid characters in expression: '{0}'")]
    ExpressionChar(char),

    #[error("Malformed expression: expected {0}")]
    MalformedExpression(String),

    #[error("Expression did not evaluate to a finite number")]
    NonFiniteResult,
}

pub type Result<T> = std::result::Result<T, Error>;
