// ABOUTME: Display formatting for rolled formulas.
// ABOUTME: Renders per-die breakdowns and canonical formula strings.

use crate::roller::{ResolvedToken, RolledDice};
use crate::token::FormulaToken;

/// Render the per-die breakdown string for a resolved formula.
///
/// Dice appear bracketed in original roll order, dropped dice wrapped in
/// `~~…~~`. A formula with no dice at all gets an ` = total` suffix so a
/// pure arithmetic formula still reports its value.
pub fn render(tokens: &[ResolvedToken], total: i64) -> String {
    let mut pieces = Vec::with_capacity(tokens.len());
    let mut has_dice = false;

    for token in tokens {
        match token {
            ResolvedToken::Static { value, .. } => pieces.push(value.to_string()),
            ResolvedToken::Operator(op) => pieces.push(op.to_string()),
            ResolvedToken::Dice { rolled, .. } => {
                has_dice = true;
                pieces.push(dice_breakdown(rolled));
            }
        }
    }

    let mut out = join_spaced(&pieces);
    if !has_dice {
        out.push_str(&format!(" = {}", total));
    }
    out
}

/// Canonical re-serialization of an input token list.
///
/// Dice render as `<count>d<faces><modifiers>` and static tokens as their
/// original text, independent of any rolled outcome.
pub fn canonical_formula(tokens: &[FormulaToken]) -> String {
    let pieces: Vec<String> = tokens
        .iter()
        .map(|token| match token {
            FormulaToken::Static { text, .. } => text.clone(),
            FormulaToken::Operator(op) => op.to_string(),
            FormulaToken::Dice(dice) => dice.to_string(),
        })
        .collect();

    join_spaced(&pieces)
}

fn dice_breakdown(rolled: &RolledDice) -> String {
    let rendered: Vec<String> = rolled
        .dice
        .iter()
        .map(|d| {
            if d.kept {
                format!("[{}]", d.value)
            } else {
                format!("~~[{}]~~", d.value)
            }
        })
        .collect();

    match rolled.ones_start {
        // Double-digit: tens pool, ones pool, then the combined value.
        Some(_) => format!("{} = {}", rendered.join(" "), rolled.total),
        None => rendered.join(" + "),
    }
}

/// Join pieces with single spaces, suppressing spaces just inside parens.
fn join_spaced(pieces: &[String]) -> String {
    let mut out = String::new();

    for piece in pieces {
        if !out.is_empty() && !out.ends_with('(') && piece != ")" {
            out.push(' ');
        }
        out.push_str(piece);
    }

    out
}
