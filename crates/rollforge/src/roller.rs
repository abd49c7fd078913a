// ABOUTME: Dice rolling logic: advantage pools, criticals, explosions, vicious dice.
// ABOUTME: Resolves tokenized formulas into categorized per-die results.

use crate::error::{Error, Result};
use crate::token::{DiceToken, DieSize, FormulaToken, Op, RollOptions};
use std::fmt;

#[cfg(feature = "serde")]
use serde::Serialize;

/// Maximum explosion chain length per critical, so a biased RNG that keeps
/// landing on max face still terminates.
const MAX_EXPLOSIONS: u32 = 100;

/// Trait for random number generation, allowing for testing with fixed values.
pub trait Rng {
    /// Generate a random number in the range [1, max].
    fn roll(&mut self, max: u32) -> u32;
}

/// Default RNG using fastrand.
pub struct FastRng(fastrand::Rng);

impl FastRng {
    pub fn new() -> Self {
        Self(fastrand::Rng::new())
    }

    pub fn with_seed(seed: u64) -> Self {
        Self(fastrand::Rng::with_seed(seed))
    }
}

impl Default for FastRng {
    fn default() -> Self {
        Self::new()
    }
}

impl Rng for FastRng {
    fn roll(&mut self, max: u32) -> u32 {
        self.0.u32(1..=max)
    }
}

/// An RNG that replays a fixed sequence of values, cycling when exhausted.
///
/// For deterministic tests of roll outcomes. Values are returned as
/// scripted, without range checking against `max`.
pub struct ScriptedRng {
    values: Vec<u32>,
    index: usize,
}

impl ScriptedRng {
    pub fn new(values: Vec<u32>) -> Self {
        Self { values, index: 0 }
    }
}

impl Rng for ScriptedRng {
    fn roll(&mut self, _max: u32) -> u32 {
        let value = self.values[self.index % self.values.len()];
        self.index += 1;
        value
    }
}

/// What a single rolled die turned out to be.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub enum DieCategory {
    Normal,
    Dropped,
    Critical,
    Explosion,
    Vicious,
    Fumble,
}

/// A single rolled die with its keep/drop state and category.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub struct Die {
    /// The face rolled.
    pub value: u32,
    /// Faces on the physical die (the base die for double-digit types).
    pub faces: u32,
    /// Whether this die counts toward the total.
    pub kept: bool,
    pub category: DieCategory,
    /// Position in original roll order, for deterministic display.
    pub index: usize,
}

/// The outcome of rolling one dice token.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub struct RolledDice {
    /// Every die rolled, in roll order (pool dice, then explosions and
    /// vicious dice as they were appended).
    pub dice: Vec<Die>,
    /// Sum of kept dice, or `tens * 10 + ones` for double-digit dice.
    pub total: i64,
    /// Critical hits scored across the pool and its explosion chains.
    pub criticals: u32,
    /// Whether the first kept die fumbled.
    pub fumble: bool,
    /// For double-digit dice, the index where the ones pool begins.
    pub ones_start: Option<usize>,
}

/// A formula token with its dice (if any) fully rolled.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub enum ResolvedToken {
    Static {
        value: i64,
        text: String,
        is_variable: bool,
    },
    Operator(Op),
    Dice {
        token: DiceToken,
        rolled: RolledDice,
    },
}

/// A fully evaluated formula.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub struct FormulaResult {
    /// Per-token resolution, in formula order.
    pub tokens: Vec<ResolvedToken>,
    /// Human-readable breakdown of every die rolled.
    pub display: String,
    /// The evaluated total. 0 if the formula fumbled.
    pub total: i64,
    /// Canonical re-serialization of the input formula, for traceability.
    pub formula: String,
    /// Critical hits scored across all dice tokens.
    pub criticals: u32,
    /// Whether any dice token fumbled.
    pub fumble: bool,
}

impl fmt::Display for FormulaResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.display)
    }
}

/// Roll one dice token under the given options.
///
/// Token-level modifiers have already been folded into `opts` by the
/// caller; see [`DiceToken::options_for`].
pub fn roll_dice(token: &DiceToken, opts: &RollOptions, rng: &mut impl Rng) -> Result<RolledDice> {
    match token.sides {
        DieSize::Standard(faces) => roll_standard(token.count, faces, opts, rng),
        DieSize::DoubleDigit(base) => {
            if token.count != 1 {
                return Err(Error::DoubleDigitCount(token.sides.faces()));
            }
            Ok(roll_double_digit(base, opts, rng))
        }
    }
}

/// Resolve every token of a formula, rolling each dice token in order.
pub fn resolve(
    tokens: &[FormulaToken],
    opts: &RollOptions,
    rng: &mut impl Rng,
) -> Result<Vec<ResolvedToken>> {
    tokens
        .iter()
        .map(|token| match token {
            FormulaToken::Static {
                value,
                text,
                is_variable,
            } => Ok(ResolvedToken::Static {
                value: *value,
                text: text.clone(),
                is_variable: *is_variable,
            }),
            FormulaToken::Operator(op) => Ok(ResolvedToken::Operator(*op)),
            FormulaToken::Dice(dice) => {
                let rolled = roll_dice(dice, &dice.options_for(*opts), rng)?;
                Ok(ResolvedToken::Dice {
                    token: dice.clone(),
                    rolled,
                })
            }
        })
        .collect()
}

fn roll_standard(count: u32, faces: u32, opts: &RollOptions, rng: &mut impl Rng) -> Result<RolledDice> {
    let pool = count as usize + opts.advantage.unsigned_abs() as usize;
    let mut dice: Vec<Die> = (0..pool)
        .map(|index| Die {
            value: rng.roll(faces),
            faces,
            kept: true,
            category: DieCategory::Normal,
            index,
        })
        .collect();

    drop_for_advantage(&mut dice, opts.advantage);

    let first_kept = dice.iter().position(|d| d.kept);
    let mut criticals = 0;
    let mut fumble = false;

    if let Some(first) = first_kept {
        if opts.fumbles && dice[first].value == 1 {
            dice[first].category = DieCategory::Fumble;
            fumble = true;
        }
    }

    if opts.criticals {
        let crit_indices: Vec<usize> = if opts.explode_all {
            dice.iter()
                .enumerate()
                .filter(|(_, d)| d.kept && d.value == faces)
                .map(|(i, _)| i)
                .collect()
        } else {
            first_kept
                .into_iter()
                .filter(|&i| dice[i].value == faces)
                .collect()
        };

        for crit in crit_indices {
            dice[crit].category = DieCategory::Critical;
            criticals += 1;
            criticals += explode(&mut dice, faces, rng);
        }
    }

    if opts.vicious {
        for _ in 0..criticals {
            let index = dice.len();
            dice.push(Die {
                value: rng.roll(faces),
                faces,
                kept: true,
                category: DieCategory::Vicious,
                index,
            });
        }
    }

    let total = dice
        .iter()
        .filter(|d| d.kept)
        .map(|d| d.value as i64)
        .sum();

    Ok(RolledDice {
        dice,
        total,
        criticals,
        fumble,
        ones_start: None,
    })
}

/// Chain explosion rolls after a critical, returning extra criticals scored.
///
/// Each appended die is kept; the chain continues while the new roll also
/// lands on max face, up to [`MAX_EXPLOSIONS`] links.
fn explode(dice: &mut Vec<Die>, faces: u32, rng: &mut impl Rng) -> u32 {
    let mut extra = 0;
    for _ in 0..MAX_EXPLOSIONS {
        let value = rng.roll(faces);
        let index = dice.len();
        dice.push(Die {
            value,
            faces,
            kept: true,
            category: DieCategory::Explosion,
            index,
        });
        if value != faces {
            break;
        }
        extra += 1;
    }
    extra
}

/// Roll a double-digit die: independent tens and ones pools, each with its
/// own advantage resolution, read as a two-digit value.
fn roll_double_digit(base: u32, opts: &RollOptions, rng: &mut impl Rng) -> RolledDice {
    let pool = 1 + opts.advantage.unsigned_abs() as usize;
    let mut dice: Vec<Die> = (0..pool * 2)
        .map(|index| Die {
            value: rng.roll(base),
            faces: base,
            kept: true,
            category: DieCategory::Normal,
            index,
        })
        .collect();

    let (tens, ones) = dice.split_at_mut(pool);
    drop_for_advantage(tens, opts.advantage);
    drop_for_advantage(ones, opts.advantage);

    let kept_tens = dice[..pool].iter().find(|d| d.kept).map_or(0, |d| d.value);
    let kept_ones = dice[pool..].iter().find(|d| d.kept).map_or(0, |d| d.value);

    RolledDice {
        dice,
        total: (kept_tens * 10 + kept_ones) as i64,
        criticals: 0,
        fumble: false,
        ones_start: Some(pool),
    }
}

/// Drop the lowest (advantage) or highest (disadvantage) dice from a pool.
///
/// `sort_by_key` is stable, so among equal values the earliest-rolled die
/// is dropped first.
fn drop_for_advantage(dice: &mut [Die], advantage: i32) {
    let to_drop = advantage.unsigned_abs() as usize;
    if to_drop == 0 {
        return;
    }

    let mut indices: Vec<usize> = (0..dice.len()).collect();
    if advantage > 0 {
        indices.sort_by_key(|&i| dice[i].value);
    } else {
        indices.sort_by_key(|&i| std::cmp::Reverse(dice[i].value));
    }

    for &i in indices.iter().take(to_drop) {
        dice[i].kept = false;
        dice[i].category = DieCategory::Dropped;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::token::Modifier;

    fn plain(count: u32, faces: u32) -> DiceToken {
        DiceToken {
            notation: format!("{}d{}", count, faces),
            count,
            sides: DieSize::from_faces(faces).unwrap(),
            modifiers: vec![],
        }
    }

    #[test]
    fn test_plain_roll() {
        let mut rng = ScriptedRng::new(vec![2, 1, 4]);
        let rolled = roll_dice(&plain(3, 6), &RollOptions::default(), &mut rng).unwrap();
        assert_eq!(rolled.total, 7);
        assert_eq!(rolled.dice.len(), 3);
        assert!(rolled.dice.iter().all(|d| d.kept));
        assert_eq!(rolled.criticals, 0);
        assert!(!rolled.fumble);
    }

    #[test]
    fn test_advantage_drops_lowest() {
        let opts = RollOptions {
            advantage: 1,
            ..RollOptions::default()
        };
        let mut rng = ScriptedRng::new(vec![4, 2, 5]);
        let rolled = roll_dice(&plain(2, 6), &opts, &mut rng).unwrap();
        assert_eq!(rolled.dice.len(), 3);
        assert_eq!(rolled.total, 9);
        assert!(!rolled.dice[1].kept);
        assert_eq!(rolled.dice[1].category, DieCategory::Dropped);
    }

    #[test]
    fn test_disadvantage_drops_highest() {
        let opts = RollOptions {
            advantage: -1,
            ..RollOptions::default()
        };
        let mut rng = ScriptedRng::new(vec![4, 2, 5]);
        let rolled = roll_dice(&plain(2, 6), &opts, &mut rng).unwrap();
        assert_eq!(rolled.total, 6);
        assert!(!rolled.dice[2].kept);
    }

    #[test]
    fn test_advantage_ties_drop_earliest() {
        let opts = RollOptions {
            advantage: 1,
            ..RollOptions::default()
        };
        let mut rng = ScriptedRng::new(vec![3, 3, 3]);
        let rolled = roll_dice(&plain(2, 6), &opts, &mut rng).unwrap();
        assert!(!rolled.dice[0].kept);
        assert!(rolled.dice[1].kept);
        assert!(rolled.dice[2].kept);
        assert_eq!(rolled.total, 6);
    }

    #[test]
    fn test_critical_explodes() {
        let opts = RollOptions {
            criticals: true,
            ..RollOptions::default()
        };
        let mut rng = ScriptedRng::new(vec![6, 6, 3]);
        let rolled = roll_dice(&plain(1, 6), &opts, &mut rng).unwrap();
        assert_eq!(rolled.total, 15);
        assert_eq!(rolled.criticals, 2);
        assert_eq!(rolled.dice[0].category, DieCategory::Critical);
        assert_eq!(rolled.dice[1].category, DieCategory::Explosion);
        assert_eq!(rolled.dice[2].category, DieCategory::Explosion);
    }

    #[test]
    fn test_no_critical_without_option() {
        let mut rng = ScriptedRng::new(vec![6]);
        let rolled = roll_dice(&plain(1, 6), &RollOptions::default(), &mut rng).unwrap();
        assert_eq!(rolled.total, 6);
        assert_eq!(rolled.criticals, 0);
        assert_eq!(rolled.dice.len(), 1);
    }

    #[test]
    fn test_only_first_kept_die_crits() {
        let opts = RollOptions {
            criticals: true,
            ..RollOptions::default()
        };
        // First kept die is a 3; the 6 in second position must not explode.
        let mut rng = ScriptedRng::new(vec![3, 6]);
        let rolled = roll_dice(&plain(2, 6), &opts, &mut rng).unwrap();
        assert_eq!(rolled.total, 9);
        assert_eq!(rolled.criticals, 0);
        assert_eq!(rolled.dice.len(), 2);
    }

    #[test]
    fn test_explode_all() {
        let opts = RollOptions {
            criticals: true,
            explode_all: true,
            ..RollOptions::default()
        };
        // Both pool dice crit; each chain ends on a non-max roll.
        let mut rng = ScriptedRng::new(vec![6, 6, 2, 3]);
        let rolled = roll_dice(&plain(2, 6), &opts, &mut rng).unwrap();
        assert_eq!(rolled.criticals, 2);
        assert_eq!(rolled.total, 6 + 6 + 2 + 3);
        assert_eq!(rolled.dice[2].category, DieCategory::Explosion);
        assert_eq!(rolled.dice[3].category, DieCategory::Explosion);
    }

    #[test]
    fn test_vicious_adds_one_die_per_crit() {
        let opts = RollOptions {
            criticals: true,
            vicious: true,
            ..RollOptions::default()
        };
        // Crit, explosion also max (second crit), chain ends on 3.
        // Two vicious dice follow.
        let mut rng = ScriptedRng::new(vec![6, 6, 3, 4, 5]);
        let rolled = roll_dice(&plain(1, 6), &opts, &mut rng).unwrap();
        assert_eq!(rolled.criticals, 2);
        assert_eq!(rolled.total, 6 + 6 + 3 + 4 + 5);
        assert_eq!(rolled.dice[3].category, DieCategory::Vicious);
        assert_eq!(rolled.dice[4].category, DieCategory::Vicious);
    }

    #[test]
    fn test_vicious_without_crit_adds_nothing() {
        let opts = RollOptions {
            criticals: true,
            vicious: true,
            ..RollOptions::default()
        };
        let mut rng = ScriptedRng::new(vec![4]);
        let rolled = roll_dice(&plain(1, 6), &opts, &mut rng).unwrap();
        assert_eq!(rolled.dice.len(), 1);
        assert_eq!(rolled.total, 4);
    }

    #[test]
    fn test_fumble_on_first_kept_die() {
        let opts = RollOptions {
            fumbles: true,
            ..RollOptions::default()
        };
        let mut rng = ScriptedRng::new(vec![1, 5]);
        let rolled = roll_dice(&plain(2, 6), &opts, &mut rng).unwrap();
        assert!(rolled.fumble);
        assert_eq!(rolled.dice[0].category, DieCategory::Fumble);
        // The kept sum is untouched; the zeroing happens at formula level.
        assert_eq!(rolled.total, 6);
    }

    #[test]
    fn test_no_fumble_on_later_die() {
        let opts = RollOptions {
            fumbles: true,
            ..RollOptions::default()
        };
        let mut rng = ScriptedRng::new(vec![5, 1]);
        let rolled = roll_dice(&plain(2, 6), &opts, &mut rng).unwrap();
        assert!(!rolled.fumble);
    }

    #[test]
    fn test_fumble_checked_after_drop() {
        // Advantage drops the 1, so the first kept die is the 4: no fumble.
        let opts = RollOptions {
            advantage: 1,
            fumbles: true,
            ..RollOptions::default()
        };
        let mut rng = ScriptedRng::new(vec![1, 4]);
        let rolled = roll_dice(&plain(1, 6), &opts, &mut rng).unwrap();
        assert!(!rolled.fumble);
        assert_eq!(rolled.total, 4);
    }

    #[test]
    fn test_explosion_chain_capped() {
        let opts = RollOptions {
            criticals: true,
            ..RollOptions::default()
        };
        // RNG that always rolls max face.
        let mut rng = ScriptedRng::new(vec![6]);
        let rolled = roll_dice(&plain(1, 6), &opts, &mut rng).unwrap();
        assert_eq!(rolled.dice.len() as u32, 1 + MAX_EXPLOSIONS);
    }

    #[test]
    fn test_double_digit() {
        let mut rng = ScriptedRng::new(vec![5, 4]);
        let rolled = roll_dice(&plain(1, 66), &RollOptions::default(), &mut rng).unwrap();
        assert_eq!(rolled.total, 54);
        assert_eq!(rolled.ones_start, Some(1));
        assert_eq!(rolled.dice.len(), 2);
    }

    #[test]
    fn test_double_digit_advantage_per_pool() {
        let opts = RollOptions {
            advantage: 1,
            ..RollOptions::default()
        };
        // Tens pool [2, 6] keeps 6; ones pool [3, 1] keeps 3.
        let mut rng = ScriptedRng::new(vec![2, 6, 3, 1]);
        let rolled = roll_dice(&plain(1, 44), &opts, &mut rng).unwrap();
        assert_eq!(rolled.total, 63);
        assert_eq!(rolled.ones_start, Some(2));
        assert!(!rolled.dice[0].kept);
        assert!(!rolled.dice[3].kept);
    }

    #[test]
    fn test_double_digit_never_crits() {
        let opts = RollOptions {
            criticals: true,
            vicious: true,
            fumbles: true,
            ..RollOptions::default()
        };
        let mut rng = ScriptedRng::new(vec![8, 8]);
        let rolled = roll_dice(&plain(1, 88), &opts, &mut rng).unwrap();
        assert_eq!(rolled.total, 88);
        assert_eq!(rolled.criticals, 0);
        assert!(!rolled.fumble);
        assert_eq!(rolled.dice.len(), 2);
    }

    #[test]
    fn test_double_digit_count_rejected() {
        let token = DiceToken {
            notation: "2d44".to_string(),
            count: 2,
            sides: DieSize::DoubleDigit(4),
            modifiers: vec![],
        };
        let mut rng = ScriptedRng::new(vec![1]);
        let err = roll_dice(&token, &RollOptions::default(), &mut rng).unwrap_err();
        assert!(matches!(err, Error::DoubleDigitCount(44)));
    }

    #[test]
    fn test_token_modifiers_fold_into_options() {
        let token = DiceToken {
            notation: "1d6v".to_string(),
            count: 1,
            sides: DieSize::Standard(6),
            modifiers: vec![Modifier::Vicious],
        };
        let mut rng = ScriptedRng::new(vec![6, 3, 4]);
        let rolled = roll_dice(
            &token,
            &token.options_for(RollOptions::default()),
            &mut rng,
        )
        .unwrap();
        assert_eq!(rolled.criticals, 1);
        assert_eq!(rolled.total, 13);
    }
}
