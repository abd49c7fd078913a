// ABOUTME: Token and option types for dice formulas.
// ABOUTME: Represents tokenized formulas like "2d6! + 1d4v + STR".

use std::fmt;

#[cfg(feature = "serde")]
use serde::Serialize;

/// Die face counts accepted in a formula.
///
/// Standard dice resolve to a single face value. Double-digit dice
/// (d44/d66/d88) are read as two independent rolls of the base die,
/// combined as tens and ones digits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub enum DieSize {
    /// A die with N faces (d4, d6, d8, d10, d12, d20, d100).
    Standard(u32),
    /// A double-digit die, holding the base die size (4, 6, or 8).
    DoubleDigit(u32),
}

/// Face counts accepted for standard dice.
pub const STANDARD_FACES: [u32; 7] = [4, 6, 8, 10, 12, 20, 100];

impl DieSize {
    /// Map a notation face count (the N in `dN`) to a die size.
    ///
    /// Returns `None` for unsupported face counts.
    pub fn from_faces(faces: u32) -> Option<Self> {
        if STANDARD_FACES.contains(&faces) {
            Some(DieSize::Standard(faces))
        } else {
            match faces {
                44 => Some(DieSize::DoubleDigit(4)),
                66 => Some(DieSize::DoubleDigit(6)),
                88 => Some(DieSize::DoubleDigit(8)),
                _ => None,
            }
        }
    }

    /// The face count as written in notation (66 for d66, not 6).
    pub fn faces(&self) -> u32 {
        match self {
            DieSize::Standard(n) => *n,
            DieSize::DoubleDigit(base) => base * 11,
        }
    }

    /// The face count of each physical die rolled (6 for d66).
    pub fn base(&self) -> u32 {
        match self {
            DieSize::Standard(n) => *n,
            DieSize::DoubleDigit(base) => *base,
        }
    }

    pub fn is_double_digit(&self) -> bool {
        matches!(self, DieSize::DoubleDigit(_))
    }
}

/// An arithmetic operator or parenthesis.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub enum Op {
    Add,
    Sub,
    Mul,
    Div,
    LParen,
    RParen,
}

impl fmt::Display for Op {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Op::Add => write!(f, "+"),
            Op::Sub => write!(f, "-"),
            Op::Mul => write!(f, "*"),
            Op::Div => write!(f, "/"),
            Op::LParen => write!(f, "("),
            Op::RParen => write!(f, ")"),
        }
    }
}

/// A modifier attached to a dice token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub enum Modifier {
    /// `!`: the first kept die may critical and explode.
    ExplodeFirst,
    /// `!!`: every kept die landing on max face explodes.
    ExplodeAll,
    /// `v`: one flat bonus die per critical hit scored. Implies criticals.
    Vicious,
    /// `aN` / `dN`: advantage level, negative for disadvantage.
    Advantage(i32),
}

impl fmt::Display for Modifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Modifier::ExplodeFirst => write!(f, "!"),
            Modifier::ExplodeAll => write!(f, "!!"),
            Modifier::Vicious => write!(f, "v"),
            Modifier::Advantage(1) => write!(f, "a"),
            Modifier::Advantage(-1) => write!(f, "d"),
            Modifier::Advantage(n) if *n > 0 => write!(f, "a{}", n),
            Modifier::Advantage(n) => write!(f, "d{}", -n),
        }
    }
}

/// A dice term in a formula (e.g. "2d6!v").
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub struct DiceToken {
    /// The notation as matched in the input, case-canonicalized.
    pub notation: String,
    /// Number of dice to roll. Always 1 for double-digit dice.
    pub count: u32,
    /// The die type.
    pub sides: DieSize,
    /// Modifiers, in the order they appeared.
    pub modifiers: Vec<Modifier>,
}

impl DiceToken {
    /// Formula-level options merged with this token's own modifiers.
    ///
    /// A token-level `a`/`d` replaces the option record's advantage for
    /// this token only; the boolean modifiers only ever turn behavior on.
    pub fn options_for(&self, base: RollOptions) -> RollOptions {
        let mut opts = base;
        for modifier in &self.modifiers {
            match modifier {
                Modifier::ExplodeFirst => opts.criticals = true,
                Modifier::ExplodeAll => {
                    opts.criticals = true;
                    opts.explode_all = true;
                }
                Modifier::Vicious => {
                    opts.criticals = true;
                    opts.vicious = true;
                }
                Modifier::Advantage(n) => opts.advantage = *n,
            }
        }
        opts
    }
}

impl fmt::Display for DiceToken {
    /// Canonical serialization: `<count>d<faces><modifiers>`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}d{}", self.count, self.sides.faces())?;
        for modifier in &self.modifiers {
            write!(f, "{}", modifier)?;
        }
        Ok(())
    }
}

/// A token in a dice formula.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub enum FormulaToken {
    /// A literal number, or a variable placeholder awaiting substitution.
    Static {
        value: i64,
        /// The text as written: digits for literals, the name for variables.
        text: String,
        is_variable: bool,
    },
    /// An arithmetic operator or parenthesis.
    Operator(Op),
    /// A dice term.
    Dice(DiceToken),
}

/// Options applied to every dice token in a formula.
///
/// Token-level modifiers override these per token; see
/// [`DiceToken::options_for`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub struct RollOptions {
    /// Signed advantage level: positive drops the lowest extra dice,
    /// negative drops the highest, 0 is a plain roll.
    pub advantage: i32,
    /// Whether a max-face first kept die counts as a critical and explodes.
    pub criticals: bool,
    /// Whether every kept max-face die explodes, not just the first.
    pub explode_all: bool,
    /// Whether criticals each grant one flat bonus die.
    pub vicious: bool,
    /// Whether a first kept die of 1 fumbles, zeroing the formula total.
    pub fumbles: bool,
}
