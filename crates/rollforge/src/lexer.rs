// ABOUTME: Tokenizer for dice-formula strings.
// ABOUTME: Scans strings like "2d6! + 1d4v + STR" into a flat token list.

use crate::error::{Error, Result};
use crate::token::{DiceToken, DieSize, FormulaToken, Modifier, Op};

/// Tokenize a dice formula into an ordered token list.
///
/// Whitespace is skipped, a `D` dice separator is canonicalized to `d`,
/// and every dice term is validated structurally before the list is
/// returned. The richest match wins: a digit run followed by `d` and more
/// digits is dice notation, not a number literal.
pub fn tokenize(input: &str) -> Result<Vec<FormulaToken>> {
    Lexer::new(input).tokenize()
}

struct Lexer<'a> {
    input: &'a str,
    chars: std::iter::Peekable<std::str::CharIndices<'a>>,
}

impl<'a> Lexer<'a> {
    fn new(input: &'a str) -> Self {
        Self {
            input,
            chars: input.char_indices().peekable(),
        }
    }

    fn tokenize(mut self) -> Result<Vec<FormulaToken>> {
        let mut tokens = Vec::new();

        while let Some(&(pos, ch)) = self.chars.peek() {
            if ch.is_whitespace() {
                self.chars.next();
                continue;
            }

            match ch {
                '0'..='9' => {
                    let value = self.number();
                    if self.at_dice_separator() {
                        tokens.push(FormulaToken::Dice(self.dice(pos, value)?));
                    } else {
                        let end = self.current_pos();
                        tokens.push(FormulaToken::Static {
                            value: value as i64,
                            text: self.input[pos..end].to_string(),
                            is_variable: false,
                        });
                    }
                }
                'd' | 'D' if self.at_dice_separator() => {
                    tokens.push(FormulaToken::Dice(self.dice(pos, 1)?));
                }
                'A'..='Z' => tokens.push(self.variable()),
                '+' => tokens.push(self.operator(Op::Add)),
                '-' => tokens.push(self.operator(Op::Sub)),
                '*' => tokens.push(self.operator(Op::Mul)),
                '/' => tokens.push(self.operator(Op::Div)),
                '(' => tokens.push(self.operator(Op::LParen)),
                ')' => tokens.push(self.operator(Op::RParen)),
                _ => return Err(Error::InvalidCharacters(self.invalid_run(pos))),
            }
        }

        Ok(tokens)
    }

    /// Byte offset of the next unconsumed character.
    fn current_pos(&mut self) -> usize {
        self.chars.peek().map_or(self.input.len(), |&(i, _)| i)
    }

    /// True if the next characters are a `d`/`D` separator followed by a digit.
    fn at_dice_separator(&self) -> bool {
        let mut ahead = self.chars.clone();
        match ahead.next() {
            Some((_, 'd' | 'D')) => matches!(ahead.next(), Some((_, c)) if c.is_ascii_digit()),
            _ => false,
        }
    }

    fn operator(&mut self, op: Op) -> FormulaToken {
        self.chars.next();
        FormulaToken::Operator(op)
    }

    fn number(&mut self) -> u32 {
        let mut value: u32 = 0;

        while let Some(&(_, ch)) = self.chars.peek() {
            if let Some(digit) = ch.to_digit(10) {
                self.chars.next();
                value = value.saturating_mul(10).saturating_add(digit);
            } else {
                break;
            }
        }

        value
    }

    /// Parse a dice term starting at the `d` separator, count already read.
    fn dice(&mut self, start: usize, count: u32) -> Result<DiceToken> {
        self.chars.next(); // the 'd'
        let faces = self.number();

        let sides = DieSize::from_faces(faces).ok_or(Error::InvalidDieSize(faces))?;
        if count == 0 {
            return Err(Error::InvalidDiceCount(count));
        }
        if sides.is_double_digit() && count > 1 {
            return Err(Error::DoubleDigitCount(faces));
        }

        let modifiers = self.modifiers();
        let end = self.current_pos();
        let notation = self.input[start..end].replace('D', "d");

        Ok(DiceToken {
            notation,
            count,
            sides,
            modifiers,
        })
    }

    /// Scan the postfix modifier cluster: (`!!`|`!`)? `v`? ((`a`|`d`) count?)?
    fn modifiers(&mut self) -> Vec<Modifier> {
        let mut modifiers = Vec::new();

        if self.eat('!') {
            if self.eat('!') {
                modifiers.push(Modifier::ExplodeAll);
            } else {
                modifiers.push(Modifier::ExplodeFirst);
            }
        }
        if self.eat('v') {
            modifiers.push(Modifier::Vicious);
        }
        if self.eat('a') {
            modifiers.push(Modifier::Advantage(self.level()));
        } else if self.eat('d') {
            modifiers.push(Modifier::Advantage(-self.level()));
        }

        modifiers
    }

    /// Optional advantage level digits, defaulting to 1.
    fn level(&mut self) -> i32 {
        match self.chars.peek() {
            Some(&(_, c)) if c.is_ascii_digit() => self.number() as i32,
            _ => 1,
        }
    }

    fn eat(&mut self, expected: char) -> bool {
        if let Some(&(_, c)) = self.chars.peek() {
            if c == expected {
                self.chars.next();
                return true;
            }
        }
        false
    }

    /// An uppercase variable name, value 0 until substituted.
    fn variable(&mut self) -> FormulaToken {
        let mut name = String::new();

        while let Some(&(_, c)) = self.chars.peek() {
            if c.is_ascii_uppercase() || (!name.is_empty() && c == '_') {
                name.push(c);
                self.chars.next();
            } else {
                break;
            }
        }

        FormulaToken::Static {
            value: 0,
            text: name,
            is_variable: true,
        }
    }

    /// The unrecognized substring starting at `start`, for error reporting.
    fn invalid_run(&self, start: usize) -> String {
        let rest = &self.input[start..];
        let run: String = rest
            .chars()
            .take_while(|c| c.is_alphanumeric() || *c == '_')
            .collect();
        if run.is_empty() {
            rest.chars().take(1).collect()
        } else {
            run
        }
    }
}
