// ABOUTME: Arithmetic evaluation of resolved formulas.
// ABOUTME: Substitutes rolled totals, then runs a recursive descent evaluator.

use crate::error::{Error, Result};
use crate::roller::ResolvedToken;
use crate::token::Op;

/// Compute the total of a resolved formula.
///
/// Every dice token contributes its kept sum and every static token its
/// value; the resulting arithmetic expression is evaluated with standard
/// precedence and division truncating toward zero. If any dice token
/// fumbled, the total collapses to 0.
pub fn total(tokens: &[ResolvedToken]) -> Result<i64> {
    let expr = substituted_expression(tokens)?;
    let value = evaluate_arithmetic(&expr)?;
    if !value.is_finite() {
        return Err(Error::NonFiniteResult);
    }

    let fumbled = tokens.iter().any(|t| match t {
        ResolvedToken::Dice { rolled, .. } => rolled.fumble,
        _ => false,
    });
    if fumbled {
        return Ok(0);
    }

    Ok(value.trunc() as i64)
}

/// Build the numeric expression string for a resolved token list.
///
/// Fails if any variable token is still unsubstituted.
pub fn substituted_expression(tokens: &[ResolvedToken]) -> Result<String> {
    let mut parts = Vec::with_capacity(tokens.len());

    for token in tokens {
        match token {
            ResolvedToken::Static {
                value,
                text,
                is_variable,
            } => {
                if *is_variable {
                    return Err(Error::UnresolvedVariable(text.clone()));
                }
                parts.push(value.to_string());
            }
            ResolvedToken::Operator(op) => parts.push(op.to_string()),
            ResolvedToken::Dice { rolled, .. } => parts.push(rolled.total.to_string()),
        }
    }

    Ok(parts.join(" "))
}

/// Evaluate an arithmetic expression over `+ - * /`, parentheses, digits,
/// and whitespace. Anything else is a hard error: by this stage all dice
/// and variables must already be numeric.
pub fn evaluate_arithmetic(input: &str) -> Result<f64> {
    for ch in input.chars() {
        if !ch.is_ascii_digit() && !ch.is_whitespace() && !"+-*/()".contains(ch) {
            return Err(Error::ExpressionChar(ch));
        }
    }

    let mut parser = ArithParser {
        chars: input.chars().peekable(),
    };
    let value = parser.expression()?;
    parser.skip_whitespace();
    if parser.chars.peek().is_some() {
        return Err(Error::MalformedExpression("end of expression".to_string()));
    }
    Ok(value)
}

struct ArithParser<'a> {
    chars: std::iter::Peekable<std::str::Chars<'a>>,
}

impl ArithParser<'_> {
    /// Parse an expression (handles + and -).
    fn expression(&mut self) -> Result<f64> {
        let mut left = self.term()?;

        loop {
            match self.peek_op() {
                Some(Op::Add) => {
                    self.chars.next();
                    left += self.term()?;
                }
                Some(Op::Sub) => {
                    self.chars.next();
                    left -= self.term()?;
                }
                _ => break,
            }
        }

        Ok(left)
    }

    /// Parse a term (handles * and /).
    fn term(&mut self) -> Result<f64> {
        let mut left = self.factor()?;

        loop {
            match self.peek_op() {
                Some(Op::Mul) => {
                    self.chars.next();
                    left *= self.factor()?;
                }
                Some(Op::Div) => {
                    self.chars.next();
                    left /= self.factor()?;
                }
                _ => break,
            }
        }

        Ok(left)
    }

    /// Parse a factor: number, negation, or parenthesized expression.
    fn factor(&mut self) -> Result<f64> {
        self.skip_whitespace();

        match self.chars.peek() {
            Some('(') => {
                self.chars.next();
                let value = self.expression()?;
                self.skip_whitespace();
                if self.chars.next() != Some(')') {
                    return Err(Error::MalformedExpression("')'".to_string()));
                }
                Ok(value)
            }
            Some('-') => {
                self.chars.next();
                Ok(-self.factor()?)
            }
            Some(c) if c.is_ascii_digit() => Ok(self.number()),
            _ => Err(Error::MalformedExpression(
                "number, '-', or '('".to_string(),
            )),
        }
    }

    fn number(&mut self) -> f64 {
        let mut value: f64 = 0.0;

        while let Some(&ch) = self.chars.peek() {
            if let Some(digit) = ch.to_digit(10) {
                self.chars.next();
                value = value * 10.0 + digit as f64;
            } else {
                break;
            }
        }

        value
    }

    fn peek_op(&mut self) -> Option<Op> {
        self.skip_whitespace();
        match self.chars.peek() {
            Some('+') => Some(Op::Add),
            Some('-') => Some(Op::Sub),
            Some('*') => Some(Op::Mul),
            Some('/') => Some(Op::Div),
            _ => None,
        }
    }

    fn skip_whitespace(&mut self) {
        while let Some(&ch) = self.chars.peek() {
            if ch.is_whitespace() {
                self.chars.next();
            } else {
                break;
            }
        }
    }
}
