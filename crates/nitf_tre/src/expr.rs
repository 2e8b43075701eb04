//! Computed widths and loop counts, and the comparisons guarding conditional blocks
//!
//! Expressions are written in postfix form the way TRE tables spell them, tokens are separated by
//! whitespace:
//!
//! | Token        | Meaning                                          |
//! |--------------|--------------------------------------------------|
//! | `42`         | integer literal                                  |
//! | `ENGDTS`     | integer value of a previously read field         |
//! | `+ - * / %`  | pops two values and pushes the result            |
//!
//! An operator applied to a single value on the stack uses 0 as its left operand, so `N -` is the
//! negation of `N`.

use std::fmt;
use std::str::FromStr;

use crate::error::{DescriptionError, Error, Result};
use crate::field::Field;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Operator {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
}

impl Operator {
    fn apply(self, left: i64, right: i64) -> core::result::Result<i64, &'static str> {
        let value = match self {
            Operator::Add => left.checked_add(right),
            Operator::Sub => left.checked_sub(right),
            Operator::Mul => left.checked_mul(right),
            Operator::Div | Operator::Rem if right == 0 => return Err("division by zero"),
            Operator::Div => left.checked_div(right),
            Operator::Rem => left.checked_rem(right),
        };
        value.ok_or("arithmetic overflow")
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    Literal(i64),
    Reference(String),
    Operator(Operator),
}

impl Token {
    fn parse(text: &str) -> Token {
        match text {
            "+" => Token::Operator(Operator::Add),
            "-" => Token::Operator(Operator::Sub),
            "*" => Token::Operator(Operator::Mul),
            "/" => Token::Operator(Operator::Div),
            "%" => Token::Operator(Operator::Rem),
            _ => match text.parse() {
                Ok(value) => Token::Literal(value),
                Err(_) => Token::Reference(text.to_owned()),
            },
        }
    }
}

/// A validated postfix integer expression
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Expression {
    text: String,
    tokens: Vec<Token>,
}

impl Expression {
    pub fn parse(text: &str) -> core::result::Result<Expression, DescriptionError> {
        let invalid = |reason| DescriptionError::InvalidExpression {
            expression: text.to_owned(),
            reason,
        };

        let tokens = text.split_whitespace().map(Token::parse).collect::<Vec<_>>();

        let mut depth = 0usize;
        for token in &tokens {
            match token {
                Token::Operator(_) if depth == 0 => return Err(invalid("operator without operand")),
                Token::Operator(_) if depth == 1 => {}
                Token::Operator(_) => depth -= 1,
                _ => depth += 1,
            }
        }

        match depth {
            1 => Ok(Expression {
                text: text.split_whitespace().collect::<Vec<_>>().join(" "),
                tokens,
            }),
            0 => Err(invalid("expression is empty")),
            _ => Err(invalid("expression leaves more than one value")),
        }
    }

    pub fn tokens(&self) -> &[Token] {
        &self.tokens
    }

    /// Tags this expression reads
    pub fn references(&self) -> impl Iterator<Item = &str> {
        self.tokens.iter().filter_map(|token| match token {
            Token::Reference(tag) => Some(tag.as_str()),
            _ => None,
        })
    }

    /// Evaluate with `lookup` providing the integer value of each referenced tag
    pub fn evaluate(&self, mut lookup: impl FnMut(&str) -> Result<i64>) -> Result<i64> {
        let mut stack = Vec::with_capacity(self.tokens.len());
        for token in &self.tokens {
            match token {
                Token::Literal(value) => stack.push(*value),
                Token::Reference(tag) => stack.push(lookup(tag)?),
                Token::Operator(operator) => {
                    let right = stack.pop().unwrap_or_default();
                    let left = stack.pop().unwrap_or_default();
                    let value = operator
                        .apply(left, right)
                        .map_err(|reason| Error::Arithmetic {
                            expression: self.text.clone(),
                            reason,
                        })?;
                    stack.push(value);
                }
            }
        }

        stack.pop().ok_or_else(|| Error::Arithmetic {
            expression: self.text.clone(),
            reason: "expression is empty",
        })
    }
}

impl FromStr for Expression {
    type Err = DescriptionError;

    fn from_str(s: &str) -> core::result::Result<Self, Self::Err> {
        Expression::parse(s)
    }
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

/// Test applied to the value of one previously read field
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Comparison {
    /// `eq X`, text equality ignoring trailing blanks
    Equals(String),
    /// `ne X`
    NotEquals(String),
    /// `== N`
    Eq(i64),
    /// `!= N`
    Ne(i64),
    /// `< N`
    Lt(i64),
    /// `<= N`
    Le(i64),
    /// `> N`
    Gt(i64),
    /// `>= N`
    Ge(i64),
    /// `& MASK`, true when any bit of the mask is set
    AnyBits(u64),
}

impl Comparison {
    pub fn evaluate(&self, field: &Field) -> Result<bool> {
        Ok(match self {
            Comparison::Equals(text) => field.as_string().trim_end() == text.trim_end(),
            Comparison::NotEquals(text) => field.as_string().trim_end() != text.trim_end(),
            Comparison::Eq(value) => field.as_reference()? == *value,
            Comparison::Ne(value) => field.as_reference()? != *value,
            Comparison::Lt(value) => field.as_reference()? < *value,
            Comparison::Le(value) => field.as_reference()? <= *value,
            Comparison::Gt(value) => field.as_reference()? > *value,
            Comparison::Ge(value) => field.as_reference()? >= *value,
            Comparison::AnyBits(mask) => field.as_reference_bits()? & mask != 0,
        })
    }
}

impl FromStr for Comparison {
    type Err = DescriptionError;

    fn from_str(s: &str) -> core::result::Result<Self, Self::Err> {
        let invalid = || DescriptionError::InvalidCondition { text: s.to_owned() };

        let text = s.trim_start();
        let (operator, operand) = text.split_once(' ').unwrap_or((text, ""));
        let number = || operand.trim().parse::<i64>().map_err(|_| invalid());

        Ok(match operator {
            "eq" => Comparison::Equals(operand.to_owned()),
            "ne" => Comparison::NotEquals(operand.to_owned()),
            "==" => Comparison::Eq(number()?),
            "!=" => Comparison::Ne(number()?),
            "<" => Comparison::Lt(number()?),
            "<=" => Comparison::Le(number()?),
            ">" => Comparison::Gt(number()?),
            ">=" => Comparison::Ge(number()?),
            "&" => {
                let operand = operand.trim();
                let mask = match operand
                    .strip_prefix("0x")
                    .or_else(|| operand.strip_prefix("0X"))
                {
                    Some(hex) => u64::from_str_radix(hex, 16),
                    None => operand.parse(),
                };
                Comparison::AnyBits(mask.map_err(|_| invalid())?)
            }
            _ => return Err(invalid()),
        })
    }
}

impl fmt::Display for Comparison {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Comparison::Equals(text) => write!(f, "eq {text}"),
            Comparison::NotEquals(text) => write!(f, "ne {text}"),
            Comparison::Eq(value) => write!(f, "== {value}"),
            Comparison::Ne(value) => write!(f, "!= {value}"),
            Comparison::Lt(value) => write!(f, "< {value}"),
            Comparison::Le(value) => write!(f, "<= {value}"),
            Comparison::Gt(value) => write!(f, "> {value}"),
            Comparison::Ge(value) => write!(f, ">= {value}"),
            Comparison::AnyBits(mask) => write!(f, "& 0x{mask:X}"),
        }
    }
}

/// Guard of a conditional block
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Condition {
    pub tag: String,
    pub comparison: Comparison,
}

impl Condition {
    pub fn new(tag: impl Into<String>, comparison: Comparison) -> Condition {
        Condition {
            tag: tag.into(),
            comparison,
        }
    }

    /// Build a condition from the text form, `Condition::parse("ENGTYP", "eq I")`
    pub fn parse(
        tag: impl Into<String>,
        text: &str,
    ) -> core::result::Result<Condition, DescriptionError> {
        Ok(Condition::new(tag, text.parse()?))
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.tag, self.comparison)
    }
}

#[cfg(test)]
mod test {
    use pretty_assertions::assert_eq;

    use crate::error::{DescriptionError, ErrorKind, Result};
    use crate::expr::{Comparison, Expression};
    use crate::field::{Field, FieldKind};

    fn values(tag: &str) -> Result<i64> {
        Ok(match tag {
            "ENGDATC" => 4,
            "ENGDTS" => 2,
            "ZERO" => 0,
            _ => unreachable!(),
        })
    }

    #[test]
    fn evaluates_postfix() -> Result<()> {
        let expr = Expression::parse("ENGDATC ENGDTS *")?;
        assert_eq!(expr.evaluate(values)?, 8);
        assert_eq!(expr.references().collect::<Vec<_>>(), ["ENGDATC", "ENGDTS"]);

        let expr = Expression::parse("10 ENGDTS 3 * -")?;
        assert_eq!(expr.evaluate(values)?, 4);
        Ok(())
    }

    #[test]
    fn lone_operand_uses_zero() -> Result<()> {
        let expr = Expression::parse("ENGDTS -")?;
        assert_eq!(expr.evaluate(values)?, -2);
        Ok(())
    }

    #[test]
    fn malformed_expressions() {
        assert!(matches!(
            Expression::parse(""),
            Err(DescriptionError::InvalidExpression { .. })
        ));
        assert!(Expression::parse("* 3").is_err());
        assert!(Expression::parse("1 2").is_err());
    }

    #[test]
    fn division_by_zero() -> Result<()> {
        let expr = Expression::parse("ENGDTS ZERO /")?;
        assert_eq!(expr.evaluate(values).unwrap_err().kind(), ErrorKind::Arithmetic);
        Ok(())
    }

    #[test]
    fn comparisons() -> Result<()> {
        let numeric = Field::from_raw(FieldKind::Numeric, *b"003");
        assert!("== 3".parse::<Comparison>()?.evaluate(&numeric)?);
        assert!(">= 2".parse::<Comparison>()?.evaluate(&numeric)?);
        assert!(!"< 3".parse::<Comparison>()?.evaluate(&numeric)?);

        let alpha = Field::from_raw(FieldKind::Alpha, *b"I  ");
        assert!("eq I".parse::<Comparison>()?.evaluate(&alpha)?);
        assert!("ne A".parse::<Comparison>()?.evaluate(&alpha)?);

        let flags = Field::from_raw(FieldKind::Binary, [0x00, 0x00, 0x00, 0x40]);
        assert!("& 0x40".parse::<Comparison>()?.evaluate(&flags)?);
        assert!(!"& 1".parse::<Comparison>()?.evaluate(&flags)?);
        Ok(())
    }

    #[test]
    fn malformed_comparisons() {
        assert!("~ 3".parse::<Comparison>().is_err());
        assert!("> x".parse::<Comparison>().is_err());
        assert!("& 0xZZ".parse::<Comparison>().is_err());
    }
}
