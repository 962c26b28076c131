//! MML operation and expression parser

// SPDX-FileCopyrightText: © 2023 Marcus Rowe <undisbeliever@gmail.com>
//
// SPDX-License-Identifier: MIT

use super::expression::{ComparisonOperator, Expression, OperationUse, VariableScope};
use super::tokenizer::{Token, TokenKind};
use super::value::{Length, Value};

use crate::errors::{ErrorWithLocation, ParseError};
use crate::file_pos::Location;

/// The variable `^` lengths are relative to
pub const LENGTH_VARIABLE: &str = "__length";

type ParseResult<T> = Result<T, ErrorWithLocation<ParseError>>;

fn can_start_operand(t: &TokenKind) -> bool {
    matches!(
        t,
        TokenKind::Dollar
            | TokenKind::Number(_)
            | TokenKind::String(_)
            | TokenKind::OpenCurly
            | TokenKind::Percent
            | TokenKind::Minus
            | TokenKind::Caret
    )
}

fn operation_name(t: &TokenKind) -> Option<&str> {
    match t {
        TokenKind::Identifier(name) => Some(name),
        TokenKind::Colon => Some(":"),
        TokenKind::Slash => Some("/"),
        _ => None,
    }
}

struct Parser<'a> {
    tokens: &'a [Token],
    pos: usize,
    end_location: &'a Location,
}

impl<'a> Parser<'a> {
    fn new(tokens: &'a [Token], end_location: &'a Location) -> Self {
        Self {
            tokens,
            pos: 0,
            end_location,
        }
    }

    fn peek(&self) -> Option<&'a TokenKind> {
        self.tokens.get(self.pos).map(|t| &t.kind)
    }

    fn peek_second(&self) -> Option<&'a TokenKind> {
        self.tokens.get(self.pos + 1).map(|t| &t.kind)
    }

    fn next(&mut self) -> Option<&'a Token> {
        let t = self.tokens.get(self.pos)?;
        self.pos += 1;
        Some(t)
    }

    fn location(&self) -> &'a Location {
        match self.tokens.get(self.pos) {
            Some(t) => &t.location,
            None => self.end_location,
        }
    }

    fn error<T>(&self, e: ParseError) -> ParseResult<T> {
        Err(ErrorWithLocation::new(self.location(), e))
    }

    fn unexpected<T>(&self) -> ParseResult<T> {
        match self.peek() {
            Some(t) => self.error(ParseError::UnexpectedToken(t.to_string())),
            None => self.error(ParseError::UnexpectedEndOfInput),
        }
    }

    // Only treat a binary operator as an operator if it is followed by an operand.
    // (`[c/d]` is a loop break, `c4/2` is a division)
    fn next_is_binary_operator(&self, op: &TokenKind) -> bool {
        self.peek() == Some(op) && self.peek_second().is_some_and(can_start_operand)
    }

    fn parse_operations(&mut self) -> ParseResult<Vec<OperationUse>> {
        let mut out = Vec::new();

        while let Some(t) = self.next() {
            let name = match operation_name(&t.kind) {
                Some(n) => n,
                None => {
                    self.pos -= 1;
                    if out.is_empty() && can_start_operand(&t.kind) {
                        return self.error(ParseError::ExpectedOperationsButGotExpression);
                    }
                    return self.unexpected();
                }
            };

            let arguments = self.parse_arguments()?;

            out.push(OperationUse {
                name: name.to_owned(),
                location: t.location.clone(),
                arguments,
            });
        }

        Ok(out)
    }

    fn parse_arguments(&mut self) -> ParseResult<Vec<Option<Expression>>> {
        match self.peek() {
            Some(TokenKind::OpenCurly) => {
                self.pos += 1;
                if self.peek() == Some(&TokenKind::CloseCurly) {
                    self.pos += 1;
                    return Ok(Vec::new());
                }
                let args = self.parse_argument_list()?;
                match self.next() {
                    Some(Token {
                        kind: TokenKind::CloseCurly,
                        ..
                    }) => Ok(args),
                    Some(_) => {
                        self.pos -= 1;
                        self.error(ParseError::ExpectedCloseCurly)
                    }
                    None => self.error(ParseError::ExpectedCloseCurly),
                }
            }
            Some(t) if can_start_operand(t) || *t == TokenKind::Comma => {
                self.parse_argument_list()
            }
            _ => Ok(Vec::new()),
        }
    }

    fn parse_argument_list(&mut self) -> ParseResult<Vec<Option<Expression>>> {
        let mut args = Vec::new();

        loop {
            let arg = match self.peek() {
                Some(t) if can_start_operand(t) => Some(self.conditional()?),
                _ => None,
            };
            args.push(arg);

            match self.peek() {
                Some(TokenKind::Comma) => self.pos += 1,
                _ => break,
            }
        }

        Ok(args)
    }

    fn conditional(&mut self) -> ParseResult<Expression> {
        let condition = self.comparison()?;

        if self.peek() != Some(&TokenKind::Question) {
            return Ok(condition);
        }
        self.pos += 1;

        let true_expr = self.conditional()?;
        match self.peek() {
            Some(TokenKind::Comma) => self.pos += 1,
            _ => return self.error(ParseError::MissingConditionalElse),
        }
        let false_expr = self.conditional()?;

        Ok(Expression::Conditional {
            condition: Box::new(condition),
            true_expr: Box::new(true_expr),
            false_expr: Box::new(false_expr),
        })
    }

    fn comparison(&mut self) -> ParseResult<Expression> {
        let left = self.additive()?;

        let operator = match self.peek() {
            Some(TokenKind::Lesser) => ComparisonOperator::Lesser,
            Some(TokenKind::LesserEqual) => ComparisonOperator::LesserEqual,
            Some(TokenKind::Greater) => ComparisonOperator::Greater,
            Some(TokenKind::GreaterEqual) => ComparisonOperator::GreaterEqual,
            _ => return Ok(left),
        };
        self.pos += 1;

        let right = self.comparison()?;

        Ok(Expression::Comparison {
            left: Box::new(left),
            right: Box::new(right),
            operator,
        })
    }

    fn additive(&mut self) -> ParseResult<Expression> {
        let mut left = self.multiplicative()?;

        loop {
            let f = if self.next_is_binary_operator(&TokenKind::Plus)
                || self.next_is_binary_operator(&TokenKind::Caret)
            {
                Expression::Add
            } else if self.next_is_binary_operator(&TokenKind::Minus) {
                Expression::Subtract
            } else {
                return Ok(left);
            };
            self.pos += 1;

            let right = self.multiplicative()?;
            left = f(Box::new(left), Box::new(right));
        }
    }

    fn multiplicative(&mut self) -> ParseResult<Expression> {
        let mut left = self.unary()?;

        loop {
            let f = if self.next_is_binary_operator(&TokenKind::Asterisk) {
                Expression::Multiply
            } else if self.next_is_binary_operator(&TokenKind::Slash) {
                Expression::Divide
            } else if self.next_is_binary_operator(&TokenKind::Percent) {
                Expression::Modulo
            } else {
                return Ok(left);
            };
            self.pos += 1;

            let right = self.unary()?;
            left = f(Box::new(left), Box::new(right));
        }
    }

    fn unary(&mut self) -> ParseResult<Expression> {
        match self.peek() {
            Some(TokenKind::Minus) => {
                self.pos += 1;
                let e = self.unary()?;
                Ok(Expression::Multiply(
                    Box::new(Expression::Constant(Value::Number(-1.0))),
                    Box::new(e),
                ))
            }
            Some(TokenKind::Caret) => {
                let location = self.location().clone();
                self.pos += 1;
                let e = self.unary()?;
                Ok(Expression::Add(
                    Box::new(Expression::VariableRef {
                        name: LENGTH_VARIABLE.to_owned(),
                        scope: VariableScope::Local,
                        location,
                    }),
                    Box::new(e),
                ))
            }
            _ => self.primary(),
        }
    }

    fn primary(&mut self) -> ParseResult<Expression> {
        let t = match self.next() {
            Some(t) => t,
            None => return self.error(ParseError::UnexpectedEndOfInput),
        };

        match &t.kind {
            TokenKind::Dollar => {
                let mut n_dollars = 1;
                while self.peek() == Some(&TokenKind::Dollar) {
                    self.pos += 1;
                    n_dollars += 1;
                }
                let scope = match n_dollars {
                    1 => VariableScope::Local,
                    2 => VariableScope::Track,
                    3 => VariableScope::Global,
                    _ => return self.error(ParseError::TooManyDollarSigns),
                };
                match self.next() {
                    Some(Token {
                        kind: TokenKind::Identifier(name),
                        ..
                    }) => Ok(Expression::VariableRef {
                        name: name.clone(),
                        scope,
                        location: t.location.clone(),
                    }),
                    Some(_) => {
                        self.pos -= 1;
                        self.error(ParseError::ExpectedVariableName)
                    }
                    None => self.error(ParseError::ExpectedVariableName),
                }
            }
            TokenKind::String(s) => Ok(Expression::Constant(Value::String(s.clone()))),
            TokenKind::OpenCurly => {
                let e = self.conditional()?;
                match self.peek() {
                    Some(TokenKind::CloseCurly) => {
                        self.pos += 1;
                        Ok(Expression::Parenthesized(Box::new(e)))
                    }
                    _ => self.error(ParseError::ExpectedCloseCurly),
                }
            }
            TokenKind::Percent => {
                let sign = match self.peek() {
                    Some(TokenKind::Minus) => {
                        self.pos += 1;
                        -1
                    }
                    _ => 1,
                };
                match self.peek() {
                    Some(TokenKind::Number(n)) => {
                        self.pos += 1;
                        Ok(Expression::Constant(Value::Length(Length::from_ticks(
                            sign * (*n as i64),
                        ))))
                    }
                    _ => self.error(ParseError::ExpectedNumberAfterPercent),
                }
            }
            TokenKind::Number(n) => {
                let mut dots = 0;
                while self.peek() == Some(&TokenKind::Dot) {
                    self.pos += 1;
                    dots += 1;
                }
                match dots {
                    0 => Ok(Expression::Constant(Value::Number(*n))),
                    _ => Ok(Expression::Constant(Value::Length(Length::new(
                        *n as i64, dots,
                    )))),
                }
            }
            _ => {
                self.pos -= 1;
                if operation_name(&t.kind).is_some() {
                    return self.error(ParseError::ExpectedExpressionButGotOperations);
                }
                self.unexpected()
            }
        }
    }
}

/// Parses a list of operation uses.
///
/// `end_location` is used for errors at the end of the token list.
pub fn parse_operations(
    tokens: &[Token],
    end_location: &Location,
) -> ParseResult<Vec<OperationUse>> {
    Parser::new(tokens, end_location).parse_operations()
}

/// Parses a single expression (a variable or argument default value).
pub fn parse_expression(tokens: &[Token], end_location: &Location) -> ParseResult<Expression> {
    let mut p = Parser::new(tokens, end_location);

    if p.peek().is_some_and(|t| operation_name(t).is_some()) {
        return p.error(ParseError::ExpectedExpressionButGotOperations);
    }

    let e = p.conditional()?;
    match p.peek() {
        None => Ok(e),
        Some(_) => p.unexpected(),
    }
}
