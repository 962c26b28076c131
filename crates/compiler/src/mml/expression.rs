//! MML expressions and operation uses

// SPDX-FileCopyrightText: © 2023 Marcus Rowe <undisbeliever@gmail.com>
//
// SPDX-License-Identifier: MIT

use super::value::Value;
use crate::file_pos::Location;

use std::fmt::Display;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DataType {
    Any,
    Number,
    Length,
    String,
    Buffer,
}

impl DataType {
    pub fn from_keyword(s: &str) -> Option<Self> {
        match s {
            "number" => Some(Self::Number),
            "length" => Some(Self::Length),
            "string" => Some(Self::String),
            "buffer" => Some(Self::Buffer),
            "any" => Some(Self::Any),
            _ => None,
        }
    }
}

impl Display for DataType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Any => "any",
            Self::Number => "number",
            Self::Length => "length",
            Self::String => "string",
            Self::Buffer => "buffer",
        };
        f.write_str(s)
    }
}

/// `$name` is `Local`, `$$name` is `Track` and `$$$name` is `Global`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VariableScope {
    /// Macro arguments first, then track variables
    Local,
    Track,
    Global,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComparisonOperator {
    Lesser,
    LesserEqual,
    Greater,
    GreaterEqual,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expression {
    Constant(Value),
    VariableRef {
        name: String,
        scope: VariableScope,
        location: Location,
    },
    Parenthesized(Box<Expression>),
    Add(Box<Expression>, Box<Expression>),
    Subtract(Box<Expression>, Box<Expression>),
    Multiply(Box<Expression>, Box<Expression>),
    Divide(Box<Expression>, Box<Expression>),
    Modulo(Box<Expression>, Box<Expression>),
    Conditional {
        condition: Box<Expression>,
        true_expr: Box<Expression>,
        false_expr: Box<Expression>,
    },
    Comparison {
        left: Box<Expression>,
        right: Box<Expression>,
        operator: ComparisonOperator,
    },
}

/// An operation (macro or primitive) and its argument list.
///
/// Arguments are `None` when they are left empty (ie, `n 60,,100`).
#[derive(Debug, Clone, PartialEq)]
pub struct OperationUse {
    pub name: String,
    pub location: Location,
    pub arguments: Vec<Option<Expression>>,
}
