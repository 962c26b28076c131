//! Resolved values

// SPDX-FileCopyrightText: © 2023 Marcus Rowe <undisbeliever@gmail.com>
//
// SPDX-License-Identifier: MIT

use super::expression::DataType;
use crate::encoding::encode_string;
use crate::errors::ResolveError;

use std::fmt::Display;

pub const DEFAULT_BASE_COUNT: u32 = 192;

/// A note length.
///
/// `value` is a denominator of the base count (`4` is a quarter note) unless `by_step` is
/// set, in which case it is a tick count.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Length {
    pub value: i64,
    pub dots: u32,
    pub by_step: bool,
}

impl Length {
    pub fn new(value: i64, dots: u32) -> Self {
        Self {
            value,
            dots,
            by_step: false,
        }
    }

    pub fn from_ticks(ticks: i64) -> Self {
        Self {
            value: ticks,
            dots: 0,
            by_step: true,
        }
    }

    pub fn ticks(&self, base_count: u32) -> i64 {
        if self.by_step {
            return self.value;
        }
        if self.value == 0 {
            return 0;
        }

        let basis = i64::from(base_count) / self.value;

        let mut ticks = basis;
        for i in 0..self.dots.min(62) {
            ticks += basis >> (i + 1);
        }
        ticks
    }
}

impl Display for Length {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.by_step {
            write!(f, "%{}", self.value)
        } else {
            write!(f, "{}", self.value)?;
            for _ in 0..self.dots {
                f.write_str(".")?;
            }
            Ok(())
        }
    }
}

/// A resolved value.
///
/// A `Buffer` is only ever owned by a single variable binding and is appended to in place.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Number(f64),
    Length(Length),
    String(String),
    Buffer(String),
}

impl Value {
    pub fn data_type(&self) -> DataType {
        match self {
            Self::Number(_) => DataType::Number,
            Self::Length(_) => DataType::Length,
            Self::String(_) => DataType::String,
            Self::Buffer(_) => DataType::Buffer,
        }
    }

    pub fn zero(data_type: DataType) -> Self {
        match data_type {
            DataType::Any | DataType::Number => Self::Number(0.0),
            DataType::Length => Self::Length(Length::new(0, 0)),
            DataType::String => Self::String(String::new()),
            DataType::Buffer => Self::Buffer(String::new()),
        }
    }

    pub fn coerce(self, expected: DataType, base_count: u32) -> Result<Self, ResolveError> {
        match (expected, self) {
            (DataType::Any, v) => Ok(v),

            (DataType::Number, v @ Self::Number(_)) => Ok(v),
            (DataType::Number, Self::Length(l)) => Ok(Self::Number(l.ticks(base_count) as f64)),

            (DataType::Length, v @ Self::Length(_)) => Ok(v),
            (DataType::Length, Self::Number(n)) => Ok(Self::Length(Length::new(n as i64, 0))),

            (DataType::String, v @ Self::String(_)) => Ok(v),
            (DataType::String, Self::Buffer(s)) => Ok(Self::String(s)),

            (DataType::Buffer, v @ Self::Buffer(_)) => Ok(v),
            (DataType::Buffer, Self::String(s)) => Ok(Self::Buffer(s)),

            (expected, v) => Err(ResolveError::TypeMismatch {
                expected,
                found: v.data_type(),
            }),
        }
    }

    pub fn to_number(&self, base_count: u32) -> Result<f64, ResolveError> {
        match self {
            Self::Number(n) => Ok(*n),
            Self::Length(l) => Ok(l.ticks(base_count) as f64),
            v => Err(ResolveError::TypeMismatch {
                expected: DataType::Number,
                found: v.data_type(),
            }),
        }
    }

    /// Numbers are truncated to an integer and wrapped to 8 bits, strings are encoded with
    /// the current string encoder.
    pub fn to_bytes(&self, base_count: u32) -> Vec<u8> {
        match self {
            Self::Number(n) => vec![number_to_byte(*n)],
            Self::Length(l) => vec![l.ticks(base_count) as u8],
            Self::String(s) | Self::Buffer(s) => encode_string(s),
        }
    }
}

pub fn number_to_byte(n: f64) -> u8 {
    (n as i64) as u8
}

impl Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Number(n) => {
                if n.fract() == 0.0 && n.abs() < 1e15 {
                    write!(f, "{}", *n as i64)
                } else {
                    write!(f, "{}", n)
                }
            }
            Self::Length(l) => l.fmt(f),
            Self::String(s) | Self::Buffer(s) => f.write_str(s),
        }
    }
}
