//! A single location for all of the errors in the compiler

// SPDX-FileCopyrightText: © 2023 Marcus Rowe <undisbeliever@gmail.com>
//
// SPDX-License-Identifier: MIT

use crate::diagnostics::{Diagnostic, Severity};
use crate::file_pos::Location;
use crate::mml::DataType;

use std::fmt::Display;
use std::io;

#[derive(Debug)]
pub enum DeserializeError {
    NoParentPath(String),
    OpenError(String, io::Error),
    SerdeError(String, serde_json::error::Error),
}

/// An error and the source position it was raised at (if known)
#[derive(Debug, Clone, PartialEq)]
pub struct ErrorWithLocation<T>(pub Option<Location>, pub T);

impl<T> ErrorWithLocation<T> {
    pub fn new(location: &Location, error: T) -> Self {
        Self(Some(location.clone()), error)
    }

    pub fn error(&self) -> &T {
        &self.1
    }

    pub fn location(&self) -> Option<&Location> {
        self.0.as_ref()
    }

    /// Sets the location if the error does not have one
    pub(crate) fn or_location(self, location: &Location) -> Self {
        match self.0 {
            Some(_) => self,
            None => Self(Some(location.clone()), self.1),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SourceError {
    NotFound(String),
    IoError(String, String),
    SourceTooLarge(String),
    RecursiveInclude(String),
    MissingIncludeName,
    UnknownDirective(String),
    MissingDefineName,
    NoLineToContinue,
    CannotParseLine(char),
    UnexpectedEndComment,
}

#[derive(Debug, Clone, PartialEq)]
pub enum LexError {
    UnknownCharacter(char),
    UnexpectedCharacter(char),
    UnterminatedString,
    InvalidEscape(char),
    InvalidCharacterCode(String),
    NoHexDigits,
    InvalidNumber(String),
    ExpectedComparisonAfterBackslash,

    MissingName,
    UnknownDataType(String),
    MissingMacroName,
    MissingMacroBody,
    UnterminatedMacroBody,
    TextAfterMacroBody,
    UnbalancedCloseCurly,

    MissingTrackNumber,
    InvalidTrackNumber(String),
    InvalidTrackRange(String),
    InvalidBaseCount(String),
    UnknownMetaType(String),
    MissingMetaText,
    UnknownConditional(String),
    MissingConditionalArguments,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ParseError {
    UnexpectedToken(String),
    UnexpectedEndOfInput,
    ExpectedExpressionButGotOperations,
    ExpectedOperationsButGotExpression,
    ExpectedCloseCurly,
    ExpectedVariableName,
    TooManyDollarSigns,
    ExpectedNumberAfterPercent,
    MissingConditionalElse,
    MissingDefaultValue(String),
}

#[derive(Debug, Clone, PartialEq)]
pub enum ResolveError {
    UnknownVariable(String),
    UnknownMacro(String),
    TypeMismatch {
        expected: DataType,
        found: DataType,
    },
    CannotCompare(DataType, DataType),
    InvalidOperand(&'static str, DataType),
    DivisionByZero,
    NotANumber,
    TickOverflow,

    InsufficientArguments {
        operation: String,
        expected: usize,
        found: usize,
    },
    TooManyArguments {
        operation: String,
        max: usize,
        found: usize,
    },
    MissingArgument {
        operation: String,
        index: usize,
    },
    DuplicateArgumentName(String),
    CircularVariableDefault(String),

    NotABuffer(String),
    NotAString(String),
    InvalidFormatString(String),
    FormatArgumentOutOfRange(usize),

    LoopBreakOutsideLoop,
    LoopEndOutsideLoop,
    LoopCrossesOperationList,
    UnclosedLoop,
    InvalidBreakLabel(i64),
    DuplicateDefaultBreak,
    DuplicateBreak(i64),
    BreakBeyondLoopCount { label: i64, count: i64 },
    NoBreakForIteration(i64),

    IllegalRecursion(String),

    NestedSaveOperations,
    UnterminatedSaveOperations,
    SaveOperationsEndWithoutBegin,
    UnknownStoredOperations(i64),
    RecursiveRestore(i64),
}

#[derive(Debug, Clone, PartialEq)]
pub enum SmfError {
    NegativeTick { track: String, tick: i64 },
    DeltaTimeTooLarge { track: String, delta: i64 },
    EmptyEvent { track: String, tick: i64 },
    InvalidStatusByte { track: String, status: u8 },
    InvalidMetaEvent { track: String, tick: i64 },
    TooManyTracks(usize),
    InvalidDivision(u32),
    IoError(String),
}

#[derive(Debug, Clone, PartialEq)]
pub enum CompileError {
    Source(ErrorWithLocation<SourceError>),
    Lex(Vec<ErrorWithLocation<LexError>>),
    Parse(Vec<ErrorWithLocation<ParseError>>),
    Resolve(ErrorWithLocation<ResolveError>),
}

impl From<ResolveError> for ErrorWithLocation<ResolveError> {
    fn from(e: ResolveError) -> Self {
        Self(None, e)
    }
}

impl From<ErrorWithLocation<SourceError>> for CompileError {
    fn from(e: ErrorWithLocation<SourceError>) -> Self {
        Self::Source(e)
    }
}

impl From<ErrorWithLocation<ResolveError>> for CompileError {
    fn from(e: ErrorWithLocation<ResolveError>) -> Self {
        Self::Resolve(e)
    }
}

impl<T: Display> ErrorWithLocation<T> {
    pub fn to_diagnostic(&self) -> Diagnostic {
        Diagnostic::new(Severity::Error, self.0.clone(), self.1.to_string())
    }
}

impl CompileError {
    pub fn diagnostics(&self) -> Vec<Diagnostic> {
        match self {
            Self::Source(e) => vec![e.to_diagnostic()],
            Self::Lex(errors) => errors.iter().map(|e| e.to_diagnostic()).collect(),
            Self::Parse(errors) => errors.iter().map(|e| e.to_diagnostic()).collect(),
            Self::Resolve(e) => vec![e.to_diagnostic()],
        }
    }
}

// Display
// =======

impl Display for DeserializeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NoParentPath(filename) => {
                write!(f, "Cannot load {}: No parent path", filename)
            }
            Self::OpenError(filename, e) => write!(f, "Unable to open {}: {}", filename, e),
            Self::SerdeError(filename, e) => write!(f, "Unable to read {}: {}", filename, e),
        }
    }
}

impl<T: Display> Display for ErrorWithLocation<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.to_diagnostic().fmt(f)
    }
}

impl Display for SourceError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotFound(name) => write!(f, "cannot find source {}", name),
            Self::IoError(name, e) => write!(f, "unable to read {}: {}", name, e),
            Self::SourceTooLarge(name) => write!(f, "{} is too large", name),
            Self::RecursiveInclude(name) => write!(f, "recursive include: {}", name),
            Self::MissingIncludeName => write!(f, "missing #include file name"),
            Self::UnknownDirective(d) => write!(f, "unknown directive: #{}", d),
            Self::MissingDefineName => write!(f, "missing #define name"),
            Self::NoLineToContinue => write!(f, "no line to continue"),
            Self::CannotParseLine(c) => write!(f, "cannot parse line starting with {:?}", c),
            Self::UnexpectedEndComment => write!(f, "#endcomment without #comment"),
        }
    }
}

impl Display for LexError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnknownCharacter(c) => write!(f, "unknown character {:?}", c),
            Self::UnexpectedCharacter(c) => write!(f, "unexpected character {:?}", c),
            Self::UnterminatedString => write!(f, "unterminated string"),
            Self::InvalidEscape(c) => write!(f, "invalid escape sequence \\{}", c),
            Self::InvalidCharacterCode(s) => write!(f, "invalid character code: {}", s),
            Self::NoHexDigits => write!(f, "no hex digits after #"),
            Self::InvalidNumber(s) => write!(f, "invalid number: {}", s),
            Self::ExpectedComparisonAfterBackslash => {
                write!(f, "expected <, <=, > or >= after \\")
            }

            Self::MissingName => write!(f, "missing name"),
            Self::UnknownDataType(s) => write!(f, "unknown data type: {}", s),
            Self::MissingMacroName => write!(f, "missing macro name"),
            Self::MissingMacroBody => write!(f, "missing macro body"),
            Self::UnterminatedMacroBody => write!(f, "missing }} at the end of the macro body"),
            Self::TextAfterMacroBody => write!(f, "unexpected text after macro body"),
            Self::UnbalancedCloseCurly => write!(f, "unbalanced }}"),

            Self::MissingTrackNumber => write!(f, "missing track number"),
            Self::InvalidTrackNumber(s) => write!(f, "invalid track number: {}", s),
            Self::InvalidTrackRange(s) => write!(f, "invalid track range: {}", s),
            Self::InvalidBaseCount(s) => write!(f, "invalid #basecount: {}", s),
            Self::UnknownMetaType(s) => write!(f, "unknown #meta type: {}", s),
            Self::MissingMetaText => write!(f, "missing #meta text"),
            Self::UnknownConditional(s) => write!(f, "unknown #conditional type: {}", s),
            Self::MissingConditionalArguments => write!(f, "missing #conditional arguments"),
        }
    }
}

impl Display for ParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnexpectedToken(t) => write!(f, "unexpected token: {}", t),
            Self::UnexpectedEndOfInput => write!(f, "unexpected end of input"),
            Self::ExpectedExpressionButGotOperations => {
                write!(f, "expected expression but got operations")
            }
            Self::ExpectedOperationsButGotExpression => {
                write!(f, "expected operations but got expression")
            }
            Self::ExpectedCloseCurly => write!(f, "expected }}"),
            Self::ExpectedVariableName => write!(f, "expected variable name after $"),
            Self::TooManyDollarSigns => write!(f, "too many $ signs"),
            Self::ExpectedNumberAfterPercent => write!(f, "expected number after %"),
            Self::MissingConditionalElse => write!(f, "expected , in conditional expression"),
            Self::MissingDefaultValue(name) => write!(f, "missing default value for {}", name),
        }
    }
}

impl Display for ResolveError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnknownVariable(name) => write!(f, "unknown variable: {}", name),
            Self::UnknownMacro(name) => write!(f, "unknown macro: {}", name),
            Self::TypeMismatch { expected, found } => {
                write!(f, "type mismatch: expected {}, found {}", expected, found)
            }
            Self::CannotCompare(a, b) => write!(f, "cannot compare {} with {}", a, b),
            Self::InvalidOperand(op, t) => write!(f, "cannot {} {} values", op, t),
            Self::DivisionByZero => write!(f, "division by zero"),
            Self::NotANumber => write!(f, "result is not a number"),
            Self::TickOverflow => write!(f, "tick count is too large"),

            Self::InsufficientArguments {
                operation,
                expected,
                found,
            } => write!(
                f,
                "insufficient arguments for {}: expected {}, found {}",
                operation, expected, found
            ),
            Self::TooManyArguments {
                operation,
                max,
                found,
            } => write!(
                f,
                "too many arguments for {}: expected at most {}, found {}",
                operation, max, found
            ),
            Self::MissingArgument { operation, index } => {
                write!(f, "{}: argument {} is missing", operation, index + 1)
            }
            Self::DuplicateArgumentName(name) => {
                write!(f, "duplicate macro argument name: {}", name)
            }
            Self::CircularVariableDefault(name) => {
                write!(f, "circular default value for variable {}", name)
            }

            Self::NotABuffer(name) => write!(f, "{} is not a buffer variable", name),
            Self::NotAString(name) => write!(f, "{} is not a string variable", name),
            Self::InvalidFormatString(s) => write!(f, "invalid format string: {}", s),
            Self::FormatArgumentOutOfRange(i) => {
                write!(f, "format argument {{{}}} out of range", i)
            }

            Self::LoopBreakOutsideLoop => write!(f, "loop break outside of a loop"),
            Self::LoopEndOutsideLoop => write!(f, "loop end without a loop start"),
            Self::LoopCrossesOperationList => {
                write!(f, "loop must start and end in the same operation list")
            }
            Self::UnclosedLoop => write!(f, "missing loop end"),
            Self::InvalidBreakLabel(l) => write!(f, "invalid loop break number: {}", l),
            Self::DuplicateDefaultBreak => write!(f, "duplicate default loop break"),
            Self::DuplicateBreak(l) => write!(f, "duplicate loop break number: {}", l),
            Self::BreakBeyondLoopCount { label, count } => write!(
                f,
                "break specified beyond the loop count (break {}, loop count {})",
                label, count
            ),
            Self::NoBreakForIteration(i) => write!(f, "no loop break for iteration {}", i),

            Self::IllegalRecursion(name) => write!(f, "illegal recursion: {}", name),

            Self::NestedSaveOperations => write!(f, "nested __SAVE_OPER_BEGIN"),
            Self::UnterminatedSaveOperations => {
                write!(f, "__SAVE_OPER_BEGIN without __SAVE_OPER_END")
            }
            Self::SaveOperationsEndWithoutBegin => {
                write!(f, "__SAVE_OPER_END without __SAVE_OPER_BEGIN")
            }
            Self::UnknownStoredOperations(id) => write!(f, "no stored operations for {}", id),
            Self::RecursiveRestore(id) => write!(f, "recursive __RESTORE_OPER {}", id),
        }
    }
}

impl Display for SmfError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NegativeTick { track, tick } => {
                write!(f, "track {}: event at negative tick {}", track, tick)
            }
            Self::DeltaTimeTooLarge { track, delta } => {
                write!(f, "track {}: delta time too large ({})", track, delta)
            }
            Self::EmptyEvent { track, tick } => {
                write!(f, "track {}: empty event at tick {}", track, tick)
            }
            Self::InvalidStatusByte { track, status } => {
                write!(f, "track {}: invalid status byte {:#04x}", track, status)
            }
            Self::InvalidMetaEvent { track, tick } => {
                write!(f, "track {}: invalid meta event at tick {}", track, tick)
            }
            Self::TooManyTracks(n) => write!(f, "too many tracks ({})", n),
            Self::InvalidDivision(base_count) => {
                write!(f, "cannot write time division for base count {}", base_count)
            }
            Self::IoError(e) => write!(f, "cannot write SMF: {}", e),
        }
    }
}

impl Display for CompileError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let diagnostics = self.diagnostics();
        for (i, d) in diagnostics.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            d.fmt(f)?;
        }
        Ok(())
    }
}

impl std::error::Error for CompileError {}
impl std::error::Error for SmfError {}
