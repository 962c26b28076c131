//! Compiler diagnostics

// SPDX-FileCopyrightText: © 2023 Marcus Rowe <undisbeliever@gmail.com>
//
// SPDX-License-Identifier: MIT

use crate::file_pos::Location;

use std::fmt::Display;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Error,
    Warning,
    Information,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Diagnostic {
    pub severity: Severity,
    pub location: Option<Location>,
    pub message: String,
}

impl Diagnostic {
    pub fn new(severity: Severity, location: Option<Location>, message: String) -> Self {
        Self {
            severity,
            location,
            message,
        }
    }

    pub fn warning(location: &Location, message: String) -> Self {
        Self::new(Severity::Warning, Some(location.clone()), message)
    }

    pub fn information(location: &Location, message: String) -> Self {
        Self::new(Severity::Information, Some(location.clone()), message)
    }
}

/// Receives the warnings and messages emitted during compilation.
///
/// Errors only reach the sink when the compiler is allowed to continue after an error,
/// otherwise they are returned to the caller.
pub trait DiagnosticSink {
    fn report(&mut self, diagnostic: Diagnostic);
}

/// Writes every diagnostic to stderr.
#[derive(Debug, Default)]
pub struct StderrSink {
    error_count: usize,
}

impl StderrSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn error_count(&self) -> usize {
        self.error_count
    }
}

impl DiagnosticSink for StderrSink {
    fn report(&mut self, diagnostic: Diagnostic) {
        if diagnostic.severity == Severity::Error {
            self.error_count += 1;
        }
        eprintln!("{}", diagnostic);
    }
}

/// Stores diagnostics (used by tests and editors).
#[derive(Debug, Default)]
pub struct DiagnosticList(pub Vec<Diagnostic>);

impl DiagnosticList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn has_errors(&self) -> bool {
        self.0.iter().any(|d| d.severity == Severity::Error)
    }

    pub fn messages(&self, severity: Severity) -> Vec<&str> {
        self.0
            .iter()
            .filter(|d| d.severity == severity)
            .map(|d| d.message.as_str())
            .collect()
    }
}

impl DiagnosticSink for DiagnosticList {
    fn report(&mut self, diagnostic: Diagnostic) {
        self.0.push(diagnostic);
    }
}

impl Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Error => write!(f, "error"),
            Self::Warning => write!(f, "warning"),
            Self::Information => write!(f, "information"),
        }
    }
}

impl Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.location {
            Some(l) => write!(
                f,
                "{} ({}, {}) : {}: {}",
                l.file, l.line_number, l.column, self.severity, self.message
            ),
            None => write!(f, "{}: {}", self.severity, self.message),
        }
    }
}
