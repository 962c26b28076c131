//! MML source text providers

// SPDX-FileCopyrightText: © 2023 Marcus Rowe <undisbeliever@gmail.com>
//
// SPDX-License-Identifier: MIT

use crate::errors::SourceError;

use relative_path::RelativePath;

use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};

pub const DEFAULT_MACRO_FILE_NAME: &str = "default-macro.mml";

/// The default macro library (notes, rests, octaves, volume, tempo, etc.)
pub const DEFAULT_MACROS: &str = include_str!("mml/default-macro.mml");

/// A named MML source text
#[derive(Debug, Clone)]
pub struct MmlSource {
    pub name: String,
    pub text: String,
}

impl MmlSource {
    pub fn new(name: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            text: text.into(),
        }
    }

    pub fn default_macros() -> Self {
        Self::new(DEFAULT_MACRO_FILE_NAME, DEFAULT_MACROS)
    }
}

/// Provides the text of `#include`d sources.
pub trait SourceResolver {
    fn resolve(&self, name: &str) -> Result<String, SourceError>;
}

/// Reads sources from the file system.
///
/// Relative names are relative to `root`.
#[derive(Debug, Clone)]
pub struct FileSystemResolver {
    root: PathBuf,
}

impl FileSystemResolver {
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }
}

impl SourceResolver for FileSystemResolver {
    fn resolve(&self, name: &str) -> Result<String, SourceError> {
        let path = match Path::new(name).is_absolute() {
            true => PathBuf::from(name),
            false => RelativePath::new(name).to_path(&self.root),
        };

        match std::fs::read_to_string(&path) {
            Ok(s) => Ok(s),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                Err(SourceError::NotFound(name.to_owned()))
            }
            Err(e) => Err(SourceError::IoError(name.to_owned(), e.to_string())),
        }
    }
}

/// In-memory sources (used by editors and tests).
#[derive(Debug, Clone, Default)]
pub struct StringResolver {
    sources: HashMap<String, String>,
}

impl StringResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, name: impl Into<String>, text: impl Into<String>) {
        self.sources.insert(name.into(), text.into());
    }
}

impl SourceResolver for StringResolver {
    fn resolve(&self, name: &str) -> Result<String, SourceError> {
        match self.sources.get(name) {
            Some(s) => Ok(s.clone()),
            None => Err(SourceError::NotFound(name.to_owned())),
        }
    }
}

/// Provides the default macro library.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultMacroResolver;

impl SourceResolver for DefaultMacroResolver {
    fn resolve(&self, name: &str) -> Result<String, SourceError> {
        match name {
            DEFAULT_MACRO_FILE_NAME => Ok(DEFAULT_MACROS.to_owned()),
            _ => Err(SourceError::NotFound(name.to_owned())),
        }
    }
}

/// Tries each resolver in order, returning the first source found.
#[derive(Default)]
pub struct MergedResolver {
    resolvers: Vec<Box<dyn SourceResolver>>,
}

impl MergedResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, resolver: impl SourceResolver + 'static) -> Self {
        self.resolvers.push(Box::new(resolver));
        self
    }
}

impl SourceResolver for MergedResolver {
    fn resolve(&self, name: &str) -> Result<String, SourceError> {
        for r in &self.resolvers {
            match r.resolve(name) {
                Ok(s) => return Ok(s),
                Err(SourceError::NotFound(_)) => continue,
                Err(e) => return Err(e),
            }
        }
        Err(SourceError::NotFound(name.to_owned()))
    }
}

/// The names an `#include` inside `current_file` is searched for, in order.
pub(crate) fn include_candidates(current_file: &str, name: &str) -> Vec<String> {
    let mut out = Vec::with_capacity(2);

    if Path::new(current_file).is_absolute() {
        if let Some(parent) = Path::new(current_file).parent() {
            out.push(parent.join(name).to_string_lossy().into_owned());
        }
    } else if let Some(parent) = RelativePath::new(current_file).parent() {
        if !parent.as_str().is_empty() {
            out.push(parent.join_normalized(name).as_str().to_owned());
        }
    }

    if !out.iter().any(|n| n == name) {
        out.push(name.to_owned());
    }
    out
}
