//! MML identifiers

// SPDX-FileCopyrightText: © 2023 Marcus Rowe <undisbeliever@gmail.com>
//
// SPDX-License-Identifier: MIT

use std::collections::HashSet;

/// Returns true if `c` can be used in an identifier.
///
/// `leading` is true for the first character of the identifier.
pub fn is_identifier_char(c: char, leading: bool) -> bool {
    if c.is_whitespace() || c.is_ascii_digit() {
        return false;
    }
    match c {
        ',' | '"' | '{' | '}' | '\\' | '$' | '*' | '%' | '.' | '[' | ']' => false,
        ':' | '/' | '?' | '+' | '-' | '^' | '#' => !leading,
        _ => true,
    }
}

/// Returns true if `c` can be used in a variable or macro argument name.
pub fn is_definition_name_char(c: char, leading: bool) -> bool {
    is_identifier_char(c, leading) && !matches!(c, ':' | '=')
}

/// The set of known operation and variable names.
///
/// MML does not require a separator between operations (ie, `c4e4g4`), so the tokenizer
/// reads the longest known name at the current position.
#[derive(Debug, Clone, Default)]
pub struct NameCatalogue {
    names: HashSet<String>,
    max_chars: usize,
}

impl NameCatalogue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: &str) {
        if name.is_empty() {
            return;
        }
        self.max_chars = self.max_chars.max(name.chars().count());
        if !self.names.contains(name) {
            self.names.insert(name.to_owned());
        }
    }

    pub fn longest_match<'s>(&self, s: &'s str) -> Option<&'s str> {
        let ends: Vec<usize> = s
            .char_indices()
            .skip(1)
            .map(|(i, _)| i)
            .chain(std::iter::once(s.len()))
            .take(self.max_chars)
            .collect();

        ends.into_iter()
            .rev()
            .map(|end| &s[..end])
            .find(|prefix| self.names.contains(*prefix))
    }
}

/// Reads an identifier that is not in the catalogue.
pub fn fallback_identifier(s: &str) -> &str {
    let mut end = 0;
    for (i, c) in s.char_indices() {
        if !is_identifier_char(c, i == 0) {
            break;
        }
        end = i + c.len_utf8();
    }
    &s[..end]
}
