//! MML tokenizer

// SPDX-FileCopyrightText: © 2023 Marcus Rowe <undisbeliever@gmail.com>
//
// SPDX-License-Identifier: MIT

use super::expression::DataType;
use super::identifier::{
    fallback_identifier, is_definition_name_char, is_identifier_char, NameCatalogue,
};
use super::line_splitter::MmlLines;
use super::primitives::primitive_names;
use super::track_number::{TrackNumber, TrackRange};

use crate::errors::{ErrorWithLocation, LexError};
use crate::file_pos::{LineGroup, Location, LocationCursor};

use std::fmt::Display;

use tracing::debug;

#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    Identifier(String),
    Number(f64),
    String(String),

    Comma,
    Dot,
    Dollar,
    Percent,
    OpenCurly,
    CloseCurly,
    Plus,
    Minus,
    Asterisk,
    Slash,
    Caret,
    Question,
    Colon,
    Lesser,
    LesserEqual,
    Greater,
    GreaterEqual,
}

impl TokenKind {
    /// Returns true if an expression can end with this token
    fn completes_operand(&self) -> bool {
        matches!(
            self,
            Self::Identifier(_) | Self::Number(_) | Self::String(_) | Self::CloseCurly | Self::Dot
        )
    }
}

impl Display for TokenKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Identifier(s) => return f.write_str(s),
            Self::Number(n) => return write!(f, "{}", n),
            Self::String(s) => return write!(f, "{:?}", s),
            Self::Comma => ",",
            Self::Dot => ".",
            Self::Dollar => "$",
            Self::Percent => "%",
            Self::OpenCurly => "{",
            Self::CloseCurly => "}",
            Self::Plus => "+",
            Self::Minus => "-",
            Self::Asterisk => "*",
            Self::Slash => "/",
            Self::Caret => "^",
            Self::Question => "?",
            Self::Colon => ":",
            Self::Lesser => "\\<",
            Self::LesserEqual => "\\<=",
            Self::Greater => "\\>",
            Self::GreaterEqual => "\\>=",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub location: Location,
}

#[derive(Debug, Clone)]
pub struct VariableTokens {
    pub name: String,
    pub location: Location,
    pub data_type: DataType,
    pub default: Option<Vec<Token>>,
}

#[derive(Debug, Clone)]
pub struct MacroTokens {
    pub name: String,
    pub location: Location,
    pub target_tracks: Option<Vec<TrackRange>>,
    pub arguments: Vec<VariableTokens>,
    pub body: Vec<Token>,
    pub end_location: Location,
}

#[derive(Debug, Clone)]
pub struct TrackTokens {
    pub block: Option<String>,
    pub tracks: Vec<TrackNumber>,
    pub body: Vec<Token>,
    pub location: Location,
    pub end_location: Location,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetaTextKind {
    Text,
    Copyright,
    Title,
}

impl MetaTextKind {
    fn from_keyword(s: &str) -> Option<Self> {
        match s {
            "text" => Some(Self::Text),
            "copyright" => Some(Self::Copyright),
            "title" => Some(Self::Title),
            _ => None,
        }
    }

    pub fn meta_type(self) -> u8 {
        match self {
            Self::Text => 1,
            Self::Copyright => 2,
            Self::Title => 3,
        }
    }
}

#[derive(Debug, Clone)]
pub struct MetaText {
    pub kind: MetaTextKind,
    pub text: String,
    pub location: Location,
}

#[derive(Debug, Default)]
pub struct TokenizedMml {
    pub base_count: Option<u32>,
    pub conditional_blocks: Option<Vec<String>>,
    pub conditional_tracks: Option<Vec<TrackRange>>,
    pub metas: Vec<MetaText>,
    pub variables: Vec<VariableTokens>,
    pub macros: Vec<MacroTokens>,
    pub tracks: Vec<TrackTokens>,
}

type LexResult<T> = Result<T, ErrorWithLocation<LexError>>;

struct Scanner<'a> {
    text: &'a str,
    pos: usize,
    cursor: LocationCursor<'a>,
}

impl<'a> Scanner<'a> {
    fn new(group: &'a LineGroup) -> Self {
        Self {
            text: group.text(),
            pos: 0,
            cursor: group.location_cursor(),
        }
    }

    fn remaining(&self) -> &'a str {
        &self.text[self.pos..]
    }

    fn is_at_end(&self) -> bool {
        self.pos >= self.text.len()
    }

    fn peek(&self) -> Option<char> {
        self.remaining().chars().next()
    }

    fn location(&mut self) -> Location {
        self.cursor.location_at(self.pos)
    }

    fn error<T>(&mut self, e: LexError) -> LexResult<T> {
        Err(ErrorWithLocation(Some(self.location()), e))
    }

    fn advance(&mut self, n_bytes: usize) {
        self.pos = (self.pos + n_bytes).min(self.text.len());
    }

    fn next_char(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        Some(c)
    }

    fn read_while(&mut self, pattern: impl Fn(char) -> bool) -> &'a str {
        let s = self.remaining();
        let len = match s.char_indices().find(|(_, c)| !pattern(*c)) {
            Some((i, _)) => i,
            None => s.len(),
        };
        self.pos += len;
        &s[..len]
    }

    fn skip_whitespace(&mut self) {
        self.read_while(char::is_whitespace);
    }

    fn read_name(&mut self, pattern: impl Fn(char, bool) -> bool) -> &'a str {
        let s = self.remaining();
        let mut len = 0;
        for (i, c) in s.char_indices() {
            if !pattern(c, i == 0) {
                break;
            }
            len = i + c.len_utf8();
        }
        self.pos += len;
        &s[..len]
    }
}

fn parse_number(s: &str) -> Result<f64, LexError> {
    s.parse().map_err(|_| LexError::InvalidNumber(s.to_owned()))
}

// Assumes the opening `"` has not been read
fn read_string(scanner: &mut Scanner) -> LexResult<String> {
    let start = scanner.location();
    scanner.advance(1);

    let mut out = String::new();

    loop {
        let c = match scanner.next_char() {
            Some(c) => c,
            None => return Err(ErrorWithLocation(Some(start), LexError::UnterminatedString)),
        };
        match c {
            '"' => return Ok(out),
            '\\' => match scanner.next_char() {
                Some('\\') => out.push('\\'),
                Some('"') => out.push('"'),
                Some('/') => out.push('/'),
                Some('r') => out.push('\r'),
                Some('n') => out.push('\n'),
                Some(d) if d.is_ascii_digit() => {
                    let mut code = String::from(d);
                    code.push_str(scanner.read_while(|c| c.is_ascii_digit()));

                    let c = match scanner.next_char() {
                        Some(';') => code.parse().ok().and_then(char::from_u32),
                        _ => None,
                    };
                    match c {
                        Some(c) => out.push(c),
                        None => return scanner.error(LexError::InvalidCharacterCode(code)),
                    }
                }
                Some(c) => return scanner.error(LexError::InvalidEscape(c)),
                None => {
                    return Err(ErrorWithLocation(Some(start), LexError::UnterminatedString))
                }
            },
            c => out.push(c),
        }
    }
}

fn next_token(scanner: &mut Scanner, catalogue: &NameCatalogue) -> LexResult<Option<Token>> {
    macro_rules! one_ascii_token {
        ($t:expr) => {{
            scanner.advance(1);
            $t
        }};
    }

    scanner.skip_whitespace();

    let c = match scanner.peek() {
        Some(c) => c,
        None => return Ok(None),
    };
    let location = scanner.location();

    let kind = match c {
        '0'..='9' => {
            let num = scanner.read_while(|c| c.is_ascii_digit());
            match parse_number(num) {
                Ok(n) => TokenKind::Number(n),
                Err(e) => return Err(ErrorWithLocation(Some(location), e)),
            }
        }
        '#' => {
            scanner.advance(1);
            let num = scanner.read_while(|c| c.is_ascii_hexdigit());
            if num.is_empty() {
                return Err(ErrorWithLocation(Some(location), LexError::NoHexDigits));
            }
            match u64::from_str_radix(num, 16) {
                Ok(i) => TokenKind::Number(i as f64),
                Err(_) => {
                    return Err(ErrorWithLocation(
                        Some(location),
                        LexError::InvalidNumber(num.to_owned()),
                    ))
                }
            }
        }
        '"' => TokenKind::String(read_string(scanner)?),

        ',' => one_ascii_token!(TokenKind::Comma),
        '.' => one_ascii_token!(TokenKind::Dot),
        '$' => one_ascii_token!(TokenKind::Dollar),
        '%' => one_ascii_token!(TokenKind::Percent),
        '{' => one_ascii_token!(TokenKind::OpenCurly),
        '}' => one_ascii_token!(TokenKind::CloseCurly),
        '+' => one_ascii_token!(TokenKind::Plus),
        '-' => one_ascii_token!(TokenKind::Minus),
        '*' => one_ascii_token!(TokenKind::Asterisk),
        '^' => one_ascii_token!(TokenKind::Caret),
        '?' => one_ascii_token!(TokenKind::Question),
        ':' => one_ascii_token!(TokenKind::Colon),
        '/' => one_ascii_token!(TokenKind::Slash),

        '\\' => {
            scanner.advance(1);
            let k = match scanner.next_char() {
                Some('<') => (TokenKind::Lesser, TokenKind::LesserEqual),
                Some('>') => (TokenKind::Greater, TokenKind::GreaterEqual),
                _ => {
                    return Err(ErrorWithLocation(
                        Some(location),
                        LexError::ExpectedComparisonAfterBackslash,
                    ))
                }
            };
            match scanner.peek() {
                Some('=') => one_ascii_token!(k.1),
                _ => k.0,
            }
        }

        c => {
            let remaining = scanner.remaining();
            let name = match catalogue.longest_match(remaining) {
                Some(name) => name,
                None => fallback_identifier(remaining),
            };
            if name.is_empty() {
                return Err(ErrorWithLocation(
                    Some(location),
                    LexError::UnknownCharacter(c),
                ));
            }
            scanner.advance(name.len());
            TokenKind::Identifier(name.to_owned())
        }
    };

    Ok(Some(Token { kind, location }))
}

fn read_tokens_to_end(scanner: &mut Scanner, catalogue: &NameCatalogue) -> LexResult<Vec<Token>> {
    let mut tokens = Vec::new();
    while let Some(t) = next_token(scanner, catalogue)? {
        tokens.push(t);
    }
    Ok(tokens)
}

// Assumes the opening `{` has been read.
// Returns when the matching `}` has been read.
fn read_macro_body(scanner: &mut Scanner, catalogue: &NameCatalogue) -> LexResult<Vec<Token>> {
    let mut tokens = Vec::new();
    let mut depth: usize = 0;

    loop {
        let t = match next_token(scanner, catalogue)? {
            Some(t) => t,
            None => return scanner.error(LexError::UnterminatedMacroBody),
        };
        match t.kind {
            TokenKind::OpenCurly => depth += 1,
            TokenKind::CloseCurly => match depth.checked_sub(1) {
                Some(d) => depth = d,
                None => return Ok(tokens),
            },
            _ => (),
        }
        tokens.push(t);
    }
}

// A default value ends at a top-level `,` or (inside a macro definition) at the body's `{`.
// Every top-level `?` consumes one `,`.
fn read_default_value(
    scanner: &mut Scanner,
    catalogue: &NameCatalogue,
    in_macro: bool,
) -> LexResult<Vec<Token>> {
    let mut tokens: Vec<Token> = Vec::new();
    let mut depth: usize = 0;
    let mut pending_conditionals: usize = 0;

    loop {
        scanner.skip_whitespace();
        match scanner.peek() {
            None => break,
            Some(',') if depth == 0 => match pending_conditionals.checked_sub(1) {
                Some(p) => pending_conditionals = p,
                None => break,
            },
            Some('{')
                if depth == 0
                    && in_macro
                    && tokens.last().is_some_and(|t| t.kind.completes_operand()) =>
            {
                break
            }
            _ => (),
        }

        let t = match next_token(scanner, catalogue)? {
            Some(t) => t,
            None => break,
        };
        match t.kind {
            TokenKind::OpenCurly => depth += 1,
            TokenKind::CloseCurly => match depth.checked_sub(1) {
                Some(d) => depth = d,
                None => {
                    return Err(ErrorWithLocation(
                        Some(t.location),
                        LexError::UnbalancedCloseCurly,
                    ))
                }
            },
            TokenKind::Question if depth == 0 => pending_conditionals += 1,
            _ => (),
        }
        tokens.push(t);
    }

    Ok(tokens)
}

/// Reads `name[:type][=default], ...`
fn read_definitions(
    scanner: &mut Scanner,
    catalogue: &NameCatalogue,
    in_macro: bool,
) -> LexResult<Vec<VariableTokens>> {
    let mut out = Vec::new();

    loop {
        scanner.skip_whitespace();
        match scanner.peek() {
            None => break,
            Some('{') if in_macro => break,
            _ => (),
        }

        let location = scanner.location();
        let name = scanner.read_name(is_definition_name_char);
        if name.is_empty() {
            return match scanner.peek() {
                Some(c) => scanner.error(LexError::UnexpectedCharacter(c)),
                None => scanner.error(LexError::MissingName),
            };
        }
        scanner.skip_whitespace();

        let mut data_type = DataType::Any;
        if scanner.peek() == Some(':') {
            scanner.advance(1);
            scanner.skip_whitespace();

            let type_location = scanner.location();
            let word = scanner.read_while(|c| c.is_ascii_alphabetic());
            data_type = match DataType::from_keyword(word) {
                Some(t) => t,
                None => {
                    return Err(ErrorWithLocation(
                        Some(type_location),
                        LexError::UnknownDataType(word.to_owned()),
                    ))
                }
            };
            scanner.skip_whitespace();
        }

        let default = match scanner.peek() {
            Some('=') => {
                scanner.advance(1);
                let d = read_default_value(scanner, catalogue, in_macro)?;
                scanner.skip_whitespace();
                Some(d)
            }
            _ => None,
        };

        out.push(VariableTokens {
            name: name.to_owned(),
            location,
            data_type,
            default,
        });

        match scanner.peek() {
            Some(',') => scanner.advance(1),
            Some('{') if in_macro => break,
            None => break,
            Some(c) => return scanner.error(LexError::UnexpectedCharacter(c)),
        }
    }

    Ok(out)
}

fn read_track_number(scanner: &mut Scanner) -> LexResult<TrackNumber> {
    let location = scanner.location();
    let s = scanner.read_while(|c| c.is_ascii_digit() || c == '.');

    match s.parse::<f64>() {
        Ok(n) if s.starts_with(|c: char| c.is_ascii_digit()) => Ok(TrackNumber::new(n)),
        _ => Err(ErrorWithLocation(
            Some(location),
            LexError::InvalidTrackNumber(s.to_owned()),
        )),
    }
}

/// Reads `1`, `1-3`, `1,2,5` or `1.1`
fn read_track_ranges(scanner: &mut Scanner) -> LexResult<Vec<TrackRange>> {
    let mut ranges = Vec::new();

    loop {
        let location = scanner.location();
        let first = read_track_number(scanner)?;
        let last = match scanner.peek() {
            Some('-') => {
                scanner.advance(1);
                read_track_number(scanner)?
            }
            _ => first,
        };

        if first != last && (first > last || !first.is_integer() || !last.is_integer()) {
            return Err(ErrorWithLocation(
                Some(location),
                LexError::InvalidTrackRange(format!("{}-{}", first, last)),
            ));
        }
        ranges.push(TrackRange { first, last });

        match scanner.peek() {
            Some(',') => scanner.advance(1),
            _ => break,
        }
    }

    match scanner.peek() {
        None => Ok(ranges),
        Some(c) if c.is_whitespace() => Ok(ranges),
        Some(_) => {
            let s = scanner.read_while(|c| !c.is_whitespace()).to_owned();
            scanner.error(LexError::InvalidTrackNumber(s))
        }
    }
}

fn read_macro_name<'a>(scanner: &mut Scanner<'a>) -> &'a str {
    scanner.read_name(is_identifier_char)
}

// Assumes `#macro` is at the start of the group
fn macro_name(group: &LineGroup) -> Option<String> {
    let mut scanner = Scanner::new(group);
    scanner.advance("#macro".len());
    scanner.skip_whitespace();
    if scanner.peek().is_some_and(|c| c.is_ascii_digit()) {
        scanner.read_while(|c| !c.is_whitespace());
        scanner.skip_whitespace();
    }
    let name = read_macro_name(&mut scanner);
    (!name.is_empty()).then(|| name.to_owned())
}

fn tokenize_macro(group: &LineGroup, catalogue: &NameCatalogue) -> LexResult<MacroTokens> {
    let mut scanner = Scanner::new(group);
    scanner.advance("#macro".len());
    scanner.skip_whitespace();

    let target_tracks = match scanner.peek() {
        Some(c) if c.is_ascii_digit() => {
            let r = read_track_ranges(&mut scanner)?;
            scanner.skip_whitespace();
            Some(r)
        }
        _ => None,
    };

    let location = scanner.location();
    let name = read_macro_name(&mut scanner);
    if name.is_empty() {
        return scanner.error(LexError::MissingMacroName);
    }

    let arguments = read_definitions(&mut scanner, catalogue, true)?;

    if scanner.peek() != Some('{') {
        return scanner.error(LexError::MissingMacroBody);
    }
    scanner.advance(1);

    let body = match arguments.is_empty() {
        true => read_macro_body(&mut scanner, catalogue)?,
        false => {
            let mut body_catalogue = catalogue.clone();
            for a in &arguments {
                body_catalogue.insert(&a.name);
            }
            read_macro_body(&mut scanner, &body_catalogue)?
        }
    };
    let end_location = scanner.location();

    scanner.skip_whitespace();
    if !scanner.is_at_end() {
        return scanner.error(LexError::TextAfterMacroBody);
    }

    Ok(MacroTokens {
        name: name.to_owned(),
        location,
        target_tracks,
        arguments,
        body,
        end_location,
    })
}

fn tokenize_variables(
    group: &LineGroup,
    catalogue: &NameCatalogue,
) -> LexResult<Vec<VariableTokens>> {
    let mut scanner = Scanner::new(group);
    scanner.advance("#variable".len());

    read_definitions(&mut scanner, catalogue, false)
}

fn tokenize_track(group: &LineGroup, catalogue: &NameCatalogue) -> LexResult<TrackTokens> {
    let mut scanner = Scanner::new(group);
    let location = scanner.location();

    let block = match scanner.peek() {
        Some(c) if c.is_ascii_alphabetic() => {
            let b = scanner.read_while(|c| c.is_ascii_alphanumeric() || c == '_');
            scanner.skip_whitespace();
            Some(b.to_owned())
        }
        _ => None,
    };

    if !scanner.peek().is_some_and(|c| c.is_ascii_digit()) {
        return scanner.error(LexError::MissingTrackNumber);
    }
    let ranges = read_track_ranges(&mut scanner)?;
    let tracks = ranges.iter().flat_map(|r| r.expand()).collect();

    let body = read_tokens_to_end(&mut scanner, catalogue)?;
    let end_location = scanner.location();

    Ok(TrackTokens {
        block,
        tracks,
        body,
        location,
        end_location,
    })
}

fn tokenize_pragma(group: &LineGroup, out: &mut TokenizedMml) -> LexResult<()> {
    let mut scanner = Scanner::new(group);
    scanner.advance(1);

    let directive = scanner.read_while(|c| !c.is_whitespace());
    scanner.skip_whitespace();

    match directive {
        "basecount" => {
            let word = scanner.read_while(|c| !c.is_whitespace());
            match word.parse::<u32>() {
                Ok(n) if n > 0 => out.base_count = Some(n),
                _ => return scanner.error(LexError::InvalidBaseCount(word.to_owned())),
            }
        }
        "meta" => {
            let kind_location = scanner.location();
            let word = scanner.read_while(|c| c.is_ascii_alphabetic());
            let kind = match MetaTextKind::from_keyword(word) {
                Some(k) => k,
                None => {
                    return Err(ErrorWithLocation(
                        Some(kind_location),
                        LexError::UnknownMetaType(word.to_owned()),
                    ))
                }
            };
            scanner.skip_whitespace();
            if scanner.peek() != Some('"') {
                return scanner.error(LexError::MissingMetaText);
            }
            let text = read_string(&mut scanner)?;
            out.metas.push(MetaText {
                kind,
                text,
                location: kind_location,
            });
        }
        "conditional" => {
            let word = scanner.read_while(|c| c.is_ascii_alphabetic());
            scanner.skip_whitespace();
            if scanner.is_at_end() {
                return scanner.error(LexError::MissingConditionalArguments);
            }
            match word {
                "block" => {
                    let names = scanner
                        .remaining()
                        .split(',')
                        .map(str::trim)
                        .filter(|s| !s.is_empty())
                        .map(str::to_owned);
                    out.conditional_blocks
                        .get_or_insert_with(Vec::new)
                        .extend(names);
                }
                "track" => {
                    let ranges = read_track_ranges(&mut scanner)?;
                    out.conditional_tracks
                        .get_or_insert_with(Vec::new)
                        .extend(ranges);
                }
                w => return scanner.error(LexError::UnknownConditional(w.to_owned())),
            }
        }
        _ => (),
    }

    Ok(())
}

fn base_catalogue() -> NameCatalogue {
    let mut c = NameCatalogue::new();
    for n in primitive_names() {
        c.insert(n);
    }
    c
}

/// Tokenizes every line group.
///
/// Macro and variable names are collected before any operations are tokenized, so a
/// macro can be used before (or inside) its own definition.
pub fn tokenize(lines: &MmlLines) -> Result<TokenizedMml, Vec<ErrorWithLocation<LexError>>> {
    let mut errors = Vec::new();
    let mut out = TokenizedMml::default();

    for g in &lines.pragmas {
        if let Err(e) = tokenize_pragma(g, &mut out) {
            errors.push(e);
        }
    }

    let mut catalogue = base_catalogue();
    {
        let mut names = Vec::new();
        for g in &lines.variables {
            if let Ok(vars) = tokenize_variables(g, &catalogue) {
                names.extend(vars.into_iter().map(|v| v.name));
            }
        }
        names.extend(lines.macros.iter().filter_map(macro_name));

        for n in &names {
            catalogue.insert(n);
        }
    }

    for g in &lines.variables {
        match tokenize_variables(g, &catalogue) {
            Ok(v) => out.variables.extend(v),
            Err(e) => errors.push(e),
        }
    }
    for g in &lines.macros {
        match tokenize_macro(g, &catalogue) {
            Ok(m) => out.macros.push(m),
            Err(e) => errors.push(e),
        }
    }
    for g in &lines.tracks {
        match tokenize_track(g, &catalogue) {
            Ok(t) => out.tracks.push(t),
            Err(e) => errors.push(e),
        }
    }

    debug!(
        variables = out.variables.len(),
        macros = out.macros.len(),
        tracks = out.tracks.len(),
        "tokenized"
    );

    if errors.is_empty() {
        Ok(out)
    } else {
        Err(errors)
    }
}
