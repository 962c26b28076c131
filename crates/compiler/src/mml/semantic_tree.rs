//! MML semantic tree

// SPDX-FileCopyrightText: © 2023 Marcus Rowe <undisbeliever@gmail.com>
//
// SPDX-License-Identifier: MIT

use super::command_parser::{parse_expression, parse_operations};
use super::expression::{DataType, Expression, OperationUse};
use super::primitives::Primitive;
use super::tokenizer::{MacroTokens, Token, TokenizedMml, VariableTokens};
use super::track_number::{TrackNumber, TrackRange};
use super::value::{Value, DEFAULT_BASE_COUNT};

use crate::diagnostics::{Diagnostic, DiagnosticSink};
use crate::errors::{ErrorWithLocation, ParseError};
use crate::file_pos::{unknown_location, Location};

use std::collections::{BTreeMap, HashMap};

use tracing::debug;

pub const TIMELINE_POSITION: &str = "__timeline_position";
pub const BASE_COUNT: &str = "__base_count";

/// The track `#meta` lines are written to
pub const META_TRACK: TrackNumber = TrackNumber::ZERO;

/// Index into the variable arena
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct VariableId(usize);

#[derive(Debug, Clone)]
pub struct Variable {
    pub name: String,
    pub data_type: DataType,
    /// Missing defaults are zero-filled.
    /// `None` for buffers, a new buffer is created every time the default is used.
    pub default_value: Option<Expression>,
    pub location: Location,
}

#[derive(Debug, Clone)]
pub struct Macro {
    pub name: String,
    pub location: Location,
    /// `None` if the macro can be used in every track
    pub target_tracks: Option<Vec<TrackRange>>,
    pub arguments: Vec<Variable>,
    pub body: Vec<OperationUse>,
}

impl Macro {
    pub fn is_visible_in(&self, track: TrackNumber) -> bool {
        match &self.target_tracks {
            None => true,
            Some(ranges) => ranges.iter().any(|r| r.contains(track)),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Track {
    pub number: TrackNumber,
    pub body: Vec<OperationUse>,
}

#[derive(Debug)]
pub struct SemanticTree {
    pub base_count: u32,
    variables: Vec<Variable>,
    variable_names: HashMap<String, VariableId>,
    /// In definition order
    macros: Vec<Macro>,
    tracks: BTreeMap<TrackNumber, Track>,
}

impl SemanticTree {
    pub fn variable(&self, id: VariableId) -> &Variable {
        &self.variables[id.0]
    }

    pub fn find_variable(&self, name: &str) -> Option<VariableId> {
        self.variable_names.get(name).copied()
    }

    pub fn variables(&self) -> impl Iterator<Item = (VariableId, &Variable)> {
        self.variables
            .iter()
            .enumerate()
            .map(|(i, v)| (VariableId(i), v))
    }

    pub fn macros(&self) -> &[Macro] {
        &self.macros
    }

    /// The macros callable from `track`.
    ///
    /// When more than one macro has the same name, the last definition wins.
    pub fn macros_for_track(&self, track: TrackNumber) -> HashMap<&str, &Macro> {
        let mut out = HashMap::new();
        for m in self.macros.iter().filter(|m| m.is_visible_in(track)) {
            out.insert(m.name.as_str(), m);
        }
        out
    }

    /// Tracks in ascending track number order
    pub fn tracks(&self) -> impl Iterator<Item = &Track> {
        self.tracks.values()
    }

    pub fn track(&self, number: TrackNumber) -> Option<&Track> {
        self.tracks.get(&number)
    }
}

type ParseErrors = Vec<ErrorWithLocation<ParseError>>;

struct Builder<'a> {
    sink: &'a mut dyn DiagnosticSink,
    errors: ParseErrors,
}

impl Builder<'_> {
    fn parse_default(&mut self, v: &VariableTokens) -> Option<Expression> {
        let tokens = v.default.as_ref()?;

        if tokens.is_empty() {
            self.errors.push(ErrorWithLocation::new(
                &v.location,
                ParseError::MissingDefaultValue(v.name.clone()),
            ));
            return None;
        }

        let end = tokens.last().map_or(&v.location, |t| &t.location);
        match parse_expression(tokens, end) {
            Ok(e) => Some(e),
            Err(e) => {
                self.errors.push(e);
                None
            }
        }
    }

    fn parse_body(&mut self, tokens: &[Token], end: &Location) -> Vec<OperationUse> {
        match parse_operations(tokens, end) {
            Ok(o) => o,
            Err(e) => {
                self.errors.push(e);
                Vec::new()
            }
        }
    }

    fn build_variable(&mut self, v: &VariableTokens) -> Variable {
        let default_value = match self.parse_default(v) {
            Some(e) => Some(e),
            None => match v.data_type {
                DataType::Buffer => None,
                t => Some(Expression::Constant(Value::zero(t))),
            },
        };

        Variable {
            name: v.name.clone(),
            data_type: v.data_type,
            default_value,
            location: v.location.clone(),
        }
    }

    fn build_macro(&mut self, m: &MacroTokens) -> Macro {
        let arguments = m.arguments.iter().map(|a| self.build_variable(a)).collect();

        Macro {
            name: m.name.clone(),
            location: m.location.clone(),
            target_tracks: m.target_tracks.clone(),
            arguments,
            body: self.parse_body(&m.body, &m.end_location),
        }
    }
}

fn builtin_variable(name: &str, value: f64, location: &Location) -> Variable {
    Variable {
        name: name.to_owned(),
        data_type: DataType::Number,
        default_value: Some(Expression::Constant(Value::Number(value))),
        location: location.clone(),
    }
}

fn track_enabled(tokens: &TokenizedMml, block: Option<&str>, track: TrackNumber) -> bool {
    let block_ok = match (&tokens.conditional_blocks, block) {
        (Some(blocks), Some(b)) => blocks.iter().any(|n| n == b),
        _ => true,
    };
    let track_ok = match &tokens.conditional_tracks {
        Some(ranges) => ranges.iter().any(|r| r.contains(track)),
        None => true,
    };
    block_ok && track_ok
}

/// Parses every definition and track body.
///
/// Parse errors do not stop the build, every error in every line is returned.
pub fn build_semantic_tree(
    tokens: &TokenizedMml,
    sink: &mut dyn DiagnosticSink,
) -> Result<SemanticTree, ParseErrors> {
    let mut builder = Builder {
        sink,
        errors: Vec::new(),
    };

    let base_count = tokens.base_count.unwrap_or(DEFAULT_BASE_COUNT);

    let builtin_location = unknown_location();
    let mut variables = vec![
        builtin_variable(TIMELINE_POSITION, 0.0, &builtin_location),
        builtin_variable(BASE_COUNT, base_count.into(), &builtin_location),
    ];
    let mut variable_names: HashMap<String, VariableId> = variables
        .iter()
        .enumerate()
        .map(|(i, v)| (v.name.clone(), VariableId(i)))
        .collect();

    for v in &tokens.variables {
        let var = builder.build_variable(v);

        match variable_names.get(&var.name) {
            Some(id) => {
                builder.sink.report(Diagnostic::warning(
                    &var.location,
                    format!("variable {} is already defined", var.name),
                ));
                variables[id.0] = var;
            }
            None => {
                variable_names.insert(var.name.clone(), VariableId(variables.len()));
                variables.push(var);
            }
        }
    }

    let macros: Vec<Macro> = tokens
        .macros
        .iter()
        .map(|m| builder.build_macro(m))
        .collect();

    let mut tracks: BTreeMap<TrackNumber, Track> = BTreeMap::new();

    if !tokens.metas.is_empty() {
        let body = tokens
            .metas
            .iter()
            .map(|m| OperationUse {
                name: Primitive::MidiMeta.name().to_owned(),
                location: m.location.clone(),
                arguments: vec![
                    Some(Expression::Constant(Value::Number(m.kind.meta_type().into()))),
                    Some(Expression::Constant(Value::String(m.text.clone()))),
                ],
            })
            .collect();

        tracks.insert(
            META_TRACK,
            Track {
                number: META_TRACK,
                body,
            },
        );
    }

    for t in &tokens.tracks {
        let enabled: Vec<TrackNumber> = t
            .tracks
            .iter()
            .copied()
            .filter(|&n| track_enabled(tokens, t.block.as_deref(), n))
            .collect();
        if enabled.is_empty() {
            continue;
        }

        let body = builder.parse_body(&t.body, &t.end_location);

        for number in enabled {
            tracks
                .entry(number)
                .or_insert_with(|| Track {
                    number,
                    body: Vec::new(),
                })
                .body
                .extend(body.iter().cloned());
        }
    }

    debug!(
        variables = variables.len(),
        macros = macros.len(),
        tracks = tracks.len(),
        "built semantic tree"
    );

    if !builder.errors.is_empty() {
        return Err(builder.errors);
    }

    Ok(SemanticTree {
        base_count,
        variables,
        variable_names,
        macros,
        tracks,
    })
}
