//! MML compiler

// SPDX-FileCopyrightText: © 2023 Marcus Rowe <undisbeliever@gmail.com>
//
// SPDX-License-Identifier: MIT

mod identifier;
mod loops;
mod primitives;
mod track_number;
mod value;

pub mod command_parser;
pub mod expression;
pub mod line_splitter;
pub mod resolver;
pub mod semantic_tree;
pub mod tokenizer;

pub use self::expression::{DataType, Expression, OperationUse};
pub use self::primitives::Primitive;
pub use self::resolver::{
    resolve_music, EventKind, ResolveOptions, ResolvedEvent, ResolvedMusic, ResolvedTrack,
};
pub use self::semantic_tree::{build_semantic_tree, SemanticTree};
pub use self::track_number::{TrackNumber, TrackRange};
pub use self::value::{Length, Value, DEFAULT_BASE_COUNT};

use self::line_splitter::{read_sources, MmlLines};
use self::tokenizer::{tokenize, TokenizedMml};

use crate::diagnostics::DiagnosticSink;
use crate::errors::CompileError;
use crate::sources::{MmlSource, SourceResolver};

use tracing::debug;

#[derive(Debug, Clone, Copy)]
pub struct CompileOptions {
    /// Prepend the default macro library to the sources
    pub use_default_macros: bool,
    pub continue_on_error: bool,
}

impl Default for CompileOptions {
    fn default() -> Self {
        Self {
            use_default_macros: true,
            continue_on_error: false,
        }
    }
}

fn with_default_macros(sources: &[MmlSource], options: &CompileOptions) -> Vec<MmlSource> {
    let mut out = Vec::with_capacity(sources.len() + 1);
    if options.use_default_macros {
        out.push(MmlSource::default_macros());
    }
    out.extend(sources.iter().cloned());
    out
}

fn read_and_tokenize(
    sources: &[MmlSource],
    resolver: &dyn SourceResolver,
    options: &CompileOptions,
    sink: &mut dyn DiagnosticSink,
) -> Result<TokenizedMml, CompileError> {
    let sources = with_default_macros(sources, options);
    let lines: MmlLines = read_sources(&sources, resolver, sink)?;

    tokenize(&lines).map_err(CompileError::Lex)
}

/// Tokenizes the sources and builds the semantic tree without resolving any tracks.
pub fn parse_mml(
    sources: &[MmlSource],
    resolver: &dyn SourceResolver,
    options: &CompileOptions,
    sink: &mut dyn DiagnosticSink,
) -> Result<SemanticTree, CompileError> {
    let tokens = read_and_tokenize(sources, resolver, options, sink)?;

    build_semantic_tree(&tokens, sink).map_err(CompileError::Parse)
}

/// Compiles the MML sources into the timed MIDI events of every track.
pub fn compile_mml(
    sources: &[MmlSource],
    resolver: &dyn SourceResolver,
    options: &CompileOptions,
    sink: &mut dyn DiagnosticSink,
) -> Result<ResolvedMusic, CompileError> {
    let tree = parse_mml(sources, resolver, options, sink)?;

    let resolve_options = ResolveOptions {
        continue_on_error: options.continue_on_error,
    };
    let music = resolve_music(&tree, resolve_options, sink)?;

    debug!(
        tracks = music.tracks.len(),
        events = music.tracks.iter().map(|t| t.events.len()).sum::<usize>(),
        "compiled MML"
    );

    Ok(music)
}
