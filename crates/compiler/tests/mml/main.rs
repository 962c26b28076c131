//! MML compiler integration tests

// SPDX-FileCopyrightText: © 2023 Marcus Rowe <undisbeliever@gmail.com>
//
// SPDX-License-Identifier: MIT

use mml_compiler::diagnostics::{DiagnosticList, Severity};
use mml_compiler::errors::{CompileError, ResolveError};
use mml_compiler::mml::{compile_mml, CompileOptions, EventKind, ResolvedMusic, TrackNumber};
use mml_compiler::smf::{build_smf, SmfOptions};
use mml_compiler::sources::{MmlSource, StringResolver};

mod directives;
mod loops;
mod macros;
mod notes;
mod smf_output;
mod variables;

const FILE_NAME: &str = "test.mml";

fn compile_with(
    mml: &str,
    resolver: &StringResolver,
    options: &CompileOptions,
) -> (Result<ResolvedMusic, CompileError>, DiagnosticList) {
    let mut sink = DiagnosticList::new();
    let sources = [MmlSource::new(FILE_NAME, mml)];

    let r = compile_mml(&sources, resolver, options, &mut sink);
    (r, sink)
}

fn compile(mml: &str) -> ResolvedMusic {
    let (r, sink) = compile_with(mml, &StringResolver::new(), &CompileOptions::default());

    match r {
        Ok(m) => {
            assert!(!sink.has_errors(), "{:?}", sink.0);
            m
        }
        Err(e) => panic!("{}\n{:?}", e, sink.0),
    }
}

fn compile_error(mml: &str) -> CompileError {
    let (r, _) = compile_with(mml, &StringResolver::new(), &CompileOptions::default());

    match r {
        Ok(_) => panic!("expected an error"),
        Err(e) => e,
    }
}

fn resolve_error(mml: &str) -> ResolveError {
    match compile_error(mml) {
        CompileError::Resolve(e) => e.error().clone(),
        e => panic!("expected a resolve error, got {:?}", e),
    }
}

fn format_event_data(data: &[u8]) -> String {
    data.iter()
        .map(|b| format!("{:02x}", b))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Formats the events of a track as `tick: data` strings
fn track_events(music: &ResolvedMusic, track: f64) -> Vec<String> {
    let track = TrackNumber::new(track);

    match music.tracks.iter().find(|t| t.number == track) {
        Some(t) => t
            .events
            .iter()
            .map(|e| format!("{}: {}", e.tick, format_event_data(&e.data)))
            .collect(),
        None => Vec::new(),
    }
}

fn track_numbers(music: &ResolvedMusic) -> Vec<f64> {
    music.tracks.iter().map(|t| t.number.value()).collect()
}

fn meta_events(music: &ResolvedMusic) -> Vec<String> {
    music
        .tracks
        .iter()
        .flat_map(|t| &t.events)
        .filter(|e| e.kind == EventKind::Meta)
        .map(|e| format_event_data(&e.data))
        .collect()
}

fn prints(mml: &str) -> Vec<String> {
    let (r, sink) = compile_with(mml, &StringResolver::new(), &CompileOptions::default());
    if let Err(e) = r {
        panic!("{}", e);
    }
    sink.messages(Severity::Information)
        .into_iter()
        .map(str::to_owned)
        .collect()
}

/// Returns the timeline position of track 1 after the last line of `mml`
fn timeline_after(mml: &str) -> i64 {
    let p = prints(&format!("{} __PRINT $__timeline_position", mml));

    match p.last() {
        Some(s) => s.parse().unwrap(),
        None => panic!("no __PRINT output"),
    }
}

fn smf_bytes(music: &ResolvedMusic) -> Vec<u8> {
    build_smf(music, &SmfOptions::default()).unwrap()
}

#[track_caller]
fn assert_line_matches_events(line: &str, expected: &[&str]) {
    let music = compile(&format!("1 {}", line));

    assert_eq!(track_events(&music, 1.0), expected, "line: {}", line);
}

#[track_caller]
fn assert_mml_matches_events(mml: &str, track: f64, expected: &[&str]) {
    let music = compile(mml);

    assert_eq!(track_events(&music, track), expected);
}

#[track_caller]
fn assert_line_matches_line(line1: &str, line2: &str) {
    let m1 = compile(&format!("1 {}", line1));
    let m2 = compile(&format!("1 {}", line2));

    assert_eq!(
        track_events(&m1, 1.0),
        track_events(&m2, 1.0),
        "`{}` != `{}`",
        line1,
        line2
    );
}

#[track_caller]
fn assert_error_in_mml_line(line: &str, expected: ResolveError) {
    assert_eq!(resolve_error(&format!("1 {}", line)), expected, "line: {}", line);
}
