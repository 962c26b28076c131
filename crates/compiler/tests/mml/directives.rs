// SPDX-FileCopyrightText: © 2023 Marcus Rowe <undisbeliever@gmail.com>
//
// SPDX-License-Identifier: MIT

use crate::*;

use mml_compiler::encoding::{latin1_encoder, set_string_encoder, utf8_encoder};
use mml_compiler::errors::SourceError;

#[test]
fn test_comments() {
    let music = compile("1 c // d\n#comment\n1 e\n#endcomment\n1 f");
    let expected = compile("1 c f");

    assert_eq!(track_events(&music, 1.0), track_events(&expected, 1.0));
}

#[test]
fn test_continuation_lines() {
    let music = compile("1 c\n  d\n\te");
    let expected = compile("1 c d e");

    assert_eq!(track_events(&music, 1.0), track_events(&expected, 1.0));
}

#[test]
fn test_track_lines_are_appended() {
    let music = compile("1 c\n2 e\n1 d");
    let expected = compile("1 c d\n2 e");

    assert_eq!(track_events(&music, 1.0), track_events(&expected, 1.0));
    assert_eq!(track_events(&music, 2.0), track_events(&expected, 2.0));
}

#[test]
fn test_define() {
    let music = compile("#define RIFF c8 e8\n1 RIFF RIFF");
    let expected = compile("1 c8 e8 c8 e8");

    assert_eq!(track_events(&music, 1.0), track_events(&expected, 1.0));
}

#[test]
fn test_include() {
    let mut resolver = StringResolver::new();
    resolver.add("lib.mml", "#macro RIFF { c d }\n#variable OCT:number=5");

    let (r, _) = compile_with(
        "#include \"lib.mml\"\n1 o$OCT RIFF",
        &resolver,
        &CompileOptions::default(),
    );
    let music = r.unwrap();
    let expected = compile("1 o5 c d");

    assert_eq!(track_events(&music, 1.0), track_events(&expected, 1.0));
}

#[test]
fn test_missing_include() {
    match compile_error("#include \"missing.mml\"\n1 c") {
        CompileError::Source(e) => {
            assert_eq!(e.error(), &SourceError::NotFound("missing.mml".to_owned()))
        }
        e => panic!("unexpected error {:?}", e),
    }
}

#[test]
fn test_conditional_tracks() {
    let music = compile("#conditional track 2\n1 c\n2 d\n3 e");

    assert_eq!(track_numbers(&music), [2.0]);
}

#[test]
fn test_conditional_blocks() {
    let music = compile("#conditional block VERSE\nVERSE 1 c\nCHORUS 1 d\n1 e");
    let expected = compile("1 c e");

    assert_eq!(track_events(&music, 1.0), track_events(&expected, 1.0));
}

#[test]
fn test_meta_directive() {
    let music = compile("#meta title \"Song\"\n1 c");

    assert_eq!(track_numbers(&music), [0.0, 1.0]);
    assert_eq!(track_events(&music, 0.0), ["0: ff 03 53 6f 6e 67"]);
    assert_eq!(meta_events(&music), ["ff 03 53 6f 6e 67"]);
}

#[test]
fn test_base_count() {
    let music = compile("#basecount 96\n1 c d8");

    assert_eq!(music.base_count, 96);
    assert_eq!(
        track_events(&music, 1.0),
        ["0: 90 3c 64", "24: 80 3c 00", "24: 90 3e 64", "36: 80 3e 00"]
    );
}

#[test]
fn test_without_default_macros() {
    let options = CompileOptions {
        use_default_macros: false,
        ..CompileOptions::default()
    };
    let (r, _) = compile_with("1 __MIDI #90, 60, 100", &StringResolver::new(), &options);
    let music = r.unwrap();
    assert_eq!(track_events(&music, 1.0), ["0: 90 3c 64"]);

    let (r, _) = compile_with("1 c", &StringResolver::new(), &options);
    match r {
        Err(CompileError::Resolve(e)) => {
            assert_eq!(e.error(), &ResolveError::UnknownMacro("c".to_owned()))
        }
        r => panic!("unexpected result {:?}", r.map(|_| ())),
    }
}

#[test]
fn test_continue_on_error() {
    let options = CompileOptions {
        continue_on_error: true,
        ..CompileOptions::default()
    };
    let (r, sink) = compile_with("1 c zz d", &StringResolver::new(), &options);
    let music = r.unwrap();

    assert!(sink.has_errors());
    assert_eq!(sink.messages(Severity::Error).len(), 1);
    assert_eq!(
        track_events(&music, 1.0),
        ["0: 90 3c 64", "48: 80 3c 00", "48: 90 3e 64", "96: 80 3e 00"]
    );
}

#[test]
fn test_lex_and_parse_errors() {
    assert!(matches!(compile_error("1 c \"abc"), CompileError::Lex(_)));
    assert!(matches!(compile_error("1 c {1 + 2"), CompileError::Parse(_)));
}

#[test]
fn test_string_encoder() {
    let mml = "1 TRACKNAME \"caf\\233;\"";

    set_string_encoder(latin1_encoder);
    let (latin1, _) = compile_with(mml, &StringResolver::new(), &CompileOptions::default());
    set_string_encoder(utf8_encoder);

    let latin1 = latin1.unwrap();
    assert_eq!(track_events(&latin1, 1.0), ["0: ff 03 63 61 66 e9"]);

    assert_eq!(track_events(&compile(mml), 1.0), ["0: ff 03 63 61 66 c3 a9"]);
}
