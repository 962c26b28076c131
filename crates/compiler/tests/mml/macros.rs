// SPDX-FileCopyrightText: © 2023 Marcus Rowe <undisbeliever@gmail.com>
//
// SPDX-License-Identifier: MIT

use crate::*;

#[test]
fn test_macro() {
    assert_mml_matches_events(
        "#macro RIFF { c8 e8 }\n1 RIFF",
        1.0,
        &["0: 90 3c 64", "24: 80 3c 00", "24: 90 40 64", "48: 80 40 00"],
    );
}

#[test]
fn test_macro_arguments() {
    let mml = "#macro NOTE2 key:number, len:length=8 { n $key, $len }\n1 NOTE2 60 NOTE2 62, 4";
    assert_mml_matches_events(
        mml,
        1.0,
        &["0: 90 3c 64", "24: 80 3c 00", "24: 90 3e 64", "72: 80 3e 00"],
    );
}

#[test]
fn test_tail_arguments() {
    // Extra arguments are passed to the last operation of the macro
    let mml = "#macro X { o5 c }\n1 X8 r";
    assert_eq!(timeline_after(mml), 24 + 48);

    assert_mml_matches_events(
        "#macro X { o5 c }\n1 X8,20",
        1.0,
        &["0: 90 48 14", "24: 80 48 00"],
    );
}

#[test]
fn test_tail_arguments_to_fixed_primitive() {
    // A loop end takes at most one argument
    let e = match compile_error("#macro X { [c]2 }\n1 X8") {
        CompileError::Resolve(e) => e,
        e => panic!("unexpected error {:?}", e),
    };

    assert_eq!(
        e.error(),
        &ResolveError::TooManyArguments {
            operation: "X".to_owned(),
            max: 0,
            found: 1,
        }
    );

    let l = e.location().unwrap();
    assert_eq!(l.line_number(), 2);
    assert_eq!(l.column(), 3);

    assert_eq!(timeline_after("#macro X { [c]2 }\n1 X"), 96);
}

#[test]
fn test_macro_in_macro() {
    let mml = "#macro A { c B }\n#macro B { d C }\n#macro C { e }\n1 A";
    let music = compile(mml);
    let expected = compile("1 c d e");

    assert_eq!(track_events(&music, 1.0), track_events(&expected, 1.0));
}

#[test]
fn test_track_macros() {
    let mml = "#macro X { c }\n#macro 2 X { d }\n1 X\n2 X";
    let music = compile(mml);

    assert_eq!(track_events(&music, 1.0), ["0: 90 3c 64", "48: 80 3c 00"]);
    assert_eq!(track_events(&music, 2.0), ["0: 90 3e 64", "48: 80 3e 00"]);
}

#[test]
fn test_redefined_note_macro() {
    // User macros are defined after the default macros
    assert_mml_matches_events(
        "#macro c { n 72, %10 }\n1 c",
        1.0,
        &["0: 90 48 64", "10: 80 48 00"],
    );
}

#[test]
fn test_apply() {
    assert_line_matches_line("__APPLY \"c\", 8", "c8");
    assert_line_matches_line("__APPLY \"CC\", 7, 100", "V100");
}

#[test]
fn test_recursion() {
    assert!(matches!(
        resolve_error("#macro A { c B }\n#macro B { A }\n1 A"),
        ResolveError::IllegalRecursion(_)
    ));
    assert!(matches!(
        resolve_error("#macro A { A }\n1 A"),
        ResolveError::IllegalRecursion(_)
    ));
}

#[test]
fn test_missing_macro_arguments() {
    // Missing arguments without a default value are zero
    assert_line_matches_events("CC 1", &["0: b0 01 00"]);
}

#[test]
fn test_argument_errors() {
    assert_error_in_mml_line(
        "__LET \"__octave\"",
        ResolveError::InsufficientArguments {
            operation: "__LET".to_owned(),
            expected: 2,
            found: 1,
        },
    );
    assert!(matches!(
        resolve_error("1 o \"five\""),
        ResolveError::TypeMismatch { .. }
    ));
}

#[test]
fn test_unknown_macro() {
    assert_eq!(
        compile_error("1 c zz").to_string(),
        "test.mml (1, 5) : error: unknown macro: zz"
    );

    let e = match compile_error("1 c zz") {
        CompileError::Resolve(e) => e,
        e => panic!("unexpected error {:?}", e),
    };

    assert_eq!(e.error(), &ResolveError::UnknownMacro("zz".to_owned()));

    let l = e.location().unwrap();
    assert_eq!(l.file(), FILE_NAME);
    assert_eq!(l.line_number(), 1);
    assert_eq!(l.column(), 5);
}
