// SPDX-FileCopyrightText: © 2023 Marcus Rowe <undisbeliever@gmail.com>
//
// SPDX-License-Identifier: MIT

use crate::*;

#[test]
fn test_note() {
    assert_line_matches_events("c", &["0: 90 3c 64", "48: 80 3c 00"]);
    assert_line_matches_events("c4", &["0: 90 3c 64", "48: 80 3c 00"]);
    assert_line_matches_events("n 60", &["0: 90 3c 64", "48: 80 3c 00"]);

    assert_line_matches_line("c d e f g a b", "n60 n62 n64 n65 n67 n69 n71");
}

#[test]
fn test_accidentals() {
    assert_line_matches_line("c+ c# c- c=", "n61 n61 n59 n60");
    assert_line_matches_line("e+ e- b+ f-", "n65 n63 n72 n64");
    assert_line_matches_line("d#8 a-8", "n63,8 n68,8");
}

#[test]
fn test_octave() {
    assert_line_matches_events("o5 c", &["0: 90 48 64", "48: 80 48 00"]);
    assert_line_matches_line("> c", "o5 c");
    assert_line_matches_line("< c", "o3 c");
    assert_line_matches_line("o2 > > c", "o4 c");
}

#[test]
fn test_note_length() {
    assert_line_matches_events("c8", &["0: 90 3c 64", "24: 80 3c 00"]);
    assert_line_matches_events("c4.", &["0: 90 3c 64", "72: 80 3c 00"]);
    assert_line_matches_events("c2..", &["0: 90 3c 64", "168: 80 3c 00"]);
    assert_line_matches_events("c%10", &["0: 90 3c 64", "10: 80 3c 00"]);

    assert_line_matches_line("l8 c d", "c8 d8");
    assert_line_matches_line("l%7 c", "c%7");
}

#[test]
fn test_velocity() {
    assert_line_matches_events("c4,50", &["0: 90 3c 32", "48: 80 3c 00"]);
    assert_line_matches_events("v80 c", &["0: 90 3c 50", "48: 80 3c 00"]);
    assert_line_matches_line("v80 c d4,20 e", "c4,80 d4,20 e4,80");

    // An empty argument slot uses the default value
    assert_line_matches_events("n 60,,50", &["0: 90 3c 32", "48: 80 3c 00"]);
}

#[test]
fn test_gate() {
    assert_line_matches_events(
        "q4 c4 d4",
        &["0: 90 3c 64", "24: 80 3c 00", "48: 90 3e 64", "72: 80 3e 00"],
    );
    assert_eq!(timeline_after("1 q4 c4 d4"), 96);
}

#[test]
fn test_rest() {
    assert_line_matches_events(
        "c8 r8 d8",
        &["0: 90 3c 64", "24: 80 3c 00", "48: 90 3e 64", "72: 80 3e 00"],
    );
    assert_eq!(timeline_after("1 r"), 48);
    assert_eq!(timeline_after("1 r1"), 192);
}

#[test]
fn test_transpose_and_channel() {
    assert_line_matches_line("K2 c", "d");
    assert_line_matches_line("K12 c", "> c");

    assert_line_matches_events("CH2 c", &["0: 91 3c 64", "48: 81 3c 00"]);
    assert_line_matches_events("CH10 @3", &["0: c9 03"]);
}

#[test]
fn test_tie() {
    assert_line_matches_events(
        "o5c&d&e",
        &[
            "0: 90 48 64",
            "0: 90 4a 64",
            "0: 90 4c 64",
            "48: 80 48 00",
            "48: 80 4a 00",
            "48: 80 4c 00",
        ],
    );
    assert_eq!(timeline_after("1 o5c&d&e"), 48);

    // The tied note uses the length of the previous note
    assert_line_matches_line("c8&e f", "c8&e8 f");
    assert_eq!(timeline_after("1 c8&e f"), 72);
}

#[test]
fn test_chord() {
    assert_line_matches_events(
        "c0e0g8",
        &[
            "0: 90 3c 64",
            "0: 90 40 64",
            "0: 90 43 64",
            "24: 80 3c 00",
            "24: 80 40 00",
            "24: 80 43 00",
        ],
    );
    assert_eq!(timeline_after("1 c0e0g8"), 24);
}

#[test]
fn test_chord_macro() {
    let mml = "#macro CHORD_A { c0e0g }\n1 CHORD_A8 CHORD_A8 CHORD_A";
    assert_eq!(timeline_after(mml), 96);

    let music = compile(mml);
    let events = track_events(&music, 1.0);
    assert_eq!(events.len(), 18);
    assert_eq!(&events[15..], ["96: 80 3c 00", "96: 80 40 00", "96: 80 43 00"]);
}

#[test]
fn test_tick_conservation() {
    assert_eq!(timeline_after("1 c4 d8 e8. r%10"), 48 + 24 + 36 + 10);
    assert_eq!(timeline_after("1 l16 [c d]4 r2"), 8 * 12 + 96);
}

#[test]
fn test_control_messages() {
    assert_line_matches_events("@5", &["0: c0 05"]);
    assert_line_matches_events("CC 1, 64", &["0: b0 01 40"]);
    assert_line_matches_events(
        "B1 V100 P64 E127",
        &["0: b0 00 01", "0: b0 07 64", "0: b0 0a 40", "0: b0 0b 7f"],
    );

    assert_line_matches_events("PITCH 0", &["0: e0 00 40"]);
    assert_line_matches_events("PITCH 8191", &["0: e0 7f 7f"]);
    assert_line_matches_events("PITCH 4096", &["0: e0 00 60"]);
}

#[test]
fn test_meta_macros() {
    assert_line_matches_events("t120", &["0: ff 51 07 a1 20"]);
    assert_line_matches_events("TIMESIG 3, 4", &["0: ff 58 03 02 18 08"]);
    assert_line_matches_events("TIMESIG 6, 8", &["0: ff 58 06 03 18 08"]);
    assert_line_matches_events("TRACKNAME \"Bass\"", &["0: ff 03 42 61 73 73"]);
    assert_line_matches_events("r MARKER \"A\"", &["48: ff 06 41"]);
}

#[test]
fn test_tick_overflow() {
    assert_eq!(
        resolve_error("1 r%1 c0 c%99999999999999999999"),
        ResolveError::TickOverflow
    );
    assert_eq!(
        resolve_error("1 __PRINT %99999999999999999999 + %1"),
        ResolveError::TickOverflow
    );
    assert_eq!(
        resolve_error("1 __PRINT %0 - %99999999999999999999 - %2"),
        ResolveError::TickOverflow
    );
    assert_eq!(
        resolve_error("1 __PRINT 4 * %99999999999999999999"),
        ResolveError::TickOverflow
    );

    let options = CompileOptions {
        continue_on_error: true,
        ..CompileOptions::default()
    };
    let (r, sink) = compile_with(
        "1 r%1 c0 c%99999999999999999999",
        &StringResolver::new(),
        &options,
    );
    assert!(r.is_ok());

    let errors = sink.messages(Severity::Error);
    assert!(!errors.is_empty());
    assert!(errors.iter().all(|m| *m == "tick count is too large"), "{:?}", errors);
}
