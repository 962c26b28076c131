// SPDX-FileCopyrightText: © 2023 Marcus Rowe <undisbeliever@gmail.com>
//
// SPDX-License-Identifier: MIT

use crate::*;

#[test]
fn test_variables() {
    assert_mml_matches_events(
        "#variable VEL:number=90\n1 v$VEL c",
        1.0,
        &["0: 90 3c 5a", "48: 80 3c 00"],
    );
    assert_mml_matches_events(
        "#variable LEN:length=8\n1 l$LEN c",
        1.0,
        &["0: 90 3c 64", "24: 80 3c 00"],
    );
}

#[test]
fn test_track_variables() {
    // Every track starts with the default values
    let music = compile("1 o5 v50 c\n2 c");

    assert_eq!(track_events(&music, 1.0), ["0: 90 48 32", "48: 80 48 00"]);
    assert_eq!(track_events(&music, 2.0), ["0: 90 3c 64", "48: 80 3c 00"]);
}

#[test]
fn test_expression_arguments() {
    assert_line_matches_line("o{3 + 2} c", "o5 c");
    assert_line_matches_line("v 10 * 8 c", "v80 c");
    assert_line_matches_line("n 5 * 12 + 2", "d");
}

#[test]
fn test_conditional_expression() {
    let mml = "#variable MODE:number=1\n\
               1 __PRINT $MODE \\> 0 ? \"loud\", \"quiet\" \
               __LET \"MODE\", 0 \
               __PRINT $MODE \\> 0 ? \"loud\", \"quiet\"";

    assert_eq!(prints(mml), ["loud", "quiet"]);
}

#[test]
fn test_timeline_variable() {
    assert_eq!(prints("1 c d8 __PRINT $__timeline_position"), ["72"]);
    assert_line_matches_line("__LET \"__timeline_position\", 96 c", "r2 c");
}

#[test]
fn test_buffer_and_format() {
    let mml = "#variable NAME:buffer\n\
               1 __STORE \"NAME\", \"Lead \" \
               __STORE_FORMAT \"NAME\", \"{0}-{1}\", 1, 2 \
               TRACKNAME $NAME";

    assert_mml_matches_events(mml, 1.0, &["0: ff 03 4c 65 61 64 20 31 2d 32"]);
}

#[test]
fn test_save_and_restore_operations() {
    assert_line_matches_line(
        "__SAVE_OPER_BEGIN 1 c d __SAVE_OPER_END e __RESTORE_OPER 1 __RESTORE_OPER 1",
        "e c d c d",
    );
}

#[test]
fn test_stored_operation_errors() {
    assert_error_in_mml_line(
        "__RESTORE_OPER 5",
        ResolveError::UnknownStoredOperations(5),
    );
    assert_error_in_mml_line(
        "__SAVE_OPER_BEGIN 1 c",
        ResolveError::UnterminatedSaveOperations,
    );
    assert_error_in_mml_line("c __SAVE_OPER_END", ResolveError::SaveOperationsEndWithoutBegin);
}

#[test]
fn test_unknown_variable() {
    assert_error_in_mml_line("v$LOUD c", ResolveError::UnknownVariable("LOUD".to_owned()));
}
