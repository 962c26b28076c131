// SPDX-FileCopyrightText: © 2023 Marcus Rowe <undisbeliever@gmail.com>
//
// SPDX-License-Identifier: MIT

use crate::*;

#[test]
fn test_loop() {
    assert_line_matches_line("[c4]2", "c4 c4");
    assert_line_matches_line("[c d]3 e", "c d c d c d e");
    assert_line_matches_line("[c]", "c c");
    assert_line_matches_line("[c]1", "c");
}

#[test]
fn test_loop_break() {
    assert_line_matches_line("[c : d]3", "c d c d c");
    assert_line_matches_line("[c / d]3 e", "c d c d c e");
    assert_line_matches_line("[c4/d]2", "c4 d c4");
}

#[test]
fn test_labelled_loop_breaks() {
    assert_line_matches_line("[c :1 d :2 e]2", "c d c e");
    assert_line_matches_line("[c :1,3 d :2 e]4", "c d c e c d c e");
    assert_line_matches_line("[c :1 d : e]3", "c d c e c");
}

#[test]
fn test_nested_loops() {
    assert_line_matches_line("[c [d]2 e]2", "c d d e c d d e");
    assert_line_matches_line("[[c : d]2 e]2", "c d c e c d c e");
}

#[test]
fn test_variables_in_loop() {
    // The first pass over the loop body does not print or change variables
    assert_eq!(
        prints("#variable COUNT:number=0\n1 [__LET \"COUNT\", $COUNT + 1 __PRINT $COUNT]3"),
        vec!["1".to_owned(), "2".to_owned(), "3".to_owned()]
    );
    assert_line_matches_line("[c >]3 c", "o4 c o5 c o6 c o7 c");
}

#[test]
fn test_loop_timeline() {
    assert_eq!(timeline_after("1 [c8 : r8]4"), 7 * 24);
    assert_eq!(timeline_after("1 [[c16]4 r4]2"), 2 * (4 * 12 + 48));
}

#[test]
fn test_loop_errors() {
    assert_error_in_mml_line("c ]", ResolveError::LoopEndOutsideLoop);
    assert_error_in_mml_line("c : d", ResolveError::LoopBreakOutsideLoop);
    assert_error_in_mml_line("[c d", ResolveError::UnclosedLoop);
    assert_error_in_mml_line("[c : d : e]2", ResolveError::DuplicateDefaultBreak);
    assert_error_in_mml_line("[c :1 d :1 e]2", ResolveError::DuplicateBreak(1));
    assert_error_in_mml_line("[c :0 d]2", ResolveError::InvalidBreakLabel(0));
    assert_error_in_mml_line(
        "[c4 :1 d :2 e :3 f :4 g]2",
        ResolveError::BreakBeyondLoopCount { label: 3, count: 2 },
    );
}

#[test]
fn test_loop_error_location() {
    let e = match compile_error("1 c d [e f") {
        CompileError::Resolve(e) => e,
        e => panic!("unexpected error {:?}", e),
    };

    assert_eq!(e.error(), &ResolveError::UnclosedLoop);

    let l = e.location().unwrap();
    assert_eq!(l.file(), FILE_NAME);
    assert_eq!(l.line_number(), 1);
    assert_eq!(l.column(), 7);
}
