// SPDX-FileCopyrightText: © 2023 Marcus Rowe <undisbeliever@gmail.com>
//
// SPDX-License-Identifier: MIT

use crate::*;

/// Returns the data of every `MTrk` chunk
fn track_chunks(smf: &[u8]) -> Vec<&[u8]> {
    let mut out = Vec::new();
    let mut pos = 14;

    while pos < smf.len() {
        assert_eq!(&smf[pos..pos + 4], b"MTrk");
        let len = u32::from_be_bytes(smf[pos + 4..pos + 8].try_into().unwrap()) as usize;
        out.push(&smf[pos + 8..pos + 8 + len]);
        pos += 8 + len;
    }
    assert_eq!(pos, smf.len());

    out
}

#[test]
fn test_arpeggio() {
    let music = compile("1 v120 o4 @0 c4e4g4>c4");
    let smf = smf_bytes(&music);

    #[rustfmt::skip]
    assert_eq!(
        &smf[..14],
        [
            b'M', b'T', b'h', b'd', 0, 0, 0, 6,
            0, 1, // format 1
            0, 1, // 1 track
            0, 48, // ticks per quarter note
        ]
    );

    #[rustfmt::skip]
    assert_eq!(
        track_chunks(&smf),
        [[
            0x00, 0xc0, 0x00,
            0x00, 0x90, 0x3c, 0x78,
            0x30, 0x80, 0x3c, 0x00,
            0x00, 0x90, 0x40, 0x78,
            0x30, 0x80, 0x40, 0x00,
            0x00, 0x90, 0x43, 0x78,
            0x30, 0x80, 0x43, 0x00,
            0x00, 0x90, 0x48, 0x78,
            0x30, 0x80, 0x48, 0x00,
            0x00, 0xff, 0x2f, 0x00,
        ].as_slice()]
    );
}

#[test]
fn test_running_status() {
    let music = compile("1 c0e0g8");

    #[rustfmt::skip]
    assert_eq!(
        track_chunks(&smf_bytes(&music)),
        [[
            0x00, 0x90, 0x3c, 0x64,
            0x00, 0x40, 0x64,
            0x00, 0x43, 0x64,
            0x18, 0x80, 0x3c, 0x00,
            0x00, 0x40, 0x00,
            0x00, 0x43, 0x00,
            0x00, 0xff, 0x2f, 0x00,
        ].as_slice()]
    );

    let options = SmfOptions {
        disable_running_status: true,
        ..SmfOptions::default()
    };
    let smf = build_smf(&music, &options).unwrap();

    #[rustfmt::skip]
    assert_eq!(
        track_chunks(&smf),
        [[
            0x00, 0x90, 0x3c, 0x64,
            0x00, 0x90, 0x40, 0x64,
            0x00, 0x90, 0x43, 0x64,
            0x18, 0x80, 0x3c, 0x00,
            0x00, 0x80, 0x40, 0x00,
            0x00, 0x80, 0x43, 0x00,
            0x00, 0xff, 0x2f, 0x00,
        ].as_slice()]
    );
}

#[test]
fn test_sub_tracks() {
    let music = compile("1 c\n1.1 e");
    assert_eq!(track_numbers(&music), [1.0, 1.1]);

    #[rustfmt::skip]
    assert_eq!(
        track_chunks(&smf_bytes(&music)),
        [[
            0x00, 0x90, 0x3c, 0x64,
            0x00, 0x40, 0x64,
            0x30, 0x80, 0x3c, 0x00,
            0x00, 0x40, 0x00,
            0x00, 0xff, 0x2f, 0x00,
        ].as_slice()]
    );
}

#[test]
fn test_track_order() {
    let music = compile("#meta title \"A\"\n3 t120\n2 c");
    let smf = smf_bytes(&music);

    assert_eq!(&smf[10..12], [0, 3]);

    let chunks = track_chunks(&smf);
    assert_eq!(chunks[0], [0x00, 0xff, 0x03, 0x01, b'A', 0x00, 0xff, 0x2f, 0x00]);
    assert_eq!(chunks[1][..4], [0x00, 0x90, 0x3c, 0x64]);
    assert_eq!(
        chunks[2],
        [0x00, 0xff, 0x51, 0x03, 0x07, 0xa1, 0x20, 0x00, 0xff, 0x2f, 0x00]
    );
}

#[test]
fn test_long_delta_time() {
    let music = compile("1 r1 r1 r1 c");

    let smf = smf_bytes(&music);
    let chunks = track_chunks(&smf);
    // 576 ticks
    assert_eq!(chunks[0][..5], [0x84, 0x40, 0x90, 0x3c, 0x64]);
}

#[test]
fn test_output_is_deterministic() {
    let mml = "#meta title \"Song\"\n\
               #macro RIFF { [c8 e8 : g8]2 }\n\
               1 t140 @4 RIFF l16 [c d e f]2\n\
               2 CH2 o3 RIFF c0e0g\n\
               2.1 CH3 c1";

    let first = smf_bytes(&compile(mml));
    for _ in 0..4 {
        assert_eq!(smf_bytes(&compile(mml)), first);
    }
}
