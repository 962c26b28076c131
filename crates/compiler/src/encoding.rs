//! String to byte encoding

// SPDX-FileCopyrightText: © 2023 Marcus Rowe <undisbeliever@gmail.com>
//
// SPDX-License-Identifier: MIT

use std::sync::RwLock;

/// Converts the text of string values into the bytes stored in meta and sysex events.
pub type StringEncoder = fn(&str) -> Vec<u8>;

static STRING_ENCODER: RwLock<StringEncoder> = RwLock::new(utf8_encoder as StringEncoder);

/// Replaces the process-wide string encoder.
pub fn set_string_encoder(encoder: StringEncoder) {
    let mut e = STRING_ENCODER.write().unwrap_or_else(|e| e.into_inner());
    *e = encoder;
}

pub fn encode_string(s: &str) -> Vec<u8> {
    let encoder = *STRING_ENCODER.read().unwrap_or_else(|e| e.into_inner());
    encoder(s)
}

pub fn utf8_encoder(s: &str) -> Vec<u8> {
    s.as_bytes().to_vec()
}

/// ISO-8859-1.  Characters outside of Latin-1 are written as `?`.
pub fn latin1_encoder(s: &str) -> Vec<u8> {
    s.chars()
        .map(|c| match u8::try_from(u32::from(c)) {
            Ok(b) => b,
            Err(_) => b'?',
        })
        .collect()
}
