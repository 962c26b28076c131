//! MML to Standard MIDI File compiler

// SPDX-FileCopyrightText: © 2023 Marcus Rowe <undisbeliever@gmail.com>
//
// SPDX-License-Identifier: MIT

mod file_pos;

pub mod diagnostics;
pub mod encoding;
pub mod errors;
pub mod mml;
pub mod project;
pub mod smf;
pub mod sources;

pub use file_pos::Location;
