//! Built-in operations

// SPDX-FileCopyrightText: © 2023 Marcus Rowe <undisbeliever@gmail.com>
//
// SPDX-License-Identifier: MIT

use super::expression::DataType;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Primitive {
    Print,
    Let,
    Store,
    Format,
    StoreFormat,
    Apply,
    Midi,
    SyncNoteOffWithNext,
    OnMidiNoteOff,
    MidiMeta,
    SaveOperBegin,
    SaveOperEnd,
    RestoreOper,
    LoopBegin,
    LoopBreak,
    LoopEnd,
}

/// Argument types of a primitive.
///
/// The last type is repeated for `variadic` primitives.
pub struct Signature {
    pub arguments: &'static [DataType],
    pub min_arguments: usize,
    pub variadic: bool,
}

impl Signature {
    pub fn argument_type(&self, index: usize) -> DataType {
        match self.arguments.get(index) {
            Some(t) => *t,
            None => self.arguments.last().copied().unwrap_or(DataType::Any),
        }
    }
}

const fn fixed(arguments: &'static [DataType]) -> Signature {
    Signature {
        arguments,
        min_arguments: arguments.len(),
        variadic: false,
    }
}

const fn variadic(arguments: &'static [DataType], min_arguments: usize) -> Signature {
    Signature {
        arguments,
        min_arguments,
        variadic: true,
    }
}

use DataType::{Any, Number, String as Text};

impl Primitive {
    pub const ALL: [Primitive; 16] = [
        Self::Print,
        Self::Let,
        Self::Store,
        Self::Format,
        Self::StoreFormat,
        Self::Apply,
        Self::Midi,
        Self::SyncNoteOffWithNext,
        Self::OnMidiNoteOff,
        Self::MidiMeta,
        Self::SaveOperBegin,
        Self::SaveOperEnd,
        Self::RestoreOper,
        Self::LoopBegin,
        Self::LoopBreak,
        Self::LoopEnd,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Self::Print => "__PRINT",
            Self::Let => "__LET",
            Self::Store => "__STORE",
            Self::Format => "__FORMAT",
            Self::StoreFormat => "__STORE_FORMAT",
            Self::Apply => "__APPLY",
            Self::Midi => "__MIDI",
            Self::SyncNoteOffWithNext => "__SYNC_NOTE_OFF_WITH_NEXT",
            Self::OnMidiNoteOff => "__ON_MIDI_NOTE_OFF",
            Self::MidiMeta => "__MIDI_META",
            Self::SaveOperBegin => "__SAVE_OPER_BEGIN",
            Self::SaveOperEnd => "__SAVE_OPER_END",
            Self::RestoreOper => "__RESTORE_OPER",
            Self::LoopBegin => "[",
            Self::LoopBreak => ":",
            Self::LoopEnd => "]",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "__PRINT" => Some(Self::Print),
            "__LET" => Some(Self::Let),
            "__STORE" => Some(Self::Store),
            "__FORMAT" => Some(Self::Format),
            "__STORE_FORMAT" => Some(Self::StoreFormat),
            "__APPLY" => Some(Self::Apply),
            "__MIDI" => Some(Self::Midi),
            "__SYNC_NOTE_OFF_WITH_NEXT" => Some(Self::SyncNoteOffWithNext),
            "__ON_MIDI_NOTE_OFF" => Some(Self::OnMidiNoteOff),
            "__MIDI_META" => Some(Self::MidiMeta),
            "__SAVE_OPER_BEGIN" => Some(Self::SaveOperBegin),
            "__SAVE_OPER_END" => Some(Self::SaveOperEnd),
            "__RESTORE_OPER" => Some(Self::RestoreOper),
            "[" | "__LOOP_BEGIN" => Some(Self::LoopBegin),
            ":" | "/" | "__LOOP_BREAK" => Some(Self::LoopBreak),
            "]" | "__LOOP_END" => Some(Self::LoopEnd),
            _ => None,
        }
    }

    pub fn signature(self) -> Signature {
        match self {
            Self::Print => fixed(&[Any]),
            Self::Let => fixed(&[Text, Any]),
            Self::Store => variadic(&[Text, Any], 1),
            Self::Format => variadic(&[Text, Text, Any], 2),
            Self::StoreFormat => variadic(&[Text, Text, Any], 2),
            Self::Apply => variadic(&[Text, Any], 1),
            Self::Midi => variadic(&[Number], 1),
            Self::SyncNoteOffWithNext => fixed(&[]),
            Self::OnMidiNoteOff => fixed(&[Number, Number, Number]),
            Self::MidiMeta => variadic(&[Number, Any], 1),
            Self::SaveOperBegin => fixed(&[Number]),
            Self::SaveOperEnd => fixed(&[]),
            Self::RestoreOper => fixed(&[Number]),
            Self::LoopBegin => fixed(&[]),
            Self::LoopBreak => variadic(&[Number], 0),
            Self::LoopEnd => Signature {
                arguments: &[Number],
                min_arguments: 0,
                variadic: false,
            },
        }
    }
}

/// Names every source line is tokenized against, in addition to the macro and variable
/// names.
pub fn primitive_names() -> impl Iterator<Item = &'static str> {
    Primitive::ALL
        .into_iter()
        .map(Primitive::name)
        .chain(["/", "__LOOP_BEGIN", "__LOOP_BREAK", "__LOOP_END"])
}
