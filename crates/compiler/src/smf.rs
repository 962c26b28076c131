//! Standard MIDI File writer

// SPDX-FileCopyrightText: © 2023 Marcus Rowe <undisbeliever@gmail.com>
//
// SPDX-License-Identifier: MIT

use crate::errors::SmfError;
use crate::mml::{EventKind, ResolvedEvent, ResolvedMusic};

use std::collections::BTreeMap;
use std::io::Write;

use tracing::debug;

const SMF_FORMAT: u16 = 1;
const HEADER_CHUNK_LENGTH: u32 = 6;

pub const MAX_TRACKS: usize = u16::MAX as usize;
pub const MAX_DELTA_TIME: i64 = 0x0fff_ffff;
const MAX_DIVISION: u32 = 0x7fff;

const META_EVENT: u8 = 0xff;
const SYSEX_EVENT: u8 = 0xf0;
const SYSEX_ESCAPE: u8 = 0xf7;

const END_OF_TRACK: [u8; 3] = [META_EVENT, 0x2f, 0x00];

/// Writes a meta event (without the delta time).
///
/// Called with the output buffer, the meta type and the meta data.
pub type MetaEventWriter<'a> = &'a dyn Fn(&mut Vec<u8>, u8, &[u8]);

#[derive(Clone, Copy, Default)]
pub struct SmfOptions<'a> {
    pub disable_running_status: bool,
    /// Overrides the default `FF type length data` meta event encoding
    pub meta_event_writer: Option<MetaEventWriter<'a>>,
}

/// Writes a variable-length quantity (7 bits per byte, most significant byte first)
pub fn write_vlq(out: &mut Vec<u8>, value: u32) {
    let mut shift = 28;
    while shift > 0 && (value >> shift) == 0 {
        shift -= 7;
    }
    while shift > 0 {
        out.push(((value >> shift) & 0x7f) as u8 | 0x80);
        shift -= 7;
    }
    out.push((value & 0x7f) as u8);
}

fn write_meta_event(out: &mut Vec<u8>, meta_type: u8, data: &[u8]) {
    out.push(META_EVENT);
    out.push(meta_type);
    write_vlq(out, data.len() as u32);
    out.extend_from_slice(data);
}

/// Merges sub-tracks (`1.1`, `1.2`) into their output track.
///
/// Events within a output track are stably sorted by tick, the events of lower numbered
/// tracks come first.
fn output_tracks(music: &ResolvedMusic) -> BTreeMap<i64, Vec<&ResolvedEvent>> {
    let mut out: BTreeMap<i64, Vec<&ResolvedEvent>> = BTreeMap::new();

    for t in &music.tracks {
        out.entry(t.number.output_track())
            .or_default()
            .extend(t.events.iter());
    }

    for events in out.values_mut() {
        events.sort_by_key(|e| e.tick);
    }

    out
}

struct TrackWriter<'a> {
    track: String,
    options: &'a SmfOptions<'a>,
    out: Vec<u8>,
    last_tick: i64,
    running_status: Option<u8>,
}

impl<'a> TrackWriter<'a> {
    fn new(track: i64, options: &'a SmfOptions<'a>) -> Self {
        Self {
            track: track.to_string(),
            options,
            out: Vec::new(),
            last_tick: 0,
            running_status: None,
        }
    }

    fn write_delta_time(&mut self, tick: i64) -> Result<(), SmfError> {
        if tick < 0 {
            return Err(SmfError::NegativeTick {
                track: self.track.clone(),
                tick,
            });
        }

        let delta = tick - self.last_tick;
        if delta > MAX_DELTA_TIME {
            return Err(SmfError::DeltaTimeTooLarge {
                track: self.track.clone(),
                delta,
            });
        }

        write_vlq(&mut self.out, delta as u32);
        self.last_tick = tick;
        Ok(())
    }

    fn write_event(&mut self, event: &ResolvedEvent) -> Result<(), SmfError> {
        let status = match event.data.first() {
            Some(&s) => s,
            None => {
                return Err(SmfError::EmptyEvent {
                    track: self.track.clone(),
                    tick: event.tick,
                })
            }
        };

        match (event.kind, status) {
            (EventKind::Meta, META_EVENT) => {
                let (meta_type, data) = match &event.data[1..] {
                    [t, data @ ..] => (*t, data),
                    [] => {
                        return Err(SmfError::InvalidMetaEvent {
                            track: self.track.clone(),
                            tick: event.tick,
                        })
                    }
                };
                self.write_delta_time(event.tick)?;
                match self.options.meta_event_writer {
                    Some(writer) => writer(&mut self.out, meta_type, data),
                    None => write_meta_event(&mut self.out, meta_type, data),
                }
                self.running_status = None;
            }
            (EventKind::Meta, _) => {
                return Err(SmfError::InvalidMetaEvent {
                    track: self.track.clone(),
                    tick: event.tick,
                })
            }
            (EventKind::Midi, s) if s < 0x80 => {
                return Err(SmfError::InvalidStatusByte {
                    track: self.track.clone(),
                    status: s,
                })
            }
            (EventKind::Midi, SYSEX_EVENT | SYSEX_ESCAPE) => {
                let data = &event.data[1..];
                self.write_delta_time(event.tick)?;
                self.out.push(status);
                write_vlq(&mut self.out, data.len() as u32);
                self.out.extend_from_slice(data);
                self.running_status = None;
            }
            (EventKind::Midi, s) if s >= 0xf0 => {
                self.write_delta_time(event.tick)?;
                self.out.extend_from_slice(&event.data);
                self.running_status = None;
            }
            (EventKind::Midi, s) => {
                self.write_delta_time(event.tick)?;
                if !self.options.disable_running_status && self.running_status == Some(s) {
                    self.out.extend_from_slice(&event.data[1..]);
                } else {
                    self.out.extend_from_slice(&event.data);
                }
                self.running_status = Some(s);
            }
        }

        Ok(())
    }

    fn finish(mut self) -> Vec<u8> {
        // End of track is written at the tick of the last event
        write_vlq(&mut self.out, 0);
        self.out.extend_from_slice(&END_OF_TRACK);
        self.out
    }
}

fn time_division(base_count: u32) -> Result<u16, SmfError> {
    let division = base_count / 4;
    match division {
        1..=MAX_DIVISION => Ok(division as u16),
        _ => Err(SmfError::InvalidDivision(base_count)),
    }
}

/// Serializes the resolved music into a format 1 Standard MIDI File.
pub fn build_smf(music: &ResolvedMusic, options: &SmfOptions) -> Result<Vec<u8>, SmfError> {
    let division = time_division(music.base_count)?;
    let tracks = output_tracks(music);

    if tracks.len() > MAX_TRACKS {
        return Err(SmfError::TooManyTracks(tracks.len()));
    }

    let mut out = Vec::new();
    out.extend_from_slice(b"MThd");
    out.extend_from_slice(&HEADER_CHUNK_LENGTH.to_be_bytes());
    out.extend_from_slice(&SMF_FORMAT.to_be_bytes());
    out.extend_from_slice(&(tracks.len() as u16).to_be_bytes());
    out.extend_from_slice(&division.to_be_bytes());

    for (number, events) in tracks {
        let mut writer = TrackWriter::new(number, options);
        for e in events {
            writer.write_event(e)?;
        }
        let data = writer.finish();

        debug!(track = number, bytes = data.len(), "wrote track chunk");

        out.extend_from_slice(b"MTrk");
        out.extend_from_slice(&(data.len() as u32).to_be_bytes());
        out.extend(data);
    }

    Ok(out)
}

/// Serializes the resolved music into a format 1 Standard MIDI File and writes it to `writer`.
pub fn write_smf(
    music: &ResolvedMusic,
    options: &SmfOptions,
    writer: &mut impl Write,
) -> Result<(), SmfError> {
    let data = build_smf(music, options)?;
    writer
        .write_all(&data)
        .map_err(|e| SmfError::IoError(e.to_string()))
}
