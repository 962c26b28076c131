//! Track numbers

// SPDX-FileCopyrightText: © 2023 Marcus Rowe <undisbeliever@gmail.com>
//
// SPDX-License-Identifier: MIT

use serde::Serialize;

use std::cmp::Ordering;
use std::fmt::Display;

/// A track number.
///
/// Fractional track numbers (ie, `1.1`) are sub-tracks that are merged into the output
/// track of their integer part.
#[derive(Debug, Clone, Copy, Serialize)]
#[serde(transparent)]
pub struct TrackNumber(f64);

impl TrackNumber {
    pub const ZERO: Self = Self(0.0);

    pub fn new(n: f64) -> Self {
        Self(n)
    }

    pub fn value(self) -> f64 {
        self.0
    }

    pub fn is_integer(self) -> bool {
        self.0.fract() == 0.0
    }

    /// The SMF track this track is written to
    pub fn output_track(self) -> i64 {
        self.0.trunc() as i64
    }
}

impl PartialEq for TrackNumber {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for TrackNumber {}

impl PartialOrd for TrackNumber {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for TrackNumber {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.total_cmp(&other.0)
    }
}

impl Display for TrackNumber {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// An inclusive range of track numbers (`1`, `2-4`)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrackRange {
    pub first: TrackNumber,
    pub last: TrackNumber,
}

impl TrackRange {
    pub fn contains(&self, track: TrackNumber) -> bool {
        let int = TrackNumber(track.0.trunc());
        (self.first <= track && track <= self.last) || (self.first <= int && int <= self.last)
    }

    pub(crate) fn expand(&self) -> impl Iterator<Item = TrackNumber> + '_ {
        let single = (self.first == self.last).then_some(self.first);
        let range = match self.first == self.last {
            true => 0..0,
            false => (self.first.0 as i64)..(self.last.0 as i64 + 1),
        };
        single
            .into_iter()
            .chain(range.map(|i| TrackNumber(i as f64)))
    }
}
