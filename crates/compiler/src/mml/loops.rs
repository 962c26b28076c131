//! Loop break tracking and unrolling

// SPDX-FileCopyrightText: © 2023 Marcus Rowe <undisbeliever@gmail.com>
//
// SPDX-License-Identifier: MIT

use super::semantic_tree::VariableId;
use super::value::Value;

use crate::errors::ResolveError;

use std::collections::{BTreeMap, HashMap};
use std::ops::Range;

pub const DEFAULT_LOOP_COUNT: i64 = 2;

/// Break label used by a break without arguments.
/// It applies to every iteration without an explicit break.
pub const DEFAULT_BREAK: i64 = -1;

/// An open loop inside an operation list.
///
/// The first pass over a loop body only records the break positions, the events it emits
/// are discarded. The body is then interpreted again, once per iteration, using the
/// ranges returned by `Loop::unroll()`.
#[derive(Debug)]
pub struct Loop {
    /// Index of the loop begin operation
    begin: usize,
    pub begin_tick: i64,

    first_break: Option<usize>,
    /// Iteration (0 based) to the index of the break operation
    breaks: BTreeMap<i64, usize>,
    /// Iteration to the index of the operation that ends the break section
    end_locations: HashMap<i64, usize>,
    current_breaks: Vec<i64>,

    pub saved_values: HashMap<VariableId, Value>,
    pub saved_chord: (Vec<usize>, bool),

    /// Events emitted by the first pass
    pub events: Vec<usize>,
}

impl Loop {
    pub fn new(
        begin: usize,
        begin_tick: i64,
        saved_values: HashMap<VariableId, Value>,
        saved_chord: (Vec<usize>, bool),
    ) -> Self {
        Self {
            begin,
            begin_tick,
            first_break: None,
            breaks: BTreeMap::new(),
            end_locations: HashMap::new(),
            current_breaks: Vec::new(),
            saved_values,
            saved_chord,
            events: Vec::new(),
        }
    }

    pub fn begin(&self) -> usize {
        self.begin
    }

    fn close_current_breaks(&mut self, index: usize) {
        for b in self.current_breaks.drain(..) {
            self.end_locations.insert(b, index);
        }
    }

    /// Records a loop break at operation `index`.
    ///
    /// `labels` are the 1-based iterations the break applies to.
    /// An empty `labels` is the default break.
    pub fn add_break(&mut self, index: usize, labels: &[i64]) -> Result<(), ResolveError> {
        if self.first_break.is_none() {
            self.first_break = Some(index);
        }
        self.close_current_breaks(index);

        if labels.is_empty() {
            if self.breaks.contains_key(&DEFAULT_BREAK) {
                return Err(ResolveError::DuplicateDefaultBreak);
            }
            self.breaks.insert(DEFAULT_BREAK, index);
            self.current_breaks.push(DEFAULT_BREAK);
            return Ok(());
        }

        for &label in labels {
            if label < 1 {
                return Err(ResolveError::InvalidBreakLabel(label));
            }
            let iteration = label - 1;
            if self.breaks.contains_key(&iteration) {
                return Err(ResolveError::DuplicateBreak(label));
            }
            self.breaks.insert(iteration, index);
            self.current_breaks.push(iteration);
        }
        Ok(())
    }

    /// Returns the operation ranges to interpret, in order, to unroll the loop.
    ///
    /// `end` is the index of the loop end operation.
    pub fn unroll(&mut self, end: usize, count: i64) -> Result<Vec<Range<usize>>, ResolveError> {
        self.close_current_breaks(end);
        let count = count.max(0);

        if let Some((&iteration, _)) = self.breaks.iter().find(|&(&i, _)| i >= count) {
            return Err(ResolveError::BreakBeyondLoopCount {
                label: iteration + 1,
                count,
            });
        }

        let body_start = self.begin + 1;

        let first_break = match self.first_break {
            None => return Ok((0..count).map(|_| body_start..end).collect()),
            Some(b) => b,
        };

        let mut out = Vec::new();
        for iteration in 0..count {
            out.push(body_start..first_break);

            let (label, break_index) = match self.breaks.get(&iteration) {
                Some(&b) => (iteration, b),
                // The last iteration stops at the first break
                None if iteration + 1 == count => break,
                None => match self.breaks.get(&DEFAULT_BREAK) {
                    Some(&b) => (DEFAULT_BREAK, b),
                    None => return Err(ResolveError::NoBreakForIteration(iteration + 1)),
                },
            };
            let section_end = self.end_locations.get(&label).copied().unwrap_or(end);

            out.push(break_index + 1..section_end);
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_loop(begin: usize) -> Loop {
        Loop::new(begin, 0, HashMap::new(), (Vec::new(), false))
    }

    #[test]
    fn without_breaks() {
        // 0:[ 1:c 2:]
        let mut l = new_loop(0);
        assert_eq!(l.unroll(2, 3), Ok(vec![1..2, 1..2, 1..2]));
    }

    #[test]
    fn default_break() {
        // 0:[ 1:c 2:: 3:d 4:]
        let mut l = new_loop(0);
        l.add_break(2, &[]).unwrap();
        assert_eq!(l.unroll(4, 3), Ok(vec![1..2, 3..4, 1..2, 3..4, 1..2]));
    }

    #[test]
    fn labelled_breaks() {
        // 0:[ 1:c 2::1 3:d 4::2 5:e 6:]
        let mut l = new_loop(0);
        l.add_break(2, &[1]).unwrap();
        l.add_break(4, &[2]).unwrap();
        assert_eq!(l.unroll(6, 2), Ok(vec![1..2, 3..4, 1..2, 5..6]));
    }

    #[test]
    fn labelled_and_default_breaks() {
        // 0:[ 1:c 2::1,3 3:d 4:: 5:e 6:]
        let mut l = new_loop(0);
        l.add_break(2, &[1, 3]).unwrap();
        l.add_break(4, &[]).unwrap();
        assert_eq!(
            l.unroll(6, 4),
            Ok(vec![1..2, 3..4, 1..2, 5..6, 1..2, 3..4, 1..2])
        );
    }

    #[test]
    fn break_errors() {
        let mut l = new_loop(0);
        l.add_break(2, &[]).unwrap();
        assert_eq!(l.add_break(3, &[]), Err(ResolveError::DuplicateDefaultBreak));

        let mut l = new_loop(0);
        l.add_break(2, &[1]).unwrap();
        assert_eq!(l.add_break(3, &[1]), Err(ResolveError::DuplicateBreak(1)));
        assert_eq!(l.add_break(4, &[0]), Err(ResolveError::InvalidBreakLabel(0)));

        // [ c :1 d :2 e :3 f ]2
        let mut l = new_loop(0);
        l.add_break(2, &[1]).unwrap();
        l.add_break(4, &[2]).unwrap();
        l.add_break(6, &[3]).unwrap();
        assert_eq!(
            l.unroll(8, 2),
            Err(ResolveError::BreakBeyondLoopCount { label: 3, count: 2 })
        );

        // [ c :1 d :3 e ]4
        let mut l = new_loop(0);
        l.add_break(2, &[1]).unwrap();
        l.add_break(4, &[3]).unwrap();
        assert_eq!(l.unroll(6, 4), Err(ResolveError::NoBreakForIteration(2)));
    }
}
