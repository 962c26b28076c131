//! MML resolver
//!
//! Interprets the operations of every track, expanding macros and loops, and emits the
//! MIDI events at their absolute tick positions.

// SPDX-FileCopyrightText: © 2023 Marcus Rowe <undisbeliever@gmail.com>
//
// SPDX-License-Identifier: MIT

use super::expression::{ComparisonOperator, DataType, Expression, OperationUse, VariableScope};
use super::loops::{Loop, DEFAULT_LOOP_COUNT};
use super::primitives::{Primitive, Signature};
use super::semantic_tree::{Macro, SemanticTree, Track, VariableId, TIMELINE_POSITION};
use super::track_number::TrackNumber;
use super::value::{number_to_byte, Length, Value};

use crate::diagnostics::{Diagnostic, DiagnosticSink};
use crate::errors::{ErrorWithLocation, ResolveError};

use serde::Serialize;

use std::borrow::Cow;
use std::cmp::Ordering;
use std::collections::HashMap;
use std::ops::Range;
use std::rc::Rc;

use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EventKind {
    Midi,
    Meta,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedEvent {
    pub tick: i64,
    pub kind: EventKind,
    /// Status byte and data bytes (`0xFF`, type and data for meta events)
    pub data: Vec<u8>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ResolvedTrack {
    pub number: TrackNumber,
    /// Sorted by tick
    pub events: Vec<ResolvedEvent>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ResolvedMusic {
    pub base_count: u32,
    pub tracks: Vec<ResolvedTrack>,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ResolveOptions {
    /// Report resolve errors to the diagnostic sink and skip the operation
    pub continue_on_error: bool,
}

type ResolveResult<T> = Result<T, ErrorWithLocation<ResolveError>>;

fn err<T>(e: ResolveError) -> ResolveResult<T> {
    Err(ErrorWithLocation(None, e))
}

#[derive(Debug, Clone, Default)]
struct Context {
    values: HashMap<VariableId, Value>,
    /// Macro argument frames, the last frame belongs to the macro being expanded
    arguments: Vec<HashMap<String, Value>>,
    timeline: i64,
    is_global: bool,
}

impl Context {
    fn global() -> Self {
        Self {
            is_global: true,
            ..Self::default()
        }
    }
}

struct StoredOperations {
    values: HashMap<VariableId, Value>,
    arguments: Option<HashMap<String, Value>>,
    operations: Rc<[OperationUse]>,
}

fn current_output<'o>(loops: &'o mut [Loop], output: &'o mut Vec<usize>) -> &'o mut Vec<usize> {
    match loops.last_mut() {
        Some(l) => &mut l.events,
        None => output,
    }
}

struct Resolver<'a> {
    tree: &'a SemanticTree,
    options: ResolveOptions,
    sink: &'a mut dyn DiagnosticSink,
    timeline_id: Option<VariableId>,

    macros: HashMap<&'a str, &'a Macro>,
    global: Context,
    defaults_in_progress: Vec<VariableId>,

    /// Every event emitted by the current track, the operation lists hold indexes into it
    events: Vec<ResolvedEvent>,
    chord: Vec<usize>,
    record_chord: bool,

    expansion_stack: Vec<&'a str>,
    open_loops: usize,
    /// Non-zero while recording loop breaks (the events and messages are discarded)
    dry_run: usize,

    stored: HashMap<i64, StoredOperations>,
    restore_stack: Vec<i64>,
}

impl<'a> Resolver<'a> {
    fn new(
        tree: &'a SemanticTree,
        options: ResolveOptions,
        sink: &'a mut dyn DiagnosticSink,
    ) -> Self {
        Self {
            tree,
            options,
            sink,
            timeline_id: tree.find_variable(TIMELINE_POSITION),
            macros: HashMap::new(),
            global: Context::global(),
            defaults_in_progress: Vec::new(),
            events: Vec::new(),
            chord: Vec::new(),
            record_chord: false,
            expansion_stack: Vec::new(),
            open_loops: 0,
            dry_run: 0,
            stored: HashMap::new(),
            restore_stack: Vec::new(),
        }
    }

    fn base_count(&self) -> u32 {
        self.tree.base_count
    }

    fn report(&mut self, d: Diagnostic) {
        if self.dry_run == 0 {
            self.sink.report(d);
        }
    }

    fn resolve_track(&mut self, track: &'a Track) -> ResolveResult<ResolvedTrack> {
        debug!(track = %track.number, "resolving track");

        self.macros = self.tree.macros_for_track(track.number);
        self.events.clear();
        self.chord.clear();
        self.record_chord = false;

        let mut ctx = Context::default();
        let mut output = Vec::new();
        self.interpret_list(&mut ctx, &track.body, None, &mut output)?;

        let mut events: Vec<ResolvedEvent> =
            output.iter().map(|&i| self.events[i].clone()).collect();
        events.sort_by_key(|e| e.tick);

        Ok(ResolvedTrack {
            number: track.number,
            events,
        })
    }

    // Variables
    // =========

    fn variable_value(
        &mut self,
        ctx: &mut Context,
        name: &str,
        scope: VariableScope,
    ) -> ResolveResult<Value> {
        if scope == VariableScope::Local {
            if let Some(v) = ctx.arguments.last().and_then(|frame| frame.get(name)) {
                return Ok(v.clone());
            }
        }

        let id = match self.tree.find_variable(name) {
            Some(id) => id,
            None => return err(ResolveError::UnknownVariable(name.to_owned())),
        };
        if Some(id) == self.timeline_id {
            return Ok(Value::Number(ctx.timeline as f64));
        }

        match scope {
            VariableScope::Global if !ctx.is_global => self.global_value(id),
            _ => self.context_value(ctx, id),
        }
    }

    fn context_value(&mut self, ctx: &mut Context, id: VariableId) -> ResolveResult<Value> {
        if let Some(v) = ctx.values.get(&id) {
            return Ok(v.clone());
        }

        let v = if ctx.is_global || self.tree.variable(id).data_type == DataType::Buffer {
            self.default_value(ctx, id)?
        } else {
            self.global_value(id)?
        };
        ctx.values.insert(id, v.clone());
        Ok(v)
    }

    fn global_value(&mut self, id: VariableId) -> ResolveResult<Value> {
        let mut global = std::mem::take(&mut self.global);
        let r = self.context_value(&mut global, id);
        self.global = global;
        r
    }

    fn default_value(&mut self, ctx: &mut Context, id: VariableId) -> ResolveResult<Value> {
        let variable = self.tree.variable(id);

        if self.defaults_in_progress.contains(&id) {
            return err(ResolveError::CircularVariableDefault(variable.name.clone()));
        }

        self.defaults_in_progress.push(id);
        let r = match &variable.default_value {
            Some(e) => self.resolve(ctx, e, variable.data_type),
            None => Ok(Value::zero(variable.data_type)),
        };
        self.defaults_in_progress.pop();

        r.map_err(|e| e.or_location(&variable.location))
    }

    // Expressions
    // ===========

    fn resolve(
        &mut self,
        ctx: &mut Context,
        expr: &Expression,
        expected: DataType,
    ) -> ResolveResult<Value> {
        let base_count = self.base_count();

        let v = match expr {
            Expression::Constant(v) => v.clone(),
            Expression::VariableRef {
                name,
                scope,
                location,
            } => self
                .variable_value(ctx, name, *scope)
                .map_err(|e| e.or_location(location))?,
            Expression::Parenthesized(e) => self.resolve(ctx, e, expected)?,

            Expression::Add(l, r) => {
                let (a, b) = self.resolve_operands(ctx, l, r, expected)?;
                add(a, b, base_count)?
            }
            Expression::Subtract(l, r) => {
                let (a, b) = self.resolve_operands(ctx, l, r, expected)?;
                subtract(a, b, base_count)?
            }
            Expression::Multiply(l, r) => {
                let a = self.resolve(ctx, l, DataType::Number)?;
                let a = a.to_number(base_count)?;
                let b = self.resolve(ctx, r, expected)?;
                multiply(a, b, base_count)?
            }
            Expression::Divide(l, r) => {
                let a = self.resolve(ctx, l, expected)?;
                let b = self.resolve(ctx, r, DataType::Number)?;
                divide(a, b.to_number(base_count)?, false, base_count)?
            }
            Expression::Modulo(l, r) => {
                let a = self.resolve(ctx, l, expected)?;
                let b = self.resolve(ctx, r, DataType::Number)?;
                divide(a, b.to_number(base_count)?, true, base_count)?
            }

            Expression::Comparison {
                left,
                right,
                operator,
            } => {
                let a = self.resolve(ctx, left, DataType::Any)?;
                let b = self.resolve(ctx, right, a.data_type())?;
                let o = compare(&a, &b, base_count)?;
                let r = match operator {
                    ComparisonOperator::Lesser => o == Ordering::Less,
                    ComparisonOperator::LesserEqual => o != Ordering::Greater,
                    ComparisonOperator::Greater => o == Ordering::Greater,
                    ComparisonOperator::GreaterEqual => o != Ordering::Less,
                };
                Value::Number(if r { 1.0 } else { 0.0 })
            }
            Expression::Conditional {
                condition,
                true_expr,
                false_expr,
            } => {
                let c = self.resolve(ctx, condition, DataType::Number)?;
                return match c.to_number(base_count)? != 0.0 {
                    true => self.resolve(ctx, true_expr, expected),
                    false => self.resolve(ctx, false_expr, expected),
                };
            }
        };

        Ok(v.coerce(expected, base_count)?)
    }

    // The right operand has the same type as the left operand if `expected` is `Any`
    fn resolve_operands(
        &mut self,
        ctx: &mut Context,
        l: &Expression,
        r: &Expression,
        expected: DataType,
    ) -> ResolveResult<(Value, Value)> {
        let a = self.resolve(ctx, l, expected)?;
        let b_type = match expected {
            DataType::Any => a.data_type(),
            t => t,
        };
        let b = self.resolve(ctx, r, b_type)?;
        Ok((a, b))
    }

    // Arguments
    // =========

    fn resolve_argument(
        &mut self,
        ctx: &mut Context,
        op: &OperationUse,
        index: usize,
        data_type: DataType,
    ) -> ResolveResult<Value> {
        match op.arguments.get(index) {
            Some(Some(e)) => self.resolve(ctx, e, data_type),
            _ => err(ResolveError::MissingArgument {
                operation: op.name.clone(),
                index,
            }),
        }
    }

    fn number_argument(
        &mut self,
        ctx: &mut Context,
        op: &OperationUse,
        index: usize,
    ) -> ResolveResult<f64> {
        let v = self.resolve_argument(ctx, op, index, DataType::Number)?;
        Ok(v.to_number(self.base_count())?)
    }

    fn string_argument(
        &mut self,
        ctx: &mut Context,
        op: &OperationUse,
        index: usize,
    ) -> ResolveResult<String> {
        match self.resolve_argument(ctx, op, index, DataType::String)? {
            Value::String(s) | Value::Buffer(s) => Ok(s),
            v => err(ResolveError::TypeMismatch {
                expected: DataType::String,
                found: v.data_type(),
            }),
        }
    }

    /// Resolves every argument from `first` onwards using the primitive's signature
    fn remaining_arguments(
        &mut self,
        ctx: &mut Context,
        op: &OperationUse,
        signature: &Signature,
        first: usize,
    ) -> ResolveResult<Vec<Value>> {
        (first..op.arguments.len())
            .map(|i| self.resolve_argument(ctx, op, i, signature.argument_type(i)))
            .collect()
    }

    fn target_variable(
        &mut self,
        ctx: &mut Context,
        op: &OperationUse,
    ) -> ResolveResult<(VariableId, String)> {
        let name = self.string_argument(ctx, op, 0)?;
        match self.tree.find_variable(&name) {
            Some(id) => Ok((id, name)),
            None => err(ResolveError::UnknownVariable(name)),
        }
    }

    fn append_to_buffer(
        &mut self,
        ctx: &mut Context,
        id: VariableId,
        name: String,
        text: &str,
    ) -> ResolveResult<()> {
        if self.tree.variable(id).data_type != DataType::Buffer {
            return err(ResolveError::NotABuffer(name));
        }
        self.context_value(ctx, id)?;

        match ctx.values.get_mut(&id) {
            Some(Value::Buffer(b)) => {
                b.push_str(text);
                Ok(())
            }
            _ => err(ResolveError::NotABuffer(name)),
        }
    }

    // Operations
    // ==========

    fn interpret_list(
        &mut self,
        ctx: &mut Context,
        ops: &[OperationUse],
        tail: Option<&[Option<Expression>]>,
        output: &mut Vec<usize>,
    ) -> ResolveResult<()> {
        self.interpret_range(ctx, ops, 0..ops.len(), tail, output)
    }

    /// Interprets `ops[range]`.
    ///
    /// `tail` is appended to the arguments of the last operation in `ops`.
    fn interpret_range(
        &mut self,
        ctx: &mut Context,
        ops: &[OperationUse],
        range: Range<usize>,
        tail: Option<&[Option<Expression>]>,
        output: &mut Vec<usize>,
    ) -> ResolveResult<()> {
        let mut loops: Vec<Loop> = Vec::new();
        let mut index = range.start;

        while index < range.end {
            let op: Cow<OperationUse> = match tail {
                Some(tail) if index + 1 == ops.len() && !tail.is_empty() => {
                    let mut op = ops[index].clone();
                    op.arguments.extend(tail.iter().cloned());
                    Cow::Owned(op)
                }
                _ => Cow::Borrowed(&ops[index]),
            };

            match self.interpret_operation(ctx, ops, index, &op, &mut loops, output) {
                Ok(next) => index = next,
                Err(e) => {
                    let e = e.or_location(&op.location);
                    if !self.options.continue_on_error {
                        self.abandon_loops(&loops);
                        return Err(e);
                    }
                    self.report(e.to_diagnostic());
                    index += 1;
                }
            }
        }

        if let Some(l) = loops.first() {
            let e = ErrorWithLocation::new(&ops[l.begin()].location, ResolveError::UnclosedLoop);
            self.abandon_loops(&loops);
            if !self.options.continue_on_error {
                return Err(e);
            }
            self.report(e.to_diagnostic());
        }

        Ok(())
    }

    fn abandon_loops(&mut self, loops: &[Loop]) {
        self.open_loops -= loops.len();
        self.dry_run -= loops.len();
    }

    fn loop_error(&self, in_loop: ResolveError) -> ResolveError {
        match self.open_loops {
            0 => in_loop,
            _ => ResolveError::LoopCrossesOperationList,
        }
    }

    /// Returns the index of the next operation
    fn interpret_operation(
        &mut self,
        ctx: &mut Context,
        ops: &[OperationUse],
        index: usize,
        op: &OperationUse,
        loops: &mut Vec<Loop>,
        output: &mut Vec<usize>,
    ) -> ResolveResult<usize> {
        let primitive = match Primitive::from_name(&op.name) {
            Some(p) => p,
            None => {
                self.call_macro(ctx, &op.name, &op.arguments, current_output(loops, output))?;
                return Ok(index + 1);
            }
        };

        let signature = primitive.signature();
        check_arguments(op, &signature)?;

        match primitive {
            Primitive::Print => {
                let v = self.resolve_argument(ctx, op, 0, DataType::Any)?;
                self.report(Diagnostic::information(&op.location, v.to_string()));
            }
            Primitive::Let => {
                let (id, _) = self.target_variable(ctx, op)?;
                let data_type = self.tree.variable(id).data_type;
                let value = self.resolve_argument(ctx, op, 1, data_type)?;

                if Some(id) == self.timeline_id {
                    ctx.timeline = value.to_number(self.base_count())? as i64;
                } else {
                    ctx.values.insert(id, value);
                }
            }
            Primitive::Store => {
                let (id, name) = self.target_variable(ctx, op)?;
                let text: String = self
                    .remaining_arguments(ctx, op, &signature, 1)?
                    .iter()
                    .map(Value::to_string)
                    .collect();
                self.append_to_buffer(ctx, id, name, &text)?;
            }
            Primitive::Format | Primitive::StoreFormat => {
                let (id, name) = self.target_variable(ctx, op)?;
                let format = self.string_argument(ctx, op, 1)?;
                let args = self.remaining_arguments(ctx, op, &signature, 2)?;
                let text = format_string(&format, &args)?;

                if primitive == Primitive::StoreFormat {
                    self.append_to_buffer(ctx, id, name, &text)?;
                } else {
                    match self.tree.variable(id).data_type {
                        DataType::String | DataType::Any => {
                            ctx.values.insert(id, Value::String(text));
                        }
                        _ => return err(ResolveError::NotAString(name)),
                    }
                }
            }
            Primitive::Apply => {
                let name = self.string_argument(ctx, op, 0)?;
                self.call_macro(ctx, &name, &op.arguments[1..], current_output(loops, output))?;
            }
            Primitive::Midi => {
                let data = self
                    .remaining_arguments(ctx, op, &signature, 0)?
                    .iter()
                    .map(|v| v.to_number(self.base_count()).map(number_to_byte))
                    .collect::<Result<Vec<u8>, _>>()?;
                self.emit(ctx, EventKind::Midi, data, current_output(loops, output));
            }
            Primitive::SyncNoteOffWithNext => {
                self.record_chord = true;
            }
            Primitive::OnMidiNoteOff => {
                let tick = self.number_argument(ctx, op, 0)? as i64;
                self.remaining_arguments(ctx, op, &signature, 1)?;

                if tick == 0 {
                    self.record_chord = true;
                } else {
                    let chord = std::mem::take(&mut self.chord);
                    for &i in &chord {
                        self.events[i].tick = self.events[i]
                            .tick
                            .checked_add(tick)
                            .ok_or(ResolveError::TickOverflow)?;
                    }
                }
            }
            Primitive::MidiMeta => {
                let base_count = self.base_count();
                let mut data = vec![0xff];
                for v in self.remaining_arguments(ctx, op, &signature, 0)? {
                    data.extend(v.to_bytes(base_count));
                }
                self.emit(ctx, EventKind::Meta, data, current_output(loops, output));
            }

            Primitive::SaveOperBegin => {
                let id = self.number_argument(ctx, op, 0)? as i64;
                return self.save_operations(ctx, ops, index, id);
            }
            Primitive::SaveOperEnd => {
                return err(ResolveError::SaveOperationsEndWithoutBegin);
            }
            Primitive::RestoreOper => {
                let id = self.number_argument(ctx, op, 0)? as i64;
                self.restore_operations(ctx, id, current_output(loops, output))?;
            }

            Primitive::LoopBegin => {
                loops.push(Loop::new(
                    index,
                    ctx.timeline,
                    ctx.values.clone(),
                    (self.chord.clone(), self.record_chord),
                ));
                self.open_loops += 1;
                self.dry_run += 1;
            }
            Primitive::LoopBreak => {
                let labels = self
                    .remaining_arguments(ctx, op, &signature, 0)?
                    .iter()
                    .map(|v| v.to_number(self.base_count()).map(|n| n as i64))
                    .collect::<Result<Vec<i64>, _>>()?;

                match loops.last_mut() {
                    Some(l) => l.add_break(index, &labels)?,
                    None => return err(self.loop_error(ResolveError::LoopBreakOutsideLoop)),
                }
            }
            Primitive::LoopEnd => {
                let count = match op.arguments.is_empty() {
                    true => DEFAULT_LOOP_COUNT,
                    false => self.number_argument(ctx, op, 0)? as i64,
                };

                let mut l = match loops.pop() {
                    Some(l) => l,
                    None => return err(self.loop_error(ResolveError::LoopEndOutsideLoop)),
                };
                self.open_loops -= 1;
                self.dry_run -= 1;

                ctx.values = std::mem::take(&mut l.saved_values);
                (self.chord, self.record_chord) = std::mem::take(&mut l.saved_chord);
                ctx.timeline = l.begin_tick;

                for r in l.unroll(index, count)? {
                    self.interpret_range(ctx, ops, r, None, current_output(loops, output))?;
                }
            }
        }

        Ok(index + 1)
    }

    fn emit(&mut self, ctx: &Context, kind: EventKind, data: Vec<u8>, output: &mut Vec<usize>) {
        let index = self.events.len();
        self.events.push(ResolvedEvent {
            tick: ctx.timeline,
            kind,
            data,
        });
        output.push(index);

        if kind == EventKind::Midi {
            if self.record_chord {
                self.chord.push(index);
            }
            self.record_chord = false;
        }
    }

    fn call_macro(
        &mut self,
        ctx: &mut Context,
        name: &str,
        arguments: &[Option<Expression>],
        output: &mut Vec<usize>,
    ) -> ResolveResult<()> {
        let m: &'a Macro = match self.macros.get(name) {
            Some(&m) => m,
            None => return err(ResolveError::UnknownMacro(name.to_owned())),
        };
        if self.expansion_stack.contains(&m.name.as_str()) {
            return err(ResolveError::IllegalRecursion(m.name.clone()));
        }

        let mut frame = HashMap::with_capacity(m.arguments.len());
        for (i, formal) in m.arguments.iter().enumerate() {
            let value = match (arguments.get(i).and_then(Option::as_ref), &formal.default_value) {
                (Some(e), _) | (None, Some(e)) => self.resolve(ctx, e, formal.data_type)?,
                (None, None) => Value::zero(formal.data_type),
            };
            if frame.insert(formal.name.clone(), value).is_some() {
                return err(ResolveError::DuplicateArgumentName(formal.name.clone()));
            }
        }

        // Extra arguments are passed to the last operation of the macro
        let extra = arguments.len().saturating_sub(m.arguments.len());
        if extra > 0 {
            let room = tail_capacity(m.body.last());
            if extra > room {
                return err(ResolveError::TooManyArguments {
                    operation: m.name.clone(),
                    max: m.arguments.len() + room,
                    found: arguments.len(),
                });
            }
        }

        let mut tail = Vec::new();
        for a in arguments.iter().skip(m.arguments.len()) {
            let e = match a {
                Some(e) => Some(Expression::Constant(self.resolve(ctx, e, DataType::Any)?)),
                None => None,
            };
            tail.push(e);
        }

        self.expansion_stack.push(&m.name);
        ctx.arguments.push(frame);

        let r = self.interpret_list(ctx, &m.body, Some(&tail), output);

        ctx.arguments.pop();
        self.expansion_stack.pop();

        r
    }

    /// Stores the operations up to the matching `__SAVE_OPER_END` without interpreting them.
    /// Returns the index of the operation after the `__SAVE_OPER_END`.
    fn save_operations(
        &mut self,
        ctx: &Context,
        ops: &[OperationUse],
        index: usize,
        id: i64,
    ) -> ResolveResult<usize> {
        let mut end = None;
        for (i, o) in ops.iter().enumerate().skip(index + 1) {
            match Primitive::from_name(&o.name) {
                Some(Primitive::SaveOperEnd) => {
                    end = Some(i);
                    break;
                }
                Some(Primitive::SaveOperBegin) => {
                    return Err(ErrorWithLocation::new(
                        &o.location,
                        ResolveError::NestedSaveOperations,
                    ))
                }
                _ => (),
            }
        }
        let end = match end {
            Some(e) => e,
            None => return err(ResolveError::UnterminatedSaveOperations),
        };

        self.stored.insert(
            id,
            StoredOperations {
                values: ctx.values.clone(),
                arguments: ctx.arguments.last().cloned(),
                operations: Rc::from(&ops[index + 1..end]),
            },
        );

        Ok(end + 1)
    }

    fn restore_operations(
        &mut self,
        ctx: &mut Context,
        id: i64,
        output: &mut Vec<usize>,
    ) -> ResolveResult<()> {
        if self.restore_stack.contains(&id) {
            return err(ResolveError::RecursiveRestore(id));
        }
        let stored = match self.stored.get(&id) {
            Some(s) => s,
            None => return err(ResolveError::UnknownStoredOperations(id)),
        };

        let operations = Rc::clone(&stored.operations);
        let mut restored = Context {
            values: stored.values.clone(),
            arguments: stored.arguments.iter().cloned().collect(),
            timeline: ctx.timeline,
            is_global: false,
        };

        self.restore_stack.push(id);
        let r = self.interpret_list(&mut restored, &operations, None, output);
        self.restore_stack.pop();
        r?;

        ctx.timeline = restored.timeline;
        Ok(())
    }
}

/// The number of extra arguments a macro call can forward to the last operation of its body.
///
/// Macros and variadic primitives accept any number of them.
fn tail_capacity(last: Option<&OperationUse>) -> usize {
    let last = match last {
        Some(op) => op,
        None => return 0,
    };
    match Primitive::from_name(&last.name).map(Primitive::signature) {
        Some(s) if !s.variadic => s.arguments.len().saturating_sub(last.arguments.len()),
        _ => usize::MAX,
    }
}

fn check_arguments(op: &OperationUse, signature: &Signature) -> Result<(), ResolveError> {
    let found = op.arguments.len();

    if found < signature.min_arguments {
        return Err(ResolveError::InsufficientArguments {
            operation: op.name.clone(),
            expected: signature.min_arguments,
            found,
        });
    }
    if !signature.variadic && found > signature.arguments.len() {
        return Err(ResolveError::TooManyArguments {
            operation: op.name.clone(),
            max: signature.arguments.len(),
            found,
        });
    }
    if let Some(index) = op.arguments.iter().position(Option::is_none) {
        return Err(ResolveError::MissingArgument {
            operation: op.name.clone(),
            index,
        });
    }
    Ok(())
}

// Arithmetic
// ==========

fn add(a: Value, b: Value, base_count: u32) -> Result<Value, ResolveError> {
    match (a, b) {
        (Value::Number(a), Value::Number(b)) => Ok(Value::Number(a + b)),
        (Value::Length(a), Value::Length(b)) => a
            .ticks(base_count)
            .checked_add(b.ticks(base_count))
            .map(|t| Value::Length(Length::from_ticks(t)))
            .ok_or(ResolveError::TickOverflow),
        (Value::String(a) | Value::Buffer(a), Value::String(b) | Value::Buffer(b)) => {
            Ok(Value::String(a + &b))
        }
        (a, b) => Err(ResolveError::TypeMismatch {
            expected: a.data_type(),
            found: b.data_type(),
        }),
    }
}

fn subtract(a: Value, b: Value, base_count: u32) -> Result<Value, ResolveError> {
    match (a, b) {
        (Value::Number(a), Value::Number(b)) => Ok(Value::Number(a - b)),
        (Value::Length(a), Value::Length(b)) => a
            .ticks(base_count)
            .checked_sub(b.ticks(base_count))
            .map(|t| Value::Length(Length::from_ticks(t)))
            .ok_or(ResolveError::TickOverflow),
        (a @ (Value::String(_) | Value::Buffer(_)), _) => {
            Err(ResolveError::InvalidOperand("subtract", a.data_type()))
        }
        (a, b) => Err(ResolveError::TypeMismatch {
            expected: a.data_type(),
            found: b.data_type(),
        }),
    }
}

/// Rounds towards zero and rejects tick counts that do not fit in an `i64`
fn length_from_f64(ticks: f64) -> Result<Value, ResolveError> {
    const LIMIT: f64 = 9_223_372_036_854_775_808.0;

    if ticks.is_nan() {
        return Err(ResolveError::NotANumber);
    }
    let ticks = ticks.trunc();
    if ticks >= LIMIT || ticks < -LIMIT {
        return Err(ResolveError::TickOverflow);
    }
    Ok(Value::Length(Length::from_ticks(ticks as i64)))
}

fn multiply(a: f64, b: Value, base_count: u32) -> Result<Value, ResolveError> {
    match b {
        Value::Number(b) => Ok(Value::Number(a * b)),
        Value::Length(b) => length_from_f64(a * b.ticks(base_count) as f64),
        b => Err(ResolveError::InvalidOperand("multiply", b.data_type())),
    }
}

fn divide(a: Value, b: f64, modulo: bool, base_count: u32) -> Result<Value, ResolveError> {
    if b == 0.0 {
        return Err(ResolveError::DivisionByZero);
    }
    let f = |a: f64| if modulo { a % b } else { a / b };

    match a {
        Value::Number(a) => Ok(Value::Number(f(a))),
        Value::Length(a) => length_from_f64(f(a.ticks(base_count) as f64)),
        a => {
            let op = if modulo { "modulo" } else { "divide" };
            Err(ResolveError::InvalidOperand(op, a.data_type()))
        }
    }
}

fn compare(a: &Value, b: &Value, base_count: u32) -> Result<Ordering, ResolveError> {
    match (a, b) {
        (Value::Number(a), Value::Number(b)) => a.partial_cmp(b).ok_or(ResolveError::NotANumber),
        (Value::Length(a), Value::Length(b)) => Ok(a.ticks(base_count).cmp(&b.ticks(base_count))),
        (Value::String(a) | Value::Buffer(a), Value::String(b) | Value::Buffer(b)) => Ok(a.cmp(b)),
        (a, b) => Err(ResolveError::CannotCompare(a.data_type(), b.data_type())),
    }
}

/// Replaces `{N}` with the Nth argument.  `{{` and `}}` are escaped braces.
fn format_string(format: &str, args: &[Value]) -> Result<String, ResolveError> {
    let invalid = || ResolveError::InvalidFormatString(format.to_owned());

    let mut out = String::with_capacity(format.len());
    let mut chars = format.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '{' if chars.peek() == Some(&'{') => {
                chars.next();
                out.push('{');
            }
            '}' if chars.peek() == Some(&'}') => {
                chars.next();
                out.push('}');
            }
            '{' => {
                let mut digits = String::new();
                loop {
                    match chars.next() {
                        Some('}') => break,
                        Some(d) if d.is_ascii_digit() => digits.push(d),
                        _ => return Err(invalid()),
                    }
                }
                let i: usize = digits.parse().map_err(|_| invalid())?;
                match args.get(i) {
                    Some(v) => out.push_str(&v.to_string()),
                    None => return Err(ResolveError::FormatArgumentOutOfRange(i)),
                }
            }
            '}' => return Err(invalid()),
            c => out.push(c),
        }
    }

    Ok(out)
}

/// Interprets every track of the semantic tree.
///
/// Stored operations (`__SAVE_OPER_BEGIN`) and resolved global variables are shared by
/// every track.
pub fn resolve_music(
    tree: &SemanticTree,
    options: ResolveOptions,
    sink: &mut dyn DiagnosticSink,
) -> Result<ResolvedMusic, ErrorWithLocation<ResolveError>> {
    let mut resolver = Resolver::new(tree, options, sink);

    let tracks = tree
        .tracks()
        .map(|t| resolver.resolve_track(t))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(ResolvedMusic {
        base_count: tree.base_count,
        tracks,
    })
}
