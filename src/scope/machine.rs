//! Flow-sensitive scope lifecycle analysis for one procedure.
//!
//! Each handle carries the set of states it may be in at a program point:
//! created, disposed, escaped. Sets are joined by union where control flow
//! merges. Reports about escapes and use after dispose need a *definite*
//! state (the set is exactly one state); the undisposed check needs only a
//! *possible* created state at an exit. Values resolved from a handle are
//! tied to it for the whole procedure.

use std::ops::{BitAnd, BitOr};

use ahash::{AHashMap, AHashSet};
use tracing::trace;

use crate::diagnostics::{Diagnostic, RuleId, SourceLocation};
use crate::error::{AnalysisError, AnalysisResult};
use crate::scope::trace::{Acquisition, EscapeSink, HandleKind, ProcedureTrace, ScopeEvent};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct States(u8);

impl States {
    const NONE: States = States(0);
    const CREATED: States = States(1);
    const DISPOSED: States = States(2);
    const ESCAPED: States = States(4);

    fn may_be(self, other: States) -> bool {
        self.0 & other.0 != 0
    }

    fn is_exactly(self, other: States) -> bool {
        self == other
    }
}

impl BitOr for States {
    type Output = States;

    fn bitor(self, rhs: States) -> States {
        States(self.0 | rhs.0)
    }
}

impl BitAnd for States {
    type Output = States;

    fn bitand(self, rhs: States) -> States {
        States(self.0 & rhs.0)
    }
}

/// Static facts about one handle, taken from its first `Create` event.
#[derive(Debug, Clone)]
struct Handle {
    name: String,
    kind: HandleKind,
    is_async: bool,
    acquisition: Acquisition,
    created_at: SourceLocation,
}

/// Analyzes one procedure trace.
///
/// Fails only when the trace itself is inconsistent: an event refers to a
/// handle the procedure never creates, or a block names a successor that
/// does not exist.
///
/// # Examples
///
/// ```rust
/// use ferrous_di_analyzer::{ProcedureTrace, RuleId, ScopeEvent, SourceLocation};
/// use ferrous_di_analyzer::scope::{analyze_procedure, EscapeSink};
///
/// let at = |line| SourceLocation::new("OrderService.cs", line, 9);
/// let trace = ProcedureTrace::linear("OrderService.Load", false, vec![
///     ScopeEvent::Create {
///         handle: "scope".into(),
///         kind: Default::default(),
///         is_async: false,
///         acquisition: Default::default(),
///         location: at(10),
///     },
///     ScopeEvent::Resolve { handle: "scope".into(), result: "repo".into(), location: at(11) },
///     ScopeEvent::Escape { value: "repo".into(), sink: EscapeSink::Return, location: at(12) },
/// ]);
///
/// let found = analyze_procedure(&trace).unwrap();
/// let rules: Vec<_> = found.iter().map(|d| d.rule).collect();
/// assert_eq!(rules, vec![RuleId::ScopeEscape, RuleId::UndisposedScope]);
/// ```
pub fn analyze_procedure(trace: &ProcedureTrace) -> AnalysisResult<Vec<Diagnostic>> {
    let machine = Machine::prepare(trace)?;
    Ok(machine.run())
}

struct Machine<'t> {
    trace: &'t ProcedureTrace,
    handles: Vec<Handle>,
    by_name: AHashMap<&'t str, usize>,
    /// Resolved value -> handle it came from
    derived: AHashMap<&'t str, usize>,
    /// Reachable blocks in reverse post-order
    order: Vec<usize>,
    predecessors: Vec<Vec<usize>>,
}

impl<'t> Machine<'t> {
    fn prepare(trace: &'t ProcedureTrace) -> AnalysisResult<Self> {
        let block_count = trace.blocks.len();
        for (ix, block) in trace.blocks.iter().enumerate() {
            if let Some(&bad) = block.successors.iter().find(|&&s| s >= block_count) {
                return Err(AnalysisError::MalformedTrace {
                    procedure: trace.name.clone(),
                    reason: format!("block {} names successor {} of {}", ix, bad, block_count),
                });
            }
        }

        let mut handles = Vec::new();
        let mut by_name: AHashMap<&str, usize> = AHashMap::new();
        for event in trace.blocks.iter().flat_map(|b| &b.events) {
            if let ScopeEvent::Create { handle, kind, is_async, acquisition, location } = event {
                by_name.entry(handle.as_str()).or_insert_with(|| {
                    handles.push(Handle {
                        name: handle.clone(),
                        kind: *kind,
                        is_async: *is_async,
                        acquisition: *acquisition,
                        created_at: location.clone(),
                    });
                    handles.len() - 1
                });
            }
        }

        let mut derived = AHashMap::new();
        for event in trace.blocks.iter().flat_map(|b| &b.events) {
            let handle = match event {
                ScopeEvent::Dispose { handle, .. } => handle,
                ScopeEvent::Resolve { handle, result, .. } => {
                    if let Some(&h) = by_name.get(handle.as_str()) {
                        derived.insert(result.as_str(), h);
                    }
                    handle
                }
                _ => continue,
            };
            if !by_name.contains_key(handle.as_str()) {
                return Err(AnalysisError::DanglingHandle {
                    procedure: trace.name.clone(),
                    handle: handle.clone(),
                });
            }
        }

        let order = reverse_post_order(trace);
        let mut predecessors = vec![Vec::new(); block_count];
        for &ix in &order {
            for &succ in &trace.blocks[ix].successors {
                predecessors[succ].push(ix);
            }
        }

        Ok(Self { trace, handles, by_name, derived, order, predecessors })
    }

    fn run(&self) -> Vec<Diagnostic> {
        let block_count = self.trace.blocks.len();
        let mut outs: Vec<Option<Vec<States>>> = vec![None; block_count];

        let mut rounds = 0usize;
        loop {
            rounds += 1;
            let mut changed = false;
            for &ix in &self.order {
                let mut state = self.entry_state(ix, &outs);
                self.transfer(ix, &mut state, &mut |_: Diagnostic| {});
                if outs[ix].as_ref() != Some(&state) {
                    outs[ix] = Some(state);
                    changed = true;
                }
            }
            if !changed {
                break;
            }
        }
        trace!(
            procedure = %self.trace.name,
            events = self.trace.event_count(),
            rounds,
            "scope dataflow converged"
        );

        let mut diagnostics = Vec::new();
        let mut reported_undisposed = AHashSet::new();
        for &ix in &self.order {
            let mut state = self.entry_state(ix, &outs);
            self.transfer(ix, &mut state, &mut |d| diagnostics.push(d));

            if self.trace.blocks[ix].is_exit() {
                for (h, handle) in self.handles.iter().enumerate() {
                    if handle.acquisition.is_guarded() || !state[h].may_be(States::CREATED) {
                        continue;
                    }
                    if reported_undisposed.insert(h) {
                        diagnostics.push(self.undisposed(handle));
                    }
                }
            }
        }
        diagnostics
    }

    fn entry_state(&self, ix: usize, outs: &[Option<Vec<States>>]) -> Vec<States> {
        let mut state = vec![States::NONE; self.handles.len()];
        for &pred in &self.predecessors[ix] {
            if let Some(out) = &outs[pred] {
                for (slot, incoming) in state.iter_mut().zip(out) {
                    *slot = *slot | *incoming;
                }
            }
        }
        state
    }

    /// Handle a value belongs to: the handle itself or the handle it was resolved from.
    fn owner(&self, value: &str) -> Option<usize> {
        self.by_name.get(value).or_else(|| self.derived.get(value)).copied()
    }

    fn transfer(&self, ix: usize, state: &mut [States], emit: &mut dyn FnMut(Diagnostic)) {
        for event in &self.trace.blocks[ix].events {
            match event {
                ScopeEvent::Create { handle, .. } => {
                    if let Some(&h) = self.by_name.get(handle.as_str()) {
                        state[h] = States::CREATED;
                    }
                }
                ScopeEvent::Dispose { handle, .. } => {
                    if let Some(&h) = self.by_name.get(handle.as_str()) {
                        state[h] = (state[h] & States::ESCAPED) | States::DISPOSED;
                    }
                }
                ScopeEvent::Resolve { handle, result, location } => {
                    let Some(&h) = self.by_name.get(handle.as_str()) else { continue };
                    if self.is_disposed_scope(h, state) {
                        emit(self.use_after_dispose(h, result, location));
                    }
                }
                ScopeEvent::Escape { value, sink, location } => {
                    if let Some(&h) = self.by_name.get(value.as_str()) {
                        // Ownership moves to the caller.
                        state[h] = States::ESCAPED;
                        continue;
                    }
                    let Some(&h) = self.derived.get(value.as_str()) else { continue };
                    let live = state[h].is_exactly(States::CREATED);
                    if self.handles[h].kind == HandleKind::Scope && live {
                        emit(self.escape(h, value, *sink, location));
                    }
                }
                ScopeEvent::Use { value, location } => {
                    let Some(h) = self.owner(value) else { continue };
                    if self.is_disposed_scope(h, state) {
                        emit(self.use_after_dispose(h, value, location));
                    }
                }
            }
        }
    }

    fn is_disposed_scope(&self, h: usize, state: &[States]) -> bool {
        self.handles[h].kind == HandleKind::Scope && state[h].is_exactly(States::DISPOSED)
    }

    fn escape(
        &self,
        h: usize,
        value: &str,
        sink: EscapeSink,
        location: &SourceLocation,
    ) -> Diagnostic {
        let handle = &self.handles[h];
        let needs_async_scope =
            self.trace.is_async && !handle.is_async && handle.acquisition == Acquisition::Using;

        let diagnostic = if needs_async_scope {
            Diagnostic::new(
                RuleId::AsyncScopeRequired,
                format!(
                    "'{}' from scope '{}' outlives a synchronous using in async method {}; \
                     use CreateAsyncScope with await using",
                    value, handle.name, self.trace.name
                ),
                location.clone(),
            )
        } else {
            Diagnostic::new(
                RuleId::ScopeEscape,
                format!(
                    "'{}' resolved from scope '{}' is {} before the scope is disposed",
                    value,
                    handle.name,
                    sink.describe()
                ),
                location.clone(),
            )
        };
        diagnostic.with_related(handle.created_at.clone())
    }

    fn use_after_dispose(&self, h: usize, value: &str, location: &SourceLocation) -> Diagnostic {
        let handle = &self.handles[h];
        Diagnostic::new(
            RuleId::UseAfterDispose,
            format!("'{}' is used after scope '{}' was disposed", value, handle.name),
            location.clone(),
        )
        .with_related(handle.created_at.clone())
    }

    fn undisposed(&self, handle: &Handle) -> Diagnostic {
        match handle.kind {
            HandleKind::Scope => Diagnostic::new(
                RuleId::UndisposedScope,
                format!(
                    "Scope '{}' created in {} is not disposed on every path",
                    handle.name, self.trace.name
                ),
                handle.created_at.clone(),
            ),
            HandleKind::RootProvider => Diagnostic::new(
                RuleId::RootProviderNotDisposed,
                format!(
                    "Service provider '{}' built in {} is not disposed on every path",
                    handle.name, self.trace.name
                ),
                handle.created_at.clone(),
            ),
        }
    }
}

/// Blocks reachable from the entry, in reverse post-order.
fn reverse_post_order(trace: &ProcedureTrace) -> Vec<usize> {
    let count = trace.blocks.len();
    if count == 0 {
        return Vec::new();
    }

    let mut visited = vec![false; count];
    let mut post = Vec::with_capacity(count);
    // (block, next successor to visit)
    let mut stack = vec![(0usize, 0usize)];
    visited[0] = true;

    while let Some(top) = stack.last_mut() {
        let (block, next) = *top;
        match trace.blocks[block].successors.get(next) {
            Some(&succ) => {
                top.1 += 1;
                if !visited[succ] {
                    visited[succ] = true;
                    stack.push((succ, 0));
                }
            }
            None => {
                post.push(block);
                stack.pop();
            }
        }
    }

    post.reverse();
    post
}
