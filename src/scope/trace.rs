//! Per-procedure scope event traces.

use serde::{Deserialize, Serialize};

use crate::diagnostics::SourceLocation;

/// What a handle refers to.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HandleKind {
    /// A scope from `CreateScope`/`CreateAsyncScope`
    #[default]
    Scope,
    /// A provider built explicitly with `BuildServiceProvider`
    RootProvider,
}

/// How the handle was acquired.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Acquisition {
    /// Plain assignment; only explicit `Dispose` events release it
    #[default]
    Manual,
    /// `using` statement or declaration: released on every exit path
    Using,
    /// `await using`: released asynchronously on every exit path
    AwaitUsing,
}

impl Acquisition {
    /// Released by the language on every exit path, including exceptional ones.
    pub fn is_guarded(self) -> bool {
        !matches!(self, Acquisition::Manual)
    }
}

/// Where an escaping value goes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EscapeSink {
    Return,
    FieldStore,
    OuterCapture,
}

impl EscapeSink {
    pub fn describe(self) -> &'static str {
        match self {
            EscapeSink::Return => "returned",
            EscapeSink::FieldStore => "stored in a field",
            EscapeSink::OuterCapture => "captured by an outer closure",
        }
    }
}

/// One scope-relevant event, in program order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ScopeEvent {
    Create {
        handle: String,
        #[serde(default)]
        kind: HandleKind,
        /// Created with `CreateAsyncScope`
        #[serde(default)]
        is_async: bool,
        #[serde(default)]
        acquisition: Acquisition,
        location: SourceLocation,
    },
    /// Explicit `Dispose` call or the end of a `using` construct
    Dispose { handle: String, location: SourceLocation },
    Resolve {
        handle: String,
        result: String,
        location: SourceLocation,
    },
    Escape {
        value: String,
        sink: EscapeSink,
        location: SourceLocation,
    },
    Use { value: String, location: SourceLocation },
}

/// A basic block of the procedure's control-flow graph.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TraceBlock {
    #[serde(default)]
    pub events: Vec<ScopeEvent>,
    /// Indices of successor blocks; a block without successors exits the procedure
    #[serde(default)]
    pub successors: Vec<usize>,
}

impl TraceBlock {
    pub fn new(events: Vec<ScopeEvent>, successors: Vec<usize>) -> Self {
        Self { events, successors }
    }

    pub fn is_exit(&self) -> bool {
        self.successors.is_empty()
    }
}

/// Scope events of one procedure. Block 0 is the entry.
///
/// # Examples
///
/// ```rust
/// use ferrous_di_analyzer::{ProcedureTrace, ScopeEvent, SourceLocation};
///
/// let at = |line| SourceLocation::new("Worker.cs", line, 9);
/// let trace = ProcedureTrace::linear(
///     "Worker.Run",
///     false,
///     vec![
///         ScopeEvent::Create {
///             handle: "scope".into(),
///             kind: Default::default(),
///             is_async: false,
///             acquisition: Default::default(),
///             location: at(10),
///         },
///         ScopeEvent::Dispose { handle: "scope".into(), location: at(14) },
///     ],
/// );
/// assert_eq!(trace.blocks.len(), 1);
/// assert_eq!(trace.event_count(), 2);
/// assert!(trace.blocks[0].is_exit());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcedureTrace {
    pub name: String,
    /// The procedure is `async`
    #[serde(default)]
    pub is_async: bool,
    #[serde(default)]
    pub blocks: Vec<TraceBlock>,
}

impl ProcedureTrace {
    pub fn new(name: impl Into<String>, is_async: bool, blocks: Vec<TraceBlock>) -> Self {
        Self {
            name: name.into(),
            is_async,
            blocks,
        }
    }

    /// Straight-line procedure: one block holding every event.
    pub fn linear(name: impl Into<String>, is_async: bool, events: Vec<ScopeEvent>) -> Self {
        Self::new(name, is_async, vec![TraceBlock::new(events, Vec::new())])
    }

    pub fn event_count(&self) -> usize {
        self.blocks.iter().map(|b| b.events.len()).sum()
    }
}

/// Kind of storage a value is assigned to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Storage {
    /// Process-wide storage such as a static field
    Static,
    /// Per-instance storage
    Instance,
}

/// Kind of value being assigned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueKind {
    ServiceProvider,
    ScopeFactory,
    Other,
}

/// An assignment to a field or property, for the static-cache check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StaticAssignment {
    pub member: String,
    pub storage: Storage,
    pub value_kind: ValueKind,
    pub location: SourceLocation,
}
