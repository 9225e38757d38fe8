//! Scope lifecycle and disposal analysis.
//!
//! Procedures are analyzed one at a time from their event traces; nothing
//! is shared between procedures, so callers may analyze them in parallel.

mod machine;
mod static_cache;
mod trace;

pub use machine::analyze_procedure;
pub use static_cache::check_static_caches;
pub use trace::{
    Acquisition, EscapeSink, HandleKind, ProcedureTrace, ScopeEvent, StaticAssignment, Storage,
    TraceBlock, ValueKind,
};
