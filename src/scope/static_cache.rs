//! Providers cached in process-wide storage.

use crate::diagnostics::{Diagnostic, RuleId};
use crate::scope::trace::{StaticAssignment, Storage, ValueKind};

/// Reports every static member assigned a provider or scope factory.
///
/// A provider held in static storage outlives every scope and turns each
/// service resolved from it into a de facto singleton.
pub fn check_static_caches(assignments: &[StaticAssignment]) -> Vec<Diagnostic> {
    assignments
        .iter()
        .filter(|a| a.storage == Storage::Static)
        .filter_map(|a| {
            let what = match a.value_kind {
                ValueKind::ServiceProvider => "an IServiceProvider",
                ValueKind::ScopeFactory => "an IServiceScopeFactory",
                ValueKind::Other => return None,
            };
            Some(Diagnostic::new(
                RuleId::StaticProviderCache,
                format!("Static member '{}' caches {}; inject it instead", a.member, what),
                a.location.clone(),
            ))
        })
        .collect()
}
