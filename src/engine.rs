//! The analysis entry point.
//!
//! One run takes an immutable [`FactSet`] and produces an [`AnalysisReport`].
//! The registration graph is built first; the graph checks and the
//! per-procedure scope analysis then run independently, in parallel when
//! the `parallel` feature is enabled.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::cancellation::CancellationToken;
use crate::config::{AnalyzerOptions, TraceErrorPolicy};
use crate::diagnostics::{Diagnostic, DiagnosticSink, RuleId, Severity};
use crate::error::{AnalysisError, AnalysisResult};
use crate::facts::FactSet;
use crate::graph::RegistrationGraph;
use crate::scope::{analyze_procedure, check_static_caches, ProcedureTrace};
use crate::validation::{
    check_captive_dependencies, check_implementation_compatibility, FrameworkServices,
    ResolvabilityChecker,
};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// A procedure whose trace could not be analyzed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkippedProcedure {
    pub procedure: String,
    pub reason: String,
}

/// Counters describing one run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisStats {
    pub registrations: usize,
    pub services: usize,
    pub edges: usize,
    pub procedures_analyzed: usize,
    pub procedures_skipped: usize,
    pub infos: usize,
    pub warnings: usize,
    pub errors: usize,
}

/// Everything one run found.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisReport {
    /// Sorted by location, rule and message
    pub diagnostics: Vec<Diagnostic>,
    pub skipped: Vec<SkippedProcedure>,
    pub stats: AnalysisStats,
}

impl AnalysisReport {
    pub fn count(&self, rule: RuleId) -> usize {
        self.by_rule(rule).count()
    }

    pub fn by_rule(&self, rule: RuleId) -> impl Iterator<Item = &Diagnostic> + '_ {
        self.diagnostics.iter().filter(move |d| d.rule == rule)
    }

    pub fn has_errors(&self) -> bool {
        self.stats.errors > 0
    }

    pub fn to_json(&self) -> AnalysisResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

enum ProcedureOutcome {
    Analyzed,
    Skipped(SkippedProcedure),
}

/// Runs every analysis over a fact set.
///
/// # Examples
///
/// ```rust
/// use ferrous_di_analyzer::{
///     Analyzer, ParameterDependency, RuleId, ServiceCollection, TypeRef, TypeShape,
/// };
///
/// let mut services = ServiceCollection::new();
/// services
///     .add_singleton(TypeRef::closed("IFoo"), TypeRef::closed("Foo"))
///     .add_scoped(TypeRef::closed("IBar"), TypeRef::closed("Bar"))
///     .add_shape(
///         TypeShape::new(TypeRef::closed("Foo"))
///             .depends_on(ParameterDependency::required(TypeRef::closed("IBar"))),
///     );
///
/// let report = Analyzer::default().analyze(&services.build()).unwrap();
/// assert_eq!(report.count(RuleId::CaptiveDependency), 1);
/// assert!(!report.has_errors());
/// ```
#[derive(Debug, Clone, Default)]
pub struct Analyzer {
    options: AnalyzerOptions,
}

impl Analyzer {
    pub fn new(options: AnalyzerOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &AnalyzerOptions {
        &self.options
    }

    pub fn analyze(&self, facts: &FactSet) -> AnalysisResult<AnalysisReport> {
        self.analyze_with_cancellation(facts, &CancellationToken::new())
    }

    /// Runs the analyses, stopping with [`AnalysisError::Cancelled`] as soon
    /// as `cancel` is observed. A cancelled run reports nothing.
    pub fn analyze_with_cancellation(
        &self,
        facts: &FactSet,
        cancel: &CancellationToken,
    ) -> AnalysisResult<AnalysisReport> {
        cancel.throw_if_cancelled()?;

        let (graph, registration_diagnostics) =
            RegistrationGraph::build(&facts.registrations, &facts.type_shapes);
        let framework = FrameworkServices::new(
            self.options.assume_framework_services_registered,
            &self.options.framework_services,
        );

        let sink = DiagnosticSink::new();
        sink.extend(registration_diagnostics);

        let (graph_result, scope_result) = join(
            || self.check_graph(&graph, &framework, &sink, cancel),
            || self.check_procedures(&facts.procedures, &sink, cancel),
        );
        graph_result?;
        let skipped = scope_result?;
        sink.extend(check_static_caches(&facts.static_assignments));

        cancel.throw_if_cancelled()?;

        let diagnostics: Vec<Diagnostic> = sink
            .finish()
            .into_iter()
            .filter(|d| self.options.is_enabled(d.rule))
            .map(|mut d| {
                d.severity = self.options.severity_for(d.rule);
                d
            })
            .collect();

        let mut stats = AnalysisStats {
            registrations: facts.registrations.len(),
            services: graph.node_count(),
            edges: graph.edges().len(),
            procedures_analyzed: facts.procedures.len() - skipped.len(),
            procedures_skipped: skipped.len(),
            ..AnalysisStats::default()
        };
        for diagnostic in &diagnostics {
            match diagnostic.severity {
                Severity::Info => stats.infos += 1,
                Severity::Warning => stats.warnings += 1,
                Severity::Error => stats.errors += 1,
            }
        }

        debug!(
            diagnostics = diagnostics.len(),
            errors = stats.errors,
            skipped = stats.procedures_skipped,
            "analysis finished"
        );

        Ok(AnalysisReport { diagnostics, skipped, stats })
    }

    fn check_graph(
        &self,
        graph: &RegistrationGraph,
        framework: &FrameworkServices,
        sink: &DiagnosticSink,
        cancel: &CancellationToken,
    ) -> AnalysisResult<()> {
        let resolvability = ResolvabilityChecker::new(graph, framework)
            .with_max_depth(self.options.max_resolution_depth);

        let (captive, (unresolved, mismatched)) = join(
            || check_captive_dependencies(graph, cancel),
            || {
                join(
                    || resolvability.check(cancel),
                    || check_implementation_compatibility(graph, cancel),
                )
            },
        );
        let (captive, unresolved, mismatched) = (captive?, unresolved?, mismatched?);

        debug!(
            captive = captive.len(),
            unresolved = unresolved.len(),
            mismatched = mismatched.len(),
            "graph checks finished"
        );
        sink.extend(captive);
        sink.extend(unresolved);
        sink.extend(mismatched);
        Ok(())
    }

    fn check_procedures(
        &self,
        procedures: &[ProcedureTrace],
        sink: &DiagnosticSink,
        cancel: &CancellationToken,
    ) -> AnalysisResult<Vec<SkippedProcedure>> {
        let check = |trace: &ProcedureTrace| -> AnalysisResult<ProcedureOutcome> {
            cancel.throw_if_cancelled()?;
            match analyze_procedure(trace) {
                Ok(found) => {
                    sink.extend(found);
                    Ok(ProcedureOutcome::Analyzed)
                }
                Err(
                    err @ (AnalysisError::DanglingHandle { .. }
                    | AnalysisError::MalformedTrace { .. }),
                ) => {
                    match self.options.trace_errors {
                        TraceErrorPolicy::Fail => Err(err),
                        TraceErrorPolicy::Skip => {
                            warn!(
                                procedure = %trace.name,
                                error = %err,
                                "skipping procedure with malformed trace"
                            );
                            Ok(ProcedureOutcome::Skipped(SkippedProcedure {
                                procedure: trace.name.clone(),
                                reason: err.to_string(),
                            }))
                        }
                    }
                }
                Err(err) => Err(err),
            }
        };

        #[cfg(feature = "parallel")]
        let outcomes: Vec<ProcedureOutcome> =
            procedures.par_iter().map(check).collect::<AnalysisResult<_>>()?;
        #[cfg(not(feature = "parallel"))]
        let outcomes: Vec<ProcedureOutcome> =
            procedures.iter().map(check).collect::<AnalysisResult<_>>()?;

        let skipped: Vec<SkippedProcedure> = outcomes
            .into_iter()
            .filter_map(|outcome| match outcome {
                ProcedureOutcome::Skipped(skipped) => Some(skipped),
                ProcedureOutcome::Analyzed => None,
            })
            .collect();

        debug!(procedures = procedures.len(), skipped = skipped.len(), "scope analysis finished");
        Ok(skipped)
    }
}

#[cfg(feature = "parallel")]
fn join<A, B, RA, RB>(a: A, b: B) -> (RA, RB)
where
    A: FnOnce() -> RA + Send,
    B: FnOnce() -> RB + Send,
    RA: Send,
    RB: Send,
{
    rayon::join(a, b)
}

#[cfg(not(feature = "parallel"))]
fn join<A, B, RA, RB>(a: A, b: B) -> (RA, RB)
where
    A: FnOnce() -> RA,
    B: FnOnce() -> RB,
{
    (a(), b())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collection::ServiceCollection;
    use crate::diagnostics::SourceLocation;
    use crate::identity::TypeRef;
    use crate::scope::ScopeEvent;

    fn dangling() -> ProcedureTrace {
        ProcedureTrace::linear(
            "Broken.Run",
            false,
            vec![ScopeEvent::Dispose {
                handle: "ghost".into(),
                location: SourceLocation::new("Broken.cs", 3, 1),
            }],
        )
    }

    #[test]
    fn malformed_trace_is_skipped_by_default() {
        let mut services = ServiceCollection::new();
        services.add_procedure(dangling());
        let report = Analyzer::default().analyze(&services.build()).unwrap();

        assert_eq!(report.skipped.len(), 1);
        assert_eq!(report.skipped[0].procedure, "Broken.Run");
        assert_eq!(report.stats.procedures_skipped, 1);
        assert_eq!(report.stats.procedures_analyzed, 0);
    }

    #[test]
    fn malformed_trace_fails_when_configured() {
        let mut services = ServiceCollection::new();
        services.add_procedure(dangling());
        let options = AnalyzerOptions {
            trace_errors: TraceErrorPolicy::Fail,
            ..AnalyzerOptions::default()
        };

        let result = Analyzer::new(options).analyze(&services.build());
        assert!(matches!(result, Err(AnalysisError::DanglingHandle { .. })));
    }

    #[test]
    fn disabled_rules_and_overrides_apply() {
        let mut services = ServiceCollection::new();
        services
            .add_singleton(TypeRef::closed("IFoo"), TypeRef::closed("Foo1"))
            .add_singleton(TypeRef::closed("IFoo"), TypeRef::closed("Foo2"))
            .try_add_singleton(TypeRef::closed("IFoo"), TypeRef::closed("Foo3"));
        let facts = services.build();

        let mut options = AnalyzerOptions::default();
        options.disabled_rules.insert(RuleId::TryAddIgnored);
        options.severity_overrides.insert(RuleId::DuplicateRegistration, Severity::Error);
        let report = Analyzer::new(options).analyze(&facts).unwrap();

        assert_eq!(report.count(RuleId::TryAddIgnored), 0);
        assert_eq!(report.count(RuleId::DuplicateRegistration), 1);
        assert!(report.has_errors());
    }

    #[test]
    fn cancelled_run_reports_nothing() {
        let cancel = CancellationToken::new();
        cancel.cancel();
        let result = Analyzer::default().analyze_with_cancellation(&FactSet::new(), &cancel);
        assert!(matches!(result, Err(AnalysisError::Cancelled)));
    }
}
