//! Captive dependency detection.

use tracing::trace;

use crate::cancellation::CancellationToken;
use crate::diagnostics::{Diagnostic, RuleId};
use crate::error::AnalysisResult;
use crate::graph::RegistrationGraph;

/// Reports every edge whose consumer outlives its dependency.
///
/// Open-generic consumers report a separate rule because every closed
/// instantiation inherits the defect. Opaque factories and instances have no
/// edges and are never reported.
///
/// # Examples
///
/// ```rust
/// use ferrous_di_analyzer::{
///     CancellationToken, ParameterDependency, RegistrationGraph, RuleId, ServiceCollection,
///     TypeRef, TypeShape,
/// };
/// use ferrous_di_analyzer::validation::check_captive_dependencies;
///
/// let mut services = ServiceCollection::new();
/// services
///     .add_singleton(TypeRef::closed("IFoo"), TypeRef::closed("Foo"))
///     .add_scoped(TypeRef::closed("IBar"), TypeRef::closed("Bar"))
///     .add_shape(
///         TypeShape::new(TypeRef::closed("Foo"))
///             .depends_on(ParameterDependency::required(TypeRef::closed("IBar"))),
///     );
/// let facts = services.build();
/// let (graph, _) = RegistrationGraph::build(&facts.registrations, &facts.type_shapes);
///
/// let found = check_captive_dependencies(&graph, &CancellationToken::new()).unwrap();
/// assert_eq!(found.len(), 1);
/// assert_eq!(found[0].rule, RuleId::CaptiveDependency);
/// ```
pub fn check_captive_dependencies(
    graph: &RegistrationGraph,
    cancel: &CancellationToken,
) -> AnalysisResult<Vec<Diagnostic>> {
    let mut diagnostics = Vec::new();

    for consumer in graph.nodes() {
        cancel.throw_if_cancelled()?;

        for edge in graph.edges_from(consumer.ix) {
            let dependency = graph.node(edge.to);
            if !consumer.lifetime().captures(dependency.lifetime()) {
                continue;
            }
            trace!(
                consumer = %consumer.identity(),
                dependency = %edge.dependency.required,
                "captive edge"
            );

            let (rule, suffix) = if consumer.is_open_generic() {
                (
                    RuleId::OpenGenericCaptiveDependency,
                    "; every closed instantiation inherits this",
                )
            } else {
                (RuleId::CaptiveDependency, "")
            };
            let message = format!(
                "{} service '{}' depends on {} service '{}'{}",
                consumer.lifetime(),
                consumer.identity(),
                dependency.lifetime().word(),
                edge.dependency.required,
                suffix
            );
            diagnostics.push(
                Diagnostic::new(rule, message, consumer.registration.location.clone())
                    .with_related(dependency.registration.location.clone()),
            );
        }
    }

    Ok(diagnostics)
}
