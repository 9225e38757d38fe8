//! Implementation compatibility for registrations written with runtime types.
//!
//! When both types are passed as runtime type objects the compiler cannot
//! check that the implementation provides the service; the container only
//! finds out at activation. Registrations written with generic arguments,
//! factories and instances are already checked by the compiler and skipped.

use tracing::trace;

use crate::cancellation::CancellationToken;
use crate::descriptors::TypeShape;
use crate::diagnostics::{Diagnostic, RuleId};
use crate::error::AnalysisResult;
use crate::graph::{RegistrationGraph, ServiceNode};
use crate::identity::TypeRef;
use crate::registration::{Implementation, TypeForm};

/// Reports effective registrations whose implementation cannot provide the service.
pub fn check_implementation_compatibility(
    graph: &RegistrationGraph,
    cancel: &CancellationToken,
) -> AnalysisResult<Vec<Diagnostic>> {
    let mut diagnostics = Vec::new();

    for node in graph.nodes() {
        cancel.throw_if_cancelled()?;

        let Implementation::Type { ty, form: TypeForm::RuntimeTypes } =
            &node.registration.implementation
        else {
            continue;
        };
        let Some((shape, args)) = graph.shape_for(ty) else {
            trace!(implementation = %ty, "no shape; compatibility not checked");
            continue;
        };

        if let Some(reason) = mismatch(&node.identity().ty, ty, shape, &args) {
            diagnostics.push(report(node, ty, &reason));
        }
    }

    Ok(diagnostics)
}

fn report(node: &ServiceNode, implementation: &TypeRef, reason: &str) -> Diagnostic {
    Diagnostic::new(
        RuleId::ImplementationTypeMismatch,
        format!(
            "Implementation type '{}' cannot be used for service '{}': {}",
            implementation,
            node.identity(),
            reason
        ),
        node.registration.location.clone(),
    )
}

/// Why `implementation` cannot provide `service`, if it cannot.
fn mismatch(
    service: &TypeRef,
    implementation: &TypeRef,
    shape: &TypeShape,
    args: &[TypeRef],
) -> Option<String> {
    match (service, implementation) {
        (TypeRef::Open { arity: service_arity, .. }, TypeRef::Open { arity: impl_arity, .. }) => {
            if service_arity != impl_arity {
                return Some(format!(
                    "open generic arity {} does not match implementation arity {}",
                    service_arity, impl_arity
                ));
            }
            // Close the service over the implementation's own parameters.
            let closed = service.close_over(&shape.type_params)?;
            if shape.offers(&closed) {
                None
            } else {
                Some(format!("it does not implement '{}'", closed))
            }
        }
        (TypeRef::Open { .. }, _) => {
            Some("an open generic service needs an open generic implementation".to_string())
        }
        (_, TypeRef::Open { .. }) => {
            Some("an open generic implementation cannot provide a closed service".to_string())
        }
        _ => {
            if offers_closed(shape, args, service) {
                None
            } else {
                Some(format!("it does not implement '{}'", service))
            }
        }
    }
}

/// `shape.offers`, with the shape closed over `args` when it was found through
/// its open definition.
fn offers_closed(shape: &TypeShape, args: &[TypeRef], service: &TypeRef) -> bool {
    if args.is_empty() {
        return shape.offers(service);
    }
    let own = shape
        .identity
        .close_over(&shape.type_params)
        .map(|own| own.substitute(&shape.type_params, args));
    own.as_ref() == Some(service)
        || shape
            .capabilities
            .iter()
            .any(|cap| &cap.substitute(&shape.type_params, args) == service)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collection::ServiceCollection;
    use crate::diagnostics::Severity;
    use crate::lifetime::Lifetime;

    fn run(services: ServiceCollection) -> Vec<Diagnostic> {
        let facts = services.build();
        let (graph, _) = RegistrationGraph::build(&facts.registrations, &facts.type_shapes);
        check_implementation_compatibility(&graph, &CancellationToken::new()).unwrap()
    }

    #[test]
    fn runtime_registration_without_capability_is_an_error() {
        let mut services = ServiceCollection::new();
        services
            .add(
                Lifetime::Scoped,
                TypeRef::closed("IOrders"),
                Implementation::runtime(TypeRef::closed("Invoices")),
            )
            .add_shape(
                TypeShape::new(TypeRef::closed("Invoices"))
                    .implements(TypeRef::closed("IInvoices")),
            );
        let found = run(services);

        assert_eq!(found.len(), 1);
        assert_eq!(found[0].severity, Severity::Error);
        assert!(found[0].message.contains("does not implement 'IOrders'"));
    }

    #[test]
    fn generic_argument_form_is_skipped() {
        let mut services = ServiceCollection::new();
        services
            .add_scoped(TypeRef::closed("IOrders"), TypeRef::closed("Invoices"))
            .add_shape(TypeShape::new(TypeRef::closed("Invoices")));
        assert!(run(services).is_empty());
    }

    #[test]
    fn open_generic_pair_is_closed_over_implementation_params() {
        let mut services = ServiceCollection::new();
        services
            .add_scoped(TypeRef::open("IRepository", 1), TypeRef::open("Repository", 1))
            .add_shape(
                TypeShape::open("Repository", &["TEntity"])
                    .implements(TypeRef::generic("IRepository", vec![TypeRef::param("TEntity")])),
            );
        assert!(run(services).is_empty());
    }

    #[test]
    fn open_generic_arity_mismatch() {
        let mut services = ServiceCollection::new();
        services
            .add_scoped(TypeRef::open("IRepository", 1), TypeRef::open("Repository", 2))
            .add_shape(TypeShape::open("Repository", &["TKey", "TEntity"]));
        let found = run(services);
        assert_eq!(found.len(), 1);
        assert!(found[0].message.contains("arity 1"));
    }

    #[test]
    fn closed_service_through_open_shape() {
        let mut services = ServiceCollection::new();
        services
            .add(
                Lifetime::Scoped,
                TypeRef::generic("IRepository", vec![TypeRef::closed("User")]),
                Implementation::runtime(TypeRef::generic(
                    "Repository",
                    vec![TypeRef::closed("User")],
                )),
            )
            .add_shape(
                TypeShape::open("Repository", &["T"])
                    .implements(TypeRef::generic("IRepository", vec![TypeRef::param("T")])),
            );
        assert!(run(services).is_empty());
    }

    #[test]
    fn unknown_shape_is_skipped() {
        let mut services = ServiceCollection::new();
        services.add(
            Lifetime::Scoped,
            TypeRef::closed("IOrders"),
            Implementation::runtime(TypeRef::closed("Orders")),
        );
        assert!(run(services).is_empty());
    }
}
