/// Captive dependency and implementation compatibility tests

use ferrous_di_analyzer::{
    Analyzer, Implementation, Lifetime, ParameterDependency, RuleId, ServiceCollection, Severity,
    TypeRef, TypeShape,
};

fn depends(consumer: &str, dependency: &str) -> TypeShape {
    TypeShape::new(TypeRef::closed(consumer))
        .depends_on(ParameterDependency::required(TypeRef::closed(dependency)))
}

// ===== Captive Dependencies =====

#[test]
fn test_singleton_depending_on_scoped_is_captive() {
    let mut services = ServiceCollection::new();
    services
        .add_singleton(TypeRef::closed("IFoo"), TypeRef::closed("Foo"))
        .add_scoped(TypeRef::closed("IBar"), TypeRef::closed("Bar"))
        .add_shape(depends("Foo", "IBar"));

    let report = Analyzer::default().analyze(&services.build()).unwrap();
    assert_eq!(report.diagnostics.len(), 1);
    let captive = &report.diagnostics[0];
    assert_eq!(captive.rule, RuleId::CaptiveDependency);
    assert!(captive.message.contains("IFoo"));
    assert!(captive.message.contains("scoped"));
    assert!(captive.message.contains("IBar"));
}

#[test]
fn test_scoped_depending_on_scoped_is_clean() {
    let mut services = ServiceCollection::new();
    services
        .add_scoped(TypeRef::closed("IFoo"), TypeRef::closed("Foo"))
        .add_scoped(TypeRef::closed("IBar"), TypeRef::closed("Bar"))
        .add_shape(depends("Foo", "IBar"));

    let report = Analyzer::default().analyze(&services.build()).unwrap();
    assert!(report.diagnostics.is_empty());
}

#[test]
fn test_every_captive_pairing() {
    let pairs = [
        (Lifetime::Singleton, Lifetime::Scoped, true),
        (Lifetime::Singleton, Lifetime::Transient, true),
        (Lifetime::Scoped, Lifetime::Transient, true),
        (Lifetime::Scoped, Lifetime::Singleton, false),
        (Lifetime::Transient, Lifetime::Scoped, false),
        (Lifetime::Transient, Lifetime::Transient, false),
    ];

    for (consumer, dependency, captive) in pairs {
        let mut services = ServiceCollection::new();
        services
            .add_type(consumer, TypeRef::closed("IFoo"), TypeRef::closed("Foo"))
            .add_type(dependency, TypeRef::closed("IBar"), TypeRef::closed("Bar"))
            .add_shape(depends("Foo", "IBar"));
        let report = Analyzer::default().analyze(&services.build()).unwrap();
        assert_eq!(
            report.count(RuleId::CaptiveDependency),
            usize::from(captive),
            "{} -> {}",
            consumer,
            dependency
        );
    }
}

#[test]
fn test_open_generic_dependency_of_closed_consumer() {
    let mut services = ServiceCollection::new();
    services
        .add_singleton(TypeRef::closed("IReportService"), TypeRef::closed("ReportService"))
        .add_scoped(TypeRef::open("IRepository", 1), TypeRef::open("Repository", 1))
        .add_shape(TypeShape::new(TypeRef::closed("ReportService")).depends_on(
            ParameterDependency::required(TypeRef::generic(
                "IRepository",
                vec![TypeRef::closed("Report")],
            )),
        ));

    let report = Analyzer::default().analyze(&services.build()).unwrap();
    assert_eq!(report.count(RuleId::CaptiveDependency), 1);
    assert!(report.diagnostics[0].message.contains("IRepository<Report>"));
}

#[test]
fn test_opaque_factory_never_captures() {
    let mut services = ServiceCollection::new();
    services
        .add_opaque_factory(Lifetime::Singleton, TypeRef::closed("IFoo"))
        .add_scoped(TypeRef::closed("IBar"), TypeRef::closed("Bar"));
    let report = Analyzer::default().analyze(&services.build()).unwrap();
    assert_eq!(report.count(RuleId::CaptiveDependency), 0);
}

// ===== Implementation Compatibility =====

#[test]
fn test_mismatch_is_the_only_default_error() {
    let mut services = ServiceCollection::new();
    services
        .add(
            Lifetime::Singleton,
            TypeRef::closed("IMailer"),
            Implementation::runtime(TypeRef::closed("SmsSender")),
        )
        .add_shape(
            TypeShape::new(TypeRef::closed("SmsSender")).implements(TypeRef::closed("ISender")),
        );

    let report = Analyzer::default().analyze(&services.build()).unwrap();
    assert_eq!(report.count(RuleId::ImplementationTypeMismatch), 1);
    assert_eq!(report.diagnostics[0].severity, Severity::Error);
    assert!(report.has_errors());
}

#[test]
fn test_closed_service_for_open_implementation() {
    let mut services = ServiceCollection::new();
    services
        .add(
            Lifetime::Scoped,
            TypeRef::closed("IOrders"),
            Implementation::runtime(TypeRef::open("Repository", 1)),
        )
        .add_shape(TypeShape::open("Repository", &["T"]));

    let report = Analyzer::default().analyze(&services.build()).unwrap();
    assert_eq!(report.count(RuleId::ImplementationTypeMismatch), 1);
}

#[test]
fn test_instances_and_factories_are_not_checked() {
    let mut services = ServiceCollection::new();
    services
        .add_instance(TypeRef::closed("IMailer"), Some(TypeRef::closed("SmsSender")))
        .add_factory(Lifetime::Scoped, TypeRef::closed("IOrders"), vec![])
        .add_shape(TypeShape::new(TypeRef::closed("SmsSender")));

    let report = Analyzer::default().analyze(&services.build()).unwrap();
    assert_eq!(report.count(RuleId::ImplementationTypeMismatch), 0);
}
