/// Property-based tests for the analyzer
///
/// Random registration graphs, including cyclic ones, checked against
/// properties that must hold for every input.

use std::collections::BTreeSet;

use proptest::prelude::*;

use ferrous_di_analyzer::graph::{DefaultGraphExporter, ExportFormat, GraphExporter};
use ferrous_di_analyzer::{
    Analyzer, DependencyGraph, FactSet, Lifetime, ParameterDependency, RegistrationGraph, RuleId,
    ServiceCollection, TypeRef, TypeShape,
};

const LIFETIMES: [Lifetime; 3] = [Lifetime::Singleton, Lifetime::Scoped, Lifetime::Transient];

/// (lifetime, dependency indices) per service
type Blueprint = Vec<(usize, BTreeSet<usize>)>;

fn blueprints() -> impl Strategy<Value = Blueprint> {
    prop::collection::vec((0usize..3, prop::collection::btree_set(0usize..12, 0..4)), 1..10)
}

/// Dependencies wrap around so every one of them is registered.
fn facts_for(blueprint: &Blueprint) -> FactSet {
    let n = blueprint.len();
    let mut services = ServiceCollection::new();
    for (i, (lifetime, deps)) in blueprint.iter().enumerate() {
        services.add_type(
            LIFETIMES[*lifetime],
            TypeRef::closed(format!("IService{}", i)),
            TypeRef::closed(format!("Service{}", i)),
        );
        let mut shape = TypeShape::new(TypeRef::closed(format!("Service{}", i)));
        let wrapped: BTreeSet<usize> = deps.iter().map(|j| j % n).collect();
        for j in wrapped {
            let dependency = TypeRef::closed(format!("IService{}", j));
            shape = shape.depends_on(ParameterDependency::required(dependency));
        }
        services.add_shape(shape);
    }
    services.build()
}

fn expected_captives(blueprint: &Blueprint) -> usize {
    let n = blueprint.len();
    blueprint.iter()
        .map(|(lifetime, deps)| {
            let consumer = LIFETIMES[*lifetime];
            deps.iter()
                .map(|j| j % n)
                .collect::<BTreeSet<_>>()
                .into_iter()
                .filter(|&j| consumer.captures(LIFETIMES[blueprint[j].0]))
                .count()
        })
        .sum()
}

proptest! {
    #[test]
    fn test_captive_count_matches_lifetime_ranks(blueprint in blueprints()) {
        let report = Analyzer::default().analyze(&facts_for(&blueprint)).unwrap();
        prop_assert_eq!(report.count(RuleId::CaptiveDependency), expected_captives(&blueprint));
    }

    #[test]
    fn test_fully_registered_graphs_resolve_even_with_cycles(blueprint in blueprints()) {
        let report = Analyzer::default().analyze(&facts_for(&blueprint)).unwrap();
        prop_assert_eq!(report.count(RuleId::UnresolvableDependency), 0);
        prop_assert_eq!(report.stats.services, blueprint.len());
    }

    #[test]
    fn test_analysis_is_deterministic(blueprint in blueprints()) {
        let facts = facts_for(&blueprint);
        let first = Analyzer::default().analyze(&facts).unwrap();
        let second = Analyzer::default().analyze(&facts).unwrap();
        prop_assert_eq!(first, second);
    }

    #[test]
    fn test_fact_order_does_not_matter(blueprint in blueprints()) {
        let facts = facts_for(&blueprint);
        let mut reversed = facts.clone();
        reversed.registrations.reverse();
        reversed.type_shapes.reverse();

        let expected = Analyzer::default().analyze(&facts).unwrap();
        let actual = Analyzer::default().analyze(&reversed).unwrap();
        prop_assert_eq!(expected.diagnostics, actual.diagnostics);
    }

    #[test]
    fn test_diagnostics_are_sorted_and_unique(blueprint in blueprints()) {
        let report = Analyzer::default().analyze(&facts_for(&blueprint)).unwrap();
        let keys: Vec<_> = report
            .diagnostics
            .iter()
            .map(|d| (&d.primary, d.rule, &d.message, &d.related))
            .collect();
        for pair in keys.windows(2) {
            prop_assert!(pair[0] < pair[1]);
        }
    }

    #[test]
    fn test_json_export_reads_back(blueprint in blueprints()) {
        let facts = facts_for(&blueprint);
        let (graph, _) = RegistrationGraph::build(&facts.registrations, &facts.type_shapes);
        let snapshot = graph.snapshot();

        let json = DefaultGraphExporter.export(&snapshot, ExportFormat::Json).unwrap();
        prop_assert_eq!(DependencyGraph::from_json(&json).unwrap(), snapshot);
    }

    #[test]
    fn test_repeated_adds_keep_the_last(count in 2usize..8) {
        let mut services = ServiceCollection::new();
        for i in 0..count {
            services.add_scoped(TypeRef::closed("IFoo"), TypeRef::closed(format!("Foo{}", i)));
        }
        let report = Analyzer::default().analyze(&services.build()).unwrap();

        prop_assert_eq!(report.count(RuleId::DuplicateRegistration), count - 1);
        prop_assert_eq!(report.stats.services, 1);
    }
}
