/// Configuration from the process environment
///
/// These tests mutate process-wide environment variables and run serially.

use std::env;

use serial_test::serial;

use ferrous_di_analyzer::config::ENV_PREFIX;
use ferrous_di_analyzer::{
    AnalysisError, Analyzer, AnalyzerOptions, ConfigSource, EnvironmentConfigSource,
    ParameterDependency, RuleId, ServiceCollection, TraceErrorPolicy, TypeRef, TypeShape,
};

const KEYS: [&str; 4] = [
    "FERROUS_DI_ANALYZER_ASSUME_FRAMEWORK_SERVICES_REGISTERED",
    "FERROUS_DI_ANALYZER_MAX_RESOLUTION_DEPTH",
    "FERROUS_DI_ANALYZER_TRACE_ERRORS",
    "FERROUS_DI_ANALYZER_FRAMEWORK_SERVICES",
];

fn clear() {
    for key in KEYS {
        env::remove_var(key);
    }
}

#[test]
#[serial]
fn test_empty_environment_gives_defaults() {
    clear();
    assert_eq!(AnalyzerOptions::from_env().unwrap(), AnalyzerOptions::default());
}

#[test]
#[serial]
fn test_environment_overrides() {
    clear();
    env::set_var("FERROUS_DI_ANALYZER_MAX_RESOLUTION_DEPTH", "32");
    env::set_var("FERROUS_DI_ANALYZER_TRACE_ERRORS", "fail");
    env::set_var("FERROUS_DI_ANALYZER_FRAMEWORK_SERVICES", "ITenantContext,IFeatureFlags");

    let options = AnalyzerOptions::from_env().unwrap();
    clear();

    assert_eq!(options.max_resolution_depth, 32);
    assert_eq!(options.trace_errors, TraceErrorPolicy::Fail);
    assert_eq!(options.framework_services, vec!["ITenantContext", "IFeatureFlags"]);
}

#[test]
#[serial]
fn test_invalid_environment_value() {
    clear();
    env::set_var("FERROUS_DI_ANALYZER_MAX_RESOLUTION_DEPTH", "100000");
    let result = AnalyzerOptions::from_env();
    clear();

    assert!(matches!(result, Err(AnalysisError::Config(_))));
}

#[test]
#[serial]
fn test_environment_source_lists_prefixed_keys() {
    clear();
    env::set_var("FERROUS_DI_ANALYZER_TRACE_ERRORS", "skip");
    let keys = EnvironmentConfigSource::with_prefix(ENV_PREFIX).keys();
    clear();

    assert!(keys.contains(&"trace_errors".to_string()));
}

#[test]
#[serial]
fn test_disabling_framework_assumption_from_environment() {
    clear();
    env::set_var("FERROUS_DI_ANALYZER_ASSUME_FRAMEWORK_SERVICES_REGISTERED", "false");
    let options = AnalyzerOptions::from_env().unwrap();
    clear();

    let mut services = ServiceCollection::new();
    services
        .add_singleton(TypeRef::closed("IWorker"), TypeRef::closed("Worker"))
        .add_shape(TypeShape::new(TypeRef::closed("Worker")).depends_on(
            ParameterDependency::required(TypeRef::generic(
                "ILogger",
                vec![TypeRef::closed("Worker")],
            )),
        ));
    let facts = services.build();

    let strict = Analyzer::new(options).analyze(&facts).unwrap();
    let lenient = Analyzer::default().analyze(&facts).unwrap();
    assert_eq!(strict.count(RuleId::UnresolvableDependency), 1);
    assert_eq!(lenient.count(RuleId::UnresolvableDependency), 0);
}
