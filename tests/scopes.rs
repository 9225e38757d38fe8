/// Scope lifecycle tests
///
/// Procedures are written as traces the way a front end would emit them and
/// run through the full analyzer.

use ferrous_di_analyzer::scope::EscapeSink;
use ferrous_di_analyzer::{
    Acquisition, AnalysisReport, Analyzer, HandleKind, ProcedureTrace, RuleId, ScopeEvent,
    ServiceCollection, SourceLocation, StaticAssignment, Storage, TraceBlock, ValueKind,
};

fn at(line: u32) -> SourceLocation {
    SourceLocation::new("Worker.cs", line, 9)
}

fn create(handle: &str, acquisition: Acquisition, is_async: bool, line: u32) -> ScopeEvent {
    ScopeEvent::Create {
        handle: handle.into(),
        kind: HandleKind::Scope,
        is_async,
        acquisition,
        location: at(line),
    }
}

fn resolve(handle: &str, result: &str, line: u32) -> ScopeEvent {
    ScopeEvent::Resolve { handle: handle.into(), result: result.into(), location: at(line) }
}

fn dispose(handle: &str, line: u32) -> ScopeEvent {
    ScopeEvent::Dispose { handle: handle.into(), location: at(line) }
}

fn escape(value: &str, line: u32) -> ScopeEvent {
    ScopeEvent::Escape { value: value.into(), sink: EscapeSink::Return, location: at(line) }
}

fn use_value(value: &str, line: u32) -> ScopeEvent {
    ScopeEvent::Use { value: value.into(), location: at(line) }
}

fn analyze(traces: Vec<ProcedureTrace>) -> AnalysisReport {
    let mut services = ServiceCollection::new();
    for trace in traces {
        services.add_procedure(trace);
    }
    Analyzer::default().analyze(&services.build()).unwrap()
}

// ===== Straight-Line Procedures =====

#[test]
fn test_escape_before_dispose() {
    let report = analyze(vec![ProcedureTrace::linear(
        "Worker.Load",
        false,
        vec![
            create("scope", Acquisition::Using, false, 10),
            resolve("scope", "repo", 11),
            escape("repo", 12),
            dispose("scope", 13),
        ],
    )]);

    assert_eq!(report.count(RuleId::ScopeEscape), 1);
    assert_eq!(report.count(RuleId::UseAfterDispose), 0);
    assert_eq!(report.diagnostics.len(), 1);
    assert_eq!(report.diagnostics[0].primary, at(12));
    assert_eq!(report.diagnostics[0].related, vec![at(10)]);
}

#[test]
fn test_use_after_using_ends() {
    let report = analyze(vec![ProcedureTrace::linear(
        "Worker.Run",
        false,
        vec![
            create("scope", Acquisition::Using, false, 20),
            resolve("scope", "db", 21),
            dispose("scope", 23),
            use_value("db", 24),
        ],
    )]);

    assert_eq!(report.count(RuleId::UseAfterDispose), 1);
    assert_eq!(report.diagnostics.len(), 1);
    assert_eq!(
        report.diagnostics[0].message,
        "'db' is used after scope 'scope' was disposed"
    );
}

#[test]
fn test_resolving_from_disposed_scope() {
    let report = analyze(vec![ProcedureTrace::linear(
        "Worker.Run",
        false,
        vec![
            create("scope", Acquisition::Manual, false, 5),
            dispose("scope", 6),
            resolve("scope", "db", 7),
        ],
    )]);
    assert_eq!(report.count(RuleId::UseAfterDispose), 1);
}

#[test]
fn test_manual_scope_never_disposed() {
    let report = analyze(vec![ProcedureTrace::linear(
        "Worker.Run",
        false,
        vec![
            create("scope", Acquisition::Manual, false, 5),
            resolve("scope", "db", 6),
            use_value("db", 7),
        ],
    )]);

    assert_eq!(report.diagnostics.len(), 1);
    assert_eq!(report.diagnostics[0].rule, RuleId::UndisposedScope);
    assert_eq!(report.diagnostics[0].primary, at(5));
}

#[test]
fn test_sync_using_in_async_method() {
    let report = analyze(vec![ProcedureTrace::linear(
        "Worker.LoadAsync",
        true,
        vec![
            create("scope", Acquisition::Using, false, 10),
            resolve("scope", "repo", 11),
            escape("repo", 12),
            dispose("scope", 13),
        ],
    )]);

    assert_eq!(report.count(RuleId::AsyncScopeRequired), 1);
    assert_eq!(report.count(RuleId::ScopeEscape), 0);
}

#[test]
fn test_await_using_async_scope_is_plain_escape() {
    let report = analyze(vec![ProcedureTrace::linear(
        "Worker.LoadAsync",
        true,
        vec![
            create("scope", Acquisition::AwaitUsing, true, 10),
            resolve("scope", "repo", 11),
            escape("repo", 12),
            dispose("scope", 13),
        ],
    )]);

    assert_eq!(report.count(RuleId::AsyncScopeRequired), 0);
    assert_eq!(report.count(RuleId::ScopeEscape), 1);
}

#[test]
fn test_root_provider_only_checked_for_disposal() {
    let report = analyze(vec![ProcedureTrace::linear(
        "Program.Main",
        false,
        vec![
            ScopeEvent::Create {
                handle: "provider".into(),
                kind: HandleKind::RootProvider,
                is_async: false,
                acquisition: Acquisition::Manual,
                location: at(3),
            },
            resolve("provider", "app", 4),
            escape("app", 5),
        ],
    )]);

    assert_eq!(report.diagnostics.len(), 1);
    assert_eq!(report.diagnostics[0].rule, RuleId::RootProviderNotDisposed);
}

#[test]
fn test_returning_the_scope_hands_off_ownership() {
    let report = analyze(vec![ProcedureTrace::linear(
        "ScopeFactory.Open",
        false,
        vec![create("scope", Acquisition::Manual, false, 3), escape("scope", 4)],
    )]);
    assert!(report.diagnostics.is_empty());
}

// ===== Branches and Loops =====

#[test]
fn test_dispose_on_one_branch_only() {
    // 0 -> {1, 2} -> 3
    let trace = ProcedureTrace::new(
        "Worker.Branch",
        false,
        vec![
            TraceBlock::new(vec![create("scope", Acquisition::Manual, false, 10)], vec![1, 2]),
            TraceBlock::new(vec![dispose("scope", 12)], vec![3]),
            TraceBlock::new(vec![], vec![3]),
            TraceBlock::new(vec![], vec![]),
        ],
    );
    let report = analyze(vec![trace]);

    assert_eq!(report.count(RuleId::UndisposedScope), 1);
}

#[test]
fn test_use_after_dispose_on_one_branch_is_not_definite() {
    let trace = ProcedureTrace::new(
        "Worker.Branch",
        false,
        vec![
            TraceBlock::new(
                vec![create("scope", Acquisition::Using, false, 10), resolve("scope", "db", 11)],
                vec![1, 2],
            ),
            TraceBlock::new(vec![dispose("scope", 12)], vec![3]),
            TraceBlock::new(vec![], vec![3]),
            TraceBlock::new(vec![use_value("db", 15), dispose("scope", 16)], vec![]),
        ],
    );
    let report = analyze(vec![trace]);
    assert_eq!(report.count(RuleId::UseAfterDispose), 0);
}

#[test]
fn test_scope_created_in_loop_and_disposed_each_iteration() {
    // 0 -> 1 (body) -> {1, 2}
    let trace = ProcedureTrace::new(
        "Worker.Poll",
        false,
        vec![
            TraceBlock::new(vec![], vec![1]),
            TraceBlock::new(
                vec![
                    create("scope", Acquisition::Manual, false, 20),
                    resolve("scope", "job", 21),
                    use_value("job", 22),
                    dispose("scope", 23),
                ],
                vec![1, 2],
            ),
            TraceBlock::new(vec![], vec![]),
        ],
    );
    let report = analyze(vec![trace]);
    assert!(report.diagnostics.is_empty());
}

// ===== Engine Behaviour =====

#[test]
fn test_procedures_are_independent() {
    let clean = ProcedureTrace::linear(
        "Worker.Clean",
        false,
        vec![create("scope", Acquisition::Using, false, 30), dispose("scope", 31)],
    );
    let leaky = ProcedureTrace::linear(
        "Worker.Leaky",
        false,
        vec![create("scope", Acquisition::Manual, false, 40)],
    );
    let broken = ProcedureTrace::linear("Worker.Broken", false, vec![dispose("ghost", 50)]);

    let report = analyze(vec![clean, leaky, broken]);
    assert_eq!(report.count(RuleId::UndisposedScope), 1);
    assert_eq!(report.skipped.len(), 1);
    assert_eq!(report.skipped[0].procedure, "Worker.Broken");
    assert_eq!(report.stats.procedures_analyzed, 2);
}

#[test]
fn test_static_provider_cache() {
    let mut services = ServiceCollection::new();
    services.add_static_assignment(StaticAssignment {
        member: "ServiceLocator.Current".into(),
        storage: Storage::Static,
        value_kind: ValueKind::ServiceProvider,
        location: SourceLocation::new("ServiceLocator.cs", 8, 5),
    });
    let report = Analyzer::default().analyze(&services.build()).unwrap();

    assert_eq!(report.count(RuleId::StaticProviderCache), 1);
    assert_eq!(
        report.diagnostics[0].message,
        "Static member 'ServiceLocator.Current' caches an IServiceProvider; inject it instead"
    );
}
