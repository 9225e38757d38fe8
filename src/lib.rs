//! # ferrous-di-analyzer
//!
//! Static analysis of dependency-injection registrations and scope usage,
//! modelled on Microsoft.Extensions.DependencyInjection.
//!
//! A front end turns source code into a [`FactSet`]: the registrations of a
//! composition root, the constructor shapes of implementation types, and one
//! event trace per procedure that creates scopes. The engine finds defects
//! before the program runs.
//!
//! ## Checks
//!
//! - **Registrations**: duplicate `Add*` calls and ignored `TryAdd*` calls
//! - **Captive dependencies**: a singleton holding a scoped or transient
//!   service, or a scoped service holding a transient one
//! - **Resolvability**: dependencies that nothing registers, followed
//!   transitively through constructors
//! - **Implementation compatibility**: `typeof`-style registrations whose
//!   implementation does not provide the service
//! - **Scope lifecycle**: undisposed scopes and root providers, services
//!   escaping their scope, use after dispose, synchronous scopes in async
//!   methods, and providers cached in static storage
//!
//! ## Quick Start
//!
//! ```rust
//! use ferrous_di_analyzer::{
//!     Analyzer, ParameterDependency, RuleId, ServiceCollection, TypeRef, TypeShape,
//! };
//!
//! let mut services = ServiceCollection::new();
//! services
//!     .add_singleton(TypeRef::closed("IOrderService"), TypeRef::closed("OrderService"))
//!     .add_scoped(TypeRef::closed("AppDbContext"), TypeRef::closed("AppDbContext"))
//!     .add_shape(
//!         TypeShape::new(TypeRef::closed("OrderService"))
//!             .implements(TypeRef::closed("IOrderService"))
//!             .depends_on(ParameterDependency::required(TypeRef::closed("AppDbContext")))
//!             .depends_on(ParameterDependency::required(TypeRef::closed("IPaymentGateway"))),
//!     );
//!
//! let report = Analyzer::default().analyze(&services.build()).unwrap();
//! assert_eq!(report.count(RuleId::CaptiveDependency), 1);
//! assert_eq!(report.count(RuleId::UnresolvableDependency), 1);
//! ```
//!
//! ## Scope traces
//!
//! ```rust
//! use ferrous_di_analyzer::{
//!     Acquisition, Analyzer, ProcedureTrace, RuleId, ScopeEvent, ServiceCollection,
//!     SourceLocation,
//! };
//!
//! let at = |line| SourceLocation::new("Worker.cs", line, 13);
//! let mut services = ServiceCollection::new();
//! services.add_procedure(ProcedureTrace::linear("Worker.Run", false, vec![
//!     ScopeEvent::Create {
//!         handle: "scope".into(),
//!         kind: Default::default(),
//!         is_async: false,
//!         acquisition: Acquisition::Using,
//!         location: at(20),
//!     },
//!     ScopeEvent::Resolve { handle: "scope".into(), result: "db".into(), location: at(21) },
//!     ScopeEvent::Dispose { handle: "scope".into(), location: at(23) },
//!     ScopeEvent::Use { value: "db".into(), location: at(24) },
//! ]));
//!
//! let report = Analyzer::default().analyze(&services.build()).unwrap();
//! assert_eq!(report.count(RuleId::UseAfterDispose), 1);
//! ```
//!
//! ## Features
//!
//! - `parallel` (default): graph checks and procedures run on the rayon pool

pub mod cancellation;
pub mod collection;
pub mod config;
pub mod descriptors;
pub mod diagnostics;
pub mod engine;
pub mod error;
pub mod facts;
pub mod graph;
pub mod identity;
pub mod lifetime;
pub mod registration;
pub mod scope;
pub mod validation;

mod internal;

pub use cancellation::CancellationToken;
pub use collection::ServiceCollection;
pub use config::{
    AnalyzerOptions, ConfigSource, EnvironmentConfigSource, MapConfigSource, TraceErrorPolicy,
};
pub use descriptors::{ParameterDependency, TypeShape};
pub use diagnostics::{Diagnostic, DiagnosticSink, RuleId, Severity, SourceLocation};
pub use engine::{AnalysisReport, AnalysisStats, Analyzer, SkippedProcedure};
pub use error::{AnalysisError, AnalysisResult};
pub use facts::FactSet;
pub use graph::{DependencyGraph, RegistrationGraph};
pub use identity::{ServiceIdentity, TypeRef};
pub use lifetime::Lifetime;
pub use registration::{Implementation, Registration, TypeForm};
pub use scope::{
    Acquisition, EscapeSink, HandleKind, ProcedureTrace, ScopeEvent, StaticAssignment, Storage,
    TraceBlock, ValueKind,
};
