//! Diagnostics produced by the analyzers and the sink that collects them.

use std::fmt;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

/// Source position of a fact, as reported by the front end.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SourceLocation {
    /// File path (relative to project root)
    pub file: String,
    /// Line number (1-indexed)
    pub line: u32,
    /// Column number (1-indexed, 0 if unknown)
    #[serde(default)]
    pub column: u32,
}

impl SourceLocation {
    #[must_use]
    pub fn new(file: impl Into<String>, line: u32, column: u32) -> Self {
        Self { file: file.into(), line, column }
    }
}

impl fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.file, self.line)?;
        if self.column > 0 {
            write!(f, ":{}", self.column)?;
        }
        Ok(())
    }
}

/// Diagnostic severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Info,
    Warning,
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Info => f.write_str("info"),
            Severity::Warning => f.write_str("warning"),
            Severity::Error => f.write_str("error"),
        }
    }
}

/// Rules the engine can report.
///
/// Each rule has a stable short code used by front ends for suppression.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleId {
    CaptiveDependency,
    OpenGenericCaptiveDependency,
    UnresolvableDependency,
    ImplementationTypeMismatch,
    UndisposedScope,
    ScopeEscape,
    UseAfterDispose,
    AsyncScopeRequired,
    RootProviderNotDisposed,
    StaticProviderCache,
    DuplicateRegistration,
    TryAddIgnored,
}

impl RuleId {
    pub const ALL: [RuleId; 12] = [
        RuleId::CaptiveDependency,
        RuleId::OpenGenericCaptiveDependency,
        RuleId::UnresolvableDependency,
        RuleId::ImplementationTypeMismatch,
        RuleId::UndisposedScope,
        RuleId::ScopeEscape,
        RuleId::UseAfterDispose,
        RuleId::AsyncScopeRequired,
        RuleId::RootProviderNotDisposed,
        RuleId::StaticProviderCache,
        RuleId::DuplicateRegistration,
        RuleId::TryAddIgnored,
    ];

    /// Stable short code.
    pub const fn code(self) -> &'static str {
        match self {
            RuleId::CaptiveDependency => "DI001",
            RuleId::OpenGenericCaptiveDependency => "DI002",
            RuleId::UnresolvableDependency => "DI003",
            RuleId::ImplementationTypeMismatch => "DI004",
            RuleId::UndisposedScope => "DI005",
            RuleId::ScopeEscape => "DI006",
            RuleId::UseAfterDispose => "DI007",
            RuleId::AsyncScopeRequired => "DI008",
            RuleId::RootProviderNotDisposed => "DI009",
            RuleId::StaticProviderCache => "DI010",
            RuleId::DuplicateRegistration => "DI011",
            RuleId::TryAddIgnored => "DI012",
        }
    }

    /// Looks a rule up by its short code, case-insensitively.
    pub fn from_code(code: &str) -> Option<RuleId> {
        RuleId::ALL.into_iter().find(|rule| rule.code().eq_ignore_ascii_case(code))
    }

    /// Severity used unless configuration overrides it.
    ///
    /// Implementation mismatch is the only error: it always fails activation.
    pub const fn default_severity(self) -> Severity {
        match self {
            RuleId::ImplementationTypeMismatch => Severity::Error,
            RuleId::DuplicateRegistration | RuleId::TryAddIgnored => Severity::Info,
            _ => Severity::Warning,
        }
    }
}

impl fmt::Display for RuleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// A single reported defect.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub rule: RuleId,
    pub severity: Severity,
    pub message: String,
    pub primary: SourceLocation,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub related: Vec<SourceLocation>,
}

impl Diagnostic {
    /// Creates a diagnostic with the rule's default severity.
    pub fn new(rule: RuleId, message: impl Into<String>, primary: SourceLocation) -> Self {
        Self {
            rule,
            severity: rule.default_severity(),
            message: message.into(),
            primary,
            related: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_related(mut self, location: SourceLocation) -> Self {
        self.related.push(location);
        self
    }

    fn sort_key(&self) -> (&SourceLocation, RuleId, &str, &[SourceLocation]) {
        (&self.primary, self.rule, &self.message, &self.related)
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {} {}: {}", self.primary, self.severity, self.rule, self.message)
    }
}

/// Collects diagnostics from concurrently running analyses.
///
/// Appends may come from any thread in any order; [`finish`](Self::finish)
/// sorts by location, rule, message and related locations, and drops exact
/// duplicates so the final list does not depend on scheduling.
///
/// # Examples
///
/// ```rust
/// use ferrous_di_analyzer::{Diagnostic, DiagnosticSink, RuleId, SourceLocation};
///
/// let sink = DiagnosticSink::new();
/// sink.push(Diagnostic::new(RuleId::ScopeEscape, "b", SourceLocation::new("b.cs", 1, 1)));
/// sink.push(Diagnostic::new(RuleId::ScopeEscape, "a", SourceLocation::new("a.cs", 9, 1)));
///
/// let sorted = sink.finish();
/// assert_eq!(sorted[0].primary.file, "a.cs");
/// ```
#[derive(Debug, Default)]
pub struct DiagnosticSink {
    entries: Mutex<Vec<Diagnostic>>,
}

impl DiagnosticSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, diagnostic: Diagnostic) {
        self.entries.lock().push(diagnostic);
    }

    pub fn extend(&self, diagnostics: impl IntoIterator<Item = Diagnostic>) {
        self.entries.lock().extend(diagnostics);
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Consumes the sink and returns its diagnostics in deterministic order.
    pub fn finish(self) -> Vec<Diagnostic> {
        let mut entries = self.entries.into_inner();
        entries.sort_by(|a, b| a.sort_key().cmp(&b.sort_key()));
        entries.dedup_by(|a, b| a.sort_key() == b.sort_key());
        entries
    }
}
