//! Transitive resolvability of registered services.
//!
//! Every effective registration the container constructs itself is a root.
//! From each root the checker walks constructor dependencies depth first, in
//! parameter order, and reports the first dependency that nothing satisfies.
//!
//! Factory registrations are opaque: being registered is enough, their
//! bodies are never expanded. Dependency cycles count as resolved: a service
//! already on the current path is not expanded again and never produces a
//! diagnostic on its own. An open-generic registration that reaches itself
//! again with wider type arguments (`Node<T>` needing `INode<Wrap<T>>`) is
//! the same kind of cycle.
//!
//! Services finished within one root's walk are not expanded twice. Only
//! resolved results are shared between roots: an unresolved result inside a
//! cycle depends on where the cycle was entered.

use ahash::{AHashMap, AHashSet};
use tracing::{trace, warn};

use crate::cancellation::CancellationToken;
use crate::descriptors::ParameterDependency;
use crate::diagnostics::{Diagnostic, RuleId, SourceLocation};
use crate::error::AnalysisResult;
use crate::graph::RegistrationGraph;
use crate::identity::{ServiceIdentity, TypeRef};
use crate::internal::{DepthExceeded, ResolutionPath, MAX_DEPTH};
use crate::registration::Implementation;
use crate::validation::FrameworkServices;

/// Result of expanding one service.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Outcome {
    Resolved,
    /// Chain from the expanded service down to the missing one, both included
    Unresolved(Vec<ServiceIdentity>),
}

/// Outcome plus the shallowest ancestor position a cycle was cut at.
struct Visit {
    outcome: Outcome,
    low: usize,
    /// Some chain below was cut by the depth limit
    truncated: bool,
}

impl Visit {
    fn resolved() -> Self {
        Visit::cut_at(usize::MAX)
    }

    fn cut_at(low: usize) -> Self {
        Visit {
            outcome: Outcome::Resolved,
            low,
            truncated: false,
        }
    }

    fn unresolved(chain: Vec<ServiceIdentity>) -> Self {
        Visit {
            outcome: Outcome::Unresolved(chain),
            low: usize::MAX,
            truncated: false,
        }
    }
}

/// Checks that every constructed service can be built.
///
/// # Examples
///
/// ```rust
/// use ferrous_di_analyzer::{
///     CancellationToken, ParameterDependency, RegistrationGraph, ServiceCollection, TypeRef,
///     TypeShape,
/// };
/// use ferrous_di_analyzer::validation::{FrameworkServices, ResolvabilityChecker};
///
/// let mut services = ServiceCollection::new();
/// services
///     .add_singleton(TypeRef::closed("IFoo"), TypeRef::closed("Foo"))
///     .add_shape(
///         TypeShape::new(TypeRef::closed("Foo"))
///             .depends_on(ParameterDependency::required(TypeRef::closed("ILogger")))
///             .depends_on(ParameterDependency::required(TypeRef::closed("IMissing"))),
///     );
/// let facts = services.build();
/// let (graph, _) = RegistrationGraph::build(&facts.registrations, &facts.type_shapes);
///
/// let framework = FrameworkServices::new(true, &[]);
/// let found = ResolvabilityChecker::new(&graph, &framework)
///     .check(&CancellationToken::new())
///     .unwrap();
/// assert_eq!(found.len(), 1);
/// assert!(found[0].message.contains("IMissing"));
/// ```
pub struct ResolvabilityChecker<'a> {
    graph: &'a RegistrationGraph,
    framework: &'a FrameworkServices,
    max_depth: usize,
}

impl<'a> ResolvabilityChecker<'a> {
    pub fn new(graph: &'a RegistrationGraph, framework: &'a FrameworkServices) -> Self {
        Self {
            graph,
            framework,
            max_depth: MAX_DEPTH,
        }
    }

    /// Limits how deep a single chain is followed; deeper chains count as resolved.
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth.clamp(1, MAX_DEPTH);
        self
    }

    /// Runs the check; one diagnostic per unresolvable root, in declaration order.
    pub fn check(&self, cancel: &CancellationToken) -> AnalysisResult<Vec<Diagnostic>> {
        let mut walk = Walk {
            graph: self.graph,
            framework: self.framework,
            resolved: AHashSet::new(),
            finished: AHashMap::new(),
            depth_hits: 0,
        };
        let mut diagnostics = Vec::new();

        for root in self.graph.nodes() {
            cancel.throw_if_cancelled()?;
            if !matches!(root.registration.implementation, Implementation::Type { .. }) {
                continue;
            }

            walk.finished.clear();
            let mut path = ResolutionPath::new(self.max_depth);
            let visit = walk.expand(root.identity(), &mut path);
            if let Outcome::Unresolved(chain) = visit.outcome {
                diagnostics.push(self.report(root.identity(), &root.registration.location, &chain));
            }
        }

        if walk.depth_hits > 0 {
            warn!(
                hits = walk.depth_hits,
                max_depth = self.max_depth,
                "resolution depth limit reached; deeper chains treated as resolved"
            );
        }

        Ok(diagnostics)
    }

    fn report(
        &self,
        root: &ServiceIdentity,
        location: &SourceLocation,
        chain: &[ServiceIdentity],
    ) -> Diagnostic {
        let missing = chain.last().unwrap_or(root);
        let rendered: Vec<String> = chain.iter().map(ToString::to_string).collect();
        let message = if chain.len() <= 2 {
            format!("'{}' cannot be resolved: '{}' is not registered", root, missing)
        } else {
            format!(
                "'{}' cannot be resolved: '{}' is not registered (path: {})",
                root,
                missing,
                rendered.join(" -> ")
            )
        };

        let mut diagnostic =
            Diagnostic::new(RuleId::UnresolvableDependency, message, location.clone());
        for intermediate in chain.iter().skip(1).take(chain.len().saturating_sub(2)) {
            if let Some(target) = self.graph.resolve_target(intermediate) {
                let registration = &self.graph.node(target.node).registration;
                diagnostic = diagnostic.with_related(registration.location.clone());
            }
        }
        diagnostic
    }
}

struct Walk<'a> {
    graph: &'a RegistrationGraph,
    framework: &'a FrameworkServices,
    /// Services proven resolvable from any path
    resolved: AHashSet<ServiceIdentity>,
    /// Services already walked from the current root, with whether the walk was truncated
    finished: AHashMap<ServiceIdentity, bool>,
    depth_hits: usize,
}

impl Walk<'_> {
    /// Expands a service known to have a registration.
    fn expand(&mut self, identity: &ServiceIdentity, path: &mut ResolutionPath) -> Visit {
        if self.resolved.contains(identity) {
            return Visit::resolved();
        }
        if let Some(&truncated) = self.finished.get(identity) {
            // Resolved earlier in this walk, possibly only because of the path it had then.
            return Visit { truncated, ..Visit::cut_at(0) };
        }
        let Some(target) = self.graph.resolve_target(identity) else {
            return Visit::resolved();
        };
        if let Some(depth) = Self::widened_instantiation(path, target.node, &target.closing_args) {
            trace!(service = %identity, "recursive generic instantiation treated as resolved");
            return Visit::cut_at(depth);
        }
        let Some(dependencies) = self.expandable(target.node, &target.closing_args) else {
            self.resolved.insert(identity.clone());
            return Visit::resolved();
        };

        let position = path.depth();
        let mut guard = match path.enter(identity.clone(), target.node) {
            Ok(guard) => guard,
            Err(DepthExceeded(depth)) => {
                trace!(service = %identity, depth, "depth limit");
                self.depth_hits += 1;
                return Visit { truncated: true, ..Visit::cut_at(0) };
            }
        };

        let mut low = usize::MAX;
        let mut truncated = false;
        for dependency in &dependencies {
            let visit = self.check_dependency(dependency, &mut guard);
            low = low.min(visit.low);
            truncated |= visit.truncated;
            if let Outcome::Unresolved(tail) = visit.outcome {
                let mut chain = Vec::with_capacity(tail.len() + 1);
                chain.push(identity.clone());
                chain.extend(tail);
                return Visit { outcome: Outcome::Unresolved(chain), low, truncated };
            }
        }
        drop(guard);

        // A cycle cut at an ancestor makes this result depend on that ancestor.
        if low >= position && !truncated {
            self.resolved.insert(identity.clone());
            return Visit::resolved();
        }
        self.finished.insert(identity.clone(), truncated);
        Visit { outcome: Outcome::Resolved, low, truncated }
    }

    /// Depth of an earlier instantiation of the same open-generic node whose
    /// type arguments the new ones wrap.
    fn widened_instantiation(
        path: &ResolutionPath,
        node: usize,
        closing_args: &[TypeRef],
    ) -> Option<usize> {
        if closing_args.is_empty() {
            return None;
        }
        path.entries_of(node)
            .find(|(_, earlier)| {
                let earlier = earlier.ty.args();
                earlier.len() == closing_args.len()
                    && earlier != closing_args
                    && earlier
                        .iter()
                        .zip(closing_args)
                        .all(|(old, new)| old == new || new.nests(old))
            })
            .map(|(depth, _)| depth)
    }

    /// Dependencies to walk, or `None` when the node is opaque.
    fn expandable(
        &self,
        node: usize,
        closing_args: &[TypeRef],
    ) -> Option<Vec<ParameterDependency>> {
        match &self.graph.node(node).registration.implementation {
            Implementation::Type { .. } => self.graph.dependencies_of(node, closing_args),
            Implementation::Factory { .. } | Implementation::Instance { .. } => None,
        }
    }

    fn check_dependency(
        &mut self,
        dependency: &ParameterDependency,
        path: &mut ResolutionPath,
    ) -> Visit {
        let required = &dependency.required;

        if matches!(required.ty, TypeRef::Param { .. }) || dependency.has_default_or_optional {
            return Visit::resolved();
        }

        if dependency.is_enumerable {
            if self.graph.registration_count(required) > 0 || self.framework.contains(required) {
                return Visit::resolved();
            }
            trace!(service = %required, "no registrations for enumerable dependency");
            return Visit::unresolved(vec![required.clone()]);
        }

        if let Some(position) = path.position(required) {
            trace!(service = %required, "cycle treated as resolved");
            return Visit::cut_at(position);
        }

        if self.graph.resolve_target(required).is_some() {
            return self.expand(required, path);
        }
        if self.framework.contains(required) {
            return Visit::resolved();
        }
        Visit::unresolved(vec![required.clone()])
    }
}
