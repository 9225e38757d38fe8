//! Registration graph construction.
//!
//! The graph is rebuilt from scratch on every run. Registrations are grouped
//! by service identity, ordered by declaration, and one *effective*
//! registration is chosen per identity; only effective registrations become
//! nodes. Entries whose effect is nullified by the choice are reported.

pub mod export;

use ahash::AHashMap;
use tracing::debug;

use crate::descriptors::{ParameterDependency, TypeShape};
use crate::diagnostics::{Diagnostic, RuleId};
use crate::identity::{ServiceIdentity, TypeRef};
use crate::lifetime::Lifetime;
use crate::registration::{Implementation, Registration};

pub use export::{
    DefaultGraphExporter, DependencyGraph, DependencyType, ExportFormat, GraphEdge, GraphExporter,
    GraphMetadata, GraphNode,
};

/// Index of a node in the graph arena.
pub type NodeIx = usize;

/// An effective registration.
#[derive(Debug, Clone)]
pub struct ServiceNode {
    pub ix: NodeIx,
    pub registration: Registration,
    /// Every registration for this identity, in declaration order
    pub entries: Vec<Registration>,
}

impl ServiceNode {
    pub fn identity(&self) -> &ServiceIdentity {
        &self.registration.service
    }

    pub fn lifetime(&self) -> Lifetime {
        self.registration.lifetime
    }

    pub fn is_open_generic(&self) -> bool {
        self.registration.service.is_open_generic()
    }
}

/// A dependency edge between two effective registrations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Edge {
    pub from: NodeIx,
    pub to: NodeIx,
    /// The dependency as the consumer declares it
    pub dependency: ParameterDependency,
}

/// Where a request for a service identity lands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolveTarget {
    pub node: NodeIx,
    /// Type arguments closing an open-generic node, empty otherwise
    pub closing_args: Vec<TypeRef>,
}

/// Indexed, conflict-resolved service graph.
///
/// # Examples
///
/// ```rust
/// use ferrous_di_analyzer::{RegistrationGraph, RuleId, ServiceCollection, TypeRef};
///
/// let mut services = ServiceCollection::new();
/// services
///     .add_singleton(TypeRef::closed("IClock"), TypeRef::closed("SystemClock"))
///     .add_singleton(TypeRef::closed("IClock"), TypeRef::closed("FakeClock"));
/// let facts = services.build();
///
/// let (graph, diagnostics) = RegistrationGraph::build(&facts.registrations, &facts.type_shapes);
/// assert_eq!(graph.node_count(), 1);
/// assert_eq!(diagnostics.len(), 1);
/// assert_eq!(diagnostics[0].rule, RuleId::DuplicateRegistration);
/// ```
#[derive(Debug, Clone, Default)]
pub struct RegistrationGraph {
    nodes: Vec<ServiceNode>,
    by_identity: AHashMap<ServiceIdentity, NodeIx>,
    entry_counts: AHashMap<ServiceIdentity, usize>,
    shapes: AHashMap<TypeRef, TypeShape>,
    edges: Vec<Edge>,
    outgoing: Vec<Vec<usize>>,
}

impl RegistrationGraph {
    /// Builds the graph and reports nullified registrations.
    ///
    /// Never fails: facts that cannot be classified simply contribute nothing.
    pub fn build(registrations: &[Registration], shapes: &[TypeShape]) -> (Self, Vec<Diagnostic>) {
        let mut groups: AHashMap<&ServiceIdentity, Vec<&Registration>> = AHashMap::new();
        for registration in registrations {
            groups.entry(&registration.service).or_default().push(registration);
        }

        let mut diagnostics = Vec::new();
        let mut effective: Vec<(Registration, Vec<Registration>)> =
            Vec::with_capacity(groups.len());

        for (_, mut entries) in groups {
            entries.sort_by_key(|r| r.insertion_index);
            let winner = select_effective(&entries, &mut diagnostics);
            effective.push((
                entries[winner].clone(),
                entries.into_iter().cloned().collect(),
            ));
        }

        // Node order is declaration order of the winning registration.
        effective.sort_by(|a, b| {
            a.0.insertion_index
                .cmp(&b.0.insertion_index)
                .then_with(|| a.0.service.cmp(&b.0.service))
        });

        let mut graph = RegistrationGraph::default();
        for shape in shapes {
            graph.shapes.entry(shape.identity.clone()).or_insert_with(|| shape.clone());
        }
        for (ix, (registration, entries)) in effective.into_iter().enumerate() {
            graph.by_identity.insert(registration.service.clone(), ix);
            graph.entry_counts.insert(registration.service.clone(), entries.len());
            graph.nodes.push(ServiceNode { ix, registration, entries });
        }

        graph.link();
        diagnostics.sort_by(|a, b| {
            (&a.primary, a.rule, &a.message).cmp(&(&b.primary, b.rule, &b.message))
        });

        debug!(
            registrations = registrations.len(),
            nodes = graph.nodes.len(),
            edges = graph.edges.len(),
            nullified = diagnostics.len(),
            "built registration graph"
        );

        (graph, diagnostics)
    }

    fn link(&mut self) {
        let mut edges = Vec::new();
        for node in &self.nodes {
            let Some(dependencies) = self.dependencies_of(node.ix, &[]) else {
                continue;
            };
            for dependency in dependencies {
                if let Some(target) = self.resolve_target(&dependency.required) {
                    edges.push(Edge { from: node.ix, to: target.node, dependency });
                }
            }
        }

        let mut outgoing = vec![Vec::new(); self.nodes.len()];
        for (i, edge) in edges.iter().enumerate() {
            outgoing[edge.from].push(i);
        }
        self.edges = edges;
        self.outgoing = outgoing;
    }

    pub fn nodes(&self) -> &[ServiceNode] {
        &self.nodes
    }

    pub fn node(&self, ix: NodeIx) -> &ServiceNode {
        &self.nodes[ix]
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    /// Outgoing edges of `ix`, in constructor parameter order.
    pub fn edges_from(&self, ix: NodeIx) -> impl Iterator<Item = &Edge> + '_ {
        self.outgoing
            .get(ix)
            .into_iter()
            .flatten()
            .map(move |&e| &self.edges[e])
    }

    /// Effective registration for exactly this identity.
    pub fn effective(&self, identity: &ServiceIdentity) -> Option<&ServiceNode> {
        self.by_identity.get(identity).map(|&ix| &self.nodes[ix])
    }

    /// Node that satisfies a request for `identity`.
    ///
    /// An exact registration wins; otherwise a closed generic request falls
    /// back to the open-generic registration of its definition (same key).
    pub fn resolve_target(&self, identity: &ServiceIdentity) -> Option<ResolveTarget> {
        if let Some(&node) = self.by_identity.get(identity) {
            return Some(ResolveTarget { node, closing_args: Vec::new() });
        }
        let open = identity.ty.open_definition()?;
        let &node = self.by_identity.get(&identity.with_ty(open))?;
        Some(ResolveTarget {
            node,
            closing_args: identity.ty.args().to_vec(),
        })
    }

    /// Number of registrations (not only effective ones) that a multi-service
    /// request for `identity` would receive.
    pub fn registration_count(&self, identity: &ServiceIdentity) -> usize {
        let exact = self.entry_counts.get(identity).copied().unwrap_or(0);
        let open = identity
            .ty
            .open_definition()
            .and_then(|open| self.entry_counts.get(&identity.with_ty(open)).copied())
            .unwrap_or(0);
        exact + open
    }

    /// Shape of an implementation type.
    ///
    /// A closed generic without its own shape falls back to the shape of its
    /// open definition; the returned arguments close that shape.
    pub fn shape_for(&self, ty: &TypeRef) -> Option<(&TypeShape, Vec<TypeRef>)> {
        if let Some(shape) = self.shapes.get(ty) {
            return Some((shape, Vec::new()));
        }
        let open = ty.open_definition()?;
        self.shapes.get(&open).map(|shape| (shape, ty.args().to_vec()))
    }

    /// Dependencies of a node, closed over `closing_args` for open generics.
    ///
    /// `None` means the node is opaque: an uninspectable factory or an
    /// implementation without a known shape.
    pub fn dependencies_of(
        &self,
        ix: NodeIx,
        closing_args: &[TypeRef],
    ) -> Option<Vec<ParameterDependency>> {
        match &self.nodes[ix].registration.implementation {
            Implementation::Type { ty, .. } => {
                let (shape, own_args) = self.shape_for(ty)?;
                let args = if closing_args.is_empty() { own_args.as_slice() } else { closing_args };
                Some(shape.dependencies_closed_over(args))
            }
            Implementation::Factory { calls } => calls.clone(),
            Implementation::Instance { .. } => Some(Vec::new()),
        }
    }

    /// Snapshot for export.
    pub fn snapshot(&self) -> DependencyGraph {
        DependencyGraph::from_graph(self)
    }
}

/// Picks the effective entry of one identity group and reports the others.
///
/// `entries` is sorted by insertion index and non-empty.
fn select_effective(entries: &[&Registration], diagnostics: &mut Vec<Diagnostic>) -> usize {
    let first_is_conditional = entries[0].is_conditional;

    let winner = if first_is_conditional {
        0
    } else {
        entries
            .iter()
            .rposition(|r| !r.is_conditional)
            .unwrap_or(0)
    };
    let effective = entries[winner];

    for (i, entry) in entries.iter().enumerate() {
        if i == winner {
            continue;
        }
        let diagnostic = if entry.is_conditional {
            Diagnostic::new(
                RuleId::TryAddIgnored,
                format!(
                    "{} for '{}' is ignored because it is already registered at {}",
                    entry.call_name(),
                    entry.service,
                    effective.location
                ),
                entry.location.clone(),
            )
        } else if first_is_conditional {
            Diagnostic::new(
                RuleId::DuplicateRegistration,
                format!(
                    "{} for '{}' has no effect; the earlier {} at {} wins",
                    entry.call_name(),
                    entry.service,
                    effective.call_name(),
                    effective.location
                ),
                entry.location.clone(),
            )
        } else {
            Diagnostic::new(
                RuleId::DuplicateRegistration,
                format!(
                    "{} for '{}' is overridden by the later {} at {}",
                    entry.call_name(),
                    entry.service,
                    effective.call_name(),
                    effective.location
                ),
                entry.location.clone(),
            )
        };
        diagnostics.push(diagnostic.with_related(effective.location.clone()));
    }

    winner
}
