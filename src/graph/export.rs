//! Graph export for visualization and tooling.
//!
//! A [`DependencyGraph`] is a plain, serializable snapshot of a
//! [`RegistrationGraph`]: one node per effective registration and one edge per
//! dependency that lands on a registered service. It can be rendered as JSON,
//! YAML, Graphviz DOT or Mermaid, and read back from JSON.

use std::collections::BTreeMap;
use std::fmt::Write as _;

use serde::{Deserialize, Serialize};

use crate::error::{AnalysisError, AnalysisResult};
use crate::graph::{Edge, RegistrationGraph};

/// A node in the exported graph.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphNode {
    /// Stable identifier, unique within one export
    pub id: String,
    /// Display name of the service identity
    pub service: String,
    /// Description of the implementation
    pub implementation: String,
    /// Service lifetime (Singleton, Scoped, Transient)
    pub lifetime: String,
    pub is_open_generic: bool,
    /// Additional details such as the registration site
    #[serde(default)]
    pub metadata: BTreeMap<String, String>,
}

/// A dependency between two exported nodes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphEdge {
    /// Consumer node
    pub from: String,
    /// Dependency node
    pub to: String,
    pub dependency_type: DependencyType,
}

/// How a consumer asks for its dependency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DependencyType {
    /// Required single dependency
    Required,
    /// Optional dependency (might not be present)
    Optional,
    /// All registrations of the service
    Multiple,
}

impl DependencyType {
    fn of(edge: &Edge) -> Self {
        if edge.dependency.is_enumerable {
            DependencyType::Multiple
        } else if edge.dependency.has_default_or_optional {
            DependencyType::Optional
        } else {
            DependencyType::Required
        }
    }
}

/// Summary counts for an exported graph.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphMetadata {
    pub service_count: usize,
    pub singleton_count: usize,
    pub scoped_count: usize,
    pub transient_count: usize,
    pub open_generic_count: usize,
    /// Export format version
    pub version: String,
}

/// Serializable snapshot of a registration graph.
///
/// # Examples
///
/// ```rust
/// use ferrous_di_analyzer::{RegistrationGraph, ServiceCollection, TypeRef};
/// use ferrous_di_analyzer::graph::{DefaultGraphExporter, ExportFormat, GraphExporter};
///
/// let mut services = ServiceCollection::new();
/// services.add_scoped(TypeRef::closed("IOrders"), TypeRef::closed("Orders"));
/// let facts = services.build();
/// let (graph, _) = RegistrationGraph::build(&facts.registrations, &facts.type_shapes);
///
/// let dot = DefaultGraphExporter.export(&graph.snapshot(), ExportFormat::Dot).unwrap();
/// assert!(dot.starts_with("digraph DependencyGraph {"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DependencyGraph {
    pub nodes: Vec<GraphNode>,
    pub edges: Vec<GraphEdge>,
    pub metadata: GraphMetadata,
}

fn node_id(ix: usize) -> String {
    format!("service_{}", ix)
}

impl DependencyGraph {
    pub(crate) fn from_graph(graph: &RegistrationGraph) -> Self {
        let mut metadata = GraphMetadata {
            service_count: graph.node_count(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            ..GraphMetadata::default()
        };

        let nodes = graph
            .nodes()
            .iter()
            .map(|node| {
                match node.lifetime() {
                    crate::Lifetime::Singleton => metadata.singleton_count += 1,
                    crate::Lifetime::Scoped => metadata.scoped_count += 1,
                    crate::Lifetime::Transient => metadata.transient_count += 1,
                }
                if node.is_open_generic() {
                    metadata.open_generic_count += 1;
                }

                let mut meta = BTreeMap::new();
                meta.insert("location".to_string(), node.registration.location.to_string());
                meta.insert("call".to_string(), node.registration.call_name());
                if node.entries.len() > 1 {
                    meta.insert("registrations".to_string(), node.entries.len().to_string());
                }

                GraphNode {
                    id: node_id(node.ix),
                    service: node.identity().to_string(),
                    implementation: node.registration.implementation.describe(),
                    lifetime: node.lifetime().to_string(),
                    is_open_generic: node.is_open_generic(),
                    metadata: meta,
                }
            })
            .collect();

        let edges = graph
            .edges()
            .iter()
            .map(|edge| GraphEdge {
                from: node_id(edge.from),
                to: node_id(edge.to),
                dependency_type: DependencyType::of(edge),
            })
            .collect();

        DependencyGraph { nodes, edges, metadata }
    }

    /// Reads a graph previously exported as JSON.
    pub fn from_json(text: &str) -> AnalysisResult<Self> {
        serde_json::from_str(text)
            .map_err(|e| AnalysisError::InvalidFacts(format!("graph export: {}", e)))
    }
}

/// Export formats supported for dependency graphs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    /// JSON format for web UIs and APIs
    Json,
    /// YAML format for human-readable output
    Yaml,
    /// DOT format for Graphviz visualization
    Dot,
    /// Mermaid format for documentation
    Mermaid,
}

/// Renders dependency graphs.
pub trait GraphExporter {
    /// Exports the dependency graph in the specified format.
    fn export(&self, graph: &DependencyGraph, format: ExportFormat) -> AnalysisResult<String>;
}

/// Exporter for the built-in formats.
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultGraphExporter;

impl GraphExporter for DefaultGraphExporter {
    fn export(&self, graph: &DependencyGraph, format: ExportFormat) -> AnalysisResult<String> {
        match format {
            ExportFormat::Json => Ok(serde_json::to_string_pretty(graph)?),
            ExportFormat::Yaml => Ok(serde_yaml::to_string(graph)?),
            ExportFormat::Dot => Ok(self.export_dot(graph)),
            ExportFormat::Mermaid => Ok(self.export_mermaid(graph)),
        }
    }
}

fn escape_label(text: &str) -> String {
    text.replace('\\', "\\\\").replace('"', "\\\"")
}

impl DefaultGraphExporter {
    fn export_dot(&self, graph: &DependencyGraph) -> String {
        let mut output = String::new();
        output.push_str("digraph DependencyGraph {\n");
        output.push_str("  rankdir=TB;\n");
        output.push_str("  node [shape=box];\n\n");

        for node in &graph.nodes {
            let shape = if node.is_open_generic { "ellipse" } else { "box" };
            let color = match node.lifetime.as_str() {
                "Singleton" => "lightblue",
                "Scoped" => "lightgreen",
                "Transient" => "lightyellow",
                _ => "white",
            };
            let _ = writeln!(
                output,
                "  \"{}\" [label=\"{}\\n({})\", shape={}, fillcolor={}, style=filled];",
                node.id,
                escape_label(&node.service),
                node.lifetime,
                shape,
                color
            );
        }

        output.push('\n');

        for edge in &graph.edges {
            let style = match edge.dependency_type {
                DependencyType::Required => "solid",
                DependencyType::Optional => "dashed",
                DependencyType::Multiple => "bold",
            };
            let _ = writeln!(output, "  \"{}\" -> \"{}\" [style={}];", edge.from, edge.to, style);
        }

        output.push_str("}\n");
        output
    }

    fn export_mermaid(&self, graph: &DependencyGraph) -> String {
        let mut output = String::new();
        output.push_str("graph TD\n");

        for node in &graph.nodes {
            // Mermaid treats angle brackets as markup
            let label = node.service.replace('<', "&lt;").replace('>', "&gt;");
            if node.is_open_generic {
                let _ = writeln!(output, "  {}(\"{}\")", node.id, label);
            } else {
                let _ = writeln!(output, "  {}[\"{}\"]", node.id, label);
            }
        }

        for edge in &graph.edges {
            let arrow = match edge.dependency_type {
                DependencyType::Optional => "-.->",
                DependencyType::Multiple => "==>",
                DependencyType::Required => "-->",
            };
            let _ = writeln!(output, "  {} {} {}", edge.from, arrow, edge.to);
        }

        output.push_str("\n  classDef singleton fill:#e1f5fe\n");
        output.push_str("  classDef scoped fill:#e8f5e8\n");
        output.push_str("  classDef transient fill:#fff3e0\n");

        for node in &graph.nodes {
            let class = match node.lifetime.as_str() {
                "Singleton" => "singleton",
                "Scoped" => "scoped",
                "Transient" => "transient",
                _ => continue,
            };
            let _ = writeln!(output, "  class {} {}", node.id, class);
        }

        output
    }
}
