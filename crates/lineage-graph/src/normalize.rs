use lineage_api::{BackendGraphPayload, RawEdge, RawNode};
use lineage_core::{Edge, EdgeKind, Graph, Node, NodeId, NodeKind};
use std::collections::HashMap;

const CONTAINMENT_EDGE_TYPE: &str = "table_column_relation";
const CONTAINMENT_RELATION: &str = "contains";
const DEFAULT_RELATION_LABEL: &str = "lineage";

/// A payload defect that was repaired or skipped while normalizing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DataQualityWarning {
    /// `type` was missing or not a table/column; the node was kept as a table.
    UnknownNodeKind {
        node_id: NodeId,
        type_name: Option<String>,
    },
    /// An edge pointed at a node id that is not in the payload and was dropped.
    DanglingEdge { source_id: NodeId, target_id: NodeId },
    /// The same id appeared more than once; the last record won.
    DuplicateNode { node_id: NodeId },
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NormalizationReport {
    pub warnings: Vec<DataQualityWarning>,
}

impl NormalizationReport {
    pub fn is_clean(&self) -> bool {
        self.warnings.is_empty()
    }

    pub fn dangling_edges(&self) -> usize {
        self.warnings
            .iter()
            .filter(|w| matches!(w, DataQualityWarning::DanglingEdge { .. }))
            .count()
    }

    pub fn unknown_kinds(&self) -> usize {
        self.warnings
            .iter()
            .filter(|w| matches!(w, DataQualityWarning::UnknownNodeKind { .. }))
            .count()
    }

    pub fn duplicate_nodes(&self) -> usize {
        self.warnings
            .iter()
            .filter(|w| matches!(w, DataQualityWarning::DuplicateNode { .. }))
            .count()
    }

    /// One line describing every kind of defect found, or `None` when clean.
    pub fn summary(&self) -> Option<String> {
        if self.is_clean() {
            return None;
        }
        let mut parts = Vec::new();
        let dangling = self.dangling_edges();
        if dangling > 0 {
            parts.push(format!("{dangling} edge(s) referenced missing nodes"));
        }
        let unknown = self.unknown_kinds();
        if unknown > 0 {
            parts.push(format!("{unknown} node(s) had an unknown type"));
        }
        let duplicates = self.duplicate_nodes();
        if duplicates > 0 {
            parts.push(format!("{duplicates} duplicate node record(s)"));
        }
        Some(format!("Lineage data was incomplete: {}", parts.join("; ")))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Normalized {
    pub graph: Graph,
    pub report: NormalizationReport,
}

/// Converts a backend payload into a valid [`Graph`].
///
/// Node ids are stringified, duplicate nodes collapse onto the first
/// occurrence's slot with the last record's data, and edges whose endpoints
/// are missing are dropped. Never fails; defects are listed in the report.
pub fn normalize(raw: &BackendGraphPayload, focal: Option<&NodeId>) -> Normalized {
    let mut report = NormalizationReport::default();
    let mut nodes: Vec<Node> = Vec::with_capacity(raw.nodes.len());
    let mut positions: HashMap<NodeId, usize> = HashMap::with_capacity(raw.nodes.len());

    for raw_node in &raw.nodes {
        let node = normalize_node(raw_node, &mut report);
        match positions.get(&node.id) {
            Some(&pos) => {
                tracing::debug!("Duplicate node {} in payload, keeping last record", node.id);
                report.warnings.push(DataQualityWarning::DuplicateNode {
                    node_id: node.id.clone(),
                });
                nodes[pos] = node;
            }
            None => {
                positions.insert(node.id.clone(), nodes.len());
                nodes.push(node);
            }
        }
    }

    if let Some(focal) = focal
        && let Some(&pos) = positions.get(focal)
    {
        nodes[pos].is_focal = true;
    }

    let mut edges = Vec::with_capacity(raw.edges.len());
    for raw_edge in &raw.edges {
        let source_id = NodeId::from(&raw_edge.source);
        let target_id = NodeId::from(&raw_edge.target);
        if !positions.contains_key(&source_id) || !positions.contains_key(&target_id) {
            tracing::warn!(
                "Dropping edge {} -> {}: endpoint missing from payload",
                source_id,
                target_id
            );
            report.warnings.push(DataQualityWarning::DanglingEdge {
                source_id,
                target_id,
            });
            continue;
        }
        edges.push(normalize_edge(raw_edge, source_id, target_id));
    }

    let graph = Graph::new(nodes, edges).unwrap_or_else(|err| {
        tracing::error!("Normalized graph failed validation: {}", err);
        Graph::empty()
    });

    Normalized { graph, report }
}

fn normalize_node(raw: &RawNode, report: &mut NormalizationReport) -> Node {
    let id = NodeId::from(&raw.id);
    let kind = match raw.node_type.as_deref().and_then(NodeKind::from_type_name) {
        Some(kind) => kind,
        None => {
            tracing::warn!(
                "Node {} has unknown type {:?}, treating it as a table",
                id,
                raw.node_type
            );
            report.warnings.push(DataQualityWarning::UnknownNodeKind {
                node_id: id.clone(),
                type_name: raw.node_type.clone(),
            });
            NodeKind::Table
        }
    };

    let display_name = non_blank(raw.name.as_deref())
        .or_else(|| non_blank(raw.label.as_deref()))
        .map(str::to_string)
        .unwrap_or_else(|| id.to_string());

    let mut node = Node::new(id, display_name, kind);
    node.schema_name = raw.schema_name.clone();
    node.description = raw.description.clone();
    node.sample_value = raw.sample_value.clone();
    node.data_source = raw.data_source.clone();
    node.data_source_type = raw.data_source_type.clone();
    node
}

fn normalize_edge(raw: &RawEdge, source_id: NodeId, target_id: NodeId) -> Edge {
    let relation = non_blank(raw.relation_type.as_deref());
    let edge_type = non_blank(raw.edge_type.as_deref());

    let is_containment = edge_type == Some(CONTAINMENT_EDGE_TYPE)
        || relation.is_some_and(|r| r.eq_ignore_ascii_case(CONTAINMENT_RELATION));

    let relation_label = relation.or(edge_type).unwrap_or(DEFAULT_RELATION_LABEL);

    let mut edge = Edge::new(source_id, target_id, relation_label);
    if is_containment {
        edge.kind = EdgeKind::Containment;
    }
    edge
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}
