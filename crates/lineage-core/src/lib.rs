use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use thiserror::Error;

pub mod entity;
pub mod filters;

pub use entity::{Entity, SelectedEntity};
pub use filters::{Direction, FilterPatch, GraphFilters, ViewLevel};

/// Identifier of a lineage node. Backend ids may be numeric; they are kept as
/// their decimal string form so table and column ids share one type.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(pub String);

impl NodeId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(&self.0)
    }
}

impl From<&str> for NodeId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for NodeId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<i64> for NodeId {
    fn from(value: i64) -> Self {
        Self(value.to_string())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    Table,
    Column,
}

impl NodeKind {
    pub const ALL: [NodeKind; 2] = [NodeKind::Table, NodeKind::Column];

    /// Parses the backend `type` field. Returns `None` for anything that is
    /// neither a table nor a column.
    pub fn from_type_name(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "table" => Some(NodeKind::Table),
            "column" | "field" => Some(NodeKind::Column),
            _ => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            NodeKind::Table => "table",
            NodeKind::Column => "column",
        }
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum EdgeKind {
    /// Data flows from source to target.
    #[default]
    Lineage,
    /// A table contains a column.
    Containment,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Node {
    pub id: NodeId,
    pub display_name: String,
    pub kind: NodeKind,
    #[serde(default)]
    pub schema_name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub sample_value: Option<String>,
    #[serde(default)]
    pub data_source: Option<String>,
    #[serde(default)]
    pub data_source_type: Option<String>,
    #[serde(default)]
    pub is_focal: bool,
}

impl Node {
    pub fn new(id: impl Into<NodeId>, display_name: impl Into<String>, kind: NodeKind) -> Self {
        Self {
            id: id.into(),
            display_name: display_name.into(),
            kind,
            schema_name: None,
            description: None,
            sample_value: None,
            data_source: None,
            data_source_type: None,
            is_focal: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Edge {
    pub source_id: NodeId,
    pub target_id: NodeId,
    pub relation_label: String,
    #[serde(default)]
    pub kind: EdgeKind,
}

impl Edge {
    pub fn new(
        source_id: impl Into<NodeId>,
        target_id: impl Into<NodeId>,
        relation_label: impl Into<String>,
    ) -> Self {
        Self {
            source_id: source_id.into(),
            target_id: target_id.into(),
            relation_label: relation_label.into(),
            kind: EdgeKind::Lineage,
        }
    }

    pub fn touches(&self, id: &NodeId) -> bool {
        &self.source_id == id || &self.target_id == id
    }
}

/// Key that identifies one edge of a graph, stable even for parallel edges.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EdgeKey(pub String);

impl EdgeKey {
    pub fn new(edge: &Edge, index: usize) -> Self {
        Self(format!("{}->{}#{}", edge.source_id, edge.target_id, index))
    }
}

impl fmt::Display for EdgeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ModelError {
    #[error("duplicate node id {0}")]
    DuplicateNode(NodeId),
    #[error("edge {source_id} -> {target_id} references a node that is not in the graph")]
    DanglingEdge { source_id: NodeId, target_id: NodeId },
    #[error("invalid direction: {0}")]
    InvalidDirection(String),
    #[error("invalid view level: {0}")]
    InvalidLevel(String),
}

/// An immutable lineage graph. Every edge references nodes of the same graph.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Graph {
    nodes: Vec<Node>,
    edges: Vec<Edge>,
    #[serde(skip)]
    index: HashMap<NodeId, usize>,
}

impl Graph {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn new(nodes: Vec<Node>, edges: Vec<Edge>) -> Result<Self, ModelError> {
        let mut index = HashMap::with_capacity(nodes.len());
        for (i, node) in nodes.iter().enumerate() {
            if index.insert(node.id.clone(), i).is_some() {
                return Err(ModelError::DuplicateNode(node.id.clone()));
            }
        }
        for edge in &edges {
            if !index.contains_key(&edge.source_id) || !index.contains_key(&edge.target_id) {
                return Err(ModelError::DanglingEdge {
                    source_id: edge.source_id.clone(),
                    target_id: edge.target_id.clone(),
                });
            }
        }
        Ok(Self {
            nodes,
            edges,
            index,
        })
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn node(&self, id: &NodeId) -> Option<&Node> {
        self.index.get(id).map(|&i| &self.nodes[i])
    }

    pub fn node_index(&self, id: &NodeId) -> Option<usize> {
        self.index.get(id).copied()
    }

    pub fn contains(&self, id: &NodeId) -> bool {
        self.index.contains_key(id)
    }

    pub fn focal(&self) -> Option<&Node> {
        self.nodes.iter().find(|n| n.is_focal)
    }

    pub fn edge_key(&self, index: usize) -> Option<EdgeKey> {
        self.edges.get(index).map(|e| EdgeKey::new(e, index))
    }

    /// Edges with `id` as source or target, paired with their index.
    pub fn incident_edges<'a>(
        &'a self,
        id: &'a NodeId,
    ) -> impl Iterator<Item = (usize, &'a Edge)> + 'a {
        self.edges
            .iter()
            .enumerate()
            .filter(move |(_, e)| e.touches(id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_node_id_display_honours_width() {
        assert_eq!(format!("{:>5}|", NodeId::from("ab")), "   ab|");
        assert_eq!(format!("{:<4}|", NodeId::from(7_i64)), "7   |");
        assert_eq!(format!("{:.3}", NodeId::from("orders")), "ord");
        assert_eq!(NodeId::from("orders").to_string(), "orders");
    }

    #[test]
    fn test_graph_rejects_dangling_edges() {
        let nodes = vec![Node::new("t1", "orders", NodeKind::Table)];
        let edges = vec![Edge::new("t1", "t2", "etl")];
        let err = Graph::new(nodes, edges).unwrap_err();
        assert!(matches!(err, ModelError::DanglingEdge { .. }));
    }

    #[test]
    fn test_graph_rejects_duplicate_nodes() {
        let nodes = vec![
            Node::new("t1", "orders", NodeKind::Table),
            Node::new("t1", "orders_v2", NodeKind::Table),
        ];
        assert_eq!(
            Graph::new(nodes, vec![]).unwrap_err(),
            ModelError::DuplicateNode(NodeId::from("t1"))
        );
    }

    #[test]
    fn test_incident_edges_include_both_directions() {
        let nodes = vec![
            Node::new("t1", "a", NodeKind::Table),
            Node::new("t2", "b", NodeKind::Table),
            Node::new("t3", "c", NodeKind::Table),
        ];
        let edges = vec![
            Edge::new("t2", "t1", "etl"),
            Edge::new("t1", "t3", "etl"),
            Edge::new("t2", "t3", "etl"),
        ];
        let graph = Graph::new(nodes, edges).unwrap();
        let id = NodeId::from("t1");
        let incident: Vec<usize> = graph.incident_edges(&id).map(|(i, _)| i).collect();
        assert_eq!(incident, vec![0, 1]);
    }

    #[test]
    fn test_node_id_serializes_as_plain_string() {
        let json = serde_json::to_string(&NodeId::from(42_i64)).unwrap();
        assert_eq!(json, "\"42\"");
    }

    #[test]
    fn test_node_kind_parsing_is_case_insensitive() {
        assert_eq!(NodeKind::from_type_name("TABLE"), Some(NodeKind::Table));
        assert_eq!(NodeKind::from_type_name(" column "), Some(NodeKind::Column));
        assert_eq!(NodeKind::from_type_name("view"), None);
    }
}
