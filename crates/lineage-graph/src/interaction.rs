use lineage_core::{EdgeKey, Graph, Node, NodeId};
use serde::Serialize;
use std::collections::BTreeSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeVisual {
    Normal,
    Highlighted,
    Dimmed,
    Selected,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EdgeVisual {
    Normal,
    Highlighted,
    Dimmed,
}

/// What the detail panel shows for a clicked node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NodeDetail {
    pub node: Node,
    /// Display names of nodes with an edge into this one, in edge order.
    pub upstream: Vec<String>,
    /// Display names of nodes this one has an edge into, in edge order.
    pub downstream: Vec<String>,
}

/// Builds the detail for `node_id`, or `None` if it is not in `graph`.
pub fn node_detail(graph: &Graph, node_id: &NodeId) -> Option<NodeDetail> {
    let node = graph.node(node_id)?.clone();
    let mut upstream: Vec<String> = Vec::new();
    let mut downstream: Vec<String> = Vec::new();

    for (_, edge) in graph.incident_edges(node_id) {
        if &edge.target_id == node_id
            && let Some(source) = graph.node(&edge.source_id)
            && !upstream.contains(&source.display_name)
        {
            upstream.push(source.display_name.clone());
        }
        if &edge.source_id == node_id
            && let Some(target) = graph.node(&edge.target_id)
            && !downstream.contains(&target.display_name)
        {
            downstream.push(target.display_name.clone());
        }
    }

    Some(NodeDetail {
        node,
        upstream,
        downstream,
    })
}

/// Hover and selection state of one view. Purely visual: it never touches
/// the graph it was computed from.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HighlightState {
    active_node: Option<NodeId>,
    highlighted_nodes: BTreeSet<NodeId>,
    highlighted_edges: BTreeSet<EdgeKey>,
    selected_node: Option<NodeId>,
}

impl HighlightState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Highlights `node_id` and its one-edge neighbourhood. Returns false and
    /// leaves the state untouched when the node is not in `graph`.
    pub fn hover(&mut self, graph: &Graph, node_id: &NodeId) -> bool {
        if !graph.contains(node_id) {
            return false;
        }
        if self.active_node.as_ref() == Some(node_id) {
            return true;
        }

        self.highlighted_nodes.clear();
        self.highlighted_edges.clear();
        self.highlighted_nodes.insert(node_id.clone());
        for (index, edge) in graph.incident_edges(node_id) {
            self.highlighted_nodes.insert(edge.source_id.clone());
            self.highlighted_nodes.insert(edge.target_id.clone());
            self.highlighted_edges.insert(EdgeKey::new(edge, index));
        }
        self.active_node = Some(node_id.clone());
        true
    }

    pub fn hover_end(&mut self) {
        self.active_node = None;
        self.highlighted_nodes.clear();
        self.highlighted_edges.clear();
    }

    /// Selects `node_id` and returns its detail.
    pub fn click(&mut self, graph: &Graph, node_id: &NodeId) -> Option<NodeDetail> {
        let detail = node_detail(graph, node_id)?;
        self.selected_node = Some(node_id.clone());
        Some(detail)
    }

    /// Drops the selected node and keeps any hover highlight.
    pub fn clear_selection(&mut self) -> bool {
        self.selected_node.take().is_some()
    }

    /// Forgets hover and selection, as after a graph replace.
    pub fn clear(&mut self) {
        *self = Self::default();
    }

    pub fn is_hovering(&self) -> bool {
        self.active_node.is_some()
    }

    pub fn active_node(&self) -> Option<&NodeId> {
        self.active_node.as_ref()
    }

    pub fn selected_node(&self) -> Option<&NodeId> {
        self.selected_node.as_ref()
    }

    pub fn highlighted_nodes(&self) -> &BTreeSet<NodeId> {
        &self.highlighted_nodes
    }

    pub fn highlighted_edges(&self) -> &BTreeSet<EdgeKey> {
        &self.highlighted_edges
    }

    pub fn visual(&self, node_id: &NodeId) -> NodeVisual {
        if self.selected_node.as_ref() == Some(node_id) {
            return NodeVisual::Selected;
        }
        if !self.is_hovering() {
            return NodeVisual::Normal;
        }
        if self.highlighted_nodes.contains(node_id) {
            NodeVisual::Highlighted
        } else {
            NodeVisual::Dimmed
        }
    }

    pub fn edge_visual(&self, key: &EdgeKey) -> EdgeVisual {
        if !self.is_hovering() {
            return EdgeVisual::Normal;
        }
        if self.highlighted_edges.contains(key) {
            EdgeVisual::Highlighted
        } else {
            EdgeVisual::Dimmed
        }
    }
}
