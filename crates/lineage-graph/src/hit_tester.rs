use crate::layout::RenderModel;
use crate::{Rect, Vec2};
use lineage_core::{EdgeKey, NodeId, NodeKind};
use std::collections::HashSet;

/// Result of a hit test at a given position.
///
/// Priority order: Node > Edge > None
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HitResult {
    /// Nothing was hit at the tested position.
    None,
    Node(NodeId),
    Edge(EdgeKey),
}

/// Spatial index of the visible part of a [`RenderModel`], in graph
/// coordinates.
#[derive(Debug, Clone)]
pub struct HitTester {
    /// Node rects in draw order; later entries are on top.
    node_rects: Vec<(NodeId, Rect)>,
    edge_paths: Vec<(EdgeKey, Vec<Vec2>)>,
    /// Default tolerance (in graph units) for edge hit testing.
    edge_tolerance: f32,
}

impl Default for HitTester {
    fn default() -> Self {
        Self::new()
    }
}

impl HitTester {
    pub fn new() -> Self {
        Self {
            node_rects: Vec::new(),
            edge_paths: Vec::new(),
            edge_tolerance: 6.0,
        }
    }

    pub fn with_tolerance(tolerance: f32) -> Self {
        Self {
            edge_tolerance: tolerance,
            ..Self::new()
        }
    }

    pub fn edge_tolerance(&self) -> f32 {
        self.edge_tolerance
    }

    /// Rebuilds hit regions. Call after every layout pass or visibility change.
    pub fn update(&mut self, model: &RenderModel, hidden: &HashSet<NodeKind>) {
        self.node_rects = model
            .visible_nodes(hidden)
            .map(|n| (n.node.id.clone(), n.rect()))
            .collect();
        self.edge_paths = model
            .visible_edges(hidden)
            .map(|e| (e.key.clone(), e.path.clone()))
            .collect();
    }

    pub fn clear(&mut self) {
        self.node_rects.clear();
        self.edge_paths.clear();
    }

    pub fn hit_test(&self, pos: Vec2) -> HitResult {
        if let Some(node_id) = self.hit_test_node(pos) {
            return HitResult::Node(node_id);
        }
        if let Some(key) = self.hit_test_edge(pos, self.edge_tolerance) {
            return HitResult::Edge(key);
        }
        HitResult::None
    }

    pub fn hit_test_node(&self, pos: Vec2) -> Option<NodeId> {
        self.node_rects
            .iter()
            .rev()
            .find(|(_, rect)| rect.contains(pos))
            .map(|(id, _)| id.clone())
    }

    /// Closest edge within `tolerance` of `pos`.
    pub fn hit_test_edge(&self, pos: Vec2, tolerance: f32) -> Option<EdgeKey> {
        let mut best: Option<(&EdgeKey, f32)> = None;
        for (key, path) in &self.edge_paths {
            let distance = path
                .windows(2)
                .map(|w| distance_to_segment(pos, w[0], w[1]))
                .fold(f32::INFINITY, f32::min);
            if distance <= tolerance && best.is_none_or(|(_, d)| distance < d) {
                best = Some((key, distance));
            }
        }
        best.map(|(key, _)| key.clone())
    }
}

fn distance_to_segment(p: Vec2, a: Vec2, b: Vec2) -> f32 {
    let ab = b.sub(a);
    let len_sq = ab.x * ab.x + ab.y * ab.y;
    if len_sq == 0.0 {
        return p.sub(a).length();
    }
    let ap = p.sub(a);
    let t = ((ap.x * ab.x + ap.y * ab.y) / len_sq).clamp(0.0, 1.0);
    p.sub(a.add(ab.scale(t))).length()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::LayeredLayouter;
    use lineage_core::{Edge, Graph, Node};

    fn model() -> RenderModel {
        let nodes = vec![
            Node::new("t", "orders", NodeKind::Table),
            Node::new("c", "orders.id", NodeKind::Column),
        ];
        let edges = vec![Edge::new("t", "c", "contains")];
        LayeredLayouter::default().layout(&Graph::new(nodes, edges).unwrap())
    }

    #[test]
    fn test_node_centre_hits_node() {
        let model = model();
        let mut tester = HitTester::new();
        tester.update(&model, &HashSet::new());

        let table = model.node(&NodeId::from("t")).unwrap();
        assert_eq!(
            tester.hit_test(table.center()),
            HitResult::Node(NodeId::from("t"))
        );
    }

    #[test]
    fn test_edge_midpoint_hits_edge() {
        let model = model();
        let mut tester = HitTester::new();
        tester.update(&model, &HashSet::new());

        let edge = &model.edges[0];
        assert_eq!(
            tester.hit_test(edge.label_position()),
            HitResult::Edge(edge.key.clone())
        );
        assert_eq!(tester.hit_test(Vec2::new(0.0, 500.0)), HitResult::None);
    }

    #[test]
    fn test_hidden_kind_is_not_hit() {
        let model = model();
        let mut tester = HitTester::new();
        tester.update(&model, &HashSet::from([NodeKind::Column]));

        let column = model.node(&NodeId::from("c")).unwrap();
        assert_eq!(tester.hit_test(column.center()), HitResult::None);
        // The edge into the hidden column is culled with it.
        assert_eq!(tester.hit_test(model.edges[0].label_position()), HitResult::None);
    }
}
