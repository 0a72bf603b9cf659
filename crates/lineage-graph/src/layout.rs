use crate::{Rect, Vec2};
use lineage_core::{Edge, EdgeKey, Graph, Node, NodeId, NodeKind};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// Geometry of the layered layout. Spacings are gaps between node boxes.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutConfig {
    pub node_width: f32,
    pub node_height: f32,
    /// Horizontal gap between neighbouring ranks.
    pub rank_spacing: f32,
    /// Vertical gap between nodes of one rank.
    pub node_spacing: f32,
    /// Number of down+up barycenter sweeps.
    pub sweeps: usize,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            node_width: 140.0,
            node_height: 70.0,
            rank_spacing: 200.0,
            node_spacing: 120.0,
            sweeps: 4,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RenderNode {
    pub node: Node,
    /// Centre of the node box.
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub rank: usize,
    pub order: usize,
}

impl RenderNode {
    pub fn center(&self) -> Vec2 {
        Vec2::new(self.x, self.y)
    }

    pub fn rect(&self) -> Rect {
        Rect::from_center_size(self.center(), self.width, self.height)
    }

    pub fn kind(&self) -> NodeKind {
        self.node.kind
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RenderEdge {
    pub key: EdgeKey,
    pub edge: Edge,
    pub path: Vec<Vec2>,
    /// The edge closes a cycle and was ignored for ranking. It is still drawn
    /// from source to target.
    pub reversed: bool,
}

impl RenderEdge {
    /// Midpoint of the polyline, where the relation label is drawn.
    pub fn label_position(&self) -> Vec2 {
        let total: f32 = self
            .path
            .windows(2)
            .map(|w| w[1].sub(w[0]).length())
            .sum();
        let mut remaining = total / 2.0;
        for w in self.path.windows(2) {
            let segment = w[1].sub(w[0]);
            let len = segment.length();
            if len >= remaining && len > 0.0 {
                return w[0].add(segment.scale(remaining / len));
            }
            remaining -= len;
        }
        self.path.first().copied().unwrap_or_default()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RenderModel {
    pub nodes: Vec<RenderNode>,
    pub edges: Vec<RenderEdge>,
    pub bounds: Rect,
    #[serde(skip)]
    index: HashMap<NodeId, usize>,
}

impl RenderModel {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn node(&self, id: &NodeId) -> Option<&RenderNode> {
        self.index.get(id).map(|&i| &self.nodes[i])
    }

    /// Bounds of the nodes and edges that remain once `hidden` kinds are culled.
    pub fn visible_bounds(&self, hidden: &HashSet<NodeKind>) -> Option<Rect> {
        let mut bounds: Option<Rect> = None;
        for node in self.nodes.iter().filter(|n| !hidden.contains(&n.kind())) {
            let rect = node.rect();
            bounds = Some(match bounds {
                Some(existing) => existing.union(&rect),
                None => rect,
            });
        }
        let mut bounds = bounds?;
        for edge in self.visible_edges(hidden) {
            for point in &edge.path {
                bounds = bounds.include_point(*point);
            }
        }
        Some(bounds)
    }

    pub fn visible_nodes<'a>(
        &'a self,
        hidden: &'a HashSet<NodeKind>,
    ) -> impl Iterator<Item = &'a RenderNode> + 'a {
        self.nodes.iter().filter(move |n| !hidden.contains(&n.kind()))
    }

    /// Edges whose endpoints are both visible.
    pub fn visible_edges<'a>(
        &'a self,
        hidden: &'a HashSet<NodeKind>,
    ) -> impl Iterator<Item = &'a RenderEdge> + 'a {
        self.edges.iter().filter(move |e| {
            let visible = |id: &NodeId| {
                self.node(id)
                    .is_some_and(|n| !hidden.contains(&n.kind()))
            };
            visible(&e.edge.source_id) && visible(&e.edge.target_id)
        })
    }
}

/// Left-to-right layered (Sugiyama style) layout.
///
/// Cycles are broken with a greedy feedback-arc-set ordering, ranks come from
/// longest paths over the remaining DAG, and each rank is ordered by
/// barycenter sweeps. Output depends only on the graph's node and edge order.
#[derive(Debug, Clone, Default)]
pub struct LayeredLayouter {
    config: LayoutConfig,
}

impl LayeredLayouter {
    /// Vertical distance between parallel edges of the same node pair.
    const FAN_STEP: f32 = 12.0;
    /// How far a self loop bulges out of its node.
    const LOOP_EXTENT: f32 = 30.0;

    pub fn new(config: LayoutConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &LayoutConfig {
        &self.config
    }

    pub fn layout(&self, graph: &Graph) -> RenderModel {
        let n = graph.node_count();
        if n == 0 {
            return RenderModel::empty();
        }

        let endpoints = Self::edge_endpoints(graph);
        let order = greedy_fas_order(n, &endpoints);
        let mut position = vec![0usize; n];
        for (pos, &node) in order.iter().enumerate() {
            position[node] = pos;
        }

        // Orient every non-loop edge along the FAS order; edges that had to be
        // flipped are the back edges.
        let mut reversed = vec![false; endpoints.len()];
        let mut dag_edges = Vec::with_capacity(endpoints.len());
        for (i, &(s, t)) in endpoints.iter().enumerate() {
            if s == t {
                continue;
            }
            if position[s] > position[t] {
                reversed[i] = true;
                dag_edges.push((t, s));
            } else {
                dag_edges.push((s, t));
            }
        }

        let mut ranks = Self::assign_ranks(n, &order, &dag_edges);
        Self::compress_ranks(&mut ranks);
        let mut layers = Self::build_layers(&ranks);
        self.run_barycenter_passes(&mut layers, n, &dag_edges);

        let centers = self.place_nodes(&layers, n);
        let mut nodes = Vec::with_capacity(n);
        let mut slots = vec![(0usize, 0usize); n];
        for (rank, layer) in layers.iter().enumerate() {
            for (slot, &node) in layer.iter().enumerate() {
                slots[node] = (rank, slot);
            }
        }
        for (i, node) in graph.nodes().iter().enumerate() {
            let (rank, order) = slots[i];
            nodes.push(RenderNode {
                node: node.clone(),
                x: centers[i].x,
                y: centers[i].y,
                width: self.config.node_width,
                height: self.config.node_height,
                rank,
                order,
            });
        }

        let edges = self.route_edges(graph, &endpoints, &reversed, &nodes);

        let mut bounds = nodes[0].rect();
        for node in &nodes[1..] {
            bounds = bounds.union(&node.rect());
        }
        for edge in &edges {
            for point in &edge.path {
                bounds = bounds.include_point(*point);
            }
        }

        let index = nodes
            .iter()
            .enumerate()
            .map(|(i, n)| (n.node.id.clone(), i))
            .collect();

        RenderModel {
            nodes,
            edges,
            bounds,
            index,
        }
    }

    fn edge_endpoints(graph: &Graph) -> Vec<(usize, usize)> {
        graph
            .edges()
            .iter()
            .filter_map(|e| {
                let s = graph.node_index(&e.source_id)?;
                let t = graph.node_index(&e.target_id)?;
                Some((s, t))
            })
            .collect()
    }

    /// Longest-path ranks. `order` is a topological order of `dag_edges`.
    fn assign_ranks(n: usize, order: &[usize], dag_edges: &[(usize, usize)]) -> Vec<usize> {
        let mut successors: Vec<Vec<usize>> = vec![Vec::new(); n];
        for &(s, t) in dag_edges {
            successors[s].push(t);
        }
        let mut ranks = vec![0usize; n];
        for &node in order {
            for &next in &successors[node] {
                if ranks[next] <= ranks[node] {
                    ranks[next] = ranks[node] + 1;
                }
            }
        }
        ranks
    }

    fn compress_ranks(ranks: &mut [usize]) {
        if ranks.is_empty() {
            return;
        }

        let mut unique_ranks: Vec<usize> = ranks.to_vec();
        unique_ranks.sort_unstable();
        unique_ranks.dedup();

        let remap: HashMap<usize, usize> = unique_ranks
            .iter()
            .enumerate()
            .map(|(i, rank)| (*rank, i))
            .collect();

        for rank in ranks.iter_mut() {
            if let Some(new_rank) = remap.get(rank) {
                *rank = *new_rank;
            }
        }
    }

    /// Nodes grouped by rank, each layer in input order.
    fn build_layers(ranks: &[usize]) -> Vec<Vec<usize>> {
        let rank_count = ranks.iter().copied().max().map_or(0, |r| r + 1);
        let mut layers: Vec<Vec<usize>> = vec![Vec::new(); rank_count];
        for (node, &rank) in ranks.iter().enumerate() {
            layers[rank].push(node);
        }
        layers
    }

    fn order_layer_by_barycenter(
        layer_nodes: &mut [usize],
        layer_coords: &[f32],
        neighbors: &[Vec<usize>],
    ) {
        let barycenters: HashMap<usize, f32> = layer_nodes
            .iter()
            .map(|&node| {
                let adjacent = &neighbors[node];
                let barycenter = if adjacent.is_empty() {
                    layer_coords[node]
                } else {
                    adjacent.iter().map(|&n| layer_coords[n]).sum::<f32>() / adjacent.len() as f32
                };
                (node, barycenter)
            })
            .collect();

        // `sort_by` is stable, so ties keep their current order.
        layer_nodes.sort_by(|a, b| {
            barycenters[a]
                .partial_cmp(&barycenters[b])
                .unwrap_or(std::cmp::Ordering::Equal)
        });
    }

    fn run_barycenter_passes(
        &self,
        layers: &mut [Vec<usize>],
        n: usize,
        dag_edges: &[(usize, usize)],
    ) {
        let mut incoming: Vec<Vec<usize>> = vec![Vec::new(); n];
        let mut outgoing: Vec<Vec<usize>> = vec![Vec::new(); n];
        for &(s, t) in dag_edges {
            incoming[t].push(s);
            outgoing[s].push(t);
        }

        let mut layer_coords = vec![0.0f32; n];
        let sync_coords = |layer: &[usize], coords: &mut [f32]| {
            for (j, &node) in layer.iter().enumerate() {
                coords[node] = j as f32;
            }
        };
        for layer in layers.iter() {
            sync_coords(layer, &mut layer_coords);
        }

        for _ in 0..self.config.sweeps {
            for rank in 1..layers.len() {
                Self::order_layer_by_barycenter(&mut layers[rank], &layer_coords, &incoming);
                sync_coords(&layers[rank], &mut layer_coords);
            }

            for rank in (0..layers.len().saturating_sub(1)).rev() {
                Self::order_layer_by_barycenter(&mut layers[rank], &layer_coords, &outgoing);
                sync_coords(&layers[rank], &mut layer_coords);
            }
        }
    }

    fn rank_x(&self, rank: usize, rank_count: usize) -> f32 {
        let step = self.config.node_width + self.config.rank_spacing;
        let span = rank_count.saturating_sub(1) as f32 * step;
        rank as f32 * step - span / 2.0
    }

    fn place_nodes(&self, layers: &[Vec<usize>], n: usize) -> Vec<Vec2> {
        let mut centers = vec![Vec2::ZERO; n];
        let step = self.config.node_height + self.config.node_spacing;
        for (rank, layer) in layers.iter().enumerate() {
            let extent = layer.len() as f32 * self.config.node_height
                + layer.len().saturating_sub(1) as f32 * self.config.node_spacing;
            let start = -extent / 2.0 + self.config.node_height / 2.0;
            let x = self.rank_x(rank, layers.len());
            for (order, &node) in layer.iter().enumerate() {
                centers[node] = Vec2::new(x, start + order as f32 * step);
            }
        }
        centers
    }

    fn route_edges(
        &self,
        graph: &Graph,
        endpoints: &[(usize, usize)],
        reversed: &[bool],
        nodes: &[RenderNode],
    ) -> Vec<RenderEdge> {
        let rank_count = nodes.iter().map(|n| n.rank).max().map_or(1, |r| r + 1);

        // Parallel edges between the same pair, in either direction, share a fan.
        let mut pair_totals: HashMap<(usize, usize), usize> = HashMap::new();
        for &(s, t) in endpoints {
            *pair_totals.entry((s.min(t), s.max(t))).or_default() += 1;
        }
        let mut pair_seen: HashMap<(usize, usize), usize> = HashMap::new();

        let max_offset = (self.config.node_height / 2.0 - 4.0).max(0.0);
        let half_width = self.config.node_width / 2.0;

        endpoints
            .iter()
            .enumerate()
            .map(|(i, &(s, t))| {
                let pair = (s.min(t), s.max(t));
                let total = pair_totals[&pair];
                let seen = pair_seen.entry(pair).or_default();
                let slot = *seen;
                *seen += 1;
                let offset = ((slot as f32 - (total as f32 - 1.0) / 2.0) * Self::FAN_STEP)
                    .clamp(-max_offset, max_offset);

                let source = &nodes[s];
                let target = &nodes[t];
                let path = if s == t {
                    self.self_loop(source, offset)
                } else {
                    let forward = source.x <= target.x;
                    let (start_x, end_x) = if forward {
                        (source.x + half_width, target.x - half_width)
                    } else {
                        (source.x - half_width, target.x + half_width)
                    };
                    let start = Vec2::new(start_x, source.y + offset);
                    let end = Vec2::new(end_x, target.y + offset);

                    let mut path = vec![start];
                    let (lo, hi) = (source.rank.min(target.rank), source.rank.max(target.rank));
                    let mut between: Vec<usize> = (lo + 1..hi).collect();
                    if !forward {
                        between.reverse();
                    }
                    for rank in between {
                        let x = self.rank_x(rank, rank_count);
                        let frac = if end.x == start.x {
                            0.5
                        } else {
                            (x - start.x) / (end.x - start.x)
                        };
                        path.push(Vec2::new(x, start.y + (end.y - start.y) * frac));
                    }
                    path.push(end);
                    path
                };

                let edge = &graph.edges()[i];
                RenderEdge {
                    key: EdgeKey::new(edge, i),
                    edge: edge.clone(),
                    path,
                    reversed: reversed[i],
                }
            })
            .collect()
    }

    fn self_loop(&self, node: &RenderNode, offset: f32) -> Vec<Vec2> {
        let right = node.x + node.width / 2.0;
        let top = node.y - node.height / 2.0;
        let bulge = Self::LOOP_EXTENT + offset.abs();
        vec![
            Vec2::new(right, node.y + offset),
            Vec2::new(right + bulge, node.y + offset),
            Vec2::new(right + bulge, top - bulge),
            Vec2::new(node.x, top - bulge),
            Vec2::new(node.x, top),
        ]
    }
}

/// Greedy feedback-arc-set ordering (Eades, Lin and Smyth).
///
/// Sinks are peeled to the back, sources to the front, and otherwise the node
/// with the largest out-degree minus in-degree goes to the front. Edges that
/// point backwards in the returned order form the feedback set. Ties resolve
/// to the lowest node index.
fn greedy_fas_order(n: usize, edges: &[(usize, usize)]) -> Vec<usize> {
    let mut out_deg = vec![0i64; n];
    let mut in_deg = vec![0i64; n];
    let mut successors: Vec<Vec<usize>> = vec![Vec::new(); n];
    let mut predecessors: Vec<Vec<usize>> = vec![Vec::new(); n];
    for &(s, t) in edges {
        if s == t {
            continue;
        }
        out_deg[s] += 1;
        in_deg[t] += 1;
        successors[s].push(t);
        predecessors[t].push(s);
    }

    let mut active = vec![true; n];
    let mut remaining = n;
    let mut front = Vec::with_capacity(n);
    let mut back = Vec::new();

    let remove = |node: usize,
                      active: &mut Vec<bool>,
                      out_deg: &mut Vec<i64>,
                      in_deg: &mut Vec<i64>| {
        active[node] = false;
        for &p in &predecessors[node] {
            if active[p] {
                out_deg[p] -= 1;
            }
        }
        for &s in &successors[node] {
            if active[s] {
                in_deg[s] -= 1;
            }
        }
    };

    while remaining > 0 {
        loop {
            let Some(sink) = (0..n).find(|&i| active[i] && out_deg[i] == 0) else {
                break;
            };
            remove(sink, &mut active, &mut out_deg, &mut in_deg);
            remaining -= 1;
            back.push(sink);
        }

        loop {
            let Some(source) = (0..n).find(|&i| active[i] && in_deg[i] == 0) else {
                break;
            };
            remove(source, &mut active, &mut out_deg, &mut in_deg);
            remaining -= 1;
            front.push(source);
        }

        let best = (0..n)
            .filter(|&i| active[i])
            .max_by(|&a, &b| {
                (out_deg[a] - in_deg[a])
                    .cmp(&(out_deg[b] - in_deg[b]))
                    .then(b.cmp(&a))
            });
        if let Some(node) = best {
            remove(node, &mut active, &mut out_deg, &mut in_deg);
            remaining -= 1;
            front.push(node);
        }
    }

    back.reverse();
    front.extend(back);
    front
}
