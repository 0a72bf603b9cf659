#![allow(dead_code)]

use async_trait::async_trait;
use lineage_api::{ApiError, BackendGraphPayload, GraphQuery, LineageApi, RawEdge, RawId, RawNode};
use lineage_core::{Entity, NodeId, NodeKind};
use lineage_events::Event;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq)]
pub struct GraphCall {
    pub kind: NodeKind,
    pub entity_id: NodeId,
    pub query: GraphQuery,
}

/// In-memory backend with canned answers and per-entity latency.
#[derive(Default)]
pub struct ScriptedApi {
    graphs: Mutex<HashMap<String, Result<BackendGraphPayload, ApiError>>>,
    graph_delays: Mutex<HashMap<String, Duration>>,
    searches: Mutex<HashMap<String, Result<Vec<Entity>, ApiError>>>,
    search_delays: Mutex<HashMap<String, Duration>>,
    graph_calls: Mutex<Vec<GraphCall>>,
    search_calls: Mutex<Vec<String>>,
}

impl ScriptedApi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_graph(self, entity_id: &str, payload: BackendGraphPayload) -> Self {
        self.graphs.lock().insert(entity_id.to_string(), Ok(payload));
        self
    }

    pub fn with_graph_error(self, entity_id: &str, error: ApiError) -> Self {
        self.graphs.lock().insert(entity_id.to_string(), Err(error));
        self
    }

    pub fn with_graph_delay(self, entity_id: &str, delay: Duration) -> Self {
        self.graph_delays.lock().insert(entity_id.to_string(), delay);
        self
    }

    pub fn with_search(self, query: &str, results: Vec<Entity>) -> Self {
        self.searches.lock().insert(query.to_string(), Ok(results));
        self
    }

    pub fn with_search_error(self, query: &str, error: ApiError) -> Self {
        self.searches.lock().insert(query.to_string(), Err(error));
        self
    }

    pub fn with_search_delay(self, query: &str, delay: Duration) -> Self {
        self.search_delays.lock().insert(query.to_string(), delay);
        self
    }

    pub fn graph_calls(&self) -> Vec<GraphCall> {
        self.graph_calls.lock().clone()
    }

    pub fn search_calls(&self) -> Vec<String> {
        self.search_calls.lock().clone()
    }
}

#[async_trait]
impl LineageApi for ScriptedApi {
    async fn fetch_lineage_graph(
        &self,
        kind: NodeKind,
        entity_id: &NodeId,
        query: &GraphQuery,
    ) -> Result<BackendGraphPayload, ApiError> {
        self.graph_calls.lock().push(GraphCall {
            kind,
            entity_id: entity_id.clone(),
            query: *query,
        });
        let delay = self.graph_delays.lock().get(entity_id.as_str()).copied();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        self.graphs
            .lock()
            .get(entity_id.as_str())
            .cloned()
            .unwrap_or_else(|| Err(ApiError::Status {
                status: 404,
                message: format!("no lineage for {entity_id}"),
            }))
    }

    async fn search_entities(
        &self,
        _kind: NodeKind,
        partial_name: &str,
    ) -> Result<Vec<Entity>, ApiError> {
        self.search_calls.lock().push(partial_name.to_string());
        let delay = self.search_delays.lock().get(partial_name).copied();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        self.searches
            .lock()
            .get(partial_name)
            .cloned()
            .unwrap_or_else(|| Ok(Vec::new()))
    }
}

pub fn table(id: &str, name: &str) -> RawNode {
    RawNode::new(RawId::Text(id.to_string()), name, "table")
}

pub fn column(id: &str, name: &str) -> RawNode {
    RawNode::new(RawId::Text(id.to_string()), name, "column")
}

pub fn edge(source: &str, target: &str, relation: &str) -> RawEdge {
    RawEdge::new(
        RawId::Text(source.to_string()),
        RawId::Text(target.to_string()),
        Some(relation),
    )
}

pub fn payload(nodes: Vec<RawNode>, edges: Vec<RawEdge>) -> BackendGraphPayload {
    BackendGraphPayload { nodes, edges }
}

/// `t2 -> t1 -> t3` around the orders table.
pub fn orders_payload() -> BackendGraphPayload {
    payload(
        vec![
            table("t1", "orders"),
            table("t2", "raw_orders"),
            table("t3", "orders_daily"),
        ],
        vec![edge("t2", "t1", "clean"), edge("t1", "t3", "aggregate")],
    )
}

pub fn node_ids(graph: &lineage_core::Graph) -> Vec<String> {
    let mut ids: Vec<String> = graph.nodes().iter().map(|n| n.id.0.clone()).collect();
    ids.sort();
    ids
}

pub fn drain(rx: &crossbeam_channel::Receiver<Event>) -> Vec<Event> {
    rx.try_iter().collect()
}
