use crate::store::ViewStateStore;
use lineage_api::{ApiError, GraphQuery, LineageApi};
use lineage_core::{Entity, FilterPatch, Graph, GraphFilters, NodeId, ViewLevel};
use lineage_events::{Event, Notifier};
use lineage_graph::normalize;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ControllerError {
    #[error("{0}")]
    Fetch(#[from] ApiError),
    /// A newer request for the same level (or a reset) took over.
    #[error("request was superseded by a newer one")]
    Superseded,
}

impl ControllerError {
    pub fn is_superseded(&self) -> bool {
        matches!(self, ControllerError::Superseded)
    }
}

/// Turns user intents into backend requests and writes the answers into the
/// store. Within a level the newest request wins; levels never wait on each
/// other.
#[derive(Clone)]
pub struct QueryController {
    api: Arc<dyn LineageApi>,
    store: ViewStateStore,
    notifier: Notifier,
    debounce: Duration,
}

impl QueryController {
    pub fn new(
        api: Arc<dyn LineageApi>,
        store: ViewStateStore,
        notifier: Notifier,
        debounce: Duration,
    ) -> Self {
        Self {
            api,
            store,
            notifier,
            debounce,
        }
    }

    pub fn store(&self) -> &ViewStateStore {
        &self.store
    }

    /// Fetches and installs the lineage graph around `entity_id`.
    ///
    /// On failure the previous graph stays in place and an error notification
    /// is published. An empty answer is stored and reported as `GraphEmpty`.
    pub async fn load_graph(
        &self,
        level: ViewLevel,
        entity_id: NodeId,
        filters: GraphFilters,
    ) -> Result<Arc<Graph>, ControllerError> {
        let pending = PendingLoad::begin(&self.store, level);
        let seq = pending.seq;
        let query = GraphQuery::from(&filters);
        tracing::debug!(
            "Loading {} lineage for {} (seq {}, depth {}, direction {})",
            level,
            entity_id,
            seq,
            query.depth,
            query.direction
        );
        self.notifier.bus().publish(Event::GraphLoading {
            level,
            entity_id: entity_id.clone(),
        });

        let result = self
            .api
            .fetch_lineage_graph(level.entity_kind(), &entity_id, &query)
            .await;

        let payload = match result {
            Ok(payload) => payload,
            Err(err) => {
                if !pending.finish(None) {
                    tracing::warn!("Dropping failed {} load {}, superseded: {}", level, seq, err);
                    return Err(ControllerError::Superseded);
                }
                tracing::error!("Failed to load {} lineage for {}: {}", level, entity_id, err);
                self.notifier
                    .error(format!("Failed to load lineage graph: {err}"));
                return Err(ControllerError::Fetch(err));
            }
        };

        let normalized = normalize(&payload, Some(&entity_id));
        for warning in &normalized.report.warnings {
            tracing::warn!("Data quality issue in {} lineage: {:?}", level, warning);
        }
        let graph = Arc::new(normalized.graph);

        if !pending.finish(Some(graph.clone())) {
            tracing::warn!("Discarding stale {} graph response (seq {})", level, seq);
            return Err(ControllerError::Superseded);
        }

        if let Some(summary) = normalized.report.summary() {
            self.notifier.warning(summary);
        }
        if graph.is_empty() {
            tracing::debug!("{} lineage for {} is empty", level, entity_id);
            self.notifier.bus().publish(Event::GraphEmpty { level });
        } else {
            self.notifier.bus().publish(Event::GraphLoaded {
                level,
                node_count: graph.node_count(),
                edge_count: graph.edge_count(),
            });
        }
        Ok(graph)
    }

    /// Debounced entity search. Only the newest search of a level writes
    /// results; older ones resolve to `Superseded` without touching the store.
    pub async fn search(&self, level: ViewLevel, text: &str) -> Result<Vec<Entity>, ControllerError> {
        self.store.set_search_text(level, text);
        let seq = self.store.begin_search(level);

        let query = text.trim();
        if query.is_empty() {
            self.store.finish_search(level, seq, Vec::new());
            return Ok(Vec::new());
        }

        tokio::time::sleep(self.debounce).await;
        if !self.store.is_current_search(level, seq) {
            tracing::debug!("Search {:?} debounced away", query);
            return Err(ControllerError::Superseded);
        }

        tracing::debug!("Searching {} entities for {:?} (seq {})", level, query, seq);
        match self.api.search_entities(level.entity_kind(), query).await {
            Ok(results) => {
                if !self.store.finish_search(level, seq, results.clone()) {
                    tracing::warn!("Discarding stale search results for {:?}", query);
                    return Err(ControllerError::Superseded);
                }
                self.notifier.bus().publish(Event::SearchComplete {
                    level,
                    query: query.to_string(),
                    result_count: results.len(),
                });
                Ok(results)
            }
            Err(err) => {
                if !self.store.is_current_search(level, seq) {
                    return Err(ControllerError::Superseded);
                }
                tracing::error!("Search for {:?} failed: {}", query, err);
                self.notifier.error(format!("Search failed: {err}"));
                Err(ControllerError::Fetch(err))
            }
        }
    }

    /// Applies a filter change. When the filters actually changed and an
    /// entity is selected, reloads that level once. Returns whether anything
    /// changed.
    pub async fn set_filters(
        &self,
        level: ViewLevel,
        patch: FilterPatch,
    ) -> Result<bool, ControllerError> {
        if !self.store.set_filters(level, &patch) {
            return Ok(false);
        }
        let view = self.store.get_view(level);
        if let Some(selected) = view.selected_entity {
            self.load_graph(level, selected.id, view.filters).await?;
        }
        Ok(true)
    }

    /// Focuses the level on `entity` and loads its lineage with the level's
    /// current filters.
    pub async fn select_entity(
        &self,
        level: ViewLevel,
        entity: &Entity,
    ) -> Result<Arc<Graph>, ControllerError> {
        let selected = self.store.select_entity(level, entity);
        let filters = self.store.get_view(level).filters;
        self.load_graph(level, selected.id, filters).await
    }

    pub fn reset(&self, level: ViewLevel) {
        self.store.reset(level);
        self.notifier.bus().publish(Event::GraphReset { level });
    }
}

/// An outstanding graph request. Dropping it unfinished (the caller gave up
/// on the future) ends the request without installing anything, so the level
/// does not stay in the loading state.
struct PendingLoad {
    store: ViewStateStore,
    level: ViewLevel,
    seq: u64,
    finished: bool,
}

impl PendingLoad {
    fn begin(store: &ViewStateStore, level: ViewLevel) -> Self {
        Self {
            store: store.clone(),
            level,
            seq: store.begin_load(level),
            finished: false,
        }
    }

    fn finish(mut self, graph: Option<Arc<Graph>>) -> bool {
        self.finished = true;
        self.store.finish_load(self.level, self.seq, graph)
    }
}

impl Drop for PendingLoad {
    fn drop(&mut self) {
        if !self.finished && self.store.finish_load(self.level, self.seq, None) {
            tracing::debug!("Abandoned {} load {}", self.level, self.seq);
        }
    }
}
