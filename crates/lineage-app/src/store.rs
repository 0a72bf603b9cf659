use lineage_core::{Entity, FilterPatch, Graph, GraphFilters, NodeKind, SelectedEntity, ViewLevel};
use lineage_graph::{HighlightState, LayeredLayouter, LayoutConfig, RenderModel, Vec2, Viewport};
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

/// Everything one graph view shows. Cloning is cheap; the graph and its
/// layout are shared.
#[derive(Debug, Clone)]
pub struct ViewState {
    pub selected_entity: Option<SelectedEntity>,
    pub graph: Option<Arc<Graph>>,
    pub render: Option<Arc<RenderModel>>,
    pub is_loading: bool,
    pub search_text: String,
    pub search_results: Vec<Entity>,
    pub filters: GraphFilters,
    pub highlight: HighlightState,
    pub hidden_kinds: HashSet<NodeKind>,
    pub viewport: Viewport,
    load_seq: u64,
    search_seq: u64,
}

impl ViewState {
    fn new(filters: GraphFilters) -> Self {
        Self {
            selected_entity: None,
            graph: None,
            render: None,
            is_loading: false,
            search_text: String::new(),
            search_results: Vec::new(),
            filters,
            highlight: HighlightState::new(),
            hidden_kinds: HashSet::new(),
            viewport: Viewport::default(),
            load_seq: 0,
            search_seq: 0,
        }
    }

    pub fn has_graph(&self) -> bool {
        self.graph.is_some()
    }

    fn fit_viewport(&mut self) {
        if let Some(bounds) = self
            .render
            .as_deref()
            .and_then(|render| render.visible_bounds(&self.hidden_kinds))
        {
            self.viewport.fit(bounds, Viewport::FIT_PADDING);
        }
    }
}

/// Per-level view state. Levels never share state; a write to one level
/// leaves every other level untouched.
#[derive(Clone)]
pub struct ViewStateStore {
    levels: Arc<Mutex<HashMap<ViewLevel, ViewState>>>,
    layouter: Arc<LayeredLayouter>,
    default_filters: GraphFilters,
    // Shared across levels so a remounted level never reuses an old number.
    next_seq: Arc<AtomicU64>,
}

impl Default for ViewStateStore {
    fn default() -> Self {
        Self::new(LayoutConfig::default(), GraphFilters::default())
    }
}

impl ViewStateStore {
    pub fn new(layout: LayoutConfig, default_filters: GraphFilters) -> Self {
        Self {
            levels: Arc::new(Mutex::new(HashMap::new())),
            layouter: Arc::new(LayeredLayouter::new(layout)),
            default_filters,
            next_seq: Arc::new(AtomicU64::new(1)),
        }
    }

    /// Creates the level's state. Returns false if it was already mounted, in
    /// which case its state is kept.
    pub fn mount(&self, level: ViewLevel) -> bool {
        let mut levels = self.levels.lock();
        if levels.contains_key(&level) {
            return false;
        }
        tracing::debug!("Mounting {} view", level);
        levels.insert(level, ViewState::new(self.default_filters));
        true
    }

    pub fn unmount(&self, level: ViewLevel) -> bool {
        tracing::debug!("Unmounting {} view", level);
        self.levels.lock().remove(&level).is_some()
    }

    pub fn is_mounted(&self, level: ViewLevel) -> bool {
        self.levels.lock().contains_key(&level)
    }

    pub fn mounted_levels(&self) -> Vec<ViewLevel> {
        let levels = self.levels.lock();
        ViewLevel::ALL
            .into_iter()
            .filter(|level| levels.contains_key(level))
            .collect()
    }

    /// Snapshot of the level's state.
    pub fn get_view(&self, level: ViewLevel) -> ViewState {
        self.with_level(level, |state| state.clone())
    }

    pub fn try_get_view(&self, level: ViewLevel) -> Option<ViewState> {
        self.levels.lock().get(&level).cloned()
    }

    /// Replaces the level's graph, lays it out and clears any highlight.
    pub fn set_graph(&self, level: ViewLevel, graph: Arc<Graph>) -> Arc<RenderModel> {
        let render = Arc::new(self.layouter.layout(&graph));
        self.with_level(level, |state| {
            install_graph(state, graph, render.clone());
        });
        render
    }

    pub fn set_loading(&self, level: ViewLevel, loading: bool) {
        self.with_level(level, |state| state.is_loading = loading);
    }

    /// Merges `patch` into the level's filters. Returns whether anything changed.
    pub fn set_filters(&self, level: ViewLevel, patch: &FilterPatch) -> bool {
        self.with_level(level, |state| state.filters.apply(patch))
    }

    pub fn set_search(&self, level: ViewLevel, text: impl Into<String>, results: Vec<Entity>) {
        let text = text.into();
        self.with_level(level, |state| {
            state.search_text = text;
            state.search_results = results;
        });
    }

    pub fn set_search_text(&self, level: ViewLevel, text: impl Into<String>) {
        let text = text.into();
        self.with_level(level, |state| state.search_text = text);
    }

    /// Makes `entity` the level's focus. The search box shows its label, the
    /// result list closes and pending searches can no longer reopen it.
    pub fn select_entity(&self, level: ViewLevel, entity: &Entity) -> SelectedEntity {
        let selected = SelectedEntity::from(entity);
        let search_seq = self.bump_seq();
        self.with_level(level, |state| {
            state.search_text = selected.label.clone();
            state.search_results.clear();
            state.selected_entity = Some(selected.clone());
            state.search_seq = search_seq;
        });
        selected
    }

    /// Clears graph, selection, search, highlight and loading. Pending requests
    /// for the level can no longer write to it.
    pub fn reset(&self, level: ViewLevel) {
        let load_seq = self.bump_seq();
        let search_seq = self.bump_seq();
        self.with_level(level, |state| {
            state.selected_entity = None;
            state.graph = None;
            state.render = None;
            state.is_loading = false;
            state.search_text.clear();
            state.search_results.clear();
            state.highlight.clear();
            state.viewport.reset();
            state.load_seq = load_seq;
            state.search_seq = search_seq;
        });
    }

    /// Runs `f` against the level's graph and highlight. `None` when no graph
    /// is loaded.
    pub fn update_highlight<R>(
        &self,
        level: ViewLevel,
        f: impl FnOnce(&Graph, &mut HighlightState) -> R,
    ) -> Option<R> {
        self.with_level(level, |state| {
            let graph = state.graph.clone()?;
            Some(f(&graph, &mut state.highlight))
        })
    }

    /// Shows or hides a node kind. Returns whether visibility changed.
    pub fn set_kind_visible(&self, level: ViewLevel, kind: NodeKind, visible: bool) -> bool {
        self.with_level(level, |state| {
            if visible {
                state.hidden_kinds.remove(&kind)
            } else {
                state.hidden_kinds.insert(kind)
            }
        })
    }

    pub fn viewport_mut<R>(
        &self,
        level: ViewLevel,
        f: impl FnOnce(&mut Viewport, Option<&RenderModel>, &HashSet<NodeKind>) -> R,
    ) -> R {
        self.with_level(level, |state| {
            let render = state.render.clone();
            f(&mut state.viewport, render.as_deref(), &state.hidden_kinds)
        })
    }

    pub fn set_surface(&self, level: ViewLevel, surface: Vec2) {
        self.with_level(level, |state| {
            state.viewport.set_surface(surface);
            state.fit_viewport();
        });
    }

    /// Starts a graph request: the level is loading and only `seq` may finish it.
    pub(crate) fn begin_load(&self, level: ViewLevel) -> u64 {
        let seq = self.bump_seq();
        self.with_level(level, |state| {
            state.load_seq = seq;
            state.is_loading = true;
        });
        seq
    }

    pub(crate) fn is_current_load(&self, level: ViewLevel, seq: u64) -> bool {
        self.levels
            .lock()
            .get(&level)
            .is_some_and(|state| state.load_seq == seq)
    }

    /// Ends request `seq`, installing `graph` if given. A superseded request,
    /// or one whose level was unmounted meanwhile, writes nothing and returns
    /// false.
    pub(crate) fn finish_load(&self, level: ViewLevel, seq: u64, graph: Option<Arc<Graph>>) -> bool {
        if !self.is_current_load(level, seq) {
            return false;
        }
        let render = graph
            .as_ref()
            .map(|graph| Arc::new(self.layouter.layout(graph)));

        let mut levels = self.levels.lock();
        let Some(state) = levels.get_mut(&level) else {
            return false;
        };
        if state.load_seq != seq {
            return false;
        }
        if let (Some(graph), Some(render)) = (graph, render) {
            install_graph(state, graph, render);
        }
        state.is_loading = false;
        true
    }

    pub(crate) fn begin_search(&self, level: ViewLevel) -> u64 {
        let seq = self.bump_seq();
        self.with_level(level, |state| state.search_seq = seq);
        seq
    }

    pub(crate) fn is_current_search(&self, level: ViewLevel, seq: u64) -> bool {
        self.levels
            .lock()
            .get(&level)
            .is_some_and(|state| state.search_seq == seq)
    }

    pub(crate) fn finish_search(&self, level: ViewLevel, seq: u64, results: Vec<Entity>) -> bool {
        let mut levels = self.levels.lock();
        match levels.get_mut(&level) {
            Some(state) if state.search_seq == seq => {
                state.search_results = results;
                true
            }
            _ => false,
        }
    }

    fn bump_seq(&self) -> u64 {
        self.next_seq.fetch_add(1, Ordering::Relaxed)
    }

    fn with_level<R>(&self, level: ViewLevel, f: impl FnOnce(&mut ViewState) -> R) -> R {
        let mut levels = self.levels.lock();
        let Some(state) = levels.get_mut(&level) else {
            panic!("{level} view is not mounted");
        };
        f(state)
    }
}

fn install_graph(state: &mut ViewState, graph: Arc<Graph>, render: Arc<RenderModel>) {
    state.graph = Some(graph);
    state.render = Some(render);
    state.highlight.clear();
    state.fit_viewport();
}
