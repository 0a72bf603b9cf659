use crate::controller::{ControllerError, QueryController};
use crate::settings::ExplorerSettings;
use crate::store::{ViewState, ViewStateStore};
use crossbeam_channel::Receiver;
use lineage_api::{ApiError, HttpLineageApi, LineageApi};
use lineage_core::{Entity, FilterPatch, Graph, NodeId, NodeKind, ViewLevel};
use lineage_events::{Event, EventBus, Notifier};
use lineage_graph::{
    ExportError, ExportFormat, ExportedImage, HitResult, HitTester, Minimap, NodeDetail, Vec2,
    Viewport, export_image,
};
use parking_lot::Mutex;
use std::sync::Arc;

type NodeClickCallback = Arc<dyn Fn(ViewLevel, &NodeDetail) + Send + Sync>;

/// The surface a host embeds: one lineage view per level, driven through
/// intents and observed through [`LineageExplorer::events`].
#[derive(Clone)]
pub struct LineageExplorer {
    settings: Arc<ExplorerSettings>,
    store: ViewStateStore,
    controller: QueryController,
    notifier: Notifier,
    active_level: Arc<Mutex<Option<ViewLevel>>>,
    node_click: Arc<Mutex<Option<NodeClickCallback>>>,
}

impl LineageExplorer {
    pub fn new(settings: ExplorerSettings, api: Arc<dyn LineageApi>) -> Self {
        let bus = EventBus::new();
        let notifier = Notifier::new(bus, settings.dedup_window());
        let store = ViewStateStore::new(settings.layout, settings.filters);
        let controller = QueryController::new(
            api,
            store.clone(),
            notifier.clone(),
            settings.search_debounce(),
        );
        Self {
            settings: Arc::new(settings),
            store,
            controller,
            notifier,
            active_level: Arc::new(Mutex::new(None)),
            node_click: Arc::new(Mutex::new(None)),
        }
    }

    /// Explorer backed by the REST API named in `settings`.
    pub fn with_http(settings: ExplorerSettings) -> Result<Self, ApiError> {
        let api = HttpLineageApi::new(
            settings.api.base_url.clone(),
            settings.api_timeout(),
            settings.api.search_limit,
        )?;
        Ok(Self::new(settings, Arc::new(api)))
    }

    pub fn settings(&self) -> &ExplorerSettings {
        &self.settings
    }

    pub fn store(&self) -> &ViewStateStore {
        &self.store
    }

    pub fn controller(&self) -> &QueryController {
        &self.controller
    }

    pub fn events(&self) -> Receiver<Event> {
        self.notifier.bus().receiver()
    }

    pub fn view(&self, level: ViewLevel) -> ViewState {
        self.store.get_view(level)
    }

    // View lifecycle

    /// Mounts the view for `level` on a surface of `surface_size` pixels. The
    /// first mounted view becomes active.
    pub fn mount_graph_view(&self, level: ViewLevel, surface_size: Vec2) {
        self.store.mount(level);
        self.store.set_surface(level, surface_size);
        let mut active = self.active_level.lock();
        if active.is_none() {
            *active = Some(level);
        }
    }

    pub fn unmount(&self, level: ViewLevel) {
        self.store.unmount(level);
        let mut active = self.active_level.lock();
        if *active == Some(level) {
            *active = self.store.mounted_levels().into_iter().next();
        }
    }

    pub fn resize(&self, level: ViewLevel, surface_size: Vec2) {
        self.store.set_surface(level, surface_size);
    }

    /// Switches the visible tab. Other levels keep their state and in-flight
    /// requests. Returns false when `level` is not mounted.
    pub fn set_active_level(&self, level: ViewLevel) -> bool {
        if !self.store.is_mounted(level) {
            tracing::warn!("Cannot activate {} view, it is not mounted", level);
            return false;
        }
        let changed = self.active_level.lock().replace(level) != Some(level);
        if changed {
            self.notifier.bus().publish(Event::ActiveLevelChanged { level });
        }
        true
    }

    pub fn active_level(&self) -> Option<ViewLevel> {
        *self.active_level.lock()
    }

    // Queries

    pub async fn select_entity(
        &self,
        level: ViewLevel,
        entity: &Entity,
    ) -> Result<Arc<Graph>, ControllerError> {
        self.controller.select_entity(level, entity).await
    }

    pub async fn set_filters(
        &self,
        level: ViewLevel,
        patch: FilterPatch,
    ) -> Result<bool, ControllerError> {
        self.controller.set_filters(level, patch).await
    }

    pub async fn search(&self, level: ViewLevel, text: &str) -> Result<Vec<Entity>, ControllerError> {
        self.controller.search(level, text).await
    }

    pub fn reset(&self, level: ViewLevel) {
        self.controller.reset(level);
    }

    // Interaction

    /// Highlights `node_id` and its neighbours. Returns false when there is no
    /// such node on screen.
    pub fn on_hover(&self, level: ViewLevel, node_id: &NodeId) -> bool {
        self.store
            .update_highlight(level, |graph, highlight| highlight.hover(graph, node_id))
            .unwrap_or(false)
    }

    pub fn on_hover_end(&self, level: ViewLevel) {
        self.store
            .update_highlight(level, |_, highlight| highlight.hover_end());
    }

    /// Selects `node_id`, publishes `NodeSelected` and hands its detail to the
    /// registered click callback.
    pub fn on_click(&self, level: ViewLevel, node_id: &NodeId) -> Option<NodeDetail> {
        let detail = self
            .store
            .update_highlight(level, |graph, highlight| highlight.click(graph, node_id))
            .flatten()?;

        self.notifier.bus().publish(Event::NodeSelected {
            level,
            node_id: node_id.clone(),
        });
        let callback = self.node_click.lock().clone();
        if let Some(callback) = callback {
            callback(level, &detail);
        }
        Some(detail)
    }

    pub fn on_node_click(&self, callback: impl Fn(ViewLevel, &NodeDetail) + Send + Sync + 'static) {
        *self.node_click.lock() = Some(Arc::new(callback));
    }

    /// Routes a pointer position in surface pixels: hovering over a node
    /// highlights it, anywhere else ends the hover.
    pub fn pointer_move(&self, level: ViewLevel, pos: Vec2) -> HitResult {
        let hit = self.hit_test(level, pos);
        match &hit {
            HitResult::Node(node_id) => {
                self.on_hover(level, node_id);
            }
            _ => self.on_hover_end(level),
        }
        hit
    }

    /// A click on a node selects it; a click on empty canvas or an edge drops
    /// the selection.
    pub fn pointer_click(&self, level: ViewLevel, pos: Vec2) -> Option<NodeDetail> {
        match self.hit_test(level, pos) {
            HitResult::Node(node_id) => self.on_click(level, &node_id),
            _ => {
                if self
                    .store
                    .update_highlight(level, |_, highlight| highlight.clear_selection())
                    .unwrap_or(false)
                {
                    tracing::debug!("Cleared {} selection", level);
                }
                None
            }
        }
    }

    fn hit_test(&self, level: ViewLevel, pos: Vec2) -> HitResult {
        self.store.viewport_mut(level, |viewport, render, hidden| {
            let Some(render) = render else {
                return HitResult::None;
            };
            let mut tester = HitTester::new();
            tester.update(render, hidden);
            tester.hit_test(viewport.screen_to_graph(pos))
        })
    }

    // Viewport

    pub fn zoom_in(&self, level: ViewLevel) {
        self.store.viewport_mut(level, |viewport, _, _| viewport.zoom_in());
    }

    pub fn zoom_out(&self, level: ViewLevel) {
        self.store.viewport_mut(level, |viewport, _, _| viewport.zoom_out());
    }

    /// Fits the visible graph into the surface.
    pub fn fit(&self, level: ViewLevel) {
        self.store.viewport_mut(level, |viewport, render, hidden| {
            if let Some(bounds) = render.and_then(|render| render.visible_bounds(hidden)) {
                viewport.fit(bounds, Viewport::FIT_PADDING);
            }
        });
    }

    pub fn reset_zoom(&self, level: ViewLevel) {
        self.store.viewport_mut(level, |viewport, _, _| viewport.reset());
    }

    pub fn pan_by(&self, level: ViewLevel, delta: Vec2) {
        self.store
            .viewport_mut(level, |viewport, _, _| viewport.pan_by(delta));
    }

    pub fn viewport(&self, level: ViewLevel) -> Viewport {
        self.store.get_view(level).viewport
    }

    /// Overview of the visible graph scaled into a `size` panel. `None` until
    /// something is visible.
    pub fn minimap(&self, level: ViewLevel, size: Vec2) -> Option<Minimap> {
        self.store.viewport_mut(level, |_, render, hidden| {
            let bounds = render?.visible_bounds(hidden)?;
            Some(Minimap::new(bounds, size))
        })
    }

    /// Click inside the overview panel: centres the main view on that spot.
    pub fn minimap_click(&self, level: ViewLevel, size: Vec2, pos: Vec2) -> bool {
        self.store.viewport_mut(level, |viewport, render, hidden| {
            let Some(bounds) = render.and_then(|render| render.visible_bounds(hidden)) else {
                return false;
            };
            Minimap::new(bounds, size).navigate(viewport, pos);
            true
        })
    }

    /// Legend toggle for a node category.
    pub fn set_kind_visible(&self, level: ViewLevel, kind: NodeKind, visible: bool) {
        if self.store.set_kind_visible(level, kind, visible) {
            tracing::debug!(
                "{} nodes {} in {} view",
                kind.label(),
                if visible { "shown" } else { "hidden" },
                level
            );
        }
    }

    // Export

    /// Exports the active view. With no view or no graph this only publishes a
    /// warning and returns `ExportError::NothingToExport`.
    pub fn export_image(&self, format: ExportFormat) -> Result<ExportedImage, ExportError> {
        let view = self
            .active_level()
            .and_then(|level| self.store.try_get_view(level));
        let result = match &view {
            Some(ViewState {
                render: Some(render),
                highlight,
                hidden_kinds,
                ..
            }) => export_image(render, highlight, hidden_kinds, format, &self.settings.export),
            _ => Err(ExportError::NothingToExport),
        };

        match &result {
            Ok(image) => {
                tracing::info!(
                    "Exported {} ({} bytes)",
                    image.suggested_file_name,
                    image.bytes.len()
                );
                self.notifier.bus().publish(Event::ExportCompleted {
                    file_name: image.suggested_file_name.clone(),
                    byte_count: image.bytes.len(),
                });
                self.notifier
                    .success(format!("Graph exported as {}", format.extension().to_uppercase()));
            }
            Err(ExportError::NothingToExport) => {
                tracing::debug!("Export requested with no graph on screen");
                self.notifier.warning("There is no graph to export yet");
            }
            Err(err) => {
                tracing::error!("Export failed: {}", err);
                self.notifier.error(format!("Export failed: {err}"));
            }
        }
        result
    }
}
