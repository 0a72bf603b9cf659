use crate::{Rect, Vec2, Viewport};
use serde::{Deserialize, Serialize};

/// Overview projection of a whole graph into a small fixed-size panel.
///
/// `minimap = graph * scale + offset`, with the graph bounds centred in the
/// panel and their aspect ratio kept.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Minimap {
    pub bounds: Rect,
    pub size: Vec2,
    pub scale: f32,
    pub offset: Vec2,
}

impl Minimap {
    pub const DEFAULT_SIZE: Vec2 = Vec2 { x: 200.0, y: 140.0 };

    pub fn new(bounds: Rect, size: Vec2) -> Self {
        let scale = if bounds.width() <= 0.0 || bounds.height() <= 0.0 {
            1.0
        } else {
            (size.x / bounds.width()).min(size.y / bounds.height())
        };
        Self {
            bounds,
            size,
            scale,
            offset: size.scale(0.5).sub(bounds.center().scale(scale)),
        }
    }

    pub fn to_minimap(&self, graph: Vec2) -> Vec2 {
        graph.scale(self.scale).add(self.offset)
    }

    pub fn to_graph(&self, minimap: Vec2) -> Vec2 {
        minimap.sub(self.offset).scale(1.0 / self.scale)
    }

    /// The part of the graph the viewport currently shows, in panel coordinates.
    pub fn viewport_rect(&self, viewport: &Viewport) -> Rect {
        let top_left = viewport.screen_to_graph(Vec2::ZERO);
        let bottom_right = viewport.screen_to_graph(viewport.surface);
        Rect::new(self.to_minimap(top_left), self.to_minimap(bottom_right))
    }

    /// Centres `viewport` on the graph point under `pos` without changing zoom.
    pub fn navigate(&self, viewport: &mut Viewport, pos: Vec2) {
        viewport.center_on(self.to_graph(pos));
    }
}
