pub mod export;
pub mod hit_tester;
pub mod interaction;
pub mod layout;
pub mod minimap;
pub mod normalize;
pub mod style;
pub mod viewport;

mod raster;
mod svg;

pub use export::{ExportError, ExportFormat, ExportOptions, ExportedImage, export_image};
pub use hit_tester::{HitResult, HitTester};
pub use interaction::{EdgeVisual, HighlightState, NodeDetail, NodeVisual, node_detail};
pub use layout::{LayeredLayouter, LayoutConfig, RenderEdge, RenderModel, RenderNode};
pub use minimap::Minimap;
pub use normalize::{DataQualityWarning, NormalizationReport, Normalized, normalize};
pub use viewport::Viewport;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Vec2 {
    pub x: f32,
    pub y: f32,
}

impl Vec2 {
    pub const ZERO: Vec2 = Vec2 { x: 0.0, y: 0.0 };

    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn add(self, other: Vec2) -> Vec2 {
        Vec2::new(self.x + other.x, self.y + other.y)
    }

    pub fn sub(self, other: Vec2) -> Vec2 {
        Vec2::new(self.x - other.x, self.y - other.y)
    }

    pub fn scale(self, factor: f32) -> Vec2 {
        Vec2::new(self.x * factor, self.y * factor)
    }

    pub fn length(self) -> f32 {
        (self.x * self.x + self.y * self.y).sqrt()
    }
}

/// Axis-aligned rectangle in graph coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Rect {
    pub min: Vec2,
    pub max: Vec2,
}

impl Rect {
    pub fn new(min: Vec2, max: Vec2) -> Self {
        Self { min, max }
    }

    pub fn from_center_size(center: Vec2, width: f32, height: f32) -> Self {
        let half = Vec2::new(width / 2.0, height / 2.0);
        Self::new(center.sub(half), center.add(half))
    }

    pub fn width(&self) -> f32 {
        self.max.x - self.min.x
    }

    pub fn height(&self) -> f32 {
        self.max.y - self.min.y
    }

    pub fn center(&self) -> Vec2 {
        Vec2::new(
            (self.min.x + self.max.x) / 2.0,
            (self.min.y + self.max.y) / 2.0,
        )
    }

    pub fn contains(&self, pos: Vec2) -> bool {
        pos.x >= self.min.x && pos.x <= self.max.x && pos.y >= self.min.y && pos.y <= self.max.y
    }

    pub fn union(&self, other: &Rect) -> Rect {
        Rect::new(
            Vec2::new(self.min.x.min(other.min.x), self.min.y.min(other.min.y)),
            Vec2::new(self.max.x.max(other.max.x), self.max.y.max(other.max.y)),
        )
    }

    pub fn include_point(&self, pos: Vec2) -> Rect {
        Rect::new(
            Vec2::new(self.min.x.min(pos.x), self.min.y.min(pos.y)),
            Vec2::new(self.max.x.max(pos.x), self.max.y.max(pos.y)),
        )
    }
}
