use crate::{Rect, Vec2};
use serde::{Deserialize, Serialize};

/// Maps graph coordinates onto the host surface: `screen = graph * zoom + pan`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    pub zoom: f32,
    pub pan: Vec2,
    pub surface: Vec2,
}

impl Default for Viewport {
    fn default() -> Self {
        Self::new(Vec2::ZERO)
    }
}

impl Viewport {
    pub const ZOOM_IN_FACTOR: f32 = 1.2;
    pub const ZOOM_OUT_FACTOR: f32 = 0.8;
    pub const MIN_ZOOM: f32 = 0.1;
    pub const MAX_ZOOM: f32 = 4.0;
    pub const FIT_PADDING: f32 = 50.0;

    /// Unzoomed viewport with the graph origin at the surface centre.
    pub fn new(surface: Vec2) -> Self {
        Self {
            zoom: 1.0,
            pan: surface.scale(0.5),
            surface,
        }
    }

    pub fn set_surface(&mut self, surface: Vec2) {
        // Keep whatever was at the old centre at the new centre.
        let centre = self.screen_to_graph(self.surface.scale(0.5));
        self.surface = surface;
        self.pan = surface.scale(0.5).sub(centre.scale(self.zoom));
    }

    pub fn zoom_in(&mut self) {
        self.zoom_by(Self::ZOOM_IN_FACTOR);
    }

    pub fn zoom_out(&mut self) {
        self.zoom_by(Self::ZOOM_OUT_FACTOR);
    }

    /// Zooms around the surface centre.
    pub fn zoom_by(&mut self, factor: f32) {
        let anchor = self.surface.scale(0.5);
        self.zoom_around(anchor, self.zoom * factor);
    }

    /// Sets the zoom, keeping the graph point under `anchor` fixed on screen.
    pub fn zoom_around(&mut self, anchor: Vec2, zoom: f32) {
        let graph_point = self.screen_to_graph(anchor);
        self.zoom = zoom.clamp(Self::MIN_ZOOM, Self::MAX_ZOOM);
        self.pan = anchor.sub(graph_point.scale(self.zoom));
    }

    pub fn pan_by(&mut self, delta: Vec2) {
        self.pan = self.pan.add(delta);
    }

    /// Pans so the graph point `target` sits at the surface centre.
    pub fn center_on(&mut self, target: Vec2) {
        self.pan = self.surface.scale(0.5).sub(target.scale(self.zoom));
    }

    /// Zooms and pans so `bounds` fills the surface minus `padding` on each side.
    pub fn fit(&mut self, bounds: Rect, padding: f32) {
        let avail_w = (self.surface.x - 2.0 * padding).max(1.0);
        let avail_h = (self.surface.y - 2.0 * padding).max(1.0);
        let zoom = if bounds.width() <= 0.0 || bounds.height() <= 0.0 {
            1.0
        } else {
            (avail_w / bounds.width()).min(avail_h / bounds.height())
        };
        self.zoom = zoom.clamp(Self::MIN_ZOOM, Self::MAX_ZOOM);
        self.pan = self.surface.scale(0.5).sub(bounds.center().scale(self.zoom));
    }

    pub fn reset(&mut self) {
        *self = Self::new(self.surface);
    }

    pub fn screen_to_graph(&self, pos: Vec2) -> Vec2 {
        pos.sub(self.pan).scale(1.0 / self.zoom)
    }

    pub fn graph_to_screen(&self, pos: Vec2) -> Vec2 {
        pos.scale(self.zoom).add(self.pan)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zoom_is_clamped() {
        let mut viewport = Viewport::new(Vec2::new(800.0, 600.0));
        for _ in 0..50 {
            viewport.zoom_in();
        }
        assert_eq!(viewport.zoom, Viewport::MAX_ZOOM);
        for _ in 0..50 {
            viewport.zoom_out();
        }
        assert_eq!(viewport.zoom, Viewport::MIN_ZOOM);
    }

    #[test]
    fn test_zoom_keeps_centre_fixed() {
        let mut viewport = Viewport::new(Vec2::new(800.0, 600.0));
        viewport.pan_by(Vec2::new(30.0, -10.0));
        let before = viewport.screen_to_graph(Vec2::new(400.0, 300.0));
        viewport.zoom_in();
        let after = viewport.screen_to_graph(Vec2::new(400.0, 300.0));
        assert!((before.x - after.x).abs() < 1e-3);
        assert!((before.y - after.y).abs() < 1e-3);
    }

    #[test]
    fn test_fit_centres_bounds_with_padding() {
        let mut viewport = Viewport::new(Vec2::new(800.0, 600.0));
        let bounds = Rect::new(Vec2::new(0.0, 0.0), Vec2::new(1400.0, 250.0));
        viewport.fit(bounds, Viewport::FIT_PADDING);

        assert!((viewport.zoom - 0.5).abs() < 1e-6);
        let centre = viewport.graph_to_screen(bounds.center());
        assert!((centre.x - 400.0).abs() < 1e-3);
        assert!((centre.y - 300.0).abs() < 1e-3);
    }

    #[test]
    fn test_center_on_keeps_zoom() {
        let mut viewport = Viewport::new(Vec2::new(800.0, 600.0));
        viewport.zoom_out();
        viewport.center_on(Vec2::new(120.0, -40.0));
        assert_eq!(viewport.zoom, Viewport::ZOOM_OUT_FACTOR);
        let centre = viewport.graph_to_screen(Vec2::new(120.0, -40.0));
        assert!((centre.x - 400.0).abs() < 1e-3);
        assert!((centre.y - 300.0).abs() < 1e-3);
    }

    #[test]
    fn test_reset_restores_origin_at_centre() {
        let mut viewport = Viewport::new(Vec2::new(800.0, 600.0));
        viewport.zoom_in();
        viewport.pan_by(Vec2::new(5.0, 5.0));
        viewport.reset();
        assert_eq!(viewport.zoom, 1.0);
        assert_eq!(viewport.graph_to_screen(Vec2::ZERO), Vec2::new(400.0, 300.0));
    }
}
