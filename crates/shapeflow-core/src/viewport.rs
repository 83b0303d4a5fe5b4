//! Zoom and scroll of the canvas view.

use crate::diagram::DiagramSettings;
use kurbo::{Affine, Point, Rect, Size, Vec2};
use serde::{Deserialize, Serialize};

/// Maps device (window) coordinates to logical diagram coordinates.
///
/// A logical point `p` appears on the device at `p * zoom - scroll`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    /// Logical-to-device scale factor.
    pub zoom: f64,
    /// Scroll offset in device units.
    pub scroll: Vec2,
    pub min_zoom: f64,
    pub max_zoom: f64,
}

impl Default for Viewport {
    fn default() -> Self {
        let settings = DiagramSettings::default();
        Self {
            zoom: 1.0,
            scroll: Vec2::ZERO,
            min_zoom: settings.min_scale,
            max_zoom: settings.max_scale,
        }
    }
}

impl Viewport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take the zoom range from the diagram settings, clamping the current zoom.
    pub fn apply_settings(&mut self, settings: &DiagramSettings) {
        self.min_zoom = settings.min_scale;
        self.max_zoom = settings.max_scale.max(settings.min_scale);
        self.zoom = self.zoom.clamp(self.min_zoom, self.max_zoom);
    }

    /// Logical-to-device transform, for rendering.
    pub fn transform(&self) -> Affine {
        Affine::translate(-self.scroll) * Affine::scale(self.zoom)
    }

    pub fn inverse_transform(&self) -> Affine {
        Affine::scale(1.0 / self.zoom) * Affine::translate(self.scroll)
    }

    pub fn device_to_logical(&self, device: Point) -> Point {
        self.inverse_transform() * device
    }

    pub fn logical_to_device(&self, logical: Point) -> Point {
        self.transform() * logical
    }

    /// Logical rectangle visible through a window of `size` device units.
    pub fn visible_rect(&self, size: Size) -> Rect {
        let p0 = self.device_to_logical(Point::ZERO);
        let p1 = self.device_to_logical(Point::new(size.width, size.height));
        Rect::from_points(p0, p1)
    }

    /// Scroll by a delta in device units.
    pub fn scroll_by(&mut self, delta: Vec2) {
        self.scroll += delta;
    }

    pub fn set_zoom(&mut self, zoom: f64) {
        self.zoom = zoom.clamp(self.min_zoom, self.max_zoom);
    }

    /// Zoom by `factor`, keeping the logical point under `device` fixed.
    pub fn zoom_at(&mut self, device: Point, factor: f64) {
        let new_zoom = (self.zoom * factor).clamp(self.min_zoom, self.max_zoom);
        if (new_zoom - self.zoom).abs() < f64::EPSILON {
            return;
        }
        let logical = self.device_to_logical(device);
        self.zoom = new_zoom;
        let moved = self.logical_to_device(logical);
        self.scroll += moved - device;
    }

    pub fn reset(&mut self) {
        self.zoom = 1.0;
        self.scroll = Vec2::ZERO;
    }

    /// Zoom and scroll so that `bounds` fills a window of `size`, minus `padding`.
    pub fn fit_to_bounds(&mut self, bounds: Rect, size: Size, padding: f64) {
        if bounds.is_zero_area() {
            self.reset();
            return;
        }
        let avail = Size::new(
            (size.width - padding * 2.0).max(1.0),
            (size.height - padding * 2.0).max(1.0),
        );
        let zoom = (avail.width / bounds.width()).min(avail.height / bounds.height());
        self.zoom = zoom.clamp(self.min_zoom, self.max_zoom);
        let center = bounds.center();
        self.scroll = Vec2::new(
            center.x * self.zoom - size.width / 2.0,
            center.y * self.zoom - size.height / 2.0,
        );
    }
}
