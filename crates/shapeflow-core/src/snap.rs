//! Grid snapping of dragged positions.

use crate::diagram::{CanvasFlags, DiagramSettings};
use kurbo::{Point, Vec2};

/// Result of a snap operation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SnapResult {
    pub point: Point,
    pub snapped_x: bool,
    pub snapped_y: bool,
}

impl SnapResult {
    /// A result with no snapping.
    pub fn none(point: Point) -> Self {
        Self {
            point,
            snapped_x: false,
            snapped_y: false,
        }
    }

    pub fn is_snapped(&self) -> bool {
        self.snapped_x || self.snapped_y
    }
}

/// Snap a point to the nearest grid intersection.
pub fn snap_to_grid(point: Point, grid_size: f64) -> SnapResult {
    if grid_size <= 0.0 {
        return SnapResult::none(point);
    }
    SnapResult {
        point: Point::new(
            (point.x / grid_size).round() * grid_size,
            (point.y / grid_size).round() * grid_size,
        ),
        snapped_x: true,
        snapped_y: true,
    }
}

/// Whether moved positions snap to the grid under `settings`.
pub fn grid_snapping(settings: &DiagramSettings) -> bool {
    settings.use_grid && settings.has_flag(CanvasFlags::GRID_SNAP)
}

/// Snap `point` if grid snapping is enabled.
pub fn snap_point(point: Point, settings: &DiagramSettings) -> SnapResult {
    if grid_snapping(settings) {
        snap_to_grid(point, settings.grid_size)
    } else {
        SnapResult::none(point)
    }
}

/// Delta that moves `origin` by roughly `delta` and lands it on the grid.
pub fn snap_delta(origin: Point, delta: Vec2, settings: &DiagramSettings) -> Vec2 {
    snap_point(origin + delta, settings).point - origin
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapping_settings() -> DiagramSettings {
        DiagramSettings {
            use_grid: true,
            grid_size: 20.0,
            canvas_flags: CanvasFlags::DEFAULT | CanvasFlags::GRID_SNAP,
            ..DiagramSettings::default()
        }
    }

    #[test]
    fn test_snap_to_grid() {
        let result = snap_to_grid(Point::new(15.0, 25.0), 20.0);
        assert!((result.point.x - 20.0).abs() < f64::EPSILON);
        assert!((result.point.y - 20.0).abs() < f64::EPSILON);
        assert!(result.is_snapped());
    }

    #[test]
    fn test_snap_to_grid_exact() {
        let result = snap_to_grid(Point::new(40.0, 60.0), 20.0);
        assert_eq!(result.point, Point::new(40.0, 60.0));
    }

    #[test]
    fn test_zero_grid_is_ignored() {
        let p = Point::new(3.0, 4.0);
        assert_eq!(snap_to_grid(p, 0.0), SnapResult::none(p));
    }

    #[test]
    fn test_snapping_follows_settings() {
        let p = Point::new(13.0, 27.0);
        assert_eq!(snap_point(p, &DiagramSettings::default()).point, p);
        assert_eq!(snap_point(p, &snapping_settings()).point, Point::new(20.0, 20.0));

        let mut grid_only = snapping_settings();
        grid_only.canvas_flags.remove(CanvasFlags::GRID_SNAP);
        assert!(!grid_snapping(&grid_only));
    }

    #[test]
    fn test_snap_delta() {
        let delta = snap_delta(Point::new(5.0, 5.0), Vec2::new(12.0, 31.0), &snapping_settings());
        assert_eq!(delta, Vec2::new(15.0, 35.0));
    }
}
