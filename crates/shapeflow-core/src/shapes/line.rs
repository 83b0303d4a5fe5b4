//! Connection data.

use super::{ArrowHead, ShapeId};
use kurbo::{Point, Vec2};
use serde::{Deserialize, Serialize};

/// What the two ends of a connection refer to.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum LineEnds {
    /// Both ends attached to shapes. `trg` is `None` only while the
    /// connection is being created interactively.
    Bound { src: ShapeId, trg: Option<ShapeId> },
    /// Stand-alone connection between two free points.
    Free { src: Point, trg: Point },
}

/// Working mode of a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum LineMode {
    #[default]
    Ready,
    /// The target end follows the unfinished point.
    UnderConstruction,
    /// The source end follows the unfinished point.
    SourceChanging,
    /// The target end follows the unfinished point.
    TargetChanging,
}

impl LineMode {
    pub fn is_changing(self) -> bool {
        self != LineMode::Ready
    }
}

/// Point of a connection that acts as its position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum DockPoint {
    Start,
    End,
    #[default]
    Center,
    /// Index into the control points; falls back to the center when out of range.
    Control(usize),
}

/// How a connection is drawn between its points.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Routing {
    Straight,
    Orthogonal,
    Spline,
}

/// Geometry and state of a connection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineShape {
    pub ends: LineEnds,
    /// Intermediate points in absolute coordinates.
    pub control_points: Vec<Point>,
    /// Attachment on the source's bounding box as fractions of its size; `None` = center.
    pub src_offset: Option<Vec2>,
    pub trg_offset: Option<Vec2>,
    pub dock_point: DockPoint,
    pub src_arrow: ArrowHead,
    pub trg_arrow: ArrowHead,
    #[serde(skip)]
    pub mode: LineMode,
    /// Live end while constructing or re-binding.
    #[serde(skip)]
    pub unfinished_point: Point,
}

impl LineShape {
    pub fn bound(src: ShapeId, trg: ShapeId) -> Self {
        Self::with_ends(LineEnds::Bound {
            src,
            trg: Some(trg),
        })
    }

    pub fn free(src: Point, trg: Point) -> Self {
        Self::with_ends(LineEnds::Free { src, trg })
    }

    fn with_ends(ends: LineEnds) -> Self {
        Self {
            ends,
            control_points: Vec::new(),
            src_offset: None,
            trg_offset: None,
            dock_point: DockPoint::default(),
            src_arrow: ArrowHead::None,
            trg_arrow: ArrowHead::None,
            mode: LineMode::Ready,
            unfinished_point: Point::ZERO,
        }
    }

    /// Connection whose source is set and whose target follows `pointer`.
    pub fn under_construction(src: ShapeId, pointer: Point) -> Self {
        let mut line = Self::with_ends(LineEnds::Bound { src, trg: None });
        line.mode = LineMode::UnderConstruction;
        line.unfinished_point = pointer;
        line
    }

    pub fn src_shape(&self) -> Option<ShapeId> {
        match self.ends {
            LineEnds::Bound { src, .. } => Some(src),
            LineEnds::Free { .. } => None,
        }
    }

    pub fn trg_shape(&self) -> Option<ShapeId> {
        match self.ends {
            LineEnds::Bound { trg, .. } => trg,
            LineEnds::Free { .. } => None,
        }
    }

    pub fn is_stand_alone(&self) -> bool {
        matches!(self.ends, LineEnds::Free { .. })
    }

    /// Whether either end refers to `id`.
    pub fn references(&self, id: ShapeId) -> bool {
        self.src_shape() == Some(id) || self.trg_shape() == Some(id)
    }

    pub(crate) fn set_src_shape(&mut self, id: ShapeId) {
        if let LineEnds::Bound { src, .. } = &mut self.ends {
            *src = id;
        }
    }

    pub(crate) fn set_trg_shape(&mut self, id: Option<ShapeId>) {
        if let LineEnds::Bound { trg, .. } = &mut self.ends {
            *trg = id;
        }
    }

    /// Translate every free coordinate of the connection.
    pub fn translate(&mut self, delta: Vec2) {
        for p in &mut self.control_points {
            *p += delta;
        }
        if let LineEnds::Free { src, trg } = &mut self.ends {
            *src += delta;
            *trg += delta;
        }
    }
}
