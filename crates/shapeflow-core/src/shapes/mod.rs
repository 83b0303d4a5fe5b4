//! Shape definitions for diagrams.
//!
//! Every element of a diagram is a [`ShapeNode`]: common identity, ownership
//! links, style flags and acceptance rules, plus a [`ShapeKind`] payload with
//! the geometry of the concrete kind. Nodes refer to each other by
//! [`ShapeId`] only; the owning [`crate::diagram::Diagram`] resolves them.

mod arrow;
pub(crate) mod connection_point;
pub(crate) mod ellipse;
mod grid;
mod line;
mod polygon;
pub(crate) mod rect;
pub(crate) mod registry;
mod text;

pub use arrow::ArrowHead;
pub use connection_point::{Anchor, ConnectionPoint, OrthoDirection};
pub use grid::GridShape;
pub use line::{DockPoint, LineEnds, LineMode, LineShape, Routing};
pub use polygon::{PolygonShape, diamond_vertices};
pub use rect::RectShape;
pub use registry::{ShapeRegistry, shape_registry};
pub use text::TextShape;

use bitflags::bitflags;
use kurbo::{Point, Rect, Size, Vec2};
use peniko::Color;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Unique identifier for shapes.
pub type ShapeId = Uuid;

/// Serializable color representation (RGBA8).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SerializableColor {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl SerializableColor {
    pub const fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    pub const fn black() -> Self {
        Self::new(0, 0, 0, 255)
    }

    pub const fn white() -> Self {
        Self::new(255, 255, 255, 255)
    }

    pub const fn transparent() -> Self {
        Self::new(0, 0, 0, 0)
    }
}

impl From<Color> for SerializableColor {
    fn from(color: Color) -> Self {
        let rgba = color.to_rgba8();
        Self {
            r: rgba.r,
            g: rgba.g,
            b: rgba.b,
            a: rgba.a,
        }
    }
}

impl From<SerializableColor> for Color {
    fn from(color: SerializableColor) -> Self {
        Color::from_rgba8(color.r, color.g, color.b, color.a)
    }
}

/// Pen and brush of a shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShapeStyle {
    pub stroke_color: SerializableColor,
    pub stroke_width: f64,
    /// Fill color (None = no fill).
    pub fill_color: Option<SerializableColor>,
}

impl ShapeStyle {
    pub fn stroke(&self) -> Color {
        self.stroke_color.into()
    }

    pub fn fill(&self) -> Option<Color> {
        self.fill_color.map(|c| c.into())
    }

    pub fn set_stroke(&mut self, color: Color) {
        self.stroke_color = color.into();
    }

    pub fn set_fill(&mut self, color: Option<Color>) {
        self.fill_color = color.map(|c| c.into());
    }

    fn for_lines() -> Self {
        Self {
            fill_color: None,
            ..Self::default()
        }
    }
}

impl Default for ShapeStyle {
    fn default() -> Self {
        Self {
            stroke_color: SerializableColor::black(),
            stroke_width: 1.0,
            fill_color: Some(SerializableColor::white()),
        }
    }
}

/// Concrete kind of a shape.
///
/// The set is closed; the persisted name doubles as the type name in the
/// property registry, and `parent` defines the property inheritance chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ShapeType {
    Rect,
    RoundRect,
    Ellipse,
    Circle,
    Polygon,
    Diamond,
    Text,
    Grid,
    Line,
    OrthoLine,
    CurveLine,
}

impl ShapeType {
    pub const ALL: [ShapeType; 11] = [
        ShapeType::Rect,
        ShapeType::RoundRect,
        ShapeType::Ellipse,
        ShapeType::Circle,
        ShapeType::Polygon,
        ShapeType::Diamond,
        ShapeType::Text,
        ShapeType::Grid,
        ShapeType::Line,
        ShapeType::OrthoLine,
        ShapeType::CurveLine,
    ];

    pub fn name(self) -> &'static str {
        match self {
            ShapeType::Rect => "RectShape",
            ShapeType::RoundRect => "RoundRectShape",
            ShapeType::Ellipse => "EllipseShape",
            ShapeType::Circle => "CircleShape",
            ShapeType::Polygon => "PolygonShape",
            ShapeType::Diamond => "DiamondShape",
            ShapeType::Text => "TextShape",
            ShapeType::Grid => "GridShape",
            ShapeType::Line => "LineShape",
            ShapeType::OrthoLine => "OrthoLineShape",
            ShapeType::CurveLine => "CurveShape",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.name() == name)
    }

    pub fn parent(self) -> Option<ShapeType> {
        match self {
            ShapeType::Rect | ShapeType::Line => None,
            ShapeType::RoundRect
            | ShapeType::Ellipse
            | ShapeType::Polygon
            | ShapeType::Text
            | ShapeType::Grid => Some(ShapeType::Rect),
            ShapeType::Circle => Some(ShapeType::Ellipse),
            ShapeType::Diamond => Some(ShapeType::Polygon),
            ShapeType::OrthoLine | ShapeType::CurveLine => Some(ShapeType::Line),
        }
    }

    /// Whether this type is `ancestor` or derives from it.
    pub fn is_kind_of(self, ancestor: ShapeType) -> bool {
        let mut current = Some(self);
        while let Some(t) = current {
            if t == ancestor {
                return true;
            }
            current = t.parent();
        }
        false
    }

    pub fn is_line(self) -> bool {
        self.is_kind_of(ShapeType::Line)
    }

    pub fn routing(self) -> Option<Routing> {
        match self {
            ShapeType::Line => Some(Routing::Straight),
            ShapeType::OrthoLine => Some(Routing::Orthogonal),
            ShapeType::CurveLine => Some(Routing::Spline),
            _ => None,
        }
    }
}

impl fmt::Display for ShapeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ShapeType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_name(s).ok_or_else(|| format!("unknown shape type `{}`", s))
    }
}

impl Serialize for ShapeType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.name())
    }
}

impl<'de> Deserialize<'de> for ShapeType {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let name = String::deserialize(deserializer)?;
        name.parse().map_err(serde::de::Error::custom)
    }
}

/// Entry of an acceptance set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum AcceptToken {
    /// Accepts every shape type.
    All,
    Type(ShapeType),
}

const ACCEPT_ALL: &str = "All";

impl Serialize for AcceptToken {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            AcceptToken::All => serializer.serialize_str(ACCEPT_ALL),
            AcceptToken::Type(t) => serializer.serialize_str(t.name()),
        }
    }
}

impl<'de> Deserialize<'de> for AcceptToken {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let name = String::deserialize(deserializer)?;
        if name == ACCEPT_ALL {
            return Ok(AcceptToken::All);
        }
        name.parse()
            .map(AcceptToken::Type)
            .map_err(serde::de::Error::custom)
    }
}

/// Set of shape types a node tolerates in one role.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AcceptSet(BTreeSet<AcceptToken>);

impl AcceptSet {
    pub fn all() -> Self {
        let mut set = Self::default();
        set.0.insert(AcceptToken::All);
        set
    }

    pub fn accept(&mut self, shape_type: ShapeType) {
        self.0.insert(AcceptToken::Type(shape_type));
    }

    pub fn accept_all(&mut self) {
        self.0.insert(AcceptToken::All);
    }

    pub fn clear(&mut self) {
        self.0.clear();
    }

    pub fn accepts(&self, shape_type: ShapeType) -> bool {
        self.0.contains(&AcceptToken::All) || self.0.contains(&AcceptToken::Type(shape_type))
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &AcceptToken> {
        self.0.iter()
    }
}

impl FromIterator<ShapeType> for AcceptSet {
    fn from_iter<I: IntoIterator<Item = ShapeType>>(iter: I) -> Self {
        Self(iter.into_iter().map(AcceptToken::Type).collect())
    }
}

bitflags! {
    /// Interactive behaviour of a shape.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
    pub struct StyleFlags: u32 {
        /// Can be dropped onto another shape to become its child.
        const PARENT_CHANGE = 1 << 0;
        const POSITION_CHANGE = 1 << 1;
        const SIZE_CHANGE = 1 << 2;
        const HOVERING = 1 << 3;
        const HIGHLIGHTING = 1 << 4;
        const SHOW_HANDLES = 1 << 5;
        /// Parent grows to keep this child inside.
        const ALWAYS_INSIDE = 1 << 6;
        /// Dragging moves the parent instead.
        const PROPAGATE_DRAGGING = 1 << 7;
        /// Clicking selects the parent instead.
        const PROPAGATE_SELECTION = 1 << 8;
        /// Interactive connections start from the parent instead.
        const PROPAGATE_INTERACTIVE_CONNECTION = 1 << 9;
        const NO_FIT_TO_CHILDREN = 1 << 10;
        const SHOW_SHADOW = 1 << 11;
        /// Children cannot be dragged out.
        const LOCK_CHILDREN = 1 << 12;

        const DEFAULT = Self::PARENT_CHANGE.bits()
            | Self::POSITION_CHANGE.bits()
            | Self::SIZE_CHANGE.bits()
            | Self::HOVERING.bits()
            | Self::HIGHLIGHTING.bits()
            | Self::SHOW_HANDLES.bits()
            | Self::ALWAYS_INSIDE.bits();
    }
}

impl Default for StyleFlags {
    fn default() -> Self {
        StyleFlags::DEFAULT
    }
}

impl Serialize for StyleFlags {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u32(self.bits())
    }
}

impl<'de> Deserialize<'de> for StyleFlags {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let bits = u32::deserialize(deserializer)?;
        Ok(StyleFlags::from_bits_truncate(bits))
    }
}

/// Horizontal alignment of a child against its parent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum HAlign {
    #[default]
    None,
    Left,
    Center,
    Right,
    Expand,
    LineStart,
    LineEnd,
}

/// Vertical alignment of a child against its parent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum VAlign {
    #[default]
    None,
    Top,
    Middle,
    Bottom,
    Expand,
    LineStart,
    LineEnd,
}

/// Geometry payload of a shape.
#[derive(Debug, Clone, PartialEq)]
pub enum ShapeKind {
    /// Rectangles, rounded rectangles, ellipses and circles.
    Rect(RectShape),
    /// Polygons and diamonds.
    Polygon(PolygonShape),
    Text(TextShape),
    Grid(GridShape),
    Line(LineShape),
}

/// A single diagram element.
#[derive(Debug, Clone, PartialEq)]
pub struct ShapeNode {
    id: ShapeId,
    shape_type: ShapeType,
    parent: Option<ShapeId>,
    children: Vec<ShapeId>,
    /// Offset from the parent's absolute position, or from the origin at top level.
    pub relative_position: Point,
    pub flags: StyleFlags,
    pub style: ShapeStyle,
    pub halign: HAlign,
    pub valign: VAlign,
    pub h_border: f64,
    pub v_border: f64,
    /// Point of a parent connection this shape is docked to.
    pub custom_dock_point: Option<DockPoint>,
    pub accepted_children: AcceptSet,
    pub accepted_connections: AcceptSet,
    pub accepted_src_neighbours: AcceptSet,
    pub accepted_trg_neighbours: AcceptSet,
    pub connection_points: Vec<ConnectionPoint>,
    pub visible: bool,
    serialized: bool,
    pub kind: ShapeKind,
}

impl ShapeNode {
    /// Create a node of `shape_type` with default geometry.
    pub fn new(shape_type: ShapeType) -> Self {
        let kind = match shape_type {
            ShapeType::Rect | ShapeType::Ellipse => ShapeKind::Rect(RectShape::default()),
            ShapeType::RoundRect => ShapeKind::Rect(RectShape {
                corner_radius: RectShape::DEFAULT_RADIUS,
                ..RectShape::default()
            }),
            ShapeType::Circle => ShapeKind::Rect(RectShape::new(Size::new(50.0, 50.0))),
            ShapeType::Polygon => ShapeKind::Polygon(PolygonShape::new(Vec::new())),
            ShapeType::Diamond => {
                ShapeKind::Polygon(PolygonShape::diamond(RectShape::DEFAULT_SIZE))
            }
            ShapeType::Text => ShapeKind::Text(TextShape::default()),
            ShapeType::Grid => ShapeKind::Grid(GridShape::default()),
            ShapeType::Line | ShapeType::OrthoLine | ShapeType::CurveLine => {
                ShapeKind::Line(LineShape::free(Point::ZERO, Point::ZERO))
            }
        };
        Self::with_kind(shape_type, kind)
    }

    fn with_kind(shape_type: ShapeType, kind: ShapeKind) -> Self {
        let style = if shape_type.is_line() {
            ShapeStyle::for_lines()
        } else {
            ShapeStyle::default()
        };
        Self {
            id: Uuid::new_v4(),
            shape_type,
            parent: None,
            children: Vec::new(),
            relative_position: Point::ZERO,
            flags: StyleFlags::DEFAULT,
            style,
            halign: HAlign::None,
            valign: VAlign::None,
            h_border: 0.0,
            v_border: 0.0,
            custom_dock_point: None,
            accepted_children: AcceptSet::default(),
            accepted_connections: AcceptSet::default(),
            accepted_src_neighbours: AcceptSet::default(),
            accepted_trg_neighbours: AcceptSet::default(),
            connection_points: Vec::new(),
            visible: true,
            serialized: true,
            kind,
        }
    }

    pub fn rect(position: Point, size: Size) -> Self {
        Self::with_kind(ShapeType::Rect, ShapeKind::Rect(RectShape::new(size)))
            .with_position(position)
    }

    pub fn round_rect(position: Point, size: Size, radius: f64) -> Self {
        let rect = RectShape {
            size,
            corner_radius: radius,
        };
        Self::with_kind(ShapeType::RoundRect, ShapeKind::Rect(rect)).with_position(position)
    }

    pub fn ellipse(position: Point, size: Size) -> Self {
        Self::with_kind(ShapeType::Ellipse, ShapeKind::Rect(RectShape::new(size)))
            .with_position(position)
    }

    pub fn circle(center: Point, radius: f64) -> Self {
        let size = Size::new(radius * 2.0, radius * 2.0);
        Self::with_kind(ShapeType::Circle, ShapeKind::Rect(RectShape::new(size)))
            .with_position(center - Vec2::new(radius, radius))
    }

    /// Polygon with vertices in absolute coordinates; positioned at their top-left extent.
    pub fn polygon(vertices: Vec<Point>) -> Self {
        let origin = vertices.iter().fold(
            Point::new(f64::MAX, f64::MAX),
            |acc, p| Point::new(acc.x.min(p.x), acc.y.min(p.y)),
        );
        let origin = if vertices.is_empty() { Point::ZERO } else { origin };
        Self::with_kind(ShapeType::Polygon, ShapeKind::Polygon(PolygonShape::new(vertices)))
            .with_position(origin)
    }

    pub fn diamond(position: Point, size: Size) -> Self {
        Self::with_kind(ShapeType::Diamond, ShapeKind::Polygon(PolygonShape::diamond(size)))
            .with_position(position)
    }

    pub fn text(position: Point, text: impl Into<String>) -> Self {
        Self::with_kind(ShapeType::Text, ShapeKind::Text(TextShape::new(text)))
            .with_position(position)
    }

    pub fn grid(position: Point, rows: usize, cols: usize, cell_space: f64) -> Self {
        Self::with_kind(ShapeType::Grid, ShapeKind::Grid(GridShape::new(rows, cols, cell_space)))
            .with_position(position)
    }

    /// Connection bound to two shapes.
    ///
    /// # Panics
    ///
    /// Panics if `line_type` is not a connection type.
    pub fn connection(line_type: ShapeType, src: ShapeId, trg: ShapeId) -> Self {
        assert!(line_type.is_line(), "{} is not a connection type", line_type);
        Self::with_kind(line_type, ShapeKind::Line(LineShape::bound(src, trg)))
    }

    /// Stand-alone connection between two free points.
    ///
    /// # Panics
    ///
    /// Panics if `line_type` is not a connection type.
    pub fn free_line(line_type: ShapeType, src: Point, trg: Point) -> Self {
        assert!(line_type.is_line(), "{} is not a connection type", line_type);
        Self::with_kind(line_type, ShapeKind::Line(LineShape::free(src, trg)))
    }

    pub(crate) fn from_line(line_type: ShapeType, line: LineShape) -> Self {
        Self::with_kind(line_type, ShapeKind::Line(line))
    }

    pub fn with_position(mut self, position: Point) -> Self {
        self.relative_position = position;
        self
    }

    pub fn with_flags(mut self, flags: StyleFlags) -> Self {
        self.flags = flags;
        self
    }

    pub fn with_alignment(mut self, halign: HAlign, valign: VAlign) -> Self {
        self.halign = halign;
        self.valign = valign;
        self
    }

    pub fn with_connection_point(mut self, point: ConnectionPoint) -> Self {
        self.connection_points.push(point);
        self
    }

    /// Accept every type in all four acceptance sets.
    pub fn accepting_everything(mut self) -> Self {
        self.accept_everything();
        self
    }

    pub fn accept_everything(&mut self) {
        self.accepted_children.accept_all();
        self.accepted_connections.accept_all();
        self.accepted_src_neighbours.accept_all();
        self.accepted_trg_neighbours.accept_all();
    }

    pub fn id(&self) -> ShapeId {
        self.id
    }

    pub(crate) fn set_id(&mut self, id: ShapeId) {
        self.id = id;
    }

    pub fn shape_type(&self) -> ShapeType {
        self.shape_type
    }

    pub fn parent(&self) -> Option<ShapeId> {
        self.parent
    }

    pub fn children(&self) -> &[ShapeId] {
        &self.children
    }

    pub(crate) fn parent_slot(&mut self) -> &mut Option<ShapeId> {
        &mut self.parent
    }

    pub(crate) fn children_mut(&mut self) -> &mut Vec<ShapeId> {
        &mut self.children
    }

    pub fn is_line(&self) -> bool {
        self.shape_type.is_line()
    }

    pub fn line(&self) -> Option<&LineShape> {
        match &self.kind {
            ShapeKind::Line(line) => Some(line),
            _ => None,
        }
    }

    pub fn line_mut(&mut self) -> Option<&mut LineShape> {
        match &mut self.kind {
            ShapeKind::Line(line) => Some(line),
            _ => None,
        }
    }

    pub fn polygon_shape(&self) -> Option<&PolygonShape> {
        match &self.kind {
            ShapeKind::Polygon(p) => Some(p),
            _ => None,
        }
    }

    pub fn text_shape(&self) -> Option<&TextShape> {
        match &self.kind {
            ShapeKind::Text(t) => Some(t),
            _ => None,
        }
    }

    pub fn text_shape_mut(&mut self) -> Option<&mut TextShape> {
        match &mut self.kind {
            ShapeKind::Text(t) => Some(t),
            _ => None,
        }
    }

    pub fn grid_shape(&self) -> Option<&GridShape> {
        match &self.kind {
            ShapeKind::Grid(g) => Some(g),
            _ => None,
        }
    }

    pub fn is_manager(&self) -> bool {
        matches!(self.kind, ShapeKind::Grid(_))
    }

    pub fn contains_style(&self, flags: StyleFlags) -> bool {
        self.flags.contains(flags)
    }

    pub fn is_serialized(&self) -> bool {
        self.serialized
    }

    /// Opted-out nodes are written with the disabled marker and reload opted out.
    pub fn set_serialized(&mut self, enabled: bool) {
        self.serialized = enabled;
    }

    /// Box size; zero for connections.
    pub fn size(&self) -> Size {
        match &self.kind {
            ShapeKind::Rect(r) => r.size,
            ShapeKind::Polygon(p) => p.size,
            ShapeKind::Text(t) => t.size(),
            ShapeKind::Grid(g) => g.size,
            ShapeKind::Line(_) => Size::ZERO,
        }
    }

    /// Resize the box. Circles stay square; text boxes follow their content.
    pub fn set_size(&mut self, size: Size) {
        let size = Size::new(size.width.max(0.0), size.height.max(0.0));
        match (&mut self.kind, self.shape_type) {
            (ShapeKind::Rect(r), ShapeType::Circle) => {
                let side = size.width.max(size.height);
                r.size = Size::new(side, side);
            }
            (ShapeKind::Rect(r), _) => r.size = size,
            (ShapeKind::Polygon(p), _) => p.set_size(size),
            (ShapeKind::Grid(g), _) => g.size = size,
            (ShapeKind::Text(_), _) | (ShapeKind::Line(_), _) => {}
        }
    }

    /// Scale own geometry; text scales its font instead of its box.
    pub fn scale_geometry(&mut self, sx: f64, sy: f64) {
        if sx <= 0.0 || sy <= 0.0 {
            return;
        }
        if let ShapeKind::Text(t) = &mut self.kind {
            let factor = (sx * sy).sqrt();
            t.set_font_size(t.font_size * factor);
            return;
        }
        if self.is_line() {
            return;
        }
        let size = self.size();
        self.set_size(Size::new(size.width * sx, size.height * sy));
    }

    /// Border intersection for a box occupying `bounds`, along `start -> end`.
    pub fn border_point(&self, bounds: Rect, start: Point, end: Point) -> Point {
        match (&self.kind, self.shape_type) {
            (ShapeKind::Rect(_), ShapeType::Ellipse | ShapeType::Circle) => {
                ellipse::border_point(bounds, start, end)
            }
            (ShapeKind::Polygon(p), _) => p.border_point(bounds, start, end),
            (ShapeKind::Line(_), _) => bounds.center(),
            _ => rect::border_point(bounds, start, end),
        }
    }

    /// Hit test of a box occupying `bounds`.
    pub fn contains_point(&self, bounds: Rect, point: Point, tolerance: f64) -> bool {
        match (&self.kind, self.shape_type) {
            (ShapeKind::Rect(_), ShapeType::Ellipse | ShapeType::Circle) => {
                ellipse::contains(bounds, point, tolerance)
            }
            (ShapeKind::Polygon(p), _) => {
                if p.contains(bounds.origin(), point) {
                    return true;
                }
                let mut outline = p.absolute_vertices(bounds.origin());
                outline.extend(outline.first().copied());
                tolerance > 0.0 && point_to_polyline_dist(point, &outline) <= tolerance
            }
            (ShapeKind::Line(_), _) => false,
            _ => rect::contains(bounds, point, tolerance),
        }
    }

    /// Closed outline of a box occupying `bounds`.
    pub fn outline(&self, bounds: Rect) -> Vec<Point> {
        match (&self.kind, self.shape_type) {
            (ShapeKind::Rect(_), ShapeType::Ellipse | ShapeType::Circle) => {
                ellipse::outline(bounds)
            }
            (ShapeKind::Polygon(p), _) => p.absolute_vertices(bounds.origin()),
            (ShapeKind::Line(_), _) => Vec::new(),
            _ => rect::outline(bounds),
        }
    }
}

/// Distance from a point to a line segment (a→b).
pub fn point_to_segment_dist(point: Point, a: Point, b: Point) -> f64 {
    let seg = Vec2::new(b.x - a.x, b.y - a.y);
    let pv = Vec2::new(point.x - a.x, point.y - a.y);
    let len_sq = seg.hypot2();
    if len_sq < f64::EPSILON {
        return pv.hypot();
    }
    let t = (pv.dot(seg) / len_sq).clamp(0.0, 1.0);
    let proj = Point::new(a.x + t * seg.x, a.y + t * seg.y);
    ((point.x - proj.x).powi(2) + (point.y - proj.y).powi(2)).sqrt()
}

/// Minimum distance from a point to a polyline (sequence of connected segments).
pub fn point_to_polyline_dist(point: Point, points: &[Point]) -> f64 {
    match points {
        [] => f64::INFINITY,
        [single] => single.distance(point),
        _ => points
            .windows(2)
            .map(|w| point_to_segment_dist(point, w[0], w[1]))
            .fold(f64::INFINITY, f64::min),
    }
}

/// Intersection point of segments `a1 -> a2` and `b1 -> b2`, if they cross.
pub fn segment_intersection(a1: Point, a2: Point, b1: Point, b2: Point) -> Option<Point> {
    const EPS: f64 = 1e-9;
    let r = a2 - a1;
    let s = b2 - b1;
    let denom = r.cross(s);
    if denom.abs() < EPS {
        return None;
    }
    let qp = b1 - a1;
    let t = qp.cross(s) / denom;
    let u = qp.cross(r) / denom;
    if (-EPS..=1.0 + EPS).contains(&t) && (-EPS..=1.0 + EPS).contains(&u) {
        Some(a1 + r * t)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shape_type_names_round_trip() {
        for t in ShapeType::ALL {
            assert_eq!(ShapeType::from_name(t.name()), Some(t));
        }
        assert_eq!("CurveShape".parse::<ShapeType>(), Ok(ShapeType::CurveLine));
        assert!("Blob".parse::<ShapeType>().is_err());
    }

    #[test]
    fn test_kind_of_chain() {
        assert!(ShapeType::Circle.is_kind_of(ShapeType::Rect));
        assert!(ShapeType::Diamond.is_kind_of(ShapeType::Polygon));
        assert!(!ShapeType::Diamond.is_kind_of(ShapeType::Ellipse));
        assert!(ShapeType::OrthoLine.is_line());
        assert!(!ShapeType::Text.is_line());
        assert_eq!(ShapeType::CurveLine.routing(), Some(Routing::Spline));
    }

    #[test]
    fn test_polygon_constructor_and_accessor() {
        let node = ShapeNode::polygon(vec![
            Point::new(10.0, 20.0),
            Point::new(50.0, 20.0),
            Point::new(30.0, 60.0),
        ]);
        assert_eq!(node.relative_position, Point::new(10.0, 20.0));
        let polygon = node.polygon_shape().unwrap();
        assert_eq!(polygon.vertices.len(), 3);
        assert!(ShapeNode::rect(Point::ZERO, Size::new(5.0, 5.0)).polygon_shape().is_none());
    }

    #[test]
    fn test_accept_set() {
        let mut set = AcceptSet::default();
        assert!(!set.accepts(ShapeType::Rect));
        set.accept(ShapeType::Rect);
        assert!(set.accepts(ShapeType::Rect));
        assert!(!set.accepts(ShapeType::Circle));
        set.accept_all();
        assert!(set.accepts(ShapeType::Circle));

        let json = serde_json::to_value(&set).unwrap();
        assert_eq!(json, serde_json::json!(["All", "RectShape"]));
        let back: AcceptSet = serde_json::from_value(json).unwrap();
        assert_eq!(back, set);
    }

    #[test]
    fn test_style_flags_serialize_as_bits() {
        let flags = StyleFlags::POSITION_CHANGE | StyleFlags::SHOW_SHADOW;
        let json = serde_json::to_value(flags).unwrap();
        assert_eq!(json, serde_json::json!(flags.bits()));
        let back: StyleFlags = serde_json::from_value(json).unwrap();
        assert_eq!(back, flags);
        assert!(StyleFlags::default().contains(StyleFlags::ALWAYS_INSIDE));
    }

    #[test]
    fn test_circle_stays_square() {
        let mut circle = ShapeNode::circle(Point::new(50.0, 50.0), 25.0);
        assert_eq!(circle.relative_position, Point::new(25.0, 25.0));
        circle.set_size(Size::new(80.0, 20.0));
        assert_eq!(circle.size(), Size::new(80.0, 80.0));
    }

    #[test]
    fn test_text_scale_changes_font() {
        let mut text = ShapeNode::text(Point::ZERO, "hello");
        let before = text.size();
        text.scale_geometry(2.0, 2.0);
        assert!((text.text_shape().unwrap().font_size - 24.0).abs() < 1e-9);
        assert!((text.size().width - before.width * 2.0).abs() < 1e-9);
        // Direct resizing is ignored for text.
        text.set_size(Size::new(1.0, 1.0));
        assert!(text.size().width > 1.0);
    }

    #[test]
    fn test_border_point_dispatch() {
        let bounds = Rect::new(0.0, 0.0, 100.0, 100.0);
        let to = Point::new(200.0, 200.0);
        let rect = ShapeNode::rect(Point::ZERO, Size::new(100.0, 100.0));
        let circle = ShapeNode::circle(Point::new(50.0, 50.0), 50.0);
        let p = rect.border_point(bounds, bounds.center(), to);
        assert!((p.x - 100.0).abs() < 1e-9 && (p.y - 100.0).abs() < 1e-9);
        let p = circle.border_point(bounds, bounds.center(), to);
        assert!((p.distance(bounds.center()) - 50.0).abs() < 1e-9);
    }

    #[test]
    fn test_polygon_positioned_at_extents() {
        let polygon = ShapeNode::polygon(vec![
            Point::new(10.0, 20.0),
            Point::new(50.0, 20.0),
            Point::new(30.0, 60.0),
        ]);
        assert_eq!(polygon.relative_position, Point::new(10.0, 20.0));
        assert_eq!(polygon.size(), Size::new(40.0, 40.0));
    }

    #[test]
    #[should_panic(expected = "is not a connection type")]
    fn test_connection_requires_line_type() {
        ShapeNode::connection(ShapeType::Rect, Uuid::new_v4(), Uuid::new_v4());
    }

    #[test]
    fn test_point_to_segment_dist() {
        let d = point_to_segment_dist(Point::new(5.0, 5.0), Point::ZERO, Point::new(10.0, 0.0));
        assert!((d - 5.0).abs() < 1e-9);
        let d = point_to_segment_dist(Point::new(-3.0, 4.0), Point::ZERO, Point::new(10.0, 0.0));
        assert!((d - 5.0).abs() < 1e-9);
    }

    #[test]
    fn test_segment_intersection() {
        let p = segment_intersection(
            Point::new(0.0, 0.0),
            Point::new(10.0, 10.0),
            Point::new(0.0, 10.0),
            Point::new(10.0, 0.0),
        );
        assert_eq!(p, Some(Point::new(5.0, 5.0)));
        let parallel = segment_intersection(
            Point::ZERO,
            Point::new(1.0, 0.0),
            Point::new(0.0, 1.0),
            Point::new(1.0, 1.0),
        );
        assert!(parallel.is_none());
    }
}
