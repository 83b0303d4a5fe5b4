//! Abstract drawing surface.
//!
//! The model never talks to a rendering backend directly. Everything it draws
//! is expressed through the primitives of [`DrawingSurface`].

use crate::shapes::{SerializableColor, ShapeStyle};
use kurbo::Point;
use peniko::Color;

/// Pen and brush applied to subsequent primitives.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DrawStyle {
    pub stroke_color: SerializableColor,
    pub stroke_width: f64,
    pub fill_color: Option<SerializableColor>,
}

impl DrawStyle {
    pub fn stroke(&self) -> Color {
        self.stroke_color.into()
    }

    pub fn fill(&self) -> Option<Color> {
        self.fill_color.map(Into::into)
    }

    /// Thin outline without fill, used for handles and rubber bands.
    pub fn outline(color: SerializableColor) -> Self {
        Self {
            stroke_color: color,
            stroke_width: 1.0,
            fill_color: None,
        }
    }
}

impl From<&ShapeStyle> for DrawStyle {
    fn from(style: &ShapeStyle) -> Self {
        Self {
            stroke_color: style.stroke_color,
            stroke_width: style.stroke_width,
            fill_color: style.fill_color,
        }
    }
}

/// Primitive drawing operations consumed by the diagram.
pub trait DrawingSurface {
    /// Scope the following primitives to `style`.
    fn set_style(&mut self, style: &DrawStyle);

    fn draw_line(&mut self, p1: Point, p2: Point);

    /// Closed polygon, filled with the current brush if any.
    fn draw_polygon(&mut self, points: &[Point]);

    /// Circular arc; angles in radians, positive sweep is clockwise in screen space.
    fn draw_arc(&mut self, center: Point, radius: f64, start_angle: f64, sweep_angle: f64);

    fn draw_circle(&mut self, center: Point, radius: f64);

    fn draw_text(&mut self, origin: Point, text: &str, font_size: f64) {
        let _ = (origin, text, font_size);
    }
}

/// A primitive call captured by [`RecordingSurface`].
#[derive(Debug, Clone, PartialEq)]
pub enum DrawCommand {
    Style(DrawStyle),
    Line(Point, Point),
    Polygon(Vec<Point>),
    Arc {
        center: Point,
        radius: f64,
        start_angle: f64,
        sweep_angle: f64,
    },
    Circle(Point, f64),
    Text(Point, String),
}

/// Surface that records every call, for tests and headless export.
#[derive(Debug, Default)]
pub struct RecordingSurface {
    pub commands: Vec<DrawCommand>,
}

impl RecordingSurface {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clear(&mut self) {
        self.commands.clear();
    }

    /// Number of recorded line primitives.
    pub fn line_count(&self) -> usize {
        self.commands
            .iter()
            .filter(|c| matches!(c, DrawCommand::Line(..)))
            .count()
    }

    pub fn lines(&self) -> Vec<(Point, Point)> {
        self.commands
            .iter()
            .filter_map(|c| match c {
                DrawCommand::Line(a, b) => Some((*a, *b)),
                _ => None,
            })
            .collect()
    }
}

impl DrawingSurface for RecordingSurface {
    fn set_style(&mut self, style: &DrawStyle) {
        self.commands.push(DrawCommand::Style(*style));
    }

    fn draw_line(&mut self, p1: Point, p2: Point) {
        self.commands.push(DrawCommand::Line(p1, p2));
    }

    fn draw_polygon(&mut self, points: &[Point]) {
        self.commands.push(DrawCommand::Polygon(points.to_vec()));
    }

    fn draw_arc(&mut self, center: Point, radius: f64, start_angle: f64, sweep_angle: f64) {
        self.commands.push(DrawCommand::Arc {
            center,
            radius,
            start_angle,
            sweep_angle,
        });
    }

    fn draw_circle(&mut self, center: Point, radius: f64) {
        self.commands.push(DrawCommand::Circle(center, radius));
    }

    fn draw_text(&mut self, origin: Point, text: &str, _font_size: f64) {
        self.commands.push(DrawCommand::Text(origin, text.to_string()));
    }
}
