//! Text shape.

use kurbo::Size;
use serde::{Deserialize, Serialize};

/// Approximate glyph advance as a fraction of the font size.
const CHAR_WIDTH_RATIO: f64 = 0.6;

/// A block of text whose box is derived from its content.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextShape {
    pub text: String,
    pub font_size: f64,
    pub line_spacing: f64,
    size: Size,
}

impl TextShape {
    pub const DEFAULT_FONT_SIZE: f64 = 12.0;
    pub const DEFAULT_LINE_SPACING: f64 = 1.2;

    pub fn new(text: impl Into<String>) -> Self {
        let mut shape = Self {
            text: text.into(),
            font_size: Self::DEFAULT_FONT_SIZE,
            line_spacing: Self::DEFAULT_LINE_SPACING,
            size: Size::ZERO,
        };
        shape.update_size();
        shape
    }

    pub fn size(&self) -> Size {
        self.size
    }

    pub fn set_text(&mut self, text: impl Into<String>) {
        self.text = text.into();
        self.update_size();
    }

    pub fn set_font_size(&mut self, font_size: f64) {
        self.font_size = font_size.max(1.0);
        self.update_size();
    }

    /// Recompute the box from the current text and font.
    pub fn update_size(&mut self) {
        let lines = self.text.lines().count().max(1);
        let widest = self
            .text
            .lines()
            .map(|l| l.chars().count())
            .max()
            .unwrap_or(0)
            .max(1);
        self.size = Size::new(
            widest as f64 * self.font_size * CHAR_WIDTH_RATIO,
            lines as f64 * self.font_size * self.line_spacing,
        );
    }

    /// Baseline offsets of each line relative to the top of the box.
    pub fn line_offsets(&self) -> Vec<(f64, &str)> {
        let advance = self.font_size * self.line_spacing;
        self.text
            .lines()
            .enumerate()
            .map(|(i, line)| (i as f64 * advance + self.font_size, line))
            .collect()
    }
}

impl Default for TextShape {
    fn default() -> Self {
        Self::new("Text")
    }
}
