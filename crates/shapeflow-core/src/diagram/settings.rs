//! Persisted diagram configuration.

use crate::property::{ConventionalAccess, PropertyRegistry, conventional_fields};
use crate::shapes::{AcceptSet, SerializableColor};
use bitflags::bitflags;
use kurbo::Vec2;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Default grid spacing in logical units.
pub const DEFAULT_GRID_SIZE: f64 = 10.0;

/// Default number of undo snapshots kept.
pub const MAX_HISTORY_DEPTH: usize = 25;

/// Registry type name of the settings record.
pub const SETTINGS_TYPE: &str = "Settings";

bitflags! {
    /// Behaviour switches of the interactive canvas.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
    pub struct CanvasFlags: u32 {
        const MULTI_SELECTION = 1 << 0;
        /// Resizing one selected shape resizes all selected shapes.
        const MULTI_SIZE_CHANGE = 1 << 1;
        const UNDO_REDO = 1 << 2;
        const CLIPBOARD = 1 << 3;
        const HOVERING = 1 << 4;
        const HIGHLIGHTING = 1 << 5;
        const GRID_SNAP = 1 << 6;
        /// Dropping dragged shapes onto another shape reparents them.
        const PARENT_CHANGE = 1 << 7;

        const DEFAULT = Self::MULTI_SELECTION.bits()
            | Self::MULTI_SIZE_CHANGE.bits()
            | Self::UNDO_REDO.bits()
            | Self::CLIPBOARD.bits()
            | Self::HOVERING.bits()
            | Self::HIGHLIGHTING.bits()
            | Self::PARENT_CHANGE.bits();
    }
}

impl Default for CanvasFlags {
    fn default() -> Self {
        CanvasFlags::DEFAULT
    }
}

impl Serialize for CanvasFlags {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u32(self.bits())
    }
}

impl<'de> Deserialize<'de> for CanvasFlags {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Ok(CanvasFlags::from_bits_truncate(u32::deserialize(deserializer)?))
    }
}

/// Diagram-wide configuration stored next to the shapes.
#[derive(Debug, Clone, PartialEq)]
pub struct DiagramSettings {
    pub grid_size: f64,
    pub use_grid: bool,
    pub show_grid: bool,
    pub background_color: SerializableColor,
    pub grid_color: SerializableColor,
    pub shadow_offset: Vec2,
    pub shadow_color: SerializableColor,
    pub min_scale: f64,
    pub max_scale: f64,
    /// Shape types allowed at the top level of the diagram.
    pub accepted_top_shapes: AcceptSet,
    pub canvas_flags: CanvasFlags,
    pub history_depth: usize,
}

impl Default for DiagramSettings {
    fn default() -> Self {
        Self {
            grid_size: DEFAULT_GRID_SIZE,
            use_grid: false,
            show_grid: false,
            background_color: SerializableColor::white(),
            grid_color: SerializableColor::new(200, 200, 200, 255),
            shadow_offset: Vec2::new(4.0, 4.0),
            shadow_color: SerializableColor::new(0, 0, 0, 64),
            min_scale: 0.1,
            max_scale: 5.0,
            accepted_top_shapes: AcceptSet::all(),
            canvas_flags: CanvasFlags::DEFAULT,
            history_depth: MAX_HISTORY_DEPTH,
        }
    }
}

impl DiagramSettings {
    pub fn has_flag(&self, flag: CanvasFlags) -> bool {
        self.canvas_flags.contains(flag)
    }

    /// Clamp a zoom factor into the configured range.
    pub fn clamp_scale(&self, scale: f64) -> f64 {
        scale.clamp(self.min_scale, self.max_scale.max(self.min_scale))
    }
}

impl ConventionalAccess for DiagramSettings {
    conventional_fields!(
        DiagramSettings;
        grid_size,
        use_grid,
        show_grid,
        background_color,
        grid_color,
        shadow_offset,
        shadow_color,
        min_scale,
        max_scale,
        accepted_top_shapes,
        canvas_flags,
        history_depth,
    );
}

/// Registry type for the settings record.
pub type SettingsRegistry = PropertyRegistry<DiagramSettings>;

pub fn settings_registry() -> SettingsRegistry {
    let mut registry = SettingsRegistry::new();
    registry.register(SETTINGS_TYPE, None, |t| {
        for name in [
            "grid_size",
            "use_grid",
            "show_grid",
            "background_color",
            "grid_color",
            "shadow_offset",
            "shadow_color",
            "min_scale",
            "max_scale",
            "accepted_top_shapes",
            "canvas_flags",
            "history_depth",
        ] {
            t.conventional(name);
        }
    });
    registry
}
