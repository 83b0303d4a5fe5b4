//! ShapeFlow Core Library
//!
//! Diagram model for box-and-connector editors: a shape hierarchy owned by a
//! [`Diagram`] arena, connection routing, property-driven persistence,
//! snapshot undo/redo and an interaction controller. Rendering backends plug
//! in through [`DrawingSurface`].

pub mod canvas;
pub mod clipboard;
pub mod diagram;
pub mod draw;
pub mod error;
pub mod handles;
pub mod history;
pub mod input;
pub mod property;
pub mod routing;
pub mod shapes;
pub mod snap;
pub mod storage;
pub mod viewport;

pub use canvas::{Canvas, CanvasEvent, CanvasMode};
pub use diagram::{
    BBoxMask, CanvasFlags, ChildPolicy, ConnectionPolicy, Diagram, DiagramSettings, Direction,
    RemovePolicy,
};
pub use draw::{DrawCommand, DrawStyle, DrawingSurface, RecordingSurface};
pub use error::{AcceptError, AcceptResult, DiagramError, DiagramResult, PropertyError};
pub use handles::{Handle, HandleKind, HandleShape};
pub use history::HistorySnapshots;
pub use input::{InputState, Key, KeyEvent, Modifiers, MouseButton, PointerEvent};
pub use property::PropertyRegistry;
pub use routing::RoutedLine;
pub use shapes::{ArrowHead, LineMode, ShapeId, ShapeNode, ShapeType, StyleFlags};
pub use snap::{SnapResult, snap_point, snap_to_grid};
pub use storage::{AutoSaveManager, FileStorage, MemoryStorage, Storage, StorageError};
pub use viewport::Viewport;
