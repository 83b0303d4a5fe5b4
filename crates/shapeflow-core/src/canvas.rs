//! Interactive editing of a diagram.
//!
//! [`Canvas`] turns device-space pointer and key events into diagram edits:
//! selection, dragging, resizing through handles, rubber-band selection,
//! interactive connection creation and endpoint re-binding. Each finished
//! gesture is recorded as one history snapshot.

use crate::clipboard;
use crate::diagram::{CanvasFlags, Diagram, HIT_TOLERANCE};
use crate::draw::{DrawStyle, DrawingSurface};
use crate::error::{AcceptError, AcceptResult, DiagramResult};
use crate::handles::{self, Handle, HandleKind, resize_rect};
use crate::history::HistorySnapshots;
use crate::input::{InputState, Key, KeyEvent, MouseButton, PointerEvent};
use crate::routing::relative_offset;
use crate::shapes::{
    LineEnds, LineMode, LineShape, SerializableColor, ShapeId, ShapeNode, ShapeType, StyleFlags,
};
use crate::snap::{snap_delta, snap_point};
use crate::viewport::Viewport;
use kurbo::{Point, Rect, Vec2};

/// Zoom factor applied per scroll step.
const ZOOM_STEP: f64 = 1.1;

/// Displacement of pasted shapes relative to their copied position.
pub const PASTE_OFFSET: Vec2 = Vec2::new(20.0, 20.0);

const SELECTION_COLOR: SerializableColor = SerializableColor::new(0, 120, 215, 255);
const HIGHLIGHT_COLOR: SerializableColor = SerializableColor::new(255, 140, 0, 255);

/// What the canvas is doing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CanvasMode {
    #[default]
    Ready,
    HandleMove,
    ShapeMove,
    MultiSelection,
    CreateConnection,
    SourceChange,
    TargetChange,
}

/// Notable outcome of an input event.
#[derive(Debug, Clone, PartialEq)]
pub enum CanvasEvent {
    SelectionChanged,
    ShapesMoved(Vec<ShapeId>),
    ShapeResized(ShapeId),
    Reparented {
        shape: ShapeId,
        parent: Option<ShapeId>,
    },
    ConnectionCreated(ShapeId),
    ConnectionChanged(ShapeId),
    /// A connection end was dropped on a shape that does not accept it.
    ConnectionRejected(AcceptError),
    Cancelled,
}

/// Gesture in progress. Reversible gestures keep the diagram as it was
/// when they started.
#[derive(Debug, Default)]
enum Gesture {
    #[default]
    Idle,
    HandleMove {
        handle: Handle,
        last: Point,
        original: Box<Diagram>,
    },
    ShapeMove {
        start: Point,
        /// Snapping reference: origin of the first moved shape.
        anchor: Point,
        applied: Vec2,
        moved: Vec<ShapeId>,
        original: Box<Diagram>,
    },
    MultiSelection {
        start: Point,
        current: Point,
    },
    CreateConnection {
        line: ShapeId,
    },
    EndpointChange {
        line: ShapeId,
        source: bool,
        original: Box<Diagram>,
    },
}

impl Gesture {
    /// Connection whose end follows the pointer.
    fn line(&self) -> Option<ShapeId> {
        match self {
            Gesture::CreateConnection { line } | Gesture::EndpointChange { line, .. } => {
                Some(*line)
            }
            _ => None,
        }
    }
}

/// Interaction controller over one diagram.
pub struct Canvas {
    diagram: Diagram,
    pub viewport: Viewport,
    pub input: InputState,
    selection: Vec<ShapeId>,
    gesture: Gesture,
    history: HistorySnapshots,
    clipboard: Option<Vec<u8>>,
    hovered: Option<ShapeId>,
    drop_target: Option<ShapeId>,
}

impl Canvas {
    /// Wrap `diagram`, recording its current state as the oldest snapshot.
    pub fn new(diagram: Diagram) -> DiagramResult<Self> {
        let mut viewport = Viewport::new();
        viewport.apply_settings(diagram.settings());
        let mut canvas = Self {
            history: HistorySnapshots::new(diagram.settings().history_depth),
            diagram,
            viewport,
            input: InputState::new(),
            selection: Vec::new(),
            gesture: Gesture::Idle,
            clipboard: None,
            hovered: None,
            drop_target: None,
        };
        canvas.history.save_diagram(&canvas.diagram)?;
        Ok(canvas)
    }

    pub fn diagram(&self) -> &Diagram {
        &self.diagram
    }

    /// Direct access for programmatic edits; call [`Canvas::save_snapshot`] afterwards.
    pub fn diagram_mut(&mut self) -> &mut Diagram {
        &mut self.diagram
    }

    /// Replace the edited diagram, starting a fresh history.
    pub fn set_diagram(&mut self, diagram: Diagram) -> DiagramResult<()> {
        self.cancel();
        self.diagram = diagram;
        self.selection.clear();
        self.hovered = None;
        self.viewport.apply_settings(self.diagram.settings());
        self.history = HistorySnapshots::new(self.diagram.settings().history_depth);
        self.history.save_diagram(&self.diagram)
    }

    pub fn history(&self) -> &HistorySnapshots {
        &self.history
    }

    pub fn mode(&self) -> CanvasMode {
        match &self.gesture {
            Gesture::Idle => CanvasMode::Ready,
            Gesture::HandleMove { .. } => CanvasMode::HandleMove,
            Gesture::ShapeMove { .. } => CanvasMode::ShapeMove,
            Gesture::MultiSelection { .. } => CanvasMode::MultiSelection,
            Gesture::CreateConnection { .. } => CanvasMode::CreateConnection,
            Gesture::EndpointChange { source: true, .. } => CanvasMode::SourceChange,
            Gesture::EndpointChange { source: false, .. } => CanvasMode::TargetChange,
        }
    }

    /// Shape under the pointer that reacts to hovering.
    pub fn hovered(&self) -> Option<ShapeId> {
        self.hovered
    }

    /// Shape that would adopt the dragged shapes if released now.
    pub fn drop_target(&self) -> Option<ShapeId> {
        self.drop_target
    }

    pub fn selection(&self) -> &[ShapeId] {
        &self.selection
    }

    pub fn is_selected(&self, id: ShapeId) -> bool {
        self.selection.contains(&id)
    }

    /// Select a single shape.
    pub fn select(&mut self, id: ShapeId) {
        self.selection.clear();
        self.add_to_selection(id);
    }

    pub fn add_to_selection(&mut self, id: ShapeId) {
        if self.diagram.contains(id) && !self.selection.contains(&id) {
            self.selection.push(id);
        }
    }

    pub fn clear_selection(&mut self) {
        self.selection.clear();
    }

    /// Select every visible top-level shape.
    pub fn select_all(&mut self) {
        self.selection = self
            .diagram
            .top_level()
            .iter()
            .copied()
            .filter(|&id| self.diagram.get(id).is_some_and(|n| n.visible))
            .collect();
    }

    /// Feed a pointer event in device coordinates.
    pub fn handle_pointer_event(&mut self, event: PointerEvent) -> DiagramResult<Vec<CanvasEvent>> {
        self.input.handle_pointer_event(event);
        let p = self.viewport.device_to_logical(event.position());
        match event {
            PointerEvent::Down {
                button: MouseButton::Left,
                ..
            } => self.pointer_down(p),
            PointerEvent::Up {
                button: MouseButton::Left,
                ..
            } => self.pointer_up(p),
            PointerEvent::Move { .. } => {
                self.pointer_move(p);
                Ok(Vec::new())
            }
            PointerEvent::Scroll { position, delta } => {
                if self.input.modifiers.command() {
                    let factor = if delta.y < 0.0 { ZOOM_STEP } else { 1.0 / ZOOM_STEP };
                    self.viewport.zoom_at(position, factor);
                } else {
                    self.viewport.scroll_by(delta);
                }
                Ok(Vec::new())
            }
            PointerEvent::Down { .. } | PointerEvent::Up { .. } => Ok(Vec::new()),
        }
    }

    /// Feed a key event.
    pub fn handle_key_event(&mut self, event: KeyEvent) -> DiagramResult<Vec<CanvasEvent>> {
        self.input.handle_key_event(event);
        let KeyEvent::Pressed(key) = event else {
            return Ok(Vec::new());
        };
        let modifiers = self.input.modifiers;

        match key {
            Key::Escape => Ok(if self.cancel() {
                vec![CanvasEvent::Cancelled]
            } else {
                Vec::new()
            }),
            Key::Delete | Key::Backspace => {
                let removed = self.delete_selected()?;
                Ok(if removed.is_empty() {
                    Vec::new()
                } else {
                    vec![CanvasEvent::SelectionChanged]
                })
            }
            Key::Left => self.nudge(Vec2::new(-1.0, 0.0)),
            Key::Right => self.nudge(Vec2::new(1.0, 0.0)),
            Key::Up => self.nudge(Vec2::new(0.0, -1.0)),
            Key::Down => self.nudge(Vec2::new(0.0, 1.0)),
            Key::Char(c) if modifiers.command() => {
                let changed = match c.to_ascii_lowercase() {
                    'z' if modifiers.shift => self.redo()?,
                    'z' => self.undo()?,
                    'y' => self.redo()?,
                    'a' => {
                        self.select_all();
                        true
                    }
                    'c' => {
                        self.copy()?;
                        false
                    }
                    'x' => self.cut()?,
                    'v' => !self.paste()?.is_empty(),
                    _ => false,
                };
                Ok(if changed {
                    vec![CanvasEvent::SelectionChanged]
                } else {
                    Vec::new()
                })
            }
            Key::Char(_) => Ok(Vec::new()),
        }
    }

    /// Start drawing a connection of `line_type` from `src`; `device` is the
    /// pointer position. The target end then follows the pointer.
    pub fn start_interactive_connection(
        &mut self,
        line_type: ShapeType,
        src: ShapeId,
        device: Point,
    ) -> AcceptResult<ShapeId> {
        if !line_type.is_line() {
            return Err(AcceptError::InvalidInput);
        }
        self.cancel();
        let src = self.propagate(src, StyleFlags::PROPAGATE_INTERACTIVE_CONNECTION);
        self.diagram.is_connection_accepted(src, None, line_type)?;

        let p = self.viewport.device_to_logical(device);
        let bounds = self.diagram.bounding_box(src);
        let mut line = LineShape::under_construction(src, p);
        if crate::shapes::rect::contains(bounds, p, 0.0) {
            line.src_offset = Some(relative_offset(bounds, p));
        }
        let id = self.diagram.add_connection(ShapeNode::from_line(line_type, line))?;
        self.gesture = Gesture::CreateConnection { line: id };
        log::debug!("Constructing {} from {}", line_type, src);
        Ok(id)
    }

    /// Abort the gesture in progress. Returns whether there was one.
    ///
    /// Drags and endpoint changes are reverted; a connection under
    /// construction is removed.
    pub fn cancel(&mut self) -> bool {
        self.drop_target = None;
        match std::mem::take(&mut self.gesture) {
            Gesture::Idle => false,
            Gesture::HandleMove { original, .. }
            | Gesture::ShapeMove { original, .. }
            | Gesture::EndpointChange { original, .. } => {
                self.diagram = *original;
                true
            }
            Gesture::MultiSelection { .. } => true,
            Gesture::CreateConnection { line } => {
                if let Err(e) = self.diagram.remove_shape(line) {
                    log::warn!("Failed to discard unfinished connection: {}", e);
                }
                true
            }
        }
    }

    /// Remove the selected shapes with their cascades.
    pub fn delete_selected(&mut self) -> DiagramResult<Vec<ShapeId>> {
        self.cancel();
        if self.selection.is_empty() {
            return Ok(Vec::new());
        }
        let ids = std::mem::take(&mut self.selection);
        let removed = self.diagram.remove_shapes(&ids);
        if self.hovered.is_some_and(|h| removed.contains(&h)) {
            self.hovered = None;
        }
        self.save_snapshot()?;
        Ok(removed)
    }

    /// Copy the selection into the internal clipboard.
    pub fn copy(&mut self) -> DiagramResult<bool> {
        if !self.diagram.settings().has_flag(CanvasFlags::CLIPBOARD) || self.selection.is_empty() {
            return Ok(false);
        }
        self.clipboard = Some(clipboard::copy_shapes(&self.diagram, &self.selection)?);
        Ok(true)
    }

    pub fn cut(&mut self) -> DiagramResult<bool> {
        if !self.copy()? {
            return Ok(false);
        }
        self.delete_selected()?;
        Ok(true)
    }

    /// Paste the internal clipboard and select the pasted shapes.
    pub fn paste(&mut self) -> DiagramResult<Vec<ShapeId>> {
        if !self.diagram.settings().has_flag(CanvasFlags::CLIPBOARD) {
            return Ok(Vec::new());
        }
        let Some(payload) = self.clipboard.clone() else {
            return Ok(Vec::new());
        };
        self.paste_payload(&payload)
    }

    /// Clipboard content for a text-only system clipboard.
    pub fn clipboard_text(&self) -> Option<String> {
        self.clipboard.as_deref().map(clipboard::encode_text)
    }

    /// Paste text produced by [`Canvas::clipboard_text`].
    pub fn paste_text(&mut self, text: &str) -> DiagramResult<Vec<ShapeId>> {
        if !self.diagram.settings().has_flag(CanvasFlags::CLIPBOARD) {
            return Ok(Vec::new());
        }
        let payload = clipboard::decode_text(text)?;
        let pasted = self.paste_payload(&payload)?;
        self.clipboard = Some(payload);
        Ok(pasted)
    }

    fn paste_payload(&mut self, payload: &[u8]) -> DiagramResult<Vec<ShapeId>> {
        self.cancel();
        let pasted = clipboard::paste_shapes(&mut self.diagram, payload, PASTE_OFFSET)?;
        if pasted.is_empty() {
            return Ok(pasted);
        }
        self.diagram.move_shapes_from_negatives();
        self.selection = pasted.clone();
        self.save_snapshot()?;
        Ok(pasted)
    }

    pub fn can_undo(&self) -> bool {
        self.diagram.settings().has_flag(CanvasFlags::UNDO_REDO) && self.history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.diagram.settings().has_flag(CanvasFlags::UNDO_REDO) && self.history.can_redo()
    }

    pub fn undo(&mut self) -> DiagramResult<bool> {
        if !self.diagram.settings().has_flag(CanvasFlags::UNDO_REDO) {
            return Ok(false);
        }
        self.cancel();
        let changed = self.history.undo_diagram(&mut self.diagram)?;
        if changed {
            self.after_restore();
        }
        Ok(changed)
    }

    pub fn redo(&mut self) -> DiagramResult<bool> {
        if !self.diagram.settings().has_flag(CanvasFlags::UNDO_REDO) {
            return Ok(false);
        }
        self.cancel();
        let changed = self.history.redo_diagram(&mut self.diagram)?;
        if changed {
            self.after_restore();
        }
        Ok(changed)
    }

    /// Record the current diagram as a new history step.
    pub fn save_snapshot(&mut self) -> DiagramResult<()> {
        if !self.diagram.settings().has_flag(CanvasFlags::UNDO_REDO) {
            return Ok(());
        }
        self.history.set_depth(self.diagram.settings().history_depth);
        self.history.save_diagram(&self.diagram)
    }

    /// Draw the diagram and the interaction overlays, in logical coordinates.
    ///
    /// Callers apply [`Viewport::transform`] on their surface.
    pub fn draw(&self, surface: &mut dyn DrawingSurface) {
        self.diagram.draw(surface);
        let zoom = self.viewport.zoom.max(f64::EPSILON);

        if let Some(id) = self.drop_target.or(self.hovered) {
            if self.diagram.contains(id) {
                let margin = 2.0 / zoom;
                surface.set_style(&DrawStyle::outline(HIGHLIGHT_COLOR));
                surface.draw_polygon(&crate::shapes::rect::outline(
                    self.diagram.bounding_box(id).inflate(margin, margin),
                ));
            }
        }

        surface.set_style(&DrawStyle::outline(SELECTION_COLOR));
        for &id in &self.selection {
            if !self
                .diagram
                .get(id)
                .is_some_and(|n| n.contains_style(StyleFlags::SHOW_HANDLES))
            {
                continue;
            }
            for handle in handles::handles_for(&self.diagram, id) {
                handle.draw(surface, zoom);
            }
        }

        if let Gesture::MultiSelection { start, current } = self.gesture {
            surface.draw_polygon(&crate::shapes::rect::outline(Rect::from_points(start, current)));
        }
    }

    fn pointer_down(&mut self, p: Point) -> DiagramResult<Vec<CanvasEvent>> {
        if let Gesture::CreateConnection { line } = self.gesture {
            return self.connection_click(line, p);
        }
        if !matches!(self.gesture, Gesture::Idle) {
            return Ok(Vec::new());
        }

        let zoom = self.viewport.zoom;
        if let Some(handle) = handles::handle_at(&self.diagram, &self.selection, p, zoom) {
            self.begin_handle(handle, p);
            return Ok(Vec::new());
        }

        let multi = self.diagram.settings().has_flag(CanvasFlags::MULTI_SELECTION);
        let additive = multi && (self.input.modifiers.shift || self.input.modifiers.command());
        let mut events = Vec::new();

        let Some(hit) = self.diagram.find_shape_at(p, self.tolerance()) else {
            if !additive && !self.selection.is_empty() {
                self.selection.clear();
                events.push(CanvasEvent::SelectionChanged);
            }
            if multi {
                self.gesture = Gesture::MultiSelection { start: p, current: p };
            }
            return Ok(events);
        };

        let target = self.propagate(hit, StyleFlags::PROPAGATE_SELECTION);
        if additive {
            if let Some(index) = self.selection.iter().position(|&s| s == target) {
                self.selection.remove(index);
                return Ok(vec![CanvasEvent::SelectionChanged]);
            }
            self.selection.push(target);
            events.push(CanvasEvent::SelectionChanged);
        } else if !self.is_selected(target) {
            self.selection = vec![target];
            events.push(CanvasEvent::SelectionChanged);
        }

        let dragged = self.propagate(hit, StyleFlags::PROPAGATE_DRAGGING);
        let moved = if self.is_selected(dragged) {
            self.movable(&self.selection)
        } else {
            self.movable(&[dragged])
        };
        if !moved.is_empty() {
            let anchor = moved
                .iter()
                .copied()
                .find(|&id| self.diagram.get(id).is_some_and(|n| !n.is_line()))
                .map(|id| self.diagram.bounding_box(id).origin())
                .unwrap_or(p);
            self.gesture = Gesture::ShapeMove {
                start: p,
                anchor,
                applied: Vec2::ZERO,
                moved,
                original: Box::new(self.diagram.clone()),
            };
        }
        Ok(events)
    }

    fn pointer_move(&mut self, p: Point) {
        match std::mem::take(&mut self.gesture) {
            Gesture::Idle => {
                self.hovered = if self.diagram.settings().has_flag(CanvasFlags::HOVERING) {
                    self.diagram
                        .find_shape_at(p, self.tolerance())
                        .filter(|&id| {
                            self.diagram
                                .get(id)
                                .is_some_and(|n| n.contains_style(StyleFlags::HOVERING))
                        })
                } else {
                    None
                };
            }
            Gesture::HandleMove {
                handle,
                last,
                original,
            } => {
                self.apply_handle(&handle, last, p);
                self.gesture = Gesture::HandleMove {
                    handle,
                    last: p,
                    original,
                };
            }
            Gesture::ShapeMove {
                start,
                anchor,
                applied,
                moved,
                original,
            } => {
                let delta = snap_delta(anchor, p - start, self.diagram.settings());
                let step = delta - applied;
                if step != Vec2::ZERO {
                    for &id in &moved {
                        self.diagram.move_by(id, step);
                    }
                }
                self.drop_target = if self.diagram.settings().has_flag(CanvasFlags::HIGHLIGHTING) {
                    self.find_drop_target(p, &moved).filter(|&t| {
                        moved.iter().any(|&id| self.can_adopt(Some(t), id))
                    })
                } else {
                    None
                };
                self.gesture = Gesture::ShapeMove {
                    start,
                    anchor,
                    applied: delta,
                    moved,
                    original,
                };
            }
            Gesture::MultiSelection { start, .. } => {
                self.gesture = Gesture::MultiSelection { start, current: p };
            }
            gesture @ (Gesture::CreateConnection { .. } | Gesture::EndpointChange { .. }) => {
                if let Some(l) = gesture
                    .line()
                    .and_then(|line| self.diagram.get_mut(line))
                    .and_then(|n| n.line_mut())
                {
                    l.unfinished_point = p;
                }
                self.gesture = gesture;
            }
        }
    }

    fn pointer_up(&mut self, p: Point) -> DiagramResult<Vec<CanvasEvent>> {
        self.drop_target = None;
        match std::mem::take(&mut self.gesture) {
            Gesture::Idle => Ok(Vec::new()),
            Gesture::HandleMove { handle, .. } => {
                self.diagram.move_shapes_from_negatives();
                self.save_snapshot()?;
                Ok(vec![CanvasEvent::ShapeResized(handle.shape_id)])
            }
            Gesture::ShapeMove { applied, moved, .. } => {
                if applied == Vec2::ZERO {
                    return Ok(Vec::new());
                }
                let mut events = Vec::new();
                if self.diagram.settings().has_flag(CanvasFlags::PARENT_CHANGE) {
                    let target = self.find_drop_target(p, &moved);
                    for &id in &moved {
                        if self.can_adopt(target, id) {
                            self.diagram.reparent_shape(id, target)?;
                            events.push(CanvasEvent::Reparented {
                                shape: id,
                                parent: target,
                            });
                        }
                    }
                }
                for &id in &moved {
                    if self.diagram.get(id).is_some_and(|n| !n.is_line()) {
                        self.diagram.update(id);
                    }
                }
                self.diagram.move_shapes_from_negatives();
                self.save_snapshot()?;
                events.insert(0, CanvasEvent::ShapesMoved(moved));
                Ok(events)
            }
            Gesture::MultiSelection { start, .. } => {
                let inside = self.diagram.shapes_inside(Rect::from_points(start, p));
                let roots: Vec<ShapeId> = inside
                    .iter()
                    .copied()
                    .filter(|&id| !self.diagram.ancestors(id).iter().any(|a| inside.contains(a)))
                    .collect();
                for id in roots {
                    if !self.selection.contains(&id) {
                        self.selection.push(id);
                    }
                }
                Ok(vec![CanvasEvent::SelectionChanged])
            }
            gesture @ Gesture::CreateConnection { .. } => {
                self.gesture = gesture;
                Ok(Vec::new())
            }
            Gesture::EndpointChange {
                line,
                source,
                original,
            } => self.finish_endpoint_change(line, source, original, p),
        }
    }

    fn begin_handle(&mut self, handle: Handle, p: Point) {
        let original = Box::new(self.diagram.clone());
        let bound_end = self.diagram.get(handle.shape_id).and_then(|n| n.line()).and_then(|l| {
            match handle.kind {
                HandleKind::LineStart => l.src_shape().map(|_| true),
                HandleKind::LineEnd => l.trg_shape().map(|_| false),
                _ => None,
            }
        });

        match bound_end {
            Some(source) => {
                if let Some(line) = self
                    .diagram
                    .get_mut(handle.shape_id)
                    .and_then(|n| n.line_mut())
                {
                    line.mode = if source {
                        LineMode::SourceChanging
                    } else {
                        LineMode::TargetChanging
                    };
                    line.unfinished_point = p;
                }
                self.gesture = Gesture::EndpointChange {
                    line: handle.shape_id,
                    source,
                    original,
                };
            }
            None => {
                self.gesture = Gesture::HandleMove {
                    handle,
                    last: p,
                    original,
                };
            }
        }
    }

    fn apply_handle(&mut self, handle: &Handle, from: Point, to: Point) {
        let id = handle.shape_id;
        let snapped = snap_point(to, self.diagram.settings()).point;
        if let Some(line) = self.diagram.get_mut(id).and_then(|n| n.line_mut()) {
            match (handle.kind, &mut line.ends) {
                (HandleKind::LineControl(i), _) => {
                    if let Some(cp) = line.control_points.get_mut(i) {
                        *cp = snapped;
                    }
                }
                (HandleKind::LineStart, LineEnds::Free { src, .. }) => *src = snapped,
                (HandleKind::LineEnd, LineEnds::Free { trg, .. }) => *trg = snapped,
                _ => {}
            }
            return;
        }

        let current = self.diagram.bounding_box(id);
        let target = resize_rect(current, handle.kind, to - from);
        let sx = ratio(target.width(), current.width());
        let sy = ratio(target.height(), current.height());
        self.resize_to(id, target);

        if self.diagram.settings().has_flag(CanvasFlags::MULTI_SIZE_CHANGE) {
            let others: Vec<ShapeId> = self
                .selection
                .iter()
                .copied()
                .filter(|&other| other != id)
                .filter(|&other| {
                    self.diagram
                        .get(other)
                        .is_some_and(|n| !n.is_line() && n.contains_style(StyleFlags::SIZE_CHANGE))
                })
                .collect();
            for other in others {
                self.diagram.scale(other, sx, sy, true);
            }
        }
    }

    fn resize_to(&mut self, id: ShapeId, target: Rect) {
        let current = self.diagram.bounding_box(id);
        let sx = ratio(target.width(), current.width());
        let sy = ratio(target.height(), current.height());
        self.diagram.scale(id, sx, sy, true);
        let now = self.diagram.bounding_box(id);
        self.diagram.move_by(id, target.origin() - now.origin());
    }

    fn connection_click(&mut self, line: ShapeId, p: Point) -> DiagramResult<Vec<CanvasEvent>> {
        let Some((src, line_type)) = self
            .diagram
            .get(line)
            .and_then(|n| Some((n.line()?.src_shape()?, n.shape_type())))
        else {
            self.gesture = Gesture::Idle;
            return Ok(Vec::new());
        };

        let Some(trg) = self.connection_target(line, p) else {
            let point = snap_point(p, self.diagram.settings()).point;
            if let Some(l) = self.diagram.get_mut(line).and_then(|n| n.line_mut()) {
                l.control_points.push(point);
            }
            return Ok(Vec::new());
        };

        if let Err(e) = self.diagram.is_connection_accepted(src, Some(trg), line_type) {
            log::debug!("{} rejects {} from {}", trg, line_type, src);
            return Ok(vec![CanvasEvent::ConnectionRejected(e)]);
        }
        let offset = relative_offset(self.diagram.bounding_box(trg), p);
        if let Some(l) = self.diagram.get_mut(line).and_then(|n| n.line_mut()) {
            l.set_trg_shape(Some(trg));
            l.trg_offset = Some(offset);
            l.mode = LineMode::Ready;
        }
        self.gesture = Gesture::Idle;
        self.save_snapshot()?;
        log::debug!("Connected {} to {} with {}", src, trg, line);
        Ok(vec![CanvasEvent::ConnectionCreated(line)])
    }

    fn finish_endpoint_change(
        &mut self,
        line: ShapeId,
        source: bool,
        original: Box<Diagram>,
        p: Point,
    ) -> DiagramResult<Vec<CanvasEvent>> {
        let ends = self
            .diagram
            .get(line)
            .and_then(|n| Some((n.shape_type(), n.line()?.src_shape()?, n.line()?.trg_shape())));
        let target = self.connection_target(line, p);

        let accepted = match (ends, target) {
            (Some((line_type, src, trg)), Some(shape)) => {
                if source {
                    self.diagram.is_connection_accepted(shape, trg, line_type)
                } else {
                    self.diagram.is_connection_accepted(src, Some(shape), line_type)
                }
            }
            _ => Err(AcceptError::NotAccepted),
        };

        match (accepted, target) {
            (Ok(()), Some(shape)) => {
                let offset = relative_offset(self.diagram.bounding_box(shape), p);
                if let Some(l) = self.diagram.get_mut(line).and_then(|n| n.line_mut()) {
                    if source {
                        l.set_src_shape(shape);
                        l.src_offset = Some(offset);
                    } else {
                        l.set_trg_shape(Some(shape));
                        l.trg_offset = Some(offset);
                    }
                    l.mode = LineMode::Ready;
                }
                self.save_snapshot()?;
                Ok(vec![CanvasEvent::ConnectionChanged(line)])
            }
            (result, _) => {
                self.diagram = *original;
                let e = result.err().unwrap_or(AcceptError::NotAccepted);
                log::debug!("Endpoint change of {} rejected", line);
                Ok(vec![CanvasEvent::ConnectionRejected(e)])
            }
        }
    }

    /// Shape under `p` that an end of `line` could attach to.
    fn connection_target(&self, line: ShapeId, p: Point) -> Option<ShapeId> {
        self.diagram
            .shapes_at(p, self.tolerance())
            .into_iter()
            .find(|&id| id != line && !self.diagram.is_ancestor_of(line, id))
    }

    /// Top-most non-connection shape under `p` outside the dragged subtrees.
    fn find_drop_target(&self, p: Point, moved: &[ShapeId]) -> Option<ShapeId> {
        self.diagram.shapes_at(p, self.tolerance()).into_iter().find(|&id| {
            !moved.contains(&id)
                && !moved.iter().any(|&m| self.diagram.is_ancestor_of(m, id))
                && self.diagram.get(id).is_some_and(|n| !n.is_line())
        })
    }

    /// Whether dropping `id` on `target` (or on empty canvas) moves it there.
    fn can_adopt(&self, target: Option<ShapeId>, id: ShapeId) -> bool {
        let Some(node) = self.diagram.get(id) else {
            return false;
        };
        if node.is_line()
            || !node.contains_style(StyleFlags::PARENT_CHANGE)
            || node.parent() == target
        {
            return false;
        }
        let locked = node
            .parent()
            .and_then(|p| self.diagram.get(p))
            .is_some_and(|p| p.contains_style(StyleFlags::LOCK_CHILDREN));
        if locked {
            return false;
        }
        match target {
            Some(t) => self
                .diagram
                .get(t)
                .is_some_and(|t| t.accepted_children.accepts(node.shape_type())),
            None => self
                .diagram
                .settings()
                .accepted_top_shapes
                .accepts(node.shape_type()),
        }
    }

    /// Selection roots that may be dragged.
    fn movable(&self, ids: &[ShapeId]) -> Vec<ShapeId> {
        ids.iter()
            .copied()
            .filter(|&id| {
                self.diagram
                    .get(id)
                    .is_some_and(|n| n.is_line() || n.contains_style(StyleFlags::POSITION_CHANGE))
            })
            .filter(|&id| !self.diagram.ancestors(id).iter().any(|a| ids.contains(a)))
            .collect()
    }

    /// Walk up from `id` while shapes delegate `flag` to their parent.
    fn propagate(&self, mut id: ShapeId, flag: StyleFlags) -> ShapeId {
        while let Some(node) = self.diagram.get(id) {
            match node.parent() {
                Some(parent) if node.contains_style(flag) => id = parent,
                _ => break,
            }
        }
        id
    }

    fn nudge(&mut self, direction: Vec2) -> DiagramResult<Vec<CanvasEvent>> {
        if !matches!(self.gesture, Gesture::Idle) {
            return Ok(Vec::new());
        }
        let moved = self.movable(&self.selection);
        if moved.is_empty() {
            return Ok(Vec::new());
        }
        let settings = self.diagram.settings();
        let step = if crate::snap::grid_snapping(settings) {
            settings.grid_size
        } else {
            1.0
        };
        for &id in &moved {
            self.diagram.move_by(id, direction * step);
        }
        for &id in &moved {
            if self.diagram.get(id).is_some_and(|n| !n.is_line()) {
                self.diagram.update(id);
            }
        }
        self.diagram.move_shapes_from_negatives();
        self.save_snapshot()?;
        Ok(vec![CanvasEvent::ShapesMoved(moved)])
    }

    fn after_restore(&mut self) {
        self.selection.clear();
        self.hovered = None;
        self.viewport.apply_settings(self.diagram.settings());
    }

    fn tolerance(&self) -> f64 {
        HIT_TOLERANCE / self.viewport.zoom.max(f64::EPSILON)
    }
}

fn ratio(target: f64, current: f64) -> f64 {
    if current > 0.0 { target / current } else { 1.0 }
}
