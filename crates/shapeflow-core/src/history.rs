//! Snapshot-based undo/redo.
//!
//! Every saved step is a complete serialized diagram. Callers decide when to
//! take a snapshot, typically once per finished gesture.

use crate::diagram::{Diagram, MAX_HISTORY_DEPTH};
use crate::error::DiagramResult;
use std::collections::VecDeque;

/// Bounded list of serialized diagram states with a cursor on the current one.
#[derive(Debug, Clone)]
pub struct HistorySnapshots {
    states: VecDeque<String>,
    cursor: usize,
    depth: usize,
}

impl Default for HistorySnapshots {
    fn default() -> Self {
        Self::new(MAX_HISTORY_DEPTH)
    }
}

impl HistorySnapshots {
    /// Create an empty history keeping at most `depth` states.
    pub fn new(depth: usize) -> Self {
        Self {
            states: VecDeque::new(),
            cursor: 0,
            depth: depth.max(1),
        }
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Change the bound, evicting the oldest states if needed.
    pub fn set_depth(&mut self, depth: usize) {
        self.depth = depth.max(1);
        self.evict();
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    /// Index of the current state.
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn current(&self) -> Option<&str> {
        self.states.get(self.cursor).map(String::as_str)
    }

    /// Record `state` after the current one, dropping any redo states.
    pub fn save(&mut self, state: String) {
        if !self.states.is_empty() {
            self.states.truncate(self.cursor + 1);
        }
        self.states.push_back(state);
        self.cursor = self.states.len() - 1;
        self.evict();
    }

    /// Step back; `None` at the oldest state.
    pub fn undo(&mut self) -> Option<&str> {
        if !self.can_undo() {
            return None;
        }
        self.cursor -= 1;
        self.current()
    }

    /// Step forward; `None` at the newest state.
    pub fn redo(&mut self) -> Option<&str> {
        if !self.can_redo() {
            return None;
        }
        self.cursor += 1;
        self.current()
    }

    pub fn can_undo(&self) -> bool {
        self.cursor > 0 && !self.states.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        self.cursor + 1 < self.states.len()
    }

    pub fn clear(&mut self) {
        self.states.clear();
        self.cursor = 0;
    }

    /// Serialize `diagram` and save it.
    pub fn save_diagram(&mut self, diagram: &Diagram) -> DiagramResult<()> {
        let state = diagram.to_json()?;
        self.save(state);
        log::debug!("Saved snapshot {} of {}", self.cursor + 1, self.states.len());
        Ok(())
    }

    /// Restore the previous state into `diagram`. Returns whether anything changed.
    pub fn undo_diagram(&mut self, diagram: &mut Diagram) -> DiagramResult<bool> {
        match self.undo() {
            Some(state) => {
                let state = state.to_string();
                Self::restore(diagram, &state)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Restore the next state into `diagram`. Returns whether anything changed.
    pub fn redo_diagram(&mut self, diagram: &mut Diagram) -> DiagramResult<bool> {
        match self.redo() {
            Some(state) => {
                let state = state.to_string();
                Self::restore(diagram, &state)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn restore(diagram: &mut Diagram, state: &str) -> DiagramResult<()> {
        diagram.load_json(state)?;
        diagram.set_modified(true);
        Ok(())
    }

    fn evict(&mut self) {
        while self.states.len() > self.depth {
            self.states.pop_front();
            self.cursor = self.cursor.saturating_sub(1);
        }
    }
}
